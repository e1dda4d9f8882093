//! Preset meetings that can be started by catalog index.

use crate::types::{CollaborationContext, MeetingScenario};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[allow(clippy::too_many_arguments)]
fn scenario(
    title: &str,
    topic: &str,
    background: &str,
    objectives: &[&str],
    constraints: &[&str],
    considerations: &[&str],
    participants: &[&str],
    minutes: u32,
) -> MeetingScenario {
    MeetingScenario {
        title: title.to_string(),
        description: topic.to_string(),
        context: CollaborationContext {
            topic: topic.to_string(),
            background_info: background.to_string(),
            objectives: strings(objectives),
            constraints: strings(constraints),
            domain_considerations: strings(considerations),
            time_constraint_seconds: Some(u64::from(minutes) * 60),
        },
        expected_participants: strings(participants),
        estimated_duration_minutes: minutes,
    }
}

/// The fixed scenario catalog, in index order.
pub fn catalog() -> Vec<MeetingScenario> {
    vec![
        scenario(
            "Feature Planning",
            "AI-powered wellness goal tracking feature development",
            "Planning next major feature for the platform",
            &[
                "Define feature requirements and scope",
                "Ensure cultural appropriateness and community focus",
                "Plan technical implementation strategy",
                "Establish success metrics and testing approach",
            ],
            &["Must integrate with existing platform", "Budget considerations"],
            &[
                "Community-oriented rather than individual-focused goals",
                "Culturally relevant wellness approaches",
                "Integration with existing community support systems",
            ],
            &["architect", "engineer", "analyst", "strategist"],
            25,
        ),
        scenario(
            "Cultural Validation Optimization",
            "Optimizing cultural validation scores and algorithms",
            "Cultural validation scores need improvement",
            &[
                "Identify areas for cultural validation improvement",
                "Design experiments to test enhancements",
                "Plan implementation strategy",
                "Establish validation methodology",
            ],
            &[
                "Must maintain existing functionality",
                "Real-time performance requirements",
            ],
            &[
                "Authentic representation of lived experiences",
                "Community input and validation",
                "Intersectionality considerations",
            ],
            &["engineer", "analyst", "architect", "strategist"],
            30,
        ),
        scenario(
            "Technical Architecture Review",
            "Platform technical architecture assessment",
            "Regular technical architecture review and optimization",
            &[
                "Assess current architecture performance",
                "Identify optimization opportunities",
                "Plan scalability improvements",
                "Address any technical debt",
            ],
            &["Zero downtime requirements", "Budget limitations"],
            &[
                "Ensure accessibility and inclusivity",
                "Performance in underserved communities",
                "Privacy and data protection",
            ],
            &["architect", "strategist", "analyst", "engineer"],
            35,
        ),
    ]
}

pub fn get(index: usize) -> Option<MeetingScenario> {
    catalog().into_iter().nth(index)
}
