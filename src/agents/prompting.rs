//! Plumbing shared by the role adapters: the model-backed reply path, the
//! expertise heuristic and a few transcript helpers.

use crate::collaboration::consensus::{count_in_messages, count_markers};
use crate::llm::LLMClient;
use crate::types::{
    AgentFeedback, AppError, CollaborationContext, ExpertiseAssessment, Message, Participant,
    RecommendedRole, Result, SYSTEM_PARTICIPANT_ID,
};
use std::collections::HashSet;

/// Most recent messages forwarded to a model.
const MAX_TRANSCRIPT: usize = 20;

/// Profile, optional model binding and system prompt of one role.
pub struct RoleCore {
    profile: Participant,
    llm: Option<Box<dyn LLMClient>>,
    system_prompt: String,
}

impl RoleCore {
    pub fn new(profile: Participant, llm: Option<Box<dyn LLMClient>>, system_prompt: String) -> Self {
        Self {
            profile,
            llm,
            system_prompt,
        }
    }

    pub fn profile(&self) -> &Participant {
        &self.profile
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn model_name(&self) -> Option<&str> {
        self.llm.as_deref().map(|llm| llm.model_name())
    }

    /// Ask the bound model for a reply, or fall back to the offline composer.
    pub async fn compose<F>(
        &self,
        context: &CollaborationContext,
        history: &[Message],
        offline: F,
    ) -> Result<String>
    where
        F: FnOnce() -> String + Send,
    {
        match self.llm.as_deref() {
            Some(llm) => self.model_reply(llm, context, history).await,
            None => Ok(offline()),
        }
    }

    async fn model_reply(
        &self,
        llm: &dyn LLMClient,
        context: &CollaborationContext,
        history: &[Message],
    ) -> Result<String> {
        let mut messages = vec![(
            "system".to_string(),
            format!("{}\n\n{}", self.system_prompt, briefing(context)),
        )];

        let start = history.len().saturating_sub(MAX_TRANSCRIPT);
        for message in history[start..]
            .iter()
            .filter(|m| m.from != SYSTEM_PARTICIPANT_ID)
        {
            if message.from == self.profile.id {
                messages.push(("assistant".to_string(), message.content.clone()));
            } else {
                messages.push((
                    "user".to_string(),
                    format!("[{}] {}", message.from, message.content),
                ));
            }
        }

        messages.push((
            "user".to_string(),
            format!(
                "You are {} ({}). Give your next contribution to the discussion in a few sentences.",
                self.profile.role.name, self.profile.id
            ),
        ));

        let reply = llm
            .generate_with_history(&messages)
            .await
            .map_err(|e| self.failure(e.to_string()))?;

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(self.failure("model returned an empty reply"));
        }
        Ok(reply.to_string())
    }

    pub fn failure(&self, cause: impl Into<String>) -> AppError {
        AppError::ResponseGeneration {
            participant_id: self.profile.id.clone(),
            cause: cause.into(),
        }
    }

    /// Score topic relevance from how many affinity terms the topic touches.
    ///
    /// `fallback` is the role recommended when nothing matches.
    pub fn assess(
        &self,
        topic: &str,
        confidence: f64,
        fallback: RecommendedRole,
    ) -> ExpertiseAssessment {
        let hits = matched_terms(&self.profile, topic).len();
        let relevance = (0.2 + 0.25 * hits as f64).min(1.0);
        let recommended_role = match hits {
            0 => fallback,
            1 => RecommendedRole::Contributor,
            _ => RecommendedRole::Lead,
        };

        ExpertiseAssessment {
            relevance,
            confidence,
            recommended_role,
        }
    }

    /// Feedback skeleton: lexical agreement plus open points raised by others.
    pub fn feedback(
        &self,
        messages: &[Message],
        suggestions: Vec<String>,
        mut next_steps: Vec<String>,
    ) -> AgentFeedback {
        let agreement = count_in_messages(messages).agreement_level();
        if agreement > 0.8 {
            next_steps.push("Move to implementation planning".to_string());
        }

        AgentFeedback {
            agreement,
            concerns: open_points(messages, &self.profile.id),
            suggestions,
            next_steps,
        }
    }
}

/// Plain-text rendering of the session context for prompts.
pub fn briefing(context: &CollaborationContext) -> String {
    let mut text = format!("Topic: {}\n", context.topic);
    if !context.background_info.is_empty() {
        text.push_str(&format!("Background: {}\n", context.background_info));
    }
    push_section(&mut text, "Objectives", &context.objectives);
    push_section(&mut text, "Constraints", &context.constraints);
    push_section(&mut text, "Domain considerations", &context.domain_considerations);
    if let Some(seconds) = context.time_constraint_seconds {
        text.push_str(&format!("Time box: {} minutes\n", seconds / 60));
    }
    text
}

fn push_section(text: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    text.push_str(title);
    text.push_str(":\n");
    for item in items {
        text.push_str("- ");
        text.push_str(item);
        text.push('\n');
    }
}

/// Most recent message written by someone other than `own_id` or the system.
pub fn last_contribution<'a>(history: &'a [Message], own_id: &str) -> Option<&'a Message> {
    history
        .iter()
        .rev()
        .find(|m| m.from != own_id && m.from != SYSTEM_PARTICIPANT_ID)
}

/// How many times `id` has already spoken.
pub fn own_turns(history: &[Message], id: &str) -> usize {
    history.iter().filter(|m| m.from == id).count()
}

/// Number of non-system contributions and distinct authors.
pub fn participation(history: &[Message]) -> (usize, usize) {
    let contributions: Vec<&Message> = history
        .iter()
        .filter(|m| m.from != SYSTEM_PARTICIPANT_ID)
        .collect();
    let speakers: HashSet<&str> = contributions.iter().map(|m| m.from.as_str()).collect();
    (contributions.len(), speakers.len())
}

/// Pick an item by turn so repeated turns walk through a list.
pub fn rotate(items: &[String], turn: usize) -> Option<&str> {
    if items.is_empty() {
        None
    } else {
        Some(items[turn % items.len()].as_str())
    }
}

/// Lowercase the first character, for splicing list items into sentences.
pub fn decapitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Affinity terms of `profile` that the topic touches, by phrase or by word.
pub fn matched_terms(profile: &Participant, topic: &str) -> Vec<String> {
    let topic = topic.to_lowercase();
    let topic_words: HashSet<&str> = topic
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 4)
        .collect();

    profile
        .affinity_terms()
        .into_iter()
        .filter(|term| {
            topic.contains(term.as_str())
                || term
                    .split_whitespace()
                    .any(|word| word.len() >= 4 && topic_words.contains(word))
        })
        .collect()
}

fn open_points(messages: &[Message], own_id: &str) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.from != own_id && m.from != SYSTEM_PARTICIPANT_ID)
        .filter(|m| count_markers(&m.content).disagreement > 0)
        .map(|m| format!("Open point from {}: {}", m.from, excerpt(&m.content, 80)))
        .collect()
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentRole, MessageType, ParticipantStatus};

    fn profile() -> Participant {
        Participant {
            id: "analyst".into(),
            role: AgentRole {
                name: "Analyst".into(),
                specializations: vec!["statistical_analysis".into()],
                communication_style: "methodical".into(),
                primary_focus: "evidence".into(),
            },
            status: ParticipantStatus::Listening,
            expertise_tags: vec![],
            affinity_keywords: vec!["data".into(), "experiment".into()],
        }
    }

    #[test]
    fn test_matched_terms_by_phrase_and_word() {
        let matched = matched_terms(&profile(), "Data quality and analysis backlog");
        assert_eq!(matched, vec!["data", "statistical analysis"]);
    }

    #[test]
    fn test_assess_scales_with_matches() {
        let core = RoleCore::new(profile(), None, String::new());

        let none = core.assess("office party", 0.9, RecommendedRole::Validator);
        assert_eq!(none.recommended_role, RecommendedRole::Validator);
        assert!((none.relevance - 0.2).abs() < 1e-9);

        let many = core.assess("data experiment analysis", 0.9, RecommendedRole::Observer);
        assert_eq!(many.recommended_role, RecommendedRole::Lead);
        assert!(many.relevance > 0.9);
    }

    #[test]
    fn test_rotate_and_decapitalize() {
        let items = vec!["First".to_string(), "Second".to_string()];
        assert_eq!(rotate(&items, 3), Some("Second"));
        assert_eq!(rotate(&[], 0), None);
        assert_eq!(decapitalize("Define scope"), "define scope");
    }

    #[test]
    fn test_participation_ignores_system() {
        let history = vec![
            Message::new(SYSTEM_PARTICIPANT_ID, MessageType::Clarification, "brief"),
            Message::new("a", MessageType::Suggestion, "x"),
            Message::new("b", MessageType::Suggestion, "y"),
            Message::new("a", MessageType::Suggestion, "z"),
        ];
        assert_eq!(participation(&history), (3, 2));
        assert_eq!(last_contribution(&history, "a").unwrap().from, "b");
        assert_eq!(own_turns(&history, "a"), 2);
    }

    #[test]
    fn test_feedback_collects_open_points() {
        let core = RoleCore::new(profile(), None, String::new());
        let messages = vec![
            Message::new("engineer", MessageType::Suggestion, "There is a problem with latency"),
            Message::new("analyst", MessageType::Analysis, "But my own note"),
        ];
        let feedback = core.feedback(&messages, vec![], vec![]);
        assert_eq!(feedback.concerns.len(), 1);
        assert!(feedback.concerns[0].contains("engineer"));
        assert_eq!(feedback.agreement, 0.0);
    }

    #[test]
    fn test_briefing_lists_sections() {
        let context = CollaborationContext {
            topic: "Planning".into(),
            background_info: "Quarterly".into(),
            objectives: vec!["Pick scope".into()],
            constraints: vec![],
            domain_considerations: vec![],
            time_constraint_seconds: Some(1800),
        };
        let text = briefing(&context);
        assert!(text.contains("Objectives:\n- Pick scope"));
        assert!(!text.contains("Constraints"));
        assert!(text.contains("30 minutes"));
    }
}
