//! Lexical consensus estimation.
//!
//! Agreement is estimated by counting affirmation and objection markers in the
//! most recent messages. This is a cheap keyword heuristic, not a semantic
//! judgment: "I don't agree" counts as agreement. The thresholds are exposed as
//! named constants and carried in [`ConsensusThresholds`] so that another
//! [`ConsensusEvaluator`] can replace this one behind the same report shape.

use crate::types::{ConsensusReport, Message, SYSTEM_PARTICIPANT_ID};
use crate::utils::toml_config::CollaborationConfig;
use std::collections::HashSet;

pub const AGREEMENT_MARKERS: [&str; 6] =
    ["agree", "yes", "correct", "excellent", "exactly", "confirmed"];

pub const DISAGREEMENT_MARKERS: [&str; 6] =
    ["however", "but", "disagree", "concern", "issue", "problem"];

/// Number of trailing messages scanned.
pub const DEFAULT_CONSENSUS_WINDOW: usize = 10;

/// Reported when no marker was found or the history is too short to judge.
pub const NEUTRAL_AGREEMENT: f64 = 0.5;

/// Minimum history length before the score means anything.
pub const MIN_HISTORY_FOR_CONSENSUS: usize = 2;

/// Above this level a convergence note is reported.
pub const CONVERGENCE_THRESHOLD: f64 = 0.7;

/// Below this level a disagreement note is reported.
pub const DISAGREEMENT_THRESHOLD: f64 = 0.5;

/// Above this level the next step is implementation.
pub const IMPLEMENTATION_THRESHOLD: f64 = 0.8;

pub const CONVERGENCE_NOTE: &str = "General alignment on approach";
pub const DISAGREEMENT_NOTE: &str = "Different perspectives on implementation";
pub const NEXT_STEP_IMPLEMENT: &str = "ready for implementation";
pub const NEXT_STEP_CONTINUE: &str = "continue collaborative discussion";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsensusThresholds {
    pub window: usize,
    pub convergence: f64,
    pub disagreement: f64,
    pub implementation: f64,
}

impl Default for ConsensusThresholds {
    fn default() -> Self {
        Self {
            window: DEFAULT_CONSENSUS_WINDOW,
            convergence: CONVERGENCE_THRESHOLD,
            disagreement: DISAGREEMENT_THRESHOLD,
            implementation: IMPLEMENTATION_THRESHOLD,
        }
    }
}

impl From<&CollaborationConfig> for ConsensusThresholds {
    fn from(config: &CollaborationConfig) -> Self {
        Self {
            window: config.consensus_window,
            convergence: config.convergence_threshold,
            disagreement: config.disagreement_threshold,
            implementation: config.implementation_threshold,
        }
    }
}

/// Marker hits found in a piece of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkerCounts {
    pub agreement: usize,
    pub disagreement: usize,
}

impl MarkerCounts {
    /// `agreement / (agreement + disagreement)`, neutral when both are zero.
    pub fn agreement_level(&self) -> f64 {
        let total = self.agreement + self.disagreement;
        if total == 0 {
            NEUTRAL_AGREEMENT
        } else {
            self.agreement as f64 / total as f64
        }
    }
}

impl std::ops::AddAssign for MarkerCounts {
    fn add_assign(&mut self, other: Self) {
        self.agreement += other.agreement;
        self.disagreement += other.disagreement;
    }
}

/// Count lexicon entries appearing as whole words in `text`.
///
/// Each entry counts at most once, however often it is repeated.
pub fn count_markers(text: &str) -> MarkerCounts {
    let lowered = text.to_lowercase();
    let words: HashSet<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    MarkerCounts {
        agreement: AGREEMENT_MARKERS
            .iter()
            .filter(|m| words.contains(*m))
            .count(),
        disagreement: DISAGREEMENT_MARKERS
            .iter()
            .filter(|m| words.contains(*m))
            .count(),
    }
}

/// Sum marker counts over participant-authored messages.
pub fn count_in_messages<'a>(messages: impl IntoIterator<Item = &'a Message>) -> MarkerCounts {
    let mut counts = MarkerCounts::default();
    for message in messages {
        if message.from != SYSTEM_PARTICIPANT_ID {
            counts += count_markers(&message.content);
        }
    }
    counts
}

/// Strategy for estimating agreement over a session history.
pub trait ConsensusEvaluator: Send + Sync {
    /// Evaluate the full history of a session (oldest first).
    fn evaluate(&self, history: &[Message]) -> ConsensusReport;

    fn name(&self) -> &'static str;
}

/// Keyword-counting evaluator over the trailing window of a session.
#[derive(Debug, Clone, Default)]
pub struct LexicalConsensusEvaluator {
    thresholds: ConsensusThresholds,
}

impl LexicalConsensusEvaluator {
    pub fn new(thresholds: ConsensusThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ConsensusThresholds {
        &self.thresholds
    }

    fn next_steps(&self, level: f64) -> Vec<String> {
        let step = if level > self.thresholds.implementation {
            NEXT_STEP_IMPLEMENT
        } else {
            NEXT_STEP_CONTINUE
        };
        vec![step.to_string()]
    }
}

impl ConsensusEvaluator for LexicalConsensusEvaluator {
    fn evaluate(&self, history: &[Message]) -> ConsensusReport {
        if history.len() < MIN_HISTORY_FOR_CONSENSUS {
            return ConsensusReport {
                agreement_level: NEUTRAL_AGREEMENT,
                convergence_points: Vec::new(),
                remaining_disagreements: Vec::new(),
                next_steps: self.next_steps(NEUTRAL_AGREEMENT),
            };
        }

        let start = history.len().saturating_sub(self.thresholds.window);
        let level = count_in_messages(&history[start..]).agreement_level();

        let mut convergence_points = Vec::new();
        let mut remaining_disagreements = Vec::new();
        if level > self.thresholds.convergence {
            convergence_points.push(CONVERGENCE_NOTE.to_string());
        }
        if level < self.thresholds.disagreement {
            remaining_disagreements.push(DISAGREEMENT_NOTE.to_string());
        }

        ConsensusReport {
            agreement_level: level,
            convergence_points,
            remaining_disagreements,
            next_steps: self.next_steps(level),
        }
    }

    fn name(&self) -> &'static str {
        "lexical"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageType;
    use rstest::rstest;

    fn msg(from: &str, content: &str) -> Message {
        Message::new(from, MessageType::Analysis, content)
    }

    fn evaluate(contents: &[&str]) -> ConsensusReport {
        let history: Vec<Message> = contents.iter().map(|c| msg("architect", c)).collect();
        LexicalConsensusEvaluator::default().evaluate(&history)
    }

    #[rstest]
    #[case("I agree, exactly right", 2, 0)]
    #[case("Yes, however there is a concern and an issue", 1, 3)]
    #[case("I disagree", 0, 1)]
    #[case("agree agree agree", 1, 0)]
    #[case("We should contribute to the rebuttal", 0, 0)]
    #[case("CONFIRMED. But...", 1, 1)]
    fn test_count_markers(#[case] text: &str, #[case] agreement: usize, #[case] disagreement: usize) {
        let counts = count_markers(text);
        assert_eq!(counts.agreement, agreement);
        assert_eq!(counts.disagreement, disagreement);
    }

    #[test]
    fn test_short_history_is_neutral() {
        let report = evaluate(&["I agree completely"]);
        assert_eq!(report.agreement_level, NEUTRAL_AGREEMENT);
        assert!(report.convergence_points.is_empty());
        assert!(report.remaining_disagreements.is_empty());
        assert_eq!(report.next_steps, vec![NEXT_STEP_CONTINUE]);
    }

    #[test]
    fn test_no_markers_is_neutral() {
        let report = evaluate(&["Let us plan", "Sounds reasonable"]);
        assert_eq!(report.agreement_level, 0.5);
        assert!(report.convergence_points.is_empty());
        assert!(report.remaining_disagreements.is_empty());
    }

    #[test]
    fn test_full_agreement_converges() {
        let report = evaluate(&["Opening thoughts", "Yes, exactly what we need"]);
        assert_eq!(report.agreement_level, 1.0);
        assert_eq!(report.convergence_points, vec![CONVERGENCE_NOTE]);
        assert_eq!(report.next_steps, vec![NEXT_STEP_IMPLEMENT]);
    }

    #[test]
    fn test_mostly_disagreement() {
        let report = evaluate(&["Opening", "Yes, however the concern is a real issue"]);
        assert_eq!(report.agreement_level, 0.25);
        assert_eq!(report.remaining_disagreements, vec![DISAGREEMENT_NOTE]);
        assert_eq!(report.next_steps, vec![NEXT_STEP_CONTINUE]);
    }

    #[test]
    fn test_system_messages_are_not_scanned() {
        let history = vec![
            msg(SYSTEM_PARTICIPANT_ID, "However this briefing has a problem"),
            msg("analyst", "Agreed? yes"),
        ];
        let report = LexicalConsensusEvaluator::default().evaluate(&history);
        assert_eq!(report.agreement_level, 1.0);
    }

    #[test]
    fn test_window_limits_scan() {
        let thresholds = ConsensusThresholds {
            window: 2,
            ..ConsensusThresholds::default()
        };
        let history = vec![
            msg("a", "problem issue concern"),
            msg("b", "yes"),
            msg("c", "exactly"),
        ];
        let report = LexicalConsensusEvaluator::new(thresholds).evaluate(&history);
        assert_eq!(report.agreement_level, 1.0);
    }

    #[test]
    fn test_middle_band_reports_no_notes() {
        // 2 agreement, 1 disagreement => 0.667
        let report = evaluate(&["yes correct", "but"]);
        assert!(report.convergence_points.is_empty());
        assert!(report.remaining_disagreements.is_empty());
    }
}
