use serde::{Deserialize, Serialize};

/// Fewest questions a user may request for a session
pub const MIN_QUESTIONS: usize = 1;
/// Most questions a user may request for a session
pub const MAX_QUESTIONS: usize = 6;

/// Company/role primer produced once at the start of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Briefing {
    pub company_summary: String,
    pub industry_trends: Vec<String>,
    pub company_culture: String,
    pub recommended_tone: String,
}

/// Category of an interview question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    Basic,
    RoleSpecific,
    Experience,
    Collaboration,
    Advanced,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 5] = [
        QuestionKind::Basic,
        QuestionKind::RoleSpecific,
        QuestionKind::Experience,
        QuestionKind::Collaboration,
        QuestionKind::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Basic => "basic",
            QuestionKind::RoleSpecific => "role-specific",
            QuestionKind::Experience => "experience",
            QuestionKind::Collaboration => "collaboration",
            QuestionKind::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub text: String,
}

impl Question {
    pub fn new(kind: QuestionKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// A 0-100 score with the reviewer's comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredComment {
    pub score: u8,
    pub comment: String,
}

impl ScoredComment {
    pub fn new(score: u8, comment: impl Into<String>) -> Self {
        Self {
            score,
            comment: comment.into(),
        }
    }
}

/// Feedback on one answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub logic: ScoredComment,
    pub clarity: ScoredComment,
    pub vocal_tone: ScoredComment,
    pub better_example: String,
}

impl Feedback {
    /// Mean of the three scores, unrounded
    pub fn mean_score(&self) -> f64 {
        (self.logic.score as f64 + self.clarity.score as f64 + self.vocal_tone.score as f64) / 3.0
    }
}

/// Either real feedback or the error that replaced it.
///
/// Serialised untagged so a stored entry is either the feedback object or
/// `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedbackOutcome {
    Valid(Feedback),
    Error { error: String },
}

impl FeedbackOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        FeedbackOutcome::Error {
            error: message.into(),
        }
    }

    pub fn valid(&self) -> Option<&Feedback> {
        match self {
            FeedbackOutcome::Valid(f) => Some(f),
            FeedbackOutcome::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FeedbackOutcome::Error { .. })
    }
}

/// One answered question in a session log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerFeedback {
    pub question: String,
    pub answer: String,
    pub feedback: FeedbackOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_kind_labels() {
        let q: Question =
            serde_json::from_str(r#"{"type": "role-specific", "text": "Why us?"}"#).unwrap();
        assert_eq!(q.kind, QuestionKind::RoleSpecific);
        assert_eq!(q.kind.to_string(), "role-specific");

        let bad = serde_json::from_str::<Question>(r#"{"type": "trivia", "text": "?"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_feedback_outcome_untagged() {
        let err: FeedbackOutcome = serde_json::from_str(r#"{"error": "timeout"}"#).unwrap();
        assert!(err.is_error());

        let ok: FeedbackOutcome = serde_json::from_str(
            r#"{
                "logic": {"score": 80, "comment": "ok"},
                "clarity": {"score": 70, "comment": "fine"},
                "vocalTone": {"score": 90, "comment": "warm"},
                "betterExample": "Try STAR."
            }"#,
        )
        .unwrap();
        let feedback = ok.valid().unwrap();
        assert_eq!(feedback.vocal_tone.score, 90);
        assert!((feedback.mean_score() - 80.0).abs() < f64::EPSILON);
    }
}
