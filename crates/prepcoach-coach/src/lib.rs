mod decode;
mod prompts;
pub mod service;
mod types;

pub use decode::ParseError;
pub use prompts::{Prompts, Schemas};
pub use service::{ContentError, ContentService, RECOMMENDED_QUESTION_COUNT};
pub use types::{
    AnswerFeedback, Briefing, Feedback, FeedbackOutcome, Question, QuestionKind, ScoredComment,
    MAX_QUESTIONS, MIN_QUESTIONS,
};
