use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::{Briefing, Feedback, Question};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("No generated text in response")]
    MissingText,

    #[error("Generated text is not the expected JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Generated content does not match schema: {0}")]
    Invalid(String),

    #[error("Expected {expected} questions, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// Decode a generated text payload into `T`.
///
/// Models occasionally wrap JSON in a Markdown fence even when asked for
/// `application/json`; the fence is stripped before decoding.
pub(crate) fn decode_payload<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let json_str = strip_fence(text);
    debug!(json_len = json_str.len(), "Decoding generated payload");
    Ok(serde_json::from_str(json_str)?)
}

fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an optional language tag on the opening line
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn require_text(field: &str, value: &str) -> Result<(), ParseError> {
    if value.trim().is_empty() {
        return Err(ParseError::Invalid(format!("{} is empty", field)));
    }
    Ok(())
}

const TREND_COUNT: std::ops::RangeInclusive<usize> = 3..=4;

fn require_score(field: &str, score: u8) -> Result<(), ParseError> {
    if score > 100 {
        return Err(ParseError::Invalid(format!(
            "{} score {} is outside 0-100",
            field, score
        )));
    }
    Ok(())
}

pub(crate) fn validate_briefing(briefing: &Briefing) -> Result<(), ParseError> {
    require_text("companySummary", &briefing.company_summary)?;
    require_text("companyCulture", &briefing.company_culture)?;
    require_text("recommendedTone", &briefing.recommended_tone)?;
    if !TREND_COUNT.contains(&briefing.industry_trends.len()) {
        return Err(ParseError::Invalid(format!(
            "industryTrends has {} items",
            briefing.industry_trends.len()
        )));
    }
    for trend in &briefing.industry_trends {
        require_text("industryTrends item", trend)?;
    }
    Ok(())
}

pub(crate) fn validate_questions(
    questions: &[Question],
    expected: usize,
) -> Result<(), ParseError> {
    if questions.len() != expected {
        return Err(ParseError::CountMismatch {
            expected,
            actual: questions.len(),
        });
    }
    for question in questions {
        require_text("question text", &question.text)?;
    }
    Ok(())
}

pub(crate) fn validate_feedback(feedback: &Feedback) -> Result<(), ParseError> {
    require_score("logic", feedback.logic.score)?;
    require_score("clarity", feedback.clarity.score)?;
    require_score("vocalTone", feedback.vocal_tone.score)?;
    require_text("betterExample", &feedback.better_example)?;
    Ok(())
}
