use prepcoach_ai::{extract_text, Executor, GenerationRequest, RequestError};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::decode::{decode_payload, validate_briefing, validate_feedback, validate_questions};
use crate::{Briefing, Feedback, ParseError, Prompts, Question, Schemas, MAX_QUESTIONS, MIN_QUESTIONS};

/// Recommended-practice sessions always have this many questions
pub const RECOMMENDED_QUESTION_COUNT: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Generation request failed: {0}")]
    Request(#[from] RequestError),

    #[error("Failed to parse generated content: {0}")]
    Parse(#[from] ParseError),
}

/// Builds prompts, calls the executor and decodes the results.
///
/// Holds no session state; every call is an independent request/response.
#[derive(Clone)]
pub struct ContentService {
    executor: Executor,
}

impl ContentService {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub async fn generate_briefing(
        &self,
        company: &str,
        role: &str,
    ) -> Result<Briefing, ContentError> {
        let request =
            GenerationRequest::new(Prompts::build_briefing_prompt(company, role), Schemas::briefing());
        let briefing: Briefing = self.generate(&request).await?;
        validate_briefing(&briefing)?;

        info!(
            company,
            role,
            trends = briefing.industry_trends.len(),
            "Briefing generated"
        );
        Ok(briefing)
    }

    /// Generate exactly `count` questions; any other length is rejected.
    pub async fn generate_questions(
        &self,
        role: &str,
        count: usize,
    ) -> Result<Vec<Question>, ContentError> {
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&count) {
            return Err(ParseError::Invalid(format!(
                "question count {} is outside {}-{}",
                count, MIN_QUESTIONS, MAX_QUESTIONS
            ))
            .into());
        }

        let request = GenerationRequest::new(
            Prompts::build_questions_prompt(role, count),
            Schemas::questions(),
        );
        let questions: Vec<Question> = self.generate(&request).await?;
        validate_questions(&questions, count)?;

        info!(role, count, "Questions generated");
        Ok(questions)
    }

    pub async fn get_feedback(&self, question: &str, answer: &str) -> Result<Feedback, ContentError> {
        let request = GenerationRequest::new(
            Prompts::build_feedback_prompt(question, answer),
            Schemas::feedback(),
        );
        let feedback: Feedback = self.generate(&request).await?;
        validate_feedback(&feedback)?;

        info!(
            logic = feedback.logic.score,
            clarity = feedback.clarity.score,
            tone = feedback.vocal_tone.score,
            "Feedback generated"
        );
        Ok(feedback)
    }

    /// Three questions targeted at the given weakness
    pub async fn generate_recommended_questions(
        &self,
        weakness: &str,
    ) -> Result<Vec<Question>, ContentError> {
        let request = GenerationRequest::new(
            Prompts::build_recommended_prompt(weakness, RECOMMENDED_QUESTION_COUNT),
            Schemas::questions(),
        );
        let questions: Vec<Question> = self.generate(&request).await?;
        validate_questions(&questions, RECOMMENDED_QUESTION_COUNT)?;

        info!(weakness, "Recommended questions generated");
        Ok(questions)
    }

    async fn generate<T: DeserializeOwned>(
        &self,
        request: &GenerationRequest,
    ) -> Result<T, ContentError> {
        let response = self.executor.execute(request).await?;
        let text = extract_text(&response).ok_or(ParseError::MissingText)?;
        debug!(text_len = text.len(), "Generated text received");
        Ok(decode_payload(&text)?)
    }
}
