use serde_json::{json, Value};

use crate::QuestionKind;

/// Prompt templates for the four generation calls
pub struct Prompts;

impl Prompts {
    pub fn build_briefing_prompt(company: &str, role: &str) -> String {
        format!(
            r#"You are a career coach preparing a candidate for an interview.

## Target
Company: {company}
Role: {role}

## Instructions
Write a concise pre-interview briefing with:
1. **companySummary**: two or three sentences on what the company does and where it stands in its market.
2. **industryTrends**: 3 to 4 short statements on current trends in the company's industry that a candidate for this role should be ready to discuss.
3. **companyCulture**: the values and working style the company is known for.
4. **recommendedTone**: how the candidate should come across in this interview (e.g. formal, energetic, data-driven).

Respond only with JSON matching the declared schema."#,
            company = company.trim(),
            role = role.trim(),
        )
    }

    pub fn build_questions_prompt(role: &str, count: usize) -> String {
        format!(
            r#"You are an experienced interviewer hiring for the role of {role}.

Write exactly {count} interview questions, in the order they would be asked.
Spread them across these categories, starting with the easier ones:
{kinds}

Each question has a `type` (one of the categories above, spelled exactly) and the question `text`.
Respond only with a JSON array of {count} objects matching the declared schema."#,
            role = role.trim(),
            count = count,
            kinds = kind_list(),
        )
    }

    pub fn build_feedback_prompt(question: &str, answer: &str) -> String {
        format!(
            r#"You are an interview coach reviewing a candidate's answer.

## Question
{question}

## Candidate's Answer
{answer}

## Instructions
Score the answer from 0 to 100 on each dimension and give one or two sentences of specific, actionable comment for each:
- **logic**: structure, relevance and reasoning of the answer.
- **clarity**: how clear and concise the answer is.
- **vocalTone**: confidence and professionalism conveyed by the wording.

Then write **betterExample**: a stronger model answer to the same question.

Respond only with JSON matching the declared schema."#,
            question = question.trim(),
            answer = answer.trim(),
        )
    }

    pub fn build_recommended_prompt(weakness: &str, count: usize) -> String {
        format!(
            r#"You are an interview coach designing targeted practice.

The candidate's weakest area in their last practice session was:
"{weakness}"

Write exactly {count} interview questions that give the candidate focused practice on that weakness.
Each question has a `type` (one of: {kinds_inline}) and the question `text`.
Respond only with a JSON array of {count} objects matching the declared schema."#,
            weakness = weakness.trim(),
            count = count,
            kinds_inline = QuestionKind::ALL
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

fn kind_list() -> String {
    QuestionKind::ALL
        .iter()
        .map(|k| format!("- {}", k.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Declared output schemas, in the endpoint's OpenAPI-subset dialect
pub struct Schemas;

impl Schemas {
    pub fn briefing() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "companySummary": { "type": "STRING" },
                "industryTrends": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "minItems": 3,
                    "maxItems": 4
                },
                "companyCulture": { "type": "STRING" },
                "recommendedTone": { "type": "STRING" }
            },
            "required": ["companySummary", "industryTrends", "companyCulture", "recommendedTone"]
        })
    }

    pub fn questions() -> Value {
        json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "type": {
                        "type": "STRING",
                        "enum": QuestionKind::ALL.iter().map(|k| k.as_str()).collect::<Vec<_>>()
                    },
                    "text": { "type": "STRING" }
                },
                "required": ["type", "text"]
            }
        })
    }

    pub fn feedback() -> Value {
        let scored = json!({
            "type": "OBJECT",
            "properties": {
                "score": { "type": "INTEGER" },
                "comment": { "type": "STRING" }
            },
            "required": ["score", "comment"]
        });

        json!({
            "type": "OBJECT",
            "properties": {
                "logic": scored.clone(),
                "clarity": scored.clone(),
                "vocalTone": scored,
                "betterExample": { "type": "STRING" }
            },
            "required": ["logic", "clarity", "vocalTone", "betterExample"]
        })
    }
}
