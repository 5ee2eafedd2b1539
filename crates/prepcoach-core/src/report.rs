use prepcoach_coach::{AnswerFeedback, Feedback};
use serde::{Deserialize, Serialize};

/// Score thresholds used to grade a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPolicy {
    /// Overall score at or above this passes
    pub pass_threshold: u8,
    /// A dimension averaging strictly above this is a strength
    pub strength_cutoff: u8,
    /// A dimension averaging strictly below this is a weakness
    pub weakness_cutoff: u8,
}

impl Default for ReportPolicy {
    fn default() -> Self {
        Self {
            pass_threshold: 75,
            strength_cutoff: 80,
            weakness_cutoff: 70,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three graded dimensions, in ranking order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Logic,
    Clarity,
    Tone,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Logic, Dimension::Clarity, Dimension::Tone];

    pub fn strength_label(&self) -> &'static str {
        match self {
            Dimension::Logic => "Well-structured, logical reasoning",
            Dimension::Clarity => "Clear and concise communication",
            Dimension::Tone => "Confident, professional tone",
        }
    }

    pub fn weakness_label(&self) -> &'static str {
        match self {
            Dimension::Logic => "Structuring answers logically",
            Dimension::Clarity => "Communicating clearly and concisely",
            Dimension::Tone => "Projecting a confident tone",
        }
    }

    fn score(&self, feedback: &Feedback) -> u8 {
        match self {
            Dimension::Logic => feedback.logic.score,
            Dimension::Clarity => feedback.clarity.score,
            Dimension::Tone => feedback.vocal_tone.score,
        }
    }
}

pub const GENERIC_STRENGTH: &str = "Shows growth potential";
pub const GENERIC_WEAKNESS: &str = "Room for improvement across all areas";

/// Aggregated scores for a session with at least one valid feedback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCard {
    pub avg_logic: u8,
    pub avg_clarity: u8,
    pub avg_tone: u8,
    pub overall_score: u8,
    pub verdict: Verdict,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    /// Drives the recommended follow-up practice
    pub primary_weakness: String,
    pub valid_entries: usize,
    pub total_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// Every entry carried a feedback error
    InsufficientData { total_entries: usize },
    Scored(ReportCard),
}

impl Report {
    pub fn card(&self) -> Option<&ReportCard> {
        match self {
            Report::Scored(card) => Some(card),
            Report::InsufficientData { .. } => None,
        }
    }
}

fn round_half_up(value: f64) -> u8 {
    (value + 0.5).floor().clamp(0.0, 100.0) as u8
}

fn valid_feedback(entries: &[AnswerFeedback]) -> Vec<&Feedback> {
    entries.iter().filter_map(|e| e.feedback.valid()).collect()
}

/// Grade a session's answers.
pub fn aggregate(entries: &[AnswerFeedback], policy: &ReportPolicy) -> Report {
    let valid = valid_feedback(entries);
    if valid.is_empty() {
        return Report::InsufficientData {
            total_entries: entries.len(),
        };
    }

    let average = |dimension: Dimension| {
        let sum: f64 = valid.iter().map(|f| dimension.score(f) as f64).sum();
        round_half_up(sum / valid.len() as f64)
    };
    let avg_logic = average(Dimension::Logic);
    let avg_clarity = average(Dimension::Clarity);
    let avg_tone = average(Dimension::Tone);
    let averages = [avg_logic, avg_clarity, avg_tone];

    let overall_score =
        round_half_up((avg_logic as f64 + avg_clarity as f64 + avg_tone as f64) / 3.0);
    let verdict = if overall_score >= policy.pass_threshold {
        Verdict::Pass
    } else {
        Verdict::Fail
    };

    let mut strengths: Vec<String> = Dimension::ALL
        .iter()
        .zip(averages)
        .filter(|(_, avg)| *avg > policy.strength_cutoff)
        .map(|(d, _)| d.strength_label().to_string())
        .collect();
    if strengths.is_empty() {
        strengths.push(GENERIC_STRENGTH.to_string());
    }

    let mut weaknesses: Vec<String> = Dimension::ALL
        .iter()
        .zip(averages)
        .filter(|(_, avg)| *avg < policy.weakness_cutoff)
        .map(|(d, _)| d.weakness_label().to_string())
        .collect();
    if weaknesses.is_empty() {
        weaknesses.push(GENERIC_WEAKNESS.to_string());
    }
    let primary_weakness = weaknesses[0].clone();

    Report::Scored(ReportCard {
        avg_logic,
        avg_clarity,
        avg_tone,
        overall_score,
        verdict,
        strengths,
        weaknesses,
        primary_weakness,
        valid_entries: valid.len(),
        total_entries: entries.len(),
    })
}

/// The score stored with a session log: the mean of each valid entry's
/// three-score average. `None` when nothing is worth saving.
pub fn session_score(entries: &[AnswerFeedback]) -> Option<u8> {
    let valid = valid_feedback(entries);
    if valid.is_empty() {
        return None;
    }
    let sum: f64 = valid.iter().map(|f| f.mean_score()).sum();
    Some(round_half_up(sum / valid.len() as f64))
}
