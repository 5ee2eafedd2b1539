use chrono::{DateTime, Utc};
use prepcoach_coach::AnswerFeedback;
use prepcoach_db::{NewSessionLog, SessionLogRecord};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::report::session_score;

/// One completed practice run, in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLog {
    /// Set once the log has been stored
    pub id: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub recommended: bool,
    pub entries: Vec<AnswerFeedback>,
    pub overall_score: Option<u8>,
    pub created_at: DateTime<Utc>,
}

impl SessionLog {
    pub fn new(
        company: Option<String>,
        role: Option<String>,
        recommended: bool,
        entries: Vec<AnswerFeedback>,
    ) -> Self {
        let overall_score = session_score(&entries);
        Self {
            id: None,
            company,
            role,
            recommended,
            entries,
            overall_score,
            created_at: Utc::now(),
        }
    }

    /// Whether any entry carries real feedback
    pub fn is_saveable(&self) -> bool {
        self.overall_score.is_some()
    }

    pub fn title(&self) -> String {
        match (&self.company, &self.role) {
            (Some(company), Some(role)) => format!("{} @ {}", role, company),
            (None, Some(role)) => role.clone(),
            (Some(company), None) => company.clone(),
            (None, None) if self.recommended => "Recommended practice".to_string(),
            (None, None) => "Practice session".to_string(),
        }
    }

    pub fn to_new_record(&self, owner: &str) -> Result<NewSessionLog, SessionError> {
        let overall_score = self.overall_score.ok_or(SessionError::NothingToSave)?;
        Ok(NewSessionLog {
            owner: owner.to_string(),
            company: self.company.clone(),
            role: self.role.clone(),
            recommended: self.recommended,
            entries: serde_json::to_string(&self.entries)?,
            overall_score,
            created_at: self.created_at,
        })
    }

    pub fn from_record(record: &SessionLogRecord) -> Result<Self, SessionError> {
        let entries: Vec<AnswerFeedback> = serde_json::from_str(&record.entries)?;
        Ok(Self {
            id: Some(record.id.clone()),
            company: record.company.clone(),
            role: record.role.clone(),
            recommended: record.recommended,
            entries,
            overall_score: Some(record.overall_score),
            created_at: record.created_at,
        })
    }
}
