use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for a practice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    SessionStarted {
        generation: u64,
        company: String,
        role: String,
        question_count: usize,
    },
    SessionPrepared {
        generation: u64,
        questions: usize,
        industry_trends: usize,
    },
    SessionPrepFailed {
        generation: u64,
        error: String,
    },
    FeedbackReceived {
        question_index: usize,
        logic: u8,
        clarity: u8,
        vocal_tone: u8,
    },
    FeedbackFailed {
        question_index: usize,
        error: String,
    },
    LogSaved {
        log_id: String,
        overall_score: u8,
    },
    LogSaveFailed {
        error: String,
    },
    /// A finished session had no valid feedback and was not persisted
    LogSkipped {
        entries: usize,
    },
    ReportReady {
        overall_score: Option<u8>,
        verdict: Option<String>,
    },
    RecommendedRequested {
        generation: u64,
        weakness: String,
    },
    RecommendedFailed {
        generation: u64,
        error: String,
    },
    StaleResultDiscarded {
        result_generation: u64,
        current_generation: u64,
    },
    SessionRestarted {
        generation: u64,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for session events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    quiet: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            quiet: false,
            file_writer: None,
        }
    }

    /// A logger that writes nothing to the console
    pub fn quiet() -> Self {
        Self {
            format: LogFormat::Compact,
            quiet: true,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            quiet: false,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if self.quiet {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::SessionStarted {
                company,
                role,
                question_count,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} Preparing {} interview at {} ({} questions)",
                    "▶".bright_cyan(),
                    role.bold(),
                    company.bold(),
                    question_count
                );
            }
            LogEvent::SessionPrepFailed { error, .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} Could not prepare session: {}",
                    "✗".bright_red(),
                    error.bright_red()
                );
            }
            LogEvent::FeedbackFailed {
                question_index,
                error,
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Feedback for question {} failed: {}",
                    "✗".bright_red(),
                    question_index + 1,
                    error.dimmed()
                );
            }
            LogEvent::LogSaved { overall_score, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} Session saved (score {})",
                    "✓".bright_green(),
                    overall_score
                );
            }
            LogEvent::LogSaveFailed { error } => {
                let _ = writeln!(
                    stderr,
                    "    {} {}",
                    "⚠".bright_yellow(),
                    format!("Session could not be saved: {}", error).dimmed()
                );
            }
            LogEvent::RecommendedRequested { weakness, .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} Building practice for: {}",
                    "▶".bright_magenta(),
                    weakness.bold()
                );
            }
            LogEvent::RecommendedFailed { error, .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} Could not build recommended practice: {}",
                    "✗".bright_red(),
                    error.bright_red()
                );
            }
            // Rendered by the screens themselves or debug-only
            LogEvent::SessionPrepared { .. }
            | LogEvent::FeedbackReceived { .. }
            | LogEvent::LogSkipped { .. }
            | LogEvent::ReportReady { .. }
            | LogEvent::StaleResultDiscarded { .. }
            | LogEvent::SessionRestarted { .. } => {}
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::SessionStarted {
                generation,
                question_count,
                ..
            } => format!("[{}] session:start:{} n={}", timestamp, generation, question_count),
            LogEvent::SessionPrepared {
                generation,
                questions,
                ..
            } => format!("[{}] session:ready:{} n={}", timestamp, generation, questions),
            LogEvent::SessionPrepFailed { generation, error } => {
                format!("[{}] session:fail:{} {}", timestamp, generation, error)
            }
            LogEvent::FeedbackReceived {
                question_index,
                logic,
                clarity,
                vocal_tone,
            } => format!(
                "[{}] feedback:{} l={} c={} t={}",
                timestamp,
                question_index + 1,
                logic,
                clarity,
                vocal_tone
            ),
            LogEvent::FeedbackFailed {
                question_index,
                error,
            } => format!("[{}] feedback:fail:{} {}", timestamp, question_index + 1, error),
            LogEvent::LogSaved {
                log_id,
                overall_score,
            } => format!("[{}] log:saved:{} score={}", timestamp, log_id, overall_score),
            LogEvent::LogSaveFailed { error } => format!("[{}] log:fail {}", timestamp, error),
            LogEvent::LogSkipped { entries } => {
                format!("[{}] log:skip entries={}", timestamp, entries)
            }
            LogEvent::ReportReady {
                overall_score,
                verdict,
            } => format!(
                "[{}] report score={} verdict={}",
                timestamp,
                overall_score.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                verdict.as_deref().unwrap_or("-")
            ),
            LogEvent::RecommendedRequested {
                generation,
                weakness,
            } => format!("[{}] recommend:{} {}", timestamp, generation, weakness),
            LogEvent::RecommendedFailed { generation, error } => {
                format!("[{}] recommend:fail:{} {}", timestamp, generation, error)
            }
            LogEvent::StaleResultDiscarded {
                result_generation,
                current_generation,
            } => format!(
                "[{}] stale:{}<{}",
                timestamp, result_generation, current_generation
            ),
            LogEvent::SessionRestarted { generation } => {
                format!("[{}] restart:{}", timestamp, generation)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }
}
