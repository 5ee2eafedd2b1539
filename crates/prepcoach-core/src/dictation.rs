//! Folding a speech-capture stream into an answer draft.

use crate::notice::Notice;

/// One event from a speech-capture device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictationEvent {
    /// A provisional fragment that later events may replace
    Interim(String),
    Final(String),
    PermissionDenied,
    Failed(String),
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictationStatus {
    Listening,
    Stopped,
    PermissionDenied,
    Failed(String),
}

/// Accumulated dictation text for the current answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    committed: String,
    interim: String,
    status: DictationStatus,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::with_text("")
    }

    /// Start dictating after text the user already typed
    pub fn with_text(text: &str) -> Self {
        Self {
            committed: text.trim().to_string(),
            interim: String::new(),
            status: DictationStatus::Listening,
        }
    }

    /// Apply an event. Returns a notice when capture stopped abnormally or
    /// ended without any text.
    pub fn apply(&mut self, event: DictationEvent) -> Option<Notice> {
        if self.status != DictationStatus::Listening {
            return None;
        }

        match event {
            DictationEvent::Interim(fragment) => {
                self.interim = fragment.trim().to_string();
                None
            }
            DictationEvent::Final(fragment) => {
                self.interim.clear();
                let fragment = fragment.trim();
                if !fragment.is_empty() {
                    if !self.committed.is_empty() {
                        self.committed.push(' ');
                    }
                    self.committed.push_str(fragment);
                }
                None
            }
            DictationEvent::PermissionDenied => {
                self.interim.clear();
                self.status = DictationStatus::PermissionDenied;
                Some(Notice::failure(
                    "Microphone access was denied. Allow microphone access or type your answer.",
                ))
            }
            DictationEvent::Failed(reason) => {
                self.interim.clear();
                self.status = DictationStatus::Failed(reason.clone());
                Some(Notice::failure(format!("Dictation stopped: {}", reason)))
            }
            DictationEvent::Ended => {
                // Whatever was still provisional is kept
                let interim = std::mem::take(&mut self.interim);
                self.apply(DictationEvent::Final(interim));
                self.status = DictationStatus::Stopped;
                self.committed
                    .is_empty()
                    .then(|| Notice::info("No speech was captured. Type your answer instead."))
            }
        }
    }

    /// Committed text plus any provisional fragment
    pub fn text(&self) -> String {
        match (self.committed.is_empty(), self.interim.is_empty()) {
            (_, true) => self.committed.clone(),
            (true, false) => self.interim.clone(),
            (false, false) => format!("{} {}", self.committed, self.interim),
        }
    }

    pub fn status(&self) -> &DictationStatus {
        &self.status
    }

    pub fn is_listening(&self) -> bool {
        self.status == DictationStatus::Listening
    }
}
