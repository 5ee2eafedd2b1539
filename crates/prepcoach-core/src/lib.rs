mod dictation;
mod driver;
mod error;
mod notice;
mod report;
mod session_log;
mod state;

pub use dictation::{DictationEvent, DictationStatus, Transcript};
pub use driver::SessionDriver;
pub use error::SessionError;
pub use notice::{Notice, NoticeKind, NoticeLevel};
pub use report::{
    aggregate, session_score, Dimension, Report, ReportCard, ReportPolicy, Verdict,
    GENERIC_STRENGTH, GENERIC_WEAKNESS,
};
pub use session_log::SessionLog;
pub use state::{reduce, Effect, Event, PendingCall, Screen, SessionState, Transition};
