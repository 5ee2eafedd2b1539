//! The practice session as an explicit state record and a pure reducer.
//!
//! Every external call is requested as an [`Effect`] tagged with the
//! session generation it was issued under. Its outcome comes back as a
//! result [`Event`] carrying the same tag; results from an earlier
//! generation (a session that has since been restarted) are dropped.

use prepcoach_coach::{
    AnswerFeedback, Briefing, FeedbackOutcome, Question, MAX_QUESTIONS, MIN_QUESTIONS,
};
use serde::{Deserialize, Serialize};

use crate::notice::Notice;
use crate::session_log::SessionLog;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    #[default]
    Home,
    Briefing,
    Practice,
    Report,
}

/// The one external call a session may have outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingCall {
    PrepareSession,
    Feedback,
    Recommended,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Bumped on every restart
    pub generation: u64,
    pub screen: Screen,
    pub company: Option<String>,
    pub role: Option<String>,
    pub recommended: bool,
    pub briefing: Option<Briefing>,
    pub questions: Vec<Question>,
    pub current_index: usize,
    /// Answered questions of the running session, in question order
    pub log: Vec<AnswerFeedback>,
    pub answer_draft: String,
    pub current_feedback: Option<FeedbackOutcome>,
    pub notice: Option<Notice>,
    /// The log shown on the report screen
    pub report_log: Option<SessionLog>,
    pub pending: Option<PendingCall>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User actions
    Start {
        company: String,
        role: String,
        question_count: usize,
    },
    StartPractice,
    AnswerChanged(String),
    SubmitAnswer,
    NextQuestion,
    PracticeRecommended {
        weakness: String,
    },
    Restart,
    ViewLog(SessionLog),

    // Results of effects
    SessionPrepared {
        generation: u64,
        briefing: Briefing,
        questions: Vec<Question>,
    },
    SessionPrepFailed {
        generation: u64,
        error: String,
    },
    FeedbackReady {
        generation: u64,
        question_index: usize,
        outcome: FeedbackOutcome,
    },
    RecommendedReady {
        generation: u64,
        questions: Vec<Question>,
    },
    RecommendedFailed {
        generation: u64,
        error: String,
    },
    LogSaved {
        generation: u64,
        id: String,
    },
    LogSaveFailed {
        generation: u64,
        error: String,
    },
}

impl Event {
    /// The generation a result event was issued under; `None` for user actions
    pub fn generation(&self) -> Option<u64> {
        match self {
            Event::SessionPrepared { generation, .. }
            | Event::SessionPrepFailed { generation, .. }
            | Event::FeedbackReady { generation, .. }
            | Event::RecommendedReady { generation, .. }
            | Event::RecommendedFailed { generation, .. }
            | Event::LogSaved { generation, .. }
            | Event::LogSaveFailed { generation, .. } => Some(*generation),
            _ => None,
        }
    }
}

/// External work requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Generate the briefing, then the questions
    PrepareSession {
        generation: u64,
        company: String,
        role: String,
        question_count: usize,
    },
    RequestFeedback {
        generation: u64,
        question_index: usize,
        question: String,
        answer: String,
    },
    /// Fire-and-forget persistence of a finished session
    SaveLog { generation: u64, log: SessionLog },
    GenerateRecommended { generation: u64, weakness: String },
}

impl Effect {
    /// Generation the effect was issued under; its result carries the same tag.
    pub fn generation(&self) -> u64 {
        match self {
            Effect::PrepareSession { generation, .. }
            | Effect::RequestFeedback { generation, .. }
            | Effect::SaveLog { generation, .. }
            | Effect::GenerateRecommended { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: SessionState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(state: SessionState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    fn with(state: SessionState, effect: Effect) -> Self {
        Self {
            state,
            effects: vec![effect],
        }
    }
}

/// Apply one event. Events that are not valid for the current state
/// leave it untouched.
pub fn reduce(state: SessionState, event: Event) -> Transition {
    if let Some(generation) = event.generation() {
        if generation != state.generation {
            return Transition::to(state);
        }
    }

    match event {
        Event::Restart => Transition::to(SessionState {
            generation: state.generation + 1,
            ..SessionState::default()
        }),

        Event::Start {
            company,
            role,
            question_count,
        } => start(state, company, role, question_count),

        Event::SessionPrepared {
            briefing,
            questions,
            ..
        } => {
            if state.pending != Some(PendingCall::PrepareSession) {
                return Transition::to(state);
            }
            if questions.is_empty() {
                return Transition::to(SessionState {
                    company: None,
                    role: None,
                    pending: None,
                    notice: Some(Notice::failure(
                        "Could not prepare your session: no questions were generated",
                    )),
                    ..state
                });
            }
            Transition::to(SessionState {
                screen: Screen::Briefing,
                briefing: Some(briefing),
                questions,
                current_index: 0,
                pending: None,
                notice: None,
                ..state
            })
        }

        Event::SessionPrepFailed { error, .. } => {
            if state.pending != Some(PendingCall::PrepareSession) {
                return Transition::to(state);
            }
            Transition::to(SessionState {
                company: None,
                role: None,
                pending: None,
                notice: Some(Notice::failure(format!(
                    "Could not prepare your session: {}",
                    error
                ))),
                ..state
            })
        }

        Event::StartPractice => {
            if state.screen != Screen::Briefing || state.is_busy() || state.questions.is_empty()
            {
                return Transition::to(state);
            }
            Transition::to(SessionState {
                screen: Screen::Practice,
                current_index: 0,
                notice: None,
                ..state
            })
        }

        Event::AnswerChanged(text) => {
            if state.screen != Screen::Practice
                || state.is_busy()
                || state.current_feedback.is_some()
            {
                return Transition::to(state);
            }
            Transition::to(SessionState {
                answer_draft: text,
                ..state
            })
        }

        Event::SubmitAnswer => submit_answer(state),

        Event::FeedbackReady {
            question_index,
            outcome,
            ..
        } => {
            if state.pending != Some(PendingCall::Feedback) || question_index != state.current_index
            {
                return Transition::to(state);
            }
            let Some(question) = state.current_question() else {
                return Transition::to(state);
            };
            let entry = AnswerFeedback {
                question: question.text.clone(),
                answer: state.answer_draft.trim().to_string(),
                feedback: outcome.clone(),
            };
            let notice = match &outcome {
                FeedbackOutcome::Error { error } => Some(Notice::failure(format!(
                    "Could not get feedback for this answer: {}",
                    error
                ))),
                FeedbackOutcome::Valid(_) => None,
            };
            let mut log = state.log;
            log.push(entry);
            Transition::to(SessionState {
                log,
                current_feedback: Some(outcome),
                notice,
                pending: None,
                ..state
            })
        }

        Event::NextQuestion => next_question(state),

        Event::PracticeRecommended { weakness } => {
            let weakness = weakness.trim().to_string();
            if state.screen != Screen::Report || state.is_busy() || weakness.is_empty() {
                return Transition::to(state);
            }
            let generation = state.generation;
            Transition::with(
                SessionState {
                    pending: Some(PendingCall::Recommended),
                    notice: None,
                    ..state
                },
                Effect::GenerateRecommended {
                    generation,
                    weakness,
                },
            )
        }

        Event::RecommendedReady { questions, .. } => {
            if state.pending != Some(PendingCall::Recommended) {
                return Transition::to(state);
            }
            if questions.is_empty() {
                return Transition::to(SessionState {
                    pending: None,
                    notice: Some(Notice::failure(
                        "Could not build recommended practice: no questions were generated",
                    )),
                    ..state
                });
            }
            Transition::to(SessionState {
                generation: state.generation,
                screen: Screen::Practice,
                recommended: true,
                questions,
                ..SessionState::default()
            })
        }

        Event::RecommendedFailed { error, .. } => {
            if state.pending != Some(PendingCall::Recommended) {
                return Transition::to(state);
            }
            Transition::to(SessionState {
                pending: None,
                notice: Some(Notice::failure(format!(
                    "Could not build recommended practice: {}",
                    error
                ))),
                ..state
            })
        }

        Event::LogSaved { id, .. } => {
            let mut state = state;
            if let Some(log) = state.report_log.as_mut() {
                if log.id.is_none() {
                    log.id = Some(id);
                }
            }
            Transition::to(state)
        }

        // Logged by the driver; never surfaced
        Event::LogSaveFailed { .. } => Transition::to(state),

        Event::ViewLog(log) => {
            if state.screen != Screen::Home || state.is_busy() {
                return Transition::to(state);
            }
            Transition::to(SessionState {
                screen: Screen::Report,
                report_log: Some(log),
                notice: None,
                ..state
            })
        }
    }
}

fn start(state: SessionState, company: String, role: String, question_count: usize) -> Transition {
    if state.screen != Screen::Home || state.is_busy() {
        return Transition::to(state);
    }

    let company = company.trim().to_string();
    let role = role.trim().to_string();
    let problem = if company.is_empty() || role.is_empty() {
        Some("Please enter both a company and a role.".to_string())
    } else if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&question_count) {
        Some(format!(
            "Choose between {} and {} questions.",
            MIN_QUESTIONS, MAX_QUESTIONS
        ))
    } else {
        None
    };
    if let Some(message) = problem {
        return Transition::to(SessionState {
            notice: Some(Notice::validation(message)),
            ..state
        });
    }

    let generation = state.generation;
    Transition::with(
        SessionState {
            company: Some(company.clone()),
            role: Some(role.clone()),
            recommended: false,
            pending: Some(PendingCall::PrepareSession),
            notice: None,
            ..state
        },
        Effect::PrepareSession {
            generation,
            company,
            role,
            question_count,
        },
    )
}

fn submit_answer(state: SessionState) -> Transition {
    if state.screen != Screen::Practice || state.is_busy() || state.current_feedback.is_some() {
        return Transition::to(state);
    }
    let answer = state.answer_draft.trim().to_string();
    if answer.is_empty() {
        return Transition::to(SessionState {
            notice: Some(Notice::validation("Please provide an answer first.")),
            ..state
        });
    }
    let Some(question) = state.current_question().map(|q| q.text.clone()) else {
        return Transition::to(state);
    };

    let effect = Effect::RequestFeedback {
        generation: state.generation,
        question_index: state.current_index,
        question,
        answer,
    };
    Transition::with(
        SessionState {
            pending: Some(PendingCall::Feedback),
            notice: None,
            ..state
        },
        effect,
    )
}

fn next_question(state: SessionState) -> Transition {
    if state.screen != Screen::Practice || state.is_busy() || state.current_feedback.is_none() {
        return Transition::to(state);
    }

    if !state.is_last_question() {
        return Transition::to(SessionState {
            current_index: state.current_index + 1,
            answer_draft: String::new(),
            current_feedback: None,
            notice: None,
            ..state
        });
    }

    let log = SessionLog::new(
        state.company.clone(),
        state.role.clone(),
        state.recommended,
        state.log.clone(),
    );
    let effects = if log.is_saveable() {
        vec![Effect::SaveLog {
            generation: state.generation,
            log: log.clone(),
        }]
    } else {
        Vec::new()
    };

    Transition {
        state: SessionState {
            screen: Screen::Report,
            answer_draft: String::new(),
            current_feedback: None,
            notice: None,
            report_log: Some(log),
            ..state
        },
        effects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prepcoach_coach::{Feedback, QuestionKind, ScoredComment};

    fn briefing() -> Briefing {
        Briefing {
            company_summary: "Acme makes anvils.".into(),
            industry_trends: vec!["Automation".into()],
            company_culture: "Direct.".into(),
            recommended_tone: "Calm".into(),
        }
    }

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question::new(QuestionKind::Basic, format!("Question {}", i + 1)))
            .collect()
    }

    fn feedback(score: u8) -> FeedbackOutcome {
        FeedbackOutcome::Valid(Feedback {
            logic: ScoredComment::new(score, "l"),
            clarity: ScoredComment::new(score, "c"),
            vocal_tone: ScoredComment::new(score, "t"),
            better_example: "Example".into(),
        })
    }

    fn apply(state: SessionState, event: Event) -> SessionState {
        reduce(state, event).state
    }

    fn start_event(n: usize) -> Event {
        Event::Start {
            company: "Acme".into(),
            role: "Engineer".into(),
            question_count: n,
        }
    }

    /// A session on the practice screen with `n` questions
    fn practicing(n: usize) -> SessionState {
        let state = apply(SessionState::new(), start_event(n));
        let state = apply(
            state,
            Event::SessionPrepared {
                generation: 0,
                briefing: briefing(),
                questions: questions(n),
            },
        );
        apply(state, Event::StartPractice)
    }

    fn answer(state: SessionState, outcome: FeedbackOutcome) -> SessionState {
        let state = apply(state, Event::AnswerChanged("My answer".into()));
        let index = state.current_index;
        let generation = state.generation;
        let state = apply(state, Event::SubmitAnswer);
        apply(
            state,
            Event::FeedbackReady {
                generation,
                question_index: index,
                outcome,
            },
        )
    }

    #[test]
    fn test_start_validation_keeps_state() {
        for (company, role, n) in [("", "Engineer", 3), ("Acme", "  ", 3), ("Acme", "Eng", 7)] {
            let transition = reduce(
                SessionState::new(),
                Event::Start {
                    company: company.into(),
                    role: role.into(),
                    question_count: n,
                },
            );
            assert!(transition.effects.is_empty());
            assert_eq!(transition.state.screen, Screen::Home);
            assert!(transition.state.pending.is_none());
            assert_eq!(
                transition.state.notice.unwrap().kind,
                crate::NoticeKind::Validation
            );
        }
    }

    #[test]
    fn test_empty_question_list_fails_preparation() {
        let state = apply(SessionState::new(), start_event(2));
        let state = apply(
            state,
            Event::SessionPrepared {
                generation: 0,
                briefing: briefing(),
                questions: Vec::new(),
            },
        );
        assert_eq!(state.screen, Screen::Home);
        assert!(state.briefing.is_none());
        assert!(state.pending.is_none());
        assert!(state.notice.as_ref().unwrap().is_error());
    }

    #[test]
    fn test_empty_recommended_list_stays_on_report() {
        let state = answer(practicing(1), feedback(60));
        let state = apply(state, Event::NextQuestion);
        let state = apply(
            state,
            Event::PracticeRecommended {
                weakness: "Clarity".into(),
            },
        );
        let state = apply(
            state,
            Event::RecommendedReady {
                generation: 0,
                questions: Vec::new(),
            },
        );
        assert_eq!(state.screen, Screen::Report);
        assert!(!state.recommended);
        assert!(state.report_log.is_some());
        assert!(state.pending.is_none());
        assert!(state.notice.as_ref().unwrap().is_error());
    }

    #[test]
    fn test_start_requests_preparation() {
        let transition = reduce(SessionState::new(), start_event(4));
        assert_eq!(
            transition.effects,
            vec![Effect::PrepareSession {
                generation: 0,
                company: "Acme".into(),
                role: "Engineer".into(),
                question_count: 4,
            }]
        );
        assert_eq!(transition.state.pending, Some(PendingCall::PrepareSession));

        // Control is disabled while the call is outstanding
        let again = reduce(transition.state, start_event(4));
        assert!(again.effects.is_empty());
    }

    #[test]
    fn test_prep_failure_stays_home() {
        let state = apply(SessionState::new(), start_event(3));
        let state = apply(
            state,
            Event::SessionPrepFailed {
                generation: 0,
                error: "server unavailable".into(),
            },
        );
        assert_eq!(state.screen, Screen::Home);
        assert!(state.pending.is_none());
        assert!(state.company.is_none());
        assert!(state.notice.unwrap().is_error());
    }

    #[test]
    fn test_practice_loop_to_report_saves_log() {
        let state = practicing(2);
        assert_eq!(state.screen, Screen::Practice);

        let state = answer(state, feedback(80));
        assert_eq!(state.log.len(), 1);
        assert!(state.current_feedback.is_some());

        let state = apply(state, Event::NextQuestion);
        assert_eq!(state.current_index, 1);
        assert!(state.answer_draft.is_empty());
        assert!(state.current_feedback.is_none());

        let state = answer(state, feedback(60));
        let transition = reduce(state, Event::NextQuestion);
        assert_eq!(transition.state.screen, Screen::Report);

        let log = transition.state.report_log.clone().unwrap();
        assert_eq!(log.entries.len(), 2);
        assert_eq!(log.entries[1].question, "Question 2");
        assert_eq!(log.overall_score, Some(70));
        assert!(matches!(transition.effects.as_slice(), [Effect::SaveLog { .. }]));

        let state = apply(
            transition.state,
            Event::LogSaved {
                generation: 0,
                id: "log-1".into(),
            },
        );
        assert_eq!(state.report_log.unwrap().id.as_deref(), Some("log-1"));
    }

    #[test]
    fn test_feedback_failure_degrades_and_is_not_saved() {
        let state = answer(practicing(1), FeedbackOutcome::error("HTTP 500"));
        assert!(state.log[0].feedback.is_error());
        assert_eq!(state.notice.as_ref().unwrap().kind, crate::NoticeKind::Failure);

        let transition = reduce(state, Event::NextQuestion);
        assert_eq!(transition.state.screen, Screen::Report);
        assert!(transition.effects.is_empty());
        assert!(!transition.state.report_log.unwrap().is_saveable());
    }

    #[test]
    fn test_submit_requires_answer_and_next_requires_feedback() {
        let state = practicing(2);
        let transition = reduce(state, Event::SubmitAnswer);
        assert!(transition.effects.is_empty());
        assert_eq!(
            transition.state.notice.as_ref().unwrap().kind,
            crate::NoticeKind::Validation
        );

        let state = apply(transition.state, Event::NextQuestion);
        assert_eq!(state.current_index, 0);
    }

    #[test]
    fn test_recommended_practice() {
        let state = answer(practicing(1), feedback(50));
        let state = apply(state, Event::NextQuestion);

        let transition = reduce(
            state,
            Event::PracticeRecommended {
                weakness: "Structuring answers logically".into(),
            },
        );
        assert!(matches!(
            transition.effects.as_slice(),
            [Effect::GenerateRecommended { .. }]
        ));

        // Failure returns to the report
        let failed = apply(
            transition.state.clone(),
            Event::RecommendedFailed {
                generation: 0,
                error: "HTTP 503".into(),
            },
        );
        assert_eq!(failed.screen, Screen::Report);
        assert!(failed.report_log.is_some());

        let state = apply(
            transition.state,
            Event::RecommendedReady {
                generation: 0,
                questions: questions(3),
            },
        );
        assert_eq!(state.screen, Screen::Practice);
        assert!(state.recommended);
        assert!(state.company.is_none());
        assert!(state.role.is_none());
        assert!(state.briefing.is_none());
        assert!(state.log.is_empty());
        assert_eq!(state.questions.len(), 3);
        assert_eq!(state.current_index, 0);
    }

    #[test]
    fn test_restart_clears_from_any_screen() {
        let home = SessionState::new();
        let briefing_screen = apply(
            apply(SessionState::new(), start_event(2)),
            Event::SessionPrepared {
                generation: 0,
                briefing: briefing(),
                questions: questions(2),
            },
        );
        let practice = answer(practicing(2), feedback(70));
        let report = apply(answer(practicing(1), feedback(70)), Event::NextQuestion);
        let pending = apply(SessionState::new(), start_event(2));

        for state in [home, briefing_screen, practice, report, pending] {
            let generation = state.generation;
            let restarted = apply(state, Event::Restart);
            assert_eq!(
                restarted,
                SessionState {
                    generation: generation + 1,
                    ..SessionState::default()
                }
            );
        }
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let state = apply(SessionState::new(), start_event(3));
        let state = apply(state, Event::Restart);
        let state = apply(state, start_event(2));
        let before = state.clone();

        // Result for the abandoned first session
        let after = apply(
            state,
            Event::SessionPrepared {
                generation: 0,
                briefing: briefing(),
                questions: questions(3),
            },
        );
        assert_eq!(after, before);

        let after = apply(
            after,
            Event::SessionPrepFailed {
                generation: 0,
                error: "late".into(),
            },
        );
        assert_eq!(after, before);

        // The current session's result still applies
        let after = apply(
            after,
            Event::SessionPrepared {
                generation: 1,
                briefing: briefing(),
                questions: questions(2),
            },
        );
        assert_eq!(after.screen, Screen::Briefing);
        assert_eq!(after.questions.len(), 2);
    }

    #[test]
    fn test_stale_feedback_after_restart() {
        let state = practicing(2);
        let state = apply(state, Event::AnswerChanged("Answer".into()));
        let state = apply(state, Event::SubmitAnswer);
        let state = apply(state, Event::Restart);
        let before = state.clone();

        let after = apply(
            state,
            Event::FeedbackReady {
                generation: 0,
                question_index: 0,
                outcome: feedback(90),
            },
        );
        assert_eq!(after, before);
        assert!(after.log.is_empty());
    }

    #[test]
    fn test_view_log_from_home() {
        let log = SessionLog::new(Some("Acme".into()), Some("Engineer".into()), false, vec![]);
        let state = apply(SessionState::new(), Event::ViewLog(log.clone()));
        assert_eq!(state.screen, Screen::Report);
        assert_eq!(state.report_log, Some(log.clone()));

        // Not from the practice screen
        let state = apply(practicing(1), Event::ViewLog(log));
        assert_eq!(state.screen, Screen::Practice);
    }
}
