//! The interactive practice flow: Home, Briefing, Practice and Report screens.

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Input, Select};

use prepcoach_ai::{Executor, HttpTransport};
use prepcoach_coach::{ContentService, FeedbackOutcome, MAX_QUESTIONS, MIN_QUESTIONS};
use prepcoach_core::{
    aggregate, DictationEvent, Event, Notice, ReportPolicy, Screen, SessionDriver, SessionLog,
    SessionState, Transcript,
};
use prepcoach_db::{Database, LogSubscription, SessionLogRecord};
use prepcoach_logging::Logger;

use crate::config::CoachConfig;
use crate::history::{pick_log, picker_label};
use crate::render::{
    print_briefing, print_feedback, print_notice, print_question, print_report,
};

const RECENT_LIMIT: usize = 5;

/// Values given on the command line for the first session
#[derive(Debug, Default)]
pub struct PracticeOptions {
    pub company: Option<String>,
    pub role: Option<String>,
    pub questions: Option<usize>,
}

impl PracticeOptions {
    fn take_start(&mut self) -> Option<Event> {
        match (&self.company, &self.role, self.questions) {
            (Some(_), Some(_), Some(_)) => {
                let company = self.company.take()?;
                let role = self.role.take()?;
                let question_count = self.questions.take()?;
                Some(Event::Start {
                    company,
                    role,
                    question_count,
                })
            }
            _ => None,
        }
    }
}

pub async fn run(
    db: Arc<Database>,
    config: &CoachConfig,
    owner: &str,
    logger: Arc<Logger>,
    mut options: PracticeOptions,
) -> Result<()> {
    let transport = HttpTransport::new(config.transport_config()?)
        .context("Failed to set up the generation endpoint")?;
    let content = ContentService::new(Executor::new(
        Arc::new(transport),
        config.retry_policy(),
    ));
    let policy = config.report_policy();
    let mut driver = SessionDriver::new(content, db.clone(), logger, owner).with_policy(policy);

    let mut recent = db.watch_logs(owner, Some(RECENT_LIMIT));
    let mut recent_logs = recent.current().context("Failed to load recent sessions")?;
    let mut shown_notice: Option<Notice> = None;

    loop {
        driver.poll_results();
        let state = driver.state();

        if state.notice != shown_notice {
            if let Some(notice) = &state.notice {
                print_notice(notice);
            }
            shown_notice = state.notice.clone();
        }

        let events = match state.screen {
            Screen::Home => {
                refresh_recent(&mut recent, &mut recent_logs);
                home_screen(&db, owner, &recent_logs, &mut options)?
            }
            Screen::Briefing => briefing_screen(state)?,
            Screen::Practice => practice_screen(state)?,
            Screen::Report => report_screen(state, &policy)?,
        };

        let Some(events) = events else {
            break;
        };
        for event in events {
            driver.dispatch(event);
        }
        wait_for_call(&mut driver).await;
    }

    Ok(())
}

/// Wait out an outstanding AI call. Ctrl-C abandons it and starts over.
async fn wait_for_call(driver: &mut SessionDriver) {
    if !driver.state().is_busy() {
        return;
    }
    eprintln!("  {}", "Working... (Ctrl-C to start over)".dimmed());

    while driver.state().is_busy() {
        let interrupted = tokio::select! {
            received = driver.next_result() => {
                if !received {
                    break;
                }
                false
            }
            _ = tokio::signal::ctrl_c() => true,
        };
        if interrupted {
            driver.dispatch(Event::Restart);
            print_notice(&Notice::info("Request abandoned. Starting over."));
        }
    }
}

fn refresh_recent(recent: &mut LogSubscription<'_>, logs: &mut Vec<SessionLogRecord>) {
    match recent.try_next() {
        Some(Ok(updated)) => *logs = updated,
        Some(Err(e)) => tracing::warn!(error = %e, "Failed to refresh recent sessions"),
        None => {}
    }
}

/// Returns `None` when the user quits.
fn home_screen(
    db: &Database,
    owner: &str,
    recent: &[SessionLogRecord],
    options: &mut PracticeOptions,
) -> Result<Option<Vec<Event>>> {
    if let Some(start) = options.take_start() {
        return Ok(Some(vec![start]));
    }

    println!();
    println!("{}", "=== prepcoach ===".bright_blue().bold());
    if recent.is_empty() {
        println!("{}", "No practice sessions yet.".dimmed());
    } else {
        println!("{}", "Recent sessions:".dimmed());
        for record in recent {
            println!("  {}", picker_label(record));
        }
    }
    println!();

    let mut items = vec!["New practice session"];
    if !recent.is_empty() {
        items.push("Review a past session");
    }
    items.push("Quit");

    let choice = Select::new()
        .with_prompt("What next?")
        .items(&items)
        .default(0)
        .interact()?;

    match items[choice] {
        "New practice session" => Ok(Some(vec![start_form(options)?])),
        "Review a past session" => {
            let record = pick_log(db, owner)?;
            let log = SessionLog::from_record(&record).context("Stored session log is corrupt")?;
            Ok(Some(vec![Event::ViewLog(log)]))
        }
        _ => Ok(None),
    }
}

fn start_form(options: &mut PracticeOptions) -> Result<Event> {
    let company: String = Input::new()
        .with_prompt("Company")
        .with_initial_text(options.company.take().unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;
    let role: String = Input::new()
        .with_prompt("Role")
        .with_initial_text(options.role.take().unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;
    let question_count: usize = Input::new()
        .with_prompt(format!(
            "Number of questions ({}-{})",
            MIN_QUESTIONS, MAX_QUESTIONS
        ))
        .default(options.questions.take().unwrap_or(3))
        .interact_text()?;

    Ok(Event::Start {
        company,
        role,
        question_count,
    })
}

fn briefing_screen(state: &SessionState) -> Result<Option<Vec<Event>>> {
    if let Some(briefing) = &state.briefing {
        print_briefing(
            state.company.as_deref().unwrap_or_default(),
            state.role.as_deref().unwrap_or_default(),
            briefing,
        );
    }

    let choice = Select::new()
        .with_prompt(format!("{} questions ready", state.questions.len()))
        .items(&["Start practice", "Start over"])
        .default(0)
        .interact()?;

    Ok(Some(vec![match choice {
        0 => Event::StartPractice,
        _ => Event::Restart,
    }]))
}

fn practice_screen(state: &SessionState) -> Result<Option<Vec<Event>>> {
    let Some(question) = state.current_question() else {
        return Ok(Some(vec![Event::Restart]));
    };

    let Some(outcome) = &state.current_feedback else {
        print_question(state.current_index, state.questions.len(), question);

        let choice = Select::new()
            .with_prompt("Your answer")
            .items(&["Type answer", "Dictate answer", "Start over"])
            .default(0)
            .interact()?;

        let answer = match choice {
            0 => Input::<String>::new()
                .with_prompt("Answer")
                .with_initial_text(state.answer_draft.clone())
                .allow_empty(true)
                .interact_text()?,
            1 => dictate(&state.answer_draft)?,
            _ => return Ok(Some(vec![Event::Restart])),
        };

        return Ok(Some(vec![Event::AnswerChanged(answer), Event::SubmitAnswer]));
    };

    match outcome {
        FeedbackOutcome::Valid(feedback) => print_feedback(feedback),
        // Already shown as a notice
        FeedbackOutcome::Error { .. } => {}
    }

    let next = if state.is_last_question() {
        "Finish and see report"
    } else {
        "Next question"
    };
    let choice = Select::new()
        .items(&[next, "Start over"])
        .default(0)
        .interact()?;

    Ok(Some(vec![match choice {
        0 => Event::NextQuestion,
        _ => Event::Restart,
    }]))
}

/// Line-based dictation: each line is a final phrase, an empty line ends.
fn dictate(draft: &str) -> Result<String> {
    eprintln!(
        "  {} Dictating. Each line is one phrase; an empty line finishes.",
        "●".bright_red()
    );

    let mut transcript = Transcript::with_text(draft);
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    while transcript.is_listening() {
        let event = match lines.next() {
            Some(Ok(line)) if line.trim().is_empty() => DictationEvent::Ended,
            Some(Ok(line)) => DictationEvent::Final(line),
            Some(Err(e)) => DictationEvent::Failed(e.to_string()),
            None => DictationEvent::Ended,
        };
        if let Some(notice) = transcript.apply(event) {
            print_notice(&notice);
        }
    }

    Ok(transcript.text())
}

fn report_screen(state: &SessionState, policy: &ReportPolicy) -> Result<Option<Vec<Event>>> {
    let Some(log) = &state.report_log else {
        return Ok(Some(vec![Event::Restart]));
    };
    print_report(log, policy);

    let weakness = aggregate(&log.entries, policy)
        .card()
        .map(|card| card.primary_weakness.clone());

    let mut items = Vec::new();
    if let Some(weakness) = &weakness {
        items.push(format!("Practice: {}", weakness));
    }
    items.push("Back to home".to_string());
    items.push("Quit".to_string());

    let choice = Select::new()
        .with_prompt("What next?")
        .items(&items)
        .default(0)
        .interact()?;

    let offset = usize::from(weakness.is_some());
    match (weakness, choice) {
        (Some(weakness), 0) => Ok(Some(vec![Event::PracticeRecommended { weakness }])),
        (_, c) if c == offset => Ok(Some(vec![Event::Restart])),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_values_start_once() {
        let mut options = PracticeOptions {
            company: Some("Acme".into()),
            role: Some("Engineer".into()),
            questions: Some(4),
        };
        assert_eq!(
            options.take_start(),
            Some(Event::Start {
                company: "Acme".into(),
                role: "Engineer".into(),
                question_count: 4,
            })
        );
        assert_eq!(options.take_start(), None);
    }

    #[test]
    fn test_partial_cli_values_do_not_start() {
        let mut options = PracticeOptions {
            company: Some("Acme".into()),
            role: None,
            questions: Some(4),
        };
        assert_eq!(options.take_start(), None);
        assert_eq!(options.company.as_deref(), Some("Acme"));
    }
}
