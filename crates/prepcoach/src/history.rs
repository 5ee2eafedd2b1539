use anyhow::{Context, Result};
use colored::Colorize;

use prepcoach_core::{ReportPolicy, SessionLog};
use prepcoach_db::{Database, SessionLogRecord};

use crate::render::{print_logs_table, print_report, record_title};

pub fn list(db: &Database, owner: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let records = db
        .session_logs()
        .list(owner, limit)
        .context("Failed to load session history")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!(
            "{}",
            "No practice sessions yet. Run `prepcoach practice` to start one.".dimmed()
        );
    } else {
        print_logs_table(&records);
    }

    Ok(())
}

pub fn show(
    db: &Database,
    owner: &str,
    id: Option<String>,
    json: bool,
    policy: &ReportPolicy,
) -> Result<()> {
    let record = match id {
        Some(id) => db
            .session_logs()
            .get(&id)
            .context("Failed to load session log")?
            .filter(|record| record.owner == owner)
            .with_context(|| format!("Session log not found: {}", id))?,
        None => pick_log(db, owner)?,
    };

    let log = SessionLog::from_record(&record).context("Stored session log is corrupt")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&log)?);
    } else {
        print_report(&log, policy);
    }

    Ok(())
}

/// Interactive picker over the owner's logs, newest first.
pub fn pick_log(db: &Database, owner: &str) -> Result<SessionLogRecord> {
    let mut records = db
        .session_logs()
        .list(owner, None)
        .context("Failed to load session history")?;
    if records.is_empty() {
        anyhow::bail!("No practice sessions found.");
    }

    let items: Vec<String> = records.iter().map(picker_label).collect();

    let selection = dialoguer::FuzzySelect::new()
        .with_prompt("Select a session")
        .items(&items)
        .default(0)
        .interact()?;

    Ok(records.swap_remove(selection))
}

pub fn picker_label(record: &SessionLogRecord) -> String {
    format!(
        "{} | {:>3} | {}",
        record.created_at.format("%Y-%m-%d %H:%M"),
        record.overall_score,
        record_title(record)
    )
}
