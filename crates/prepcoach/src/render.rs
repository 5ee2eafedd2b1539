//! Terminal rendering for the practice screens and stored logs.

use colored::Colorize;

use prepcoach_coach::{Briefing, Feedback, FeedbackOutcome, Question};
use prepcoach_core::{aggregate, Notice, Report, ReportPolicy, SessionLog, Verdict};
use prepcoach_db::SessionLogRecord;

pub fn print_notice(notice: &Notice) {
    if notice.is_error() {
        eprintln!("  {} {}", "✗".bright_red(), notice.message.bright_red());
    } else {
        eprintln!("  {} {}", "ℹ".bright_blue(), notice.message);
    }
}

pub fn print_briefing(company: &str, role: &str, briefing: &Briefing) {
    println!();
    println!(
        "{}",
        format!("=== {} @ {} ===", role, company).bright_blue().bold()
    );
    println!("{}", "Company:".dimmed());
    println!("  {}", briefing.company_summary);
    println!("{}", "Industry Trends:".dimmed());
    for trend in &briefing.industry_trends {
        println!("  • {}", trend);
    }
    println!("{}", "Culture:".dimmed());
    println!("  {}", briefing.company_culture);
    println!("{}  {}", "Recommended Tone:".dimmed(), briefing.recommended_tone);
    println!();
}

pub fn print_question(index: usize, total: usize, question: &Question) {
    println!();
    println!(
        "{} {}",
        format!("[{}/{}]", index + 1, total).bright_blue(),
        format!("({})", question.kind).dimmed()
    );
    println!("  {}", question.text.bold());
}

fn score_colored(score: u8) -> String {
    let text = score.to_string();
    match score {
        80..=100 => text.bright_green().to_string(),
        70..=79 => text.bright_yellow().to_string(),
        _ => text.bright_red().to_string(),
    }
}

pub fn print_feedback(feedback: &Feedback) {
    println!();
    for (label, scored) in [
        ("Logic:", &feedback.logic),
        ("Clarity:", &feedback.clarity),
        ("Tone:", &feedback.vocal_tone),
    ] {
        println!(
            "  {:<9} {:>3}  {}",
            label.dimmed(),
            score_colored(scored.score),
            scored.comment
        );
    }
    println!("  {}", "Better example:".dimmed());
    println!("    {}", feedback.better_example);
}

pub fn print_report(log: &SessionLog, policy: &ReportPolicy) {
    println!();
    println!("{}", "=== Report ===".bright_blue().bold());
    println!("{}  {}", "Session:".dimmed(), log.title());
    println!(
        "{}  {}",
        "Date:".dimmed(),
        log.created_at.format("%Y-%m-%d %H:%M UTC")
    );

    match aggregate(&log.entries, policy) {
        Report::InsufficientData { total_entries } => {
            println!();
            println!(
                "{}",
                format!(
                    "Not enough data: none of the {} answer(s) received feedback.",
                    total_entries
                )
                .bright_yellow()
            );
        }
        Report::Scored(card) => {
            let verdict = match card.verdict {
                Verdict::Pass => card.verdict.as_str().bright_green().bold(),
                Verdict::Fail => card.verdict.as_str().bright_red().bold(),
            };
            println!(
                "{}  {} ({})",
                "Overall:".dimmed(),
                score_colored(card.overall_score),
                verdict
            );
            println!(
                "{}  logic {}  clarity {}  tone {}",
                "Averages:".dimmed(),
                score_colored(card.avg_logic),
                score_colored(card.avg_clarity),
                score_colored(card.avg_tone)
            );
            if card.valid_entries < card.total_entries {
                println!(
                    "{}",
                    format!(
                        "({} of {} answers scored)",
                        card.valid_entries, card.total_entries
                    )
                    .dimmed()
                );
            }
            println!("{}", "Strengths:".dimmed());
            for strength in &card.strengths {
                println!("  {} {}", "+".bright_green(), strength);
            }
            println!("{}", "To work on:".dimmed());
            for weakness in &card.weaknesses {
                println!("  {} {}", "-".bright_red(), weakness);
            }
        }
    }

    if !log.entries.is_empty() {
        println!();
        println!(
            "{}",
            format!("--- Answers ({}) ---", log.entries.len()).dimmed()
        );
        for (i, entry) in log.entries.iter().enumerate() {
            println!();
            println!("  {} {}", format!("[{}]", i + 1).bright_blue(), entry.question);
            println!("    {} {}", "Answer:".dimmed(), preview(&entry.answer, 160));
            match &entry.feedback {
                FeedbackOutcome::Valid(feedback) => println!(
                    "    {} logic {} / clarity {} / tone {}",
                    "Scores:".dimmed(),
                    feedback.logic.score,
                    feedback.clarity.score,
                    feedback.vocal_tone.score
                ),
                FeedbackOutcome::Error { error } => {
                    println!("    {} {}", "Feedback failed:".dimmed(), error.bright_red())
                }
            }
        }
    }
    println!();
}

pub fn print_logs_table(records: &[SessionLogRecord]) {
    println!(
        "{:<18} {:<6} {:<12} {}",
        "DATE".dimmed(),
        "SCORE".dimmed(),
        "KIND".dimmed(),
        "SESSION".dimmed(),
    );

    for record in records {
        let kind = if record.recommended {
            "recommended".bright_magenta().to_string()
        } else {
            "practice".to_string()
        };
        println!(
            "{:<18} {:<6} {:<12} {}",
            record.created_at.format("%Y-%m-%d %H:%M"),
            score_colored(record.overall_score),
            kind,
            record_title(record)
        );
    }
}

pub fn record_title(record: &SessionLogRecord) -> String {
    match (&record.company, &record.role) {
        (Some(company), Some(role)) => format!("{} @ {}", role, company),
        _ if record.recommended => "Recommended practice".to_string(),
        _ => "Practice session".to_string(),
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
