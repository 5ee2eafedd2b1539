mod account;
mod config;
mod history;
mod practice;
mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use prepcoach_db::Database;
use prepcoach_logging::{init_tracing, LogFormat, Logger};

use crate::config::CoachConfig;
use crate::practice::PracticeOptions;

/// Session events are appended here as JSON lines when a log directory is set
const SESSION_LOG_FILE: &str = "sessions.jsonl";

#[derive(Parser, Debug)]
#[command(
    name = "prepcoach",
    about = "Interview practice with AI feedback",
    version,
    author
)]
struct Cli {
    /// Path to a prepcoach.toml (default: ~/.config/prepcoach/prepcoach.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Diagnostic log level (overridden by RUST_LOG)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Database file (overrides [storage].database)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Write rolling diagnostic logs and session events here (overrides [logging].dir)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an interactive practice session
    Practice {
        /// Company to practice for
        #[arg(long)]
        company: Option<String>,

        /// Role to practice for
        #[arg(long)]
        role: Option<String>,

        /// Number of questions (1-6)
        #[arg(short = 'n', long)]
        questions: Option<usize>,
    },

    /// List recent practice sessions, newest first
    History {
        /// Maximum number of sessions to list
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the report for a stored session
    Show {
        /// Session log ID (launches interactive picker if omitted)
        id: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an account and sign in
    Signup {
        #[arg(long)]
        email: Option<String>,
    },

    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },

    /// Sign in with an external identity provider
    LoginWith {
        /// Provider name, e.g. google
        provider: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in account
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CoachConfig::load(cli.config.as_deref())?;

    let log_format: LogFormat = cli.log_format.into();
    let log_dir = config.log_dir(cli.log_dir.as_deref());
    if let Some(dir) = &log_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    init_tracing(&cli.log_level, log_format, log_dir.as_deref());

    let db = Arc::new(open_database(&cli, &config)?);

    match cli.command {
        Commands::Practice {
            company,
            role,
            questions,
        } => {
            let user = account::require_user(&db)?;
            let logger = Arc::new(session_logger(log_format, log_dir.as_deref())?);
            let options = PracticeOptions {
                company,
                role,
                questions,
            };
            practice::run(db, &config, &user.id, logger, options).await?;
        }
        Commands::History { limit, json } => {
            let user = account::require_user(&db)?;
            history::list(&db, &user.id, limit, json)?;
        }
        Commands::Show { id, json } => {
            let user = account::require_user(&db)?;
            history::show(&db, &user.id, id, json, &config.report_policy())?;
        }
        Commands::Signup { email } => account::signup(&db, email)?,
        Commands::Login { email } => account::login(&db, email)?,
        Commands::LoginWith { provider } => account::login_with(&db, &provider)?,
        Commands::Logout => account::logout(&db)?,
        Commands::Whoami { json } => account::whoami(&db, json)?,
    }

    Ok(())
}

fn session_logger(format: LogFormat, log_dir: Option<&Path>) -> Result<Logger> {
    match log_dir {
        Some(dir) => {
            let path = dir.join(SESSION_LOG_FILE);
            Logger::with_file(format, &path)
                .with_context(|| format!("Failed to open {}", path.display()))
        }
        None => Ok(Logger::new(format)),
    }
}

fn open_database(cli: &Cli, config: &CoachConfig) -> Result<Database> {
    let path = cli
        .database
        .clone()
        .or_else(|| config.storage.database.clone());

    match path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            Database::open_at(&path)
                .with_context(|| format!("Failed to open database at {}", path.display()))
        }
        None => Database::open().context("Failed to initialize database"),
    }
}
