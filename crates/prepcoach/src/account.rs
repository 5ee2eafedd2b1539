use anyhow::Result;
use colored::Colorize;
use dialoguer::{Input, Password};
use tracing::debug;

use prepcoach_db::{AuthError, Database, User};

/// The signed-in user, or an error telling the user how to sign in.
pub fn require_user(db: &Database) -> Result<User> {
    match db.accounts().current_user().map_err(auth_failure)? {
        Some(user) => Ok(user),
        None => anyhow::bail!(
            "Not signed in. Run `prepcoach login` or `prepcoach signup` first."
        ),
    }
}

fn auth_failure(error: AuthError) -> anyhow::Error {
    debug!(code = error.code(), error = %error, "Authentication failed");
    anyhow::anyhow!(error.user_message())
}

fn prompt_email(email: Option<String>) -> Result<String> {
    match email {
        Some(email) => Ok(email),
        None => Ok(Input::<String>::new().with_prompt("Email").interact_text()?),
    }
}

pub fn signup(db: &Database, email: Option<String>) -> Result<()> {
    let email = prompt_email(email)?;
    let password = Password::new()
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?;

    let user = db
        .accounts()
        .sign_up(&email, &password)
        .map_err(auth_failure)?;
    println!("{} Signed up as {}", "✓".bright_green(), user.email.bold());
    Ok(())
}

pub fn login(db: &Database, email: Option<String>) -> Result<()> {
    let email = prompt_email(email)?;
    let password = Password::new().with_prompt("Password").interact()?;

    let user = db
        .accounts()
        .sign_in(&email, &password)
        .map_err(auth_failure)?;
    println!("{} Signed in as {}", "✓".bright_green(), user.email.bold());
    Ok(())
}

pub fn login_with(db: &Database, provider: &str) -> Result<()> {
    let user = db
        .accounts()
        .sign_in_federated(provider)
        .map_err(auth_failure)?;
    println!("{} Signed in as {}", "✓".bright_green(), user.email.bold());
    Ok(())
}

pub fn logout(db: &Database) -> Result<()> {
    db.accounts().sign_out().map_err(auth_failure)?;
    println!("{}", "Signed out.".dimmed());
    Ok(())
}

pub fn whoami(db: &Database, json: bool) -> Result<()> {
    let user = db.accounts().current_user().map_err(auth_failure)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    match user {
        Some(user) => {
            println!("{}  {}", "Email:".dimmed(), user.email);
            println!("{}  {}", "User ID:".dimmed(), user.id);
            println!(
                "{}  {}",
                "Since:".dimmed(),
                user.created_at.format("%Y-%m-%d")
            );
        }
        None => println!("{}", "Not signed in.".dimmed()),
    }
    Ok(())
}
