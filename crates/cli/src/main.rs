//! Propscribe CLI - Database migrations and profile administration.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! propscribe migrate
//!
//! # Inspect a profile
//! propscribe profile show -u <user-id>
//!
//! # Add free credits (support refunds, promotions)
//! propscribe profile grant-credits -u <user-id> -c 5
//!
//! # Override the subscription status
//! propscribe profile set-status -u <user-id> -s canceled
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `profile` - Inspect and adjust user profiles

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "propscribe")]
#[command(author, version, about = "Propscribe CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect and adjust user profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show credits and subscription state
    Show {
        /// Identity-provider user id
        #[arg(short, long)]
        user: String,
    },
    /// Add credits to a profile
    GrantCredits {
        #[arg(short, long)]
        user: String,

        /// Number of credits to add (must be positive)
        #[arg(short, long)]
        credits: i32,
    },
    /// Override the subscription status (`none`, `active`, `canceled`)
    SetStatus {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        status: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Profile { action } => match action {
            ProfileAction::Show { user } => commands::profile::show(&user).await?,
            ProfileAction::GrantCredits { user, credits } => {
                commands::profile::grant_credits(&user, credits).await?;
            }
            ProfileAction::SetStatus { user, status } => {
                commands::profile::set_status(&user, &status).await?;
            }
        },
    }
    Ok(())
}
