//! Bazaar CLI - Database migrations and account management.
//!
//! # Usage
//!
//! ```bash
//! # Run identity database migrations
//! bazaar migrate
//!
//! # Grant a role out-of-band (first admin bootstrap)
//! bazaar account set-role -e owner@example.com -r admin
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run identity database migrations
    Migrate,
    /// Manage accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
}

#[derive(Subcommand)]
enum AccountAction {
    /// Set the role of an existing account
    SetRole {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Role (`buyer`, `seller`, `admin`)
        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Migrate => commands::migrate::identity().await?,
        Commands::Account { action } => match action {
            AccountAction::SetRole { email, role } => {
                commands::account::set_role(&email, &role).await?;
            }
        },
    }
    Ok(())
}
