//! Atelier CLI - database migrations and admin allow-list management.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! atelier-cli migrate
//!
//! # Allow an identity-provider user into the admin API
//! atelier-cli admin grant -e curator@atelier.shop -i user_2f8k1
//!
//! # Remove them again
//! atelier-cli admin revoke -e curator@atelier.shop
//!
//! # Show the allow-list
//! atelier-cli admin list
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "atelier-cli")]
#[command(author, version, about = "Atelier CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the admin allow-list
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Add an identity-provider user to the allow-list
    Grant {
        /// Admin email address (must match the identity provider exactly)
        #[arg(short, long)]
        email: String,

        /// User ID at the identity provider
        #[arg(short, long)]
        identity_id: String,
    },
    /// Remove an admin from the allow-list
    Revoke {
        /// Admin email address
        #[arg(short, long)]
        email: String,
    },
    /// List allow-listed admins
    List,
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
        Commands::Admin { action } => match action {
            AdminAction::Grant { email, identity_id } => {
                commands::admin::grant(&email, &identity_id).await?;
            }
            AdminAction::Revoke { email } => commands::admin::revoke(&email).await?,
            AdminAction::List => commands::admin::list().await?,
        },
    }
    Ok(())
}
