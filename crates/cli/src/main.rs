//! HocSkin CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! hocskin-cli migrate
//!
//! # Grant or revoke admin rights
//! hocskin-cli admin promote -e user@example.com
//! hocskin-cli admin demote -e user@example.com
//!
//! # Validate a recommendation catalog (built-in when no path is given)
//! hocskin-cli catalog check [path/to/catalog.json]
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "hocskin-cli")]
#[command(author, version, about = "HocSkin CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage administrators
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Recommendation catalog tools
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give an existing user admin rights
    Promote {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
    /// Remove admin rights from a user
    Demote {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Parse and validate a catalog file
    Check {
        /// Catalog JSON; the built-in catalog when omitted
        path: Option<PathBuf>,
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
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => commands::admin::set_admin(&email, true).await?,
            AdminAction::Demote { email } => commands::admin::set_admin(&email, false).await?,
        },
        Commands::Catalog { action } => match action {
            CatalogAction::Check { path } => commands::catalog::check(path.as_deref())?,
        },
    }
    Ok(())
}
