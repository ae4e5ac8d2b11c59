use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use uuid::Uuid;

use storefront::api;
use storefront::api::middleware::auth::issue_token;
use storefront::config;
use storefront::db;
use storefront::utils;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server
    Serve,

    /// Run pending database migrations and exit
    Migrate,

    /// Mint a bearer token for a user id (operator convenience)
    IssueToken { user_id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    utils::logging::init_logger();

    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config()?;

    match cli.command {
        Command::Serve => {
            let pool = db::init_db_pool(&config).await?;
            db::run_migrations(&pool).await?;

            info!("Starting storefront API...");
            api::run(config, pool).await?;
        }
        Command::Migrate => {
            let pool = db::init_db_pool(&config).await?;
            db::run_migrations(&pool).await?;
            info!("Migrations complete");
        }
        Command::IssueToken { user_id } => {
            let token = issue_token(user_id, &config.jwt_secret, config.token_expiry_hours)?;
            println!("{}", token);
        }
    }

    Ok(())
}
