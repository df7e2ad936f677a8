//! QYVE CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! qyve migrate
//!
//! # Load the sample catalogue
//! qyve seed
//!
//! # Take two medium tees out of stock after a damaged delivery
//! qyve stock adjust --product 1 --size M --delta -2 --reason "damaged in transit"
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Insert the sample catalogue
//! - `stock adjust` - Signed stock adjustment, recorded like the admin API's

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "qyve")]
#[command(author, version, about = "QYVE CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with the sample catalogue
    Seed,
    /// Manage stock levels
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
}

#[derive(Subcommand)]
enum StockAction {
    /// Apply a signed delta to one product size
    Adjust {
        /// Product ID
        #[arg(short, long)]
        product: i64,

        /// Size label (e.g. `M`)
        #[arg(short, long)]
        size: String,

        /// Units to add (positive) or remove (negative)
        #[arg(short, long, allow_hyphen_values = true)]
        delta: i64,

        /// Why the stock changed
        #[arg(short, long)]
        reason: Option<String>,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => commands::seed::catalogue().await?,
        Commands::Stock { action } => match action {
            StockAction::Adjust {
                product,
                size,
                delta,
                reason,
            } => {
                commands::stock::adjust(product, &size, delta, reason).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_negative_delta_parses() {
        let cli = Cli::try_parse_from([
            "qyve", "stock", "adjust", "--product", "3", "--size", "M", "--delta", "-2",
        ])
        .ok();
        let Some(Cli {
            command:
                Commands::Stock {
                    action: StockAction::Adjust { product, delta, reason, .. },
                },
        }) = cli
        else {
            panic!("stock adjust did not parse");
        };
        assert_eq!(product, 3);
        assert_eq!(delta, -2);
        assert_eq!(reason, None);
    }
}
