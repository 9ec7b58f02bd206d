mod inspect;
mod pipeline;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "shelfwatch")]
#[command(about = "Marketplace product price extraction and report history")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search the marketplace, extract product records and append a report
    Run {
        /// Search term; several words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        term: Vec<String>,
        /// Lower price bound; unparseable values mean no bound
        #[arg(long)]
        min: Option<String>,
        /// Upper price bound; unparseable values mean no bound
        #[arg(long)]
        max: Option<String>,
    },
    /// Print the most recent product history rows (requires `DATABASE_URL`)
    History {
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },
    /// Print the most recent report of a named history
    Report { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = shelfwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Run { term, min, max }) => {
            let term = term.join(" ");
            let mut pipeline = pipeline::Pipeline::from_config(&config).await?;
            let records =
                pipeline::run_extraction(&mut pipeline, &term, min.as_deref(), max.as_deref())
                    .await?;
            inspect::print_records(&config.scrape.currency, &records);
        }
        Some(Commands::History { limit }) => inspect::history(&config, limit).await?,
        Some(Commands::Report { name }) => inspect::report(&config, &name)?,
        None => println!("shelfwatch: run `shelfwatch --help` for commands"),
    }

    Ok(())
}
