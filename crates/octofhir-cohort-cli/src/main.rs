use anyhow::Result;
use clap::Parser;

use octofhir_cohort_cli::cli::{Cli, Commands};
use octofhir_cohort_cli::config::loader::load_config;
use octofhir_cohort_cli::output::print_error;
use octofhir_cohort_cli::{commands, observability};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    observability::init_tracing("warn");

    let mut cfg = load_config(cli.config.as_deref()).map_err(anyhow::Error::msg)?;
    if let Some(url) = &cli.fhir_url {
        cfg.fhir.base_url = url.clone();
        cfg.validate().map_err(anyhow::Error::msg)?;
    }
    observability::apply_logging_level(&cfg.logging.level).map_err(anyhow::Error::msg)?;
    tracing::debug!(config = ?cfg, "configuration loaded");

    let format = cli.format.unwrap_or_default();
    match &cli.command {
        Commands::Resolve(args) => commands::resolve(&cfg, args, format).await?,
        Commands::Translate(args) => commands::translate(&cfg, args, format).await?,
        Commands::Execute(args) => commands::execute(&cfg, args, format).await?,
    }
    Ok(())
}
