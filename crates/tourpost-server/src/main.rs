mod backends;
mod cli;
mod config;
mod http;
mod reload;
mod serve;

use clap::Parser;
use cli::{Cli, Commands};
use config::TourpostConfig;
use std::sync::Arc;
use tourpost_core::{Agenda, AgendaStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let load = || -> anyhow::Result<TourpostConfig> {
        let mut config = TourpostConfig::load_or_default(&cli.config)?;
        if let Some(agenda) = &cli.agenda {
            config.server.agenda_path = agenda.clone();
        }
        Ok(config)
    };

    match cli.command {
        Commands::Serve => serve::run(load()?).await,
        Commands::Resolve(args) => {
            let config = load()?;
            let agenda = Agenda::load(&config.server.agenda_path)?;
            cli::resolve::run(args, &agenda, &config)
        }
        Commands::Post(args) => {
            let config = load()?;
            let store = Arc::new(AgendaStore::open(&config.server.agenda_path)?);
            cli::post::run(args, store, &config).await
        }
        Commands::Agenda(cmd) => cli::agenda::run(cmd, &load()?.server.agenda_path),
        // Reads the file itself so parse errors are reported, not propagated.
        Commands::Config(cmd) => cli::config_cmd::run(cmd, &cli.config),
    }
}
