pub mod agenda;
pub mod config_cmd;
pub mod post;
pub mod resolve;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tourpost")]
#[command(version, about = "Conference social posts anchored to the session you are in")]
pub struct Cli {
    /// Path to tourpost.toml
    #[arg(
        long,
        global = true,
        env = "TOURPOST_CONFIG",
        default_value = "tourpost.toml"
    )]
    pub config: PathBuf,

    /// Path to the agenda file (overrides config file)
    #[arg(long, global = true, env = "TOURPOST_AGENDA")]
    pub agenda: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API
    Serve,
    /// Decide which session is current at a given time
    Resolve(ResolveArgs),
    /// Generate one post with the configured model
    Post(PostArgs),
    /// Agenda commands
    #[command(subcommand)]
    Agenda(AgendaCommands),
    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Local time, e.g. "13:45 EDT" or "1:45 PM". Defaults to now at the event.
    #[arg(long)]
    pub time: Option<String>,
    /// Free-text post to scan for named topics and sessions
    #[arg(long)]
    pub post: Option<String>,
    /// Explicitly mentioned topic or session (repeatable)
    #[arg(long = "topic")]
    pub topics: Vec<String>,
    #[arg(long, default_value = "attendee")]
    pub role: String,
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct PostArgs {
    /// What the user wants to say
    #[arg(long)]
    pub post: String,
    #[arg(long, default_value = "attendee")]
    pub role: String,
    #[arg(long, default_value = "LinkedIn")]
    pub site: String,
    /// Local time; defaults to now at the event
    #[arg(long)]
    pub time: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum AgendaCommands {
    /// Load and validate the agenda file
    Validate,
    /// List sessions, optionally only those running at a time
    List(AgendaListArgs),
}

#[derive(Args, Debug)]
pub struct AgendaListArgs {
    #[arg(long)]
    pub at: Option<String>,
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    Validate,
    Show,
}
