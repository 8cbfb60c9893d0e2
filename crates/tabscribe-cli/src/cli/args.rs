use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tabscribe",
    version,
    about = "Resumable conversion of tabular datasets into text with chat-completion models"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,

    /// log filter, e.g. "info" or "tabscribe_core=debug" (defaults to $TABSCRIBE_LOG, then info)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert the selected datasets, resuming where earlier runs stopped
    Run(RunArgs),
    /// Report per-unit progress from the stored artifacts without calling the service
    Status(StatusArgs),
    /// List the known dataset ids
    List(ConfigArgs),
    /// Write the built-in dataset registry to a file
    Init(InitArgs),
    Version,
}

#[derive(clap::Args, Clone)]
pub struct ConfigArgs {
    /// dataset registry (YAML); the built-in registry is used when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// reject unknown keys in the registry
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// dataset ids to process, in order (default: all)
    #[arg(long, num_args = 1..)]
    pub tasks: Vec<String>,

    #[arg(long, value_enum, default_value_t = Provider::Openai)]
    pub provider: Provider,

    /// credentials file with api_key / organization / base_url
    #[arg(long, default_value = "openai_key.yaml")]
    pub key_file: PathBuf,

    /// seconds added to the wait after each failed attempt (default: $TABSCRIBE_BACKOFF_SECS or 60)
    #[arg(long)]
    pub backoff_secs: Option<u64>,

    /// give up on a row after this many transient failures (default: never)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// per-request timeout in seconds (default: $TABSCRIBE_REQUEST_TIMEOUT_SECS or 600)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// also retry rows previously skipped as too large
    #[arg(long)]
    pub retry_skipped: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Openai,
    /// offline echo client, for dry runs
    Dummy,
}

#[derive(Parser, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[arg(long, num_args = 1..)]
    pub tasks: Vec<String>,
}

#[derive(Parser, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "datasets.yaml")]
    pub config: PathBuf,

    /// overwrite an existing file
    #[arg(long)]
    pub force: bool,
}
