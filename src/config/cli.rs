use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the tidecast binary.
#[derive(Debug, Parser)]
#[command(
    name = "tidecast",
    version,
    about = "Bounded-staleness content distribution for the tourism site"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TIDECAST_CONFIG_FILE", value_name = "PATH", global = true)]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Regenerate the mobile config, manifest, raw snapshot and constants module.
    Generate(GenerateArgs),
    /// Print the aggregation index of every non-content domain.
    Index(IndexArgs),
    /// Read one page through a page cache.
    Page(PageArgs),
    /// Mount a page cache and refresh it from signal lines on stdin.
    Watch(WatchArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackendArg {
    Memory,
    Postgres,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the content store backend.
    #[arg(long = "store-backend", value_name = "BACKEND", global = true)]
    pub store_backend: Option<StoreBackendArg>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the seed file of the in-memory store.
    #[arg(long = "seed-file", value_name = "PATH", value_hint = ValueHint::FilePath, global = true)]
    pub seed_file: Option<PathBuf>,

    /// Read pages from this site's content endpoint instead of the store.
    #[arg(long = "content-base-url", value_name = "URL", global = true)]
    pub content_base_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GenerateArgs {
    /// Resolve relative artifact paths against this directory.
    #[arg(long = "output-root", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub output_root: Option<PathBuf>,

    /// Override the mobile configuration path.
    #[arg(long = "mobile-config", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub mobile_config: Option<PathBuf>,

    /// Override the web-app manifest path.
    #[arg(long = "manifest", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub manifest: Option<PathBuf>,

    /// Override the raw snapshot path.
    #[arg(long = "snapshot", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub snapshot: Option<PathBuf>,

    /// Override the constants module path.
    #[arg(long = "constants", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub constants: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct IndexArgs {
    /// Print the plain-text context block instead of JSON.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub context: bool,
}

#[derive(Debug, Args, Clone)]
pub struct PageArgs {
    /// Page to read.
    #[arg(value_name = "PAGE")]
    pub page: String,

    /// Restrict the read to one section.
    #[arg(long, value_name = "SECTION")]
    pub section: Option<String>,

    /// Resolve a single key instead of printing every block.
    #[arg(long, value_name = "KEY")]
    pub key: Option<String>,

    /// Value printed when the key has no content.
    #[arg(long, value_name = "TEXT", default_value = "", requires = "key")]
    pub fallback: String,

    /// Print the grouped form (sections with labelled fields).
    #[arg(long, action = clap::ArgAction::SetTrue, conflicts_with = "key")]
    pub grouped: bool,
}

#[derive(Debug, Args, Clone)]
pub struct WatchArgs {
    /// Page to keep fresh.
    #[arg(value_name = "PAGE")]
    pub page: String,

    /// Restrict the cache to one section.
    #[arg(long, value_name = "SECTION")]
    pub section: Option<String>,
}
