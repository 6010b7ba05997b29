use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the edgeblock binary.
#[derive(Debug, Parser)]
#[command(
    name = "edgeblock",
    version,
    about = "Signed SSI fragments for deferred block rendering"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "EDGEBLOCK_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the fragment render service.
    Serve(Box<ServeArgs>),
    /// Print the SSI include directive for a block.
    Include(FragmentArgs),
    /// Print the bare token for a block.
    Sign(FragmentArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SsiOverrides {
    /// Override the path prefix of the render endpoint.
    #[arg(long = "ssi-route-prefix", value_name = "PATH")]
    pub route_prefix: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub ssi: SsiOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the `Cache-Control` header sent with rendered fragments.
    #[arg(long = "ssi-render-cache-control", value_name = "VALUE")]
    pub render_cache_control: Option<String>,

    /// Override the block catalog file.
    #[arg(
        long = "blocks-catalog",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub blocks_catalog: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct FragmentArgs {
    #[command(flatten)]
    pub ssi: SsiOverrides,

    /// Identifier of the block to include.
    #[arg(long = "block-id", value_name = "ID")]
    pub block_id: String,

    /// Revision marker of the block.
    #[arg(long = "updated-at", value_name = "TIMESTAMP")]
    pub updated_at: String,
}
