use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the commons binary.
#[derive(Debug, Parser)]
#[command(name = "commons", version, about = "Commons posts maintenance tool")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "COMMONS_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the posts visible to a caller.
    Posts(PostsArgs),
    /// Archive a site's commons into a TOML document.
    Export(ExportArgs),
    /// Merge a TOML archive into a site's commons.
    Merge(MergeArgs),
}

impl Command {
    pub fn overrides(&self) -> &CommonOverrides {
        match self {
            Command::Posts(args) => &args.overrides,
            Command::Export(args) => &args.overrides,
            Command::Merge(args) => &args.overrides,
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct CommonOverrides {
    /// Override the data file used for storage.
    #[arg(long = "data-file", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub data_file: Option<PathBuf>,

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

    /// Toggle the post list cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct PostsArgs {
    #[command(flatten)]
    pub overrides: CommonOverrides,

    /// Site the request is made in.
    #[arg(long, value_name = "SITE")]
    pub site: String,

    /// Commons to read; defaults to the site's own commons.
    #[arg(long, value_name = "COMMONS")]
    pub commons: Option<String>,

    /// Identity of the caller.
    #[arg(long, value_name = "USER")]
    pub caller: String,

    /// Read the caller's personal feed instead of a commons.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub personal: bool,

    /// Print posts as JSON.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub overrides: CommonOverrides,

    /// Site whose commons is archived.
    #[arg(long, value_name = "SITE")]
    pub site: String,

    /// Path to the archive file to write.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct MergeArgs {
    #[command(flatten)]
    pub overrides: CommonOverrides,

    /// Site receiving the archived posts.
    #[arg(long, value_name = "SITE")]
    pub site: String,

    /// Path to the archive to merge.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}
