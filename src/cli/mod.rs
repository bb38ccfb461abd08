//! CLI definitions and command dispatch.

mod fetch;
mod show_config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use statline::Config;

#[derive(Parser, Debug)]
#[command(name = "statline", version, about = "Rate-limited, caching sports-data API client")]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.statline/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Fetch an endpoint and print the JSON payload
    Fetch {
        /// Endpoint path relative to the base URL, e.g. `players`
        endpoint: String,

        /// Query parameter as KEY=VALUE (repeatable; repeat `ids[]` for arrays)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Issue the same fetch this many times (later ones hit the cache)
        #[arg(long, default_value_t = 1)]
        repeat: u32,
    },
    /// Print the effective configuration with secrets redacted
    Config,
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the default.
pub(crate) fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("statline=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Fetch {
            endpoint,
            params,
            repeat,
        } => fetch::cmd_fetch(&config, &endpoint, params, repeat).await,
        Commands::Config => show_config::cmd_config(&config),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(p) => Config::load_from_path(p)
            .with_context(|| format!("failed to load config from {}", p.display())),
        None => Config::load().context("failed to load config"),
    }
}

fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}
