use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "timestamp-logger", version, about)]
pub struct Cli {
    /// Path to configuration file
    #[clap(long, default_value = "./config.toml")]
    pub config: PathBuf,

    /// Override storage file path
    #[clap(long)]
    pub store: Option<PathBuf>,

    /// Override log level (error, warn, info, debug, trace)
    #[clap(long)]
    pub log_level: Option<String>,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Drive the screen from stdin, one command per line
    Interactive,
    /// Log an Entry or Exit, whichever the button currently shows
    Tap,
    /// Print the screen
    List,
    /// Delete the row at INDEX
    Delete { index: usize },
    /// Print the current Entry/Exit mode
    Status,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub store_path: PathBuf,
    /// Toggle value used when nothing is stored yet
    pub default_status: bool,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("./timestamp-logger.json"),
            default_status: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn level_filter(&self) -> Result<LevelFilter> {
        self.log_level
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid log level: {}", self.log_level))
    }
}

/// Reads the config file if it exists, then applies CLI overrides.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if cli.config.exists() {
        let config_content = fs::read_to_string(&cli.config)
            .with_context(|| format!("Failed to read config file: {:?}", cli.config))?;

        toml::from_str(&config_content).context("Failed to parse config file")?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(ref store) = cli.store {
        config.store_path = store.clone();
    }

    if let Some(ref log_level) = cli.log_level {
        config.log_level = log_level.clone();
    }

    Ok(config)
}
