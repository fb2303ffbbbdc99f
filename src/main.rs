mod config;
mod error;
mod log_entry;
mod log_screen;
mod session;
mod store;
mod toggle;

use anyhow::Result;
use clap::Parser;
use log::info;
use simple_logger::SimpleLogger;
use std::sync::Arc;
use tokio::io::BufReader;

use crate::config::Command;
use crate::log_screen::LogScreen;
use crate::store::{FileStore, KeyValueStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = config::Cli::parse();

    // Load configuration
    let config = config::load_config(&cli)?;

    SimpleLogger::new()
        .with_level(config.level_filter()?)
        .env()
        .init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logger: {}", e))?;

    info!("Starting timestamp-logger");

    let file_store = FileStore::new(&config.store_path);
    info!("Using store at {}", file_store.path().display());
    let store: Arc<dyn KeyValueStore> = Arc::new(file_store);

    let mut screen = LogScreen::new(store, config.default_status);
    screen.init().await;
    info!("Loaded {} entries ({:?})", screen.entries().len(), screen.state());

    let mut stdout = tokio::io::stdout();

    match cli.command.unwrap_or(Command::Interactive) {
        Command::Interactive => {
            let stdin = BufReader::new(tokio::io::stdin());
            session::run(&mut screen, stdin, stdout).await?;
        }
        Command::Tap => {
            screen.press_button();
            session::write_screen(&screen, &mut stdout).await?;
        }
        Command::List => {
            session::write_screen(&screen, &mut stdout).await?;
        }
        Command::Delete { index } => {
            screen.delete_timestamp(index);
            session::write_screen(&screen, &mut stdout).await?;
        }
        Command::Status => {
            let line = format!(
                "Next tap logs {} ({})",
                screen.current_label(),
                screen.button_caption()
            );
            session::write_line(&mut stdout, &line).await?;
        }
    }

    // Writes are fire-and-forget; let them land before the process exits
    screen.flush().await;
    info!("Stopped");

    Ok(())
}
