use crate::log_screen::LogScreen;
use anyhow::{Context, Result};
use log::{info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const HELP: &str = "Commands: <enter>/t = tap, d N = delete row N, l = list, q = quit";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Tap,
    Delete(usize),
    List,
    Quit,
}

pub fn parse_command(line: &str) -> Option<UserCommand> {
    let mut parts = line.split_whitespace();

    let command = match parts.next() {
        None | Some("t") | Some("tap") => UserCommand::Tap,
        Some("l") | Some("list") => UserCommand::List,
        Some("q") | Some("quit") => UserCommand::Quit,
        Some("d") | Some("delete") => {
            let index = parts.next()?.parse().ok()?;
            UserCommand::Delete(index)
        }
        Some(_) => return None,
    };

    if parts.next().is_some() {
        return None;
    }

    Some(command)
}

/// Drives the screen from `input` until quit or end of input, rendering to
/// `output` after every command. Pending writes are flushed before returning.
pub async fn run<R, W>(screen: &mut LogScreen, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_screen(screen, &mut output).await?;
    write_line(&mut output, HELP).await?;

    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        match parse_command(&line) {
            Some(UserCommand::Tap) => {
                let label = screen.press_button();
                info!("Button pressed: {}", label);
            }
            Some(UserCommand::Delete(index)) => {
                screen.delete_timestamp(index);
            }
            Some(UserCommand::List) => {}
            Some(UserCommand::Quit) => break,
            None => {
                warn!("Unrecognised command: {}", line.trim());
                write_line(&mut output, HELP).await?;
                continue;
            }
        }

        write_screen(screen, &mut output).await?;
    }

    screen.flush().await;
    Ok(())
}

pub async fn write_screen<W: AsyncWrite + Unpin>(screen: &LogScreen, output: &mut W) -> Result<()> {
    output
        .write_all(screen.render().as_bytes())
        .await
        .context("Failed to write screen")?;
    output.flush().await.context("Failed to flush output")?;
    Ok(())
}

pub async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> Result<()> {
    output
        .write_all(format!("{}\n", line).as_bytes())
        .await
        .context("Failed to write output")?;
    output.flush().await.context("Failed to flush output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_entry::Label;
    use crate::store::{MemoryStore, LOGS_KEY};
    use std::sync::Arc;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command(""), Some(UserCommand::Tap));
        assert_eq!(parse_command("  tap "), Some(UserCommand::Tap));
        assert_eq!(parse_command("d 3"), Some(UserCommand::Delete(3)));
        assert_eq!(parse_command("delete 0"), Some(UserCommand::Delete(0)));
        assert_eq!(parse_command("list"), Some(UserCommand::List));
        assert_eq!(parse_command("q"), Some(UserCommand::Quit));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert_eq!(parse_command("d"), None);
        assert_eq!(parse_command("d -1"), None);
        assert_eq!(parse_command("d 1 2"), None);
        assert_eq!(parse_command("dance"), None);
    }

    #[tokio::test]
    async fn write_line_terminates_and_flushes() {
        let mut output = Vec::new();
        write_line(&mut output, "Next tap logs Exit (Log Exit)").await.unwrap();
        assert_eq!(output, b"Next tap logs Exit (Log Exit)\n");
    }

    #[tokio::test]
    async fn session_applies_commands_in_order() {
        let store = Arc::new(MemoryStore::new());
        let mut screen = LogScreen::new(store.clone(), true);
        screen.init().await;

        let input: &[u8] = b"t\n\nbogus\nd 0\nq\nt\n";
        let mut output = Vec::new();
        run(&mut screen, input, &mut output).await.unwrap();

        let labels: Vec<Label> = screen.entries().iter().map(|e| e.label).collect();
        assert_eq!(labels, vec![Label::Exit]);
        assert!(screen.is_entry());

        let rendered = String::from_utf8(output).unwrap();
        assert!(rendered.contains(HELP));
        assert!(rendered.contains("( Log Exit )"));

        let stored = store.raw(LOGS_KEY).unwrap();
        assert!(stored.contains("Exit"));
        assert!(!stored.contains("Entry"));
    }
}
