use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, info};
use view_mux::{Multiplexer, Stream};

use crate::config::{CONSOLE_VIEW, LOGS_VIEW};
use crate::server::SharedValue;

pub const PROMPT: &str = "Enter command ('logs' for logs, 'exit' to exit):";
pub const VALUE_PROMPT: &str = "Enter new value:";

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `logs`: show the HTTP request log.
    ShowLogs,
    /// `set`: read the next line as the new served value.
    Set,
    /// `exit`: stop reading input.
    Exit,
    /// `view <name>`: switch to any registered view.
    View(String),
    /// Anything else returns to the console view.
    Console,
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input {
            "logs" => Command::ShowLogs,
            "set" => Command::Set,
            "exit" => Command::Exit,
            _ => match input.strip_prefix("view ") {
                Some(name) if !name.trim().is_empty() => Command::View(name.trim().to_string()),
                _ => Command::Console,
            },
        }
    }
}

/// How [`Console::run`] finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operator typed `exit`.
    Exit,
    /// Input reached its end; other producers may keep running.
    InputClosed,
}

/// Reads operator commands and drives view switches.
///
/// Prompts are written to the console stream, so they only show up while
/// the console view is active. Whether they come back after a switch
/// depends on that stream's history capacity.
pub struct Console {
    mux: Arc<Multiplexer>,
    stream: Stream,
    value: SharedValue,
}

impl Console {
    pub fn new(mux: Arc<Multiplexer>, stream: Stream, value: SharedValue) -> Self {
        Self { mux, stream, value }
    }

    /// Process commands until `exit` or end of input.
    ///
    /// # Errors
    ///
    /// Fails if reading input fails or the console stream stops accepting writes.
    pub async fn run<R>(&self, input: R) -> Result<Outcome>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        loop {
            self.prompt(PROMPT)?;
            let Some(line) = next_line(&mut lines).await? else {
                info!("Operator input closed");
                return Ok(Outcome::InputClosed);
            };

            let command = Command::parse(&line);
            debug!(?command, "Console command");
            match command {
                Command::ShowLogs => {
                    self.mux.set_view(LOGS_VIEW).await;
                }
                Command::Set => {
                    self.prompt(VALUE_PROMPT)?;
                    let Some(value) = next_line(&mut lines).await? else {
                        info!("Operator input closed");
                        return Ok(Outcome::InputClosed);
                    };
                    self.value.set(value).await;
                    info!("Served value updated from console");
                }
                Command::Exit => {
                    info!("Exit requested");
                    return Ok(Outcome::Exit);
                }
                Command::View(name) => {
                    self.mux.set_view(&name).await;
                }
                Command::Console => {
                    self.mux.set_view(CONSOLE_VIEW).await;
                }
            }
        }
    }

    fn prompt(&self, text: &str) -> Result<()> {
        self.stream
            .log(&format!("{}\n", text))
            .context("Console stream stopped accepting writes")?;
        Ok(())
    }
}

async fn next_line<R>(lines: &mut Lines<R>) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    lines.next_line().await.context("Failed to read operator input")
}
