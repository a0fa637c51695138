use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::error::{ProbeError, Result};
use crate::protocol::ClientAction;
use crate::session::RoomSession;

const MENU: &str = "1) start   2) play a card   3) leave   q) quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    Start,
    Play,
    Leave,
    Quit,
    Unknown(String),
}

impl MenuChoice {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "1" => MenuChoice::Start,
            "2" => MenuChoice::Play,
            "3" => MenuChoice::Leave,
            "q" | "Q" => MenuChoice::Quit,
            other => MenuChoice::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(ClientAction),
    Quit,
}

pub fn parse_card_value(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ProbeError::Input(format!("card value must be an integer, got {:?}", raw.trim())))
}

pub fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Ok(true),
        "n" | "no" | "false" | "0" | "" => Ok(false),
        other => Err(ProbeError::Input(format!("expected y or n, got {other:?}"))),
    }
}

/// Line-driven prompt loop over any async reader (stdin in the binary).
pub struct Console<R, W> {
    lines: Lines<R>,
    out: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, out: W) -> Self {
        Self {
            lines: input.lines(),
            out,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn say(&mut self, msg: &str) -> Result<()> {
        writeln!(self.out, "{msg}")?;
        Ok(())
    }

    pub fn print_menu(&mut self) -> Result<()> {
        self.say(MENU)
    }

    async fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.out, "{label}")?;
        self.out.flush()?;
        Ok(self.lines.next_line().await?)
    }

    /// `None` means the input ended. Bad answers go back to the menu.
    pub async fn next_command(&mut self) -> Result<Option<Command>> {
        loop {
            let Some(line) = self.prompt("> ").await? else {
                return Ok(None);
            };

            match MenuChoice::parse(&line) {
                MenuChoice::Start => return Ok(Some(Command::Send(ClientAction::Start))),
                MenuChoice::Leave => return Ok(Some(Command::Send(ClientAction::Leave))),
                MenuChoice::Quit => return Ok(Some(Command::Quit)),
                MenuChoice::Play => {
                    let Some(raw) = self.prompt("card value: ").await? else {
                        return Ok(None);
                    };
                    let value = match parse_card_value(&raw) {
                        Ok(v) => v,
                        Err(e) => {
                            self.say(&e.to_string())?;
                            continue;
                        }
                    };

                    let Some(raw) = self.prompt("is special? (y/n): ").await? else {
                        return Ok(None);
                    };
                    let is_special = match parse_flag(&raw) {
                        Ok(flag) => flag,
                        Err(e) => {
                            self.say(&e.to_string())?;
                            continue;
                        }
                    };

                    return Ok(Some(Command::Send(ClientAction::play(value, is_special))));
                }
                MenuChoice::Unknown(other) if other.is_empty() => {}
                MenuChoice::Unknown(other) => {
                    self.say(&format!("unknown choice {other:?}"))?;
                    self.print_menu()?;
                }
            }
        }
    }
}

/// Feeds console commands into the session until quit, end of input, or the
/// server hangs up. Always closes the session.
pub async fn run<R, W>(session: RoomSession, console: &mut Console<R, W>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    console.print_menu()?;

    loop {
        let command = tokio::select! {
            command = console.next_command() => command?,
            _ = session.wait_closed() => {
                tracing::info!("connection closed by server");
                None
            }
        };

        match command {
            Some(Command::Send(action)) => {
                if let Err(e) = session.send(&action).await {
                    console.say(&format!("could not send {}: {}", action.name(), e))?;
                    break;
                }
            }
            Some(Command::Quit) | None => break,
        }
    }

    session.close().await
}
