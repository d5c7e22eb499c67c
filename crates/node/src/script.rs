//! The command language of `chord-run`.
//!
//! One command per line, tokens separated by whitespace:
//!
//! ```text
//! Time 1000
//! 10 InsertVNode A
//! 3 Insert foo bar
//! Time 500
//! 7 Retrieve foo
//! quit
//! ```
//!
//! `Time <delta>` moves the script cursor forward, `<node> <Command> [args..]` runs a command on
//! a host at the cursor, and `quit` ends the simulation at the cursor.
use std::path::Path;

use ringsim_core::swarm::Command;
use ringsim_transport::HostId;

use crate::error::Error;
use crate::error::Result;

/// One parsed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Advance the script cursor.
    Time(u64),
    Run { host: HostId, command: Command },
    Quit,
}

/// A command bound to its simulated start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledCommand {
    pub at_ms: u64,
    pub host: HostId,
    pub command: Command,
}

/// A whole script, with the cursor already applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub commands: Vec<ScheduledCommand>,
    pub quit_at: Option<u64>,
    /// Cursor after the last line.
    pub end_ms: u64,
}

fn arg<'a>(tokens: &[&'a str], index: usize, line: &str) -> Result<&'a str> {
    tokens
        .get(index)
        .copied()
        .ok_or_else(|| Error::MalformedCommand(line.to_string()))
}

/// Parse one line for a network of `hosts` hosts. Blank lines give `None`.
pub fn parse_line(line: &str, hosts: usize) -> Result<Option<Input>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(first) = tokens.first() else {
        return Ok(None);
    };
    match *first {
        "quit" => return Ok(Some(Input::Quit)),
        "Time" => {
            let delta = arg(&tokens, 1, line)?
                .parse::<u64>()
                .map_err(|_| Error::MalformedCommand(line.to_string()))?;
            return Ok(Some(Input::Time(delta)));
        }
        _ => {}
    }

    let host: HostId = first
        .parse()
        .map_err(|_| Error::MalformedCommand(line.to_string()))?;
    if host as usize >= hosts {
        return Err(Error::HostOutOfRange(host, hosts));
    }
    let name = arg(&tokens, 1, line)?;
    let command = match name {
        "InsertVNode" => Command::InsertVNode(arg(&tokens, 2, line)?.to_string()),
        "RemoveVNode" => Command::RemoveVNode(arg(&tokens, 2, line)?.to_string()),
        "Lookup" => Command::Lookup(arg(&tokens, 2, line)?.to_string()),
        "Insert" => Command::Insert(
            arg(&tokens, 2, line)?.to_string(),
            arg(&tokens, 3, line)?.to_string(),
        ),
        "Retrieve" => Command::Retrieve(arg(&tokens, 2, line)?.to_string()),
        "DumpVNodeInfo" => Command::DumpVNodeInfo(arg(&tokens, 2, line)?.to_string()),
        "DumpDHashInfo" => Command::DumpDHashInfo,
        "TraceRing" => Command::TraceRing(arg(&tokens, 2, line)?.to_string()),
        "FixFinger" => Command::FixFinger(arg(&tokens, 2, line)?.to_string()),
        "Detach" => Command::Detach,
        "ReAttach" => Command::ReAttach,
        "Crash" => Command::Crash,
        "Restart" => Command::Restart,
        other => return Err(Error::UnrecognizedCommand(other.to_string())),
    };
    Ok(Some(Input::Run { host, command }))
}

impl Script {
    /// Parse a whole script. Malformed lines are reported and skipped.
    pub fn parse(text: &str, hosts: usize) -> Self {
        let mut script = Script::default();
        let mut cursor = 0u64;
        for (no, line) in text.lines().enumerate() {
            match parse_line(line, hosts) {
                Ok(None) => {}
                Ok(Some(Input::Time(delta))) => {
                    cursor = cursor.saturating_add(delta);
                    tracing::debug!("script cursor at {} ms", cursor);
                }
                Ok(Some(Input::Run { host, command })) => {
                    tracing::debug!("adding command at {} ms: {}", cursor, line.trim());
                    script.commands.push(ScheduledCommand {
                        at_ms: cursor,
                        host,
                        command,
                    });
                }
                Ok(Some(Input::Quit)) => {
                    if script.quit_at.is_none() {
                        script.quit_at = Some(cursor);
                    }
                }
                Err(e) => tracing::warn!("script line {} dropped: {}", no + 1, e),
            }
        }
        script.end_ms = cursor;
        script
    }

    pub fn read_fs<P>(path: P, hosts: usize) -> Result<Self>
    where P: AsRef<Path> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::OpenFileError(path.display().to_string(), e.to_string()))?;
        Ok(Self::parse(&text, hosts))
    }
}
