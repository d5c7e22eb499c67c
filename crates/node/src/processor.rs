//! Event loop of the harness.
//!
//! The [Processor] owns the [Swarm] and is the only thing that touches it. Interactive lines
//! come from a reader thread over a bounded channel of capacity 1: while the loop has not taken
//! the previous line, new ones are turned away with a busy notice.
use std::io::BufRead;
use std::io::Write;
use std::time::Duration;

use ringsim_core::swarm::EventRecord;
use ringsim_core::swarm::Swarm;
use ringsim_core::swarm::SwarmBuilder;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::Config;
use crate::error::Result;
use crate::script::parse_line;
use crate::script::Input;
use crate::script::Script;

pub const BUSY_NOTICE: &str = "Simulator busy, please try again..";
pub const PROMPT: &str = "\nCommand > ";

/// Outcome of handing an interactive line to the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Accepted,
    Busy,
    Closed,
}

/// Hand `input` to the loop without waiting.
pub fn offer(tx: &mpsc::Sender<Input>, input: Input) -> Offer {
    match tx.try_send(input) {
        Ok(()) => Offer::Accepted,
        Err(TrySendError::Full(_)) => Offer::Busy,
        Err(TrySendError::Closed(_)) => Offer::Closed,
    }
}

/// Read commands from `reader` until it ends or `quit` is typed, writing prompts and notices to `out`.
pub fn read_commands<R, W>(reader: R, out: &mut W, hosts: usize, tx: mpsc::Sender<Input>) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    write!(out, "{PROMPT}")?;
    out.flush()?;
    for line in reader.lines() {
        let line = line?;
        match parse_line(&line, hosts) {
            Ok(None) => {}
            Ok(Some(Input::Quit)) => {
                // quit must get through even when the loop is busy
                let _ = tx.blocking_send(Input::Quit);
                return Ok(());
            }
            Ok(Some(Input::Time(_))) => writeln!(out, "Time only applies to scripts")?,
            Ok(Some(input)) => match offer(&tx, input) {
                Offer::Accepted => {}
                Offer::Busy => writeln!(out, "{BUSY_NOTICE}")?,
                Offer::Closed => return Ok(()),
            },
            Err(e) => writeln!(out, "{e}")?,
        }
        write!(out, "{PROMPT}")?;
        out.flush()?;
    }
    Ok(())
}

/// Spawn the stdin reader on its own thread, so a pending read never holds the runtime open.
pub fn spawn_stdin_reader(hosts: usize, tx: mpsc::Sender<Input>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        if let Err(e) = read_commands(stdin.lock(), &mut stdout, hosts, tx) {
            tracing::error!("stdin reader stopped: {}", e);
        }
    })
}

pub struct Processor {
    swarm: Swarm,
    events: mpsc::UnboundedReceiver<EventRecord>,
    poll_interval_ms: u64,
    quit_at: Option<u64>,
    end_ms: u64,
}

impl Processor {
    /// Build the network of `config` and schedule every command of `script`.
    pub fn new(config: &Config, script: Script) -> Result<Self> {
        let (tx, events) = mpsc::unbounded_channel();
        let mut swarm = SwarmBuilder::new(tx)
            .config(config.ring.clone())
            .hosts(config.nodes)
            .base_address(config.network_base)
            .port(config.port)
            .bootstrap(config.bootstrap)
            .build()?;
        tracing::info!(
            "{} nodes from {}, {} scripted commands",
            config.nodes,
            config.network_base,
            script.commands.len()
        );
        for c in script.commands {
            swarm.schedule(c.at_ms, c.host, c.command);
        }
        Ok(Self {
            swarm,
            events,
            poll_interval_ms: config.poll_interval_ms.max(1),
            quit_at: script.quit_at,
            end_ms: script.end_ms,
        })
    }

    pub fn swarm(&self) -> &Swarm {
        &self.swarm
    }

    /// Schedule an interactive command at the current simulated time.
    pub fn submit(&mut self, input: Input) {
        match input {
            Input::Run { host, command } => {
                let now = self.swarm.now();
                self.swarm.schedule(now, host, command);
            }
            Input::Quit => self.quit_at = Some(self.swarm.now()),
            Input::Time(_) => {}
        }
    }

    fn flush_events<W: Write>(&mut self, out: &mut W) -> Result<()> {
        while let Ok(record) = self.events.try_recv() {
            writeln!(out, "{record}")?;
        }
        out.flush()?;
        Ok(())
    }

    /// Drive the simulation, printing events to `out`.
    ///
    /// Without `input` the run ends at `quit`, or once the script is over and the last
    /// operations had time to time out. With `input` it goes on until `quit` or until the
    /// reader goes away. `realtime` paces one poll interval of simulated time per poll
    /// interval of wall time.
    pub async fn run<W: Write>(
        &mut self,
        mut input: Option<mpsc::Receiver<Input>>,
        out: &mut W,
        realtime: bool,
    ) -> Result<()> {
        if input.is_none() && self.quit_at.is_none() {
            let settle = self.swarm.config().operation_timeout_ms;
            self.quit_at = Some(self.end_ms.saturating_add(settle));
        }
        let mut ticker = tokio::time::interval(Duration::from_millis(self.poll_interval_ms));

        loop {
            if realtime {
                ticker.tick().await;
            } else {
                tokio::task::yield_now().await;
            }

            let received = input.as_mut().map(|rx| rx.try_recv());
            match received {
                Some(Ok(line)) => self.submit(line),
                Some(Err(TryRecvError::Disconnected)) => {
                    tracing::debug!("command reader closed");
                    input = None;
                    if self.quit_at.is_none() {
                        self.quit_at = Some(self.swarm.now());
                    }
                }
                Some(Err(TryRecvError::Empty)) | None => {}
            }

            let mut until = self.swarm.now().saturating_add(self.poll_interval_ms);
            if let Some(quit_at) = self.quit_at {
                until = until.min(quit_at.max(self.swarm.now()));
            }
            self.swarm.run_until(until);
            self.flush_events(out)?;

            if self.quit_at.is_some_and(|q| self.swarm.now() >= q) {
                tracing::info!("simulation stopped at {} ms", self.swarm.now());
                return Ok(());
            }
        }
    }
}
