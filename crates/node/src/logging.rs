//! Logging of the harness: `tracing` to stderr, plus a panic hook.
use std::fmt;
use std::panic::PanicInfo;

use backtrace::Backtrace;
use clap::ValueEnum;
use tracing::Level;
use tracing_log::LogTracer;
use tracing_subscriber::filter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

use crate::error::Error;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(val: LogLevel) -> Self {
        match val {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            x => Err(Error::InvalidLoggingLevel(x.to_string())),
        }
    }
}

/// What gets logged when the harness panics.
struct PanicReport<'a> {
    info: &'a PanicInfo<'a>,
    backtrace: Backtrace,
}

impl<'a> fmt::Display for PanicReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.info.location() {
            Some(l) => write!(
                f,
                "{}, {}:{}:{}\n\n{:?}",
                self.info,
                l.file(),
                l.line(),
                l.column(),
                self.backtrace
            ),
            None => write!(f, "{}\n\n{:?}", self.info, self.backtrace),
        }
    }
}

/// Record panics as `ERROR` events, with a backtrace.
pub fn set_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let report = PanicReport {
            info,
            backtrace: Backtrace::new(),
        };
        tracing::error!("{}", report)
    }));
}

/// Install the stderr subscriber. Events printed by the harness go to stdout, logs never do.
pub fn init_logging(level: LogLevel) {
    set_panic_hook();

    let level_filter = filter::LevelFilter::from_level(level.into());
    let subscriber = Registry::default().with(
        tracing_fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(level_filter),
    );
    // Bridge `log` records; a logger may already be set in tests.
    let _ = LogTracer::init();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
