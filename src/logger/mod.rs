//! Logging bootstrap via tracing-subscriber.
//!
//! [`setup`] builds a [`LogHandle`] from resolved [`Settings`]:
//!
//! - a console sink on stderr, always present, coloured on a terminal;
//! - a file sink under `settings.log_dir`: JSON lines in production,
//!   readable text with source locations when `debug` is set.
//!
//! Each sink writes through its own `tracing_appender` worker thread, so
//! concurrent emitters never interleave partial lines. Nothing is installed
//! globally until [`LogHandle::install`] is called; keep the handle alive for
//! as long as events should reach the sinks.

pub mod format;
pub mod panic_hook;
pub mod rolling;
pub mod severity;

use std::{
    fmt,
    io::{self, IsTerminal, Write},
    path::{Path, PathBuf},
};

use tracing::{Dispatch, level_filters::LevelFilter};
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::{Layer, Registry, layer::SubscriberExt};

use crate::{config::Settings, error::AppError};

pub use format::{ConsoleFormat, JsonFormat, TextFormat};
pub use rolling::{RotatingFile, RotationPolicy};
pub use severity::Severity;

/// File name prefix of every log file: `app_{date}.{ext}`.
pub const FILE_PREFIX: &str = "app";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Shape of the file sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// One JSON object per line (`.jsonl`).
    Json,
    /// Human-readable lines (`.log`).
    Text,
}

impl FileFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            FileFormat::Json => "jsonl",
            FileFormat::Text => "log",
        }
    }
}

/// File sink configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSink {
    pub dir: PathBuf,
    pub format: FileFormat,
    pub level: LevelFilter,
    pub policy: RotationPolicy,
}

impl FileSink {
    /// JSON lines at `level`, with the production rotation policy.
    pub fn production(dir: impl Into<PathBuf>, level: LevelFilter) -> Self {
        Self {
            dir: dir.into(),
            format: FileFormat::Json,
            level,
            policy: RotationPolicy::production(),
        }
    }

    /// Text lines at `debug` or more verbose, with the development rotation policy.
    pub fn development(dir: impl Into<PathBuf>, level: LevelFilter) -> Self {
        Self {
            dir: dir.into(),
            format: FileFormat::Text,
            level: level.max(LevelFilter::DEBUG),
            policy: RotationPolicy::development(),
        }
    }
}

/// Builder for a [`LogHandle`]. Most callers want [`setup`].
pub struct LoggerBuilder {
    level: LevelFilter,
    console: Box<dyn Write + Send>,
    ansi: bool,
    file: Option<FileSink>,
}

impl LoggerBuilder {
    /// Console-only logger on stderr at `level`.
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level,
            console: Box::new(io::stderr()),
            ansi: io::stderr().is_terminal(),
            file: None,
        }
    }

    /// Console level and file sink shape derived from the settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let level = settings.effective_level();
        let sink = if settings.debug {
            FileSink::development(&settings.log_dir, level)
        } else {
            FileSink::production(&settings.log_dir, level)
        };
        Self::new(level).file(sink)
    }

    /// Send console output somewhere other than stderr. Disables colour.
    pub fn console_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.console = Box::new(writer);
        self.ansi = false;
        self
    }

    pub fn ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    pub fn file(mut self, sink: FileSink) -> Self {
        self.file = Some(sink);
        self
    }

    /// Build the sinks. A file sink that cannot be opened is left out and
    /// its error kept in the handle; the console sink is always built.
    pub fn build(self) -> LogHandle {
        let mut guards = Vec::with_capacity(2);
        let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);

        let (console, guard) = NonBlockingBuilder::default()
            .lossy(false)
            .thread_name("runlog-console")
            .finish(self.console);
        guards.push(guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(console)
                .with_ansi(self.ansi)
                .event_format(ConsoleFormat)
                .with_filter(self.level)
                .boxed(),
        );

        let mut log_file = None;
        let mut file_error = None;
        if let Some(sink) = self.file {
            match RotatingFile::open(&sink.dir, FILE_PREFIX, sink.format.extension(), sink.policy) {
                Ok(file) => {
                    log_file = Some(file.path());
                    let (writer, guard) = NonBlockingBuilder::default()
                        .lossy(false)
                        .thread_name("runlog-file")
                        .finish(file);
                    guards.push(guard);
                    let layer = tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false);
                    layers.push(match sink.format {
                        FileFormat::Json => layer.event_format(JsonFormat).with_filter(sink.level).boxed(),
                        FileFormat::Text => layer.event_format(TextFormat).with_filter(sink.level).boxed(),
                    });
                }
                Err(e) => file_error = Some(e),
            }
        }

        LogHandle {
            dispatch: Dispatch::new(tracing_subscriber::registry().with(layers)),
            level: self.level,
            log_file,
            file_error,
            _guards: guards,
        }
    }
}

/// Configured logging subsystem. Dropping it flushes and stops the sink writers.
#[must_use = "dropping the handle stops the log writers"]
pub struct LogHandle {
    dispatch: Dispatch,
    level: LevelFilter,
    log_file: Option<PathBuf>,
    file_error: Option<AppError>,
    _guards: Vec<WorkerGuard>,
}

impl LogHandle {
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `f` with this handle as the current thread's subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Make this handle the process-wide subscriber. Only one install succeeds.
    pub fn install(&self) -> Result<(), AppError> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
    }

    /// Console threshold.
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// File opened by the file sink at setup, if it came up.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Why the file sink is missing, if it is.
    pub fn file_sink_error(&self) -> Option<&AppError> {
        self.file_error.as_ref()
    }
}

impl fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogHandle")
            .field("level", &self.level)
            .field("log_file", &self.log_file)
            .field("file_error", &self.file_error)
            .finish_non_exhaustive()
    }
}

/// Build the logging handle for `settings`.
pub fn setup(settings: &Settings) -> LogHandle {
    LoggerBuilder::from_settings(settings).build()
}

/// Parse a log level string into a [`LevelFilter`], returning an error on
/// unrecognised values.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}
