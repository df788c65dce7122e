//! Severity table shared by every log formatter.
//!
//! `tracing` has five levels. `Success` and `Critical` ride on `INFO` and
//! `ERROR` events tagged with a `severity` field; use [`success!`] and
//! [`critical!`] to emit them.
//!
//! [`success!`]: crate::success
//! [`critical!`]: crate::critical

use console::Style;
use tracing::Level;

/// Event field that promotes an event to `Success` or `Critical`.
pub const SEVERITY_FIELD: &str = "severity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 7] = [
        Severity::Trace,
        Severity::Debug,
        Severity::Info,
        Severity::Success,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Success => "SUCCESS",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    pub const fn icon(self) -> &'static str {
        match self {
            Severity::Trace => "[..]",
            Severity::Debug => "[dbg]",
            Severity::Info => "[i]",
            Severity::Success => "[+]",
            Severity::Warning => "[!]",
            Severity::Error => "[x]",
            Severity::Critical => "[X]",
        }
    }

    /// The `tracing` level the severity is emitted at.
    pub const fn level(self) -> Level {
        match self {
            Severity::Trace => Level::TRACE,
            Severity::Debug => Level::DEBUG,
            Severity::Info | Severity::Success => Level::INFO,
            Severity::Warning => Level::WARN,
            Severity::Error | Severity::Critical => Level::ERROR,
        }
    }

    /// Console colour for the icon and level name.
    pub fn style(self) -> Style {
        let style = Style::new().force_styling(true);
        match self {
            Severity::Trace => style.cyan(),
            Severity::Debug => style.white(),
            Severity::Info => style.blue(),
            Severity::Success => style.green(),
            Severity::Warning => style.yellow(),
            Severity::Error => style.red(),
            Severity::Critical => style.red().bold(),
        }
    }

    /// Resolve the severity of an event from its level and optional tag.
    /// Unknown tags fall back to the level.
    pub fn resolve(level: &Level, tag: Option<&str>) -> Self {
        match tag {
            Some(tag) if tag.eq_ignore_ascii_case("success") => Severity::Success,
            Some(tag) if tag.eq_ignore_ascii_case("critical") => Severity::Critical,
            _ => Self::from(*level),
        }
    }
}

impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        match level {
            Level::TRACE => Severity::Trace,
            Level::DEBUG => Severity::Debug,
            Level::INFO => Severity::Info,
            Level::WARN => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// Emit an `INFO` event rendered as `SUCCESS`.
#[macro_export]
macro_rules! success {
    ($($arg:tt)+) => {
        $crate::tracing::info!(severity = "success", $($arg)+)
    };
}

/// Emit an `ERROR` event rendered as `CRITICAL`.
#[macro_export]
macro_rules! critical {
    ($($arg:tt)+) => {
        $crate::tracing::error!(severity = "critical", $($arg)+)
    };
}
