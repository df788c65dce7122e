//! Settings resolution from the process environment.
//!
//! An optional `.env` file is merged into the environment first (variables
//! that are already set win), then `DEBUG`, `OUTPUT_DIRPATH` and `LOG_LEVEL`
//! are read into an immutable [`Settings`] value that is passed by reference
//! to whatever needs it.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use tracing::level_filters::LevelFilter;

use crate::{error::AppError, logger};

/// Output directory used when `OUTPUT_DIRPATH` is unset.
pub const DEFAULT_OUTPUT_DIR: &str = "runs";

/// Subdirectory of the output directory that holds log files.
pub const LOG_SUBDIR: &str = "logs";

/// Fully-resolved startup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Verbose diagnostics and human-readable log files when `true`.
    pub debug: bool,
    /// Root directory for everything the process writes (already expanded, no `~`).
    pub output_dir: PathBuf,
    /// `output_dir/logs`.
    pub log_dir: PathBuf,
    /// Explicit minimum level; overrides the one implied by `debug`.
    pub log_level: Option<LevelFilter>,
}

impl Settings {
    /// Minimum level for the console and production file sinks.
    pub fn effective_level(&self) -> LevelFilter {
        match self.log_level {
            Some(level) => level,
            None if self.debug => LevelFilter::DEBUG,
            None => LevelFilter::INFO,
        }
    }

    /// Replace the level override when `level` is `Some`.
    pub fn with_log_level(mut self, level: Option<LevelFilter>) -> Self {
        if level.is_some() {
            self.log_level = level;
        }
        self
    }

    /// Create the output and log directories. Safe to call repeatedly.
    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        for dir in [&self.output_dir, &self.log_dir] {
            fs::create_dir_all(dir).map_err(|e| AppError::filesystem(dir, e))?;
        }
        Ok(())
    }
}

/// Merge an env file into the process environment without overwriting
/// variables that are already set.
///
/// With `None`, `.env` is looked up from the current directory upwards and a
/// missing file is fine. An explicit `path` must exist. Returns the path that
/// was loaded, if any.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, AppError> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() && path.is_none() => Ok(None),
        Err(e) => Err(AppError::Config(format!("cannot load env file: {e}"))),
    }
}

/// Resolve settings from `DEBUG`, `OUTPUT_DIRPATH` and `LOG_LEVEL`.
pub fn load() -> Result<Settings, AppError> {
    let debug = read_var("DEBUG")?;
    let output_dir = read_var("OUTPUT_DIRPATH")?;
    let log_level = read_var("LOG_LEVEL")?;
    load_from(debug.as_deref(), output_dir.as_deref(), log_level.as_deref())
}

/// Resolve settings from raw variable values.
/// Tests pass values here instead of mutating env vars.
pub fn load_from(
    debug: Option<&str>,
    output_dir: Option<&str>,
    log_level: Option<&str>,
) -> Result<Settings, AppError> {
    let debug = match debug {
        Some(raw) => parse_bool("DEBUG", raw)?,
        None => false,
    };

    let output_dir = match output_dir {
        Some(dir) if !dir.trim().is_empty() => expand_home(dir.trim()),
        _ => PathBuf::from(DEFAULT_OUTPUT_DIR),
    };
    let log_dir = output_dir.join(LOG_SUBDIR);

    let log_level = match log_level.map(str::trim) {
        Some(level) if !level.is_empty() => Some(
            logger::parse_level(level)
                .map_err(|e| AppError::Config(format!("LOG_LEVEL: {e}")))?,
        ),
        _ => None,
    };

    Ok(Settings {
        debug,
        output_dir,
        log_dir,
        log_level,
    })
}

/// Parse a boolean literal. Only `true` and `false` are accepted (any case);
/// everything else is an error rather than a silent default.
pub fn parse_bool(name: &str, raw: &str) -> Result<bool, AppError> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(AppError::Config(format!(
            "{name} must be a boolean literal (true/false), got '{raw}'"
        )))
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

fn read_var(name: &str) -> Result<Option<String>, AppError> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(raw)) => Err(AppError::Config(format!(
            "{name} is not valid unicode: {raw:?}"
        ))),
    }
}
