//! runlog: process bootstrap for applications that write their output under a
//! single run directory.
//!
//! ```no_run
//! use runlog::{config, logger};
//!
//! fn main() -> Result<(), runlog::error::AppError> {
//!     config::load_env_file(None)?;
//!     let settings = config::load()?;
//!     settings.ensure_dirs()?;
//!
//!     let log = logger::setup(&settings);
//!     log.install()?;
//!     runlog::success!(output_dir = %settings.output_dir.display(), "ready");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logger;

#[doc(hidden)]
pub use tracing;
