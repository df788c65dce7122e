//! runlog: bootstrap demo entry point.
//!
//! Startup sequence:
//!   1. Parse CLI flags
//!   2. Load .env (if present)
//!   3. Resolve settings from the environment
//!   4. Create the output directories
//!   5. Build the logging handle and install it globally
//!   6. Emit one event per severity and exit

use runlog::{config, critical, error::AppError, logger, success};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, trace, warn};

struct CliArgs {
    env_file: Option<String>,
    log_level: Option<LevelFilter>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let args = parse_cli_args()?;

    let env_file = config::load_env_file(args.env_file.as_deref().map(std::path::Path::new))?;
    let settings = config::load()?.with_log_level(args.log_level);
    settings.ensure_dirs()?;

    let log = logger::setup(&settings);
    log.install()?;
    logger::panic_hook::install();

    if let Some(e) = log.file_sink_error() {
        error!(error = %e, "file sink unavailable, logging to console only");
    }

    info!(
        debug = settings.debug,
        output_dir = %settings.output_dir.display(),
        log_file = ?log.log_file(),
        env_file = ?env_file,
        level = %log.level(),
        "settings resolved"
    );

    trace!("trace events are shown with LOG_LEVEL=trace or -vvv");
    debug!("debug events are shown when DEBUG=true");
    info!("informational event");
    success!("bootstrap complete");
    warn!("warning event");
    error!("error event");
    critical!("critical event");

    Ok(())
}

fn parse_cli_args() -> Result<CliArgs, AppError> {
    let mut verbosity = 0u8;
    let mut env_file = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: runlog [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -e, --env-file <PATH>      Env file to load (default: .env if present)");
                println!("  -v, -vv, -vvv              Raise console verbosity to info, debug, trace");
                println!();
                println!("Environment:");
                println!("  DEBUG                      true/false, verbose text logs when true");
                println!("  OUTPUT_DIRPATH             output directory (default: runs)");
                println!("  LOG_LEVEL                  error|warn|info|debug|trace|off");
                std::process::exit(0);
            }
            "-e" | "--env-file" => match iter.next() {
                Some(path) => env_file = Some(path),
                None => {
                    return Err(AppError::Config(
                        "-e/--env-file requires a path argument".into(),
                    ));
                }
            },
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            other => {
                return Err(AppError::Config(format!("unrecognised argument '{other}'")));
            }
        }
    }

    let log_level = match verbosity {
        0 => None,
        1 => Some(LevelFilter::INFO),
        2 => Some(LevelFilter::DEBUG),
        _ => Some(LevelFilter::TRACE),
    };

    Ok(CliArgs {
        env_file,
        log_level,
    })
}
