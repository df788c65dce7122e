//! Route panics through the logging sinks.
//!
//! The default hook only prints to stderr, so a panic would never reach the
//! log file. [`install`] logs the panic as a `CRITICAL` event first, then
//! hands over to the previous hook.

use std::{
    backtrace::{Backtrace, BacktraceStatus},
    panic::PanicHookInfo,
};

pub fn install() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log_panic(info);
        previous(info);
    }));
}

fn log_panic(info: &PanicHookInfo<'_>) {
    let backtrace = Backtrace::capture();
    let (backtrace, note) = match backtrace.status() {
        BacktraceStatus::Captured => (Some(backtrace), None),
        BacktraceStatus::Disabled => (None, Some("run with RUST_BACKTRACE=1 to display backtraces")),
        _ => (None, Some("backtraces are not supported on this platform")),
    };

    let location = info.location().map(|l| l.to_string());

    crate::critical!(
        panic.payload = payload(info),
        panic.location = location.as_deref(),
        panic.backtrace = backtrace.map(tracing::field::display),
        panic.note = note,
        "a panic occurred",
    );
}

fn payload<'a>(info: &'a PanicHookInfo<'_>) -> &'a str {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}
