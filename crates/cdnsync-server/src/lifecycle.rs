//! Process lifetime: terminate on the usual termination signals.
//!
//! There is no graceful drain. A handled signal is logged and the process
//! exits with status 1 straight away, abandoning in-flight runs and
//! requests. ILL, FPE and SEGV cannot be registered with tokio and keep
//! their default disposition.

use std::io;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Exit status used when a termination signal arrives.
pub const SIGNAL_EXIT_CODE: i32 = 1;

#[cfg(unix)]
fn handled_signals() -> [(SignalKind, &'static str); 10] {
    [
        (SignalKind::hangup(), "SIGHUP"),
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::quit(), "SIGQUIT"),
        (SignalKind::from_raw(libc::SIGTRAP), "SIGTRAP"),
        (SignalKind::from_raw(libc::SIGABRT), "SIGABRT"),
        (SignalKind::from_raw(libc::SIGBUS), "SIGBUS"),
        (SignalKind::user_defined1(), "SIGUSR1"),
        (SignalKind::user_defined2(), "SIGUSR2"),
        (SignalKind::pipe(), "SIGPIPE"),
        (SignalKind::terminate(), "SIGTERM"),
    ]
}

/// Register handlers for every terminating signal.
///
/// # Errors
///
/// Returns an error if any handler cannot be registered.
#[cfg(unix)]
fn register_signals() -> io::Result<Vec<(Signal, &'static str)>> {
    handled_signals()
        .into_iter()
        .map(|(kind, name)| Ok((signal(kind)?, name)))
        .collect()
}

/// Wait until any of `signals` fires and return its name.
#[cfg(unix)]
async fn wait_for_signal(signals: Vec<(Signal, &'static str)>) -> &'static str {
    let waits = signals.into_iter().map(|(mut stream, name)| {
        Box::pin(async move {
            stream.recv().await;
            name
        })
    });
    let (name, _, _) = futures::future::select_all(waits).await;
    name
}

/// Install the signal handlers and spawn the task that terminates the
/// process when one fires.
///
/// Must be called from within a tokio runtime, before the server starts.
///
/// # Errors
///
/// Returns an error if a signal handler cannot be registered.
#[cfg(unix)]
pub fn install_terminator() -> io::Result<()> {
    let signals = register_signals()?;
    tokio::spawn(async move {
        let name = wait_for_signal(signals).await;
        terminate(name);
    });
    Ok(())
}

#[cfg(not(unix))]
pub fn install_terminator() -> io::Result<()> {
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            terminate("ctrl-c");
        }
    });
    Ok(())
}

fn terminate(name: &str) -> ! {
    tracing::warn!(signal = name, "received {name} - terminating");
    std::process::exit(SIGNAL_EXIT_CODE)
}
