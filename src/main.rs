//! randr-tail - print a line whenever an XRandR output is plugged or unplugged.
//!
//! Lines on stdout have the form `+ OUTPUTNAME` for plug and `- OUTPUTNAME`
//! for unplug, flushed one at a time so the stream can be piped into another
//! process. Diagnostics go to stderr.

mod config;
mod display;
mod error;
mod logging;
mod monitor;
mod registry;
mod x11;

use config::Config;
use error::MonitorError;
use monitor::Monitor;
use registry::OutputRegistry;
use std::convert::Infallible;
use std::process::ExitCode;
use std::thread;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::oneshot;
use tracing::{error, info};
use x11::X11Display;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = match Config::default_path() {
        Some(path) => match Config::load_or_default(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Invalid configuration at {:?}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    let _log_guard = match logging::init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to install signal handlers: {}", e);
                return ExitCode::FAILURE;
            }
        };

    let (result_tx, result_rx) = oneshot::channel();

    // The X11 connection is blocking; the monitor gets a thread of its own
    // and this task only waits for it or for a termination signal.
    let spawned = thread::Builder::new()
        .name("randr-monitor".to_string())
        .spawn(move || {
            let _ = result_tx.send(run_monitor(&config));
        });
    if let Err(e) = spawned {
        error!("Failed to start monitor thread: {}", e);
        return ExitCode::FAILURE;
    }

    tokio::select! {
        result = result_rx => {
            let err = match result {
                Ok(Err(e)) => e,
                Ok(Ok(never)) => match never {},
                Err(_) => MonitorError::ThreadDied,
            };
            error!("{}", err);
            ExitCode::FAILURE
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, exiting");
            ExitCode::SUCCESS
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, exiting");
            ExitCode::SUCCESS
        }
    }
}

/// Connect, then seed and watch until a fatal error.
fn run_monitor(config: &Config) -> Result<Infallible, MonitorError> {
    let display = X11Display::connect(config.display.as_deref())?;
    let mut registry = OutputRegistry::new(config.capacity, config.max_name_len);

    let stdout = std::io::stdout();
    Monitor::new(&display, &mut registry, stdout.lock()).run()
}

