//! Event loop turning RandR output change notifications into `+`/`-` lines.

use crate::display::{DisplayEvent, DisplayServer, OutputDetails, OutputId, Window};
use crate::error::{DisplayError, MonitorError};
use crate::registry::{Outcome, OutputRegistry};
use std::convert::Infallible;
use std::io::Write;
use tracing::{debug, info, warn};

/// Hotplug monitor driving an [`OutputRegistry`] from a display server.
///
/// Everything runs on the caller's thread: the loop blocks on the next event,
/// runs the queries for it synchronously and writes at most one line.
pub struct Monitor<'a, D: DisplayServer, W: Write> {
    display: &'a D,
    registry: &'a mut OutputRegistry,
    out: W,
}

impl<'a, D: DisplayServer, W: Write> Monitor<'a, D, W> {
    pub fn new(display: &'a D, registry: &'a mut OutputRegistry, out: W) -> Self {
        Self {
            display,
            registry,
            out,
        }
    }

    /// Seed, subscribe, then process events until a fatal error.
    pub fn run(&mut self) -> Result<Infallible, MonitorError> {
        self.seed()?;

        self.display.subscribe_output_changes()?;
        if self.registry.is_empty() {
            info!("No outputs connected at startup");
        }
        info!(
            "Watching outputs on root window {:#x}, connected: [{}] ({}/{} slots)",
            self.display.root(),
            self.registry.names().collect::<Vec<_>>().join(", "),
            self.registry.len(),
            self.registry.capacity()
        );

        loop {
            self.process_next_event()?;
        }
    }

    /// Load the current output states into the registry without printing.
    ///
    /// Without a snapshot every already connected output would later be
    /// reported as new, so a failed enumeration stops the monitor.
    pub fn seed(&mut self) -> Result<(), MonitorError> {
        let outputs = self.display.enumerate_outputs()?;

        for output in outputs {
            match self
                .registry
                .update(&output.name, output.connection.is_connected())
            {
                Ok(Outcome::NewlyConnected) => debug!("Output {} already connected", output.name),
                Ok(_) => {}
                Err(e) => warn!("Ignoring output during startup: {}", e),
            }
        }
        Ok(())
    }

    /// Wait for one event and handle it.
    ///
    /// Returns the registry outcome when the event was an output change that
    /// could be resolved.
    pub fn process_next_event(&mut self) -> Result<Option<Outcome>, MonitorError> {
        match self.display.wait_next_event()? {
            DisplayEvent::OutputChange { window, output } => self.handle_output_change(window, output),
            DisplayEvent::Other => Ok(None),
        }
    }

    fn handle_output_change(
        &mut self,
        window: Window,
        output: OutputId,
    ) -> Result<Option<Outcome>, MonitorError> {
        let display = self.display;

        let resources = match display.acquire_screen_resources(window) {
            Ok(resources) => resources,
            Err(e) => return skip_event(e),
        };
        let info = match display.acquire_output_info(&resources, output) {
            Ok(info) => info,
            Err(e) => return skip_event(e),
        };

        let name = info.name();
        let connecting = info.connection().is_connected();

        let outcome = match self.registry.update(&name, connecting) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Dropping change for output {}: {}", output, e);
                return Ok(None);
            }
        };

        if let Some(marker) = outcome.marker() {
            writeln!(self.out, "{} {}", marker, name)?;
            self.out.flush()?;
        }
        debug!("Output {} ({}): {:?}", name, output, outcome);

        Ok(Some(outcome))
    }
}

/// Drop the current event on a request failure, stop on a connection failure.
fn skip_event(e: DisplayError) -> Result<Option<Outcome>, MonitorError> {
    if e.is_fatal() {
        return Err(e.into());
    }
    warn!("{}", e);
    Ok(None)
}
