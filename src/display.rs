//! Display server abstraction consumed by the event loop.
//!
//! The monitor only needs a handful of RandR operations; they are expressed
//! as the `DisplayServer` trait so the loop can run against the X11 backend
//! or a fake in tests.

use crate::error::DisplayError;
use std::borrow::Cow;
use std::ops::Deref;
use tracing::warn;

/// X11 window identifier.
pub type Window = u32;

/// RandR output identifier.
pub type OutputId = u32;

/// Connection state reported by the server for an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Unknown,
}

impl ConnectionState {
    /// Only an explicit `Connected` counts; `Unknown` is treated as unplugged.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Name and connection state of one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputStatus {
    pub name: String,
    pub connection: ConnectionState,
}

/// Event read from the display connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    /// An output changed; the details have to be queried.
    OutputChange { window: Window, output: OutputId },
    /// Anything the monitor does not care about.
    Other,
}

/// Output details resolved from the server.
pub trait OutputDetails {
    fn name(&self) -> Cow<'_, str>;
    fn connection(&self) -> ConnectionState;
}

/// Operations the monitor needs from the display server.
///
/// Handles returned by `screen_resources` and `output_info` must be handed
/// back to the matching `release_*` method exactly once; the `acquire_*`
/// helpers wrap them in a [`Scoped`] guard that does this on drop.
pub trait DisplayServer {
    type Resources;
    type OutputInfo: OutputDetails;

    /// Root window of the monitored screen.
    fn root(&self) -> Window;

    /// Outputs listed in a screen resources reply.
    fn output_ids(&self, resources: &Self::Resources) -> Vec<OutputId>;

    /// Ask the server to deliver output change notifications for the root window.
    fn subscribe_output_changes(&self) -> Result<(), DisplayError>;

    /// Block until the next event arrives.
    fn wait_next_event(&self) -> Result<DisplayEvent, DisplayError>;

    fn screen_resources(&self, window: Window) -> Result<Self::Resources, DisplayError>;

    fn output_info(
        &self,
        resources: &Self::Resources,
        output: OutputId,
    ) -> Result<Self::OutputInfo, DisplayError>;

    fn release_screen_resources(&self, resources: Self::Resources);

    fn release_output_info(&self, info: Self::OutputInfo);

    /// Acquire screen resources released when the guard goes out of scope.
    fn acquire_screen_resources(
        &self,
        window: Window,
    ) -> Result<Scoped<'_, Self, Self::Resources>, DisplayError>
    where
        Self: Sized,
    {
        let resources = self.screen_resources(window)?;
        Ok(Scoped::new(self, resources, Self::release_screen_resources))
    }

    /// Acquire output info released when the guard goes out of scope.
    fn acquire_output_info(
        &self,
        resources: &Self::Resources,
        output: OutputId,
    ) -> Result<Scoped<'_, Self, Self::OutputInfo>, DisplayError>
    where
        Self: Sized,
    {
        let info = self.output_info(resources, output)?;
        Ok(Scoped::new(self, info, Self::release_output_info))
    }

    /// Current name and connection state of every output on the root window.
    ///
    /// An output whose info request fails (typically one removed between the
    /// two requests) is left out; connection errors still abort.
    fn enumerate_outputs(&self) -> Result<Vec<OutputStatus>, DisplayError>
    where
        Self: Sized,
    {
        let resources = self.acquire_screen_resources(self.root())?;
        let ids = self.output_ids(&resources);

        let mut outputs = Vec::with_capacity(ids.len());
        for output in ids {
            match self.acquire_output_info(&resources, output) {
                Ok(info) => outputs.push(OutputStatus {
                    name: info.name().into_owned(),
                    connection: info.connection(),
                }),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("Skipping output {} during enumeration: {}", output, e),
            }
        }
        Ok(outputs)
    }
}

/// Guard owning a server-side handle until it is dropped.
pub struct Scoped<'a, D, H> {
    server: &'a D,
    handle: Option<H>,
    release: fn(&D, H),
}

impl<'a, D, H> Scoped<'a, D, H> {
    pub fn new(server: &'a D, handle: H, release: fn(&D, H)) -> Self {
        Self {
            server,
            handle: Some(handle),
            release,
        }
    }
}

impl<D, H> Deref for Scoped<'_, D, H> {
    type Target = H;

    fn deref(&self) -> &H {
        // Only taken in Drop
        self.handle
            .as_ref()
            .unwrap_or_else(|| unreachable!("scoped handle used after release"))
    }
}

impl<D, H> Drop for Scoped<'_, D, H> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            (self.release)(self.server, handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counter {
        released: Cell<u32>,
    }

    fn release(counter: &Counter, value: u32) {
        assert_eq!(value, 7);
        counter.released.set(counter.released.get() + 1);
    }

    #[test]
    fn test_scoped_releases_once_on_drop() {
        let counter = Counter { released: Cell::new(0) };
        {
            let guard = Scoped::new(&counter, 7u32, release);
            assert_eq!(*guard, 7);
            assert_eq!(counter.released.get(), 0);
        }
        assert_eq!(counter.released.get(), 1);
    }

    #[test]
    fn test_scoped_releases_on_early_return() {
        fn early(counter: &Counter) -> Result<(), ()> {
            let _guard = Scoped::new(counter, 7u32, release);
            Err(())
        }

        let counter = Counter { released: Cell::new(0) };
        assert!(early(&counter).is_err());
        assert_eq!(counter.released.get(), 1);
    }

    #[test]
    fn test_connection_state() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(!ConnectionState::Unknown.is_connected());
    }
}
