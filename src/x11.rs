//! X11 backend talking RandR through x11rb.

use crate::display::{
    ConnectionState, DisplayEvent, DisplayServer, OutputDetails, OutputId, Window,
};
use crate::error::DisplayError;
use std::borrow::Cow;
use tracing::{debug, info};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

/// Oldest RandR version that delivers output change notifications.
const RANDR_MIN_MAJOR: u32 = 1;
const RANDR_MIN_MINOR: u32 = 2;

/// RandR-capable connection to an X server.
pub struct X11Display {
    conn: RustConnection,
    root: Window,
}

impl X11Display {
    /// Connect to `display_name` (or `$DISPLAY`) and make sure RandR is usable.
    pub fn connect(display_name: Option<&str>) -> Result<Self, DisplayError> {
        let (conn, screen_num) = x11rb::connect(display_name)
            .map_err(|e| DisplayError::ConnectFailed(e.to_string()))?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or(DisplayError::ScreenNotFound(screen_num))?;

        debug!("Connected to X11 screen {} (root window {:#x})", screen_num, root);

        let display = Self { conn, root };
        display.check_randr()?;
        Ok(display)
    }

    fn check_randr(&self) -> Result<(), DisplayError> {
        let present = self
            .conn
            .extension_information(randr::X11_EXTENSION_NAME)
            .map_err(|e| DisplayError::ConnectionLost(e.to_string()))?
            .is_some();
        if !present {
            return Err(DisplayError::ExtensionUnavailable(
                "extension not present on the server".to_string(),
            ));
        }

        let version = self
            .conn
            .randr_query_version(RANDR_MIN_MAJOR, RANDR_MIN_MINOR)
            .map_err(connection_lost)?
            .reply()
            .map_err(|e| match e {
                ReplyError::ConnectionError(e) => connection_lost(e),
                ReplyError::X11Error(e) => DisplayError::ExtensionUnavailable(format!("{:?}", e)),
            })?;

        if (version.major_version, version.minor_version) < (RANDR_MIN_MAJOR, RANDR_MIN_MINOR) {
            return Err(DisplayError::ExtensionUnavailable(format!(
                "server supports RandR {}.{}, need at least {}.{}",
                version.major_version, version.minor_version, RANDR_MIN_MAJOR, RANDR_MIN_MINOR
            )));
        }

        info!(
            "Using RandR {}.{}",
            version.major_version, version.minor_version
        );
        Ok(())
    }
}

impl DisplayServer for X11Display {
    type Resources = randr::GetScreenResourcesReply;
    type OutputInfo = randr::GetOutputInfoReply;

    fn root(&self) -> Window {
        self.root
    }

    fn output_ids(&self, resources: &Self::Resources) -> Vec<OutputId> {
        resources.outputs.clone()
    }

    fn subscribe_output_changes(&self) -> Result<(), DisplayError> {
        self.conn
            .randr_select_input(self.root, randr::NotifyMask::OUTPUT_CHANGE)
            .map_err(connection_lost)?
            .check()
            .map_err(|e| match e {
                ReplyError::ConnectionError(e) => connection_lost(e),
                ReplyError::X11Error(e) => DisplayError::SubscribeFailed(format!("{:?}", e)),
            })
    }

    fn wait_next_event(&self) -> Result<DisplayEvent, DisplayError> {
        let event = self.conn.wait_for_event().map_err(connection_lost)?;
        Ok(match event {
            Event::RandrNotify(notify) if notify.sub_code == randr::Notify::OUTPUT_CHANGE => {
                let change = notify.u.as_oc();
                DisplayEvent::OutputChange {
                    window: change.window,
                    output: change.output,
                }
            }
            _ => DisplayEvent::Other,
        })
    }

    fn screen_resources(&self, window: Window) -> Result<Self::Resources, DisplayError> {
        self.conn
            .randr_get_screen_resources(window)
            .map_err(connection_lost)?
            .reply()
            .map_err(|e| request_error(e, DisplayError::ScreenResources))
    }

    fn output_info(
        &self,
        resources: &Self::Resources,
        output: OutputId,
    ) -> Result<Self::OutputInfo, DisplayError> {
        self.conn
            .randr_get_output_info(output, resources.config_timestamp)
            .map_err(connection_lost)?
            .reply()
            .map_err(|e| request_error(e, DisplayError::OutputInfo))
    }

    // Replies are plain owned buffers on this side of the wire.
    fn release_screen_resources(&self, resources: Self::Resources) {
        drop(resources);
    }

    fn release_output_info(&self, info: Self::OutputInfo) {
        drop(info);
    }
}

impl OutputDetails for randr::GetOutputInfoReply {
    fn name(&self) -> Cow<'_, str> {
        decode_name(&self.name)
    }

    fn connection(&self) -> ConnectionState {
        connection_state(self.connection)
    }
}

/// Map the RandR connection value to the monitor's view of it.
fn connection_state(connection: randr::Connection) -> ConnectionState {
    if connection == randr::Connection::CONNECTED {
        ConnectionState::Connected
    } else if connection == randr::Connection::DISCONNECTED {
        ConnectionState::Disconnected
    } else {
        ConnectionState::Unknown
    }
}

/// Decode an output name without changing its byte length.
///
/// Names are ASCII in practice. When the bytes are not valid UTF-8, every
/// non-ASCII byte becomes `?`, so the registry's length limit still applies
/// to the raw name the server sent.
fn decode_name(raw: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(raw) {
        Ok(name) => Cow::Borrowed(name),
        Err(_) => Cow::Owned(
            raw.iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
                .collect(),
        ),
    }
}

fn connection_lost(e: ConnectionError) -> DisplayError {
    DisplayError::ConnectionLost(e.to_string())
}

/// Protocol errors only fail the request; connection errors are fatal.
fn request_error(e: ReplyError, transient: fn(String) -> DisplayError) -> DisplayError {
    match e {
        ReplyError::ConnectionError(e) => connection_lost(e),
        ReplyError::X11Error(e) => transient(format!("{:?}", e.error_kind)),
    }
}
