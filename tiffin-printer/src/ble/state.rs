//! Connection state machine states

use super::device::{DeviceId, PrinterDevice};

/// Why the link is down without the user asking for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Link dropped; reconnect in progress
    LinkLost,
    /// Reconnect attempts used up
    ReconnectExhausted,
}

/// State of the single printer connection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Scanning,
    Connecting(DeviceId),
    Connected(PrinterDevice),
    /// Caller-initiated disconnect in progress; the resulting link-down
    /// event must not trigger a reconnect
    TeardownRequested(DeviceId),
    Disconnected(DisconnectReason),
}

impl ConnectionState {
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Scanning => "scanning",
            ConnectionState::Connecting(_) => "connecting",
            ConnectionState::Connected(_) => "connected",
            ConnectionState::TeardownRequested(_) => "disconnecting",
            ConnectionState::Disconnected(_) => "disconnected",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }

    /// Connected device, if any
    pub fn device(&self) -> Option<&PrinterDevice> {
        match self {
            ConnectionState::Connected(device) => Some(device),
            _ => None,
        }
    }

    /// Connected to this particular device
    pub fn is_connected_to(&self, id: &DeviceId) -> bool {
        self.device().is_some_and(|d| &d.id == id)
    }
}
