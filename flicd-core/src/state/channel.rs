//! Connection channel state machine
//!
//! ```text
//!            create response (error)
//!   Pending ─────────────────────────────────────────► Removed
//!      │ create response (ok, status)                     ▲
//!      ▼                                                  │ removed
//!   Disconnected ◄──► Connected ◄──► Ready ───────────────┘
//!            status changed
//! ```
//!
//! Live button events are accepted only in `Ready`; queued ones (replayed
//! after a reconnect) also in `Connected`.

use flicd_protocol::{BdAddr, ConnectionStatus, CreateConnectionChannelError, DisconnectReason};

use super::TransitionError;
use crate::config::ChannelConfig;

/// Connection channel states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Create command sent, waiting for the daemon's response
    Pending,
    /// Channel open, no link to the button
    Disconnected,
    /// Link up, button not verified yet
    Connected,
    /// Link up and verified
    Ready,
    /// Channel gone; terminal
    Removed,
}

impl ChannelState {
    pub fn name(self) -> &'static str {
        match self {
            ChannelState::Pending => "Pending",
            ChannelState::Disconnected => "Disconnected",
            ChannelState::Connected => "Connected",
            ChannelState::Ready => "Ready",
            ChannelState::Removed => "Removed",
        }
    }

    /// True once the create response has arrived and the channel is open
    pub fn is_open(self) -> bool {
        matches!(
            self,
            ChannelState::Disconnected | ChannelState::Connected | ChannelState::Ready
        )
    }

    pub fn is_terminal(self) -> bool {
        self == ChannelState::Removed
    }

    fn from_status(status: ConnectionStatus) -> Self {
        match status {
            ConnectionStatus::Disconnected => ChannelState::Disconnected,
            ConnectionStatus::Connected => ChannelState::Connected,
            ConnectionStatus::Ready => ChannelState::Ready,
        }
    }

    /// Process an input and return the next state
    pub fn transition(self, input: ChannelInput) -> Result<Self, TransitionError> {
        use ChannelInput::*;
        use ChannelState::*;

        let next = match (self, input) {
            (Pending, CreateResponse { error, status }) => {
                if error == CreateConnectionChannelError::NoError {
                    Self::from_status(status)
                } else {
                    Removed
                }
            }

            (Disconnected | Connected | Ready, StatusChanged { status, .. }) => {
                Self::from_status(status)
            }
            (Disconnected | Connected | Ready, ChannelRemoved) => Removed,

            (Ready, ButtonEvent { .. }) => Ready,
            (Connected, ButtonEvent { was_queued: true }) => Connected,

            _ => {
                return Err(TransitionError {
                    machine: "connection channel",
                    state: self.name(),
                    input: input.name(),
                })
            }
        };
        Ok(next)
    }
}

/// Inputs driving a connection channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelInput {
    /// Daemon answered the create command
    CreateResponse {
        error: CreateConnectionChannelError,
        status: ConnectionStatus,
    },
    /// Link status changed
    StatusChanged {
        status: ConnectionStatus,
        reason: DisconnectReason,
    },
    /// Daemon removed the channel
    ChannelRemoved,
    /// Any of the four button event kinds
    ButtonEvent { was_queued: bool },
}

impl ChannelInput {
    pub fn name(self) -> &'static str {
        match self {
            ChannelInput::CreateResponse { .. } => "create response",
            ChannelInput::StatusChanged { .. } => "status change",
            ChannelInput::ChannelRemoved => "channel removed",
            ChannelInput::ButtonEvent { was_queued: false } => "live button event",
            ChannelInput::ButtonEvent { was_queued: true } => "queued button event",
        }
    }
}

/// Client-side record of one connection channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMachine {
    bd_addr: BdAddr,
    config: ChannelConfig,
    requested: ChannelConfig,
    state: ChannelState,
    disconnect_reason: Option<DisconnectReason>,
    removal_requested: bool,
}

impl ChannelMachine {
    /// Record for a channel whose create command is about to be sent
    pub fn new(bd_addr: BdAddr, config: ChannelConfig) -> Self {
        Self {
            bd_addr,
            config,
            requested: config,
            state: ChannelState::Pending,
            disconnect_reason: None,
            removal_requested: false,
        }
    }

    pub fn bd_addr(&self) -> BdAddr {
        self.bd_addr
    }

    /// Mode parameters the channel was created with
    pub fn config(&self) -> ChannelConfig {
        self.config
    }

    /// Mode parameters most recently requested for the channel
    pub fn requested_config(&self) -> ChannelConfig {
        self.requested
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Reason given with the most recent status change
    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        self.disconnect_reason
    }

    pub fn removal_requested(&self) -> bool {
        self.removal_requested
    }

    /// Mark the channel as being removed by this client
    ///
    /// Returns `false` if a removal was already requested.
    pub fn request_removal(&mut self) -> bool {
        !core::mem::replace(&mut self.removal_requested, true)
    }

    /// Record new mode parameters sent to the daemon
    pub fn request_mode(&mut self, config: ChannelConfig) {
        self.requested = config;
    }

    /// Apply an input, updating state and bookkeeping
    ///
    /// On error the record is left untouched.
    pub fn apply(&mut self, input: ChannelInput) -> Result<ChannelState, TransitionError> {
        let next = self.state.transition(input)?;
        if let ChannelInput::StatusChanged { reason, .. } = input {
            self.disconnect_reason = Some(reason);
        }
        self.state = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flicd_protocol::LatencyMode;

    fn machine() -> ChannelMachine {
        let addr: BdAddr = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        ChannelMachine::new(addr, ChannelConfig::default())
    }

    fn created(status: ConnectionStatus) -> ChannelInput {
        ChannelInput::CreateResponse {
            error: CreateConnectionChannelError::NoError,
            status,
        }
    }

    fn status(status: ConnectionStatus) -> ChannelInput {
        ChannelInput::StatusChanged {
            status,
            reason: DisconnectReason::Unspecified,
        }
    }

    const LIVE: ChannelInput = ChannelInput::ButtonEvent { was_queued: false };
    const QUEUED: ChannelInput = ChannelInput::ButtonEvent { was_queued: true };

    #[test]
    fn test_create_then_ready_then_button() {
        let mut ch = machine();
        assert_eq!(ch.apply(created(ConnectionStatus::Connected)), Ok(ChannelState::Connected));
        assert_eq!(ch.apply(status(ConnectionStatus::Ready)), Ok(ChannelState::Ready));
        assert_eq!(ch.apply(LIVE), Ok(ChannelState::Ready));
    }

    #[test]
    fn test_failed_create_is_terminal() {
        let mut ch = machine();
        let next = ch.apply(ChannelInput::CreateResponse {
            error: CreateConnectionChannelError::MaxPendingConnectionsReached,
            status: ConnectionStatus::Disconnected,
        });
        assert_eq!(next, Ok(ChannelState::Removed));
        assert!(ch.state().is_terminal());
    }

    #[test]
    fn test_no_event_before_create_response() {
        for input in [status(ConnectionStatus::Ready), ChannelInput::ChannelRemoved, LIVE, QUEUED] {
            let mut ch = machine();
            let err = ch.apply(input).unwrap_err();
            assert_eq!(err.state, "Pending");
            assert_eq!(ch.state(), ChannelState::Pending);
        }
    }

    #[test]
    fn test_second_create_response_rejected() {
        let mut ch = machine();
        ch.apply(created(ConnectionStatus::Disconnected)).unwrap();
        assert!(ch.apply(created(ConnectionStatus::Ready)).is_err());
    }

    #[test]
    fn test_live_button_needs_ready() {
        for s in [ConnectionStatus::Disconnected, ConnectionStatus::Connected] {
            let mut ch = machine();
            ch.apply(created(s)).unwrap();
            let err = ch.apply(LIVE).unwrap_err();
            assert_eq!(err.input, "live button event");
        }
    }

    #[test]
    fn test_queued_button_allowed_when_connected() {
        let mut ch = machine();
        ch.apply(created(ConnectionStatus::Connected)).unwrap();
        assert_eq!(ch.apply(QUEUED), Ok(ChannelState::Connected));

        let mut ch = machine();
        ch.apply(created(ConnectionStatus::Disconnected)).unwrap();
        assert!(ch.apply(QUEUED).is_err());
    }

    #[test]
    fn test_disconnect_keeps_channel_and_reason() {
        let mut ch = machine();
        ch.apply(created(ConnectionStatus::Ready)).unwrap();
        ch.apply(ChannelInput::StatusChanged {
            status: ConnectionStatus::Disconnected,
            reason: DisconnectReason::TimedOut,
        })
        .unwrap();

        assert_eq!(ch.state(), ChannelState::Disconnected);
        assert!(ch.state().is_open());
        assert_eq!(ch.disconnect_reason(), Some(DisconnectReason::TimedOut));
    }

    #[test]
    fn test_removed_is_terminal() {
        let mut ch = machine();
        ch.apply(created(ConnectionStatus::Ready)).unwrap();
        assert_eq!(ch.apply(ChannelInput::ChannelRemoved), Ok(ChannelState::Removed));
        assert!(ch.apply(LIVE).is_err());
        assert!(ch.apply(ChannelInput::ChannelRemoved).is_err());
    }

    #[test]
    fn test_request_removal_once() {
        let mut ch = machine();
        assert!(ch.request_removal());
        assert!(!ch.request_removal());
        assert!(ch.removal_requested());
    }

    #[test]
    fn test_mode_change_keeps_creation_config() {
        let mut ch = machine();
        let low = ChannelConfig::new(LatencyMode::LowLatency, 60);
        ch.request_mode(low);

        assert_eq!(ch.config(), ChannelConfig::default());
        assert_eq!(ch.requested_config(), low);
    }
}
