//! Application callbacks
//!
//! One handler object is attached to each scanner, connection channel and
//! scan wizard when it is created; a single optional [`GeneralHandler`]
//! receives daemon-wide events. All callbacks run on the event loop thread,
//! one at a time, and receive a [`Client`] so they can issue further
//! commands.
//!
//! Methods default to doing nothing; implement the ones you need.

use flicd_protocol::{
    AdvertisementPacket, BdAddr, BluetoothControllerState, ButtonEvent, ButtonEventKind,
    ButtonInfo, ConnectionStatus, CreateConnectionChannelError, DaemonInfo, DisconnectReason,
    RemovedReason, ScanWizardResult,
};

use crate::client::Client;
use crate::error::ClientError;

/// Events of one connection channel
pub trait ConnectionChannelHandler: Send + Sync {
    /// Daemon answered the create command
    ///
    /// A non-`NoError` result means the channel is already gone.
    fn on_create_response(
        &self,
        _client: &Client,
        _conn_id: u32,
        _error: CreateConnectionChannelError,
        _status: ConnectionStatus,
    ) {
    }

    fn on_connection_status_changed(
        &self,
        _client: &Client,
        _conn_id: u32,
        _status: ConnectionStatus,
        _reason: DisconnectReason,
    ) {
    }

    /// Channel is gone; later events for its id are dropped
    fn on_removed(&self, _client: &Client, _conn_id: u32, _reason: RemovedReason) {}

    /// One of the four button event kinds
    fn on_button_event(
        &self,
        _client: &Client,
        _conn_id: u32,
        _kind: ButtonEventKind,
        _event: ButtonEvent,
    ) {
    }
}

/// Advertisements seen by one scanner
pub trait ScannerHandler: Send + Sync {
    fn on_advertisement_packet(&self, client: &Client, scan_id: u32, packet: &AdvertisementPacket);
}

/// Progress of one scan wizard
pub trait ScanWizardHandler: Send + Sync {
    /// A private button is nearby; it must be held for 7 seconds to pair
    fn on_found_private_button(&self, _client: &Client, _scan_wizard_id: u32) {}

    /// A public button was found and the daemon is connecting to it
    fn on_found_public_button(
        &self,
        _client: &Client,
        _scan_wizard_id: u32,
        _bd_addr: BdAddr,
        _name: &str,
    ) {
    }

    /// The candidate connected and is being verified
    fn on_button_connected(
        &self,
        _client: &Client,
        _scan_wizard_id: u32,
        _bd_addr: BdAddr,
        _name: &str,
    ) {
    }

    /// The wizard ended; later events for its id are dropped
    fn on_completed(
        &self,
        _client: &Client,
        _scan_wizard_id: u32,
        _result: ScanWizardResult,
        _bd_addr: Option<BdAddr>,
        _name: Option<&str>,
    ) {
    }
}

/// Daemon-wide events not tied to an object this client created
pub trait GeneralHandler: Send + Sync {
    fn on_new_verified_button(&self, _client: &Client, _bd_addr: BdAddr) {}

    fn on_no_space_for_new_connection(&self, _client: &Client, _max_concurrently_connected: u8) {}

    fn on_got_space_for_new_connection(&self, _client: &Client, _max_concurrently_connected: u8) {}

    fn on_bluetooth_controller_state_change(
        &self,
        _client: &Client,
        _state: BluetoothControllerState,
    ) {
    }

    fn on_button_deleted(&self, _client: &Client, _bd_addr: BdAddr, _deleted_by_this_client: bool) {}
}

/// Completion of a get info request
pub type InfoCallback = Box<dyn FnOnce(&Client, Result<DaemonInfo, ClientError>) + Send>;

/// Completion of a get button info request
pub type ButtonInfoCallback = Box<dyn FnOnce(&Client, Result<ButtonInfo, ClientError>) + Send>;

/// Completion of a ping
pub type PingCallback = Box<dyn FnOnce(&Client, Result<(), ClientError>) + Send>;

/// A timer or deferred call
pub type TimerCallback = Box<dyn FnOnce(&Client) + Send>;
