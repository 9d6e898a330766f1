//! Event routing
//!
//! Routing happens in two steps so no callback ever runs under the state
//! lock: [`route`] looks the event up, drives the object's state machine and
//! frees ids while the lock is held, returning a [`Delivery`]; the event loop
//! then drops the lock and calls [`Delivery::deliver`].

use std::sync::Arc;

use flicd_core::{ChannelInput, Lookup, Registry, WizardInput, WizardNotification};
use flicd_protocol::{
    AdvertisementPacket, BdAddr, BluetoothControllerState, ButtonEvent, ButtonEventKind,
    ButtonInfo, ConnectionStatus, CreateConnectionChannelError, DaemonInfo, DisconnectReason,
    Event, RemovedReason,
};
use tracing::{debug, warn};

use crate::callbacks::{
    ButtonInfoCallback, ConnectionChannelHandler, GeneralHandler, InfoCallback, PingCallback,
    ScanWizardHandler, ScannerHandler,
};
use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::state::ClientState;

/// Connection channel callback to invoke
pub(crate) enum ChannelCall {
    CreateResponse {
        error: CreateConnectionChannelError,
        status: ConnectionStatus,
    },
    StatusChanged {
        status: ConnectionStatus,
        reason: DisconnectReason,
    },
    Removed {
        reason: RemovedReason,
    },
    Button {
        kind: ButtonEventKind,
        event: ButtonEvent,
    },
}

/// General handler callback to invoke
pub(crate) enum GeneralCall {
    NewVerifiedButton(BdAddr),
    NoSpaceForNewConnection(u8),
    GotSpaceForNewConnection(u8),
    BluetoothControllerStateChange(BluetoothControllerState),
    ButtonDeleted {
        bd_addr: BdAddr,
        deleted_by_this_client: bool,
    },
}

/// Work left to do once the state lock is released
pub(crate) enum Delivery {
    /// Event consumed without a callback
    Nothing,
    Channel {
        handler: Arc<dyn ConnectionChannelHandler>,
        conn_id: u32,
        call: ChannelCall,
    },
    Scanner {
        handler: Arc<dyn ScannerHandler>,
        scan_id: u32,
        packet: AdvertisementPacket,
    },
    Wizard {
        handler: Arc<dyn ScanWizardHandler>,
        scan_wizard_id: u32,
        notification: WizardNotification,
    },
    General {
        handler: Arc<dyn GeneralHandler>,
        call: GeneralCall,
    },
    Info(InfoCallback, DaemonInfo),
    ButtonInfo(ButtonInfoCallback, ButtonInfo),
    Ping(PingCallback),
}

#[cfg(test)]
impl core::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Delivery::Nothing => "Nothing",
            Delivery::Channel { .. } => "Channel",
            Delivery::Scanner { .. } => "Scanner",
            Delivery::Wizard { .. } => "Wizard",
            Delivery::General { .. } => "General",
            Delivery::Info(..) => "Info",
            Delivery::ButtonInfo(..) => "ButtonInfo",
            Delivery::Ping(..) => "Ping",
        })
    }
}

/// Resolve an object id received from the daemon
///
/// `Ok(None)` means a late event for an object that is already gone.
fn live<'a, T>(
    registry: &'a mut Registry<T>,
    name: &'static str,
    id: u32,
) -> Result<Option<&'a mut T>> {
    match registry.lookup(id) {
        Lookup::Live(entry) => Ok(Some(entry)),
        Lookup::Retired => {
            warn!(registry = name, id, "discarding event for removed object");
            Ok(None)
        }
        Lookup::Unknown => Err(ClientError::UnknownId { registry: name, id }),
    }
}

fn route_channel(
    state: &mut ClientState,
    conn_id: u32,
    input: ChannelInput,
    call: ChannelCall,
) -> Result<Delivery> {
    let Some(entry) = live(&mut state.channels, "connection channel", conn_id)? else {
        return Ok(Delivery::Nothing);
    };
    let previous = entry.machine.state();
    let next = entry.machine.apply(input)?;
    let handler = Arc::clone(&entry.handler);
    if next != previous {
        debug!(conn_id, from = previous.name(), to = next.name(), "channel transition");
    }
    if next.is_terminal() {
        state.channels.remove(conn_id);
    }
    Ok(Delivery::Channel {
        handler,
        conn_id,
        call,
    })
}

fn route_wizard(state: &mut ClientState, scan_wizard_id: u32, input: WizardInput) -> Result<Delivery> {
    let Some(entry) = live(&mut state.wizards, "scan wizard", scan_wizard_id)? else {
        return Ok(Delivery::Nothing);
    };
    let notification = entry.machine.apply(input)?;
    let handler = Arc::clone(&entry.handler);
    if entry.machine.phase().is_terminal() {
        state.wizards.remove(scan_wizard_id);
        debug!(scan_wizard_id, "scan wizard completed");
    }
    if notification == WizardNotification::Nothing {
        debug!(scan_wizard_id, "ignoring second candidate");
        return Ok(Delivery::Nothing);
    }
    Ok(Delivery::Wizard {
        handler,
        scan_wizard_id,
        notification,
    })
}

fn route_button_info(state: &mut ClientState, info: ButtonInfo) -> Result<Delivery> {
    let Some((expected, callback)) = state.pending.button_info.pop_front() else {
        return Err(ClientError::UnexpectedResponse {
            kind: "get button info",
        });
    };
    if expected != info.bd_addr {
        // Keep the call queued so it fails along with the connection
        state.pending.button_info.push_front((expected, callback));
        return Err(ClientError::ButtonInfoMismatch {
            expected,
            got: info.bd_addr,
        });
    }
    Ok(Delivery::ButtonInfo(callback, info))
}

fn route_general(state: &ClientState, call: GeneralCall) -> Delivery {
    match &state.general {
        Some(handler) => Delivery::General {
            handler: Arc::clone(handler),
            call,
        },
        None => Delivery::Nothing,
    }
}

/// Apply one event to the engine state
///
/// An error means client and daemon no longer agree and the connection must
/// be dropped.
pub(crate) fn route(state: &mut ClientState, event: Event) -> Result<Delivery> {
    match event {
        Event::AdvertisementPacket { scan_id, packet } => {
            match live(&mut state.scanners, "scanner", scan_id)? {
                Some(handler) => Ok(Delivery::Scanner {
                    handler: Arc::clone(handler),
                    scan_id,
                    packet,
                }),
                None => Ok(Delivery::Nothing),
            }
        }

        Event::CreateConnectionChannelResponse {
            conn_id,
            error,
            connection_status,
        } => route_channel(
            state,
            conn_id,
            ChannelInput::CreateResponse {
                error,
                status: connection_status,
            },
            ChannelCall::CreateResponse {
                error,
                status: connection_status,
            },
        ),
        Event::ConnectionStatusChanged {
            conn_id,
            connection_status,
            disconnect_reason,
        } => route_channel(
            state,
            conn_id,
            ChannelInput::StatusChanged {
                status: connection_status,
                reason: disconnect_reason,
            },
            ChannelCall::StatusChanged {
                status: connection_status,
                reason: disconnect_reason,
            },
        ),
        Event::ConnectionChannelRemoved {
            conn_id,
            removed_reason,
        } => route_channel(
            state,
            conn_id,
            ChannelInput::ChannelRemoved,
            ChannelCall::Removed {
                reason: removed_reason,
            },
        ),
        Event::Button {
            conn_id,
            kind,
            event,
        } => route_channel(
            state,
            conn_id,
            ChannelInput::ButtonEvent {
                was_queued: event.was_queued,
            },
            ChannelCall::Button { kind, event },
        ),

        Event::ScanWizardFoundPrivateButton { scan_wizard_id } => {
            route_wizard(state, scan_wizard_id, WizardInput::FoundPrivateButton)
        }
        Event::ScanWizardFoundPublicButton {
            scan_wizard_id,
            bd_addr,
            name,
        } => route_wizard(
            state,
            scan_wizard_id,
            WizardInput::FoundPublicButton { bd_addr, name },
        ),
        Event::ScanWizardButtonConnected { scan_wizard_id } => {
            route_wizard(state, scan_wizard_id, WizardInput::ButtonConnected)
        }
        Event::ScanWizardCompleted {
            scan_wizard_id,
            result,
        } => route_wizard(state, scan_wizard_id, WizardInput::Completed { result }),

        Event::GetInfoResponse(info) => match state.pending.info.pop_front() {
            Some(callback) => Ok(Delivery::Info(callback, info)),
            None => Err(ClientError::UnexpectedResponse { kind: "get info" }),
        },
        Event::GetButtonInfoResponse(info) => route_button_info(state, info),
        Event::PingResponse { ping_id } => match state.pending.pings.remove(&ping_id) {
            Some(callback) => Ok(Delivery::Ping(callback)),
            None => Err(ClientError::UnexpectedResponse { kind: "ping" }),
        },

        Event::NewVerifiedButton { bd_addr } => {
            Ok(route_general(state, GeneralCall::NewVerifiedButton(bd_addr)))
        }
        Event::NoSpaceForNewConnection {
            max_concurrently_connected_buttons,
        } => Ok(route_general(
            state,
            GeneralCall::NoSpaceForNewConnection(max_concurrently_connected_buttons),
        )),
        Event::GotSpaceForNewConnection {
            max_concurrently_connected_buttons,
        } => Ok(route_general(
            state,
            GeneralCall::GotSpaceForNewConnection(max_concurrently_connected_buttons),
        )),
        Event::BluetoothControllerStateChange { state: bt_state } => Ok(route_general(
            state,
            GeneralCall::BluetoothControllerStateChange(bt_state),
        )),
        Event::ButtonDeleted {
            bd_addr,
            deleted_by_this_client,
        } => Ok(route_general(
            state,
            GeneralCall::ButtonDeleted {
                bd_addr,
                deleted_by_this_client,
            },
        )),
    }
}

impl Delivery {
    /// Invoke the callback; must be called without the state lock held
    pub(crate) fn deliver(self, client: &Client) {
        match self {
            Delivery::Nothing => {}
            Delivery::Channel {
                handler,
                conn_id,
                call,
            } => match call {
                ChannelCall::CreateResponse { error, status } => {
                    handler.on_create_response(client, conn_id, error, status)
                }
                ChannelCall::StatusChanged { status, reason } => {
                    handler.on_connection_status_changed(client, conn_id, status, reason)
                }
                ChannelCall::Removed { reason } => handler.on_removed(client, conn_id, reason),
                ChannelCall::Button { kind, event } => {
                    handler.on_button_event(client, conn_id, kind, event)
                }
            },
            Delivery::Scanner {
                handler,
                scan_id,
                packet,
            } => handler.on_advertisement_packet(client, scan_id, &packet),
            Delivery::Wizard {
                handler,
                scan_wizard_id,
                notification,
            } => match notification {
                WizardNotification::FoundPrivateButton => {
                    handler.on_found_private_button(client, scan_wizard_id)
                }
                WizardNotification::FoundPublicButton { bd_addr, name } => {
                    handler.on_found_public_button(client, scan_wizard_id, bd_addr, &name)
                }
                WizardNotification::ButtonConnected { bd_addr, name } => {
                    handler.on_button_connected(client, scan_wizard_id, bd_addr, &name)
                }
                WizardNotification::Completed {
                    result,
                    bd_addr,
                    name,
                } => handler.on_completed(client, scan_wizard_id, result, bd_addr, name.as_deref()),
                WizardNotification::Nothing => {}
            },
            Delivery::General { handler, call } => match call {
                GeneralCall::NewVerifiedButton(bd_addr) => {
                    handler.on_new_verified_button(client, bd_addr)
                }
                GeneralCall::NoSpaceForNewConnection(max) => {
                    handler.on_no_space_for_new_connection(client, max)
                }
                GeneralCall::GotSpaceForNewConnection(max) => {
                    handler.on_got_space_for_new_connection(client, max)
                }
                GeneralCall::BluetoothControllerStateChange(state) => {
                    handler.on_bluetooth_controller_state_change(client, state)
                }
                GeneralCall::ButtonDeleted {
                    bd_addr,
                    deleted_by_this_client,
                } => handler.on_button_deleted(client, bd_addr, deleted_by_this_client),
            },
            Delivery::Info(callback, info) => callback(client, Ok(info)),
            Delivery::ButtonInfo(callback, info) => callback(client, Ok(info)),
            Delivery::Ping(callback) => callback(client, Ok(())),
        }
    }
}
