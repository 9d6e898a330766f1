//! Command and event schemas
//!
//! Message types are divided into two directions:
//! - Client → daemon: [`Command`]
//! - Daemon → client: [`Event`]
//!
//! Each opcode has a fixed field order. Events carrying a registry id put it
//! first so the client can route them without decoding the rest.

use alloc::vec::Vec;

use crate::codec::{DecodeError, Reader, Writer};
use crate::frame::{Frame, FrameError};
use crate::types::{
    BdAddr, BdAddrType, BluetoothControllerState, ButtonUuid, ClickType, ConnectionStatus,
    CreateConnectionChannelError, DisconnectReason, LatencyMode, Name, RemovedReason,
    ScanWizardResult,
};

// Command opcodes: client → daemon
pub const CMD_GET_INFO: u8 = 0;
pub const CMD_CREATE_SCANNER: u8 = 1;
pub const CMD_REMOVE_SCANNER: u8 = 2;
pub const CMD_CREATE_CONNECTION_CHANNEL: u8 = 3;
pub const CMD_REMOVE_CONNECTION_CHANNEL: u8 = 4;
pub const CMD_FORCE_DISCONNECT: u8 = 5;
pub const CMD_CHANGE_MODE_PARAMETERS: u8 = 6;
pub const CMD_PING: u8 = 7;
pub const CMD_GET_BUTTON_INFO: u8 = 8;
pub const CMD_CREATE_SCAN_WIZARD: u8 = 9;
pub const CMD_CANCEL_SCAN_WIZARD: u8 = 10;
pub const CMD_DELETE_BUTTON: u8 = 11;

// Event opcodes: daemon → client
pub const EVT_ADVERTISEMENT_PACKET: u8 = 0;
pub const EVT_CREATE_CONNECTION_CHANNEL_RESPONSE: u8 = 1;
pub const EVT_CONNECTION_STATUS_CHANGED: u8 = 2;
pub const EVT_CONNECTION_CHANNEL_REMOVED: u8 = 3;
pub const EVT_BUTTON_UP_OR_DOWN: u8 = 4;
pub const EVT_BUTTON_CLICK_OR_HOLD: u8 = 5;
pub const EVT_BUTTON_SINGLE_OR_DOUBLE_CLICK: u8 = 6;
pub const EVT_BUTTON_SINGLE_OR_DOUBLE_CLICK_OR_HOLD: u8 = 7;
pub const EVT_NEW_VERIFIED_BUTTON: u8 = 8;
pub const EVT_GET_INFO_RESPONSE: u8 = 9;
pub const EVT_NO_SPACE_FOR_NEW_CONNECTION: u8 = 10;
pub const EVT_GOT_SPACE_FOR_NEW_CONNECTION: u8 = 11;
pub const EVT_BLUETOOTH_CONTROLLER_STATE_CHANGE: u8 = 12;
pub const EVT_PING_RESPONSE: u8 = 13;
pub const EVT_GET_BUTTON_INFO_RESPONSE: u8 = 14;
pub const EVT_SCAN_WIZARD_FOUND_PRIVATE_BUTTON: u8 = 15;
pub const EVT_SCAN_WIZARD_FOUND_PUBLIC_BUTTON: u8 = 16;
pub const EVT_SCAN_WIZARD_BUTTON_CONNECTED: u8 = 17;
pub const EVT_SCAN_WIZARD_COMPLETED: u8 = 18;
pub const EVT_BUTTON_DELETED: u8 = 19;

/// Commands sent from the client to the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask for the daemon's state; answered by [`Event::GetInfoResponse`]
    GetInfo,
    /// Start forwarding advertisement packets under `scan_id`
    CreateScanner { scan_id: u32 },
    /// Stop a scanner
    RemoveScanner { scan_id: u32 },
    /// Open a connection channel to a button
    CreateConnectionChannel {
        conn_id: u32,
        bd_addr: BdAddr,
        latency_mode: LatencyMode,
        /// Seconds of inactivity before the daemon drops the link (511 = never)
        auto_disconnect_time: i16,
    },
    /// Close a connection channel
    RemoveConnectionChannel { conn_id: u32 },
    /// Drop every client's channels to a button
    ForceDisconnect { bd_addr: BdAddr },
    /// Change latency mode / auto disconnect time of a live channel
    ChangeModeParameters {
        conn_id: u32,
        latency_mode: LatencyMode,
        auto_disconnect_time: i16,
    },
    /// Round trip, answered by [`Event::PingResponse`] with the same id
    Ping { ping_id: u32 },
    /// Ask for a button's identity; answered by [`Event::GetButtonInfoResponse`]
    GetButtonInfo { bd_addr: BdAddr },
    /// Start a guided pairing flow
    CreateScanWizard { scan_wizard_id: u32 },
    /// Stop a pairing flow; the daemon still sends its completed event
    CancelScanWizard { scan_wizard_id: u32 },
    /// Forget a verified button
    DeleteButton { bd_addr: BdAddr },
}

impl Command {
    /// Opcode of this command
    pub fn opcode(&self) -> u8 {
        match self {
            Command::GetInfo => CMD_GET_INFO,
            Command::CreateScanner { .. } => CMD_CREATE_SCANNER,
            Command::RemoveScanner { .. } => CMD_REMOVE_SCANNER,
            Command::CreateConnectionChannel { .. } => CMD_CREATE_CONNECTION_CHANNEL,
            Command::RemoveConnectionChannel { .. } => CMD_REMOVE_CONNECTION_CHANNEL,
            Command::ForceDisconnect { .. } => CMD_FORCE_DISCONNECT,
            Command::ChangeModeParameters { .. } => CMD_CHANGE_MODE_PARAMETERS,
            Command::Ping { .. } => CMD_PING,
            Command::GetButtonInfo { .. } => CMD_GET_BUTTON_INFO,
            Command::CreateScanWizard { .. } => CMD_CREATE_SCAN_WIZARD,
            Command::CancelScanWizard { .. } => CMD_CANCEL_SCAN_WIZARD,
            Command::DeleteButton { .. } => CMD_DELETE_BUTTON,
        }
    }

    /// Encode this command into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let mut w = Writer::with_capacity(12);
        match self {
            Command::GetInfo => {}
            Command::CreateScanner { scan_id } | Command::RemoveScanner { scan_id } => {
                w.put_u32(*scan_id);
            }
            Command::CreateConnectionChannel {
                conn_id,
                bd_addr,
                latency_mode,
                auto_disconnect_time,
            } => {
                w.put_u32(*conn_id)
                    .put_bdaddr(bd_addr)
                    .put_enum(*latency_mode)
                    .put_i16(*auto_disconnect_time);
            }
            Command::RemoveConnectionChannel { conn_id } => {
                w.put_u32(*conn_id);
            }
            Command::ForceDisconnect { bd_addr }
            | Command::GetButtonInfo { bd_addr }
            | Command::DeleteButton { bd_addr } => {
                w.put_bdaddr(bd_addr);
            }
            Command::ChangeModeParameters {
                conn_id,
                latency_mode,
                auto_disconnect_time,
            } => {
                w.put_u32(*conn_id)
                    .put_enum(*latency_mode)
                    .put_i16(*auto_disconnect_time);
            }
            Command::Ping { ping_id } => {
                w.put_u32(*ping_id);
            }
            Command::CreateScanWizard { scan_wizard_id }
            | Command::CancelScanWizard { scan_wizard_id } => {
                w.put_u32(*scan_wizard_id);
            }
        }
        Frame::new(self.opcode(), w.finish())
    }

    /// Parse a command from a frame (daemon side, used by test daemons)
    pub fn from_frame(frame: &Frame) -> Result<Self, DecodeError> {
        let mut r = Reader::new(&frame.payload);
        let cmd = match frame.opcode {
            CMD_GET_INFO => Command::GetInfo,
            CMD_CREATE_SCANNER => Command::CreateScanner {
                scan_id: r.get_u32()?,
            },
            CMD_REMOVE_SCANNER => Command::RemoveScanner {
                scan_id: r.get_u32()?,
            },
            CMD_CREATE_CONNECTION_CHANNEL => Command::CreateConnectionChannel {
                conn_id: r.get_u32()?,
                bd_addr: r.get_bdaddr()?,
                latency_mode: r.get_enum()?,
                auto_disconnect_time: r.get_i16()?,
            },
            CMD_REMOVE_CONNECTION_CHANNEL => Command::RemoveConnectionChannel {
                conn_id: r.get_u32()?,
            },
            CMD_FORCE_DISCONNECT => Command::ForceDisconnect {
                bd_addr: r.get_bdaddr()?,
            },
            CMD_CHANGE_MODE_PARAMETERS => Command::ChangeModeParameters {
                conn_id: r.get_u32()?,
                latency_mode: r.get_enum()?,
                auto_disconnect_time: r.get_i16()?,
            },
            CMD_PING => Command::Ping {
                ping_id: r.get_u32()?,
            },
            CMD_GET_BUTTON_INFO => Command::GetButtonInfo {
                bd_addr: r.get_bdaddr()?,
            },
            CMD_CREATE_SCAN_WIZARD => Command::CreateScanWizard {
                scan_wizard_id: r.get_u32()?,
            },
            CMD_CANCEL_SCAN_WIZARD => Command::CancelScanWizard {
                scan_wizard_id: r.get_u32()?,
            },
            CMD_DELETE_BUTTON => Command::DeleteButton {
                bd_addr: r.get_bdaddr()?,
            },
            other => return Err(DecodeError::UnknownOpcode(other)),
        };
        Ok(cmd)
    }
}

/// Which of the four button event opcodes delivered a button event
///
/// The daemon reports the same physical press through several filters;
/// a client picks the ones it cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonEventKind {
    /// Raw down / up edges
    UpOrDown,
    /// Click or hold
    ClickOrHold,
    /// Single or double click
    SingleOrDoubleClick,
    /// Single click, double click or hold
    SingleOrDoubleClickOrHold,
}

impl ButtonEventKind {
    fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            EVT_BUTTON_UP_OR_DOWN => Some(ButtonEventKind::UpOrDown),
            EVT_BUTTON_CLICK_OR_HOLD => Some(ButtonEventKind::ClickOrHold),
            EVT_BUTTON_SINGLE_OR_DOUBLE_CLICK => Some(ButtonEventKind::SingleOrDoubleClick),
            EVT_BUTTON_SINGLE_OR_DOUBLE_CLICK_OR_HOLD => {
                Some(ButtonEventKind::SingleOrDoubleClickOrHold)
            }
            _ => None,
        }
    }

    fn opcode(self) -> u8 {
        match self {
            ButtonEventKind::UpOrDown => EVT_BUTTON_UP_OR_DOWN,
            ButtonEventKind::ClickOrHold => EVT_BUTTON_CLICK_OR_HOLD,
            ButtonEventKind::SingleOrDoubleClick => EVT_BUTTON_SINGLE_OR_DOUBLE_CLICK,
            ButtonEventKind::SingleOrDoubleClickOrHold => {
                EVT_BUTTON_SINGLE_OR_DOUBLE_CLICK_OR_HOLD
            }
        }
    }
}

/// One button action on a connection channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub click_type: ClickType,
    /// Happened while disconnected and replayed on reconnect
    pub was_queued: bool,
    /// For queued events, seconds between the press and delivery
    pub time_diff: u32,
}

/// Advertisement seen by a scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementPacket {
    pub bd_addr: BdAddr,
    pub name: Name,
    pub rssi: i8,
    /// Button is in private mode and must be held to become discoverable
    pub is_private: bool,
    pub already_verified: bool,
    pub already_connected_to_this_device: bool,
    pub already_connected_to_other_device: bool,
}

/// Daemon state returned by a get info query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonInfo {
    pub bluetooth_controller_state: BluetoothControllerState,
    pub my_bd_addr: BdAddr,
    pub my_bd_addr_type: BdAddrType,
    /// 0 if unknown
    pub max_pending_connections: u8,
    /// -1 if unknown
    pub max_concurrently_connected_buttons: i16,
    pub current_pending_connections: u8,
    pub currently_no_space_for_new_connection: bool,
    pub verified_buttons: Vec<BdAddr>,
}

/// Button identity returned by a get button info query
///
/// Fields after `uuid` are missing from older daemons and decode to their
/// empty values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonInfo {
    pub bd_addr: BdAddr,
    /// `None` if the button was never verified
    pub uuid: Option<ButtonUuid>,
    pub color: Option<Name>,
    pub serial_number: Option<Name>,
    /// 1 or 2, 0 if unknown
    pub flic_version: u8,
    pub firmware_version: u32,
}

/// Events sent from the daemon to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    AdvertisementPacket {
        scan_id: u32,
        packet: AdvertisementPacket,
    },
    CreateConnectionChannelResponse {
        conn_id: u32,
        error: CreateConnectionChannelError,
        connection_status: ConnectionStatus,
    },
    ConnectionStatusChanged {
        conn_id: u32,
        connection_status: ConnectionStatus,
        disconnect_reason: DisconnectReason,
    },
    ConnectionChannelRemoved {
        conn_id: u32,
        removed_reason: RemovedReason,
    },
    Button {
        conn_id: u32,
        kind: ButtonEventKind,
        event: ButtonEvent,
    },
    NewVerifiedButton {
        bd_addr: BdAddr,
    },
    GetInfoResponse(DaemonInfo),
    NoSpaceForNewConnection {
        max_concurrently_connected_buttons: u8,
    },
    GotSpaceForNewConnection {
        max_concurrently_connected_buttons: u8,
    },
    BluetoothControllerStateChange {
        state: BluetoothControllerState,
    },
    PingResponse {
        ping_id: u32,
    },
    GetButtonInfoResponse(ButtonInfo),
    ScanWizardFoundPrivateButton {
        scan_wizard_id: u32,
    },
    ScanWizardFoundPublicButton {
        scan_wizard_id: u32,
        bd_addr: BdAddr,
        name: Name,
    },
    ScanWizardButtonConnected {
        scan_wizard_id: u32,
    },
    ScanWizardCompleted {
        scan_wizard_id: u32,
        result: ScanWizardResult,
    },
    ButtonDeleted {
        bd_addr: BdAddr,
        deleted_by_this_client: bool,
    },
}

fn optional_name(name: Name) -> Option<Name> {
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

impl Event {
    /// Opcode of this event
    pub fn opcode(&self) -> u8 {
        match self {
            Event::AdvertisementPacket { .. } => EVT_ADVERTISEMENT_PACKET,
            Event::CreateConnectionChannelResponse { .. } => EVT_CREATE_CONNECTION_CHANNEL_RESPONSE,
            Event::ConnectionStatusChanged { .. } => EVT_CONNECTION_STATUS_CHANGED,
            Event::ConnectionChannelRemoved { .. } => EVT_CONNECTION_CHANNEL_REMOVED,
            Event::Button { kind, .. } => kind.opcode(),
            Event::NewVerifiedButton { .. } => EVT_NEW_VERIFIED_BUTTON,
            Event::GetInfoResponse(_) => EVT_GET_INFO_RESPONSE,
            Event::NoSpaceForNewConnection { .. } => EVT_NO_SPACE_FOR_NEW_CONNECTION,
            Event::GotSpaceForNewConnection { .. } => EVT_GOT_SPACE_FOR_NEW_CONNECTION,
            Event::BluetoothControllerStateChange { .. } => EVT_BLUETOOTH_CONTROLLER_STATE_CHANGE,
            Event::PingResponse { .. } => EVT_PING_RESPONSE,
            Event::GetButtonInfoResponse(_) => EVT_GET_BUTTON_INFO_RESPONSE,
            Event::ScanWizardFoundPrivateButton { .. } => EVT_SCAN_WIZARD_FOUND_PRIVATE_BUTTON,
            Event::ScanWizardFoundPublicButton { .. } => EVT_SCAN_WIZARD_FOUND_PUBLIC_BUTTON,
            Event::ScanWizardButtonConnected { .. } => EVT_SCAN_WIZARD_BUTTON_CONNECTED,
            Event::ScanWizardCompleted { .. } => EVT_SCAN_WIZARD_COMPLETED,
            Event::ButtonDeleted { .. } => EVT_BUTTON_DELETED,
        }
    }

    /// Parse an event from a frame
    pub fn from_frame(frame: &Frame) -> Result<Self, DecodeError> {
        let mut r = Reader::new(&frame.payload);
        let event = match frame.opcode {
            EVT_ADVERTISEMENT_PACKET => {
                let scan_id = r.get_u32()?;
                let bd_addr = r.get_bdaddr()?;
                let name = r.get_name()?;
                let rssi = r.get_i8()?;
                let is_private = r.get_bool()?;
                let already_verified = r.get_bool()?;
                // Connection flags were added later; older daemons omit them
                let already_connected_to_this_device =
                    if r.is_empty() { false } else { r.get_bool()? };
                let already_connected_to_other_device =
                    if r.is_empty() { false } else { r.get_bool()? };
                Event::AdvertisementPacket {
                    scan_id,
                    packet: AdvertisementPacket {
                        bd_addr,
                        name,
                        rssi,
                        is_private,
                        already_verified,
                        already_connected_to_this_device,
                        already_connected_to_other_device,
                    },
                }
            }
            EVT_CREATE_CONNECTION_CHANNEL_RESPONSE => Event::CreateConnectionChannelResponse {
                conn_id: r.get_u32()?,
                error: r.get_enum()?,
                connection_status: r.get_enum()?,
            },
            EVT_CONNECTION_STATUS_CHANGED => Event::ConnectionStatusChanged {
                conn_id: r.get_u32()?,
                connection_status: r.get_enum()?,
                disconnect_reason: r.get_enum()?,
            },
            EVT_CONNECTION_CHANNEL_REMOVED => Event::ConnectionChannelRemoved {
                conn_id: r.get_u32()?,
                removed_reason: r.get_enum()?,
            },
            EVT_BUTTON_UP_OR_DOWN
            | EVT_BUTTON_CLICK_OR_HOLD
            | EVT_BUTTON_SINGLE_OR_DOUBLE_CLICK
            | EVT_BUTTON_SINGLE_OR_DOUBLE_CLICK_OR_HOLD => {
                let kind = ButtonEventKind::from_opcode(frame.opcode)
                    .ok_or(DecodeError::UnknownOpcode(frame.opcode))?;
                Event::Button {
                    conn_id: r.get_u32()?,
                    kind,
                    event: ButtonEvent {
                        click_type: r.get_enum()?,
                        was_queued: r.get_bool()?,
                        time_diff: r.get_u32()?,
                    },
                }
            }
            EVT_NEW_VERIFIED_BUTTON => Event::NewVerifiedButton {
                bd_addr: r.get_bdaddr()?,
            },
            EVT_GET_INFO_RESPONSE => Event::GetInfoResponse(DaemonInfo {
                bluetooth_controller_state: r.get_enum()?,
                my_bd_addr: r.get_bdaddr()?,
                my_bd_addr_type: r.get_enum()?,
                max_pending_connections: r.get_u8()?,
                max_concurrently_connected_buttons: r.get_i16()?,
                current_pending_connections: r.get_u8()?,
                currently_no_space_for_new_connection: r.get_bool()?,
                verified_buttons: r.get_bdaddr_array()?,
            }),
            EVT_NO_SPACE_FOR_NEW_CONNECTION => Event::NoSpaceForNewConnection {
                max_concurrently_connected_buttons: r.get_u8()?,
            },
            EVT_GOT_SPACE_FOR_NEW_CONNECTION => Event::GotSpaceForNewConnection {
                max_concurrently_connected_buttons: r.get_u8()?,
            },
            EVT_BLUETOOTH_CONTROLLER_STATE_CHANGE => Event::BluetoothControllerStateChange {
                state: r.get_enum()?,
            },
            EVT_PING_RESPONSE => Event::PingResponse {
                ping_id: r.get_u32()?,
            },
            EVT_GET_BUTTON_INFO_RESPONSE => {
                let bd_addr = r.get_bdaddr()?;
                let uuid = r.get_uuid()?;
                let mut info = ButtonInfo {
                    bd_addr,
                    uuid,
                    color: None,
                    serial_number: None,
                    flic_version: 0,
                    firmware_version: 0,
                };
                // Older daemons stop after the uuid
                if !r.is_empty() {
                    info.color = optional_name(r.get_name()?);
                }
                if !r.is_empty() {
                    info.serial_number = optional_name(r.get_name()?);
                    info.flic_version = r.get_u8()?;
                    info.firmware_version = r.get_u32()?;
                }
                Event::GetButtonInfoResponse(info)
            }
            EVT_SCAN_WIZARD_FOUND_PRIVATE_BUTTON => Event::ScanWizardFoundPrivateButton {
                scan_wizard_id: r.get_u32()?,
            },
            EVT_SCAN_WIZARD_FOUND_PUBLIC_BUTTON => Event::ScanWizardFoundPublicButton {
                scan_wizard_id: r.get_u32()?,
                bd_addr: r.get_bdaddr()?,
                name: r.get_name()?,
            },
            EVT_SCAN_WIZARD_BUTTON_CONNECTED => Event::ScanWizardButtonConnected {
                scan_wizard_id: r.get_u32()?,
            },
            EVT_SCAN_WIZARD_COMPLETED => Event::ScanWizardCompleted {
                scan_wizard_id: r.get_u32()?,
                result: r.get_enum()?,
            },
            EVT_BUTTON_DELETED => Event::ButtonDeleted {
                bd_addr: r.get_bdaddr()?,
                deleted_by_this_client: r.get_bool()?,
            },
            other => return Err(DecodeError::UnknownOpcode(other)),
        };
        Ok(event)
    }

    /// Encode this event into a frame (daemon side, used by test daemons)
    ///
    /// Always writes the newest layout, including optional trailing fields.
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let mut w = Writer::with_capacity(32);
        match self {
            Event::AdvertisementPacket { scan_id, packet } => {
                w.put_u32(*scan_id)
                    .put_bdaddr(&packet.bd_addr)
                    .put_name(&packet.name)
                    .put_i8(packet.rssi)
                    .put_bool(packet.is_private)
                    .put_bool(packet.already_verified)
                    .put_bool(packet.already_connected_to_this_device)
                    .put_bool(packet.already_connected_to_other_device);
            }
            Event::CreateConnectionChannelResponse {
                conn_id,
                error,
                connection_status,
            } => {
                w.put_u32(*conn_id)
                    .put_enum(*error)
                    .put_enum(*connection_status);
            }
            Event::ConnectionStatusChanged {
                conn_id,
                connection_status,
                disconnect_reason,
            } => {
                w.put_u32(*conn_id)
                    .put_enum(*connection_status)
                    .put_enum(*disconnect_reason);
            }
            Event::ConnectionChannelRemoved {
                conn_id,
                removed_reason,
            } => {
                w.put_u32(*conn_id).put_enum(*removed_reason);
            }
            Event::Button { conn_id, event, .. } => {
                w.put_u32(*conn_id)
                    .put_enum(event.click_type)
                    .put_bool(event.was_queued)
                    .put_u32(event.time_diff);
            }
            Event::NewVerifiedButton { bd_addr } => {
                w.put_bdaddr(bd_addr);
            }
            Event::GetInfoResponse(info) => {
                w.put_enum(info.bluetooth_controller_state)
                    .put_bdaddr(&info.my_bd_addr)
                    .put_enum(info.my_bd_addr_type)
                    .put_u8(info.max_pending_connections)
                    .put_i16(info.max_concurrently_connected_buttons)
                    .put_u8(info.current_pending_connections)
                    .put_bool(info.currently_no_space_for_new_connection)
                    .put_bdaddr_array(&info.verified_buttons);
            }
            Event::NoSpaceForNewConnection {
                max_concurrently_connected_buttons,
            }
            | Event::GotSpaceForNewConnection {
                max_concurrently_connected_buttons,
            } => {
                w.put_u8(*max_concurrently_connected_buttons);
            }
            Event::BluetoothControllerStateChange { state } => {
                w.put_enum(*state);
            }
            Event::PingResponse { ping_id } => {
                w.put_u32(*ping_id);
            }
            Event::GetButtonInfoResponse(info) => {
                w.put_bdaddr(&info.bd_addr)
                    .put_uuid(info.uuid.as_ref())
                    .put_name(info.color.as_deref().unwrap_or(""))
                    .put_name(info.serial_number.as_deref().unwrap_or(""))
                    .put_u8(info.flic_version)
                    .put_u32(info.firmware_version);
            }
            Event::ScanWizardFoundPrivateButton { scan_wizard_id }
            | Event::ScanWizardButtonConnected { scan_wizard_id } => {
                w.put_u32(*scan_wizard_id);
            }
            Event::ScanWizardFoundPublicButton {
                scan_wizard_id,
                bd_addr,
                name,
            } => {
                w.put_u32(*scan_wizard_id).put_bdaddr(bd_addr).put_name(name);
            }
            Event::ScanWizardCompleted {
                scan_wizard_id,
                result,
            } => {
                w.put_u32(*scan_wizard_id).put_enum(*result);
            }
            Event::ButtonDeleted {
                bd_addr,
                deleted_by_this_client,
            } => {
                w.put_bdaddr(bd_addr).put_bool(*deleted_by_this_client);
            }
        }
        Frame::new(self.opcode(), w.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn addr() -> BdAddr {
        "aa:bb:cc:dd:ee:ff".parse().unwrap()
    }

    fn name(text: &str) -> Name {
        let mut n = Name::new();
        n.push_str(text).unwrap();
        n
    }

    #[test]
    fn test_create_connection_channel_layout() {
        let cmd = Command::CreateConnectionChannel {
            conn_id: 7,
            bd_addr: addr(),
            latency_mode: LatencyMode::LowLatency,
            auto_disconnect_time: 511,
        };
        let frame = cmd.to_frame().unwrap();
        assert_eq!(frame.opcode, CMD_CREATE_CONNECTION_CHANNEL);
        assert_eq!(
            frame.payload,
            vec![7, 0, 0, 0, 0xff, 0xee, 0xdd, 0xcc, 0xbb, 0xaa, 1, 0xff, 0x01]
        );
        assert_eq!(Command::from_frame(&frame).unwrap(), cmd);
    }

    #[test]
    fn test_get_info_has_no_payload() {
        let frame = Command::GetInfo.to_frame().unwrap();
        assert_eq!(frame.opcode, CMD_GET_INFO);
        assert!(frame.payload.is_empty());
        assert_eq!(frame.encode_to_vec().unwrap(), vec![1, 0, 0]);
    }

    #[test]
    fn test_button_event_opcodes_select_kind() {
        let payload = vec![3, 0, 0, 0, 0, 0, 0, 0, 0];
        let cases = [
            (EVT_BUTTON_UP_OR_DOWN, ButtonEventKind::UpOrDown),
            (EVT_BUTTON_CLICK_OR_HOLD, ButtonEventKind::ClickOrHold),
            (EVT_BUTTON_SINGLE_OR_DOUBLE_CLICK, ButtonEventKind::SingleOrDoubleClick),
            (
                EVT_BUTTON_SINGLE_OR_DOUBLE_CLICK_OR_HOLD,
                ButtonEventKind::SingleOrDoubleClickOrHold,
            ),
        ];
        for (opcode, expected) in cases {
            let frame = Frame::new(opcode, payload.clone()).unwrap();
            match Event::from_frame(&frame).unwrap() {
                Event::Button { conn_id, kind, event } => {
                    assert_eq!(conn_id, 3);
                    assert_eq!(kind, expected);
                    assert_eq!(event.click_type, ClickType::ButtonDown);
                    assert!(!event.was_queued);
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_queued_button_event_fields() {
        let frame = Frame::new(
            EVT_BUTTON_SINGLE_OR_DOUBLE_CLICK,
            vec![1, 0, 0, 0, 4, 1, 0x10, 0x0E, 0, 0],
        )
        .unwrap();
        let event = Event::from_frame(&frame).unwrap();
        assert_eq!(
            event,
            Event::Button {
                conn_id: 1,
                kind: ButtonEventKind::SingleOrDoubleClick,
                event: ButtonEvent {
                    click_type: ClickType::ButtonDoubleClick,
                    was_queued: true,
                    time_diff: 3600,
                },
            }
        );
    }

    #[test]
    fn test_invalid_enum_in_event_is_error() {
        // connection_status = 3 does not exist
        let frame = Frame::new(EVT_CONNECTION_STATUS_CHANGED, vec![0, 0, 0, 0, 3, 0]).unwrap();
        assert_eq!(
            Event::from_frame(&frame),
            Err(DecodeError::InvalidEnum {
                ty: "ConnectionStatus",
                value: 3
            })
        );
    }

    #[test]
    fn test_unknown_event_opcode() {
        let frame = Frame::empty(0xF0);
        assert_eq!(
            Event::from_frame(&frame),
            Err(DecodeError::UnknownOpcode(0xF0))
        );
    }

    #[test]
    fn test_advertisement_without_connection_flags() {
        let mut w = Writer::new();
        w.put_u32(2)
            .put_bdaddr(&addr())
            .put_name("F030")
            .put_i8(-60)
            .put_bool(true)
            .put_bool(false);
        let frame = Frame::new(EVT_ADVERTISEMENT_PACKET, w.finish()).unwrap();

        match Event::from_frame(&frame).unwrap() {
            Event::AdvertisementPacket { scan_id, packet } => {
                assert_eq!(scan_id, 2);
                assert_eq!(packet.name.as_str(), "F030");
                assert_eq!(packet.rssi, -60);
                assert!(packet.is_private);
                assert!(!packet.already_connected_to_this_device);
                assert!(!packet.already_connected_to_other_device);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_get_info_response_with_verified_buttons() {
        let other: BdAddr = "01:02:03:04:05:06".parse().unwrap();
        let info = DaemonInfo {
            bluetooth_controller_state: BluetoothControllerState::Attached,
            my_bd_addr: addr(),
            my_bd_addr_type: BdAddrType::PublicBdAddrType,
            max_pending_connections: 128,
            max_concurrently_connected_buttons: -1,
            current_pending_connections: 2,
            currently_no_space_for_new_connection: false,
            verified_buttons: vec![addr(), other],
        };
        let frame = Event::GetInfoResponse(info.clone()).to_frame().unwrap();
        // 1 + 6 + 1 + 1 + 2 + 1 + 1 + 2 + 2 * 6
        assert_eq!(frame.payload.len(), 27);
        assert_eq!(
            Event::from_frame(&frame).unwrap(),
            Event::GetInfoResponse(info)
        );
    }

    #[test]
    fn test_button_info_old_layout() {
        let mut w = Writer::new();
        let mut raw = [0u8; 16];
        raw[3] = 9;
        w.put_bdaddr(&addr()).put_uuid(ButtonUuid::from_bytes(raw).as_ref());
        let frame = Frame::new(EVT_GET_BUTTON_INFO_RESPONSE, w.finish()).unwrap();

        match Event::from_frame(&frame).unwrap() {
            Event::GetButtonInfoResponse(info) => {
                assert_eq!(info.uuid, ButtonUuid::from_bytes(raw));
                assert_eq!(info.color, None);
                assert_eq!(info.serial_number, None);
                assert_eq!(info.flic_version, 0);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_button_info_full_layout() {
        let info = ButtonInfo {
            bd_addr: addr(),
            uuid: None,
            color: Some(name("white")),
            serial_number: Some(name("BD12-A34567")),
            flic_version: 2,
            firmware_version: 9,
        };
        let frame = Event::GetButtonInfoResponse(info.clone()).to_frame().unwrap();
        assert_eq!(frame.payload.len(), 6 + 16 + 17 + 17 + 1 + 4);
        assert_eq!(
            Event::from_frame(&frame).unwrap(),
            Event::GetButtonInfoResponse(info)
        );
    }

    #[test]
    fn test_scan_wizard_found_public_layout() {
        let event = Event::ScanWizardFoundPublicButton {
            scan_wizard_id: 4,
            bd_addr: addr(),
            name: name("F030"),
        };
        let frame = event.to_frame().unwrap();
        assert_eq!(frame.opcode, EVT_SCAN_WIZARD_FOUND_PUBLIC_BUTTON);
        assert_eq!(frame.payload.len(), 4 + 6 + 17);
        assert_eq!(Event::from_frame(&frame).unwrap(), event);
    }

    #[test]
    fn test_truncated_event_payload() {
        let frame = Frame::new(EVT_CONNECTION_CHANNEL_REMOVED, vec![1, 0, 0]).unwrap();
        assert!(matches!(
            Event::from_frame(&frame),
            Err(DecodeError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let frame = Frame::new(EVT_PING_RESPONSE, vec![5, 0, 0, 0, 0xAA, 0xBB]).unwrap();
        assert_eq!(
            Event::from_frame(&frame).unwrap(),
            Event::PingResponse { ping_id: 5 }
        );
    }
}
