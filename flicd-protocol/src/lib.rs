//! flicd client protocol
//!
//! This crate defines the binary protocol spoken between a client and the
//! flicd daemon over a persistent byte stream (TCP port 5551 by default).
//!
//! # Protocol Overview
//!
//! Every message travels in a length-prefixed frame:
//! ```text
//! ┌────────┬────────┬──────────────────┐
//! │ LENGTH │ OPCODE │ PAYLOAD          │
//! │ 2B LE  │ 1B     │ 0–65534B         │
//! └────────┴────────┴──────────────────┘
//! ```
//!
//! `LENGTH` counts the opcode and the payload. Client → daemon frames are
//! [`Command`]s, daemon → client frames are [`Event`]s. Both share one
//! opcode space per direction and a fixed field order per opcode, built from
//! the primitives in [`codec`].

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod codec;
pub mod frame;
pub mod messages;
pub mod types;

pub use codec::{DecodeError, Reader, WireEnum, Writer};
pub use frame::{Frame, FrameError, FrameParser, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use messages::{
    AdvertisementPacket, ButtonEvent, ButtonEventKind, ButtonInfo, Command, DaemonInfo, Event,
};
pub use types::{
    BdAddr, BdAddrType, BluetoothControllerState, ButtonUuid, ClickType, ConnectionStatus,
    CreateConnectionChannelError, DisconnectReason, LatencyMode, Name, ParseBdAddrError, RemovedReason,
    ScanWizardResult, MAX_NAME_LEN,
};
