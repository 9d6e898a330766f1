//! Transport-agnostic logic of the flicd client
//!
//! This crate contains everything the client needs that does not touch a
//! socket or a thread:
//!
//! - Id registries with late-event detection
//! - Connection channel state machine
//! - Scan wizard state machine
//! - Channel mode configuration

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod config;
pub mod registry;
pub mod state;

pub use config::{ChannelConfig, AUTO_DISCONNECT_NEVER};
pub use registry::{Lookup, Registry, RegistryFull};
pub use state::{
    ChannelInput, ChannelMachine, ChannelState, TransitionError, WizardInput, WizardMachine,
    WizardNotification, WizardPhase,
};
