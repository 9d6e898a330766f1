//! Per-object state machines
//!
//! Connection channels and scan wizards follow the daemon's view of the
//! object. Each machine is a pure function of its state and the incoming
//! event; an event the current state cannot accept means client and daemon
//! disagree and is reported as a [`TransitionError`].

pub mod channel;
pub mod wizard;

use core::fmt;

pub use channel::{ChannelInput, ChannelMachine, ChannelState};
pub use wizard::{WizardInput, WizardMachine, WizardNotification, WizardPhase};

/// An event arrived that the object's current state cannot accept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    /// Object kind
    pub machine: &'static str,
    /// State the object was in
    pub state: &'static str,
    /// Rejected input
    pub input: &'static str,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cannot accept {} in state {}",
            self.machine, self.input, self.state
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TransitionError {}
