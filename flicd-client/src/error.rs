//! Client error type

use std::io;

use flicd_core::{RegistryFull, TransitionError};
use flicd_protocol::{BdAddr, DecodeError, FrameError};
use thiserror::Error;

/// Errors returned by the client and its event loop
///
/// Transport and desynchronisation errors end the event loop and are
/// returned from [`EventLoop::run`](crate::EventLoop::run). Usage errors are
/// returned from the offending call and leave the client running.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    #[error("connection closed by daemon")]
    Disconnected,

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("malformed event: {0}")]
    Decode(#[from] DecodeError),

    #[error("illegal transition: {0}")]
    Transition(#[from] TransitionError),

    #[error("event for {registry} id {id} which was never allocated")]
    UnknownId { registry: &'static str, id: u32 },

    #[error("{kind} response without a pending request")]
    UnexpectedResponse { kind: &'static str },

    #[error("button info response for {got}, expected {expected}")]
    ButtonInfoMismatch { expected: BdAddr, got: BdAddr },

    #[error("blocking call issued from the event loop thread")]
    CalledFromEventLoop,

    #[error("no {registry} with id {id}")]
    NotRegistered { registry: &'static str, id: u32 },

    #[error("removal of connection channel {0} already requested")]
    RemovalAlreadyRequested(u32),

    #[error(transparent)]
    RegistryFull(#[from] RegistryFull),

    #[error("connection lost before a response arrived")]
    ConnectionLost,

    #[error("client closed")]
    Closed,
}

impl ClientError {
    /// True for errors caused by misuse of the API rather than the connection
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            ClientError::CalledFromEventLoop
                | ClientError::NotRegistered { .. }
                | ClientError::RemovalAlreadyRequested(_)
                | ClientError::Closed
        )
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
