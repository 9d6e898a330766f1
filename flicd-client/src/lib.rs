//! Client for the flicd button daemon
//!
//! Opens one connection to the daemon and turns it into typed operations
//! with callback notifications:
//!
//! ```no_run
//! use std::sync::Arc;
//! use flicd_client::protocol::{ButtonEvent, ButtonEventKind};
//! use flicd_client::{Client, ClientConfig, ConnectionChannelHandler};
//!
//! struct Printer;
//!
//! impl ConnectionChannelHandler for Printer {
//!     fn on_button_event(&self, _: &Client, conn_id: u32, kind: ButtonEventKind, event: ButtonEvent) {
//!         println!("{conn_id}: {kind:?} {:?}", event.click_type);
//!     }
//! }
//!
//! # fn main() -> Result<(), flicd_client::ClientError> {
//! let (client, event_loop) = Client::connect(&ClientConfig::default())?;
//! let runner = std::thread::spawn(move || event_loop.run());
//!
//! for addr in client.get_info()?.verified_buttons {
//!     client.add_connection_channel(addr, Arc::new(Printer))?;
//! }
//! runner.join().expect("event loop panicked")?;
//! # Ok(())
//! # }
//! ```
//!
//! The [`EventLoop`] must run on its own thread. Every callback runs there,
//! in the order the daemon sent the events; callbacks may issue further
//! commands through the [`Client`] they receive.

#![deny(unsafe_code)]

pub mod callbacks;
pub mod client;
pub mod config;
mod dispatcher;
pub mod error;
mod state;
mod timer;
pub mod transport;

pub use callbacks::{ConnectionChannelHandler, GeneralHandler, ScanWizardHandler, ScannerHandler};
pub use client::{Client, EventLoop};
pub use config::{ClientConfig, DEFAULT_PORT};
pub use error::{ClientError, Result};
pub use transport::{
    FrameSink, FrameSource, StreamShutdown, StreamSink, StreamSource, TcpTransport,
};

pub use flicd_core::{ChannelConfig, ChannelState};
pub use flicd_protocol as protocol;
