//! Engine state shared between client handles and the event loop
//!
//! Everything here sits behind the client's state mutex. The lock is held
//! for allocation, lookup and transitions only, never while a callback runs.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use flicd_core::{ChannelMachine, Registry, WizardMachine};
use flicd_protocol::BdAddr;

use crate::callbacks::{
    ButtonInfoCallback, ConnectionChannelHandler, GeneralHandler, InfoCallback, PingCallback,
    ScanWizardHandler, ScannerHandler,
};
use crate::timer::TimerQueue;

pub(crate) struct ChannelEntry {
    pub machine: ChannelMachine,
    pub handler: Arc<dyn ConnectionChannelHandler>,
}

pub(crate) struct WizardEntry {
    pub machine: WizardMachine,
    pub handler: Arc<dyn ScanWizardHandler>,
}

/// Requests waiting for their response
///
/// Info and button info responses carry no correlation id and are matched
/// in request order; pings are matched by id.
#[derive(Default)]
pub(crate) struct PendingCalls {
    pub info: VecDeque<InfoCallback>,
    pub button_info: VecDeque<(BdAddr, ButtonInfoCallback)>,
    pub pings: BTreeMap<u32, PingCallback>,
    next_ping_id: u32,
}

impl PendingCalls {
    pub fn next_ping_id(&mut self) -> u32 {
        let id = self.next_ping_id;
        self.next_ping_id = self.next_ping_id.wrapping_add(1);
        id
    }

    pub fn len(&self) -> usize {
        self.info.len() + self.button_info.len() + self.pings.len()
    }
}

/// How the connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Open,
    /// `close()` was called
    Closed,
    /// Transport failed or the peer desynchronised
    Failed,
}

pub(crate) struct ClientState {
    pub channels: Registry<ChannelEntry>,
    pub scanners: Registry<Arc<dyn ScannerHandler>>,
    pub wizards: Registry<WizardEntry>,
    pub timers: TimerQueue,
    pub pending: PendingCalls,
    pub general: Option<Arc<dyn GeneralHandler>>,
    pub lifecycle: Lifecycle,
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            channels: Registry::new(),
            scanners: Registry::new(),
            wizards: Registry::new(),
            timers: TimerQueue::new(),
            pending: PendingCalls::default(),
            general: None,
            lifecycle: Lifecycle::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle == Lifecycle::Open
    }
}
