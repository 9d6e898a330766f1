//! Client handle and event loop
//!
//! [`Client`] is a cheap, cloneable handle used to issue commands from any
//! thread, including from inside callbacks. [`EventLoop`] owns the receiving
//! side of the connection and must be run on exactly one thread; every
//! callback and timer is invoked there.
//!
//! Two locks guard the engine: the state lock (registries, pending calls,
//! timers) and the writer lock. The state lock is always taken first, so the
//! order of queued requests matches the order of their frames on the wire.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use flicd_core::{ChannelConfig, ChannelMachine, ChannelState, WizardMachine};
use flicd_protocol::{BdAddr, ButtonInfo, ButtonUuid, Command, DaemonInfo, DecodeError, Event, Frame};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, info, trace, warn};

use crate::callbacks::{
    ConnectionChannelHandler, GeneralHandler, ScanWizardHandler, ScannerHandler, TimerCallback,
};
use crate::config::ClientConfig;
use crate::dispatcher;
use crate::error::{ClientError, Result};
use crate::state::{ChannelEntry, ClientState, Lifecycle, WizardEntry};
use crate::transport::{FrameSink, FrameSource, TcpTransport};

/// Messages consumed by the event loop
enum Inbound {
    /// Frame from the reader thread
    Frame(Frame),
    /// Reader thread stopped
    Failed(ClientError),
    /// A timer was scheduled; recompute the wait
    Wake,
    /// `close()` was called
    Shutdown,
}

struct Shared {
    state: Mutex<ClientState>,
    writer: Mutex<Box<dyn FrameSink>>,
    inbound: Sender<Inbound>,
    loop_thread: Mutex<Option<ThreadId>>,
    channel_defaults: ChannelConfig,
}

/// Handle to one daemon connection
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

impl Client {
    /// Connect to the daemon described by `config`
    pub fn connect(config: &ClientConfig) -> Result<(Client, EventLoop)> {
        let (source, sink) = TcpTransport::connect(config)?;
        Ok(Self::with_transport(source, sink, config.channel))
    }

    /// Build a client over an already open transport
    ///
    /// `channel_defaults` is the mode used by [`add_connection_channel`](Self::add_connection_channel).
    pub fn with_transport<S, K>(source: S, sink: K, channel_defaults: ChannelConfig) -> (Client, EventLoop)
    where
        S: FrameSource + 'static,
        K: FrameSink + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let client = Client {
            shared: Arc::new(Shared {
                state: Mutex::new(ClientState::new()),
                writer: Mutex::new(Box::new(sink)),
                inbound: tx,
                loop_thread: Mutex::new(None),
                channel_defaults,
            }),
        };
        let event_loop = EventLoop {
            client: client.clone(),
            inbound: rx,
            source: Box::new(source),
        };
        (client, event_loop)
    }

    fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.shared.state.lock()
    }

    /// Lock the state, refusing if the connection is gone
    fn lock_open(&self) -> Result<MutexGuard<'_, ClientState>> {
        let state = self.lock();
        if state.is_open() {
            Ok(state)
        } else {
            Err(ClientError::Closed)
        }
    }

    /// Write a command; the caller holds the state lock
    fn send(&self, _state: &MutexGuard<'_, ClientState>, command: Command) -> Result<()> {
        let frame = command.to_frame()?;
        trace!(?command, "sending command");
        self.shared.writer.lock().send_frame(&frame)
    }

    fn on_event_loop(&self) -> bool {
        *self.shared.loop_thread.lock() == Some(thread::current().id())
    }

    fn ensure_off_event_loop(&self) -> Result<()> {
        if self.on_event_loop() {
            Err(ClientError::CalledFromEventLoop)
        } else {
            Ok(())
        }
    }

    /// Install the handler for daemon-wide events, replacing any previous one
    pub fn set_general_handler(&self, handler: Arc<dyn GeneralHandler>) {
        self.lock().general = Some(handler);
    }

    pub fn clear_general_handler(&self) {
        self.lock().general = None;
    }

    /// Start receiving advertisement packets
    pub fn add_scanner(&self, handler: Arc<dyn ScannerHandler>) -> Result<u32> {
        let mut state = self.lock_open()?;
        let scan_id = state.scanners.insert_with(|_| handler)?;
        if let Err(e) = self.send(&state, Command::CreateScanner { scan_id }) {
            state.scanners.remove(scan_id);
            return Err(e);
        }
        debug!(scan_id, "scanner added");
        Ok(scan_id)
    }

    /// Stop a scanner; its id is free as soon as this returns
    pub fn remove_scanner(&self, scan_id: u32) -> Result<()> {
        let mut state = self.lock_open()?;
        if state.scanners.remove(scan_id).is_none() {
            return Err(ClientError::NotRegistered {
                registry: "scanner",
                id: scan_id,
            });
        }
        debug!(scan_id, "scanner removed");
        self.send(&state, Command::RemoveScanner { scan_id })
    }

    /// Open a connection channel using the configured default mode
    pub fn add_connection_channel(
        &self,
        bd_addr: BdAddr,
        handler: Arc<dyn ConnectionChannelHandler>,
    ) -> Result<u32> {
        self.add_connection_channel_with(bd_addr, self.shared.channel_defaults, handler)
    }

    /// Open a connection channel with explicit mode parameters
    pub fn add_connection_channel_with(
        &self,
        bd_addr: BdAddr,
        config: ChannelConfig,
        handler: Arc<dyn ConnectionChannelHandler>,
    ) -> Result<u32> {
        let mut state = self.lock_open()?;
        let conn_id = state.channels.insert_with(|_| ChannelEntry {
            machine: ChannelMachine::new(bd_addr, config),
            handler,
        })?;
        let command = Command::CreateConnectionChannel {
            conn_id,
            bd_addr,
            latency_mode: config.latency_mode,
            auto_disconnect_time: config.auto_disconnect_time,
        };
        if let Err(e) = self.send(&state, command) {
            state.channels.remove(conn_id);
            return Err(e);
        }
        debug!(conn_id, %bd_addr, "connection channel requested");
        Ok(conn_id)
    }

    /// Ask the daemon to close a connection channel
    ///
    /// The channel stays registered until the daemon confirms the removal.
    pub fn remove_connection_channel(&self, conn_id: u32) -> Result<()> {
        let mut state = self.lock_open()?;
        let entry = state
            .channels
            .get_mut(conn_id)
            .ok_or(ClientError::NotRegistered {
                registry: "connection channel",
                id: conn_id,
            })?;
        if !entry.machine.request_removal() {
            return Err(ClientError::RemovalAlreadyRequested(conn_id));
        }
        self.send(&state, Command::RemoveConnectionChannel { conn_id })
    }

    /// Change latency mode and auto disconnect time of a channel
    pub fn change_mode_parameters(&self, conn_id: u32, config: ChannelConfig) -> Result<()> {
        let mut state = self.lock_open()?;
        let entry = state
            .channels
            .get_mut(conn_id)
            .ok_or(ClientError::NotRegistered {
                registry: "connection channel",
                id: conn_id,
            })?;
        entry.machine.request_mode(config);
        self.send(
            &state,
            Command::ChangeModeParameters {
                conn_id,
                latency_mode: config.latency_mode,
                auto_disconnect_time: config.auto_disconnect_time,
            },
        )
    }

    /// Current state of a registered channel
    pub fn channel_state(&self, conn_id: u32) -> Option<ChannelState> {
        self.lock().channels.get(conn_id).map(|e| e.machine.state())
    }

    /// Mode a channel was created with and the latest requested mode
    pub fn channel_config(&self, conn_id: u32) -> Option<(ChannelConfig, ChannelConfig)> {
        self.lock()
            .channels
            .get(conn_id)
            .map(|e| (e.machine.config(), e.machine.requested_config()))
    }

    /// Disconnect every client's channels to a button
    pub fn force_disconnect(&self, bd_addr: BdAddr) -> Result<()> {
        let state = self.lock_open()?;
        self.send(&state, Command::ForceDisconnect { bd_addr })
    }

    /// Start the guided pairing flow
    pub fn add_scan_wizard(&self, handler: Arc<dyn ScanWizardHandler>) -> Result<u32> {
        let mut state = self.lock_open()?;
        let scan_wizard_id = state.wizards.insert_with(|_| WizardEntry {
            machine: WizardMachine::new(),
            handler,
        })?;
        if let Err(e) = self.send(&state, Command::CreateScanWizard { scan_wizard_id }) {
            state.wizards.remove(scan_wizard_id);
            return Err(e);
        }
        debug!(scan_wizard_id, "scan wizard started");
        Ok(scan_wizard_id)
    }

    /// Cancel a scan wizard; its completed callback still follows
    pub fn cancel_scan_wizard(&self, scan_wizard_id: u32) -> Result<()> {
        let state = self.lock_open()?;
        if !state.wizards.contains(scan_wizard_id) {
            return Err(ClientError::NotRegistered {
                registry: "scan wizard",
                id: scan_wizard_id,
            });
        }
        self.send(&state, Command::CancelScanWizard { scan_wizard_id })
    }

    /// Remove a verified button from the daemon
    pub fn delete_button(&self, bd_addr: BdAddr) -> Result<()> {
        let state = self.lock_open()?;
        self.send(&state, Command::DeleteButton { bd_addr })
    }

    /// Request daemon info; `callback` runs on the event loop
    pub fn request_info<F>(&self, callback: F) -> Result<()>
    where
        F: FnOnce(&Client, Result<DaemonInfo>) + Send + 'static,
    {
        let mut state = self.lock_open()?;
        self.send(&state, Command::GetInfo)?;
        state.pending.info.push_back(Box::new(callback));
        Ok(())
    }

    /// Request a button's identity; `callback` runs on the event loop
    pub fn request_button_info<F>(&self, bd_addr: BdAddr, callback: F) -> Result<()>
    where
        F: FnOnce(&Client, Result<ButtonInfo>) + Send + 'static,
    {
        let mut state = self.lock_open()?;
        self.send(&state, Command::GetButtonInfo { bd_addr })?;
        state
            .pending
            .button_info
            .push_back((bd_addr, Box::new(callback)));
        Ok(())
    }

    /// Ping the daemon; `callback` runs on the event loop
    pub fn request_ping<F>(&self, callback: F) -> Result<()>
    where
        F: FnOnce(&Client, Result<()>) + Send + 'static,
    {
        let mut state = self.lock_open()?;
        let ping_id = state.pending.next_ping_id();
        self.send(&state, Command::Ping { ping_id })?;
        state.pending.pings.insert(ping_id, Box::new(callback));
        Ok(())
    }

    /// Block until a callback-style request completes
    fn wait<T, F>(&self, request: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Box<dyn FnOnce(&Client, Result<T>) + Send>) -> Result<()>,
    {
        self.ensure_off_event_loop()?;
        let (tx, rx) = mpsc::sync_channel(1);
        request(Box::new(move |_: &Client, result: Result<T>| {
            // Receiver only goes away if the waiting thread did
            let _ = tx.send(result);
        }))?;
        rx.recv().map_err(|_| ClientError::ConnectionLost)?
    }

    /// Daemon info; blocks until the response arrives
    pub fn get_info(&self) -> Result<DaemonInfo> {
        self.wait(|done| self.request_info(done))
    }

    /// Button identity; blocks until the response arrives
    pub fn get_button_info(&self, bd_addr: BdAddr) -> Result<ButtonInfo> {
        self.wait(|done| self.request_button_info(bd_addr, done))
    }

    /// Button uuid, `None` if the daemon has never verified the button
    pub fn get_button_uuid(&self, bd_addr: BdAddr) -> Result<Option<ButtonUuid>> {
        Ok(self.get_button_info(bd_addr)?.uuid)
    }

    /// Round trip to the daemon; blocks until the response arrives
    pub fn ping(&self) -> Result<Duration> {
        let start = Instant::now();
        self.wait(|done| self.request_ping(done))?;
        Ok(start.elapsed())
    }

    /// Run `callback` on the event loop after `delay`
    ///
    /// Returns the timer id, valid until the timer fires or is cancelled.
    pub fn set_timer<F>(&self, delay: Duration, callback: F) -> Result<u32>
    where
        F: FnOnce(&Client) + Send + 'static,
    {
        let callback: TimerCallback = Box::new(callback);
        let mut state = self.lock_open()?;
        let timer_id = state.timers.schedule(Instant::now() + delay, callback)?;
        drop(state);
        // Loop re-reads the earliest deadline on wake
        let _ = self.shared.inbound.send(Inbound::Wake);
        trace!(timer_id, ?delay, "timer set");
        Ok(timer_id)
    }

    /// Cancel a timer; false if it already fired or does not exist
    pub fn cancel_timer(&self, timer_id: u32) -> bool {
        self.lock().timers.cancel(timer_id)
    }

    /// Run `callback` on the event loop as soon as possible
    pub fn run_on_event_loop<F>(&self, callback: F) -> Result<()>
    where
        F: FnOnce(&Client) + Send + 'static,
    {
        self.set_timer(Duration::ZERO, callback).map(|_| ())
    }

    /// Shut the connection down; the event loop returns `Ok(())`
    pub fn close(&self) {
        let mut state = self.lock();
        if !state.is_open() {
            return;
        }
        state.lifecycle = Lifecycle::Closed;
        if let Err(e) = self.shared.writer.lock().shutdown() {
            debug!(error = %e, "socket shutdown failed");
        }
        drop(state);
        let _ = self.shared.inbound.send(Inbound::Shutdown);
        info!("client closed");
    }

    pub fn is_closed(&self) -> bool {
        !self.lock().is_open()
    }
}

/// Receiving side of a client; see [`EventLoop::run`]
pub struct EventLoop {
    client: Client,
    inbound: Receiver<Inbound>,
    source: Box<dyn FrameSource>,
}

impl EventLoop {
    /// The client this loop serves
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Process events and timers until the connection ends
    ///
    /// Returns `Ok(())` after [`Client::close`], otherwise the error that
    /// ended the connection. Either way every pending request fails.
    pub fn run(self) -> Result<()> {
        let EventLoop {
            client,
            inbound,
            mut source,
        } = self;

        let tx = client.shared.inbound.clone();
        let stopping = Arc::new(AtomicBool::new(false));
        let reader_stopping = Arc::clone(&stopping);
        let reader = thread::Builder::new()
            .name("flicd-reader".into())
            .spawn(move || loop {
                match source.receive_frame() {
                    Ok(frame) => {
                        if tx.send(Inbound::Frame(frame)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        if !reader_stopping.load(Ordering::Acquire) {
                            let _ = tx.send(Inbound::Failed(e));
                        }
                        break;
                    }
                }
            })?;

        *client.shared.loop_thread.lock() = Some(thread::current().id());
        info!("event loop started");
        let result = dispatch(&client, &inbound);
        stopping.store(true, Ordering::Release);

        if let Err(e) = &result {
            error!(error = %e, "event loop terminated");
        }
        shut_down(&client, result.is_ok());

        // Reader exits once the socket is shut down
        if reader.join().is_err() {
            warn!("reader thread panicked");
        }
        *client.shared.loop_thread.lock() = None;
        info!("event loop stopped");
        result
    }
}

fn dispatch(client: &Client, inbound: &Receiver<Inbound>) -> Result<()> {
    loop {
        fire_timers(client);

        let next_deadline = client.lock().timers.next_deadline();
        let message = match next_deadline {
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match inbound.recv_timeout(timeout) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => return Ok(()),
                }
            }
            None => match inbound.recv() {
                Ok(message) => message,
                Err(_) => return Ok(()),
            },
        };

        match message {
            Inbound::Frame(frame) => handle_frame(client, frame)?,
            Inbound::Failed(e) => {
                if client.is_closed() {
                    return Ok(());
                }
                return Err(e);
            }
            Inbound::Wake => {}
            Inbound::Shutdown => return Ok(()),
        }
    }
}

fn fire_timers(client: &Client) {
    loop {
        let Some((timer_id, callback)) = client.lock().timers.pop_expired(Instant::now()) else {
            return;
        };
        trace!(timer_id, "timer fired");
        callback(client);
    }
}

fn handle_frame(client: &Client, frame: Frame) -> Result<()> {
    let event = match Event::from_frame(&frame) {
        Ok(event) => event,
        Err(DecodeError::UnknownOpcode(opcode)) => {
            warn!(opcode, len = frame.payload.len(), "skipping unknown event");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    trace!(?event, "event received");

    let delivery = {
        let mut state = client.lock();
        if !state.is_open() {
            // Closed while this frame was queued
            return Ok(());
        }
        dispatcher::route(&mut state, event)?
    };
    delivery.deliver(client);
    Ok(())
}

/// Mark the client dead and fail everything still waiting
fn shut_down(client: &Client, closed: bool) {
    let (pending, wasted_timers) = {
        let mut state = client.lock();
        if state.is_open() {
            state.lifecycle = if closed {
                Lifecycle::Closed
            } else {
                Lifecycle::Failed
            };
            if let Err(e) = client.shared.writer.lock().shutdown() {
                debug!(error = %e, "socket shutdown failed");
            }
        }
        let timers = state.timers.len();
        state.timers.clear();
        state.channels.drain();
        state.scanners.drain();
        state.wizards.drain();
        (std::mem::take(&mut state.pending), timers)
    };
    debug!(
        pending = pending.len(),
        timers = wasted_timers,
        "failing outstanding requests"
    );

    let error = || {
        if closed {
            ClientError::Closed
        } else {
            ClientError::ConnectionLost
        }
    };
    for callback in pending.info {
        callback(client, Err(error()));
    }
    for (_, callback) in pending.button_info {
        callback(client, Err(error()));
    }
    for (_, callback) in pending.pings {
        callback(client, Err(error()));
    }
}
