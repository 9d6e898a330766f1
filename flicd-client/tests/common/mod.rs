//! Scripted daemon over a loopback socket, plus a handler that records
//! every callback as a line of text.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flicd_client::protocol::{
    AdvertisementPacket, BdAddr, BluetoothControllerState, ButtonEvent, ButtonEventKind,
    ButtonInfo, Command, ConnectionStatus, CreateConnectionChannelError, DaemonInfo,
    DisconnectReason, Event, Frame, FrameParser, RemovedReason, ScanWizardResult,
};
use flicd_client::{
    Client, ClientConfig, ClientError, ConnectionChannelHandler, GeneralHandler,
    ScanWizardHandler, ScannerHandler,
};

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn addr(text: &str) -> BdAddr {
    text.parse().unwrap()
}

/// Daemon end of the connection
pub struct FakeDaemon {
    stream: TcpStream,
    parser: FrameParser,
    frames: VecDeque<Frame>,
}

impl FakeDaemon {
    /// Read the next command the client wrote
    pub fn expect_command(&mut self) -> Command {
        loop {
            if let Some(frame) = self.frames.pop_front() {
                return Command::from_frame(&frame).expect("malformed command");
            }
            let mut buf = [0u8; 256];
            let n = self.stream.read(&mut buf).expect("daemon read failed");
            assert!(n > 0, "client closed the connection");
            let mut out = Vec::new();
            self.parser.feed_bytes(&buf[..n], &mut out);
            self.frames.extend(out);
        }
    }

    pub fn send(&mut self, event: Event) {
        let bytes = event.to_frame().unwrap().encode_to_vec().unwrap();
        self.stream.write_all(&bytes).unwrap();
    }

    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).unwrap();
    }

    /// Drop the connection as a crashing daemon would
    pub fn hang_up(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    /// True once the client has shut its side down
    pub fn sees_eof(&mut self) -> bool {
        let mut buf = [0u8; 64];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
    }
}

/// Client connected to a fake daemon with its event loop on a thread
pub struct Harness {
    pub client: Client,
    pub daemon: FakeDaemon,
    runner: Option<JoinHandle<Result<(), ClientError>>>,
}

impl Harness {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let (client, event_loop) = Client::connect(&ClientConfig::new("127.0.0.1", port)).unwrap();
        let (stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(TIMEOUT)).unwrap();

        let runner = thread::spawn(move || event_loop.run());
        Harness {
            client,
            daemon: FakeDaemon {
                stream,
                parser: FrameParser::new(),
                frames: VecDeque::new(),
            },
            runner: Some(runner),
        }
    }

    /// Wait for the event loop to return
    pub fn join(&mut self) -> Result<(), ClientError> {
        self.runner
            .take()
            .expect("event loop already joined")
            .join()
            .expect("event loop panicked")
    }

    /// Open a channel and answer its create command
    pub fn open_channel(
        &mut self,
        bd_addr: BdAddr,
        handler: Arc<dyn ConnectionChannelHandler>,
        status: ConnectionStatus,
    ) -> u32 {
        let conn_id = self.client.add_connection_channel(bd_addr, handler).unwrap();
        assert!(matches!(
            self.daemon.expect_command(),
            Command::CreateConnectionChannel { conn_id: id, .. } if id == conn_id
        ));
        self.daemon.send(Event::CreateConnectionChannelResponse {
            conn_id,
            error: CreateConnectionChannelError::NoError,
            connection_status: status,
        });
        conn_id
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        if let Some(runner) = self.runner.take() {
            self.client.close();
            let _ = runner.join();
        }
    }
}

/// Handler writing one line per callback
pub struct Recorder {
    tx: Sender<String>,
}

pub struct Notes {
    rx: Receiver<String>,
}

pub fn recorder() -> (Arc<Recorder>, Notes) {
    let (tx, rx) = mpsc::channel();
    (Arc::new(Recorder { tx }), Notes { rx })
}

impl Recorder {
    pub fn note(&self, line: String) {
        let _ = self.tx.send(line);
    }
}

impl Notes {
    pub fn next(&self) -> String {
        self.rx.recv_timeout(TIMEOUT).expect("no callback arrived")
    }

    pub fn assert_quiet(&self) {
        if let Ok(line) = self.rx.recv_timeout(Duration::from_millis(200)) {
            panic!("unexpected callback: {line}");
        }
    }
}

impl ConnectionChannelHandler for Recorder {
    fn on_create_response(
        &self,
        _: &Client,
        conn_id: u32,
        error: CreateConnectionChannelError,
        status: ConnectionStatus,
    ) {
        self.note(format!("created {conn_id} {error:?} {status:?}"));
    }

    fn on_connection_status_changed(
        &self,
        _: &Client,
        conn_id: u32,
        status: ConnectionStatus,
        reason: DisconnectReason,
    ) {
        self.note(format!("status {conn_id} {status:?} {reason:?}"));
    }

    fn on_removed(&self, _: &Client, conn_id: u32, reason: RemovedReason) {
        self.note(format!("removed {conn_id} {reason:?}"));
    }

    fn on_button_event(&self, _: &Client, conn_id: u32, kind: ButtonEventKind, event: ButtonEvent) {
        let timing = if event.was_queued { "queued" } else { "live" };
        self.note(format!(
            "button {conn_id} {kind:?} {:?} {timing}",
            event.click_type
        ));
    }
}

impl ScannerHandler for Recorder {
    fn on_advertisement_packet(&self, _: &Client, scan_id: u32, packet: &AdvertisementPacket) {
        self.note(format!("adv {scan_id} {} {}", packet.bd_addr, packet.name));
    }
}

impl ScanWizardHandler for Recorder {
    fn on_found_private_button(&self, _: &Client, id: u32) {
        self.note(format!("private {id}"));
    }

    fn on_found_public_button(&self, _: &Client, id: u32, bd_addr: BdAddr, name: &str) {
        self.note(format!("public {id} {bd_addr} {name}"));
    }

    fn on_button_connected(&self, _: &Client, id: u32, bd_addr: BdAddr, name: &str) {
        self.note(format!("connected {id} {bd_addr} {name}"));
    }

    fn on_completed(
        &self,
        _: &Client,
        id: u32,
        result: ScanWizardResult,
        bd_addr: Option<BdAddr>,
        name: Option<&str>,
    ) {
        let bd_addr = bd_addr.map(|a| a.to_string()).unwrap_or_else(|| "-".into());
        self.note(format!(
            "completed {id} {result:?} {bd_addr} {}",
            name.unwrap_or("-")
        ));
    }
}

impl GeneralHandler for Recorder {
    fn on_new_verified_button(&self, _: &Client, bd_addr: BdAddr) {
        self.note(format!("verified {bd_addr}"));
    }

    fn on_bluetooth_controller_state_change(&self, _: &Client, state: BluetoothControllerState) {
        self.note(format!("controller {state:?}"));
    }

    fn on_no_space_for_new_connection(&self, _: &Client, max: u8) {
        self.note(format!("no space {max}"));
    }

    fn on_got_space_for_new_connection(&self, _: &Client, max: u8) {
        self.note(format!("got space {max}"));
    }

    fn on_button_deleted(&self, _: &Client, bd_addr: BdAddr, by_us: bool) {
        self.note(format!("deleted {bd_addr} {by_us}"));
    }
}

pub fn daemon_info(max_pending: u8, verified: Vec<BdAddr>) -> DaemonInfo {
    DaemonInfo {
        bluetooth_controller_state: BluetoothControllerState::Attached,
        my_bd_addr: addr("00:11:22:33:44:55"),
        my_bd_addr_type: flicd_client::protocol::BdAddrType::PublicBdAddrType,
        max_pending_connections: max_pending,
        max_concurrently_connected_buttons: -1,
        current_pending_connections: 0,
        currently_no_space_for_new_connection: false,
        verified_buttons: verified,
    }
}

pub fn button_info(bd_addr: BdAddr, uuid: Option<[u8; 16]>) -> ButtonInfo {
    ButtonInfo {
        bd_addr,
        uuid: uuid.and_then(flicd_client::protocol::ButtonUuid::from_bytes),
        color: None,
        serial_number: None,
        flic_version: 2,
        firmware_version: 10,
    }
}
