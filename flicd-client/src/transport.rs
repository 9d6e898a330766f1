//! Frame transport
//!
//! The event loop reads whole frames from a [`FrameSource`] on a dedicated
//! reader thread and writes them through a [`FrameSink`] shared by every
//! client handle. [`TcpTransport`] is the implementation over the daemon's
//! socket.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use flicd_protocol::{Frame, FrameParser};
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Size of one socket read
const READ_CHUNK: usize = 1024;

/// Receiving half of a frame transport
pub trait FrameSource: Send {
    /// Block until one complete frame has arrived
    fn receive_frame(&mut self) -> Result<Frame>;
}

/// Sending half of a frame transport
pub trait FrameSink: Send {
    /// Write one complete frame
    fn send_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Close the stream in both directions, waking a blocked reader
    fn shutdown(&mut self) -> Result<()>;
}

/// Receiving half of a byte stream, reassembling frames from arbitrary reads
pub struct StreamSource<R> {
    reader: R,
    parser: FrameParser,
    ready: std::collections::VecDeque<Frame>,
    scratch: Vec<Frame>,
}

impl<R: Read> StreamSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            parser: FrameParser::new(),
            ready: Default::default(),
            scratch: Vec::new(),
        }
    }
}

impl<R: Read + Send> FrameSource for StreamSource<R> {
    fn receive_frame(&mut self) -> Result<Frame> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(frame);
            }
            let n = match self.reader.read(&mut buf) {
                Ok(0) => return Err(ClientError::Disconnected),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            trace!(bytes = n, "rx");
            self.parser.feed_bytes(&buf[..n], &mut self.scratch);
            self.ready.extend(self.scratch.drain(..));
        }
    }
}

/// Byte stream that can be closed in both directions at once
///
/// Closing must wake a reader blocked on the other half of the stream.
pub trait StreamShutdown {
    fn shutdown_both(&mut self) -> io::Result<()>;
}

impl StreamShutdown for TcpStream {
    fn shutdown_both(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

#[cfg(unix)]
impl StreamShutdown for std::os::unix::net::UnixStream {
    fn shutdown_both(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

/// Sending half of a byte stream
pub struct StreamSink<W> {
    writer: W,
}

impl<W: Write> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W> FrameSink for StreamSink<W>
where
    W: Write + StreamShutdown + Send,
{
    fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        let bytes = frame.encode_to_vec()?;
        self.writer.write_all(&bytes)?;
        trace!(opcode = frame.opcode, bytes = bytes.len(), "tx");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        match self.writer.shutdown_both() {
            Ok(()) => Ok(()),
            // Already torn down by the peer
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// TCP connection to the daemon
pub struct TcpTransport;

impl TcpTransport {
    /// Connect and split the socket into its reading and writing halves
    pub fn connect(
        config: &ClientConfig,
    ) -> Result<(StreamSource<TcpStream>, StreamSink<TcpStream>)> {
        let stream = Self::open(config)?;
        stream.set_nodelay(config.tcp_nodelay)?;
        let reader = stream.try_clone()?;
        debug!(host = %config.host, port = config.port, "connected to daemon");
        Ok((StreamSource::new(reader), StreamSink::new(stream)))
    }

    fn open(config: &ClientConfig) -> Result<TcpStream> {
        let addrs = (config.host.as_str(), config.port).to_socket_addrs()?;
        let Some(timeout) = config.connect_timeout() else {
            return Ok(TcpStream::connect(addrs.collect::<Vec<_>>().as_slice())?);
        };

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(%addr, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::AddrNotAvailable, "host resolved to no address")
            })
            .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Reader yielding fixed chunks, then EOF
    struct Chunks(Vec<Vec<u8>>);

    impl Read for Chunks {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() {
                return Ok(0);
            }
            let chunk = self.0.remove(0);
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_source_reassembles_split_frames() {
        let a = Frame::new(13, vec![1, 0, 0, 0]).unwrap().encode_to_vec().unwrap();
        let b = Frame::empty(8).encode_to_vec().unwrap();
        let mut joined = a.clone();
        joined.extend(&b);

        let mut source = StreamSource::new(Chunks(vec![
            joined[..2].to_vec(),
            joined[2..6].to_vec(),
            joined[6..].to_vec(),
        ]));

        assert_eq!(source.receive_frame().unwrap().opcode, 13);
        assert_eq!(source.receive_frame().unwrap(), Frame::empty(8));
        assert!(matches!(
            source.receive_frame(),
            Err(ClientError::Disconnected)
        ));
    }

    /// In-memory stream recording writes and shutdowns
    #[derive(Default)]
    struct Recording {
        written: Vec<u8>,
        shut: bool,
    }

    impl Write for Recording {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.shut {
                return Err(io::ErrorKind::BrokenPipe.into());
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl StreamShutdown for Recording {
        fn shutdown_both(&mut self) -> io::Result<()> {
            if self.shut {
                return Err(io::ErrorKind::NotConnected.into());
            }
            self.shut = true;
            Ok(())
        }
    }

    #[test]
    fn test_sink_over_any_stream() {
        let frame = Frame::new(7, vec![3, 0, 0, 0]).unwrap();
        let mut sink = StreamSink::new(Recording::default());

        sink.send_frame(&frame).unwrap();
        assert_eq!(sink.writer.written, frame.encode_to_vec().unwrap());

        sink.shutdown().unwrap();
        // Second shutdown sees NotConnected and is still fine
        sink.shutdown().unwrap();
        assert!(sink.writer.shut);
        assert!(matches!(sink.send_frame(&frame), Err(ClientError::Io(_))));
    }

    #[test]
    fn test_source_eof_mid_frame() {
        let mut source = StreamSource::new(Chunks(vec![vec![5, 0, 13]]));
        assert!(matches!(
            source.receive_frame(),
            Err(ClientError::Disconnected)
        ));
    }

    proptest! {
        #[test]
        fn prop_frames_survive_any_read_split(
            payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..40), 1..8),
            chunk in 1usize..64,
        ) {
            let frames: Vec<Frame> = payloads
                .into_iter()
                .enumerate()
                .map(|(i, p)| Frame::new(i as u8, p).unwrap())
                .collect();
            let stream: Vec<u8> = frames
                .iter()
                .flat_map(|f| f.encode_to_vec().unwrap())
                .collect();

            let mut source = StreamSource::new(Chunks(
                stream.chunks(chunk).map(<[u8]>::to_vec).collect(),
            ));
            for frame in &frames {
                prop_assert_eq!(&source.receive_frame().unwrap(), frame);
            }
            prop_assert!(matches!(source.receive_frame(), Err(ClientError::Disconnected)));
        }
    }
}
