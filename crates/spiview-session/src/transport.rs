// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Byte sources for the reader thread.
//!
//! A [`Transport`] hands out raw bytes. An empty read means "nothing within
//! the timeout" and is not an error; `ErrorKind::UnexpectedEof` means the
//! stream is over.

use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

/// Default wait for one read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

const PUMP_CHUNK: usize = 4096;

/// Source of mirrored UART bytes.
pub trait Transport {
    /// Read up to `max_bytes`. Returns an empty vector if nothing arrived in
    /// time and `UnexpectedEof` once the source is exhausted.
    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>>;

    /// Release the underlying source. Further reads report end of stream.
    fn close(&mut self) {}
}

fn end_of_stream() -> io::Error {
    io::Error::new(ErrorKind::UnexpectedEof, "end of stream")
}

/// Chunked reads from any [`Read`], typically a captured UART log.
#[derive(Debug)]
pub struct ReplayTransport<R> {
    inner: Option<R>,
}

impl ReplayTransport<File> {
    /// Replay a capture file.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        File::open(path).map(Self::new)
    }
}

impl<R: Read> ReplayTransport<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self { inner: Some(inner) }
    }
}

impl<R: Read> Transport for ReplayTransport<R> {
    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        let Some(inner) = self.inner.as_mut() else {
            return Err(end_of_stream());
        };
        let mut buf = vec![0u8; max_bytes.max(1)];
        match inner.read(&mut buf) {
            Ok(0) => {
                self.inner = None;
                Err(end_of_stream())
            }
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    fn close(&mut self) {
        self.inner = None;
    }
}

/// A device node read by a background pump thread.
///
/// Blocking reads happen on the pump; [`Transport::read`] waits on a channel
/// for at most the configured timeout, so the caller can poll a stop flag
/// even if the device never produces a byte. Line settings (baud, parity) are
/// configured outside this process.
#[derive(Debug)]
pub struct DeviceTransport {
    rx: Option<Receiver<io::Result<Vec<u8>>>>,
    pending: Vec<u8>,
    timeout: Duration,
    pump: Option<JoinHandle<()>>,
}

impl DeviceTransport {
    /// Open a device node (e.g. `/dev/ttyUSB0`).
    pub fn open(path: impl AsRef<Path>, timeout: Duration) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        debug!(device = %path.display(), ?timeout, "device opened");
        Ok(Self::spawn(file, timeout))
    }

    /// Pump any blocking reader.
    pub fn spawn<R>(mut source: R, timeout: Duration) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let pump = thread::spawn(move || {
            let mut buf = vec![0u8; PUMP_CHUNK];
            loop {
                let msg = match source.read(&mut buf) {
                    Ok(0) => Err(end_of_stream()),
                    Ok(n) => Ok(buf[..n].to_vec()),
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => Err(err),
                };
                let last = msg.is_err();
                if tx.send(msg).is_err() || last {
                    break;
                }
            }
        });
        Self {
            rx: Some(rx),
            pending: Vec::new(),
            timeout,
            pump: Some(pump),
        }
    }

    /// Read timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Transport for DeviceTransport {
    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        if self.pending.is_empty() {
            let Some(rx) = self.rx.as_ref() else {
                return Err(end_of_stream());
            };
            match rx.recv_timeout(self.timeout) {
                Ok(Ok(bytes)) => self.pending = bytes,
                Ok(Err(err)) => {
                    self.rx = None;
                    return Err(err);
                }
                Err(RecvTimeoutError::Timeout) => return Ok(Vec::new()),
                Err(RecvTimeoutError::Disconnected) => {
                    self.rx = None;
                    return Err(end_of_stream());
                }
            }
        }
        let take = max_bytes.max(1).min(self.pending.len());
        Ok(self.pending.drain(..take).collect())
    }

    fn close(&mut self) {
        // The pump exits on its next send; a pump stuck in a blocking read is
        // left detached.
        self.rx = None;
        self.pending.clear();
        if let Some(pump) = self.pump.take() {
            if pump.is_finished() && pump.join().is_err() {
                warn!("device pump panicked");
            }
        }
    }
}

impl Drop for DeviceTransport {
    fn drop(&mut self) {
        self.close();
    }
}
