// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Transport reader thread.

use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use spiview_port::RenderBackend;
use tracing::{debug, error, info};

use crate::error::PipelineError;
use crate::session::Pipeline;
use crate::transport::Transport;

/// Default bytes requested per transport read.
pub const DEFAULT_CHUNK: usize = 64;

/// Why a reader loop ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    /// [`ReaderHandle::stop`] was called.
    Stopped,
    /// The transport reported end of stream.
    EndOfStream,
}

/// A finished reader: how it ended plus the pipeline it drove.
#[derive(Debug)]
pub struct ReaderOutcome<B> {
    /// Exit reason.
    pub exit: ReaderExit,
    /// The pipeline, with its backend.
    pub pipeline: Pipeline<B>,
}

/// Handle to a running reader thread.
#[derive(Debug)]
pub struct ReaderHandle<B> {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<Result<ReaderOutcome<B>, PipelineError>>,
}

impl<B> ReaderHandle<B> {
    /// Ask the loop to stop after its current read.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// True once the thread has returned.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Stop and wait. Returns within one transport timeout.
    pub fn stop(self) -> Result<ReaderOutcome<B>, PipelineError> {
        self.request_stop();
        self.join()
    }

    /// Wait for the loop to end on its own.
    pub fn join(self) -> Result<ReaderOutcome<B>, PipelineError> {
        self.thread
            .join()
            .map_err(|_| PipelineError::ReaderPanicked)?
    }
}

/// Spawn the reader thread.
///
/// The loop reads up to `chunk` bytes at a time, pushes them through
/// `pipeline`, and checks the stop flag between reads. End of stream ends it
/// cleanly; any other transport error ends it with
/// [`PipelineError::Transport`]. The transport is closed either way.
pub fn spawn_reader<T, B>(
    mut transport: T,
    mut pipeline: Pipeline<B>,
    chunk: usize,
) -> ReaderHandle<B>
where
    T: Transport + Send + 'static,
    B: RenderBackend + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let chunk = chunk.max(1);
    let thread = thread::spawn(move || {
        info!(chunk, "reader started");
        let exit = loop {
            if flag.load(Ordering::Acquire) {
                break ReaderExit::Stopped;
            }
            match transport.read(chunk) {
                Ok(bytes) if bytes.is_empty() => {}
                Ok(bytes) => {
                    pipeline.push(&bytes);
                }
                Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                    break ReaderExit::EndOfStream;
                }
                Err(err) => {
                    error!(error = %err, "transport read failed");
                    transport.close();
                    return Err(PipelineError::Transport(err));
                }
            }
        };
        transport.close();
        debug!(?exit, messages = pipeline.framing_stats().messages, "reader finished");
        Ok(ReaderOutcome { exit, pipeline })
    });
    ReaderHandle { stop, thread }
}
