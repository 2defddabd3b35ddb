// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use spiview_codec::DecodeError;
use spiview_port::BackendError;
use spiview_wire::FramingOverflow;
use thiserror::Error;

use crate::machine::SceneError;

/// Anything that can go wrong between transport bytes and the backend.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The extractor dropped bytes to stay under its cap.
    #[error(transparent)]
    Framing(#[from] FramingOverflow),
    /// A message could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// A decoded command was rejected by the state machine.
    #[error(transparent)]
    Scene(#[from] SceneError),
    /// The rendering backend refused an update.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// The transport failed; the reader stops.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    /// The reader thread panicked.
    #[error("reader thread panicked")]
    ReaderPanicked,
}

impl PipelineError {
    /// True for conditions that end the reader loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ReaderPanicked)
    }
}
