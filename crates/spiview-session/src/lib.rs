// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scene session for spiview: state machine, transports and the reader thread.
//!
//! Data flows one way:
//!
//! transport bytes → [`spiview_wire::FrameExtractor`] → [`spiview_codec::decode`]
//! → [`SceneMachine`] → [`spiview_port::RenderBackend`]
//!
//! A [`Pipeline`] owns the extractor and the backend and runs on the reader
//! thread started by [`spawn_reader`]. The scene itself lives in a shared
//! [`SceneSession`] whose lock is never held while a backend runs. Use
//! [`channel_backend`] to get finalized frames onto another thread.

mod channel;
mod error;
mod machine;
mod reader;
mod session;
mod transport;

pub use channel::{channel_backend, ChannelBackend, FrameReceiver, ViewerEvent};
pub use error::PipelineError;
pub use machine::{
    FrameTrigger, SceneError, SceneEvent, SceneMachine, SceneState, SceneStats, UploadSession,
};
pub use reader::{spawn_reader, ReaderExit, ReaderHandle, ReaderOutcome, DEFAULT_CHUNK};
pub use session::{Pipeline, PipelineStats, SceneSession, SessionStats};
pub use transport::{DeviceTransport, ReplayTransport, Transport, DEFAULT_READ_TIMEOUT};
