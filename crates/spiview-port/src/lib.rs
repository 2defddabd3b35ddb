// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scene types and rendering backend port for spiview.
//!
//! This crate defines the contract between the scene state machine and the
//! renderers that draw what an MCU/FPGA pipeline is commanding. It contains NO
//! wire decoding; that lives in spiview-codec.
//!
//! # Design Principles
//!
//! - **Renderers are dumb**: they receive finalized frames and draw. No protocol logic.
//! - **Frames are snapshots**: a [`FrameSnapshot`] owns its instances and shares
//!   the shapes it references, so a renderer never observes a half-built frame.
//!
//! # Crate Features
//!
//! - `std` (default): Enables std library. Disable for no_std contexts.

#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

use thiserror::Error;

/// Error reported by a rendering backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The consumer side of the backend has gone away.
    #[error("backend disconnected")]
    Disconnected,
    /// A backend-specific failure.
    #[error("backend error: {0}")]
    Backend(alloc::string::String),
}

mod camera;
mod placement;
mod port;
mod types;

pub use camera::CameraPose;
pub use placement::{place_instance, PlacedTriangle, PlacementError};
pub use port::RenderBackend;
pub use types::{
    Color, FrameSnapshot, InstanceDescriptor, RotationMatrix, Shape, ShapeId, ShapeRegistry,
    Triangle, Vertex,
};
