// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rendering backend port trait.

use crate::{BackendError, CameraPose, FrameSnapshot, InstanceDescriptor, ShapeId, Triangle};

/// Rendering backend port.
///
/// Implementors receive geometry and finalized frames and draw them. They own
/// no protocol state: the scene state machine decides when a shape is
/// committed and when a frame is complete.
///
/// # Design
///
/// This trait is a hexagonal port. The session emits events after releasing
/// its state lock; adapters (console logger, channel bridge, test recorder)
/// implement this trait.
pub trait RenderBackend {
    /// Register or replace a shape's geometry.
    fn save_shape(&mut self, id: ShapeId, triangles: &[Triangle]);

    /// Raw pass-through of one staged instance.
    ///
    /// Backends that only consume finalized frames can ignore this.
    fn stage_instance(&mut self, instance: &InstanceDescriptor) {
        let _ = instance;
    }

    /// Discard any pending per-frame state.
    fn clear_staging(&mut self);

    /// Draw one complete frame.
    fn render_frame(&mut self, frame: &FrameSnapshot) -> Result<(), BackendError>;

    /// Update the viewpoint.
    fn set_camera(&mut self, pose: &CameraPose) -> Result<(), BackendError>;

    /// Discard all backend-held geometry and instances.
    fn reset(&mut self);
}
