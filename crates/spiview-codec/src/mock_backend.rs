// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mock backend for headless testing of RenderBackend consumers.
//!
//! MockBackend keeps what a renderer would hold (shapes, staged instances,
//! camera) plus an ordered call log, without drawing anything.

use std::collections::BTreeMap;

use spiview_port::{
    BackendError, CameraPose, FrameSnapshot, InstanceDescriptor, RenderBackend, ShapeId, Triangle,
};

/// One recorded call into the backend.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    /// `save_shape` with the shape id and triangle count.
    SaveShape {
        /// Shape id.
        id: ShapeId,
        /// Number of triangles saved.
        triangles: usize,
    },
    /// `stage_instance`.
    StageInstance(InstanceDescriptor),
    /// `clear_staging`.
    ClearStaging,
    /// `render_frame` with the frame index.
    RenderFrame(u64),
    /// `set_camera`.
    SetCamera(CameraPose),
    /// `reset`.
    Reset,
}

/// Mock rendering backend for tests.
///
/// Implements `RenderBackend` by recording state and calls.
#[derive(Debug, Default)]
pub struct MockBackend {
    /// Shapes as last saved.
    pub shapes: BTreeMap<ShapeId, Vec<Triangle>>,
    /// Instances passed through since the last clear.
    pub staged: Vec<InstanceDescriptor>,
    /// Every frame rendered, in order.
    pub frames: Vec<FrameSnapshot>,
    /// Current camera pose, if one was set.
    pub camera: Option<CameraPose>,
    /// Ordered log of calls.
    pub calls: Vec<BackendCall>,
    /// When set, `render_frame` fails with this error.
    pub fail_render: Option<BackendError>,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `render_frame` calls.
    pub fn render_count(&self) -> usize {
        self.frames.len()
    }

    /// Most recent rendered frame.
    pub fn last_frame(&self) -> Option<&FrameSnapshot> {
        self.frames.last()
    }

    /// Number of calls matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl RenderBackend for MockBackend {
    fn save_shape(&mut self, id: ShapeId, triangles: &[Triangle]) {
        self.shapes.insert(id, triangles.to_vec());
        self.calls.push(BackendCall::SaveShape {
            id,
            triangles: triangles.len(),
        });
    }

    fn stage_instance(&mut self, instance: &InstanceDescriptor) {
        self.staged.push(*instance);
        self.calls.push(BackendCall::StageInstance(*instance));
    }

    fn clear_staging(&mut self) {
        self.staged.clear();
        self.calls.push(BackendCall::ClearStaging);
    }

    fn render_frame(&mut self, frame: &FrameSnapshot) -> Result<(), BackendError> {
        self.calls.push(BackendCall::RenderFrame(frame.index));
        if let Some(err) = &self.fail_render {
            return Err(err.clone());
        }
        self.frames.push(frame.clone());
        self.staged.clear();
        Ok(())
    }

    fn set_camera(&mut self, pose: &CameraPose) -> Result<(), BackendError> {
        self.camera = Some(*pose);
        self.calls.push(BackendCall::SetCamera(*pose));
        Ok(())
    }

    fn reset(&mut self) {
        self.shapes.clear();
        self.staged.clear();
        self.calls.push(BackendCall::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spiview_port::{Color, RotationMatrix, Vertex};

    fn tri() -> Triangle {
        Triangle {
            vertices: [Vertex::ZERO; 3],
            colors: [Color::WHITE; 3],
        }
    }

    fn instance(shape_id: ShapeId) -> InstanceDescriptor {
        InstanceDescriptor {
            shape_id,
            position: Vertex::ZERO,
            rotation: RotationMatrix::IDENTITY,
            is_last: false,
        }
    }

    #[test]
    fn save_shape_replaces_previous_geometry() {
        let mut backend = MockBackend::new();
        backend.save_shape(1, &[tri(), tri()]);
        backend.save_shape(1, &[tri()]);
        assert_eq!(backend.shapes[&1].len(), 1);
        assert_eq!(
            backend.count_calls(|c| matches!(c, BackendCall::SaveShape { id: 1, .. })),
            2
        );
    }

    #[test]
    fn render_clears_pass_through_staging() {
        let mut backend = MockBackend::new();
        backend.stage_instance(&instance(1));
        backend.stage_instance(&instance(2));
        assert_eq!(backend.staged.len(), 2);
        backend
            .render_frame(&FrameSnapshot::default())
            .expect("render");
        assert!(backend.staged.is_empty());
        assert_eq!(backend.render_count(), 1);
    }

    #[test]
    fn failing_render_is_logged_but_not_kept() {
        let mut backend = MockBackend {
            fail_render: Some(BackendError::Disconnected),
            ..MockBackend::default()
        };
        let err = backend.render_frame(&FrameSnapshot::default()).unwrap_err();
        assert_eq!(err, BackendError::Disconnected);
        assert_eq!(backend.render_count(), 0);
        assert_eq!(backend.calls, vec![BackendCall::RenderFrame(0)]);
    }

    #[test]
    fn reset_drops_shapes_but_keeps_camera() {
        let mut backend = MockBackend::new();
        backend.save_shape(3, &[tri()]);
        backend.set_camera(&CameraPose::default()).expect("camera");
        backend.reset();
        assert!(backend.shapes.is_empty());
        assert!(backend.camera.is_some());
    }
}
