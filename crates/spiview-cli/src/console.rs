// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Log-only renderer.
//!
//! Materializes every frame the way a drawing backend would (each instance
//! placed into world space) and reports what it would have drawn. Primitives
//! that cannot be placed are logged and skipped; the rest of the frame is kept.

use spiview_port::{
    place_instance, BackendError, CameraPose, FrameSnapshot, RenderBackend, ShapeId, Triangle,
};
use spiview_session::ViewerEvent;
use tracing::{debug, info, warn};

/// Totals across every frame shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsoleReport {
    /// Frames drawn.
    pub frames: u64,
    /// Triangles placed.
    pub triangles: u64,
    /// Triangles or instances skipped.
    pub skipped: u64,
    /// Camera updates applied.
    pub camera_moves: u64,
    /// Index of the most recent frame.
    pub last_frame: Option<u64>,
}

/// Renderer that writes to the log instead of a window.
#[derive(Debug, Default)]
pub struct ConsoleBackend {
    report: ConsoleReport,
}

impl ConsoleBackend {
    /// Apply one event received from the reader thread.
    pub fn show(&mut self, event: &ViewerEvent) {
        let result = match event {
            ViewerEvent::Frame(frame) => self.render_frame(frame),
            ViewerEvent::Camera(pose) => self.set_camera(pose),
            ViewerEvent::Reset => {
                self.reset();
                Ok(())
            }
        };
        if let Err(err) = result {
            warn!(error = %err, "console backend failed");
        }
    }

    /// Totals so far.
    pub fn report(&self) -> ConsoleReport {
        self.report
    }
}

impl RenderBackend for ConsoleBackend {
    fn save_shape(&mut self, id: ShapeId, triangles: &[Triangle]) {
        debug!(shape = id, triangles = triangles.len(), "shape saved");
    }

    fn clear_staging(&mut self) {}

    fn render_frame(&mut self, frame: &FrameSnapshot) -> Result<(), BackendError> {
        let mut drawn = 0usize;
        let mut skipped = 0usize;
        for (index, instance) in frame.instances.iter().enumerate() {
            let (placed, errors) = place_instance(frame, index, instance);
            drawn += placed.len();
            skipped += errors.len();
            for err in errors {
                warn!(frame = frame.index, error = %err, "primitive skipped");
            }
        }
        info!(
            frame = frame.index,
            instances = frame.instances.len(),
            triangles = drawn,
            skipped,
            "frame"
        );
        self.report.frames += 1;
        self.report.triangles += drawn as u64;
        self.report.skipped += skipped as u64;
        self.report.last_frame = Some(frame.index);
        Ok(())
    }

    fn set_camera(&mut self, pose: &CameraPose) -> Result<(), BackendError> {
        self.report.camera_moves += 1;
        info!(
            position = ?pose.position.to_array(),
            forward = ?pose.forward().to_array(),
            up = ?pose.up().to_array(),
            "camera"
        );
        Ok(())
    }

    fn reset(&mut self) {
        info!("scene reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spiview_port::{Color, InstanceDescriptor, RotationMatrix, Shape, Vertex};
    use std::sync::Arc;

    fn frame_with(shape: Option<Shape>, shape_id: ShapeId) -> FrameSnapshot {
        let mut frame = FrameSnapshot {
            index: 4,
            instances: vec![InstanceDescriptor {
                shape_id,
                position: Vertex::new(1.0, 2.0, 3.0),
                rotation: RotationMatrix::IDENTITY,
                is_last: true,
            }],
            ..FrameSnapshot::default()
        };
        if let Some(shape) = shape {
            frame.shapes.insert(shape.id, Arc::new(shape));
        }
        frame
    }

    fn tri(x: f64) -> Triangle {
        Triangle {
            vertices: [Vertex::new(x, 0.0, 0.0), Vertex::ZERO, Vertex::ZERO],
            colors: [Color::WHITE; 3],
        }
    }

    #[test]
    fn counts_drawn_and_skipped_primitives() {
        let mut console = ConsoleBackend::default();
        let shape = Shape::new(1, vec![tri(1.0), tri(f64::INFINITY), tri(2.0)]);
        console.show(&ViewerEvent::Frame(frame_with(Some(shape), 1)));
        let report = console.report();
        assert_eq!(report.frames, 1);
        assert_eq!(report.triangles, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.last_frame, Some(4));
    }

    #[test]
    fn unknown_shape_skips_the_instance() {
        let mut console = ConsoleBackend::default();
        console.show(&ViewerEvent::Frame(frame_with(None, 9)));
        assert_eq!(console.report().triangles, 0);
        assert_eq!(console.report().skipped, 1);
    }

    #[test]
    fn camera_and_reset_are_tracked() {
        let mut console = ConsoleBackend::default();
        console.show(&ViewerEvent::Camera(CameraPose::default()));
        console.show(&ViewerEvent::Reset);
        assert_eq!(console.report().camera_moves, 1);
        assert_eq!(console.report().frames, 0);
    }
}
