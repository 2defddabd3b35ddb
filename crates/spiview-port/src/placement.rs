// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Model-to-world placement of instanced shapes.
//!
//! Every triangle conversion returns an explicit result so a renderer can skip
//! and record one bad primitive without losing the rest of the frame.

use alloc::vec::Vec;
use thiserror::Error;

use crate::types::{Color, FrameSnapshot, InstanceDescriptor, ShapeId, Vertex};

/// A triangle transformed into world space, ready to draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedTriangle {
    /// World-space corners.
    pub vertices: [Vertex; 3],
    /// Corner colors.
    pub colors: [Color; 3],
}

/// Why a primitive could not be materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// The instance references a shape that was never committed.
    #[error("instance {instance} references unknown shape {shape}")]
    UnknownShape {
        /// Position of the instance within the frame.
        instance: usize,
        /// Missing shape id.
        shape: ShapeId,
    },
    /// The transformed triangle has a non-finite coordinate.
    #[error("triangle {triangle} of shape {shape} is not finite after placement")]
    NonFinite {
        /// Shape the triangle belongs to.
        shape: ShapeId,
        /// Triangle index within the shape.
        triangle: usize,
    },
}

/// Place every triangle of the shape referenced by `frame.instances[index]`.
///
/// Returns the placed triangles and one error per triangle that was skipped.
/// An unknown shape yields no triangles and a single error.
pub fn place_instance(
    frame: &FrameSnapshot,
    index: usize,
    instance: &InstanceDescriptor,
) -> (Vec<PlacedTriangle>, Vec<PlacementError>) {
    let Some(shape) = frame.shape_for(instance) else {
        return (
            Vec::new(),
            alloc::vec![PlacementError::UnknownShape {
                instance: index,
                shape: instance.shape_id,
            }],
        );
    };

    let mut placed = Vec::with_capacity(shape.triangles.len());
    let mut errors = Vec::new();
    for (i, tri) in shape.triangles.iter().enumerate() {
        let vertices = tri
            .vertices
            .map(|v| instance.rotation.apply(v).add(instance.position));
        if vertices.iter().all(|v| v.is_finite()) {
            placed.push(PlacedTriangle {
                vertices,
                colors: tri.colors,
            });
        } else {
            errors.push(PlacementError::NonFinite {
                shape: shape.id,
                triangle: i,
            });
        }
    }
    (placed, errors)
}
