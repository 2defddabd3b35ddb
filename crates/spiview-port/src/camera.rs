// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Camera pose as commanded by the producer.

use crate::types::{RotationMatrix, Vertex};

/// Camera position and orientation.
///
/// The rotation's third column is the viewing axis and its second column the
/// up vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraPose {
    /// Camera position in world space.
    pub position: Vertex,
    /// Camera orientation.
    pub rotation: RotationMatrix,
}

impl CameraPose {
    /// Viewing direction (third column of the rotation).
    pub fn forward(&self) -> Vertex {
        self.rotation.column(2)
    }

    /// Up vector (second column of the rotation).
    pub fn up(&self) -> Vertex {
        self.rotation.column(1)
    }
}
