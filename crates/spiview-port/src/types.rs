// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Core scene types shared by the decoder, the state machine and renderers.
//!
//! These types are pure domain objects with no wire logic.
//! Fixed-point decoding is handled by spiview-codec.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

/// Shape identifier as carried on the wire (one byte).
pub type ShapeId = u8;

/// Registry of committed shapes, keyed by id.
///
/// Shapes are shared so that frame snapshots can reference them without copying
/// triangle data.
pub type ShapeRegistry = BTreeMap<ShapeId, Arc<Shape>>;

/// A point or offset in model/world space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vertex {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Construct a vertex from components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Components as an array `[x, y, z]`.
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Component-wise sum.
    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    /// True when every component is finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Vertex {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Row-major 3x3 rotation matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotationMatrix(pub [f64; 9]);

impl RotationMatrix {
    /// The identity rotation.
    pub const IDENTITY: Self = Self([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    /// Element at `(row, col)`.
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.0[row * 3 + col]
    }

    /// Column `col` as a vector.
    pub fn column(&self, col: usize) -> Vertex {
        Vertex::new(self.at(0, col), self.at(1, col), self.at(2, col))
    }

    /// Rotate `v` by this matrix (`M * v`).
    pub fn apply(&self, v: Vertex) -> Vertex {
        let m = &self.0;
        Vertex::new(
            m[0] * v.x + m[1] * v.y + m[2] * v.z,
            m[3] * v.x + m[4] * v.y + m[5] * v.z,
            m[6] * v.x + m[7] * v.y + m[8] * v.z,
        )
    }
}

impl Default for RotationMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Normalized RGB color, each channel in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
}

impl Color {
    /// Black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    /// White.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    /// Construct a color from channels.
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// One mesh triangle with a color per vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    /// Corner positions in model space.
    pub vertices: [Vertex; 3],
    /// Corner colors, index-aligned with `vertices`.
    pub colors: [Color; 3],
}

/// A committed mesh: an id plus its triangles in upload order.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    /// Shape identifier.
    pub id: ShapeId,
    /// Triangles in the order they were uploaded.
    pub triangles: Vec<Triangle>,
}

impl Shape {
    /// Construct a shape.
    pub fn new(id: ShapeId, triangles: Vec<Triangle>) -> Self {
        Self { id, triangles }
    }
}

/// Placement of one shape within the frame being built.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstanceDescriptor {
    /// Shape to draw.
    pub shape_id: ShapeId,
    /// World-space translation.
    pub position: Vertex,
    /// Orientation applied before translation.
    pub rotation: RotationMatrix,
    /// Producer flag marking the final instance of a frame.
    pub is_last: bool,
}

/// A finalized frame handed to a renderer.
///
/// Owns the staged instances (arrival order) and shares every shape they
/// reference. Later uploads or resets never alter a snapshot already taken.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameSnapshot {
    /// Monotonic frame counter (per session, starts at 0).
    pub index: u64,
    /// Staged instances in arrival order.
    pub instances: Vec<InstanceDescriptor>,
    /// Shapes referenced by `instances` that were registered at finalize time.
    pub shapes: ShapeRegistry,
}

impl FrameSnapshot {
    /// Shape referenced by `instance`, if it was registered.
    pub fn shape_for(&self, instance: &InstanceDescriptor) -> Option<&Arc<Shape>> {
        self.shapes.get(&instance.shape_id)
    }

    /// Total triangles this frame would draw.
    pub fn triangle_count(&self) -> usize {
        self.instances
            .iter()
            .filter_map(|i| self.shape_for(i))
            .map(|s| s.triangles.len())
            .sum()
    }

    /// True when the frame has no instances.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
