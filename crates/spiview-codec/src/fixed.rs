// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Q16.16 fixed-point helpers.
//!
//! The producer packs every coordinate and matrix element as a signed
//! big-endian 32-bit integer scaled by 65536. Readers here take fixed-size
//! windows, so a caller cannot ask them to read past a slice boundary.

use spiview_port::{RotationMatrix, Vertex};

/// Scale between raw Q16.16 bits and the real value.
pub const Q16_16_SCALE: f64 = 65536.0;

/// Q16.16 fixed-point scalar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fx16(i32);

impl Fx16 {
    /// 1.0 in Q16.16.
    pub const ONE: Self = Self(1 << 16);

    /// Construct directly from raw Q16.16 bits.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Return the raw Q16.16 representation.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Decode from the big-endian wire form.
    pub const fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(i32::from_be_bytes(bytes))
    }

    /// Encode to the big-endian wire form.
    pub const fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Exact real value (`raw / 65536`). Every i32 is representable in f64.
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / Q16_16_SCALE
    }

    /// Quantize a real value the way the firmware does: scale, then truncate
    /// toward zero. Out-of-range values saturate and NaN maps to zero.
    pub fn from_f64(value: f64) -> Self {
        Self((value * Q16_16_SCALE) as i32)
    }
}

fn word<const N: usize>(bytes: &[u8; N], index: usize) -> Fx16 {
    let at = index * 4;
    Fx16::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Read three Q16.16 values (x, y, z).
pub fn read_vertex(bytes: &[u8; 12]) -> Vertex {
    Vertex::new(
        word(bytes, 0).to_f64(),
        word(bytes, 1).to_f64(),
        word(bytes, 2).to_f64(),
    )
}

/// Read nine Q16.16 values as a row-major 3x3 matrix.
pub fn read_rotation(bytes: &[u8; 36]) -> RotationMatrix {
    RotationMatrix(core::array::from_fn(|i| word(bytes, i).to_f64()))
}

/// Pack a vertex as three Q16.16 values.
pub fn write_vertex(v: Vertex) -> [u8; 12] {
    let mut out = [0u8; 12];
    for (chunk, c) in out.chunks_exact_mut(4).zip(v.to_array()) {
        chunk.copy_from_slice(&Fx16::from_f64(c).to_be_bytes());
    }
    out
}

/// Pack a row-major matrix as nine Q16.16 values.
pub fn write_rotation(m: RotationMatrix) -> [u8; 36] {
    let mut out = [0u8; 36];
    for (chunk, c) in out.chunks_exact_mut(4).zip(m.0) {
        chunk.copy_from_slice(&Fx16::from_f64(c).to_be_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_values() {
        assert_eq!(Fx16::from_be_bytes([0, 0, 0, 0]).to_f64(), 0.0);
        assert_eq!(Fx16::from_be_bytes([0xFF, 0xFF, 0x00, 0x00]).to_f64(), -1.0);
        assert_eq!(Fx16::from_be_bytes([0x00, 0x01, 0x00, 0x00]).to_f64(), 1.0);
        assert_eq!(Fx16::from_be_bytes([0x00, 0x00, 0x80, 0x00]).to_f64(), 0.5);
        assert_eq!(Fx16::from_f64(1.0), Fx16::ONE);
    }

    #[test]
    fn quantize_truncates_toward_zero() {
        let step = 1.0 / Q16_16_SCALE;
        assert_eq!(Fx16::from_f64(step * 0.9).raw(), 0);
        assert_eq!(Fx16::from_f64(-step * 0.9).raw(), 0);
        assert_eq!(Fx16::from_f64(-1.5).raw(), -98304);
    }

    #[test]
    fn quantize_saturates_and_zeroes_nan() {
        assert_eq!(Fx16::from_f64(1.0e9).raw(), i32::MAX);
        assert_eq!(Fx16::from_f64(-1.0e9).raw(), i32::MIN);
        assert_eq!(Fx16::from_f64(f64::NAN).raw(), 0);
    }

    #[test]
    fn vertex_layout_is_x_then_y_then_z() {
        let bytes = [
            0x00, 0x02, 0x00, 0x00, // 2.0
            0xFF, 0xFF, 0x00, 0x00, // -1.0
            0x00, 0x00, 0x40, 0x00, // 0.25
        ];
        assert_eq!(read_vertex(&bytes), Vertex::new(2.0, -1.0, 0.25));
        assert_eq!(write_vertex(Vertex::new(2.0, -1.0, 0.25)), bytes);
    }

    #[test]
    fn identity_rotation_packs_ones_on_diagonal() {
        let bytes = write_rotation(RotationMatrix::IDENTITY);
        assert_eq!(&bytes[0..4], &[0x00, 0x01, 0x00, 0x00]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
        assert_eq!(&bytes[16..20], &[0x00, 0x01, 0x00, 0x00]);
        assert_eq!(read_rotation(&bytes), RotationMatrix::IDENTITY);
    }
}
