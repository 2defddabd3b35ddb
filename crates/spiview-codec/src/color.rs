// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Packed 15-bit color (`0RRRRRGGGGGBBBBB`, big-endian on the wire).

use spiview_port::Color;

const CHANNEL_MAX: u16 = 0x1F;

fn channel(packed: u16, shift: u16) -> f32 {
    f32::from((packed >> shift) & CHANNEL_MAX) / f32::from(CHANNEL_MAX)
}

/// Decode a packed color. Bit 15 is ignored.
pub fn decode_color(packed: u16) -> Color {
    Color::new(channel(packed, 10), channel(packed, 5), channel(packed, 0))
}

fn quantize(c: f32) -> u16 {
    (c.clamp(0.0, 1.0) * f32::from(CHANNEL_MAX)).round() as u16
}

/// Pack a color, rounding each channel to the nearest 5-bit step.
pub fn encode_color(color: Color) -> u16 {
    (quantize(color.r) << 10) | (quantize(color.g) << 5) | quantize(color.b)
}
