// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! SPI command decoding and encoding.
//!
//! Message layout (byte offsets, big-endian fields):
//!
//! | Opcode           | Byte | Min len | Body                                              |
//! |------------------|------|---------|---------------------------------------------------|
//! | `Reset`          | 0x55 | 1       | -                                                 |
//! | `BeginUpload`    | 0xA0 | 2       | `[1]` shape id                                    |
//! | `UploadTriangle` | 0xA1 | 43      | 3 x (`u16` packed color, 3 x Q16.16) at `1+14*i`  |
//! | `AddInstance`    | 0xB0 | 51      | `[1]` last flag, `[2]` shape id, `[3..15)` pos, `[15..51)` rot |
//! | `FrameStart`     | 0xF0 | 1       | -                                                 |
//! | `FrameEnd`       | 0xF1 | 1       | -                                                 |
//! | `PositionCamera` | 0xC0 | 51      | same as `AddInstance`, bytes 1 and 2 unused       |
//!
//! Trailing bytes past the minimum length are ignored.

use core::fmt;

use spiview_port::{
    CameraPose, Color, InstanceDescriptor, RotationMatrix, ShapeId, Triangle, Vertex,
};
use thiserror::Error;

use crate::color::{decode_color, encode_color};
use crate::fixed::{read_rotation, read_vertex, write_rotation, write_vertex};

const OP_RESET: u8 = 0x55;
const OP_BEGIN_UPLOAD: u8 = 0xA0;
const OP_UPLOAD_TRIANGLE: u8 = 0xA1;
const OP_ADD_INSTANCE: u8 = 0xB0;
const OP_FRAME_START: u8 = 0xF0;
const OP_FRAME_END: u8 = 0xF1;
const OP_POSITION_CAMERA: u8 = 0xC0;

const CORNER_STRIDE: usize = 14;
const LAST_FLAG: u8 = 0x01;

/// Protocol opcode, identified by the first byte of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Drop every shape and all pending state.
    Reset,
    /// Start accumulating triangles for a shape.
    BeginUpload,
    /// One triangle of the active upload.
    UploadTriangle,
    /// Stage one shape instance for the current frame.
    AddInstance,
    /// Explicit start of a frame.
    FrameStart,
    /// Explicit end of a frame.
    FrameEnd,
    /// Move the camera.
    PositionCamera,
    /// Any byte this revision does not define.
    Unknown(u8),
}

impl Opcode {
    /// Resolve an opcode byte.
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            OP_RESET => Self::Reset,
            OP_BEGIN_UPLOAD => Self::BeginUpload,
            OP_UPLOAD_TRIANGLE => Self::UploadTriangle,
            OP_ADD_INSTANCE => Self::AddInstance,
            OP_FRAME_START => Self::FrameStart,
            OP_FRAME_END => Self::FrameEnd,
            OP_POSITION_CAMERA => Self::PositionCamera,
            other => Self::Unknown(other),
        }
    }

    /// Wire byte for this opcode.
    pub const fn byte(self) -> u8 {
        match self {
            Self::Reset => OP_RESET,
            Self::BeginUpload => OP_BEGIN_UPLOAD,
            Self::UploadTriangle => OP_UPLOAD_TRIANGLE,
            Self::AddInstance => OP_ADD_INSTANCE,
            Self::FrameStart => OP_FRAME_START,
            Self::FrameEnd => OP_FRAME_END,
            Self::PositionCamera => OP_POSITION_CAMERA,
            Self::Unknown(b) => b,
        }
    }

    /// Minimum message length (opcode byte included).
    pub const fn min_len(self) -> usize {
        match self {
            Self::Reset | Self::FrameStart | Self::FrameEnd | Self::Unknown(_) => 1,
            Self::BeginUpload => 2,
            Self::UploadTriangle => 1 + 3 * CORNER_STRIDE,
            Self::AddInstance | Self::PositionCamera => 51,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset => f.write_str("RESET"),
            Self::BeginUpload => f.write_str("BEGIN_UPLOAD"),
            Self::UploadTriangle => f.write_str("UPLOAD_TRIANGLE"),
            Self::AddInstance => f.write_str("ADD_INSTANCE"),
            Self::FrameStart => f.write_str("FRAME_START"),
            Self::FrameEnd => f.write_str("FRAME_END"),
            Self::PositionCamera => f.write_str("POSITION_CAMERA"),
            Self::Unknown(b) => write!(f, "UNKNOWN(0x{b:02X})"),
        }
    }
}

/// A decoded protocol command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Clear shapes, the active upload and staging.
    Reset,
    /// Begin uploading a shape.
    BeginUpload {
        /// Shape being uploaded.
        shape_id: ShapeId,
    },
    /// Append a triangle to the active upload.
    UploadTriangle(Triangle),
    /// Stage a shape instance.
    AddInstance(InstanceDescriptor),
    /// Start a frame.
    FrameStart,
    /// Finish a frame.
    FrameEnd,
    /// Update the camera pose.
    PositionCamera(CameraPose),
    /// Unrecognized opcode byte.
    Unknown(u8),
}

impl Command {
    /// Opcode this command is carried under.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Reset => Opcode::Reset,
            Self::BeginUpload { .. } => Opcode::BeginUpload,
            Self::UploadTriangle(_) => Opcode::UploadTriangle,
            Self::AddInstance(_) => Opcode::AddInstance,
            Self::FrameStart => Opcode::FrameStart,
            Self::FrameEnd => Opcode::FrameEnd,
            Self::PositionCamera(_) => Opcode::PositionCamera,
            Self::Unknown(b) => Opcode::Unknown(*b),
        }
    }
}

/// Errors produced while decoding one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Zero-length message.
    #[error("empty message")]
    Empty,
    /// Message shorter than its opcode requires.
    #[error("{opcode} message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Opcode resolved from byte 0.
        opcode: Opcode,
        /// Minimum length for `opcode`.
        expected: usize,
        /// Length actually received.
        actual: usize,
    },
}

/// Borrow a fixed-size window of `msg`, or report the message as truncated.
fn window<const N: usize>(
    msg: &[u8],
    offset: usize,
    opcode: Opcode,
) -> Result<&[u8; N], DecodeError> {
    msg.get(offset..offset + N)
        .and_then(|s| s.try_into().ok())
        .ok_or(DecodeError::Truncated {
            opcode,
            expected: offset + N,
            actual: msg.len(),
        })
}

fn decode_triangle(msg: &[u8]) -> Result<Triangle, DecodeError> {
    let mut vertices = [Vertex::ZERO; 3];
    let mut colors = [Color::BLACK; 3];
    for i in 0..3 {
        let at = 1 + i * CORNER_STRIDE;
        let packed = window::<2>(msg, at, Opcode::UploadTriangle)?;
        colors[i] = decode_color(u16::from_be_bytes(*packed));
        vertices[i] = read_vertex(window(msg, at + 2, Opcode::UploadTriangle)?);
    }
    Ok(Triangle { vertices, colors })
}

fn decode_placement(msg: &[u8], opcode: Opcode) -> Result<(Vertex, RotationMatrix), DecodeError> {
    let position = read_vertex(window(msg, 3, opcode)?);
    let rotation = read_rotation(window(msg, 15, opcode)?);
    Ok((position, rotation))
}

/// Decode one message payload.
///
/// Pure: no state, no I/O. Length is checked against [`Opcode::min_len`]
/// before any field is read.
pub fn decode(msg: &[u8]) -> Result<Command, DecodeError> {
    let Some(&first) = msg.first() else {
        return Err(DecodeError::Empty);
    };
    let opcode = Opcode::from_byte(first);
    let expected = opcode.min_len();
    if msg.len() < expected {
        return Err(DecodeError::Truncated {
            opcode,
            expected,
            actual: msg.len(),
        });
    }

    let cmd = match opcode {
        Opcode::Reset => Command::Reset,
        Opcode::BeginUpload => Command::BeginUpload {
            shape_id: window::<1>(msg, 1, opcode)?[0],
        },
        Opcode::UploadTriangle => Command::UploadTriangle(decode_triangle(msg)?),
        Opcode::AddInstance => {
            let header = window::<2>(msg, 1, opcode)?;
            let (position, rotation) = decode_placement(msg, opcode)?;
            Command::AddInstance(InstanceDescriptor {
                shape_id: header[1],
                position,
                rotation,
                is_last: header[0] == LAST_FLAG,
            })
        }
        Opcode::FrameStart => Command::FrameStart,
        Opcode::FrameEnd => Command::FrameEnd,
        Opcode::PositionCamera => {
            let (position, rotation) = decode_placement(msg, opcode)?;
            Command::PositionCamera(CameraPose { position, rotation })
        }
        Opcode::Unknown(b) => Command::Unknown(b),
    };
    Ok(cmd)
}

/// Encode a command exactly as the firmware packs it.
///
/// Coordinates are quantized by truncation toward zero, colors rounded to the
/// nearest 5-bit step.
pub fn encode(cmd: &Command) -> Vec<u8> {
    let opcode = cmd.opcode();
    let mut out = Vec::with_capacity(opcode.min_len());
    out.push(opcode.byte());
    match cmd {
        Command::Reset | Command::FrameStart | Command::FrameEnd | Command::Unknown(_) => {}
        Command::BeginUpload { shape_id } => out.push(*shape_id),
        Command::UploadTriangle(tri) => {
            for (v, c) in tri.vertices.iter().zip(tri.colors) {
                out.extend_from_slice(&encode_color(c).to_be_bytes());
                out.extend_from_slice(&write_vertex(*v));
            }
        }
        Command::AddInstance(inst) => {
            out.push(if inst.is_last { LAST_FLAG } else { 0x00 });
            out.push(inst.shape_id);
            out.extend_from_slice(&write_vertex(inst.position));
            out.extend_from_slice(&write_rotation(inst.rotation));
        }
        Command::PositionCamera(pose) => {
            out.extend_from_slice(&[0x00, 0x00]);
            out.extend_from_slice(&write_vertex(pose.position));
            out.extend_from_slice(&write_rotation(pose.rotation));
        }
    }
    out
}
