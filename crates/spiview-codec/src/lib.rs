// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! SPI command codec and test harness for spiview-port.
//!
//! This crate provides:
//! - Q16.16 fixed-point and packed 15-bit color conversion
//! - `decode`/`encode` for every protocol command
//! - MockBackend for headless testing of RenderBackend consumers
//!
//! # Design
//!
//! Wire layout is kept out of the port contract. The decoder is a pure function
//! that validates length before it indexes, so a short message is rejected and
//! never read past its end.

mod color;
mod command;
mod fixed;
mod mock_backend;

pub use color::{decode_color, encode_color};
pub use command::{decode, encode, Command, DecodeError, Opcode};
pub use fixed::{read_rotation, read_vertex, write_rotation, write_vertex, Fx16, Q16_16_SCALE};
pub use mock_backend::{BackendCall, MockBackend};
