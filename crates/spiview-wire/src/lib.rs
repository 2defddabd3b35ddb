// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! UART mirror framing for SPI traffic.
//!
//! Firmware built with the UART mirror echoes every SPI packet on its debug
//! console as:
//!
//! ``"Sending SPI message: " || PAYLOAD || "SPI message end"``
//!
//! * PAYLOAD is raw binary and is NOT escaped. A payload that happens to
//!   contain the suffix text ends the message early; this is a property of the
//!   format and is preserved here.
//! * Ordinary log text between messages is skipped.

mod extractor;

pub use extractor::{
    frame_message, Feed, FrameExtractor, FramingOverflow, FramingStats, DEFAULT_MAX_BUFFER,
    PREFIX, SUFFIX,
};
