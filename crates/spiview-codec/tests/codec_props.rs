// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use proptest::prelude::*;

use spiview_codec::{decode, decode_color, encode, Command, DecodeError, Fx16, Opcode};
use spiview_port::{Color, RotationMatrix, Vertex};

proptest! {
    #[test]
    fn q16_16_round_trips_every_raw_value(raw in any::<i32>()) {
        let value = Fx16::from_be_bytes(raw.to_be_bytes()).to_f64();
        prop_assert_eq!(Fx16::from_f64(value).raw(), raw);
        prop_assert_eq!(Fx16::from_f64(value).to_be_bytes(), raw.to_be_bytes());
    }

    #[test]
    fn short_messages_never_panic_and_report_truncation(
        op in any::<u8>(),
        body in proptest::collection::vec(any::<u8>(), 0..60),
    ) {
        let mut msg = vec![op];
        msg.extend_from_slice(&body);
        let min = Opcode::from_byte(op).min_len();
        match decode(&msg) {
            Ok(cmd) => {
                prop_assert!(msg.len() >= min);
                prop_assert_eq!(cmd.opcode(), Opcode::from_byte(op));
            }
            Err(DecodeError::Truncated { expected, actual, .. }) => {
                prop_assert_eq!(expected, min);
                prop_assert_eq!(actual, msg.len());
            }
            Err(DecodeError::Empty) => prop_assert!(false, "non-empty message reported empty"),
        }
    }

    #[test]
    fn color_channels_stay_normalized(packed in any::<u16>()) {
        let c = decode_color(packed);
        for ch in [c.r, c.g, c.b] {
            prop_assert!((0.0..=1.0).contains(&ch));
        }
    }
}

#[test]
fn reference_scalars() {
    assert_eq!(Fx16::from_f64(1.0).to_f64(), 1.0);
    assert_eq!(Fx16::from_be_bytes([0, 0, 0, 0]).to_f64(), 0.0);
    assert_eq!(Fx16::from_be_bytes([0xFF, 0xFF, 0x00, 0x00]).to_f64(), -1.0);
}

#[test]
fn captured_upload_triangle_vector() {
    // Firmware output: one white corner at (1, 0, 0), one red at (0, 1, 0),
    // one blue at (0, 0, -1).
    let hex = concat!(
        "a1",
        "7fff", "00010000", "00000000", "00000000",
        "7c00", "00000000", "00010000", "00000000",
        "001f", "00000000", "00000000", "ffff0000",
    );
    let msg = hex::decode(hex).expect("hex");
    assert_eq!(msg.len(), 43);
    let Ok(Command::UploadTriangle(tri)) = decode(&msg) else {
        panic!("expected triangle");
    };
    assert_eq!(
        tri.vertices,
        [
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
            Vertex::new(0.0, 0.0, -1.0),
        ]
    );
    assert_eq!(
        tri.colors,
        [
            Color::WHITE,
            Color::new(1.0, 0.0, 0.0),
            Color::new(0.0, 0.0, 1.0),
        ]
    );
    assert_eq!(encode(&Command::UploadTriangle(tri)), msg);
}

#[test]
fn captured_add_instance_vector() {
    let mut hex = String::from("b0" /* op */);
    hex.push_str("01"); // last
    hex.push_str("02"); // shape 2
    hex.push_str("000a0000fff60000"); // x=10, y=-10
    hex.push_str("00000000"); // z=0
    for i in 0..9 {
        hex.push_str(if i % 4 == 0 { "00010000" } else { "00000000" });
    }
    let msg = hex::decode(hex).expect("hex");
    let Ok(Command::AddInstance(inst)) = decode(&msg) else {
        panic!("expected instance");
    };
    assert!(inst.is_last);
    assert_eq!(inst.shape_id, 2);
    assert_eq!(inst.position, Vertex::new(10.0, -10.0, 0.0));
    assert_eq!(inst.rotation, RotationMatrix::IDENTITY);
}
