// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use spiview_codec::{encode, Command as Spi};
use spiview_port::{Color, InstanceDescriptor, RotationMatrix, Triangle, Vertex};
use spiview_wire::frame_message;

fn tri() -> Triangle {
    Triangle {
        vertices: [
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        ],
        colors: [Color::WHITE; 3],
    }
}

fn add(shape_id: u8, is_last: bool) -> Spi {
    Spi::AddInstance(InstanceDescriptor {
        shape_id,
        position: Vertex::new(0.0, 0.0, -4.0),
        rotation: RotationMatrix::IDENTITY,
        is_last,
    })
}

fn write_capture(path: &Path) {
    let cmds = [
        Spi::Reset,
        Spi::BeginUpload { shape_id: 1 },
        Spi::UploadTriangle(tri()),
        Spi::UploadTriangle(tri()),
        Spi::FrameStart,
        add(1, false),
        add(1, true),
        Spi::FrameEnd,
        Spi::FrameStart,
        add(1, true),
        Spi::FrameEnd,
    ];
    let mut bytes = b"SD: card ready\r\n".to_vec();
    for cmd in &cmds {
        bytes.extend(frame_message(&encode(cmd)));
        bytes.extend_from_slice(b"\r\n");
    }
    // A truncated triangle the decoder must drop.
    bytes.extend(frame_message(&[0xA1, 0x00, 0x01]));
    fs::write(path, bytes).expect("write capture");
}

fn spiview(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("spiview").expect("binary");
    cmd.arg("--config-dir").arg(config);
    cmd
}

fn row(name: &str, value: u64) -> impl Predicate<str> {
    predicate::str::is_match(format!(r"{name}\s*\|\s*{value}\s*\|")).expect("regex")
}

#[test]
fn replay_prints_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let capture = dir.path().join("uart.log");
    write_capture(&capture);

    spiview(&dir.path().join("cfg"))
        .arg("--replay")
        .arg(&capture)
        .arg("--chunk")
        .arg("7")
        .assert()
        .success()
        .stdout(row("frames finalized", 2))
        .stdout(row("shapes committed", 1))
        .stdout(row("triangles drawn", 6))
        .stdout(row("dropped messages", 1))
        .stdout(row("redundant frame ends", 2));
}

#[test]
fn frame_end_trigger_changes_finalization() {
    let dir = tempfile::tempdir().expect("tempdir");
    let capture = dir.path().join("uart.log");
    write_capture(&capture);

    spiview(&dir.path().join("cfg"))
        .args(["--trigger", "frame-end", "--replay"])
        .arg(&capture)
        .assert()
        .success()
        .stdout(row("frames finalized", 2))
        .stdout(row("redundant frame ends", 0));
}

#[test]
fn save_prefs_persists_overrides() {
    let dir = tempfile::tempdir().expect("tempdir");
    let capture = dir.path().join("uart.log");
    write_capture(&capture);
    let cfg = dir.path().join("cfg");

    spiview(&cfg)
        .args(["--trigger", "frame-end", "--chunk", "128", "--save-prefs", "--replay"])
        .arg(&capture)
        .assert()
        .success();

    let saved = fs::read_to_string(cfg.join("sim_prefs.json")).expect("prefs file");
    assert!(saved.contains("\"frame-end\""));
    assert!(saved.contains("128"));
}

#[test]
fn missing_input_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    spiview(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no input"));
}

#[test]
fn serial_and_replay_conflict() {
    let dir = tempfile::tempdir().expect("tempdir");
    spiview(dir.path())
        .args(["--serial", "/dev/null", "--replay", "x.log"])
        .assert()
        .failure();
}

#[test]
fn help_marks_baud_as_informational() {
    let dir = tempfile::tempdir().expect("tempdir");
    spiview(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--baud"))
        .stdout(predicate::str::contains("logs only"));
}

#[cfg(unix)]
#[test]
fn interrupt_stops_a_silent_device_and_prints_summary() {
    use std::fs::OpenOptions;
    use std::process::{Command as Process, Stdio};
    use std::thread;
    use std::time::Duration;

    let dir = tempfile::tempdir().expect("tempdir");
    let fifo = dir.path().join("tty");
    let made = Process::new("mkfifo").arg(&fifo).status().expect("mkfifo");
    assert!(made.success());

    let child = Process::new(assert_cmd::cargo::cargo_bin("spiview"))
        .arg("--config-dir")
        .arg(dir.path().join("cfg"))
        .args(["--timeout-ms", "20", "--serial"])
        .arg(&fifo)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");

    // Blocks until the device side is opened; the writer is held but never written.
    let _writer = OpenOptions::new().write(true).open(&fifo).expect("open fifo");
    thread::sleep(Duration::from_millis(300));
    let sent = Process::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("kill");
    assert!(sent.success());

    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(row("frames finalized", 0).eval(stdout.as_ref()));
    assert!(row("messages", 0).eval(stdout.as_ref()));
    assert!(String::from_utf8_lossy(&output.stderr).contains("interrupted"));
}
