// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Channel-backed backend for handing frames to another thread.
//!
//! [`ChannelBackend`] lives on the reader thread and forwards finalized frames
//! and camera moves over `std::sync::mpsc`. [`FrameReceiver`] lives with the
//! consumer (a render loop, an inspector) and drains them without blocking.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use spiview_port::{BackendError, CameraPose, FrameSnapshot, RenderBackend, ShapeId, Triangle};
use tracing::trace;

/// Update delivered to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// A finalized frame.
    Frame(FrameSnapshot),
    /// New camera pose.
    Camera(CameraPose),
    /// The producer reset its scene.
    Reset,
}

/// Producer half. Frames carry their shapes, so shape saves and staging are
/// not forwarded.
#[derive(Debug, Clone)]
pub struct ChannelBackend {
    tx: Sender<ViewerEvent>,
}

/// Consumer half.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: Receiver<ViewerEvent>,
    latest: Option<FrameSnapshot>,
    camera: Option<CameraPose>,
    disconnected: bool,
}

/// Connected backend/receiver pair.
pub fn channel_backend() -> (ChannelBackend, FrameReceiver) {
    let (tx, rx) = mpsc::channel();
    (
        ChannelBackend { tx },
        FrameReceiver {
            rx,
            latest: None,
            camera: None,
            disconnected: false,
        },
    )
}

impl ChannelBackend {
    fn send(&self, event: ViewerEvent) -> Result<(), BackendError> {
        self.tx.send(event).map_err(|_| BackendError::Disconnected)
    }
}

impl RenderBackend for ChannelBackend {
    fn save_shape(&mut self, id: ShapeId, triangles: &[Triangle]) {
        trace!(shape = id, triangles = triangles.len(), "shape saved");
    }

    fn clear_staging(&mut self) {}

    fn render_frame(&mut self, frame: &FrameSnapshot) -> Result<(), BackendError> {
        self.send(ViewerEvent::Frame(frame.clone()))
    }

    fn set_camera(&mut self, pose: &CameraPose) -> Result<(), BackendError> {
        self.send(ViewerEvent::Camera(*pose))
    }

    fn reset(&mut self) {
        // A departed consumer shows up on the next frame.
        let _ = self.send(ViewerEvent::Reset);
    }
}

impl FrameReceiver {
    /// Drain up to `max` pending events, updating the latest frame and camera.
    pub fn drain(&mut self, max: usize) -> Vec<ViewerEvent> {
        let mut out = Vec::new();
        for _ in 0..max {
            match self.rx.try_recv() {
                Ok(event) => {
                    match &event {
                        ViewerEvent::Frame(frame) => self.latest = Some(frame.clone()),
                        ViewerEvent::Camera(pose) => self.camera = Some(*pose),
                        ViewerEvent::Reset => {}
                    }
                    out.push(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
        out
    }

    /// Drain up to `max` pending events and return only the frames.
    pub fn drain_frames(&mut self, max: usize) -> Vec<FrameSnapshot> {
        self.drain(max)
            .into_iter()
            .filter_map(|event| match event {
                ViewerEvent::Frame(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    /// Most recent frame received. Kept across resets until replaced.
    pub fn latest_frame(&self) -> Option<&FrameSnapshot> {
        self.latest.as_ref()
    }

    /// Most recent camera pose received.
    pub fn camera(&self) -> Option<&CameraPose> {
        self.camera.as_ref()
    }

    /// True once the producer side has gone and every event was drained.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_respects_max_and_tracks_latest() {
        let (mut backend, mut rx) = channel_backend();
        for index in 0..5 {
            backend
                .render_frame(&FrameSnapshot {
                    index,
                    ..FrameSnapshot::default()
                })
                .expect("send");
        }
        let first = rx.drain_frames(3);
        assert_eq!(first.iter().map(|f| f.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(rx.latest_frame().map(|f| f.index), Some(2));
        assert_eq!(rx.drain_frames(10).len(), 2);
        assert_eq!(rx.latest_frame().map(|f| f.index), Some(4));
        assert!(!rx.is_disconnected());
    }

    #[test]
    fn dropped_receiver_reports_disconnect() {
        let (mut backend, rx) = channel_backend();
        drop(rx);
        assert_eq!(
            backend.render_frame(&FrameSnapshot::default()),
            Err(BackendError::Disconnected)
        );
        assert_eq!(
            backend.set_camera(&CameraPose::default()),
            Err(BackendError::Disconnected)
        );
    }

    #[test]
    fn dropped_backend_is_seen_after_drain() {
        let (mut backend, mut rx) = channel_backend();
        backend.set_camera(&CameraPose::default()).expect("send");
        backend.reset();
        drop(backend);
        let events = rx.drain(8);
        assert_eq!(
            events,
            vec![ViewerEvent::Camera(CameraPose::default()), ViewerEvent::Reset]
        );
        assert!(rx.camera().is_some());
        assert!(rx.is_disconnected());
    }
}
