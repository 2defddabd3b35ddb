// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scene state machine.
//!
//! [`SceneMachine::apply`] is a pure transition: it mutates the owned
//! [`SceneState`] and returns the backend effects the command produced, in
//! order. It never calls a renderer itself, so the caller can release its lock
//! before dispatching. A rejected command leaves the state untouched.

use std::sync::Arc;

use spiview_codec::Command;
use spiview_port::{
    CameraPose, FrameSnapshot, InstanceDescriptor, Shape, ShapeId, ShapeRegistry, Triangle,
};
use thiserror::Error;
use tracing::debug;

/// Which producer signal closes a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FrameTrigger {
    /// The instance flagged `is_last` finalizes. A later `FrameEnd` only
    /// finalizes if instances were staged after that.
    #[default]
    LastInstance,
    /// `FrameEnd` always finalizes; `is_last` is informational.
    FrameEnd,
}

/// A command that was understood but cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SceneError {
    /// Opcode byte outside the protocol revision.
    #[error("unknown opcode 0x{value:02X}")]
    UnknownOpcode {
        /// The raw opcode byte.
        value: u8,
    },
    /// Triangle data arrived while no upload was active.
    #[error("triangle received with no active upload")]
    UploadWithoutSession,
}

/// Backend effect produced by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// A shape was committed to the registry.
    ShapeCommitted(Arc<Shape>),
    /// An instance was appended to the staging list.
    InstanceStaged(InstanceDescriptor),
    /// Per-frame staging was cleared.
    StagingCleared,
    /// A frame was finalized.
    FrameReady(FrameSnapshot),
    /// The camera moved.
    CameraMoved(CameraPose),
    /// All scene state was discarded.
    Reset,
}

/// Geometry accumulated for a shape that has not been committed yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSession {
    /// Target shape id.
    pub shape_id: ShapeId,
    /// Triangles received so far, in order.
    pub triangles: Vec<Triangle>,
}

/// Everything the protocol builds up between resets.
#[derive(Debug, Clone, Default)]
pub struct SceneState {
    shapes: ShapeRegistry,
    upload: Option<UploadSession>,
    staging: Vec<InstanceDescriptor>,
}

impl SceneState {
    /// Committed shape by id.
    pub fn shape(&self, id: ShapeId) -> Option<&Arc<Shape>> {
        self.shapes.get(&id)
    }

    /// Ids of every committed shape, ascending.
    pub fn shape_ids(&self) -> Vec<ShapeId> {
        self.shapes.keys().copied().collect()
    }

    /// Upload in progress, if any.
    pub fn active_upload(&self) -> Option<&UploadSession> {
        self.upload.as_ref()
    }

    /// Instances staged for the current frame.
    pub fn staged(&self) -> &[InstanceDescriptor] {
        &self.staging
    }

    /// True when nothing has been uploaded or staged.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.upload.is_none() && self.staging.is_empty()
    }
}

/// Transition counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStats {
    /// Commands applied successfully.
    pub commands: u64,
    /// Shapes registered (including replacements).
    pub shapes_committed: u64,
    /// Uploads closed with no triangles.
    pub empty_uploads: u64,
    /// Frames handed to the backend.
    pub frames_finalized: u64,
    /// Camera updates forwarded.
    pub camera_updates: u64,
    /// Resets applied.
    pub resets: u64,
    /// Frame-end markers that had nothing to finalize.
    pub redundant_frame_ends: u64,
    /// Commands rejected as [`SceneError::UnknownOpcode`].
    pub unknown_opcodes: u64,
    /// Commands rejected as [`SceneError::UploadWithoutSession`].
    pub orphan_triangles: u64,
}

/// Owner of [`SceneState`].
#[derive(Debug, Clone, Default)]
pub struct SceneMachine {
    state: SceneState,
    trigger: FrameTrigger,
    next_frame: u64,
    stats: SceneStats,
}

impl SceneMachine {
    /// Empty machine using `trigger` to close frames.
    pub fn new(trigger: FrameTrigger) -> Self {
        Self {
            trigger,
            ..Self::default()
        }
    }

    /// Frame trigger in effect.
    pub fn trigger(&self) -> FrameTrigger {
        self.trigger
    }

    /// Current state.
    pub fn state(&self) -> &SceneState {
        &self.state
    }

    /// Counters since construction.
    pub fn stats(&self) -> SceneStats {
        self.stats
    }

    /// Index the next finalized frame will carry.
    pub fn next_frame(&self) -> u64 {
        self.next_frame
    }

    /// Apply one command and return its backend effects in order.
    pub fn apply(&mut self, cmd: Command) -> Result<Vec<SceneEvent>, SceneError> {
        let mut events = Vec::new();
        match cmd {
            Command::Reset => {
                if let Some(upload) = self.state.upload.take() {
                    debug!(
                        shape = upload.shape_id,
                        triangles = upload.triangles.len(),
                        "reset abandons upload"
                    );
                }
                self.state.shapes.clear();
                self.state.staging.clear();
                self.stats.resets += 1;
                events.push(SceneEvent::Reset);
            }
            Command::BeginUpload { shape_id } => {
                self.commit_upload(&mut events);
                debug!(shape = shape_id, "begin upload");
                self.state.upload = Some(UploadSession {
                    shape_id,
                    triangles: Vec::new(),
                });
            }
            Command::UploadTriangle(tri) => match self.state.upload.as_mut() {
                Some(upload) => upload.triangles.push(tri),
                None => {
                    self.stats.orphan_triangles += 1;
                    return Err(SceneError::UploadWithoutSession);
                }
            },
            Command::FrameStart => {
                self.commit_upload(&mut events);
                self.state.staging.clear();
                events.push(SceneEvent::StagingCleared);
            }
            Command::AddInstance(desc) => {
                if self.state.staging.is_empty() {
                    // Implicit frame start; staging is already empty.
                    self.commit_upload(&mut events);
                }
                self.state.staging.push(desc);
                events.push(SceneEvent::InstanceStaged(desc));
                if desc.is_last {
                    match self.trigger {
                        FrameTrigger::LastInstance => self.finalize(&mut events),
                        FrameTrigger::FrameEnd => {
                            debug!(shape = desc.shape_id, "last flag set, waiting for frame end");
                        }
                    }
                }
            }
            Command::FrameEnd => match self.trigger {
                FrameTrigger::FrameEnd => self.finalize(&mut events),
                FrameTrigger::LastInstance if !self.state.staging.is_empty() => {
                    self.finalize(&mut events);
                }
                FrameTrigger::LastInstance => {
                    self.stats.redundant_frame_ends += 1;
                    debug!("frame end with nothing staged");
                }
            },
            Command::PositionCamera(pose) => {
                self.stats.camera_updates += 1;
                events.push(SceneEvent::CameraMoved(pose));
            }
            Command::Unknown(value) => {
                self.stats.unknown_opcodes += 1;
                return Err(SceneError::UnknownOpcode { value });
            }
        }
        self.stats.commands += 1;
        Ok(events)
    }

    fn commit_upload(&mut self, events: &mut Vec<SceneEvent>) {
        let Some(upload) = self.state.upload.take() else {
            return;
        };
        if upload.triangles.is_empty() {
            self.stats.empty_uploads += 1;
            debug!(shape = upload.shape_id, "empty upload not registered");
            return;
        }
        debug!(
            shape = upload.shape_id,
            triangles = upload.triangles.len(),
            "shape committed"
        );
        let shape = Arc::new(Shape::new(upload.shape_id, upload.triangles));
        self.state.shapes.insert(shape.id, Arc::clone(&shape));
        self.stats.shapes_committed += 1;
        events.push(SceneEvent::ShapeCommitted(shape));
    }

    fn finalize(&mut self, events: &mut Vec<SceneEvent>) {
        let instances = std::mem::take(&mut self.state.staging);
        let shapes: ShapeRegistry = instances
            .iter()
            .filter_map(|inst| {
                self.state
                    .shapes
                    .get(&inst.shape_id)
                    .map(|s| (inst.shape_id, Arc::clone(s)))
            })
            .collect();
        let frame = FrameSnapshot {
            index: self.next_frame,
            instances,
            shapes,
        };
        debug!(
            frame = frame.index,
            instances = frame.instances.len(),
            "frame finalized"
        );
        self.next_frame += 1;
        self.stats.frames_finalized += 1;
        events.push(SceneEvent::FrameReady(frame));
    }
}
