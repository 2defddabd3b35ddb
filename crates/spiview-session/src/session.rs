// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Lock-guarded scene session and the byte pipeline that feeds it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use spiview_codec::{decode, Command, DecodeError};
use spiview_port::RenderBackend;
use spiview_wire::{FrameExtractor, FramingOverflow, FramingStats};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::machine::{FrameTrigger, SceneEvent, SceneMachine, SceneState, SceneStats};

/// Message-boundary counters kept outside the state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Messages handed to the decoder.
    pub messages: u64,
    /// Zero-length messages.
    pub empty_messages: u64,
    /// Messages shorter than their opcode requires.
    pub truncated: u64,
    /// Extractor resyncs.
    pub overflows: u64,
    /// Bytes dropped by resyncs.
    pub overflow_bytes: u64,
    /// Frame or camera updates the backend refused.
    pub backend_errors: u64,
}

/// Combined view of a session's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// State machine counters.
    pub scene: SceneStats,
    /// Decode and dispatch counters.
    pub pipeline: PipelineStats,
}

impl SessionStats {
    /// Messages that never reached the scene.
    pub fn dropped_messages(&self) -> u64 {
        self.pipeline.empty_messages
            + self.pipeline.truncated
            + self.scene.unknown_opcodes
            + self.scene.orphan_triangles
    }
}

/// Shared scene session.
///
/// The state machine sits behind one mutex. Every command is applied under
/// the lock, the resulting effects are collected, and the lock is released
/// before any of them reach a [`RenderBackend`]. Share it with `Arc` between
/// the reader thread and whoever inspects it.
#[derive(Debug, Default)]
pub struct SceneSession {
    machine: Mutex<SceneMachine>,
    counters: Mutex<PipelineStats>,
}

impl SceneSession {
    /// Fresh session.
    pub fn new(trigger: FrameTrigger) -> Self {
        Self {
            machine: Mutex::new(SceneMachine::new(trigger)),
            counters: Mutex::new(PipelineStats::default()),
        }
    }

    // Poisoning is ignored: apply validates before it mutates.
    fn machine(&self) -> MutexGuard<'_, SceneMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn counters(&self) -> MutexGuard<'_, PipelineStats> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one command and dispatch its effects to `backend`.
    ///
    /// Returns the number of effects dispatched. A backend failure is counted
    /// and returned after the remaining effects were delivered; the scene
    /// change itself stands.
    pub fn apply<B>(&self, cmd: Command, backend: &mut B) -> Result<usize, PipelineError>
    where
        B: RenderBackend + ?Sized,
    {
        let events = self.machine().apply(cmd)?;
        let count = events.len();
        self.dispatch(events, backend)?;
        Ok(count)
    }

    /// Decode `message` and apply it.
    pub fn ingest<B>(&self, message: &[u8], backend: &mut B) -> Result<usize, PipelineError>
    where
        B: RenderBackend + ?Sized,
    {
        self.counters().messages += 1;
        let cmd = match decode(message) {
            Ok(cmd) => cmd,
            Err(err) => {
                let mut counters = self.counters();
                match err {
                    DecodeError::Empty => counters.empty_messages += 1,
                    DecodeError::Truncated { .. } => counters.truncated += 1,
                }
                return Err(err.into());
            }
        };
        self.apply(cmd, backend)
    }

    /// Count an extractor resync.
    pub fn record_overflow(&self, overflow: &FramingOverflow) {
        let mut counters = self.counters();
        counters.overflows += 1;
        counters.overflow_bytes += overflow.dropped as u64;
    }

    /// Current counters.
    pub fn stats(&self) -> SessionStats {
        let scene = self.machine().stats();
        SessionStats {
            scene,
            pipeline: *self.counters(),
        }
    }

    /// Frame trigger in effect.
    pub fn trigger(&self) -> FrameTrigger {
        self.machine().trigger()
    }

    /// Run `f` against the current state under the lock.
    ///
    /// Keep `f` short; the reader thread waits on the same lock.
    pub fn with_state<R>(&self, f: impl FnOnce(&SceneState) -> R) -> R {
        f(self.machine().state())
    }

    fn dispatch<B>(&self, events: Vec<SceneEvent>, backend: &mut B) -> Result<(), PipelineError>
    where
        B: RenderBackend + ?Sized,
    {
        let mut first_err = None;
        for event in events {
            let result = match event {
                SceneEvent::ShapeCommitted(shape) => {
                    backend.save_shape(shape.id, &shape.triangles);
                    Ok(())
                }
                SceneEvent::InstanceStaged(desc) => {
                    backend.stage_instance(&desc);
                    Ok(())
                }
                SceneEvent::StagingCleared => {
                    backend.clear_staging();
                    Ok(())
                }
                SceneEvent::FrameReady(frame) => backend.render_frame(&frame),
                SceneEvent::CameraMoved(pose) => backend.set_camera(&pose),
                SceneEvent::Reset => {
                    backend.reset();
                    Ok(())
                }
            };
            if let Err(err) = result {
                self.counters().backend_errors += 1;
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        first_err.map_or(Ok(()), |err| Err(err.into()))
    }
}

/// Producer side: extractor plus backend in front of a shared session.
///
/// Owned by exactly one thread. Bad messages are logged and skipped; only the
/// transport can stop a pipeline.
#[derive(Debug)]
pub struct Pipeline<B> {
    session: Arc<SceneSession>,
    extractor: FrameExtractor,
    backend: B,
}

impl<B: RenderBackend> Pipeline<B> {
    /// Pipeline with the default extractor cap.
    pub fn new(session: Arc<SceneSession>, backend: B) -> Self {
        Self {
            session,
            extractor: FrameExtractor::new(),
            backend,
        }
    }

    /// Replace the extractor with one capped at `max_buffer` bytes.
    #[must_use]
    pub fn with_max_buffer(mut self, max_buffer: usize) -> Self {
        self.extractor = FrameExtractor::with_max_buffer(max_buffer);
        self
    }

    /// Feed transport bytes. Returns the number of messages applied.
    pub fn push(&mut self, chunk: &[u8]) -> usize {
        let feed = self.extractor.feed(chunk);
        let mut applied = 0;
        for message in &feed.messages {
            match self.session.ingest(message, &mut self.backend) {
                Ok(effects) => {
                    applied += 1;
                    debug!(len = message.len(), effects, "message applied");
                }
                Err(PipelineError::Backend(err)) => {
                    applied += 1;
                    warn!(error = %err, "backend rejected update");
                }
                Err(err) => warn!(error = %err, len = message.len(), "message dropped"),
            }
        }
        if let Some(overflow) = feed.overflow {
            self.session.record_overflow(&overflow);
            warn!(
                dropped = overflow.dropped,
                retained = overflow.retained,
                "framing overflow, resynced"
            );
        }
        applied
    }

    /// Shared session.
    pub fn session(&self) -> &Arc<SceneSession> {
        &self.session
    }

    /// Extractor counters.
    pub fn framing_stats(&self) -> FramingStats {
        self.extractor.stats()
    }

    /// Backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Take the backend back.
    pub fn into_backend(self) -> B {
        self.backend
    }
}
