// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! spiview: decode the SPI scene protocol mirrored on an MCU's UART.
//! Reads a live device or a captured log, rebuilds the scene frame by frame,
//! and logs what a renderer would draw.

mod console;
mod summary;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use spiview_app_core::config::ConfigService;
use spiview_app_core::prefs::{SimPrefs, TriggerPref};
use spiview_config_fs::FsConfigStore;
use spiview_session::{
    channel_backend, spawn_reader, DeviceTransport, FrameTrigger, Pipeline, ReplayTransport,
    SceneSession,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::console::ConsoleBackend;
use crate::summary::summary_table;

/// Consumer poll interval (about 30 Hz).
const FRAME_INTERVAL: Duration = Duration::from_millis(33);
/// Events handled per poll.
const DRAIN_MAX: usize = 256;

#[derive(Parser, Debug)]
#[command(author, version, about = "Decode mirrored SPI scene traffic")]
struct Args {
    /// Serial device to listen on (line settings are configured externally)
    #[arg(long, conflicts_with = "replay")]
    serial: Option<PathBuf>,
    /// Captured UART log to replay instead of a device
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Expected baud rate, recorded in prefs and logs only (set the line
    /// rate externally, e.g. with stty)
    #[arg(long)]
    baud: Option<u32>,
    /// Longest wait for one transport read, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Bytes requested per transport read
    #[arg(long)]
    chunk: Option<usize>,
    /// Framing buffer cap in bytes
    #[arg(long)]
    max_buffer: Option<usize>,
    /// Which producer signal closes a frame
    #[arg(long, value_enum)]
    trigger: Option<TriggerArg>,
    /// Verbose logging (also honors RUST_LOG)
    #[arg(long)]
    debug: bool,
    /// Persist the effective settings as the new defaults
    #[arg(long)]
    save_prefs: bool,
    /// Read and write prefs here instead of the platform config directory
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TriggerArg {
    /// The instance flagged last-in-frame
    LastInstance,
    /// The explicit FRAME_END command
    FrameEnd,
}

impl From<TriggerArg> for TriggerPref {
    fn from(arg: TriggerArg) -> Self {
        match arg {
            TriggerArg::LastInstance => Self::LastInstance,
            TriggerArg::FrameEnd => Self::FrameEnd,
        }
    }
}

fn frame_trigger(pref: TriggerPref) -> FrameTrigger {
    match pref {
        TriggerPref::LastInstance => FrameTrigger::LastInstance,
        TriggerPref::FrameEnd => FrameTrigger::FrameEnd,
    }
}

enum Source {
    Serial(PathBuf),
    Replay(PathBuf),
}

impl Args {
    /// Command-line values win over stored prefs.
    fn overlay(&self, prefs: &mut SimPrefs) {
        if let Some(serial) = &self.serial {
            prefs.serial = Some(serial.display().to_string());
        }
        if let Some(baud) = self.baud {
            prefs.baud = baud;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            prefs.read_timeout_ms = timeout_ms;
        }
        if let Some(chunk) = self.chunk {
            prefs.chunk = chunk;
        }
        if let Some(max_buffer) = self.max_buffer {
            prefs.max_buffer = max_buffer;
        }
        if let Some(trigger) = self.trigger {
            prefs.trigger = trigger.into();
        }
    }

    fn source(&self, prefs: &SimPrefs) -> Result<Source> {
        if let Some(path) = &self.replay {
            return Ok(Source::Replay(path.clone()));
        }
        prefs
            .serial
            .as_ref()
            .map(|p| Source::Serial(PathBuf::from(p)))
            .ok_or_else(|| anyhow!("no input: pass --serial <DEVICE> or --replay <FILE>"))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(io::stderr)
        .init();

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        ctrlc::set_handler(move || flag.store(true, Ordering::Release))
            .context("install Ctrl-C handler")?;
    }

    let store = match &args.config_dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    }
    .context("open config store")?;
    let config = ConfigService::new(store);
    let mut prefs = match SimPrefs::load(&config) {
        Ok(prefs) => prefs,
        Err(err) => {
            warn!(error = %err, "stored prefs unusable, using defaults");
            SimPrefs::default()
        }
    };
    args.overlay(&mut prefs);
    prefs.validate().context("invalid settings")?;
    if args.save_prefs {
        prefs.save(&config).context("save prefs")?;
        info!("prefs saved");
    }

    let session = Arc::new(SceneSession::new(frame_trigger(prefs.trigger)));
    let (backend, mut frames) = channel_backend();
    let pipeline = Pipeline::new(Arc::clone(&session), backend).with_max_buffer(prefs.max_buffer);
    let reader = match args.source(&prefs)? {
        Source::Replay(path) => {
            let transport = ReplayTransport::open(&path)
                .with_context(|| format!("open capture {}", path.display()))?;
            info!(capture = %path.display(), chunk = prefs.chunk, "replaying");
            spawn_reader(transport, pipeline, prefs.chunk)
        }
        Source::Serial(path) => {
            let transport = DeviceTransport::open(&path, prefs.read_timeout())
                .with_context(|| format!("open serial {}", path.display()))?;
            info!(
                device = %path.display(),
                baud = prefs.baud,
                timeout_ms = prefs.read_timeout_ms,
                "listening"
            );
            spawn_reader(transport, pipeline, prefs.chunk)
        }
    };

    let mut console = ConsoleBackend::default();
    while !reader.is_finished() && !interrupted.load(Ordering::Acquire) {
        for event in frames.drain(DRAIN_MAX) {
            console.show(&event);
        }
        thread::sleep(FRAME_INTERVAL);
    }
    let joined = if interrupted.load(Ordering::Acquire) {
        info!("interrupted, stopping reader");
        reader.stop()
    } else {
        reader.join()
    };
    // Everything sent before the reader returned is still queued.
    for event in frames.drain(usize::MAX) {
        console.show(&event);
    }

    let stats = session.stats();
    let report = console.report();
    info!(
        messages = stats.pipeline.messages,
        frames = stats.scene.frames_finalized,
        last_frame = ?report.last_frame,
        camera_moves = report.camera_moves,
        dropped = stats.dropped_messages(),
        "session summary"
    );
    writeln!(io::stdout().lock(), "{}", summary_table(&stats, &report))?;

    match joined {
        Ok(outcome) => {
            info!(exit = ?outcome.exit, "reader finished");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "reader failed");
            Err(err).context("reader stopped")
        }
    }
}
