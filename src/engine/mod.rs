//! Compression engine: job lifecycle and the decode/encode pipeline

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::model::{CompressionTarget, Size};

pub mod compressor;
pub mod progress;
mod stages;

pub use compressor::{CallbackJob, Compressor, CompressorOptions, JobHandle};
pub use progress::{
    CompressionCallback, ConsoleProgressCallback, JsonProgressCallback, NoOpProgressCallback,
    ProgressReporter,
};

/// Lifecycle of a compression job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Idle,
    /// Opening the source and reading its properties
    Opening,
    /// Computing the encode plan
    ResolvingGeometry,
    /// Decoding, resizing and encoding frames
    Streaming,
    /// Flushing the encoder and closing the container
    Finalizing,
    Completed,
    Failed,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Idle => "idle",
            JobPhase::Opening => "opening",
            JobPhase::ResolvingGeometry => "resolving_geometry",
            JobPhase::Streaming => "streaming",
            JobPhase::Finalizing => "finalizing",
            JobPhase::Completed => "completed",
            JobPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Failed)
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared cancellation flag, checked between frames
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What to compress and where to put it
#[derive(Debug, Clone, PartialEq)]
pub struct CompressRequest {
    pub source: PathBuf,
    pub target: CompressionTarget,
    /// Generated next to the source (or in the configured directory) when absent
    pub output: Option<PathBuf>,
}

impl CompressRequest {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<CompressionTarget>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// Summary of a finished job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionReport {
    pub output: PathBuf,
    pub output_size: u64,
    pub source_size: u64,
    pub target_size: Size,
    pub target_fps: f64,
    /// Video frames decoded from the source
    pub frames_read: u64,
    /// Video frames encoded into the output
    pub frames_written: u64,
    pub audio_packets: u64,
    pub elapsed: Duration,
}

impl CompressionReport {
    /// Output size relative to the source, when the source size is known
    pub fn compression_ratio(&self) -> Option<f64> {
        (self.source_size > 0).then(|| self.output_size as f64 / self.source_size as f64)
    }
}
