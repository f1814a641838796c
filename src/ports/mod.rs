// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::model::{Container, EncodePlan, Size, VideoAsset};
use crate::error::ShrinkResult;

/// One item pulled from a source, in presentation order
#[derive(Debug)]
pub enum SourceSample<F, A> {
    /// Decoded video frame; `index` counts decoded frames from zero
    Video { index: u64, frame: F },
    /// Compressed audio packet, copied through untouched
    Audio(A),
}

/// A freshly opened source and what it contains
pub struct OpenedSource<R, T> {
    pub asset: VideoAsset,
    pub reader: R,
    /// Audio track description for passthrough, if the source has one
    pub audio_track: Option<T>,
}

/// Port for sequential decoding of a source file
pub trait SourceReader {
    type Frame: Send + 'static;
    type Audio: Send + 'static;

    /// Next sample, or `None` once the source is exhausted and the decoder drained
    fn next_sample(&mut self) -> ShrinkResult<Option<SourceSample<Self::Frame, Self::Audio>>>;
}

/// Port for pixel buffer scaling
pub trait FrameResizer {
    type Frame;

    /// Scale a frame to the target geometry in the encoder's pixel layout
    fn resize(&mut self, frame: Self::Frame) -> ShrinkResult<Self::Frame>;
}

/// Port for encoding and muxing the output file
pub trait SinkWriter {
    type Frame;
    type Audio;

    /// Encode a frame at `pts`, counted in units of `1 / fps`
    fn write_video(&mut self, frame: Self::Frame, pts: i64) -> ShrinkResult<()>;

    /// Mux an audio packet with its original timestamps
    fn write_audio(&mut self, packet: Self::Audio) -> ShrinkResult<()>;

    /// Flush the encoder and close the container
    fn finish(self) -> ShrinkResult<()>;
}

/// Settings handed to the encoder for one job
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub size: Size,
    pub fps: f64,
    /// Bits per second
    pub bitrate: u64,
    pub keyframe_interval: u32,
    pub container: Container,
    /// Preferred encoder name
    pub codec_name: String,
    pub preset: String,
    pub threads: usize,
}

impl EncodeSettings {
    pub fn from_plan(plan: &EncodePlan, codec_name: &str, preset: &str, threads: usize) -> Self {
        Self {
            size: plan.target_size,
            fps: plan.target_fps,
            bitrate: plan.bitrate,
            keyframe_interval: plan.keyframe_interval,
            container: plan.container,
            codec_name: codec_name.to_string(),
            preset: preset.to_string(),
            threads,
        }
    }
}

/// Port bundling the decode, resize and encode collaborators.
///
/// Readers, resizers and writers are created on the worker thread that uses
/// them, so only the frame, packet and track types need to cross threads.
pub trait MediaBackend: Send + Sync + 'static {
    type Frame: Send + 'static;
    type Audio: Send + 'static;
    type AudioTrack: Send + 'static;
    type Reader: SourceReader<Frame = Self::Frame, Audio = Self::Audio>;
    type Resizer: FrameResizer<Frame = Self::Frame>;
    type Writer: SinkWriter<Frame = Self::Frame, Audio = Self::Audio>;

    /// Open a source for reading; fails with `SourceUnreadable`
    fn open_source(&self, path: &Path)
        -> ShrinkResult<OpenedSource<Self::Reader, Self::AudioTrack>>;

    fn create_resizer(&self, source: Size, target: Size) -> ShrinkResult<Self::Resizer>;

    /// Create the output file; fails with `EncoderFailure`
    fn create_sink(
        &self,
        path: &Path,
        settings: &EncodeSettings,
        audio_track: Option<Self::AudioTrack>,
    ) -> ShrinkResult<Self::Writer>;

    /// Describe a source without decoding it
    fn probe(&self, path: &Path) -> ShrinkResult<VideoAsset> {
        self.open_source(path).map(|opened| opened.asset)
    }
}

/// Port for file system operations
#[async_trait]
pub trait FsPort: Send + Sync {
    /// Check if file exists
    async fn file_exists(&self, path: &Path) -> ShrinkResult<bool>;

    /// Get file size
    async fn file_size(&self, path: &Path) -> ShrinkResult<u64>;

    /// Delete file; a missing file is not an error
    async fn delete_file(&self, path: &Path) -> ShrinkResult<()>;

    /// Create directory (including parent directories)
    async fn create_directory(&self, path: &Path) -> ShrinkResult<()>;

    /// Absolute path with symlinks resolved; the path itself may not exist yet
    async fn resolve_path(&self, path: &Path) -> ShrinkResult<PathBuf>;
}
