// Domain models - Core types and data structures

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ShrinkError, ShrinkResult};

/// Pixel dimensions of a video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Larger of width and height
    pub fn long_side(&self) -> u32 {
        self.width.max(self.height)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One side of a scale request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    /// Exact pixel count
    Concrete(u32),
    /// Computed from the other side and the source aspect ratio
    DeriveFromAspectRatio,
}

impl Dimension {
    /// Map the conventional signed form, where `-1` means "derive"
    pub fn from_signed(value: i64) -> ShrinkResult<Self> {
        match value {
            -1 => Ok(Dimension::DeriveFromAspectRatio),
            v if v <= 0 => Err(ShrinkError::geometry(format!(
                "dimension must be positive or -1, got {}",
                v
            ))),
            v => u32::try_from(v)
                .map(Dimension::Concrete)
                .map_err(|_| ShrinkError::geometry(format!("dimension {} is too large", v))),
        }
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, Dimension::DeriveFromAspectRatio)
    }
}

impl FromStr for Dimension {
    type Err = ShrinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(Dimension::DeriveFromAspectRatio);
        }
        let value = trimmed
            .parse::<i64>()
            .map_err(|_| ShrinkError::geometry(format!("invalid dimension: {}", s)))?;
        Self::from_signed(value)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Concrete(px) => write!(f, "{}", px),
            Dimension::DeriveFromAspectRatio => write!(f, "auto"),
        }
    }
}

/// Requested output size; at most one side may be derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleRequest {
    pub width: Dimension,
    pub height: Dimension,
}

impl ScaleRequest {
    pub fn new(width: Dimension, height: Dimension) -> Self {
        Self { width, height }
    }

    /// Fixed width, height follows the source aspect ratio
    pub fn with_width(width: u32) -> Self {
        Self::new(Dimension::Concrete(width), Dimension::DeriveFromAspectRatio)
    }

    /// Fixed height, width follows the source aspect ratio
    pub fn with_height(height: u32) -> Self {
        Self::new(Dimension::DeriveFromAspectRatio, Dimension::Concrete(height))
    }

    /// Both sides fixed; the aspect ratio is not enforced
    pub fn exact(width: u32, height: u32) -> Self {
        Self::new(Dimension::Concrete(width), Dimension::Concrete(height))
    }

    pub fn from_signed(width: i64, height: i64) -> ShrinkResult<Self> {
        Ok(Self::new(
            Dimension::from_signed(width)?,
            Dimension::from_signed(height)?,
        ))
    }
}

impl fmt::Display for ScaleRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Read-only description of a source video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAsset {
    pub path: PathBuf,
    /// Natural size of the video track
    pub size: Size,
    pub duration_secs: f64,
    /// Nominal frames per second
    pub frame_rate: f64,
    pub has_audio: bool,
    /// Video stream bitrate when the container reports one
    pub video_bitrate: Option<u64>,
    pub codec: String,
    pub file_size: u64,
}

impl VideoAsset {
    /// Frame count implied by nominal rate and duration
    pub fn estimated_frame_count(&self) -> u64 {
        (self.frame_rate * self.duration_secs).round().max(0.0) as u64
    }
}

/// Named compression preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    High,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::Low, Quality::Medium, Quality::High];

    /// Parse quality from string
    pub fn parse(value: &str) -> ShrinkResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Ok(Quality::Low),
            "medium" => Ok(Quality::Medium),
            "high" => Ok(Quality::High),
            other => Err(ShrinkError::config(format!(
                "Invalid quality: {}. Valid values: low, medium, high",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }
}

impl FromStr for Quality {
    type Err = ShrinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output container family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Mp4,
    Mov,
}

impl Container {
    pub fn file_extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mov => "mov",
        }
    }

    /// Muxer short name
    pub fn format_name(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mov => "mov",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "mp4" | "m4v" => Some(Container::Mp4),
            "mov" | "qt" => Some(Container::Mov),
            _ => None,
        }
    }
}

impl FromStr for Container {
    type Err = ShrinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s)
            .ok_or_else(|| ShrinkError::config(format!("Unsupported container: {}", s)))
    }
}

/// Manual compression settings, used instead of a quality preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub fps: f64,
    /// Target video bitrate in bits per second
    pub video_bitrate: u64,
    /// Maximum distance between keyframes, in output frames
    pub max_keyframe_interval: u32,
    /// Output size; `None` keeps the source size
    pub scale: Option<ScaleRequest>,
    pub container: Container,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            fps: 24.0,
            video_bitrate: 1_000_000,
            max_keyframe_interval: 10,
            scale: None,
            container: Container::Mp4,
        }
    }
}

/// What the caller asked for: a preset or explicit settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompressionTarget {
    Quality(Quality),
    Custom(CompressionConfig),
}

impl CompressionTarget {
    pub fn container(&self) -> Container {
        match self {
            CompressionTarget::Quality(_) => Container::Mp4,
            CompressionTarget::Custom(config) => config.container,
        }
    }
}

impl From<Quality> for CompressionTarget {
    fn from(quality: Quality) -> Self {
        CompressionTarget::Quality(quality)
    }
}

impl From<CompressionConfig> for CompressionTarget {
    fn from(config: CompressionConfig) -> Self {
        CompressionTarget::Custom(config)
    }
}

/// Evenly strided selection of decoded frames.
///
/// Keeps `kept` of `source_frames` indexes, the `k`-th being
/// `floor(k * source_frames / kept)`. Membership is computed rather than
/// stored, so the size of the set does not depend on the clip length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameIndexSet {
    source_frames: u64,
    kept: u64,
}

impl FrameIndexSet {
    /// `kept` evenly spaced frames out of `source_frames`
    pub fn strided(source_frames: u64, kept: u64) -> Self {
        Self {
            source_frames,
            kept: kept.min(source_frames),
        }
    }

    /// Every frame of the source
    pub fn all(source_frames: u64) -> Self {
        Self::strided(source_frames, source_frames)
    }

    /// Number of retained frames
    pub fn len(&self) -> u64 {
        self.kept
    }

    pub fn is_empty(&self) -> bool {
        self.kept == 0
    }

    pub fn source_frames(&self) -> u64 {
        self.source_frames
    }

    /// True when no frame is dropped
    pub fn keeps_every_frame(&self) -> bool {
        self.kept == self.source_frames
    }

    /// Source index of the `k`-th retained frame
    pub fn nth(&self, k: u64) -> Option<u64> {
        (k < self.kept).then(|| {
            (k as u128 * self.source_frames as u128 / self.kept as u128) as u64
        })
    }

    /// Retained source indexes in increasing order
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.kept).filter_map(move |k| self.nth(k))
    }

    /// Whether the decoded frame at `index` survives.
    ///
    /// A set that keeps every frame also keeps frames past the estimated
    /// source count, since decoders can yield slightly more than
    /// `fps * duration` suggests.
    pub fn retains(&self, index: u64) -> bool {
        if self.keeps_every_frame() {
            return true;
        }
        if index >= self.source_frames || self.kept == 0 {
            return false;
        }
        // smallest k whose stride position reaches `index`
        let k = (index as u128 * self.kept as u128).div_ceil(self.source_frames as u128);
        k < self.kept as u128 && self.nth(k as u64) == Some(index)
    }
}

/// Everything fixed for one job before streaming starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodePlan {
    pub source_size: Size,
    pub target_size: Size,
    pub source_fps: f64,
    pub target_fps: f64,
    /// Video bitrate in bits per second
    pub bitrate: u64,
    pub keyframe_interval: u32,
    pub container: Container,
    pub frames: FrameIndexSet,
}

impl EncodePlan {
    pub fn needs_resize(&self) -> bool {
        self.source_size != self.target_size
    }

    /// Expected number of output frames
    pub fn output_frames(&self) -> u64 {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests;
