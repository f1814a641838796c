//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::domain::model::{
    CompressionConfig, CompressionTarget, Container, Dimension, Quality, ScaleRequest,
};
use crate::error::{ShrinkError, ShrinkResult};
use crate::utils::path::container_for;

/// Quality preset or custom encode settings
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Quality preset (low, medium, high); the default without custom settings is medium
    #[arg(short, long, conflicts_with_all = ["fps", "bitrate", "width", "height", "keyframe_interval"])]
    pub quality: Option<Quality>,

    /// Target frame rate, capped at the source rate
    #[arg(long)]
    pub fps: Option<f64>,

    /// Target video bitrate in bits per second
    #[arg(long)]
    pub bitrate: Option<u64>,

    /// Output width in pixels, or "auto" (or -1) to follow the aspect ratio
    #[arg(long, allow_negative_numbers = true)]
    pub width: Option<Dimension>,

    /// Output height in pixels, or "auto" (or -1) to follow the aspect ratio
    #[arg(long, allow_negative_numbers = true)]
    pub height: Option<Dimension>,

    /// Maximum frames between keyframes
    #[arg(long)]
    pub keyframe_interval: Option<u32>,

    /// Output container (mp4, mov)
    #[arg(long)]
    pub container: Option<Container>,
}

impl TargetArgs {
    fn is_custom(&self) -> bool {
        self.fps.is_some()
            || self.bitrate.is_some()
            || self.width.is_some()
            || self.height.is_some()
            || self.keyframe_interval.is_some()
            || self.container.is_some()
    }

    /// Build the compression target these flags describe
    pub fn to_target(&self) -> ShrinkResult<CompressionTarget> {
        if let Some(quality) = self.quality {
            if self.container.is_some_and(|c| c != Container::Mp4) {
                return Err(ShrinkError::config(
                    "quality presets always write mp4; use custom settings for another container",
                ));
            }
            return Ok(CompressionTarget::Quality(quality));
        }
        if !self.is_custom() {
            return Ok(CompressionTarget::Quality(Quality::Medium));
        }

        let defaults = CompressionConfig::default();
        let scale = match (self.width, self.height) {
            (None, None) => None,
            (width, height) => Some(ScaleRequest::new(
                width.unwrap_or(Dimension::DeriveFromAspectRatio),
                height.unwrap_or(Dimension::DeriveFromAspectRatio),
            )),
        };
        Ok(CompressionTarget::Custom(CompressionConfig {
            fps: self.fps.unwrap_or(defaults.fps),
            video_bitrate: self.bitrate.unwrap_or(defaults.video_bitrate),
            max_keyframe_interval: self
                .keyframe_interval
                .unwrap_or(defaults.max_keyframe_interval),
            scale,
            container: self.container.unwrap_or(defaults.container),
        }))
    }
}

/// Arguments for the compress command
#[derive(Args, Debug)]
pub struct CompressArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file path (default: <input>_compressed_<timestamp>.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Print progress and the result as JSON lines
    #[arg(long)]
    pub json: bool,
}

impl CompressArgs {
    /// Target for this run; custom settings without `--container` follow the
    /// output file's extension
    pub fn to_target(&self) -> ShrinkResult<CompressionTarget> {
        let mut target = self.target.to_target()?;
        if let CompressionTarget::Custom(config) = &mut target {
            let implied = self.output.as_deref().and_then(container_for);
            if let (None, Some(container)) = (self.target.container, implied) {
                config.container = container;
            }
        }
        Ok(target)
    }
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_means_medium() {
        let target = TargetArgs::default().to_target().unwrap();
        assert_eq!(target, CompressionTarget::Quality(Quality::Medium));
    }

    #[test]
    fn test_custom_flags_fill_defaults() {
        let args = TargetArgs {
            fps: Some(15.0),
            height: Some(Dimension::Concrete(224)),
            container: Some(Container::Mov),
            ..TargetArgs::default()
        };
        let CompressionTarget::Custom(config) = args.to_target().unwrap() else {
            panic!("expected a custom target");
        };
        assert_eq!(config.fps, 15.0);
        assert_eq!(config.video_bitrate, 1_000_000);
        assert_eq!(config.scale, Some(ScaleRequest::with_height(224)));
        assert_eq!(config.container, Container::Mov);
    }

    #[test]
    fn test_quality_rejects_other_container() {
        let args = TargetArgs {
            quality: Some(Quality::Low),
            container: Some(Container::Mov),
            ..TargetArgs::default()
        };
        assert!(args.to_target().is_err());
    }

    fn compress_args(output: &str, target: TargetArgs) -> CompressArgs {
        CompressArgs {
            input: PathBuf::from("in.mp4"),
            output: Some(PathBuf::from(output)),
            target,
            json: false,
        }
    }

    #[test]
    fn test_custom_target_follows_output_extension() {
        let args = compress_args(
            "small.mov",
            TargetArgs {
                fps: Some(15.0),
                ..TargetArgs::default()
            },
        );
        let CompressionTarget::Custom(config) = args.to_target().unwrap() else {
            panic!("expected a custom target");
        };
        assert_eq!(config.container, Container::Mov);
    }

    #[test]
    fn test_explicit_container_wins_over_extension() {
        let args = compress_args(
            "small.mov",
            TargetArgs {
                container: Some(Container::Mp4),
                ..TargetArgs::default()
            },
        );
        assert_eq!(args.to_target().unwrap().container(), Container::Mp4);
    }

    #[test]
    fn test_preset_keeps_mp4_for_any_extension() {
        let args = compress_args("small.mov", TargetArgs::default());
        assert_eq!(
            args.to_target().unwrap(),
            CompressionTarget::Quality(Quality::Medium)
        );
    }
}
