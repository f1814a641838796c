//! Combines geometry, policy and sampling into one encode plan

use tracing::debug;

use crate::domain::model::{
    CompressionConfig, CompressionTarget, EncodePlan, Size, VideoAsset,
};
use crate::domain::rules::policy::DEFAULT_KEYFRAME_INTERVAL;
use crate::domain::rules::{FrameSampler, GeometryResolver, QualityPolicy};
use crate::error::{ShrinkError, ShrinkResult};

/// Fixes the target geometry, rate and frame selection for a job
pub struct JobPlanner;

impl JobPlanner {
    /// Checks that need no source, run before anything is opened
    pub fn validate_target(target: &CompressionTarget) -> ShrinkResult<()> {
        let CompressionTarget::Custom(config) = target else {
            return Ok(());
        };

        if !config.fps.is_finite() || config.fps <= 0.0 {
            return Err(ShrinkError::frame_rate(format!(
                "target frame rate must be positive, got {}",
                config.fps
            )));
        }
        if config.video_bitrate == 0 {
            return Err(ShrinkError::config("video bitrate must be positive"));
        }
        if let Some(scale) = &config.scale {
            if scale.width.is_derived() && scale.height.is_derived() {
                return Err(ShrinkError::geometry(
                    "at least one of width or height must be given",
                ));
            }
        }
        Ok(())
    }

    pub fn plan(asset: &VideoAsset, target: &CompressionTarget) -> ShrinkResult<EncodePlan> {
        Self::validate_target(target)?;

        let (size, requested_fps, requested_bitrate, keyframe_interval) = match target {
            CompressionTarget::Quality(quality) => {
                let policy = QualityPolicy::for_quality(*quality);
                (
                    GeometryResolver::for_quality(*quality, asset.size)?,
                    policy.max_fps,
                    policy.bitrate,
                    DEFAULT_KEYFRAME_INTERVAL,
                )
            }
            CompressionTarget::Custom(config) => (
                Self::custom_size(config, asset.size)?,
                config.fps,
                config.video_bitrate,
                config.max_keyframe_interval.max(1),
            ),
        };

        if !asset.frame_rate.is_finite() || asset.frame_rate <= 0.0 {
            return Err(ShrinkError::frame_rate(format!(
                "source frame rate must be positive, got {}",
                asset.frame_rate
            )));
        }
        let target_fps = requested_fps.min(asset.frame_rate);
        if target_fps < asset.frame_rate && asset.duration_secs <= 0.0 {
            return Err(ShrinkError::source_unreadable(
                asset.path.display().to_string(),
                "source reports no duration",
            ));
        }

        // compression never raises the bitrate above what the source carries
        let bitrate = match asset.video_bitrate {
            Some(source) if source > 0 => requested_bitrate.min(source),
            _ => requested_bitrate,
        };

        let frames =
            FrameSampler::sample_indexes(asset.frame_rate, target_fps, asset.duration_secs)?;
        let target_size = Self::encodable(size);

        debug!(
            source = %asset.size,
            target_size = %target_size,
            source_fps = asset.frame_rate,
            target_fps,
            bitrate,
            retained = frames.len(),
            "Resolved encode plan"
        );

        Ok(EncodePlan {
            source_size: asset.size,
            target_size,
            source_fps: asset.frame_rate,
            target_fps,
            bitrate,
            keyframe_interval,
            container: target.container(),
            frames,
        })
    }

    fn custom_size(config: &CompressionConfig, original: Size) -> ShrinkResult<Size> {
        match &config.scale {
            Some(request) => GeometryResolver::for_request(request, original),
            None => Ok(original),
        }
    }

    /// Odd sizes are trimmed down by one pixel for the encoder
    fn encodable(size: Size) -> Size {
        let trim = |px: u32| if px % 2 == 1 { (px - 1).max(2) } else { px.max(2) };
        Size::new(trim(size.width), trim(size.height))
    }
}
