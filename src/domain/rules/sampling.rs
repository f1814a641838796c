//! Frame-rate reduction by stride sampling

use crate::domain::model::FrameIndexSet;
use crate::error::{ShrinkError, ShrinkResult};

/// Picks which decoded frames survive a frame-rate reduction
pub struct FrameSampler;

impl FrameSampler {
    /// Evenly spaced frame indexes for `target_fps` over `duration_secs`.
    ///
    /// Index `i` maps to `floor(i * S / T)` where `S` and `T` are the rounded
    /// source and target frame counts, so the output holds exactly `T` frames
    /// spread across the whole clip instead of clustering like modulo dropping.
    pub fn sample_indexes(
        original_fps: f64,
        target_fps: f64,
        duration_secs: f64,
    ) -> ShrinkResult<FrameIndexSet> {
        Self::check_rate("source", original_fps)?;
        Self::check_rate("target", target_fps)?;

        let duration = if duration_secs.is_finite() {
            duration_secs.max(0.0)
        } else {
            0.0
        };
        let source_frames = (original_fps * duration).round() as u64;

        if target_fps >= original_fps {
            return Ok(FrameIndexSet::all(source_frames));
        }

        let mut target_frames = ((target_fps * duration).round() as u64).min(source_frames);
        // a non-empty source always yields at least its first frame
        if target_frames == 0 && source_frames > 0 {
            target_frames = 1;
        }
        Ok(FrameIndexSet::strided(source_frames, target_frames))
    }

    fn check_rate(which: &str, fps: f64) -> ShrinkResult<()> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(ShrinkError::frame_rate(format!(
                "{} frame rate must be positive, got {}",
                which, fps
            )));
        }
        Ok(())
    }
}
