//! Quality policy table

use serde::Serialize;

use crate::domain::model::Quality;

/// Limits applied for one quality preset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityPolicy {
    pub quality: Quality,
    /// Cap on the output's long side, in pixels
    pub max_long_side: u32,
    /// Target video bitrate in bits per second
    pub bitrate: u64,
    /// Cap on the output frame rate
    pub max_fps: f64,
}

/// Keyframe spacing used by presets, in output frames
pub const DEFAULT_KEYFRAME_INTERVAL: u32 = 10;

const LOW: QualityPolicy = QualityPolicy {
    quality: Quality::Low,
    max_long_side: 398,
    bitrate: 250_000,
    max_fps: 15.0,
};

const MEDIUM: QualityPolicy = QualityPolicy {
    quality: Quality::Medium,
    max_long_side: 854,
    bitrate: 1_000_000,
    max_fps: 24.0,
};

const HIGH: QualityPolicy = QualityPolicy {
    quality: Quality::High,
    max_long_side: 1280,
    bitrate: 2_500_000,
    max_fps: 30.0,
};

static POLICY_TABLE: [QualityPolicy; 3] = [LOW, MEDIUM, HIGH];

impl QualityPolicy {
    pub fn for_quality(quality: Quality) -> &'static QualityPolicy {
        match quality {
            Quality::Low => &POLICY_TABLE[0],
            Quality::Medium => &POLICY_TABLE[1],
            Quality::High => &POLICY_TABLE[2],
        }
    }

    /// All rows, lowest quality first
    pub fn table() -> &'static [QualityPolicy] {
        &POLICY_TABLE
    }
}
