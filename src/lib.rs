//! vidshrink video compressor library
//!
//! Re-encodes videos to a smaller footprint: quality presets or custom
//! settings resolve to a target geometry, frame rate and bitrate, and a
//! two-stage decode/encode pipeline writes the result with audio copied
//! through.

pub mod adapters;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use domain::model::{
    CompressionConfig, CompressionTarget, Container, Dimension, EncodePlan, Quality,
    ScaleRequest, Size, VideoAsset,
};
pub use engine::{CompressRequest, CompressionReport, Compressor, JobHandle, JobPhase};
pub use error::{ShrinkError, ShrinkResult};
