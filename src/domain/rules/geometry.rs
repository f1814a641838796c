//! Output size resolution

use crate::domain::model::{Dimension, Quality, ScaleRequest, Size};
use crate::domain::rules::QualityPolicy;
use crate::error::{ShrinkError, ShrinkResult};

/// Round to the nearest even integer, never below 2.
///
/// Most encoders reject odd dimensions for 4:2:0 chroma subsampling.
pub fn round_to_even(value: f64) -> u32 {
    let even = (value / 2.0).round() * 2.0;
    if even.is_nan() || even < 2.0 {
        return 2;
    }
    even.min(u32::MAX as f64) as u32
}

/// Computes output dimensions from presets or explicit scale requests
pub struct GeometryResolver;

impl GeometryResolver {
    /// Fit the source inside the preset's long-side cap, never upscaling
    pub fn for_quality(quality: Quality, original: Size) -> ShrinkResult<Size> {
        Self::check_source(original)?;

        let cap = QualityPolicy::for_quality(quality).max_long_side;
        let long_side = original.long_side();
        if long_side <= cap {
            return Ok(original);
        }

        let scale = cap as f64 / long_side as f64;
        Ok(Size::new(
            round_to_even(original.width as f64 * scale),
            round_to_even(original.height as f64 * scale),
        ))
    }

    /// Resolve a scale request, deriving a missing side from the source aspect ratio
    pub fn for_request(request: &ScaleRequest, original: Size) -> ShrinkResult<Size> {
        Self::check_source(original)?;

        let (width, height) = match (request.width, request.height) {
            (Dimension::DeriveFromAspectRatio, Dimension::DeriveFromAspectRatio) => {
                return Err(ShrinkError::geometry(
                    "at least one of width or height must be given",
                ));
            }
            (Dimension::Concrete(width), Dimension::Concrete(height)) => {
                (Self::concrete(width)?, Self::concrete(height)?)
            }
            (Dimension::DeriveFromAspectRatio, Dimension::Concrete(height)) => {
                let height = Self::concrete(height)?;
                let width = (height * original.width as f64 / original.height as f64).round();
                (width, height)
            }
            (Dimension::Concrete(width), Dimension::DeriveFromAspectRatio) => {
                let width = Self::concrete(width)?;
                let height = (width * original.height as f64 / original.width as f64).round();
                (width, height)
            }
        };

        Ok(Size::new(round_to_even(width), round_to_even(height)))
    }

    fn concrete(px: u32) -> ShrinkResult<f64> {
        if px == 0 {
            return Err(ShrinkError::geometry("dimensions must be positive"));
        }
        Ok(px as f64)
    }

    fn check_source(original: Size) -> ShrinkResult<()> {
        if original.width == 0 || original.height == 0 {
            return Err(ShrinkError::geometry(format!(
                "source size {} has a zero dimension",
                original
            )));
        }
        Ok(())
    }
}
