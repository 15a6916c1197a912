use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{CompositeError, CompositeResult};

/// Longer logo side as a fraction of the base image's shorter side.
pub const DEFAULT_SCALE_FACTOR: f64 = 0.15;
/// Corner padding as a fraction of the base image's shorter side.
pub const DEFAULT_PADDING: f64 = 0.05;
/// Opacity the logo is drawn with.
pub const DEFAULT_OPACITY: f32 = 0.9;

/// Size, padding and opacity policy for the watermark.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkPolicy {
    /// Longer logo side as a fraction of `min(W, H)`.
    pub scale_factor: f64,
    /// Gap between the logo and the bottom-right corner, as a fraction of `min(W, H)`.
    pub padding: f64,
    /// Logo opacity in `[0, 1]`.
    pub opacity: f32,
}

impl Default for WatermarkPolicy {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            padding: DEFAULT_PADDING,
            opacity: DEFAULT_OPACITY,
        }
    }
}

impl WatermarkPolicy {
    /// Parse a JSON policy. Missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> CompositeResult<Self> {
        let policy: Self = serde_json::from_str(s).context("parse watermark policy JSON")?;
        policy.validate()?;
        Ok(policy)
    }

    /// Read and parse a JSON policy file.
    pub fn from_path(path: impl AsRef<Path>) -> CompositeResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read watermark policy '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Check that the values describe a logo that fits inside the base image.
    pub fn validate(&self) -> CompositeResult<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 || self.scale_factor > 1.0
        {
            return Err(CompositeError::validation(format!(
                "scale_factor must be in (0, 1], got {}",
                self.scale_factor
            )));
        }
        if !self.padding.is_finite() || !(0.0..0.5).contains(&self.padding) {
            return Err(CompositeError::validation(format!(
                "padding must be in [0, 0.5), got {}",
                self.padding
            )));
        }
        if self.scale_factor + self.padding > 1.0 {
            return Err(CompositeError::validation(format!(
                "scale_factor + padding must be <= 1, got {}",
                self.scale_factor + self.padding
            )));
        }
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(CompositeError::validation(format!(
                "opacity must be in [0, 1], got {}",
                self.opacity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/watermark/policy.rs"]
mod tests;
