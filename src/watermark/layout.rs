use crate::{
    foundation::{
        core::{ImageSize, Point, Rect},
        error::{CompositeError, CompositeResult},
    },
    watermark::policy::WatermarkPolicy,
};

/// Where and how the logo is drawn onto a base image.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LogoPlacement {
    /// Logo destination in canvas pixel space.
    pub rect: Rect,
    /// Padding to the right and bottom canvas edges, in pixels.
    pub padding: f64,
    /// Shorter side of the base image, in pixels.
    pub min_dim: f64,
    /// Opacity the logo is drawn with.
    pub opacity: f32,
}

impl LogoPlacement {
    /// Top-left corner of the logo.
    pub fn origin(&self) -> Point {
        self.rect.origin()
    }

    /// Drawn logo width.
    pub fn width(&self) -> f64 {
        self.rect.width()
    }

    /// Drawn logo height.
    pub fn height(&self) -> f64 {
        self.rect.height()
    }

    /// Integer pixel box `[x0, x1) x [y0, y1)` the draw can touch, clipped to `canvas`.
    pub fn pixel_bounds(&self, canvas: ImageSize) -> (u32, u32, u32, u32) {
        let clamp_x = |v: f64| v.clamp(0.0, f64::from(canvas.width)) as u32;
        let clamp_y = |v: f64| v.clamp(0.0, f64::from(canvas.height)) as u32;
        (
            clamp_x(self.rect.x0.floor()),
            clamp_y(self.rect.y0.floor()),
            clamp_x(self.rect.x1.ceil()),
            clamp_y(self.rect.y1.ceil()),
        )
    }
}

/// Scale the logo to the policy size and anchor it bottom-right with uniform padding.
///
/// The logo keeps its aspect ratio. Its longer side (width when `w >= h`) becomes
/// `min(W, H) * scale_factor`.
pub fn place_logo(
    base: ImageSize,
    logo: ImageSize,
    policy: &WatermarkPolicy,
) -> CompositeResult<LogoPlacement> {
    if base.is_empty() {
        return Err(CompositeError::validation(format!(
            "base image {base} has no pixels"
        )));
    }
    if logo.is_empty() {
        return Err(CompositeError::validation(format!(
            "logo image {logo} has no pixels"
        )));
    }

    let min_dim = f64::from(base.min_dim());
    let aspect = logo.aspect_ratio();

    let (logo_w, logo_h) = if logo.width >= logo.height {
        let w = min_dim * policy.scale_factor;
        (w, w / aspect)
    } else {
        let h = min_dim * policy.scale_factor;
        (h * aspect, h)
    };
    if !(logo_w.is_finite() && logo_h.is_finite()) || logo_w <= 0.0 || logo_h <= 0.0 {
        return Err(CompositeError::validation(format!(
            "computed logo size {logo_w}x{logo_h} is degenerate"
        )));
    }

    let padding = min_dim * policy.padding;
    let x = f64::from(base.width) - logo_w - padding;
    let y = f64::from(base.height) - logo_h - padding;

    Ok(LogoPlacement {
        rect: Rect::new(x, y, x + logo_w, y + logo_h),
        padding,
        min_dim,
        opacity: policy.opacity,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/watermark/layout.rs"]
mod tests;
