use std::io::Cursor;

use anyhow::Context as _;
use async_trait::async_trait;

use crate::{
    foundation::{
        core::{ImageSize, Rect},
        error::{CompositeError, CompositeResult},
    },
    raster::{
        backend::{Raster, RasterBackend, rgba8_len},
        blend::{over, premultiply, unpremultiply},
        decode::decode_raster,
    },
    source::{
        fetch::{FetchOpts, fetch_bytes},
        reference::ImageRef,
    },
};

/// Options for [`CpuBackend`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CpuBackendOpts {
    /// Largest canvas, in pixels, the backend agrees to allocate.
    pub max_canvas_pixels: u64,
    /// Limits for loading image references.
    pub fetch: FetchOpts,
}

impl Default for CpuBackendOpts {
    fn default() -> Self {
        Self {
            max_canvas_pixels: 64 * 1024 * 1024,
            fetch: FetchOpts::default(),
        }
    }
}

/// Pure-Rust raster backend.
///
/// Drawing uses exact area sampling: each destination pixel receives the box-filtered average of
/// the source region it covers, weighted by how much of the pixel the destination rect covers.
#[derive(Clone, Debug, Default)]
pub struct CpuBackend {
    opts: CpuBackendOpts,
}

impl CpuBackend {
    /// Create a backend with `opts`.
    pub fn new(opts: CpuBackendOpts) -> Self {
        Self { opts }
    }

    /// Options this backend was built with.
    pub fn opts(&self) -> &CpuBackendOpts {
        &self.opts
    }
}

#[async_trait]
impl RasterBackend for CpuBackend {
    async fn decode(&self, reference: &ImageRef) -> anyhow::Result<Raster> {
        let fetched = fetch_bytes(reference, &self.opts.fetch).await?;
        let hint = fetched.mime.as_deref().or(reference.declared_mime());
        decode_raster(&fetched.bytes, hint)
            .with_context(|| format!("decode '{}'", reference.describe()))
    }

    fn allocate(&self, size: ImageSize) -> CompositeResult<Raster> {
        if size.is_empty() {
            return Err(CompositeError::canvas_unavailable(format!(
                "cannot allocate an empty {size} canvas"
            )));
        }
        if size.pixel_count() > self.opts.max_canvas_pixels {
            return Err(CompositeError::canvas_unavailable(format!(
                "{size} canvas exceeds the {} pixel limit",
                self.opts.max_canvas_pixels
            )));
        }
        let len = rgba8_len(size.width, size.height).ok_or_else(|| {
            CompositeError::canvas_unavailable(format!("{size} overflows a byte buffer"))
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            CompositeError::canvas_unavailable(format!("allocate {size} canvas: {e}"))
        })?;
        data.resize(len, 0);

        Ok(Raster {
            width: size.width,
            height: size.height,
            data,
        })
    }

    fn draw(
        &self,
        dst: &mut Raster,
        src: &Raster,
        dest: Rect,
        opacity: f32,
    ) -> CompositeResult<()> {
        draw_scaled(dst, src, dest, opacity)
    }

    fn encode_png(&self, raster: &Raster) -> anyhow::Result<Vec<u8>> {
        let img = raster
            .clone()
            .into_rgba_image()
            .context("raster buffer does not match its dimensions")?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .context("encode png")?;
        Ok(buf)
    }
}

/// Draw `src` stretched over `dest` (canvas pixel space) with alpha-over blending.
///
/// Pixels whose area does not intersect `dest` are left untouched.
pub fn draw_scaled(dst: &mut Raster, src: &Raster, dest: Rect, opacity: f32) -> CompositeResult<()> {
    let finite = [dest.x0, dest.y0, dest.x1, dest.y1]
        .iter()
        .all(|v| v.is_finite());
    if !finite || !opacity.is_finite() {
        return Err(CompositeError::validation(
            "draw rect and opacity must be finite",
        ));
    }
    if src.size().is_empty() {
        return Err(CompositeError::validation("cannot draw an empty source"));
    }
    let dest = dest.abs();
    if dest.width() <= 0.0 || dest.height() <= 0.0 || opacity <= 0.0 {
        return Ok(());
    }

    let bounds = Rect::new(0.0, 0.0, f64::from(dst.width), f64::from(dst.height));
    let clip = dest.intersect(bounds);
    if clip.width() <= 0.0 || clip.height() <= 0.0 {
        return Ok(());
    }

    let scale_x = f64::from(src.width) / dest.width();
    let scale_y = f64::from(src.height) / dest.height();

    let px0 = clip.x0.floor() as u32;
    let px1 = (clip.x1.ceil() as u32).min(dst.width);
    let py0 = clip.y0.floor() as u32;
    let py1 = (clip.y1.ceil() as u32).min(dst.height);

    for py in py0..py1 {
        let cy0 = f64::from(py).max(dest.y0);
        let cy1 = f64::from(py + 1).min(dest.y1);
        if cy1 <= cy0 {
            continue;
        }
        let v0 = (cy0 - dest.y0) * scale_y;
        let v1 = (cy1 - dest.y0) * scale_y;

        for px in px0..px1 {
            let cx0 = f64::from(px).max(dest.x0);
            let cx1 = f64::from(px + 1).min(dest.x1);
            if cx1 <= cx0 {
                continue;
            }
            let u0 = (cx0 - dest.x0) * scale_x;
            let u1 = (cx1 - dest.x0) * scale_x;

            let coverage = ((cx1 - cx0) * (cy1 - cy0)) as f32;
            let Some(i) = dst.offset(px, py) else {
                continue;
            };

            // Opaque copy onto an empty pixel keeps the source bytes exactly.
            if dst.data[i + 3] == 0
                && opacity * coverage >= 1.0
                && let Some(p) = aligned_source_pixel(src, u0, u1, v0, v1)
            {
                dst.data[i..i + 4].copy_from_slice(&p);
                continue;
            }

            let sample = sample_area(src, u0, u1, v0, v1);
            let d = premultiply([dst.data[i], dst.data[i + 1], dst.data[i + 2], dst.data[i + 3]]);
            let out = over(d, sample, opacity * coverage);
            if out != d {
                dst.data[i..i + 4].copy_from_slice(&unpremultiply(out));
            }
        }
    }
    Ok(())
}

/// The single source pixel a footprint maps onto, when it maps onto exactly one.
fn aligned_source_pixel(src: &Raster, u0: f64, u1: f64, v0: f64, v1: f64) -> Option<[u8; 4]> {
    const EPS: f64 = 1e-9;
    let (sx, sy) = (u0.round(), v0.round());
    let aligned = (u0 - sx).abs() < EPS
        && (v0 - sy).abs() < EPS
        && (u1 - u0 - 1.0).abs() < EPS
        && (v1 - v0 - 1.0).abs() < EPS;
    if !aligned || sx < 0.0 || sy < 0.0 {
        return None;
    }
    src.pixel(sx as u32, sy as u32)
}

/// Box-filtered premultiplied average of `src` over `[u0, u1) x [v0, v1)` in source pixels.
fn sample_area(src: &Raster, u0: f64, u1: f64, v0: f64, v1: f64) -> [u8; 4] {
    let w = f64::from(src.width);
    let h = f64::from(src.height);
    let (u0, u1) = (u0.clamp(0.0, w), u1.clamp(0.0, w));
    let (v0, v1) = (v0.clamp(0.0, h), v1.clamp(0.0, h));

    let sx0 = (u0.floor() as u32).min(src.width - 1);
    let sx1 = (u1.ceil() as u32).max(sx0 + 1).min(src.width);
    let sy0 = (v0.floor() as u32).min(src.height - 1);
    let sy1 = (v1.ceil() as u32).max(sy0 + 1).min(src.height);

    let mut acc = [0f64; 4];
    let mut total = 0f64;
    for sy in sy0..sy1 {
        let wy = (v1.min(f64::from(sy + 1)) - v0.max(f64::from(sy))).max(0.0);
        for sx in sx0..sx1 {
            let wx = (u1.min(f64::from(sx + 1)) - u0.max(f64::from(sx))).max(0.0);
            let weight = wx * wy;
            if weight <= 0.0 {
                continue;
            }
            let Some(p) = src.pixel(sx, sy) else {
                continue;
            };
            let p = premultiply(p);
            for c in 0..4 {
                acc[c] += f64::from(p[c]) * weight;
            }
            total += weight;
        }
    }

    if total <= 0.0 {
        return src.pixel(sx0, sy0).map(premultiply).unwrap_or([0; 4]);
    }

    let mut out = [0u8; 4];
    for c in 0..4 {
        out[c] = (acc[c] / total).round().clamp(0.0, 255.0) as u8;
    }
    // Rounding must not leave a colour channel above alpha.
    for c in 0..3 {
        out[c] = out[c].min(out[3]);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/raster/cpu.rs"]
mod tests;
