use std::io::Cursor;

use anyhow::{Context as _, bail};
use image::ImageDecoder as _;

use crate::{
    raster::{backend::Raster, blend::unpremultiply_in_place},
    source::reference::{SVG_MIME, looks_like_svg},
};

/// Largest side accepted when rasterizing an SVG at its intrinsic size.
const MAX_SVG_DIM: u32 = 16_384;

/// Decode encoded image bytes into a straight-alpha raster.
///
/// SVG is chosen when the hint says so or the bytes look like SVG; everything else goes through
/// `image`'s format detection.
pub fn decode_raster(bytes: &[u8], mime_hint: Option<&str>) -> anyhow::Result<Raster> {
    let raster = if mime_hint == Some(SVG_MIME) || looks_like_svg(bytes) {
        rasterize_svg(bytes)?
    } else {
        Raster::from_rgba_image(decode_oriented(bytes)?.to_rgba8())
    };

    if raster.size().is_empty() {
        bail!("image has no pixels ({})", raster.size());
    }
    Ok(raster)
}

/// Decode a raster format and apply its EXIF orientation, as browsers do when drawing an image.
///
/// Unreadable orientation metadata is ignored rather than failing the decode.
fn decode_oriented(bytes: &[u8]) -> anyhow::Result<image::DynamicImage> {
    let mut decoder = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("guess image format")?
        .into_decoder()
        .context("decode image from memory")?;
    let orientation = decoder
        .orientation()
        .unwrap_or(image::metadata::Orientation::NoTransforms);
    let mut img =
        image::DynamicImage::from_decoder(decoder).context("decode image from memory")?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Parse an SVG document and rasterize it at its intrinsic size.
pub fn rasterize_svg(bytes: &[u8]) -> anyhow::Result<Raster> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;

    let size = tree.size();
    let width = svg_side_px(size.width())?;
    let height = svg_side_px(size.height())?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .context("failed to allocate svg pixmap")?;
    let sx = (width as f32) / size.width();
    let sy = (height as f32) / size.height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    let mut data = pixmap.data().to_vec();
    unpremultiply_in_place(&mut data);
    Ok(Raster {
        width,
        height,
        data,
    })
}

fn svg_side_px(v: f32) -> anyhow::Result<u32> {
    if !v.is_finite() || v <= 0.0 {
        bail!("svg has invalid width/height");
    }
    let px = (v.ceil() as u32).max(1);
    if px > MAX_SVG_DIM {
        bail!("svg raster side too large: {px} (max {MAX_SVG_DIM})");
    }
    Ok(px)
}

#[cfg(test)]
#[path = "../../tests/unit/raster/decode.rs"]
mod tests;
