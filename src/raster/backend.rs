use std::fmt;

use async_trait::async_trait;

use crate::{
    foundation::{
        core::{ImageSize, Rect},
        error::{CompositeError, CompositeResult},
    },
    raster::cpu::{CpuBackend, CpuBackendOpts},
    source::reference::ImageRef,
};

/// Decoded pixels as straight-alpha RGBA8.
///
/// `data` is tightly packed and row-major, `width * height * 4` bytes long.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA8 bytes, straight (non-premultiplied) alpha.
    pub data: Vec<u8>,
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.data.len())
            .finish()
    }
}

impl Raster {
    /// Fully transparent raster of the given size.
    pub fn new_transparent(width: u32, height: u32) -> CompositeResult<Self> {
        let len = rgba8_len(width, height).ok_or_else(|| {
            CompositeError::canvas_unavailable(format!("{width}x{height} overflows a byte buffer"))
        })?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Wrap existing straight-alpha RGBA8 bytes, checking their length.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> CompositeResult<Self> {
        if rgba8_len(width, height) != Some(data.len()) {
            return Err(CompositeError::validation(format!(
                "rgba8 buffer of {} bytes does not match {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Take ownership of an `image` RGBA buffer.
    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }

    /// Convert into an `image` RGBA buffer.
    pub fn into_rgba_image(self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data)
    }

    /// Pixel dimensions.
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    /// Read one pixel, or `None` outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let i = self.offset(x, y)?;
        let p = &self.data[i..i + 4];
        Some([p[0], p[1], p[2], p[3]])
    }

    pub(crate) fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }
}

pub(crate) fn rgba8_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)
}

/// Drawing-surface capability the compositor is written against.
///
/// The CPU backend is the production implementation; tests substitute in-memory fakes.
#[async_trait]
pub trait RasterBackend: Send + Sync {
    /// Load and decode an image reference into pixels.
    async fn decode(&self, reference: &ImageRef) -> anyhow::Result<Raster>;

    /// Allocate a blank canvas, or fail with [`CompositeError::CanvasUnavailable`].
    fn allocate(&self, size: ImageSize) -> CompositeResult<Raster>;

    /// Draw `src` scaled into `dest` on `dst`, alpha-over blended with `opacity`.
    ///
    /// Opacity applies to this call only.
    fn draw(&self, dst: &mut Raster, src: &Raster, dest: Rect, opacity: f32)
    -> CompositeResult<()>;

    /// Serialize a raster as PNG bytes.
    fn encode_png(&self, raster: &Raster) -> anyhow::Result<Vec<u8>>;
}

#[async_trait]
impl<B: RasterBackend + ?Sized> RasterBackend for Box<B> {
    async fn decode(&self, reference: &ImageRef) -> anyhow::Result<Raster> {
        (**self).decode(reference).await
    }

    fn allocate(&self, size: ImageSize) -> CompositeResult<Raster> {
        (**self).allocate(size)
    }

    fn draw(
        &self,
        dst: &mut Raster,
        src: &Raster,
        dest: Rect,
        opacity: f32,
    ) -> CompositeResult<()> {
        (**self).draw(dst, src, dest, opacity)
    }

    fn encode_png(&self, raster: &Raster) -> anyhow::Result<Vec<u8>> {
        (**self).encode_png(raster)
    }
}

/// Available backend kinds.
///
/// - `Cpu` is always available.
#[derive(Clone, Copy, Debug, Default)]
pub enum BackendKind {
    /// Pure-Rust CPU rasterizer.
    #[default]
    Cpu,
}

/// Create a raster backend implementation.
pub fn create_backend(kind: BackendKind, opts: CpuBackendOpts) -> Box<dyn RasterBackend> {
    match kind {
        BackendKind::Cpu => Box::new(CpuBackend::new(opts)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/backend.rs"]
mod tests;
