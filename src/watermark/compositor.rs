use tracing::{debug, warn};

use crate::{
    foundation::{
        core::{ImageRole, ImageSize, Rect},
        error::{CompositeError, CompositeResult},
    },
    raster::{
        backend::{Raster, RasterBackend},
        cpu::CpuBackend,
    },
    source::reference::{DataUri, ImageRef, PNG_MIME},
    watermark::{
        layout::{LogoPlacement, place_logo},
        policy::WatermarkPolicy,
    },
};

/// A finished composite: PNG bytes sized exactly like the base image.
#[derive(Clone, Debug)]
pub struct CompositeOutput {
    /// Output width in pixels (the base image width).
    pub width: u32,
    /// Output height in pixels (the base image height).
    pub height: u32,
    /// Encoded PNG bytes.
    pub png: Vec<u8>,
    /// Where the logo was drawn.
    pub placement: LogoPlacement,
}

impl CompositeOutput {
    /// Output dimensions.
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    /// Copy the PNG into an `image/png` data URI.
    pub fn to_data_uri(&self) -> DataUri {
        DataUri::from_bytes(PNG_MIME, self.png.clone())
    }

    /// Render the PNG as a `data:image/png;base64,...` string.
    pub fn to_data_uri_string(&self) -> String {
        self.to_data_uri().to_uri_string()
    }
}

/// First pipeline stage: the base image decoded and drawn into a canvas of its size.
///
/// Produced by [`Compositor::load_base`] and consumed by [`Compositor::apply_logo`].
#[derive(Debug)]
pub struct BaseStage {
    canvas: Raster,
}

impl BaseStage {
    /// Canvas dimensions, equal to the base image's.
    pub fn canvas_size(&self) -> ImageSize {
        self.canvas.size()
    }

    /// The canvas holding the base image.
    pub fn canvas(&self) -> &Raster {
        &self.canvas
    }
}

/// Overlays a logo onto a base image, bottom-right, at a fixed relative size and opacity.
pub struct Compositor<B = Box<dyn RasterBackend>> {
    backend: B,
    policy: WatermarkPolicy,
}

impl<B: RasterBackend> Compositor<B> {
    /// Compositor with the default policy.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            policy: WatermarkPolicy::default(),
        }
    }

    /// Compositor with a custom policy, validated up front.
    pub fn with_policy(backend: B, policy: WatermarkPolicy) -> CompositeResult<Self> {
        policy.validate()?;
        Ok(Self { backend, policy })
    }

    /// Active policy.
    pub fn policy(&self) -> &WatermarkPolicy {
        &self.policy
    }

    /// Backend used for decoding, drawing and encoding.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Compute the logo placement for the given natural sizes without touching pixels.
    pub fn plan(&self, base: ImageSize, logo: ImageSize) -> CompositeResult<LogoPlacement> {
        place_logo(base, logo, &self.policy)
    }

    /// Composite `logo` onto `base` and encode the result as PNG.
    ///
    /// The logo is only loaded once the base image has been decoded and drawn. Any failure leaves
    /// no output behind.
    #[tracing::instrument(
        name = "composite",
        skip_all,
        fields(base = %base.describe(), logo = %logo.describe())
    )]
    pub async fn composite(
        &self,
        base: &ImageRef,
        logo: &ImageRef,
    ) -> CompositeResult<CompositeOutput> {
        let stage = self.load_base(base).await?;
        self.apply_logo(stage, logo).await
    }

    /// Parse both reference strings, then [`Compositor::composite`].
    ///
    /// An unparseable reference is reported as a decode error for its role.
    pub async fn composite_refs(&self, base: &str, logo: &str) -> CompositeResult<CompositeOutput> {
        let base = ImageRef::parse(base).map_err(|e| CompositeError::decode(ImageRole::Base, e))?;
        let logo = ImageRef::parse(logo).map_err(|e| CompositeError::decode(ImageRole::Logo, e))?;
        self.composite(&base, &logo).await
    }

    /// Stage one: decode the base image and draw it unscaled into a canvas of the same size.
    pub async fn load_base(&self, base: &ImageRef) -> CompositeResult<BaseStage> {
        let raster = self.decode_role(ImageRole::Base, base).await?;
        let size = raster.size();

        let mut canvas = self.backend.allocate(size).inspect_err(|e| {
            warn!(error = %e, size = %size, "canvas allocation failed");
        })?;
        let full = Rect::new(0.0, 0.0, f64::from(size.width), f64::from(size.height));
        self.backend.draw(&mut canvas, &raster, full, 1.0)?;

        debug!(size = %size, "base image drawn");
        Ok(BaseStage { canvas })
    }

    /// Stage two: decode the logo, place it, draw it with the policy opacity, encode the canvas.
    pub async fn apply_logo(
        &self,
        stage: BaseStage,
        logo: &ImageRef,
    ) -> CompositeResult<CompositeOutput> {
        let BaseStage { mut canvas } = stage;
        let logo_raster = self.decode_role(ImageRole::Logo, logo).await?;

        let placement = self.plan(canvas.size(), logo_raster.size())?;
        debug!(
            logo = %logo_raster.size(),
            x = placement.rect.x0,
            y = placement.rect.y0,
            width = placement.width(),
            height = placement.height(),
            opacity = placement.opacity,
            "logo placed"
        );
        self.backend
            .draw(&mut canvas, &logo_raster, placement.rect, placement.opacity)?;

        let png = self.backend.encode_png(&canvas).map_err(|e| {
            warn!(error = %format!("{e:#}"), "png encoding failed");
            CompositeError::encode(e)
        })?;

        Ok(CompositeOutput {
            width: canvas.width,
            height: canvas.height,
            png,
            placement,
        })
    }

    async fn decode_role(&self, role: ImageRole, reference: &ImageRef) -> CompositeResult<Raster> {
        let raster = self.backend.decode(reference).await.map_err(|e| {
            warn!(role = %role, error = %format!("{e:#}"), "image decode failed");
            CompositeError::decode(role, e)
        })?;
        if raster.size().is_empty() {
            return Err(CompositeError::decode(
                role,
                anyhow::anyhow!("{role} image has no pixels ({})", raster.size()),
            ));
        }
        debug!(role = %role, size = %raster.size(), "image decoded");
        Ok(raster)
    }
}

/// Composite with the CPU backend and default policy, returning an `image/png` data URI string.
pub async fn composite_watermark(base: &str, logo: &str) -> CompositeResult<String> {
    let compositor = Compositor::new(CpuBackend::default());
    let out = compositor.composite_refs(base, logo).await?;
    Ok(out.to_data_uri_string())
}

#[cfg(test)]
#[path = "../../tests/unit/watermark/compositor.rs"]
mod tests;
