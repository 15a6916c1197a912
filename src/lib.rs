//! brandmark overlays a logo watermark onto generated social-media creatives.
//!
//! The public API is a two-stage compositor:
//!
//! - Parse base and logo references into [`ImageRef`]s (data URIs, URLs or files)
//! - Create a [`Compositor`] over a [`RasterBackend`] (usually [`CpuBackend`])
//! - [`Compositor::composite`] decodes the base, sizes the canvas, then decodes, scales and draws
//!   the logo bottom-right and returns a [`CompositeOutput`] PNG
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;
mod raster;
mod source;
mod watermark;

pub use crate::foundation::core::{ImageRole, ImageSize, Point, Rect, Size};
pub use crate::foundation::error::{CompositeError, CompositeErrorKind, CompositeResult};

pub use crate::raster::backend::{BackendKind, Raster, RasterBackend, create_backend};
pub use crate::raster::blend::{PremulRgba8, over, premultiply, unpremultiply};
pub use crate::raster::cpu::{CpuBackend, CpuBackendOpts, draw_scaled};
pub use crate::raster::decode::{decode_raster, rasterize_svg};
pub use crate::source::fetch::{FetchOpts, Fetched, fetch_bytes};
pub use crate::source::reference::{DataUri, ImageRef, PNG_MIME, SVG_MIME, sniff_mime};
pub use crate::watermark::compositor::{
    BaseStage, CompositeOutput, Compositor, composite_watermark,
};
pub use crate::watermark::layout::{LogoPlacement, place_logo};
pub use crate::watermark::policy::{
    DEFAULT_OPACITY, DEFAULT_PADDING, DEFAULT_SCALE_FACTOR, WatermarkPolicy,
};
