//! Glyph outlines and glyph rasterization for a path based graphics host.
//!
//! Teikna turns runs of positioned glyphs into either fixed point outline
//! paths ([`outline`]) or composited pixels ([`raster`]). Rasterization goes
//! through one of two interchangeable backends: an accelerated vector
//! renderer built on [`tiny-skia`](https://crates.io/crates/tiny-skia), and a
//! legacy coverage rasterizer that honors per face rendering parameters and
//! TrueType hinting. The accelerated backend is preferred and the legacy one
//! takes over whenever the former reports [`Error::Unsupported`].
//!
//! Fonts are read with [`skrifa`](https://crates.io/crates/skrifa). Layered
//! color glyphs (COLR/CPAL) render each layer in its own color.
//!
//! The usual entry points are [`Services`], which owns the font collection
//! and the shared render target, [`ScaledFont`] for glyph metrics, masks and
//! paths, and [`raster::show_glyphs`] for painting glyphs directly onto a
//! surface.

#![deny(unsafe_code)]

pub mod collection;
pub mod color;
pub mod face;
pub mod fixed;
pub mod glyph_run;
pub mod legacy;
pub mod matrix;
pub mod metrics;
pub mod outline;
pub mod path;
pub mod raster;
pub mod scaled_font;
pub mod services;
pub mod surface;
pub mod table;

mod error;

#[cfg(test)]
mod testing;

pub use collection::{FontCollection, FontSlant, FontWeight, LogFont};
pub use error::Error;
pub use face::{FontFace, FontType, MeasuringMode, RenderingMode, SharedFontData};
pub use legacy::LegacyScaledFont;
pub use matrix::{EngineMatrix, Matrix};
pub use scaled_font::{
    Antialias, FontOptions, Glyph, GlyphInfo, HintStyle, ScaledFont, ScaledFontBackend,
    ScaledGlyph,
};
pub use services::{BackendPreference, RasterConfig, Services};
