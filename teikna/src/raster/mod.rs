//! Glyph run rasterization over two interchangeable backends.
//!
//! The accelerated backend ([`VectorRenderer`]) is tried first. When it
//! reports [`Error::Unsupported`] the run is drawn again, exactly once, with
//! the legacy backend ([`BitmapRenderer`]). Neither backend touches the
//! destination until its draw succeeded, so a failed attempt leaves no trace.

mod bitmap;
mod coverage;
mod target;
mod vector;

use std::sync::Arc;

pub use bitmap::{BitmapRenderTarget, BitmapRenderer};
pub use target::{DeviceContext, FontSelection, Rect};
pub use vector::{BoundTarget, VectorRenderTarget, VectorRenderer};

use crate::{
    color::ColorF,
    face::{FontType, MeasuringMode, RenderingMode, RenderingParams},
    glyph_run::{GlyphOffset, GlyphRun},
    matrix::{EngineMatrix, Matrix},
    scaled_font::{Antialias, Glyph, HintStyle, ScaledFont},
    services::{BackendPreference, Services},
    surface::{ImageSurface, Operator, Pattern},
    Error,
};

/// Added to x positions before they are mapped through an inverse
/// transform, so glyphs on exact pixel edges don't round to the left.
const GLYPH_X_EPSILON: f64 = 0.0001;

/// How a run is rasterized, beyond its geometry and color.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct DrawOptions {
    pub measuring_mode: MeasuringMode,
    pub params: Arc<RenderingParams>,
    pub antialias: Antialias,
    pub hint_style: HintStyle,
}

impl DrawOptions {
    /// True unless antialiasing is disabled by the font options or the
    /// rendering mode.
    pub fn anti_alias(&self) -> bool {
        self.antialias != Antialias::None && self.params.rendering_mode != RenderingMode::Aliased
    }
}

/// A single glyph run draw into a region of a device context.
///
/// Glyph positions of `run` are relative to the top left corner of `area`.
/// When `transform` is set it maps run space to that local space.
#[derive(Clone, Debug)]
pub struct DrawRequest<'a> {
    pub run: &'a GlyphRun,
    pub transform: Option<EngineMatrix>,
    pub color: ColorF,
    pub area: Rect,
    pub options: DrawOptions,
}

/// A backend able to draw glyph runs into a device context.
pub trait GlyphRenderer {
    fn name(&self) -> &'static str;

    /// Draws the request.
    ///
    /// Implementations must leave `dc` untouched when they fail.
    fn draw(
        &self,
        services: &Services,
        dc: &mut DeviceContext,
        request: &DrawRequest,
    ) -> Result<(), Error>;
}

/// Draws glyph runs with a primary backend and an optional fallback.
pub struct GlyphRasterizer<'a> {
    services: &'a Services,
    primary: Box<dyn GlyphRenderer>,
    fallback: Option<Box<dyn GlyphRenderer>>,
}

impl<'a> GlyphRasterizer<'a> {
    /// Selects backends according to the services' configuration.
    pub fn new(services: &'a Services) -> Self {
        let vector = Box::new(VectorRenderer) as Box<dyn GlyphRenderer>;
        let bitmap = Box::new(BitmapRenderer) as Box<dyn GlyphRenderer>;
        match services.config().backend {
            BackendPreference::Auto => Self::with_renderers(services, vector, Some(bitmap)),
            BackendPreference::LegacyOnly => Self::with_renderers(services, bitmap, None),
            BackendPreference::AcceleratedOnly => Self::with_renderers(services, vector, None),
        }
    }

    pub fn with_renderers(
        services: &'a Services,
        primary: Box<dyn GlyphRenderer>,
        fallback: Option<Box<dyn GlyphRenderer>>,
    ) -> Self {
        Self {
            services,
            primary,
            fallback,
        }
    }

    /// Draws with the primary backend, retrying once with the fallback if
    /// the primary is unsupported.
    pub fn draw(&self, dc: &mut DeviceContext, request: &DrawRequest) -> Result<(), Error> {
        match self.primary.draw(self.services, dc, request) {
            Err(Error::Unsupported) => {
                let Some(fallback) = &self.fallback else {
                    return Err(Error::Unsupported);
                };
                log::debug!(
                    "{} renderer unsupported, retrying with {}",
                    self.primary.name(),
                    fallback.name()
                );
                fallback.draw(self.services, dc, request)
            }
            result => result,
        }
    }
}

/// Returns the destination region a run of `glyphs` may touch.
///
/// The box of the glyph origins is padded by one em on the top and left and
/// two ems on the bottom and right, then clipped to `extents`. The result is
/// empty when nothing can be visible.
pub fn region_of_interest(glyphs: &[Glyph], font_matrix: &Matrix, extents: (i32, i32)) -> Rect {
    // the largest coordinates start at zero, not at the minimum integer
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (i32::MAX, i32::MAX, 0, 0);
    for glyph in glyphs {
        if glyph.x < min_x as f64 {
            min_x = glyph.x as i32;
        }
        if glyph.x > max_x as f64 {
            max_x = glyph.x as i32;
        }
        if glyph.y < min_y as f64 {
            min_y = glyph.y as i32;
        }
        if glyph.y > max_y as f64 {
            max_y = glyph.y as i32;
        }
    }
    let (width, height) = extents;
    Rect {
        left: (min_x as f64 - font_matrix.xx) as i32,
        top: (min_y as f64 - font_matrix.yy) as i32,
        right: (max_x as f64 + font_matrix.xx * 2.0) as i32,
        bottom: (max_y as f64 + font_matrix.yy * 2.0) as i32,
    }
    .clamp_to(width, height)
}

/// Paints `glyphs` onto an ARGB32 surface.
///
/// Only opaque solid sources with the `Source` or `Over` operators and
/// faces of type [`FontType::Outline`] are handled; everything else is
/// [`Error::Unsupported`] and left to the caller's generic path.
pub fn show_glyphs(
    services: &Services,
    dst: &mut ImageSurface,
    op: Operator,
    source: &Pattern,
    glyphs: &[Glyph],
    scaled_font: &ScaledFont,
) -> Result<(), Error> {
    if scaled_font.face().font_type() != FontType::Outline {
        return Err(Error::Unsupported);
    }
    let Pattern::Solid(color) = source else {
        return Err(Error::Unsupported);
    };
    if !color.is_opaque() || !matches!(op, Operator::Source | Operator::Over) {
        return Err(Error::Unsupported);
    }
    let mut dc = DeviceContext::for_surface(dst)?;
    let font_matrix = scaled_font.font_matrix();
    let area = region_of_interest(glyphs, font_matrix, dc.size());
    if area.is_empty() {
        log::debug!("{} glyphs fall outside the surface", glyphs.len());
        return Ok(());
    }
    let mat = scaled_font.mat();
    let direct = mat.is_axis_aligned() && mat.xx == font_matrix.xx && mat.yy == font_matrix.yy;
    let em_size = if direct { font_matrix.yy as f32 } else { 1.0 };
    let mut run = GlyphRun::with_capacity(scaled_font.face().clone(), em_size, glyphs.len());
    let (left, top) = (area.left as f64, area.top as f64);
    for glyph in glyphs {
        let offset = if direct {
            GlyphOffset::new((glyph.x - left) as f32, (top - glyph.y) as f32)
        } else {
            let (x, y) = scaled_font
                .mat_inverse()
                .transform_point(glyph.x - left + GLYPH_X_EPSILON, glyph.y - top);
            GlyphOffset::new(x as f32, -y as f32)
        };
        run.push(glyph.index, 0.0, offset);
    }
    let channel = |short: u16| (short >> 8) as f32 / 255.0;
    let request = DrawRequest {
        run: &run,
        transform: (!direct).then(|| EngineMatrix::from_host(mat)),
        color: ColorF::new(
            channel(color.red_short),
            channel(color.green_short),
            channel(color.blue_short),
            1.0,
        ),
        area,
        options: scaled_font.draw_options(services),
    };
    GlyphRasterizer::new(services).draw(&mut dc, &request)
}

/// Allocates zeroed pixels for `area`.
pub(crate) fn alloc_pixels(area: Rect) -> Result<Vec<u32>, Error> {
    let len = (area.width().max(0) as usize)
        .checked_mul(area.height().max(0) as usize)
        .ok_or(Error::NoMemory)?;
    let mut pixels = Vec::new();
    pixels.try_reserve_exact(len)?;
    pixels.resize(len, 0);
    Ok(pixels)
}

/// Premultiplied `0xAARRGGBB` to premultiplied RGBA bytes.
pub(crate) fn argb_to_rgba(argb: u32) -> [u8; 4] {
    let [a, r, g, b] = argb.to_be_bytes();
    [r, g, b, a]
}

pub(crate) fn rgba_to_argb([r, g, b, a]: [u8; 4]) -> u32 {
    u32::from_be_bytes([a, r, g, b])
}
