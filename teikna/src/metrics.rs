//! Font wide and per glyph metrics.
//!
//! Metrics are produced in font design units in one of two regimes. The
//! design regime reports the ideal outline metrics. The GDI compatible regime
//! reproduces the rounding of the legacy integer rasterizer at the pixel size
//! implied by an em size and a device transform, then reports the result back
//! in design units. At one device pixel per design unit both regimes agree.

use skrifa::{
    prelude::{LocationRef, Size},
    raw::{FontRef, TableProvider},
    GlyphId, MetadataProvider,
};

use crate::{face::FontFace, matrix::EngineMatrix, Error};

/// Font wide metrics in design units.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct FontMetrics {
    pub design_units_per_em: u16,
    pub ascent: f32,
    /// Distance below the baseline, positive downwards.
    pub descent: f32,
    pub line_gap: f32,
    pub max_advance_width: f32,
}

/// Glyph metrics in design units.
#[derive(Copy, Clone, Default, PartialEq, Debug)]
pub struct GlyphMetrics {
    pub left_side_bearing: f32,
    pub advance_width: f32,
    pub right_side_bearing: f32,
    pub top_side_bearing: f32,
    pub advance_height: f32,
    pub bottom_side_bearing: f32,
    pub vertical_origin_y: f32,
}

/// Font extents in user space, relative to a one unit em.
#[derive(Copy, Clone, Default, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontExtents {
    pub ascent: f64,
    pub descent: f64,
    pub height: f64,
    pub max_x_advance: f64,
    pub max_y_advance: f64,
}

impl FontExtents {
    pub fn from_metrics(metrics: &FontMetrics) -> Self {
        let upem = metrics.design_units_per_em as f32;
        Self {
            ascent: (metrics.ascent / upem) as f64,
            descent: (metrics.descent / upem) as f64,
            height: ((metrics.ascent + metrics.descent + metrics.line_gap) / upem) as f64,
            max_x_advance: (metrics.max_advance_width / upem) as f64,
            max_y_advance: 0.0,
        }
    }
}

/// Ink and advance extents of a glyph in user space.
#[derive(Copy, Clone, Default, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextExtents {
    pub x_bearing: f64,
    pub y_bearing: f64,
    pub width: f64,
    pub height: f64,
    pub x_advance: f64,
    pub y_advance: f64,
}

impl TextExtents {
    /// Converts design unit glyph metrics to extents.
    ///
    /// Ideal metrics don't account for pixels touched by antialiasing, so
    /// when `antialias` is set and the glyph has ink, the box grows by one
    /// `inverse_xx` on each side.
    pub fn from_glyph_metrics(
        metrics: &GlyphMetrics,
        units_per_em: u16,
        antialias: bool,
        inverse_xx: f64,
    ) -> Self {
        let upem = units_per_em as f32;
        let mut extents = Self {
            width: ((metrics.advance_width
                - metrics.left_side_bearing
                - metrics.right_side_bearing)
                / upem) as f64,
            height: ((metrics.advance_height
                - metrics.top_side_bearing
                - metrics.bottom_side_bearing)
                / upem) as f64,
            x_advance: (metrics.advance_width / upem) as f64,
            x_bearing: (metrics.left_side_bearing / upem) as f64,
            y_advance: 0.0,
            y_bearing: ((metrics.top_side_bearing - metrics.vertical_origin_y) / upem) as f64,
        };
        if antialias && extents.width > 0.0 && extents.height > 0.0 {
            extents.width += inverse_xx * 2.0;
            extents.x_bearing -= inverse_xx;
        }
        extents
    }
}

/// Returns the design metrics of the face.
pub fn design_font_metrics(face: &FontFace) -> Result<FontMetrics, Error> {
    let font = face.font_ref()?;
    Ok(font_metrics(&font))
}

/// Returns font metrics rounded as the legacy rasterizer would at the pixel
/// size given by `em_size`, `pixels_per_dip` and `transform`.
pub fn gdi_compatible_font_metrics(
    face: &FontFace,
    em_size: f32,
    pixels_per_dip: f32,
    transform: Option<&EngineMatrix>,
) -> Result<FontMetrics, Error> {
    let font = face.font_ref()?;
    let metrics = font_metrics(&font);
    let grid = PixelGrid::new(metrics.design_units_per_em, em_size, pixels_per_dip, transform)?;
    Ok(FontMetrics {
        ascent: grid.round(metrics.ascent),
        descent: grid.round(metrics.descent),
        line_gap: grid.round(metrics.line_gap),
        max_advance_width: grid.round(metrics.max_advance_width),
        ..metrics
    })
}

/// Returns the ideal metrics of a glyph.
pub fn design_glyph_metrics(face: &FontFace, glyph: u32) -> Result<GlyphMetrics, Error> {
    let font = face.font_ref()?;
    let raw = RawGlyph::new(&font, GlyphId::new(glyph))?;
    Ok(raw.metrics())
}

/// Returns glyph metrics rounded as the legacy rasterizer would.
///
/// Advances always snap to whole pixels. Classic mode (`use_gdi_natural`
/// false) additionally snaps the ink box outwards to the pixel grid.
pub fn gdi_compatible_glyph_metrics(
    face: &FontFace,
    em_size: f32,
    pixels_per_dip: f32,
    transform: Option<&EngineMatrix>,
    use_gdi_natural: bool,
    glyph: u32,
) -> Result<GlyphMetrics, Error> {
    let font = face.font_ref()?;
    let upem = font.head()?.units_per_em();
    let grid = PixelGrid::new(upem, em_size, pixels_per_dip, transform)?;
    let raw = RawGlyph::new(&font, GlyphId::new(glyph))?;
    let mut snapped = RawGlyph {
        advance_width: grid.round(raw.advance_width),
        advance_height: grid.round(raw.advance_height),
        vertical_origin_y: grid.round(raw.vertical_origin_y),
        ..raw
    };
    if !use_gdi_natural {
        snapped.x_min = grid.floor(raw.x_min);
        snapped.y_min = grid.floor(raw.y_min);
        snapped.x_max = grid.ceil(raw.x_max);
        snapped.y_max = grid.ceil(raw.y_max);
    }
    // keep the top bearing consistent with the moved origin and box top
    snapped.top_side_bearing = raw.top_side_bearing
        + (snapped.vertical_origin_y - raw.vertical_origin_y)
        - (snapped.y_max - raw.y_max);
    Ok(snapped.metrics())
}

fn font_metrics(font: &FontRef) -> FontMetrics {
    let metrics = font.metrics(Size::unscaled(), LocationRef::default());
    FontMetrics {
        design_units_per_em: metrics.units_per_em,
        ascent: metrics.ascent,
        descent: -metrics.descent,
        line_gap: metrics.leading,
        max_advance_width: metrics.max_width.unwrap_or_default(),
    }
}

/// Conversion between design units and whole device pixels.
struct PixelGrid {
    pixels_per_unit: f32,
}

impl PixelGrid {
    fn new(
        units_per_em: u16,
        em_size: f32,
        pixels_per_dip: f32,
        transform: Option<&EngineMatrix>,
    ) -> Result<Self, Error> {
        let ppem = em_size * pixels_per_dip * transform.map(EngineMatrix::y_scale).unwrap_or(1.0);
        let pixels_per_unit = ppem / units_per_em as f32;
        if !pixels_per_unit.is_finite() || pixels_per_unit <= 0.0 {
            return Err(Error::Unsupported);
        }
        Ok(Self { pixels_per_unit })
    }

    fn snap(&self, value: f32, op: fn(f32) -> f32) -> f32 {
        op(value * self.pixels_per_unit) / self.pixels_per_unit
    }

    fn round(&self, value: f32) -> f32 {
        self.snap(value, f32::round)
    }

    fn floor(&self, value: f32) -> f32 {
        self.snap(value, f32::floor)
    }

    fn ceil(&self, value: f32) -> f32 {
        self.snap(value, f32::ceil)
    }
}

/// Unprocessed glyph geometry in design units.
#[derive(Copy, Clone, Debug)]
struct RawGlyph {
    advance_width: f32,
    x_min: f32,
    x_max: f32,
    y_min: f32,
    y_max: f32,
    advance_height: f32,
    vertical_origin_y: f32,
    top_side_bearing: f32,
}

impl RawGlyph {
    fn new(font: &FontRef, glyph_id: GlyphId) -> Result<Self, Error> {
        let glyph_metrics = font.glyph_metrics(Size::unscaled(), LocationRef::default());
        let advance_width = glyph_metrics
            .advance_width(glyph_id)
            .ok_or(Error::Unsupported)?;
        let (x_min, y_min, x_max, y_max) = match glyph_metrics.bounds(glyph_id) {
            Some(bounds) => (bounds.x_min, bounds.y_min, bounds.x_max, bounds.y_max),
            None => {
                let lsb = glyph_metrics
                    .left_side_bearing(glyph_id)
                    .unwrap_or_default();
                (lsb, 0.0, lsb, 0.0)
            }
        };
        let font_metrics = font_metrics(font);
        let vertical_origin = font
            .vorg()
            .ok()
            .map(|vorg| vorg.vertical_origin_y(glyph_id) as f32);
        let (advance_height, vertical_origin_y, top_side_bearing) =
            match vertical_metrics(font, glyph_id) {
                Some((advance, tsb)) => {
                    (advance, vertical_origin.unwrap_or(tsb + y_max), tsb)
                }
                None => {
                    let origin = vertical_origin.unwrap_or(font_metrics.ascent);
                    (
                        font_metrics.ascent + font_metrics.descent,
                        origin,
                        origin - y_max,
                    )
                }
            };
        Ok(Self {
            advance_width,
            x_min,
            x_max,
            y_min,
            y_max,
            advance_height,
            vertical_origin_y,
            top_side_bearing,
        })
    }

    fn metrics(&self) -> GlyphMetrics {
        GlyphMetrics {
            left_side_bearing: self.x_min,
            advance_width: self.advance_width,
            right_side_bearing: self.advance_width - self.x_max,
            top_side_bearing: self.top_side_bearing,
            advance_height: self.advance_height,
            bottom_side_bearing: self.advance_height
                - self.top_side_bearing
                - (self.y_max - self.y_min),
            vertical_origin_y: self.vertical_origin_y,
        }
    }
}

/// Reads the advance height and top side bearing from vmtx.
fn vertical_metrics(font: &FontRef, glyph_id: GlyphId) -> Option<(f32, f32)> {
    let vmtx = font.vmtx().ok()?;
    let advance = vmtx.advance(glyph_id)?;
    let tsb = vmtx.side_bearing(glyph_id)?;
    Some((advance as f32, tsb as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use pretty_assertions::assert_eq;

    #[test]
    fn design_font_extents() {
        let face = testing::sans_face();
        let metrics = design_font_metrics(&face).unwrap();
        assert_eq!(metrics.design_units_per_em, 2048);
        assert_eq!(metrics.ascent, testing::SANS_ASCENT as f32);
        assert_eq!(metrics.descent, -testing::SANS_DESCENT as f32);
        let extents = FontExtents::from_metrics(&metrics);
        assert_eq!(extents.max_x_advance, (testing::SANS_MAX_ADVANCE as f32 / 2048.0) as f64);
        assert!(extents.height > extents.ascent + extents.descent);
    }

    #[test]
    fn design_glyph_extents() {
        let face = testing::sans_face();
        let gid = face.glyph_index('A' as u32);
        let metrics = design_glyph_metrics(&face, gid).unwrap();
        assert_eq!(metrics.advance_width, testing::SANS_A_ADVANCE as f32);
        let extents = TextExtents::from_glyph_metrics(&metrics, 2048, false, 0.0);
        assert!((extents.x_advance * 12.0 - 0.667 * 12.0).abs() < 0.01);
        let [x_min, y_min, x_max, y_max] = testing::SANS_A_BOUNDS;
        assert_eq!(extents.x_bearing, (x_min as f32 / 2048.0) as f64);
        assert_eq!(extents.width, ((x_max - x_min) as f32 / 2048.0) as f64);
        assert_eq!(extents.height, ((y_max - y_min) as f32 / 2048.0) as f64);
        // no vertical tables: origin at the ascender
        assert_eq!(extents.y_bearing, (-y_max as f32 / 2048.0) as f64);
        assert_eq!(
            metrics.advance_height,
            (testing::SANS_ASCENT - testing::SANS_DESCENT) as f32
        );
    }

    #[test]
    fn antialias_padding() {
        let face = testing::sans_face();
        let metrics = design_glyph_metrics(&face, face.glyph_index('A' as u32)).unwrap();
        let plain = TextExtents::from_glyph_metrics(&metrics, 2048, false, 0.125);
        let padded = TextExtents::from_glyph_metrics(&metrics, 2048, true, 0.125);
        assert_eq!(padded.width, plain.width + 0.25);
        assert_eq!(padded.x_bearing, plain.x_bearing - 0.125);
        assert_eq!(padded.x_advance, plain.x_advance);
        // no ink, no padding
        let space = design_glyph_metrics(&face, face.glyph_index(' ' as u32)).unwrap();
        let space = TextExtents::from_glyph_metrics(&space, 2048, true, 0.125);
        assert_eq!(space.width, 0.0);
    }

    #[test]
    fn regimes_agree_at_unit_scale() {
        let face = testing::sans_face();
        let transform = EngineMatrix {
            m11: 2048.0,
            m22: 2048.0,
            ..EngineMatrix::IDENTITY
        };
        for ch in ['A', 'O', ' '] {
            let gid = face.glyph_index(ch as u32);
            let design = design_glyph_metrics(&face, gid).unwrap();
            for natural in [false, true] {
                let gdi =
                    gdi_compatible_glyph_metrics(&face, 1.0, 1.0, Some(&transform), natural, gid)
                        .unwrap();
                assert_eq!(gdi, design);
            }
        }
        let design = design_font_metrics(&face).unwrap();
        let gdi = gdi_compatible_font_metrics(&face, 1.0, 1.0, Some(&transform)).unwrap();
        assert_eq!(gdi, design);
    }

    #[test]
    fn gdi_rounding_at_small_sizes() {
        let face = testing::sans_face();
        let gid = face.glyph_index('A' as u32);
        let classic = gdi_compatible_glyph_metrics(&face, 12.0, 1.0, None, false, gid).unwrap();
        let natural = gdi_compatible_glyph_metrics(&face, 12.0, 1.0, None, true, gid).unwrap();
        let units_per_pixel = 2048.0 / 12.0;
        // 1366 units is 8.004 pixels
        assert!((classic.advance_width - 8.0 * units_per_pixel).abs() < 1e-3);
        assert_eq!(classic.advance_width, natural.advance_width);
        let design = design_glyph_metrics(&face, gid).unwrap();
        assert_eq!(natural.left_side_bearing, design.left_side_bearing);
        // classic boxes grow outwards to whole pixels
        assert!(classic.left_side_bearing <= design.left_side_bearing);
        let lsb_pixels = classic.left_side_bearing / units_per_pixel;
        assert!((lsb_pixels - lsb_pixels.round()).abs() < 1e-3);
        assert_eq!(
            gdi_compatible_glyph_metrics(&face, 0.0, 1.0, None, false, gid),
            Err(Error::Unsupported)
        );
    }

    #[test]
    fn vertical_tables_are_used() {
        let face = testing::color_face();
        let gid = face.glyph_index(testing::COLOR_SMILE as u32);
        let metrics = design_glyph_metrics(&face, gid).unwrap();
        assert_eq!(metrics.advance_height, testing::COLOR_ADVANCE_HEIGHT as f32);
        assert_eq!(metrics.vertical_origin_y, testing::COLOR_VORG as f32);
        // vmtx top side bearing: ascent 880 less the 800 unit box top
        assert_eq!(metrics.top_side_bearing, 80.0);
        // no vmtx: the advance spans ascent to descent
        let face = testing::sans_face();
        let metrics = design_glyph_metrics(&face, face.glyph_index('A' as u32)).unwrap();
        assert_eq!(
            metrics.advance_height,
            (testing::SANS_ASCENT - testing::SANS_DESCENT) as f32
        );
    }

    #[test]
    fn missing_glyph_is_unsupported() {
        let face = testing::sans_face();
        assert_eq!(
            design_glyph_metrics(&face, 5000).unwrap_err(),
            Error::Unsupported
        );
    }
}
