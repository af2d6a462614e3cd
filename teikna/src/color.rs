//! Decomposition of glyph runs into colored layers.

use skrifa::{raw::TableProvider, GlyphId};

use crate::{
    face::MeasuringMode,
    glyph_run::{GlyphOffset, GlyphRun},
    Error,
};

/// Palette index meaning "the text foreground color".
pub const FOREGROUND_PALETTE_INDEX: u16 = 0xFFFF;

/// Straight alpha color with channels in `0.0..=1.0`.
#[derive(Copy, Clone, Default, PartialEq, Debug)]
pub struct ColorF {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorF {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// True if every channel is zero.
    ///
    /// Layers report this for the foreground color, so it can't be told
    /// apart from a fully transparent palette entry.
    pub fn is_zero(&self) -> bool {
        self.r == 0.0 && self.g == 0.0 && self.b == 0.0 && self.a == 0.0
    }

    /// Resolves the zero sentinel to `default`.
    pub fn or_default_color(self, default: ColorF) -> ColorF {
        if self.is_zero() {
            default
        } else {
            self
        }
    }
}

/// One colored layer of a decomposed run.
///
/// Layer runs carry absolute glyph positions in their offsets, so their
/// advances are zero.
#[derive(Clone, Debug)]
pub struct ColorGlyphRun {
    pub run: GlyphRun,
    pub color: ColorF,
    pub palette_index: u16,
}

/// Splits `run` into colored layers.
///
/// Returns `None` when the face has no color tables or none of the glyphs
/// have layers; the run should then be drawn once in the foreground color.
/// Otherwise layers are returned in paint order and glyphs without layers
/// appear as foreground colored runs between them.
pub fn translate_color_glyph_run(
    run: &GlyphRun,
    measuring_mode: MeasuringMode,
) -> Result<Option<Vec<ColorGlyphRun>>, Error> {
    let font = run.face().font_ref()?;
    let (Ok(colr), Ok(cpal)) = (font.colr(), font.cpal()) else {
        return Ok(None);
    };
    let palette_start = cpal
        .color_record_indices()
        .first()
        .map(|ix| ix.get() as usize)
        .unwrap_or_default();
    let records = cpal.color_records_array().transpose()?.unwrap_or_default();
    let entry_count = cpal.num_palette_entries() as usize;
    let palette_color = |palette_index: u16| {
        if palette_index == FOREGROUND_PALETTE_INDEX || palette_index as usize >= entry_count {
            return ColorF::default();
        }
        records
            .get(palette_start + palette_index as usize)
            .map(|rec| ColorF::from_rgba8(rec.red(), rec.green(), rec.blue(), rec.alpha()))
            .unwrap_or_default()
    };
    let mut layers = vec![];
    let mut plain: Option<GlyphRun> = None;
    let mut has_color = false;
    let mut pen = 0.0f32;
    for ((glyph, advance), offset) in run
        .indices()
        .iter()
        .zip(run.advances())
        .zip(run.offsets())
    {
        let position = GlyphOffset::new(pen + offset.advance_offset, offset.ascender_offset);
        let advance = if measuring_mode.is_gdi_compatible() {
            advance.round()
        } else {
            *advance
        };
        pen += advance;
        match colr.v0_base_glyph(GlyphId::new(*glyph))? {
            Some(range) if !range.is_empty() => {
                has_color = true;
                if let Some(plain) = plain.take() {
                    layers.push(ColorGlyphRun {
                        run: plain,
                        color: ColorF::default(),
                        palette_index: FOREGROUND_PALETTE_INDEX,
                    });
                }
                for layer_ix in range {
                    let (layer_glyph, palette_index) = colr.v0_layer(layer_ix)?;
                    let mut layer_run = sub_run(run, 1);
                    layer_run.push(layer_glyph.to_u32(), 0.0, position);
                    layers.push(ColorGlyphRun {
                        run: layer_run,
                        color: palette_color(palette_index),
                        palette_index,
                    });
                }
            }
            _ => plain
                .get_or_insert_with(|| sub_run(run, run.len()))
                .push(*glyph, 0.0, position),
        }
    }
    if !has_color {
        return Ok(None);
    }
    if let Some(plain) = plain {
        layers.push(ColorGlyphRun {
            run: plain,
            color: ColorF::default(),
            palette_index: FOREGROUND_PALETTE_INDEX,
        });
    }
    log::trace!("{} glyphs decomposed into {} layers", run.len(), layers.len());
    Ok(Some(layers))
}

fn sub_run(run: &GlyphRun, capacity: usize) -> GlyphRun {
    let mut sub = GlyphRun::with_capacity(run.face().clone(), run.em_size(), capacity);
    sub.set_sideways(run.is_sideways());
    sub
}
