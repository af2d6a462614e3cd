//! Scaled fonts over legacy faces, used when printing.

use crate::{
    collection::{LogFont, OutPrecision},
    face::{FontType, RenderingMode},
    matrix::Matrix,
    scaled_font::{FontOptions, GlyphInfo, ScaledFont, ScaledFontBackend, ScaledGlyph},
    services::Services,
    table::name_tables_match,
    Error,
};

/// A scaled font whose face was resolved by the legacy font matcher.
///
/// Glyphs always render with the legacy backend using classic pixel
/// aligned metrics.
#[derive(Clone, Debug)]
pub struct LegacyScaledFont {
    font: ScaledFont,
}

impl LegacyScaledFont {
    /// Resolves `log_font` to a legacy face and scales it.
    ///
    /// Unknown families are silently substituted by the matcher.
    pub fn new(
        services: &Services,
        log_font: &LogFont,
        font_matrix: &Matrix,
        ctm: &Matrix,
        options: FontOptions,
    ) -> Result<Self, Error> {
        let face = services
            .collection()
            .face_from_log_font(log_font, FontType::Legacy)?;
        face.set_rendering_mode(RenderingMode::GdiClassic);
        Ok(Self {
            font: ScaledFont::new(face, font_matrix, ctm, options)?,
        })
    }

    /// Creates the legacy counterpart of an outline scaled font.
    ///
    /// Fails with [`Error::Unsupported`] if `font` isn't an outline font, or
    /// if the matcher picked a different font than the one `font` uses.
    pub fn from_scaled_font(services: &Services, font: &ScaledFont) -> Result<Self, Error> {
        if font.font_type() != FontType::Outline {
            return Err(Error::Unsupported);
        }
        let log_font = LogFont {
            out_precision: OutPrecision::Outline,
            ..font.face().to_log_font()?
        };
        let legacy = Self::new(services, &log_font, font.font_matrix(), font.ctm(), *font.options())
            .map_err(|e| match e {
                Error::FontTypeMismatch => Error::Unsupported,
                e => e,
            })?;
        if !name_tables_match(&legacy, font) {
            log::debug!("legacy matcher substituted a font for {:?}", log_font.face_name);
            return Err(Error::Unsupported);
        }
        Ok(legacy)
    }

    pub fn scaled_font(&self) -> &ScaledFont {
        &self.font
    }
}

impl ScaledFontBackend for LegacyScaledFont {
    fn font_type(&self) -> FontType {
        FontType::Legacy
    }

    fn scaled_glyph_init(
        &self,
        services: &Services,
        glyph: &mut ScaledGlyph,
        info: GlyphInfo,
    ) -> Result<(), Error> {
        self.font.scaled_glyph_init(services, glyph, info)
    }

    fn ucs4_to_index(&self, ucs4: u32) -> u32 {
        self.font.ucs4_to_index(ucs4)
    }

    fn load_truetype_table(
        &self,
        tag: u32,
        offset: usize,
        buffer: Option<&mut [u8]>,
        length: &mut usize,
    ) -> Result<(), Error> {
        self.font.load_truetype_table(tag, offset, buffer, length)
    }

    fn has_color_glyphs(&self) -> bool {
        self.font.has_color_glyphs()
    }
}
