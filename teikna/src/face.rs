//! Font faces and their rendering state.

use std::{
    borrow::Borrow,
    fmt,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use skrifa::{
    attribute::Style,
    raw::{types::Tag, FileRef, FontRef, TableProvider},
    string::StringId,
    MetadataProvider,
};

use crate::{collection::LogFont, services::Services, Error};

/// Shared, immutable font file bytes.
///
/// Cloning is cheap. The bytes are either owned or memory mapped.
#[derive(Clone)]
pub struct SharedFontData(Arc<dyn AsRef<[u8]> + Send + Sync>);

impl SharedFontData {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        let data: Vec<u8> = data.into();
        Self(Arc::new(data))
    }

    /// Maps the file at `path` into memory.
    #[allow(unsafe_code)]
    pub fn map_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        // SAFETY: font files are treated as read only for the lifetime of the
        // process; a file truncated underneath us is outside of our control.
        let map = unsafe { memmap2::Mmap::map(&file)? };
        Ok(Self(Arc::new(map)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        (*self.0).as_ref()
    }

    /// Number of fonts in the file, or `None` if it isn't a font file.
    pub fn font_count(&self) -> Option<u32> {
        match FileRef::new(self.as_bytes()).ok()? {
            FileRef::Font(_) => Some(1),
            FileRef::Collection(collection) => Some(collection.len()),
        }
    }

    fn same_data(&self, other: &SharedFontData) -> bool {
        std::ptr::eq(self.as_bytes(), other.as_bytes())
    }
}

impl Borrow<[u8]> for SharedFontData {
    fn borrow(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for SharedFontData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedFontData({} bytes)", self.as_bytes().len())
    }
}

/// Backend type tag of a font face.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FontType {
    /// Faces rendered through this crate's outline backends.
    Outline,
    /// Faces resolved by the legacy logical font matcher, used for printing.
    Legacy,
}

/// Rendering mode requested for a face.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RenderingMode {
    #[default]
    Default,
    /// Legacy rasterizer compatible metrics and pixel snapped outlines.
    GdiClassic,
    /// Legacy compatible metrics with fractional glyph boxes.
    GdiNatural,
    /// Native antialiased rendering with ideal metrics.
    Natural,
    /// Bilevel rendering.
    Aliased,
    /// Prefer embedded color layers.
    ColorBitmap,
}

/// How glyph advances and boxes are measured.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeasuringMode {
    #[default]
    Natural,
    GdiClassic,
    GdiNatural,
}

impl MeasuringMode {
    pub fn is_gdi_compatible(self) -> bool {
        self != Self::Natural
    }
}

/// Subpixel layout of the output device.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelGeometry {
    #[default]
    Flat,
    Rgb,
    Bgr,
}

/// Parameters controlling how the legacy raster backend blends coverage.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderingParams {
    /// Exponent applied to color channels before blending.
    pub gamma: f32,
    /// Extra contrast for partially covered pixels, `0.0` disables it.
    pub enhanced_contrast: f32,
    pub clear_type_level: f32,
    pub pixel_geometry: PixelGeometry,
    pub rendering_mode: RenderingMode,
}

impl Default for RenderingParams {
    fn default() -> Self {
        Self {
            gamma: 1.8,
            enhanced_contrast: 0.5,
            clear_type_level: 1.0,
            pixel_geometry: PixelGeometry::Flat,
            rendering_mode: RenderingMode::Default,
        }
    }
}

#[derive(Debug, Default)]
struct RenderState {
    mode: RenderingMode,
    params: Option<Arc<RenderingParams>>,
}

/// A physical outline font plus its mutable rendering state.
pub struct FontFace {
    data: SharedFontData,
    index: u32,
    font_type: FontType,
    state: Mutex<RenderState>,
}

impl FontFace {
    /// Creates an outline face for font `index` of `data`.
    ///
    /// Fails with [`Error::FontTypeMismatch`] if the data doesn't contain a
    /// font at that index.
    pub fn from_data(data: SharedFontData, index: u32) -> Result<Arc<Self>, Error> {
        Self::with_type(data, index, FontType::Outline).map(Arc::new)
    }

    pub(crate) fn with_type(
        data: SharedFontData,
        index: u32,
        font_type: FontType,
    ) -> Result<Self, Error> {
        FontRef::from_index(data.as_bytes(), index).map_err(|_| Error::FontTypeMismatch)?;
        Ok(Self {
            data,
            index,
            font_type,
            state: Default::default(),
        })
    }

    /// Resolves a logical font description through the system collection.
    pub fn from_log_font(services: &Services, log_font: &LogFont) -> Result<Arc<Self>, Error> {
        services
            .collection()
            .face_from_log_font(log_font, FontType::Outline)
    }

    pub fn data(&self) -> &SharedFontData {
        &self.data
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn font_type(&self) -> FontType {
        self.font_type
    }

    pub(crate) fn font_ref(&self) -> Result<FontRef<'_>, Error> {
        FontRef::from_index(self.data.as_bytes(), self.index).map_err(|_| Error::Unsupported)
    }

    /// True if both faces refer to the same font in the same bytes.
    pub fn same_font(&self, other: &FontFace) -> bool {
        self.index == other.index && self.data.same_data(&other.data)
    }

    fn state(&self) -> MutexGuard<'_, RenderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn rendering_mode(&self) -> RenderingMode {
        self.state().mode
    }

    /// Changes the rendering mode.
    ///
    /// Cached rendering parameters are released when the mode actually
    /// changes and recreated on next use.
    pub fn set_rendering_mode(&self, mode: RenderingMode) {
        let mut state = self.state();
        if state.mode == mode {
            return;
        }
        state.mode = mode;
        state.params = None;
    }

    /// Returns the rendering parameters for the current mode, creating them
    /// from the service defaults on first use.
    pub fn rendering_params(&self, services: &Services) -> Arc<RenderingParams> {
        let mut state = self.state();
        let mode = state.mode;
        state
            .params
            .get_or_insert_with(|| {
                let defaults = services.default_rendering_params();
                if mode == RenderingMode::Default {
                    return defaults;
                }
                log::debug!("creating rendering params for {mode:?}");
                Arc::new(RenderingParams {
                    rendering_mode: mode,
                    ..*defaults
                })
            })
            .clone()
    }

    pub fn measuring_mode(&self) -> MeasuringMode {
        match self.rendering_mode() {
            RenderingMode::GdiClassic => MeasuringMode::GdiClassic,
            RenderingMode::GdiNatural => MeasuringMode::GdiNatural,
            _ => MeasuringMode::Natural,
        }
    }

    /// Maps a character to a glyph index, returning 0 if unmapped.
    pub fn glyph_index(&self, ucs4: u32) -> u32 {
        self.font_ref()
            .ok()
            .and_then(|font| font.charmap().map(ucs4))
            .map(|gid| gid.to_u32())
            .unwrap_or_default()
    }

    pub fn glyph_count(&self) -> u32 {
        self.font_ref()
            .and_then(|font| Ok(font.maxp()?.num_glyphs()))
            .map(u32::from)
            .unwrap_or_default()
    }

    pub fn units_per_em(&self) -> u16 {
        self.font_ref()
            .and_then(|font| Ok(font.head()?.units_per_em()))
            .unwrap_or_default()
    }

    /// True if the face carries layered color glyphs.
    pub fn is_color_font(&self) -> bool {
        self.font_ref()
            .map(|font| font.colr().is_ok() && font.cpal().is_ok())
            .unwrap_or_default()
    }

    /// True if the face has glyph outlines rather than only bitmaps.
    pub fn has_outlines(&self) -> bool {
        self.font_ref()
            .map(|font| {
                [Tag::new(b"glyf"), Tag::new(b"CFF "), Tag::new(b"CFF2")]
                    .into_iter()
                    .any(|tag| font.table_data(tag).is_some())
            })
            .unwrap_or_default()
    }

    /// Returns the raw bytes of the table with the given tag.
    pub fn table_data(&self, tag: Tag) -> Option<&[u8]> {
        let font = self.font_ref().ok()?;
        font.table_data(tag).map(|data| data.as_bytes())
    }

    /// Family name, preferring the typographic family.
    pub fn family_name(&self) -> Option<String> {
        let font = self.font_ref().ok()?;
        [StringId::TYPOGRAPHIC_FAMILY_NAME, StringId::FAMILY_NAME]
            .into_iter()
            .find_map(|id| font.localized_strings(id).english_or_first())
            .map(|name| name.to_string())
    }

    /// Builds the logical font description matching this face.
    pub fn to_log_font(&self) -> Result<LogFont, Error> {
        let font = self.font_ref()?;
        let face_name = self.family_name().ok_or(Error::Unsupported)?;
        let attributes = font.attributes();
        Ok(LogFont {
            face_name,
            weight: attributes.weight.value().round() as u16,
            italic: attributes.style != Style::Normal,
            ..Default::default()
        })
    }
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFace")
            .field("data", &self.data)
            .field("index", &self.index)
            .field("font_type", &self.font_type)
            .field("rendering_mode", &self.rendering_mode())
            .finish()
    }
}
