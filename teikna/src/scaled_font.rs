//! Faces at a particular size and transform.

use std::{ops::BitOr, sync::Arc};

use crate::{
    color::{translate_color_glyph_run, ColorF},
    face::{FontFace, FontType, MeasuringMode},
    fixed::FixedBox,
    glyph_run::{GlyphOffset, GlyphRun},
    legacy::LegacyScaledFont,
    matrix::{EngineMatrix, Matrix},
    metrics::{
        design_font_metrics, design_glyph_metrics, gdi_compatible_font_metrics,
        gdi_compatible_glyph_metrics, FontExtents, TextExtents,
    },
    outline::record_glyph_run_outline,
    path::{FixedPath, PathBuilder},
    raster::{BitmapRenderer, DeviceContext, DrawOptions, DrawRequest, GlyphRasterizer, Rect},
    services::Services,
    surface::{clone_image_surface, Format, ImageSurface, RectangleInt},
    table, Error,
};

/// Antialiasing requested by the host.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Antialias {
    #[default]
    Default,
    None,
    Gray,
    Subpixel,
}

/// Outline hinting requested by the host.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HintStyle {
    #[default]
    Default,
    None,
    Slight,
    Medium,
    Full,
}

/// Rendering options of a scaled font.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontOptions {
    pub antialias: Antialias,
    pub hint_style: HintStyle,
}

/// A positioned glyph in device space.
#[derive(Copy, Clone, Default, PartialEq, Debug)]
pub struct Glyph {
    pub index: u32,
    pub x: f64,
    pub y: f64,
}

/// Which parts of a [`ScaledGlyph`] to compute.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct GlyphInfo(u8);

impl GlyphInfo {
    pub const METRICS: Self = Self(1);
    pub const SURFACE: Self = Self(1 << 1);
    pub const PATH: Self = Self(1 << 2);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(Self::METRICS.0 | Self::SURFACE.0 | Self::PATH.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for GlyphInfo {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Cached rendering results for one glyph of a scaled font.
#[derive(Clone, Debug)]
pub struct ScaledGlyph {
    index: u32,
    fs_metrics: TextExtents,
    metrics: TextExtents,
    bbox: FixedBox,
    surface: Option<ImageSurface>,
    color_surface: Option<ImageSurface>,
    path: Option<FixedPath>,
    has_info: GlyphInfo,
}

impl ScaledGlyph {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            fs_metrics: Default::default(),
            metrics: Default::default(),
            bbox: Default::default(),
            surface: None,
            color_surface: None,
            path: None,
            has_info: GlyphInfo::empty(),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn has_info(&self) -> GlyphInfo {
        self.has_info
    }

    /// Extents relative to a one unit em.
    pub fn fs_metrics(&self) -> &TextExtents {
        &self.fs_metrics
    }

    /// Extents in user space.
    pub fn metrics(&self) -> &TextExtents {
        &self.metrics
    }

    /// Ink box in device space.
    pub fn bbox(&self) -> FixedBox {
        self.bbox
    }

    /// Coverage mask, positioned by its device offset.
    pub fn surface(&self) -> Option<&ImageSurface> {
        self.surface.as_ref()
    }

    /// Color image, present only for glyphs with color layers.
    pub fn color_surface(&self) -> Option<&ImageSurface> {
        self.color_surface.as_ref()
    }

    /// Outline in device space, without the device translation.
    pub fn path(&self) -> Option<&FixedPath> {
        self.path.as_ref()
    }

    /// Stores font space extents, deriving user and device space values
    /// from `font_matrix` and `scale`.
    pub(crate) fn set_metrics(&mut self, fs: TextExtents, font_matrix: &Matrix, scale: &Matrix) {
        let (min_x, min_y, max_x, max_y) = transformed_box(&fs, font_matrix);
        let (x_advance, y_advance) = font_matrix.transform_distance(fs.x_advance, fs.y_advance);
        self.metrics = TextExtents {
            x_bearing: min_x,
            y_bearing: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
            x_advance,
            y_advance,
        };
        let (min_x, min_y, max_x, max_y) = transformed_box(&fs, scale);
        self.bbox = FixedBox::from_f64(min_x, min_y, max_x, max_y);
        self.fs_metrics = fs;
        self.has_info = self.has_info | GlyphInfo::METRICS;
    }

    pub(crate) fn set_surface(&mut self, mask: ImageSurface, color: Option<ImageSurface>) {
        self.surface = Some(mask);
        self.color_surface = color;
        self.has_info = self.has_info | GlyphInfo::SURFACE;
    }

    pub(crate) fn set_path(&mut self, path: FixedPath) {
        self.path = Some(path);
        self.has_info = self.has_info | GlyphInfo::PATH;
    }
}

/// Bounds of the ink box of `extents` after `matrix`.
fn transformed_box(extents: &TextExtents, matrix: &Matrix) -> (f64, f64, f64, f64) {
    if extents.width == 0.0 || extents.height == 0.0 {
        return Default::default();
    }
    let (x0, y0) = (extents.x_bearing, extents.y_bearing);
    let (x1, y1) = (x0 + extents.width, y0 + extents.height);
    let corners = [(x0, y0), (x1, y0), (x0, y1), (x1, y1)].map(|(x, y)| matrix.transform_distance(x, y));
    corners.iter().fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(min_x, min_y, max_x, max_y), (x, y)| {
            (min_x.min(*x), min_y.min(*y), max_x.max(*x), max_y.max(*y))
        },
    )
}

/// Operations the host invokes on a scaled font, whatever its backend.
pub trait ScaledFontBackend {
    fn font_type(&self) -> FontType;

    /// Computes the requested parts of `glyph`.
    fn scaled_glyph_init(
        &self,
        services: &Services,
        glyph: &mut ScaledGlyph,
        info: GlyphInfo,
    ) -> Result<(), Error>;

    fn ucs4_to_index(&self, ucs4: u32) -> u32;

    /// Reads raw table bytes; see [`table::load_truetype_table`].
    fn load_truetype_table(
        &self,
        tag: u32,
        offset: usize,
        buffer: Option<&mut [u8]>,
        length: &mut usize,
    ) -> Result<(), Error>;

    fn has_color_glyphs(&self) -> bool;
}

/// A face combined with a font matrix and a device transform.
///
/// `mat` maps glyph space (a one unit em) to device space by applying the
/// font matrix and then the CTM; `mat_inverse` is kept exactly in sync.
#[derive(Clone, Debug)]
pub struct ScaledFont {
    face: Arc<FontFace>,
    font_matrix: Matrix,
    ctm: Matrix,
    options: FontOptions,
    mat: Matrix,
    mat_inverse: Matrix,
    extents: FontExtents,
}

impl ScaledFont {
    /// Creates a scaled font; the translation of `ctm` is ignored.
    ///
    /// Fails with [`Error::Unsupported`] if the combined matrix is not
    /// invertible.
    pub fn new(
        face: Arc<FontFace>,
        font_matrix: &Matrix,
        ctm: &Matrix,
        options: FontOptions,
    ) -> Result<Self, Error> {
        let ctm = ctm.without_translation();
        let (mat, mat_inverse, extents) = derive(&face, font_matrix, &ctm)?;
        Ok(Self {
            face,
            font_matrix: *font_matrix,
            ctm,
            options,
            mat,
            mat_inverse,
            extents,
        })
    }

    pub fn face(&self) -> &Arc<FontFace> {
        &self.face
    }

    pub fn font_matrix(&self) -> &Matrix {
        &self.font_matrix
    }

    pub fn ctm(&self) -> &Matrix {
        &self.ctm
    }

    pub fn options(&self) -> &FontOptions {
        &self.options
    }

    pub fn mat(&self) -> &Matrix {
        &self.mat
    }

    pub fn mat_inverse(&self) -> &Matrix {
        &self.mat_inverse
    }

    /// Font extents relative to a one unit em.
    pub fn extents(&self) -> &FontExtents {
        &self.extents
    }

    /// Replaces the font matrix; on failure the font is left unchanged.
    pub fn set_font_matrix(&mut self, font_matrix: &Matrix) -> Result<(), Error> {
        (self.mat, self.mat_inverse, self.extents) = derive(&self.face, font_matrix, &self.ctm)?;
        self.font_matrix = *font_matrix;
        Ok(())
    }

    /// Replaces the CTM, ignoring its translation.
    pub fn set_ctm(&mut self, ctm: &Matrix) -> Result<(), Error> {
        let ctm = ctm.without_translation();
        (self.mat, self.mat_inverse, self.extents) = derive(&self.face, &self.font_matrix, &ctm)?;
        self.ctm = ctm;
        Ok(())
    }

    /// Rasterization options derived from the face and font options.
    pub fn draw_options(&self, services: &Services) -> DrawOptions {
        DrawOptions {
            measuring_mode: self.face.measuring_mode(),
            params: self.face.rendering_params(services),
            antialias: self.options.antialias,
            hint_style: self.options.hint_style,
        }
    }

    /// Legacy faces always render with the legacy backend.
    fn rasterizer<'a>(&self, services: &'a Services) -> GlyphRasterizer<'a> {
        match self.face.font_type() {
            FontType::Outline => GlyphRasterizer::new(services),
            FontType::Legacy => {
                GlyphRasterizer::with_renderers(services, Box::new(BitmapRenderer), None)
            }
        }
    }

    /// Builds the equivalent legacy scaled font used for printing.
    ///
    /// The legacy matcher substitutes fonts silently, so the result is only
    /// returned when both faces carry identical name tables.
    pub fn to_legacy_scaled_font(&self, services: &Services) -> Result<LegacyScaledFont, Error> {
        LegacyScaledFont::from_scaled_font(services, self)
    }

    fn init_glyph_metrics(&self, glyph: &mut ScaledGlyph) -> Result<(), Error> {
        let face = &self.face;
        let metrics = match face.measuring_mode() {
            MeasuringMode::Natural => design_glyph_metrics(face, glyph.index())?,
            mode => gdi_compatible_glyph_metrics(
                face,
                1.0,
                1.0,
                Some(&EngineMatrix::from_host(&self.mat)),
                mode == MeasuringMode::GdiNatural,
                glyph.index(),
            )?,
        };
        let units_per_em = face.units_per_em();
        if units_per_em == 0 {
            return Err(Error::Unsupported);
        }
        let extents = TextExtents::from_glyph_metrics(
            &metrics,
            units_per_em,
            self.options.antialias != Antialias::None,
            self.mat_inverse.xx,
        );
        glyph.set_metrics(extents, &self.font_matrix, &self.mat);
        Ok(())
    }

    fn init_glyph_surface(&self, services: &Services, glyph: &mut ScaledGlyph) -> Result<(), Error> {
        let bbox = glyph.bbox();
        if bbox.is_saturated() {
            return Err(Error::NoMemory);
        }
        let (x1, y1) = (bbox.p1.x.floor(), bbox.p1.y.floor());
        let (x2, y2) = (bbox.p2.x.ceil(), bbox.p2.y.ceil());
        let (width, height) = (x2 - x1, y2 - y1);
        let mut surface = ImageSurface::new(Format::Argb32, width, height)?;
        let mut has_color = false;
        if width > 0 && height > 0 {
            // place the origin at (-x1, -y1) of the surface, in run space
            let (x, y) = self.mat_inverse.transform_point(-x1 as f64, -y1 as f64);
            let mut run = GlyphRun::new(self.face.clone(), 1.0);
            run.push(glyph.index(), 0.0, GlyphOffset::new(x as f32, -y as f32));
            let request = DrawRequest {
                run: &run,
                transform: Some(EngineMatrix::from_host(&self.mat)),
                color: ColorF::new(0.0, 0.0, 0.0, 1.0),
                area: Rect::new(0, 0, width, height),
                options: self.draw_options(services),
            };
            let mut dc = DeviceContext::for_surface(&mut surface)?;
            self.rasterizer(services).draw(&mut dc, &request)?;
            has_color = translate_color_glyph_run(&run, request.options.measuring_mode)?.is_some();
        }
        let extents = RectangleInt::new(0, 0, width, height);
        let clone = |format| -> Result<ImageSurface, Error> {
            let mut image = clone_image_surface(format, &surface, &extents)?;
            image.set_device_offset(-x1 as f64, -y1 as f64);
            Ok(image)
        };
        let mask = clone(Format::A8)?;
        let color = if has_color {
            Some(clone(Format::Argb32)?)
        } else {
            None
        };
        glyph.set_surface(mask, color);
        Ok(())
    }

    fn init_glyph_path(&self, glyph: &mut ScaledGlyph) -> Result<(), Error> {
        let mut run = GlyphRun::new(self.face.clone(), self.font_matrix.yy as f32);
        run.push(glyph.index(), 0.0, GlyphOffset::default());
        let mut path = record_glyph_run_outline(&run)?;
        path.close_path()?;
        path.transform(&self.ctm);
        glyph.set_path(path);
        Ok(())
    }
}

/// Computes `mat`, its inverse and the font extents in the face's
/// measuring regime.
fn derive(
    face: &FontFace,
    font_matrix: &Matrix,
    ctm: &Matrix,
) -> Result<(Matrix, Matrix, FontExtents), Error> {
    let mat = Matrix::multiply(font_matrix, ctm);
    let mat_inverse = mat.invert().ok_or(Error::Unsupported)?;
    let metrics = match face.measuring_mode() {
        MeasuringMode::Natural => design_font_metrics(face)?,
        _ => gdi_compatible_font_metrics(face, 1.0, 1.0, Some(&EngineMatrix::from_host(&mat)))?,
    };
    Ok((mat, mat_inverse, FontExtents::from_metrics(&metrics)))
}

impl ScaledFontBackend for ScaledFont {
    fn font_type(&self) -> FontType {
        self.face.font_type()
    }

    fn scaled_glyph_init(
        &self,
        services: &Services,
        glyph: &mut ScaledGlyph,
        info: GlyphInfo,
    ) -> Result<(), Error> {
        // the surface is sized from the metrics
        if info.contains(GlyphInfo::METRICS)
            || (info.contains(GlyphInfo::SURFACE) && !glyph.has_info().contains(GlyphInfo::METRICS))
        {
            self.init_glyph_metrics(glyph)?;
        }
        if info.contains(GlyphInfo::SURFACE) {
            self.init_glyph_surface(services, glyph)?;
        }
        if info.contains(GlyphInfo::PATH) {
            self.init_glyph_path(glyph)?;
        }
        Ok(())
    }

    fn ucs4_to_index(&self, ucs4: u32) -> u32 {
        self.face.glyph_index(ucs4)
    }

    fn load_truetype_table(
        &self,
        tag: u32,
        offset: usize,
        buffer: Option<&mut [u8]>,
        length: &mut usize,
    ) -> Result<(), Error> {
        table::load_truetype_table(&self.face, tag, offset, buffer, length)
    }

    fn has_color_glyphs(&self) -> bool {
        self.face.is_color_font()
    }
}
