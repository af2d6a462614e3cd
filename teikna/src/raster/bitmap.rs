//! Legacy backend: an in-memory bitmap render target with its own
//! coverage rasterizer.

use kurbo::{Affine, BezPath};
use skrifa::{
    outline::{Engine, HintingInstance, HintingOptions, SmoothMode, Target},
    prelude::{LocationRef, Size},
    MetadataProvider,
};

use super::{alloc_pixels, coverage::Accumulator, target::Rect, DeviceContext, DrawOptions};
use super::{DrawRequest, GlyphRenderer};
use crate::{
    color::{translate_color_glyph_run, ColorF},
    face::MeasuringMode,
    glyph_run::GlyphRun,
    matrix::EngineMatrix,
    outline::glyph_run_outline,
    scaled_font::HintStyle,
    services::Services,
    Error,
};

/// Premultiplied ARGB pixels that glyph runs are drawn into.
///
/// Pixels are exchanged with a device context through
/// [`blit_from`](Self::blit_from) and [`blit_to`](Self::blit_to).
#[derive(Clone, Debug)]
pub struct BitmapRenderTarget {
    width: i32,
    height: i32,
    pixels: Vec<u32>,
    pixels_per_dip: f32,
    transform: EngineMatrix,
}

impl BitmapRenderTarget {
    /// Creates a transparent target.
    ///
    /// Empty sizes are unsupported and a failed allocation is
    /// [`Error::NoMemory`].
    pub fn new(width: i32, height: i32) -> Result<Self, Error> {
        if width <= 0 || height <= 0 {
            return Err(Error::Unsupported);
        }
        Ok(Self {
            width,
            height,
            pixels: alloc_pixels(Rect::new(0, 0, width, height))?,
            pixels_per_dip: 1.0,
            transform: EngineMatrix::IDENTITY,
        })
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_per_dip(&self) -> f32 {
        self.pixels_per_dip
    }

    /// Sets the scale from glyph run units to pixels.
    pub fn set_pixels_per_dip(&mut self, pixels_per_dip: f32) {
        self.pixels_per_dip = pixels_per_dip;
    }

    pub fn current_transform(&self) -> EngineMatrix {
        self.transform
    }

    /// Sets the transform applied to subsequent draws, `None` resets it.
    pub fn set_current_transform(&mut self, transform: Option<EngineMatrix>) {
        self.transform = transform.unwrap_or(EngineMatrix::IDENTITY);
    }

    /// Copies `area` of the device context into the target.
    pub fn blit_from(&mut self, dc: &DeviceContext, area: &Rect) -> Result<(), Error> {
        self.check_area(area)?;
        dc.read_pixels(area, &mut self.pixels)
    }

    /// Copies the target into `area` of the device context.
    pub fn blit_to(&self, dc: &mut DeviceContext, area: &Rect) -> Result<(), Error> {
        self.check_area(area)?;
        dc.write_pixels(area, &self.pixels)
    }

    fn check_area(&self, area: &Rect) -> Result<(), Error> {
        if area.width() != self.width || area.height() != self.height {
            return Err(Error::Unsupported);
        }
        Ok(())
    }

    /// Draws `run` in `color`, blending coverage according to the rendering
    /// parameters in `options`. Coverage is scaled by the alpha of `color`.
    pub fn draw_glyph_run(
        &mut self,
        run: &GlyphRun,
        options: &DrawOptions,
        color: ColorF,
    ) -> Result<(), Error> {
        let hinting = self.hinting_instance(run, options);
        let mut outline = BezPath::new();
        glyph_run_outline(run, hinting.as_ref(), &mut outline)?;
        if outline.elements().is_empty() {
            return Ok(());
        }
        let device = Affine::scale(self.pixels_per_dip as f64) * Affine::from(self.transform);
        outline.apply_affine(device);
        let mut coverage = Accumulator::new(self.width as usize, self.height as usize)?;
        coverage.fill(&outline);
        let anti_alias = options.anti_alias();
        let contrast = options.params.enhanced_contrast.max(0.0);
        let gamma = if options.params.gamma > 0.0 {
            options.params.gamma
        } else {
            1.0
        };
        let source = [color.r, color.g, color.b].map(|c| c.clamp(0.0, 1.0).powf(gamma));
        let opacity = color.a.clamp(0.0, 1.0);
        let width = self.width as usize;
        let pixels = &mut self.pixels;
        coverage.for_each_row(|y, row| {
            let line = &mut pixels[y * width..(y + 1) * width];
            for (pixel, c) in line.iter_mut().zip(row) {
                let c = opacity
                    * if anti_alias {
                        enhance_contrast(*c, contrast)
                    } else if *c >= 0.5 {
                        1.0
                    } else {
                        0.0
                    };
                if c > 0.0 {
                    *pixel = blend(*pixel, source, c, gamma);
                }
            }
        });
        Ok(())
    }

    /// Grid fitting applies to untransformed runs measured in a legacy
    /// compatible mode.
    fn hinting_instance(&self, run: &GlyphRun, options: &DrawOptions) -> Option<HintingInstance> {
        if !options.measuring_mode.is_gdi_compatible()
            || options.hint_style == HintStyle::None
            || self.transform != EngineMatrix::IDENTITY
            || self.pixels_per_dip != 1.0
            || run.em_size() <= 0.0
        {
            return None;
        }
        let target = if !options.anti_alias() {
            Target::Mono
        } else {
            Target::Smooth {
                mode: match options.hint_style {
                    HintStyle::Slight => SmoothMode::Light,
                    _ => SmoothMode::Normal,
                },
                symmetric_rendering: options.measuring_mode == MeasuringMode::GdiNatural,
                preserve_linear_metrics: false,
            }
        };
        let font = run.face().font_ref().ok()?;
        HintingInstance::new(
            &font.outline_glyphs(),
            Size::new(run.em_size()),
            LocationRef::default(),
            HintingOptions {
                engine: Engine::AutoFallback,
                target,
            },
        )
        .map_err(|e| log::debug!("drawing unhinted: {e}"))
        .ok()
    }
}

/// Boosts partial coverage; `contrast` of zero leaves it unchanged.
fn enhance_contrast(coverage: f32, contrast: f32) -> f32 {
    coverage * (contrast + 1.0) / (coverage * contrast + 1.0)
}

/// Blends a gamma encoded `source` into a premultiplied pixel. `coverage`
/// already includes the source alpha.
fn blend(dst: u32, source: [f32; 3], coverage: f32, gamma: f32) -> u32 {
    let [a, r, g, b] = dst.to_be_bytes();
    let unit = |v: u8| v as f32 / 255.0;
    let alpha = coverage + unit(a) * (1.0 - coverage);
    let channel = |s: f32, d: u8| {
        let linear = s * coverage + unit(d).powf(gamma) * (1.0 - coverage);
        let v = linear.powf(gamma.recip()).min(alpha);
        (v * 255.0 + 0.5) as u8
    };
    u32::from_be_bytes([
        (alpha * 255.0 + 0.5) as u8,
        channel(source[0], r),
        channel(source[1], g),
        channel(source[2], b),
    ])
}

/// Draws through a fresh [`BitmapRenderTarget`] per request.
#[derive(Copy, Clone, Default, Debug)]
pub struct BitmapRenderer;

impl GlyphRenderer for BitmapRenderer {
    fn name(&self) -> &'static str {
        "bitmap"
    }

    fn draw(
        &self,
        _services: &Services,
        dc: &mut DeviceContext,
        request: &DrawRequest,
    ) -> Result<(), Error> {
        let area = request.area;
        let mut target = BitmapRenderTarget::new(area.width(), area.height())?;
        // always draw in device pixels
        target.set_pixels_per_dip(1.0);
        target.set_current_transform(request.transform);
        target.blit_from(dc, &area)?;
        match translate_color_glyph_run(request.run, request.options.measuring_mode)? {
            Some(layers) => {
                for layer in &layers {
                    let color = layer.color.or_default_color(request.color);
                    target.draw_glyph_run(&layer.run, &request.options, color)?;
                }
            }
            None => target.draw_glyph_run(request.run, &request.options, request.color)?,
        }
        target.blit_to(dc, &area)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        face::{RenderingMode, RenderingParams},
        glyph_run::GlyphOffset,
        raster::tests::{draw_request, sans_run},
        scaled_font::Antialias,
        surface::{Format, ImageSurface},
        testing,
    };

    fn alphas(surface: &ImageSurface) -> Vec<u8> {
        (0..surface.height())
            .flat_map(|y| (0..surface.width()).map(move |x| (x, y)))
            .map(|(x, y)| surface.alpha(x, y))
            .collect()
    }

    #[test]
    fn empty_targets_are_unsupported() {
        assert_eq!(
            BitmapRenderTarget::new(0, 4).unwrap_err(),
            Error::Unsupported
        );
        let target = BitmapRenderTarget::new(3, 2).unwrap();
        assert_eq!(target.pixels(), &[0; 6]);
        assert_eq!(target.current_transform(), EngineMatrix::IDENTITY);
    }

    #[test]
    fn blits_need_matching_regions() {
        let mut surface = ImageSurface::new(Format::Argb32, 4, 4).unwrap();
        surface.fill(0xFF123456);
        let mut dc = DeviceContext::for_surface(&mut surface).unwrap();
        let mut target = BitmapRenderTarget::new(2, 2).unwrap();
        assert_eq!(
            target.blit_from(&dc, &Rect::new(0, 0, 3, 2)),
            Err(Error::Unsupported)
        );
        target.blit_from(&dc, &Rect::new(1, 1, 3, 3)).unwrap();
        assert_eq!(target.pixels(), &[0xFF123456; 4]);
        target.pixels.fill(0);
        target.blit_to(&mut dc, &Rect::new(2, 2, 4, 4)).unwrap();
        assert_eq!(surface.pixel(3, 3), 0);
        assert_eq!(surface.pixel(1, 1), 0xFF123456);
    }

    #[test]
    fn fills_glyph_interiors() {
        // 'A' at 32 pixels on a baseline at y = 32: the crossbar covers rows
        // 22..25 and the counter sits above it
        let run = sans_run('A', 32.0, GlyphOffset::new(0.0, -32.0));
        let mut target = BitmapRenderTarget::new(24, 36).unwrap();
        let options = DrawOptions::default();
        target
            .draw_glyph_run(&run, &options, ColorF::new(0.0, 0.0, 0.0, 1.0))
            .unwrap();
        let at = |x: usize, y: usize| target.pixels()[y * 24 + x];
        assert_eq!(at(10, 23), 0xFF000000);
        // counter
        assert_eq!(at(10, 16), 0);
        // between the legs
        assert_eq!(at(10, 29), 0);
        // right of the glyph
        assert_eq!(at(23, 30), 0);
    }

    #[test]
    fn color_alpha_scales_coverage() {
        let run = sans_run('A', 32.0, GlyphOffset::new(0.0, -32.0));
        let options = DrawOptions::default();
        let mut half = BitmapRenderTarget::new(24, 36).unwrap();
        half.draw_glyph_run(&run, &options, ColorF::new(0.0, 0.0, 0.0, 0.5))
            .unwrap();
        // inside the crossbar
        assert_eq!(half.pixels()[23 * 24 + 10], 0x80000000);
        assert!(half.pixels().iter().all(|p| p.to_be_bytes()[0] <= 0x80));
        let mut clear = BitmapRenderTarget::new(24, 36).unwrap();
        clear
            .draw_glyph_run(&run, &options, ColorF::new(0.0, 0.0, 0.0, 0.0))
            .unwrap();
        assert!(clear.pixels().iter().all(|p| *p == 0));
    }

    #[test]
    fn aliased_rendering_is_bilevel() {
        let run = sans_run('O', 20.0, GlyphOffset::new(1.0, -20.0));
        let mut target = BitmapRenderTarget::new(20, 24).unwrap();
        let options = DrawOptions {
            params: Arc::new(RenderingParams {
                rendering_mode: RenderingMode::Aliased,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(!options.anti_alias());
        target
            .draw_glyph_run(&run, &options, ColorF::new(0.0, 0.0, 0.0, 1.0))
            .unwrap();
        assert!(target.pixels().iter().any(|p| *p != 0));
        assert!(target
            .pixels()
            .iter()
            .all(|p| *p == 0 || *p == 0xFF000000));
        let no_antialias = DrawOptions {
            antialias: Antialias::None,
            ..Default::default()
        };
        assert!(!no_antialias.anti_alias());
    }

    #[test]
    fn contrast_and_gamma() {
        assert_eq!(enhance_contrast(0.5, 0.0), 0.5);
        assert!(enhance_contrast(0.5, 1.0) > 0.5);
        assert_eq!(enhance_contrast(1.0, 1.0), 1.0);
        assert_eq!(enhance_contrast(0.0, 1.0), 0.0);
        // full coverage replaces the pixel regardless of gamma
        let red = [1.0f32, 0.0, 0.0].map(|c| c.powf(1.8));
        assert_eq!(blend(0xFF0000FF, red, 1.0, 1.8), 0xFFFF0000);
        // partial coverage of black on transparent only adds alpha
        assert_eq!(blend(0, [0.0; 3], 0.5, 1.8), 0x80000000);
        // color never exceeds alpha
        let white = blend(0, [1.0; 3], 0.25, 2.2);
        let [a, r, g, b] = white.to_be_bytes();
        assert!(r <= a && g <= a && b <= a);
    }

    #[test]
    fn renderer_matches_target_and_writes_back() {
        let services = testing::services();
        let run = sans_run('A', 20.0, GlyphOffset::new(2.0, -22.0));
        let request = draw_request(&run, Rect::new(10, 10, 34, 34));
        let mut surface = ImageSurface::new(Format::Argb32, 40, 40).unwrap();
        let mut dc = DeviceContext::for_surface(&mut surface).unwrap();
        BitmapRenderer.draw(&services, &mut dc, &request).unwrap();
        let mut target = BitmapRenderTarget::new(24, 24).unwrap();
        target
            .draw_glyph_run(&run, &request.options, request.color)
            .unwrap();
        for y in 0..40 {
            for x in 0..40 {
                let expected = if (10..34).contains(&x) && (10..34).contains(&y) {
                    target.pixels()[((y - 10) * 24 + x - 10) as usize]
                } else {
                    0
                };
                assert_eq!(surface.pixel(x, y), expected, "({x}, {y})");
            }
        }
        assert!(alphas(&surface).iter().any(|a| *a == 0xFF));
    }

    #[test]
    fn transforms_and_hinting() {
        let run = sans_run('A', 1.0, GlyphOffset::new(0.0, -1.0));
        let mut scaled = BitmapRenderTarget::new(24, 36).unwrap();
        scaled.set_current_transform(Some(EngineMatrix {
            m11: 32.0,
            m22: 32.0,
            ..EngineMatrix::IDENTITY
        }));
        let options = DrawOptions::default();
        let black = ColorF::new(0.0, 0.0, 0.0, 1.0);
        scaled.draw_glyph_run(&run, &options, black).unwrap();
        let mut direct = BitmapRenderTarget::new(24, 36).unwrap();
        let run32 = sans_run('A', 32.0, GlyphOffset::new(0.0, -32.0));
        direct.draw_glyph_run(&run32, &options, black).unwrap();
        let differing = scaled
            .pixels()
            .iter()
            .zip(direct.pixels())
            .filter(|(a, b)| a.to_be_bytes()[0].abs_diff(b.to_be_bytes()[0]) > 2)
            .count();
        assert_eq!(differing, 0);
        // legacy measuring never hints transformed runs
        let gdi = DrawOptions {
            measuring_mode: MeasuringMode::GdiClassic,
            ..Default::default()
        };
        assert!(scaled.hinting_instance(&run, &gdi).is_none());
        assert!(direct.hinting_instance(&run32, &options).is_none());
        let unhinted = DrawOptions {
            hint_style: HintStyle::None,
            ..gdi.clone()
        };
        assert!(direct.hinting_instance(&run32, &unhinted).is_none());
    }
}
