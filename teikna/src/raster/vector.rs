//! Accelerated backend: antialiased path filling with tiny-skia.

use std::sync::PoisonError;

use kurbo::{BezPath, PathEl};
use tiny_skia::{FillRule, Paint, Pixmap, Transform};

use super::{
    alloc_pixels, argb_to_rgba, rgba_to_argb, target::Rect, DeviceContext, DrawRequest,
    GlyphRenderer,
};
use crate::{
    color::{translate_color_glyph_run, ColorF},
    glyph_run::GlyphRun,
    matrix::EngineMatrix,
    outline::glyph_run_outline,
    services::Services,
    Error,
};

/// Shared render target of the accelerated backend.
///
/// The target is bound to a region of a device context for the duration of
/// one draw; see [`bind_dc`](Self::bind_dc).
#[derive(Debug)]
pub struct VectorRenderTarget {
    max_dimension: u32,
    transform: Transform,
}

impl VectorRenderTarget {
    /// Checks that the backend can create canvases at all.
    ///
    /// Returns `None` if it can't, which disables the backend.
    pub fn detect(max_dimension: u32) -> Option<Self> {
        Pixmap::new(1, 1)?;
        Some(Self {
            max_dimension,
            transform: Transform::identity(),
        })
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Binds `area` of the device context's surface.
    ///
    /// The current pixels of the region are copied into a scratch canvas and
    /// only written back by [`BoundTarget::end_draw`]. Regions larger than
    /// the maximum dimension, or that don't fit the surface, are
    /// unsupported.
    pub fn bind_dc<'t, 'd, 's>(
        &'t mut self,
        dc: &'d mut DeviceContext<'s>,
        area: Rect,
    ) -> Result<BoundTarget<'t, 'd, 's>, Error> {
        let (width, height) = (area.width(), area.height());
        if width <= 0
            || height <= 0
            || width as u32 > self.max_dimension
            || height as u32 > self.max_dimension
        {
            return Err(Error::Unsupported);
        }
        let mut pixels = alloc_pixels(area)?;
        dc.read_pixels(&area, &mut pixels)?;
        let mut pixmap = Pixmap::new(width as u32, height as u32).ok_or(Error::Unsupported)?;
        let rgba: &mut [[u8; 4]] = bytemuck::cast_slice_mut(pixmap.data_mut());
        for (dst, argb) in rgba.iter_mut().zip(&pixels) {
            *dst = argb_to_rgba(*argb);
        }
        Ok(BoundTarget {
            target: self,
            dc,
            area,
            pixmap,
        })
    }
}

/// A render target bound to a device context region.
///
/// Dropping the binding resets the target transform to identity.
pub struct BoundTarget<'t, 'd, 's> {
    target: &'t mut VectorRenderTarget,
    dc: &'d mut DeviceContext<'s>,
    area: Rect,
    pixmap: Pixmap,
}

impl BoundTarget<'_, '_, '_> {
    pub fn set_transform(&mut self, transform: Option<EngineMatrix>) {
        if let Some(transform) = transform {
            self.target.transform = transform.into();
        }
    }

    /// Fills the outlines of `run` with `color`.
    pub fn draw_glyph_run(
        &mut self,
        run: &GlyphRun,
        color: ColorF,
        anti_alias: bool,
    ) -> Result<(), Error> {
        let mut outline = BezPath::new();
        glyph_run_outline(run, None, &mut outline)?;
        let Some(path) = to_skia_path(&outline) else {
            // nothing to paint, e.g. a run of spaces
            return Ok(());
        };
        let color = tiny_skia::Color::from_rgba(color.r, color.g, color.b, color.a)
            .ok_or(Error::Unsupported)?;
        let mut paint = Paint {
            anti_alias,
            ..Default::default()
        };
        paint.set_color(color);
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, self.target.transform, None);
        Ok(())
    }

    /// Writes the canvas back into the bound region.
    pub fn end_draw(self) -> Result<(), Error> {
        let rgba: &[[u8; 4]] = bytemuck::cast_slice(self.pixmap.data());
        let pixels: Vec<u32> = rgba.iter().map(|px| rgba_to_argb(*px)).collect();
        self.dc.write_pixels(&self.area, &pixels)
    }
}

impl Drop for BoundTarget<'_, '_, '_> {
    fn drop(&mut self) {
        self.target.transform = Transform::identity();
    }
}

fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut builder = tiny_skia::PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => {
                builder.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32)
            }
            PathEl::CurveTo(c0, c1, p) => builder.cubic_to(
                c0.x as f32,
                c0.y as f32,
                c1.x as f32,
                c1.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => builder.close(),
        }
    }
    builder.finish()
}

/// Draws through the shared [`VectorRenderTarget`].
#[derive(Copy, Clone, Default, Debug)]
pub struct VectorRenderer;

impl GlyphRenderer for VectorRenderer {
    fn name(&self) -> &'static str {
        "vector"
    }

    fn draw(
        &self,
        services: &Services,
        dc: &mut DeviceContext,
        request: &DrawRequest,
    ) -> Result<(), Error> {
        let target = services.vector_target().ok_or(Error::Unsupported)?;
        let mut target = target.lock().unwrap_or_else(PoisonError::into_inner);
        let mut bound = target.bind_dc(dc, request.area)?;
        bound.set_transform(request.transform);
        let anti_alias = request.options.anti_alias();
        match translate_color_glyph_run(request.run, request.options.measuring_mode)? {
            Some(layers) => {
                for layer in &layers {
                    let color = layer.color.or_default_color(request.color);
                    bound.draw_glyph_run(&layer.run, color, anti_alias)?;
                }
            }
            None => bound.draw_glyph_run(request.run, request.color, anti_alias)?,
        }
        bound.end_draw()
    }
}
