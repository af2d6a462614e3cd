//! Image surfaces, colors and paint sources.
//!
//! ARGB32 pixels are stored as premultiplied `0xAARRGGBB` words and A8 pixels
//! as bare coverage bytes.

use std::sync::Arc;

use crate::Error;

/// Pixel format of an [`ImageSurface`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Format {
    A8,
    Argb32,
}

/// Integer rectangle given by origin and size.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct RectangleInt {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl RectangleInt {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
enum Pixels {
    A8(Vec<u8>),
    Argb32(Vec<u32>),
}

/// In-memory raster surface.
#[derive(Clone, PartialEq, Debug)]
pub struct ImageSurface {
    width: i32,
    height: i32,
    pixels: Pixels,
    device_offset: (f64, f64),
}

impl ImageSurface {
    /// Creates a surface cleared to transparent.
    ///
    /// Returns [`Error::NoMemory`] if the pixel buffer can't be allocated.
    pub fn new(format: Format, width: i32, height: i32) -> Result<Self, Error> {
        let width = width.max(0);
        let height = height.max(0);
        let len = (width as usize)
            .checked_mul(height as usize)
            .ok_or(Error::NoMemory)?;
        let pixels = match format {
            Format::A8 => Pixels::A8(zeroed(len)?),
            Format::Argb32 => Pixels::Argb32(zeroed(len)?),
        };
        Ok(Self {
            width,
            height,
            pixels,
            device_offset: (0.0, 0.0),
        })
    }

    pub fn format(&self) -> Format {
        match self.pixels {
            Pixels::A8(_) => Format::A8,
            Pixels::Argb32(_) => Format::Argb32,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn extents(&self) -> RectangleInt {
        RectangleInt::new(0, 0, self.width, self.height)
    }

    /// Sets the offset added to user coordinates before they address pixels.
    pub fn set_device_offset(&mut self, x: f64, y: f64) {
        self.device_offset = (x, y);
    }

    pub fn device_offset(&self) -> (f64, f64) {
        self.device_offset
    }

    /// Premultiplied ARGB pixels, or `None` for an A8 surface.
    pub fn argb_data(&self) -> Option<&[u32]> {
        match &self.pixels {
            Pixels::Argb32(data) => Some(data),
            _ => None,
        }
    }

    pub fn argb_data_mut(&mut self) -> Option<&mut [u32]> {
        match &mut self.pixels {
            Pixels::Argb32(data) => Some(data),
            _ => None,
        }
    }

    /// Coverage bytes, or `None` for an ARGB surface.
    pub fn a8_data(&self) -> Option<&[u8]> {
        match &self.pixels {
            Pixels::A8(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the pixel at `(x, y)` as premultiplied ARGB.
    ///
    /// A8 pixels read as black with the stored alpha. Out of bounds reads are
    /// transparent.
    pub fn pixel(&self, x: i32, y: i32) -> u32 {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return 0;
        }
        let ix = (y * self.width + x) as usize;
        match &self.pixels {
            Pixels::A8(data) => (data[ix] as u32) << 24,
            Pixels::Argb32(data) => data[ix],
        }
    }

    pub fn alpha(&self, x: i32, y: i32) -> u8 {
        (self.pixel(x, y) >> 24) as u8
    }

    fn set_pixel(&mut self, ix: usize, argb: u32) {
        match &mut self.pixels {
            Pixels::A8(data) => data[ix] = (argb >> 24) as u8,
            Pixels::Argb32(data) => data[ix] = argb,
        }
    }

    /// Fills the whole surface with a premultiplied ARGB value.
    pub fn fill(&mut self, argb: u32) {
        match &mut self.pixels {
            Pixels::A8(data) => data.fill((argb >> 24) as u8),
            Pixels::Argb32(data) => data.fill(argb),
        }
    }

    /// True if every pixel is fully transparent.
    pub fn is_clear(&self) -> bool {
        match &self.pixels {
            Pixels::A8(data) => data.iter().all(|a| *a == 0),
            Pixels::Argb32(data) => data.iter().all(|p| *p == 0),
        }
    }

    /// Paints `source` over the whole surface with nearest neighbor
    /// sampling, honoring both surfaces' device offsets.
    pub fn paint(&mut self, op: Operator, source: &ImageSurface) -> Result<(), Error> {
        if !matches!(op, Operator::Clear | Operator::Source | Operator::Over) {
            return Err(Error::Unsupported);
        }
        if op == Operator::Clear {
            self.fill(0);
            return Ok(());
        }
        // pixel (x, y) of self is user point (x - dx, y - dy), which lands on
        // source pixel (ux + sdx, uy + sdy)
        let shift_x = (source.device_offset.0 - self.device_offset.0).round() as i32;
        let shift_y = (source.device_offset.1 - self.device_offset.1).round() as i32;
        for y in 0..self.height {
            for x in 0..self.width {
                let ix = (y * self.width + x) as usize;
                let src = source.pixel(x + shift_x, y + shift_y);
                let out = match op {
                    Operator::Source => src,
                    _ => over(src, self.pixel(x, y)),
                };
                self.set_pixel(ix, out);
            }
        }
        Ok(())
    }
}

fn zeroed<T: Default + Clone>(len: usize) -> Result<Vec<T>, Error> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.resize(len, T::default());
    Ok(buf)
}

/// Premultiplied source over destination.
pub(crate) fn over(src: u32, dst: u32) -> u32 {
    let inv = 255 - (src >> 24);
    let mut out = 0;
    for shift in [0, 8, 16, 24] {
        let s = (src >> shift) & 0xFF;
        let d = (dst >> shift) & 0xFF;
        let v = s + (d * inv + 127) / 255;
        out |= v.min(255) << shift;
    }
    out
}

/// Creates a surface of `format` covering `extents` of `surface`.
///
/// The copy carries a device offset of `-extents.x, -extents.y` so it
/// addresses the same user space as the original.
pub fn clone_image_surface(
    format: Format,
    surface: &ImageSurface,
    extents: &RectangleInt,
) -> Result<ImageSurface, Error> {
    let mut image = ImageSurface::new(format, extents.width, extents.height)?;
    image.set_device_offset(-extents.x as f64, -extents.y as f64);
    image.paint(Operator::Source, surface)?;
    Ok(image)
}

/// Compositing operators understood by the glyph painting entry points.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operator {
    Clear,
    Source,
    Over,
    In,
    Add,
}

/// Non-premultiplied color with both floating point and 16 bit channels.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
    pub red_short: u16,
    pub green_short: u16,
    pub blue_short: u16,
    pub alpha_short: u16,
}

impl Color {
    pub const BLACK: Self = Self {
        red: 0.0,
        green: 0.0,
        blue: 0.0,
        alpha: 1.0,
        red_short: 0,
        green_short: 0,
        blue_short: 0,
        alpha_short: 0xFFFF,
    };

    pub fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        let short = |v: f64| (v.clamp(0.0, 1.0) * 65535.0 + 0.5) as u16;
        Self {
            red,
            green,
            blue,
            alpha,
            red_short: short(red),
            green_short: short(green),
            blue_short: short(blue),
            alpha_short: short(alpha),
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.alpha_short == 0xFFFF
    }
}

/// Source of a paint operation.
#[derive(Clone, PartialEq, Debug)]
pub enum Pattern {
    Solid(Color),
    Surface(Arc<ImageSurface>),
}

impl Pattern {
    /// True for a solid pattern with a fully opaque color.
    pub fn is_opaque_solid(&self) -> bool {
        matches!(self, Self::Solid(color) if color.is_opaque())
    }
}
