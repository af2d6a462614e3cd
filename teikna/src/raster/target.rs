//! Device contexts that render targets bind to.

use std::ops::{Deref, DerefMut};

use crate::{
    collection::LogFont,
    surface::{Format, ImageSurface, RectangleInt},
    Error,
};

/// Integer rectangle given by its edges, in device pixels.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// Clamps every edge into `0..=width` and `0..=height`.
    pub fn clamp_to(&self, width: i32, height: i32) -> Rect {
        Rect {
            left: self.left.clamp(0, width),
            top: self.top.clamp(0, height),
            right: self.right.clamp(0, width),
            bottom: self.bottom.clamp(0, height),
        }
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }
}

impl From<Rect> for RectangleInt {
    fn from(rect: Rect) -> Self {
        RectangleInt::new(rect.left, rect.top, rect.width(), rect.height())
    }
}

/// Drawing state bound to an ARGB surface, or to the screen.
///
/// A screen context has no pixels and is only used for font selection.
pub struct DeviceContext<'s> {
    surface: Option<&'s mut ImageSurface>,
    font: Option<LogFont>,
}

impl DeviceContext<'static> {
    pub fn screen() -> Self {
        Self {
            surface: None,
            font: None,
        }
    }
}

impl<'s> DeviceContext<'s> {
    /// Creates a context over an ARGB32 surface.
    pub fn for_surface(surface: &'s mut ImageSurface) -> Result<Self, Error> {
        if surface.format() != Format::Argb32 {
            return Err(Error::Unsupported);
        }
        Ok(Self {
            surface: Some(surface),
            font: None,
        })
    }

    pub fn surface(&self) -> Option<&ImageSurface> {
        self.surface.as_deref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut ImageSurface> {
        self.surface.as_deref_mut()
    }

    /// Width and height of the bound surface, zero for the screen.
    pub fn size(&self) -> (i32, i32) {
        self.surface()
            .map(|surface| (surface.width(), surface.height()))
            .unwrap_or_default()
    }

    /// Copies the pixels of `area` out of the bound surface, row by row.
    pub(crate) fn read_pixels(&self, area: &Rect, out: &mut [u32]) -> Result<(), Error> {
        let (surface, width) = self.region(area)?;
        let data = surface.argb_data().ok_or(Error::Unsupported)?;
        for (row, dst) in out.chunks_exact_mut(area.width() as usize).enumerate() {
            let start = (area.top as usize + row) * width + area.left as usize;
            dst.copy_from_slice(&data[start..start + dst.len()]);
        }
        Ok(())
    }

    /// Copies pixels into `area` of the bound surface.
    pub(crate) fn write_pixels(&mut self, area: &Rect, pixels: &[u32]) -> Result<(), Error> {
        let width = self.region(area)?.1;
        let data = self
            .surface_mut()
            .and_then(ImageSurface::argb_data_mut)
            .ok_or(Error::Unsupported)?;
        for (row, src) in pixels.chunks_exact(area.width() as usize).enumerate() {
            let start = (area.top as usize + row) * width + area.left as usize;
            data[start..start + src.len()].copy_from_slice(src);
        }
        Ok(())
    }

    fn region(&self, area: &Rect) -> Result<(&ImageSurface, usize), Error> {
        let surface = self.surface().ok_or(Error::Unsupported)?;
        let bounds = Rect::new(0, 0, surface.width(), surface.height());
        if area.is_empty() || !bounds.contains(area) {
            return Err(Error::Unsupported);
        }
        Ok((surface, surface.width() as usize))
    }

    /// Selects `font` until the returned guard is dropped.
    pub fn select_font(&mut self, font: LogFont) -> FontSelection<'_, 's> {
        let previous = self.font.replace(font);
        FontSelection { dc: self, previous }
    }

    pub fn selected_font(&self) -> Option<&LogFont> {
        self.font.as_ref()
    }
}

/// Scoped font selection; restores the previous font when dropped.
pub struct FontSelection<'a, 's> {
    dc: &'a mut DeviceContext<'s>,
    previous: Option<LogFont>,
}

impl<'s> Deref for FontSelection<'_, 's> {
    type Target = DeviceContext<'s>;

    fn deref(&self) -> &Self::Target {
        self.dc
    }
}

impl DerefMut for FontSelection<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.dc
    }
}

impl Drop for FontSelection<'_, '_> {
    fn drop(&mut self) {
        self.dc.font = self.previous.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{FontSlant, FontWeight};

    #[test]
    fn font_selection_is_restored() {
        let mut dc = DeviceContext::screen();
        let outer = LogFont::new("Outer", FontWeight::Normal, FontSlant::Normal);
        let inner = LogFont::new("Inner", FontWeight::Bold, FontSlant::Italic);
        {
            let mut selection = dc.select_font(outer.clone());
            assert_eq!(selection.selected_font(), Some(&outer));
            {
                let nested = selection.select_font(inner.clone());
                assert_eq!(nested.selected_font(), Some(&inner));
            }
            assert_eq!(selection.selected_font(), Some(&outer));
        }
        assert_eq!(dc.selected_font(), None);
    }

    #[test]
    fn only_argb_surfaces_bind() {
        let mut a8 = ImageSurface::new(Format::A8, 2, 2).unwrap();
        assert!(DeviceContext::for_surface(&mut a8).is_err());
        let mut argb = ImageSurface::new(Format::Argb32, 2, 2).unwrap();
        assert_eq!(DeviceContext::for_surface(&mut argb).unwrap().size(), (2, 2));
    }

    #[test]
    fn pixels_round_trip_through_regions() {
        let mut surface = ImageSurface::new(Format::Argb32, 3, 3).unwrap();
        surface.argb_data_mut().unwrap()[4] = 0xFF00FF00;
        let mut dc = DeviceContext::for_surface(&mut surface).unwrap();
        let area = Rect::new(1, 1, 3, 2);
        let mut pixels = [0; 2];
        dc.read_pixels(&area, &mut pixels).unwrap();
        assert_eq!(pixels, [0xFF00FF00, 0]);
        dc.write_pixels(&area, &[1, 2]).unwrap();
        assert_eq!(surface.argb_data().unwrap(), &[0, 0, 0, 0, 1, 2, 0, 0, 0]);
    }

    #[test]
    fn regions_outside_the_surface_are_rejected() {
        let mut surface = ImageSurface::new(Format::Argb32, 2, 2).unwrap();
        let dc = DeviceContext::for_surface(&mut surface).unwrap();
        let mut pixels = [0; 9];
        assert_eq!(
            dc.read_pixels(&Rect::new(0, 0, 3, 3), &mut pixels),
            Err(Error::Unsupported)
        );
        assert_eq!(
            Rect::new(-5, 1, 10, 12).clamp_to(4, 4),
            Rect::new(0, 1, 4, 4)
        );
    }
}
