//! Positioned runs of glyphs from a single face.

use std::sync::Arc;

use crate::face::FontFace;

/// Offset of a glyph from its pen position.
///
/// `advance_offset` moves along the advance direction and `ascender_offset`
/// moves towards the ascender, that is, up.
#[derive(Copy, Clone, Default, PartialEq, Debug)]
pub struct GlyphOffset {
    pub advance_offset: f32,
    pub ascender_offset: f32,
}

impl GlyphOffset {
    pub const fn new(advance_offset: f32, ascender_offset: f32) -> Self {
        Self {
            advance_offset,
            ascender_offset,
        }
    }
}

/// Ordered glyphs sharing a face and em size.
///
/// Glyph origins are computed in a y-down space with the run's baseline
/// origin at `(0, 0)`: the pen advances by each glyph's advance and the
/// offset is applied on top of the pen position.
#[derive(Clone, Debug)]
pub struct GlyphRun {
    face: Arc<FontFace>,
    em_size: f32,
    indices: Vec<u32>,
    advances: Vec<f32>,
    offsets: Vec<GlyphOffset>,
    is_sideways: bool,
}

impl GlyphRun {
    pub fn new(face: Arc<FontFace>, em_size: f32) -> Self {
        Self {
            face,
            em_size,
            indices: vec![],
            advances: vec![],
            offsets: vec![],
            is_sideways: false,
        }
    }

    pub fn with_capacity(face: Arc<FontFace>, em_size: f32, capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
            advances: Vec::with_capacity(capacity),
            offsets: Vec::with_capacity(capacity),
            ..Self::new(face, em_size)
        }
    }

    pub fn push(&mut self, glyph: u32, advance: f32, offset: GlyphOffset) {
        self.indices.push(glyph);
        self.advances.push(advance);
        self.offsets.push(offset);
    }

    pub fn set_sideways(&mut self, sideways: bool) {
        self.is_sideways = sideways;
    }

    pub fn face(&self) -> &Arc<FontFace> {
        &self.face
    }

    pub fn em_size(&self) -> f32 {
        self.em_size
    }

    pub fn is_sideways(&self) -> bool {
        self.is_sideways
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn advances(&self) -> &[f32] {
        &self.advances
    }

    pub fn offsets(&self) -> &[GlyphOffset] {
        &self.offsets
    }

    /// Yields each glyph index with its origin.
    pub fn origins(&self) -> impl Iterator<Item = (u32, f32, f32)> + '_ {
        let mut pen = 0.0;
        self.indices
            .iter()
            .zip(&self.advances)
            .zip(&self.offsets)
            .map(move |((glyph, advance), offset)| {
                let origin = (
                    *glyph,
                    pen + offset.advance_offset,
                    -offset.ascender_offset,
                );
                pen += advance;
                origin
            })
    }
}
