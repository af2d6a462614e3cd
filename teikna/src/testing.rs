//! Small in-memory fonts used by the unit tests.
//!
//! The fonts are assembled table by table so that every value the tests
//! assert on is visible here.

use std::{
    collections::BTreeMap,
    sync::{Arc, OnceLock},
};

use crate::{
    collection::FontCollection,
    face::{FontFace, SharedFontData},
    services::{RasterConfig, Services},
};

pub const SANS_FAMILY: &str = "Arial";
pub const SANS_UPEM: u16 = 2048;
pub const SANS_ASCENT: i32 = 1854;
pub const SANS_DESCENT: i32 = -434;
pub const SANS_LINE_GAP: i32 = 67;
pub const SANS_MAX_ADVANCE: i32 = 1593;
pub const SANS_A_ADVANCE: i32 = 1366;
pub const SANS_A_BOLD_ADVANCE: i32 = 1479;
pub const SANS_SPACE_ADVANCE: i32 = 569;
pub const SANS_A_BOUNDS: [i32; 4] = [-3, 0, 1369, 1466];
pub const SANS_A_OUTER: [(i32, i32); 8] = [
    (560, 1466),
    (809, 1466),
    (1369, 0),
    (1164, 0),
    (1004, 444),
    (362, 444),
    (203, 0),
    (-3, 0),
];
pub const SANS_A_COUNTER: [(i32, i32); 3] = [(683, 1300), (441, 650), (925, 650)];

pub const COLOR_FAMILY: &str = "Teikna Color";
pub const COLOR_UPEM: u16 = 1000;
/// Two layers: palette entries 0 and 1.
pub const COLOR_SMILE: char = '\u{263A}';
/// Two layers: the foreground color and palette entry 1.
pub const COLOR_STAR: char = '\u{2605}';
/// No layers.
pub const COLOR_PLAIN: char = 'X';
pub const COLOR_ADVANCE_HEIGHT: i32 = 1000;
pub const COLOR_VORG: i32 = 900;
/// Palette entries as `[r, g, b, a]`.
pub const COLOR_PALETTE: [[u8; 4]; 2] = [[255, 0, 0, 255], [0, 0, 255, 255]];
/// Layer glyphs of the smile and star glyphs.
pub const COLOR_LAYER_FACE: u32 = 2;
pub const COLOR_LAYER_EYES: u32 = 3;

const ON: bool = true;
const OFF: bool = false;

type Contour = Vec<(i32, i32, bool)>;

fn on_curve(points: &[(i32, i32)]) -> Contour {
    points.iter().map(|(x, y)| (*x, *y, ON)).collect()
}

fn rect(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Contour {
    on_curve(&[(x_min, y_min), (x_min, y_max), (x_max, y_max), (x_max, y_min)])
}

struct Glyph {
    advance: u16,
    contours: Vec<Contour>,
}

impl Glyph {
    fn empty(advance: u16) -> Self {
        Self {
            advance,
            contours: vec![],
        }
    }

    fn bounds(&self) -> [i16; 4] {
        let mut points = self.contours.iter().flatten();
        let Some(first) = points.next() else {
            return [0; 4];
        };
        let init = [first.0, first.1, first.0, first.1];
        let [x0, y0, x1, y1] = points.fold(init, |[x0, y0, x1, y1], p| {
            [x0.min(p.0), y0.min(p.1), x1.max(p.0), y1.max(p.1)]
        });
        [x0 as i16, y0 as i16, x1 as i16, y1 as i16]
    }
}

/// Buffer of big endian values.
#[derive(Clone, Default, Debug)]
struct BeBuffer(Vec<u8>);

trait BeScalar {
    fn write(self, buf: &mut Vec<u8>);
}

macro_rules! be_scalar {
    ($($ty:ty),*) => {
        $(impl BeScalar for $ty {
            fn write(self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_be_bytes());
            }
        })*
    };
}

be_scalar!(u8, u16, i16, u32, i64);

impl BeBuffer {
    fn push(&mut self, value: impl BeScalar) -> &mut Self {
        value.write(&mut self.0);
        self
    }

    fn extend<T: BeScalar>(&mut self, values: impl IntoIterator<Item = T>) -> &mut Self {
        for value in values {
            value.write(&mut self.0);
        }
        self
    }

    fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.extend_from_slice(bytes);
        self
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn pad4(&mut self) {
        while self.0.len() % 4 != 0 {
            self.0.push(0);
        }
    }

    fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

struct FontSpec {
    family: &'static str,
    subfamily: &'static str,
    weight: u16,
    upem: u16,
    ascent: i16,
    descent: i16,
    line_gap: i16,
    glyphs: Vec<Glyph>,
    cmap: Vec<(u32, u16)>,
}

fn build_font(spec: &FontSpec, extra: BTreeMap<[u8; 4], Vec<u8>>) -> Vec<u8> {
    let mut tables = extra;
    let (glyf, loca) = glyf_loca(&spec.glyphs);
    let bounds = spec.glyphs.iter().map(Glyph::bounds).fold(
        [i16::MAX, i16::MAX, i16::MIN, i16::MIN],
        |[x0, y0, x1, y1], b| [x0.min(b[0]), y0.min(b[1]), x1.max(b[2]), y1.max(b[3])],
    );
    let bold = spec.weight >= 700;
    tables.insert(*b"glyf", glyf);
    tables.insert(*b"loca", loca);
    tables.insert(*b"head", head(spec.upem, bounds, bold));
    tables.insert(*b"hhea", hhea(spec));
    tables.insert(*b"hmtx", hmtx(&spec.glyphs));
    tables.insert(*b"maxp", maxp(spec.glyphs.len() as u16));
    tables.insert(*b"cmap", cmap(&spec.cmap));
    tables.insert(*b"name", name(spec.family, spec.subfamily));
    tables.insert(*b"OS/2", os2(spec, bold));
    sfnt(tables)
}

fn sfnt(tables: BTreeMap<[u8; 4], Vec<u8>>) -> Vec<u8> {
    let num_tables = tables.len() as u16;
    let entry_selector = 15 - num_tables.leading_zeros() as u16;
    let search_range = (1u16 << entry_selector) * 16;
    let mut buf = BeBuffer::default();
    buf.push(0x00010000u32)
        .push(num_tables)
        .push(search_range)
        .push(entry_selector)
        .push(num_tables * 16 - search_range);
    let mut offset = 12 + 16 * tables.len();
    for (tag, data) in &tables {
        let checksum = data.chunks(4).fold(0u32, |sum, chunk| {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            sum.wrapping_add(u32::from_be_bytes(word))
        });
        buf.bytes(tag)
            .push(checksum)
            .push(offset as u32)
            .push(data.len() as u32);
        offset += data.len().next_multiple_of(4);
    }
    for data in tables.values() {
        buf.bytes(data);
        buf.pad4();
    }
    buf.into_inner()
}

fn glyf_loca(glyphs: &[Glyph]) -> (Vec<u8>, Vec<u8>) {
    let mut glyf = BeBuffer::default();
    let mut loca = BeBuffer::default();
    for glyph in glyphs {
        loca.push(glyf.len() as u32);
        if glyph.contours.is_empty() {
            continue;
        }
        glyf.push(glyph.contours.len() as i16)
            .extend(glyph.bounds());
        let mut end = 0u16;
        for contour in &glyph.contours {
            end += contour.len() as u16;
            glyf.push(end - 1);
        }
        // no instructions
        glyf.push(0u16);
        let points: Vec<_> = glyph.contours.iter().flatten().collect();
        glyf.extend(points.iter().map(|p| p.2 as u8));
        let mut last = (0, 0);
        let mut ys = vec![];
        for (x, y, _) in &points {
            glyf.push((x - last.0) as i16);
            ys.push((y - last.1) as i16);
            last = (*x, *y);
        }
        glyf.extend(ys);
        glyf.pad4();
    }
    loca.push(glyf.len() as u32);
    (glyf.into_inner(), loca.into_inner())
}

fn head(upem: u16, bounds: [i16; 4], bold: bool) -> Vec<u8> {
    let mut buf = BeBuffer::default();
    buf.push(1u16)
        .push(0u16)
        .push(0x00010000u32)
        .push(0u32)
        .push(0x5F0F3CF5u32)
        .push(0x000Bu16)
        .push(upem)
        .push(0i64)
        .push(0i64)
        .extend(bounds)
        .push(bold as u16)
        .push(8u16)
        .push(2i16)
        // long loca offsets
        .push(1i16)
        .push(0i16);
    buf.into_inner()
}

fn hhea(spec: &FontSpec) -> Vec<u8> {
    let max_advance = spec.glyphs.iter().map(|g| g.advance).max().unwrap_or_default();
    let mut buf = BeBuffer::default();
    buf.push(1u16)
        .push(0u16)
        .push(spec.ascent)
        .push(spec.descent)
        .push(spec.line_gap)
        .push(max_advance)
        .extend([0i16; 3])
        .push(1i16)
        .push(0i16)
        .extend([0i16; 5])
        .push(0i16)
        .push(spec.glyphs.len() as u16);
    buf.into_inner()
}

fn hmtx(glyphs: &[Glyph]) -> Vec<u8> {
    let mut buf = BeBuffer::default();
    for glyph in glyphs {
        buf.push(glyph.advance).push(glyph.bounds()[0]);
    }
    buf.into_inner()
}

fn maxp(num_glyphs: u16) -> Vec<u8> {
    let mut buf = BeBuffer::default();
    buf.push(0x00005000u32).push(num_glyphs);
    buf.into_inner()
}

/// Format 4 subtable with one segment per mapping.
fn cmap(mappings: &[(u32, u16)]) -> Vec<u8> {
    let mut mappings = mappings.to_vec();
    mappings.sort();
    let seg_count = mappings.len() as u16 + 1;
    let entry_selector = 15 - seg_count.leading_zeros() as u16;
    let search_range = (1u16 << entry_selector) * 2;
    let mut sub = BeBuffer::default();
    sub.push(4u16)
        .push(16 + seg_count * 8)
        .push(0u16)
        .push(seg_count * 2)
        .push(search_range)
        .push(entry_selector)
        .push(seg_count * 2 - search_range);
    sub.extend(mappings.iter().map(|(ch, _)| *ch as u16))
        .push(0xFFFFu16)
        .push(0u16);
    sub.extend(mappings.iter().map(|(ch, _)| *ch as u16))
        .push(0xFFFFu16);
    sub.extend(mappings.iter().map(|(ch, gid)| gid.wrapping_sub(*ch as u16)))
        .push(1u16);
    sub.extend(vec![0u16; seg_count as usize]);
    let mut buf = BeBuffer::default();
    buf.push(0u16)
        .push(1u16)
        .push(3u16)
        .push(1u16)
        .push(12u32)
        .bytes(&sub.into_inner());
    buf.into_inner()
}

fn name(family: &str, subfamily: &str) -> Vec<u8> {
    let strings: Vec<(u16, Vec<u8>)> = [(1, family), (2, subfamily)]
        .into_iter()
        .map(|(id, s)| (id, s.encode_utf16().flat_map(u16::to_be_bytes).collect()))
        .collect();
    let mut buf = BeBuffer::default();
    buf.push(0u16)
        .push(strings.len() as u16)
        .push(6 + 12 * strings.len() as u16);
    let mut offset = 0u16;
    for (id, data) in &strings {
        buf.push(3u16)
            .push(1u16)
            .push(0x0409u16)
            .push(*id)
            .push(data.len() as u16)
            .push(offset);
        offset += data.len() as u16;
    }
    for (_, data) in &strings {
        buf.bytes(data);
    }
    buf.into_inner()
}

fn os2(spec: &FontSpec, bold: bool) -> Vec<u8> {
    let mut buf = BeBuffer::default();
    buf.push(4u16)
        .push(1000i16)
        .push(spec.weight)
        .push(5u16)
        .push(0u16)
        .extend([0i16; 10])
        .push(0i16)
        .extend([0u8; 10])
        .extend([0u32; 4])
        .bytes(b"TKNA")
        // BOLD or REGULAR
        .push(if bold { 0x20u16 } else { 0x40u16 })
        .push(0x20u16)
        .push(0xFFFFu16)
        .push(spec.ascent)
        .push(spec.descent)
        .push(spec.line_gap)
        .push(spec.ascent as u16)
        .push(spec.descent.unsigned_abs())
        .extend([0u32; 2])
        .extend([0i16; 2])
        .extend([0u16; 3]);
    buf.into_inner()
}

fn sans_glyphs(a_advance: u16) -> Vec<Glyph> {
    let o_outer = vec![
        (683, 0, ON),
        (66, 0, OFF),
        (66, 733, ON),
        (66, 1466, OFF),
        (683, 1466, ON),
        (1300, 1466, OFF),
        (1300, 733, ON),
        (1300, 0, OFF),
    ];
    let o_inner = vec![
        (683, 250, ON),
        (1050, 250, OFF),
        (1050, 733, ON),
        (1050, 1216, OFF),
        (683, 1216, ON),
        (316, 1216, OFF),
        (316, 733, ON),
        (316, 250, OFF),
    ];
    vec![
        Glyph {
            advance: 1229,
            contours: vec![rect(100, 0, 1000, 1400)],
        },
        Glyph {
            advance: a_advance,
            contours: vec![on_curve(&SANS_A_OUTER), on_curve(&SANS_A_COUNTER)],
        },
        Glyph::empty(SANS_SPACE_ADVANCE as u16),
        Glyph {
            advance: SANS_MAX_ADVANCE as u16,
            contours: vec![o_outer, o_inner],
        },
    ]
}

fn sans_spec(subfamily: &'static str, weight: u16, a_advance: u16) -> FontSpec {
    FontSpec {
        family: SANS_FAMILY,
        subfamily,
        weight,
        upem: SANS_UPEM,
        ascent: SANS_ASCENT as i16,
        descent: SANS_DESCENT as i16,
        line_gap: SANS_LINE_GAP as i16,
        glyphs: sans_glyphs(a_advance),
        cmap: vec![('A' as u32, 1), (' ' as u32, 2), ('O' as u32, 3)],
    }
}

/// Regular weight of the sans family.
pub fn sans_regular() -> &'static [u8] {
    static FONT: OnceLock<Vec<u8>> = OnceLock::new();
    FONT.get_or_init(|| {
        build_font(&sans_spec("Regular", 400, SANS_A_ADVANCE as u16), Default::default())
    })
}

/// Bold weight of the sans family; same outlines, wider advance for `A`.
pub fn sans_bold() -> &'static [u8] {
    static FONT: OnceLock<Vec<u8>> = OnceLock::new();
    FONT.get_or_init(|| {
        build_font(&sans_spec("Bold", 700, SANS_A_BOLD_ADVANCE as u16), Default::default())
    })
}

/// Layered color font with vertical metrics.
pub fn color_font() -> &'static [u8] {
    static FONT: OnceLock<Vec<u8>> = OnceLock::new();
    FONT.get_or_init(build_color_font)
}

fn build_color_font() -> Vec<u8> {
    let ascent = 880i16;
    let glyphs = vec![
        Glyph::empty(500),
        // smile: the base glyph carries a fallback outline
        Glyph {
            advance: 1000,
            contours: vec![rect(100, 0, 900, 800)],
        },
        Glyph {
            advance: 1000,
            contours: vec![rect(100, 0, 900, 800)],
        },
        Glyph {
            advance: 1000,
            contours: vec![rect(300, 400, 700, 600)],
        },
        Glyph {
            advance: 1000,
            contours: vec![rect(200, 0, 800, 700)],
        },
        // star
        Glyph {
            advance: 1000,
            contours: vec![rect(100, 0, 900, 800)],
        },
    ];
    let mut tables = BTreeMap::new();
    // vhea/vmtx
    let mut vhea = BeBuffer::default();
    vhea.push(0x00011000u32)
        .push(ascent)
        .push(-120i16)
        .push(0i16)
        .push(COLOR_ADVANCE_HEIGHT as u16)
        .extend([0i16; 3])
        .push(0i16)
        .push(1i16)
        .extend([0i16; 5])
        .push(0i16)
        .push(glyphs.len() as u16);
    tables.insert(*b"vhea", vhea.into_inner());
    let mut vmtx = BeBuffer::default();
    for glyph in &glyphs {
        vmtx.push(COLOR_ADVANCE_HEIGHT as u16)
            .push(ascent - glyph.bounds()[3]);
    }
    tables.insert(*b"vmtx", vmtx.into_inner());
    let mut vorg = BeBuffer::default();
    vorg.push(1u16)
        .push(0u16)
        .push(ascent)
        .push(1u16)
        .push(1u16)
        .push(COLOR_VORG as i16);
    tables.insert(*b"VORG", vorg.into_inner());
    // COLR v0: smile = face(0) + eyes(1), star = face(foreground) + eyes(1)
    let base_glyphs: [(u16, u16, u16); 2] = [(1, 0, 2), (5, 2, 2)];
    let layers: [(u16, u16); 4] = [
        (COLOR_LAYER_FACE as u16, 0),
        (COLOR_LAYER_EYES as u16, 1),
        (COLOR_LAYER_FACE as u16, 0xFFFF),
        (COLOR_LAYER_EYES as u16, 1),
    ];
    let mut colr = BeBuffer::default();
    colr.push(0u16)
        .push(base_glyphs.len() as u16)
        .push(14u32)
        .push(14 + 6 * base_glyphs.len() as u32)
        .push(layers.len() as u16);
    for (gid, first, count) in base_glyphs {
        colr.push(gid).push(first).push(count);
    }
    for (gid, palette_index) in layers {
        colr.push(gid).push(palette_index);
    }
    tables.insert(*b"COLR", colr.into_inner());
    let mut cpal = BeBuffer::default();
    cpal.push(0u16)
        .push(COLOR_PALETTE.len() as u16)
        .push(1u16)
        .push(COLOR_PALETTE.len() as u16)
        .push(14u32)
        .push(0u16);
    for [r, g, b, a] in COLOR_PALETTE {
        cpal.extend([b, g, r, a]);
    }
    tables.insert(*b"CPAL", cpal.into_inner());
    let spec = FontSpec {
        family: COLOR_FAMILY,
        subfamily: "Regular",
        weight: 400,
        upem: COLOR_UPEM,
        ascent,
        descent: -120,
        line_gap: 0,
        glyphs,
        cmap: vec![
            (COLOR_PLAIN as u32, 4),
            (COLOR_SMILE as u32, 1),
            (COLOR_STAR as u32, 5),
        ],
    };
    build_font(&spec, tables)
}

/// Collection holding the sans family (regular and bold) and the color
/// family, in that order.
pub fn collection() -> FontCollection {
    let mut collection = FontCollection::new();
    for font in [sans_regular(), sans_bold(), color_font()] {
        collection.add_font_data(SharedFontData::new(font));
    }
    collection
}

pub fn services() -> Services {
    init_logging();
    Services::with_collection(RasterConfig::default(), collection())
}

/// Fresh face over the regular sans font.
pub fn sans_face() -> Arc<FontFace> {
    FontFace::from_data(SharedFontData::new(sans_regular()), 0).unwrap()
}

pub fn color_face() -> Arc<FontFace> {
    FontFace::from_data(SharedFontData::new(color_font()), 0).unwrap()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn fonts_parse() {
    use skrifa::{raw::TableProvider, MetadataProvider};
    for font in [sans_regular(), sans_bold(), color_font()] {
        let font = skrifa::FontRef::new(font).unwrap();
        assert!(font.head().is_ok());
        assert!(font.charmap().map('A' as u32).is_some() || font.colr().is_ok());
    }
}
