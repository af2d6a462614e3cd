//! Glyph run outline extraction.
//!
//! Outlines are delivered to a [`GeometrySink`] as a stream of figures made
//! of batched line and cubic bezier segments, in the y-down space of the
//! glyph run.

use kurbo::BezPath;
use skrifa::{
    outline::{DrawSettings, HintingInstance, OutlinePen},
    prelude::{LocationRef, Size},
    GlyphId, MetadataProvider,
};

use crate::{
    fixed::Fixed,
    glyph_run::GlyphRun,
    path::{FixedPath, PathBuilder},
    Error,
};

#[derive(Copy, Clone, Default, PartialEq, Debug)]
pub struct Point2F {
    pub x: f32,
    pub y: f32,
}

impl Point2F {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Cubic bezier segment starting at the current point.
#[derive(Copy, Clone, Default, PartialEq, Debug)]
pub struct BezierSegment {
    pub point1: Point2F,
    pub point2: Point2F,
    pub point3: Point2F,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FigureBegin {
    Filled,
    Hollow,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FigureEnd {
    Open,
    Closed,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FillMode {
    Alternate,
    Winding,
}

#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub enum SegmentFlags {
    #[default]
    None,
    ForceUnstroked,
    ForceRoundLineJoin,
}

/// Consumer of outline geometry.
pub trait GeometrySink {
    fn set_fill_mode(&mut self, _fill_mode: FillMode) {}

    fn set_segment_flags(&mut self, _flags: SegmentFlags) {}

    fn begin_figure(&mut self, start: Point2F, begin: FigureBegin);

    fn add_lines(&mut self, points: &[Point2F]);

    fn add_beziers(&mut self, beziers: &[BezierSegment]);

    fn end_figure(&mut self, end: FigureEnd);
}

/// Streams the outlines of every glyph in `run` into `sink`.
///
/// Glyphs are scaled to the run's em size and placed at their origins. With
/// a `hinting` instance (which must match the em size) outlines are grid
/// fitted.
pub fn glyph_run_outline<S>(
    run: &GlyphRun,
    hinting: Option<&HintingInstance>,
    sink: &mut S,
) -> Result<(), Error>
where
    S: GeometrySink + ?Sized,
{
    if run.is_sideways() {
        return Err(Error::Unsupported);
    }
    let em_size = run.em_size();
    if em_size == 0.0 || !em_size.is_finite() {
        return Err(Error::Unsupported);
    }
    let font = run.face().font_ref()?;
    let outlines = font.outline_glyphs();
    sink.set_fill_mode(FillMode::Winding);
    sink.set_segment_flags(SegmentFlags::None);
    let mut pen = SinkPen {
        sink,
        origin: Point2F::default(),
        scale: em_size.signum(),
        current: Point2F::default(),
        figure_open: false,
        lines: vec![],
        beziers: vec![],
    };
    for (glyph, x, y) in run.origins() {
        let glyph_id = GlyphId::new(glyph);
        let outline = outlines
            .get(glyph_id)
            .ok_or(skrifa::outline::DrawError::GlyphNotFound(glyph_id))?;
        let settings = match hinting {
            Some(instance) => DrawSettings::hinted(instance, false),
            None => DrawSettings::unhinted(Size::new(em_size.abs()), LocationRef::default()),
        };
        pen.origin = Point2F::new(x, y);
        outline.draw(settings, &mut pen)?;
        pen.end_figure(FigureEnd::Open);
    }
    Ok(())
}

/// Adapts the engine's pen callbacks to batched sink calls.
struct SinkPen<'a, S: ?Sized> {
    sink: &'a mut S,
    origin: Point2F,
    /// Sign of the em size; negative sizes mirror the outline.
    scale: f32,
    current: Point2F,
    figure_open: bool,
    lines: Vec<Point2F>,
    beziers: Vec<BezierSegment>,
}

impl<S: GeometrySink + ?Sized> SinkPen<'_, S> {
    fn map(&self, x: f32, y: f32) -> Point2F {
        Point2F::new(
            self.origin.x + x * self.scale,
            self.origin.y - y * self.scale,
        )
    }

    fn flush(&mut self) {
        if !self.lines.is_empty() {
            self.sink.add_lines(&self.lines);
            self.lines.clear();
        }
        if !self.beziers.is_empty() {
            self.sink.add_beziers(&self.beziers);
            self.beziers.clear();
        }
    }

    fn end_figure(&mut self, end: FigureEnd) {
        if self.figure_open {
            self.flush();
            self.sink.end_figure(end);
            self.figure_open = false;
        }
    }
}

impl<S: GeometrySink + ?Sized> OutlinePen for SinkPen<'_, S> {
    fn move_to(&mut self, x: f32, y: f32) {
        self.end_figure(FigureEnd::Open);
        let p = self.map(x, y);
        self.sink.begin_figure(p, FigureBegin::Filled);
        self.figure_open = true;
        self.current = p;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        if !self.beziers.is_empty() {
            self.flush();
        }
        let p = self.map(x, y);
        self.lines.push(p);
        self.current = p;
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        let p0 = self.current;
        let q = self.map(cx0, cy0);
        let p = self.map(x, y);
        let c1 = Point2F::new(
            p0.x + (q.x - p0.x) * (2.0 / 3.0),
            p0.y + (q.y - p0.y) * (2.0 / 3.0),
        );
        let c2 = Point2F::new(
            p.x + (q.x - p.x) * (2.0 / 3.0),
            p.y + (q.y - p.y) * (2.0 / 3.0),
        );
        self.push_bezier(c1, c2, p);
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        let c1 = self.map(cx0, cy0);
        let c2 = self.map(cx1, cy1);
        let p = self.map(x, y);
        self.push_bezier(c1, c2, p);
    }

    fn close(&mut self) {
        self.end_figure(FigureEnd::Closed);
    }
}

impl<S: GeometrySink + ?Sized> SinkPen<'_, S> {
    fn push_bezier(&mut self, point1: Point2F, point2: Point2F, point3: Point2F) {
        if !self.lines.is_empty() {
            self.flush();
        }
        self.beziers.push(BezierSegment {
            point1,
            point2,
            point3,
        });
        self.current = point3;
    }
}

/// Records sink geometry into a host path.
///
/// Closed figures are materialized as a line back to the figure's start
/// point. Path errors are latched and reported by [`finish`](Self::finish).
pub struct GeometryRecorder<'a, P: PathBuilder + ?Sized> {
    path: &'a mut P,
    start: Point2F,
    status: Result<(), Error>,
}

impl<'a, P: PathBuilder + ?Sized> GeometryRecorder<'a, P> {
    pub fn new(path: &'a mut P) -> Self {
        Self {
            path,
            start: Point2F::default(),
            status: Ok(()),
        }
    }

    pub fn finish(self) -> Result<(), Error> {
        self.status
    }

    fn record(&mut self, op: impl FnOnce(&mut P) -> Result<(), Error>) {
        if self.status.is_ok() {
            self.status = op(self.path);
        }
    }
}

fn fixed(p: Point2F) -> (Fixed, Fixed) {
    (Fixed::from_f64(p.x as f64), Fixed::from_f64(p.y as f64))
}

impl<P: PathBuilder + ?Sized> GeometrySink for GeometryRecorder<'_, P> {
    fn begin_figure(&mut self, start: Point2F, _begin: FigureBegin) {
        self.start = start;
        let (x, y) = fixed(start);
        self.record(|path| path.move_to(x, y));
    }

    fn add_lines(&mut self, points: &[Point2F]) {
        for p in points {
            let (x, y) = fixed(*p);
            self.record(|path| path.line_to(x, y));
        }
    }

    fn add_beziers(&mut self, beziers: &[BezierSegment]) {
        for bezier in beziers {
            let (x1, y1) = fixed(bezier.point1);
            let (x2, y2) = fixed(bezier.point2);
            let (x3, y3) = fixed(bezier.point3);
            self.record(|path| path.curve_to(x1, y1, x2, y2, x3, y3));
        }
    }

    fn end_figure(&mut self, end: FigureEnd) {
        if end == FigureEnd::Closed {
            let (x, y) = fixed(self.start);
            self.record(|path| path.line_to(x, y));
        }
    }
}

impl GeometrySink for BezPath {
    fn begin_figure(&mut self, start: Point2F, _begin: FigureBegin) {
        self.move_to((start.x as f64, start.y as f64));
    }

    fn add_lines(&mut self, points: &[Point2F]) {
        for p in points {
            self.line_to((p.x as f64, p.y as f64));
        }
    }

    fn add_beziers(&mut self, beziers: &[BezierSegment]) {
        for b in beziers {
            self.curve_to(
                (b.point1.x as f64, b.point1.y as f64),
                (b.point2.x as f64, b.point2.y as f64),
                (b.point3.x as f64, b.point3.y as f64),
            );
        }
    }

    fn end_figure(&mut self, end: FigureEnd) {
        if end == FigureEnd::Closed {
            self.close_path();
        }
    }
}

/// Records the outline of a run into a new fixed point path.
pub fn record_glyph_run_outline(run: &GlyphRun) -> Result<FixedPath, Error> {
    let mut path = FixedPath::new();
    let mut recorder = GeometryRecorder::new(&mut path);
    glyph_run_outline(run, None, &mut recorder)?;
    recorder.finish()?;
    Ok(path)
}
