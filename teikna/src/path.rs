//! Host path representation.

use kurbo::BezPath;

use crate::{
    fixed::{Fixed, FixedBox, FixedPoint},
    matrix::Matrix,
    Error,
};

/// Interface for building a path in fixed point coordinates.
///
/// This is the shape of the host's path API: every operation may fail if the
/// path cannot grow.
pub trait PathBuilder {
    fn move_to(&mut self, x: Fixed, y: Fixed) -> Result<(), Error>;

    fn line_to(&mut self, x: Fixed, y: Fixed) -> Result<(), Error>;

    #[allow(clippy::too_many_arguments)]
    fn curve_to(
        &mut self,
        x1: Fixed,
        y1: Fixed,
        x2: Fixed,
        y2: Fixed,
        x3: Fixed,
        y3: Fixed,
    ) -> Result<(), Error>;

    fn close_path(&mut self) -> Result<(), Error>;
}

/// Single recorded path operation.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PathOp {
    MoveTo(FixedPoint),
    LineTo(FixedPoint),
    CurveTo(FixedPoint, FixedPoint, FixedPoint),
    ClosePath,
}

/// Path that records operations in 24.8 fixed point.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct FixedPath {
    ops: Vec<PathOp>,
    current: Option<FixedPoint>,
    figure_start: Option<FixedPoint>,
}

impl FixedPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[PathOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn current_point(&self) -> Option<FixedPoint> {
        self.current
    }

    fn push(&mut self, op: PathOp) -> Result<(), Error> {
        self.ops.try_reserve(1)?;
        self.ops.push(op);
        Ok(())
    }

    /// Segments following a close start a new figure at the current point.
    fn reopen_after_close(&mut self) -> Result<(), Error> {
        if let (Some(PathOp::ClosePath), Some(p)) = (self.ops.last(), self.current) {
            self.push(PathOp::MoveTo(p))?;
            self.figure_start = Some(p);
        }
        Ok(())
    }

    /// Number of figures (subpaths) in the path.
    pub fn figure_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, PathOp::MoveTo(_)))
            .count()
    }

    /// Number of figures that end where they started, either through an
    /// explicit segment back to the start point or a close operation.
    pub fn closed_figure_count(&self) -> usize {
        #[derive(Default)]
        struct Figure {
            start: Option<FixedPoint>,
            last: Option<FixedPoint>,
            segments: usize,
            closed: bool,
        }
        impl Figure {
            fn is_closed(&self) -> bool {
                self.segments > 0 && (self.closed || self.start == self.last)
            }
        }
        let mut count = 0;
        let mut figure = Figure::default();
        for op in &self.ops {
            match *op {
                PathOp::MoveTo(p) => {
                    count += figure.is_closed() as usize;
                    figure = Figure {
                        start: Some(p),
                        last: Some(p),
                        ..Default::default()
                    };
                }
                PathOp::LineTo(p) | PathOp::CurveTo(_, _, p) => {
                    figure.last = Some(p);
                    figure.segments += 1;
                }
                PathOp::ClosePath => figure.closed = true,
            }
        }
        count + figure.is_closed() as usize
    }

    /// Applies `matrix` to every point, rounding the results back to fixed
    /// point.
    pub fn transform(&mut self, matrix: &Matrix) {
        let map = |p: FixedPoint| {
            let (x, y) = p.to_f64();
            let (x, y) = matrix.transform_point(x, y);
            FixedPoint::from_f64(x, y)
        };
        for op in &mut self.ops {
            *op = match *op {
                PathOp::MoveTo(p) => PathOp::MoveTo(map(p)),
                PathOp::LineTo(p) => PathOp::LineTo(map(p)),
                PathOp::CurveTo(a, b, c) => PathOp::CurveTo(map(a), map(b), map(c)),
                PathOp::ClosePath => PathOp::ClosePath,
            };
        }
        self.current = self.current.map(map);
        self.figure_start = self.figure_start.map(map);
    }

    /// Returns the bounding box of all points, including curve control
    /// points.
    pub fn extents(&self) -> Option<FixedBox> {
        let mut points = self.ops.iter().flat_map(|op| {
            let pts: [Option<FixedPoint>; 3] = match *op {
                PathOp::MoveTo(p) | PathOp::LineTo(p) => [Some(p), None, None],
                PathOp::CurveTo(a, b, c) => [Some(a), Some(b), Some(c)],
                PathOp::ClosePath => [None; 3],
            };
            pts.into_iter().flatten()
        });
        let first = points.next()?;
        let mut extents = FixedBox {
            p1: first,
            p2: first,
        };
        for p in points {
            extents.p1.x = extents.p1.x.min(p.x);
            extents.p1.y = extents.p1.y.min(p.y);
            extents.p2.x = extents.p2.x.max(p.x);
            extents.p2.y = extents.p2.y.max(p.y);
        }
        Some(extents)
    }

    /// Converts to a floating point path.
    pub fn to_bez_path(&self) -> BezPath {
        let pt = |p: FixedPoint| {
            let (x, y) = p.to_f64();
            kurbo::Point::new(x, y)
        };
        let mut path = BezPath::new();
        for op in &self.ops {
            match *op {
                PathOp::MoveTo(p) => path.move_to(pt(p)),
                PathOp::LineTo(p) => path.line_to(pt(p)),
                PathOp::CurveTo(a, b, c) => path.curve_to(pt(a), pt(b), pt(c)),
                PathOp::ClosePath => path.close_path(),
            }
        }
        path
    }
}

impl PathBuilder for FixedPath {
    fn move_to(&mut self, x: Fixed, y: Fixed) -> Result<(), Error> {
        let p = FixedPoint::new(x, y);
        // consecutive moves collapse into one
        if let Some(PathOp::MoveTo(last)) = self.ops.last_mut() {
            *last = p;
        } else {
            self.push(PathOp::MoveTo(p))?;
        }
        self.current = Some(p);
        self.figure_start = Some(p);
        Ok(())
    }

    fn line_to(&mut self, x: Fixed, y: Fixed) -> Result<(), Error> {
        if self.current.is_none() {
            return self.move_to(x, y);
        }
        self.reopen_after_close()?;
        let p = FixedPoint::new(x, y);
        self.push(PathOp::LineTo(p))?;
        self.current = Some(p);
        Ok(())
    }

    fn curve_to(
        &mut self,
        x1: Fixed,
        y1: Fixed,
        x2: Fixed,
        y2: Fixed,
        x3: Fixed,
        y3: Fixed,
    ) -> Result<(), Error> {
        if self.current.is_none() {
            self.move_to(x1, y1)?;
        }
        self.reopen_after_close()?;
        let end = FixedPoint::new(x3, y3);
        self.push(PathOp::CurveTo(
            FixedPoint::new(x1, y1),
            FixedPoint::new(x2, y2),
            end,
        ))?;
        self.current = Some(end);
        Ok(())
    }

    fn close_path(&mut self) -> Result<(), Error> {
        if self.current.is_none() || matches!(self.ops.last(), Some(PathOp::ClosePath)) {
            return Ok(());
        }
        self.push(PathOp::ClosePath)?;
        // the current point returns to the start of the closed figure
        self.current = self.figure_start;
        Ok(())
    }
}
