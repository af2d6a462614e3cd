//! Signed area coverage accumulation for the legacy rasterizer.

use kurbo::{BezPath, PathEl, Point};

use crate::Error;

/// Flattening tolerance in pixels.
const TOLERANCE: f64 = 0.05;

/// Accumulates signed area contributions of line segments.
///
/// Each row has two spare cells on the right so segments touching the right
/// edge never spill into the next row.
pub struct Accumulator {
    width: usize,
    height: usize,
    cells: Vec<f32>,
}

impl Accumulator {
    pub fn new(width: usize, height: usize) -> Result<Self, Error> {
        let len = (width + 2)
            .checked_mul(height)
            .ok_or(Error::NoMemory)?;
        let mut cells = Vec::new();
        cells.try_reserve_exact(len)?;
        cells.resize(len, 0.0);
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Adds the closed outline of `path`, flattened to lines.
    pub fn fill(&mut self, path: &BezPath) {
        let mut start = Point::ZERO;
        let mut last = Point::ZERO;
        kurbo::flatten(path, TOLERANCE, |el| match el {
            PathEl::MoveTo(p) => {
                // implicitly close the previous figure
                self.line(last, start);
                start = p;
                last = p;
            }
            PathEl::LineTo(p) => {
                self.line(last, p);
                last = p;
            }
            PathEl::ClosePath => {
                self.line(last, start);
                last = start;
            }
            _ => {}
        });
        self.line(last, start);
    }

    fn line(&mut self, p0: Point, p1: Point) {
        if p0.y == p1.y || !p0.is_finite() || !p1.is_finite() {
            return;
        }
        let (dir, p0, p1) = if p0.y < p1.y {
            (1.0, p0, p1)
        } else {
            (-1.0, p1, p0)
        };
        let (x0, y0, x1, y1) = (p0.x as f32, p0.y as f32, p1.x as f32, p1.y as f32);
        let dxdy = (x1 - x0) / (y1 - y0);
        let width = self.width as f32;
        let stride = self.width + 2;
        let mut x = x0;
        if y0 < 0.0 {
            x -= y0 * dxdy;
        }
        let row_start = y0.max(0.0) as usize;
        let row_end = self.height.min(y1.max(0.0).ceil() as usize);
        for row in row_start..row_end {
            let line = &mut self.cells[row * stride..(row + 1) * stride];
            let dy = ((row + 1) as f32).min(y1) - (row as f32).max(y0);
            let x_next = x + dxdy * dy;
            let d = dy * dir;
            let (a, b) = if x < x_next { (x, x_next) } else { (x_next, x) };
            let (a, b) = (a.clamp(0.0, width), b.clamp(0.0, width));
            let a_floor = a.floor();
            let ai = a_floor as usize;
            let b_ceil = b.ceil();
            let bi = b_ceil as usize;
            if bi <= ai + 1 {
                let xmf = 0.5 * (a + b) - a_floor;
                line[ai] += d - d * xmf;
                line[ai + 1] += d * xmf;
            } else {
                let s = (b - a).recip();
                let af = a - a_floor;
                let a0 = 0.5 * s * (1.0 - af) * (1.0 - af);
                let bf = b - b_ceil + 1.0;
                let am = 0.5 * s * bf * bf;
                line[ai] += d * a0;
                if bi == ai + 2 {
                    line[ai + 1] += d * (1.0 - a0 - am);
                } else {
                    let a1 = s * (1.5 - af);
                    line[ai + 1] += d * (a1 - a0);
                    for cell in &mut line[ai + 2..bi - 1] {
                        *cell += d * s;
                    }
                    let a2 = a1 + (bi - ai - 3) as f32 * s;
                    line[bi - 1] += d * (1.0 - a2 - am);
                }
                line[bi] += d * am;
            }
            x = x_next;
        }
    }

    /// Calls `f` with each row's coverage values in `0.0..=1.0`.
    pub fn for_each_row(&self, mut f: impl FnMut(usize, &[f32])) {
        let stride = self.width + 2;
        let mut row_coverage = vec![0.0; self.width];
        for (y, row) in self.cells.chunks_exact(stride).enumerate() {
            let mut acc = 0.0f32;
            for (out, cell) in row_coverage.iter_mut().zip(row) {
                acc += cell;
                *out = acc.abs().min(1.0);
            }
            f(y, &row_coverage);
        }
    }
}
