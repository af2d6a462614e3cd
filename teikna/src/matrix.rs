//! Affine matrices in the host (column vector) and engine (row vector)
//! conventions.
//!
//! The host describes a transform as
//!
//! ```text
//! x' = xx * x + xy * y + x0
//! y' = yx * x + yy * y + y0
//! ```
//!
//! while the font engine and both render targets multiply row vectors on the
//! left, so the same transform is stored transposed:
//!
//! ```text
//! x' = x * m11 + y * m21 + dx
//! y' = x * m12 + y * m22 + dy
//! ```
//!
//! Every boundary crossing must go through [`EngineMatrix::from_host`] or
//! [`EngineMatrix::to_host`]. A missed transposition shows up as mirrored or
//! skewed glyphs.

/// Affine transform in the host's column vector convention.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matrix {
    pub xx: f64,
    pub yx: f64,
    pub xy: f64,
    pub yy: f64,
    pub x0: f64,
    pub y0: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(xx: f64, yx: f64, xy: f64, yy: f64, x0: f64, y0: f64) -> Self {
        Self {
            xx,
            yx,
            xy,
            yy,
            x0,
            y0,
        }
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Rotation by `radians`, positive angles turning the x axis towards
    /// the y axis.
    pub fn rotate(radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Self::new(c, s, -s, c, 0.0, 0.0)
    }

    /// Returns the transform that applies `a` first and then `b`.
    pub fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
        Matrix {
            xx: a.xx * b.xx + a.yx * b.xy,
            yx: a.xx * b.yx + a.yx * b.yy,
            xy: a.xy * b.xx + a.yy * b.xy,
            yy: a.xy * b.yx + a.yy * b.yy,
            x0: a.x0 * b.xx + a.y0 * b.xy + b.x0,
            y0: a.x0 * b.yx + a.y0 * b.yy + b.y0,
        }
    }

    /// Returns the inverse transform, or `None` if the matrix is singular.
    pub fn invert(&self) -> Option<Matrix> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Matrix {
            xx: self.yy / det,
            yx: -self.yx / det,
            xy: -self.xy / det,
            yy: self.xx / det,
            x0: (self.xy * self.y0 - self.yy * self.x0) / det,
            y0: (self.yx * self.x0 - self.xx * self.y0) / det,
        })
    }

    pub fn determinant(&self) -> f64 {
        self.xx * self.yy - self.yx * self.xy
    }

    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        let (dx, dy) = self.transform_distance(x, y);
        (dx + self.x0, dy + self.y0)
    }

    /// Transforms a vector, ignoring the translation components.
    pub fn transform_distance(&self, dx: f64, dy: f64) -> (f64, f64) {
        (self.xx * dx + self.xy * dy, self.yx * dx + self.yy * dy)
    }

    /// True if the transform has neither shear nor rotation.
    pub fn is_axis_aligned(&self) -> bool {
        self.xy == 0.0 && self.yx == 0.0
    }

    /// Returns a copy with the translation components cleared.
    pub fn without_translation(&self) -> Matrix {
        Matrix {
            x0: 0.0,
            y0: 0.0,
            ..*self
        }
    }

    /// Length of the transformed y axis.
    pub fn y_scale(&self) -> f64 {
        self.xy.hypot(self.yy)
    }
}

/// Affine transform in the engine's row vector convention.
///
/// Mirrors the layout of the engine's matrix type (single precision, row
/// vectors) so values cross the boundary without reinterpretation.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineMatrix {
    pub m11: f32,
    pub m12: f32,
    pub m21: f32,
    pub m22: f32,
    pub dx: f32,
    pub dy: f32,
}

impl Default for EngineMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl EngineMatrix {
    pub const IDENTITY: Self = Self {
        m11: 1.0,
        m12: 0.0,
        m21: 0.0,
        m22: 1.0,
        dx: 0.0,
        dy: 0.0,
    };

    /// Converts a host matrix to the engine convention.
    pub fn from_host(matrix: &Matrix) -> Self {
        Self {
            m11: matrix.xx as f32,
            m12: matrix.yx as f32,
            m21: matrix.xy as f32,
            m22: matrix.yy as f32,
            dx: matrix.x0 as f32,
            dy: matrix.y0 as f32,
        }
    }

    /// Converts back to the host convention.
    ///
    /// Widening to `f64` is exact so `EngineMatrix::from_host(&m.to_host())`
    /// reproduces `m` bit for bit.
    pub fn to_host(&self) -> Matrix {
        Matrix {
            xx: self.m11 as f64,
            yx: self.m12 as f64,
            xy: self.m21 as f64,
            yy: self.m22 as f64,
            x0: self.dx as f64,
            y0: self.dy as f64,
        }
    }

    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.m11 + y * self.m21 + self.dx,
            x * self.m12 + y * self.m22 + self.dy,
        )
    }

    /// Length of the transformed y axis.
    pub fn y_scale(&self) -> f32 {
        self.m21.hypot(self.m22)
    }
}

impl From<EngineMatrix> for tiny_skia::Transform {
    fn from(value: EngineMatrix) -> Self {
        tiny_skia::Transform::from_row(
            value.m11, value.m12, value.m21, value.m22, value.dx, value.dy,
        )
    }
}

impl From<EngineMatrix> for kurbo::Affine {
    fn from(value: EngineMatrix) -> Self {
        kurbo::Affine::new([
            value.m11 as f64,
            value.m12 as f64,
            value.m21 as f64,
            value.m22 as f64,
            value.dx as f64,
            value.dy as f64,
        ])
    }
}
