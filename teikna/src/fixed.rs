//! 24.8 fixed point coordinates used by the host path representation.

/// Number of fractional bits.
pub const FRAC_BITS: u32 = 8;

const ONE: i32 = 1 << FRAC_BITS;

/// Signed 24.8 fixed point value.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Fixed(i32);

impl Fixed {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(ONE);

    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub const fn to_bits(self) -> i32 {
        self.0
    }

    pub const fn from_i32(value: i32) -> Self {
        Self(value << FRAC_BITS)
    }

    /// Converts with round-half-to-even.
    ///
    /// The result only depends on IEEE double arithmetic, never on the
    /// precision mode of a legacy x87 control word, so every call site
    /// rounds identically. Out of range values saturate.
    pub fn from_f64(value: f64) -> Self {
        Self((value * ONE as f64).round_ties_even() as i32)
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / ONE as f64
    }

    /// Largest integer not greater than the value.
    pub const fn floor(self) -> i32 {
        self.0 >> FRAC_BITS
    }

    /// Smallest integer not less than the value.
    pub const fn ceil(self) -> i32 {
        ((self.0 as i64 + ONE as i64 - 1) >> FRAC_BITS) as i32
    }
}

/// A point in fixed point coordinates.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct FixedPoint {
    pub x: Fixed,
    pub y: Fixed,
}

impl FixedPoint {
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    pub fn from_f64(x: f64, y: f64) -> Self {
        Self::new(Fixed::from_f64(x), Fixed::from_f64(y))
    }

    pub fn to_f64(self) -> (f64, f64) {
        (self.x.to_f64(), self.y.to_f64())
    }
}

/// Axis aligned box with `p1` the minimum and `p2` the maximum corner.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct FixedBox {
    pub p1: FixedPoint,
    pub p2: FixedPoint,
}

impl FixedBox {
    pub fn from_f64(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            p1: FixedPoint::from_f64(x1, y1),
            p2: FixedPoint::from_f64(x2, y2),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.p1.x >= self.p2.x || self.p1.y >= self.p2.y
    }

    /// True if any coordinate was clamped to the representable range.
    pub fn is_saturated(&self) -> bool {
        [self.p1.x, self.p1.y, self.p2.x, self.p2.y]
            .iter()
            .any(|v| v.0 == i32::MAX || v.0 == i32::MIN)
    }
}
