//! 26.6 fixed-point numbers.
//!
//! Layout and rendering measure distances in device pixels with 6 fractional
//! bits, the same unit glyph metrics are reported in.

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

const SHIFT: u32 = 6;
const ONE: i32 = 1 << SHIFT;
const FRACTION_MASK: i32 = ONE - 1;

/// A signed 26.6 fixed-point number.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed(i32);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);

    /// Wrap a raw 26.6 value.
    pub const fn from_bits(bits: i32) -> Self {
        Fixed(bits)
    }

    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Whole number of pixels.
    pub const fn from_int(i: i32) -> Self {
        Fixed(i << SHIFT)
    }

    /// Convert from floating point, rounding toward negative infinity.
    pub fn from_f64(f: f64) -> Self {
        Fixed((f * ONE as f64).floor() as i32)
    }

    pub fn from_f32(f: f32) -> Self {
        Self::from_f64(f as f64)
    }

    pub fn to_f64(self) -> f64 {
        (self.0 >> SHIFT) as f64 + (self.0 & FRACTION_MASK) as f64 / ONE as f64
    }

    /// Smallest whole pixel count not less than this value.
    pub const fn ceil(self) -> i32 {
        (self.0 + FRACTION_MASK) >> SHIFT
    }

    /// Largest whole pixel count not greater than this value.
    pub const fn floor(self) -> i32 {
        self.0 >> SHIFT
    }

    /// Nearest whole pixel count, halves rounding up.
    pub const fn round(self) -> i32 {
        (self.0 + ONE / 2) >> SHIFT
    }
}

impl Add for Fixed {
    type Output = Fixed;

    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 + rhs.0)
    }
}

impl AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Fixed) {
        self.0 += rhs.0;
    }
}

impl Sub for Fixed {
    type Output = Fixed;

    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 - rhs.0)
    }
}

impl SubAssign for Fixed {
    fn sub_assign(&mut self, rhs: Fixed) {
        self.0 -= rhs.0;
    }
}

impl Neg for Fixed {
    type Output = Fixed;

    fn neg(self) -> Fixed {
        Fixed(-self.0)
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.0 >> SHIFT, self.0 & FRACTION_MASK)
    }
}

/// Convert typographic points (1/72 inch) to whole device pixels, rounding up.
pub fn points_to_pixels(points: f64, dpi: f64) -> i32 {
    (points / 72.0 * dpi).ceil() as i32
}

/// Convert points to a whole-pixel fixed-point distance.
pub fn points_to_fixed(points: f64, dpi: f64) -> Fixed {
    Fixed::from_int(points_to_pixels(points, dpi))
}

/// Convert a fixed-point pixel distance back to points.
pub fn fixed_to_points(f: Fixed, dpi: f64) -> f64 {
    f.to_f64() / dpi * 72.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_pixels() {
        let f = Fixed::from_int(3);
        assert_eq!(f.to_bits(), 192);
        assert_eq!(f.ceil(), 3);
        assert_eq!(f.floor(), 3);
        assert_eq!(f.to_f64(), 3.0);
    }

    #[test]
    fn conversion_floors_toward_negative_infinity() {
        assert_eq!(Fixed::from_f64(1.5).to_bits(), 96);
        // 1/128 is below the resolution of a 26.6 value
        assert_eq!(Fixed::from_f64(1.0 / 128.0).to_bits(), 0);
        assert_eq!(Fixed::from_f64(-1.0 / 128.0).to_bits(), -1);
        assert_eq!(Fixed::from_f64(-0.5).to_bits(), -32);
    }

    #[test]
    fn ceil_and_floor_of_fractions() {
        let f = Fixed::from_bits(65);
        assert_eq!(f.ceil(), 2);
        assert_eq!(f.floor(), 1);
        assert_eq!(f.round(), 1);
        assert_eq!(Fixed::from_bits(96).round(), 2);
        let neg = Fixed::from_bits(-65);
        assert_eq!(neg.ceil(), -1);
        assert_eq!(neg.floor(), -2);
        assert_eq!(neg.round(), -1);
        assert_eq!(neg.to_f64(), -65.0 / 64.0);
    }

    #[test]
    fn points_round_up_to_pixels() {
        assert_eq!(points_to_pixels(4.5, 72.0), 5);
        assert_eq!(points_to_pixels(4.5, 203.2), 13);
        assert_eq!(points_to_pixels(72.0, 203.2), 204);
        assert_eq!(points_to_fixed(9.0, 72.0), Fixed::from_int(9));
        assert_eq!(fixed_to_points(Fixed::from_int(144), 144.0), 72.0);
    }

    #[test]
    fn arithmetic() {
        let mut a = Fixed::from_int(2);
        a += Fixed::from_bits(16);
        a -= Fixed::from_int(1);
        assert_eq!(a.to_bits(), 80);
        assert_eq!((-a).to_bits(), -80);
        assert_eq!(a.to_string(), "1:16");
    }
}
