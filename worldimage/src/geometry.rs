// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Points, bounding boxes, and the transform helpers shared by every node.
//!
//! Real-valued geometry uses [`kurbo`] directly. This module only adds the
//! integer [`IntPoint`] used for client-supplied coordinates and the
//! [`BoundingBox`] type the resolver unions together.

use core::fmt;

use kurbo::{Affine, Point, Rect, Vec2};

/// Tolerance used by [`BoundingBox::approx_eq`] and the float-aware tests.
pub const GEOMETRY_EPSILON: f64 = 1e-9;

/// An integer point.
///
/// Integer points are what clients hand in for line end points, polygon
/// vertices, and pixel coordinates. Derived geometry (pinholes, offsets,
/// transformed vertices) is real-valued.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct IntPoint {
    /// Horizontal coordinate; grows to the right.
    pub x: i32,
    /// Vertical coordinate; grows downward.
    pub y: i32,
}

impl IntPoint {
    /// The origin.
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    /// Create a new point.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<IntPoint> for Point {
    #[inline]
    fn from(p: IntPoint) -> Self {
        Self::new(f64::from(p.x), f64::from(p.y))
    }
}

impl From<(i32, i32)> for IntPoint {
    #[inline]
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for IntPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned box in the coordinate frame it was computed in.
///
/// The invariant `min_x <= max_x && min_y <= max_y` holds for every value
/// produced by this module.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum X coordinate.
    pub min_x: f64,
    /// Minimum Y coordinate.
    pub min_y: f64,
    /// Maximum X coordinate.
    pub max_x: f64,
    /// Maximum Y coordinate.
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a box from two opposite corners, in any order.
    #[inline]
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    /// A degenerate box covering exactly one point.
    #[inline]
    pub fn point(p: Point) -> Self {
        Self {
            min_x: p.x,
            min_y: p.y,
            max_x: p.x,
            max_y: p.y,
        }
    }

    /// A box of the given extent centered on the origin.
    #[inline]
    pub fn centered(width: f64, height: f64) -> Self {
        Self::new(-width / 2.0, -height / 2.0, width / 2.0, height / 2.0)
    }

    /// The smallest box containing every point, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = Self::point(iter.next()?);
        Some(iter.fold(first, Self::include))
    }

    /// The smallest box containing both boxes.
    #[inline]
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// The smallest box containing this box and `p`.
    #[inline]
    #[must_use]
    pub fn include(self, p: Point) -> Self {
        Self {
            min_x: self.min_x.min(p.x),
            min_y: self.min_y.min(p.y),
            max_x: self.max_x.max(p.x),
            max_y: self.max_y.max(p.y),
        }
    }

    /// The overlap of two boxes, or `None` if they are disjoint.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let min_x = self.min_x.max(other.min_x);
        let min_y = self.min_y.max(other.min_y);
        let max_x = self.max_x.min(other.max_x);
        let max_y = self.max_y.min(other.max_y);
        (min_x <= max_x && min_y <= max_y).then_some(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Returns true if `p` lies inside or on the boundary of the box.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// The box moved by `offset`.
    #[inline]
    #[must_use]
    pub fn translate(self, offset: Vec2) -> Self {
        Self {
            min_x: self.min_x + offset.x,
            min_y: self.min_y + offset.y,
            max_x: self.max_x + offset.x,
            max_y: self.max_y + offset.y,
        }
    }

    /// Horizontal extent.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Vertical extent.
    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Geometric center.
    #[inline]
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// The four corners, clockwise from the top-left.
    #[inline]
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
        ]
    }

    /// The tight axis-aligned box around the four transformed corners.
    #[must_use]
    pub fn transform(&self, affine: &Affine) -> Self {
        let [a, b, c, d] = self.corners().map(|p| *affine * p);
        Self::point(a).include(b).include(c).include(d)
    }

    /// Convert to kurbo's rectangle type.
    #[inline]
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Compare all four edges within [`GEOMETRY_EPSILON`], scaled by magnitude.
    pub fn approx_eq(&self, other: &Self) -> bool {
        fn close(a: f64, b: f64) -> bool {
            (a - b).abs() <= GEOMETRY_EPSILON * a.abs().max(b.abs()).max(1.0)
        }
        close(self.min_x, other.min_x)
            && close(self.min_y, other.min_y)
            && close(self.max_x, other.max_x)
            && close(self.max_y, other.max_y)
    }
}

impl From<Rect> for BoundingBox {
    #[inline]
    fn from(rect: Rect) -> Self {
        Self::new(rect.x0, rect.y0, rect.x1, rect.y1)
    }
}

/// Rotation by `degrees`, clockwise on screen.
///
/// Multiples of a quarter turn produce exact matrices, so rotating by 360
/// degrees is exactly the identity.
pub fn rotation(degrees: f64) -> Affine {
    let turned = degrees.rem_euclid(360.0);
    if turned.fract() == 0.0 {
        // Exact for the four axis-aligned cases.
        #[allow(
            clippy::cast_possible_truncation,
            reason = "`turned` is an integral value in [0, 360)"
        )]
        match turned as u32 {
            0 => return Affine::IDENTITY,
            90 => return Affine::new([0.0, 1.0, -1.0, 0.0, 0.0, 0.0]),
            180 => return Affine::new([-1.0, 0.0, 0.0, -1.0, 0.0, 0.0]),
            270 => return Affine::new([0.0, -1.0, 1.0, 0.0, 0.0, 0.0]),
            _ => {}
        }
    }
    Affine::rotate(turned.to_radians())
}

/// Shear with `x' = x + sx * y` and `y' = sy * x + y`.
#[inline]
pub fn shear(sx: f64, sy: f64) -> Affine {
    Affine::skew(sx, sy)
}

/// Format a real number the way the structural dump prints scalars.
pub(crate) fn fmt_real(value: f64) -> String {
    // Avoid printing `-0`.
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value}")
}

/// Format a real point as `(x, y)`.
pub(crate) fn fmt_point(p: Point) -> String {
    format!("({}, {})", fmt_real(p.x), fmt_real(p.y))
}

/// Hash a float so that `0.0` and `-0.0` agree, matching `==`.
#[inline]
pub(crate) fn hash_real<H: core::hash::Hasher>(value: f64, state: &mut H) {
    let value = if value == 0.0 { 0.0 } else { value };
    state.write_u64(value.to_bits());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_include_are_smallest_containing_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 5.0);
        let b = BoundingBox::new(-3.0, 2.0, 4.0, 9.0);
        assert_eq!(a.union(b), BoundingBox::new(-3.0, 0.0, 10.0, 9.0));
        assert_eq!(
            a.include(Point::new(12.0, -1.0)),
            BoundingBox::new(0.0, -1.0, 12.0, 5.0)
        );
        // Including an interior point is a no-op.
        assert_eq!(a.include(Point::new(1.0, 1.0)), a);
    }

    #[test]
    fn new_normalizes_corner_order() {
        let b = BoundingBox::new(5.0, 7.0, -1.0, 2.0);
        assert!(b.min_x <= b.max_x && b.min_y <= b.max_y, "normalized");
        assert_eq!(b.width(), 6.0);
        assert_eq!(b.height(), 5.0);
    }

    #[test]
    fn intersect_disjoint_is_none() {
        let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let b = BoundingBox::new(2.0, 2.0, 3.0, 3.0);
        assert!(a.intersect(b).is_none());
        let c = BoundingBox::new(0.5, 0.5, 3.0, 3.0);
        assert_eq!(a.intersect(c), Some(BoundingBox::new(0.5, 0.5, 1.0, 1.0)));
    }

    #[test]
    fn quarter_turns_are_exact() {
        assert_eq!(rotation(360.0), Affine::IDENTITY);
        assert_eq!(rotation(-360.0), Affine::IDENTITY);
        let r = rotation(90.0);
        assert_eq!(r * Point::new(1.0, 0.0), Point::new(0.0, 1.0));
        assert_eq!(rotation(450.0), r);
    }

    #[test]
    fn rotated_box_is_tight_around_corners() {
        let b = BoundingBox::centered(2.0, 2.0);
        let rotated = b.transform(&rotation(45.0));
        let half_diag = 2.0_f64.sqrt();
        assert!(
            rotated.approx_eq(&BoundingBox::new(-half_diag, -half_diag, half_diag, half_diag)),
            "got {rotated:?}"
        );
    }

    #[test]
    fn shear_matches_documented_formula() {
        let p = shear(0.5, 2.0) * Point::new(2.0, 4.0);
        assert_eq!(p, Point::new(4.0, 8.0));
    }

    #[test]
    fn real_formatting_drops_negative_zero() {
        assert_eq!(fmt_real(-0.0), "0");
        assert_eq!(fmt_real(20.0), "20");
        assert_eq!(fmt_real(2.5), "2.5");
        assert_eq!(fmt_point(Point::new(-1.0, 0.5)), "(-1, 0.5)");
    }
}
