// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leaf shape constructors.
//!
//! Every leaf is laid out so that its bounding box is centered on the local
//! origin. Constructors that take real-valued sizes validate them and return
//! [`ImageError::InvalidArgument`](crate::ImageError::InvalidArgument) rather
//! than building a malformed node.

use core::f64::consts::{FRAC_PI_2, PI, TAU};
use core::fmt;
use std::sync::Arc;

use kurbo::{Affine, Point};
use peniko::Color;

use crate::bounds::wedge_box;
use crate::canvas::OutlineMode;
use crate::error::{self, ImageError, Result};
use crate::geometry::{BoundingBox, IntPoint, fmt_real};
use crate::image::{Image, ImageKind};

/// How the vertices of a [`ImageKind::Polygon`] were produced.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PolygonKind {
    /// Client-supplied vertices.
    Path,
    /// Regular polygon with a horizontal bottom edge.
    Regular {
        /// Edge length.
        side: f64,
        /// Number of edges.
        sides: u32,
    },
    /// Triangle through three client-supplied points.
    Triangle,
    /// Rhombus with the given top angle.
    Rhombus {
        /// Edge length.
        side: f64,
        /// Interior angle at the top and bottom vertices, in degrees.
        angle: f64,
    },
    /// Star alternating between an outer and an inner radius.
    RadialStar {
        /// Number of outer points.
        points: u32,
        /// Radius of the outer points.
        outer: f64,
        /// Radius of the inner points.
        inner: f64,
    },
}

impl fmt::Display for PolygonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => f.write_str("path"),
            Self::Triangle => f.write_str("triangle"),
            Self::Regular { side, sides } => {
                write!(f, "regular(side={}, sides={sides})", fmt_real(*side))
            }
            Self::Rhombus { side, angle } => write!(
                f,
                "rhombus(side={}, angle={})",
                fmt_real(*side),
                fmt_real(*angle)
            ),
            Self::RadialStar {
                points,
                outer,
                inner,
            } => write!(
                f,
                "radial-star(points={points}, outer={}, inner={})",
                fmt_real(*outer),
                fmt_real(*inner)
            ),
        }
    }
}

/// Translate `points` so their box is centered on the origin.
fn recentre(points: Vec<Point>) -> Arc<[Point]> {
    let Some(bb) = BoundingBox::from_points(points.iter().copied()) else {
        return Arc::from(points);
    };
    let shift = bb.center().to_vec2();
    points.into_iter().map(|p| p - shift).collect()
}

/// Point at `angle` radians (screen convention, y down) on a circle.
fn polar(radius: f64, angle: f64) -> Point {
    Point::new(radius * angle.cos(), radius * angle.sin())
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl Image {
    /// The empty image: no pixels and a 0x0 box.
    pub fn empty() -> Self {
        Self::from_kind(ImageKind::Empty)
    }

    /// A `width x height` rectangle.
    pub fn rectangle(width: f64, height: f64, mode: OutlineMode, color: Color) -> Result<Self> {
        Ok(Self::from_kind(ImageKind::Rectangle {
            width: error::non_negative("width", width)?,
            height: error::non_negative("height", height)?,
            mode,
            color,
        }))
    }

    /// A `side x side` rectangle.
    pub fn square(side: f64, mode: OutlineMode, color: Color) -> Result<Self> {
        Self::rectangle(side, side, mode, color)
    }

    /// An ellipse inscribed in a `width x height` box.
    pub fn ellipse(width: f64, height: f64, mode: OutlineMode, color: Color) -> Result<Self> {
        Ok(Self::from_kind(ImageKind::Ellipse {
            width: error::non_negative("width", width)?,
            height: error::non_negative("height", height)?,
            mode,
            color,
        }))
    }

    /// A circle of the given radius.
    pub fn circle(radius: f64, mode: OutlineMode, color: Color) -> Result<Self> {
        let radius = error::non_negative("radius", radius)?;
        Self::ellipse(2.0 * radius, 2.0 * radius, mode, color)
    }

    /// A segment whose end point is `end` relative to its start point.
    pub fn line(end: impl Into<IntPoint>, color: Color) -> Self {
        Self::from_kind(ImageKind::Line {
            end: end.into(),
            color,
        })
    }

    /// A polygon through `vertices`, of which there must be at least three.
    pub fn polygon(vertices: &[IntPoint], mode: OutlineMode, color: Color) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(ImageError::invalid(
                "vertices",
                format!("a polygon needs at least 3 vertices, got {}", vertices.len()),
            ));
        }
        let points = vertices.iter().map(|&p| Point::from(p)).collect();
        Ok(Self::polygon_node(PolygonKind::Path, points, mode, color))
    }

    /// A regular polygon with `sides` edges of length `side` and a
    /// horizontal bottom edge.
    pub fn regular_polygon(side: f64, sides: u32, mode: OutlineMode, color: Color) -> Result<Self> {
        let side = error::non_negative("side", side)?;
        if sides < 3 {
            return Err(ImageError::invalid(
                "sides",
                format!("a regular polygon needs at least 3 sides, got {sides}"),
            ));
        }
        let n = f64::from(sides);
        let radius = side / (2.0 * (PI / n).sin());
        let start = FRAC_PI_2 + PI / n;
        let points = (0..sides)
            .map(|k| polar(radius, start + TAU * f64::from(k) / n))
            .collect();
        Ok(Self::polygon_node(
            PolygonKind::Regular { side, sides },
            points,
            mode,
            color,
        ))
    }

    /// An equilateral triangle pointing up.
    pub fn equilateral_triangle(side: f64, mode: OutlineMode, color: Color) -> Result<Self> {
        Self::regular_polygon(side, 3, mode, color)
    }

    /// A triangle through three points.
    pub fn triangle(
        a: impl Into<IntPoint>,
        b: impl Into<IntPoint>,
        c: impl Into<IntPoint>,
        mode: OutlineMode,
        color: Color,
    ) -> Self {
        let points = [a.into(), b.into(), c.into()]
            .into_iter()
            .map(Point::from)
            .collect();
        Self::polygon_node(PolygonKind::Triangle, points, mode, color)
    }

    /// A rhombus with edges of length `side` and an interior angle of
    /// `angle` degrees at its top and bottom vertices.
    pub fn rhombus(side: f64, angle: f64, mode: OutlineMode, color: Color) -> Result<Self> {
        let side = error::non_negative("side", side)?;
        let angle = error::finite("angle", angle)?;
        if !(angle > 0.0 && angle < 180.0) {
            return Err(ImageError::invalid(
                "angle",
                format!("must lie strictly between 0 and 180 degrees, got {angle}"),
            ));
        }
        let half = (angle / 2.0).to_radians();
        let (w, h) = (side * half.sin(), side * half.cos());
        let points = vec![
            Point::new(0.0, -h),
            Point::new(w, 0.0),
            Point::new(0.0, h),
            Point::new(-w, 0.0),
        ];
        Ok(Self::polygon_node(
            PolygonKind::Rhombus { side, angle },
            points,
            mode,
            color,
        ))
    }

    /// A star with `points` tips on a circle of radius `outer` and notches on
    /// a circle of radius `inner`. The first tip points straight up.
    pub fn radial_star(
        points: u32,
        outer: f64,
        inner: f64,
        mode: OutlineMode,
        color: Color,
    ) -> Result<Self> {
        if points < 2 {
            return Err(ImageError::invalid(
                "points",
                format!("a radial star needs at least 2 points, got {points}"),
            ));
        }
        let inner = error::non_negative("inner", inner)?;
        let outer = error::non_negative("outer", outer)?;
        if outer < inner {
            return Err(ImageError::invalid(
                "outer",
                format!("outer radius {outer} is smaller than inner radius {inner}"),
            ));
        }
        let step = PI / f64::from(points);
        let vertices = (0..2 * points)
            .map(|k| {
                let radius = if k % 2 == 0 { outer } else { inner };
                polar(radius, -FRAC_PI_2 + step * f64::from(k))
            })
            .collect();
        Ok(Self::polygon_node(
            PolygonKind::RadialStar {
                points,
                outer,
                inner,
            },
            vertices,
            mode,
            color,
        ))
    }

    /// The `{points/skip}` star polygon inscribed in a circle of `radius`.
    ///
    /// Vertex `k` is joined to vertex `k + skip`. The outline has
    /// `gcd(points, skip)` closed components of `points / gcd` edges each.
    pub fn star_polygon(
        radius: f64,
        points: u32,
        skip: u32,
        mode: OutlineMode,
        color: Color,
    ) -> Result<Self> {
        let radius = error::non_negative("radius", radius)?;
        if points < 3 {
            return Err(ImageError::invalid(
                "points",
                format!("a star polygon needs at least 3 points, got {points}"),
            ));
        }
        if skip == 0 || skip >= points {
            return Err(ImageError::invalid(
                "skip",
                format!("must lie in [1, {points}), got {skip}"),
            ));
        }
        let n = f64::from(points);
        let ring: Vec<Point> = (0..points)
            .map(|k| polar(radius, -FRAC_PI_2 + TAU * f64::from(k) / n))
            .collect();
        let ring = recentre(ring);

        let components = gcd(points, skip);
        let component_len = (points / components) as usize;
        let mut vertices = Vec::with_capacity(ring.len());
        for start in 0..components {
            // Indices stay below `points`, so the sum fits in `u64`.
            let mut index = start;
            for _ in 0..component_len {
                vertices.push(ring[index as usize]);
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "the remainder is below `points`, a `u32`"
                )]
                let next = ((u64::from(index) + u64::from(skip)) % u64::from(points)) as u32;
                index = next;
            }
        }
        let vertices = Arc::from(vertices);
        Ok(Self::from_kind(ImageKind::StarPolygon {
            radius,
            points,
            skip,
            vertices,
            component_len,
            mode,
            color,
        }))
    }

    /// A five-pointed `{5/2}` star.
    pub fn star(radius: f64, mode: OutlineMode, color: Color) -> Result<Self> {
        Self::star_polygon(radius, 5, 2, mode, color)
    }

    /// A pie slice of `radius` sweeping `angle` degrees counterclockwise on
    /// screen from the positive x axis, with `0 < angle <= 360`.
    pub fn wedge(radius: f64, angle: f64, mode: OutlineMode, color: Color) -> Result<Self> {
        let radius = error::non_negative("radius", radius)?;
        let angle = error::finite("angle", angle)?;
        if !(angle > 0.0 && angle <= 360.0) {
            return Err(ImageError::invalid(
                "angle",
                format!("must lie in (0, 360] degrees, got {angle}"),
            ));
        }
        let raw = wedge_box(Point::ORIGIN, radius, angle.to_radians(), Affine::IDENTITY);
        Ok(Self::from_kind(ImageKind::Wedge {
            radius,
            angle,
            center: Point::ORIGIN - raw.center().to_vec2(),
            mode,
            color,
        }))
    }

    fn polygon_node(shape: PolygonKind, points: Vec<Point>, mode: OutlineMode, color: Color) -> Self {
        Self::from_kind(ImageKind::Polygon {
            shape,
            vertices: recentre(points),
            mode,
            color,
        })
    }

    /// Closed outlines of a polygon or star polygon, one slice per component.
    pub fn outline_components(&self) -> Option<Vec<&[Point]>> {
        match self.kind() {
            ImageKind::Polygon { vertices, .. } => Some(vec![&vertices[..]]),
            ImageKind::StarPolygon {
                vertices,
                component_len,
                ..
            } => Some(vertices.chunks(*component_len).collect()),
            _ => None,
        }
    }
}
