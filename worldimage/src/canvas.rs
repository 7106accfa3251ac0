// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The narrow rendering surface images draw into.
//!
//! A [`Canvas`] is the host's 2D rendering context: it holds a current
//! transform and accepts filled or outlined [`Primitive`]s, text runs,
//! rasters, and rectangular clips. Images never keep a canvas around; they
//! set the transform for each primitive they emit and restore the caller's
//! transform before [`Image::draw`](crate::Image::draw) returns.
//!
//! Backends live in other crates. [`RecordingCanvas`](crate::RecordingCanvas)
//! is the in-crate implementation used for tests and frozen images.

use std::sync::Arc;

use kurbo::{Affine, BezPath, CircleSegment, Ellipse, Line, Point, Rect, Shape};
use peniko::Color;

use crate::raster::RasterData;
use crate::text::TextRun;

/// Fill or outline a shape.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutlineMode {
    /// Fill the interior.
    #[default]
    Solid,
    /// Stroke the boundary with a one-unit pen.
    Outline,
}

impl OutlineMode {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Outline => "outline",
        }
    }
}

/// A shape in the coordinate frame of the canvas' current transform.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    /// Axis-aligned rectangle.
    Rect(Rect),
    /// Axis-aligned ellipse.
    Ellipse(Ellipse),
    /// Straight segment. Filling a line strokes it.
    Line(Line),
    /// Closed polygon through the given vertices.
    Polygon(Arc<[Point]>),
    /// Pie slice.
    Wedge(CircleSegment),
}

impl Primitive {
    /// Convert to a Bézier path with the given flattening tolerance.
    pub fn to_path(&self, tolerance: f64) -> BezPath {
        match self {
            Self::Rect(rect) => rect.to_path(tolerance),
            Self::Ellipse(ellipse) => ellipse.to_path(tolerance),
            Self::Line(line) => line.to_path(tolerance),
            Self::Wedge(segment) => segment.to_path(tolerance),
            Self::Polygon(points) => {
                let mut path = BezPath::new();
                let mut iter = points.iter();
                if let Some(first) = iter.next() {
                    path.move_to(*first);
                    for p in iter {
                        path.line_to(*p);
                    }
                    path.close_path();
                }
                path
            }
        }
    }

    /// Returns `true` if this primitive has no interior to fill.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Line(_))
    }
}

/// A 2D rendering context.
///
/// Each drawing call is interpreted under the current transform. Clips nest:
/// every [`push_clip`](Self::push_clip) is matched by a
/// [`pop_clip`](Self::pop_clip).
pub trait Canvas {
    /// The current transform.
    fn transform(&self) -> Affine;

    /// Replace the current transform.
    fn set_transform(&mut self, transform: Affine);

    /// Fill a primitive with a solid color.
    fn fill(&mut self, primitive: &Primitive, color: Color);

    /// Stroke the outline of a primitive with a one-unit pen.
    fn stroke(&mut self, primitive: &Primitive, color: Color);

    /// Draw a run of text.
    fn draw_text(&mut self, run: &TextRun, color: Color);

    /// Draw a raster stretched over `dest`.
    fn draw_raster(&mut self, raster: &RasterData, dest: Rect);

    /// Intersect the clip with `rect`.
    fn push_clip(&mut self, rect: Rect);

    /// Undo the most recent [`push_clip`](Self::push_clip).
    fn pop_clip(&mut self);
}

/// Convenience helpers available on every [`Canvas`].
pub trait CanvasExt: Canvas {
    /// Run `f` with the transform set to `transform`, then restore it.
    fn with_transform<R>(&mut self, transform: Affine, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.transform();
        self.set_transform(transform);
        let out = f(self);
        self.set_transform(saved);
        out
    }

    /// Fill or stroke depending on `mode`.
    fn paint(&mut self, primitive: &Primitive, mode: OutlineMode, color: Color) {
        match mode {
            OutlineMode::Solid if !primitive.is_open() => self.fill(primitive, color),
            _ => self.stroke(primitive, color),
        }
    }
}

impl<C: Canvas + ?Sized> CanvasExt for C {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CanvasOp, RecordingCanvas};
    use peniko::color::palette::css;

    #[test]
    fn polygon_path_is_closed() {
        let tri = Primitive::Polygon(Arc::from(
            [
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0),
                Point::new(0.0, 3.0),
            ]
            .as_slice(),
        ));
        let path = tri.to_path(0.1);
        assert_eq!(path.elements().len(), 4, "move, two lines, close");
        assert_eq!(path.bounding_box(), Rect::new(0.0, 0.0, 4.0, 3.0));
    }

    #[test]
    fn paint_strokes_lines_even_when_solid() {
        let mut canvas = RecordingCanvas::new();
        let line = Primitive::Line(Line::new((0.0, 0.0), (1.0, 1.0)));
        canvas.paint(&line, OutlineMode::Solid, css::RED);
        assert!(
            matches!(canvas.ops()[0].op, CanvasOp::Stroke { .. }),
            "lines have no interior"
        );
    }

    #[test]
    fn with_transform_restores() {
        let mut canvas = RecordingCanvas::new();
        canvas.set_transform(Affine::scale(2.0));
        let seen = canvas.with_transform(Affine::translate((1.0, 0.0)), |c| c.transform());
        assert_eq!(seen, Affine::translate((1.0, 0.0)));
        assert_eq!(canvas.transform(), Affine::scale(2.0));
    }
}
