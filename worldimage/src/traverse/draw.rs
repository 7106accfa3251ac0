// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use kurbo::{Affine, CircleSegment, Ellipse, Line, Point, Rect, Vec2};
use peniko::Color;
use smallvec::SmallVec;

use crate::canvas::{Canvas, CanvasExt, Primitive};
use crate::geometry::BoundingBox;
use crate::image::{Image, ImageKind, STACK_SAFE_DEPTH};
use crate::text::{TextRun, baseline_origin};

/// Half the arm length of the pinhole marker.
const MARKER_ARM: f64 = 4.0;

/// Pending draw work.
enum Step<'a> {
    /// Draw a node under a transform.
    Node(&'a Image, Affine),
    /// Close the clip opened by a crop.
    PopClip,
    /// Stroke a frame outline.
    Outline {
        rect: Rect,
        color: Color,
        transform: Affine,
    },
    /// Stroke a pinhole marker.
    Marker {
        at: Point,
        color: Color,
        transform: Affine,
    },
}

type Steps<'a> = SmallVec<[Step<'a>; 3]>;

impl Image {
    /// Render this image into `canvas` under its current transform.
    ///
    /// The canvas transform is the same on return as on entry.
    pub fn draw(&self, canvas: &mut dyn Canvas) {
        let base = canvas.transform();
        if self.depth() <= STACK_SAFE_DEPTH {
            draw_nested(self, base, canvas);
        } else {
            draw_worklist(self, base, canvas);
        }
        canvas.set_transform(base);
    }
}

fn draw_nested(image: &Image, transform: Affine, canvas: &mut dyn Canvas) {
    for step in expand(image, transform, canvas) {
        match step {
            Step::Node(child, xf) => draw_nested(child, xf, canvas),
            other => finish(other, canvas),
        }
    }
}

fn draw_worklist(image: &Image, transform: Affine, canvas: &mut dyn Canvas) {
    let mut pending = vec![Step::Node(image, transform)];
    while let Some(step) = pending.pop() {
        match step {
            Step::Node(node, xf) => pending.extend(expand(node, xf, canvas).into_iter().rev()),
            other => finish(other, canvas),
        }
    }
}

/// Draw everything `image` paints itself and return the rest of its work in
/// drawing order.
fn expand<'a>(image: &'a Image, xf: Affine, canvas: &mut dyn Canvas) -> Steps<'a> {
    let mut next = Steps::new();
    match image.kind() {
        ImageKind::Empty => {}
        ImageKind::Rectangle {
            width,
            height,
            mode,
            color,
        } => {
            canvas.set_transform(xf);
            let rect = BoundingBox::centered(*width, *height).to_rect();
            canvas.paint(&Primitive::Rect(rect), *mode, *color);
        }
        ImageKind::Ellipse {
            width,
            height,
            mode,
            color,
        } => {
            canvas.set_transform(xf);
            let rect = BoundingBox::centered(*width, *height).to_rect();
            canvas.paint(&Primitive::Ellipse(Ellipse::from_rect(rect)), *mode, *color);
        }
        ImageKind::Line { end, color } => {
            canvas.set_transform(xf);
            let half = Point::from(*end).to_vec2() / 2.0;
            let line = Line::new(Point::ORIGIN - half, Point::ORIGIN + half);
            canvas.stroke(&Primitive::Line(line), *color);
        }
        ImageKind::Polygon {
            vertices,
            mode,
            color,
            ..
        } => {
            canvas.set_transform(xf);
            canvas.paint(&Primitive::Polygon(vertices.clone()), *mode, *color);
        }
        ImageKind::StarPolygon {
            vertices,
            component_len,
            mode,
            color,
            ..
        } => {
            canvas.set_transform(xf);
            for component in vertices.chunks((*component_len).max(1)) {
                canvas.paint(&Primitive::Polygon(Arc::from(component)), *mode, *color);
            }
        }
        ImageKind::Wedge {
            radius,
            angle,
            center,
            mode,
            color,
        } => {
            canvas.set_transform(xf);
            let sweep = angle.to_radians();
            // Screen-counterclockwise from +x is kurbo's [-sweep, 0].
            let segment = CircleSegment::new(*center, *radius, 0.0, -sweep, sweep);
            canvas.paint(&Primitive::Wedge(segment), *mode, *color);
        }
        ImageKind::Text {
            text,
            font,
            extent,
            color,
        } => {
            canvas.set_transform(xf);
            let run = TextRun {
                text: text.clone(),
                font: font.clone(),
                origin: baseline_origin(extent),
                extent: *extent,
            };
            canvas.draw_text(&run, *color);
        }
        ImageKind::FileImage { data, .. } | ImageKind::PixelImage { data } => {
            canvas.set_transform(xf);
            let dest =
                BoundingBox::centered(f64::from(data.width()), f64::from(data.height())).to_rect();
            canvas.draw_raster(data, dest);
        }
        ImageKind::Crop {
            child,
            width,
            height,
            child_offset,
            ..
        } => {
            canvas.set_transform(xf);
            canvas.push_clip(BoundingBox::centered(*width, *height).to_rect());
            next.push(Step::Node(child, xf * Affine::translate(*child_offset)));
            next.push(Step::PopClip);
        }
        ImageKind::Frame {
            child,
            color,
            outline,
        } => {
            next.push(Step::Node(child, xf));
            next.push(Step::Outline {
                rect: outline.to_rect(),
                color: *color,
                transform: xf,
            });
        }
        ImageKind::VisiblePinhole { child, color } => {
            next.push(Step::Node(child, xf));
            next.push(Step::Marker {
                at: image.pinhole(),
                color: *color,
                transform: xf,
            });
        }
        ImageKind::Frozen { recording, .. } => recording.replay(canvas, xf),
        kind => {
            next.extend(
                kind.child_transforms()
                    .into_iter()
                    .map(|(child, local)| Step::Node(child, xf * local)),
            );
        }
    }
    next
}

/// Run a step that does not descend into a child.
fn finish(step: Step<'_>, canvas: &mut dyn Canvas) {
    match step {
        Step::Node(..) => {}
        Step::PopClip => canvas.pop_clip(),
        Step::Outline {
            rect,
            color,
            transform,
        } => {
            canvas.set_transform(transform);
            canvas.stroke(&Primitive::Rect(rect), color);
        }
        Step::Marker {
            at,
            color,
            transform,
        } => {
            canvas.set_transform(transform);
            for arm in [Vec2::new(MARKER_ARM, 0.0), Vec2::new(0.0, MARKER_ARM)] {
                canvas.stroke(&Primitive::Line(Line::new(at - arm, at + arm)), color);
            }
        }
    }
}
