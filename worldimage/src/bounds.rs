// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounding boxes under arbitrary affine transforms.
//!
//! Boxes are resolved by walking the tree with an explicit stack, carrying
//! the accumulated transform down to the leaves, so depth never costs native
//! stack. Leaf contributions are tight: ellipses and arcs use their closed
//! forms rather than the box of a transformed box.

use core::f64::consts::{PI, TAU};

use kurbo::{Affine, Point};

use crate::geometry::{BoundingBox, GEOMETRY_EPSILON};
use crate::image::{Image, ImageKind};

/// Tight box of `image` drawn under `transform`.
pub(crate) fn resolve(image: &Image, transform: Affine) -> BoundingBox {
    let mut bounds: Option<BoundingBox> = None;
    let mut add = |b: BoundingBox| {
        bounds = Some(match bounds {
            Some(acc) => acc.union(b),
            None => b,
        });
    };

    let mut stack = vec![(image, transform)];
    while let Some((node, xf)) = stack.pop() {
        match node.kind() {
            ImageKind::Empty => add(BoundingBox::point(xf * Point::ORIGIN)),
            ImageKind::Rectangle { width, height, .. }
            | ImageKind::Crop { width, height, .. }
            | ImageKind::Phantom { width, height, .. } => {
                add(BoundingBox::centered(*width, *height).transform(&xf));
            }
            ImageKind::Text { extent, .. } => {
                add(BoundingBox::centered(extent.advance, extent.height()).transform(&xf));
            }
            ImageKind::FileImage { data, .. } | ImageKind::PixelImage { data } => {
                add(
                    BoundingBox::centered(f64::from(data.width()), f64::from(data.height()))
                        .transform(&xf),
                );
            }
            ImageKind::Ellipse { width, height, .. } => {
                add(ellipse_box(*width / 2.0, *height / 2.0, xf));
            }
            ImageKind::Line { end, .. } => {
                let half = Point::from(*end).to_vec2() / 2.0;
                let start = xf * (Point::ORIGIN - half);
                add(BoundingBox::point(start).include(xf * (Point::ORIGIN + half)));
            }
            ImageKind::Polygon { vertices, .. } | ImageKind::StarPolygon { vertices, .. } => {
                if let Some(b) = BoundingBox::from_points(vertices.iter().map(|p| xf * *p)) {
                    add(b);
                }
            }
            ImageKind::Wedge {
                radius,
                angle,
                center,
                ..
            } => add(wedge_box(*center, *radius, angle.to_radians(), xf)),
            ImageKind::Frame { outline, .. } => add(outline.transform(&xf)),
            ImageKind::Frozen { bounds, .. } => add(bounds.transform(&xf)),
            kind => {
                // Reverse so children pop in drawing order.
                for (child, local) in kind.child_transforms().into_iter().rev() {
                    stack.push((child, xf * local));
                }
            }
        }
    }
    bounds.unwrap_or_else(|| BoundingBox::point(transform * Point::ORIGIN))
}

/// Box of the axis-aligned ellipse with semi-axes `rx`, `ry` at the origin,
/// drawn under `xf`.
fn ellipse_box(rx: f64, ry: f64, xf: Affine) -> BoundingBox {
    let [a, b, c, d, e, f] = xf.as_coeffs();
    let hx = (a * rx).hypot(c * ry);
    let hy = (b * rx).hypot(d * ry);
    BoundingBox::new(e - hx, f - hy, e + hx, f + hy)
}

/// Box of the pie slice centered at `center` with the given radius, sweeping
/// `sweep` radians counterclockwise on screen from the positive x axis, drawn
/// under `xf`.
///
/// The arc is `center + r (cos t, -sin t)`. Under `xf` each coordinate is a
/// sinusoid in `t`, so its extremes lie at two antipodal angles; those that
/// fall strictly inside the sweep join the center and both endpoints.
pub(crate) fn wedge_box(center: Point, radius: f64, sweep: f64, xf: Affine) -> BoundingBox {
    let at = |t: f64| xf * (center + radius * kurbo::Vec2::new(t.cos(), -t.sin()));
    let mut bounds = BoundingBox::point(xf * center).include(at(0.0)).include(at(sweep));
    let [a, b, c, d, _, _] = xf.as_coeffs();
    for base in [(-c).atan2(a), (-d).atan2(b)] {
        for candidate in [base, base + PI] {
            let t = candidate.rem_euclid(TAU);
            if t < sweep - GEOMETRY_EPSILON {
                bounds = bounds.include(at(t));
            }
        }
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::OutlineMode;
    use peniko::color::palette::css;

    fn assert_box(actual: BoundingBox, expected: BoundingBox) {
        assert!(actual.approx_eq(&expected), "{actual:?} != {expected:?}");
    }

    #[test]
    fn half_disc_under_identity() {
        let b = wedge_box(Point::ORIGIN, 10.0, PI, Affine::IDENTITY);
        // Upper half on screen: y grows downward.
        assert_box(b, BoundingBox::new(-10.0, -10.0, 10.0, 0.0));
    }

    #[test]
    fn full_disc_is_square() {
        let b = wedge_box(Point::ORIGIN, 5.0, TAU, Affine::IDENTITY);
        assert_box(b, BoundingBox::new(-5.0, -5.0, 5.0, 5.0));
    }

    #[test]
    fn small_wedge_is_tight() {
        let sweep = 30_f64.to_radians();
        let b = wedge_box(Point::ORIGIN, 10.0, sweep, Affine::IDENTITY);
        assert_box(
            b,
            BoundingBox::new(0.0, -10.0 * sweep.sin(), 10.0, 0.0),
        );
    }

    #[test]
    fn rotated_ellipse_is_tight() {
        let xf = Affine::rotate(PI / 2.0);
        let b = ellipse_box(20.0, 5.0, xf);
        assert_box(b, BoundingBox::new(-5.0, -20.0, 5.0, 20.0));
    }

    #[test]
    fn ellipse_under_forty_five_degrees() {
        let xf = Affine::rotate(PI / 4.0);
        let b = ellipse_box(10.0, 10.0, xf);
        // A circle stays a circle.
        assert_box(b, BoundingBox::new(-10.0, -10.0, 10.0, 10.0));
    }

    #[test]
    fn nested_transforms_compose() {
        let image = Image::rectangle(10.0, 4.0, OutlineMode::Solid, css::RED)
            .unwrap()
            .scale(2.0)
            .unwrap()
            .scale_xy(1.0, 3.0)
            .unwrap();
        assert_box(
            resolve(&image, Affine::IDENTITY),
            BoundingBox::new(-10.0, -12.0, 10.0, 12.0),
        );
        assert_box(
            resolve(&image, Affine::translate((1.0, 1.0))),
            BoundingBox::new(-9.0, -11.0, 11.0, 13.0),
        );
    }

    #[test]
    fn empty_is_a_point() {
        let b = resolve(&Image::empty(), Affine::translate((3.0, 4.0)));
        assert_eq!(b, BoundingBox::point(Point::new(3.0, 4.0)));
    }

    #[test]
    fn deep_chain_resolves_without_recursion() {
        let mut image = Image::rectangle(2.0, 2.0, OutlineMode::Solid, css::RED).unwrap();
        for _ in 0..50_000 {
            image = image.scale(1.0).unwrap();
        }
        assert_box(
            resolve(&image, Affine::IDENTITY),
            BoundingBox::new(-1.0, -1.0, 1.0, 1.0),
        );
    }
}
