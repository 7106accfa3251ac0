// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::hash::{Hash, Hasher};
use core::mem;

use crate::geometry::hash_real;
use crate::image::{Image, ImageKind, STACK_SAFE_DEPTH, rgba};
use crate::shapes::PolygonKind;

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        if Self::ptr_eq(self, other) {
            return true;
        }
        if self.depth() != other.depth() {
            return false;
        }
        if self.depth() <= STACK_SAFE_DEPTH {
            eq_nested(self, other)
        } else {
            eq_worklist(self, other)
        }
    }
}

impl Eq for Image {}

fn eq_nested(a: &Image, b: &Image) -> bool {
    Image::ptr_eq(a, b)
        || (local_eq(a, b)
            && a.kind()
                .children()
                .into_iter()
                .zip(b.kind().children())
                .all(|(x, y)| eq_nested(x, y)))
}

fn eq_worklist(a: &Image, b: &Image) -> bool {
    let mut pending = vec![(a, b)];
    while let Some((a, b)) = pending.pop() {
        if Image::ptr_eq(a, b) {
            continue;
        }
        if !local_eq(a, b) {
            return false;
        }
        pending.extend(a.kind().children().into_iter().zip(b.kind().children()));
    }
    true
}

/// Compare the node kind, pinhole, and own fields; children are not visited.
///
/// Layout derived from children and alignment (offsets, centers, recorded
/// drawings) is not compared: equal inputs derive equal layout.
fn local_eq(a: &Image, b: &Image) -> bool {
    if a.pinhole() != b.pinhole() {
        return false;
    }
    match (a.kind(), b.kind()) {
        (ImageKind::Empty, ImageKind::Empty) => true,
        (
            ImageKind::Rectangle {
                width: w1,
                height: h1,
                mode: m1,
                color: c1,
            },
            ImageKind::Rectangle {
                width: w2,
                height: h2,
                mode: m2,
                color: c2,
            },
        )
        | (
            ImageKind::Ellipse {
                width: w1,
                height: h1,
                mode: m1,
                color: c1,
            },
            ImageKind::Ellipse {
                width: w2,
                height: h2,
                mode: m2,
                color: c2,
            },
        ) => w1 == w2 && h1 == h2 && m1 == m2 && rgba(*c1) == rgba(*c2),
        (ImageKind::Line { end: e1, color: c1 }, ImageKind::Line { end: e2, color: c2 }) => {
            e1 == e2 && rgba(*c1) == rgba(*c2)
        }
        (
            ImageKind::Polygon {
                shape: s1,
                vertices: v1,
                mode: m1,
                color: c1,
            },
            ImageKind::Polygon {
                shape: s2,
                vertices: v2,
                mode: m2,
                color: c2,
            },
        ) => s1 == s2 && v1 == v2 && m1 == m2 && rgba(*c1) == rgba(*c2),
        (
            ImageKind::StarPolygon {
                radius: r1,
                points: p1,
                skip: k1,
                mode: m1,
                color: c1,
                ..
            },
            ImageKind::StarPolygon {
                radius: r2,
                points: p2,
                skip: k2,
                mode: m2,
                color: c2,
                ..
            },
        ) => r1 == r2 && p1 == p2 && k1 == k2 && m1 == m2 && rgba(*c1) == rgba(*c2),
        (
            ImageKind::Wedge {
                radius: r1,
                angle: a1,
                mode: m1,
                color: c1,
                ..
            },
            ImageKind::Wedge {
                radius: r2,
                angle: a2,
                mode: m2,
                color: c2,
                ..
            },
        ) => r1 == r2 && a1 == a2 && m1 == m2 && rgba(*c1) == rgba(*c2),
        (
            ImageKind::Text {
                text: t1,
                font: f1,
                extent: e1,
                color: c1,
            },
            ImageKind::Text {
                text: t2,
                font: f2,
                extent: e2,
                color: c2,
            },
        ) => t1 == t2 && f1 == f2 && e1 == e2 && rgba(*c1) == rgba(*c2),
        (
            ImageKind::FileImage {
                path: p1,
                modified: m1,
                data: d1,
            },
            ImageKind::FileImage {
                path: p2,
                modified: m2,
                data: d2,
            },
        ) => p1 == p2 && m1 == m2 && (m1.is_some() || d1 == d2),
        (ImageKind::PixelImage { data: d1 }, ImageKind::PixelImage { data: d2 }) => d1 == d2,
        (
            ImageKind::Overlay {
                align_x: x1,
                align_y: y1,
                dx: dx1,
                dy: dy1,
                ..
            },
            ImageKind::Overlay {
                align_x: x2,
                align_y: y2,
                dx: dx2,
                dy: dy2,
                ..
            },
        ) => x1 == x2 && y1 == y2 && dx1 == dx2 && dy1 == dy2,
        (ImageKind::Beside { align_y: y1, .. }, ImageKind::Beside { align_y: y2, .. }) => {
            y1 == y2
        }
        (ImageKind::Above { align_x: x1, .. }, ImageKind::Above { align_x: x2, .. }) => x1 == x2,
        (
            ImageKind::Crop {
                x: x1,
                y: y1,
                width: w1,
                height: h1,
                ..
            },
            ImageKind::Crop {
                x: x2,
                y: y2,
                width: w2,
                height: h2,
                ..
            },
        ) => x1 == x2 && y1 == y2 && w1 == w2 && h1 == h2,
        (ImageKind::Frame { color: c1, .. }, ImageKind::Frame { color: c2, .. })
        | (
            ImageKind::VisiblePinhole { color: c1, .. },
            ImageKind::VisiblePinhole { color: c2, .. },
        ) => rgba(*c1) == rgba(*c2),
        (
            ImageKind::Phantom {
                width: w1,
                height: h1,
                ..
            },
            ImageKind::Phantom {
                width: w2,
                height: h2,
                ..
            },
        ) => w1 == w2 && h1 == h2,
        (ImageKind::Rotate { degrees: d1, .. }, ImageKind::Rotate { degrees: d2, .. }) => {
            d1 == d2
        }
        (
            ImageKind::Scale {
                sx: x1, sy: y1, ..
            },
            ImageKind::Scale {
                sx: x2, sy: y2, ..
            },
        )
        | (
            ImageKind::Shear {
                sx: x1, sy: y1, ..
            },
            ImageKind::Shear {
                sx: x2, sy: y2, ..
            },
        ) => x1 == x2 && y1 == y2,
        (ImageKind::Frozen { .. }, ImageKind::Frozen { .. }) => true,
        _ => false,
    }
}

impl Hash for Image {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut pending = vec![self];
        while let Some(image) = pending.pop() {
            hash_local(image, state);
            let children = image.kind().children();
            pending.extend(children.into_iter().rev());
        }
    }
}

/// Hash exactly the data [`local_eq`] compares.
fn hash_local<H: Hasher>(image: &Image, state: &mut H) {
    let kind = image.kind();
    mem::discriminant(kind).hash(state);
    hash_real(image.pinhole().x, state);
    hash_real(image.pinhole().y, state);
    match kind {
        ImageKind::Empty | ImageKind::Frozen { .. } => {}
        ImageKind::Rectangle {
            width,
            height,
            mode,
            color,
        }
        | ImageKind::Ellipse {
            width,
            height,
            mode,
            color,
        } => {
            hash_real(*width, state);
            hash_real(*height, state);
            mode.hash(state);
            rgba(*color).hash(state);
        }
        ImageKind::Line { end, color } => {
            end.hash(state);
            rgba(*color).hash(state);
        }
        ImageKind::Polygon {
            shape,
            vertices,
            mode,
            color,
        } => {
            hash_polygon_kind(shape, state);
            state.write_usize(vertices.len());
            for p in vertices.iter() {
                hash_real(p.x, state);
                hash_real(p.y, state);
            }
            mode.hash(state);
            rgba(*color).hash(state);
        }
        ImageKind::StarPolygon {
            radius,
            points,
            skip,
            mode,
            color,
            ..
        } => {
            hash_real(*radius, state);
            points.hash(state);
            skip.hash(state);
            mode.hash(state);
            rgba(*color).hash(state);
        }
        ImageKind::Wedge {
            radius,
            angle,
            mode,
            color,
            ..
        } => {
            hash_real(*radius, state);
            hash_real(*angle, state);
            mode.hash(state);
            rgba(*color).hash(state);
        }
        ImageKind::Text {
            text,
            font,
            extent,
            color,
        } => {
            text.hash(state);
            font.family.hash(state);
            hash_real(font.size, state);
            font.style.hash(state);
            hash_real(extent.advance, state);
            hash_real(extent.ascent, state);
            hash_real(extent.descent, state);
            rgba(*color).hash(state);
        }
        ImageKind::FileImage {
            path,
            modified,
            data,
        } => {
            path.hash(state);
            modified.hash(state);
            if modified.is_none() {
                data.hash(state);
            }
        }
        ImageKind::PixelImage { data } => data.hash(state),
        ImageKind::Overlay {
            align_x,
            align_y,
            dx,
            dy,
            ..
        } => {
            align_x.hash(state);
            align_y.hash(state);
            hash_real(*dx, state);
            hash_real(*dy, state);
        }
        ImageKind::Beside { align_y, .. } => align_y.hash(state),
        ImageKind::Above { align_x, .. } => align_x.hash(state),
        ImageKind::Crop {
            x,
            y,
            width,
            height,
            ..
        } => {
            for v in [*x, *y, *width, *height] {
                hash_real(v, state);
            }
        }
        ImageKind::Frame { color, .. } | ImageKind::VisiblePinhole { color, .. } => {
            rgba(*color).hash(state);
        }
        ImageKind::Phantom { width, height, .. } => {
            hash_real(*width, state);
            hash_real(*height, state);
        }
        ImageKind::Rotate { degrees, .. } => hash_real(*degrees, state),
        ImageKind::Scale { sx, sy, .. } | ImageKind::Shear { sx, sy, .. } => {
            hash_real(*sx, state);
            hash_real(*sy, state);
        }
    }
}

fn hash_polygon_kind<H: Hasher>(shape: &PolygonKind, state: &mut H) {
    mem::discriminant(shape).hash(state);
    match *shape {
        PolygonKind::Path | PolygonKind::Triangle => {}
        PolygonKind::Regular { side, sides } => {
            hash_real(side, state);
            sides.hash(state);
        }
        PolygonKind::Rhombus { side, angle } => {
            hash_real(side, state);
            hash_real(angle, state);
        }
        PolygonKind::RadialStar {
            points,
            outer,
            inner,
        } => {
            points.hash(state);
            hash_real(outer, state);
            hash_real(inner, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::OutlineMode;
    use crate::combinators::{AlignX, AlignY};
    use crate::raster::RasterData;
    use peniko::Color;
    use peniko::color::palette::css;
    use std::hash::DefaultHasher;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    fn hash_of(image: &Image) -> u64 {
        let mut hasher = DefaultHasher::new();
        image.hash(&mut hasher);
        hasher.finish()
    }

    fn rect(w: f64, h: f64) -> Image {
        Image::rectangle(w, h, OutlineMode::Solid, css::BLUE).unwrap()
    }

    fn sample(tilt: f64) -> Image {
        let a = rect(10.0, 6.0).frame(css::BLACK);
        let b = Image::circle(4.0, OutlineMode::Outline, css::RED)
            .unwrap()
            .rotate(tilt)
            .unwrap();
        Image::overlay_align(AlignX::Left, AlignY::Bottom, &a, &b)
            .beside(&Image::text("hi", 12.0, css::BLACK).unwrap())
    }

    #[test]
    fn independent_builds_are_equal_with_equal_hashes() {
        let a = sample(30.0);
        let b = sample(30.0);
        assert!(!Image::ptr_eq(&a, &b));
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn any_scalar_change_breaks_equality() {
        let base = rect(10.0, 6.0);
        assert_ne!(base, rect(10.0, 7.0));
        assert_ne!(
            base,
            Image::rectangle(10.0, 6.0, OutlineMode::Outline, css::BLUE).unwrap()
        );
        assert_ne!(
            base,
            Image::rectangle(10.0, 6.0, OutlineMode::Solid, css::RED).unwrap()
        );
        assert_ne!(base, Image::ellipse(10.0, 6.0, OutlineMode::Solid, css::BLUE).unwrap());
        assert_ne!(sample(30.0), sample(31.0));
    }

    #[test]
    fn children_are_position_sensitive() {
        let a = rect(1.0, 1.0);
        let b = rect(2.0, 2.0);
        assert_ne!(a.beside(&b), b.beside(&a));
    }

    #[test]
    fn negative_zero_hashes_like_zero() {
        let a = rect(2.0, 2.0).move_pinhole_to((0.0, 0.0)).unwrap();
        let b = rect(2.0, 2.0).move_pinhole_to((-0.0, 0.0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    fn file_image(modified: Option<SystemTime>, color: Color) -> Image {
        let rgba = color.to_rgba8();
        let data = RasterData::new(1, 1, vec![rgba.r, rgba.g, rgba.b, rgba.a]).unwrap();
        Image::from_kind(ImageKind::FileImage {
            path: Arc::from(Path::new("/pictures/cat.png")),
            modified,
            data,
        })
    }

    #[test]
    fn file_images_without_timestamps_compare_pixels() {
        let red = file_image(None, css::RED);
        assert_eq!(red, file_image(None, css::RED));
        assert_eq!(hash_of(&red), hash_of(&file_image(None, css::RED)));
        assert_ne!(red, file_image(None, css::BLUE));

        let stamp = Some(SystemTime::UNIX_EPOCH + Duration::from_secs(60));
        assert_eq!(
            file_image(stamp, css::RED),
            file_image(stamp, css::BLUE),
            "a known timestamp identifies the file"
        );
        assert_ne!(red, file_image(stamp, css::RED));
    }

    #[test]
    fn nested_and_worklist_paths_agree() {
        let pairs = [
            (sample(30.0), sample(30.0)),
            (sample(30.0), sample(45.0)),
            (rect(1.0, 1.0).beside(&rect(2.0, 2.0)), rect(2.0, 2.0).beside(&rect(1.0, 1.0))),
        ];
        for (a, b) in &pairs {
            assert_eq!(eq_nested(a, b), eq_worklist(a, b));
        }
    }

    #[test]
    fn deep_chains_compare_without_overflow() {
        let build = |leaf: Image| {
            let mut image = leaf;
            for _ in 0..5_000 {
                image = image.scale(1.0).unwrap();
            }
            image
        };
        let a = build(rect(3.0, 3.0));
        let b = build(rect(3.0, 3.0));
        let c = build(rect(3.0, 4.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(hash_of(&a), hash_of(&b));
    }
}
