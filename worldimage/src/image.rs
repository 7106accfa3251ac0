// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The image handle and its node representation.
//!
//! ## Usage
//!
//! - Build leaves with the shape constructors ([`Image::rectangle`],
//!   [`Image::circle`], [`Image::text`], ...).
//! - Compose them with combinators ([`Image::overlay`], [`Image::beside`],
//!   [`Image::rotate`], ...). Every combinator returns a new image; nothing
//!   is ever mutated.
//! - Query geometry with [`Image::width`], [`Image::height`] and
//!   [`Image::bounding_box`], and render with [`Image::draw`].
//!
//! ## Local frames
//!
//! Every node has its own local coordinate frame, and its identity-transform
//! bounding box is centered on that frame's origin. Leaves are laid out
//! centered; combinators translate their children so the combined box is
//! centered again. The [pinhole](Image::pinhole) is an extra point in the
//! local frame used by pinhole alignment; it defaults to the origin.
//!
//! ## Depth
//!
//! A node records `1 + max(child depths)`. Traversals use it to choose
//! between direct recursion and an explicit worklist, see
//! [`STACK_SAFE_DEPTH`].

use core::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use kurbo::{Affine, Point, Vec2};
use peniko::Color;
use smallvec::{SmallVec, smallvec};

use crate::bounds;
use crate::cache::BoundsCache;
use crate::canvas::OutlineMode;
use crate::combinators::{AlignX, AlignY};
use crate::error::{self, Result};
use crate::geometry::{BoundingBox, IntPoint};
use crate::raster::RasterData;
use crate::record::Recording;
use crate::shapes::PolygonKind;
use crate::text::{FontSpec, TextExtent};

/// Depth above which traversals switch from recursion to an explicit worklist.
///
/// Trees no deeper than this are drawn, compared, printed, and dropped with
/// ordinary recursion. Deeper trees never nest native calls per level.
pub const STACK_SAFE_DEPTH: u32 = 64;

/// An immutable picture.
///
/// `Image` is a cheap-to-clone shared handle. Equality and hashing are
/// extensional: two independently built images with the same structure and
/// fields are equal.
#[derive(Clone)]
pub struct Image(pub(crate) Arc<ImageNode>);

pub(crate) struct ImageNode {
    pinhole: Point,
    depth: u32,
    kind: ImageKind,
}

/// The node kinds an [`Image`] can be.
///
/// Leaf geometry is stored centered on the local origin. Combinator
/// variants store the layout derived when they were built, such as the
/// translation applied to each child.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum ImageKind {
    /// Nothing; a 0x0 image.
    Empty,
    /// Axis-aligned rectangle.
    Rectangle {
        /// Horizontal extent.
        width: f64,
        /// Vertical extent.
        height: f64,
        /// Fill or outline.
        mode: OutlineMode,
        /// Paint color.
        color: Color,
    },
    /// Axis-aligned ellipse.
    Ellipse {
        /// Horizontal diameter.
        width: f64,
        /// Vertical diameter.
        height: f64,
        /// Fill or outline.
        mode: OutlineMode,
        /// Paint color.
        color: Color,
    },
    /// Segment from `-end / 2` to `end / 2`.
    Line {
        /// Offset from the start point to the end point.
        end: IntPoint,
        /// Pen color.
        color: Color,
    },
    /// Closed polygon.
    Polygon {
        /// How the vertices were produced.
        shape: PolygonKind,
        /// Vertices, recentred so their box is centered on the origin.
        vertices: Arc<[Point]>,
        /// Fill or outline.
        mode: OutlineMode,
        /// Paint color.
        color: Color,
    },
    /// A `{points/skip}` star polygon.
    StarPolygon {
        /// Circumradius.
        radius: f64,
        /// Number of vertices on the circle.
        points: u32,
        /// Step between connected vertices.
        skip: u32,
        /// Vertices of every closed component, one component after another.
        vertices: Arc<[Point]>,
        /// Number of vertices in each component.
        component_len: usize,
        /// Fill or outline.
        mode: OutlineMode,
        /// Paint color.
        color: Color,
    },
    /// Pie slice sweeping counterclockwise from the positive x axis.
    Wedge {
        /// Radius.
        radius: f64,
        /// Sweep in degrees, in `(0, 360]`.
        angle: f64,
        /// Position of the circle center in the local frame.
        center: Point,
        /// Fill or outline.
        mode: OutlineMode,
        /// Paint color.
        color: Color,
    },
    /// A single line of text.
    Text {
        /// The string.
        text: Arc<str>,
        /// Requested font.
        font: FontSpec,
        /// Extent measured at construction.
        extent: TextExtent,
        /// Text color.
        color: Color,
    },
    /// Decoded image file.
    FileImage {
        /// Canonical path of the file.
        path: Arc<Path>,
        /// Modification time observed at load.
        ///
        /// When the platform reports none, the pixels take its place in
        /// equality and hashing.
        modified: Option<SystemTime>,
        /// Decoded pixels.
        data: RasterData,
    },
    /// Raster built from a [`PixelBuffer`](crate::PixelBuffer).
    PixelImage {
        /// The pixels.
        data: RasterData,
    },
    /// Two images stacked, `top` drawn over `bottom`.
    Overlay {
        /// Image drawn last.
        top: Image,
        /// Image drawn first.
        bottom: Image,
        /// Horizontal alignment.
        align_x: AlignX,
        /// Vertical alignment.
        align_y: AlignY,
        /// Horizontal shift of `bottom` after alignment.
        dx: f64,
        /// Vertical shift of `bottom` after alignment.
        dy: f64,
        /// Translation applied to `top`.
        top_offset: Vec2,
        /// Translation applied to `bottom`.
        bottom_offset: Vec2,
    },
    /// Two images side by side.
    Beside {
        /// Image on the left.
        left: Image,
        /// Image on the right.
        right: Image,
        /// Vertical alignment.
        align_y: AlignY,
        /// Translation applied to `left`.
        left_offset: Vec2,
        /// Translation applied to `right`.
        right_offset: Vec2,
    },
    /// Two images one above the other.
    Above {
        /// Upper image.
        top: Image,
        /// Lower image.
        bottom: Image,
        /// Horizontal alignment.
        align_x: AlignX,
        /// Translation applied to `top`.
        top_offset: Vec2,
        /// Translation applied to `bottom`.
        bottom_offset: Vec2,
    },
    /// A rectangular window onto a child.
    Crop {
        /// Cropped image.
        child: Image,
        /// Left edge of the window, measured from the child's left edge.
        x: f64,
        /// Top edge of the window, measured from the child's top edge.
        y: f64,
        /// Window width.
        width: f64,
        /// Window height.
        height: f64,
        /// Translation applied to `child`.
        child_offset: Vec2,
    },
    /// A child with its bounding box outlined.
    Frame {
        /// Framed image.
        child: Image,
        /// Outline color.
        color: Color,
        /// The child's box, which the outline traces.
        outline: BoundingBox,
    },
    /// A child that reports a different extent.
    Phantom {
        /// Drawn image.
        child: Image,
        /// Reported width.
        width: f64,
        /// Reported height.
        height: f64,
    },
    /// A child rotated clockwise on screen.
    Rotate {
        /// Rotated image.
        child: Image,
        /// Angle in degrees.
        degrees: f64,
        /// Rotation followed by the recentring translation.
        transform: Affine,
    },
    /// A child scaled about its origin.
    Scale {
        /// Scaled image.
        child: Image,
        /// Horizontal factor.
        sx: f64,
        /// Vertical factor.
        sy: f64,
    },
    /// A child sheared about its origin.
    Shear {
        /// Sheared image.
        child: Image,
        /// Horizontal shear factor.
        sx: f64,
        /// Vertical shear factor.
        sy: f64,
        /// Shear followed by the recentring translation.
        transform: Affine,
    },
    /// A child drawn from a display list recorded once.
    Frozen {
        /// The image that was recorded.
        child: Image,
        /// The child's box.
        bounds: BoundingBox,
        /// Recorded drawing of `child`.
        recording: Recording,
    },
    /// A child with a marker drawn at its pinhole.
    VisiblePinhole {
        /// Marked image.
        child: Image,
        /// Marker color.
        color: Color,
    },
}

impl ImageKind {
    /// Child images, in drawing order.
    pub(crate) fn children(&self) -> SmallVec<[&Image; 2]> {
        match self {
            Self::Overlay { top, bottom, .. } => smallvec![bottom, top],
            Self::Beside { left, right, .. } => smallvec![left, right],
            Self::Above { top, bottom, .. } => smallvec![top, bottom],
            Self::Crop { child, .. }
            | Self::Frame { child, .. }
            | Self::Phantom { child, .. }
            | Self::Rotate { child, .. }
            | Self::Scale { child, .. }
            | Self::Shear { child, .. }
            | Self::Frozen { child, .. }
            | Self::VisiblePinhole { child, .. } => smallvec![child],
            Self::Empty
            | Self::Rectangle { .. }
            | Self::Ellipse { .. }
            | Self::Line { .. }
            | Self::Polygon { .. }
            | Self::StarPolygon { .. }
            | Self::Wedge { .. }
            | Self::Text { .. }
            | Self::FileImage { .. }
            | Self::PixelImage { .. } => SmallVec::new(),
        }
    }

    /// Child images with the transform from each child's frame into this
    /// node's frame, in drawing order.
    pub(crate) fn child_transforms(&self) -> SmallVec<[(&Image, Affine); 2]> {
        match self {
            Self::Overlay {
                top,
                bottom,
                top_offset,
                bottom_offset,
                ..
            } => smallvec![
                (bottom, Affine::translate(*bottom_offset)),
                (top, Affine::translate(*top_offset)),
            ],
            Self::Beside {
                left,
                right,
                left_offset,
                right_offset,
                ..
            } => smallvec![
                (left, Affine::translate(*left_offset)),
                (right, Affine::translate(*right_offset)),
            ],
            Self::Above {
                top,
                bottom,
                top_offset,
                bottom_offset,
                ..
            } => smallvec![
                (top, Affine::translate(*top_offset)),
                (bottom, Affine::translate(*bottom_offset)),
            ],
            Self::Crop {
                child,
                child_offset,
                ..
            } => smallvec![(child, Affine::translate(*child_offset))],
            Self::Rotate {
                child, transform, ..
            }
            | Self::Shear {
                child, transform, ..
            } => smallvec![(child, *transform)],
            Self::Scale { child, sx, sy } => {
                smallvec![(child, Affine::scale_non_uniform(*sx, *sy))]
            }
            Self::Frame { child, .. }
            | Self::Phantom { child, .. }
            | Self::Frozen { child, .. }
            | Self::VisiblePinhole { child, .. } => smallvec![(child, Affine::IDENTITY)],
            _ => SmallVec::new(),
        }
    }

    /// Move the children out, leaving a leaf behind.
    fn take_children(&mut self) -> SmallVec<[Image; 2]> {
        match core::mem::replace(self, Self::Empty) {
            Self::Overlay { top, bottom, .. } | Self::Above { top, bottom, .. } => {
                smallvec![top, bottom]
            }
            Self::Beside { left, right, .. } => smallvec![left, right],
            Self::Crop { child, .. }
            | Self::Frame { child, .. }
            | Self::Phantom { child, .. }
            | Self::Rotate { child, .. }
            | Self::Scale { child, .. }
            | Self::Shear { child, .. }
            | Self::Frozen { child, .. }
            | Self::VisiblePinhole { child, .. } => smallvec![child],
            _ => SmallVec::new(),
        }
    }

    /// Name of the node kind as shown by [`Image::to_indented_string`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Rectangle { .. } => "Rectangle",
            Self::Ellipse { .. } => "Ellipse",
            Self::Line { .. } => "Line",
            Self::Polygon { .. } => "Polygon",
            Self::StarPolygon { .. } => "StarPolygon",
            Self::Wedge { .. } => "Wedge",
            Self::Text { .. } => "Text",
            Self::FileImage { .. } => "FileImage",
            Self::PixelImage { .. } => "PixelImage",
            Self::Overlay { .. } => "Overlay",
            Self::Beside { .. } => "Beside",
            Self::Above { .. } => "Above",
            Self::Crop { .. } => "Crop",
            Self::Frame { .. } => "Frame",
            Self::Phantom { .. } => "Phantom",
            Self::Rotate { .. } => "Rotate",
            Self::Scale { .. } => "Scale",
            Self::Shear { .. } => "Shear",
            Self::Frozen { .. } => "Frozen",
            Self::VisiblePinhole { .. } => "VisiblePinhole",
        }
    }
}

impl Drop for ImageNode {
    fn drop(&mut self) {
        if self.depth <= STACK_SAFE_DEPTH {
            return;
        }
        // Detach children so that no drop nests deeper than one level.
        let mut pending: Vec<Image> = self.kind.take_children().into_vec();
        while let Some(image) = pending.pop() {
            if let Some(mut node) = Arc::into_inner(image.0) {
                pending.extend(node.kind.take_children());
            }
        }
    }
}

impl Image {
    /// Wrap `kind` with the pinhole at the local origin.
    pub(crate) fn from_kind(kind: ImageKind) -> Self {
        Self::with_pinhole(kind, Point::ORIGIN)
    }

    pub(crate) fn with_pinhole(kind: ImageKind, pinhole: Point) -> Self {
        let depth = kind
            .children()
            .iter()
            .map(|child| child.depth())
            .max()
            .map_or(1, |deepest| deepest.saturating_add(1));
        Self(Arc::new(ImageNode {
            pinhole,
            depth,
            kind,
        }))
    }

    /// The alignment anchor, in the local frame.
    pub fn pinhole(&self) -> Point {
        self.0.pinhole
    }

    /// `1 + max(child depths)`; leaves have depth 1.
    pub fn depth(&self) -> u32 {
        self.0.depth
    }

    /// The node kind and its fields.
    pub fn kind(&self) -> &ImageKind {
        &self.0.kind
    }

    /// Name of the node kind, such as `"Rectangle"` or `"Overlay"`.
    pub fn kind_name(&self) -> &'static str {
        self.0.kind.name()
    }

    /// Returns `true` if both handles refer to the same node.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Horizontal extent of the bounding box.
    pub fn width(&self) -> f64 {
        self.bounding_box().width()
    }

    /// Vertical extent of the bounding box.
    pub fn height(&self) -> f64 {
        self.bounding_box().height()
    }

    /// The tight box in the local frame.
    ///
    /// Memoized per node; the memo never keeps the node alive.
    pub fn bounding_box(&self) -> BoundingBox {
        let cache = BoundsCache::global();
        if let Some(bounds) = cache.get(self) {
            return bounds;
        }
        let bounds = bounds::resolve(self, Affine::IDENTITY);
        cache.insert(self, bounds);
        bounds
    }

    /// The tight box of this image drawn under `transform`.
    ///
    /// Always recomputed; only the identity-transform box is memoized.
    pub fn bounding_box_with(&self, transform: Affine) -> BoundingBox {
        if transform == Affine::IDENTITY {
            return self.bounding_box();
        }
        bounds::resolve(self, transform)
    }

    /// The same image with its pinhole at `pinhole`.
    ///
    /// Both coordinates must be finite.
    pub fn move_pinhole_to(&self, pinhole: impl Into<Point>) -> Result<Self> {
        let pinhole = pinhole.into();
        let pinhole = Point::new(
            error::finite("x", pinhole.x)?,
            error::finite("y", pinhole.y)?,
        );
        Ok(Self::with_pinhole(self.kind().clone(), pinhole))
    }

    /// The same image with its pinhole moved by (`dx`, `dy`).
    pub fn move_pinhole(&self, dx: f64, dy: f64) -> Result<Self> {
        let offset = Vec2::new(error::finite("dx", dx)?, error::finite("dy", dy)?);
        self.move_pinhole_to(self.pinhole() + offset)
    }

    /// The same image with its pinhole at the center of its box.
    #[must_use]
    pub fn center_pinhole(&self) -> Self {
        Self::with_pinhole(self.kind().clone(), self.bounding_box().center())
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Children are summarized, never walked.
        f.debug_struct("Image")
            .field("kind", &self.kind_name())
            .field("depth", &self.depth())
            .field("pinhole", &self.pinhole())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_indented_string("", 2))
    }
}

/// 8-bit RGBA form of a color; comparisons, hashing, and printing use it.
pub(crate) fn rgba(color: Color) -> [u8; 4] {
    let c = color.to_rgba8();
    [c.r, c.g, c.b, c.a]
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::color::palette::css;

    fn rect() -> Image {
        Image::rectangle(20.0, 10.0, OutlineMode::Solid, css::BLUE).unwrap()
    }

    #[test]
    fn leaves_have_depth_one() {
        assert_eq!(rect().depth(), 1);
        assert_eq!(Image::empty().depth(), 1);
    }

    #[test]
    fn depth_is_one_more_than_deepest_child() {
        let a = rect().scale(2.0).unwrap().scale(2.0).unwrap();
        assert_eq!(a.depth(), 3);
        let b = a.beside(&rect());
        assert_eq!(b.depth(), 4);
    }

    #[test]
    fn move_pinhole_is_idempotent() {
        let moved = rect().move_pinhole_to((3.0, -4.0)).unwrap();
        assert_eq!(moved.pinhole(), Point::new(3.0, -4.0));
        assert_eq!(moved.move_pinhole_to((3.0, -4.0)).unwrap(), moved);
        assert_ne!(moved, rect(), "pinhole takes part in equality");
    }

    #[test]
    fn move_pinhole_is_relative() {
        let moved = rect()
            .move_pinhole(1.5, 2.0)
            .and_then(|image| image.move_pinhole(1.5, 0.0))
            .unwrap();
        assert_eq!(moved.pinhole(), Point::new(3.0, 2.0));
        // Geometry is unchanged.
        assert_eq!(moved.bounding_box(), rect().bounding_box());
    }

    #[test]
    fn non_finite_pinholes_are_rejected() {
        let image = rect();
        for bad in [
            Point::new(f64::NAN, 0.0),
            Point::new(0.0, f64::INFINITY),
            Point::new(f64::NEG_INFINITY, f64::NAN),
        ] {
            assert!(
                matches!(
                    image.move_pinhole_to(bad),
                    Err(crate::ImageError::InvalidArgument { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!(image.move_pinhole(f64::NAN, 0.0).is_err());
        let far = image.move_pinhole_to((f64::MAX, 0.0)).unwrap();
        assert!(far.move_pinhole(f64::MAX, 0.0).is_err(), "overflow to infinity");
        assert_eq!(image.move_pinhole(0.0, 0.0).unwrap(), image);
    }

    #[test]
    fn center_pinhole_uses_box_center() {
        let image = rect().move_pinhole_to((4.0, 4.0)).unwrap();
        assert_eq!(image.center_pinhole().pinhole(), Point::ORIGIN);
    }

    #[test]
    fn bounding_box_is_centered() {
        let bb = rect().bounding_box();
        assert_eq!(bb, BoundingBox::new(-10.0, -5.0, 10.0, 5.0));
        assert_eq!(rect().width(), 20.0);
        assert_eq!(rect().height(), 10.0);
    }

    #[test]
    fn transformed_box_is_not_memoized_as_identity() {
        let image = rect();
        let scaled = image.bounding_box_with(Affine::scale(2.0));
        assert_eq!(scaled, BoundingBox::new(-20.0, -10.0, 20.0, 10.0));
        assert_eq!(image.bounding_box(), BoundingBox::new(-10.0, -5.0, 10.0, 5.0));
    }

    #[test]
    fn debug_is_a_summary() {
        let image = rect().frame(css::BLACK);
        let text = format!("{image:?}");
        assert!(text.starts_with("Image { kind: \"Frame\""), "{text}");
        assert!(!text.contains("Rectangle"), "children are not walked: {text}");
    }

    #[test]
    fn dropping_a_deep_chain_does_not_overflow() {
        let mut image = rect();
        for _ in 0..100_000 {
            image = image.scale(1.0).unwrap();
        }
        assert_eq!(image.depth(), 100_001);
        drop(image);
    }

    #[test]
    fn dropping_keeps_shared_children_alive() {
        let shared = rect();
        let mut image = shared.clone();
        for _ in 0..(STACK_SAFE_DEPTH * 2) {
            image = image.scale(1.0).unwrap();
        }
        drop(image);
        assert_eq!(shared.width(), 20.0);
        assert_eq!(shared.kind_name(), "Rectangle");
    }
}
