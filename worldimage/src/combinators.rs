// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Combinators: alignment, stacking, cropping, framing, and transforms.
//!
//! ## Calling forms
//!
//! The plain stacking forms are methods, so a chain reads in placement
//! order: `a.overlay(&b)` puts `a` over `b`, `a.beside(&b)` puts `a` on the
//! left, `a.above(&b)` puts `a` on top. The `_align` and `_offset` forms are
//! associated functions that take the alignment first and both images after
//! it, in the same order:
//!
//! ```
//! # use worldimage::{AlignX, AlignY, Image, OutlineMode};
//! # use worldimage::peniko::color::palette::css;
//! let a = Image::square(10.0, OutlineMode::Solid, css::RED)?;
//! let b = Image::circle(8.0, OutlineMode::Outline, css::BLUE)?;
//! assert_eq!(
//!     a.overlay(&b),
//!     Image::overlay_align(AlignX::Pinhole, AlignY::Pinhole, &a, &b)
//! );
//! assert_eq!(a.beside(&b), Image::beside_align(AlignY::Center, &a, &b));
//! assert_eq!(a.above(&b), Image::above_align(AlignX::Center, &a, &b));
//! # Ok::<(), worldimage::ImageError>(())
//! ```
//!
//! ## Alignment
//!
//! Alignment picks one anchor per axis on each child:
//!
//! - `Left`/`Top` and `Right`/`Bottom` anchor on the matching edge of the
//!   child's bounding box.
//! - `Center`/`Middle` anchor on the box's centerline. The two names align
//!   identically but remain distinct values.
//! - `Pinhole` anchors on the child's pinhole.
//!
//! The anchors are brought to coincide, the bottom image is shifted by the
//! requested offset, and both children are then translated so the combined
//! box is centered on the new node's origin.
//!
//! ## Transforms
//!
//! [`Image::rotate`], [`Image::scale`] and [`Image::shear`] transform about
//! the child's local origin. Rotation and shear can move the box off-center,
//! so they append a recentring translation. The pinhole follows the
//! transform.

use kurbo::{Affine, Point, Vec2};
use peniko::Color;

use crate::error::{self, ImageError, Result};
use crate::geometry::{self, BoundingBox};
use crate::image::{Image, ImageKind};
use crate::record::RecordingCanvas;

/// Horizontal alignment anchor.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum AlignX {
    /// Left edge.
    Left,
    /// Vertical centerline.
    #[default]
    Center,
    /// Vertical centerline; same anchor as `Center`.
    Middle,
    /// Right edge.
    Right,
    /// Pinhole x coordinate.
    Pinhole,
}

/// Vertical alignment anchor.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum AlignY {
    /// Top edge.
    Top,
    /// Horizontal centerline.
    #[default]
    Center,
    /// Horizontal centerline; same anchor as `Center`.
    Middle,
    /// Bottom edge.
    Bottom,
    /// Pinhole y coordinate.
    Pinhole,
}

impl AlignX {
    fn anchor(self, bounds: &BoundingBox, pinhole: Point) -> f64 {
        match self {
            Self::Left => bounds.min_x,
            Self::Right => bounds.max_x,
            Self::Center | Self::Middle => bounds.center().x,
            Self::Pinhole => pinhole.x,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Middle => "middle",
            Self::Right => "right",
            Self::Pinhole => "pinhole",
        }
    }
}

impl AlignY {
    fn anchor(self, bounds: &BoundingBox, pinhole: Point) -> f64 {
        match self {
            Self::Top => bounds.min_y,
            Self::Bottom => bounds.max_y,
            Self::Center | Self::Middle => bounds.center().y,
            Self::Pinhole => pinhole.y,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Center => "center",
            Self::Middle => "middle",
            Self::Bottom => "bottom",
            Self::Pinhole => "pinhole",
        }
    }
}

/// Translations that center the union of two placed boxes on the origin.
fn recentre_pair(
    first: &BoundingBox,
    first_at: Vec2,
    second: &BoundingBox,
    second_at: Vec2,
) -> (Vec2, Vec2, Vec2) {
    let placed = first.translate(first_at).union(second.translate(second_at));
    let shift = placed.center().to_vec2();
    (first_at - shift, second_at - shift, shift)
}

impl Image {
    /// `self` over `bottom`, pinholes aligned.
    #[must_use]
    pub fn overlay(&self, bottom: &Self) -> Self {
        Self::overlay_layout(AlignX::Pinhole, AlignY::Pinhole, self, Vec2::ZERO, bottom)
    }

    /// `top` over `bottom` with the given alignment.
    pub fn overlay_align(align_x: AlignX, align_y: AlignY, top: &Self, bottom: &Self) -> Self {
        Self::overlay_layout(align_x, align_y, top, Vec2::ZERO, bottom)
    }

    /// `top` over `bottom`, centers aligned, with `bottom` moved by (`dx`, `dy`).
    pub fn overlay_offset(top: &Self, dx: f64, dy: f64, bottom: &Self) -> Result<Self> {
        Self::overlay_offset_align(AlignX::Center, AlignY::Center, top, dx, dy, bottom)
    }

    /// `top` over `bottom` with the given alignment, then `bottom` moved by
    /// (`dx`, `dy`).
    pub fn overlay_offset_align(
        align_x: AlignX,
        align_y: AlignY,
        top: &Self,
        dx: f64,
        dy: f64,
        bottom: &Self,
    ) -> Result<Self> {
        let offset = Vec2::new(error::finite("dx", dx)?, error::finite("dy", dy)?);
        Ok(Self::overlay_layout(align_x, align_y, top, offset, bottom))
    }

    /// Overlay a list, the first image on top.
    pub fn overlay_all(images: &[Self]) -> Result<Self> {
        let (last, rest) = images.split_last().ok_or(ImageError::Missing("images"))?;
        Ok(rest
            .iter()
            .rev()
            .fold(last.clone(), |below, above| above.overlay(&below)))
    }

    fn overlay_layout(
        align_x: AlignX,
        align_y: AlignY,
        top: &Self,
        offset: Vec2,
        bottom: &Self,
    ) -> Self {
        let top_box = top.bounding_box();
        let bottom_box = bottom.bounding_box();
        let top_at = -Vec2::new(
            align_x.anchor(&top_box, top.pinhole()),
            align_y.anchor(&top_box, top.pinhole()),
        );
        let bottom_at = offset
            - Vec2::new(
                align_x.anchor(&bottom_box, bottom.pinhole()),
                align_y.anchor(&bottom_box, bottom.pinhole()),
            );
        let (top_offset, bottom_offset, shift) =
            recentre_pair(&top_box, top_at, &bottom_box, bottom_at);

        // With both axes on the pinhole and no offset, both pinholes sit at
        // the origin before recentring; keep that shared point exactly.
        let exact_pinhole = align_x == AlignX::Pinhole
            && align_y == AlignY::Pinhole
            && offset == Vec2::ZERO;
        let pinhole = if exact_pinhole {
            Point::ORIGIN - shift
        } else {
            Point::ORIGIN
        };

        Self::with_pinhole(
            ImageKind::Overlay {
                top: top.clone(),
                bottom: bottom.clone(),
                align_x,
                align_y,
                dx: offset.x,
                dy: offset.y,
                top_offset,
                bottom_offset,
            },
            pinhole,
        )
    }

    /// `self` to the left of `right`, centers aligned vertically.
    #[must_use]
    pub fn beside(&self, right: &Self) -> Self {
        Self::beside_align(AlignY::Center, self, right)
    }

    /// `left` to the left of `right` with the given vertical alignment.
    pub fn beside_align(align_y: AlignY, left: &Self, right: &Self) -> Self {
        let left_box = left.bounding_box();
        let right_box = right.bounding_box();
        let left_at = Vec2::new(-left_box.max_x, -align_y.anchor(&left_box, left.pinhole()));
        let right_at = Vec2::new(
            -right_box.min_x,
            -align_y.anchor(&right_box, right.pinhole()),
        );
        let (left_offset, right_offset, _) =
            recentre_pair(&left_box, left_at, &right_box, right_at);
        Self::from_kind(ImageKind::Beside {
            left: left.clone(),
            right: right.clone(),
            align_y,
            left_offset,
            right_offset,
        })
    }

    /// A row of images, left to right.
    pub fn beside_all(images: &[Self]) -> Result<Self> {
        Self::beside_all_align(AlignY::Center, images)
    }

    /// A row of images with the given vertical alignment.
    pub fn beside_all_align(align_y: AlignY, images: &[Self]) -> Result<Self> {
        let (first, rest) = images.split_first().ok_or(ImageError::Missing("images"))?;
        Ok(rest.iter().fold(first.clone(), |row, next| {
            Self::beside_align(align_y, &row, next)
        }))
    }

    /// `self` above `bottom`, centers aligned horizontally.
    #[must_use]
    pub fn above(&self, bottom: &Self) -> Self {
        Self::above_align(AlignX::Center, self, bottom)
    }

    /// `top` above `bottom` with the given horizontal alignment.
    pub fn above_align(align_x: AlignX, top: &Self, bottom: &Self) -> Self {
        let top_box = top.bounding_box();
        let bottom_box = bottom.bounding_box();
        let top_at = Vec2::new(-align_x.anchor(&top_box, top.pinhole()), -top_box.max_y);
        let bottom_at = Vec2::new(
            -align_x.anchor(&bottom_box, bottom.pinhole()),
            -bottom_box.min_y,
        );
        let (top_offset, bottom_offset, _) =
            recentre_pair(&top_box, top_at, &bottom_box, bottom_at);
        Self::from_kind(ImageKind::Above {
            top: top.clone(),
            bottom: bottom.clone(),
            align_x,
            top_offset,
            bottom_offset,
        })
    }

    /// A column of images, top to bottom.
    pub fn above_all(images: &[Self]) -> Result<Self> {
        Self::above_all_align(AlignX::Center, images)
    }

    /// A column of images with the given horizontal alignment.
    pub fn above_all_align(align_x: AlignX, images: &[Self]) -> Result<Self> {
        let (first, rest) = images.split_first().ok_or(ImageError::Missing("images"))?;
        Ok(rest.iter().fold(first.clone(), |column, next| {
            Self::above_align(align_x, &column, next)
        }))
    }

    /// The `width x height` window whose top-left corner is (`x`, `y`)
    /// measured from the top-left corner of this image's box.
    ///
    /// The window may extend past the image; the excess is transparent.
    pub fn crop(&self, x: f64, y: f64, width: f64, height: f64) -> Result<Self> {
        let x = error::finite("x", x)?;
        let y = error::finite("y", y)?;
        let width = error::non_negative("width", width)?;
        let height = error::non_negative("height", height)?;
        let bounds = self.bounding_box();
        let window_center = Point::new(
            bounds.min_x + x + width / 2.0,
            bounds.min_y + y + height / 2.0,
        );
        let child_offset = -window_center.to_vec2();
        Ok(Self::with_pinhole(
            ImageKind::Crop {
                child: self.clone(),
                x,
                y,
                width,
                height,
                child_offset,
            },
            self.pinhole() + child_offset,
        ))
    }

    /// This image with a one-unit outline around its box.
    #[must_use]
    pub fn frame(&self, color: Color) -> Self {
        Self::with_pinhole(
            ImageKind::Frame {
                child: self.clone(),
                color,
                outline: self.bounding_box(),
            },
            self.pinhole(),
        )
    }

    /// This image, reporting a `width x height` box centered on its origin.
    ///
    /// Drawing is unaffected; only layout sees the new extent.
    pub fn phantom(&self, width: f64, height: f64) -> Result<Self> {
        Ok(Self::with_pinhole(
            ImageKind::Phantom {
                child: self.clone(),
                width: error::non_negative("width", width)?,
                height: error::non_negative("height", height)?,
            },
            self.pinhole(),
        ))
    }

    /// This image rotated `degrees` clockwise on screen.
    pub fn rotate(&self, degrees: f64) -> Result<Self> {
        let degrees = error::finite("degrees", degrees)?;
        let transform = self.recentred(geometry::rotation(degrees));
        Ok(Self::with_pinhole(
            ImageKind::Rotate {
                child: self.clone(),
                degrees,
                transform,
            },
            transform * self.pinhole(),
        ))
    }

    /// This image scaled uniformly by `factor`.
    pub fn scale(&self, factor: f64) -> Result<Self> {
        self.scale_xy(factor, factor)
    }

    /// This image scaled by `sx` horizontally and `sy` vertically.
    pub fn scale_xy(&self, sx: f64, sy: f64) -> Result<Self> {
        let sx = error::positive("sx", sx)?;
        let sy = error::positive("sy", sy)?;
        let pinhole = self.pinhole();
        Ok(Self::with_pinhole(
            ImageKind::Scale {
                child: self.clone(),
                sx,
                sy,
            },
            Point::new(pinhole.x * sx, pinhole.y * sy),
        ))
    }

    /// This image sheared by `x' = x + sx * y`, `y' = sy * x + y`.
    pub fn shear(&self, sx: f64, sy: f64) -> Result<Self> {
        let sx = error::finite("sx", sx)?;
        let sy = error::finite("sy", sy)?;
        let transform = self.recentred(geometry::shear(sx, sy));
        Ok(Self::with_pinhole(
            ImageKind::Shear {
                child: self.clone(),
                sx,
                sy,
                transform,
            },
            transform * self.pinhole(),
        ))
    }

    /// Record this image's drawing once and replay the recording afterwards.
    #[must_use]
    pub fn freeze(&self) -> Self {
        let mut canvas = RecordingCanvas::new();
        self.draw(&mut canvas);
        Self::with_pinhole(
            ImageKind::Frozen {
                child: self.clone(),
                bounds: self.bounding_box(),
                recording: canvas.finish(),
            },
            self.pinhole(),
        )
    }

    /// This image with a small cross drawn at its pinhole.
    #[must_use]
    pub fn with_visible_pinhole(&self, color: Color) -> Self {
        Self::with_pinhole(
            ImageKind::VisiblePinhole {
                child: self.clone(),
                color,
            },
            self.pinhole(),
        )
    }

    /// `linear` followed by the translation that recenters this image's box.
    fn recentred(&self, linear: Affine) -> Affine {
        let center = self.bounding_box_with(linear).center();
        Affine::translate(-center.to_vec2()) * linear
    }
}
