// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Worldimage: immutable, composable 2D images.
//!
//! A picture is a tree of [`Image`] nodes. Leaves are shapes, text and
//! rasters; combinators place, clip, frame and transform their children.
//! Nothing is ever mutated: every operation returns a new image, and
//! subtrees are shared freely.
//!
//! # Core concepts
//!
//! - **Local frames and pinholes**: every image is laid out centered on its
//!   own origin and carries a [pinhole](Image::pinhole), an anchor point
//!   used by pinhole alignment.
//! - **Alignment**: [`AlignX`] and [`AlignY`] pick, per axis, which edge,
//!   centerline, or pinhole of each child is brought into coincidence by
//!   [`Image::overlay_align`], [`Image::beside_align`] and
//!   [`Image::above_align`].
//! - **Geometry**: [`Image::bounding_box`] is tight under rotation and shear,
//!   and memoized per node without keeping nodes alive.
//! - **Rendering**: [`Image::draw`] emits primitives into any [`Canvas`].
//!   [`RecordingCanvas`] captures them for tests and frozen images; the
//!   `worldimage_vello_cpu` crate rasterizes them.
//! - **Depth**: drawing, comparing, hashing, printing, measuring and
//!   dropping all work on trees of any depth without growing the native
//!   stack per level; see [`STACK_SAFE_DEPTH`].
//!
//! # Example
//!
//! ```
//! use worldimage::peniko::color::palette::css;
//! use worldimage::{AlignX, AlignY, Image, OutlineMode, RecordingCanvas};
//!
//! let sun = Image::circle(20.0, OutlineMode::Solid, css::GOLD)?;
//! let sky = Image::rectangle(120.0, 80.0, OutlineMode::Solid, css::SKY_BLUE)?;
//! let scene = Image::overlay_align(AlignX::Right, AlignY::Top, &sun, &sky);
//! assert_eq!(scene.width(), 120.0);
//!
//! let tilted = scene.rotate(90.0)?;
//! assert_eq!(tilted.height(), 120.0);
//!
//! let mut canvas = RecordingCanvas::new();
//! tilted.draw(&mut canvas);
//! assert_eq!(canvas.ops().len(), 2);
//! # Ok::<(), worldimage::ImageError>(())
//! ```
//!
//! # Features
//!
//! - `fonts` (enabled by default): [`SkrifaMetrics`], text measurement from
//!   real font files.

mod bounds;
mod cache;
mod canvas;
mod combinators;
mod error;
mod geometry;
mod image;
mod raster;
mod record;
mod shapes;
mod text;
mod traverse;

pub use kurbo;
pub use peniko;

pub use canvas::{Canvas, CanvasExt, OutlineMode, Primitive};
pub use combinators::{AlignX, AlignY};
pub use error::{ImageError, Result};
pub use geometry::{BoundingBox, GEOMETRY_EPSILON, IntPoint, rotation, shear};
pub use image::{Image, ImageKind, STACK_SAFE_DEPTH};
pub use raster::{PixelBuffer, RasterData};
pub use record::{CanvasOp, Recorded, Recording, RecordingCanvas};
pub use shapes::PolygonKind;
#[cfg(feature = "fonts")]
pub use text::SkrifaMetrics;
pub use text::{
    ApproxMetrics, FontSpec, FontStyle, TextExtent, TextMetrics, TextRun, install_text_metrics,
    text_metrics,
};
