// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vello CPU rasterization for [`worldimage`] pictures.
//!
//! [`VelloCpuCanvas`] implements [`Canvas`] on top of the sparse-strips
//! [`vello_cpu::RenderContext`]. [`rasterize`] renders an image at its
//! natural size into straight-alpha RGBA8 pixels, and [`SaveImage`] writes
//! those pixels to a PNG file.
//!
//! Saving is best effort: failures come back as a diagnostic string and are
//! also logged, never as a structured error.
//!
//! Text is drawn from glyph outlines when [`RasterOptions::font`] holds font
//! bytes. Without a font, text runs are skipped.

#![deny(unsafe_code)]

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kurbo::{Affine, BezPath, PathEl, Rect};
use log::{debug, warn};
use peniko::{Color, ImageAlphaType, ImageData, ImageFormat, ImageSampler};
use skrifa::instance::{LocationRef, Size};
use skrifa::metrics::GlyphMetrics;
use skrifa::outline::OutlinePen;
use skrifa::{FontRef, MetadataProvider};
use vello_cpu::kurbo::{
    Affine as CpuAffine, BezPath as CpuBezPath, Point as CpuPoint, Rect as CpuRect, Stroke,
};
use vello_cpu::{Image as CpuImage, ImageSource, Pixmap, RenderContext, RenderMode, RenderSettings};
use worldimage::{Canvas, Image, Primitive, RasterData, TextRun};

/// Flattening tolerance used when no other is configured.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// Width of outlines and lines, in local units.
const PEN_WIDTH: f64 = 1.0;

fn affine_to_cpu(xf: Affine) -> CpuAffine {
    CpuAffine::new(xf.as_coeffs())
}

fn rect_to_cpu(rect: Rect) -> CpuRect {
    CpuRect::new(rect.x0, rect.y0, rect.x1, rect.y1)
}

fn path_to_cpu(path: &BezPath) -> CpuBezPath {
    let p = |pt: kurbo::Point| CpuPoint::new(pt.x, pt.y);
    let mut out = CpuBezPath::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(a) => out.move_to(p(a)),
            PathEl::LineTo(a) => out.line_to(p(a)),
            PathEl::QuadTo(a, b) => out.quad_to(p(a), p(b)),
            PathEl::CurveTo(a, b, c) => out.curve_to(p(a), p(b), p(c)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

/// Settings for [`rasterize`] and [`SaveImage::save_to_file_with`].
#[derive(Clone, Debug)]
pub struct RasterOptions {
    /// Color painted under the image; `None` leaves the canvas transparent.
    pub background: Option<Color>,
    /// Font bytes used for every text run. Text is skipped without one.
    pub font: Option<Arc<[u8]>>,
    /// Curve flattening tolerance, in device pixels.
    pub tolerance: f64,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            background: None,
            font: None,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// A [`Canvas`] drawing into a `vello_cpu` render context.
pub struct VelloCpuCanvas<'ctx> {
    /// Underlying Vello CPU render context to draw into.
    pub ctx: &'ctx mut RenderContext,
    transform: Affine,
    font: Option<Arc<[u8]>>,
    tolerance: f64,
    clips: u32,
}

impl core::fmt::Debug for VelloCpuCanvas<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VelloCpuCanvas")
            .field("transform", &self.transform)
            .field("has_font", &self.font.is_some())
            .field("tolerance", &self.tolerance)
            .field("clips", &self.clips)
            .finish_non_exhaustive()
    }
}

impl<'ctx> VelloCpuCanvas<'ctx> {
    /// Create a canvas over `ctx` with the identity transform.
    pub fn new(ctx: &'ctx mut RenderContext, options: &RasterOptions) -> Self {
        ctx.set_transform(CpuAffine::IDENTITY);
        ctx.set_stroke(Stroke::new(PEN_WIDTH));
        Self {
            ctx,
            transform: Affine::IDENTITY,
            font: options.font.clone(),
            tolerance: options.tolerance,
            clips: 0,
        }
    }

    /// Pop any clips left open, so the context can be rendered.
    pub fn finish(&mut self) {
        while self.clips > 0 {
            self.ctx.pop_layer();
            self.clips -= 1;
        }
    }

    fn fill_text(&mut self, font: &[u8], run: &TextRun, color: Color) {
        let Ok(font_ref) = FontRef::new(font) else {
            debug!("skipping text {:?}: font does not parse", run.text);
            return;
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "font sizes are small; skrifa works in f32"
        )]
        let size = Size::new(run.font.size as f32);
        let charmap = font_ref.charmap();
        let metrics = GlyphMetrics::new(&font_ref, size, LocationRef::default());
        let outlines = font_ref.outline_glyphs();

        let mut pen = GlyphPen::default();
        let mut advance = 0.0_f64;
        for ch in run.text.chars() {
            let Some(glyph) = charmap.map(ch) else {
                advance += run.font.size * 0.6;
                continue;
            };
            if let Some(outline) = outlines.get(glyph) {
                pen.offset = (run.origin.x + advance, run.origin.y);
                if outline.draw(size, &mut pen).is_err() {
                    debug!("skipping glyph {ch:?}: outline failed to draw");
                }
            }
            advance += f64::from(metrics.advance_width(glyph).unwrap_or(0.0));
        }
        if pen.path.elements().is_empty() {
            return;
        }
        self.ctx.set_paint(color);
        self.ctx.fill_path(&pen.path);
    }
}

/// Collects glyph outlines into one path, flipping y to screen orientation.
#[derive(Default)]
struct GlyphPen {
    path: CpuBezPath,
    offset: (f64, f64),
}

impl GlyphPen {
    fn at(&self, x: f32, y: f32) -> CpuPoint {
        CpuPoint::new(self.offset.0 + f64::from(x), self.offset.1 - f64::from(y))
    }
}

impl OutlinePen for GlyphPen {
    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.at(x, y);
        self.path.move_to(p);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.at(x, y);
        self.path.line_to(p);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (c, p) = (self.at(x1, y1), self.at(x, y));
        self.path.quad_to(c, p);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (c1, c2, p) = (self.at(x1, y1), self.at(x2, y2), self.at(x, y));
        self.path.curve_to(c1, c2, p);
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}

impl Canvas for VelloCpuCanvas<'_> {
    fn transform(&self) -> Affine {
        self.transform
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
        self.ctx.set_transform(affine_to_cpu(transform));
    }

    fn fill(&mut self, primitive: &Primitive, color: Color) {
        if primitive.is_open() {
            self.stroke(primitive, color);
            return;
        }
        self.ctx.set_paint(color);
        match primitive {
            Primitive::Rect(rect) => self.ctx.fill_rect(&rect_to_cpu(*rect)),
            other => self
                .ctx
                .fill_path(&path_to_cpu(&other.to_path(self.tolerance))),
        }
    }

    fn stroke(&mut self, primitive: &Primitive, color: Color) {
        self.ctx.set_paint(color);
        match primitive {
            Primitive::Rect(rect) => self.ctx.stroke_rect(&rect_to_cpu(*rect)),
            other => self
                .ctx
                .stroke_path(&path_to_cpu(&other.to_path(self.tolerance))),
        }
    }

    fn draw_text(&mut self, run: &TextRun, color: Color) {
        match self.font.clone() {
            Some(font) => self.fill_text(&font, run, color),
            None => debug!("skipping text {:?}: no font configured", run.text),
        }
    }

    fn draw_raster(&mut self, raster: &RasterData, dest: Rect) {
        if raster.width() == 0 || raster.height() == 0 {
            return;
        }
        let image_data = ImageData {
            data: peniko::Blob::from(raster.pixels().to_vec()),
            format: ImageFormat::Rgba8,
            alpha_type: ImageAlphaType::Alpha,
            width: raster.width(),
            height: raster.height(),
        };
        let image_paint = CpuImage {
            image: ImageSource::from_peniko_image_data(&image_data),
            sampler: ImageSampler::default(),
        };
        let (w, h) = (f64::from(raster.width()), f64::from(raster.height()));
        let local = Affine::translate(dest.origin().to_vec2())
            * Affine::scale_non_uniform(dest.width() / w, dest.height() / h);
        self.ctx.set_paint(image_paint);
        self.ctx.set_transform(affine_to_cpu(self.transform * local));
        self.ctx.fill_rect(&CpuRect::new(0.0, 0.0, w, h));
        self.ctx.set_transform(affine_to_cpu(self.transform));
    }

    fn push_clip(&mut self, rect: Rect) {
        self.ctx
            .push_clip_layer(&path_to_cpu(&Primitive::Rect(rect).to_path(self.tolerance)));
        self.clips += 1;
    }

    fn pop_clip(&mut self) {
        if self.clips > 0 {
            self.ctx.pop_layer();
            self.clips -= 1;
        }
    }
}

/// Pixels produced by [`rasterize`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rasterized {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Row-major straight-alpha RGBA8.
    pub pixels: Vec<u8>,
}

impl Rasterized {
    /// The RGBA8 bytes at (`x`, `y`), if inside the raster.
    pub fn pixel(&self, x: u16, y: u16) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (usize::from(y) * usize::from(self.width) + usize::from(x)) * 4;
        let p = self.pixels.get(i..i + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }
}

/// Render `image` at its natural, untransformed size.
///
/// The raster covers the image's bounding box, rounded up to whole pixels,
/// with the box's top-left corner at pixel (0, 0).
pub fn rasterize(image: &Image, options: &RasterOptions) -> Result<Rasterized, String> {
    let bounds = image.bounding_box();
    let width = pixel_extent("width", bounds.width())?;
    let height = pixel_extent("height", bounds.height())?;

    let settings = RenderSettings {
        render_mode: RenderMode::OptimizeSpeed,
        ..RenderSettings::default()
    };
    let mut ctx = RenderContext::new_with(width, height, settings);
    if let Some(background) = options.background {
        ctx.set_paint(background);
        ctx.fill_rect(&CpuRect::new(0.0, 0.0, f64::from(width), f64::from(height)));
    }

    let mut canvas = VelloCpuCanvas::new(&mut ctx, options);
    canvas.set_transform(Affine::translate((-bounds.min_x, -bounds.min_y)));
    image.draw(&mut canvas);
    canvas.finish();

    let mut pixmap = Pixmap::new(width, height);
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);
    let unpremul = pixmap.take_unpremultiplied();
    let mut pixels = Vec::with_capacity(unpremul.len() * 4);
    for p in unpremul {
        pixels.extend_from_slice(&[p.r, p.g, p.b, p.a]);
    }
    Ok(Rasterized {
        width,
        height,
        pixels,
    })
}

fn pixel_extent(name: &str, extent: f64) -> Result<u16, String> {
    let pixels = extent.ceil();
    if !(1.0..=f64::from(u16::MAX)).contains(&pixels) {
        return Err(format!(
            "cannot rasterize: {name} {extent} is outside 1..={} pixels",
            u16::MAX
        ));
    }
    #[allow(
        clippy::cast_possible_truncation,
        reason = "range checked against u16 above"
    )]
    Ok(pixels as u16)
}

fn write_png(path: &Path, raster: &Rasterized) -> Result<(), String> {
    let file = File::create(path).map_err(|err| err.to_string())?;
    let mut encoder = png::Encoder::new(
        BufWriter::new(file),
        u32::from(raster.width),
        u32::from(raster.height),
    );
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().map_err(|err| err.to_string())?;
    writer
        .write_image_data(&raster.pixels)
        .map_err(|err| err.to_string())?;
    writer.finish().map_err(|err| err.to_string())
}

/// Save images as PNG files.
pub trait SaveImage {
    /// Rasterize with default options and write a PNG to `path`.
    ///
    /// Returns the written path, or a diagnostic message on failure.
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<PathBuf, String> {
        self.save_to_file_with(path, &RasterOptions::default())
    }

    /// Rasterize with `options` and write a PNG to `path`.
    fn save_to_file_with(
        &self,
        path: impl AsRef<Path>,
        options: &RasterOptions,
    ) -> Result<PathBuf, String>;
}

impl SaveImage for Image {
    fn save_to_file_with(
        &self,
        path: impl AsRef<Path>,
        options: &RasterOptions,
    ) -> Result<PathBuf, String> {
        let path = path.as_ref();
        let saved = rasterize(self, options).and_then(|raster| write_png(path, &raster));
        match saved {
            Ok(()) => Ok(path.to_path_buf()),
            Err(err) => {
                warn!("cannot save image to {}: {err}", path.display());
                Err(format!("cannot save image to {}: {err}", path.display()))
            }
        }
    }
}
