// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text images and the text-metrics facility they are measured with.
//!
//! A text image is measured once, when it is built: its box is
//! `advance x (ascent + descent)` and is centered on the local origin like
//! every other leaf. Measuring goes through a [`TextMetrics`] provider. The
//! process-wide provider defaults to [`ApproxMetrics`] and can be replaced
//! once with [`install_text_metrics`]; with the `fonts` feature,
//! [`SkrifaMetrics`] measures against a real font file.

use std::sync::{Arc, OnceLock};

use kurbo::Point;
use peniko::Color;

use crate::error::{self, Result};
use crate::image::{Image, ImageKind};

/// Slant and weight of a font.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontStyle {
    /// Upright, normal weight.
    #[default]
    Regular,
    /// Upright, bold weight.
    Bold,
    /// Slanted, normal weight.
    Italic,
    /// Slanted, bold weight.
    BoldItalic,
}

impl FontStyle {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::BoldItalic => "bold-italic",
        }
    }

    fn is_bold(self) -> bool {
        matches!(self, Self::Bold | Self::BoldItalic)
    }
}

/// Font selection for a text image.
#[derive(Clone, Debug, PartialEq)]
pub struct FontSpec {
    /// Family name. Interpretation is up to the metrics provider and canvas.
    pub family: Arc<str>,
    /// Em size in local units.
    pub size: f64,
    /// Weight and slant.
    pub style: FontStyle,
}

impl FontSpec {
    /// The default sans-serif family at `size`.
    pub fn sans(size: f64) -> Self {
        Self {
            family: Arc::from("sans-serif"),
            size,
            style: FontStyle::Regular,
        }
    }

    /// Same family and size with another style.
    #[must_use]
    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }
}

/// Measured extent of a run of text, all values non-negative.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TextExtent {
    /// Horizontal advance of the whole run.
    pub advance: f64,
    /// Distance from the baseline up to the top of the box.
    pub ascent: f64,
    /// Distance from the baseline down to the bottom of the box.
    pub descent: f64,
}

impl TextExtent {
    /// Height of the text box.
    pub fn height(&self) -> f64 {
        self.ascent + self.descent
    }
}

/// A string placed on a baseline, as handed to [`Canvas::draw_text`](crate::Canvas::draw_text).
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    /// The text.
    pub text: Arc<str>,
    /// Requested font.
    pub font: FontSpec,
    /// Start of the baseline in local coordinates.
    pub origin: Point,
    /// Extent the image was laid out with.
    pub extent: TextExtent,
}

/// Text measuring facility.
pub trait TextMetrics: Send + Sync {
    /// Measure `text` rendered in `font`.
    fn measure(&self, text: &str, font: &FontSpec) -> TextExtent;
}

/// A font-free estimate: every character advances `0.6em` (`0.66em` when
/// bold), ascent is `0.8em` and descent `0.2em`.
#[derive(Copy, Clone, Debug, Default)]
pub struct ApproxMetrics;

impl TextMetrics for ApproxMetrics {
    fn measure(&self, text: &str, font: &FontSpec) -> TextExtent {
        let per_char = if font.style.is_bold() { 0.66 } else { 0.6 };
        let chars = text.chars().count() as f64;
        TextExtent {
            advance: per_char * font.size * chars,
            ascent: 0.8 * font.size,
            descent: 0.2 * font.size,
        }
    }
}

static INSTALLED: OnceLock<Box<dyn TextMetrics>> = OnceLock::new();
static APPROX: ApproxMetrics = ApproxMetrics;

/// Install the process-wide metrics provider.
///
/// Returns `false` if a provider was already installed; the first one wins.
pub fn install_text_metrics(metrics: Box<dyn TextMetrics>) -> bool {
    INSTALLED.set(metrics).is_ok()
}

/// The process-wide metrics provider.
pub fn text_metrics() -> &'static dyn TextMetrics {
    match INSTALLED.get() {
        Some(metrics) => metrics.as_ref(),
        None => &APPROX,
    }
}

#[cfg(feature = "fonts")]
pub use self::skrifa_metrics::SkrifaMetrics;

#[cfg(feature = "fonts")]
mod skrifa_metrics {
    use std::sync::Arc;

    use skrifa::instance::{LocationRef, Size};
    use skrifa::metrics::GlyphMetrics;
    use skrifa::{FontRef, MetadataProvider};

    use super::{FontSpec, TextExtent, TextMetrics};
    use crate::error::{ImageError, Result};

    /// Metrics from a single font face loaded with `skrifa`.
    ///
    /// The family and style of the requested [`FontSpec`] are ignored; every
    /// run is measured with this face at the requested size. Characters the
    /// font does not map advance by `0.6em`.
    #[derive(Clone)]
    pub struct SkrifaMetrics {
        data: Arc<[u8]>,
    }

    impl core::fmt::Debug for SkrifaMetrics {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            f.debug_struct("SkrifaMetrics")
                .field("bytes", &self.data.len())
                .finish()
        }
    }

    impl SkrifaMetrics {
        /// Wrap raw font bytes, validating that they parse as a font.
        pub fn new(data: impl Into<Arc<[u8]>>) -> Result<Self> {
            let data = data.into();
            if let Err(err) = FontRef::new(&data) {
                return Err(ImageError::invalid("font", format!("unreadable font: {err}")));
            }
            Ok(Self { data })
        }

        /// The raw font bytes.
        pub fn data(&self) -> &Arc<[u8]> {
            &self.data
        }
    }

    impl TextMetrics for SkrifaMetrics {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "font sizes are small; skrifa works in f32"
        )]
        fn measure(&self, text: &str, font: &FontSpec) -> TextExtent {
            let size_px = font.size as f32;
            let Ok(font_ref) = FontRef::new(&self.data) else {
                return super::ApproxMetrics.measure(text, font);
            };
            let size = Size::new(size_px);
            let charmap = font_ref.charmap();
            let glyphs = GlyphMetrics::new(&font_ref, size, LocationRef::default());
            let advance: f32 = text
                .chars()
                .map(|ch| {
                    charmap
                        .map(ch)
                        .and_then(|gid| glyphs.advance_width(gid))
                        .unwrap_or(size_px * 0.6)
                })
                .sum();
            let metrics = font_ref.metrics(size, LocationRef::default());
            TextExtent {
                advance: f64::from(advance),
                ascent: f64::from(metrics.ascent).max(0.0),
                descent: f64::from(-metrics.descent).max(0.0),
            }
        }
    }
}

impl Image {
    /// Text in the default sans-serif font at `size`.
    pub fn text(text: &str, size: f64, color: Color) -> Result<Self> {
        Self::text_with(text, FontSpec::sans(size), color)
    }

    /// Text in `font`, measured with the process-wide [`text_metrics`].
    pub fn text_with(text: &str, font: FontSpec, color: Color) -> Result<Self> {
        Self::text_measured(text, font, color, text_metrics())
    }

    /// Text in `font`, measured with `metrics`.
    pub fn text_measured(
        text: &str,
        font: FontSpec,
        color: Color,
        metrics: &dyn TextMetrics,
    ) -> Result<Self> {
        error::positive("size", font.size)?;
        let extent = metrics.measure(text, &font);
        for (name, value) in [
            ("advance", extent.advance),
            ("ascent", extent.ascent),
            ("descent", extent.descent),
        ] {
            error::non_negative(name, value)?;
        }
        Ok(Self::from_kind(ImageKind::Text {
            text: Arc::from(text),
            font,
            extent,
            color,
        }))
    }
}

/// Baseline start for a text box centered on the origin.
pub(crate) fn baseline_origin(extent: &TextExtent) -> Point {
    Point::new(-extent.advance / 2.0, (extent.ascent - extent.descent) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::color::palette::css;

    struct Fixed;

    impl TextMetrics for Fixed {
        fn measure(&self, _text: &str, _font: &FontSpec) -> TextExtent {
            TextExtent {
                advance: 30.0,
                ascent: 9.0,
                descent: 3.0,
            }
        }
    }

    #[test]
    fn approx_metrics_scale_with_size_and_length() {
        let extent = ApproxMetrics.measure("abcd", &FontSpec::sans(10.0));
        assert!((extent.advance - 24.0).abs() < 1e-12, "{extent:?}");
        assert!((extent.height() - 10.0).abs() < 1e-12, "{extent:?}");
        let bold = ApproxMetrics.measure("abcd", &FontSpec::sans(10.0).with_style(FontStyle::Bold));
        assert!(bold.advance > extent.advance, "bold is wider");
    }

    #[test]
    fn text_box_is_centered() {
        let image = Image::text_measured("hi", FontSpec::sans(12.0), css::BLACK, &Fixed).unwrap();
        assert_eq!(image.width(), 30.0);
        assert_eq!(image.height(), 12.0);
        let bb = image.bounding_box();
        assert_eq!((bb.min_x, bb.min_y), (-15.0, -6.0));
    }

    #[test]
    fn baseline_sits_ascent_below_top() {
        let extent = Fixed.measure("", &FontSpec::sans(1.0));
        let origin = baseline_origin(&extent);
        assert_eq!(origin, Point::new(-15.0, 3.0));
        // top of box = baseline - ascent
        assert_eq!(origin.y - extent.ascent, -6.0);
    }

    #[test]
    fn non_positive_size_is_rejected() {
        assert!(Image::text("x", 0.0, css::BLACK).is_err());
        assert!(Image::text("x", f64::INFINITY, css::BLACK).is_err());
    }

    #[test]
    fn same_text_is_equal() {
        let a = Image::text("hello", 14.0, css::NAVY).unwrap();
        let b = Image::text("hello", 14.0, css::NAVY).unwrap();
        let c = Image::text("hellO", 14.0, css::NAVY).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
