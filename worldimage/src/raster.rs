// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster images: decoded files and computed pixel buffers.
//!
//! Pixels are straight-alpha RGBA8, row-major, with no padding. File images
//! are identified by their canonical path and modification time, not by
//! their pixel content, so reloading a file after it changes on disk yields
//! an image that is unequal to the old one even if the bytes coincide.
//! Where the modification time is unavailable, file images compare by path
//! and pixels, and the decode cache always rereads the file.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};
use std::time::SystemTime;

use hashbrown::HashMap;
use log::{trace, warn};
use peniko::Color;
use png::{BitDepth, ColorType, Transformations};

use crate::error::{ImageError, Result};
use crate::image::{Image, ImageKind};

/// Immutable, shared RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RasterData {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl RasterData {
    /// Wrap `pixels`, which must hold exactly `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Result<Self> {
        let pixels = pixels.into();
        let expected = byte_len(width, height);
        if pixels.len() != expected {
            return Err(ImageError::invalid(
                "pixels",
                format!(
                    "expected {expected} bytes for {width}x{height} RGBA8, got {}",
                    pixels.len()
                ),
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major straight-alpha RGBA8 bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Color of the pixel at column `x`, row `y`.
    pub fn get(&self, x: i32, y: i32) -> Result<Color> {
        let index = pixel_index(x, y, self.width, self.height)?;
        let p = &self.pixels[index..index + 4];
        Ok(Color::from_rgba8(p[0], p[1], p[2], p[3]))
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

fn pixel_index(x: i32, y: i32, width: u32, height: u32) -> Result<usize> {
    match (u32::try_from(x), u32::try_from(y)) {
        (Ok(col), Ok(row)) if col < width && row < height => {
            Ok((row as usize * width as usize + col as usize) * 4)
        }
        _ => Err(ImageError::OutOfBounds {
            x,
            y,
            width,
            height,
        }),
    }
}

/// A mutable pixel grid that freezes into an image.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// A fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; byte_len(width, height)],
        }
    }

    /// A buffer with every pixel set to `color`.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let rgba = color.to_rgba8();
        let pixels = [rgba.r, rgba.g, rgba.b, rgba.a]
            .into_iter()
            .cycle()
            .take(byte_len(width, height))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Read a pixel; fails outside `[0, width) x [0, height)`.
    pub fn get_pixel(&self, x: i32, y: i32) -> Result<Color> {
        let index = pixel_index(x, y, self.width, self.height)?;
        let p = &self.pixels[index..index + 4];
        Ok(Color::from_rgba8(p[0], p[1], p[2], p[3]))
    }

    /// Write a pixel; fails outside `[0, width) x [0, height)`.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) -> Result<()> {
        let index = pixel_index(x, y, self.width, self.height)?;
        let rgba = color.to_rgba8();
        self.pixels[index..index + 4].copy_from_slice(&[rgba.r, rgba.g, rgba.b, rgba.a]);
        Ok(())
    }

    /// Freeze the buffer into an immutable raster.
    pub fn into_raster(self) -> RasterData {
        RasterData {
            width: self.width,
            height: self.height,
            pixels: Arc::from(self.pixels),
        }
    }

    /// Freeze the buffer into an image of `width x height` units.
    pub fn into_image(self) -> Image {
        Image::from_raster(self.into_raster())
    }
}

impl Image {
    /// An image showing `raster` at one unit per pixel.
    pub fn from_raster(raster: RasterData) -> Self {
        Self::from_kind(ImageKind::PixelImage { data: raster })
    }

    /// Load a PNG file.
    ///
    /// Returns `None` and logs a warning if the file cannot be resolved,
    /// read, or decoded. Decoded pixels are shared between loads of the same
    /// unchanged file.
    pub fn from_file(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let canonical = match fs::canonicalize(path) {
            Ok(canonical) => canonical,
            Err(err) => {
                warn!("cannot resolve image file {}: {err}", path.display());
                return None;
            }
        };
        let modified = fs::metadata(&canonical)
            .and_then(|meta| meta.modified())
            .ok();
        let data = DECODED.load(&canonical, modified)?;
        Some(Self::from_kind(ImageKind::FileImage {
            path: Arc::from(canonical.as_path()),
            modified,
            data,
        }))
    }

    /// Color of the pixel at (`x`, `y`) of a raster image.
    ///
    /// Fails with [`ImageError::OutOfBounds`] outside the raster and with
    /// [`ImageError::InvalidArgument`] if this is not a raster image.
    pub fn pixel_at(&self, x: i32, y: i32) -> Result<Color> {
        match self.kind() {
            ImageKind::FileImage { data, .. } | ImageKind::PixelImage { data } => data.get(x, y),
            _ => Err(ImageError::invalid(
                "image",
                format!("{} is not a raster image", self.kind_name()),
            )),
        }
    }
}

/// Memoized decodes keyed by canonical path.
struct DecodeCache {
    entries: Mutex<HashMap<PathBuf, (Option<SystemTime>, RasterData)>>,
}

static DECODED: LazyLock<DecodeCache> = LazyLock::new(|| DecodeCache {
    entries: Mutex::new(HashMap::new()),
});

impl DecodeCache {
    fn load(&self, canonical: &Path, modified: Option<SystemTime>) -> Option<RasterData> {
        if let Ok(entries) = self.entries.lock()
            && let Some((stamp, data)) = entries.get(canonical)
            && modified.is_some()
            && *stamp == modified
        {
            trace!("decode cache hit for {}", canonical.display());
            return Some(data.clone());
        }
        trace!("decode cache miss for {}", canonical.display());
        let data = match decode_png(canonical) {
            Ok(data) => data,
            Err(err) => {
                warn!("cannot load image file {}: {err}", canonical.display());
                return None;
            }
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(canonical.to_path_buf(), (modified, data.clone()));
        }
        Some(data)
    }
}

/// Decode a PNG file into straight RGBA8.
pub(crate) fn decode_png(path: &Path) -> core::result::Result<RasterData, String> {
    let file = File::open(path).map_err(|err| err.to_string())?;
    let mut decoder = png::Decoder::new(BufReader::new(file));
    decoder.set_transformations(
        Transformations::EXPAND | Transformations::ALPHA | Transformations::STRIP_16,
    );
    let mut reader = decoder.read_info().map_err(|err| err.to_string())?;
    let mut buf = vec![0_u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).map_err(|err| err.to_string())?;
    buf.truncate(info.buffer_size());

    let pixels = match (info.color_type, info.bit_depth) {
        (ColorType::Rgba, BitDepth::Eight) => buf,
        (ColorType::Rgb, BitDepth::Eight) => buf
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], u8::MAX])
            .collect(),
        (ColorType::GrayscaleAlpha, BitDepth::Eight) => buf
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        (ColorType::Grayscale, BitDepth::Eight) => {
            buf.iter().flat_map(|&g| [g, g, g, u8::MAX]).collect()
        }
        (color, depth) => {
            return Err(format!("unsupported PNG layout {color:?} at {depth:?}"));
        }
    };
    RasterData::new(info.width, info.height, pixels).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::color::palette::css;

    #[test]
    fn pixel_access_is_bounds_checked() {
        let mut buffer = PixelBuffer::new(3, 2);
        buffer.set_pixel(2, 1, css::RED).unwrap();
        assert_eq!(buffer.get_pixel(2, 1).unwrap().to_rgba8(), css::RED.to_rgba8());

        let err = buffer.set_pixel(3, 0, css::RED).unwrap_err();
        assert_eq!(
            err,
            ImageError::OutOfBounds {
                x: 3,
                y: 0,
                width: 3,
                height: 2
            }
        );
        assert!(buffer.get_pixel(0, -1).is_err(), "negative rows are rejected");
    }

    #[test]
    fn frozen_buffer_reports_pixels() {
        let mut buffer = PixelBuffer::filled(4, 4, css::WHITE);
        buffer.set_pixel(0, 0, css::BLACK).unwrap();
        let image = buffer.into_image();
        assert_eq!(image.width(), 4.0);
        assert_eq!(image.height(), 4.0);
        assert_eq!(
            image.pixel_at(0, 0).unwrap().to_rgba8(),
            css::BLACK.to_rgba8()
        );
        assert_eq!(
            image.pixel_at(3, 3).unwrap().to_rgba8(),
            css::WHITE.to_rgba8()
        );
        assert!(image.pixel_at(4, 0).is_err(), "outside the raster");
    }

    #[test]
    fn pixel_images_compare_by_content() {
        let a = PixelBuffer::filled(2, 2, css::TEAL).into_image();
        let b = PixelBuffer::filled(2, 2, css::TEAL).into_image();
        let c = PixelBuffer::filled(2, 2, css::ORANGE).into_image();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn raster_data_checks_length() {
        assert!(RasterData::new(2, 2, vec![0_u8; 15]).is_err());
        assert!(RasterData::new(2, 2, vec![0_u8; 16]).is_ok());
    }

    #[test]
    fn non_raster_has_no_pixels() {
        let image = Image::empty();
        assert!(matches!(
            image.pixel_at(0, 0),
            Err(ImageError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn missing_file_is_none() {
        assert!(Image::from_file("/definitely/not/here.png").is_none());
    }
}
