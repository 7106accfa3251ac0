// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! File-backed rasters: decoding, identity, and reload on modification.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::time::{Duration, SystemTime};

use peniko::color::palette::css;
use worldimage::{CanvasOp, Image, ImageKind, RecordingCanvas};

fn write_png(path: &Path, width: u32, height: u32, color: png::ColorType, data: &[u8]) {
    let file = File::create(path).unwrap();
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(color);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(data).unwrap();
    writer.finish().unwrap();
}

fn checker(path: &Path) {
    #[rustfmt::skip]
    let data = [
        255, 0, 0, 255,   0, 0, 255, 255,
        0, 0, 255, 255,   255, 0, 0, 128,
    ];
    write_png(path, 2, 2, png::ColorType::Rgba, &data);
}

fn set_mtime(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

#[test]
fn loads_pixels_and_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checker.png");
    checker(&path);

    let image = Image::from_file(&path).unwrap();
    assert_eq!(image.width(), 2.0);
    assert_eq!(image.height(), 2.0);
    assert_eq!(image.pixel_at(0, 0).unwrap().to_rgba8(), css::RED.to_rgba8());
    assert_eq!(image.pixel_at(1, 0).unwrap().to_rgba8(), css::BLUE.to_rgba8());
    assert_eq!(image.pixel_at(1, 1).unwrap().to_rgba8().a, 128);
    assert!(image.pixel_at(2, 0).is_err());
}

#[test]
fn rgb_files_become_opaque() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rgb.png");
    write_png(&path, 1, 1, png::ColorType::Rgb, &[10, 20, 30]);
    let image = Image::from_file(&path).unwrap();
    let pixel = image.pixel_at(0, 0).unwrap().to_rgba8();
    assert_eq!((pixel.r, pixel.g, pixel.b, pixel.a), (10, 20, 30, 255));
}

#[test]
fn same_unchanged_file_loads_equal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("same.png");
    checker(&path);
    set_mtime(&path, SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000));

    let first = Image::from_file(&path).unwrap();
    let second = Image::from_file(&path).unwrap();
    assert!(!Image::ptr_eq(&first, &second));
    assert_eq!(first, second);

    // Relative and canonical spellings name the same file.
    let dotted = dir.path().join(".").join("same.png");
    assert_eq!(Image::from_file(dotted).unwrap(), first);
}

#[test]
fn modification_time_is_part_of_identity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("touched.png");
    checker(&path);
    set_mtime(&path, SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000));
    let before = Image::from_file(&path).unwrap();

    // Same bytes, new timestamp.
    set_mtime(&path, SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_600));
    let after = Image::from_file(&path).unwrap();

    let (ImageKind::FileImage { data: a, .. }, ImageKind::FileImage { data: b, .. }) =
        (before.kind(), after.kind())
    else {
        panic!("file loads should build file images");
    };
    assert_eq!(a, b, "pixel content coincides");
    assert_ne!(before, after);
}

#[test]
fn missing_and_corrupt_files_are_absent() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Image::from_file(dir.path().join("nope.png")).is_none());

    let junk = dir.path().join("junk.png");
    fs::write(&junk, b"not a png").unwrap();
    assert!(Image::from_file(&junk).is_none());
}

#[test]
fn draws_as_centered_raster() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("draw.png");
    checker(&path);
    let image = Image::from_file(&path).unwrap();
    let mut canvas = RecordingCanvas::new();
    image.draw(&mut canvas);
    let [recorded] = canvas.ops() else {
        panic!("one raster op expected");
    };
    let CanvasOp::Raster { raster, dest } = &recorded.op else {
        panic!("expected a raster op, got {:?}", recorded.op);
    };
    assert_eq!((raster.width(), raster.height()), (2, 2));
    assert_eq!(*dest, kurbo::Rect::new(-1.0, -1.0, 1.0, 1.0));
}
