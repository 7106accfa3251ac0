// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Images and their process-wide caches shared across threads.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::thread;

use peniko::color::palette::css;
use worldimage::{BoundingBox, Image, OutlineMode, RasterData, Recording};

const THREADS: usize = 8;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn shared_types_are_send_and_sync() {
    assert_send_sync::<Image>();
    assert_send_sync::<RasterData>();
    assert_send_sync::<Recording>();
    assert_send_sync::<BoundingBox>();
}

fn tree(seed: usize) -> Image {
    let side = 2.0 + seed as f64;
    let mut image = Image::rectangle(side, side / 2.0, OutlineMode::Solid, css::RED).unwrap();
    for step in 0..200 {
        let leaf = Image::circle(1.0 + (step % 5) as f64, OutlineMode::Outline, css::BLUE).unwrap();
        image = match step % 3 {
            0 => image.beside(&leaf),
            1 => image.above(&leaf),
            _ => image.rotate(7.0 * seed as f64).unwrap(),
        };
    }
    image
}

#[test]
fn bounding_boxes_agree_across_threads() {
    // Fresh trees on every thread, so each thread fills its own cache entries.
    let expected: Vec<BoundingBox> = (0..THREADS).map(|seed| tree(seed).bounding_box()).collect();
    let results: Vec<Vec<BoundingBox>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    (0..THREADS)
                        .map(|seed| {
                            let image = tree(seed);
                            let first = image.bounding_box();
                            assert_eq!(image.bounding_box(), first, "memo hit matches");
                            first
                        })
                        .collect()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for boxes in results {
        for (actual, expected) in boxes.iter().zip(&expected) {
            assert!(actual.approx_eq(expected), "{actual:?} != {expected:?}");
        }
    }
}

#[test]
fn one_tree_is_queried_from_many_threads() {
    let shared = tree(3);
    let expected = tree(3).bounding_box();
    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                assert!(shared.bounding_box().approx_eq(&expected));
                assert_eq!(shared, tree(3));
            });
        }
    });
}

fn write_png(path: &Path) {
    let file = File::create(path).unwrap();
    let mut encoder = png::Encoder::new(BufWriter::new(file), 2, 1);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().unwrap();
    writer
        .write_image_data(&[255, 0, 0, 255, 0, 0, 255, 255])
        .unwrap();
    writer.finish().unwrap();
}

#[test]
fn concurrent_loads_of_one_file_are_equal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.png");
    write_png(&path);

    let loads: Vec<Image> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| scope.spawn(|| Image::from_file(&path).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let first = &loads[0];
    assert_eq!(first.width(), 2.0);
    assert_eq!(
        first.pixel_at(1, 0).unwrap().to_rgba8(),
        css::BLUE.to_rgba8()
    );
    for image in &loads {
        assert_eq!(image, first);
    }
}
