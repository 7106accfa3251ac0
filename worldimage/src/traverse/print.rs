// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt::Write as _;

use kurbo::Point;
use peniko::Color;
use smallvec::{SmallVec, smallvec};

use crate::geometry::{fmt_point, fmt_real};
use crate::image::{Image, ImageKind, STACK_SAFE_DEPTH, rgba};

/// One line of a node's dump.
enum Field<'a> {
    Value(&'static str, String),
    Child(&'static str, &'a Image),
}

type Fields<'a> = SmallVec<[Field<'a>; 8]>;

/// Pending print work.
enum Item<'a> {
    Node {
        label: Option<&'static str>,
        image: &'a Image,
        level: usize,
    },
    Value {
        name: &'static str,
        value: String,
        level: usize,
    },
    Close {
        level: usize,
    },
}

struct Printer<'p> {
    out: String,
    prefix: &'p str,
    indent: usize,
}

impl Image {
    /// A deterministic multi-line dump of the tree.
    ///
    /// Every line starts with `prefix`. Each field is on its own line,
    /// indented `indent` spaces deeper than the node that owns it. Nested
    /// images open with `name: Kind {` and close with `}`. The pinhole is
    /// always the last field. There is no trailing newline.
    pub fn to_indented_string(&self, prefix: &str, indent: usize) -> String {
        let mut printer = Printer {
            out: String::new(),
            prefix,
            indent,
        };
        if self.depth() <= STACK_SAFE_DEPTH {
            printer.node_nested(None, self, 0);
        } else {
            printer.node_worklist(self);
        }
        printer.out
    }
}

impl Printer<'_> {
    fn line(&mut self, level: usize, text: core::fmt::Arguments<'_>) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        self.out.push_str(self.prefix);
        for _ in 0..level * self.indent {
            self.out.push(' ');
        }
        // Writing into a `String` cannot fail.
        let _ = self.out.write_fmt(text);
    }

    fn open(&mut self, label: Option<&str>, image: &Image, level: usize) {
        match label {
            Some(label) => self.line(level, format_args!("{label}: {} {{", image.kind_name())),
            None => self.line(level, format_args!("{} {{", image.kind_name())),
        }
    }

    fn node_nested(&mut self, label: Option<&str>, image: &Image, level: usize) {
        self.open(label, image, level);
        for field in fields(image) {
            match field {
                Field::Value(name, value) => {
                    self.line(level + 1, format_args!("{name}: {value}"));
                }
                Field::Child(name, child) => self.node_nested(Some(name), child, level + 1),
            }
        }
        self.line(level, format_args!("}}"));
    }

    fn node_worklist(&mut self, image: &Image) {
        let mut pending = vec![Item::Node {
            label: None,
            image,
            level: 0,
        }];
        while let Some(item) = pending.pop() {
            match item {
                Item::Node {
                    label,
                    image,
                    level,
                } => {
                    self.open(label, image, level);
                    pending.push(Item::Close { level });
                    let inner = level + 1;
                    pending.extend(fields(image).into_iter().rev().map(|field| match field {
                        Field::Value(name, value) => Item::Value {
                            name,
                            value,
                            level: inner,
                        },
                        Field::Child(name, child) => Item::Node {
                            label: Some(name),
                            image: child,
                            level: inner,
                        },
                    }));
                }
                Item::Value { name, value, level } => {
                    self.line(level, format_args!("{name}: {value}"));
                }
                Item::Close { level } => self.line(level, format_args!("}}")),
            }
        }
    }
}

fn color(c: Color) -> String {
    let [r, g, b, a] = rgba(c);
    format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
}

fn real(name: &'static str, value: f64) -> Field<'static> {
    Field::Value(name, fmt_real(value))
}

fn point(name: &'static str, value: Point) -> Field<'static> {
    Field::Value(name, fmt_point(value))
}

/// The node's fields in print order, pinhole last.
fn fields(image: &Image) -> Fields<'_> {
    let mut fields: Fields<'_> = match image.kind() {
        ImageKind::Empty => SmallVec::new(),
        ImageKind::Rectangle {
            width,
            height,
            mode,
            color: c,
        }
        | ImageKind::Ellipse {
            width,
            height,
            mode,
            color: c,
        } => smallvec![
            real("width", *width),
            real("height", *height),
            Field::Value("mode", mode.name().to_owned()),
            Field::Value("color", color(*c)),
        ],
        ImageKind::Line { end, color: c } => smallvec![
            Field::Value("end", end.to_string()),
            Field::Value("color", color(*c)),
        ],
        ImageKind::Polygon {
            shape,
            vertices,
            mode,
            color: c,
        } => {
            let listed: Vec<String> = vertices.iter().map(|p| fmt_point(*p)).collect();
            smallvec![
                Field::Value("shape", shape.to_string()),
                Field::Value("vertices", format!("[{}]", listed.join(", "))),
                Field::Value("mode", mode.name().to_owned()),
                Field::Value("color", color(*c)),
            ]
        }
        ImageKind::StarPolygon {
            radius,
            points,
            skip,
            mode,
            color: c,
            ..
        } => smallvec![
            real("radius", *radius),
            Field::Value("points", points.to_string()),
            Field::Value("skip", skip.to_string()),
            Field::Value("mode", mode.name().to_owned()),
            Field::Value("color", color(*c)),
        ],
        ImageKind::Wedge {
            radius,
            angle,
            mode,
            color: c,
            ..
        } => smallvec![
            real("radius", *radius),
            real("angle", *angle),
            Field::Value("mode", mode.name().to_owned()),
            Field::Value("color", color(*c)),
        ],
        ImageKind::Text {
            text,
            font,
            color: c,
            ..
        } => smallvec![
            Field::Value("text", format!("{text:?}")),
            Field::Value(
                "font",
                format!(
                    "{} {} {}",
                    font.family,
                    fmt_real(font.size),
                    font.style.name()
                ),
            ),
            Field::Value("color", color(*c)),
        ],
        ImageKind::FileImage { path, data, .. } => smallvec![
            Field::Value("path", path.display().to_string()),
            Field::Value("width", data.width().to_string()),
            Field::Value("height", data.height().to_string()),
        ],
        ImageKind::PixelImage { data } => smallvec![
            Field::Value("width", data.width().to_string()),
            Field::Value("height", data.height().to_string()),
        ],
        ImageKind::Overlay {
            top,
            bottom,
            align_x,
            align_y,
            dx,
            dy,
            ..
        } => smallvec![
            Field::Value("align_x", align_x.name().to_owned()),
            Field::Value("align_y", align_y.name().to_owned()),
            point("offset", Point::new(*dx, *dy)),
            Field::Child("top", top),
            Field::Child("bottom", bottom),
        ],
        ImageKind::Beside {
            left,
            right,
            align_y,
            ..
        } => smallvec![
            Field::Value("align_y", align_y.name().to_owned()),
            Field::Child("left", left),
            Field::Child("right", right),
        ],
        ImageKind::Above {
            top,
            bottom,
            align_x,
            ..
        } => smallvec![
            Field::Value("align_x", align_x.name().to_owned()),
            Field::Child("top", top),
            Field::Child("bottom", bottom),
        ],
        ImageKind::Crop {
            child,
            x,
            y,
            width,
            height,
            ..
        } => smallvec![
            real("x", *x),
            real("y", *y),
            real("width", *width),
            real("height", *height),
            Field::Child("child", child),
        ],
        ImageKind::Frame { child, color: c, .. } => smallvec![
            Field::Value("color", color(*c)),
            Field::Child("child", child),
        ],
        ImageKind::Phantom {
            child,
            width,
            height,
        } => smallvec![
            real("width", *width),
            real("height", *height),
            Field::Child("child", child),
        ],
        ImageKind::Rotate { child, degrees, .. } => {
            smallvec![real("degrees", *degrees), Field::Child("child", child)]
        }
        ImageKind::Scale { child, sx, sy } => smallvec![
            real("x", *sx),
            real("y", *sy),
            Field::Child("child", child),
        ],
        ImageKind::Shear { child, sx, sy, .. } => smallvec![
            real("x", *sx),
            real("y", *sy),
            Field::Child("child", child),
        ],
        ImageKind::Frozen {
            child, recording, ..
        } => smallvec![
            Field::Value("ops", recording.ops().len().to_string()),
            Field::Child("child", child),
        ],
        ImageKind::VisiblePinhole { child, color: c } => smallvec![
            Field::Value("color", color(*c)),
            Field::Child("child", child),
        ],
    };
    fields.push(point("pinhole", image.pinhole()));
    fields
}
