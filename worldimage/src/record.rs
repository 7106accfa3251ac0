// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A [`Canvas`] that records instead of rasterizing.
//!
//! [`RecordingCanvas`] keeps a log of every operation together with the
//! transform that was current when it was issued. It is intended for tests
//! that want to assert on emitted ops, and it backs
//! [`Image::freeze`](crate::Image::freeze), which records a subtree once and
//! replays the resulting [`Recording`] on every later draw.
//!
//! It does **not** rasterize and does not define "golden" rendering.

use std::sync::Arc;

use kurbo::{Affine, Rect};
use peniko::Color;

use crate::canvas::{Canvas, Primitive};
use crate::raster::RasterData;
use crate::text::TextRun;

/// One canvas call.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasOp {
    /// [`Canvas::fill`].
    Fill {
        /// Shape that was filled.
        primitive: Primitive,
        /// Fill color.
        color: Color,
    },
    /// [`Canvas::stroke`].
    Stroke {
        /// Shape that was outlined.
        primitive: Primitive,
        /// Pen color.
        color: Color,
    },
    /// [`Canvas::draw_text`].
    Text {
        /// Text run as positioned by the image.
        run: TextRun,
        /// Text color.
        color: Color,
    },
    /// [`Canvas::draw_raster`].
    Raster {
        /// Pixels that were drawn.
        raster: RasterData,
        /// Destination rectangle.
        dest: Rect,
    },
    /// [`Canvas::push_clip`].
    PushClip(Rect),
    /// [`Canvas::pop_clip`].
    PopClip,
}

/// A recorded op and the transform it was issued under.
#[derive(Clone, Debug, PartialEq)]
pub struct Recorded {
    /// The operation.
    pub op: CanvasOp,
    /// Canvas transform at the time of the call.
    pub transform: Affine,
}

/// Recording canvas.
#[derive(Clone, Debug, Default)]
pub struct RecordingCanvas {
    transform: Affine,
    ops: Vec<Recorded>,
    clip_depth: u32,
}

impl RecordingCanvas {
    /// Create an empty recorder with the identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a slice of recorded ops.
    pub fn ops(&self) -> &[Recorded] {
        &self.ops
    }

    /// Number of clips pushed and not yet popped.
    pub fn clip_depth(&self) -> u32 {
        self.clip_depth
    }

    /// Clears all recorded ops but keeps the current transform.
    pub fn clear(&mut self) {
        self.ops.clear();
        self.clip_depth = 0;
    }

    /// Consume the recorder, producing a shareable [`Recording`].
    pub fn finish(self) -> Recording {
        Recording {
            ops: Arc::from(self.ops),
        }
    }

    fn push(&mut self, op: CanvasOp) {
        self.ops.push(Recorded {
            op,
            transform: self.transform,
        });
    }
}

impl Canvas for RecordingCanvas {
    fn transform(&self) -> Affine {
        self.transform
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    fn fill(&mut self, primitive: &Primitive, color: Color) {
        self.push(CanvasOp::Fill {
            primitive: primitive.clone(),
            color,
        });
    }

    fn stroke(&mut self, primitive: &Primitive, color: Color) {
        self.push(CanvasOp::Stroke {
            primitive: primitive.clone(),
            color,
        });
    }

    fn draw_text(&mut self, run: &TextRun, color: Color) {
        self.push(CanvasOp::Text {
            run: run.clone(),
            color,
        });
    }

    fn draw_raster(&mut self, raster: &RasterData, dest: Rect) {
        self.push(CanvasOp::Raster {
            raster: raster.clone(),
            dest,
        });
    }

    fn push_clip(&mut self, rect: Rect) {
        self.clip_depth += 1;
        self.push(CanvasOp::PushClip(rect));
    }

    fn pop_clip(&mut self) {
        self.clip_depth = self.clip_depth.saturating_sub(1);
        self.push(CanvasOp::PopClip);
    }
}

/// An immutable, shareable list of recorded ops.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recording {
    ops: Arc<[Recorded]>,
}

impl Recording {
    /// The recorded ops.
    pub fn ops(&self) -> &[Recorded] {
        &self.ops
    }

    /// Re-issue every op on `canvas`, with each op's transform prefixed by
    /// `base`. The canvas transform is restored afterwards.
    pub fn replay(&self, canvas: &mut dyn Canvas, base: Affine) {
        let saved = canvas.transform();
        for Recorded { op, transform } in self.ops.iter() {
            canvas.set_transform(base * *transform);
            match op {
                CanvasOp::Fill { primitive, color } => canvas.fill(primitive, *color),
                CanvasOp::Stroke { primitive, color } => canvas.stroke(primitive, *color),
                CanvasOp::Text { run, color } => canvas.draw_text(run, *color),
                CanvasOp::Raster { raster, dest } => canvas.draw_raster(raster, *dest),
                CanvasOp::PushClip(rect) => canvas.push_clip(*rect),
                CanvasOp::PopClip => canvas.pop_clip(),
            }
        }
        canvas.set_transform(saved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::color::palette::css;

    fn unit_rect() -> Primitive {
        Primitive::Rect(Rect::new(0.0, 0.0, 1.0, 1.0))
    }

    #[test]
    fn ops_capture_current_transform() {
        let mut canvas = RecordingCanvas::new();
        canvas.fill(&unit_rect(), css::RED);
        canvas.set_transform(Affine::scale(3.0));
        canvas.stroke(&unit_rect(), css::BLUE);

        let ops = canvas.ops();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].transform, Affine::IDENTITY);
        assert_eq!(ops[1].transform, Affine::scale(3.0));
    }

    #[test]
    fn clip_depth_tracks_push_and_pop() {
        let mut canvas = RecordingCanvas::new();
        canvas.push_clip(Rect::new(0.0, 0.0, 2.0, 2.0));
        canvas.push_clip(Rect::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(canvas.clip_depth(), 2);
        canvas.pop_clip();
        canvas.pop_clip();
        // Extra pops are tolerated.
        canvas.pop_clip();
        assert_eq!(canvas.clip_depth(), 0);
    }

    #[test]
    fn replay_prefixes_base_and_restores() {
        let mut source = RecordingCanvas::new();
        source.set_transform(Affine::translate((1.0, 2.0)));
        source.fill(&unit_rect(), css::GREEN);
        let recording = source.finish();

        let mut target = RecordingCanvas::new();
        target.set_transform(Affine::rotate(0.5));
        recording.replay(&mut target, Affine::scale(2.0));

        assert_eq!(target.transform(), Affine::rotate(0.5));
        assert_eq!(
            target.ops()[0].transform,
            Affine::scale(2.0) * Affine::translate((1.0, 2.0))
        );
    }

    #[test]
    fn empty_recording_replays_nothing() {
        let recording = RecordingCanvas::new().finish();
        let mut target = RecordingCanvas::new();
        recording.replay(&mut target, Affine::IDENTITY);
        assert!(target.ops().is_empty());
    }
}
