// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stack-safe traversals: drawing, extensional equality and hashing, and
//! indented printing.
//!
//! Each traversal has a single per-node local step that inspects only the
//! node's own fields and hands back its children as pending work. Two
//! drivers consume that step:
//!
//! - a nested driver that recurses, used when the tree is no deeper than
//!   [`STACK_SAFE_DEPTH`](crate::STACK_SAFE_DEPTH);
//! - a worklist driver that pops pending work off a `Vec`, used for deeper
//!   trees.
//!
//! Because both drivers share the step, they produce identical results.

mod draw;
mod equality;
mod print;
