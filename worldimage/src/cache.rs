// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identity-keyed memo of identity-transform bounding boxes.
//!
//! Entries are keyed by node address and hold only a weak reference, so the
//! memo never extends a node's lifetime. A weak reference also pins the
//! allocation, so an address cannot be reused by a new node while its old
//! entry remains. Dead entries are pruned in bulk whenever the map grows past
//! a high-water mark.

use std::sync::{Arc, LazyLock, Mutex, Weak};

use hashbrown::HashMap;
use log::debug;

use crate::geometry::BoundingBox;
use crate::image::{Image, ImageNode};

const INITIAL_HIGH_WATER: usize = 1024;

struct Entry {
    node: Weak<ImageNode>,
    bounds: BoundingBox,
}

struct State {
    entries: HashMap<usize, Entry>,
    high_water: usize,
}

/// Process-wide bounding box memo.
pub(crate) struct BoundsCache {
    state: Mutex<State>,
}

static GLOBAL: LazyLock<BoundsCache> = LazyLock::new(BoundsCache::new);

fn key(image: &Image) -> usize {
    Arc::as_ptr(&image.0).addr()
}

impl BoundsCache {
    fn new() -> Self {
        Self {
            state: Mutex::new(State {
                entries: HashMap::new(),
                high_water: INITIAL_HIGH_WATER,
            }),
        }
    }

    pub(crate) fn global() -> &'static Self {
        &GLOBAL
    }

    /// Cached box for `image`, if any. A poisoned lock reads as a miss.
    pub(crate) fn get(&self, image: &Image) -> Option<BoundingBox> {
        let state = self.state.lock().ok()?;
        let entry = state.entries.get(&key(image))?;
        (Weak::as_ptr(&entry.node) == Arc::as_ptr(&image.0)).then_some(entry.bounds)
    }

    pub(crate) fn insert(&self, image: &Image, bounds: BoundingBox) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.entries.len() >= state.high_water {
            let before = state.entries.len();
            state.entries.retain(|_, entry| entry.node.strong_count() > 0);
            let live = state.entries.len();
            state.high_water = INITIAL_HIGH_WATER.max(live * 2);
            debug!(
                "pruned {} dead bounds entries, {live} live, next prune at {}",
                before - live,
                state.high_water
            );
        }
        state.entries.insert(
            key(image),
            Entry {
                node: Arc::downgrade(&image.0),
                bounds,
            },
        );
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.state.lock().map_or(0, |state| state.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::OutlineMode;
    use peniko::color::palette::css;

    fn square(side: f64) -> Image {
        Image::square(side, OutlineMode::Solid, css::GREEN).unwrap()
    }

    #[test]
    fn hit_after_insert() {
        let cache = BoundsCache::new();
        let image = square(4.0);
        assert_eq!(cache.get(&image), None);
        let bounds = BoundingBox::centered(4.0, 4.0);
        cache.insert(&image, bounds);
        assert_eq!(cache.get(&image), Some(bounds));
        assert_eq!(cache.get(&image.clone()), Some(bounds), "clones share the node");
    }

    #[test]
    fn equal_but_distinct_nodes_do_not_share_entries() {
        let cache = BoundsCache::new();
        let a = square(4.0);
        let b = square(4.0);
        cache.insert(&a, BoundingBox::centered(4.0, 4.0));
        assert_eq!(cache.get(&b), None);
    }

    #[test]
    fn cache_does_not_keep_nodes_alive() {
        let cache = BoundsCache::new();
        let image = square(1.0);
        cache.insert(&image, BoundingBox::centered(1.0, 1.0));
        let weak = Arc::downgrade(&image.0);
        drop(image);
        assert_eq!(weak.strong_count(), 0);
    }

    #[test]
    fn dead_entries_are_pruned() {
        let cache = BoundsCache::new();
        for _ in 0..INITIAL_HIGH_WATER {
            let image = square(1.0);
            cache.insert(&image, BoundingBox::centered(1.0, 1.0));
        }
        assert_eq!(cache.len(), INITIAL_HIGH_WATER);
        let survivor = square(2.0);
        cache.insert(&survivor, BoundingBox::centered(2.0, 2.0));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&survivor), Some(BoundingBox::centered(2.0, 2.0)));
    }

    #[test]
    fn global_cache_serves_bounding_box() {
        let image = square(3.0);
        let first = image.bounding_box();
        assert_eq!(BoundsCache::global().get(&image), Some(first));
        assert_eq!(image.bounding_box(), first);
    }
}
