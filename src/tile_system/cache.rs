use bevy::math::IVec2;
use bevy::prelude::*;
use std::collections::{BTreeMap, HashMap};

use crate::tile_system::types::{ReferenceTile, TileImage, TileKey, WrapMode};

struct CachedTile {
    image: TileImage,
    /// Insertion order, used to pick the oldest tile among equals on eviction
    sequence: u64,
}

/// Decoded tile images indexed by zoom, column and row.
///
/// Entries are immutable: the first image stored for a key wins. `version`
/// increases on every mutation and is the only change signal consumers need.
#[derive(Resource, Default)]
pub struct TileImageCache {
    levels: BTreeMap<u8, HashMap<i64, HashMap<i64, CachedTile>>>,
    version: u64,
    len: usize,
    next_sequence: u64,
    /// Tile count `prune` trims down to; unbounded when `None`
    capacity: Option<usize>,
}

impl TileImageCache {
    /// Create a new empty, unbounded cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache that `prune` keeps at or below `capacity` tiles
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    /// Insert a tile, unless one is already stored for `key`.
    ///
    /// Only normalized keys are accepted; anything that addresses no real tile
    /// is dropped. Returns whether the image was stored.
    pub fn insert(&mut self, key: TileKey, image: TileImage) -> bool {
        if !key.is_valid(u8::MAX) {
            warn!("Refusing to cache tile with invalid key {}", key);
            return false;
        }
        let column = self.levels.entry(key.z).or_default().entry(key.x).or_default();
        if column.contains_key(&key.y) {
            return false;
        }

        column.insert(
            key.y,
            CachedTile {
                image,
                sequence: self.next_sequence,
            },
        );
        self.next_sequence += 1;
        self.len += 1;
        self.version += 1;
        true
    }

    pub fn get(&self, key: &TileKey) -> Option<&TileImage> {
        self.levels
            .get(&key.z)
            .and_then(|columns| columns.get(&key.x))
            .and_then(|rows| rows.get(&key.y))
            .map(|tile| &tile.image)
    }

    pub fn has(&self, key: &TileKey) -> bool {
        self.get(key).is_some()
    }

    /// Zoom levels holding at least one tile, ascending
    pub fn available_zoom_levels(&self) -> Vec<u8> {
        self.levels
            .iter()
            .filter(|(_, columns)| !columns.is_empty())
            .map(|(zoom, _)| *zoom)
            .collect()
    }

    /// Zoom levels at which the tile `offset` cells away from the reference
    /// tile is cached. The offset is applied in tiles of each level.
    pub fn available_zoom_levels_near(&self, reference: &ReferenceTile, offset: IVec2, wrap: WrapMode) -> Vec<u8> {
        self.available_zoom_levels()
            .into_iter()
            .filter(|&zoom| {
                reference
                    .key_at(zoom, offset)
                    .normalized(wrap, u8::MAX)
                    .is_some_and(|key| self.has(&key))
            })
            .collect()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Get the number of tiles in the cache
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Evict tiles until the cache fits its capacity.
    ///
    /// Tiles whose zoom is farthest from `current_zoom` go first, oldest first
    /// among those. Returns the number of evicted tiles.
    pub fn prune(&mut self, current_zoom: f64) -> usize {
        let Some(capacity) = self.capacity else {
            return 0;
        };
        if self.len <= capacity {
            return 0;
        }

        let mut candidates: Vec<(f64, u64, TileKey)> = Vec::with_capacity(self.len);
        for (&z, columns) in &self.levels {
            let distance = (z as f64 - current_zoom).abs();
            for (&x, rows) in columns {
                for (&y, tile) in rows {
                    candidates.push((distance, tile.sequence, TileKey::new(z, x, y)));
                }
            }
        }
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        let excess = self.len - capacity;
        for (_, _, key) in candidates.into_iter().take(excess) {
            self.remove(&key);
        }
        self.version += 1;

        debug!("Evicted {} tiles (capacity {})", excess, capacity);
        excess
    }

    fn remove(&mut self, key: &TileKey) {
        let Some(columns) = self.levels.get_mut(&key.z) else {
            return;
        };
        if let Some(rows) = columns.get_mut(&key.x) {
            if rows.remove(&key.y).is_some() {
                self.len -= 1;
            }
            if rows.is_empty() {
                columns.remove(&key.x);
            }
        }
        if columns.is_empty() {
            self.levels.remove(&key.z);
        }
    }
}
