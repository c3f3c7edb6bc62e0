use bevy::prelude::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

use crate::tile_system::cache::TileImageCache;
use crate::tile_system::grid::ViewportGrid;
use crate::tile_system::loader::{TileLoader, UrlTemplate};
use crate::tile_system::types::{ReferenceTile, TileError, TileImage, TileKey, WrapMode};

/// Cancellation flag shared between a fetch pass and its in-flight load
#[derive(Debug, Clone, Default)]
pub struct FetchToken(Arc<AtomicBool>);

impl FetchToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn same_as(&self, other: &FetchToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A finished load travelling back to the thread that owns the cache
struct FetchOutcome {
    key: TileKey,
    token: FetchToken,
    result: Result<TileImage, TileError>,
}

/// Counters updated from the loader tasks, read by diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: u64,
}

/// Configuration for the fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub url_template: UrlTemplate,
    pub max_zoom: u8,
    /// Maximum number of loads running at once
    pub max_concurrent: usize,
}

/// Requests the visible tiles that are not cached yet.
///
/// Loads run on a tokio runtime; results are applied to the cache only by
/// [`TileFetcher::drain_into`], on the thread that owns the cache.
#[derive(Resource)]
pub struct TileFetcher {
    loader: Arc<dyn TileLoader>,
    runtime: Handle,
    config: FetcherConfig,
    limiter: Arc<Semaphore>,
    /// Keys with a load in flight, each with the token that can retire it
    pending: HashMap<TileKey, FetchToken>,
    /// Keys whose load failed; never requested again this session
    failed: HashSet<TileKey>,
    sender: Sender<FetchOutcome>,
    receiver: Receiver<FetchOutcome>,
    stats: Arc<Mutex<FetchStats>>,
}

impl TileFetcher {
    pub fn new(loader: Arc<dyn TileLoader>, runtime: Handle, config: FetcherConfig) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            loader,
            runtime,
            limiter: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config,
            pending: HashMap::new(),
            failed: HashSet::new(),
            sender,
            receiver,
            stats: Arc::new(Mutex::new(FetchStats::default())),
        }
    }

    /// Start loads for every grid cell at the reference zoom that is missing
    /// from the cache. Returns the number of loads started.
    ///
    /// In-flight loads for keys this pass no longer covers are cancelled.
    pub fn fetch_visible(
        &mut self,
        cache: &TileImageCache,
        reference: &ReferenceTile,
        grid: &ViewportGrid,
        wrap: WrapMode,
    ) -> usize {
        let wanted: Vec<TileKey> = grid
            .cells()
            .iter()
            .filter_map(|&cell| reference.key_at(reference.zoom, cell).normalized(wrap, self.config.max_zoom))
            .collect();

        self.retire_unwanted(&wanted);

        let mut started = 0;
        for key in wanted {
            if cache.has(&key) || self.pending.contains_key(&key) || self.failed.contains(&key) {
                continue;
            }
            self.spawn_load(key);
            started += 1;
        }

        if started > 0 {
            debug!("Started {} tile loads at zoom {}", started, reference.zoom);
        }
        started
    }

    fn retire_unwanted(&mut self, wanted: &[TileKey]) {
        let wanted: HashSet<&TileKey> = wanted.iter().collect();
        let before = self.pending.len();
        self.pending.retain(|key, token| {
            let keep = wanted.contains(key);
            if !keep {
                token.cancel();
            }
            keep
        });

        let retired = before - self.pending.len();
        if retired > 0 {
            self.stats.lock().cancelled += retired as u64;
            debug!("Cancelled {} stale tile loads", retired);
        }
    }

    fn spawn_load(&mut self, key: TileKey) {
        let token = FetchToken::new();
        self.pending.insert(key, token.clone());
        self.stats.lock().started += 1;

        let url = self.config.url_template.url_for(key);
        let loader = Arc::clone(&self.loader);
        let limiter = Arc::clone(&self.limiter);
        let sender = self.sender.clone();
        let stats = Arc::clone(&self.stats);

        self.runtime.spawn(async move {
            let Ok(_permit) = limiter.acquire_owned().await else {
                return;
            };
            // Retired while queued behind the limiter
            if token.is_cancelled() {
                return;
            }

            let result = loader.load(&url).await;
            {
                let mut stats = stats.lock();
                match &result {
                    Ok(_) => stats.succeeded += 1,
                    Err(_) => stats.failed += 1,
                }
            }
            // The receiver only goes away with the fetcher itself
            let _ = sender.send(FetchOutcome { key, token, result });
        });
    }

    /// Move completed loads into the cache. Returns the number of tiles inserted.
    pub fn drain_into(&mut self, cache: &mut TileImageCache) -> usize {
        let mut inserted = 0;

        for outcome in self.receiver.try_iter() {
            if outcome.token.is_cancelled() {
                continue;
            }
            if self
                .pending
                .get(&outcome.key)
                .is_some_and(|token| token.same_as(&outcome.token))
            {
                self.pending.remove(&outcome.key);
            }

            match outcome.result {
                Ok(image) => {
                    if cache.insert(outcome.key, image) {
                        inserted += 1;
                    }
                }
                Err(error) => {
                    debug!("Tile {} unavailable: {}", outcome.key, error);
                    self.failed.insert(outcome.key);
                }
            }
        }

        inserted
    }

    /// Cancel everything in flight, e.g. when the tile source changes
    pub fn cancel_all(&mut self) {
        for token in self.pending.values() {
            token.cancel();
        }
        let cancelled = self.pending.len() as u64;
        self.pending.clear();
        self.stats.lock().cancelled += cancelled;
    }

    pub fn is_pending(&self, key: &TileKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn has_failed(&self, key: &TileKey) -> bool {
        self.failed.contains(key)
    }

    pub fn stats(&self) -> FetchStats {
        *self.stats.lock()
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bevy::math::{DVec2, UVec2};
    use image::RgbaImage;
    use std::time::{Duration, Instant};
    use tokio::runtime::Runtime;

    /// Serves a blank tile for every URL except those listed as missing,
    /// optionally holding each load until released
    struct FakeLoader {
        requested: Mutex<Vec<String>>,
        missing: Vec<String>,
        gate: Option<Arc<tokio::sync::Notify>>,
    }

    impl FakeLoader {
        fn new() -> Self {
            Self {
                requested: Mutex::new(Vec::new()),
                missing: Vec::new(),
                gate: None,
            }
        }
    }

    #[async_trait]
    impl TileLoader for FakeLoader {
        async fn load(&self, url: &str) -> Result<TileImage, TileError> {
            self.requested.lock().push(url.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.missing.iter().any(|m| m == url) {
                return Err(TileError::NotFound);
            }
            Ok(Arc::new(RgbaImage::new(1, 1)))
        }
    }

    fn config() -> FetcherConfig {
        FetcherConfig {
            url_template: UrlTemplate::parse("https://t/{z}/{x}/{y}.png").unwrap(),
            max_zoom: 19,
            max_concurrent: 4,
        }
    }

    fn drain_until_idle(fetcher: &mut TileFetcher, cache: &mut TileImageCache) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while fetcher.pending_count() > 0 {
            fetcher.drain_into(cache);
            assert!(Instant::now() < deadline, "fetches did not finish");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_fetches_every_missing_cell_once() {
        let runtime = Runtime::new().unwrap();
        let loader = Arc::new(FakeLoader::new());
        let mut fetcher = TileFetcher::new(loader.clone(), runtime.handle().clone(), config());
        let mut cache = TileImageCache::new();

        let reference = ReferenceTile::new(DVec2::new(33.5, 20.5), 6);
        let grid = ViewportGrid::new(UVec2::new(256, 256), 256);
        let cells = grid.cells().len();

        cache.insert(TileKey::new(6, 33, 20), Arc::new(RgbaImage::new(1, 1)));
        let started = fetcher.fetch_visible(&cache, &reference, &grid, WrapMode::NONE);
        assert_eq!(started, cells - 1);

        // a second pass while everything is in flight starts nothing
        assert_eq!(fetcher.fetch_visible(&cache, &reference, &grid, WrapMode::NONE), 0);

        drain_until_idle(&mut fetcher, &mut cache);
        assert_eq!(cache.len(), cells);
        assert_eq!(loader.requested.lock().len(), cells - 1);
        let requested = loader.requested.lock().clone();
        assert!(requested.contains(&"https://t/6/34/20.png".to_string()));
        assert!(!requested.contains(&"https://t/6/33/20.png".to_string()));

        assert_eq!(fetcher.fetch_visible(&cache, &reference, &grid, WrapMode::NONE), 0);
    }

    #[test]
    fn test_invalid_keys_are_skipped() {
        let runtime = Runtime::new().unwrap();
        let loader = Arc::new(FakeLoader::new());
        let mut fetcher = TileFetcher::new(loader.clone(), runtime.handle().clone(), config());
        let cache = TileImageCache::new();

        // zoom 0 has a single tile; everything else in the grid is out of range
        let reference = ReferenceTile::new(DVec2::new(0.5, 0.5), 0);
        let grid = ViewportGrid::new(UVec2::new(700, 400), 256);
        assert_eq!(fetcher.fetch_visible(&cache, &reference, &grid, WrapMode::NONE), 1);

        // beyond the configured max zoom nothing is requested at all
        let deep = ReferenceTile::new(DVec2::new(10.5, 10.5), 20);
        assert_eq!(fetcher.fetch_visible(&cache, &deep, &grid, WrapMode::NONE), 0);

        // far past any addressable depth the grid still resolves to nothing
        let abyss = ReferenceTile::new(DVec2::new(1e22, 1e22), 70);
        assert_eq!(fetcher.fetch_visible(&cache, &abyss, &grid, WrapMode::default()), 0);
    }

    #[test]
    fn test_failed_tiles_are_not_retried() {
        let runtime = Runtime::new().unwrap();
        let mut loader = FakeLoader::new();
        loader.missing.push("https://t/0/0/0.png".to_string());
        let loader = Arc::new(loader);
        let mut fetcher = TileFetcher::new(loader.clone(), runtime.handle().clone(), config());
        let mut cache = TileImageCache::new();

        let reference = ReferenceTile::new(DVec2::new(0.5, 0.5), 0);
        let grid = ViewportGrid::new(UVec2::new(256, 256), 256);
        assert_eq!(fetcher.fetch_visible(&cache, &reference, &grid, WrapMode::NONE), 1);
        drain_until_idle(&mut fetcher, &mut cache);

        assert!(cache.is_empty());
        assert!(fetcher.has_failed(&TileKey::new(0, 0, 0)));
        assert_eq!(fetcher.fetch_visible(&cache, &reference, &grid, WrapMode::NONE), 0);
        assert_eq!(fetcher.stats().failed, 1);
    }

    #[test]
    fn test_moving_away_discards_stale_results() {
        let runtime = Runtime::new().unwrap();
        let gate = Arc::new(tokio::sync::Notify::new());
        let mut loader = FakeLoader::new();
        loader.gate = Some(gate.clone());
        let loader = Arc::new(loader);
        let mut fetcher = TileFetcher::new(loader.clone(), runtime.handle().clone(), config());
        let mut cache = TileImageCache::new();
        let grid = ViewportGrid::new(UVec2::new(10, 10), 256);

        let here = ReferenceTile::new(DVec2::new(10.5, 10.5), 5);
        assert_eq!(fetcher.fetch_visible(&cache, &here, &grid, WrapMode::NONE), 9);

        let elsewhere = ReferenceTile::new(DVec2::new(20.5, 20.5), 5);
        assert_eq!(fetcher.fetch_visible(&cache, &elsewhere, &grid, WrapMode::NONE), 9);
        assert_eq!(fetcher.pending_count(), 9);
        assert!(!fetcher.is_pending(&TileKey::new(5, 10, 10)));
        assert_eq!(fetcher.stats().cancelled, 9);

        // wake every held load, stale ones included
        let deadline = Instant::now() + Duration::from_secs(5);
        while fetcher.pending_count() > 0 {
            gate.notify_waiters();
            fetcher.drain_into(&mut cache);
            assert!(Instant::now() < deadline, "fetches did not finish");
            std::thread::sleep(Duration::from_millis(5));
        }
        // give cancelled loads that were already running time to report
        std::thread::sleep(Duration::from_millis(20));
        gate.notify_waiters();
        std::thread::sleep(Duration::from_millis(20));
        fetcher.drain_into(&mut cache);

        assert_eq!(cache.len(), 9);
        assert!(cache.has(&TileKey::new(5, 20, 20)));
        assert!(!cache.has(&TileKey::new(5, 10, 10)));
    }

    #[test]
    fn test_in_flight_loads_are_capped() {
        let runtime = Runtime::new().unwrap();
        let gate = Arc::new(tokio::sync::Notify::new());
        let mut loader = FakeLoader::new();
        loader.gate = Some(gate.clone());
        let loader = Arc::new(loader);
        let mut fetcher = TileFetcher::new(
            loader.clone(),
            runtime.handle().clone(),
            FetcherConfig {
                max_concurrent: 2,
                ..config()
            },
        );
        let mut cache = TileImageCache::new();
        let grid = ViewportGrid::new(UVec2::new(10, 10), 256);

        let here = ReferenceTile::new(DVec2::new(10.5, 10.5), 5);
        assert_eq!(fetcher.fetch_visible(&cache, &here, &grid, WrapMode::NONE), 9);
        assert_eq!(fetcher.pending_count(), 9);

        // the rest stay queued behind the limiter while the first two are held
        let deadline = Instant::now() + Duration::from_secs(5);
        while loader.requested.lock().len() < 2 {
            assert!(Instant::now() < deadline, "loads did not start");
            std::thread::sleep(Duration::from_millis(5));
        }
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(loader.requested.lock().len(), 2);
        assert_eq!(fetcher.stats().succeeded, 0);

        let deadline = Instant::now() + Duration::from_secs(5);
        while fetcher.pending_count() > 0 {
            gate.notify_waiters();
            fetcher.drain_into(&mut cache);
            assert!(Instant::now() < deadline, "fetches did not finish");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(loader.requested.lock().len(), 9);
        assert_eq!(cache.len(), 9);
    }

    #[test]
    fn test_cancel_all_drops_everything_in_flight() {
        let runtime = Runtime::new().unwrap();
        let gate = Arc::new(tokio::sync::Notify::new());
        let mut loader = FakeLoader::new();
        loader.gate = Some(gate.clone());
        let mut fetcher = TileFetcher::new(Arc::new(loader), runtime.handle().clone(), config());
        let mut cache = TileImageCache::new();
        let grid = ViewportGrid::new(UVec2::new(10, 10), 256);

        let here = ReferenceTile::new(DVec2::new(10.5, 10.5), 5);
        assert_eq!(fetcher.fetch_visible(&cache, &here, &grid, WrapMode::NONE), 9);
        fetcher.cancel_all();
        assert_eq!(fetcher.pending_count(), 0);
        assert_eq!(fetcher.stats().cancelled, 9);

        for _ in 0..20 {
            gate.notify_waiters();
            fetcher.drain_into(&mut cache);
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(cache.is_empty());

        // cancelled keys are not remembered as failed, so they load again
        assert_eq!(fetcher.fetch_visible(&cache, &here, &grid, WrapMode::NONE), 9);
    }
}
