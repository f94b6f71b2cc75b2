/// Background asset loader.
///
/// One worker thread builds the `AssetStore`. Progress is published through
/// atomics the loading screen polls every tick; the finished store (or the
/// load error) arrives on a channel.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, TryRecvError};

use crate::assets::AssetStore;
use crate::error::LoadError;

#[derive(Debug, Default)]
pub struct LoadProgress {
    loaded: AtomicBool,
    counter: AtomicUsize,
}

impl LoadProgress {
    pub fn counter(&self) -> usize {
        self.counter.load(Ordering::Acquire)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }
}

pub struct Loader {
    pub progress: Arc<LoadProgress>,
    rx: Receiver<Result<AssetStore, LoadError>>,
    /// Ticks spent on the loading screen
    pub ticks: u32,
}

impl Loader {
    pub fn spawn(map_file: Option<PathBuf>) -> Loader {
        let progress = Arc::new(LoadProgress::default());
        let (tx, rx) = unbounded();

        let worker_progress = Arc::clone(&progress);
        thread::spawn(move || {
            let result = AssetStore::load(map_file.as_deref(), |stage| {
                log::debug!("loading {:?}", stage);
                worker_progress.counter.store(stage as usize, Ordering::Release);
            });
            if let Err(e) = &result {
                log::error!("asset loading failed: {e}");
            }
            worker_progress.loaded.store(true, Ordering::Release);
            // The receiver only disappears when the game is shutting down
            let _ = tx.send(result);
        });

        Loader { progress, rx, ticks: 0 }
    }

    /// Called once per tick. Returns the store once it is ready and the
    /// loading screen has been up for at least `min_ticks`.
    pub fn poll(&mut self, min_ticks: u32) -> Option<Result<AssetStore, LoadError>> {
        self.ticks = self.ticks.saturating_add(1);
        if !self.progress.is_loaded() || self.ticks <= min_ticks {
            return None;
        }
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(LoadError::LoaderGone)),
        }
    }
}
