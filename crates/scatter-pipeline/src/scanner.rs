//! Discovers raw frames under a source directory and groups them into
//! fixed-size path batches, grounded in `image_path_gen.py::ImagePathGen`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use walkdir::WalkDir;

use scatter_model::frame::PathBatch;

/// Lists every `.tif` file under `root` (recursively), excluding any
/// path whose file name contains `dark`, sorted lexicographically.
/// Mirrors `fetch_paths`.
fn fetch_paths(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("tif")))
        .filter(|path| !path.file_name().is_some_and(|name| name.to_string_lossy().contains("dark")))
        .collect();
    paths.sort();
    paths
}

/// Cursor over the frames discovered under one source directory.
/// `next_batch` advances the cursor every time it successfully emits a
/// full batch; a short trailing batch is only ever emitted once, by
/// `drain_remainder`.
pub struct Scanner {
    src_folder: PathBuf,
    batch_size: usize,
    real_time: bool,
    timeout: Duration,
    sleep_time: Duration,
    num_processed: usize,
    num_batches: usize,
}

impl Scanner {
    pub fn new(src_folder: PathBuf, batch_size: usize, real_time: bool, timeout: Duration, sleep_time: Duration) -> Self {
        Self {
            src_folder,
            batch_size: batch_size.max(1),
            real_time,
            timeout,
            sleep_time,
            num_processed: 0,
            num_batches: 0,
        }
    }

    pub fn num_processed_images(&self) -> usize {
        self.num_processed
    }

    pub fn num_image_batches(&self) -> usize {
        self.num_batches
    }

    /// Returns a full batch if enough unprocessed paths exist, advancing
    /// the cursor; otherwise `None` without advancing. Mirrors
    /// `get_batch(wait_for_full_batch=True)`.
    fn next_full_batch(&mut self) -> Option<PathBatch> {
        let paths = fetch_paths(&self.src_folder);
        let unprocessed = &paths[self.num_processed.min(paths.len())..];
        if unprocessed.len() < self.batch_size {
            return None;
        }
        let batch: Vec<PathBuf> = unprocessed[..self.batch_size].to_vec();
        let cursor = self.num_processed as u64;
        self.num_processed += batch.len();
        self.num_batches += 1;
        Some(PathBatch::new(batch, cursor))
    }

    /// Emits whatever unprocessed paths remain, even if short. Mirrors
    /// `get_batch(wait_for_full_batch=False)`.
    fn drain_remainder(&mut self) -> Option<PathBatch> {
        let paths = fetch_paths(&self.src_folder);
        let unprocessed = &paths[self.num_processed.min(paths.len())..];
        if unprocessed.is_empty() {
            return None;
        }
        let batch = unprocessed.to_vec();
        let cursor = self.num_processed as u64;
        self.num_processed += batch.len();
        self.num_batches += 1;
        Some(PathBatch::new(batch, cursor))
    }

    /// Drives the scan to completion, invoking `emit` for every batch
    /// (full or trailing) and `should_stop` between cycles to check for
    /// external cancellation. Mirrors `ImagePathGen.__iter__`.
    pub fn run(&mut self, mut emit: impl FnMut(PathBatch), should_stop: impl Fn() -> bool) {
        let mut last_emit = Instant::now();

        loop {
            if should_stop() {
                break;
            }
            if let Some(batch) = self.next_full_batch() {
                emit(batch);
                last_emit = Instant::now();
                continue;
            }
            if !self.real_time || last_emit.elapsed() > self.timeout {
                break;
            }
            std::thread::sleep(self.sleep_time);
        }

        if let Some(batch) = self.drain_remainder() {
            emit(batch);
        }
    }
}
