//! Shared lifecycle state, queues, and worker wiring for the
//! Scanner -> Preprocessor pool -> Detector -> Writer pipeline.
//!
//! Grounded in `servers/multi_process_server.py`'s `FastServerResources`
//! / `FastServer` / `FastModelPrediction`: a cushioned whole-job
//! timeout, a `finished` predicate combining the timeout with the
//! stop/error flags and the found/saved counters, and per-queue polling
//! timeouts (0.01s on the path queue, 0.1s on the results queue, 0.5s
//! on the processed-image queue) so every worker loop can notice a stop
//! request without blocking forever on an empty channel. Python spreads
//! these stages across OS processes for GIL-free parallelism; Rust
//! threads already run in parallel, so each stage here is a thread
//! instead of a process — see `DESIGN.md`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};

use scatter_config::AppConfig;
use scatter_model::frame::PathBatch;
use scatter_model::record::ProcessedRecord;
use scatter_store::Container;

use crate::detector_stage::{DetectorOutput, DetectorStage};
use crate::preprocessor::{self, PreprocessError};
use crate::scanner::Scanner;
use crate::time_recorder::TimeRecorder;
use crate::writer::Writer;

const PATHS_QUEUE_TIMEOUT: Duration = Duration::from_millis(10);
const IMAGE_QUEUE_TIMEOUT: Duration = Duration::from_millis(500);
const RESULTS_QUEUE_TIMEOUT: Duration = Duration::from_millis(100);

/// A processed record plus the full list of paths that fed it, carried
/// alongside so the Writer can record `paths` without re-deriving it
/// from the record's single `source_path`.
struct ProcessedBatch {
    input_paths: Vec<PathBuf>,
    record: ProcessedRecord,
}

/// A detector result plus the originating paths, ready for the Writer.
struct ResultBatch {
    input_paths: Vec<PathBuf>,
    record: ProcessedRecord,
    output: DetectorOutput,
}

/// Process-wide lifecycle state shared by every worker thread, mirroring
/// `FastServerResources`.
pub struct Resources {
    stop_flag: AtomicBool,
    error_flag: AtomicBool,
    start_time: Instant,
    timeout: Option<Duration>,
    num_found_batches: AtomicUsize,
    num_saved_batches: AtomicUsize,
    paths_tx: Sender<PathBatch>,
    paths_rx: Receiver<PathBatch>,
    images_tx: Sender<ProcessedBatch>,
    images_rx: Receiver<ProcessedBatch>,
    results_tx: Sender<ResultBatch>,
    results_rx: Receiver<ResultBatch>,
}

impl Resources {
    fn new(max_batch: usize, timeout: Option<Duration>) -> Self {
        let (paths_tx, paths_rx) = unbounded();
        let (images_tx, images_rx) = bounded(max_batch.max(1));
        let (results_tx, results_rx) = bounded(max_batch.max(1));
        Self {
            stop_flag: AtomicBool::new(false),
            error_flag: AtomicBool::new(false),
            start_time: Instant::now(),
            timeout,
            num_found_batches: AtomicUsize::new(0),
            num_saved_batches: AtomicUsize::new(0),
            paths_tx,
            paths_rx,
            images_tx,
            images_rx,
            results_tx,
            results_rx,
        }
    }

    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    fn stop_on_error(&self) {
        self.error_flag.store(true, Ordering::SeqCst);
        self.stop();
    }

    pub fn error_occurred(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    fn is_timeout(&self) -> bool {
        self.timeout.is_some_and(|t| self.start_time.elapsed() > t)
    }

    /// Mirrors `FastServerResources.finished`: done when something went
    /// fatally wrong, the wall-clock budget ran out, or the scanner is
    /// done and every found batch has been written with nothing left
    /// in flight.
    pub fn finished(&self) -> bool {
        self.error_occurred()
            || self.is_timeout()
            || (self.is_stopped()
                && self.num_found_batches.load(Ordering::SeqCst) == self.num_saved_batches.load(Ordering::SeqCst)
                && self.results_rx.is_empty())
    }
}

/// Registers the external stop flag SIGINT/SIGTERM flip, mirroring the
/// upstream's signal-driven shutdown. Safe to call once per process.
fn install_signal_handlers(resources: &Arc<Resources>) {
    static EXTERNAL_STOP: AtomicBool = AtomicBool::new(false);

    extern "C" fn handle(_: i32) {
        EXTERNAL_STOP.store(true, Ordering::SeqCst);
    }

    unsafe {
        let action = nix::sys::signal::SigAction::new(
            nix::sys::signal::SigHandler::Handler(handle),
            nix::sys::signal::SaFlags::empty(),
            nix::sys::signal::SigSet::empty(),
        );
        let _ = nix::sys::signal::sigaction(nix::sys::signal::Signal::SIGINT, &action);
        let _ = nix::sys::signal::sigaction(nix::sys::signal::Signal::SIGTERM, &action);
    }

    let resources = Arc::clone(resources);
    std::thread::spawn(move || {
        loop {
            if EXTERNAL_STOP.load(Ordering::SeqCst) {
                resources.stop();
                return;
            }
            if resources.finished() {
                return;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    });
}

/// Totals reported once every worker has joined.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub num_found_batches: usize,
    pub num_saved_batches: usize,
    pub timed_out: bool,
    pub error_occurred: bool,
}

/// Runs the whole pipeline to completion: spawns the scanner, the
/// preprocessor pool, and the writer as threads, runs the detector in
/// the calling thread, and joins everyone once [`Resources::finished`]
/// holds. Worker count mirrors `get_method_list`: 1 scanner + 1 writer,
/// the rest preprocessors.
pub fn run(cfg: &AppConfig, detector: DetectorStage, available_cores: usize) -> anyhow::Result<RunSummary> {
    let resources = Arc::new(Resources::new(cfg.parallel.max_batch, cfg.cluster.cushioned_timeout()));
    install_signal_handlers(&resources);

    let worker_count = cfg.cluster.resolved_worker_count(available_cores).max(3);
    let num_preprocessors = worker_count - 2;

    let src_path = cfg.src_path();
    let dest_path = cfg.dest_path();
    std::fs::create_dir_all(&dest_path)?;

    let scanner_handle = {
        let resources = Arc::clone(&resources);
        let mut scanner = Scanner::new(
            src_path.clone(),
            cfg.general.sum_images as usize,
            cfg.general.real_time,
            cfg.general.timeout(),
            cfg.general.sleep_time(),
        );
        std::thread::spawn(move || {
            scanner.run(
                |batch| {
                    resources.num_found_batches.fetch_add(1, Ordering::SeqCst);
                    let _ = resources.paths_tx.send(batch);
                },
                || resources.is_stopped(),
            );
            resources.stop();
        })
    };

    let preprocessor_handles: Vec<_> = (0..num_preprocessors)
        .map(|i| {
            let resources = Arc::clone(&resources);
            let cfg = cfg.clone();
            std::thread::spawn(move || {
                let mut time_recorder = TimeRecorder::new(format!("preprocessor_{i}"), cfg.log.no_time_record());
                loop {
                    if resources.finished() {
                        return time_recorder;
                    }
                    match resources.paths_rx.recv_timeout(PATHS_QUEUE_TIMEOUT) {
                        Ok(batch) => match preprocessor::process_batch(&batch, &cfg, &mut time_recorder) {
                            Ok(record) => {
                                let processed = ProcessedBatch { input_paths: batch.paths, record };
                                if resources.images_tx.send(processed).is_err() {
                                    return time_recorder;
                                }
                            }
                            Err(PreprocessError::ShapeMismatch { .. }) => {
                                tracing::warn!("dropping batch with mismatched shape");
                                resources.num_found_batches.fetch_sub(1, Ordering::SeqCst);
                            }
                            Err(PreprocessError::Read { path, message }) => {
                                tracing::error!(?path, %message, "failed to read frame");
                                resources.num_found_batches.fetch_sub(1, Ordering::SeqCst);
                            }
                        },
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => return time_recorder,
                    }
                }
            })
        })
        .collect();

    let writer_handle = {
        let resources = Arc::clone(&resources);
        let cfg = cfg.clone();
        let container_path = cfg.container_filename();
        std::thread::spawn(move || -> anyhow::Result<TimeRecorder> {
            let mut container = if container_path.exists() && !cfg.job.rewrite_previous {
                Container::load(&container_path)?
            } else {
                Container::new()
            };
            let writer = Writer::new(&mut container, &src_path);
            let mut time_recorder = TimeRecorder::new("writer", cfg.log.no_time_record());

            loop {
                if resources.finished() {
                    break;
                }
                match resources.results_rx.recv_timeout(RESULTS_QUEUE_TIMEOUT) {
                    Ok(batch) => {
                        time_recorder.time("save", || {
                            writer.write(&mut container, &src_path, &batch.input_paths, &batch.record, &batch.output, &cfg.save)
                        });
                        resources.num_saved_batches.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            container.save(&container_path)?;
            Ok(time_recorder)
        })
    };

    let mut detector_recorder = TimeRecorder::new("detector", cfg.log.no_time_record());
    let max_batch = cfg.parallel.max_batch.max(1);
    loop {
        if resources.finished() {
            break;
        }
        let mut drained = Vec::new();
        match resources.images_rx.recv_timeout(IMAGE_QUEUE_TIMEOUT) {
            Ok(first) => drained.push(first),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
        while drained.len() < max_batch {
            match resources.images_rx.try_recv() {
                Ok(next) => drained.push(next),
                Err(_) => break,
            }
        }

        for batch in drained {
            let output = detector_recorder.time("infer", || detector.process(&batch.record));
            let result = ResultBatch {
                input_paths: batch.input_paths,
                record: batch.record,
                output,
            };
            if resources.results_tx.send(result).is_err() {
                resources.stop_on_error();
            }
        }
    }

    scanner_handle.join().ok();
    let mut time_recorder = detector_recorder;
    for handle in preprocessor_handles {
        if let Ok(rec) = handle.join() {
            time_recorder.merge(&rec);
        }
    }
    match writer_handle.join() {
        Ok(Ok(rec)) => time_recorder.merge(&rec),
        Ok(Err(err)) => {
            tracing::error!(%err, "writer stage failed");
            resources.stop_on_error();
        }
        Err(_) => resources.stop_on_error(),
    }

    if let Some(record_path) = cfg.record_filename() {
        if let Err(err) = time_recorder.save(&record_path) {
            tracing::warn!(%err, "failed to persist time record");
        }
    }

    Ok(RunSummary {
        num_found_batches: resources.num_found_batches.load(Ordering::SeqCst),
        num_saved_batches: resources.num_saved_batches.load(Ordering::SeqCst),
        timed_out: resources.is_timeout(),
        error_occurred: resources.error_occurred(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_is_false_while_batches_are_outstanding() {
        let resources = Resources::new(4, None);
        resources.num_found_batches.store(2, Ordering::SeqCst);
        resources.stop();
        assert!(!resources.finished());
    }

    #[test]
    fn finished_once_stopped_with_matching_counts_and_empty_results() {
        let resources = Resources::new(4, None);
        resources.num_found_batches.store(2, Ordering::SeqCst);
        resources.num_saved_batches.store(2, Ordering::SeqCst);
        resources.stop();
        assert!(resources.finished());
    }

    #[test]
    fn finished_immediately_on_error() {
        let resources = Resources::new(4, None);
        resources.stop_on_error();
        assert!(resources.finished());
        assert!(resources.error_occurred());
    }

    #[test]
    fn finished_on_elapsed_timeout() {
        let resources = Resources::new(4, Some(Duration::from_millis(0)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(resources.finished());
    }
}
