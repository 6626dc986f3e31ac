//! Peak detection and diffraction-pattern matching.
//!
//! Takes a [`scatter_model::ProcessedRecord`] from the Preprocessor,
//! runs a [`DetectorModel`] over it, and (optionally) scores the result
//! against a simulated diffraction pattern derived from a CIF unit cell.

pub mod cif;
pub mod detector;
pub mod matching;
pub mod nms;
pub mod simulate;

pub use cif::{CifError, UnitCell, read_unit_cell};
pub use detector::{BlobDetector, DetectorError, DetectorModel, RawDetection, run_detector};
pub use matching::{MatchMetrics, linear_sum_assignment, match_peaks};
pub use nms::{non_max_suppression, score_filter};
pub use simulate::{MillerIndex, SimulatedPeak, simulate_peaks};

use scatter_config::MatchingConfig;
use scatter_model::detection::DetectionResult;

/// Matches a frame's detections against a CIF's simulated pattern,
/// converting each detection's box center (radial axis) into a q-value
/// via `q_max`, mirroring the upstream's `extract_q_values` step.
pub fn match_against_pattern(
    detections: &DetectionResult,
    q_max: f64,
    peaks: &[SimulatedPeak],
    cfg: &MatchingConfig,
) -> MatchMetrics {
    let experimental_q: Vec<f64> = detections
        .detections
        .iter()
        .map(|d| {
            let (cx, _cy) = d.bbox.center();
            cx as f64 * q_max
        })
        .collect();
    let simulated_q: Vec<f64> = peaks.iter().map(|p| p.q).collect();
    let simulated_intensity: Vec<f64> = peaks.iter().map(|p| p.intensity).collect();

    match_peaks(&simulated_q, &experimental_q, &simulated_intensity, cfg.max_distance)
}
