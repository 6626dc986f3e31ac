//! Runs a [`DetectorModel`] over a [`ProcessedRecord`] and, when
//! configured, scores the result against every simulated diffraction
//! pattern found in the matching CIF folder.
//!
//! Grounded in `server_operations.py::FeatureDetector.__call__` and
//! `matching/match_patterns.py::MatchDiffractionPatterns`, which loads
//! one simulated pattern per `*.cif` file in the configured folder at
//! construction time and matches every frame against all of them.

use std::collections::BTreeMap;
use std::path::Path;

use scatter_config::{AppConfig, MatchingConfig};
use scatter_detect::{DetectorModel, MatchMetrics, SimulatedPeak, match_against_pattern, read_unit_cell, run_detector};
use scatter_model::detection::DetectionResult;
use scatter_model::record::ProcessedRecord;

/// The Detector stage's output: the frame's detections plus one
/// [`MatchMetrics`] per named diffraction pattern it was matched
/// against.
pub struct DetectorOutput {
    pub detections: DetectionResult,
    pub matches: BTreeMap<String, MatchMetrics>,
}

pub struct DetectorStage {
    model: Box<dyn DetectorModel>,
    patterns: Vec<(String, Vec<SimulatedPeak>)>,
    q_max: f64,
    extract_intensities: bool,
    matching: MatchingConfig,
}

impl DetectorStage {
    pub fn new(model: Box<dyn DetectorModel>, cfg: &AppConfig) -> Self {
        let q_max = q_max(cfg);
        let patterns = if cfg.matching.perform_matching {
            load_patterns(&cfg.matching.cif_folder, q_max, cfg.q_space.wavelength)
        } else {
            Vec::new()
        };
        Self {
            model,
            patterns,
            q_max,
            extract_intensities: cfg.save.save_intensities,
            matching: cfg.matching.clone(),
        }
    }

    pub fn process(&self, record: &ProcessedRecord) -> DetectorOutput {
        let detections = run_detector(self.model.as_ref(), record, self.extract_intensities);
        let matches = self
            .patterns
            .iter()
            .map(|(name, peaks)| {
                let metrics = match_against_pattern(&detections, self.q_max, peaks, &self.matching);
                (name.clone(), metrics)
            })
            .collect();
        DetectorOutput { detections, matches }
    }
}

/// The polar remap's radial axis spans `[0, q_max]` where `q_max` is
/// the hypotenuse of the cartesian q-space extents, mirroring
/// `QSpaceConfig.q_max` / `_get_q_polar_grid`.
fn q_max(cfg: &AppConfig) -> f64 {
    (cfg.q_space.q_xy_max.powi(2) + cfg.q_space.q_z_max.powi(2)).sqrt()
}

fn load_patterns(folder: &Path, q_max: f64, wavelength: f64) -> Vec<(String, Vec<SimulatedPeak>)> {
    let mut patterns = Vec::new();
    let Ok(entries) = std::fs::read_dir(folder) else {
        return patterns;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("cif")) {
            continue;
        }
        let Ok(cell) = read_unit_cell(&path) else {
            continue;
        };
        let name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        patterns.push((name, scatter_detect::simulate_peaks(&cell, q_max, wavelength)));
    }
    patterns.sort_by(|a, b| a.0.cmp(&b.0));
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use scatter_model::image::FloatImage;
    use std::io::Write;

    struct AlwaysOneDetection;

    impl DetectorModel for AlwaysOneDetection {
        fn infer(&self, image: &FloatImage) -> Vec<scatter_detect::RawDetection> {
            let (w, h) = (image.width() as f32, image.height() as f32);
            vec![scatter_detect::RawDetection {
                bbox_px: scatter_model::detection::BBox::new(w * 0.4, h * 0.4, w * 0.6, h * 0.6),
                score: 0.9,
            }]
        }
    }

    fn write_cif(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "_cell_length_a 5.4310").unwrap();
        writeln!(f, "_cell_length_b 5.4310").unwrap();
        writeln!(f, "_cell_length_c 5.4310").unwrap();
        writeln!(f, "_cell_angle_alpha 90.0").unwrap();
        writeln!(f, "_cell_angle_beta 90.0").unwrap();
        writeln!(f, "_cell_angle_gamma 90.0").unwrap();
        path
    }

    #[test]
    fn process_without_matching_returns_no_patterns() {
        let mut cfg = AppConfig::default();
        cfg.matching.perform_matching = false;
        let stage = DetectorStage::new(Box::new(AlwaysOneDetection), &cfg);

        let img = FloatImage::zeros(16, 16);
        let record = ProcessedRecord::new("f.tif", 0, None, img.clone(), None, img, std::time::SystemTime::now());
        let out = stage.process(&record);

        assert_eq!(out.detections.detections.len(), 1);
        assert!(out.matches.is_empty());
    }

    #[test]
    fn process_matches_against_every_cif_in_folder() {
        let dir = tempfile::tempdir().unwrap();
        write_cif(dir.path(), "silicon.cif");

        let mut cfg = AppConfig::default();
        cfg.matching.perform_matching = true;
        cfg.matching.cif_folder = dir.path().to_path_buf();
        cfg.matching.max_distance = 1.0;
        cfg.q_space.q_xy_max = 3.0;
        cfg.q_space.q_z_max = 3.0;

        let stage = DetectorStage::new(Box::new(AlwaysOneDetection), &cfg);
        let img = FloatImage::zeros(16, 16);
        let record = ProcessedRecord::new("f.tif", 0, None, img.clone(), None, img, std::time::SystemTime::now());
        let out = stage.process(&record);

        assert_eq!(out.matches.len(), 1);
        assert!(out.matches.contains_key("silicon"));
    }
}
