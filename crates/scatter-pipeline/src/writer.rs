//! Appends processed frames and their detections to a [`Container`],
//! grounded in `servers/save_data.py::SaveData` and `h5utils.py`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use scatter_config::SaveConfig;
use scatter_detect::MatchMetrics;
use scatter_model::detection::DetectionResult;
use scatter_model::record::ProcessedRecord;
use scatter_store::{AttrValue, Container, DatasetValue};

use crate::detector_stage::DetectorOutput;

/// Owns the single top-level group a run's frames are saved under.
/// Mirrors `SaveData.__init__`'s `init_folder(src_path.name)` call,
/// done once at stage start-up.
pub struct Writer {
    folder_name: String,
}

impl Writer {
    pub fn new(container: &mut Container, src_path: &Path) -> Self {
        let leaf = src_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "run".to_string());
        Self { folder_name: container.init_folder(&leaf) }
    }

    /// Appends one batch's record + detections under this run's group.
    /// Returns the leaf group name actually used (after collision
    /// avoidance). Mirrors `SaveData.save_data`.
    pub fn write(
        &self,
        container: &mut Container,
        src_path: &Path,
        input_paths: &[PathBuf],
        record: &ProcessedRecord,
        output: &DetectorOutput,
        cfg: &SaveConfig,
    ) -> String {
        let path_names: Vec<String> = input_paths.iter().map(|p| relative_stem(p, src_path)).collect();
        let file_name = path_names.first().cloned().unwrap_or_else(|| "frame".to_string());

        let mut datasets = BTreeMap::new();
        datasets.insert("boxes".to_string(), DatasetValue::Series(flatten_boxes(&output.detections)));
        if cfg.save_scores {
            datasets.insert("scores".to_string(), DatasetValue::Series(output.detections.detections.iter().map(|d| d.score).collect()));
        }

        if cfg.save_img {
            if let Some(img) = &record.img {
                datasets.insert("img".to_string(), DatasetValue::Image(img.clone()));
            }
        }
        if cfg.save_q_img {
            datasets.insert("q_img".to_string(), DatasetValue::Image(record.q_image.clone()));
        }
        if cfg.save_polar_img {
            if let Some(polar_img) = &record.polar_img {
                datasets.insert("polar_img".to_string(), DatasetValue::Image(polar_img.clone()));
            }
        }
        if cfg.save_intensities {
            let intensities = output.detections.detections.iter().map(|d| d.peak_intensity).collect();
            datasets.insert("intensities".to_string(), DatasetValue::Series(intensities));
        }

        let mut attrs = BTreeMap::new();
        attrs.insert("paths".to_string(), AttrValue::Text(path_names.join(",")));
        add_matching_results(&mut datasets, &mut attrs, &output.matches);

        container.save_image(&self.folder_name, &file_name, datasets, attrs)
    }
}

fn relative_stem(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let as_str = relative.to_string_lossy();
    as_str.strip_suffix(".tif").unwrap_or(&as_str).to_string()
}

fn flatten_boxes(detections: &DetectionResult) -> Vec<f32> {
    detections
        .detections
        .iter()
        .flat_map(|d| [d.bbox.x_min, d.bbox.y_min, d.bbox.x_max, d.bbox.y_max])
        .collect()
}

/// Stores each crystal pattern's match fraction as an attribute and its
/// kept index pairs as datasets, mirroring `matching_results`'s
/// per-pattern `{metric, sim_idx, exp_idx}` shape.
fn add_matching_results(datasets: &mut BTreeMap<String, DatasetValue>, attrs: &mut BTreeMap<String, AttrValue>, matches: &BTreeMap<String, MatchMetrics>) {
    for (name, metrics) in matches {
        attrs.insert(format!("match_{name}_metric"), AttrValue::Real(metrics.matched_fraction));
        datasets.insert(
            format!("match_{name}_sim_idx"),
            DatasetValue::Series(metrics.simulated_indices.iter().map(|&i| i as f32).collect()),
        );
        datasets.insert(
            format!("match_{name}_exp_idx"),
            DatasetValue::Series(metrics.experimental_indices.iter().map(|&i| i as f32).collect()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scatter_model::detection::{BBox, Detection};
    use scatter_model::image::FloatImage;
    use std::time::SystemTime;

    fn sample_output() -> DetectorOutput {
        let detections = DetectionResult::new(
            "sample.tif",
            0,
            vec![Detection {
                bbox: BBox::new(0.1, 0.1, 0.2, 0.2),
                score: 0.8,
                label: 0,
                peak_intensity: 42.0,
            }],
        );
        let mut matches = BTreeMap::new();
        matches.insert(
            "silicon".to_string(),
            MatchMetrics {
                matched_fraction: 0.5,
                simulated_indices: vec![0],
                experimental_indices: vec![0],
            },
        );
        DetectorOutput { detections, matches }
    }

    #[test]
    fn write_appends_a_frame_group_under_the_run_folder() {
        let mut container = Container::new();
        let src_path = PathBuf::from("/data/raw/run1");
        let writer = Writer::new(&mut container, &src_path);

        let img = FloatImage::zeros(4, 4);
        let record = ProcessedRecord::new("sample.tif", 0, Some(img.clone()), img.clone(), Some(img.clone()), img, SystemTime::now());
        let output = sample_output();
        let mut cfg = SaveConfig::default();
        cfg.save_q_img = true;

        let input_paths = vec![src_path.join("sample.tif")];
        let leaf = writer.write(&mut container, &src_path, &input_paths, &record, &output, &cfg);

        let group = container.read_image(&format!("run1/{leaf}")).unwrap();
        assert!(group.datasets.contains_key("boxes"));
        assert!(group.datasets.contains_key("q_img"));
        assert_eq!(group.attrs.get("paths").unwrap(), &AttrValue::Text("sample".to_string()));
    }

    #[test]
    fn repeated_writes_avoid_group_name_collisions() {
        let mut container = Container::new();
        let src_path = PathBuf::from("/data/raw/run1");
        let writer = Writer::new(&mut container, &src_path);

        let img = FloatImage::zeros(4, 4);
        let record = ProcessedRecord::new("sample.tif", 0, Some(img.clone()), img.clone(), Some(img.clone()), img, SystemTime::now());
        let output = sample_output();
        let cfg = SaveConfig::default();
        let input_paths = vec![src_path.join("sample.tif")];

        let leaf1 = writer.write(&mut container, &src_path, &input_paths, &record, &output, &cfg);
        let leaf2 = writer.write(&mut container, &src_path, &input_paths, &record, &output, &cfg);
        assert_ne!(leaf1, leaf2);
    }
}
