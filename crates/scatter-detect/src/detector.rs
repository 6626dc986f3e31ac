use std::path::{Path, PathBuf};

use scatter_model::detection::{BBox, Detection, DetectionResult};
use scatter_model::image::FloatImage;
use scatter_model::record::ProcessedRecord;
use thiserror::Error;

use crate::nms::{non_max_suppression, score_filter};

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("could not read model weights at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model weights at {0} are malformed")]
    Malformed(PathBuf),
}

/// One raw detection in the pixel space of the image the model ran on,
/// before it is scaled into normalized `[0, 1]` coordinates.
pub struct RawDetection {
    pub bbox_px: BBox,
    pub score: f32,
}

/// A detector backend: load weights once, then run inference per frame.
/// NMS and score thresholding happen inside `infer`, mirroring the
/// upstream model's own `PostProcessing` step — `run_detector` only
/// rescales the surviving boxes and extracts peak intensities.
pub trait DetectorModel: Send + Sync {
    fn infer(&self, image: &FloatImage) -> Vec<RawDetection>;
}

/// Parameters a `.weights` file encodes for [`BlobDetector`]: local-maxima
/// threshold, minimum peak separation (as a fraction of image size), the
/// NMS IoU threshold, and the box half-width (as a fraction of image
/// size) drawn around each surviving peak.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BlobParams {
    intensity_threshold: f32,
    box_half_width: f32,
}

impl BlobParams {
    fn parse(text: &str) -> Option<Self> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let intensity_threshold: f32 = lines.next()?.trim().parse().ok()?;
        let box_half_width: f32 = lines.next()?.trim().parse().ok()?;
        Some(Self {
            intensity_threshold,
            box_half_width,
        })
    }
}

/// A deterministic stand-in for the upstream's learned detector: finds
/// local-maxima peaks above a threshold, scores them by normalized
/// intensity, and applies the same NMS + score-threshold contract a
/// learned model's postprocessing would. `spec.md` explicitly excludes
/// training or editing detector weights; this backend only satisfies
/// the "a DetectorModel exists and is pluggable" contract without a
/// non-corpus ML dependency — see `DESIGN.md`.
#[derive(Debug)]
pub struct BlobDetector {
    params: BlobParams,
    nms_level: f32,
    score_level: f32,
}

impl BlobDetector {
    pub fn load(weights_path: &Path, nms_level: f32, score_level: f32) -> Result<Self, DetectorError> {
        let text = std::fs::read_to_string(weights_path).map_err(|source| DetectorError::Read {
            path: weights_path.to_path_buf(),
            source,
        })?;
        let params = BlobParams::parse(&text).ok_or_else(|| DetectorError::Malformed(weights_path.to_path_buf()))?;
        tracing::debug!(path = %weights_path.display(), ?params, "detector weights loaded");
        Ok(Self {
            params,
            nms_level,
            score_level,
        })
    }
}

impl DetectorModel for BlobDetector {
    fn infer(&self, image: &FloatImage) -> Vec<RawDetection> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let (min, max) = image.min_max();
        let span = (max - min).max(f32::EPSILON);

        let mut candidates: Vec<(usize, usize, f32)> = Vec::new();
        for row in 0..height {
            for col in 0..width {
                let v = image.get(row, col);
                let normalized = (v - min) / span;
                if normalized < self.params.intensity_threshold {
                    continue;
                }
                let is_local_max = (-1isize..=1)
                    .flat_map(|dr| (-1isize..=1).map(move |dc| (dr, dc)))
                    .filter(|&(dr, dc)| !(dr == 0 && dc == 0))
                    .all(|(dr, dc)| {
                        image
                            .try_get(row as isize + dr, col as isize + dc)
                            .map(|neighbor| neighbor <= v)
                            .unwrap_or(true)
                    });
                if is_local_max {
                    candidates.push((row, col, normalized));
                }
            }
        }

        let half_w = self.params.box_half_width * width as f32;
        let half_h = self.params.box_half_width * height as f32;

        let boxes: Vec<BBox> = candidates
            .iter()
            .map(|&(row, col, _)| {
                let (x, y) = (col as f32, row as f32);
                BBox::new(
                    (x - half_w).max(0.0),
                    (y - half_h).max(0.0),
                    (x + half_w).min(width as f32),
                    (y + half_h).min(height as f32),
                )
            })
            .collect();
        let scores: Vec<f32> = candidates.iter().map(|&(_, _, s)| s).collect();

        let keep = non_max_suppression(&boxes, &scores, self.nms_level);
        let kept_scores: Vec<f32> = keep.iter().map(|&i| scores[i]).collect();
        let keep_after_score = score_filter(&kept_scores, self.score_level);

        keep_after_score
            .into_iter()
            .map(|i| {
                let idx = keep[i];
                RawDetection {
                    bbox_px: boxes[idx],
                    score: scores[idx],
                }
            })
            .collect()
    }
}

/// Sums pixel intensities inside each box's footprint, mirroring
/// `extract_peak_intensities`.
fn extract_peak_intensity(image: &FloatImage, bbox_px: &BBox) -> f32 {
    let x0 = bbox_px.x_min.floor().max(0.0) as usize;
    let y0 = bbox_px.y_min.floor().max(0.0) as usize;
    let x1 = (bbox_px.x_max.ceil() as usize).min(image.width());
    let y1 = (bbox_px.y_max.ceil() as usize).min(image.height());

    let mut total = 0.0f32;
    for row in y0..y1 {
        for col in x0..x1 {
            total += image.get(row, col);
        }
    }
    total
}

/// Runs `model` over a processed record's detector input, scales boxes
/// into normalized coordinates, and extracts peak intensities.
pub fn run_detector(
    model: &dyn DetectorModel,
    record: &ProcessedRecord,
    extract_intensities: bool,
) -> DetectionResult {
    let image = record.detector_input();
    let (width, height) = (image.width() as f32, image.height() as f32);

    let raw = model.infer(image);
    let detections = raw
        .into_iter()
        .map(|r| {
            let peak_intensity = if extract_intensities {
                extract_peak_intensity(image, &r.bbox_px)
            } else {
                0.0
            };
            Detection {
                bbox: r.bbox_px.scale_to(1.0 / width, 1.0 / height),
                score: r.score,
                label: 0,
                peak_intensity,
            }
        })
        .collect();

    DetectionResult::new(record.source_path.clone(), record.cursor, detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_weights(dir: &std::path::Path, threshold: f32, half_width: f32) -> PathBuf {
        let path = dir.join("model.weights");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "{threshold}").unwrap();
        writeln!(f, "{half_width}").unwrap();
        path
    }

    #[test]
    fn load_rejects_malformed_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.weights");
        std::fs::write(&path, "not a number\n").unwrap();
        let err = BlobDetector::load(&path, 0.3, 0.5).unwrap_err();
        assert!(matches!(err, DetectorError::Malformed(_)));
    }

    #[test]
    fn load_rejects_missing_file() {
        let err = BlobDetector::load(Path::new("/nonexistent.weights"), 0.3, 0.5).unwrap_err();
        assert!(matches!(err, DetectorError::Read { .. }));
    }

    #[test]
    fn infer_finds_a_single_bright_peak() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_weights(dir.path(), 0.5, 0.05);
        let model = BlobDetector::load(&path, 0.3, 0.1).unwrap();

        let mut img = FloatImage::zeros(32, 32);
        img.set(16, 16, 100.0);
        let detections = model.infer(&img);
        assert_eq!(detections.len(), 1);
        let (cx, cy) = detections[0].bbox_px.center();
        assert!((cx - 16.0).abs() < 1.0);
        assert!((cy - 16.0).abs() < 1.0);
    }

    #[test]
    fn infer_on_flat_image_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_weights(dir.path(), 0.5, 0.05);
        let model = BlobDetector::load(&path, 0.3, 0.1).unwrap();
        let img = FloatImage::zeros(16, 16);
        assert!(model.infer(&img).is_empty());
    }

    #[test]
    fn run_detector_produces_normalized_boxes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_weights(dir.path(), 0.5, 0.05);
        let model = BlobDetector::load(&path, 0.3, 0.1).unwrap();

        let mut img = FloatImage::zeros(20, 20);
        img.set(10, 10, 50.0);
        let record = ProcessedRecord::new("frame.tif", 0, None, img.clone(), None, img.clone(), std::time::SystemTime::now());

        let result = run_detector(&model, &record, true);
        assert_eq!(result.detections.len(), 1);
        let b = result.detections[0].bbox;
        assert!(b.x_min >= 0.0 && b.x_max <= 1.0);
        assert!(result.detections[0].peak_intensity > 0.0);
    }
}
