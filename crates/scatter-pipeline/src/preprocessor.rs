//! Turns a path-batch into a [`ProcessedRecord`], grounded in
//! `server_operations.py::ProcessImages`.

use std::path::Path;
use std::time::SystemTime;

use scatter_config::AppConfig;
use scatter_model::image::FloatImage;
use scatter_model::{PathBatch, ProcessedRecord};

use crate::io::read_frame;
use crate::time_recorder::TimeRecorder;

/// Why a batch never produced a [`ProcessedRecord`] — a soft failure
/// the Preprocessor logs and drops, mirroring `ProcessImages.__call__`'s
/// `except` clause and its `if img.shape != expected: return` branch.
#[derive(Debug)]
pub enum PreprocessError {
    Read { path: std::path::PathBuf, message: String },
    ShapeMismatch { expected: (u32, u32), found: (usize, usize) },
}

/// Reads every path in `batch`, sums the frames pixel-wise, and (on a
/// shape match) remaps + contrast-corrects the result into a
/// [`ProcessedRecord`].
pub fn process_batch(batch: &PathBatch, cfg: &AppConfig, time_recorder: &mut TimeRecorder) -> Result<ProcessedRecord, PreprocessError> {
    let summed = time_recorder.time("read", || read_and_sum(&batch.paths))?;

    if !scatter_imaging::matches_expected_shape(&summed, cfg) {
        return Err(PreprocessError::ShapeMismatch {
            expected: (cfg.q_space.size_x, cfg.q_space.size_y),
            found: (summed.width(), summed.height()),
        });
    }

    let img = cfg.save.save_img.then(|| summed.clone());
    let processed = time_recorder.time("remap", || scatter_imaging::preprocess(&summed, cfg));
    let polar_img = cfg.save.save_polar_img.then_some(processed.polar_img);

    let source_path = batch.paths.first().cloned().unwrap_or_default();
    Ok(ProcessedRecord::new(
        source_path,
        batch.cursor,
        img,
        processed.q_image,
        polar_img,
        processed.processed_img,
        SystemTime::now(),
    ))
}

fn read_and_sum(paths: &[std::path::PathBuf]) -> Result<FloatImage, PreprocessError> {
    let mut iter = paths.iter();
    let first_path = iter.next().ok_or_else(|| PreprocessError::Read {
        path: std::path::PathBuf::new(),
        message: "empty path batch".to_string(),
    })?;

    let mut sum = read_frame(first_path).map_err(|e| to_read_error(first_path, e))?;
    for path in iter {
        let next = read_frame(path).map_err(|e| to_read_error(path, e))?;
        for (acc, v) in sum.as_mut_slice().iter_mut().zip(next.as_slice()) {
            *acc += v;
        }
    }
    Ok(sum)
}

fn to_read_error(path: &Path, err: anyhow::Error) -> PreprocessError {
    PreprocessError::Read {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scatter_config::QSpaceConfig;
    use std::path::PathBuf;

    fn small_cfg() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.q_space = QSpaceConfig {
            size_x: 4,
            size_y: 4,
            q_xy_num: 4,
            q_z_num: 4,
            q_xy_max: 0.3,
            q_z_max: 0.3,
            ..cfg.q_space
        };
        cfg.polar.angular_size = 4;
        cfg.polar.q_size = 4;
        cfg
    }

    fn write_tif(dir: &Path, name: &str, width: u32, height: u32, value: u16) -> PathBuf {
        let path = dir.join(name);
        let img: image::ImageBuffer<image::Luma<u16>, Vec<u16>> =
            image::ImageBuffer::from_pixel(width, height, image::Luma([value]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn process_batch_sums_frames_and_remaps() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = write_tif(dir.path(), "a.tif", 4, 4, 10);
        let p2 = write_tif(dir.path(), "b.tif", 4, 4, 20);

        let batch = PathBatch::new(vec![p1, p2], 0);
        let cfg = small_cfg();
        let mut rec = TimeRecorder::new("preprocessor", true);

        let processed = process_batch(&batch, &cfg, &mut rec).unwrap();
        assert_eq!(processed.q_image.width(), 4);
        assert_eq!(processed.polar_img.unwrap().width(), 4);
        assert_eq!(processed.processed_img.width(), 4);
        assert!(processed.img.is_none());
    }

    #[test]
    fn process_batch_drops_on_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = write_tif(dir.path(), "a.tif", 2, 2, 10);

        let batch = PathBatch::new(vec![p1], 0);
        let cfg = small_cfg();
        let mut rec = TimeRecorder::new("preprocessor", true);

        let err = process_batch(&batch, &cfg, &mut rec).unwrap_err();
        assert!(matches!(err, PreprocessError::ShapeMismatch { .. }));
    }
}
