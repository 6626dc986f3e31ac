use std::path::PathBuf;
use std::time::SystemTime;

use crate::image::FloatImage;

/// The output of the Preprocessor: a frame remapped into reciprocal
/// space (and optionally polar space), contrast-corrected, ready for
/// the Detector.
#[derive(Debug, Clone)]
pub struct ProcessedRecord {
    pub source_path: PathBuf,
    pub cursor: u64,
    /// The summed raw frame, retained only when `SaveConfig.save_img` asks for it.
    pub img: Option<FloatImage>,
    pub q_image: FloatImage,
    /// The raw polar remap, before contrast correction, retained only
    /// when `SaveConfig.save_polar_img` asks for it.
    pub polar_img: Option<FloatImage>,
    /// The contrast-corrected polar image the Detector runs on.
    pub processed_img: FloatImage,
    pub processed_at: SystemTime,
}

impl ProcessedRecord {
    pub fn new(
        source_path: impl Into<PathBuf>,
        cursor: u64,
        img: Option<FloatImage>,
        q_image: FloatImage,
        polar_img: Option<FloatImage>,
        processed_img: FloatImage,
        processed_at: SystemTime,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            cursor,
            img,
            q_image,
            polar_img,
            processed_img,
            processed_at,
        }
    }

    /// The image the Detector runs on: the contrast-corrected polar
    /// remap, mirroring the upstream's `processed_img`.
    pub fn detector_input(&self) -> &FloatImage {
        &self.processed_img
    }
}
