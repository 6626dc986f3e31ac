//! Reciprocal-space and polar coordinate remapping, plus contrast
//! correction, for raw detector frames.

pub mod contrast;
pub mod grid;
pub mod resample;

use scatter_config::{AppConfig, ResampleAlgorithm};
use scatter_model::FloatImage;

/// Remaps a raw detector frame into q-space and polar space, then
/// contrast-corrects the polar remap into the detector's input. Both
/// the raw polar remap and its corrected counterpart are returned since
/// `ProcessedRecord` keeps them as two distinct, independently
/// selectable products (`polar_img` vs. `processed_img`).
pub struct Preprocessed {
    pub q_image: FloatImage,
    pub polar_img: FloatImage,
    pub processed_img: FloatImage,
}

pub fn preprocess(raw: &FloatImage, cfg: &AppConfig) -> Preprocessed {
    let flipped = resample::flip(raw, cfg.q_space.flip_x, cfg.q_space.flip_y);

    let q_grid = grid::q_space_grid(&cfg.q_space);
    let q_image = resample::remap(&flipped, &q_grid, ResampleAlgorithm::Bilinear);

    let polar_grid = grid::polar_grid(&cfg.q_space, cfg.polar.angular_size, cfg.polar.q_size);
    let polar_img = resample::remap(&flipped, &polar_grid, cfg.polar.algorithm);
    let processed_img = contrast::correct(&polar_img, &cfg.contrast);

    Preprocessed { q_image, polar_img, processed_img }
}

/// Checks a raw frame against the configured raw detector dimensions.
/// A mismatch is a soft-failure per the Preprocessor's shape-check
/// drop-batch policy, not a fatal error.
pub fn matches_expected_shape(raw: &FloatImage, cfg: &AppConfig) -> bool {
    raw.width() == cfg.q_space.size_x as usize && raw.height() == cfg.q_space.size_y as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use scatter_config::QSpaceConfig;

    fn small_cfg() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.q_space = QSpaceConfig {
            size_x: 16,
            size_y: 16,
            q_xy_num: 8,
            q_z_num: 8,
            q_xy_max: 0.3,
            q_z_max: 0.3,
            ..cfg.q_space
        };
        cfg.polar.angular_size = 6;
        cfg.polar.q_size = 6;
        cfg
    }

    #[test]
    fn matches_expected_shape_checks_configured_size() {
        let cfg = small_cfg();
        let raw = FloatImage::zeros(16, 16);
        assert!(matches_expected_shape(&raw, &cfg));
        let wrong = FloatImage::zeros(8, 8);
        assert!(!matches_expected_shape(&wrong, &cfg));
    }

    #[test]
    fn preprocess_produces_configured_shapes() {
        let cfg = small_cfg();
        let raw = FloatImage::zeros(16, 16);
        let out = preprocess(&raw, &cfg);
        assert_eq!(out.q_image.width(), 8);
        assert_eq!(out.q_image.height(), 8);
        assert_eq!(out.polar_img.width(), 6);
        assert_eq!(out.polar_img.height(), 6);
        assert_eq!(out.processed_img.width(), 6);
        assert_eq!(out.processed_img.height(), 6);
    }
}
