use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Log scaling + CLAHE parameters applied after reciprocal-space remap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastConfig {
    /// Relative clip value (CLAHE parameter).
    pub limit: f64,
    /// Normalization value applied after CLAHE.
    pub coef: f64,
    /// Apply a logarithm to images before CLAHE.
    pub log: bool,
    pub disable: bool,
}

impl Default for ContrastConfig {
    fn default() -> Self {
        Self {
            limit: 2000.0,
            coef: 5000.0,
            log: true,
            disable: false,
        }
    }
}

/// The interpolation kernel used when remapping into q-space or polar
/// space, mirroring the upstream's OpenCV `INTER_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleAlgorithm {
    Bilinear,
    Bicubic,
    Lanczos4,
}

impl Default for ResampleAlgorithm {
    fn default() -> Self {
        ResampleAlgorithm::Bilinear
    }
}

/// Beamline geometry used to derive the reciprocal-space remap grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QSpaceConfig {
    /// Vertical beam center coordinate, in detector pixels.
    pub z0: f64,
    /// Horizontal beam center coordinate, in detector pixels.
    pub y0: f64,
    pub size_x: u32,
    pub size_y: u32,
    /// Wavelength in angstroms.
    pub wavelength: f64,
    /// Pixel size in mm.
    pub pixel_size: f64,
    /// Sample-detector distance in mm.
    pub distance: f64,
    /// Incidence angle in degrees.
    pub incidence_angle: f64,
    pub q_xy_max: f64,
    pub q_z_max: f64,
    pub q_xy_num: u32,
    pub q_z_num: u32,
    pub flip_y: bool,
    pub flip_x: bool,
}

impl Default for QSpaceConfig {
    fn default() -> Self {
        Self {
            z0: 0.0,
            y0: 0.0,
            size_x: 2048,
            size_y: 2048,
            wavelength: 0.6888,
            pixel_size: 0.2,
            distance: 1000.0,
            incidence_angle: 0.5,
            q_xy_max: 2.7,
            q_z_max: 2.7,
            q_xy_num: 1350,
            q_z_num: 1350,
            flip_y: true,
            flip_x: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Number of consecutive images to sum before processing.
    pub sum_images: u32,
    /// Wait for new files instead of stopping once the source is drained.
    pub real_time: bool,
    /// Seconds to wait for new images before the Scanner gives up.
    pub timeout_secs: f64,
    /// Seconds the Scanner sleeps between empty poll cycles.
    pub sleep_time_secs: f64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            sum_images: 10,
            real_time: false,
            timeout_secs: 120.0,
            sleep_time_secs: 0.1,
        }
    }
}

impl GeneralConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs.max(0.0))
    }

    pub fn sleep_time(&self) -> Duration {
        Duration::from_secs_f64(self.sleep_time_secs.max(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessingConfig {
    /// IoU threshold for non-maximum suppression.
    pub nms_level: f32,
    /// Minimum detector confidence kept after NMS.
    pub score_level: f32,
}

impl Default for PostProcessingConfig {
    fn default() -> Self {
        Self {
            nms_level: 0.1,
            score_level: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolarConversionConfig {
    pub angular_size: u32,
    pub q_size: u32,
    pub algorithm: ResampleAlgorithm,
}

impl Default for PolarConversionConfig {
    fn default() -> Self {
        Self {
            angular_size: 512,
            q_size: 1024,
            algorithm: ResampleAlgorithm::Bilinear,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Record per-stage timings and write them out on clean shutdown.
    pub record_time: bool,
    pub debug: bool,
    pub log_to_file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            record_time: true,
            debug: false,
            log_to_file: false,
        }
    }
}

impl LogConfig {
    pub fn level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }

    pub fn no_time_record(&self) -> bool {
        !self.record_time
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    pub parallel_computation: bool,
    /// Max batch size handed to the detector model at once.
    pub max_batch: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            parallel_computation: false,
            max_batch: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub partition: String,
    pub reservation: String,
    /// Max job time in `HH:MM:SS`.
    pub time: String,
    pub nodes: u32,
    pub chdir: PathBuf,
    pub use_cuda: bool,
    /// Max cpu cores; non-positive means "use them all".
    pub max_cores: i64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            partition: "pxs".to_string(),
            reservation: String::new(),
            time: "01:00:00".to_string(),
            nodes: 1,
            chdir: PathBuf::from("~/maxwell_output/"),
            use_cuda: false,
            max_cores: -1,
        }
    }
}

impl ClusterConfig {
    pub fn parse_time(&self) -> Option<Duration> {
        let mut parts = self.time.splitn(3, ':');
        let h: u64 = parts.next()?.parse().ok()?;
        let m: u64 = parts.next()?.parse().ok()?;
        let s: u64 = parts.next()?.parse().ok()?;
        Some(Duration::from_secs(h * 3600 + m * 60 + s))
    }

    /// 90% of the configured job time, used as the Coordinator's cushion
    /// so cleanup has time to run before the scheduler kills the process.
    pub fn cushioned_timeout(&self) -> Option<Duration> {
        self.parse_time()
            .map(|d| Duration::from_secs_f64(d.as_secs_f64() * 0.9))
    }

    pub fn resolved_worker_count(&self, available: usize) -> usize {
        if self.max_cores > 0 {
            (self.max_cores as usize).min(available)
        } else {
            available
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Match detected peaks against simulated crystal-structure peaks.
    pub perform_matching: bool,
    /// Max accepted distance between simulated and experimental peaks, in angstroms.
    pub max_distance: f64,
    pub cif_folder: PathBuf,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            perform_matching: true,
            max_distance: 0.05,
            cif_folder: PathBuf::from("./cif"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    pub save_img: bool,
    pub save_q_img: bool,
    pub save_polar_img: bool,
    pub save_scores: bool,
    pub save_intensities: bool,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            save_img: false,
            save_q_img: false,
            save_polar_img: true,
            save_scores: true,
            save_intensities: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramPathsConfig {
    /// Run against `data_dir` directly instead of its `raw`/`processed` subfolders.
    pub local_env: bool,
}

impl Default for ProgramPathsConfig {
    fn default() -> Self {
        Self { local_env: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "save_only_largest_2".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub config_path: String,
    pub folder_name: String,
    pub data_dir: PathBuf,
    pub name: String,
    pub rewrite_previous: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            config_path: String::new(),
            folder_name: String::new(),
            data_dir: PathBuf::new(),
            name: "run".to_string(),
            rewrite_previous: true,
        }
    }
}

impl JobConfig {
    pub fn id_name(&self) -> String {
        format!("{}_{}", self.name, self.folder_name)
    }
}
