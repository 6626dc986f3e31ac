use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::groups::{
    ClusterConfig, ContrastConfig, GeneralConfig, JobConfig, LogConfig, MatchingConfig,
    ModelConfig, ParallelConfig, PolarConversionConfig, PostProcessingConfig,
    ProgramPathsConfig, QSpaceConfig, SaveConfig,
};

/// The full config, one group per `[section]` in the TOML file. Field
/// groups match the table in `spec.md` §6 one-to-one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub job: JobConfig,
    pub cluster: ClusterConfig,
    pub q_space: QSpaceConfig,
    pub matching: MatchingConfig,
    pub contrast: ContrastConfig,
    pub parallel: ParallelConfig,
    pub polar: PolarConversionConfig,
    pub post_processing: PostProcessingConfig,
    pub save: SaveConfig,
    pub model: ModelConfig,
    pub log: LogConfig,
    pub program_paths: ProgramPathsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            job: JobConfig::default(),
            cluster: ClusterConfig::default(),
            q_space: QSpaceConfig::default(),
            matching: MatchingConfig::default(),
            contrast: ContrastConfig::default(),
            parallel: ParallelConfig::default(),
            polar: PolarConversionConfig::default(),
            post_processing: PostProcessingConfig::default(),
            save: SaveConfig::default(),
            model: ModelConfig::default(),
            log: LogConfig::default(),
            program_paths: ProgramPathsConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn src_path(&self) -> PathBuf {
        let mut path = self.job.data_dir.clone();
        if !self.program_paths.local_env {
            path.push("raw");
        }
        path.push(&self.job.folder_name);
        path
    }

    pub fn dest_path(&self) -> PathBuf {
        let mut path = self.job.data_dir.clone();
        if !self.program_paths.local_env {
            path.push("processed");
        }
        path
    }

    pub fn device(&self) -> &'static str {
        if self.cluster.use_cuda { "cuda" } else { "cpu" }
    }

    pub fn log_filename(&self) -> Option<PathBuf> {
        self.log
            .log_to_file
            .then(|| self.dest_path().join(format!("{}.log", self.job.id_name())))
    }

    pub fn record_filename(&self) -> Option<PathBuf> {
        (!self.log.no_time_record())
            .then(|| self.dest_path().join(format!("record_time_{}.bin", self.job.id_name())))
    }

    pub fn container_filename(&self) -> PathBuf {
        self.dest_path().join(format!("{}.gxs", self.job.id_name()))
    }
}
