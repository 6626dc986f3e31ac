//! Configuration groups, field descriptors, and TOML-backed load/save.

mod app_config;
mod descriptor;
mod error;
mod groups;
mod io;

pub use app_config::AppConfig;
pub use descriptor::{fields_in_group, FieldDescriptor, FieldKind, FIELD_DESCRIPTORS};
pub use error::ConfigError;
pub use groups::{
    ClusterConfig, ContrastConfig, GeneralConfig, JobConfig, LogConfig, MatchingConfig,
    ModelConfig, ParallelConfig, PolarConversionConfig, PostProcessingConfig,
    ProgramPathsConfig, QSpaceConfig, ResampleAlgorithm, SaveConfig,
};
pub use io::{save_default, ConfigFile};
