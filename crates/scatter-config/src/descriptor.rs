/// The kind of value a field holds, for validation and for listing the
/// config surface without reflecting over the struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Bool,
    String,
    Path,
}

/// One entry in the config's field table. Stands in for the upstream's
/// `GUI_CONFIG_GROUPS` — a reflection-built ordered dict of widgets —
/// with a plain static table, since nothing here needs a dynamically
/// discovered GUI surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub group: &'static str,
    pub field: &'static str,
    pub kind: FieldKind,
}

macro_rules! field {
    ($group:literal, $field:literal, $kind:expr) => {
        FieldDescriptor {
            group: $group,
            field: $field,
            kind: $kind,
        }
    };
}

/// Every field in [`crate::AppConfig`], grouped and ordered the way the
/// upstream's `GUI_CONFIG_GROUPS` ordered them.
pub const FIELD_DESCRIPTORS: &[FieldDescriptor] = &[
    field!("job", "config_path", FieldKind::String),
    field!("job", "folder_name", FieldKind::String),
    field!("job", "data_dir", FieldKind::Path),
    field!("job", "name", FieldKind::String),
    field!("job", "rewrite_previous", FieldKind::Bool),
    field!("general", "sum_images", FieldKind::Int),
    field!("general", "real_time", FieldKind::Bool),
    field!("general", "timeout_secs", FieldKind::Float),
    field!("general", "sleep_time_secs", FieldKind::Float),
    field!("cluster", "partition", FieldKind::String),
    field!("cluster", "reservation", FieldKind::String),
    field!("cluster", "time", FieldKind::String),
    field!("cluster", "nodes", FieldKind::Int),
    field!("cluster", "chdir", FieldKind::Path),
    field!("cluster", "use_cuda", FieldKind::Bool),
    field!("cluster", "max_cores", FieldKind::Int),
    field!("q_space", "z0", FieldKind::Float),
    field!("q_space", "y0", FieldKind::Float),
    field!("q_space", "size_x", FieldKind::Int),
    field!("q_space", "size_y", FieldKind::Int),
    field!("q_space", "wavelength", FieldKind::Float),
    field!("q_space", "pixel_size", FieldKind::Float),
    field!("q_space", "distance", FieldKind::Float),
    field!("q_space", "incidence_angle", FieldKind::Float),
    field!("q_space", "q_xy_max", FieldKind::Float),
    field!("q_space", "q_z_max", FieldKind::Float),
    field!("q_space", "q_xy_num", FieldKind::Int),
    field!("q_space", "q_z_num", FieldKind::Int),
    field!("q_space", "flip_y", FieldKind::Bool),
    field!("q_space", "flip_x", FieldKind::Bool),
    field!("matching", "perform_matching", FieldKind::Bool),
    field!("matching", "max_distance", FieldKind::Float),
    field!("matching", "cif_folder", FieldKind::Path),
    field!("contrast", "limit", FieldKind::Float),
    field!("contrast", "coef", FieldKind::Float),
    field!("contrast", "log", FieldKind::Bool),
    field!("contrast", "disable", FieldKind::Bool),
    field!("parallel", "parallel_computation", FieldKind::Bool),
    field!("parallel", "max_batch", FieldKind::Int),
    field!("polar", "angular_size", FieldKind::Int),
    field!("polar", "q_size", FieldKind::Int),
    field!("post_processing", "nms_level", FieldKind::Float),
    field!("post_processing", "score_level", FieldKind::Float),
    field!("model", "name", FieldKind::String),
    field!("save", "save_img", FieldKind::Bool),
    field!("save", "save_q_img", FieldKind::Bool),
    field!("save", "save_polar_img", FieldKind::Bool),
    field!("save", "save_scores", FieldKind::Bool),
    field!("save", "save_intensities", FieldKind::Bool),
    field!("log", "record_time", FieldKind::Bool),
    field!("log", "debug", FieldKind::Bool),
    field!("log", "log_to_file", FieldKind::Bool),
    field!("program_paths", "local_env", FieldKind::Bool),
];

pub fn fields_in_group(group: &str) -> impl Iterator<Item = &'static FieldDescriptor> {
    FIELD_DESCRIPTORS.iter().filter(move |d| d.group == group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_group_has_at_least_one_field() {
        let groups = [
            "job",
            "general",
            "cluster",
            "q_space",
            "matching",
            "contrast",
            "parallel",
            "polar",
            "post_processing",
            "model",
            "save",
            "log",
            "program_paths",
        ];
        for group in groups {
            assert!(
                fields_in_group(group).count() > 0,
                "group {group} has no descriptors"
            );
        }
    }
}
