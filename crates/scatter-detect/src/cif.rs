use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CifError {
    #[error("could not read CIF file {0}: {1}")]
    Read(std::path::PathBuf, std::io::Error),
    #[error("CIF file {0} is missing required tag `{1}`")]
    MissingTag(std::path::PathBuf, &'static str),
}

/// The unit-cell parameters a CIF file describes. Lengths in angstroms,
/// angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

/// Extracts `_cell_length_*`/`_cell_angle_*` tags from a CIF file's flat
/// `tag value` lines. Ignores everything else in the file (symmetry
/// operations, atom sites, loops) — reflection generation here uses only
/// the unit cell, not the basis.
pub fn read_unit_cell(path: &Path) -> Result<UnitCell, CifError> {
    let text = std::fs::read_to_string(path).map_err(|e| CifError::Read(path.to_path_buf(), e))?;
    parse_unit_cell(&text, path)
}

fn parse_unit_cell(text: &str, path: &Path) -> Result<UnitCell, CifError> {
    let mut tags = std::collections::HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if !line.starts_with('_') {
            continue;
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        let tag = parts.next().unwrap_or("");
        let value = parts.next().unwrap_or("").trim();
        if let Ok(v) = value.split('(').next().unwrap_or("").trim().parse::<f64>() {
            tags.insert(tag.to_string(), v);
        }
    }

    let get = |tag: &'static str| tags.get(tag).copied().ok_or_else(|| CifError::MissingTag(path.to_path_buf(), tag));

    Ok(UnitCell {
        a: get("_cell_length_a")?,
        b: get("_cell_length_b")?,
        c: get("_cell_length_c")?,
        alpha: get("_cell_angle_alpha")?,
        beta: get("_cell_angle_beta")?,
        gamma: get("_cell_angle_gamma")?,
    })
}
