use serde::{Deserialize, Serialize};

use scatter_model::image::FloatImage;

/// A dataset stored under a group: either a 2D image or a flat series
/// (detection scores, peak intensities, matched q-values).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatasetValue {
    Image(FloatImage),
    Series(Vec<f32>),
}

impl DatasetValue {
    pub fn as_image(&self) -> Option<&FloatImage> {
        match self {
            DatasetValue::Image(img) => Some(img),
            DatasetValue::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&[f32]> {
        match self {
            DatasetValue::Series(s) => Some(s),
            DatasetValue::Image(_) => None,
        }
    }
}

/// A group attribute. `h5py` attributes can hold arbitrary array/scalar
/// types; a frame group only ever needs these four.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Flag(bool),
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Integer(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Real(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Flag(v)
    }
}
