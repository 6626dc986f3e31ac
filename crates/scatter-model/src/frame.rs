use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::image::FloatImage;

/// A batch of source file paths the Scanner has claimed for one cycle.
///
/// `cursor` is the number of images the Scanner had already handed out
/// before this batch, so downstream stages and the record file can report
/// progress without re-deriving it from directory listings.
#[derive(Debug, Clone, PartialEq)]
pub struct PathBatch {
    pub paths: Vec<PathBuf>,
    pub cursor: u64,
}

impl PathBatch {
    pub fn new(paths: Vec<PathBuf>, cursor: u64) -> Self {
        Self { paths, cursor }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }
}

/// One detector frame decoded from disk, before any remapping.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub source_path: PathBuf,
    pub image: FloatImage,
    pub read_at: SystemTime,
}

impl RawFrame {
    pub fn new(source_path: impl Into<PathBuf>, image: FloatImage, read_at: SystemTime) -> Self {
        Self {
            source_path: source_path.into(),
            image,
            read_at,
        }
    }

    pub fn file_stem(&self) -> Option<&str> {
        self.source_path.file_stem().and_then(|s| s.to_str())
    }

    pub fn source_dir(&self) -> Option<&Path> {
        self.source_path.parent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_batch_reports_len_and_emptiness() {
        let empty = PathBatch::new(vec![], 0);
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);

        let batch = PathBatch::new(vec![PathBuf::from("a.tif"), PathBuf::from("b.tif")], 10);
        assert!(!batch.is_empty());
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.cursor, 10);
    }

    #[test]
    fn raw_frame_derives_stem_and_dir() {
        let frame = RawFrame::new(
            "/data/run1/frame_0003.tif",
            FloatImage::zeros(1, 1),
            SystemTime::now(),
        );
        assert_eq!(frame.file_stem(), Some("frame_0003"));
        assert_eq!(frame.source_dir(), Some(Path::new("/data/run1")));
    }
}
