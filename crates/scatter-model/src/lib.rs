//! Plain data types shared by every pipeline stage.
//!
//! Nothing in this crate spawns a thread, opens a file, or reads a
//! config: it is the vocabulary the stages exchange over their queues.

pub mod detection;
pub mod frame;
pub mod image;
pub mod record;

pub use detection::DetectionResult;
pub use frame::{PathBatch, RawFrame};
pub use image::FloatImage;
pub use record::ProcessedRecord;
