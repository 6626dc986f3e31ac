//! A hierarchical container file format for processed frames and their
//! detection results.
//!
//! Plays the role an HDF5 file plays for the Writer stage — nested
//! groups, attributes, and named datasets — without linking against
//! libhdf5: a run's worth of frames comfortably fits the
//! load-whole-tree/rewrite-whole-tree model this crate uses.

pub mod container;
pub mod group;
pub mod value;

pub use container::{Container, ContainerItem, StoreError};
pub use group::{Group, IMAGE_DATASET_ATTR};
pub use value::{AttrValue, DatasetValue};
