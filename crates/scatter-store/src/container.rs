use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::group::{Group, IMAGE_DATASET_ATTR};
use crate::value::{AttrValue, DatasetValue};

const CONTAINER_MAGIC: &[u8; 8] = b"SCATGXS\0";
const CONTAINER_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read container {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write container {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("container {path} is not a valid container file")]
    Invalid { path: PathBuf },
    #[error("container {path} uses unsupported format version {found} (expected {expected})")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
    #[error("malformed container contents: {0}")]
    Corrupt(#[from] Box<bincode::ErrorKind>),
}

#[derive(Debug, Serialize, Deserialize)]
struct OnDisk {
    magic: [u8; 8],
    version: u32,
    root: Group,
}

/// What a key in the container resolves to, mirroring `h5utils.py`'s
/// `H5Items` classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerItem {
    NotExist,
    Group,
    ImageGroup,
    Dataset,
    Root,
}

/// A hierarchical, in-memory container of groups/attributes/datasets,
/// persisted as a single bincode-encoded file. Plays the role
/// `h5utils.py`'s `H5FileManager` plays around an HDF5 file, without a
/// system HDF5 dependency: this crate's scale (one run's worth of
/// frames, not terabyte datasets) doesn't need HDF5's chunked/streaming
/// machinery, so the whole tree is loaded and rewritten on each save.
#[derive(Debug, Default)]
pub struct Container {
    root: Group,
}

impl Container {
    pub fn new() -> Self {
        Self { root: Group::default() }
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let on_disk: OnDisk = bincode::deserialize_from(BufReader::new(file))?;
        if &on_disk.magic != CONTAINER_MAGIC {
            return Err(StoreError::Invalid { path: path.to_path_buf() });
        }
        if on_disk.version != CONTAINER_VERSION {
            return Err(StoreError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: on_disk.version,
                expected: CONTAINER_VERSION,
            });
        }
        Ok(Self { root: on_disk.root })
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let on_disk = OnDisk {
            magic: *CONTAINER_MAGIC,
            version: CONTAINER_VERSION,
            root: self.root.clone(),
        };
        let file = File::create(path).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        bincode::serialize_into(BufWriter::new(file), &on_disk)?;
        tracing::debug!(path = %path.display(), "container saved");
        Ok(())
    }

    /// Creates (or reuses, with a collision-avoided name) a top-level
    /// group, returning the name actually used. Mirrors `init_group`.
    pub fn init_folder(&mut self, name: &str) -> String {
        self.root.insert_subgroup(name, Group::default())
    }

    /// Saves one frame's datasets + attrs under `folder/file_name`,
    /// creating `folder` if absent and avoiding name collisions inside
    /// it. Mirrors `H5FileManager.save`/`init_img_group`/`save_image_data`.
    pub fn save_image(
        &mut self,
        folder: &str,
        file_name: &str,
        datasets: BTreeMap<String, DatasetValue>,
        mut attrs: BTreeMap<String, AttrValue>,
    ) -> String {
        attrs.insert(IMAGE_DATASET_ATTR.to_string(), AttrValue::Flag(true));
        let group = Group {
            attrs,
            datasets,
            subgroups: BTreeMap::new(),
        };

        if !self.root.subgroups.contains_key(folder) {
            self.root.insert_subgroup(folder, Group::default());
        }
        let parent = self.root.subgroups.get_mut(folder).expect("just inserted");
        parent.insert_subgroup(file_name, group)
    }

    pub fn read_image(&self, image_key: &str) -> Option<&Group> {
        self.root.resolve(image_key).filter(|g| g.is_image_group())
    }

    pub fn read_dataset(&self, key: &str) -> Option<&DatasetValue> {
        let (group_path, dataset_name) = key.trim_matches('/').rsplit_once('/')?;
        self.root.resolve(group_path)?.datasets.get(dataset_name)
    }

    pub fn parse_group(&self, folder_name: &str) -> Option<Vec<String>> {
        self.root.resolve(folder_name).map(|g| g.keys())
    }

    pub fn key_type(&self, key: &str) -> ContainerItem {
        if key.is_empty() || key == "/" {
            return ContainerItem::Root;
        }
        match self.root.resolve(key) {
            Some(g) if g.is_image_group() => ContainerItem::ImageGroup,
            Some(_) => ContainerItem::Group,
            None => {
                if self.read_dataset(key).is_some() {
                    ContainerItem::Dataset
                } else {
                    ContainerItem::NotExist
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scatter_model::image::FloatImage;

    #[test]
    fn save_and_reload_round_trips_an_image_group() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.gxs");

        let mut container = Container::new();
        let mut datasets = BTreeMap::new();
        datasets.insert("q_image".to_string(), DatasetValue::Image(FloatImage::zeros(4, 4)));
        datasets.insert("scores".to_string(), DatasetValue::Series(vec![0.9, 0.3]));
        container.save_image("frame_0001", "frame_0001.tif", datasets, BTreeMap::new());
        container.save(&path).unwrap();

        let reloaded = Container::load(&path).unwrap();
        let group = reloaded.read_image("frame_0001/frame_0001.tif").unwrap();
        assert!(group.is_image_group());
        assert_eq!(group.datasets.get("scores").unwrap().as_series().unwrap(), &[0.9, 0.3]);
    }

    #[test]
    fn save_image_avoids_name_collisions() {
        let mut container = Container::new();
        let name1 = container.save_image("frames", "a.tif", BTreeMap::new(), BTreeMap::new());
        let name2 = container.save_image("frames", "a.tif", BTreeMap::new(), BTreeMap::new());
        assert_ne!(name1, name2);
    }

    #[test]
    fn key_type_classifies_groups_and_datasets() {
        let mut container = Container::new();
        let mut datasets = BTreeMap::new();
        datasets.insert("q_image".to_string(), DatasetValue::Image(FloatImage::zeros(2, 2)));
        container.save_image("frames", "a.tif", datasets, BTreeMap::new());

        assert_eq!(container.key_type(""), ContainerItem::Root);
        assert_eq!(container.key_type("frames"), ContainerItem::Group);
        assert_eq!(container.key_type("frames/a.tif"), ContainerItem::ImageGroup);
        assert_eq!(container.key_type("frames/a.tif/q_image"), ContainerItem::Dataset);
        assert_eq!(container.key_type("frames/missing"), ContainerItem::NotExist);
    }

    #[test]
    fn load_rejects_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_a_container.gxs");
        std::fs::write(&path, b"not a container").unwrap();
        assert!(Container::load(&path).is_err());
    }
}
