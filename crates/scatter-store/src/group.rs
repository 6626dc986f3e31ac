use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::{AttrValue, DatasetValue};

/// Marks a group as holding one frame's worth of image data, mirroring
/// `h5utils.py`'s `IMAGE_DATASET_ATTR` sentinel.
pub const IMAGE_DATASET_ATTR: &str = "IMAGE_DATASET";

/// A named node in the container's tree: attributes, datasets, and
/// nested subgroups. The root of a [`crate::Container`] is itself a
/// `Group` with an empty name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub attrs: BTreeMap<String, AttrValue>,
    pub datasets: BTreeMap<String, DatasetValue>,
    pub subgroups: BTreeMap<String, Group>,
}

impl Group {
    pub fn is_image_group(&self) -> bool {
        self.attrs.contains_key(IMAGE_DATASET_ATTR)
    }

    /// Picks a collision-free child name under this group: `name` itself
    /// if free, otherwise `name-00001`, `name-00002`, ... Mirrors the
    /// dash-separated zero-padded suffix scheme.
    pub fn free_child_name(&self, name: &str) -> String {
        if !self.subgroups.contains_key(name) {
            return name.to_string();
        }
        let mut i = 1u32;
        loop {
            let candidate = format!("{name}-{i:05}");
            if !self.subgroups.contains_key(&candidate) {
                return candidate;
            }
            i += 1;
        }
    }

    pub fn insert_subgroup(&mut self, name: &str, group: Group) -> String {
        let resolved = self.free_child_name(name);
        self.subgroups.insert(resolved.clone(), group);
        resolved
    }

    /// Resolves a `/`-separated path of subgroup names, empty or `/`
    /// meaning this group itself.
    pub fn resolve(&self, path: &str) -> Option<&Group> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Some(self);
        }
        let mut node = self;
        for segment in path.split('/') {
            node = node.subgroups.get(segment)?;
        }
        Some(node)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.subgroups.keys().cloned().collect();
        keys.extend(self.datasets.keys().cloned());
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_child_name_avoids_collisions() {
        let mut g = Group::default();
        assert_eq!(g.free_child_name("frame"), "frame");
        g.insert_subgroup("frame", Group::default());
        assert_eq!(g.free_child_name("frame"), "frame-00001");
        g.insert_subgroup("frame", Group::default());
        assert_eq!(g.free_child_name("frame"), "frame-00002");
    }

    #[test]
    fn resolve_walks_nested_path() {
        let mut root = Group::default();
        let mut child = Group::default();
        child.attrs.insert(IMAGE_DATASET_ATTR.to_string(), AttrValue::Flag(true));
        root.insert_subgroup("batch", {
            let mut batch = Group::default();
            batch.insert_subgroup("frame", child);
            batch
        });

        let found = root.resolve("batch/frame").unwrap();
        assert!(found.is_image_group());
        assert!(root.resolve("batch/missing").is_none());
    }
}
