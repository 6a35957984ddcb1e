// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Defines types representing Perl resources. */

use {
    anyhow::{Context, Result},
    std::{
        collections::{btree_map, BTreeMap},
        path::{Path, PathBuf},
    },
};

/// Represents an abstract location for binary data.
///
/// Data can be backed by memory or by a path in the filesystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataLocation {
    Path(PathBuf),
    Memory(Vec<u8>),
}

impl DataLocation {
    /// Resolve the raw content of this instance.
    pub fn resolve(&self) -> Result<Vec<u8>> {
        match self {
            DataLocation::Path(p) => {
                std::fs::read(p).with_context(|| format!("reading {}", p.display()))
            }
            DataLocation::Memory(data) => Ok(data.clone()),
        }
    }

    /// The filesystem path backing this instance, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            DataLocation::Path(p) => Some(p),
            DataLocation::Memory(_) => None,
        }
    }
}

impl From<&Path> for DataLocation {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for DataLocation {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<u8>> for DataLocation {
    fn from(data: Vec<u8>) -> Self {
        Self::Memory(data)
    }
}

/// A named resource to be embedded in a bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleResource {
    /// The name the resource is looked up by. e.g. `Foo/Bar.pm`.
    pub name: String,

    /// Where the content of the resource comes from.
    pub location: DataLocation,

    /// Whether content transforms must leave this resource alone.
    pub binary: bool,
}

impl BundleResource {
    pub fn new(name: impl Into<String>, location: impl Into<DataLocation>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            binary: false,
        }
    }

    /// Construct a resource whose content is never transformed.
    pub fn new_binary(name: impl Into<String>, location: impl Into<DataLocation>) -> Self {
        Self {
            binary: true,
            ..Self::new(name, location)
        }
    }
}

/// A set of resources keyed by unique name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceCollection {
    resources: BTreeMap<String, BundleResource>,
}

impl ResourceCollection {
    /// Add a resource, replacing any resource of the same name.
    ///
    /// The replaced resource is returned.
    pub fn add_resource(&mut self, resource: BundleResource) -> Option<BundleResource> {
        self.resources.insert(resource.name.clone(), resource)
    }

    pub fn get(&self, name: &str) -> Option<&BundleResource> {
        self.resources.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<BundleResource> {
        self.resources.remove(name)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resource names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.resources.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BundleResource> {
        self.resources.values()
    }
}

impl FromIterator<BundleResource> for ResourceCollection {
    fn from_iter<I: IntoIterator<Item = BundleResource>>(iter: I) -> Self {
        let mut res = Self::default();
        for resource in iter {
            res.add_resource(resource);
        }

        res
    }
}

impl IntoIterator for ResourceCollection {
    type Item = BundleResource;
    type IntoIter = btree_map::IntoValues<String, BundleResource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_values()
    }
}
