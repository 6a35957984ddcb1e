// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! A content-addressed cache of transformed resource content. */

use {
    anyhow::{Context, Result},
    sha2::Digest,
    std::{
        io::Write,
        path::{Path, PathBuf},
    },
};

/// Identifies a cache entry.
///
/// Derived from the transform parameters and the input content.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(parameters: &[u8], data: &[u8]) -> Self {
        let mut hasher = sha2::Sha256::new();
        hasher.update((parameters.len() as u64).to_le_bytes());
        hasher.update(parameters);
        hasher.update(data);

        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A directory holding one file per cache entry.
///
/// Entries are written once and never modified. Writers stage content in a
/// temporary file in the same directory and rename it into place, so
/// readers only ever see complete entries.
#[derive(Clone, Debug)]
pub struct ContentCache {
    dir: PathBuf,
}

impl ContentCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    /// Obtain the content of an entry.
    ///
    /// A missing entry or cache directory is `Ok(None)`.
    pub fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key);

        match std::fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading cache entry {}", path.display())),
        }
    }

    /// Store the content of an entry.
    pub fn put(&self, key: &CacheKey, data: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating cache directory {}", self.dir.display()))?;

        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("creating temporary file in {}", self.dir.display()))?;
        temp.write_all(data)?;

        let path = self.entry_path(key);
        temp.persist(&path)
            .with_context(|| format!("persisting cache entry {}", path.display()))?;

        Ok(())
    }
}
