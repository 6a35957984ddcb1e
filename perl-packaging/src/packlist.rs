// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Reading of `.packlist` distribution manifests. */

use {
    crate::module_util::{resource_name_from_relative_path, PACKLIST_EXTENSIONS},
    anyhow::{Context, Result},
    once_cell::sync::Lazy,
    regex::Regex,
    std::path::{Path, PathBuf},
};

static RE_ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+\w+=.*$").expect("annotation regex should compile"));

/// How install roots are matched against `.packlist` entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackListRootPolicy {
    /// Use the first search root that is a prefix of the entry.
    FirstMatching,

    /// Only consider the first search root. Entries outside it are ignored.
    FirstRootOnly,
}

impl Default for PackListRootPolicy {
    fn default() -> Self {
        Self::FirstMatching
    }
}

/// Parse the content of a `.packlist` file.
///
/// Returns the paths of installed files having an extension of interest.
/// Trailing `key=value` annotations are removed.
pub fn parse_packlist(data: &[u8]) -> Vec<PathBuf> {
    String::from_utf8_lossy(data)
        .lines()
        .map(|line| RE_ANNOTATION.replace(line, "").to_string())
        .filter(|line| !line.trim().is_empty())
        .map(PathBuf::from)
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| PACKLIST_EXTENSIONS.contains(&ext))
                .unwrap_or(false)
        })
        .collect()
}

/// Read and parse a `.packlist` file.
pub fn read_packlist(path: &Path) -> Result<Vec<PathBuf>> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    Ok(parse_packlist(&data))
}

/// Map `.packlist` entries to resource names relative to a search root.
///
/// Returns `(resource name, absolute path)` pairs. Entries not under an
/// applicable root are skipped.
pub fn resolve_packlist_entries(
    entries: &[PathBuf],
    search_roots: &[PathBuf],
    policy: PackListRootPolicy,
) -> Vec<(String, PathBuf)> {
    let roots = match policy {
        PackListRootPolicy::FirstMatching => search_roots,
        PackListRootPolicy::FirstRootOnly => &search_roots[..search_roots.len().min(1)],
    };

    entries
        .iter()
        .filter_map(|entry| {
            roots.iter().find_map(|root| {
                entry
                    .strip_prefix(root)
                    .ok()
                    .filter(|rel| rel.components().next().is_some())
                    .map(|rel| (resource_name_from_relative_path(rel), entry.clone()))
            })
        })
        .collect()
}
