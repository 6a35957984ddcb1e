// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Discovery of the resources a set of Perl modules depends on.

Starting from a seed set of resources, every `.pm` module is looked up in
the `auto/` tree of the search roots. Autoloaded functions, static
extension archives, extra libraries and (optionally) the files listed in
the distribution's `.packlist` are discovered from there.
*/

use {
    crate::{
        autoload::parse_autoload_index,
        filtering::{apply_filter_rules, FilterRule, GlobPattern},
        module_util::{
            autoload_dir_name, module_base_name, resource_name_from_relative_path,
            resource_name_to_module_name, AUTOSPLIT_INDEX, EXTRALIBS_FILE, MODULE_SUFFIX,
            PACKLIST_FILE,
        },
        packlist::{read_packlist, resolve_packlist_entries, PackListRootPolicy},
        resource::{BundleResource, DataLocation, ResourceCollection},
    },
    anyhow::{anyhow, Context, Result},
    log::{debug, warn},
    std::{
        collections::{BTreeSet, HashSet, VecDeque},
        path::{Path, PathBuf},
    },
};

/// Settings influencing dependency scanning.
#[derive(Clone, Debug)]
pub struct ScanSettings {
    /// Directories modules are installed into, in search order.
    pub search_roots: Vec<PathBuf>,

    /// Whether to bundle files listed in `.packlist` files.
    pub follow_packlists: bool,

    pub packlist_root_policy: PackListRootPolicy,

    /// Filename suffix of static extension archives.
    pub static_library_suffix: String,

    /// Filename suffix of dynamically loadable extension objects.
    pub dynamic_library_suffix: String,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            search_roots: vec![],
            follow_packlists: false,
            packlist_root_policy: PackListRootPolicy::default(),
            static_library_suffix: ".a".to_string(),
            dynamic_library_suffix: ".so".to_string(),
        }
    }
}

/// A static archive providing the XS code of a module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticLibrary {
    /// Module name. e.g. `List::Util`.
    pub module: String,

    pub archive: PathBuf,
}

/// The outcome of dependency scanning.
#[derive(Clone, Debug, Default)]
pub struct ScanResult {
    pub resources: ResourceCollection,
    pub static_libraries: Vec<StaticLibrary>,

    /// Linker arguments required by static extensions.
    pub extra_libraries: BTreeSet<String>,

    pub warnings: Vec<String>,
}

impl ScanResult {
    fn add_discovered(&mut self, name: String, path: PathBuf) -> bool {
        if let Some(existing) = self.resources.get(&name) {
            debug!(
                "{} already provided by {:?}; ignoring {}",
                name,
                existing.location,
                path.display()
            );
            false
        } else {
            debug!("discovered {} at {}", name, path.display());
            self.resources.add_resource(BundleResource::new(name, path));
            true
        }
    }
}

fn ensure_seeds_exist(seed: &ResourceCollection) -> Result<()> {
    for resource in seed.iter() {
        if let DataLocation::Path(path) = &resource.location {
            if !path.is_file() {
                return Err(anyhow!(
                    "resource {} refers to {}, which is not a readable file",
                    resource.name,
                    path.display()
                ));
            }
        }
    }

    Ok(())
}

/// Discover the dependencies of a seed set of resources.
///
/// Filter rules are applied to the seed first. Discovered resources never
/// replace resources already present.
pub fn scan_dependencies(
    seed: ResourceCollection,
    rules: &[FilterRule],
    settings: &ScanSettings,
) -> Result<ScanResult> {
    ensure_seeds_exist(&seed)?;

    let mut res = ScanResult {
        resources: apply_filter_rules(seed, rules),
        ..Default::default()
    };

    let mut queue = res
        .resources
        .names()
        .filter(|name| name.ends_with(MODULE_SUFFIX))
        .cloned()
        .collect::<VecDeque<_>>();
    let mut seen = queue.iter().cloned().collect::<HashSet<_>>();

    while let Some(name) = queue.pop_front() {
        for discovered in scan_module(&name, settings, &mut res)? {
            if seen.insert(discovered.clone()) {
                queue.push_back(discovered);
            }
        }
    }

    Ok(res)
}

/// Scan the `auto/` directory of a single module.
///
/// Returns the names of newly discovered modules.
fn scan_module(name: &str, settings: &ScanSettings, res: &mut ScanResult) -> Result<Vec<String>> {
    let (auto_name, module) = match (autoload_dir_name(name), resource_name_to_module_name(name)) {
        (Some(auto_name), Some(module)) => (auto_name, module),
        _ => return Ok(vec![]),
    };

    let root = match settings
        .search_roots
        .iter()
        .find(|root| root.join(&auto_name).is_dir())
    {
        Some(root) => root,
        None => return Ok(vec![]),
    };
    let auto_dir = root.join(&auto_name);
    let base = module_base_name(name);

    debug!("scanning {} for {}", auto_dir.display(), module);

    let dynamic = auto_dir.join(format!("{}{}", base, settings.dynamic_library_suffix));
    if dynamic.exists() {
        return Err(anyhow!(
            concat!(
                "module {} has a dynamically loadable object at {}; ",
                "modules must be built statically to be bundled"
            ),
            module,
            dynamic.display()
        ));
    }

    let index_path = auto_dir.join(AUTOSPLIT_INDEX);
    if index_path.is_file() {
        scan_autoload_index(&module, root, &auto_name, &index_path, res)?;
    }

    let extralibs = auto_dir.join(EXTRALIBS_FILE);
    if extralibs.is_file() {
        let data = std::fs::read_to_string(&extralibs)
            .with_context(|| format!("reading {}", extralibs.display()))?;
        res.extra_libraries
            .extend(data.split_whitespace().map(|s| s.to_string()));
    }

    let archive = auto_dir.join(format!("{}{}", base, settings.static_library_suffix));
    if archive.is_file() {
        debug!("{} is a static extension in {}", module, archive.display());
        res.static_libraries.push(StaticLibrary {
            module: module.clone(),
            archive,
        });
    }

    let mut discovered = vec![];

    let packlist = auto_dir.join(PACKLIST_FILE);
    if settings.follow_packlists && packlist.is_file() {
        let entries = read_packlist(&packlist)?;

        for (name, path) in resolve_packlist_entries(
            &entries,
            &settings.search_roots,
            settings.packlist_root_policy,
        ) {
            if res.add_discovered(name.clone(), path) && name.ends_with(MODULE_SUFFIX) {
                discovered.push(name);
            }
        }
    }

    Ok(discovered)
}

fn scan_autoload_index(
    module: &str,
    root: &Path,
    auto_name: &str,
    index_path: &Path,
    res: &mut ScanResult,
) -> Result<()> {
    let data =
        std::fs::read(index_path).with_context(|| format!("reading {}", index_path.display()))?;
    let index = parse_autoload_index(&data);

    for w in &index.warnings {
        let message = format!(
            "{}:{}: unrecognized line: {}",
            index_path.display(),
            w.line_number,
            w.line
        );
        warn!("{}", message);
        res.warnings.push(message);
    }

    res.add_discovered(
        format!("{}/{}", auto_name, AUTOSPLIT_INDEX),
        index_path.to_path_buf(),
    );

    for name in index.resource_names() {
        let path = root.join(&name);

        if !path.is_file() {
            return Err(anyhow!(
                "autoload index {} of module {} declares {} but {} does not exist",
                index_path.display(),
                module,
                name,
                path.display()
            ));
        }

        res.add_discovered(name, path);
    }

    Ok(())
}

/// Find files in search roots whose resource name matches a glob.
///
/// A name found in multiple roots resolves to the first root.
pub fn glob_search_roots(
    search_roots: &[PathBuf],
    pattern: &GlobPattern,
) -> Result<ResourceCollection> {
    let mut res = ResourceCollection::default();

    for root in search_roots {
        if !root.is_dir() {
            continue;
        }

        let walk = walkdir::WalkDir::new(root).sort_by(|a, b| a.file_name().cmp(b.file_name()));

        for entry in walk {
            let entry = entry.with_context(|| format!("walking {}", root.display()))?;

            if !entry.file_type().is_file() {
                continue;
            }

            let rel = entry.path().strip_prefix(root)?;
            let name = resource_name_from_relative_path(rel);

            if pattern.is_match(&name) && !res.contains(&name) {
                res.add_resource(BundleResource::new(name, entry.path()));
            }
        }
    }

    Ok(res)
}
