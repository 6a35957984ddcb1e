// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Utility functions related to Perl module naming conventions. */

use std::path::Path;

/// Suffix of Perl module files.
pub const MODULE_SUFFIX: &str = ".pm";

/// Filename of the index written by `AutoSplit`.
pub const AUTOSPLIT_INDEX: &str = "autosplit.ix";

/// Filename listing extra libraries a static extension links against.
pub const EXTRALIBS_FILE: &str = "extralibs.ld";

/// Filename of the distribution manifest written by `ExtUtils::Install`.
pub const PACKLIST_FILE: &str = ".packlist";

/// File extensions of distribution manifest entries worth bundling.
pub const PACKLIST_EXTENSIONS: &[&str] = &["pm", "pl", "al", "ix"];

/// Resolve the resource name of a module. e.g. `Foo::Bar` -> `Foo/Bar.pm`.
pub fn module_name_to_resource_name(module: &str) -> String {
    format!("{}{}", module.replace("::", "/"), MODULE_SUFFIX)
}

/// Resolve the module name of a `.pm` resource. e.g. `Foo/Bar.pm` -> `Foo::Bar`.
pub fn resource_name_to_module_name(name: &str) -> Option<String> {
    name.strip_suffix(MODULE_SUFFIX)
        .filter(|stem| !stem.is_empty())
        .map(|stem| stem.replace('/', "::"))
}

/// Resolve the autoload directory of a `.pm` resource. e.g. `Foo/Bar.pm` -> `auto/Foo/Bar`.
pub fn autoload_dir_name(name: &str) -> Option<String> {
    name.strip_suffix(MODULE_SUFFIX)
        .filter(|stem| !stem.is_empty())
        .map(|stem| format!("auto/{}", stem))
}

/// The last component of a module name. e.g. `Foo/Bar.pm` -> `Bar`.
pub fn module_base_name(name: &str) -> &str {
    let stem = name.strip_suffix(MODULE_SUFFIX).unwrap_or(name);

    match stem.rfind('/') {
        Some(idx) => &stem[idx + 1..],
        None => stem,
    }
}

/// Name of the C function bootstrapping an XS module. e.g. `Foo::Bar` -> `boot_Foo__Bar`.
pub fn xs_boot_symbol(module: &str) -> String {
    let mangled = module
        .replace("::", "__")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>();

    format!("boot_{}", mangled)
}

/// Convert a relative filesystem path to a resource name using `/` separators.
pub fn resource_name_from_relative_path(path: &Path) -> String {
    itertools::join(
        path.components()
            .map(|c| c.as_os_str().to_string_lossy().to_string()),
        "/",
    )
}
