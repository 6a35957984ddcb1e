// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Resolution of compiler and linker flags for a bundle. */

use {
    itertools::Itertools,
    perl_packaging::scanning::StaticLibrary,
    std::collections::BTreeSet,
};

/// Describes an argument to the linker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkingAnnotation {
    /// A static archive to link.
    StaticArchive(String),

    /// Link an item statically, even if a shared variant exists.
    ForceStatic(String),

    /// Any other argument to the linker.
    Argument(String),
}

impl LinkingAnnotation {
    /// Convert the instance to linker arguments.
    pub fn to_args(&self) -> Vec<String> {
        match self {
            Self::StaticArchive(path) => vec![path.clone()],
            Self::ForceStatic(arg) => vec![
                "-Wl,-Bstatic".to_string(),
                arg.clone(),
                "-Wl,-Bdynamic".to_string(),
            ],
            Self::Argument(arg) => vec![arg.clone()],
        }
    }
}

/// Settings influencing link flags.
#[derive(Clone, Debug, Default)]
pub struct LinkSettings {
    /// Arguments supplied by the user, emitted first.
    pub user_args: Vec<String>,

    /// Link flags reported by Perl.
    pub perl_ldopts: String,

    /// Modules or library names to force static linking of.
    pub force_static: BTreeSet<String>,

    /// Produce a fully static executable.
    pub fully_static: bool,
}

/// Escape parentheses so flags survive a round trip through a shell.
pub fn escape_flags(flags: &str) -> String {
    flags.replace('(', "\\(").replace(')', "\\)")
}

/// Resolve the ordered list of linking annotations for a bundle.
///
/// Order is user arguments, static extension archives, extra libraries
/// then Perl's own link flags.
pub fn resolve_linking_annotations(
    static_libraries: &[StaticLibrary],
    extra_libraries: &BTreeSet<String>,
    settings: &LinkSettings,
) -> Vec<LinkingAnnotation> {
    let mut res = settings
        .user_args
        .iter()
        .map(|arg| LinkingAnnotation::Argument(arg.clone()))
        .collect::<Vec<_>>();

    for library in static_libraries {
        let archive = library.archive.display().to_string();

        res.push(if settings.force_static.contains(&library.module) {
            LinkingAnnotation::ForceStatic(archive)
        } else {
            LinkingAnnotation::StaticArchive(archive)
        });
    }

    for arg in extra_libraries {
        let forced = arg
            .strip_prefix("-l")
            .map(|name| settings.force_static.contains(name))
            .unwrap_or(false);

        res.push(if forced {
            LinkingAnnotation::ForceStatic(arg.clone())
        } else {
            LinkingAnnotation::Argument(arg.clone())
        });
    }

    res.extend(
        settings
            .perl_ldopts
            .split_whitespace()
            .map(|arg| LinkingAnnotation::Argument(arg.to_string())),
    );

    if settings.fully_static {
        res.push(LinkingAnnotation::Argument("-static".to_string()));
    }

    res
}

/// Resolve the single line content of the `ldopts` file.
pub fn resolve_ldopts(
    static_libraries: &[StaticLibrary],
    extra_libraries: &BTreeSet<String>,
    settings: &LinkSettings,
) -> String {
    let args = resolve_linking_annotations(static_libraries, extra_libraries, settings)
        .iter()
        .flat_map(|a| a.to_args())
        .join(" ");

    escape_flags(&args)
}

/// Resolve the single line content of the `ccopts` file.
pub fn resolve_ccopts(perl_ccopts: &str) -> String {
    escape_flags(&perl_ccopts.split_whitespace().join(" "))
}
