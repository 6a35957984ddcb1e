// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Settings controlling a bundling run. */

use {
    anyhow::{anyhow, Context, Result},
    perl_packaging::{filtering::FilterRule, packlist::PackListRootPolicy},
    std::{
        collections::BTreeSet,
        ffi::OsString,
        path::{Path, PathBuf},
    },
};

/// Environment variable defining the default cache directory.
pub const CACHE_ENV_VAR: &str = "PERL_BUNDLER_CACHE";

/// Maximum depth of profiles referencing other profiles.
const MAX_PROFILE_DEPTH: usize = 16;

/// How resource content is transformed before packing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StripMode {
    None,

    /// Pipe content through an external command line.
    Command(String),
}

impl Default for StripMode {
    fn default() -> Self {
        Self::None
    }
}

/// A file to add to the bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddedFile {
    pub path: PathBuf,
    pub name: String,
    pub binary: bool,
}

impl AddedFile {
    /// Parse a `PATH[ NAME]` argument.
    ///
    /// The name defaults to the path, which must then be relative.
    pub fn parse(value: &str, binary: bool) -> Result<Self> {
        let value = value.trim();
        let (path, name) = match value.split_once(char::is_whitespace) {
            Some((path, name)) => (path, name.trim().to_string()),
            None => {
                let name = value.strip_prefix("./").unwrap_or(value);
                if Path::new(name).is_absolute() {
                    return Err(anyhow!(
                        "{} is an absolute path; specify a resource name with \"PATH NAME\"",
                        value
                    ));
                }

                (value, name.to_string())
            }
        };

        if path.is_empty() || name.is_empty() {
            return Err(anyhow!("invalid file specification: {:?}", value));
        }

        Ok(Self {
            path: PathBuf::from(path),
            name,
            binary,
        })
    }
}

/// Everything resolved from the command line.
#[derive(Clone, Debug)]
pub struct BundleSettings {
    pub perl: PathBuf,
    pub use_modules: Vec<String>,
    pub eval_code: Vec<String>,
    pub added_files: Vec<AddedFile>,
    pub boot: Option<PathBuf>,
    pub incglobs: Vec<String>,
    pub filter_rules: Vec<FilterRule>,
    pub search_roots: Vec<PathBuf>,
    pub follow_packlists: bool,
    pub packlist_root_policy: PackListRootPolicy,
    pub strip: StripMode,
    pub cache_dir: Option<PathBuf>,
    pub prefix: String,
    pub output_dir: PathBuf,
    pub packed_output: bool,
    pub ccopts: Option<String>,
    pub ldopts: Option<String>,
    pub link_args: Vec<String>,
    pub cc: Option<String>,
    pub force_static: BTreeSet<String>,
    pub fully_static: bool,
    pub perlmain: bool,
    pub app: Option<String>,
    pub list_only: bool,
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            perl: PathBuf::from("perl"),
            use_modules: vec![],
            eval_code: vec![],
            added_files: vec![],
            boot: None,
            incglobs: vec![],
            filter_rules: vec![],
            search_roots: vec![],
            follow_packlists: false,
            packlist_root_policy: PackListRootPolicy::default(),
            strip: StripMode::default(),
            cache_dir: None,
            prefix: "bundle".to_string(),
            output_dir: PathBuf::from("."),
            packed_output: false,
            ccopts: None,
            ldopts: None,
            link_args: vec![],
            cc: None,
            force_static: BTreeSet::new(),
            fully_static: false,
            perlmain: false,
            app: None,
            list_only: false,
        }
    }
}

impl BundleSettings {
    /// Whether the Perl installation must be probed to resolve settings.
    ///
    /// Listing resources only needs search roots.
    pub fn needs_perl_config(&self) -> bool {
        if self.list_only {
            return self.search_roots.is_empty();
        }

        self.search_roots.is_empty()
            || self.ccopts.is_none()
            || self.ldopts.is_none()
            || (self.app.is_some() && self.cc.is_none())
    }
}

/// Parse the content of a profile file into arguments.
///
/// Each line is split like a shell would. Lines starting with `#` are
/// comments.
pub fn parse_profile(content: &str) -> Result<Vec<String>> {
    let mut res = vec![];

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        res.extend(
            shlex::split(line)
                .ok_or_else(|| anyhow!("line {}: unable to parse: {}", i + 1, line))?,
        );
    }

    Ok(res)
}

/// Replace `--profile FILE` arguments with the content of the files.
pub fn expand_profiles(args: Vec<OsString>) -> Result<Vec<OsString>> {
    expand_profiles_depth(args, 0)
}

fn expand_profiles_depth(args: Vec<OsString>, depth: usize) -> Result<Vec<OsString>> {
    if depth > MAX_PROFILE_DEPTH {
        return Err(anyhow!("profiles nested too deeply"));
    }

    let mut res = vec![];
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        let path = match arg.to_str() {
            Some("--profile") => Some(PathBuf::from(
                iter.next()
                    .ok_or_else(|| anyhow!("--profile requires a file argument"))?,
            )),
            Some(s) if s.starts_with("--profile=") => {
                Some(PathBuf::from(&s["--profile=".len()..]))
            }
            _ => None,
        };

        match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading profile {}", path.display()))?;
                let profile_args = parse_profile(&content)
                    .with_context(|| format!("parsing profile {}", path.display()))?
                    .into_iter()
                    .map(OsString::from)
                    .collect();

                res.extend(expand_profiles_depth(profile_args, depth + 1)?);
            }
            None => res.push(arg),
        }
    }

    Ok(res)
}
