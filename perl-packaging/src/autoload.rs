// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Parsing of `autosplit.ix` files written by `AutoSplit`. */

use {once_cell::sync::Lazy, regex::Regex};

static RE_PACKAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*package\s+([A-Za-z_][A-Za-z0-9_]*(?:(?:::|')[A-Za-z0-9_]+)*)\s*;")
        .expect("package regex should compile")
});

static RE_SUB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*sub\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:\([^)]*\))?\s*;")
        .expect("sub regex should compile")
});

static RE_IGNORED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:#.*|1\s*;|;)?\s*$").expect("ignore regex should compile")
});

/// A function split out of a package into its own file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoloadEntry {
    /// Package path with `/` separators. e.g. `Foo/Bar`.
    pub package: String,
    pub function: String,
}

impl AutoloadEntry {
    /// Name of the resource holding the function body.
    pub fn resource_name(&self) -> String {
        format!("auto/{}/{}.al", self.package, self.function)
    }
}

/// A line of an autoload index that could not be understood.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoloadWarning {
    /// 1-based line number.
    pub line_number: usize,
    pub line: String,
}

/// The parsed content of an `autosplit.ix` file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AutoloadIndex {
    pub entries: Vec<AutoloadEntry>,
    pub warnings: Vec<AutoloadWarning>,
}

impl AutoloadIndex {
    /// Resource names of every split function, in file order.
    pub fn resource_names(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|e| e.resource_name())
    }
}

/// Parse the content of an `autosplit.ix` file.
///
/// Lines that aren't package or sub declarations, comments, blank or a bare
/// `1;` are recorded as warnings. A sub declared before any package is also a
/// warning.
pub fn parse_autoload_index(data: &[u8]) -> AutoloadIndex {
    let text = String::from_utf8_lossy(data);
    let mut res = AutoloadIndex::default();
    let mut package: Option<String> = None;

    for (i, line) in text.lines().enumerate() {
        let warn = |res: &mut AutoloadIndex| {
            res.warnings.push(AutoloadWarning {
                line_number: i + 1,
                line: line.to_string(),
            });
        };

        if let Some(caps) = RE_PACKAGE.captures(line) {
            package = Some(caps[1].replace("::", "/").replace('\'', "/"));
        } else if let Some(caps) = RE_SUB.captures(line) {
            match &package {
                Some(package) => res.entries.push(AutoloadEntry {
                    package: package.clone(),
                    function: caps[1].to_string(),
                }),
                None => warn(&mut res),
            }
        } else if !RE_IGNORED.is_match(line) {
            warn(&mut res);
        }
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let index = parse_autoload_index(b"package Foo::Bar;\nsub baz;\n# a comment\n1;\n");

        assert!(index.warnings.is_empty());
        assert_eq!(
            index.resource_names().collect::<Vec<_>>(),
            vec!["auto/Foo/Bar/baz.al".to_string()]
        );
    }

    #[test]
    fn test_warning_does_not_stop_parsing() {
        let index = parse_autoload_index(
            b"package Foo::Bar;\nsub baz;\n???\nsub quux ($$);\n\n;\npackage Other;\nsub x ;\n",
        );

        assert_eq!(
            index.warnings,
            vec![AutoloadWarning {
                line_number: 3,
                line: "???".to_string()
            }]
        );
        assert_eq!(
            index.resource_names().collect::<Vec<_>>(),
            vec![
                "auto/Foo/Bar/baz.al".to_string(),
                "auto/Foo/Bar/quux.al".to_string(),
                "auto/Other/x.al".to_string(),
            ]
        );
    }

    #[test]
    fn test_autosplit_output() {
        // As written by AutoSplit.
        let index = parse_autoload_index(
            b"# Index created by AutoSplit for ../../lib/POSIX.pm\n\
              #    (file acts as timestamp)\n\
              package POSIX;\n\
              sub usage ;\n\
              sub import ;\n\
              1;\n",
        );

        assert!(index.warnings.is_empty());
        assert_eq!(index.entries.len(), 2);
        assert_eq!(index.entries[1].resource_name(), "auto/POSIX/import.al");
    }

    #[test]
    fn test_sub_without_package() {
        let index = parse_autoload_index(b"sub orphan;\n");

        assert!(index.entries.is_empty());
        assert_eq!(index.warnings.len(), 1);
        assert_eq!(index.warnings[0].line_number, 1);
    }
}
