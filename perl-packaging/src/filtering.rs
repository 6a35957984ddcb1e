// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Utility code for filtering resources by name.
*/

use {
    crate::resource::ResourceCollection,
    anyhow::{Context, Result},
    log::debug,
    regex::Regex,
    std::collections::BTreeMap,
};

/// Convert a glob pattern to a regular expression.
///
/// `**` matches anything, `*` matches anything except `/` and `?` matches a
/// single character other than `/`. A pattern starting with `/` must match
/// at the start of a name. Other patterns match at the start of a name or
/// after any `/`. Patterns always match through the end of a name.
pub fn glob_to_regex(pattern: &str) -> String {
    let (mut re, body) = match pattern.strip_prefix('/') {
        Some(rest) if !rest.is_empty() => ("^".to_string(), rest),
        _ => ("(?:^|/)".to_string(), pattern),
    };

    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                re.push_str(".*");
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }

    re.push('$');

    re
}

/// A compiled glob pattern.
#[derive(Clone, Debug)]
pub struct GlobPattern {
    pattern: String,
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&glob_to_regex(pattern))
            .with_context(|| format!("compiling glob pattern {}", pattern))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// An include or exclude rule applied to resource names.
#[derive(Clone, Debug)]
pub struct FilterRule {
    pub include: bool,
    pub pattern: GlobPattern,
}

impl FilterRule {
    pub fn include(pattern: &str) -> Result<Self> {
        Ok(Self {
            include: true,
            pattern: GlobPattern::new(pattern)?,
        })
    }

    pub fn exclude(pattern: &str) -> Result<Self> {
        Ok(Self {
            include: false,
            pattern: GlobPattern::new(pattern)?,
        })
    }
}

/// Apply filter rules in order to a collection of resources.
///
/// An exclude rule removes every present resource it matches. An include
/// rule protects resources removed by an earlier exclude: they are set
/// aside where later excludes cannot reach them and are restored once all
/// rules have run.
pub fn apply_filter_rules(
    resources: ResourceCollection,
    rules: &[FilterRule],
) -> ResourceCollection {
    let mut present = resources
        .into_iter()
        .map(|r| (r.name.clone(), r))
        .collect::<BTreeMap<_, _>>();
    let mut removed = BTreeMap::new();
    let mut protected = BTreeMap::new();

    for rule in rules {
        let source = if rule.include { &removed } else { &present };
        let matching = source
            .keys()
            .filter(|name| rule.pattern.is_match(name))
            .cloned()
            .collect::<Vec<_>>();

        for name in matching {
            if rule.include {
                if let Some(resource) = removed.remove(&name) {
                    debug!("{} protected by include {}", name, rule.pattern.as_str());
                    protected.insert(name, resource);
                }
            } else if let Some(resource) = present.remove(&name) {
                debug!("{} removed by exclude {}", name, rule.pattern.as_str());
                removed.insert(name, resource);
            }
        }
    }

    present
        .into_values()
        .chain(protected.into_values())
        .collect()
}
