// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Transformation of resource content.

Content transforms are functions of the transform parameters and the input
bytes. Because they are pure, their output can be cached across runs.
*/

use {
    crate::{
        cache::{CacheKey, ContentCache},
        resource::BundleResource,
    },
    anyhow::{anyhow, Context, Result},
    log::{debug, warn},
    std::fmt::{Display, Formatter},
};

/// Errors reported by a content transform.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("failed to transform {name}: {message}")]
    Parse { name: String, message: String },

    #[error("I/O error transforming {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Transforms the content of a resource.
pub trait ContentTransform {
    /// Bytes identifying the behavior of this transform.
    ///
    /// Two transforms with identical parameters must produce identical output
    /// for identical input.
    fn parameters(&self) -> Vec<u8>;

    /// Transform the content of the named resource.
    fn transform(&mut self, name: &str, data: &[u8]) -> Result<Vec<u8>, TransformError>;
}

/// A transform that returns its input.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityTransform;

impl ContentTransform for IdentityTransform {
    fn parameters(&self) -> Vec<u8> {
        b"none".to_vec()
    }

    fn transform(&mut self, _name: &str, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        Ok(data.to_vec())
    }
}

/// A transform that pipes content through an external program.
///
/// The program reads the original content from stdin and writes the
/// transformed content to stdout.
#[derive(Clone, Debug)]
pub struct CommandTransform {
    program: String,
    args: Vec<String>,
}

impl CommandTransform {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Construct an instance from a shell-like command line.
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut words = shlex::split(command)
            .ok_or_else(|| anyhow!("unable to parse command line: {}", command))?
            .into_iter();

        let program = words
            .next()
            .ok_or_else(|| anyhow!("empty transform command"))?;

        Ok(Self::new(program, words.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl ContentTransform for CommandTransform {
    fn parameters(&self) -> Vec<u8> {
        let mut res = b"command".to_vec();
        for word in std::iter::once(&self.program).chain(self.args.iter()) {
            res.push(0);
            res.extend(word.as_bytes());
        }

        res
    }

    fn transform(&mut self, name: &str, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        let output = duct::cmd(&self.program, &self.args)
            .stdin_bytes(data)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|source| TransformError::Io {
                name: name.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(TransformError::Parse {
                name: name.to_string(),
                message: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(output.stdout)
    }
}

/// Counters describing what a [TransformAdapter] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub passthroughs: usize,
    pub failures: usize,
}

impl Display for TransformStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} transformed, {} from cache, {} binary, {} failed",
            self.cache_misses, self.cache_hits, self.passthroughs, self.failures
        )
    }
}

/// Applies a [ContentTransform] to resources, consulting a cache.
pub struct TransformAdapter {
    transform: Box<dyn ContentTransform>,
    cache: Option<ContentCache>,
    stats: TransformStats,
}

impl TransformAdapter {
    pub fn new(transform: Box<dyn ContentTransform>, cache: Option<ContentCache>) -> Self {
        Self {
            transform,
            cache,
            stats: TransformStats::default(),
        }
    }

    pub fn stats(&self) -> TransformStats {
        self.stats
    }

    /// Obtain the content of a resource after transformation.
    ///
    /// Binary resources are returned untouched. A failing transform is
    /// logged and the original content is returned. Failing to read the
    /// resource is an error.
    pub fn apply(&mut self, resource: &BundleResource) -> Result<Vec<u8>> {
        let data = resource
            .location
            .resolve()
            .with_context(|| format!("resolving content of resource {}", resource.name))?;

        if resource.binary {
            self.stats.passthroughs += 1;
            return Ok(data);
        }

        let key = self
            .cache
            .as_ref()
            .map(|_| CacheKey::new(&self.transform.parameters(), &data));

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            match cache.get(key) {
                Ok(Some(cached)) => {
                    debug!("{} served from cache entry {}", resource.name, key.as_str());
                    self.stats.cache_hits += 1;
                    return Ok(cached);
                }
                Ok(None) => {}
                Err(e) => warn!("{:?}", e),
            }
        }

        match self.transform.transform(&resource.name, &data) {
            Ok(transformed) => {
                self.stats.cache_misses += 1;

                if let (Some(cache), Some(key)) = (&self.cache, &key) {
                    if let Err(e) = cache.put(key, &transformed) {
                        warn!("unable to cache {}: {:?}", resource.name, e);
                    }
                }

                Ok(transformed)
            }
            Err(e) => {
                warn!("{}; using original content", e);
                self.stats.failures += 1;

                Ok(data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testutil::{CountingTransform, FailingTransform},
        anyhow::Result,
        std::{cell::Cell, path::PathBuf, rc::Rc},
    };

    fn temp_cache() -> Result<(tempfile::TempDir, ContentCache)> {
        let td = tempfile::Builder::new()
            .prefix("perl-packaging-test")
            .tempdir()?;
        let cache = ContentCache::new(td.path().join("cache"));

        Ok((td, cache))
    }

    #[test]
    fn test_cache_purity() -> Result<()> {
        let (_td, cache) = temp_cache()?;
        let calls = Rc::new(Cell::new(0));

        let mut adapter = TransformAdapter::new(
            Box::new(CountingTransform::new(calls.clone())),
            Some(cache.clone()),
        );

        let first = adapter.apply(&BundleResource::new("Foo.pm", b"1;".to_vec()))?;
        let second = adapter.apply(&BundleResource::new("Bar.pm", b"1;".to_vec()))?;

        assert_eq!(calls.get(), 1);
        assert_eq!(first, b"counted:1;".to_vec());
        assert_eq!(first, second);
        assert_eq!(
            adapter.stats(),
            TransformStats {
                cache_hits: 1,
                cache_misses: 1,
                ..Default::default()
            }
        );

        // A fresh adapter sharing the cache directory never runs the transform.
        let mut adapter = TransformAdapter::new(
            Box::new(CountingTransform::new(calls.clone())),
            Some(cache),
        );
        assert_eq!(
            adapter.apply(&BundleResource::new("Foo.pm", b"1;".to_vec()))?,
            first
        );
        assert_eq!(calls.get(), 1);

        Ok(())
    }

    #[test]
    fn test_parameters_affect_key() -> Result<()> {
        let (_td, cache) = temp_cache()?;
        let calls = Rc::new(Cell::new(0));

        for parameters in [&b"a"[..], &b"b"[..]] {
            let mut transform = CountingTransform::new(calls.clone());
            transform.parameters = parameters.to_vec();

            let mut adapter = TransformAdapter::new(Box::new(transform), Some(cache.clone()));
            adapter.apply(&BundleResource::new("Foo.pm", b"1;".to_vec()))?;
        }

        assert_eq!(calls.get(), 2);

        Ok(())
    }

    #[test]
    fn test_no_cache() -> Result<()> {
        let calls = Rc::new(Cell::new(0));
        let transform = CountingTransform::new(calls.clone());
        let mut adapter = TransformAdapter::new(Box::new(transform), None);

        adapter.apply(&BundleResource::new("Foo.pm", b"1;".to_vec()))?;
        adapter.apply(&BundleResource::new("Foo.pm", b"1;".to_vec()))?;

        assert_eq!(calls.get(), 2);

        Ok(())
    }

    #[test]
    fn test_binary_passthrough() -> Result<()> {
        let (_td, cache) = temp_cache()?;
        let calls = Rc::new(Cell::new(0));
        let mut adapter = TransformAdapter::new(
            Box::new(CountingTransform::new(calls.clone())),
            Some(cache.clone()),
        );

        let data = adapter.apply(&BundleResource::new_binary("icon.png", b"\x89PNG".to_vec()))?;

        assert_eq!(data, b"\x89PNG".to_vec());
        assert_eq!(calls.get(), 0);
        assert_eq!(adapter.stats().passthroughs, 1);
        assert!(!cache.dir().exists());

        Ok(())
    }

    #[test]
    fn test_failure_keeps_original() -> Result<()> {
        let (_td, cache) = temp_cache()?;
        let mut adapter = TransformAdapter::new(Box::new(FailingTransform), Some(cache.clone()));

        let data = adapter.apply(&BundleResource::new("Broken.pm", b"sub {".to_vec()))?;

        assert_eq!(data, b"sub {".to_vec());
        assert_eq!(adapter.stats().failures, 1);
        assert!(!cache.dir().exists());

        Ok(())
    }

    #[test]
    fn test_unreadable_resource_is_fatal() {
        let mut adapter = TransformAdapter::new(Box::new(IdentityTransform), None);

        let err = adapter
            .apply(&BundleResource::new(
                "Missing.pm",
                PathBuf::from("/does/not/exist/Missing.pm"),
            ))
            .unwrap_err();

        assert_eq!(err.to_string(), "resolving content of resource Missing.pm");
    }

    #[test]
    fn test_command_transform_parameters() -> Result<()> {
        let t = CommandTransform::from_command_line("perlstrip --cache 'a b'")?;

        assert_eq!(t.program(), "perlstrip");
        assert_eq!(t.parameters(), b"command\0perlstrip\0--cache\0a b".to_vec());
        assert!(CommandTransform::from_command_line("").is_err());

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_command_transform() -> Result<()> {
        let mut t = CommandTransform::from_command_line("tr a-z A-Z")?;
        assert_eq!(t.transform("Foo.pm", b"abc;")?, b"ABC;".to_vec());

        let mut t = CommandTransform::from_command_line("sh -c 'echo oops >&2; exit 3'")?;
        let err = t.transform("Foo.pm", b"abc;").unwrap_err();
        assert!(matches!(err, TransformError::Parse { .. }));
        assert!(err.to_string().contains("oops"));

        Ok(())
    }
}
