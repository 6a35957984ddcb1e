// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Generation of C sources embedding a packed bundle. */

use {
    crate::literal::c_string_literal,
    anyhow::{anyhow, Context, Result},
    handlebars::Handlebars,
    itertools::Itertools,
    log::info,
    once_cell::sync::Lazy,
    perl_packaging::{module_util::xs_boot_symbol, scanning::StaticLibrary},
    perl_packed_resources::{PackedResources, OFFSET_BITS, OFFSET_MASK},
    serde::Serialize,
    std::{
        io::Write,
        path::{Path, PathBuf},
    },
};

/// Name of the resource evaluated once the `@INC` hook is installed.
pub const BOOT_RESOURCE_NAME: &str = "//boot";

/// Index entries per line of generated source.
const INDEX_ENTRIES_PER_LINE: usize = 6;

static HANDLEBARS: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("bundle.c", include_str!("templates/bundle.c"))
        .expect("bundle.c template should be valid");
    handlebars
        .register_template_string("bundle.h", include_str!("templates/bundle.h"))
        .expect("bundle.h template should be valid");
    handlebars
        .register_template_string("perlmain.c", include_str!("templates/perlmain.c"))
        .expect("perlmain.c template should be valid");
    handlebars
        .register_template_string("bootstrap.pl", include_str!("templates/bootstrap.pl"))
        .expect("bootstrap.pl template should be valid");

    handlebars
});

#[derive(Serialize)]
struct ExtensionContext {
    module: String,
    symbol: String,
}

#[derive(Serialize)]
struct HeaderContext {
    guard: String,
    count: usize,
}

#[derive(Serialize)]
struct SourceContext {
    header: String,
    offset_bits: u32,
    offset_mask: String,
    index_lines: Vec<String>,
    data: String,
    extensions: Vec<ExtensionContext>,
    bootstrap: String,
}

#[derive(Serialize)]
struct BootstrapContext {
    prefix: String,
    boot: String,
}

#[derive(Serialize)]
struct PerlMainContext {
    header: String,
    has_boot: bool,
}

/// Renders the C sources for a packed bundle.
pub struct BundleGenerator<'a> {
    prefix: String,
    packed: &'a PackedResources,
    static_libraries: &'a [StaticLibrary],
}

impl<'a> BundleGenerator<'a> {
    pub fn new(
        prefix: &str,
        packed: &'a PackedResources,
        static_libraries: &'a [StaticLibrary],
    ) -> Result<Self> {
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(anyhow!("invalid bundle prefix: {:?}", prefix));
        }

        Ok(Self {
            prefix: prefix.to_string(),
            packed,
            static_libraries,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn header_filename(&self) -> String {
        format!("{}.h", self.prefix)
    }

    pub fn source_filename(&self) -> String {
        format!("{}.c", self.prefix)
    }

    fn header_guard(&self) -> String {
        let mangled = self
            .prefix
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect::<String>();

        format!("PERL_BUNDLE_{}_H", mangled)
    }

    pub fn render_header(&self) -> Result<String> {
        Ok(HANDLEBARS.render(
            "bundle.h",
            &HeaderContext {
                guard: self.header_guard(),
                count: self.packed.len(),
            },
        )?)
    }

    /// Render the Perl code run once extensions are registered.
    pub fn render_bootstrap(&self) -> Result<String> {
        Ok(HANDLEBARS.render(
            "bootstrap.pl",
            &BootstrapContext {
                prefix: self.prefix.clone(),
                boot: BOOT_RESOURCE_NAME.to_string(),
            },
        )?)
    }

    pub fn render_source(&self) -> Result<String> {
        let index_lines = self
            .packed
            .index()
            .chunks(INDEX_ENTRIES_PER_LINE)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|entry| format!("0x{:08x}u,", entry.raw()))
                    .join(" ")
            })
            .collect::<Vec<_>>();

        let extensions = self
            .static_libraries
            .iter()
            .unique_by(|l| l.module.clone())
            .map(|l| ExtensionContext {
                module: l.module.clone(),
                symbol: xs_boot_symbol(&l.module),
            })
            .collect::<Vec<_>>();

        let context = SourceContext {
            header: self.header_filename(),
            offset_bits: OFFSET_BITS,
            offset_mask: format!("0x{:08x}u", OFFSET_MASK),
            index_lines,
            data: c_string_literal(self.packed.data()),
            extensions,
            bootstrap: c_string_literal(self.render_bootstrap()?.as_bytes()),
        };

        Ok(HANDLEBARS.render("bundle.c", &context)?)
    }

    pub fn render_perlmain(&self) -> Result<String> {
        Ok(HANDLEBARS.render(
            "perlmain.c",
            &PerlMainContext {
                header: self.header_filename(),
                has_boot: self.packed.find(BOOT_RESOURCE_NAME.as_bytes()).is_some(),
            },
        )?)
    }
}

/// Write a file atomically.
///
/// Content is staged in a temporary file in the destination directory and
/// renamed into place once complete.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    temp.write_all(data)
        .with_context(|| format!("writing {}", path.display()))?;
    temp.persist(path)
        .with_context(|| format!("writing {}", path.display()))?;

    Ok(())
}

/// Options controlling which artifacts are produced.
#[derive(Clone, Debug, Default)]
pub struct ArtifactOptions {
    pub ccopts: String,
    pub ldopts: String,
    pub perlmain: bool,
    pub packed_output: bool,
}

/// Paths of written artifacts.
#[derive(Clone, Debug, Default)]
pub struct BundleArtifacts {
    pub header: PathBuf,
    pub source: PathBuf,
    pub ccopts: PathBuf,
    pub ldopts: PathBuf,
    pub perlmain: Option<PathBuf>,
    pub packed: Option<PathBuf>,
}

impl BundleArtifacts {
    /// Generated files a compiler consumes.
    pub fn intermediate_paths(&self) -> Vec<&Path> {
        let mut res = vec![
            self.header.as_path(),
            self.source.as_path(),
            self.ccopts.as_path(),
            self.ldopts.as_path(),
        ];
        res.extend(self.perlmain.as_deref());

        res
    }
}

/// Render and write all artifacts of a bundle to a directory.
///
/// Everything is rendered before anything is written.
pub fn write_bundle_artifacts(
    generator: &BundleGenerator,
    dest_dir: &Path,
    options: &ArtifactOptions,
) -> Result<BundleArtifacts> {
    let prefix = generator.prefix();

    let mut files = vec![
        (
            dest_dir.join(generator.header_filename()),
            generator.render_header()?.into_bytes(),
        ),
        (
            dest_dir.join(generator.source_filename()),
            generator.render_source()?.into_bytes(),
        ),
        (
            dest_dir.join(format!("{}.ccopts", prefix)),
            options.ccopts.clone().into_bytes(),
        ),
        (
            dest_dir.join(format!("{}.ldopts", prefix)),
            options.ldopts.clone().into_bytes(),
        ),
    ];

    let mut artifacts = BundleArtifacts {
        header: files[0].0.clone(),
        source: files[1].0.clone(),
        ccopts: files[2].0.clone(),
        ldopts: files[3].0.clone(),
        ..Default::default()
    };

    if options.perlmain {
        let path = dest_dir.join("perlmain.c");
        files.push((path.clone(), generator.render_perlmain()?.into_bytes()));
        artifacts.perlmain = Some(path);
    }

    if options.packed_output {
        let path = dest_dir.join(format!("{}.bin", prefix));
        files.push((path.clone(), generator.packed.to_blob()));
        artifacts.packed = Some(path);
    }

    for (path, data) in files {
        info!("writing {}", path.display());
        write_atomic(&path, &data)?;
    }

    Ok(artifacts)
}
