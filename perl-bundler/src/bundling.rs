// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Running the bundling pipeline end to end. */

use {
    crate::{
        embedding::{write_bundle_artifacts, ArtifactOptions, BundleGenerator, BOOT_RESOURCE_NAME},
        environment::PerlConfig,
        linking::{resolve_ccopts, resolve_ldopts, LinkSettings},
        module_tracer::trace_modules,
        project_building::build_executable,
        settings::{BundleSettings, StripMode},
    },
    anyhow::{anyhow, Context, Result},
    log::{debug, info},
    perl_packaging::{
        cache::ContentCache,
        filtering::GlobPattern,
        resource::{BundleResource, ResourceCollection},
        scanning::{glob_search_roots, scan_dependencies, ScanResult, ScanSettings},
        transform::{CommandTransform, ContentTransform, IdentityTransform, TransformAdapter},
    },
    perl_packed_resources::{pack_resources, PackedResources, Resource},
    std::path::{Path, PathBuf},
};

/// Settings resolved from the command line and the Perl installation.
struct ResolvedEnvironment {
    search_roots: Vec<PathBuf>,
    static_library_suffix: String,
    dynamic_library_suffix: String,
    ccopts: String,
    ldopts: String,
    cc: Option<String>,
}

fn resolve_environment(settings: &BundleSettings) -> Result<ResolvedEnvironment> {
    let config = if settings.needs_perl_config() {
        Some(PerlConfig::probe(&settings.perl)?)
    } else {
        None
    };

    let scan_defaults = ScanSettings::default();
    let from_config = |f: fn(&PerlConfig) -> String| config.as_ref().map(f);

    Ok(ResolvedEnvironment {
        search_roots: if settings.search_roots.is_empty() {
            config.as_ref().map(|c| c.inc.clone()).unwrap_or_default()
        } else {
            settings.search_roots.clone()
        },
        static_library_suffix: from_config(|c| c.static_library_suffix.clone())
            .filter(|s| !s.is_empty())
            .unwrap_or(scan_defaults.static_library_suffix),
        dynamic_library_suffix: from_config(|c| c.dynamic_library_suffix.clone())
            .filter(|s| s.len() > 1)
            .unwrap_or(scan_defaults.dynamic_library_suffix),
        ccopts: settings
            .ccopts
            .clone()
            .or_else(|| from_config(|c| c.ccopts.clone()))
            .unwrap_or_default(),
        ldopts: settings
            .ldopts
            .clone()
            .or_else(|| from_config(|c| c.ldopts.clone()))
            .unwrap_or_default(),
        cc: settings.cc.clone().or_else(|| from_config(|c| c.cc.clone())),
    })
}

/// Add a resource, logging when it replaces an earlier one.
fn add_seed(seeds: &mut ResourceCollection, resource: BundleResource) {
    let name = resource.name.clone();
    if let Some(previous) = seeds.add_resource(resource) {
        debug!("{} replaces {:?}", name, previous.location);
    }
}

/// Resolve the resources explicitly requested.
///
/// Later sources replace earlier ones: traced modules, then glob matches,
/// then added files, then the boot script.
pub fn collect_seeds(
    settings: &BundleSettings,
    search_roots: &[PathBuf],
) -> Result<ResourceCollection> {
    let mut seeds = ResourceCollection::default();

    if !settings.use_modules.is_empty() || !settings.eval_code.is_empty() {
        for resource in trace_modules(&settings.perl, &settings.use_modules, &settings.eval_code)? {
            add_seed(&mut seeds, resource);
        }
    }

    for pattern in &settings.incglobs {
        let matches = glob_search_roots(search_roots, &GlobPattern::new(pattern)?)?;
        info!("{} files match {}", matches.len(), pattern);

        for resource in matches {
            add_seed(&mut seeds, resource);
        }
    }

    for file in &settings.added_files {
        add_seed(
            &mut seeds,
            if file.binary {
                BundleResource::new_binary(file.name.clone(), file.path.clone())
            } else {
                BundleResource::new(file.name.clone(), file.path.clone())
            },
        );
    }

    if let Some(boot) = &settings.boot {
        add_seed(&mut seeds, BundleResource::new(BOOT_RESOURCE_NAME, boot.clone()));
    }

    Ok(seeds)
}

fn resolve_transform(strip: &StripMode) -> Result<Box<dyn ContentTransform>> {
    Ok(match strip {
        StripMode::None => Box::new(IdentityTransform),
        StripMode::Command(command) => Box::new(CommandTransform::from_command_line(command)?),
    })
}

/// Transform and pack the content of scanned resources.
pub fn pack_scanned_resources(
    scan: &ScanResult,
    strip: &StripMode,
    cache_dir: Option<&Path>,
) -> Result<PackedResources> {
    // The identity transform gains nothing from a cache.
    let cache = match strip {
        StripMode::None => None,
        StripMode::Command(_) => cache_dir.map(ContentCache::new),
    };

    let mut adapter = TransformAdapter::new(resolve_transform(strip)?, cache);

    let contents = scan
        .resources
        .iter()
        .map(|resource| Ok((resource.name.as_str(), adapter.apply(resource)?)))
        .collect::<Result<Vec<_>>>()?;

    info!("content transforms: {}", adapter.stats());

    let packed = pack_resources(
        contents
            .iter()
            .map(|(name, data)| Resource::new(name.as_bytes(), &data[..])),
    )
    .context("packing resources")?;

    info!(
        "packed {} resources into {} bytes",
        packed.len(),
        packed.data().len()
    );

    Ok(packed)
}

/// Run the bundler.
pub fn run_bundle(settings: &BundleSettings) -> Result<()> {
    let env = resolve_environment(settings)?;

    if env.search_roots.is_empty() {
        return Err(anyhow!("no search roots; pass --search-root or a working --perl"));
    }

    let seeds = collect_seeds(settings, &env.search_roots)?;
    info!("resolved {} seed resources", seeds.len());

    let scan = scan_dependencies(
        seeds,
        &settings.filter_rules,
        &ScanSettings {
            search_roots: env.search_roots.clone(),
            follow_packlists: settings.follow_packlists,
            packlist_root_policy: settings.packlist_root_policy,
            static_library_suffix: env.static_library_suffix.clone(),
            dynamic_library_suffix: env.dynamic_library_suffix.clone(),
        },
    )?;

    if settings.list_only {
        for name in scan.resources.names() {
            println!("{}", name);
        }

        return Ok(());
    }

    let packed = pack_scanned_resources(&scan, &settings.strip, settings.cache_dir.as_deref())?;

    let ccopts = resolve_ccopts(&env.ccopts);
    let ldopts = resolve_ldopts(
        &scan.static_libraries,
        &scan.extra_libraries,
        &LinkSettings {
            user_args: settings.link_args.clone(),
            perl_ldopts: env.ldopts.clone(),
            force_static: settings.force_static.clone(),
            fully_static: settings.fully_static,
        },
    );

    let generator = BundleGenerator::new(&settings.prefix, &packed, &scan.static_libraries)?;
    let artifacts = write_bundle_artifacts(
        &generator,
        &settings.output_dir,
        &ArtifactOptions {
            ccopts: ccopts.clone(),
            ldopts: ldopts.clone(),
            perlmain: settings.perlmain || settings.app.is_some(),
            packed_output: settings.packed_output,
        },
    )?;

    if let Some(app) = &settings.app {
        let cc = env
            .cc
            .as_deref()
            .ok_or_else(|| anyhow!("no C compiler known; pass --cc"))?;

        let exe_path = settings.output_dir.join(app);
        let exe = build_executable(cc, &artifacts, &ccopts, &ldopts, &exe_path)?;
        info!("wrote {}", exe.display());
    }

    Ok(())
}
