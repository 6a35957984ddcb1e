// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Compiling generated sources into an executable. */

use {
    crate::embedding::BundleArtifacts,
    anyhow::{anyhow, Context, Result},
    duct::cmd,
    log::{info, warn},
    std::{
        io::{BufRead, BufReader},
        path::{Path, PathBuf},
    },
};

/// Split a flags string as a shell would, undoing parenthesis escaping.
fn split_flags(flags: &str) -> Result<Vec<String>> {
    shlex::split(flags).ok_or_else(|| anyhow!("unable to parse flags: {}", flags))
}

/// Resolve the compiler invocation producing an executable.
pub fn compiler_args(
    artifacts: &BundleArtifacts,
    ccopts: &str,
    ldopts: &str,
    exe_path: &Path,
) -> Result<Vec<String>> {
    let perlmain = artifacts
        .perlmain
        .as_ref()
        .ok_or_else(|| anyhow!("building an executable requires perlmain.c"))?;

    let mut args = split_flags(ccopts)?;
    args.push("-o".to_string());
    args.push(exe_path.display().to_string());
    args.push(artifacts.source.display().to_string());
    args.push(perlmain.display().to_string());
    args.extend(split_flags(ldopts)?);

    Ok(args)
}

/// Compile generated sources into an executable.
///
/// Generated intermediate files are removed on success.
pub fn build_executable(
    cc: &str,
    artifacts: &BundleArtifacts,
    ccopts: &str,
    ldopts: &str,
    exe_path: &Path,
) -> Result<PathBuf> {
    let mut compiler = split_flags(cc)?.into_iter();
    let program = compiler
        .next()
        .ok_or_else(|| anyhow!("no C compiler configured"))?;
    let args = compiler
        .chain(compiler_args(artifacts, ccopts, ldopts, exe_path)?)
        .collect::<Vec<_>>();

    info!("compiling {}", exe_path.display());
    info!("{} {}", program, args.join(" "));

    let command = cmd(&program, &args)
        .stderr_to_stdout()
        .unchecked()
        .reader()
        .with_context(|| format!("invoking {}", program))?;
    {
        let reader = BufReader::new(&command);
        for line in reader.lines() {
            warn!("{}", line.context("reading compiler output")?);
        }
    }
    let output = command
        .try_wait()
        .context("waiting on compiler process")?
        .ok_or_else(|| anyhow!("unable to wait on compiler process"))?;
    if !output.status.success() {
        return Err(anyhow!("compiling {} failed", exe_path.display()));
    }

    for path in artifacts.intermediate_paths() {
        std::fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
    }

    Ok(exe_path.to_path_buf())
}
