// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Discovery of the modules a program loads.

Perl is run with a small program that loads the requested modules or
evaluates the requested code, then reports every entry of `%INC`.
*/

use {
    anyhow::{anyhow, Context, Result},
    log::{debug, info},
    once_cell::sync::Lazy,
    perl_packaging::resource::{BundleResource, ResourceCollection},
    regex::Regex,
    std::path::{Path, PathBuf},
};

/// Prefix of output lines describing a loaded file.
const MARKER: &str = "perl-bundler-inc";

static RE_MODULE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:::[A-Za-z0-9_]+)*$")
        .expect("module name regex should compile")
});

/// Build the Perl program loading modules and evaluating code.
pub fn tracer_program(modules: &[String], code: &[String]) -> Result<String> {
    let mut program = String::new();

    for module in modules {
        if !RE_MODULE_NAME.is_match(module) {
            return Err(anyhow!("invalid module name: {}", module));
        }

        program.push_str(&format!("require {};\n", module));
    }

    for code in code {
        program.push_str(&format!("{{\n{}\n;\n}}\n", code));
    }

    program.push_str(&format!(
        concat!(
            "print \"{}\\t$_\\t$INC{{$_}}\\n\"\n",
            "    for grep {{ defined $INC{{$_}} && !ref $INC{{$_}} }} sort keys %INC;\n",
        ),
        MARKER
    ));

    Ok(program)
}

/// Parse the output of the tracer program.
///
/// Returns `(resource name, path)` pairs. Unrelated output is ignored.
pub fn parse_tracer_output(output: &str) -> Vec<(String, PathBuf)> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '\t');

            match (parts.next(), parts.next(), parts.next()) {
                (Some(MARKER), Some(name), Some(path)) if !name.is_empty() => {
                    Some((name.to_string(), PathBuf::from(path)))
                }
                _ => None,
            }
        })
        .filter(|(name, _)| !name.starts_with('/'))
        .collect()
}

/// Resolve the files loaded by a set of modules and code snippets.
pub fn trace_modules(
    perl: &Path,
    modules: &[String],
    code: &[String],
) -> Result<ResourceCollection> {
    info!(
        "tracing {} modules and {} code snippets with {}",
        modules.len(),
        code.len(),
        perl.display()
    );

    let program = tracer_program(modules, code)?;
    let output = duct::cmd(perl.as_os_str(), &["-e", program.as_str()])
        .stdout_capture()
        .read()
        .with_context(|| format!("running {} to trace modules", perl.display()))?;

    Ok(parse_tracer_output(&output)
        .into_iter()
        .map(|(name, path)| {
            debug!("traced {} at {}", name, path.display());
            BundleResource::new(name, path)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use {super::*, crate::testutil::perl_in_path, indoc::indoc};

    #[test]
    fn test_tracer_program() -> Result<()> {
        let program = tracer_program(
            &["strict".to_string(), "List::Util".to_string()],
            &["use Socket;".to_string()],
        )?;

        assert!(program
            .starts_with("require strict;\nrequire List::Util;\n{\nuse Socket;\n;\n}\n"));
        assert!(program.contains("print \"perl-bundler-inc\\t$_\\t$INC{$_}\\n\""));

        assert!(tracer_program(&["Foo; system 'x'".to_string()], &[]).is_err());

        Ok(())
    }

    #[test]
    fn test_parse_tracer_output() {
        let traced = parse_tracer_output(indoc! {"
            some output of the program
            perl-bundler-inc\tList/Util.pm\t/usr/lib/perl5/List/Util.pm
            perl-bundler-inc\tstrict.pm\t/usr/share/perl5/strict.pm
            perl-bundler-inc\t/abs/path.pl\t/abs/path.pl
            perl-bundler-inc\tbroken
        "});

        assert_eq!(
            traced,
            vec![
                (
                    "List/Util.pm".to_string(),
                    PathBuf::from("/usr/lib/perl5/List/Util.pm")
                ),
                (
                    "strict.pm".to_string(),
                    PathBuf::from("/usr/share/perl5/strict.pm")
                ),
            ]
        );
    }

    #[test]
    fn test_trace_bare_name() -> Result<()> {
        if !perl_in_path() {
            eprintln!("perl not found in PATH; skipping");
            return Ok(());
        }

        let traced = trace_modules(
            Path::new("perl"),
            &["strict".to_string()],
            &["use warnings;".to_string()],
        )?;

        assert!(traced.contains("strict.pm"));
        assert!(traced.contains("warnings.pm"));
        assert!(traced
            .get("strict.pm")
            .and_then(|r| r.location.path())
            .map_or(false, |p| p.is_file()));

        Ok(())
    }
}
