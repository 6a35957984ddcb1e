// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolve details about the Perl installation being bundled.

use {
    anyhow::{anyhow, Context, Result},
    log::info,
    std::path::{Path, PathBuf},
};

/// Perl program printing the configuration we care about.
const PROBE_PROGRAM: &str = r#"
$0 = "perl-bundler";
use Config;
use ExtUtils::Embed ();
print "inc\t$_\n" for grep { !ref } @INC;
print "$_\t$Config{$_}\n" for qw(cc _a dlext archlibexp);
print "ccopts\t", scalar ExtUtils::Embed::ccopts(), "\n";
print "ldopts\t", scalar ExtUtils::Embed::ldopts(), "\n";
"#;

/// Configuration of a Perl installation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PerlConfig {
    /// Directories in `@INC`, in search order.
    pub inc: Vec<PathBuf>,

    /// The C compiler Perl was built with.
    pub cc: String,

    /// Suffix of static libraries. e.g. `.a`.
    pub static_library_suffix: String,

    /// Suffix of dynamically loadable extensions. e.g. `.so`.
    pub dynamic_library_suffix: String,

    /// Directory holding architecture dependent modules and `CORE/`.
    pub archlib: PathBuf,

    /// Compiler flags for embedding Perl.
    pub ccopts: String,

    /// Linker flags for embedding Perl.
    pub ldopts: String,
}

impl PerlConfig {
    /// Resolve the configuration of a Perl executable.
    pub fn probe(perl: &Path) -> Result<Self> {
        info!("probing configuration of {}", perl.display());

        // A bare name is looked up in PATH only when passed as a string.
        let output = duct::cmd(perl.as_os_str(), &["-e", PROBE_PROGRAM])
            .stdout_capture()
            .read()
            .with_context(|| format!("running {} to resolve its configuration", perl.display()))?;

        Self::parse(&output)
    }

    /// Parse the output of the probe program.
    pub fn parse(output: &str) -> Result<Self> {
        let mut res = Self::default();
        let mut seen_cc = false;

        for line in output.lines().filter(|l| !l.trim().is_empty()) {
            let (key, value) = line
                .split_once('\t')
                .ok_or_else(|| anyhow!("malformed Perl configuration line: {}", line))?;
            let value = value.trim().to_string();

            match key {
                "inc" => res.inc.push(PathBuf::from(value)),
                "cc" => {
                    seen_cc = true;
                    res.cc = value;
                }
                "_a" => res.static_library_suffix = value,
                "dlext" => res.dynamic_library_suffix = format!(".{}", value),
                "archlibexp" => res.archlib = PathBuf::from(value),
                "ccopts" => res.ccopts = value,
                "ldopts" => res.ldopts = value,
                _ => {}
            }
        }

        if !seen_cc {
            return Err(anyhow!("Perl configuration did not report a C compiler"));
        }

        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::testutil::perl_in_path, indoc::indoc};

    #[test]
    fn test_parse() -> Result<()> {
        let config = PerlConfig::parse(indoc! {"
            inc\t/usr/local/lib/perl5
            inc\t/usr/lib/perl5
            cc\tcc
            _a\t.a
            dlext\tso
            archlibexp\t/usr/lib/perl5/arch
            ccopts\t -D_REENTRANT -I/usr/lib/perl5/arch/CORE
            ldopts\t-Wl,-E -L/usr/lib/perl5/arch/CORE -lperl -lm
        "})?;

        assert_eq!(
            config,
            PerlConfig {
                inc: vec![
                    PathBuf::from("/usr/local/lib/perl5"),
                    PathBuf::from("/usr/lib/perl5")
                ],
                cc: "cc".to_string(),
                static_library_suffix: ".a".to_string(),
                dynamic_library_suffix: ".so".to_string(),
                archlib: PathBuf::from("/usr/lib/perl5/arch"),
                ccopts: "-D_REENTRANT -I/usr/lib/perl5/arch/CORE".to_string(),
                ldopts: "-Wl,-E -L/usr/lib/perl5/arch/CORE -lperl -lm".to_string(),
            }
        );

        Ok(())
    }

    #[test]
    fn test_probe_bare_name() -> Result<()> {
        if !perl_in_path() {
            eprintln!("perl not found in PATH; skipping");
            return Ok(());
        }

        let config = PerlConfig::probe(Path::new("perl"))?;

        assert!(!config.inc.is_empty());
        assert!(!config.cc.is_empty());
        assert!(config.dynamic_library_suffix.starts_with('.'));

        Ok(())
    }

    #[test]
    fn test_parse_malformed() {
        assert!(PerlConfig::parse("garbage\n").is_err());
        assert!(PerlConfig::parse("inc\t/usr/lib/perl5\n").is_err());
    }
}
