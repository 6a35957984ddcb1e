// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    anyhow::Result,
    assert_cmd::Command,
    assert_fs::{prelude::*, TempDir},
    predicates::prelude::*,
};

/// A command which never needs to probe a Perl installation.
fn get_command(temp_dir: &TempDir) -> Result<Command> {
    let mut command = Command::cargo_bin("perl-bundler")?;
    command
        .arg("--search-root")
        .arg(temp_dir.child("lib").path())
        .arg("--ccopts")
        .arg("-I/perl/CORE")
        .arg("--ldopts")
        .arg("-lperl -lm")
        .arg("--no-cache");

    Ok(command)
}

fn populate(temp_dir: &TempDir) -> Result<()> {
    temp_dir
        .child("lib/Foo.pm")
        .write_str("package Foo;\nuse AutoLoader 'AUTOLOAD';\n1;\n")?;
    temp_dir
        .child("lib/auto/Foo/autosplit.ix")
        .write_str("package Foo;\nsub bar ;\n1;\n")?;
    temp_dir
        .child("lib/auto/Foo/bar.al")
        .write_str("package Foo;\nsub bar { 42 }\n1;\n")?;
    temp_dir.child("lib/Foo.pod").write_str("=head1 NAME\n")?;
    temp_dir.child("main.pl").write_str("use Foo;\n")?;

    Ok(())
}

fn generates_bundle() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate(&temp_dir)?;
    let out_dir = temp_dir.child("out");

    get_command(&temp_dir)?
        .arg("--incglob")
        .arg("Foo.*")
        .arg("--exclude")
        .arg("*.pod")
        .arg("--boot")
        .arg(temp_dir.child("main.pl").path())
        .arg("--prefix")
        .arg("app")
        .arg("--output-dir")
        .arg(out_dir.path())
        .arg("--perlmain")
        .arg("--packed-output")
        .assert()
        .success();

    out_dir
        .child("app.h")
        .assert(predicates::str::contains("#define PERL_BUNDLE_COUNT 4"));
    out_dir
        .child("app.c")
        .assert(predicates::str::contains("staticperl_xs_init"));
    out_dir
        .child("app.ccopts")
        .assert(predicates::str::contains("-I/perl/CORE"));
    out_dir
        .child("app.ldopts")
        .assert(predicates::str::contains("-lperl -lm"));
    out_dir
        .child("perlmain.c")
        .assert(predicates::path::is_file());
    out_dir
        .child("app.bin")
        .assert(predicates::path::is_file());

    Ok(())
}

fn lists_resources() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate(&temp_dir)?;

    get_command(&temp_dir)?
        .arg("--incglob")
        .arg("*.pm")
        .arg("--list")
        .assert()
        .success()
        .stdout(
            predicates::str::contains("Foo.pm")
                .and(predicates::str::contains("auto/Foo/autosplit.ix"))
                .and(predicates::str::contains("auto/Foo/bar.al"))
                .and(predicates::str::contains("Foo.pod").not()),
        );

    Ok(())
}

fn missing_file_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate(&temp_dir)?;

    get_command(&temp_dir)?
        .arg("--add")
        .arg("does/not/Exist.pm")
        .arg("--list")
        .assert()
        .failure()
        .stderr(predicates::str::contains("error:").and(predicates::str::contains("Exist.pm")));

    Ok(())
}

fn dynamic_extension_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate(&temp_dir)?;
    temp_dir.child("lib/Bar.pm").write_str("package Bar;\n1;\n")?;
    temp_dir.child("lib/auto/Bar/Bar.so").write_binary(b"\x7fELF")?;

    get_command(&temp_dir)?
        .arg("--incglob")
        .arg("Bar.pm")
        .arg("--list")
        .assert()
        .failure()
        .stderr(predicates::str::contains("dynamically loadable object"));

    Ok(())
}

/// Whether `perl` in PATH can be embedded by the host C compiler.
fn can_embed_perl(temp_dir: &TempDir) -> bool {
    let flags = |kind: &str| {
        duct::cmd("perl", &["-MExtUtils::Embed", "-e", kind])
            .stderr_null()
            .read()
            .ok()
            .and_then(|s| shlex::split(&s))
    };

    let (ccopts, ldopts) = match (flags("ccopts"), flags("ldopts")) {
        (Some(ccopts), Some(ldopts)) => (ccopts, ldopts),
        _ => return false,
    };

    let source = temp_dir.child("embed-check.c");
    if source
        .write_str(concat!(
            "#include <EXTERN.h>\n",
            "#include <perl.h>\n",
            "int main (void) { return perl_alloc () == NULL; }\n",
        ))
        .is_err()
    {
        return false;
    }

    let mut args = ccopts;
    args.push("-o".to_string());
    args.push(temp_dir.child("embed-check").path().display().to_string());
    args.push(source.path().display().to_string());
    args.extend(ldopts);

    duct::cmd("cc", &args)
        .stdout_null()
        .stderr_null()
        .run()
        .is_ok()
}

fn probes_default_perl() -> Result<()> {
    if duct::cmd("perl", &["-MExtUtils::Embed", "-e", "1"])
        .run()
        .is_err()
    {
        eprintln!("perl with ExtUtils::Embed not found in PATH; skipping probes_default_perl");
        return Ok(());
    }

    Command::cargo_bin("perl-bundler")?
        .arg("--incglob")
        .arg("/strict.pm")
        .arg("--list")
        .arg("--no-cache")
        .assert()
        .success()
        .stdout(predicates::str::contains("strict.pm"));

    Ok(())
}

fn lists_without_probing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate(&temp_dir)?;

    Command::cargo_bin("perl-bundler")?
        .arg("--perl")
        .arg(temp_dir.child("no-such-perl").path())
        .arg("--search-root")
        .arg(temp_dir.child("lib").path())
        .arg("--incglob")
        .arg("*.pm")
        .arg("--list")
        .arg("--no-cache")
        .assert()
        .success()
        .stdout(predicates::str::contains("Foo.pm"));

    Ok(())
}

fn builds_working_app() -> Result<()> {
    let temp_dir = TempDir::new()?;

    if !can_embed_perl(&temp_dir) {
        eprintln!("unable to embed perl with cc; skipping builds_working_app");
        return Ok(());
    }

    temp_dir
        .child("lib/My/Greeting.pm")
        .write_str("package My::Greeting;\nsub hello { 'hello from bundle' }\n1;\n")?;
    temp_dir.child("main.pl").write_str(
        "use My::Greeting;\nprint My::Greeting::hello(), \"|$INC{'My/Greeting.pm'}|@ARGV\\n\";\n",
    )?;
    let out_dir = temp_dir.child("out");

    Command::cargo_bin("perl-bundler")?
        .arg("--search-root")
        .arg(temp_dir.child("lib").path())
        .arg("--incglob")
        .arg("/My/*.pm")
        .arg("--boot")
        .arg(temp_dir.child("main.pl").path())
        .arg("--output-dir")
        .arg(out_dir.path())
        .arg("--app")
        .arg("app")
        .arg("--no-cache")
        .assert()
        .success();

    out_dir.child("bundle.c").assert(predicates::path::missing());

    // The module is deleted so it can only come from the bundle.
    std::fs::remove_dir_all(temp_dir.child("lib").path())?;

    Command::new(out_dir.child("app").path())
        .write_stdin("")
        .assert()
        .success()
        .stdout("hello from bundle|/bundle/My/Greeting.pm|\n");

    Command::new(out_dir.child("app").path())
        .arg("-x")
        .arg("second")
        .write_stdin("")
        .assert()
        .success()
        .stdout("hello from bundle|/bundle/My/Greeting.pm|-x second\n");

    Ok(())
}

fn run() -> Result<()> {
    generates_bundle()?;
    lists_resources()?;
    missing_file_fails()?;
    dynamic_extension_fails()?;
    lists_without_probing()?;
    probes_default_perl()?;
    builds_working_app()?;

    Ok(())
}

fn main() {
    run().expect("all tests should pass");
}
