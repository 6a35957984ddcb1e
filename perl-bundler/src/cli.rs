// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{
        bundling,
        logging,
        settings::{expand_profiles, AddedFile, BundleSettings, StripMode, CACHE_ENV_VAR},
    },
    anyhow::{anyhow, Result},
    clap::{value_parser, Arg, ArgAction, ArgMatches, Command},
    perl_packaging::{filtering::FilterRule, packlist::PackListRootPolicy},
    std::path::PathBuf,
};

const ABOUT: &str = "\
Bundle Perl modules into C sources for static embedding.

Resources are gathered from modules traced by running Perl (--use, --eval),
explicitly added files (--add, --addbin) and files matching globs in the
search roots (--incglob). Their dependencies (autoload files, static
extension archives and optionally .packlist contents) are discovered
automatically.

The bundle is written as a C header and source defining an @INC hook that
serves every resource from memory, along with the compiler and linker
flags needed to build it. With --app, an executable is built as well.

Arguments in files given to --profile are inserted in place of the
--profile argument.
";

/// Build the command line interface definition.
pub fn command() -> Command {
    Command::new("perl-bundler")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Bundle Perl modules into C sources")
        .long_about(ABOUT)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase logging verbosity. Can be specified multiple times"),
        )
        .arg(
            Arg::new("profile")
                .long("profile")
                .value_name("FILE")
                .action(ArgAction::Append)
                .help("Read additional arguments from FILE"),
        )
        .arg(
            Arg::new("perl")
                .long("perl")
                .value_name("PATH")
                .default_value("perl")
                .value_parser(value_parser!(PathBuf))
                .help("Perl executable to trace modules and probe configuration with"),
        )
        .arg(
            Arg::new("use")
                .long("use")
                .value_name("MODULE")
                .action(ArgAction::Append)
                .help("Bundle MODULE and everything it loads"),
        )
        .arg(
            Arg::new("eval")
                .long("eval")
                .value_name("CODE")
                .action(ArgAction::Append)
                .help("Bundle every module loaded by running CODE"),
        )
        .arg(
            Arg::new("add")
                .long("add")
                .value_name("PATH[ NAME]")
                .action(ArgAction::Append)
                .help("Bundle a file, optionally under a different resource name"),
        )
        .arg(
            Arg::new("addbin")
                .long("addbin")
                .value_name("PATH[ NAME]")
                .action(ArgAction::Append)
                .help("Bundle a file whose content is never transformed"),
        )
        .arg(
            Arg::new("boot")
                .long("boot")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Script to run when the bundle is initialized"),
        )
        .arg(
            Arg::new("incglob")
                .long("incglob")
                .value_name("PATTERN")
                .action(ArgAction::Append)
                .help("Bundle every file in the search roots matching PATTERN"),
        )
        .arg(
            Arg::new("include")
                .long("include")
                .value_name("PATTERN")
                .action(ArgAction::Append)
                .help("Keep resources matching PATTERN, protecting them from later excludes"),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .value_name("PATTERN")
                .action(ArgAction::Append)
                .help("Drop resources matching PATTERN"),
        )
        .arg(
            Arg::new("search_root")
                .long("search-root")
                .value_name("DIR")
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("Directory to search for modules. Defaults to Perl's @INC"),
        )
        .arg(
            Arg::new("usepacklists")
                .long("usepacklists")
                .action(ArgAction::SetTrue)
                .help("Bundle every file listed in .packlist files of bundled modules"),
        )
        .arg(
            Arg::new("packlist_first_root_only")
                .long("packlist-first-root-only")
                .action(ArgAction::SetTrue)
                .help("Only resolve .packlist entries against the first search root"),
        )
        .arg(
            Arg::new("strip")
                .long("strip")
                .value_name("MODE")
                .value_parser(["none", "command"])
                .default_value("none")
                .help("How to transform resource content before bundling"),
        )
        .arg(
            Arg::new("strip_command")
                .long("strip-command")
                .value_name("CMD")
                .help("Command filtering resource content from stdin to stdout"),
        )
        .arg(
            Arg::new("cache")
                .long("cache")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help(format!(
                    "Directory caching transformed content. Defaults to ${}",
                    CACHE_ENV_VAR
                )),
        )
        .arg(
            Arg::new("no_cache")
                .long("no-cache")
                .action(ArgAction::SetTrue)
                .conflicts_with("cache")
                .help("Do not cache transformed content"),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .value_name("NAME")
                .default_value("bundle")
                .help("Base name of generated files"),
        )
        .arg(
            Arg::new("output_dir")
                .long("output-dir")
                .value_name("DIR")
                .default_value(".")
                .value_parser(value_parser!(PathBuf))
                .help("Directory to write generated files to"),
        )
        .arg(
            Arg::new("packed_output")
                .long("packed-output")
                .action(ArgAction::SetTrue)
                .help("Also write the packed resources as a standalone blob"),
        )
        .arg(
            Arg::new("ccopts")
                .long("ccopts")
                .value_name("FLAGS")
                .allow_hyphen_values(true)
                .help("Compiler flags to use instead of Perl's"),
        )
        .arg(
            Arg::new("ldopts")
                .long("ldopts")
                .value_name("FLAGS")
                .allow_hyphen_values(true)
                .help("Linker flags to use instead of Perl's"),
        )
        .arg(
            Arg::new("link_arg")
                .long("link-arg")
                .value_name("ARG")
                .action(ArgAction::Append)
                .allow_hyphen_values(true)
                .help("Additional linker argument, placed before everything else"),
        )
        .arg(
            Arg::new("cc")
                .long("cc")
                .value_name("COMPILER")
                .help("C compiler to build --app with"),
        )
        .arg(
            Arg::new("force_static")
                .long("force-static")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Link the archive of module NAME or library -lNAME statically"),
        )
        .arg(
            Arg::new("static")
                .long("static")
                .action(ArgAction::SetTrue)
                .help("Link the executable fully statically"),
        )
        .arg(
            Arg::new("perlmain")
                .long("perlmain")
                .action(ArgAction::SetTrue)
                .help("Also write perlmain.c"),
        )
        .arg(
            Arg::new("app")
                .long("app")
                .value_name("NAME")
                .help("Build an executable named NAME"),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .action(ArgAction::SetTrue)
                .help("Print the names of bundled resources instead of generating code"),
        )
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

/// Resolve include and exclude rules in the order they were given.
fn filter_rules(matches: &ArgMatches) -> Result<Vec<FilterRule>> {
    let mut rules = vec![];

    for (id, include) in [("include", true), ("exclude", false)] {
        if let (Some(values), Some(indices)) =
            (matches.get_many::<String>(id), matches.indices_of(id))
        {
            for (index, pattern) in indices.zip(values) {
                let rule = if include {
                    FilterRule::include(pattern)?
                } else {
                    FilterRule::exclude(pattern)?
                };
                rules.push((index, rule));
            }
        }
    }

    rules.sort_by_key(|(index, _)| *index);

    Ok(rules.into_iter().map(|(_, rule)| rule).collect())
}

fn strip_mode(matches: &ArgMatches) -> Result<StripMode> {
    let command = matches.get_one::<String>("strip_command");

    match matches
        .get_one::<String>("strip")
        .map(|s| s.as_str())
        .unwrap_or("none")
    {
        "none" => Ok(StripMode::None),
        "command" => command
            .map(|c| StripMode::Command(c.clone()))
            .ok_or_else(|| anyhow!("--strip command requires --strip-command")),
        other => Err(anyhow!("unknown strip mode: {}", other)),
    }
}

fn cache_dir(matches: &ArgMatches) -> Option<PathBuf> {
    if matches.get_flag("no_cache") {
        None
    } else if let Some(dir) = matches.get_one::<PathBuf>("cache") {
        Some(dir.clone())
    } else {
        std::env::var_os(CACHE_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }
}

/// Resolve bundle settings from parsed arguments.
pub fn settings_from_matches(matches: &ArgMatches) -> Result<BundleSettings> {
    let defaults = BundleSettings::default();

    let added_files = strings(matches, "add")
        .iter()
        .map(|v| AddedFile::parse(v, false))
        .chain(
            strings(matches, "addbin")
                .iter()
                .map(|v| AddedFile::parse(v, true)),
        )
        .collect::<Result<Vec<_>>>()?;

    Ok(BundleSettings {
        perl: matches
            .get_one::<PathBuf>("perl")
            .cloned()
            .unwrap_or(defaults.perl),
        use_modules: strings(matches, "use"),
        eval_code: strings(matches, "eval"),
        added_files,
        boot: matches.get_one::<PathBuf>("boot").cloned(),
        incglobs: strings(matches, "incglob"),
        filter_rules: filter_rules(matches)?,
        search_roots: matches
            .get_many::<PathBuf>("search_root")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        follow_packlists: matches.get_flag("usepacklists"),
        packlist_root_policy: if matches.get_flag("packlist_first_root_only") {
            PackListRootPolicy::FirstRootOnly
        } else {
            PackListRootPolicy::FirstMatching
        },
        strip: strip_mode(matches)?,
        cache_dir: cache_dir(matches),
        prefix: matches
            .get_one::<String>("prefix")
            .cloned()
            .unwrap_or(defaults.prefix),
        output_dir: matches
            .get_one::<PathBuf>("output_dir")
            .cloned()
            .unwrap_or(defaults.output_dir),
        packed_output: matches.get_flag("packed_output"),
        ccopts: matches.get_one::<String>("ccopts").cloned(),
        ldopts: matches.get_one::<String>("ldopts").cloned(),
        link_args: strings(matches, "link_arg"),
        cc: matches.get_one::<String>("cc").cloned(),
        force_static: strings(matches, "force_static").into_iter().collect(),
        fully_static: matches.get_flag("static"),
        perlmain: matches.get_flag("perlmain"),
        app: matches.get_one::<String>("app").cloned(),
        list_only: matches.get_flag("list"),
    })
}

pub fn run_cli() -> Result<()> {
    let args = expand_profiles(std::env::args_os().collect())?;
    let matches = command().get_matches_from(args);

    logging::init_logging(matches.get_count("verbose"));

    let settings = settings_from_matches(&matches)?;

    bundling::run_bundle(&settings)
}
