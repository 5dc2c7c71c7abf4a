use std::path::{Path, PathBuf};
use std::process;

use std::ffi::OsString;

use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use tracing::{error, info, warn};

use xmlreg::{
    normalize_path, ExportRequest, Hive, HiveView, OperationReport, Redirection, RegistryStore,
    ReplacementEngine, ReplacementRule, RunOptions, StdinConfirm, UsageError, XmlRegError,
};

#[derive(Parser, Debug)]
#[command(name = "xmlreg", version, about = "Export, import and wipe registry subtrees as XML fragments")]
struct Cli {
    /// Merge the fragment in FILE into the registry
    #[arg(short = 'i', long, value_name = "FILE")]
    import: Option<PathBuf>,
    /// Write a registry subtree to FILE
    #[arg(short = 'e', long, value_name = "FILE")]
    export: Option<PathBuf>,
    /// Delete the items declared in FILE from the registry
    #[arg(short = 'w', long, value_name = "FILE")]
    wipe: Option<PathBuf>,

    /// Hive for both the source and the destination (HKLM, HKCU, HKU, HKCR)
    #[arg(long)]
    hive: Option<String>,
    /// Key path for both the source and the destination
    #[arg(short = 'k', long)]
    key: Option<String>,
    /// Registry view for both sides: 32 or 64
    #[arg(short = 'r', long)]
    redirection: Option<String>,

    #[arg(long)]
    input_hive: Option<String>,
    #[arg(long)]
    input_key: Option<String>,
    #[arg(long)]
    input_redirection: Option<String>,
    #[arg(long)]
    output_hive: Option<String>,
    #[arg(long)]
    output_key: Option<String>,
    #[arg(long)]
    output_redirection: Option<String>,

    /// Regular expression applied to imported value text; pairs with the next --replace
    #[arg(short = 'm', long = "match", value_name = "PATTERN", action = ArgAction::Append)]
    matches: Vec<String>,
    /// Replacement for the preceding --match; may use captures as $1 or ${1}
    /// (braces are required when a letter, digit or underscore follows, as in ${1}a)
    #[arg(long = "replace", value_name = "TEXT", action = ArgAction::Append)]
    replaces: Vec<String>,
    /// Path whose directory and file forms fill {dir}, {short-dir}, {file} and {short-file}
    #[arg(long, value_name = "PATH")]
    reference: Option<PathBuf>,

    /// Never prompt
    #[arg(short = 'y', long)]
    unattended: bool,
    /// Log per-item failures and keep going
    #[arg(long)]
    skip_errors: bool,

    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(short = 'q', long, action = ArgAction::Count)]
    quiet: u8,
    /// Emit log lines as JSON
    #[arg(long)]
    log_json: bool,

    /// Whether every --match was directly followed by its --replace.
    #[arg(skip)]
    rules_paired: bool,
}

impl Cli {
    fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        let mut cli = Self::from_arg_matches(&matches)?;
        cli.rules_paired = rules_paired(&matches);
        Ok(cli)
    }
}

// Each --match value must be followed by a --replace with no other switch between.
// clap counts a flag and its value as two indices, `--flag=value` included.
fn rules_paired(matches: &ArgMatches) -> bool {
    let patterns = matches.indices_of("matches").into_iter().flatten();
    let replacements = matches.indices_of("replaces").into_iter().flatten();
    let mut order: Vec<(usize, bool)> = patterns
        .map(|index| (index, true))
        .chain(replacements.map(|index| (index, false)))
        .collect();
    order.sort_unstable();
    order
        .chunks(2)
        .all(|pair| matches!(pair, [(pattern, true), (replacement, false)] if *replacement == pattern + 2))
}

#[derive(Debug)]
enum Operation {
    Import(PathBuf),
    Export(ExportRequest),
    Wipe(PathBuf),
}

#[derive(Debug)]
struct Plan {
    operation: Operation,
    rules: ReplacementEngine,
    options: RunOptions,
}

fn main() {
    let cli = match Cli::try_parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            let _ = err.print();
            process::exit(0);
        }
        Err(err) => {
            let _ = err.print();
            process::exit(UsageError::InvalidArguments(String::new()).exit_code());
        }
    };

    let verbosity = (cli.verbose as i8).saturating_sub(cli.quiet as i8);
    if let Err(err) = xmlreg::logging::init(verbosity, cli.log_json) {
        eprintln!("warning: {:#}", err);
    }
    info!("xmlreg {}", env!("CARGO_PKG_VERSION"));

    match plan(&cli).and_then(|plan| execute(&plan)) {
        Ok(report) => {
            if !report.is_clean() {
                warn!("{} items were skipped", report.skipped_count());
            }
            info!("completed successfully");
        }
        Err(err) => {
            error!("{}", err);
            error!("failed");
            process::exit(err.exit_code());
        }
    }
}

fn plan(cli: &Cli) -> xmlreg::Result<Plan> {
    let options = RunOptions {
        unattended: cli.unattended,
        skip_errors: cli.skip_errors,
    };

    let selected = [cli.import.is_some(), cli.export.is_some(), cli.wipe.is_some()]
        .into_iter()
        .filter(|set| *set)
        .count();
    if selected > 1 {
        return Err(UsageError::ConflictingOperations.into());
    }

    let operation = if let Some(file) = &cli.import {
        Operation::Import(required_file(file)?)
    } else if let Some(file) = &cli.export {
        Operation::Export(export_request(cli, required_file(file)?)?)
    } else if let Some(file) = &cli.wipe {
        Operation::Wipe(required_file(file)?)
    } else {
        return Err(UsageError::NoOperation.into());
    };

    Ok(Plan {
        operation,
        rules: replacement_rules(cli)?,
        options,
    })
}

fn required_file(file: &Path) -> Result<PathBuf, UsageError> {
    if file.as_os_str().is_empty() {
        Err(UsageError::NoFile)
    } else {
        Ok(file.to_path_buf())
    }
}

fn export_request(cli: &Cli, file: PathBuf) -> Result<ExportRequest, UsageError> {
    if cli.hive.is_none() {
        if cli.input_hive.is_none() {
            return Err(UsageError::NoInputHive);
        }
        if cli.output_hive.is_none() {
            return Err(UsageError::NoOutputHive);
        }
    }

    warn_overridden("hive", &cli.hive, &cli.input_hive, &cli.output_hive);
    warn_overridden("key", &cli.key, &cli.input_key, &cli.output_key);
    warn_overridden(
        "redirection",
        &cli.redirection,
        &cli.input_redirection,
        &cli.output_redirection,
    );

    Ok(ExportRequest {
        source: view(pick(&cli.input_hive, &cli.hive), pick(&cli.input_redirection, &cli.redirection))?,
        source_key: normalize_path(pick(&cli.input_key, &cli.key).unwrap_or_default()),
        destination: view(
            pick(&cli.output_hive, &cli.hive),
            pick(&cli.output_redirection, &cli.redirection),
        )?,
        destination_key: normalize_path(pick(&cli.output_key, &cli.key).unwrap_or_default()),
        file,
    })
}

// The split value wins over the joint one.
fn pick<'a>(split: &'a Option<String>, joint: &'a Option<String>) -> Option<&'a str> {
    split.as_deref().or(joint.as_deref())
}

fn warn_overridden(name: &str, joint: &Option<String>, input: &Option<String>, output: &Option<String>) {
    if joint.is_some() && input.is_some() && output.is_some() {
        warn!(
            "ignoring --{name} because --input-{name} and --output-{name} were used"
        );
    }
}

fn view(hive: Option<&str>, redirection: Option<&str>) -> Result<HiveView, UsageError> {
    let hive = match hive {
        Some(name) => name
            .parse::<Hive>()
            .map_err(|err| UsageError::InvalidArguments(err.to_string()))?,
        None => Hive::default(),
    };
    Ok(HiveView::new(hive, redirection.map(Redirection::from_tag).unwrap_or_default()))
}

fn replacement_rules(cli: &Cli) -> xmlreg::Result<ReplacementEngine> {
    if cli.matches.len() != cli.replaces.len() || !cli.rules_paired {
        return Err(UsageError::MatchWithoutReplace.into());
    }

    let mut rules = ReplacementEngine::new();
    for (pattern, replacement) in cli.matches.iter().zip(&cli.replaces) {
        let rule = ReplacementRule::new(pattern, replacement.as_str()).map_err(|source| {
            XmlRegError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            }
        })?;
        rules.push(rule);
    }

    match &cli.reference {
        Some(reference) => rules
            .with_reference_path(reference)
            .map_err(|err| XmlRegError::GeneralFailure(err.to_string())),
        None => Ok(rules),
    }
}

#[cfg(windows)]
fn execute(plan: &Plan) -> xmlreg::Result<OperationReport> {
    let mut store = xmlreg::WindowsRegistry::new();
    dispatch(&mut store, plan)
}

#[cfg(not(windows))]
fn execute(_plan: &Plan) -> xmlreg::Result<OperationReport> {
    Err(XmlRegError::GeneralFailure(
        "the live registry is only available on Windows".to_string(),
    ))
}

#[cfg_attr(not(any(windows, test)), allow(dead_code))]
fn dispatch<S: RegistryStore + ?Sized>(store: &mut S, plan: &Plan) -> xmlreg::Result<OperationReport> {
    let mut confirm = StdinConfirm;
    match &plan.operation {
        Operation::Import(file) => xmlreg::import(store, file, &plan.rules, plan.options, &mut confirm),
        Operation::Export(request) => xmlreg::export(store, request, plan.options, &mut confirm),
        Operation::Wipe(file) => xmlreg::wipe(store, file, plan.options),
    }
}
