//! Command-line interface for the cloudwatching binary.
//!
//! The CLI validates export configuration documents and lists the metric
//! namespaces whose resources can be resolved to tags.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    process,
};

use clap::{ArgAction, Args, Parser, Subcommand};
use cloudwatching::{
    CompiledConfiguration, ConfigDocument, Error, ExportConfig, NamespaceResourceTypes,
    StatDefault, TagSelect, compile_document, io_error, resource_type_filters,
    supported_namespaces,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Command line interface for validating CloudWatch export configurations.
#[derive(Debug, Parser,)]
#[command(name = "cloudwatching", version, about = "Validate CloudWatch export configuration")]
struct Cli
{
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging regardless of the document's `debug` flag.
    #[arg(long = "debug", global = true, action = ArgAction::SetTrue, env = "CLOUDWATCHING_DEBUG")]
    debug: bool,
}

#[derive(Debug, Subcommand,)]
/// Supported commands exposed by the CLI.
enum Command
{
    /// Compile a configuration document and print the validated exports.
    Check(CheckArgs,),
    /// Print the namespaces supported by tag resolution.
    Namespaces(NamespacesArgs,),
}

#[derive(Debug, Args,)]
/// Arguments accepted by the `check` subcommand.
struct CheckArgs
{
    /// Path to the YAML configuration document.
    #[arg(long = "config", value_name = "PATH", env = "CLOUDWATCHING_CONFIG")]
    config: PathBuf,

    /// Output formatted JSON for easier inspection.
    #[arg(long = "pretty", action = ArgAction::SetTrue)]
    pretty: bool,
}

#[derive(Debug, Args,)]
struct NamespacesArgs
{
    /// Output formatted JSON for easier inspection.
    #[arg(long = "pretty", action = ArgAction::SetTrue)]
    pretty: bool,
}

/// Validated document as printed by `check`.
#[derive(Debug, Serialize,)]
struct CheckReport<'a,>
{
    region:        &'a str,
    max_tag_pages: usize,
    exports:       Vec<ExportSummary<'a,>,>,
}

#[derive(Debug, Serialize,)]
struct ExportSummary<'a,>
{
    namespace:           &'a str,
    name:                &'a str,
    dimensions:          &'a [String],
    statistics:          &'a [String],
    stat_default:        StatDefault,
    #[serde(skip_serializing_if = "is_unused")]
    tag_select:          &'a TagSelect,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_types:      Option<&'static [&'static str],>,
    #[serde(rename = "dimensionsMatch")]
    dimensions_match:    BTreeMap<&'a str, &'a str,>,
    #[serde(rename = "dimensionsNoMatch")]
    dimensions_no_match: BTreeMap<&'a str, &'a str,>,
}

impl<'a,> ExportSummary<'a,>
{
    fn from_export(export: &'a ExportConfig,) -> Self
    {
        let resource_types = export
            .uses_tag_select()
            .then(|| resource_type_filters(&export.namespace,).ok(),)
            .flatten();

        Self {
            namespace: &export.namespace,
            name: &export.name,
            dimensions: &export.dimensions,
            statistics: &export.statistics,
            stat_default: export.stat_default,
            tag_select: &export.tag_select,
            resource_types,
            dimensions_match: pattern_sources(&export.dimensions_match,),
            dimensions_no_match: pattern_sources(&export.dimensions_no_match,),
        }
    }
}

fn is_unused(tag_select: &&TagSelect,) -> bool
{
    tag_select.is_empty()
}

fn pattern_sources(patterns: &BTreeMap<String, regex::Regex,>,) -> BTreeMap<&str, &str,>
{
    patterns.iter().map(|(dimension, pattern,)| (dimension.as_str(), pattern.as_str(),),).collect()
}

/// Entry point that reports errors and sets the appropriate exit status.
fn main()
{
    if let Err(error,) = run() {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

/// Executes the CLI using parsed arguments.
///
/// # Errors
///
/// Propagates errors originating from configuration loading and compilation.
fn run() -> Result<(), Error,>
{
    let cli = Cli::parse();

    match cli.command {
        Command::Check(args,) => run_check(&args, cli.debug,),
        Command::Namespaces(args,) => {
            init_tracing(cli.debug,);
            run_namespaces(&args,)
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `debug`.
///
/// An already installed subscriber is kept and keeps receiving events.
fn init_tracing(debug: bool,)
{
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level,),);
    if let Err(error,) =
        tracing_subscriber::fmt().with_env_filter(filter,).with_writer(io::stderr,).try_init()
    {
        debug!("Keeping existing tracing subscriber: {}", error);
    }
}

fn read_document(path: &Path,) -> Result<ConfigDocument, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| io_error(path, source,),)?;
    Ok(serde_yaml::from_str(&contents,)?,)
}

/// Handles the `check` subcommand.
///
/// The document is decoded before logging is installed so its `debug` flag
/// can select the log level for the compilation itself.
fn run_check(args: &CheckArgs, debug: bool,) -> Result<(), Error,>
{
    let document = read_document(&args.config,)?;
    init_tracing(debug || document.debug,);

    let compiled = compile_document(&document,)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_check_report(&mut handle, &compiled, args.pretty,)
}

fn write_check_report<W: io::Write,>(
    writer: &mut W,
    compiled: &CompiledConfiguration,
    pretty: bool,
) -> Result<(), Error,>
{
    let report = CheckReport {
        region:        &compiled.region,
        max_tag_pages: compiled.max_tag_pages,
        exports:       compiled.exports.iter().map(ExportSummary::from_export,).collect(),
    };
    write_json(writer, &report, pretty,)
}

fn run_namespaces(args: &NamespacesArgs,) -> Result<(), Error,>
{
    let namespaces: Vec<NamespaceResourceTypes,> = supported_namespaces().collect();

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, &namespaces, args.pretty,)
}

fn write_json<W: io::Write, T: Serialize + ?Sized,>(
    writer: &mut W,
    value: &T,
    pretty: bool,
) -> Result<(), Error,>
{
    if pretty {
        serde_json::to_writer_pretty(writer, value,)?;
    } else {
        serde_json::to_writer(writer, value,)?;
    }

    Ok((),)
}
