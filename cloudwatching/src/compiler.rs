// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Compilation of raw export specifications into validated configurations.
//!
//! Every entry is processed in input order and the first failure aborts the
//! whole compilation. The result is either a complete sequence matching the
//! input one-to-one or an error; partial output is never returned.

use std::{collections::BTreeMap, fs, path::Path};

use regex::Regex;
use tracing::{debug, info};

use crate::{
    config::{
        ConfigDocument, RESOURCE_ID_DIMENSION, RESOURCE_TYPE_SELECTION, RawExportSpec, TagSelect,
    },
    error::{self, Error},
    namespace::is_supported_namespace,
    resolver::{StatDefault, compile_patterns},
    tags::DEFAULT_MAX_PAGES,
};

/// Validated export configuration consumed by the export pipeline.
///
/// Values are only produced by [`Compiler::compile`], so the dimension
/// filters are always compiled and the default-statistic policy is always a
/// recognized variant.
#[derive(Debug, Clone,)]
pub struct ExportConfig
{
    /// Metric namespace, also the join key against tag records.
    pub namespace:           String,
    /// Metric name within the namespace.
    pub name:                String,
    /// Dimension names the series is keyed on.
    pub dimensions:          Vec<String,>,
    /// Statistics to collect.
    pub statistics:          Vec<String,>,
    /// Tag selection criteria, passed through untouched.
    pub tag_select:          TagSelect,
    /// Compiled inclusion patterns keyed by dimension name.
    pub dimensions_match:    BTreeMap<String, Regex,>,
    /// Compiled exclusion patterns keyed by dimension name.
    pub dimensions_no_match: BTreeMap<String, Regex,>,
    /// Policy applied when a statistic has no datapoint.
    pub stat_default:        StatDefault,
}

impl ExportConfig
{
    /// Returns `true` when the export enriches its series with resource tags.
    pub fn uses_tag_select(&self,) -> bool
    {
        !self.tag_select.is_empty()
    }
}

/// Compiled patterns compare by source text; `Regex` itself has no equality.
impl PartialEq for ExportConfig
{
    fn eq(&self, other: &Self,) -> bool
    {
        self.namespace == other.namespace
            && self.name == other.name
            && self.dimensions == other.dimensions
            && self.statistics == other.statistics
            && self.tag_select == other.tag_select
            && same_patterns(&self.dimensions_match, &other.dimensions_match,)
            && same_patterns(&self.dimensions_no_match, &other.dimensions_no_match,)
            && self.stat_default == other.stat_default
    }
}

fn same_patterns(left: &BTreeMap<String, Regex,>, right: &BTreeMap<String, Regex,>,) -> bool
{
    left.len() == right.len()
        && left
            .iter()
            .zip(right.iter(),)
            .all(|((lk, lv,), (rk, rv,),)| lk == rk && lv.as_str() == rv.as_str(),)
}

/// Export-target consistency hook run after an entry passed the built-in
/// checks.
///
/// Closures with the matching signature implement the trait, which keeps
/// ad-hoc checks in tests and callers short.
pub trait ExportCheck
{
    /// Validates a compiled entry.
    ///
    /// # Errors
    ///
    /// Any error returned here aborts compilation.
    fn check(&self, config: &ExportConfig,) -> Result<(), Error,>;
}

impl<F,> ExportCheck for F
where
    F: Fn(&ExportConfig,) -> Result<(), Error,>,
{
    fn check(&self, config: &ExportConfig,) -> Result<(), Error,>
    {
        self(config,)
    }
}

/// Default hook; accepts every entry.
#[derive(Debug, Clone, Copy, Default,)]
pub struct NoCheck;

impl ExportCheck for NoCheck
{
    fn check(&self, _config: &ExportConfig,) -> Result<(), Error,>
    {
        Ok((),)
    }
}

/// Opt-in hook: exports that select by tag must use a namespace the tag
/// resolver can map to resource types.
///
/// Without it an unmapped namespace surfaces as
/// [`Error::UnsupportedNamespace`] when its tags are resolved.
#[derive(Debug, Clone, Copy, Default,)]
pub struct TaggableNamespaceCheck;

impl ExportCheck for TaggableNamespaceCheck
{
    fn check(&self, config: &ExportConfig,) -> Result<(), Error,>
    {
        if config.uses_tag_select() && !is_supported_namespace(&config.namespace,) {
            return Err(Error::validation(format!(
                "tag_select is not supported for namespace '{}' (metric '{}')",
                config.namespace, config.name
            ),),);
        }
        Ok((),)
    }
}

/// Compiles raw export specifications with a configurable consistency hook.
#[derive(Debug, Clone, Default,)]
pub struct Compiler<C = NoCheck,>
{
    check: C,
}

impl<C: ExportCheck,> Compiler<C,>
{
    /// Creates a compiler running `check` on every entry.
    pub fn with_check(check: C,) -> Self
    {
        Self {
            check,
        }
    }

    /// Compiles `specs` in order, failing on the first invalid entry.
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] when `tag_select` lacks a required key or the
    ///   consistency hook rejects the entry.
    /// * [`Error::InvalidEnum`] when `StatDefault` is not recognized.
    /// * [`Error::PatternCompile`] when a dimension pattern is malformed.
    pub fn compile(&self, specs: &[RawExportSpec],) -> Result<Vec<ExportConfig,>, Error,>
    {
        let mut compiled = Vec::with_capacity(specs.len(),);

        for (index, spec,) in specs.iter().enumerate() {
            debug!("Compiling export #{} {}/{}", index, spec.namespace, spec.name);
            let config = compile_entry(spec,).map_err(|error| {
                debug!("Export #{} {}/{} rejected: {}", index, spec.namespace, spec.name, error);
                error
            },)?;
            self.check.check(&config,)?;
            compiled.push(config,);
        }

        Ok(compiled,)
    }
}

/// Compiles `specs` without an extra consistency hook.
///
/// # Errors
///
/// See [`Compiler::compile`].
///
/// # Examples
///
/// ```
/// use cloudwatching::{RawExportSpec, StatDefault, compile};
///
/// let spec = RawExportSpec {
///     namespace: "AWS/EC2".to_owned(),
///     stat_default: "Zero".to_owned(),
///     ..RawExportSpec::default()
/// };
/// let exports = compile(&[spec],)?;
/// assert_eq!(exports[0].stat_default, StatDefault::Zero);
/// # Ok::<(), cloudwatching::Error>(())
/// ```
pub fn compile(specs: &[RawExportSpec],) -> Result<Vec<ExportConfig,>, Error,>
{
    Compiler::<NoCheck,>::default().compile(specs,)
}

fn compile_entry(spec: &RawExportSpec,) -> Result<ExportConfig, Error,>
{
    if !spec.tag_select.is_empty() && !spec.missing_tag_select_keys().is_empty() {
        return Err(Error::validation(format!(
            "{RESOURCE_TYPE_SELECTION} and {RESOURCE_ID_DIMENSION} are required with tag_select \
             (namespace '{}', metric '{}')",
            spec.namespace, spec.name
        ),),);
    }

    let stat_default = StatDefault::resolve(&spec.stat_default,)?;
    let dimensions_match = compile_patterns("dimensionsMatch", &spec.dimensions_match,)?;
    let dimensions_no_match = compile_patterns("dimensionsNoMatch", &spec.dimensions_no_match,)?;

    Ok(ExportConfig {
        namespace: spec.namespace.clone(),
        name: spec.name.clone(),
        dimensions: spec.dimensions.clone(),
        statistics: spec.statistics.clone(),
        tag_select: spec.tag_select.clone(),
        dimensions_match,
        dimensions_no_match,
        stat_default,
    },)
}

/// Fully validated configuration document.
#[derive(Debug, Clone, PartialEq,)]
pub struct CompiledConfiguration
{
    /// Region the exporter operates in.
    pub region:        String,
    /// Whether verbose logging was requested.
    pub debug:         bool,
    /// Upper bound on tagging pages fetched per namespace.
    pub max_tag_pages: usize,
    /// Compiled exports in document order.
    pub exports:       Vec<ExportConfig,>,
}

/// Loads and compiles the configuration document at `path`.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read, plus every error
/// reported by [`parse_configuration`].
pub fn load_configuration(path: &Path,) -> Result<CompiledConfiguration, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
    parse_configuration(&contents,)
}

/// Parses and compiles a configuration document held in memory.
///
/// # Errors
///
/// Returns [`Error::Parse`] when the YAML cannot be decoded,
/// [`Error::Validation`] when `region` is blank or `max_tag_pages` is zero,
/// and every error reported by [`compile`].
pub fn parse_configuration(contents: &str,) -> Result<CompiledConfiguration, Error,>
{
    let document: ConfigDocument = serde_yaml::from_str(contents,)?;
    compile_document(&document,)
}

/// Compiles an already deserialized document.
///
/// # Errors
///
/// See [`parse_configuration`].
pub fn compile_document(document: &ConfigDocument,) -> Result<CompiledConfiguration, Error,>
{
    let region = document.region.trim();
    if region.is_empty() {
        return Err(Error::validation("region cannot be empty",),);
    }

    let max_tag_pages = document.max_tag_pages.unwrap_or(DEFAULT_MAX_PAGES,);
    if max_tag_pages == 0 {
        return Err(Error::validation("max_tag_pages must be at least 1",),);
    }

    let exports = compile(&document.export_configs,)?;
    info!("Compiled {} export configurations for {}", exports.len(), region);

    Ok(CompiledConfiguration {
        region: region.to_owned(),
        debug: document.debug,
        max_tag_pages,
        exports,
    },)
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::tempdir;

    use super::{
        Compiler, Error, ExportConfig, TaggableNamespaceCheck, compile, load_configuration,
        parse_configuration,
    };
    use crate::{config::RawExportSpec, resolver::StatDefault};

    fn ec2_spec() -> RawExportSpec
    {
        RawExportSpec {
            namespace: "AWS/EC2".to_owned(),
            name: "CPUUtilization".to_owned(),
            dimensions: vec!["InstanceId".to_owned()],
            statistics: vec!["Average".to_owned(), "Maximum".to_owned()],
            ..RawExportSpec::default()
        }
    }

    fn tag_select(yaml: &str,) -> crate::config::TagSelect
    {
        serde_yaml::from_str(yaml,).expect("expected tag_select mapping",)
    }

    #[test]
    fn compiles_stat_default_with_empty_filters()
    {
        let spec = RawExportSpec {
            namespace: "AWS/EC2".to_owned(),
            stat_default: "Zero".to_owned(),
            ..RawExportSpec::default()
        };

        let exports = compile(&[spec],).expect("expected compilation success",);
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].namespace, "AWS/EC2");
        assert_eq!(exports[0].stat_default, StatDefault::Zero);
        assert!(exports[0].dimensions_match.is_empty());
        assert!(exports[0].dimensions_no_match.is_empty());
        assert!(!exports[0].uses_tag_select());
    }

    #[test]
    fn copies_pass_through_fields_verbatim()
    {
        let mut spec = ec2_spec();
        spec.tag_select = tag_select(
            "{resource_type_selection: 'ec2:instance', resource_id_dimension: InstanceId, \
             tag_selections: {env: [prod]}}",
        );

        let exports = compile(&[spec.clone()],).expect("expected compilation success",);
        let export = &exports[0];
        assert_eq!(export.name, spec.name);
        assert_eq!(export.dimensions, spec.dimensions);
        assert_eq!(export.statistics, spec.statistics);
        assert_eq!(export.tag_select, spec.tag_select);
        assert_eq!(export.stat_default, StatDefault::Unset);
    }

    #[test]
    fn rejects_tag_select_without_required_keys()
    {
        let spec = RawExportSpec {
            tag_select: tag_select("{other_key: 1}",),
            ..RawExportSpec::default()
        };

        let error = compile(&[spec],).expect_err("expected validation error",);
        match error {
            Error::Validation {
                message,
            } => {
                assert!(message.contains("resource_type_selection"));
                assert!(message.contains("resource_id_dimension"));
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn rejects_tag_select_with_only_one_required_key()
    {
        let mut spec = ec2_spec();
        spec.tag_select = tag_select("{resource_type_selection: 'ec2:instance'}",);

        let error = compile(&[spec],).expect_err("expected validation error",);
        assert!(matches!(error, Error::Validation { .. }));
    }

    #[test]
    fn rejects_tag_select_with_null_required_key()
    {
        let mut spec = ec2_spec();
        spec.tag_select =
            tag_select("{resource_type_selection: 'ec2:instance', resource_id_dimension: null}",);

        let error = compile(&[spec],).expect_err("expected validation error",);
        assert!(matches!(error, Error::Validation { .. }));
    }

    #[test]
    fn rejects_unknown_stat_default()
    {
        let mut spec = ec2_spec();
        spec.stat_default = "Average".to_owned();

        let error = compile(&[spec],).expect_err("expected invalid enum error",);
        assert!(matches!(error, Error::InvalidEnum { ref value } if value == "Average"));
        assert!(error.to_string().contains("Prior, Zero, or NaN"));
    }

    #[test]
    fn rejects_malformed_no_match_pattern()
    {
        let mut spec = ec2_spec();
        spec.dimensions_match.insert("InstanceId".to_owned(), "^i-".to_owned(),);
        spec.dimensions_no_match.insert("InstanceType".to_owned(), "t2.(micro".to_owned(),);

        let error = compile(&[spec],).expect_err("expected pattern error",);
        match error {
            Error::PatternCompile {
                field,
                dimension,
                ..
            } => {
                assert_eq!(field, "dimensionsNoMatch");
                assert_eq!(dimension, "InstanceType");
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn stops_at_first_failing_entry()
    {
        let mut invalid = ec2_spec();
        invalid.stat_default = "Never".to_owned();
        let mut also_invalid = ec2_spec();
        also_invalid.dimensions_match.insert("InstanceId".to_owned(), "[".to_owned(),);

        let error = compile(&[ec2_spec(), invalid, also_invalid],)
            .expect_err("expected the second entry to fail",);
        assert!(matches!(error, Error::InvalidEnum { .. }));
    }

    #[test]
    fn preserves_input_order_and_length()
    {
        let mut lambda = ec2_spec();
        lambda.namespace = "AWS/Lambda".to_owned();
        lambda.name = "Errors".to_owned();
        let mut sqs = ec2_spec();
        sqs.namespace = "AWS/SQS".to_owned();
        sqs.name = "NumberOfMessagesSent".to_owned();

        let exports = compile(&[ec2_spec(), lambda, sqs],).expect("expected compilation",);
        let names: Vec<&str,> = exports.iter().map(|export| export.name.as_str(),).collect();
        assert_eq!(names, ["CPUUtilization", "Errors", "NumberOfMessagesSent"]);
    }

    #[test]
    fn compiling_twice_yields_equal_configurations()
    {
        let mut spec = ec2_spec();
        spec.stat_default = "NaN".to_owned();
        spec.dimensions_match.insert("InstanceId".to_owned(), "^i-[0-9a-f]{8}".to_owned(),);
        spec.dimensions_no_match.insert("InstanceId".to_owned(), "i-deadbeef".to_owned(),);
        let specs = [spec, ec2_spec(),];

        let first = compile(&specs,).expect("first compilation",);
        let second = compile(&specs,).expect("second compilation",);
        assert_eq!(first, second);
    }

    fn custom_namespace_with_tag_select() -> RawExportSpec
    {
        RawExportSpec {
            namespace: "Custom/App".to_owned(),
            name: "Latency".to_owned(),
            tag_select: tag_select(
                "{resource_type_selection: 'ec2:instance', resource_id_dimension: InstanceId}",
            ),
            ..RawExportSpec::default()
        }
    }

    #[test]
    fn default_compile_accepts_tag_select_on_unmapped_namespace()
    {
        let exports = compile(&[custom_namespace_with_tag_select(), ec2_spec()],)
            .expect("expected compilation success",);

        assert_eq!(exports.len(), 2);
        assert_eq!(exports[0].namespace, "Custom/App");
        assert!(exports[0].uses_tag_select());
    }

    #[test]
    fn taggable_namespace_check_rejects_tag_select_on_unmapped_namespace()
    {
        let compiler = Compiler::with_check(TaggableNamespaceCheck,);

        let error = compiler
            .compile(&[custom_namespace_with_tag_select()],)
            .expect_err("expected namespace validation error",);
        match error {
            Error::Validation {
                message,
            } => assert!(message.contains("Custom/App")),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn taggable_namespace_check_allows_unmapped_namespace_without_tag_select()
    {
        let spec = RawExportSpec {
            namespace: "AWS/ASG".to_owned(),
            ..RawExportSpec::default()
        };

        assert!(Compiler::with_check(TaggableNamespaceCheck,).compile(&[spec],).is_ok());
    }

    #[test]
    fn custom_check_failure_is_terminal()
    {
        let compiler = Compiler::with_check(|config: &ExportConfig| {
            if config.statistics.is_empty() {
                return Err(Error::validation(format!("{} has no statistics", config.name),),);
            }
            Ok((),)
        },);

        let mut without_statistics = ec2_spec();
        without_statistics.statistics.clear();

        let error = compiler
            .compile(&[ec2_spec(), without_statistics],)
            .expect_err("expected hook failure",);
        match error {
            Error::Validation {
                message,
            } => assert_eq!(message, "CPUUtilization has no statistics"),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn parses_document_with_defaults()
    {
        let yaml = r#"
region: us-east-1
export_configs:
  - namespace: AWS/RDS
    name: FreeStorageSpace
    dimensions: [DBInstanceIdentifier]
    statistics: [Minimum]
    StatDefault: Prior
"#;

        let compiled = parse_configuration(yaml,).expect("expected document to compile",);
        assert_eq!(compiled.region, "us-east-1");
        assert!(!compiled.debug);
        assert_eq!(compiled.max_tag_pages, 100);
        assert_eq!(compiled.exports[0].stat_default, StatDefault::Prior);
    }

    #[test]
    fn rejects_blank_region()
    {
        let error = parse_configuration("region: '  '\nexport_configs: []\n",)
            .expect_err("expected region validation",);
        assert!(matches!(error, Error::Validation { ref message } if message.contains("region")));
    }

    #[test]
    fn rejects_zero_page_bound()
    {
        let error = parse_configuration("region: us-east-1\nmax_tag_pages: 0\n",)
            .expect_err("expected page bound validation",);
        assert!(
            matches!(error, Error::Validation { ref message } if message.contains("max_tag_pages"))
        );
    }

    #[test]
    fn rejects_malformed_yaml()
    {
        let error = parse_configuration("region: [unterminated",).expect_err("expected parse error",);
        assert!(matches!(error, Error::Parse { .. }));
    }

    #[test]
    fn loads_document_from_disk()
    {
        let temp = tempdir().expect("failed to create tempdir",);
        let path = temp.path().join("cloudwatching.yaml",);
        fs::write(
            &path,
            "Region: ap-southeast-1\nDebug: true\nmax_tag_pages: 3\nExportConfigs:\n  - \
             namespace: AWS/DynamoDB\n    name: ConsumedReadCapacityUnits\n",
        )
        .expect("failed to write config",);

        let compiled = load_configuration(&path,).expect("expected document to load",);
        assert_eq!(compiled.region, "ap-southeast-1");
        assert!(compiled.debug);
        assert_eq!(compiled.max_tag_pages, 3);
        assert_eq!(compiled.exports.len(), 1);
    }

    #[test]
    fn reports_missing_file_as_io_error()
    {
        let temp = tempdir().expect("failed to create tempdir",);
        let path = temp.path().join("missing.yaml",);

        let error = load_configuration(&path,).expect_err("expected io error",);
        assert!(matches!(error, Error::Io { .. }));
    }
}
