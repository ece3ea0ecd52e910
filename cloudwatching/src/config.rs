//! Configuration document types describing metric exports.
//!
//! The types in this module mirror the structure of the YAML documents
//! consumed by the exporter. They stay loosely typed on purpose: patterns
//! are plain strings, the default-statistic policy is a free string and
//! `tag_select` is an opaque mapping. The compiler turns them into
//! [`ExportConfig`](crate::ExportConfig) values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `tag_select` key naming the resource types whose tags drive selection.
pub const RESOURCE_TYPE_SELECTION: &str = "resource_type_selection";
/// `tag_select` key naming the metric dimension holding the resource id.
pub const RESOURCE_ID_DIMENSION: &str = "resource_id_dimension";

/// Free-form tag selection criteria passed through to the export pipeline.
pub type TagSelect = BTreeMap<String, serde_yaml::Value,>;

/// Root configuration document.
///
/// Field names accept both the snake_case spelling and the historic
/// capitalized spelling (`Region`, `Debug`, `ExportConfigs`).
///
/// # Examples
///
/// ```
/// use cloudwatching::ConfigDocument;
///
/// let yaml = r#"
/// region: us-east-1
/// export_configs:
///   - namespace: AWS/EC2
///     name: CPUUtilization
///     dimensions: [InstanceId]
///     statistics: [Average]
/// "#;
/// let document: ConfigDocument = serde_yaml::from_str(yaml,).expect("valid configuration",);
/// assert_eq!(document.export_configs.len(), 1);
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, Default,)]
pub struct ConfigDocument
{
    /// Region the exporter and the tagging session operate in.
    #[serde(default, alias = "Region")]
    pub region: String,

    /// Enables verbose logging in the binary.
    #[serde(default, alias = "Debug")]
    pub debug: bool,

    /// Ordered export specifications.
    #[serde(default, alias = "ExportConfigs", alias = "exportConfigs")]
    pub export_configs: Vec<RawExportSpec,>,

    /// Optional upper bound on tagging pages fetched per namespace.
    #[serde(default, alias = "MaxTagPages", alias = "maxTagPages")]
    pub max_tag_pages: Option<usize,>,
}

/// Raw export entry describing one metric series before validation.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq,)]
pub struct RawExportSpec
{
    /// Metric namespace, for example `AWS/EC2`.
    #[serde(default, alias = "Namespace")]
    pub namespace: String,

    /// Metric name within the namespace.
    #[serde(default, alias = "Name")]
    pub name: String,

    /// Dimension names the series is keyed on.
    #[serde(default, alias = "Dimensions")]
    pub dimensions: Vec<String,>,

    /// Statistics to collect, for example `Average` or `Sum`.
    #[serde(default, alias = "Statistics")]
    pub statistics: Vec<String,>,

    /// Tag selection criteria. When non-empty it must contain
    /// [`RESOURCE_TYPE_SELECTION`] and [`RESOURCE_ID_DIMENSION`].
    #[serde(default, alias = "TagSelect")]
    pub tag_select: TagSelect,

    /// Dimension name to inclusion pattern.
    #[serde(default, rename = "dimensionsMatch", alias = "dimensions_match")]
    pub dimensions_match: BTreeMap<String, String,>,

    /// Dimension name to exclusion pattern.
    #[serde(default, rename = "dimensionsNoMatch", alias = "dimensions_no_match")]
    pub dimensions_no_match: BTreeMap<String, String,>,

    /// Policy name for missing datapoints: `Prior`, `Zero`, `NaN` or empty.
    #[serde(default, rename = "StatDefault", alias = "stat_default", alias = "statDefault")]
    pub stat_default: String,
}

impl RawExportSpec
{
    /// Returns the keys among [`RESOURCE_TYPE_SELECTION`] and
    /// [`RESOURCE_ID_DIMENSION`] that are absent or null in `tag_select`.
    pub fn missing_tag_select_keys(&self,) -> Vec<&'static str,>
    {
        [RESOURCE_TYPE_SELECTION, RESOURCE_ID_DIMENSION,]
            .into_iter()
            .filter(|key| self.tag_select.get(*key,).is_none_or(serde_yaml::Value::is_null,),)
            .collect()
    }
}
