//! Sparse, partially populated descriptor layers.
//!
//! Each configuration source (command line, file, environment) produces a
//! [`RawDescriptor`] in which every scalar is optional. Only explicitly set
//! values are `Some`; merging and defaulting happen later.
//!
//! File keys are matched after folding (lowercase, `_` and `-` removed), so
//! the serde names below are the folded forms.

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::BTreeMap;

use super::spec::VariableMap;

/// One configuration layer.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawDescriptor {
    /// `app` section.
    pub app: RawApp,
    /// `aws` section.
    pub aws: RawProvider,
    /// `lambda` section.
    pub lambda: RawCompute,
    /// `api` section.
    pub api: RawGateway,
}

/// Sparse `app` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawApp {
    /// Application name.
    #[serde(deserialize_with = "scalar_string")]
    pub name: Option<String>,
    /// Keep intermediate build files.
    #[serde(rename = "keepbuildfiles")]
    pub keep_build_files: Option<bool>,
    /// Build artifact file name.
    #[serde(rename = "buildfilename", deserialize_with = "scalar_string")]
    pub build_file_name: Option<String>,
}

/// Sparse `aws` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawProvider {
    /// Region.
    #[serde(deserialize_with = "scalar_string")]
    pub region: Option<String>,
    /// Credentials profile.
    #[serde(deserialize_with = "scalar_string")]
    pub profile: Option<String>,
    /// Access key id.
    #[serde(rename = "accesskeyid", deserialize_with = "scalar_string")]
    pub access_key_id: Option<String>,
    /// Secret access key.
    #[serde(rename = "secretaccesskey", deserialize_with = "scalar_string")]
    pub secret_access_key: Option<String>,
}

/// Sparse `lambda` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawCompute {
    /// Stdio wrapper script.
    #[serde(deserialize_with = "scalar_string")]
    pub wrapper: Option<String>,
    /// Runtime identifier.
    #[serde(deserialize_with = "scalar_string")]
    pub runtime: Option<String>,
    /// Handler entry point.
    #[serde(deserialize_with = "scalar_string")]
    pub handler: Option<String>,
    /// Function name.
    #[serde(rename = "functionname", deserialize_with = "scalar_string")]
    pub function_name: Option<String>,
    /// Alias name.
    #[serde(deserialize_with = "scalar_string")]
    pub alias: Option<String>,
    /// Description.
    #[serde(deserialize_with = "scalar_string")]
    pub description: Option<String>,
    /// Memory size in MB.
    #[serde(rename = "memorysize")]
    pub memory_size: Option<u32>,
    /// Execution role.
    #[serde(deserialize_with = "scalar_string")]
    pub role: Option<String>,
    /// Timeout in seconds.
    pub timeout: Option<u32>,
    /// Source artifact location.
    #[serde(rename = "sourcezip", deserialize_with = "scalar_string")]
    pub source_zip: Option<String>,
    /// Environment variables, merged key by key.
    #[serde(rename = "environmentvariables", deserialize_with = "variable_map")]
    pub environment_variables: VariableMap,
    /// KMS key ARN.
    #[serde(rename = "kmskeyarn", deserialize_with = "scalar_string")]
    pub kms_key_arn: Option<String>,
    /// VPC placement.
    pub vpc: RawNetwork,
    /// Trace mode.
    #[serde(rename = "tracemode", deserialize_with = "scalar_string")]
    pub trace_mode: Option<String>,
}

/// Sparse `lambda.vpc` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawNetwork {
    /// Security group ids.
    #[serde(rename = "securitygroups", deserialize_with = "string_list")]
    pub security_groups: Option<Vec<String>>,
    /// Subnet ids.
    #[serde(deserialize_with = "string_list")]
    pub subnets: Option<Vec<String>>,
}

/// Sparse `api` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawGateway {
    /// REST API name.
    #[serde(deserialize_with = "scalar_string")]
    pub name: Option<String>,
    /// REST API description.
    #[serde(deserialize_with = "scalar_string")]
    pub description: Option<String>,
    /// Gateway cache flag.
    pub cache: Option<bool>,
    /// Gateway cache size class.
    #[serde(rename = "cachesize", deserialize_with = "scalar_string")]
    pub cache_size: Option<String>,
    /// Stages, merged key by key.
    pub stages: BTreeMap<String, RawStage>,
    /// Binary media types.
    #[serde(rename = "binarymediatypes", deserialize_with = "string_list")]
    pub binary_media_types: Option<Vec<String>>,
}

/// Sparse stage entry.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawStage {
    /// Stage name as written; replaced by the map key during normalization.
    #[serde(deserialize_with = "scalar_string")]
    pub name: Option<String>,
    /// Description.
    #[serde(deserialize_with = "scalar_string")]
    pub description: Option<String>,
    /// Stage variables, merged key by key.
    #[serde(deserialize_with = "variable_map")]
    pub variables: VariableMap,
    /// Stage cache flag.
    pub cache: Option<bool>,
    /// Stage cache size class.
    #[serde(rename = "cachesize", deserialize_with = "scalar_string")]
    pub cache_size: Option<String>,
}

/// Renders a YAML scalar as a string; `None` for null.
fn scalar_to_string(value: Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Tagged(tagged) => scalar_to_string(tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => Err(String::from("expected a scalar value")),
    }
}

/// Accepts any scalar (`cacheSize: 0.5` is a float in YAML) as a string.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    scalar_to_string(value).map_err(serde::de::Error::custom)
}

/// Accepts a sequence of scalars or a single comma-separated scalar.
fn string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Sequence(items) => items
            .into_iter()
            .filter_map(|item| scalar_to_string(item).transpose())
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        other => scalar_to_string(other)
            .map(|s| s.map(|s| split_list(&s)))
            .map_err(serde::de::Error::custom),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Reads a name-to-value map whose values may be null.
fn variable_map<'de, D>(deserializer: D) -> Result<VariableMap, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    entries
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| {
            scalar_to_string(value)
                .map(|v| (name.clone(), v))
                .map_err(|e| serde::de::Error::custom(format!("variable '{name}': {e}")))
        })
        .collect()
}
