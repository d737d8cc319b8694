//! Configuration source loading.
//!
//! This module reads the optional configuration file and the environment
//! into sparse [`RawDescriptor`] layers. A missing file is not an error since
//! the baseline covers every field; a file that exists but does not parse is.

use crate::error::{ConfigError, Result};
use figment::providers::{Env, Serialized};
use figment::value::Uncased;
use figment::Figment;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::merge::coalesce_stages;
use super::raw::RawDescriptor;

/// Default configuration file base name.
pub const DEFAULT_CONFIG_NAME: &str = "aegis";

/// Extensions tried after the base name, in order.
pub const CONFIG_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Prefix of environment variables read as configuration.
pub const ENV_PREFIX: &str = "AEGIS_";

/// Keys whose children are user-chosen names and keep their spelling.
const VERBATIM_KEYS: &[&str] = &["environmentvariables", "variables"];

/// Stage fields settable through `AEGIS_API_STAGES_<STAGE>_<FIELD>`.
const STAGE_FIELDS: &[&str] = &["name", "description", "cache", "cachesize"];

/// Separator between a stage name and its variable name in the environment.
const STAGE_VARIABLES: &str = "_VARIABLES_";

/// Keys that hold nested sections; a null value means an empty section.
const SECTION_KEYS: &[&str] = &[
    "app",
    "aws",
    "lambda",
    "api",
    "vpc",
    "stages",
    "environmentvariables",
    "variables",
];

/// A snapshot of environment variables.
pub type EnvSnapshot = Vec<(String, String)>;

/// Layers read from the file and the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedSources {
    /// Values from the configuration file (empty if none was found).
    pub file: RawDescriptor,
    /// Values from `AEGIS_*` environment variables.
    pub env: RawDescriptor,
    /// The configuration file that was read, if any.
    pub config_file: Option<PathBuf>,
}

/// Loader for configuration files and environment layers.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Directory searched for the configuration and `.env` files.
    base_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Creates a loader searching the current directory.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory searched for configuration files.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    fn base_dir(&self) -> &Path {
        self.base_path.as_deref().unwrap_or_else(|| Path::new("."))
    }

    /// Loads the file layer and the environment layer.
    ///
    /// With `env` set, only those variables are read. Otherwise the
    /// environment layer is `.env` with the process environment over it.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the configuration file exists but is
    /// malformed, or if an `AEGIS_*` variable holds an unusable value.
    pub fn load(&self, config_name: &str, env: Option<&[(String, String)]>) -> Result<LoadedSources> {
        let config_file = find_config_file(self.base_dir(), config_name);

        let file = match &config_file {
            Some(path) => self.load_file(path)?,
            None => {
                debug!("No configuration file '{config_name}' found, using defaults");
                RawDescriptor::default()
            }
        };

        let env = match env {
            Some(vars) => parse_env(vars)?,
            None => self.load_env()?,
        };

        Ok(LoadedSources {
            file,
            env,
            config_file,
        })
    }

    /// Loads the environment layer from `.env` and the process environment.
    ///
    /// Process variables win over `.env` entries. The process environment is
    /// not modified.
    ///
    /// # Errors
    ///
    /// Returns an error if `.env` cannot be parsed or a variable holds an
    /// unusable value.
    pub fn load_env(&self) -> Result<RawDescriptor> {
        let dotenv = self.read_dotenv()?;
        extract_env(snapshot_figment(&dotenv).merge(process_env()))
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<RawDescriptor> {
        let path = path.as_ref();
        info!("Using config file: {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::parse(format!("Failed to read file: {e}"), path.display().to_string())
        })?;

        self.parse_document(&content, Some(path))
    }

    /// Parses a configuration document (YAML, or JSON as a YAML subset).
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or a value has the
    /// wrong type.
    pub fn parse_document(&self, content: &str, source: Option<&Path>) -> Result<RawDescriptor> {
        debug!("Parsing configuration document");
        let location = || source.map(|p| p.display().to_string());

        let document: Value = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: format!("YAML parse error: {e}"),
            location: location(),
        })?;

        if document.is_null() {
            return Ok(RawDescriptor::default());
        }

        let raw: RawDescriptor =
            serde_yaml::from_value(fold_keys(document)).map_err(|e| ConfigError::ParseError {
                message: format!("Invalid configuration value: {e}"),
                location: location(),
            })?;

        debug!("Parsed {} stage(s) from configuration", raw.api.stages.len());
        Ok(raw)
    }

    /// Reads the `.env` file in the base directory, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the `.env` file exists but cannot be parsed.
    pub fn read_dotenv(&self) -> Result<EnvSnapshot> {
        let env_path = self.base_dir().join(".env");

        if !env_path.exists() {
            debug!(".env file not found at: {}", env_path.display());
            return Ok(Vec::new());
        }

        info!("Loading environment from: {}", env_path.display());
        let dotenv_error = |e: dotenvy::Error| {
            ConfigError::parse(
                format!("Failed to load .env file: {e}"),
                env_path.display().to_string(),
            )
        };

        dotenvy::from_path_iter(&env_path)
            .map_err(dotenv_error)?
            .map(|item| item.map_err(dotenv_error))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

/// Finds the configuration file for a base name.
///
/// `name` is tried as a path first (relative to `dir` unless absolute), then
/// with each of [`CONFIG_EXTENSIONS`] appended. Parent directories are not
/// searched.
#[must_use]
pub fn find_config_file(dir: impl AsRef<Path>, name: &str) -> Option<PathBuf> {
    let dir = dir.as_ref();

    let direct = dir.join(name);
    if direct.is_file() {
        return Some(direct);
    }

    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|candidate| candidate.is_file())
}

/// Folds a key for case- and separator-insensitive matching.
#[must_use]
pub fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Folds structural keys throughout a document, leaving user-chosen names
/// (variable names, stage names) untouched.
fn fold_keys(value: Value) -> Value {
    let map = match value {
        Value::Mapping(map) => map,
        other => return other,
    };

    let folded: Mapping = map
        .into_iter()
        .map(|(key, child)| {
            let name = match key {
                Value::String(name) => fold_key(&name),
                other => return (other, child),
            };
            let child = if child.is_null() && SECTION_KEYS.contains(&name.as_str()) {
                Value::Mapping(Mapping::new())
            } else if VERBATIM_KEYS.contains(&name.as_str()) {
                child
            } else if name == "stages" {
                fold_stage_map(child)
            } else {
                fold_keys(child)
            };
            (Value::String(name), child)
        })
        .collect();

    Value::Mapping(folded)
}

/// Keeps stage names verbatim while folding the keys inside each stage.
fn fold_stage_map(value: Value) -> Value {
    let stages = match value {
        Value::Mapping(stages) => stages,
        other => return other,
    };

    Value::Mapping(
        stages
            .into_iter()
            .map(|(name, stage)| {
                let stage = if stage.is_null() {
                    Value::Mapping(Mapping::new())
                } else {
                    fold_keys(stage)
                };
                (name, stage)
            })
            .collect(),
    )
}

/// Builds the environment layer from a fixed set of variables.
///
/// Names are matched case-insensitively against the folded configuration
/// keys: `AEGIS_LAMBDA_MEMORYSIZE` sets `lambda.memorySize`. Map entries
/// keep the spelling of their name segment.
///
/// # Errors
///
/// Returns a parse error naming the variable if a value cannot be converted.
pub fn parse_env(env: &[(String, String)]) -> Result<RawDescriptor> {
    extract_env(snapshot_figment(env))
}

/// Provider for `AEGIS_*` variables of the running process.
#[must_use]
pub fn process_env() -> Env {
    Env::prefixed(ENV_PREFIX)
        .lowercase(false)
        .filter_map(|key| env_key_path(key.as_str()).map(Uncased::from))
}

/// Places each recognized variable at its key path.
fn snapshot_figment(env: &[(String, String)]) -> Figment {
    env.iter()
        .filter_map(|(name, value)| {
            let path = strip_prefix_ignore_case(name, ENV_PREFIX).and_then(env_key_path)?;
            Some((path, value))
        })
        .fold(Figment::new(), |figment, (path, value)| {
            let value: figment::value::Value = value.parse().unwrap_or_else(|never| match never {});
            figment.merge(Serialized::default(&path, value))
        })
}

fn extract_env(figment: Figment) -> Result<RawDescriptor> {
    let mut raw: RawDescriptor = figment.extract().map_err(|e| {
        let location = format!(
            "environment variable {ENV_PREFIX}{}",
            e.path.join("_").to_ascii_uppercase()
        );
        ConfigError::parse(format!("Invalid environment value: {e}"), location)
    })?;

    raw.api.stages = coalesce_stages(std::mem::take(&mut raw.api.stages));
    debug!("Read {} stage(s) from environment", raw.api.stages.len());
    Ok(raw)
}

/// Maps a variable name (prefix removed) to a configuration key path.
///
/// Returns `None` for names that address no configuration key.
fn env_key_path(name: &str) -> Option<String> {
    if name.contains('.') {
        return None;
    }
    let (section, key) = name.split_once('_')?;
    let section = fold_key(section);

    match section.as_str() {
        "app" | "aws" => Some(format!("{section}.{}", fold_key(key))),
        "lambda" => Some(lambda_key_path(key)),
        "api" => api_key_path(key),
        _ => None,
    }
}

fn lambda_key_path(key: &str) -> String {
    if let Some(var) = strip_prefix_ignore_case(key, "ENVIRONMENTVARIABLES_") {
        return format!("lambda.environmentvariables.{var}");
    }

    let field = fold_key(key);
    match field.strip_prefix("vpc") {
        Some(list @ ("securitygroups" | "subnets")) => format!("lambda.vpc.{list}"),
        _ => format!("lambda.{field}"),
    }
}

/// Handles `<FIELD>`, `STAGES_<STAGE>_<FIELD>` and
/// `STAGES_<STAGE>_VARIABLES_<NAME>`.
fn api_key_path(key: &str) -> Option<String> {
    let Some(rest) = strip_prefix_ignore_case(key, "STAGES_") else {
        return Some(format!("api.{}", fold_key(key)));
    };

    if let Some(pos) = rest.to_ascii_uppercase().find(STAGE_VARIABLES) {
        let stage = &rest[..pos];
        let var = &rest[pos + STAGE_VARIABLES.len()..];
        return (!stage.is_empty() && !var.is_empty())
            .then(|| format!("api.stages.{stage}.variables.{var}"));
    }

    let (stage, field) = rest.rsplit_once('_')?;
    let field = fold_key(field);
    (!stage.is_empty() && STAGE_FIELDS.contains(&field.as_str()))
        .then(|| format!("api.stages.{stage}.{field}"))
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}
