//! End-to-end configuration resolution.
//!
//! Resolution runs once per invocation: load the file and environment
//! layers, merge them under the command-line overrides, fill the rest from
//! the baseline, normalize stages and validate. The result is either a
//! complete, valid descriptor or an error; nothing partial escapes.

use crate::error::{ConfigError, Result};
use std::path::PathBuf;
use tracing::{debug, info};

use super::defaults::baseline;
use super::merge::{merge_layers, resolve};
use super::naming::function_name_from_cwd;
use super::parser::{ConfigLoader, DEFAULT_CONFIG_NAME, EnvSnapshot};
use super::raw::RawDescriptor;
use super::spec::DeploymentDescriptor;
use super::stages::normalize_stages;
use super::validator::ConfigValidator;

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// `--region`.
    pub region: Option<String>,
    /// `--keyId`.
    pub access_key_id: Option<String>,
    /// `--secretKey`.
    pub secret_access_key: Option<String>,
    /// `--profile`.
    pub profile: Option<String>,
}

/// A resolved, validated descriptor and where it came from.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The immutable descriptor for provisioning.
    pub descriptor: DeploymentDescriptor,
    /// The configuration file used, if one was found.
    pub config_file: Option<PathBuf>,
    /// Non-fatal validation findings.
    pub warnings: Vec<String>,
}

/// Builder for a single resolution pass.
#[derive(Debug)]
pub struct ConfigResolver {
    base_path: PathBuf,
    config_name: String,
    overrides: Overrides,
    env: Option<EnvSnapshot>,
    function_name: Option<String>,
    validator: ConfigValidator,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Overrides {
    /// Converts the flags into the highest-precedence layer.
    ///
    /// # Errors
    ///
    /// Returns an error if `--region` or `--profile` is given but empty.
    pub fn into_layer(self) -> Result<RawDescriptor> {
        for (flag, value) in [("region", &self.region), ("profile", &self.profile)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ConfigError::InvalidFlag {
                    flag: flag.to_string(),
                    message: String::from("value cannot be empty"),
                }
                .into());
            }
        }

        let mut layer = RawDescriptor::default();
        layer.aws.region = self.region;
        layer.aws.access_key_id = self.access_key_id;
        layer.aws.secret_access_key = self.secret_access_key;
        layer.aws.profile = self.profile;
        Ok(layer)
    }
}

impl ConfigResolver {
    /// Creates a resolver for `aegis.*` in the current directory, reading
    /// the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_path: PathBuf::from("."),
            config_name: String::from(DEFAULT_CONFIG_NAME),
            overrides: Overrides::default(),
            env: None,
            function_name: None,
            validator: ConfigValidator::new(),
        }
    }

    /// Sets the directory searched for the configuration and `.env` files.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = path.into();
        self
    }

    /// Sets the configuration file base name (or path).
    #[must_use]
    pub fn with_config_name(mut self, name: impl Into<String>) -> Self {
        self.config_name = name.into();
        self
    }

    /// Sets the command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Reads only these variables instead of `.env` plus the process
    /// environment.
    #[must_use]
    pub fn with_env(mut self, env: EnvSnapshot) -> Self {
        self.env = Some(env);
        self
    }

    /// Uses a fixed fallback function name instead of deriving one from the
    /// working directory.
    #[must_use]
    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    /// Resolves and validates the descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if a flag is unusable, a configuration source is
    /// malformed, or the resolved descriptor fails validation. Validation
    /// errors carry every violation found.
    pub fn resolve(&self) -> Result<Resolution> {
        if self.config_name.trim().is_empty() {
            return Err(ConfigError::InvalidFlag {
                flag: String::from("config"),
                message: String::from("configuration name cannot be empty"),
            }
            .into());
        }

        let cli = self.overrides.clone().into_layer()?;
        let loader = ConfigLoader::new().with_base_path(&self.base_path);

        let sources = loader.load(&self.config_name, self.env.as_deref())?;

        let merged = merge_layers(cli, sources.file, sources.env);

        let function_name = self
            .function_name
            .clone()
            .unwrap_or_else(function_name_from_cwd);
        let base = baseline(&function_name);

        let mut descriptor = resolve(merged, &base);
        normalize_stages(&mut descriptor.api.stages);
        debug!("Resolved stages: {}", descriptor.stage_names().join(", "));

        let report = self.validator.validate(&descriptor)?;
        info!(
            "Resolved configuration for function '{}' in {}",
            descriptor.lambda.function_name, descriptor.aws.region
        );

        Ok(Resolution {
            descriptor,
            config_file: sources.config_file,
            warnings: report.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ROLE: &str = "arn:aws:iam::123456789012:role/lambda_basic_execution";

    fn resolver(dir: &TempDir) -> ConfigResolver {
        ConfigResolver::new()
            .with_base_path(dir.path())
            .with_env(Vec::new())
            .with_function_name("aegis_fixture")
    }

    fn write_config(dir: &TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).expect("Failed to write config");
    }

    #[test]
    fn test_empty_inputs_resolve_to_baseline() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let resolution = resolver(&dir).resolve().unwrap();

        assert_eq!(resolution.descriptor, baseline("aegis_fixture"));
        assert!(resolution.config_file.is_none());
        assert_eq!(resolution.descriptor.stage_names(), vec!["prod"]);
    }

    #[test]
    fn test_cli_beats_file_and_env() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write_config(&dir, "aegis.yaml", "aws:\n  region: us-west-2\n  profile: file\n");

        let resolution = resolver(&dir)
            .with_env(vec![
                (String::from("AEGIS_AWS_REGION"), String::from("ap-south-1")),
                (String::from("AEGIS_AWS_PROFILE"), String::from("env")),
            ])
            .with_overrides(Overrides {
                region: Some(String::from("eu-west-1")),
                ..Overrides::default()
            })
            .resolve()
            .unwrap();

        assert_eq!(resolution.descriptor.aws.region, "eu-west-1");
        assert_eq!(resolution.descriptor.aws.profile, "file");
    }

    #[test]
    fn test_env_stage_override_keeps_file_stages() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write_config(
            &dir,
            "aegis.yaml",
            r"
lambda:
  role: arn:aws:iam::123456789012:role/lambda_basic_execution
api:
  stages:
    dev:
      description: development
    prod:
      name: production
      description: production stage
",
        );

        let resolution = resolver(&dir)
            .with_env(vec![
                (String::from("AEGIS_API_STAGES_prod_CACHE"), String::from("true")),
                (String::from("AEGIS_API_STAGES_prod_CACHESIZE"), String::from("1.6")),
            ])
            .resolve()
            .unwrap();

        let stages = &resolution.descriptor.api.stages;
        assert_eq!(stages.len(), 2);
        assert_eq!(stages["dev"].description, "development");
        assert_eq!(stages["prod"].name, "prod");
        assert!(stages["prod"].cache);
        assert_eq!(stages["prod"].cache_size, "1.6");
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_alternate_config_name() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write_config(&dir, "aegis.yaml", "lambda:\n  timeout: 5\n");
        write_config(&dir, "staging.yml", "lambda:\n  timeout: 30\n");

        let resolution = resolver(&dir).with_config_name("staging").resolve().unwrap();
        assert_eq!(resolution.descriptor.lambda.timeout, 30);
        assert_eq!(resolution.config_file, Some(dir.path().join("staging.yml")));
    }

    #[test]
    fn test_parse_error_aborts() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write_config(&dir, "aegis.yaml", "lambda: {memorySize: [");
        let err = resolver(&dir).resolve().unwrap_err();
        assert!(err.to_string().contains("Failed to parse configuration"));
    }

    #[test]
    fn test_validation_reports_all_violations() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write_config(
            &dir,
            "aegis.yaml",
            "lambda:\n  memorySize: 200\n  timeout: 0\n  traceMode: Sometimes\n",
        );

        let err = resolver(&dir).resolve().unwrap_err();
        let fields: Vec<&str> = err.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["lambda.memorySize", "lambda.timeout", "lambda.traceMode"]);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write_config(
            &dir,
            "aegis.yaml",
            &format!("lambda:\n  role: {ROLE}\napi:\n  stages:\n    a: {{}}\n    b: {{cache: true}}\n"),
        );

        let first = resolver(&dir).resolve().unwrap();
        let second = resolver(&dir).resolve().unwrap();
        assert_eq!(first.descriptor, second.descriptor);
    }

    #[test]
    fn test_empty_flags_rejected() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let err = resolver(&dir)
            .with_overrides(Overrides {
                profile: Some(String::new()),
                ..Overrides::default()
            })
            .resolve()
            .unwrap_err();
        assert!(err.to_string().contains("--profile"));

        let err = resolver(&dir).with_config_name(" ").resolve().unwrap_err();
        assert!(err.to_string().contains("--config"));
    }

    #[test]
    fn test_dotenv_is_read_when_no_snapshot_given() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(
            dir.path().join(".env"),
            "AEGIS_LAMBDA_FUNCTIONNAME=from_dotenv_fixture\n",
        )
        .expect("Failed to write .env");

        let resolution = ConfigResolver::new()
            .with_base_path(dir.path())
            .resolve()
            .unwrap();
        assert_eq!(resolution.descriptor.lambda.function_name, "from_dotenv_fixture");
    }

    #[test]
    fn test_uppercase_env_stage_overrides_file_stage() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write_config(
            &dir,
            "aegis.yaml",
            &format!(
                "lambda:\n  role: {ROLE}\napi:\n  stages:\n    prod:\n      description: live\n    dev: {{}}\n"
            ),
        );

        let resolution = resolver(&dir)
            .with_env(vec![
                (String::from("AEGIS_API_STAGES_PROD_CACHE"), String::from("true")),
                (String::from("AEGIS_API_STAGES_DEV_VARIABLES_tier"), String::from("free")),
            ])
            .resolve()
            .unwrap();

        let stages = &resolution.descriptor.api.stages;
        assert_eq!(resolution.descriptor.stage_names(), vec!["dev", "prod"]);
        assert!(stages["prod"].cache);
        assert_eq!(stages["prod"].description, "live");
        assert_eq!(stages["prod"].cache_size, "0.5");
        assert!(!stages["dev"].cache);
        assert_eq!(stages["dev"].variables.get("tier"), Some(&Some(String::from("free"))));
    }

    #[test]
    fn test_env_only_stage_override_keeps_default_stage_fields() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let resolution = resolver(&dir)
            .with_env(vec![(String::from("AEGIS_API_STAGES_prod_CACHE"), String::from("true"))])
            .resolve()
            .unwrap();

        let prod = &resolution.descriptor.api.stages["prod"];
        assert!(prod.cache);
        assert_eq!(prod.description, "production stage");
        assert_eq!(prod.cache_size, "0.5");
    }
}
