//! Validation of resolved descriptors against provider constraints.
//!
//! Every check runs regardless of earlier failures so that a single run
//! reports all problems. Any error blocks provisioning; warnings do not.

use crate::error::{ConfigError, Result};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use super::spec::{ComputeSettings, DeploymentDescriptor, DeploymentStage, GatewaySettings, ProviderSettings};
use super::stages::inert_cache_sizes;

/// Smallest memory size Lambda accepts, in MB.
pub const MIN_MEMORY_SIZE: u32 = 128;

/// Largest memory size Lambda accepts, in MB.
pub const MAX_MEMORY_SIZE: u32 = 3008;

/// Memory sizes must be a multiple of this, in MB.
pub const MEMORY_SIZE_STEP: u32 = 64;

/// Shortest allowed timeout, in seconds.
pub const MIN_TIMEOUT: u32 = 1;

/// Longest allowed timeout, in seconds.
pub const MAX_TIMEOUT: u32 = 900;

/// Runtimes Lambda accepts.
const KNOWN_RUNTIMES: &[&str] = &[
    "nodejs",
    "nodejs4.3",
    "nodejs4.3-edge",
    "nodejs6.10",
    "nodejs8.10",
    "java8",
    "python2.7",
    "python3.6",
    "dotnetcore1.0",
    "dotnetcore2.0",
    "go1.x",
];

/// X-Ray trace modes.
const TRACE_MODES: &[&str] = &["Active", "PassThrough"];

/// API Gateway cache cluster size classes, in GB.
const CACHE_SIZES: &[&str] = &["0.5", "1.6", "6.1", "13.5", "28.4", "58.2", "118", "237"];

/// Validator for resolved deployment descriptors.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Outcome of a successful validation.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Non-fatal issues worth surfacing.
    pub warnings: Vec<String>,
}

/// Outcome of the checks before it is turned into a result.
#[derive(Debug, Default)]
struct Findings {
    errors: Vec<ValidationError>,
    warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a resolved descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationFailed`] carrying every violation
    /// found if any check fails.
    pub fn validate(&self, descriptor: &DeploymentDescriptor) -> Result<ValidationReport> {
        let mut findings = Findings::default();

        Self::validate_provider(&descriptor.aws, &mut findings);
        Self::validate_compute(&descriptor.lambda, &mut findings);
        Self::validate_gateway(&descriptor.api, &mut findings);

        for warning in &findings.warnings {
            warn!("{warning}");
        }

        if findings.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(ValidationReport {
                warnings: findings.warnings,
            })
        } else {
            debug!("Configuration validation found {} error(s)", findings.errors.len());
            Err(ConfigError::ValidationFailed {
                errors: findings.errors,
            }
            .into())
        }
    }

    /// Validates region and credentials.
    fn validate_provider(aws: &ProviderSettings, findings: &mut Findings) {
        if aws.region.trim().is_empty() {
            findings.error("aws.region", "Region cannot be empty");
        }

        if aws.access_key_id.is_empty() != aws.secret_access_key.is_empty() {
            findings.error(
                "aws.accessKeyId",
                "Access key id and secret access key must be set together",
            );
        }
    }

    /// Validates Lambda function settings.
    fn validate_compute(lambda: &ComputeSettings, findings: &mut Findings) {
        if lambda.function_name.trim().is_empty() {
            findings.error("lambda.functionName", "Function name cannot be empty");
        }

        if !(MIN_MEMORY_SIZE..=MAX_MEMORY_SIZE).contains(&lambda.memory_size) {
            findings.error(
                "lambda.memorySize",
                format!(
                    "Memory size {} MB is outside the allowed range {MIN_MEMORY_SIZE}-{MAX_MEMORY_SIZE} MB",
                    lambda.memory_size
                ),
            );
        } else if lambda.memory_size % MEMORY_SIZE_STEP != 0 {
            findings.error(
                "lambda.memorySize",
                format!(
                    "Memory size {} MB must be a multiple of {MEMORY_SIZE_STEP} MB",
                    lambda.memory_size
                ),
            );
        }

        if !(MIN_TIMEOUT..=MAX_TIMEOUT).contains(&lambda.timeout) {
            findings.error(
                "lambda.timeout",
                format!(
                    "Timeout {}s is outside the allowed range {MIN_TIMEOUT}-{MAX_TIMEOUT}s",
                    lambda.timeout
                ),
            );
        }

        if !KNOWN_RUNTIMES.contains(&lambda.runtime.as_str()) {
            findings.error(
                "lambda.runtime",
                format!("Unknown runtime '{}'", lambda.runtime),
            );
        }

        if !TRACE_MODES.contains(&lambda.trace_mode.as_str()) {
            findings.error(
                "lambda.traceMode",
                format!(
                    "Trace mode '{}' is invalid. Expected one of: {}",
                    lambda.trace_mode,
                    TRACE_MODES.join(", ")
                ),
            );
        }

        if lambda.vpc.security_groups.is_empty() != lambda.vpc.subnets.is_empty() {
            findings.error(
                "lambda.vpc",
                "Security groups and subnets must be configured together",
            );
        }

        if lambda.role.is_empty() {
            findings
                .warnings
                .push(String::from("lambda.role: No execution role configured"));
        }
    }

    /// Validates API Gateway settings and stages.
    fn validate_gateway(api: &GatewaySettings, findings: &mut Findings) {
        if api.cache && !is_cache_size(&api.cache_size) {
            findings.error("api.cacheSize", invalid_cache_size_message(&api.cache_size));
        }

        if api.binary_media_types.is_empty() {
            findings.error("api.binaryMediaTypes", "At least one binary media type is required");
        }

        Self::validate_stages(&api.stages, findings);
    }

    /// Validates the normalized stage map.
    fn validate_stages(stages: &BTreeMap<String, DeploymentStage>, findings: &mut Findings) {
        if stages.is_empty() {
            findings.error("api.stages", "At least one stage is required");
            return;
        }

        let mut seen_names = HashSet::new();

        for (key, stage) in stages {
            let prefix = format!("api.stages.{key}");

            if stage.name.is_empty() {
                findings.error(format!("{prefix}.name"), "Stage name cannot be empty");
            } else if stage.name != *key {
                findings.error(
                    format!("{prefix}.name"),
                    format!("Stage name '{}' does not match its key '{key}'", stage.name),
                );
            } else if !is_valid_stage_name(&stage.name) {
                findings.error(
                    format!("{prefix}.name"),
                    format!(
                        "Stage name '{}' is invalid. Must contain only letters, digits, hyphens and underscores.",
                        stage.name
                    ),
                );
            }

            // Keys differing only by case share one AEGIS_API_STAGES_<STAGE> variable prefix.
            if !seen_names.insert(stage.name.to_ascii_lowercase()) {
                findings.error(
                    format!("{prefix}.name"),
                    format!("Duplicate stage name: {}", stage.name),
                );
            }

            if stage.cache && !is_cache_size(&stage.cache_size) {
                findings.error(
                    format!("{prefix}.cacheSize"),
                    invalid_cache_size_message(&stage.cache_size),
                );
            }
        }

        for key in inert_cache_sizes(stages) {
            findings.warnings.push(format!(
                "api.stages.{key}.cacheSize: Ignored because caching is disabled for this stage"
            ));
        }
    }
}

impl Findings {
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError::new(field, message));
    }
}

impl ValidationError {
    /// Creates a validation error for a field.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn is_cache_size(size: &str) -> bool {
    CACHE_SIZES.contains(&size)
}

fn invalid_cache_size_message(size: &str) -> String {
    format!(
        "Cache size '{size}' is invalid. Expected one of: {}",
        CACHE_SIZES.join(", ")
    )
}

/// Stage names may contain letters, digits, hyphens and underscores.
fn is_valid_stage_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::baseline;

    fn valid_descriptor() -> DeploymentDescriptor {
        let mut d = baseline("aegis_test");
        d.lambda.role = String::from("arn:aws:iam::123456789012:role/lambda_basic_execution");
        d
    }

    fn fields(descriptor: &DeploymentDescriptor) -> Vec<String> {
        match ConfigValidator::new().validate(descriptor) {
            Ok(_) => Vec::new(),
            Err(e) => e.violations().iter().map(|v| v.field.clone()).collect(),
        }
    }

    #[test]
    fn test_baseline_is_valid() {
        let report = ConfigValidator::new().validate(&valid_descriptor()).unwrap();
        assert_eq!(report.warnings.len(), 0);
    }

    #[test]
    fn test_memory_size_step() {
        let mut d = valid_descriptor();
        d.lambda.memory_size = 200;
        assert_eq!(fields(&d), vec!["lambda.memorySize"]);

        d.lambda.memory_size = 128;
        assert!(fields(&d).is_empty());

        d.lambda.memory_size = 3008;
        assert!(fields(&d).is_empty());
    }

    #[test]
    fn test_memory_size_range() {
        let mut d = valid_descriptor();
        d.lambda.memory_size = 64;
        assert_eq!(fields(&d), vec!["lambda.memorySize"]);
        d.lambda.memory_size = 3072;
        assert_eq!(fields(&d), vec!["lambda.memorySize"]);
    }

    #[test]
    fn test_timeout_range() {
        let mut d = valid_descriptor();
        d.lambda.timeout = 0;
        assert_eq!(fields(&d), vec!["lambda.timeout"]);
        d.lambda.timeout = 901;
        assert_eq!(fields(&d), vec!["lambda.timeout"]);
        d.lambda.timeout = 900;
        assert!(fields(&d).is_empty());
    }

    #[test]
    fn test_collects_every_violation() {
        let mut d = valid_descriptor();
        d.lambda.function_name = String::new();
        d.lambda.memory_size = 200;
        d.lambda.timeout = 0;
        d.lambda.runtime = String::from("cobol");
        d.lambda.trace_mode = String::from("Sometimes");

        assert_eq!(
            fields(&d),
            vec![
                "lambda.functionName",
                "lambda.memorySize",
                "lambda.timeout",
                "lambda.runtime",
                "lambda.traceMode",
            ]
        );
    }

    #[test]
    fn test_stage_name_must_match_key() {
        let mut d = valid_descriptor();
        if let Some(prod) = d.api.stages.get_mut("prod") {
            prod.name = String::from("production");
        }
        assert_eq!(fields(&d), vec!["api.stages.prod.name"]);
    }

    #[test]
    fn test_stage_names_unique_ignoring_case() {
        let mut d = valid_descriptor();
        for key in ["Dev", "dev"] {
            d.api.stages.insert(
                key.to_string(),
                DeploymentStage {
                    name: key.to_string(),
                    ..DeploymentStage::default()
                },
            );
        }
        assert_eq!(fields(&d), vec!["api.stages.dev.name"]);
    }

    #[test]
    fn test_stage_cache_size_checked_only_when_enabled() {
        let mut d = valid_descriptor();
        if let Some(prod) = d.api.stages.get_mut("prod") {
            prod.cache_size = String::from("42");
        }
        let report = ConfigValidator::new().validate(&d).unwrap();
        assert_eq!(report.warnings.len(), 1);

        if let Some(prod) = d.api.stages.get_mut("prod") {
            prod.cache = true;
        }
        assert_eq!(fields(&d), vec!["api.stages.prod.cacheSize"]);

        if let Some(prod) = d.api.stages.get_mut("prod") {
            prod.cache_size = String::from("13.5");
        }
        assert!(fields(&d).is_empty());
    }

    #[test]
    fn test_partial_credentials_rejected() {
        let mut d = valid_descriptor();
        d.aws.access_key_id = String::from("AKIA123");
        assert_eq!(fields(&d), vec!["aws.accessKeyId"]);
        d.aws.secret_access_key = String::from("secret");
        assert!(fields(&d).is_empty());
    }

    #[test]
    fn test_vpc_requires_both_lists() {
        let mut d = valid_descriptor();
        d.lambda.vpc.subnets = vec![String::from("subnet-1")];
        assert_eq!(fields(&d), vec!["lambda.vpc"]);
        d.lambda.vpc.security_groups = vec![String::from("sg-1")];
        assert!(fields(&d).is_empty());
    }

    #[test]
    fn test_unknown_runtime() {
        let mut d = valid_descriptor();
        d.lambda.runtime = String::from("provided");
        assert_eq!(fields(&d), vec!["lambda.runtime"]);
        d.lambda.runtime = String::from("go1.x");
        assert!(fields(&d).is_empty());
    }

    #[test]
    fn test_missing_role_is_a_warning() {
        let report = ConfigValidator::new().validate(&baseline("f")).unwrap();
        assert_eq!(report.warnings, vec!["lambda.role: No execution role configured"]);
    }

    #[test]
    fn test_stage_name_characters() {
        assert!(is_valid_stage_name("prod"));
        assert!(is_valid_stage_name("beta_2-eu"));
        assert!(!is_valid_stage_name("with space"));
        assert!(!is_valid_stage_name("v1.0"));
        assert!(!is_valid_stage_name(""));
    }
}
