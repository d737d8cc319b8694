//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying resolved
//! configuration and validation results in text or JSON.

use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{
    CredentialSource, DeploymentDescriptor, DeploymentStage, DescriptorHasher, NetworkSettings,
    ProviderSettings, Resolution, ValidationError,
};

use super::commands::OutputFormat;

/// Placeholder shown instead of a configured secret.
const REDACTED: &str = "********";

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Setting row for table display.
#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Setting")]
    setting: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Stage row for table display.
#[derive(Tabled)]
struct StageRow {
    #[tabled(rename = "Stage")]
    name: String,
    #[tabled(rename = "Cache")]
    cache: String,
    #[tabled(rename = "Variables")]
    variables: usize,
    #[tabled(rename = "Description")]
    description: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the result of a successful resolution.
    #[must_use]
    pub fn format_summary(&self, resolution: &Resolution, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&SummaryJson::from(resolution)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_summary_text(resolution, show_warnings),
        }
    }

    /// Formats a summary as text.
    fn format_summary_text(resolution: &Resolution, show_warnings: bool) -> String {
        let d = &resolution.descriptor;
        let mut output = String::new();

        let _ = writeln!(output, "{} Configuration is valid", "✓".green());
        let source = resolution
            .config_file
            .as_ref()
            .map_or_else(|| String::from("(defaults only)"), |p| p.display().to_string());
        let _ = writeln!(output, "   Config file: {source}\n");

        let rows = vec![
            SettingRow { setting: "Function", value: d.lambda.function_name.clone() },
            SettingRow { setting: "Alias", value: d.lambda.alias.clone() },
            SettingRow { setting: "Runtime", value: d.lambda.runtime.clone() },
            SettingRow { setting: "Handler", value: d.lambda.handler.clone() },
            SettingRow { setting: "Memory", value: format!("{} MB", d.lambda.memory_size) },
            SettingRow { setting: "Timeout", value: format!("{}s", d.lambda.timeout) },
            SettingRow { setting: "Trace mode", value: d.lambda.trace_mode.clone() },
            SettingRow { setting: "VPC", value: Self::format_vpc(&d.lambda.vpc) },
            SettingRow { setting: "Region", value: d.aws.region.clone() },
            SettingRow { setting: "Credentials", value: Self::format_credentials(&d.aws) },
            SettingRow { setting: "API", value: d.api.name.clone() },
        ];
        output.push_str(&Table::new(rows).to_string());
        output.push_str("\n\n");

        output.push_str(&Table::new(Self::stage_rows(d)).to_string());
        output.push('\n');

        if show_warnings && !resolution.warnings.is_empty() {
            let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
            for warning in &resolution.warnings {
                let _ = writeln!(output, "   - {warning}");
            }
        } else if !resolution.warnings.is_empty() {
            let _ = writeln!(
                output,
                "\n{} warning(s), use --warnings to show them",
                resolution.warnings.len()
            );
        }

        output
    }

    fn stage_rows(descriptor: &DeploymentDescriptor) -> Vec<StageRow> {
        descriptor
            .api
            .stages
            .values()
            .map(|stage| StageRow {
                name: stage.name.clone(),
                cache: Self::format_cache(stage),
                variables: stage.variables.len(),
                description: Self::truncate(&stage.description, 40),
            })
            .collect()
    }

    fn format_vpc(vpc: &NetworkSettings) -> String {
        if vpc.is_empty() {
            String::from("none")
        } else {
            format!(
                "{} security group(s), {} subnet(s)",
                vpc.security_groups.len(),
                vpc.subnets.len()
            )
        }
    }

    fn format_credentials(aws: &ProviderSettings) -> String {
        match aws.credential_source() {
            CredentialSource::StaticKeys { access_key_id, .. } => {
                format!("access key {access_key_id}")
            }
            CredentialSource::Profile(profile) => format!("profile '{profile}'"),
        }
    }

    fn format_cache(stage: &DeploymentStage) -> String {
        stage
            .effective_cache_size()
            .map_or_else(|| String::from("off"), |size| format!("{size} GB"))
    }

    /// Formats a resolved descriptor in full, with secrets redacted, along
    /// with its fingerprint and one fingerprint per stage.
    #[must_use]
    pub fn format_descriptor(&self, descriptor: &DeploymentDescriptor) -> String {
        let hasher = DescriptorHasher::new();
        let fingerprint = hasher.fingerprint(descriptor);
        let stage_fingerprints: BTreeMap<String, String> = descriptor
            .api
            .stages
            .iter()
            .map(|(key, stage)| (key.clone(), hasher.fingerprint_stage(stage)))
            .collect();
        let redacted = redact(descriptor);

        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&DescriptorJson {
                fingerprint,
                stage_fingerprints,
                descriptor: redacted,
            })
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!(
                    "# fingerprint: {}\n",
                    DescriptorHasher::short(&fingerprint)
                );
                for (key, stage_fingerprint) in &stage_fingerprints {
                    let _ = writeln!(
                        output,
                        "# stage {key}: {}",
                        DescriptorHasher::short(stage_fingerprint)
                    );
                }
                output.push_str(&serde_yaml::to_string(&redacted).unwrap_or_default());
                output
            }
        }
    }

    /// Formats validation violations.
    #[must_use]
    pub fn format_violations(&self, violations: &[ValidationError]) -> String {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<ViolationJson<'_>> = violations
                    .iter()
                    .map(|v| ViolationJson {
                        field: &v.field,
                        message: &v.message,
                    })
                    .collect();
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = format!(
                    "{} Configuration is invalid ({} error(s)):\n",
                    "✗".red(),
                    violations.len()
                );
                for violation in violations {
                    let _ = writeln!(
                        output,
                        "   - {}: {}",
                        violation.field.bold(),
                        violation.message
                    );
                }
                output
            }
        }
    }

    /// Truncates a string for table display.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

/// Returns a copy of the descriptor with secrets masked.
fn redact(descriptor: &DeploymentDescriptor) -> DeploymentDescriptor {
    let mut redacted = descriptor.clone();
    if !redacted.aws.secret_access_key.is_empty() {
        redacted.aws.secret_access_key = String::from(REDACTED);
    }
    redacted
}

// JSON serialization helpers

#[derive(Serialize)]
struct SummaryJson {
    valid: bool,
    config_file: Option<String>,
    fingerprint: String,
    function_name: String,
    region: String,
    credentials: String,
    runtime: String,
    memory_size: u32,
    timeout: u32,
    stages: Vec<StageJson>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct StageJson {
    name: String,
    cache: bool,
    cache_size: Option<String>,
    variables: usize,
}

#[derive(Serialize)]
struct DescriptorJson {
    fingerprint: String,
    stage_fingerprints: BTreeMap<String, String>,
    descriptor: DeploymentDescriptor,
}

#[derive(Serialize)]
struct ViolationJson<'a> {
    field: &'a str,
    message: &'a str,
}

impl From<&Resolution> for SummaryJson {
    fn from(resolution: &Resolution) -> Self {
        let d = &resolution.descriptor;
        Self {
            valid: true,
            config_file: resolution
                .config_file
                .as_ref()
                .map(|p| p.display().to_string()),
            fingerprint: DescriptorHasher::new().fingerprint(d),
            function_name: d.lambda.function_name.clone(),
            region: d.aws.region.clone(),
            credentials: OutputFormatter::format_credentials(&d.aws),
            runtime: d.lambda.runtime.clone(),
            memory_size: d.lambda.memory_size,
            timeout: d.lambda.timeout,
            stages: d.api.stages.values().map(StageJson::from).collect(),
            warnings: resolution.warnings.clone(),
        }
    }
}

impl From<&DeploymentStage> for StageJson {
    fn from(stage: &DeploymentStage) -> Self {
        Self {
            name: stage.name.clone(),
            cache: stage.cache,
            cache_size: stage.effective_cache_size().map(String::from),
            variables: stage.variables.len(),
        }
    }
}
