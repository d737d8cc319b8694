//! Resolved deployment descriptor types.
//!
//! These structs hold the fully resolved configuration handed to the
//! provisioning collaborators. Every field is populated; nothing here is
//! optional except the values of user-defined variable maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Variable map whose values may be explicitly absent.
///
/// `Some(None)` from a lookup means the key was declared without a value,
/// which is distinct from the key not being declared at all.
pub type VariableMap = BTreeMap<String, Option<String>>;

/// The root descriptor for one Aegis deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentDescriptor {
    /// Application-level settings.
    pub app: AppSettings,
    /// Provider (AWS) settings and credentials.
    pub aws: ProviderSettings,
    /// Lambda function settings.
    pub lambda: ComputeSettings,
    /// API Gateway settings.
    pub api: GatewaySettings,
}

/// Application-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Application name.
    pub name: String,
    /// Whether to keep intermediate build files after deployment.
    pub keep_build_files: bool,
    /// File name of the zipped build artifact.
    pub build_file_name: String,
}

/// AWS region and credential settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    /// Target region.
    pub region: String,
    /// Shared credentials profile name.
    pub profile: String,
    /// Explicit access key id (empty defers to ambient credentials).
    pub access_key_id: String,
    /// Explicit secret access key (empty defers to ambient credentials).
    pub secret_access_key: String,
}

/// Where provisioning should take credentials from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource<'a> {
    /// An explicit key pair was configured.
    StaticKeys {
        /// Access key id.
        access_key_id: &'a str,
        /// Secret access key.
        secret_access_key: &'a str,
    },
    /// Defer to the named shared credentials profile.
    Profile(&'a str),
}

/// Lambda function settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComputeSettings {
    /// Stdio wrapper script bundled alongside the handler.
    pub wrapper: String,
    /// Runtime identifier (e.g. `nodejs4.3`).
    pub runtime: String,
    /// Handler entry point.
    pub handler: String,
    /// Function name.
    pub function_name: String,
    /// Alias pointing at the deployed version.
    pub alias: String,
    /// Function description.
    pub description: String,
    /// Memory size in MB.
    pub memory_size: u32,
    /// Execution role ARN.
    pub role: String,
    /// Timeout in seconds.
    pub timeout: u32,
    /// Location of the source artifact.
    pub source_zip: String,
    /// Environment variables passed to the function.
    pub environment_variables: VariableMap,
    /// KMS key used to encrypt environment variables.
    pub kms_key_arn: String,
    /// VPC placement.
    pub vpc: NetworkSettings,
    /// X-Ray trace mode.
    pub trace_mode: String,
}

/// VPC placement for the function.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSettings {
    /// Security group ids.
    pub security_groups: Vec<String>,
    /// Subnet ids.
    pub subnets: Vec<String>,
}

/// API Gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySettings {
    /// REST API name.
    pub name: String,
    /// REST API description.
    pub description: String,
    /// Whether the gateway-level cache cluster is enabled.
    pub cache: bool,
    /// Gateway-level cache cluster size class.
    pub cache_size: String,
    /// Deployment stages keyed by stage name.
    pub stages: BTreeMap<String, DeploymentStage>,
    /// Content types served as binary.
    pub binary_media_types: Vec<String>,
}

/// One API Gateway deployment stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStage {
    /// Stage name; equals its key in [`GatewaySettings::stages`] once normalized.
    pub name: String,
    /// Stage description.
    pub description: String,
    /// Stage variables.
    pub variables: VariableMap,
    /// Whether the stage cache cluster is enabled.
    pub cache: bool,
    /// Stage cache cluster size class. Inert while `cache` is false.
    pub cache_size: String,
}

/// A scheduled task (CloudWatch event rule) definition.
///
/// Used by the event scheduling feature; the name is derived from the
/// definition's file name and never serialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduledTask {
    /// Schedule expression, e.g. `rate(5 minutes)`.
    pub schedule: String,
    /// Opaque payload delivered to the function.
    #[serde(default)]
    pub input: serde_json::Value,
    /// Whether the rule is created disabled.
    #[serde(default)]
    pub disabled: bool,
    /// Rule description.
    #[serde(default)]
    pub description: String,
    /// Rule name, assigned by the caller.
    #[serde(skip)]
    pub name: String,
}

impl DeploymentDescriptor {
    /// Returns stage names in key order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.api.stages.keys().map(String::as_str).collect()
    }
}

impl ProviderSettings {
    /// Classifies the configured credentials without acquiring anything.
    ///
    /// An explicit key pair wins over the profile only when both halves are set.
    #[must_use]
    pub fn credential_source(&self) -> CredentialSource<'_> {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            CredentialSource::Profile(&self.profile)
        } else {
            CredentialSource::StaticKeys {
                access_key_id: &self.access_key_id,
                secret_access_key: &self.secret_access_key,
            }
        }
    }
}

impl NetworkSettings {
    /// Returns true if no VPC placement is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.security_groups.is_empty() && self.subnets.is_empty()
    }
}

impl DeploymentStage {
    /// Returns the cache size only if caching is enabled for this stage.
    #[must_use]
    pub fn effective_cache_size(&self) -> Option<&str> {
        self.cache.then_some(self.cache_size.as_str())
    }
}

impl ScheduledTask {
    /// Parses a task definition and assigns it the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition is not valid JSON.
    pub fn from_json(name: impl Into<String>, text: &str) -> serde_json::Result<Self> {
        let mut task: Self = serde_json::from_str(text)?;
        task.name = name.into();
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(key: &str, secret: &str) -> ProviderSettings {
        ProviderSettings {
            region: String::from("us-east-1"),
            profile: String::from("default"),
            access_key_id: key.to_string(),
            secret_access_key: secret.to_string(),
        }
    }

    #[test]
    fn test_credential_source_prefers_complete_key_pair() {
        let aws = provider("AKIA123", "s3cr3t");
        assert_eq!(
            aws.credential_source(),
            CredentialSource::StaticKeys {
                access_key_id: "AKIA123",
                secret_access_key: "s3cr3t",
            }
        );
    }

    #[test]
    fn test_credential_source_falls_back_to_profile() {
        assert_eq!(provider("", "").credential_source(), CredentialSource::Profile("default"));
        assert_eq!(provider("AKIA123", "").credential_source(), CredentialSource::Profile("default"));
    }

    #[test]
    fn test_effective_cache_size_ignored_when_cache_off() {
        let mut stage = DeploymentStage {
            name: String::from("prod"),
            cache_size: String::from("6.1"),
            ..DeploymentStage::default()
        };
        assert_eq!(stage.effective_cache_size(), None);
        stage.cache = true;
        assert_eq!(stage.effective_cache_size(), Some("6.1"));
    }

    #[test]
    fn test_scheduled_task_name_is_not_serialized() {
        let task = ScheduledTask::from_json(
            "nightly",
            r#"{"schedule": "rate(1 day)", "input": {"job": "cleanup"}, "description": "cleanup"}"#,
        )
        .unwrap();
        assert_eq!(task.name, "nightly");
        assert_eq!(task.input["job"], "cleanup");
        assert!(!task.disabled);

        let json = serde_json::to_string(&task).unwrap();
        assert!(!json.contains("nightly"));
    }
}
