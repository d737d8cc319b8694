//! Baseline descriptor values.
//!
//! Every field of the descriptor has a documented default here. The baseline
//! is the lowest layer of resolution: anything not set by the command line,
//! the configuration file or the environment comes from this module.

use std::collections::BTreeMap;

use super::spec::{
    AppSettings, ComputeSettings, DeploymentDescriptor, DeploymentStage, GatewaySettings,
    NetworkSettings, ProviderSettings, VariableMap,
};

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default shared credentials profile.
pub const DEFAULT_PROFILE: &str = "default";

/// Default build artifact file name.
pub const DEFAULT_BUILD_FILE_NAME: &str = "aegis_function.zip";

/// Default stdio wrapper script.
pub const DEFAULT_WRAPPER: &str = "index_stdio.js";

/// Default Lambda runtime.
pub const DEFAULT_RUNTIME: &str = "nodejs4.3";

/// Default handler entry point.
pub const DEFAULT_HANDLER: &str = "index.handler";

/// Default alias name.
pub const DEFAULT_ALIAS: &str = "current";

/// Default memory size in MB.
pub const DEFAULT_MEMORY_SIZE: u32 = 128;

/// Default timeout in seconds.
pub const DEFAULT_TIMEOUT: u32 = 3;

/// Default X-Ray trace mode.
pub const DEFAULT_TRACE_MODE: &str = "Active";

/// Default REST API name.
pub const DEFAULT_API_NAME: &str = "Aegis API";

/// Default cache cluster size class.
pub const DEFAULT_CACHE_SIZE: &str = "0.5";

/// Name of the stage synthesized when none is configured.
pub const DEFAULT_STAGE_NAME: &str = "prod";

/// Description of the synthesized stage.
pub const DEFAULT_STAGE_DESCRIPTION: &str = "production stage";

/// Binary media type used when none is configured.
pub const WILDCARD_MEDIA_TYPE: &str = "*/*";

/// Returns the baseline descriptor.
///
/// `function_name` is supplied by the caller (normally derived from the
/// working directory) so this stays a pure function.
#[must_use]
pub fn baseline(function_name: &str) -> DeploymentDescriptor {
    DeploymentDescriptor {
        app: AppSettings {
            name: String::new(),
            keep_build_files: false,
            build_file_name: String::from(DEFAULT_BUILD_FILE_NAME),
        },
        aws: ProviderSettings {
            region: String::from(DEFAULT_REGION),
            profile: String::from(DEFAULT_PROFILE),
            access_key_id: String::new(),
            secret_access_key: String::new(),
        },
        lambda: ComputeSettings {
            wrapper: String::from(DEFAULT_WRAPPER),
            runtime: String::from(DEFAULT_RUNTIME),
            handler: String::from(DEFAULT_HANDLER),
            function_name: function_name.to_string(),
            alias: String::from(DEFAULT_ALIAS),
            description: String::new(),
            memory_size: DEFAULT_MEMORY_SIZE,
            role: String::new(),
            timeout: DEFAULT_TIMEOUT,
            source_zip: String::new(),
            environment_variables: VariableMap::new(),
            kms_key_arn: String::new(),
            vpc: NetworkSettings::default(),
            trace_mode: String::from(DEFAULT_TRACE_MODE),
        },
        api: GatewaySettings {
            name: String::from(DEFAULT_API_NAME),
            description: String::new(),
            cache: false,
            cache_size: String::from(DEFAULT_CACHE_SIZE),
            stages: default_stages(),
            binary_media_types: vec![String::from(WILDCARD_MEDIA_TYPE)],
        },
    }
}

/// Returns the stage map used when no stage is configured.
///
/// Caching is off for the default stage since it carries an extra cost.
#[must_use]
pub fn default_stages() -> BTreeMap<String, DeploymentStage> {
    let stage = DeploymentStage {
        name: String::from(DEFAULT_STAGE_NAME),
        description: String::from(DEFAULT_STAGE_DESCRIPTION),
        variables: VariableMap::new(),
        cache: false,
        cache_size: String::new(),
    };
    BTreeMap::from([(String::from(DEFAULT_STAGE_NAME), stage)])
}
