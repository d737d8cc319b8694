//! Configuration module for the Aegis deployment tool.
//!
//! This module handles all configuration-related functionality:
//! - Baseline defaults and fallback function naming
//! - Loading `aegis.yaml` and `AEGIS_*` environment variables
//! - Merging layers by precedence and normalizing stages
//! - Validating the resolved descriptor against provider constraints
//! - Fingerprinting descriptors for change detection

mod spec;
mod raw;
mod defaults;
mod naming;
mod parser;
mod merge;
mod stages;
mod validator;
mod resolver;
mod hash;

pub use spec::{
    AppSettings, ComputeSettings, CredentialSource, DeploymentDescriptor, DeploymentStage,
    GatewaySettings, NetworkSettings, ProviderSettings, ScheduledTask, VariableMap,
};
pub use raw::{RawApp, RawCompute, RawDescriptor, RawGateway, RawNetwork, RawProvider, RawStage};
pub use defaults::{baseline, default_stages};
pub use naming::{derive_function_name, function_name_from_cwd, FALLBACK_FUNCTION_NAME};
pub use parser::{
    find_config_file, fold_key, parse_env, process_env, ConfigLoader, EnvSnapshot, LoadedSources,
    DEFAULT_CONFIG_NAME, ENV_PREFIX,
};
pub use merge::{merge_layers, resolve, Layer};
pub use stages::{inert_cache_sizes, normalize_stages};
pub use validator::{ConfigValidator, ValidationError, ValidationReport};
pub use resolver::{ConfigResolver, Overrides, Resolution};
pub use hash::DescriptorHasher;
