//! Layer merging and resolution against the baseline.
//!
//! Layers are merged from highest to lowest precedence: command-line flags,
//! the configuration file, then environment variables. Scalars take the first
//! value that was explicitly set. Variable maps and the stage map are merged
//! key by key, so a higher layer that touches one stage does not erase the
//! others. Stage keys match ignoring ASCII case, since environment variable
//! names are usually uppercase. Lists are replaced wholesale.

use std::collections::BTreeMap;
use tracing::debug;

use super::defaults::WILDCARD_MEDIA_TYPE;
use super::raw::{RawApp, RawCompute, RawDescriptor, RawGateway, RawNetwork, RawProvider, RawStage};
use super::spec::{
    AppSettings, ComputeSettings, DeploymentDescriptor, DeploymentStage, GatewaySettings,
    NetworkSettings, ProviderSettings, VariableMap,
};

/// A configuration layer that can be placed over a lower-precedence one.
pub trait Layer: Sized {
    /// Merges `self` (higher precedence) over `lower`.
    #[must_use]
    fn over(self, lower: Self) -> Self;
}

impl<T> Layer for Option<T> {
    fn over(self, lower: Self) -> Self {
        self.or(lower)
    }
}

impl Layer for VariableMap {
    fn over(self, lower: Self) -> Self {
        let mut merged = lower;
        merged.extend(self);
        merged
    }
}

impl Layer for RawApp {
    fn over(self, lower: Self) -> Self {
        Self {
            name: self.name.over(lower.name),
            keep_build_files: self.keep_build_files.over(lower.keep_build_files),
            build_file_name: self.build_file_name.over(lower.build_file_name),
        }
    }
}

impl Layer for RawProvider {
    fn over(self, lower: Self) -> Self {
        Self {
            region: self.region.over(lower.region),
            profile: self.profile.over(lower.profile),
            access_key_id: self.access_key_id.over(lower.access_key_id),
            secret_access_key: self.secret_access_key.over(lower.secret_access_key),
        }
    }
}

impl Layer for RawNetwork {
    fn over(self, lower: Self) -> Self {
        Self {
            security_groups: self.security_groups.over(lower.security_groups),
            subnets: self.subnets.over(lower.subnets),
        }
    }
}

impl Layer for RawCompute {
    fn over(self, lower: Self) -> Self {
        Self {
            wrapper: self.wrapper.over(lower.wrapper),
            runtime: self.runtime.over(lower.runtime),
            handler: self.handler.over(lower.handler),
            function_name: self.function_name.over(lower.function_name),
            alias: self.alias.over(lower.alias),
            description: self.description.over(lower.description),
            memory_size: self.memory_size.over(lower.memory_size),
            role: self.role.over(lower.role),
            timeout: self.timeout.over(lower.timeout),
            source_zip: self.source_zip.over(lower.source_zip),
            environment_variables: self.environment_variables.over(lower.environment_variables),
            kms_key_arn: self.kms_key_arn.over(lower.kms_key_arn),
            vpc: self.vpc.over(lower.vpc),
            trace_mode: self.trace_mode.over(lower.trace_mode),
        }
    }
}

impl Layer for RawStage {
    fn over(self, lower: Self) -> Self {
        Self {
            name: self.name.over(lower.name),
            description: self.description.over(lower.description),
            variables: self.variables.over(lower.variables),
            cache: self.cache.over(lower.cache),
            cache_size: self.cache_size.over(lower.cache_size),
        }
    }
}

impl Layer for RawGateway {
    fn over(self, lower: Self) -> Self {
        let mut stages = lower.stages;
        for (key, stage) in self.stages {
            insert_stage(&mut stages, key, stage);
        }

        Self {
            name: self.name.over(lower.name),
            description: self.description.over(lower.description),
            cache: self.cache.over(lower.cache),
            cache_size: self.cache_size.over(lower.cache_size),
            stages,
            binary_media_types: self.binary_media_types.over(lower.binary_media_types),
        }
    }
}

/// Inserts `stage` over any entry whose key matches ignoring case.
///
/// The inserted key's spelling wins.
fn insert_stage(stages: &mut BTreeMap<String, RawStage>, key: String, stage: RawStage) {
    let existing = stages
        .keys()
        .find(|existing| existing.eq_ignore_ascii_case(&key))
        .cloned();

    let merged = match existing.and_then(|existing| stages.remove(&existing)) {
        Some(lower) => stage.over(lower),
        None => stage,
    };
    stages.insert(key, merged);
}

/// Folds stage entries of one layer whose keys differ only by case.
#[must_use]
pub fn coalesce_stages(stages: BTreeMap<String, RawStage>) -> BTreeMap<String, RawStage> {
    let mut coalesced = BTreeMap::new();
    for (key, stage) in stages {
        insert_stage(&mut coalesced, key, stage);
    }
    coalesced
}

impl Layer for RawDescriptor {
    fn over(self, lower: Self) -> Self {
        Self {
            app: self.app.over(lower.app),
            aws: self.aws.over(lower.aws),
            lambda: self.lambda.over(lower.lambda),
            api: self.api.over(lower.api),
        }
    }
}

/// Merges the explicit layers, highest precedence first.
#[must_use]
pub fn merge_layers(cli: RawDescriptor, file: RawDescriptor, env: RawDescriptor) -> RawDescriptor {
    debug!(
        "Merging layers: {} stage(s) from flags, {} from file, {} from environment",
        cli.api.stages.len(),
        file.api.stages.len(),
        env.api.stages.len()
    );
    cli.over(file.over(env))
}

/// Fills every unset field of `raw` from `baseline`.
///
/// Stage names are left as written; stage normalization assigns them.
#[must_use]
pub fn resolve(raw: RawDescriptor, baseline: &DeploymentDescriptor) -> DeploymentDescriptor {
    DeploymentDescriptor {
        app: resolve_app(raw.app, &baseline.app),
        aws: resolve_provider(raw.aws, &baseline.aws),
        lambda: resolve_compute(raw.lambda, &baseline.lambda),
        api: resolve_gateway(raw.api, &baseline.api),
    }
}

fn resolve_app(raw: RawApp, base: &AppSettings) -> AppSettings {
    AppSettings {
        name: raw.name.unwrap_or_else(|| base.name.clone()),
        keep_build_files: raw.keep_build_files.unwrap_or(base.keep_build_files),
        build_file_name: raw.build_file_name.unwrap_or_else(|| base.build_file_name.clone()),
    }
}

fn resolve_provider(raw: RawProvider, base: &ProviderSettings) -> ProviderSettings {
    ProviderSettings {
        region: raw.region.unwrap_or_else(|| base.region.clone()),
        profile: raw.profile.unwrap_or_else(|| base.profile.clone()),
        access_key_id: raw.access_key_id.unwrap_or_else(|| base.access_key_id.clone()),
        secret_access_key: raw
            .secret_access_key
            .unwrap_or_else(|| base.secret_access_key.clone()),
    }
}

fn resolve_compute(raw: RawCompute, base: &ComputeSettings) -> ComputeSettings {
    // An explicitly empty name is treated as unset.
    let function_name = raw
        .function_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| base.function_name.clone());

    ComputeSettings {
        wrapper: raw.wrapper.unwrap_or_else(|| base.wrapper.clone()),
        runtime: raw.runtime.unwrap_or_else(|| base.runtime.clone()),
        handler: raw.handler.unwrap_or_else(|| base.handler.clone()),
        function_name,
        alias: raw.alias.unwrap_or_else(|| base.alias.clone()),
        description: raw.description.unwrap_or_else(|| base.description.clone()),
        memory_size: raw.memory_size.unwrap_or(base.memory_size),
        role: raw.role.unwrap_or_else(|| base.role.clone()),
        timeout: raw.timeout.unwrap_or(base.timeout),
        source_zip: raw.source_zip.unwrap_or_else(|| base.source_zip.clone()),
        environment_variables: raw
            .environment_variables
            .over(base.environment_variables.clone()),
        kms_key_arn: raw.kms_key_arn.unwrap_or_else(|| base.kms_key_arn.clone()),
        vpc: NetworkSettings {
            security_groups: raw
                .vpc
                .security_groups
                .unwrap_or_else(|| base.vpc.security_groups.clone()),
            subnets: raw.vpc.subnets.unwrap_or_else(|| base.vpc.subnets.clone()),
        },
        trace_mode: raw.trace_mode.unwrap_or_else(|| base.trace_mode.clone()),
    }
}

fn resolve_gateway(raw: RawGateway, base: &GatewaySettings) -> GatewaySettings {
    let cache_size = raw.cache_size.unwrap_or_else(|| base.cache_size.clone());

    let stages = if raw.stages.is_empty() {
        base.stages.clone()
    } else {
        raw.stages
            .into_iter()
            .map(|(key, stage)| {
                match base.stages.iter().find(|(name, _)| name.eq_ignore_ascii_case(&key)) {
                    Some((name, base_stage)) => {
                        (name.clone(), resolve_stage(stage, Some(base_stage), &cache_size))
                    }
                    None => (key, resolve_stage(stage, None, &cache_size)),
                }
            })
            .collect()
    };

    let binary_media_types = raw
        .binary_media_types
        .filter(|types| !types.is_empty())
        .or_else(|| Some(base.binary_media_types.clone()).filter(|types| !types.is_empty()))
        .unwrap_or_else(|| vec![String::from(WILDCARD_MEDIA_TYPE)]);

    GatewaySettings {
        name: raw.name.unwrap_or_else(|| base.name.clone()),
        description: raw.description.unwrap_or_else(|| base.description.clone()),
        cache: raw.cache.unwrap_or(base.cache),
        cache_size,
        stages,
        binary_media_types,
    }
}

/// Fills a stage from the baseline stage of the same key, if any.
///
/// A cached stage without its own size inherits the gateway size class.
fn resolve_stage(
    raw: RawStage,
    base: Option<&DeploymentStage>,
    gateway_cache_size: &str,
) -> DeploymentStage {
    let cache = raw.cache.or(base.map(|b| b.cache)).unwrap_or(false);
    let base_cache_size = base
        .map(|b| b.cache_size.clone())
        .filter(|size| !size.is_empty());
    let cache_size = match raw.cache_size.or(base_cache_size) {
        Some(size) => size,
        None if cache => gateway_cache_size.to_string(),
        None => String::new(),
    };

    let name = raw.name.or_else(|| base.map(|b| b.name.clone()));
    let description = raw.description.or_else(|| base.map(|b| b.description.clone()));
    let variables = match base {
        Some(b) => raw.variables.over(b.variables.clone()),
        None => raw.variables,
    };

    DeploymentStage {
        name: name.unwrap_or_default(),
        description: description.unwrap_or_default(),
        variables,
        cache,
        cache_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::baseline;

    fn stage(description: &str) -> RawStage {
        RawStage {
            description: Some(description.to_string()),
            ..RawStage::default()
        }
    }

    fn with_stages(stages: &[(&str, RawStage)]) -> RawDescriptor {
        let mut raw = RawDescriptor::default();
        for (key, stage) in stages {
            raw.api.stages.insert((*key).to_string(), stage.clone());
        }
        raw
    }

    #[test]
    fn test_empty_layers_resolve_to_baseline() {
        let base = baseline("aegis_test");
        let merged = merge_layers(
            RawDescriptor::default(),
            RawDescriptor::default(),
            RawDescriptor::default(),
        );
        assert_eq!(resolve(merged, &base), base);
    }

    #[test]
    fn test_cli_scalar_wins_over_file_and_env() {
        let mut cli = RawDescriptor::default();
        cli.aws.region = Some(String::from("eu-west-1"));
        let mut file = RawDescriptor::default();
        file.aws.region = Some(String::from("us-west-2"));
        file.lambda.memory_size = Some(256);
        let mut env = RawDescriptor::default();
        env.aws.region = Some(String::from("ap-south-1"));
        env.lambda.memory_size = Some(512);
        env.lambda.timeout = Some(10);

        let merged = merge_layers(cli, file, env);
        assert_eq!(merged.aws.region.as_deref(), Some("eu-west-1"));
        assert_eq!(merged.lambda.memory_size, Some(256));
        assert_eq!(merged.lambda.timeout, Some(10));
    }

    #[test]
    fn test_stage_maps_merge_additively() {
        let lower = with_stages(&[("a", stage("stage a")), ("b", stage("stage b"))]);
        let mut b_override = stage("overridden");
        b_override.cache = Some(true);
        let higher = with_stages(&[("b", b_override)]);

        let merged = higher.over(lower);
        assert_eq!(merged.api.stages.len(), 2);
        assert_eq!(merged.api.stages["a"].description.as_deref(), Some("stage a"));
        assert_eq!(merged.api.stages["b"].description.as_deref(), Some("overridden"));
        assert_eq!(merged.api.stages["b"].cache, Some(true));
    }

    #[test]
    fn test_stage_fields_fall_through_within_a_key() {
        let mut lower_b = stage("from file");
        lower_b.cache_size = Some(String::from("1.6"));
        let lower = with_stages(&[("b", lower_b)]);
        let higher = with_stages(&[(
            "b",
            RawStage {
                cache: Some(true),
                ..RawStage::default()
            },
        )]);

        let merged = higher.over(lower);
        let b = &merged.api.stages["b"];
        assert_eq!(b.cache, Some(true));
        assert_eq!(b.cache_size.as_deref(), Some("1.6"));
        assert_eq!(b.description.as_deref(), Some("from file"));
    }

    #[test]
    fn test_variable_maps_merge_by_key_including_null_values() {
        let mut file = RawDescriptor::default();
        file.lambda
            .environment_variables
            .insert(String::from("DB_HOST"), Some(String::from("db.internal")));
        file.lambda
            .environment_variables
            .insert(String::from("LOG_LEVEL"), Some(String::from("info")));
        let mut cli = RawDescriptor::default();
        cli.lambda
            .environment_variables
            .insert(String::from("LOG_LEVEL"), None);

        let merged = merge_layers(cli, file, RawDescriptor::default());
        let vars = &merged.lambda.environment_variables;
        assert_eq!(vars.get("DB_HOST"), Some(&Some(String::from("db.internal"))));
        assert_eq!(vars.get("LOG_LEVEL"), Some(&None));
    }

    #[test]
    fn test_configured_stages_replace_default_stage() {
        let base = baseline("f");
        let resolved = resolve(with_stages(&[("dev", stage("dev"))]), &base);
        assert_eq!(resolved.stage_names(), vec!["dev"]);
    }

    #[test]
    fn test_cached_stage_inherits_gateway_cache_size() {
        let base = baseline("f");
        let mut raw = with_stages(&[(
            "dev",
            RawStage {
                cache: Some(true),
                ..RawStage::default()
            },
        )]);
        raw.api.cache_size = Some(String::from("6.1"));

        let resolved = resolve(raw, &base);
        assert_eq!(resolved.api.stages["dev"].cache_size, "6.1");
    }

    #[test]
    fn test_empty_binary_media_types_fall_back_to_wildcard() {
        let base = baseline("f");
        let mut raw = RawDescriptor::default();
        raw.api.binary_media_types = Some(Vec::new());
        assert_eq!(resolve(raw, &base).api.binary_media_types, vec!["*/*"]);
    }

    #[test]
    fn test_blank_function_name_uses_baseline() {
        let base = baseline("aegis_dir");
        let mut raw = RawDescriptor::default();
        raw.lambda.function_name = Some(String::from("  "));
        assert_eq!(resolve(raw, &base).lambda.function_name, "aegis_dir");
    }

    #[test]
    fn test_lists_are_replaced_not_appended() {
        let mut file = RawDescriptor::default();
        file.lambda.vpc.subnets = Some(vec![String::from("subnet-a"), String::from("subnet-b")]);
        let mut cli = RawDescriptor::default();
        cli.lambda.vpc.subnets = Some(vec![String::from("subnet-c")]);

        let merged = merge_layers(cli, file, RawDescriptor::default());
        assert_eq!(merged.lambda.vpc.subnets, Some(vec![String::from("subnet-c")]));
    }

    #[test]
    fn test_stage_keys_match_ignoring_case() {
        let file = with_stages(&[("prod", stage("production")), ("dev", stage("development"))]);
        let env = with_stages(&[(
            "PROD",
            RawStage {
                cache: Some(true),
                ..RawStage::default()
            },
        )]);

        let merged = merge_layers(RawDescriptor::default(), file, env);
        let keys: Vec<&str> = merged.api.stages.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["dev", "prod"]);
        assert_eq!(merged.api.stages["prod"].cache, Some(true));
        assert_eq!(merged.api.stages["prod"].description.as_deref(), Some("production"));
    }

    #[test]
    fn test_coalesce_folds_keys_differing_by_case() {
        let mut stages = BTreeMap::new();
        stages.insert(String::from("PROD"), stage("upper"));
        stages.insert(
            String::from("prod"),
            RawStage {
                cache: Some(true),
                ..RawStage::default()
            },
        );
        stages.insert(String::from("dev"), stage("dev"));

        let coalesced = coalesce_stages(stages);
        assert_eq!(coalesced.len(), 2);
        let prod = &coalesced["prod"];
        assert_eq!(prod.cache, Some(true));
        assert_eq!(prod.description.as_deref(), Some("upper"));
    }

    #[test]
    fn test_stage_matching_baseline_keeps_its_defaults() {
        let base = baseline("f");
        let resolved = resolve(
            with_stages(&[(
                "PROD",
                RawStage {
                    cache: Some(true),
                    ..RawStage::default()
                },
            )]),
            &base,
        );

        assert_eq!(resolved.stage_names(), vec!["prod"]);
        let prod = &resolved.api.stages["prod"];
        assert!(prod.cache);
        assert_eq!(prod.description, base.api.stages["prod"].description);
        assert_eq!(prod.cache_size, base.api.cache_size);
    }
}
