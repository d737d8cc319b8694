//! Stage map normalization.
//!
//! After merging, a stage's `name` field may be missing or disagree with the
//! key it was declared under. Normalization makes the key authoritative and
//! guarantees at least one stage exists.

use std::collections::BTreeMap;
use tracing::debug;

use super::defaults::default_stages;
use super::spec::DeploymentStage;

/// Normalizes a merged stage map in place.
///
/// An empty map receives the default `prod` stage. Every stage's name is
/// set to its key. A cache size on a stage with caching off is kept as is
/// and has no effect.
pub fn normalize_stages(stages: &mut BTreeMap<String, DeploymentStage>) {
    if stages.is_empty() {
        debug!("No stages configured, using default stage");
        *stages = default_stages();
    }

    for (key, stage) in stages.iter_mut() {
        if stage.name != *key {
            if !stage.name.is_empty() {
                debug!("Stage '{key}' declared name '{}', using key", stage.name);
            }
            stage.name.clone_from(key);
        }
    }
}

/// Returns the keys of stages whose cache size is set but unused.
#[must_use]
pub fn inert_cache_sizes(stages: &BTreeMap<String, DeploymentStage>) -> Vec<&str> {
    stages
        .iter()
        .filter(|(_, stage)| !stage.cache && !stage.cache_size.is_empty())
        .map(|(key, _)| key.as_str())
        .collect()
}
