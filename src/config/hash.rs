//! Descriptor fingerprinting.
//!
//! A fingerprint identifies a resolved descriptor independently of how it
//! was assembled, so two resolutions can be compared cheaply and a
//! provisioning run can tell whether anything changed.

use sha2::{Digest, Sha256};

use super::spec::{DeploymentDescriptor, DeploymentStage};

/// Hasher for computing descriptor fingerprints.
#[derive(Debug, Default)]
pub struct DescriptorHasher;

impl DescriptorHasher {
    /// Creates a new descriptor hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of an entire descriptor.
    ///
    /// Credentials are excluded: rotating a key does not change what gets
    /// deployed.
    #[must_use]
    pub fn fingerprint(&self, descriptor: &DeploymentDescriptor) -> String {
        let mut redacted = descriptor.clone();
        redacted.aws.access_key_id.clear();
        redacted.aws.secret_access_key.clear();

        // Maps are BTreeMaps, so the JSON encoding has a stable key order.
        // Encoding cannot fail: every map is keyed by String and every field
        // is plain data, so `to_vec` has no error path here.
        let canonical = serde_json::to_vec(&redacted).unwrap_or_default();
        hex::encode(Sha256::digest(&canonical))
    }

    /// Computes the fingerprint of a single stage.
    #[must_use]
    pub fn fingerprint_stage(&self, stage: &DeploymentStage) -> String {
        let mut hasher = Sha256::new();

        hasher.update(stage.name.as_bytes());
        hasher.update(stage.description.as_bytes());
        for (name, value) in &stage.variables {
            hasher.update(name.as_bytes());
            hasher.update([u8::from(value.is_some())]);
            if let Some(value) = value {
                hasher.update(value.as_bytes());
            }
        }
        hasher.update([u8::from(stage.cache)]);
        if let Some(size) = stage.effective_cache_size() {
            hasher.update(size.as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Returns a short form of a fingerprint suitable for display.
    #[must_use]
    pub fn short(fingerprint: &str) -> &str {
        fingerprint.get(..12).unwrap_or(fingerprint)
    }
}
