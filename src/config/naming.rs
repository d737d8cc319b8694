//! Fallback function name derivation.

use std::path::{Component, Path};
use tracing::debug;

/// Prefix prepended to a derived function name.
pub const FUNCTION_NAME_PREFIX: &str = "aegis_";

/// Function name used when nothing better can be derived.
pub const FALLBACK_FUNCTION_NAME: &str = "aegis_function";

/// Derives a function name from a directory path.
///
/// The last normal path segment is prefixed with [`FUNCTION_NAME_PREFIX`].
/// An empty path, the root, or a path ending in `..` yields
/// [`FALLBACK_FUNCTION_NAME`].
#[must_use]
pub fn derive_function_name(path: &Path) -> String {
    match path.components().next_back() {
        Some(Component::Normal(segment)) => {
            let segment = segment.to_string_lossy();
            if segment.is_empty() {
                String::from(FALLBACK_FUNCTION_NAME)
            } else {
                format!("{FUNCTION_NAME_PREFIX}{segment}")
            }
        }
        _ => String::from(FALLBACK_FUNCTION_NAME),
    }
}

/// Derives a function name from the process working directory.
///
/// Any failure to read the working directory falls back to
/// [`FALLBACK_FUNCTION_NAME`] instead of propagating.
#[must_use]
pub fn function_name_from_cwd() -> String {
    match std::env::current_dir() {
        Ok(dir) => derive_function_name(&dir),
        Err(e) => {
            debug!("Cannot read working directory, using fallback function name: {e}");
            String::from(FALLBACK_FUNCTION_NAME)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_and_empty_use_fallback() {
        assert_eq!(derive_function_name(Path::new("/")), "aegis_function");
        assert_eq!(derive_function_name(Path::new("")), "aegis_function");
    }

    #[test]
    fn test_last_segment_is_prefixed() {
        assert_eq!(
            derive_function_name(Path::new("/home/dev/projects/my-service")),
            "aegis_my-service"
        );
        assert_eq!(derive_function_name(Path::new("my-service")), "aegis_my-service");
    }

    #[test]
    fn test_trailing_separator_is_ignored() {
        assert_eq!(derive_function_name(Path::new("/srv/api/")), "aegis_api");
    }

    #[test]
    fn test_parent_reference_uses_fallback() {
        assert_eq!(derive_function_name(Path::new("/srv/api/..")), "aegis_function");
    }

    #[test]
    fn test_cwd_name_is_never_empty() {
        assert!(function_name_from_cwd().starts_with(FUNCTION_NAME_PREFIX));
    }
}
