// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Aegis Deploy
//!
//! Configuration resolution and validation for deploying serverless REST
//! APIs on AWS Lambda behind an API Gateway `ANY` proxy.
//!
//! ## Overview
//!
//! Before anything is provisioned, Aegis resolves a single immutable
//! [`DeploymentDescriptor`] from several layered sources:
//!
//! 1. **Command-line flags**: region, credentials, profile
//! 2. **Configuration file**: `aegis.yaml` (or `.yml` / `.json`)
//! 3. **Environment**: `AEGIS_<SECTION>_<KEY>` variables, including `.env`
//! 4. **Baseline defaults**: a complete descriptor of documented constants
//!
//! Scalars take the highest layer that sets them. Stage maps and variable
//! maps merge key by key, so overriding one stage never drops the others.
//! The merged descriptor is normalized (every stage is named after its key)
//! and validated; all violations are reported together and any of them stops
//! the run before provisioning.
//!
//! ## Modules
//!
//! - [`config`]: Loading, merging, normalization and validation
//! - [`error`]: Error types
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! lambda:
//!   functionName: my_api
//!   memorySize: 256
//!   environmentVariables:
//!     DB_HOST: db.internal
//! api:
//!   stages:
//!     prod:
//!       cache: true
//!       cacheSize: "0.5"
//!     dev:
//!       description: development stage
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{
    ConfigLoader, ConfigResolver, ConfigValidator, DeploymentDescriptor, DescriptorHasher,
    Overrides, Resolution,
};
pub use error::{AegisError, Result};
