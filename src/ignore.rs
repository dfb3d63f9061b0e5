//! Ignore pattern handling for template trees.
//! Combines the built-in patterns with the `ignore` list of a schematic
//! manifest to exclude paths from the template source, similar to .gitignore.

use crate::constants::DEFAULT_IGNORE_PATTERNS;
use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::debug;

/// Builds the set of ignore patterns for a schematic.
///
/// # Arguments
/// * `origin` - Manifest path, used in error messages
/// * `patterns` - Extra patterns declared by the manifest
///
/// # Returns
/// * `Result<GlobSet>` - Default and extra patterns compiled into one matcher
///
/// # Errors
/// * `Error::Manifest` if a pattern does not compile
///
/// # Example
/// ```yaml
/// ignore:
///   - "**/*.orig"
///   - "scratch/**"
/// ```
pub fn build_ignore_set(origin: &str, patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();

    let defaults = DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string());
    for pattern in defaults.chain(patterns.iter().cloned()) {
        debug!("Ignore pattern: {pattern}");
        builder.add(Glob::new(&pattern).map_err(|e| Error::Manifest {
            path: origin.to_string(),
            message: format!("invalid ignore pattern '{pattern}': {e}"),
        })?);
    }

    builder.build().map_err(|e| Error::Manifest {
        path: origin.to_string(),
        message: format!("ignore patterns failed to load: {e}"),
    })
}
