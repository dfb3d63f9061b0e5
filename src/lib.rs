//! hexforge is a schematic-driven source tree generator.
//! It selects template files by declarative feature conditions, renders their
//! placeholders, relocates them under a destination and commits the result to
//! disk all at once, or previews it as a dry run.

/// Command-line interface module for the hexforge binary
pub mod cli;

/// Staging tree commit with all-or-nothing semantics
pub mod committer;

/// Feature conditions evaluated against normalized options
pub mod condition;

/// Common constants
pub mod constants;

/// The generation pipeline and its entry point
pub mod engine;

/// Error types and handling
pub mod error;

/// Template ignore patterns
pub mod ignore;

/// Schematic manifests
/// Supports JSON and YAML formats (schematic.json, schematic.yml, schematic.yaml)
pub mod manifest;

/// Raw option validation and normalization
pub mod options;

/// Placeholder rendering for paths and contents
pub mod renderer;

/// Final path resolution and flat layouts
pub mod resolver;

/// Template selection
pub mod selector;

/// Template nodes, sources and the schematic library
pub mod source;

/// In-memory staging of rendered output
pub mod staging;
