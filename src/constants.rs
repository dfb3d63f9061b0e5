//! Common constants used throughout hexforge.

/// Supported schematic manifest file names, in lookup order
pub const MANIFEST_FILES: [&str; 3] = ["schematic.json", "schematic.yml", "schematic.yaml"];

/// Directory inside a schematic that holds its template tree
pub const FILES_DIR: &str = "files";

/// Path-segment marker replaced by the module identifier
pub const NAME_TOKEN: &str = "__name__";

/// Suffix marking a file as a template; stripped from the output name
pub const TEMPLATE_SUFFIX: &str = ".j2";

/// Patterns that are never part of a template tree
pub const DEFAULT_IGNORE_PATTERNS: [&str; 3] = ["**/.DS_Store", "**/.gitkeep", "**/Thumbs.db"];
