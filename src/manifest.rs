//! Schematic manifest handling.
//! A manifest describes one schematic: where its output goes by default, which
//! options it requires, and which feature conditions gate which parts of its
//! template tree. Supports JSON and YAML formats (schematic.json, schematic.yml,
//! schematic.yaml).

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;

use crate::condition::Condition;
use crate::constants::MANIFEST_FILES;
use crate::error::{Error, Result};
use crate::options::Operation;

/// A set of template paths and the conditions they all share.
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    /// Glob patterns over template-relative paths.
    pub paths: Vec<String>,
    #[serde(default)]
    pub when: Vec<Condition>,
}

/// Deserialized form of `schematic.{json,yml,yaml}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default_path: String,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Files each operation gates. Configuration data, not engine logic.
    #[serde(default)]
    pub operations: IndexMap<Operation, Vec<String>>,
}

/// A rule with its patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    matcher: GlobSet,
    conditions: Vec<Condition>,
}

impl CompiledRule {
    pub fn is_match(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

fn compile_globs(origin: &str, patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| Error::Manifest {
            path: origin.to_string(),
            message: format!("invalid pattern '{pattern}': {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| Error::Manifest {
        path: origin.to_string(),
        message: e.to_string(),
    })
}

impl Manifest {
    /// Loads the first manifest file found in `schematic_dir`.
    ///
    /// # Errors
    /// * `Error::Manifest` if no manifest exists or it cannot be parsed
    pub fn load<P: AsRef<Path>>(schematic_dir: P) -> Result<Self> {
        let schematic_dir = schematic_dir.as_ref();
        for file in MANIFEST_FILES {
            let manifest_path = schematic_dir.join(file);
            if manifest_path.exists() {
                debug!("Loading manifest from {}", manifest_path.display());
                let content = std::fs::read_to_string(&manifest_path)?;
                return Self::parse(&manifest_path.display().to_string(), &content);
            }
        }

        Err(Error::Manifest {
            path: schematic_dir.display().to_string(),
            message: format!("no manifest found (tried: {})", MANIFEST_FILES.join(", ")),
        })
    }

    /// Parses manifest content, trying JSON first and YAML second.
    ///
    /// Both formats go through a `serde_json::Value` so conditions are read
    /// the same way from either: a single-key map such as `not_flag: skip_tests`.
    pub fn parse(origin: &str, content: &str) -> Result<Self> {
        let raw_value: serde_json::Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(_) => serde_yaml::from_str(content).map_err(|e| Error::Manifest {
                path: origin.to_string(),
                message: format!("invalid manifest format: {e}"),
            })?,
        };
        let raw_value = if raw_value.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            raw_value
        };

        let manifest: Manifest = serde_json::from_value(raw_value).map_err(|e| Error::Manifest {
            path: origin.to_string(),
            message: format!("invalid manifest schema: {e}"),
        })?;
        manifest.validated(origin)
    }

    fn validated(mut self, origin: &str) -> Result<Self> {
        self.rules = self
            .rules
            .into_iter()
            .map(|rule| {
                let when = rule
                    .when
                    .into_iter()
                    .map(|condition| {
                        condition.validated().map_err(|e| Error::Manifest {
                            path: origin.to_string(),
                            message: e.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Rule {
                    paths: rule.paths,
                    when,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    /// Compiles explicit rules and the operation mapping into matchers.
    pub fn compile_rules(&self, origin: &str) -> Result<Vec<CompiledRule>> {
        let explicit = self.rules.iter().map(|rule| {
            Ok(CompiledRule {
                matcher: compile_globs(origin, &rule.paths)?,
                conditions: rule.when.clone(),
            })
        });
        let operations = self.operations.iter().map(|(operation, paths)| {
            Ok(CompiledRule {
                matcher: compile_globs(origin, paths)?,
                conditions: vec![Condition::Operation(*operation)],
            })
        });
        explicit.chain(operations).collect()
    }
}
