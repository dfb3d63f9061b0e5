//! Option normalization.
//! Turns the raw option map supplied by a caller into the immutable
//! [`NormalizedOptions`] record every later pipeline stage reads.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use cruet::Inflector;
use indexmap::IndexMap;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Raw options as supplied by the CLI, stdin or a library caller.
pub type RawOptions = IndexMap<String, serde_json::Value>;

static IDENTIFIER_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]").unwrap());

macro_rules! option_enum {
    ($(#[$meta:meta])* $name:ident, $field:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every accepted spelling, in declaration order.
            pub const VALUES: &'static [&'static str] = &[$($text),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::invalid_options(
                        $field,
                        format!("unknown value '{}' (expected one of: {})", other, Self::VALUES.join(", ")),
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

option_enum!(
    /// Persistence backend of the generated module.
    Database, "database" {
        Oracle => "oracle",
        Mssql => "mssql",
        Mongodb => "mongodb",
        None => "none",
    }
);

option_enum!(
    /// Kafka messaging role of the generated module.
    Messaging, "messaging" {
        None => "none",
        Producer => "producer",
        Consumer => "consumer",
        Both => "both",
    }
);

option_enum!(
    /// Authentication guard wired into the generated module.
    Auth, "auth" {
        None => "none",
        Jwt => "jwt",
        Oauth2 => "oauth2",
    }
);

option_enum!(
    /// How repository adapters talk to the database.
    Crud, "crud" {
        StoredProc => "stored-proc",
        Orm => "orm",
        Mixed => "mixed",
    }
);

option_enum!(
    /// A CRUD operation the generated module exposes.
    Operation, "operations" {
        Select => "select",
        Insert => "insert",
        Update => "update",
        Delete => "delete",
    }
);

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Select,
        Operation::Insert,
        Operation::Update,
        Operation::Delete,
    ];
}

/// Boolean switches available to templates and conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    SkipTests,
    Flat,
    DryRun,
    ApplyMigrations,
    Force,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::SkipTests => "skip_tests",
            Flag::Flat => "flat",
            Flag::DryRun => "dry_run",
            Flag::ApplyMigrations => "apply_migrations",
            Flag::Force => "force",
        }
    }

    /// Switches that change how a run lays out or writes files, never which files exist.
    pub fn is_run_mode(&self) -> bool {
        matches!(self, Flag::Flat | Flag::DryRun | Flag::Force)
    }
}

/// Identifier variants derived from the raw name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameVariants {
    /// `PaymentGateway`
    pub class: String,
    /// `payment-gateway`
    pub dash: String,
    /// `paymentGateway`
    pub camel: String,
    /// `payment_gateway`
    pub snake: String,
    /// `PAYMENT_GATEWAY`
    pub constant: String,
}

impl NameVariants {
    pub fn from_name(name: &str) -> Self {
        NameVariants {
            class: name.to_pascal_case(),
            dash: name.to_kebab_case(),
            camel: name.to_camel_case(),
            snake: name.to_snake_case(),
            constant: name.to_screaming_snake_case(),
        }
    }
}

/// Canonical, immutable parameter set for a single generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedOptions {
    pub name: String,
    pub names: NameVariants,
    /// Destination relative to the workspace root, `/`-separated, empty for the root itself.
    pub path: String,
    pub database: Database,
    pub messaging: Messaging,
    pub auth: Auth,
    pub crud: Crud,
    pub operations: BTreeSet<Operation>,
    pub skip_tests: bool,
    pub flat: bool,
    pub dry_run: bool,
    pub apply_migrations: bool,
    pub force: bool,
}

impl NormalizedOptions {
    pub fn flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::SkipTests => self.skip_tests,
            Flag::Flat => self.flat,
            Flag::DryRun => self.dry_run,
            Flag::ApplyMigrations => self.apply_migrations,
            Flag::Force => self.force,
        }
    }

    pub fn has_operation(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }
}

/// What a schematic asks of the normalizer.
#[derive(Debug, Clone, Default)]
pub struct NormalizeSettings<'a> {
    /// Option keys that must be present and non-empty besides `name`.
    pub required: &'a [String],
    /// Destination used when the caller does not supply one.
    pub default_path: &'a str,
    /// Root absolute destinations must stay within.
    pub workspace_root: Option<&'a Path>,
}

/// Maps an incoming option key onto its canonical snake_case name.
fn canonical_key(key: &str) -> String {
    let key = key.to_snake_case();
    match key.as_str() {
        "kafka" => "messaging".to_string(),
        "auth_mode" => "auth".to_string(),
        "crud_mode" => "crud".to_string(),
        "db" => "database".to_string(),
        "ops" => "operations".to_string(),
        _ => key,
    }
}

const KNOWN_KEYS: [&str; 13] = [
    "name",
    "path",
    "database",
    "messaging",
    "auth",
    "crud",
    "operations",
    "skip_tests",
    "flat",
    "dry_run",
    "apply_migrations",
    "force",
    "schematic",
];

fn canonicalize(raw: &RawOptions) -> IndexMap<String, serde_json::Value> {
    let mut options = IndexMap::new();
    for (key, value) in raw {
        let canonical = canonical_key(key);
        if !KNOWN_KEYS.contains(&canonical.as_str()) {
            warn!("Ignoring unknown option '{key}'");
            continue;
        }
        if value.is_null() {
            continue;
        }
        options.insert(canonical, value.clone());
    }
    options
}

fn string_value(field: &str, value: &serde_json::Value) -> Result<String> {
    match value {
        serde_json::Value::String(s) => Ok(s.trim().to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| string_value(field, item))
            .collect::<Result<Vec<_>>>()
            .map(|parts| parts.join(",")),
        _ => Err(Error::invalid_options(field, "expected a string")),
    }
}

fn bool_value(field: &str, value: &serde_json::Value) -> Result<bool> {
    match value {
        serde_json::Value::Bool(b) => Ok(*b),
        serde_json::Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" | "" => Ok(false),
            other => Err(Error::invalid_options(
                field,
                format!("expected a boolean, got '{other}'"),
            )),
        },
        serde_json::Value::Number(n) if n.as_u64() == Some(0) => Ok(false),
        serde_json::Value::Number(n) if n.as_u64() == Some(1) => Ok(true),
        _ => Err(Error::invalid_options(field, "expected a boolean")),
    }
}

fn optional_string(options: &IndexMap<String, serde_json::Value>, field: &str) -> Result<Option<String>> {
    options
        .get(field)
        .map(|value| string_value(field, value))
        .transpose()
        .map(|value| value.filter(|s| !s.is_empty()))
}

fn parse_or_default<T: FromStr<Err = Error>>(
    options: &IndexMap<String, serde_json::Value>,
    field: &str,
    default: T,
) -> Result<T> {
    match optional_string(options, field)? {
        Some(value) => value.parse(),
        None => Ok(default),
    }
}

fn flag_value(options: &IndexMap<String, serde_json::Value>, field: &str) -> Result<bool> {
    options
        .get(field)
        .map(|value| bool_value(field, value))
        .transpose()
        .map(|value| value.unwrap_or(false))
}

/// Parses a comma separated operation list.
///
/// Duplicates collapse and an empty list selects every operation.
pub fn parse_operations(list: &str) -> Result<BTreeSet<Operation>> {
    let operations = list
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Operation::from_str)
        .collect::<Result<BTreeSet<_>>>()?;

    if operations.is_empty() {
        Ok(Operation::ALL.into_iter().collect())
    } else {
        Ok(operations)
    }
}

/// Resolves a relative workspace root against the current directory,
/// folding `.` and `..` without touching the filesystem.
fn absolute_root(root: &Path) -> Result<PathBuf> {
    let joined = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()?.join(root)
    };

    let mut absolute = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                absolute.pop();
            }
            other => absolute.push(other),
        }
    }
    Ok(absolute)
}

/// Normalizes a destination path relative to the workspace root.
///
/// Backslashes become slashes, `.` segments vanish and `..` may not climb
/// above the root. Absolute paths are accepted only inside `workspace_root`.
pub fn normalize_destination(raw: &str, workspace_root: Option<&Path>) -> Result<String> {
    let unified = raw.trim().replace('\\', "/");
    let escape = || Error::PathEscape {
        path: raw.to_string(),
    };

    let relative = if Path::new(&unified).is_absolute() {
        let root = absolute_root(workspace_root.ok_or_else(escape)?)?;
        let root = root.to_string_lossy().replace('\\', "/");
        let stripped = unified
            .strip_prefix(root.trim_end_matches('/'))
            .ok_or_else(escape)?;
        if !(stripped.is_empty() || stripped.starts_with('/')) {
            return Err(escape());
        }
        stripped.trim_start_matches('/').to_string()
    } else {
        unified
    };

    let mut segments: Vec<String> = Vec::new();
    for component in Path::new(&relative).components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                if segments.pop().is_none() {
                    return Err(escape());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(escape()),
        }
    }
    Ok(segments.join("/"))
}

/// Validates raw options and derives the canonical parameter set.
///
/// # Errors
/// * `Error::InvalidOptions` for missing required fields or malformed values
/// * `Error::PathEscape` if the destination leaves the workspace root
pub fn normalize(raw: &RawOptions, settings: &NormalizeSettings<'_>) -> Result<NormalizedOptions> {
    let options = canonicalize(raw);

    let name = optional_string(&options, "name")?
        .ok_or_else(|| Error::invalid_options("name", "is required"))?;
    if !IDENTIFIER_CHAR.is_match(&name) {
        return Err(Error::invalid_options(
            "name",
            format!("'{name}' must contain at least one letter or digit"),
        ));
    }

    for field in settings.required {
        let field = canonical_key(field);
        if optional_string(&options, &field)?.is_none() {
            return Err(Error::invalid_options(field, "is required"));
        }
    }

    let path = match optional_string(&options, "path")? {
        Some(path) => normalize_destination(&path, settings.workspace_root)?,
        None => normalize_destination(settings.default_path, settings.workspace_root)?,
    };

    let operations = parse_operations(&optional_string(&options, "operations")?.unwrap_or_default())?;

    let normalized = NormalizedOptions {
        names: NameVariants::from_name(&name),
        name,
        path,
        database: parse_or_default(&options, "database", Database::None)?,
        messaging: parse_or_default(&options, "messaging", Messaging::None)?,
        auth: parse_or_default(&options, "auth", Auth::None)?,
        crud: parse_or_default(&options, "crud", Crud::Orm)?,
        operations,
        skip_tests: flag_value(&options, "skip_tests")?,
        flat: flag_value(&options, "flat")?,
        dry_run: flag_value(&options, "dry_run")?,
        apply_migrations: flag_value(&options, "apply_migrations")?,
        force: flag_value(&options, "force")?,
    };
    debug!("Normalized options: {normalized:?}");
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_key_aliases() {
        assert_eq!(canonical_key("skipTests"), "skip_tests");
        assert_eq!(canonical_key("skip-tests"), "skip_tests");
        assert_eq!(canonical_key("kafka"), "messaging");
        assert_eq!(canonical_key("crudMode"), "crud");
    }

    #[test]
    fn test_enum_display_round_trip() {
        assert_eq!(Crud::StoredProc.to_string(), "stored-proc");
        assert_eq!("Stored-Proc".parse::<Crud>().unwrap(), Crud::StoredProc);
        assert!("postgres".parse::<Database>().is_err());
    }
}
