//! Declarative feature conditions attached to template nodes.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::options::{Auth, Crud, Database, Flag, Messaging, NormalizedOptions, Operation};

/// An enumerated option a condition can compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKey {
    Database,
    Messaging,
    Auth,
    Crud,
}

impl OptionKey {
    fn current<'a>(&self, options: &'a NormalizedOptions) -> &'a str {
        match self {
            OptionKey::Database => options.database.as_str(),
            OptionKey::Messaging => options.messaging.as_str(),
            OptionKey::Auth => options.auth.as_str(),
            OptionKey::Crud => options.crud.as_str(),
        }
    }

    /// Checks that `value` belongs to this option's domain.
    fn check(&self, value: &str) -> Result<()> {
        match self {
            OptionKey::Database => Database::from_str(value).map(|_| ()),
            OptionKey::Messaging => Messaging::from_str(value).map(|_| ()),
            OptionKey::Auth => Auth::from_str(value).map(|_| ()),
            OptionKey::Crud => Crud::from_str(value).map(|_| ()),
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptionKey::Database => "database",
            OptionKey::Messaging => "messaging",
            OptionKey::Auth => "auth",
            OptionKey::Crud => "crud",
        };
        f.write_str(name)
    }
}

/// A predicate over [`NormalizedOptions`].
///
/// In a manifest these read as
/// ```yaml
/// - equals: { option: database, value: oracle }
/// - any_of: { option: messaging, values: [producer, both] }
/// - not_flag: skip_tests
/// - operation: delete
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Equals { option: OptionKey, value: String },
    NotEquals { option: OptionKey, value: String },
    AnyOf { option: OptionKey, values: Vec<String> },
    Flag(Flag),
    NotFlag(Flag),
    Operation(Operation),
}

impl Condition {
    pub fn evaluate(&self, options: &NormalizedOptions) -> bool {
        match self {
            Condition::Equals { option, value } => option.current(options) == value,
            Condition::NotEquals { option, value } => option.current(options) != value,
            Condition::AnyOf { option, values } => {
                let current = option.current(options);
                values.iter().any(|value| value == current)
            }
            Condition::Flag(flag) => options.flag(*flag),
            Condition::NotFlag(flag) => !options.flag(*flag),
            Condition::Operation(operation) => options.has_operation(*operation),
        }
    }

    /// Rejects comparisons against values the option can never take, and
    /// lowercases the accepted ones so evaluation is a plain string compare.
    /// `flat`, `dry_run` and `force` are rejected: a preview and a commit must
    /// select the same files.
    pub fn validated(self) -> Result<Self> {
        let canonical = |option: OptionKey, value: String| -> Result<String> {
            option.check(&value)?;
            Ok(value.trim().to_lowercase())
        };

        Ok(match self {
            Condition::Equals { option, value } => Condition::Equals {
                option,
                value: canonical(option, value)?,
            },
            Condition::NotEquals { option, value } => Condition::NotEquals {
                option,
                value: canonical(option, value)?,
            },
            Condition::AnyOf { option, values } => Condition::AnyOf {
                option,
                values: values
                    .into_iter()
                    .map(|value| canonical(option, value))
                    .collect::<Result<Vec<_>>>()?,
            },
            Condition::Flag(flag) | Condition::NotFlag(flag) if flag.is_run_mode() => {
                return Err(Error::invalid_options(
                    "flag",
                    format!("'{}' is a run-mode switch and cannot gate templates", flag.as_str()),
                ));
            }
            other => other,
        })
    }
}

/// True when every condition holds; an empty set is always satisfied.
pub fn all_hold(conditions: &[Condition], options: &NormalizedOptions) -> bool {
    conditions.iter().all(|condition| condition.evaluate(options))
}
