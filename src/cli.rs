//! Command-line interface implementation for hexforge.
//! Provides argument parsing and help text formatting using clap, and maps the
//! parsed flags onto the raw option map the engine consumes.

use clap::{error::ErrorKind, CommandFactory, Parser};
use std::io::Read;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::options::RawOptions;

/// Template library bundled with the crate.
pub const DEFAULT_TEMPLATES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates");

/// Command-line arguments structure for hexforge.
#[derive(Parser, Debug)]
#[command(author, version, about = "hexforge: schematic-driven source tree generator", long_about = None)]
pub struct Args {
    /// Schematic to generate (e.g. application, hexagonal-module)
    #[arg(value_name = "SCHEMATIC")]
    pub schematic: String,

    /// Name of the generated module or application
    #[arg(value_name = "NAME")]
    pub name: Option<String>,

    /// Database backend: oracle, mssql, mongodb or none
    #[arg(short, long)]
    pub database: Option<String>,

    /// Kafka messaging mode: none, producer, consumer or both
    #[arg(short, long, alias = "kafka")]
    pub messaging: Option<String>,

    /// Authentication mode: none, jwt or oauth2
    #[arg(short, long)]
    pub auth: Option<String>,

    /// CRUD strategy: stored-proc, orm or mixed
    #[arg(short, long)]
    pub crud: Option<String>,

    /// Comma separated operations: select,insert,update,delete
    #[arg(short, long)]
    pub operations: Option<String>,

    /// Destination path relative to the workspace
    #[arg(short, long)]
    pub path: Option<String>,

    /// Place generated files directly in the module directory
    #[arg(long)]
    pub flat: bool,

    /// Do not generate test files
    #[arg(long)]
    pub skip_tests: bool,

    /// Generate database migration files
    #[arg(long)]
    pub apply_migrations: bool,

    /// Report what would be written without touching the disk
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite files that already exist in the workspace
    #[arg(short, long)]
    pub force: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Read additional options as JSON from stdin
    #[arg(short, long)]
    pub stdin: bool,

    /// Template library directory
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Workspace root the destination path is relative to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub workspace: PathBuf,
}

impl Args {
    pub fn templates_dir(&self) -> PathBuf {
        self.templates
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATES_DIR))
    }

    /// Options given on the command line. Unset flags are left out so they
    /// do not mask values read from stdin.
    pub fn raw_options(&self) -> RawOptions {
        let mut options = RawOptions::new();
        let strings = [
            ("name", &self.name),
            ("database", &self.database),
            ("messaging", &self.messaging),
            ("auth", &self.auth),
            ("crud", &self.crud),
            ("operations", &self.operations),
            ("path", &self.path),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                options.insert(key.to_string(), serde_json::Value::String(value.clone()));
            }
        }

        let flags = [
            ("flat", self.flat),
            ("skip_tests", self.skip_tests),
            ("apply_migrations", self.apply_migrations),
            ("dry_run", self.dry_run),
            ("force", self.force),
        ];
        for (key, value) in flags {
            if value {
                options.insert(key.to_string(), serde_json::Value::Bool(true));
            }
        }
        options
    }
}

/// Parses a JSON object of options.
///
/// Empty input yields no options; anything but an object is rejected.
pub fn parse_options_json(content: &str) -> Result<RawOptions> {
    let content = content.trim();
    if content.is_empty() {
        return Ok(RawOptions::new());
    }
    serde_json::from_str(content)
        .map_err(|e| Error::invalid_options("stdin", format!("failed to parse options as JSON: {e}")))
}

/// Reads options from stdin and overlays the command-line ones on top.
pub fn merge_stdin_options(args: &Args) -> Result<RawOptions> {
    let mut options = if args.stdin {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        parse_options_json(&buffer)?
    } else {
        RawOptions::new()
    };
    options.extend(args.raw_options());
    Ok(options)
}

/// Parses command line arguments and returns the Args structure.
///
/// # Returns
/// * `Args` - Parsed command line arguments
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                let printed = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                if printed.is_err() {
                    e.exit();
                }
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
