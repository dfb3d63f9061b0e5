//! Error handling for hexforge.
//! Defines the error taxonomy of the generation pipeline and the result alias
//! used throughout the crate.

use std::io;
use thiserror::Error;

/// Errors raised by the generation pipeline.
///
/// Every variant that refers to a file carries the offending template or
/// destination path so the failure can be traced back to its source.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed user input, reported before any file is touched.
    #[error("Invalid options: {field}: {message}.")]
    InvalidOptions { field: String, message: String },

    /// The requested schematic does not exist in the template library.
    #[error("Unknown schematic '{name}' (available: {available}).")]
    UnknownSchematic { name: String, available: String },

    /// A schematic manifest or one of its rules could not be understood.
    #[error("Manifest error in '{path}': {message}.")]
    Manifest { path: String, message: String },

    /// A placeholder could not be evaluated or the template is malformed.
    #[error("Template error in '{template}': {message}.")]
    TemplateRender { template: String, message: String },

    /// A destination or resolved path would leave the workspace root.
    #[error("Path '{path}' escapes the workspace root.")]
    PathEscape { path: String },

    /// Collapsing directories for a flat layout mapped two templates onto one file.
    #[error("Flat layout maps both '{first}' and '{second}' to '{path}'.")]
    FlatCollision {
        path: String,
        first: String,
        second: String,
    },

    /// Files already exist at target paths and the commit was not forced.
    #[error("Destination already contains '{}'.", .paths.join("', '"))]
    DestinationConflict { paths: Vec<String> },

    /// Two rendered files resolved to the same output path within a single run.
    #[error("Duplicate output path '{path}'.")]
    DuplicateOutputPath { path: String },

    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid_options<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Error::InvalidOptions {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn template_render<T: Into<String>, M: ToString>(template: T, message: M) -> Self {
        Error::TemplateRender {
            template: template.into(),
            message: message.to_string(),
        }
    }
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The error to handle
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}
