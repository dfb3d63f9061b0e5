//! Path resolution.
//! Turns rendered, template-relative paths into final destination-relative
//! paths: substitutes the name token, strips the template suffix, collapses
//! grouping directories for flat layouts and prefixes the destination.

use std::collections::HashMap;

use log::debug;

use crate::constants::{NAME_TOKEN, TEMPLATE_SUFFIX};
use crate::error::{Error, Result};
use crate::options::NormalizedOptions;
use crate::renderer::RenderedTemplate;

/// A rendered file at its final, destination-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub final_path: String,
    pub content: String,
    /// Template the file was generated from.
    pub template_path: String,
}

/// Checks whether the filename carries the template suffix on top of a real extension.
pub fn is_template_file(filename: &str) -> bool {
    let parts: Vec<&str> = filename.split('.').collect();
    parts.len() > 2 && filename.ends_with(TEMPLATE_SUFFIX)
}

/// Checks if a rendered path is usable as a relative output path.
pub fn is_rendered_path_valid(path: &str) -> bool {
    !path.is_empty()
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Relative path segments after token substitution and suffix stripping,
/// plus the index of the module directory if the path has one.
fn substitute(rendered_path: &str, options: &NormalizedOptions) -> Result<(Vec<String>, Option<usize>)> {
    if !is_rendered_path_valid(rendered_path) {
        return Err(Error::PathEscape {
            path: rendered_path.to_string(),
        });
    }

    let raw: Vec<&str> = rendered_path.split('/').collect();
    let module_dir = raw[..raw.len() - 1]
        .iter()
        .position(|segment| segment.contains(NAME_TOKEN));

    let mut segments: Vec<String> = raw
        .iter()
        .map(|segment| segment.replacen(NAME_TOKEN, &options.names.dash, 1))
        .collect();

    if let Some(last) = segments.last_mut() {
        if is_template_file(last) {
            last.truncate(last.len() - TEMPLATE_SUFFIX.len());
        }
    }

    let substituted = segments.join("/");
    if !is_rendered_path_valid(&substituted) {
        return Err(Error::PathEscape { path: substituted });
    }
    Ok((segments, module_dir))
}

fn with_destination(destination: &str, segments: &[String]) -> String {
    let relative = segments.join("/");
    if destination.is_empty() {
        relative
    } else {
        format!("{destination}/{relative}")
    }
}

/// Resolves the final path of one rendered template.
///
/// # Returns
/// * `(final_path, nested_path)` - where the file goes, and where it would go
///   without the flat layout
pub fn resolve_path(rendered_path: &str, options: &NormalizedOptions) -> Result<(String, String)> {
    let (segments, module_dir) = substitute(rendered_path, options)?;
    let nested = with_destination(&options.path, &segments);

    if !options.flat {
        return Ok((nested.clone(), nested));
    }

    let keep = module_dir.map_or(0, |index| index + 1);
    let mut flat: Vec<String> = segments[..keep].to_vec();
    if let Some(file_name) = segments.last() {
        flat.push(file_name.clone());
    }
    Ok((with_destination(&options.path, &flat), nested))
}

/// Relocates rendered templates under the destination.
///
/// # Errors
/// * `Error::PathEscape` for empty, `.` or `..` segments
/// * `Error::FlatCollision` if the flat layout merges two distinct files
pub fn resolve_paths(
    rendered: Vec<RenderedTemplate>,
    options: &NormalizedOptions,
) -> Result<Vec<RenderedFile>> {
    let mut seen: HashMap<String, (String, String)> = HashMap::new();
    let mut files = Vec::with_capacity(rendered.len());

    for template in rendered {
        let (final_path, nested) = resolve_path(&template.path, options)?;

        if options.flat {
            if let Some((first, first_nested)) = seen.get(&final_path) {
                if *first_nested != nested {
                    return Err(Error::FlatCollision {
                        path: final_path,
                        first: first.clone(),
                        second: template.template_path,
                    });
                }
            }
            seen.insert(final_path.clone(), (template.template_path.clone(), nested));
        }

        debug!("Resolved {} -> {}", template.template_path, final_path);
        files.push(RenderedFile {
            final_path,
            content: template.content,
            template_path: template.template_path,
        });
    }
    Ok(files)
}
