//! Template selection.
//! Picks the files of a template tree whose feature conditions, and those of
//! every enclosing directory, hold for the normalized options.

use std::collections::HashMap;

use log::debug;

use crate::condition::{all_hold, Condition};
use crate::options::NormalizedOptions;
use crate::source::TemplateNode;

/// Yields each proper ancestor of a slash separated path, nearest last.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').map(move |(index, _)| &path[..index])
}

/// Selects the file nodes to generate, ordered lexically by path.
///
/// Directories are traversal structure only: they never appear in the result,
/// but a condition on a directory gates every file below it.
pub fn select<'a>(nodes: &'a [TemplateNode], options: &NormalizedOptions) -> Vec<&'a TemplateNode> {
    let directories: HashMap<&str, &[Condition]> = nodes
        .iter()
        .filter(|node| !node.is_file())
        .map(|node| (node.path.as_str(), node.conditions.as_slice()))
        .collect();

    let mut selected: Vec<&TemplateNode> = nodes
        .iter()
        .filter(|node| node.is_file())
        .filter(|node| {
            let inherited = ancestors(&node.path).all(|dir| {
                directories
                    .get(dir)
                    .map_or(true, |conditions| all_hold(conditions, options))
            });
            let included = inherited && all_hold(&node.conditions, options);
            if !included {
                debug!("Skipping template {}", node.path);
            }
            included
        })
        .collect();

    selected.sort_by(|a, b| a.path.cmp(&b.path));
    selected
}
