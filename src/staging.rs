//! The staging tree.
//! Rendered output accumulates here, keyed by final path, before anything
//! touches real storage. A dry run stops at this stage and previews it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use similar::TextDiff;

use crate::error::{Error, Result};
use crate::resolver::RenderedFile;

/// In-memory mapping from final path to rendered content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingTree {
    entries: BTreeMap<String, String>,
}

impl StagingTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages every file, failing on the first path staged twice.
    pub fn from_files(files: Vec<RenderedFile>) -> Result<Self> {
        let mut tree = Self::new();
        for file in files {
            tree.insert(file)?;
        }
        Ok(tree)
    }

    /// Stages one file.
    ///
    /// # Errors
    /// * `Error::DuplicateOutputPath` if the path is already staged
    pub fn insert(&mut self, file: RenderedFile) -> Result<()> {
        if self.entries.contains_key(&file.final_path) {
            return Err(Error::DuplicateOutputPath {
                path: file.final_path,
            });
        }
        self.entries.insert(file.final_path, file.content);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(path, content)| (path.as_str(), content.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Describes what committing this tree under `workspace_root` would do,
    /// ignoring the conflict policy.
    pub fn plan<P: AsRef<Path>>(&self, workspace_root: P) -> Result<Vec<PlannedWrite>> {
        let workspace_root = workspace_root.as_ref();
        let mut writes = Vec::with_capacity(self.entries.len());

        for (path, content) in &self.entries {
            let target = workspace_root.join(path);
            let (action, diff) = if target.is_file() {
                let existing = std::fs::read_to_string(&target)?;
                if existing == *content {
                    (WriteAction::Unchanged, None)
                } else {
                    let diff = TextDiff::from_lines(existing.as_str(), content.as_str())
                        .unified_diff()
                        .header(&format!("a/{path}"), &format!("b/{path}"))
                        .to_string();
                    (WriteAction::Overwrite, Some(diff))
                }
            } else {
                (WriteAction::Create, None)
            };

            writes.push(PlannedWrite {
                path: path.clone(),
                action,
                bytes: content.len(),
                diff,
            });
        }
        Ok(writes)
    }
}

impl IntoIterator for StagingTree {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// What a commit would do to a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Create,
    Overwrite,
    Unchanged,
    /// The commit would stop with a destination conflict.
    Conflict,
}

impl fmt::Display for WriteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteAction::Create => write!(f, "CREATE"),
            WriteAction::Overwrite => write!(f, "OVERWRITE"),
            WriteAction::Unchanged => write!(f, "UNCHANGED"),
            WriteAction::Conflict => write!(f, "CONFLICT"),
        }
    }
}

/// One entry of a dry-run preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedWrite {
    pub path: String,
    pub action: WriteAction,
    pub bytes: usize,
    /// Unified diff against the existing file, for overwrites.
    pub diff: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> RenderedFile {
        RenderedFile {
            final_path: path.to_string(),
            content: content.to_string(),
            template_path: path.to_string(),
        }
    }

    #[test]
    fn test_duplicate_insert_is_rejected() {
        let mut tree = StagingTree::new();
        tree.insert(file("a/b.ts", "one")).unwrap();
        let err = tree.insert(file("a/b.ts", "two")).unwrap_err();
        assert!(matches!(err, Error::DuplicateOutputPath { path } if path == "a/b.ts"));
        assert_eq!(tree.get("a/b.ts"), Some("one"));
    }

    #[test]
    fn test_paths_are_sorted() {
        let tree = StagingTree::from_files(vec![file("b.ts", ""), file("a.ts", "")]).unwrap();
        assert_eq!(tree.paths().collect::<Vec<_>>(), vec!["a.ts", "b.ts"]);
    }
}
