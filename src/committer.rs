//! Committing a staging tree to disk.
//! A commit is all-or-nothing: conflicts are checked before the first write,
//! and a failed write rolls back every file and directory the commit touched.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error};
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::staging::StagingTree;

/// Per-path write locks shared by every commit in the process.
static WRITE_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = Lazy::new(Default::default);

fn locks_for(paths: &[PathBuf]) -> Vec<Arc<Mutex<()>>> {
    let mut registry = WRITE_LOCKS.lock();
    paths
        .iter()
        .map(|path| registry.entry(path.clone()).or_default().clone())
        .collect()
}

/// Drops registry entries no other commit holds or waits on.
fn release_locks(paths: &[PathBuf]) {
    let mut registry = WRITE_LOCKS.lock();
    for path in paths {
        if registry.get(path).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            registry.remove(path);
        }
    }
}

/// What to do with target files that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Abort the whole commit.
    #[default]
    Fail,
    /// Overwrite existing files.
    Force,
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Files that did not exist before.
    pub created: Vec<String>,
    /// Files replaced under [`ConflictPolicy::Force`].
    pub overwritten: Vec<String>,
}

impl CommitReport {
    pub fn written(&self) -> usize {
        self.created.len() + self.overwritten.len()
    }
}

/// Everything a commit changed, so it can be undone.
#[derive(Default)]
struct Journal {
    created_dirs: Vec<PathBuf>,
    created_files: Vec<PathBuf>,
    overwritten: Vec<(PathBuf, Vec<u8>)>,
}

impl Journal {
    fn rollback(self) {
        for (path, original) in self.overwritten.into_iter().rev() {
            if let Err(e) = fs::write(&path, original) {
                error!("Rollback could not restore {}: {e}", path.display());
            }
        }
        for path in self.created_files.into_iter().rev() {
            if let Err(e) = fs::remove_file(&path) {
                error!("Rollback could not remove {}: {e}", path.display());
            }
        }
        for path in self.created_dirs.into_iter().rev() {
            if let Err(e) = fs::remove_dir(&path) {
                error!("Rollback could not remove {}: {e}", path.display());
            }
        }
    }
}

/// Writes staging trees under a workspace root.
pub struct Committer {
    workspace_root: PathBuf,
    policy: ConflictPolicy,
}

impl Committer {
    pub fn new<P: AsRef<Path>>(workspace_root: P, policy: ConflictPolicy) -> Self {
        Self {
            workspace_root: workspace_root.as_ref().to_path_buf(),
            policy,
        }
    }

    /// Lists staged paths the commit cannot write under the current policy.
    ///
    /// Existing files conflict unless forced. An existing directory at a
    /// file's path, or a file where a directory is needed, always conflicts.
    pub fn conflicts(&self, tree: &StagingTree) -> Vec<String> {
        let mut conflicts = Vec::new();
        for path in tree.paths() {
            let target = self.workspace_root.join(path);
            let blocked_parent = Path::new(path)
                .ancestors()
                .skip(1)
                .filter(|ancestor| !ancestor.as_os_str().is_empty())
                .any(|ancestor| self.workspace_root.join(ancestor).is_file());

            let conflicting = if blocked_parent || target.is_dir() {
                true
            } else {
                target.exists() && self.policy == ConflictPolicy::Fail
            };
            if conflicting {
                conflicts.push(path.to_string());
            }
        }
        conflicts
    }

    /// Writes every staged file, or nothing at all.
    ///
    /// # Errors
    /// * `Error::DestinationConflict` if a target path is occupied and the
    ///   policy forbids overwriting it
    /// * `Error::Io` if a write fails; the commit is rolled back first
    pub fn commit(&self, tree: StagingTree) -> Result<CommitReport> {
        let mut targets: Vec<PathBuf> = tree.paths().map(|path| self.workspace_root.join(path)).collect();
        targets.sort();
        let locks = locks_for(&targets);
        let result = {
            let _guards: Vec<_> = locks.iter().map(|lock| lock.lock()).collect();
            self.commit_locked(tree)
        };
        drop(locks);
        release_locks(&targets);
        result
    }

    fn commit_locked(&self, tree: StagingTree) -> Result<CommitReport> {
        let conflicts = self.conflicts(&tree);
        if !conflicts.is_empty() {
            return Err(Error::DestinationConflict { paths: conflicts });
        }

        let mut journal = Journal::default();
        let mut report = CommitReport::default();
        for (path, content) in tree {
            if let Err(e) = self.write(&path, &content, &mut journal, &mut report) {
                error!("Writing {path} failed, rolling back: {e}");
                journal.rollback();
                return Err(e);
            }
        }
        Ok(report)
    }

    fn write(
        &self,
        path: &str,
        content: &str,
        journal: &mut Journal,
        report: &mut CommitReport,
    ) -> Result<()> {
        let target = self.workspace_root.join(path);

        if let Some(parent) = target.parent() {
            let missing: Vec<&Path> = parent
                .ancestors()
                .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
                .collect();
            for dir in missing.into_iter().rev() {
                match fs::create_dir(dir) {
                    Ok(()) => journal.created_dirs.push(dir.to_path_buf()),
                    // Another commit created it first; it is not ours to roll back.
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        if target.exists() {
            let original = fs::read(&target)?;
            journal.overwritten.push((target.clone(), original));
            fs::write(&target, content)?;
            debug!("Overwrote {path}");
            report.overwritten.push(path.to_string());
        } else {
            journal.created_files.push(target.clone());
            fs::write(&target, content)?;
            debug!("Created {path}");
            report.created.push(path.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::RenderedFile;
    use tempfile::TempDir;

    #[test]
    fn test_lock_registry_is_emptied_after_commit() {
        let workspace = TempDir::new().unwrap();
        let tree = StagingTree::from_files(vec![RenderedFile {
            final_path: "a/b.ts".to_string(),
            content: "b".to_string(),
            template_path: "a/b.ts".to_string(),
        }])
        .unwrap();

        Committer::new(workspace.path(), ConflictPolicy::Fail)
            .commit(tree)
            .unwrap();
        assert!(!WRITE_LOCKS.lock().contains_key(&workspace.path().join("a/b.ts")));
    }
}
