//! The generation pipeline.
//! Chains option normalization, selection, rendering, path resolution and
//! staging into one run per request, then either previews the staged tree
//! (dry run) or hands it to the committer.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::committer::{CommitReport, Committer, ConflictPolicy};
use crate::error::{Error, Result};
use crate::options::{normalize, NormalizeSettings, NormalizedOptions, RawOptions};
use crate::renderer::{render_nodes, ExpressionRenderer, TemplateRenderer};
use crate::resolver::resolve_paths;
use crate::selector::select;
use crate::source::{Schematic, TemplateLibrary};
use crate::staging::{PlannedWrite, StagingTree, WriteAction};

/// A staged run: the options it used, the tree it produced, and the files
/// that failed to render.
#[derive(Debug)]
pub struct Staged {
    pub options: NormalizedOptions,
    pub tree: StagingTree,
    pub failures: Vec<Error>,
}

/// Dry-run result: the staged tree and what committing it would do.
#[derive(Debug)]
pub struct Preview {
    pub options: NormalizedOptions,
    pub tree: StagingTree,
    pub writes: Vec<PlannedWrite>,
    /// Paths the commit would refuse to write. Empty when it would succeed.
    pub conflicts: Vec<String>,
    /// Templates that failed to render; their files are missing from `tree`.
    pub failures: Vec<Error>,
}

/// Result of [`Engine::generate`].
#[derive(Debug)]
pub enum Generation {
    Preview(Preview),
    Committed(CommitReport),
}

/// Generates source trees from a template library into a workspace.
pub struct Engine {
    library: TemplateLibrary,
    workspace_root: PathBuf,
    renderer: Box<dyn TemplateRenderer + Send + Sync>,
}

impl Engine {
    pub fn new<P: AsRef<Path>>(library: TemplateLibrary, workspace_root: P) -> Self {
        Self {
            library,
            workspace_root: workspace_root.as_ref().to_path_buf(),
            renderer: Box::new(ExpressionRenderer::new()),
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn TemplateRenderer + Send + Sync>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Validates raw options against a schematic's requirements.
    pub fn normalize(&self, schematic: &Schematic, raw: &RawOptions) -> Result<NormalizedOptions> {
        let settings = NormalizeSettings {
            required: &schematic.manifest.required,
            default_path: &schematic.manifest.default_path,
            workspace_root: Some(&self.workspace_root),
        };
        normalize(raw, &settings)
    }

    /// Runs every stage up to and including staging. Nothing touches disk.
    ///
    /// Render failures are collected rather than returned so a dry run can
    /// report them next to the files that did render.
    pub fn stage(&self, schematic_name: &str, raw: &RawOptions) -> Result<Staged> {
        let schematic = self.library.get(schematic_name)?;
        let options = self.normalize(schematic, raw)?;

        let selected = select(&schematic.nodes, &options);
        debug!("Selected {} of {} template nodes", selected.len(), schematic.nodes.len());

        let outcome = render_nodes(&*self.renderer, &selected, &options);
        let files = resolve_paths(outcome.rendered, &options)?;
        let tree = StagingTree::from_files(files)?;
        debug!("Staged {} files", tree.len());

        Ok(Staged {
            options,
            tree,
            failures: outcome.failures,
        })
    }

    fn committer(&self, options: &NormalizedOptions) -> Committer {
        let policy = if options.force {
            ConflictPolicy::Force
        } else {
            ConflictPolicy::Fail
        };
        Committer::new(&self.workspace_root, policy)
    }

    /// Previews a staged run without writing anything.
    ///
    /// Paths the commit would reject under the run's conflict policy are
    /// planned as [`WriteAction::Conflict`] and listed in `conflicts`.
    pub fn preview(&self, staged: Staged) -> Result<Preview> {
        let conflicts = self.committer(&staged.options).conflicts(&staged.tree);
        let mut writes = staged.tree.plan(&self.workspace_root)?;
        for write in &mut writes {
            if conflicts.contains(&write.path) {
                write.action = WriteAction::Conflict;
            }
        }
        if !conflicts.is_empty() {
            warn!("Commit would conflict on {} paths", conflicts.len());
        }

        Ok(Preview {
            options: staged.options,
            tree: staged.tree,
            writes,
            conflicts,
            failures: staged.failures,
        })
    }

    /// Commits a staged run. Any render failure aborts before the first write.
    pub fn commit(&self, staged: Staged) -> Result<CommitReport> {
        if let Some(failure) = staged.failures.into_iter().next() {
            return Err(failure);
        }
        self.committer(&staged.options).commit(staged.tree)
    }

    /// Single entry point: generates `schematic_name` with `raw` options,
    /// previewing when `dry_run` is set and committing otherwise.
    pub fn generate(&self, schematic_name: &str, raw: &RawOptions) -> Result<Generation> {
        let staged = self.stage(schematic_name, raw)?;
        if staged.options.dry_run {
            self.preview(staged).map(Generation::Preview)
        } else {
            self.commit(staged).map(Generation::Committed)
        }
    }
}
