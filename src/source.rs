//! Template sources.
//! A template source exposes the read-only tree of template nodes a schematic
//! generates from. Nodes are loaded once and shared by every generation run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use log::debug;
use walkdir::WalkDir;

use crate::condition::Condition;
use crate::constants::FILES_DIR;
use crate::error::{Error, Result};
use crate::ignore::build_ignore_set;
use crate::manifest::{CompiledRule, Manifest};

/// Whether a node is a file (with its raw template text) or a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    File { raw_content: String },
    Directory,
}

/// One file or directory of a template tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateNode {
    /// Slash separated, relative to the template root.
    pub path: String,
    pub kind: NodeKind,
    /// All must hold for the node to be generated.
    pub conditions: Vec<Condition>,
}

impl TemplateNode {
    pub fn file<P: Into<String>, C: Into<String>>(path: P, raw_content: C) -> Self {
        TemplateNode {
            path: path.into(),
            kind: NodeKind::File {
                raw_content: raw_content.into(),
            },
            conditions: Vec::new(),
        }
    }

    pub fn directory<P: Into<String>>(path: P) -> Self {
        TemplateNode {
            path: path.into(),
            kind: NodeKind::Directory,
            conditions: Vec::new(),
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    pub fn raw_content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { raw_content } => Some(raw_content),
            NodeKind::Directory => None,
        }
    }
}

/// Read access to a tree of template nodes.
pub trait TemplateSource {
    /// Lists every node of the tree, directories included.
    fn list_nodes(&self) -> Result<Vec<TemplateNode>>;
}

/// Nodes held in memory, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    nodes: Vec<TemplateNode>,
}

impl MemorySource {
    pub fn new(nodes: Vec<TemplateNode>) -> Self {
        Self { nodes }
    }
}

impl TemplateSource for MemorySource {
    fn list_nodes(&self) -> Result<Vec<TemplateNode>> {
        Ok(self.nodes.clone())
    }
}

/// A schematic directory on disk: a manifest next to a `files/` tree.
pub struct DirectorySource {
    files_root: PathBuf,
    rules: Vec<CompiledRule>,
    ignored: GlobSet,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(schematic_dir: P, manifest: &Manifest) -> Result<Self> {
        let schematic_dir = schematic_dir.as_ref();
        let origin = schematic_dir.display().to_string();
        Ok(Self {
            files_root: schematic_dir.join(FILES_DIR),
            rules: manifest.compile_rules(&origin)?,
            ignored: build_ignore_set(&origin, &manifest.ignore)?,
        })
    }

    fn conditions_for(&self, path: &str) -> Vec<Condition> {
        self.rules
            .iter()
            .filter(|rule| rule.is_match(path))
            .flat_map(|rule| rule.conditions().iter().cloned())
            .collect()
    }
}

fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|e| Error::Manifest {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let segments = relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().map(str::to_string).ok_or_else(|| Error::Manifest {
                path: path.display().to_string(),
                message: "template path is not valid UTF-8".to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(segments.join("/"))
}

impl TemplateSource for DirectorySource {
    fn list_nodes(&self) -> Result<Vec<TemplateNode>> {
        if !self.files_root.is_dir() {
            return Err(Error::Manifest {
                path: self.files_root.display().to_string(),
                message: "template directory does not exist".to_string(),
            });
        }

        let root = &self.files_root;
        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| match relative_path(root, entry.path()) {
                Ok(relative) => !self.ignored.is_match(&relative),
                Err(_) => true,
            });

        let mut nodes = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            let path = relative_path(root, entry.path())?;
            let conditions = self.conditions_for(&path);
            debug!("Template node: {path} ({} conditions)", conditions.len());

            let kind = if entry.file_type().is_dir() {
                NodeKind::Directory
            } else {
                NodeKind::File {
                    raw_content: std::fs::read_to_string(entry.path())?,
                }
            };
            nodes.push(TemplateNode {
                path,
                kind,
                conditions,
            });
        }
        Ok(nodes)
    }
}

/// A named schematic with its manifest and fully loaded node set.
#[derive(Debug, Clone)]
pub struct Schematic {
    pub name: String,
    pub manifest: Manifest,
    pub nodes: Vec<TemplateNode>,
}

impl Schematic {
    pub fn from_source<S: TemplateSource + ?Sized>(
        name: &str,
        manifest: Manifest,
        source: &S,
    ) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            manifest,
            nodes: source.list_nodes()?,
        })
    }

    /// Loads a schematic from a directory holding a manifest and a `files/` tree.
    pub fn load<P: AsRef<Path>>(name: &str, schematic_dir: P) -> Result<Self> {
        let schematic_dir = schematic_dir.as_ref();
        let manifest = Manifest::load(schematic_dir)?;
        let source = DirectorySource::new(schematic_dir, &manifest)?;
        Self::from_source(name, manifest, &source)
    }
}

/// Every schematic available to the engine, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    schematics: BTreeMap<String, Schematic>,
}

impl TemplateLibrary {
    /// Loads each subdirectory of `root` as a schematic named after it.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let mut library = Self::default();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            debug!("Loading schematic '{name}' from {}", entry.path().display());
            library.insert(Schematic::load(&name, entry.path())?);
        }
        Ok(library)
    }

    pub fn insert(&mut self, schematic: Schematic) {
        self.schematics.insert(schematic.name.clone(), schematic);
    }

    pub fn names(&self) -> Vec<&str> {
        self.schematics.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Result<&Schematic> {
        self.schematics.get(name).ok_or_else(|| Error::UnknownSchematic {
            name: name.to_string(),
            available: self.names().join(", "),
        })
    }
}
