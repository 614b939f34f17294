//! Projects and multi-module project trees.
//!
//! A [`ProjectTree`] owns every loaded project in an arena. Module links
//! point down the aggregation tree; parent links point up the inheritance
//! chain and may reference projects that are not modules of anything
//! (parents found only through `relativePath`).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pomclean_util::errors::{PomcleanError, PomcleanResult};

use crate::pom::{parse_pom, ParentRef, Pom};
use crate::render::render_pom;

/// Default build directory relative to the project directory.
pub const DEFAULT_BUILD_DIRECTORY: &str = "target";

/// A single Maven project: its parsed model plus the source it came from.
#[derive(Debug, Clone)]
pub struct Project {
    pub pom: Pom,
    /// Original POM text, used when writing the clean POM.
    pub source: String,
    pub pom_path: PathBuf,
}

impl Project {
    /// Read and parse the POM at `path`.
    pub fn from_path(path: &Path) -> PomcleanResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| PomcleanError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_source(path, source)
    }

    pub fn from_source(pom_path: impl Into<PathBuf>, source: String) -> PomcleanResult<Self> {
        let pom_path = pom_path.into();
        let pom = parse_pom(&source).map_err(|e| PomcleanError::Manifest {
            message: format!("{}: {e}", pom_path.display()),
        })?;
        Ok(Self {
            pom,
            source,
            pom_path,
        })
    }

    /// Directory containing the POM.
    pub fn basedir(&self) -> &Path {
        self.pom_path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// `<build><directory>` resolved against the project directory,
    /// `target/` when not declared.
    pub fn build_directory(&self) -> PathBuf {
        let basedir = self.basedir();
        let Some(ref raw) = self.pom.build_directory else {
            return basedir.join(DEFAULT_BUILD_DIRECTORY);
        };
        let base = basedir.to_string_lossy();
        let expanded = self.pom.interpolate(
            &raw.replace("${project.basedir}", &base)
                .replace("${basedir}", &base),
        );
        let dir = PathBuf::from(expanded.trim());
        if dir.is_relative() {
            basedir.join(dir)
        } else {
            dir
        }
    }

    /// Artifact ID for log messages, falling back to the POM path.
    pub fn display_name(&self) -> String {
        self.pom
            .artifact_id
            .clone()
            .unwrap_or_else(|| self.pom_path.display().to_string())
    }

    pub fn has_dependencies(&self) -> bool {
        self.pom.has_dependencies()
    }

    pub fn has_dependency_management(&self) -> bool {
        self.pom.has_dependency_management()
    }

    pub fn has_modules(&self) -> bool {
        self.pom.has_modules()
    }

    /// Current model written into the original document.
    pub fn render(&self) -> PomcleanResult<String> {
        render_pom(&self.source, &self.pom)
    }

    fn is_parent(&self, parent: &ParentRef) -> bool {
        self.pom.effective_group_id() == Some(parent.group_id.as_str())
            && self.pom.artifact_id.as_deref() == Some(parent.artifact_id.as_str())
    }
}

/// Index of a project within a [`ProjectTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(usize);

#[derive(Debug, Clone)]
struct Node {
    project: Project,
    parent: Option<ProjectId>,
    modules: Vec<ProjectId>,
}

/// Arena of projects reachable from a root POM.
#[derive(Debug, Clone)]
pub struct ProjectTree {
    nodes: Vec<Node>,
    root: ProjectId,
}

impl ProjectTree {
    /// A tree holding only `root`.
    pub fn new(root: Project) -> Self {
        Self {
            nodes: vec![Node {
                project: root,
                parent: None,
                modules: Vec::new(),
            }],
            root: ProjectId(0),
        }
    }

    /// Load the POM at `root_pom`, its modules recursively, and the parent
    /// chain of every loaded project.
    pub fn load(root_pom: &Path) -> PomcleanResult<Self> {
        let mut tree = Self::new(Project::from_path(root_pom)?);
        let mut seen = HashSet::new();
        seen.insert(canonical(root_pom));
        tree.load_modules(tree.root, &mut seen)?;
        tree.link_parents(&mut seen);
        tree.inherit_properties();
        tracing::debug!(
            "Loaded {} project(s) from {}",
            tree.len(),
            root_pom.display()
        );
        Ok(tree)
    }

    /// Load the POM at `pom_path` and its parent chain only. Modules are not
    /// read, so a broken module POM does not affect this project.
    pub fn load_project(pom_path: &Path) -> PomcleanResult<Self> {
        let mut tree = Self::new(Project::from_path(pom_path)?);
        let mut seen = HashSet::new();
        seen.insert(canonical(pom_path));
        tree.link_parents(&mut seen);
        tree.inherit_properties();
        Ok(tree)
    }

    fn load_modules(&mut self, id: ProjectId, seen: &mut HashSet<PathBuf>) -> PomcleanResult<()> {
        let basedir = self.get(id).basedir().to_path_buf();
        let modules = self.get(id).pom.modules.clone();
        for module in modules {
            let path = module_pom_path(&basedir, &module);
            if !seen.insert(canonical(&path)) {
                tracing::warn!("Module {} is listed more than once", path.display());
                continue;
            }
            let child = self.add_module(id, Project::from_path(&path)?);
            self.load_modules(child, seen)?;
        }
        Ok(())
    }

    /// Resolve `<parent>` references: first among loaded projects, then
    /// through `relativePath` on disk.
    fn link_parents(&mut self, seen: &mut HashSet<PathBuf>) {
        // Parents loaded from disk are appended and linked in turn.
        let mut index = 0;
        while index < self.nodes.len() {
            let id = ProjectId(index);
            index += 1;
            if self.nodes[id.0].parent.is_some() {
                continue;
            }
            let Some(parent_ref) = self.get(id).pom.parent.clone() else {
                continue;
            };
            let found = self
                .ids()
                .find(|&other| other != id && self.get(other).is_parent(&parent_ref));
            let parent = match found {
                Some(parent) => Some(parent),
                None => self.load_relative_parent(id, &parent_ref, seen),
            };
            if parent.is_none() {
                tracing::debug!(
                    "Parent {}:{} of {} is outside the project tree",
                    parent_ref.group_id,
                    parent_ref.artifact_id,
                    self.get(id).display_name()
                );
            }
            self.nodes[id.0].parent = parent;
        }
    }

    fn load_relative_parent(
        &mut self,
        child: ProjectId,
        parent_ref: &ParentRef,
        seen: &mut HashSet<PathBuf>,
    ) -> Option<ProjectId> {
        let relative = parent_ref.relative_path.as_deref().unwrap_or("../pom.xml");
        if relative.trim().is_empty() {
            return None;
        }
        let path = module_pom_path(self.get(child).basedir(), relative.trim());
        if !path.is_file() || !seen.insert(canonical(&path)) {
            return None;
        }
        let project = match Project::from_path(&path) {
            Ok(project) => project,
            Err(e) => {
                tracing::warn!("Ignoring parent POM {}: {e}", path.display());
                return None;
            }
        };
        if !project.is_parent(parent_ref) {
            tracing::debug!(
                "{} does not match parent {}:{}",
                path.display(),
                parent_ref.group_id,
                parent_ref.artifact_id
            );
            return None;
        }
        Some(self.add_detached(project))
    }

    /// Inherit properties and coordinates down every parent chain.
    fn inherit_properties(&mut self) {
        for id in self.ids().collect::<Vec<_>>() {
            let chain: Vec<ProjectId> = self.ancestors(id).collect();
            for ancestor in chain {
                let parent_pom = self.get(ancestor).pom.clone();
                self.get_mut(id).pom.inherit_from(&parent_pom);
            }
        }
    }

    /// Add `project` as a module of `aggregator`. Aggregation does not
    /// imply inheritance: parent links are set with [`ProjectTree::set_parent`].
    pub fn add_module(&mut self, aggregator: ProjectId, project: Project) -> ProjectId {
        let id = ProjectId(self.nodes.len());
        self.nodes.push(Node {
            project,
            parent: None,
            modules: Vec::new(),
        });
        self.nodes[aggregator.0].modules.push(id);
        id
    }

    /// Add a project that is not a module of anything, e.g. an external parent.
    pub fn add_detached(&mut self, project: Project) -> ProjectId {
        let id = ProjectId(self.nodes.len());
        self.nodes.push(Node {
            project,
            parent: None,
            modules: Vec::new(),
        });
        id
    }

    pub fn set_parent(&mut self, child: ProjectId, parent: Option<ProjectId>) {
        self.nodes[child.0].parent = parent;
    }

    pub fn root(&self) -> ProjectId {
        self.root
    }

    pub fn get(&self, id: ProjectId) -> &Project {
        &self.nodes[id.0].project
    }

    pub fn get_mut(&mut self, id: ProjectId) -> &mut Project {
        &mut self.nodes[id.0].project
    }

    pub fn parent(&self, id: ProjectId) -> Option<ProjectId> {
        self.nodes[id.0].parent
    }

    /// Direct modules of `id`, in declaration order.
    pub fn modules(&self, id: ProjectId) -> &[ProjectId] {
        &self.nodes[id.0].modules
    }

    /// Parent, grandparent, ... of `id`, nearest first.
    pub fn ancestors(&self, id: ProjectId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
            remaining: self.nodes.len(),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = ProjectId> {
        (0..self.nodes.len()).map(ProjectId)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Iterator over a project's parent chain.
pub struct Ancestors<'t> {
    tree: &'t ProjectTree,
    next: Option<ProjectId>,
    /// Bounds the walk when parent links form a cycle.
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = ProjectId;

    fn next(&mut self) -> Option<ProjectId> {
        let current = self.next?;
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// A module or relative path names either a directory holding `pom.xml`
/// or a POM file.
fn module_pom_path(basedir: &Path, module: &str) -> PathBuf {
    let path = basedir.join(module);
    if path.is_dir() {
        path.join("pom.xml")
    } else {
        path
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
