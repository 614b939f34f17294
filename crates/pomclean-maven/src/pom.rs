//! Reading the parts of a `pom.xml` that dependency cleanup works with.

use std::collections::{BTreeMap, HashSet};

use pomclean_core::dependency::DependencyKey;
use pomclean_util::errors::PomcleanError;
use quick_xml::events::Event;
use quick_xml::Reader;

/// `<dependency>` elements of the declared dependency list.
pub(crate) const DEPENDENCY_PATH: &str = "project>dependencies>dependency";
/// `<dependency>` elements of the dependency management list.
pub(crate) const MANAGED_DEPENDENCY_PATH: &str =
    "project>dependencyManagement>dependencies>dependency";

/// Nesting limit for `${...}` references that expand to further references.
const MAX_EXPANSION_DEPTH: usize = 16;

/// The model of one POM.
///
/// Only coordinates, inheritance, modules and the two dependency lists are
/// kept. [`crate::render::render_pom`] carries everything else through from
/// the source text.
#[derive(Debug, Clone, Default)]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub name: Option<String>,

    pub parent: Option<ParentRef>,
    pub properties: BTreeMap<String, String>,
    /// `project>dependencies`
    pub dependencies: Vec<PomDependency>,
    /// `project>dependencyManagement>dependencies`
    pub dependency_management: Vec<PomDependency>,
    pub modules: Vec<String>,
    /// Raw `<build><directory>` value.
    pub build_directory: Option<String>,
}

/// `<parent>` coordinates.
#[derive(Debug, Clone, Default)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    /// `None` when absent, which Maven reads as `../pom.xml`.
    pub relative_path: Option<String>,
}

/// One `<dependency>` entry, with every value as written in the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
    pub classifier: Option<String>,
    pub type_: Option<String>,
    pub exclusions: Vec<PomExclusion>,
    /// Index of the entry within its source section, `None` for entries
    /// pomclean generated.
    pub source_index: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomExclusion {
    pub group_id: String,
    pub artifact_id: Option<String>,
}

impl PomDependency {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            ..Self::default()
        }
    }

    /// Key from the coordinates as written, without property expansion.
    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(&self.group_id, &self.artifact_id)
    }

    /// Sort key of the entry as written, see [`DependencyKey::signature`].
    pub fn signature(&self) -> String {
        self.key().signature()
    }
}

impl Pom {
    /// Declared `groupId`, else the parent's.
    pub fn effective_group_id(&self) -> Option<&str> {
        match (&self.group_id, &self.parent) {
            (Some(group), _) => Some(group),
            (None, Some(parent)) => Some(&parent.group_id),
            (None, None) => None,
        }
    }

    /// Declared `version`, else the parent's.
    pub fn effective_version(&self) -> Option<&str> {
        match (&self.version, &self.parent) {
            (Some(version), _) => Some(version),
            (None, Some(parent)) => Some(&parent.version),
            (None, None) => None,
        }
    }

    /// Expand `${name}` references from the project model and
    /// `<properties>`. Unknown references are left as written.
    pub fn interpolate(&self, input: &str) -> String {
        self.expand(input, 0)
    }

    fn expand(&self, input: &str, depth: usize) -> String {
        if depth > MAX_EXPANSION_DEPTH || !input.contains("${") {
            return input.to_string();
        }
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(open) = rest.find("${") {
            out.push_str(&rest[..open]);
            let body = &rest[open + 2..];
            let Some(close) = body.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };
            let reference = &rest[open..open + 2 + close + 1];
            match self.property(&body[..close]) {
                Some(value) => out.push_str(&self.expand(value, depth + 1)),
                None => out.push_str(reference),
            }
            rest = &body[close + 1..];
        }
        out.push_str(rest);
        out
    }

    fn property(&self, name: &str) -> Option<&str> {
        let parent = self.parent.as_ref();
        let model = match name {
            "project.groupId" | "pom.groupId" => self.effective_group_id(),
            "project.artifactId" | "pom.artifactId" => self.artifact_id.as_deref(),
            "project.version" | "pom.version" => self.effective_version(),
            "project.packaging" => self.packaging.as_deref(),
            "project.name" => self.name.as_deref(),
            "project.parent.groupId" => parent.map(|p| p.group_id.as_str()),
            "project.parent.artifactId" => parent.map(|p| p.artifact_id.as_str()),
            "project.parent.version" => parent.map(|p| p.version.as_str()),
            _ => None,
        };
        model.or_else(|| self.properties.get(name).map(String::as_str))
    }

    /// Key of `dep` with property references expanded against this POM.
    pub fn dependency_key(&self, dep: &PomDependency) -> DependencyKey {
        DependencyKey::new(
            self.interpolate(&dep.group_id),
            self.interpolate(&dep.artifact_id),
        )
    }

    /// Expanded keys of all declared dependencies.
    pub fn declared_keys(&self) -> HashSet<DependencyKey> {
        self.dependencies
            .iter()
            .map(|dep| self.dependency_key(dep))
            .collect()
    }

    /// Take over properties, `groupId` and `version` from an ancestor where
    /// this POM declares none. Apply ancestors nearest first.
    ///
    /// Dependency management is never merged: it belongs to the POM that
    /// declares it.
    pub fn inherit_from(&mut self, ancestor: &Pom) {
        for (name, value) in &ancestor.properties {
            if !self.properties.contains_key(name) {
                self.properties.insert(name.clone(), value.clone());
            }
        }
        if self.group_id.is_none() {
            self.group_id = ancestor.effective_group_id().map(str::to_string);
        }
        if self.version.is_none() {
            self.version = ancestor.effective_version().map(str::to_string);
        }
    }

    pub fn is_pom_packaging(&self) -> bool {
        self.packaging.as_deref() == Some("pom")
    }

    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }

    pub fn has_dependency_management(&self) -> bool {
        !self.dependency_management.is_empty()
    }

    pub fn has_modules(&self) -> bool {
        !self.modules.is_empty()
    }
}

/// Sort dependencies ascending by [`PomDependency::signature`].
///
/// The sort is stable, so entries sharing a signature keep their order.
pub fn sort_by_signature(deps: &mut [PomDependency]) {
    deps.sort_by_cached_key(PomDependency::signature);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DependencyList {
    Declared,
    Managed,
}

impl DependencyList {
    fn at(path: &[&str]) -> Option<Self> {
        match path {
            ["project", "dependencies", "dependency"] => Some(Self::Declared),
            ["project", "dependencyManagement", "dependencies", "dependency"] => {
                Some(Self::Managed)
            }
            _ => None,
        }
    }
}

/// Event-driven builder of a [`Pom`].
#[derive(Default)]
struct PomParser {
    pom: Pom,
    path: Vec<String>,
    text: String,
    dependency: Option<(DependencyList, PomDependency)>,
    exclusion: Option<PomExclusion>,
    parent: Option<ParentRef>,
}

impl PomParser {
    fn start(&mut self, name: String) {
        self.path.push(name);
        self.text.clear();

        let path: Vec<&str> = self.path.iter().map(String::as_str).collect();
        if let Some(list) = DependencyList::at(&path) {
            let index = match list {
                DependencyList::Declared => self.pom.dependencies.len(),
                DependencyList::Managed => self.pom.dependency_management.len(),
            };
            let dep = PomDependency {
                source_index: Some(index),
                ..PomDependency::default()
            };
            self.dependency = Some((list, dep));
            return;
        }
        match path.as_slice() {
            ["project", "parent"] => self.parent = Some(ParentRef::default()),
            [.., "dependency", "exclusions", "exclusion"] if self.dependency.is_some() => {
                self.exclusion = Some(PomExclusion::default());
            }
            _ => {}
        }
    }

    fn end(&mut self) {
        let text = std::mem::take(&mut self.text);
        let owned = std::mem::take(&mut self.path);
        let path: Vec<&str> = owned.iter().map(String::as_str).collect();

        if let Some(list) = DependencyList::at(&path) {
            if let Some((_, dep)) = self.dependency.take() {
                match list {
                    DependencyList::Declared => self.pom.dependencies.push(dep),
                    DependencyList::Managed => self.pom.dependency_management.push(dep),
                }
            }
        } else {
            match path.as_slice() {
                ["project", "properties", name] => {
                    self.pom.properties.insert(name.to_string(), text);
                }
                ["project", "parent"] => self.pom.parent = self.parent.take(),
                ["project", "parent", field] => self.parent_field(field, text),
                ["project", "modules", "module"] => self.pom.modules.push(text),
                ["project", "build", "directory"] => self.pom.build_directory = Some(text),
                ["project", field] => self.project_field(field, text),
                [.., "exclusions", "exclusion"] => {
                    if let (Some(exclusion), Some((_, dep))) =
                        (self.exclusion.take(), self.dependency.as_mut())
                    {
                        dep.exclusions.push(exclusion);
                    }
                }
                [.., "exclusion", field] => {
                    if let Some(exclusion) = self.exclusion.as_mut() {
                        match *field {
                            "groupId" => exclusion.group_id = text,
                            "artifactId" => exclusion.artifact_id = Some(text),
                            _ => {}
                        }
                    }
                }
                [head @ .., field] if DependencyList::at(head).is_some() => {
                    self.dependency_field(field, text);
                }
                _ => {}
            }
        }

        drop(path);
        self.path = owned;
        self.path.pop();
    }

    fn project_field(&mut self, field: &str, text: String) {
        let slot = match field {
            "groupId" => &mut self.pom.group_id,
            "artifactId" => &mut self.pom.artifact_id,
            "version" => &mut self.pom.version,
            "packaging" => &mut self.pom.packaging,
            "name" => &mut self.pom.name,
            _ => return,
        };
        *slot = Some(text);
    }

    fn parent_field(&mut self, field: &str, text: String) {
        let Some(parent) = self.parent.as_mut() else {
            return;
        };
        match field {
            "groupId" => parent.group_id = text,
            "artifactId" => parent.artifact_id = text,
            "version" => parent.version = text,
            "relativePath" => parent.relative_path = Some(text),
            _ => {}
        }
    }

    fn dependency_field(&mut self, field: &str, text: String) {
        let Some((_, dep)) = self.dependency.as_mut() else {
            return;
        };
        match field {
            "groupId" => dep.group_id = text,
            "artifactId" => dep.artifact_id = text,
            "version" => dep.version = Some(text),
            "scope" => dep.scope = Some(text),
            "optional" => dep.optional = text.trim().eq_ignore_ascii_case("true"),
            "classifier" => dep.classifier = Some(text),
            "type" => dep.type_ = Some(text),
            _ => {}
        }
    }
}

/// Parse POM text.
///
/// Dependency lists inside profiles, plugins or anywhere other than
/// `project>dependencies` and `project>dependencyManagement` are ignored.
pub fn parse_pom(xml: &str) -> miette::Result<Pom> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut parser = PomParser::default();

    loop {
        let event = reader.read_event().map_err(|e| PomcleanError::Manifest {
            message: format!(
                "Failed to parse POM XML at byte {}: {e}",
                reader.error_position()
            ),
        })?;
        match event {
            Event::Start(start) => {
                parser.start(String::from_utf8_lossy(start.name().as_ref()).into_owned());
            }
            Event::End(_) => parser.end(),
            Event::Text(text) => {
                let value = text.unescape().map_err(|e| PomcleanError::Manifest {
                    message: format!("Invalid text in POM: {e}"),
                })?;
                parser.text.push_str(&value);
            }
            Event::CData(data) => {
                parser
                    .text
                    .push_str(&String::from_utf8_lossy(&data.into_inner()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(parser.pom)
}
