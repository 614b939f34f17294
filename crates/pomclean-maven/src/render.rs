//! Writing a cleaned POM.
//!
//! The source document is streamed through event by event. Only the
//! `project>dependencies` and `project>dependencyManagement>dependencies`
//! sections are rebuilt from the model: entries that came from the source are
//! re-emitted verbatim (comments in front of them included) in model order,
//! entries created by pomclean are generated with the section's indentation,
//! and entries missing from the model are dropped.

use std::fmt::Display;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use pomclean_util::errors::{PomcleanError, PomcleanResult};

use crate::pom::{Pom, PomDependency, DEPENDENCY_PATH, MANAGED_DEPENDENCY_PATH};

const DEFAULT_INDENT_UNIT: &str = "    ";

/// Render `pom` back into `source`, replacing its dependency sections.
pub fn render_pom(source: &str, pom: &Pom) -> PomcleanResult<String> {
    let mut reader = Reader::from_str(source);
    let mut renderer = Renderer::new(pom, line_ending(source));

    loop {
        let event = reader
            .read_event()
            .map_err(|e| manifest_error(format!("Failed to parse POM XML: {e}")))?
            .into_owned();
        if let Event::Eof = event {
            break;
        }
        renderer.handle(event)?;
    }

    String::from_utf8(renderer.writer.into_inner())
        .map_err(|e| manifest_error(format!("Rendered POM is not UTF-8: {e}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Dependencies,
    Management,
}

impl SectionKind {
    fn from_path(ctx: &str) -> Option<Self> {
        match ctx {
            "project>dependencies" => Some(Self::Dependencies),
            "project>dependencyManagement>dependencies" => Some(Self::Management),
            _ => None,
        }
    }

    fn path(self) -> &'static str {
        match self {
            Self::Dependencies => "project>dependencies",
            Self::Management => "project>dependencyManagement>dependencies",
        }
    }

    fn entry_path(self) -> &'static str {
        match self {
            Self::Dependencies => DEPENDENCY_PATH,
            Self::Management => MANAGED_DEPENDENCY_PATH,
        }
    }

    fn entries(self, pom: &Pom) -> &[PomDependency] {
        match self {
            Self::Dependencies => &pom.dependencies,
            Self::Management => &pom.dependency_management,
        }
    }
}

/// A source `<dependency>` element and the trivia in front of it.
struct CapturedEntry {
    leading: Vec<Event<'static>>,
    body: Vec<Event<'static>>,
}

/// Events of a dependency section held back until its end tag.
struct Section {
    kind: SectionKind,
    /// Indentation of the section's own start tag.
    indent: String,
    entries: Vec<CapturedEntry>,
    pending: Vec<Event<'static>>,
    current: Option<CapturedEntry>,
}

impl Section {
    fn new(kind: SectionKind, indent: String) -> Self {
        Self {
            kind,
            indent,
            entries: Vec::new(),
            pending: Vec::new(),
            current: None,
        }
    }

    fn push(&mut self, event: Event<'static>) {
        match self.current.as_mut() {
            Some(entry) => entry.body.push(event),
            None => self.pending.push(event),
        }
    }
}

struct Renderer<'p> {
    pom: &'p Pom,
    writer: Writer<Vec<u8>>,
    path: Vec<String>,
    section: Option<Section>,
    last_indent: String,
    /// Indentation of `<project>` and of its first child element.
    project_indent: Option<String>,
    child_indent: Option<String>,
    newline: &'static str,
    saw_dependencies: bool,
}

impl<'p> Renderer<'p> {
    fn new(pom: &'p Pom, newline: &'static str) -> Self {
        Self {
            pom,
            writer: Writer::new(Vec::new()),
            path: Vec::new(),
            section: None,
            last_indent: String::new(),
            project_indent: None,
            child_indent: None,
            newline,
            saw_dependencies: false,
        }
    }

    /// One level of indentation as used by the document.
    fn indent_unit(&self) -> String {
        let project = self.project_indent.as_deref().unwrap_or("");
        self.child_indent
            .as_deref()
            .and_then(|child| child.strip_prefix(project))
            .filter(|unit| !unit.is_empty())
            .unwrap_or(DEFAULT_INDENT_UNIT)
            .to_string()
    }

    fn note_element_depth(&mut self, depth: usize) {
        match depth {
            1 if self.project_indent.is_none() => {
                self.project_indent = Some(self.last_indent.clone());
            }
            2 if self.child_indent.is_none() => {
                self.child_indent = Some(self.last_indent.clone());
            }
            _ => {}
        }
    }

    fn handle(&mut self, event: Event<'static>) -> PomcleanResult<()> {
        match event {
            Event::Start(start) => {
                self.path
                    .push(String::from_utf8_lossy(start.name().as_ref()).into_owned());
                self.note_element_depth(self.path.len());
                let ctx = self.path.join(">");

                if let Some(section) = self.section.as_mut() {
                    if section.current.is_none() && ctx == section.kind.entry_path() {
                        section.current = Some(CapturedEntry {
                            leading: std::mem::take(&mut section.pending),
                            body: vec![Event::Start(start)],
                        });
                    } else {
                        section.push(Event::Start(start));
                    }
                    return Ok(());
                }

                if let Some(kind) = SectionKind::from_path(&ctx) {
                    self.saw_dependencies |= kind == SectionKind::Dependencies;
                    self.section = Some(Section::new(kind, self.last_indent.clone()));
                }
                self.write(Event::Start(start))
            }
            Event::End(end) => {
                let ctx = self.path.join(">");
                let result = self.handle_end(&ctx, end);
                self.path.pop();
                result
            }
            Event::Empty(empty) => {
                let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
                self.note_element_depth(self.path.len() + 1);
                if let Some(section) = self.section.as_mut() {
                    section.push(Event::Empty(empty));
                    return Ok(());
                }
                let ctx = format!("{}>{name}", self.path.join(">"));
                match SectionKind::from_path(&ctx) {
                    // `<dependencies/>` that now needs entries
                    Some(kind) if !kind.entries(self.pom).is_empty() => {
                        self.saw_dependencies |= kind == SectionKind::Dependencies;
                        self.write(Event::Start(BytesStart::new(name.clone())))?;
                        self.flush_section(Section::new(kind, self.last_indent.clone()))?;
                        self.write(Event::End(BytesEnd::new(name)))
                    }
                    Some(kind) => {
                        self.saw_dependencies |= kind == SectionKind::Dependencies;
                        self.write(Event::Empty(empty))
                    }
                    None => self.write(Event::Empty(empty)),
                }
            }
            other => {
                if let Event::Text(ref text) = other {
                    if let Some(indent) = trailing_indent(text) {
                        self.last_indent = indent;
                    }
                }
                match self.section.as_mut() {
                    Some(section) => {
                        section.push(other);
                        Ok(())
                    }
                    None => self.write(other),
                }
            }
        }
    }

    fn handle_end(&mut self, ctx: &str, end: BytesEnd<'static>) -> PomcleanResult<()> {
        if let Some(mut section) = self.section.take() {
            if ctx == section.kind.path() {
                self.flush_section(section)?;
                return self.write(Event::End(end));
            }
            if ctx == section.kind.entry_path() {
                if let Some(mut entry) = section.current.take() {
                    entry.body.push(Event::End(end));
                    section.entries.push(entry);
                    self.section = Some(section);
                    return Ok(());
                }
            }
            section.push(Event::End(end));
            self.section = Some(section);
            return Ok(());
        }

        if ctx == "project" && !self.saw_dependencies && !self.pom.dependencies.is_empty() {
            self.insert_dependencies_section()?;
        }
        self.write(Event::End(end))
    }

    /// Emit the model's entries for a section followed by its closing trivia.
    fn flush_section(&mut self, section: Section) -> PomcleanResult<()> {
        let Section {
            kind,
            indent,
            entries,
            pending,
            current,
        } = section;

        let document_unit = self.indent_unit();
        let entry_indent = entries
            .first()
            .and_then(|e| e.leading.iter().rev().find_map(event_indent))
            .unwrap_or_else(|| format!("{indent}{document_unit}"));
        let unit = entry_indent
            .strip_prefix(indent.as_str())
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .unwrap_or(document_unit);

        let pom = self.pom;
        let mut originals: Vec<Option<CapturedEntry>> = entries.into_iter().map(Some).collect();
        for dep in kind.entries(pom) {
            let original = dep
                .source_index
                .and_then(|i| originals.get_mut(i))
                .and_then(Option::take);
            match original {
                Some(entry) => {
                    if !entry.leading.iter().any(|e| matches!(e, Event::Text(_))) {
                        self.write_whitespace(&entry_indent)?;
                    }
                    for event in entry.leading.into_iter().chain(entry.body) {
                        self.write(event)?;
                    }
                }
                None => {
                    self.write_whitespace(&entry_indent)?;
                    self.write_dependency(dep, &entry_indent, &unit)?;
                }
            }
        }

        // An unterminated entry can only come from malformed input; keep it.
        let tail: Vec<Event<'static>> = match current {
            Some(entry) => entry.leading.into_iter().chain(entry.body).chain(pending).collect(),
            None => pending,
        };
        if tail.is_empty() {
            self.write_whitespace(&indent)?;
        }
        for event in tail {
            self.write(event)?;
        }
        Ok(())
    }

    fn insert_dependencies_section(&mut self) -> PomcleanResult<()> {
        self.saw_dependencies = true;
        let indent = match self.child_indent {
            Some(ref child) => child.clone(),
            None => {
                let project = self.project_indent.as_deref().unwrap_or("");
                format!("{project}{DEFAULT_INDENT_UNIT}")
            }
        };
        self.write(Event::Text(BytesText::new(&indent)))?;
        self.write(Event::Start(BytesStart::new("dependencies")))?;
        self.flush_section(Section::new(SectionKind::Dependencies, indent))?;
        self.write(Event::End(BytesEnd::new("dependencies")))?;
        let newline = self.newline;
        self.write(Event::Text(BytesText::new(newline)))
    }

    fn write_dependency(
        &mut self,
        dep: &PomDependency,
        indent: &str,
        unit: &str,
    ) -> PomcleanResult<()> {
        let inner = format!("{indent}{unit}");
        self.write(Event::Start(BytesStart::new("dependency")))?;
        self.write_field(&inner, "groupId", &dep.group_id)?;
        self.write_field(&inner, "artifactId", &dep.artifact_id)?;
        if let Some(ref version) = dep.version {
            self.write_field(&inner, "version", version)?;
        }
        if let Some(ref type_) = dep.type_ {
            self.write_field(&inner, "type", type_)?;
        }
        if let Some(ref classifier) = dep.classifier {
            self.write_field(&inner, "classifier", classifier)?;
        }
        if let Some(ref scope) = dep.scope {
            self.write_field(&inner, "scope", scope)?;
        }
        if dep.optional {
            self.write_field(&inner, "optional", "true")?;
        }
        if !dep.exclusions.is_empty() {
            let exclusion_indent = format!("{inner}{unit}");
            let field_indent = format!("{exclusion_indent}{unit}");
            self.write_whitespace(&inner)?;
            self.write(Event::Start(BytesStart::new("exclusions")))?;
            for exclusion in &dep.exclusions {
                self.write_whitespace(&exclusion_indent)?;
                self.write(Event::Start(BytesStart::new("exclusion")))?;
                self.write_field(&field_indent, "groupId", &exclusion.group_id)?;
                if let Some(ref artifact_id) = exclusion.artifact_id {
                    self.write_field(&field_indent, "artifactId", artifact_id)?;
                }
                self.write_whitespace(&exclusion_indent)?;
                self.write(Event::End(BytesEnd::new("exclusion")))?;
            }
            self.write_whitespace(&inner)?;
            self.write(Event::End(BytesEnd::new("exclusions")))?;
        }
        self.write_whitespace(indent)?;
        self.write(Event::End(BytesEnd::new("dependency")))
    }

    fn write_field(&mut self, indent: &str, name: &str, value: &str) -> PomcleanResult<()> {
        self.write_whitespace(indent)?;
        self.write(Event::Start(BytesStart::new(name)))?;
        self.write(Event::Text(BytesText::new(value)))?;
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn write_whitespace(&mut self, indent: &str) -> PomcleanResult<()> {
        let text = format!("{}{indent}", self.newline);
        self.write(Event::Text(BytesText::new(&text)))
    }

    fn write(&mut self, event: Event<'_>) -> PomcleanResult<()> {
        self.writer
            .write_event(event)
            .map_err(|e| manifest_error(format!("Failed to write POM: {e}")))
    }
}

/// Indentation following the last newline of a whitespace-only text node.
fn trailing_indent(text: &BytesText<'_>) -> Option<String> {
    let raw = std::str::from_utf8(text).ok()?;
    if !raw.trim().is_empty() {
        return None;
    }
    raw.rfind('\n').map(|i| raw[i + 1..].to_string())
}

/// `"\r\n"` when the source uses Windows line endings, else `"\n"`.
fn line_ending(source: &str) -> &'static str {
    if source.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

fn event_indent(event: &Event<'_>) -> Option<String> {
    match event {
        Event::Text(text) => trailing_indent(text),
        _ => None,
    }
}

fn manifest_error(message: impl Display) -> miette::Report {
    PomcleanError::Manifest {
        message: message.to_string(),
    }
    .into()
}
