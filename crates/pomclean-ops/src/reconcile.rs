//! Turning usage analysis into edits of a declared-dependency list.

use std::collections::HashSet;

use pomclean_core::dependency::DependencyKey;
use pomclean_maven::analysis::{Artifact, UsageAnalysis};
use pomclean_maven::pom::{Pom, PomDependency};

/// Changes to make to a project's `<dependencies>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyEdit {
    /// Unused declared dependencies to drop, matched by key.
    pub to_remove: Vec<Artifact>,
    /// Declarations for used but undeclared dependencies.
    pub to_add: Vec<PomDependency>,
    /// Unused declared dependencies left alone because of their scope.
    pub kept_by_policy: Vec<Artifact>,
}

impl DependencyEdit {
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }
}

/// Whether an unused dependency may be removed under the scope policy.
///
/// With `ignore_non_compile` only `compile` scoped dependencies are removed.
pub fn removable(artifact: &Artifact, ignore_non_compile: bool) -> bool {
    !ignore_non_compile || artifact.scope.is_compile()
}

/// Declaration for a used but undeclared artifact.
///
/// Scope is written only when it is not `compile` and type only when it is
/// not `jar`, both being the implicit defaults.
pub fn new_declaration(artifact: &Artifact) -> PomDependency {
    let mut dep = PomDependency::new(&artifact.group_id, &artifact.artifact_id);
    dep.version = artifact.version.clone();
    if !artifact.scope.is_compile() {
        dep.scope = Some(artifact.scope.as_str().to_string());
    }
    dep.type_ = artifact.type_.clone().filter(|t| t != "jar");
    dep.classifier = artifact.classifier.clone();
    dep
}

/// Compute the edit for a project from its usage analysis.
pub fn reconcile(analysis: &UsageAnalysis, ignore_non_compile: bool) -> DependencyEdit {
    let mut edit = DependencyEdit::default();

    let mut removing = HashSet::new();
    for artifact in &analysis.unused_declared {
        if !removable(artifact, ignore_non_compile) {
            edit.kept_by_policy.push(artifact.clone());
        } else if removing.insert(artifact.key()) {
            edit.to_remove.push(artifact.clone());
        }
    }

    let mut adding = HashSet::new();
    for artifact in &analysis.used_undeclared {
        if adding.insert(artifact.key()) {
            edit.to_add.push(new_declaration(artifact));
        }
    }

    edit
}

/// What [`apply_edit`] actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedEdit {
    pub original: usize,
    pub removed: Vec<DependencyKey>,
    pub added: Vec<DependencyKey>,
    /// Removal candidates with no matching declaration.
    pub unmatched: Vec<DependencyKey>,
    /// Additions skipped because the key was already declared.
    pub already_declared: Vec<DependencyKey>,
    pub final_count: usize,
}

/// Apply `edit` to the declared dependencies of `pom`.
///
/// Declarations are matched by key with property references resolved, so a
/// declaration written as `${project.groupId}` still matches. New entries
/// are appended; ordering is left to the caller.
pub fn apply_edit(pom: &mut Pom, edit: &DependencyEdit) -> AppliedEdit {
    let mut applied = AppliedEdit {
        original: pom.dependencies.len(),
        ..AppliedEdit::default()
    };

    let remove: HashSet<DependencyKey> = edit.to_remove.iter().map(Artifact::key).collect();
    let keys: Vec<DependencyKey> = pom
        .dependencies
        .iter()
        .map(|d| pom.dependency_key(d))
        .collect();
    let mut matched = HashSet::new();
    let mut keys_iter = keys.iter();
    pom.dependencies.retain(|_| {
        let Some(key) = keys_iter.next() else {
            return true;
        };
        if remove.contains(key) {
            matched.insert(key.clone());
            false
        } else {
            true
        }
    });
    for artifact in &edit.to_remove {
        let key = artifact.key();
        if matched.contains(&key) {
            tracing::info!("Removed unused dependency {key}");
            applied.removed.push(key);
        } else {
            tracing::debug!("Unused dependency {key} is not declared, nothing to remove");
            applied.unmatched.push(key);
        }
    }

    let mut declared = pom.declared_keys();
    for dep in &edit.to_add {
        let key = dep.key();
        if !declared.insert(key.clone()) {
            tracing::debug!("{key} is already declared, not adding it again");
            applied.already_declared.push(key);
            continue;
        }
        tracing::info!("Added used dependency {key}");
        pom.dependencies.push(dep.clone());
        applied.added.push(key);
    }

    applied.final_count = pom.dependencies.len();
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use pomclean_core::dependency::DependencyScope;
    use pomclean_maven::pom::parse_pom;

    fn artifact(g: &str, a: &str, v: &str, scope: DependencyScope) -> Artifact {
        Artifact {
            version: Some(v.to_string()),
            scope,
            ..Artifact::new(g, a)
        }
    }

    fn scenario_pom() -> Pom {
        parse_pom(
            r#"<project>
                <dependencies>
                    <dependency><groupId>a</groupId><artifactId>a</artifactId><version>1</version></dependency>
                    <dependency><groupId>b</groupId><artifactId>b</artifactId><version>1</version><scope>test</scope></dependency>
                </dependencies>
            </project>"#,
        )
        .unwrap()
    }

    fn declared(pom: &Pom) -> Vec<String> {
        pom.dependencies.iter().map(|d| d.signature()).collect()
    }

    #[test]
    fn unused_dependency_is_removed() {
        let mut pom = scenario_pom();
        let analysis = UsageAnalysis {
            unused_declared: vec![artifact("b", "b", "1", DependencyScope::Test)],
            ..UsageAnalysis::default()
        };
        let applied = apply_edit(&mut pom, &reconcile(&analysis, false));
        assert_eq!(declared(&pom), vec!["a:a"]);
        assert_eq!(applied.removed, vec![DependencyKey::new("b", "b")]);
        assert_eq!(applied.final_count, 1);
    }

    #[test]
    fn non_compile_scope_is_kept_when_ignored() {
        let mut pom = scenario_pom();
        let analysis = UsageAnalysis {
            unused_declared: vec![artifact("b", "b", "1", DependencyScope::Test)],
            ..UsageAnalysis::default()
        };
        let edit = reconcile(&analysis, true);
        assert!(edit.to_remove.is_empty());
        assert_eq!(edit.kept_by_policy.len(), 1);

        let applied = apply_edit(&mut pom, &edit);
        assert_eq!(declared(&pom), vec!["a:a", "b:b"]);
        assert_eq!(applied.original, applied.final_count);
    }

    #[test]
    fn used_undeclared_runtime_dependency_is_added_with_scope() {
        let mut pom = scenario_pom();
        let analysis = UsageAnalysis {
            used_undeclared: vec![artifact("c", "c", "2", DependencyScope::Runtime)],
            ..UsageAnalysis::default()
        };
        apply_edit(&mut pom, &reconcile(&analysis, false));
        let added = pom.dependencies.last().unwrap();
        assert_eq!(added.signature(), "c:c");
        assert_eq!(added.version.as_deref(), Some("2"));
        assert_eq!(added.scope.as_deref(), Some("runtime"));
        assert_eq!(added.source_index, None);
    }

    #[test]
    fn new_declaration_omits_defaults() {
        let mut a = artifact("g", "a", "1", DependencyScope::Compile);
        a.type_ = Some("jar".to_string());
        let dep = new_declaration(&a);
        assert_eq!(dep.scope, None);
        assert_eq!(dep.type_, None);

        a.type_ = Some("test-jar".to_string());
        a.classifier = Some("tests".to_string());
        let dep = new_declaration(&a);
        assert_eq!(dep.type_.as_deref(), Some("test-jar"));
        assert_eq!(dep.classifier.as_deref(), Some("tests"));
    }

    #[test]
    fn result_size_is_original_minus_removed_plus_added() {
        let mut pom = scenario_pom();
        let analysis = UsageAnalysis {
            unused_declared: vec![
                artifact("a", "a", "1", DependencyScope::Compile),
                artifact("b", "b", "1", DependencyScope::Test),
            ],
            used_undeclared: vec![
                artifact("c", "c", "2", DependencyScope::Compile),
                artifact("d", "d", "3", DependencyScope::Provided),
                artifact("e", "e", "4", DependencyScope::Compile),
            ],
        };
        let applied = apply_edit(&mut pom, &reconcile(&analysis, false));
        assert_eq!(
            applied.final_count,
            applied.original - applied.removed.len() + applied.added.len()
        );
        assert_eq!(applied.final_count, 3);
    }

    #[test]
    fn empty_analysis_is_empty_edit() {
        let edit = reconcile(&UsageAnalysis::default(), true);
        assert!(edit.is_empty());
        let mut pom = scenario_pom();
        let applied = apply_edit(&mut pom, &edit);
        assert_eq!(applied.original, applied.final_count);
    }

    #[test]
    fn unmatched_removal_is_ignored() {
        let mut pom = scenario_pom();
        let analysis = UsageAnalysis {
            unused_declared: vec![artifact("z", "z", "1", DependencyScope::Compile)],
            ..UsageAnalysis::default()
        };
        let applied = apply_edit(&mut pom, &reconcile(&analysis, false));
        assert_eq!(applied.unmatched, vec![DependencyKey::new("z", "z")]);
        assert_eq!(declared(&pom), vec!["a:a", "b:b"]);
    }

    #[test]
    fn removal_matches_interpolated_keys() {
        let mut pom = parse_pom(
            r#"<project>
                <groupId>com.example</groupId>
                <properties><lib>util</lib></properties>
                <dependencies>
                    <dependency><groupId>${project.groupId}</groupId><artifactId>${lib}</artifactId></dependency>
                </dependencies>
            </project>"#,
        )
        .unwrap();
        let analysis = UsageAnalysis {
            unused_declared: vec![artifact("com.example", "util", "1", DependencyScope::Compile)],
            ..UsageAnalysis::default()
        };
        let applied = apply_edit(&mut pom, &reconcile(&analysis, false));
        assert_eq!(applied.removed.len(), 1);
        assert!(pom.dependencies.is_empty());
    }

    #[test]
    fn additions_never_duplicate_declared_keys() {
        let mut pom = scenario_pom();
        let analysis = UsageAnalysis {
            used_undeclared: vec![
                artifact("a", "a", "9", DependencyScope::Compile),
                artifact("c", "c", "2", DependencyScope::Compile),
                artifact("c", "c", "2", DependencyScope::Compile),
            ],
            ..UsageAnalysis::default()
        };
        let applied = apply_edit(&mut pom, &reconcile(&analysis, false));
        assert_eq!(applied.already_declared, vec![DependencyKey::new("a", "a")]);
        assert_eq!(declared(&pom), vec!["a:a", "b:b", "c:c"]);
    }
}
