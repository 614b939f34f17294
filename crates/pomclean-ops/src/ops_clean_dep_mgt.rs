//! Operation: prune `<dependencyManagement>` entries that no governed
//! project declares.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pomclean_core::config::CleanConfig;
use pomclean_core::dependency::DependencyKey;
use pomclean_maven::pom::{sort_by_signature, Pom};
use pomclean_maven::project::{Project, ProjectId, ProjectTree};
use pomclean_util::errors::{PomcleanError, PomcleanResult};

use crate::hosts::{resolve_hosts, HostAssignment};

/// How the root project relates to its dependency management.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagementMode {
    /// The root declares dependencies and manages them itself. Modules are
    /// not consulted.
    SelfManaged,
    /// The root aggregates modules and declares no dependencies.
    MultiModule,
    /// Any other shape; nothing is done.
    Unsupported,
}

pub fn classify(root: &Project) -> ManagementMode {
    if root.has_dependencies() && root.has_dependency_management() {
        ManagementMode::SelfManaged
    } else if root.has_modules() && !root.has_dependencies() {
        ManagementMode::MultiModule
    } else {
        ManagementMode::Unsupported
    }
}

/// Keys declared by any of `members`, resolved against each member's own
/// properties.
pub fn consumed_keys(tree: &ProjectTree, members: &[ProjectId]) -> HashSet<DependencyKey> {
    members
        .iter()
        .flat_map(|&id| tree.get(id).pom.declared_keys())
        .collect()
}

/// Counts from pruning one management section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneResult {
    pub original: usize,
    pub removed: Vec<DependencyKey>,
    pub final_count: usize,
}

/// Drop management entries whose key is not in `consumed`, then sort the
/// remaining entries by signature.
pub fn prune_management(pom: &mut Pom, consumed: &HashSet<DependencyKey>) -> PruneResult {
    let original = pom.dependency_management.len();
    let keys: Vec<DependencyKey> = pom
        .dependency_management
        .iter()
        .map(|d| pom.dependency_key(d))
        .collect();

    let mut removed = Vec::new();
    let mut keys_iter = keys.into_iter();
    pom.dependency_management.retain(|_| match keys_iter.next() {
        Some(key) if !consumed.contains(&key) => {
            removed.push(key);
            false
        }
        _ => true,
    });
    sort_by_signature(&mut pom.dependency_management);

    for key in &removed {
        tracing::info!("Removed unused managed dependency {key}");
    }
    PruneResult {
        original,
        removed,
        final_count: pom.dependency_management.len(),
    }
}

/// Options for `pomclean clean-dep-mgt`.
#[derive(Debug, Clone)]
pub struct CleanDepMgtOptions {
    pub output_file_name: String,
}

impl CleanDepMgtOptions {
    pub fn from_config(config: &CleanConfig) -> Self {
        Self {
            output_file_name: config.output_file_name.clone(),
        }
    }
}

/// Result for one host.
#[derive(Debug)]
pub struct HostReport {
    pub host: String,
    pub members: Vec<String>,
    pub original: usize,
    pub removed: Vec<DependencyKey>,
    pub final_count: usize,
    pub output: PathBuf,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct CleanDepMgtReport {
    pub mode: ManagementMode,
    pub hosts: Vec<HostReport>,
    /// Projects with dependencies but no managing ancestor.
    pub unhosted: Vec<String>,
}

impl CleanDepMgtReport {
    /// `true` when every host's clean POM was written.
    pub fn success(&self) -> bool {
        self.hosts.iter().all(|h| h.error.is_none())
    }
}

/// Prune the dependency management of every host in `tree`.
///
/// A failure while writing one host is recorded on its report and the
/// remaining hosts are still processed.
pub fn clean_dependency_management(
    tree: &mut ProjectTree,
    opts: &CleanDepMgtOptions,
) -> CleanDepMgtReport {
    let root = tree.root();
    let mode = classify(tree.get(root));
    let assignment = match mode {
        ManagementMode::SelfManaged => HostAssignment::single(root),
        ManagementMode::MultiModule => resolve_hosts(tree),
        ManagementMode::Unsupported => {
            tracing::info!(
                "Project structure of {} is not supported for dependency management cleanup",
                tree.get(root).display_name()
            );
            HostAssignment::new()
        }
    };
    if mode == ManagementMode::MultiModule && assignment.is_empty() {
        tracing::info!("No project in the tree declares dependency management");
    }

    let mut hosts = Vec::new();
    for (host, members) in assignment.iter() {
        let consumed = consumed_keys(tree, members);
        let member_names: Vec<String> = members
            .iter()
            .map(|&m| tree.get(m).display_name())
            .collect();
        let project = tree.get_mut(host);
        let pruned = prune_management(&mut project.pom, &consumed);
        tracing::info!(
            "Reduced managed dependencies of {} from {} to {}",
            project.display_name(),
            pruned.original,
            pruned.final_count
        );

        let output_dir = project.build_directory();
        let output = output_dir.join(&opts.output_file_name);
        let error = match write_host(project, &output_dir, &opts.output_file_name) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Failed to write {}: {e}", output.display());
                Some(e.to_string())
            }
        };
        hosts.push(HostReport {
            host: project.display_name(),
            members: member_names,
            original: pruned.original,
            removed: pruned.removed,
            final_count: pruned.final_count,
            output,
            error,
        });
    }

    CleanDepMgtReport {
        mode,
        hosts,
        unhosted: assignment
            .unhosted()
            .iter()
            .map(|&id| tree.get(id).display_name())
            .collect(),
    }
}

fn write_host(project: &Project, dir: &Path, file_name: &str) -> PomcleanResult<()> {
    pomclean_util::fs::ensure_dir(dir).map_err(PomcleanError::Io)?;
    crate::write_clean_pom(project, dir, file_name)?;
    Ok(())
}

/// Load the tree rooted at `pom_path` and clean its dependency management.
///
/// Failed hosts are an error only with `fail-build`.
pub fn run_clean_dep_mgt(
    pom_path: &Path,
    config: &CleanConfig,
) -> PomcleanResult<CleanDepMgtReport> {
    let mut tree = ProjectTree::load(pom_path)?;
    let report =
        clean_dependency_management(&mut tree, &CleanDepMgtOptions::from_config(config));
    if !report.success() {
        if config.fail_build {
            return Err(PomcleanError::DependencyProblems {
                message: "Failed to clean up the Dependency Management section.".to_string(),
            }
            .into());
        }
        tracing::warn!("Potential problems found in cleaning up the Dependency Management section.");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(path: &str, xml: &str) -> Project {
        Project::from_source(path, xml.to_string()).unwrap()
    }

    fn managed(project: &Project) -> Vec<String> {
        project
            .pom
            .dependency_management
            .iter()
            .map(|d| d.signature())
            .collect()
    }

    const ROOT: &str = "<project><artifactId>r</artifactId><packaging>pom</packaging>
        <modules><module>m1</module><module>m2</module></modules>
        <dependencyManagement><dependencies>
            <dependency><groupId>x</groupId><artifactId>x</artifactId><version>1</version></dependency>
            <dependency><groupId>z</groupId><artifactId>z</artifactId><version>1</version></dependency>
            <dependency><groupId>w</groupId><artifactId>w</artifactId><version>1</version></dependency>
        </dependencies></dependencyManagement>
    </project>";

    fn module(name: &str, deps: &[&str]) -> String {
        let deps: String = deps
            .iter()
            .map(|k| format!("<dependency><groupId>{k}</groupId><artifactId>{k}</artifactId></dependency>"))
            .collect();
        format!("<project><artifactId>{name}</artifactId><dependencies>{deps}</dependencies></project>")
    }

    #[test]
    fn classify_modes() {
        assert_eq!(classify(&project("/r/pom.xml", ROOT)), ManagementMode::MultiModule);
        assert_eq!(
            classify(&project("/r/pom.xml", &module("m", &["x"]))),
            ManagementMode::Unsupported
        );
        let self_managed = "<project>
            <modules><module>m</module></modules>
            <dependencyManagement><dependencies>
                <dependency><groupId>x</groupId><artifactId>x</artifactId></dependency>
            </dependencies></dependencyManagement>
            <dependencies>
                <dependency><groupId>x</groupId><artifactId>x</artifactId></dependency>
            </dependencies>
        </project>";
        assert_eq!(
            classify(&project("/r/pom.xml", self_managed)),
            ManagementMode::SelfManaged
        );
    }

    #[test]
    fn multi_module_management_is_reduced_to_consumed_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let mut tree = ProjectTree::new(project(base.join("pom.xml").to_str().unwrap(), ROOT));
        let root = tree.root();
        for (name, deps) in [("m1", &["x", "y"][..]), ("m2", &["z"][..])] {
            let path = base.join(name).join("pom.xml");
            let id = tree.add_module(root, project(path.to_str().unwrap(), &module(name, deps)));
            tree.set_parent(id, Some(root));
        }

        let report = clean_dependency_management(
            &mut tree,
            &CleanDepMgtOptions {
                output_file_name: "clean.pom.xml".to_string(),
            },
        );
        assert!(report.success());
        assert_eq!(report.hosts.len(), 1);
        assert_eq!(report.hosts[0].members, vec!["m1", "m2"]);
        assert_eq!(report.hosts[0].removed, vec![DependencyKey::new("w", "w")]);
        assert_eq!(managed(tree.get(root)), vec!["x:x", "z:z"]);

        let written = std::fs::read_to_string(base.join("target/clean.pom.xml")).unwrap();
        assert!(!written.contains("<groupId>w</groupId>"));
        assert!(written.contains("<module>m1</module>"));
    }

    #[test]
    fn self_managed_root_ignores_modules() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let root_xml = "<project><artifactId>r</artifactId>
            <modules><module>m</module></modules>
            <dependencyManagement><dependencies>
                <dependency><groupId>x</groupId><artifactId>x</artifactId></dependency>
                <dependency><groupId>y</groupId><artifactId>y</artifactId></dependency>
            </dependencies></dependencyManagement>
            <dependencies>
                <dependency><groupId>x</groupId><artifactId>x</artifactId></dependency>
            </dependencies>
        </project>";
        let mut tree = ProjectTree::new(project(base.join("pom.xml").to_str().unwrap(), root_xml));
        let root = tree.root();
        let m = tree.add_module(
            root,
            project(base.join("m/pom.xml").to_str().unwrap(), &module("m", &["y"])),
        );
        tree.set_parent(m, Some(root));

        let report = clean_dependency_management(
            &mut tree,
            &CleanDepMgtOptions {
                output_file_name: "clean.pom.xml".to_string(),
            },
        );
        assert_eq!(report.mode, ManagementMode::SelfManaged);
        assert_eq!(report.hosts[0].members, vec!["r"]);
        assert_eq!(managed(tree.get(root)), vec!["x:x"]);
    }

    #[test]
    fn unsupported_shape_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pom.xml");
        let mut tree = ProjectTree::new(project(path.to_str().unwrap(), &module("solo", &["x"])));
        let report = clean_dependency_management(
            &mut tree,
            &CleanDepMgtOptions {
                output_file_name: "clean.pom.xml".to_string(),
            },
        );
        assert_eq!(report.mode, ManagementMode::Unsupported);
        assert!(report.hosts.is_empty());
        assert!(report.success());
        assert!(!tmp.path().join("target").exists());
    }

    #[test]
    fn prune_keeps_entries_referenced_through_properties() {
        let mut pom = pomclean_maven::pom::parse_pom(
            "<project>
                <properties><g>org.lib</g></properties>
                <dependencyManagement><dependencies>
                    <dependency><groupId>${g}</groupId><artifactId>core</artifactId></dependency>
                    <dependency><groupId>org.lib</groupId><artifactId>extra</artifactId></dependency>
                </dependencies></dependencyManagement>
            </project>",
        )
        .unwrap();
        let consumed = HashSet::from([DependencyKey::new("org.lib", "core")]);
        let result = prune_management(&mut pom, &consumed);
        assert_eq!(result.original, 2);
        assert_eq!(result.final_count, 1);
        assert_eq!(result.removed, vec![DependencyKey::new("org.lib", "extra")]);
    }
}
