//! Finding which project's `<dependencyManagement>` governs each module.

use std::collections::HashMap;

use pomclean_maven::project::{ProjectId, ProjectTree};

/// Hosts of dependency management mapped to the projects they govern.
///
/// Hosts and members keep the order in which the tree walk found them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostAssignment {
    hosts: Vec<(ProjectId, Vec<ProjectId>)>,
    index: HashMap<ProjectId, usize>,
    unhosted: Vec<ProjectId>,
}

impl HostAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A project that manages its own dependencies and nothing else.
    pub fn single(host: ProjectId) -> Self {
        let mut assignment = Self::new();
        assignment.add(host, host);
        assignment
    }

    /// Register `member` under `host`. A member is recorded once.
    pub fn add(&mut self, host: ProjectId, member: ProjectId) {
        let slot = *self.index.entry(host).or_insert_with(|| {
            self.hosts.push((host, Vec::new()));
            self.hosts.len() - 1
        });
        let members = &mut self.hosts[slot].1;
        if !members.contains(&member) {
            members.push(member);
        }
    }

    /// Projects with dependencies but no managing ancestor.
    pub fn unhosted(&self) -> &[ProjectId] {
        &self.unhosted
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProjectId, &[ProjectId])> {
        self.hosts
            .iter()
            .map(|(host, members)| (*host, members.as_slice()))
    }

    pub fn hosts(&self) -> impl Iterator<Item = ProjectId> + '_ {
        self.hosts.iter().map(|(host, _)| *host)
    }

    pub fn members(&self, host: ProjectId) -> &[ProjectId] {
        match self.index.get(&host) {
            Some(&slot) => &self.hosts[slot].1,
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Walk the module tree from the root and assign every project that declares
/// dependencies to its nearest managing project: itself, or the closest
/// ancestor with a non-empty `<dependencyManagement>`.
///
/// The root only ever hosts itself. Projects without dependencies are
/// traversed but never assigned.
pub fn resolve_hosts(tree: &ProjectTree) -> HostAssignment {
    let mut assignment = HostAssignment::new();
    visit(tree, tree.root(), false, &mut assignment);
    assignment
}

fn visit(tree: &ProjectTree, id: ProjectId, search_up: bool, assignment: &mut HostAssignment) {
    let project = tree.get(id);
    if project.has_dependencies() {
        if project.has_dependency_management() {
            tracing::info!("Project {} manages its own dependencies", project.display_name());
            assignment.add(id, id);
        } else if search_up {
            match find_host_in_ancestors(tree, id) {
                Some(host) => {
                    tracing::info!(
                        "Added managed project {} to host {}",
                        project.display_name(),
                        tree.get(host).display_name()
                    );
                    assignment.add(host, id);
                }
                None => {
                    tracing::warn!(
                        "No parent of {} declares dependency management",
                        project.display_name()
                    );
                    assignment.unhosted.push(id);
                }
            }
        }
    }
    for &module in tree.modules(id) {
        visit(tree, module, true, assignment);
    }
}

/// Nearest ancestor of `id` with a non-empty `<dependencyManagement>`.
pub fn find_host_in_ancestors(tree: &ProjectTree, id: ProjectId) -> Option<ProjectId> {
    tree.ancestors(id)
        .find(|&ancestor| tree.get(ancestor).has_dependency_management())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pomclean_maven::project::Project;

    fn project(path: &str, artifact: &str, deps: &[&str], managed: &[&str]) -> Project {
        let section = |keys: &[&str]| -> String {
            keys.iter()
                .map(|k| format!("<dependency><groupId>{k}</groupId><artifactId>{k}</artifactId></dependency>"))
                .collect()
        };
        let mut xml = format!("<project><groupId>g</groupId><artifactId>{artifact}</artifactId>");
        if !managed.is_empty() {
            xml.push_str(&format!(
                "<dependencyManagement><dependencies>{}</dependencies></dependencyManagement>",
                section(managed)
            ));
        }
        if !deps.is_empty() {
            xml.push_str(&format!("<dependencies>{}</dependencies>", section(deps)));
        }
        xml.push_str("</project>");
        Project::from_source(path, xml).unwrap()
    }

    fn child(tree: &mut ProjectTree, parent: ProjectId, project: Project) -> ProjectId {
        let id = tree.add_module(parent, project);
        tree.set_parent(id, Some(parent));
        id
    }

    #[test]
    fn root_hosts_modules() {
        let mut tree = ProjectTree::new(project("/r/pom.xml", "r", &[], &["x", "z", "w"]));
        let root = tree.root();
        let m1 = child(&mut tree, root, project("/r/m1/pom.xml", "m1", &["x", "y"], &[]));
        let m2 = child(&mut tree, root, project("/r/m2/pom.xml", "m2", &["z"], &[]));

        let assignment = resolve_hosts(&tree);
        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment.members(root), &[m1, m2]);
        assert!(assignment.unhosted().is_empty());
    }

    #[test]
    fn module_with_own_management_hosts_itself() {
        let mut tree = ProjectTree::new(project("/r/pom.xml", "r", &[], &["x"]));
        let root = tree.root();
        let m1 = child(&mut tree, root, project("/r/m1/pom.xml", "m1", &["y"], &["y"]));
        let m2 = child(&mut tree, root, project("/r/m2/pom.xml", "m2", &["x"], &[]));

        let assignment = resolve_hosts(&tree);
        assert_eq!(assignment.hosts().collect::<Vec<_>>(), vec![m1, root]);
        assert_eq!(assignment.members(m1), &[m1]);
        assert_eq!(assignment.members(root), &[m2]);
    }

    #[test]
    fn nearest_managing_ancestor_wins() {
        let mut tree = ProjectTree::new(project("/r/pom.xml", "r", &[], &["x"]));
        let root = tree.root();
        let mid = child(&mut tree, root, project("/r/mid/pom.xml", "mid", &[], &["x"]));
        let leaf = child(&mut tree, mid, project("/r/mid/leaf/pom.xml", "leaf", &["x"], &[]));

        let assignment = resolve_hosts(&tree);
        assert_eq!(assignment.members(mid), &[leaf]);
        assert!(assignment.members(root).is_empty());
    }

    #[test]
    fn projects_without_dependencies_are_never_members() {
        let mut tree = ProjectTree::new(project("/r/pom.xml", "r", &[], &["x"]));
        let root = tree.root();
        let agg = child(&mut tree, root, project("/r/agg/pom.xml", "agg", &[], &[]));
        let leaf = child(&mut tree, agg, project("/r/agg/leaf/pom.xml", "leaf", &["x"], &[]));

        let assignment = resolve_hosts(&tree);
        for (_, members) in assignment.iter() {
            assert!(!members.contains(&agg));
            assert!(!members.contains(&root));
        }
        assert_eq!(assignment.members(root), &[leaf]);
    }

    #[test]
    fn orphan_is_recorded_as_unhosted() {
        let mut tree = ProjectTree::new(project("/r/pom.xml", "r", &[], &[]));
        let root = tree.root();
        let m = child(&mut tree, root, project("/r/m/pom.xml", "m", &["x"], &[]));

        let assignment = resolve_hosts(&tree);
        assert!(assignment.is_empty());
        assert_eq!(assignment.unhosted(), &[m]);
    }

    #[test]
    fn root_with_dependencies_does_not_search_up() {
        let mut tree = ProjectTree::new(project("/r/m/pom.xml", "m", &["x"], &[]));
        let root = tree.root();
        let parent = tree.add_detached(project("/r/pom.xml", "r", &[], &["x"]));
        tree.set_parent(root, Some(parent));

        let assignment = resolve_hosts(&tree);
        assert!(assignment.is_empty());
        assert!(assignment.unhosted().is_empty());
        assert_eq!(find_host_in_ancestors(&tree, root), Some(parent));
    }

    #[test]
    fn single_assignment() {
        let tree = ProjectTree::new(project("/r/pom.xml", "r", &["x"], &["x"]));
        let assignment = HostAssignment::single(tree.root());
        assert_eq!(assignment.members(tree.root()), &[tree.root()]);
    }
}
