use serde::{Deserialize, Serialize};

/// Maven dependency scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    Compile,
    Provided,
    Runtime,
    Test,
    System,
    Import,
}

impl Default for DependencyScope {
    fn default() -> Self {
        Self::Compile
    }
}

impl DependencyScope {
    /// Parse a scope as written in a POM or analyzer output.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "compile" => Some(Self::Compile),
            "provided" => Some(Self::Provided),
            "runtime" => Some(Self::Runtime),
            "test" => Some(Self::Test),
            "system" => Some(Self::System),
            "import" => Some(Self::Import),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Provided => "provided",
            Self::Runtime => "runtime",
            Self::Test => "test",
            Self::System => "system",
            Self::Import => "import",
        }
    }

    /// `true` for the implicit default scope, which is never written out.
    pub fn is_compile(&self) -> bool {
        *self == Self::Compile
    }
}

impl std::fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a dependency: `groupId` and `artifactId`.
///
/// Version, scope, type and classifier are not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyKey {
    pub group_id: String,
    pub artifact_id: String,
}

impl DependencyKey {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// `group:artifact`, the ordering key of dependency lists.
    pub fn signature(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }
}

impl std::fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.signature())
    }
}
