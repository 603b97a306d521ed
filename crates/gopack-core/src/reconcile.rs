//! Diff declared dependencies against used imports.

use std::fmt;

use serde::Serialize;

use crate::analyzer::Project;
use crate::manifest::Manifest;

/// Classification of a mismatch between the manifest and the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectErrorKind {
    /// Declared in the manifest, never imported
    UnusedDep,
    /// Imported, never declared
    UnmanagedImport,
}

impl fmt::Display for ProjectErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectErrorKind::UnusedDep => f.write_str("unused"),
            ProjectErrorKind::UnmanagedImport => f.write_str("unmanaged"),
        }
    }
}

/// One discrepancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectError {
    pub kind: ProjectErrorKind,
    pub path: String,
    pub message: String,
}

impl ProjectError {
    pub fn unused(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            kind: ProjectErrorKind::UnusedDep,
            message: format!("{path} is declared but not used"),
            path,
        }
    }

    pub fn unmanaged(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            kind: ProjectErrorKind::UnmanagedImport,
            message: format!("{path} is used but not declared"),
            path,
        }
    }
}

impl fmt::Display for ProjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl Manifest {
    /// Every discrepancy between this manifest and `project`.
    ///
    /// Unused declarations come first, in declaration order, followed by
    /// unmanaged imports in the project's order.
    pub fn validate(&self, project: &Project) -> Vec<ProjectError> {
        let unused = self
            .declared_paths()
            .filter(|path| !project.uses(path))
            .map(ProjectError::unused);

        let unmanaged = project
            .imports()
            .filter(|path| !self.contains(path))
            .map(ProjectError::unmanaged);

        unused.chain(unmanaged).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn manifest(text: &str) -> Manifest {
        Manifest::parse(text, Path::new("gopack.config")).unwrap()
    }

    #[test]
    fn exact_match_is_clean() {
        let m = manifest("[deps.foo]\nimport = \"example.org/foo\"\ncommit = \"abc123\"\n");
        let p = Project::new(["example.org/foo"]);
        assert!(m.validate(&p).is_empty());
    }

    #[test]
    fn disjoint_sets_report_everything() {
        let m = manifest(
            "[deps.a]\nimport = \"x.org/a\"\n[deps.b]\nimport = \"x.org/b\"\n",
        );
        let p = Project::new(["y.org/c", "y.org/d", "y.org/e"]);
        let errors = m.validate(&p);

        let unused = errors.iter().filter(|e| e.kind == ProjectErrorKind::UnusedDep).count();
        let unmanaged = errors
            .iter()
            .filter(|e| e.kind == ProjectErrorKind::UnmanagedImport)
            .count();
        assert_eq!((unused, unmanaged), (m.len(), p.len()));
        assert_eq!(errors.len(), m.len() + p.len());
    }

    #[test]
    fn ordering_follows_declaration_then_project() {
        let m = manifest(
            "[deps.z]\nimport = \"x.org/z\"\n[deps.a]\nimport = \"x.org/a\"\n",
        );
        let p = Project::new(["y.org/b", "y.org/a"]);
        let paths: Vec<_> = m.validate(&p).into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["x.org/z", "x.org/a", "y.org/a", "y.org/b"]);
    }

    #[test]
    fn validate_is_repeatable() {
        let m = manifest("[deps.a]\nimport = \"x.org/a\"\n");
        let p = Project::new(["y.org/b"]);
        assert_eq!(m.validate(&p), m.validate(&p));
    }

    #[test]
    fn messages_name_the_path() {
        let e = ProjectError::unused("x.org/a");
        assert_eq!(e.message, "x.org/a is declared but not used");
        assert_eq!(e.to_string(), "[unused] x.org/a is declared but not used");
    }

    #[test]
    fn serializes_kind_in_snake_case() {
        let v = serde_json::to_value(ProjectError::unmanaged("x.org/a")).unwrap();
        assert_eq!(v["kind"], "unmanaged_import");
        assert_eq!(v["path"], "x.org/a");
    }
}
