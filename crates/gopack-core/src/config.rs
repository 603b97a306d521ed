//! Run configuration.
//!
//! One [`Config`] value is built by the caller and handed to the analyzer,
//! the locator and the resolution engine. Nothing in the crate reads
//! process-wide state on its own.

use std::path::{Path, PathBuf};

/// File name of the dependency manifest inside the project root.
pub const MANIFEST_NAME: &str = "gopack.config";

/// Working directory gopack keeps inside the project root.
pub const WORK_DIR: &str = ".gopack";

/// Default bound on how many times one question is asked.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Project root to analyze
    pub project_root: PathBuf,
    /// Where fetched or copied dependencies land, mirroring their import path
    pub dependency_root: PathBuf,
    /// The operator's standard source root (`$GOPATH/src`), searched for local checkouts
    pub standard_root: Option<PathBuf>,
    /// Whether a local copy may overwrite files that already exist
    pub overwrite: bool,
    /// Include `_test.go` files in the analysis
    pub include_tests: bool,
    /// Bound on re-prompts for a single question
    pub max_attempts: usize,
}

impl Config {
    /// Configuration with the default layout under `project_root`.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let dependency_root = project_root.join(WORK_DIR).join("vendor").join("src");
        Self {
            project_root,
            dependency_root,
            standard_root: None,
            overwrite: false,
            include_tests: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Use `gopath/src` as the standard source root.
    pub fn with_gopath(mut self, gopath: impl AsRef<Path>) -> Self {
        self.standard_root = Some(gopath.as_ref().join("src"));
        self
    }

    pub fn with_dependency_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dependency_root = dir.into();
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.project_root.join(MANIFEST_NAME)
    }

    /// Directory a dependency with this import path is materialized into.
    pub fn dependency_path(&self, import_path: &str) -> PathBuf {
        join_import_path(&self.dependency_root, import_path)
    }

    /// Where a standard-root checkout of this import path would live.
    pub fn standard_path(&self, import_path: &str) -> Option<PathBuf> {
        self.standard_root
            .as_ref()
            .map(|root| join_import_path(root, import_path))
    }
}

/// Join a slash-separated import path onto a directory.
pub fn join_import_path(base: &Path, import_path: &str) -> PathBuf {
    import_path
        .split('/')
        .filter(|seg| !seg.is_empty())
        .fold(base.to_path_buf(), |acc, seg| acc.join(seg))
}
