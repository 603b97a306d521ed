//! The `gopack.config` dependency manifest.
//!
//! The file is parsed into a structural [`Manifest`] and every mutation
//! re-renders the whole document and atomically replaces the file.
//! [`ManifestFile`] is the only type that writes it.
//!
//! ```toml
//! repo = "example.org/app"
//!
//! [deps.foo]
//! import = "example.org/foo"
//! commit = "abc123"
//! scm = "git"
//! ```

use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{GopackError, Result};
use crate::vcs::ScmKind;

/// Revision value recorded when the real one is filled in later.
pub const PLACEHOLDER_REVISION: &str = "TODO";

const DEPS_KEY: &str = "deps";
const REPO_KEY: &str = "repo";

/// What a dependency is pinned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Revision {
    Branch(String),
    Tag(String),
    Commit(String),
    Unspecified,
}

impl Revision {
    /// Manifest key for this revision kind, if it has one.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Revision::Branch(_) => Some("branch"),
            Revision::Tag(_) => Some("tag"),
            Revision::Commit(_) => Some("commit"),
            Revision::Unspecified => None,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Revision::Branch(v) | Revision::Tag(v) | Revision::Commit(v) => v,
            Revision::Unspecified => "",
        }
    }

    /// True for the deferred `"TODO"` marker and for a missing revision.
    pub fn is_placeholder(&self) -> bool {
        match self {
            Revision::Unspecified => true,
            other => other.value() == PLACEHOLDER_REVISION,
        }
    }
}

/// One declared dependency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dependency {
    /// Table key under `[deps]`
    pub name: String,
    /// Import path, unique within the manifest
    pub import: String,
    pub revision: Revision,
    pub scm: ScmKind,
    /// Keys gopack does not interpret, kept verbatim on rewrite
    #[serde(skip)]
    pub extra: toml::Table,
}

impl Dependency {
    pub fn new(import: impl Into<String>, revision: Revision, scm: ScmKind) -> Result<Self> {
        let import = import.into();
        let import = import.trim().trim_matches('/').to_string();
        if import.is_empty() {
            return Err(GopackError::InvalidDependency(
                "import path must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name: short_name(&import).to_string(),
            import,
            revision,
            scm,
            extra: toml::Table::new(),
        })
    }
}

/// Last segment of an import path.
pub fn short_name(import: &str) -> &str {
    let trimmed = import.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// In-memory structural view of the manifest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    repo: Option<String>,
    dependencies: Vec<Dependency>,
    extra: toml::Table,
}

impl Manifest {
    /// A manifest that only records the project's own import path.
    pub fn blank(repo: impl Into<String>) -> Self {
        let repo = repo.into();
        Self {
            repo: (!repo.is_empty()).then_some(repo),
            ..Self::default()
        }
    }

    /// The project's own import path.
    pub fn repo(&self) -> Option<&str> {
        self.repo.as_deref()
    }

    /// Declared dependencies in declaration order.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn get(&self, import: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| d.import == import)
    }

    pub fn contains(&self, import: &str) -> bool {
        self.get(import).is_some()
    }

    pub fn declared_paths(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|d| d.import.as_str())
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Parse manifest text. `path` is only used in error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let parse_err = |message: String| GopackError::ManifestParse {
            path: path.to_path_buf(),
            message,
        };

        let mut doc: toml::Table = text
            .parse()
            .map_err(|e: toml::de::Error| parse_err(e.to_string()))?;

        let repo = match doc.remove(REPO_KEY) {
            None => None,
            Some(toml::Value::String(s)) => Some(s),
            Some(other) => {
                return Err(parse_err(format!(
                    "`repo` must be a string, found {}",
                    other.type_str()
                )))
            }
        };

        let mut dependencies: Vec<Dependency> = Vec::new();
        match doc.remove(DEPS_KEY) {
            None => {}
            Some(toml::Value::Table(deps)) => {
                for (name, entry) in deps {
                    let toml::Value::Table(entry) = entry else {
                        return Err(parse_err(format!("[deps.{name}] must be a table")));
                    };
                    let dep = parse_dependency(name, entry).map_err(|e| match e {
                        GopackError::InvalidDependency(msg) => parse_err(msg),
                        other => other,
                    })?;
                    if dependencies.iter().any(|d| d.import == dep.import) {
                        return Err(parse_err(format!("import {:?} declared twice", dep.import)));
                    }
                    dependencies.push(dep);
                }
            }
            Some(other) => {
                return Err(parse_err(format!(
                    "`deps` must be a table, found {}",
                    other.type_str()
                )))
            }
        }

        debug!(path = ?path, count = dependencies.len(), "parsed manifest");
        Ok(Self {
            repo,
            dependencies,
            extra: doc,
        })
    }

    /// Render the whole document.
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        if let Some(repo) = &self.repo {
            let _ = writeln!(out, "{REPO_KEY} = {}", quote(repo));
        }
        if !self.extra.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&toml::to_string(&self.extra).map_err(|e| {
                GopackError::InvalidDependency(format!("unrenderable manifest key: {e}"))
            })?);
        }
        for dep in &self.dependencies {
            if !out.is_empty() {
                out.push('\n');
            }
            let _ = writeln!(out, "[{DEPS_KEY}.{}]", render_key(&dep.name));
            let _ = writeln!(out, "import = {}", quote(&dep.import));
            if let Some(key) = dep.revision.key() {
                let _ = writeln!(out, "{key} = {}", quote(dep.revision.value()));
            }
            let _ = writeln!(out, "scm = {}", quote(dep.scm.tag()));
            for (key, value) in &dep.extra {
                let _ = writeln!(out, "{} = {}", render_key(key), value);
            }
        }
        Ok(out)
    }

    /// Append `dep` under a free table key; returns the entry as stored.
    fn insert(&mut self, mut dep: Dependency) -> Result<Dependency> {
        if self.contains(&dep.import) {
            return Err(GopackError::DuplicateDependency(dep.import));
        }
        dep.name = self.unique_name(&dep.name);
        self.dependencies.push(dep.clone());
        Ok(dep)
    }

    fn take(&mut self, import: &str) -> Result<Dependency> {
        let idx = self
            .dependencies
            .iter()
            .position(|d| d.import == import)
            .ok_or_else(|| GopackError::UnknownDependency(import.to_string()))?;
        Ok(self.dependencies.remove(idx))
    }

    fn unique_name(&self, base: &str) -> String {
        let taken = |name: &str| self.dependencies.iter().any(|d| d.name == name);
        if !taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}-{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

fn parse_dependency(name: String, mut entry: toml::Table) -> Result<Dependency> {
    let import = match entry.remove("import") {
        Some(toml::Value::String(s)) if !s.trim().is_empty() => s,
        Some(_) => {
            return Err(GopackError::InvalidDependency(format!(
                "[deps.{name}] `import` must be a non-empty string"
            )))
        }
        None => {
            return Err(GopackError::InvalidDependency(format!(
                "[deps.{name}] is missing `import`"
            )))
        }
    };

    let mut revision = Revision::Unspecified;
    for key in ["branch", "tag", "commit"] {
        let Some(value) = entry.remove(key) else {
            continue;
        };
        let toml::Value::String(value) = value else {
            return Err(GopackError::InvalidDependency(format!(
                "[deps.{name}] `{key}` must be a string"
            )));
        };
        if revision != Revision::Unspecified {
            return Err(GopackError::InvalidDependency(format!(
                "[deps.{name}] declares more than one of branch, tag, commit"
            )));
        }
        revision = match key {
            "branch" => Revision::Branch(value),
            "tag" => Revision::Tag(value),
            _ => Revision::Commit(value),
        };
    }

    let scm = match entry.remove("scm") {
        None => {
            debug!(dep = %name, "no scm declared, assuming git");
            ScmKind::Git
        }
        Some(toml::Value::String(tag)) => tag.parse()?,
        Some(_) => {
            return Err(GopackError::InvalidDependency(format!(
                "[deps.{name}] `scm` must be a string"
            )))
        }
    };

    Ok(Dependency {
        name,
        import,
        revision,
        scm,
        extra: entry,
    })
}

fn quote(s: &str) -> String {
    toml::Value::String(s.to_string()).to_string()
}

fn render_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        key.to_string()
    } else {
        quote(key)
    }
}

/// The persisted manifest and the sole writer of it.
#[derive(Debug)]
pub struct ManifestFile {
    path: PathBuf,
    manifest: Manifest,
}

impl ManifestFile {
    /// Load the manifest at `path`.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let text = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GopackError::ManifestMissing(path.clone())
            } else {
                GopackError::Io(e)
            }
        })?;
        let manifest = Manifest::parse(&text, &path)?;
        Ok(Self { path, manifest })
    }

    /// Write a manifest holding only `repo` metadata. Refuses to clobber.
    pub fn create_blank(path: impl Into<PathBuf>, repo: &str) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            return Err(GopackError::DestinationExists(path));
        }
        let file = Self {
            path,
            manifest: Manifest::blank(repo),
        };
        file.write(&file.manifest)?;
        info!(path = ?file.path, repo, "created blank manifest");
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Declare a new dependency and persist the manifest.
    pub fn add(&mut self, import: &str, revision: Revision, scm: ScmKind) -> Result<Dependency> {
        let dep = Dependency::new(import, revision, scm)?;
        let mut next = self.manifest.clone();
        let added = next.insert(dep)?;
        self.write(&next)?;
        self.manifest = next;
        info!(
            import = %added.import,
            name = %added.name,
            scm = %added.scm,
            revision = ?added.revision,
            "added dependency"
        );
        Ok(added)
    }

    /// Drop the declaration for `import` and persist the manifest.
    pub fn remove(&mut self, import: &str) -> Result<Dependency> {
        let mut next = self.manifest.clone();
        let removed = next.take(import)?;
        self.write(&next)?;
        self.manifest = next;
        info!(import = %removed.import, "removed dependency");
        Ok(removed)
    }

    fn write(&self, manifest: &Manifest) -> Result<()> {
        let rendered = manifest.render()?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // Same directory so the rename cannot cross filesystems.
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(rendered.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
