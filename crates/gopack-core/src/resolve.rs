//! Interactive resolution of discrepancies.
//!
//! Each [`ProjectError`] runs through its own small decision automaton:
//!
//! - unused: `Prompt -> {Remove, Nothing}`
//! - unmanaged: `Prompt -> Nothing`, or `Prompt -> ChooseSCM ->
//!   {CopyLocal, DownloadRemote, PinCommit, PinTag, PinBranch, PinMaster}`
//!
//! Every terminal state that changes something writes through to the
//! manifest before the next discrepancy is looked at.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{join_import_path, Config, MANIFEST_NAME};
use crate::copy::copy_tree;
use crate::error::{GopackError, Result};
use crate::locate::{locate_within, LocalCheckout};
use crate::manifest::{Dependency, ManifestFile, Revision, PLACEHOLDER_REVISION};
use crate::prompt::{ask_text, ask_with_default, choose, MenuChoice, Prompt};
use crate::reconcile::{ProjectError, ProjectErrorKind};
use crate::vcs::{Fetcher, ScmKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedChoice {
    Nothing,
    Remove,
}

impl MenuChoice for UnusedChoice {
    fn key(&self) -> char {
        match self {
            UnusedChoice::Nothing => 'N',
            UnusedChoice::Remove => 'R',
        }
    }

    fn label(&self) -> String {
        match self {
            UnusedChoice::Nothing => "Nothing".to_string(),
            UnusedChoice::Remove => format!("Remove it from {MANIFEST_NAME}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmanagedChoice {
    Nothing,
    CopyLocal,
    DownloadRemote,
    PinCommit,
    PinTag,
    PinBranch,
    PinMaster,
}

impl MenuChoice for UnmanagedChoice {
    fn key(&self) -> char {
        match self {
            UnmanagedChoice::Nothing => 'N',
            UnmanagedChoice::CopyLocal => 'L',
            UnmanagedChoice::DownloadRemote => 'R',
            UnmanagedChoice::PinCommit => 'C',
            UnmanagedChoice::PinTag => 'T',
            UnmanagedChoice::PinBranch => 'B',
            UnmanagedChoice::PinMaster => 'M',
        }
    }

    fn label(&self) -> String {
        match self {
            UnmanagedChoice::Nothing => "Nothing".to_string(),
            UnmanagedChoice::CopyLocal => {
                "Copy the version found in the local *standard* source root".to_string()
            }
            UnmanagedChoice::DownloadRemote => {
                format!("Download the latest from repo and add the commit hash to {MANIFEST_NAME}")
            }
            UnmanagedChoice::PinCommit => format!("Add to {MANIFEST_NAME} with a specific commit"),
            UnmanagedChoice::PinTag => format!("Add to {MANIFEST_NAME} with a specific tag"),
            UnmanagedChoice::PinBranch => format!("Add to {MANIFEST_NAME} with a specific branch"),
            UnmanagedChoice::PinMaster => format!("Add to {MANIFEST_NAME} the 'master' branch"),
        }
    }
}

/// Outcome of resolving one discrepancy.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The operator chose to do nothing
    Skipped(String),
    Removed(Dependency),
    Pinned(Dependency),
    Copied {
        dependency: Dependency,
        from: PathBuf,
        to: PathBuf,
    },
    Downloaded {
        dependency: Dependency,
        remote: String,
        to: PathBuf,
    },
}

impl Resolution {
    pub fn import(&self) -> &str {
        match self {
            Resolution::Skipped(import) => import,
            Resolution::Removed(dep) | Resolution::Pinned(dep) => &dep.import,
            Resolution::Copied { dependency, .. } | Resolution::Downloaded { dependency, .. } => {
                &dependency.import
            }
        }
    }

    /// Whether the manifest was changed.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Resolution::Skipped(_))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Skipped(import) => write!(f, "{import}: left as is"),
            Resolution::Removed(dep) => write!(f, "{}: removed [deps.{}]", dep.import, dep.name),
            Resolution::Pinned(dep) => write!(
                f,
                "{}: pinned to {} {:?} ({})",
                dep.import,
                dep.revision.key().unwrap_or("revision"),
                dep.revision.value(),
                dep.scm
            ),
            Resolution::Copied { dependency, from, to } => write!(
                f,
                "{}: copied {} to {}",
                dependency.import,
                from.display(),
                to.display()
            ),
            Resolution::Downloaded { dependency, remote, to } => write!(
                f,
                "{}: fetched {} into {}",
                dependency.import,
                remote,
                to.display()
            ),
        }
    }
}

/// Drives the decision automata against one manifest.
pub struct Resolver<'a, P, F> {
    config: &'a Config,
    manifest: &'a mut ManifestFile,
    prompt: P,
    fetcher: F,
}

impl<'a, P: Prompt, F: Fetcher> Resolver<'a, P, F> {
    pub fn new(config: &'a Config, manifest: &'a mut ManifestFile, prompt: P, fetcher: F) -> Self {
        Self {
            config,
            manifest,
            prompt,
            fetcher,
        }
    }

    /// Resolve every discrepancy in order, stopping at the first fatal error.
    pub fn resolve_all(&mut self, errors: &[ProjectError]) -> Result<Vec<Resolution>> {
        let mut resolutions = Vec::with_capacity(errors.len());
        for error in errors {
            let resolution = self.resolve(error)?;
            info!(import = %resolution.import(), outcome = %resolution, "resolved");
            resolutions.push(resolution);
        }
        Ok(resolutions)
    }

    pub fn resolve(&mut self, error: &ProjectError) -> Result<Resolution> {
        match error.kind {
            ProjectErrorKind::UnusedDep => self.fix_unused(error),
            ProjectErrorKind::UnmanagedImport => self.fix_unmanaged(error),
        }
    }

    fn fix_unused(&mut self, error: &ProjectError) -> Result<Resolution> {
        self.prompt.notify(&error.message);
        let question = format!("What to do about UNUSED dependency: '{}' ?", error.path);
        let choice = choose(
            &mut self.prompt,
            &question,
            &[UnusedChoice::Nothing, UnusedChoice::Remove],
            self.config.max_attempts,
        )?;

        match choice {
            UnusedChoice::Remove => {
                let removed = self.manifest.remove(&error.path)?;
                self.prompt.notify(&format!(
                    "Removed entry [deps.{}] from {MANIFEST_NAME}.",
                    removed.name
                ));
                Ok(Resolution::Removed(removed))
            }
            UnusedChoice::Nothing => Ok(Resolution::Skipped(error.path.clone())),
        }
    }

    fn fix_unmanaged(&mut self, error: &ProjectError) -> Result<Resolution> {
        self.prompt.notify(&error.message);
        let import = error.path.as_str();
        let local = self.find_local(import);

        let mut choices = vec![UnmanagedChoice::Nothing];
        if local.is_some() {
            choices.push(UnmanagedChoice::CopyLocal);
        }
        choices.extend([
            UnmanagedChoice::DownloadRemote,
            UnmanagedChoice::PinCommit,
            UnmanagedChoice::PinTag,
            UnmanagedChoice::PinBranch,
            UnmanagedChoice::PinMaster,
        ]);

        let question = match &local {
            Some(checkout) => format!(
                "What to do about UNMANAGED dependency: '{import}' ? ({} checkout at {})",
                checkout.scm,
                checkout.dir.display()
            ),
            None => format!("What to do about UNMANAGED dependency: '{import}' ?"),
        };
        let choice = choose(&mut self.prompt, &question, &choices, self.config.max_attempts)?;
        if choice == UnmanagedChoice::Nothing {
            return Ok(Resolution::Skipped(import.to_string()));
        }

        let scm = choose(&mut self.prompt, "SCM", &ScmKind::ALL, self.config.max_attempts)?;

        match (choice, local) {
            (UnmanagedChoice::PinCommit, _) => {
                let commit = ask_text(&mut self.prompt, "Commit hash", self.config.max_attempts)?;
                self.pin(import, Revision::Commit(commit), scm)
            }
            (UnmanagedChoice::PinTag, _) => {
                let tag = ask_text(&mut self.prompt, "Tag name", self.config.max_attempts)?;
                self.pin(import, Revision::Tag(tag), scm)
            }
            (UnmanagedChoice::PinBranch, _) => {
                let branch = ask_text(&mut self.prompt, "Branch name", self.config.max_attempts)?;
                self.pin(import, Revision::Branch(branch), scm)
            }
            (UnmanagedChoice::PinMaster, _) => {
                self.pin(import, Revision::Branch("master".to_string()), scm)
            }
            (UnmanagedChoice::DownloadRemote, _) => self.download(import, scm),
            (UnmanagedChoice::CopyLocal, Some(checkout)) => self.copy_local(import, &checkout, scm),
            (UnmanagedChoice::CopyLocal, None) | (UnmanagedChoice::Nothing, _) => {
                Ok(Resolution::Skipped(import.to_string()))
            }
        }
    }

    /// Look for a checkout of `import` under the standard source root.
    ///
    /// Never fails; a miss only hides the copy option.
    fn find_local(&self, import: &str) -> Option<LocalCheckout> {
        let root = self.config.standard_root.as_deref()?;
        let start = join_import_path(root, import);
        match locate_within(&start, root) {
            Ok(checkout) if checkout.dir != root => Some(checkout),
            Ok(_) => None,
            Err(err) => {
                debug!(import, error = %err, "no local checkout");
                None
            }
        }
    }

    fn pin(&mut self, import: &str, revision: Revision, scm: ScmKind) -> Result<Resolution> {
        let dep = self.add(import, revision, scm)?;
        Ok(Resolution::Pinned(dep))
    }

    fn copy_local(
        &mut self,
        import: &str,
        checkout: &LocalCheckout,
        scm: ScmKind,
    ) -> Result<Resolution> {
        let standard_root = self
            .config
            .standard_root
            .as_deref()
            .ok_or_else(|| GopackError::NoScmProject(checkout.dir.clone()))?;
        let rel = checkout
            .dir
            .strip_prefix(standard_root)
            .map_err(|_| GopackError::NoScmProject(checkout.dir.clone()))?;
        let into = match rel.parent() {
            Some(parent) => self.config.dependency_root.join(parent),
            None => self.config.dependency_root.clone(),
        };

        fs::create_dir_all(&into)?;
        self.prompt.notify(&format!(
            "Copying {} into {}",
            checkout.dir.display(),
            into.display()
        ));
        let to = copy_tree(&checkout.dir, &into, self.config.overwrite)?;

        let dependency = self.add(import, Revision::Branch(PLACEHOLDER_REVISION.to_string()), scm)?;
        Ok(Resolution::Copied {
            dependency,
            from: checkout.dir.clone(),
            to,
        })
    }

    fn download(&mut self, import: &str, scm: ScmKind) -> Result<Resolution> {
        let default_remote = default_remote(import);
        let remote =
            ask_with_default(&mut self.prompt, "Repo path to fetch from", &default_remote)?;
        let target = self.config.dependency_path(import);
        ensure_parent(&target)?;

        self.prompt.notify(&format!("Downloading from {remote}"));
        let plan = scm.fetch_plan(&remote, &target, None);
        self.fetcher.fetch(&plan)?;

        let dependency = self.add(import, Revision::Commit(PLACEHOLDER_REVISION.to_string()), scm)?;
        Ok(Resolution::Downloaded {
            dependency,
            remote,
            to: target,
        })
    }

    fn add(&mut self, import: &str, revision: Revision, scm: ScmKind) -> Result<Dependency> {
        let dep = self.manifest.add(import, revision, scm)?;
        self.prompt.notify(&format!(
            "Created new entry [deps.{}] in {MANIFEST_NAME} file.",
            dep.name
        ));
        Ok(dep)
    }
}

/// Remote a dependency is fetched from unless the operator says otherwise.
pub fn default_remote(import: &str) -> String {
    format!("https://{import}")
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
