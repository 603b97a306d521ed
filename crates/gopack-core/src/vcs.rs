//! Version-control backends.
//!
//! [`ScmKind`] is the closed set of supported backends. Each variant knows
//! its manifest tag, the hidden metadata directory that marks a checkout,
//! and how to turn "fetch this remote into that directory" into concrete
//! commands. Callers never branch on the variant; they ask for a
//! [`FetchPlan`] and hand it to a [`Fetcher`].

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GopackError, Result};
use crate::manifest::Revision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmKind {
    Git,
    #[serde(rename = "hg")]
    Mercurial,
    #[serde(rename = "svn")]
    Subversion,
    #[serde(rename = "bzr")]
    Bazaar,
}

impl ScmKind {
    /// Every backend, in the order checkouts are probed.
    pub const ALL: [ScmKind; 4] = [
        ScmKind::Git,
        ScmKind::Mercurial,
        ScmKind::Subversion,
        ScmKind::Bazaar,
    ];

    /// Tag written to the manifest's `scm` key.
    pub fn tag(self) -> &'static str {
        match self {
            ScmKind::Git => "git",
            ScmKind::Mercurial => "hg",
            ScmKind::Subversion => "svn",
            ScmKind::Bazaar => "bzr",
        }
    }

    /// Hidden metadata directory that marks a checkout root.
    pub fn marker(self) -> &'static str {
        match self {
            ScmKind::Git => ".git",
            ScmKind::Mercurial => ".hg",
            ScmKind::Subversion => ".svn",
            ScmKind::Bazaar => ".bzr",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScmKind::Git => "Git",
            ScmKind::Mercurial => "Hg (Mercurial)",
            ScmKind::Subversion => "Subversion",
            ScmKind::Bazaar => "Bazaar",
        }
    }

    fn program(self) -> &'static str {
        self.tag()
    }

    /// Commands that fetch `remote` into `target`, optionally pinned.
    ///
    /// `None` (or [`Revision::Unspecified`]) fetches whatever the remote
    /// considers its default head.
    pub fn fetch_plan(self, remote: &str, target: &Path, revision: Option<&Revision>) -> FetchPlan {
        let revision = revision.filter(|r| !matches!(r, Revision::Unspecified));
        let target_arg = OsString::from(target.as_os_str());
        let mut steps = Vec::new();

        match self {
            ScmKind::Git => {
                let mut clone = FetchStep::new(self.program()).arg("clone");
                if let Some(Revision::Branch(name) | Revision::Tag(name)) = revision {
                    clone = clone.arg("--branch").arg(name);
                }
                steps.push(clone.arg(remote).arg(target_arg.clone()));
                if let Some(Revision::Commit(hash)) = revision {
                    steps.push(
                        FetchStep::new(self.program())
                            .arg("-C")
                            .arg(target_arg)
                            .arg("checkout")
                            .arg(hash),
                    );
                }
            }
            ScmKind::Mercurial => {
                let mut clone = FetchStep::new(self.program()).arg("clone");
                if let Some(rev) = revision {
                    clone = clone.arg("-u").arg(rev.value());
                }
                steps.push(clone.arg(remote).arg(target_arg));
            }
            ScmKind::Subversion => {
                let mut checkout = FetchStep::new(self.program()).arg("checkout");
                let url = match revision {
                    Some(Revision::Commit(rev)) => {
                        checkout = checkout.arg("-r").arg(rev);
                        remote.to_string()
                    }
                    Some(Revision::Branch(name)) => {
                        format!("{}/branches/{}", remote.trim_end_matches('/'), name)
                    }
                    Some(Revision::Tag(name)) => {
                        format!("{}/tags/{}", remote.trim_end_matches('/'), name)
                    }
                    _ => remote.to_string(),
                };
                steps.push(checkout.arg(url).arg(target_arg));
            }
            ScmKind::Bazaar => {
                let mut branch = FetchStep::new(self.program()).arg("branch");
                let url = match revision {
                    Some(Revision::Commit(rev)) => {
                        branch = branch.arg("-r").arg(format!("revid:{rev}"));
                        remote.to_string()
                    }
                    Some(Revision::Tag(name)) => {
                        branch = branch.arg("-r").arg(format!("tag:{name}"));
                        remote.to_string()
                    }
                    Some(Revision::Branch(name)) => {
                        format!("{}/{}", remote.trim_end_matches('/'), name)
                    }
                    _ => remote.to_string(),
                };
                steps.push(branch.arg(url).arg(target_arg));
            }
        }

        FetchPlan {
            scm: self,
            remote: remote.to_string(),
            target: target.to_path_buf(),
            steps,
        }
    }
}

impl fmt::Display for ScmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ScmKind {
    type Err = GopackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "git" => Ok(ScmKind::Git),
            "hg" | "mercurial" => Ok(ScmKind::Mercurial),
            "svn" | "subversion" => Ok(ScmKind::Subversion),
            "bzr" | "bazaar" => Ok(ScmKind::Bazaar),
            _ => Err(GopackError::UnknownScm(s.to_string())),
        }
    }
}

/// One external command of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchStep {
    pub program: &'static str,
    pub args: Vec<OsString>,
}

impl FetchStep {
    fn new(program: &'static str) -> Self {
        Self {
            program,
            args: Vec::new(),
        }
    }

    fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for FetchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Ordered commands that materialize one remote repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub scm: ScmKind,
    pub remote: String,
    pub target: PathBuf,
    pub steps: Vec<FetchStep>,
}

/// Executes fetch plans.
pub trait Fetcher {
    fn fetch(&mut self, plan: &FetchPlan) -> Result<()>;
}

impl<F: Fetcher + ?Sized> Fetcher for &mut F {
    fn fetch(&mut self, plan: &FetchPlan) -> Result<()> {
        (**self).fetch(plan)
    }
}

/// Runs each step as a child process, synchronously, stopping at the first failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandFetcher;

impl Fetcher for CommandFetcher {
    fn fetch(&mut self, plan: &FetchPlan) -> Result<()> {
        info!(scm = %plan.scm, remote = %plan.remote, target = ?plan.target, "fetching");

        for step in &plan.steps {
            debug!("running: {}", step);
            let output = step
                .to_command()
                .output()
                .map_err(|e| GopackError::FetchFailed {
                    remote: plan.remote.clone(),
                    message: format!("failed to run {}: {e}", step.program),
                })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(GopackError::FetchFailed {
                    remote: plan.remote.clone(),
                    message: format!("`{}` exited with {}: {}", step, output.status, stderr.trim()),
                });
            }
        }

        Ok(())
    }
}
