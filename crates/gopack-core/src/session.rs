//! End-to-end runs: check the manifest, analyze, reconcile, resolve.

use std::path::Path;

use tracing::{info, warn};

use crate::analyzer::{analyze, Project};
use crate::config::{Config, MANIFEST_NAME};
use crate::error::{GopackError, Result};
use crate::manifest::ManifestFile;
use crate::prompt::{ask_text, ask_with_default, choose, Prompt, YesNo};
use crate::reconcile::ProjectError;
use crate::resolve::{Resolution, Resolver};
use crate::vcs::Fetcher;

/// What a `fix_deps` run found and did.
#[derive(Debug, Clone, PartialEq)]
pub struct FixReport {
    pub discrepancies: Vec<ProjectError>,
    pub resolutions: Vec<Resolution>,
}

impl FixReport {
    pub fn mutations(&self) -> usize {
        self.resolutions.iter().filter(|r| r.is_mutation()).count()
    }
}

/// Load the manifest, offering to create a blank one when it is missing.
pub fn ensure_manifest<P: Prompt>(config: &Config, mut prompt: P) -> Result<ManifestFile> {
    let path = config.manifest_path();
    match ManifestFile::load(&path) {
        Err(GopackError::ManifestMissing(_)) => {}
        other => return other,
    }

    prompt.notify(&format!("{MANIFEST_NAME} was not found !"));
    let create = choose(
        &mut prompt,
        &format!("Would you like to create a blank {MANIFEST_NAME} ?"),
        &[YesNo::Yes, YesNo::No],
        config.max_attempts,
    )?;
    if create == YesNo::No {
        warn!(path = ?path, "no manifest, cannot continue");
        return Err(GopackError::ManifestMissing(path));
    }

    let repo = match default_repo_path(config) {
        Some(default) => ask_with_default(&mut prompt, "Repo?", &default)?,
        None => ask_text(&mut prompt, "Repo?", config.max_attempts)?,
    };
    prompt.notify(&format!("Creating the {MANIFEST_NAME} file."));
    ManifestFile::create_blank(path, &repo)
}

/// The project's import path as seen from the standard source root,
/// falling back to the project directory's name.
pub fn default_repo_path(config: &Config) -> Option<String> {
    let root = config
        .project_root
        .canonicalize()
        .unwrap_or_else(|_| config.project_root.clone());

    let from_standard = config.standard_root.as_deref().and_then(|std_root| {
        let std_root = std_root.canonicalize().unwrap_or_else(|_| std_root.to_path_buf());
        root.strip_prefix(&std_root).ok().map(slash_path)
    });

    from_standard
        .filter(|p| !p.is_empty())
        .or_else(|| root.file_name().map(|n| n.to_string_lossy().into_owned()))
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Analyze the project against an already loaded manifest.
pub fn analyze_for(config: &Config, manifest: &ManifestFile) -> Result<Project> {
    analyze(config, manifest.manifest().repo())
}

/// Non-interactive reconciliation.
pub fn check(config: &Config) -> Result<Vec<ProjectError>> {
    let manifest = ManifestFile::load(config.manifest_path())?;
    let project = analyze_for(config, &manifest)?;
    Ok(manifest.manifest().validate(&project))
}

/// Reconcile the project and walk the operator through every discrepancy.
pub fn fix_deps<P: Prompt, F: Fetcher>(
    config: &Config,
    mut prompt: P,
    fetcher: F,
) -> Result<FixReport> {
    let mut manifest = ensure_manifest(config, &mut prompt)?;
    let project = analyze_for(config, &manifest)?;
    let discrepancies = manifest.manifest().validate(&project);
    info!(
        imports = project.len(),
        declared = manifest.manifest().len(),
        discrepancies = discrepancies.len(),
        "reconciled"
    );

    let resolutions = Resolver::new(config, &mut manifest, &mut prompt, fetcher)
        .resolve_all(&discrepancies)?;

    Ok(FixReport {
        discrepancies,
        resolutions,
    })
}
