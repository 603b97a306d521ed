use std::path::Path;

use gopack_core::fakes::{RecordingFetcher, ScriptedPrompt};
use gopack_core::prompt::INVALID_ANSWER_NOTICE;
use gopack_core::{
    check, fix_deps, Config, GopackError, ManifestFile, ProjectErrorKind, Resolution, Revision,
    ScmKind, PLACEHOLDER_REVISION,
};

fn write(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, text).unwrap();
}

/// A project at `<tmp>/gopath/src/example.org/app` importing `imports`,
/// with the given manifest body.
fn project(manifest: &str, imports: &[&str]) -> (tempfile::TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let gopath = dir.path().join("gopath");
    let root = gopath.join("src/example.org/app");

    let mut src =
        String::from("package main\n\nimport (\n\t\"fmt\"\n\t\"example.org/app/internal\"\n");
    for import in imports {
        src.push_str(&format!("\t\"{import}\"\n"));
    }
    src.push_str(")\n\nfunc main() { fmt.Println(\"hi\") }\n");
    write(&root.join("main.go"), &src);
    write(&root.join("internal/i.go"), "package internal\n");
    write(
        &root.join("gopack.config"),
        &format!("repo = \"example.org/app\"\n\n{manifest}"),
    );

    let config = Config::new(&root).with_gopath(&gopath);
    (dir, config)
}

// reconciliation

#[test]
fn one_unmanaged_import_and_no_unused() {
    let (_dir, config) = project(
        "[deps.foo]\nimport = \"example.org/foo\"\ncommit = \"abc123\"\nscm = \"git\"\n",
        &["example.org/foo", "example.org/bar"],
    );

    let errors = check(&config).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ProjectErrorKind::UnmanagedImport);
    assert_eq!(errors[0].path, "example.org/bar");
}

#[test]
fn own_packages_and_stdlib_are_not_reported() {
    let (_dir, config) = project("", &[]);
    assert!(check(&config).unwrap().is_empty());
}

#[test]
fn check_is_idempotent() {
    let (_dir, config) = project(
        "[deps.gone]\nimport = \"example.org/gone\"\n",
        &["example.org/a", "example.org/b"],
    );
    assert_eq!(check(&config).unwrap(), check(&config).unwrap());
}

// resolution

#[test]
fn pinning_a_branch_clears_the_discrepancy() {
    let (_dir, config) = project(
        "[deps.foo]\nimport = \"example.org/foo\"\ncommit = \"abc123\"\nscm = \"git\"\n",
        &["example.org/foo", "example.org/bar"],
    );

    let mut prompt = ScriptedPrompt::new(["B", "g", "dev"]);
    let report = fix_deps(&config, &mut prompt, RecordingFetcher::new()).unwrap();
    assert_eq!(report.mutations(), 1);

    let manifest = ManifestFile::load(config.manifest_path()).unwrap();
    let bar = manifest.manifest().get("example.org/bar").unwrap();
    assert_eq!(bar.revision, Revision::Branch("dev".into()));
    assert_eq!(bar.scm, ScmKind::Git);
    assert_eq!(bar.name, "bar");

    assert!(check(&config).unwrap().is_empty());
}

#[test]
fn removing_an_unused_dependency() {
    let (_dir, config) = project(
        "[deps.unused]\nimport = \"example.org/unused\"\ntag = \"v1\"\nscm = \"hg\"\n",
        &[],
    );

    let mut prompt = ScriptedPrompt::new(["R"]);
    let report = fix_deps(&config, &mut prompt, RecordingFetcher::new()).unwrap();
    assert!(matches!(report.resolutions[0], Resolution::Removed(_)));

    let manifest = ManifestFile::load(config.manifest_path()).unwrap();
    assert!(!manifest.manifest().contains("example.org/unused"));
    assert_eq!(manifest.manifest().repo(), Some("example.org/app"));
}

#[test]
fn invalid_answers_reprompt_the_same_question() {
    let (_dir, config) = project("[deps.unused]\nimport = \"example.org/unused\"\n", &[]);

    let mut prompt = ScriptedPrompt::new(["?", "zzz", "n"]);
    let report = fix_deps(&config, &mut prompt, RecordingFetcher::new()).unwrap();
    assert_eq!(report.mutations(), 0);
    assert_eq!(prompt.questions.len(), 3);
    assert!(prompt.questions.iter().all(|q| q == &prompt.questions[0]));
    assert_eq!(
        prompt
            .notices
            .iter()
            .filter(|n| n.as_str() == INVALID_ANSWER_NOTICE)
            .count(),
        2
    );
}

#[test]
fn words_that_start_with_a_menu_key_are_rejected() {
    let (_dir, config) = project("", &["example.org/bar"]);

    let mut prompt = ScriptedPrompt::new(["maybe", "G", "N"]);
    let report = fix_deps(&config, &mut prompt, RecordingFetcher::new()).unwrap();
    assert_eq!(
        report.resolutions,
        vec![Resolution::Skipped("example.org/bar".into())]
    );
    assert_eq!(prompt.questions.len(), 3);
    assert!(ManifestFile::load(config.manifest_path())
        .unwrap()
        .manifest()
        .is_empty());
}

#[test]
fn discrepancies_resolve_in_order_and_persist_each_step() {
    let (_dir, config) = project(
        "[deps.old]\nimport = \"example.org/old\"\nbranch = \"master\"\n",
        &["example.org/x", "example.org/y"],
    );

    // old: remove; x: pin tag v2 on svn; y: run out of answers mid-way.
    let mut prompt = ScriptedPrompt::new(["r", "t", "s", "v2", "c", "b"]);
    let err = fix_deps(&config, &mut prompt, RecordingFetcher::new()).unwrap_err();
    assert!(matches!(err, GopackError::InputClosed(q) if q == "Commit hash"));

    let manifest = ManifestFile::load(config.manifest_path()).unwrap();
    let paths: Vec<_> = manifest.manifest().declared_paths().collect();
    assert_eq!(paths, vec!["example.org/x"]);
    assert_eq!(
        manifest.manifest().get("example.org/x").unwrap().revision,
        Revision::Tag("v2".into())
    );
}

#[test]
fn download_records_placeholder_commit() {
    let (_dir, config) = project("", &["example.org/bar"]);

    let mut prompt = ScriptedPrompt::new(["r", "h", "ssh://hg.example.org/bar"]);
    let mut fetcher = RecordingFetcher::new();
    fix_deps(&config, &mut prompt, &mut fetcher).unwrap();

    assert_eq!(fetcher.plans.len(), 1);
    let plan = &fetcher.plans[0];
    assert_eq!(plan.scm, ScmKind::Mercurial);
    assert_eq!(plan.remote, "ssh://hg.example.org/bar");
    assert_eq!(plan.target, config.dependency_path("example.org/bar"));

    let manifest = ManifestFile::load(config.manifest_path()).unwrap();
    let bar = manifest.manifest().get("example.org/bar").unwrap();
    assert_eq!(bar.revision, Revision::Commit(PLACEHOLDER_REVISION.into()));
    assert!(bar.revision.is_placeholder());
}

#[test]
fn fetch_failure_aborts_the_run() {
    let (_dir, config) = project("", &["example.org/a", "example.org/b"]);

    let mut prompt = ScriptedPrompt::new(["r", "g", "", "m", "g"]);
    let fetcher = RecordingFetcher::failing("unreachable");
    let err = fix_deps(&config, &mut prompt, fetcher).unwrap_err();
    assert!(matches!(err, GopackError::FetchFailed { .. }));

    // The second discrepancy was never reached.
    assert_eq!(prompt.remaining(), 2);
    let manifest = ManifestFile::load(config.manifest_path()).unwrap();
    assert!(manifest.manifest().is_empty());
}

#[test]
fn local_checkout_is_offered_and_copied() {
    let (dir, config) = project("", &["example.org/lib/sub"]);
    let checkout = dir.path().join("gopath/src/example.org/lib");
    std::fs::create_dir_all(checkout.join(".bzr")).unwrap();
    write(&checkout.join("sub/s.go"), "package sub\n");

    let mut prompt = ScriptedPrompt::new(["l", "b"]);
    let report = fix_deps(&config, &mut prompt, RecordingFetcher::new()).unwrap();

    assert!(prompt.questions[0].contains("bzr checkout"));
    let Resolution::Copied { to, dependency, .. } = &report.resolutions[0] else {
        panic!("expected a local copy, got {:?}", report.resolutions);
    };
    assert!(to.join("sub/s.go").is_file());
    assert_eq!(dependency.scm, ScmKind::Bazaar);
    assert_eq!(
        dependency.revision,
        Revision::Branch(PLACEHOLDER_REVISION.into())
    );
}

#[test]
fn local_copy_refuses_to_clobber_without_overwrite() {
    let (dir, config) = project("", &["example.org/lib"]);
    let checkout = dir.path().join("gopath/src/example.org/lib");
    std::fs::create_dir_all(checkout.join(".git")).unwrap();
    write(&checkout.join("l.go"), "package lib\n");
    write(&config.dependency_path("example.org/lib").join("l.go"), "stale\n");

    let mut prompt = ScriptedPrompt::new(["l", "g"]);
    let err = fix_deps(&config, &mut prompt, RecordingFetcher::new()).unwrap_err();
    assert!(matches!(err, GopackError::DestinationExists(_)));
    assert!(!ManifestFile::load(config.manifest_path())
        .unwrap()
        .manifest()
        .contains("example.org/lib"));
}

#[test]
fn missing_manifest_can_be_created_on_the_fly() {
    let (_dir, config) = project("", &["example.org/bar"]);
    std::fs::remove_file(config.manifest_path()).unwrap();

    let mut prompt = ScriptedPrompt::new(["y", "", "m", "g"]);
    let report = fix_deps(&config, &mut prompt, RecordingFetcher::new()).unwrap();
    assert_eq!(report.mutations(), 1);

    let manifest = ManifestFile::load(config.manifest_path()).unwrap();
    assert_eq!(manifest.manifest().repo(), Some("example.org/app"));
    assert!(manifest.manifest().contains("example.org/bar"));
}

#[test]
fn unparsable_source_is_fatal() {
    let (_dir, config) = project("", &[]);
    write(
        &config.project_root.join("broken.go"),
        "package main\nimport (\n\"x.org/y\"\n",
    );

    let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
    let err = fix_deps(&config, &mut prompt, RecordingFetcher::new()).unwrap_err();
    assert!(matches!(err, GopackError::Analysis { path, .. } if path.ends_with("broken.go")));
}
