//! gopack - keep `gopack.config` in step with what a Go project imports.
//!
//! ## Commands
//!
//! - `check`: report declared-but-unused and used-but-undeclared packages
//! - `fix`: resolve each discrepancy interactively
//! - `list`: show the declared dependencies
//! - `init`: create a blank manifest

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gopack_core::{
    check, fix_deps, CommandFetcher, Config, ManifestFile, ProjectErrorKind, TerminalPrompt,
    MANIFEST_NAME,
};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "gopack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reconcile Go imports with declared dependencies", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Project root (default: current directory)
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a blank gopack.config
    Init {
        /// The project's own import path (default: derived from GOPATH or the directory name)
        #[arg(long)]
        repo: Option<String>,

        /// Standard GOPATH, used to derive the default import path
        #[arg(long, env = "GOPATH")]
        gopath: Option<PathBuf>,
    },

    /// Report discrepancies between imports and gopack.config
    Check {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Walk through every discrepancy and fix it interactively
    Fix {
        /// Standard GOPATH searched for local checkouts
        #[arg(long, env = "GOPATH")]
        gopath: Option<PathBuf>,

        /// Where fetched or copied dependencies land (default: <root>/.gopack/vendor/src)
        #[arg(long)]
        deps_dir: Option<PathBuf>,

        /// Allow local copies to overwrite existing files
        #[arg(long)]
        overwrite: bool,

        /// Ignore imports that only appear in _test.go files
        #[arg(long)]
        no_tests: bool,
    },

    /// Show the declared dependencies
    List {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    gopack_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Init { repo, gopath } => cmd_init(&cli.root, repo, gopath.as_deref()),
        Commands::Check { format } => cmd_check(&cli.root, format),
        Commands::Fix {
            gopath,
            deps_dir,
            overwrite,
            no_tests,
        } => cmd_fix(&cli.root, gopath.as_deref(), deps_dir, overwrite, no_tests),
        Commands::List { format } => cmd_list(&cli.root, format),
    }
}

/// First entry of a GOPATH-style list.
fn first_gopath(gopath: Option<&Path>) -> Option<PathBuf> {
    gopath.and_then(|g| std::env::split_paths(g).next())
}

fn base_config(root: &Path, gopath: Option<&Path>) -> Config {
    let config = Config::new(root);
    match first_gopath(gopath) {
        Some(gp) => config.with_gopath(gp),
        None => config,
    }
}

/// Create a blank manifest
fn cmd_init(root: &Path, repo: Option<String>, gopath: Option<&Path>) -> Result<ExitCode> {
    let config = base_config(root, gopath);
    let repo = repo
        .or_else(|| gopack_core::session::default_repo_path(&config))
        .context("Could not derive the project's import path; pass --repo")?;

    let manifest = ManifestFile::create_blank(config.manifest_path(), &repo)
        .with_context(|| format!("Failed to create {MANIFEST_NAME}"))?;

    println!("Created {} (repo = {})", manifest.path().display(), repo);
    Ok(ExitCode::SUCCESS)
}

/// Report discrepancies without changing anything
fn cmd_check(root: &Path, format: OutputFormat) -> Result<ExitCode> {
    let config = Config::new(root);
    let errors = check(&config).context("Dependency check failed")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&errors)?),
        OutputFormat::Text => {
            for error in &errors {
                println!("{error}");
            }
            let unused = errors
                .iter()
                .filter(|e| e.kind == ProjectErrorKind::UnusedDep)
                .count();
            println!(
                "{} unused, {} unmanaged",
                unused,
                errors.len() - unused
            );
        }
    }

    Ok(if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Resolve discrepancies interactively
fn cmd_fix(
    root: &Path,
    gopath: Option<&Path>,
    deps_dir: Option<PathBuf>,
    overwrite: bool,
    no_tests: bool,
) -> Result<ExitCode> {
    let mut config = base_config(root, gopath).with_overwrite(overwrite);
    if let Some(dir) = deps_dir {
        config = config.with_dependency_root(dir);
    }
    config.include_tests = !no_tests;

    println!("gopack {}", gopack_core::VERSION);
    info!(
        root = ?config.project_root,
        standard_root = ?config.standard_root,
        "fixing dependencies"
    );

    let report = fix_deps(&config, TerminalPrompt::stdio(), CommandFetcher)
        .context("Fixing dependencies failed")?;

    if report.discrepancies.is_empty() {
        println!("Nothing to fix.");
    }
    for resolution in &report.resolutions {
        println!("{resolution}");
    }
    println!(
        "{} discrepancies, {} manifest changes",
        report.discrepancies.len(),
        report.mutations()
    );
    Ok(ExitCode::SUCCESS)
}

/// Show declared dependencies
fn cmd_list(root: &Path, format: OutputFormat) -> Result<ExitCode> {
    let config = Config::new(root);
    let manifest = ManifestFile::load(config.manifest_path())
        .with_context(|| format!("Failed to load {MANIFEST_NAME}"))?;
    let deps = manifest.manifest().dependencies();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(deps)?),
        OutputFormat::Text => {
            for dep in deps {
                let pin = match dep.revision.key() {
                    Some(key) => format!("{key} {}", dep.revision.value()),
                    None => "unpinned".to_string(),
                };
                let marker = if dep.revision.is_placeholder() {
                    "  (revision pending)"
                } else {
                    ""
                };
                println!("{:<40} {:<24} {}{}", dep.import, pin, dep.scm, marker);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
