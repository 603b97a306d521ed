//! gopack core library
//!
//! Reconciles the external packages a Go source tree imports against the
//! dependencies declared in its `gopack.config` manifest, and resolves each
//! mismatch interactively: drop the declaration, copy a local checkout,
//! fetch from a remote, or pin a revision.
//!
//! ## Flow
//!
//! [`analyze`] builds a [`Project`], [`Manifest::validate`] diffs it against
//! the manifest, and [`Resolver`] walks the operator through each
//! [`ProjectError`], persisting every decision through [`ManifestFile`].

pub mod analyzer;
pub mod config;
pub mod copy;
pub mod error;
pub mod fakes;
pub mod locate;
pub mod manifest;
pub mod prompt;
pub mod reconcile;
pub mod resolve;
pub mod session;
pub mod telemetry;
pub mod vcs;

pub use analyzer::{analyze, is_external, scan_imports, Project};
pub use config::{Config, MANIFEST_NAME};
pub use copy::copy_tree;
pub use error::{GopackError, Result};
pub use locate::{locate, locate_within, LocalCheckout};
pub use manifest::{Dependency, Manifest, ManifestFile, Revision, PLACEHOLDER_REVISION};
pub use prompt::{MenuChoice, MenuOption, Prompt, TerminalPrompt, YesNo};
pub use reconcile::{ProjectError, ProjectErrorKind};
pub use resolve::{Resolution, Resolver, UnmanagedChoice, UnusedChoice};
pub use session::{check, ensure_manifest, fix_deps, FixReport};
pub use telemetry::init_tracing;
pub use vcs::{CommandFetcher, FetchPlan, FetchStep, Fetcher, ScmKind};

/// gopack version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
