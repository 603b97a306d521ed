//! Find the version-controlled checkout that owns a path.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{GopackError, Result};
use crate::vcs::ScmKind;

/// A directory holding a backend's metadata marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCheckout {
    pub dir: PathBuf,
    pub scm: ScmKind,
}

/// Search `start` and then each of its parents for a checkout marker.
///
/// A nonexistent `start` or reaching the filesystem root without a hit
/// is [`GopackError::NoScmProject`]. A relative `start` is climbed only
/// as far as its own first component.
pub fn locate(start: &Path) -> Result<LocalCheckout> {
    search(start, None)
}

/// Like [`locate`], but never looks above `boundary`.
///
/// `start` must lie under `boundary`; otherwise nothing is found.
pub fn locate_within(start: &Path, boundary: &Path) -> Result<LocalCheckout> {
    if !start.starts_with(boundary) {
        return Err(GopackError::NoScmProject(start.to_path_buf()));
    }
    search(start, Some(boundary))
}

fn search(start: &Path, boundary: Option<&Path>) -> Result<LocalCheckout> {
    if !start.exists() {
        return Err(GopackError::NoScmProject(start.to_path_buf()));
    }

    for dir in start.ancestors() {
        // The root itself is never treated as a checkout.
        if dir.parent().is_none() || dir.as_os_str().is_empty() {
            break;
        }
        if let Some(scm) = marker_at(dir) {
            debug!(dir = ?dir, scm = %scm, "found checkout");
            return Ok(LocalCheckout {
                dir: dir.to_path_buf(),
                scm,
            });
        }
        if boundary.is_some_and(|b| dir == b) {
            break;
        }
    }

    Err(GopackError::NoScmProject(start.to_path_buf()))
}

fn marker_at(dir: &Path) -> Option<ScmKind> {
    ScmKind::ALL
        .into_iter()
        .find(|scm| dir.join(scm.marker()).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_marker_in_start_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".hg")).unwrap();
        let found = locate(dir.path()).unwrap();
        assert_eq!(found.dir, dir.path());
        assert_eq!(found.scm, ScmKind::Mercurial);
    }

    #[test]
    fn climbs_to_owning_parent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("example.org/foo");
        let nested = repo.join("sub/pkg");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir(repo.join(".svn")).unwrap();

        let found = locate(&nested).unwrap();
        assert_eq!(found.dir, repo);
        assert_eq!(found.scm, ScmKind::Subversion);
    }

    #[test]
    fn git_wins_when_several_markers_exist() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".bzr")).unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert_eq!(locate(dir.path()).unwrap().scm, ScmKind::Git);
    }

    #[test]
    fn missing_start_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does/not/exist");
        assert!(matches!(locate(&missing), Err(GopackError::NoScmProject(_))));
    }

    #[test]
    fn boundary_stops_the_climb() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let boundary = dir.path().join("src");
        let start = boundary.join("example.org/foo");
        std::fs::create_dir_all(&start).unwrap();

        // Unbounded search reaches the marker above the boundary.
        assert_eq!(locate(&start).unwrap().dir, dir.path());
        assert!(matches!(
            locate_within(&start, &boundary),
            Err(GopackError::NoScmProject(_))
        ));
    }

    #[test]
    fn start_outside_boundary_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        std::fs::create_dir(other.path().join(".git")).unwrap();
        assert!(locate_within(other.path(), dir.path()).is_err());
    }

    #[test]
    fn filesystem_root_is_never_a_checkout() {
        let root = Path::new("/");
        assert!(matches!(locate(root), Err(GopackError::NoScmProject(p)) if p == root));
    }

    #[test]
    fn unbounded_climb_stops_at_filesystem_root() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        // Whatever lies above the temp dir, the climb must end.
        match locate(&nested) {
            Ok(found) => assert!(!found.dir.starts_with(dir.path())),
            Err(err) => assert!(matches!(err, GopackError::NoScmProject(_))),
        }
    }

    #[test]
    fn relative_start_ends_at_empty_ancestor() {
        // Tests run from the crate directory; the climb ends at "", never at ".".
        assert!(Path::new("src").is_dir());
        assert!(matches!(
            locate(Path::new("src")),
            Err(GopackError::NoScmProject(_))
        ));
        assert!(matches!(
            locate(Path::new("no/such/relative/dir")),
            Err(GopackError::NoScmProject(_))
        ));
    }

    #[test]
    fn unmarked_ancestry_terminates() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        assert!(locate_within(&nested, dir.path()).is_err());
    }
}
