//! Error taxonomy for gopack.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reconciling and resolving dependencies.
#[derive(Error, Debug)]
pub enum GopackError {
    /// The manifest file does not exist and the operator declined to create one
    #[error("no manifest found at {0}")]
    ManifestMissing(PathBuf),

    /// The manifest exists but could not be understood
    #[error("malformed manifest {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    /// A dependency entry violates the manifest invariants
    #[error("invalid dependency: {0}")]
    InvalidDependency(String),

    /// An import path is already declared
    #[error("dependency already declared: {0}")]
    DuplicateDependency(String),

    /// An import path is not declared
    #[error("dependency not declared: {0}")]
    UnknownDependency(String),

    /// A backend tag that is not one of git, hg, svn, bzr
    #[error("unknown scm tag: {0:?}")]
    UnknownScm(String),

    /// The source tree could not be walked or a file could not be parsed
    #[error("analysis of {path} failed: {message}")]
    Analysis { path: PathBuf, message: String },

    /// No version-controlled directory owns the given path
    #[error("no scm project found at or above {0}")]
    NoScmProject(PathBuf),

    /// A copy would clobber an existing file
    #[error("{0} already exists")]
    DestinationExists(PathBuf),

    /// A backend command failed or could not be spawned
    #[error("fetching {remote} failed: {message}")]
    FetchFailed { remote: String, message: String },

    /// The operator's input stream ended
    #[error("input closed while waiting for an answer to: {0}")]
    InputClosed(String),

    /// The operator kept answering outside the offered set
    #[error("no valid answer after {attempts} attempts to: {question}")]
    TooManyInvalidAnswers { question: String, attempts: usize },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<walkdir::Error> for GopackError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
        GopackError::Analysis {
            path,
            message: err.to_string(),
        }
    }
}

/// Result type for gopack operations.
pub type Result<T> = std::result::Result<T, GopackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GopackError::UnknownScm("cvs".to_string());
        assert!(err.to_string().contains("unknown scm tag"));
        assert!(err.to_string().contains("cvs"));

        let err = GopackError::NoScmProject(PathBuf::from("/tmp/x"));
        assert!(err.to_string().contains("/tmp/x"));
    }

    #[test]
    fn test_too_many_invalid_answers_display() {
        let err = GopackError::TooManyInvalidAnswers {
            question: "SCM".to_string(),
            attempts: 3,
        };
        assert_eq!(err.to_string(), "no valid answer after 3 attempts to: SCM");
    }
}
