//! Tracing initialisation for the gopack binary.
//!
//! gopack is interactive: questions and notices go to stdout through
//! [`crate::prompt::Prompt`], never through tracing. Log lines therefore
//! go to stderr so they can be redirected or silenced without breaking
//! the prompt stream, and the default filter only raises verbosity for
//! gopack's own crates.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events follow the requested level by default.
const OWN_TARGETS: [&str; 2] = ["gopack_core", "gopack"];

/// Filter directives used when `RUST_LOG` is not set: `level` for gopack
/// itself, `warn` for everything else.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let mut directives = String::from("warn");
    for target in OWN_TARGETS {
        directives.push_str(&format!(",{target}={level}"));
    }
    directives
}

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise [`default_directives`] for `level`.
/// With `json` every event is one JSON object per line. Only the first
/// call has an effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .json(),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
    };
    // A subscriber is already set (tests, embedding); keep it.
    installed.ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_scope_level_to_gopack() {
        assert_eq!(
            default_directives(Level::DEBUG),
            "warn,gopack_core=debug,gopack=debug"
        );
    }

    #[test]
    fn default_directives_parse_as_filter() {
        for level in [Level::TRACE, Level::INFO, Level::WARN] {
            assert!(EnvFilter::try_new(default_directives(level)).is_ok());
        }
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
    }
}
