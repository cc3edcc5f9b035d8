//! Errors raised while driving `zfs`/`zpool`

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZfsError {
    #[error("invalid mode '{0}' (expected test, direct or chroot)")]
    InvalidMode(String),

    #[error("empty command for {0}")]
    EmptyCommand(&'static str),

    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed (exit code {code:?}): {output}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("failed to parse {what} JSON: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
