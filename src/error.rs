use std::sync::OnceLock;

use nix::errno::Errno;
use thiserror::Error;

static PROGRAM_NAME: OnceLock<String> = OnceLock::new();

/// Remember the basename of argv[0] for diagnostic prefixes.
pub fn set_program_name(argv0: &str) {
    let base = argv0.rsplit('/').next().unwrap_or(argv0);
    let _ = PROGRAM_NAME.set(base.to_string());
}

pub fn program_name() -> &'static str {
    PROGRAM_NAME.get().map(String::as_str).unwrap_or("tysh")
}

/// Everything the shell can complain about.
///
/// Diagnostics render as `<message>` or `<context>: <message>` or
/// `<context>: <message>: <os-error-text>`; [`report`] prepends the
/// program name.
#[derive(Debug, Error)]
pub enum ShellError {
    /// Bad syntax on the input line. Aborts only the current line.
    #[error("{0}")]
    Parse(String),

    /// A syscall failed; `ctx` names the failing operation.
    #[error("{ctx}: {}", .errno.desc())]
    Io { ctx: &'static str, errno: Errno },

    /// A failure with no useful errno behind it.
    #[error("{ctx}: {msg}")]
    Sys { ctx: &'static str, msg: String },

    /// A named file could not be opened or used.
    #[error("{what}: {}", .errno.desc())]
    File { what: String, errno: Errno },

    /// Command name did not resolve to an executable.
    #[error("{0}: command not found")]
    NotFound(String),

    /// A builtin was invoked with arguments it cannot accept.
    #[error("{builtin}: {msg}")]
    Usage { builtin: &'static str, msg: String },

    /// A builtin failed on a named operand.
    #[error("{builtin}: {what}: {}", .errno.desc())]
    BuiltinIo {
        builtin: &'static str,
        what: String,
        errno: Errno,
    },

    /// A job spec did not resolve to a live job.
    #[error("{builtin}: {what}: no such job")]
    JobRef { builtin: &'static str, what: String },

    /// Job table or pipeline capacity exceeded.
    #[error("{0}")]
    TableFull(&'static str),
}

/// Print a diagnostic to stderr in the shared `prog: ...` format.
pub fn report(err: &ShellError) {
    eprintln!("{}: {}", program_name(), err);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_found() {
        let e = ShellError::NotFound("frobnicate".into());
        assert_eq!(e.to_string(), "frobnicate: command not found");
    }

    #[test]
    fn display_usage() {
        let e = ShellError::Usage {
            builtin: "cd",
            msg: "too many arguments".into(),
        };
        assert_eq!(e.to_string(), "cd: too many arguments");
    }

    #[test]
    fn display_job_ref() {
        let e = ShellError::JobRef {
            builtin: "fg",
            what: "%7".into(),
        };
        assert_eq!(e.to_string(), "fg: %7: no such job");
    }

    #[test]
    fn display_io_carries_errno_text() {
        let e = ShellError::Io {
            ctx: "fork",
            errno: Errno::EAGAIN,
        };
        let s = e.to_string();
        assert!(s.starts_with("fork: "));
        assert!(s.len() > "fork: ".len());
    }
}
