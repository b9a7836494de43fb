use std::os::fd::RawFd;

use nix::fcntl::{OFlag, open};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2};

use crate::error::ShellError;
use crate::parser::{Redirect, Redirections};

/// Install a stage's file redirections onto its standard descriptors.
///
/// Runs in a freshly forked child, after any pipe ends have been moved
/// into place; a redirection therefore wins over a pipe on the same
/// slot. Any failure maps to child exit code 1 at the call site.
pub fn apply(redirs: &Redirections) -> Result<(), ShellError> {
    if let Some(path) = &redirs.stdin {
        install(path, OFlag::O_RDONLY, nix::libc::STDIN_FILENO)?;
    }
    if let Some(r) = &redirs.stdout {
        install(&r.path, out_flags(r), nix::libc::STDOUT_FILENO)?;
    }
    if let Some(r) = &redirs.stderr {
        install(&r.path, out_flags(r), nix::libc::STDERR_FILENO)?;
    }
    Ok(())
}

fn out_flags(r: &Redirect) -> OFlag {
    let disposition = if r.append {
        OFlag::O_APPEND
    } else {
        OFlag::O_TRUNC
    };
    OFlag::O_WRONLY | OFlag::O_CREAT | disposition
}

fn install(path: &str, flags: OFlag, target: RawFd) -> Result<(), ShellError> {
    let mode = Mode::from_bits_truncate(0o644);
    let fd = open(path, flags, mode).map_err(|errno| ShellError::File {
        what: path.to_string(),
        errno,
    })?;
    if let Err(errno) = dup2(fd, target) {
        let _ = close(fd);
        return Err(ShellError::Io { ctx: "dup2", errno });
    }
    if fd != target {
        let _ = close(fd);
    }
    Ok(())
}
