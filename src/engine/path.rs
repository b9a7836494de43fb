use std::env;
use std::path::{Path, PathBuf};

use nix::unistd::{AccessFlags, access};

use crate::error::ShellError;

/// Resolve a command name to an executable path.
///
/// A name containing `/` is taken literally and accepted iff it is
/// executable. Anything else is looked up along `PATH`, first match
/// wins. Candidates longer than the platform's PATH_MAX are skipped.
pub fn find_executable(command: &str) -> Result<PathBuf, ShellError> {
    if command.contains('/') {
        let path = Path::new(command);
        return if is_executable(path) {
            Ok(path.to_path_buf())
        } else {
            Err(ShellError::NotFound(command.to_string()))
        };
    }

    let path_env = env::var("PATH").map_err(|_| ShellError::Sys {
        ctx: "find_executable",
        msg: "PATH not set".into(),
    })?;
    search_path(command, &path_env).ok_or_else(|| ShellError::NotFound(command.to_string()))
}

fn search_path(command: &str, path_env: &str) -> Option<PathBuf> {
    for dir in path_env.split(':').filter(|d| !d.is_empty()) {
        let candidate = Path::new(dir).join(command);
        if candidate.as_os_str().len() >= nix::libc::PATH_MAX as usize {
            continue;
        }
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_executable(path: &Path) -> bool {
    access(path, AccessFlags::X_OK).is_ok()
}
