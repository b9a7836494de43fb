use std::env;

use nix::errno::Errno;
use nix::sys::stat::{SFlag, stat};
use nix::unistd::{AccessFlags, access, chdir, getcwd};

use crate::error::{self, ShellError};

/// Change the shell's working directory.
///
/// `cd` goes to `$HOME`, `cd -` to `$OLDPWD` (echoing the new
/// directory), `cd <dir>` to the argument. `PWD`/`OLDPWD` are kept in
/// sync on success.
pub fn run(args: &[String]) -> i32 {
    match cd(args) {
        Ok(()) => 0,
        Err(err) => {
            error::report(&err);
            1
        }
    }
}

fn cd(args: &[String]) -> Result<(), ShellError> {
    if args.len() > 1 {
        return Err(ShellError::Usage {
            builtin: "cd",
            msg: "too many arguments".into(),
        });
    }

    let (target, echo) = match args.first().map(String::as_str) {
        None => (env_dir("HOME")?, false),
        Some("-") => (env_dir("OLDPWD")?, true),
        Some(path) => (path.to_string(), false),
    };

    // The target must exist, be a directory, and be searchable.
    let st = stat(target.as_str()).map_err(|errno| target_err(&target, errno))?;
    if st.st_mode & SFlag::S_IFMT.bits() != SFlag::S_IFDIR.bits() {
        return Err(target_err(&target, Errno::ENOTDIR));
    }
    access(target.as_str(), AccessFlags::X_OK).map_err(|errno| target_err(&target, errno))?;

    let old = getcwd().map_err(|errno| ShellError::Io {
        ctx: "getcwd",
        errno,
    })?;
    chdir(target.as_str()).map_err(|errno| target_err(&target, errno))?;
    if echo {
        println!("{}", target);
    }

    unsafe { env::set_var("OLDPWD", &old) };
    let new = getcwd().map_err(|errno| ShellError::Io {
        ctx: "getcwd",
        errno,
    })?;
    unsafe { env::set_var("PWD", &new) };
    Ok(())
}

fn env_dir(name: &'static str) -> Result<String, ShellError> {
    env::var(name).map_err(|_| ShellError::Usage {
        builtin: "cd",
        msg: format!("\"{}\" env variable not set", name),
    })
}

fn target_err(target: &str, errno: Errno) -> ShellError {
    ShellError::BuiltinIo {
        builtin: "cd",
        what: target.to_string(),
        errno,
    }
}
