use std::os::fd::RawFd;

use nix::unistd::{Pid, getpgrp, isatty};

/// What the main loop should do after a line has been handled.
pub enum ExecutionResult {
    KeepRunning,
    Exit,
}

/// Process-wide shell state. One instance lives for the whole shell;
/// children inherit a copy at fork and own none of it after exec.
pub struct ShellState {
    /// Exit code of the last completed command, shown in the prompt
    /// and reported when the shell itself exits.
    pub last_exit_code: i32,
    /// Whether stdin is a terminal; job control hand-off only happens
    /// when it is.
    pub interactive: bool,
    /// The shell's own process group, restored to the terminal
    /// foreground after every foreground pipeline.
    pub shell_pgid: Pid,
    /// The controlling terminal's descriptor.
    pub terminal: RawFd,
}

impl ShellState {
    pub fn new() -> Self {
        let terminal = nix::libc::STDIN_FILENO;
        ShellState {
            last_exit_code: 0,
            interactive: isatty(terminal).unwrap_or(false),
            shell_pgid: getpgrp(),
            terminal,
        }
    }
}
