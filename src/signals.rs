use nix::errno::Errno;
use nix::libc::c_int;
use nix::sys::signal::{
    SaFlags, SigAction, SigHandler, SigSet, Signal, SigmaskHow, sigaction, signal, sigprocmask,
};
use nix::unistd::{Pid, getpgrp, setpgid, tcsetpgrp};
use std::os::fd::BorrowedFd;

use crate::error::ShellError;

/// Signals a job-control shell must not take at face value while a job
/// owns the terminal.
const IGNORED: [Signal; 5] = [
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

extern "C" fn sigchld_handler(_: c_int) {
    let saved = Errno::last_raw();
    crate::engine::reaper::reap_pending();
    Errno::set_raw(saved);
}

/// Install the shell's signal dispositions.
///
/// Interactive shells first move into their own process group and seize
/// the terminal, so that Ctrl-C/Ctrl-Z reach foreground jobs rather
/// than the shell itself. Rustyline overrides SIGINT during readline()
/// calls, which is fine.
pub fn init(interactive: bool) -> Result<(), ShellError> {
    if interactive {
        // EPERM here means we already lead our own group.
        if let Err(errno) = setpgid(Pid::from_raw(0), Pid::from_raw(0)) {
            if errno != Errno::EPERM {
                return Err(ShellError::Io {
                    ctx: "setpgid",
                    errno,
                });
            }
        }
        let stdin = unsafe { BorrowedFd::borrow_raw(nix::libc::STDIN_FILENO) };
        if let Err(errno) = tcsetpgrp(stdin, getpgrp()) {
            // The shell still works without terminal control, with
            // limited Ctrl-C/Ctrl-Z forwarding.
            log::debug!("tcsetpgrp at startup failed: {}", errno);
        }
    }

    unsafe {
        for sig in IGNORED {
            signal(sig, SigHandler::SigIgn).map_err(|errno| ShellError::Io {
                ctx: "sigaction",
                errno,
            })?;
        }
        let reap = SigAction::new(
            SigHandler::Handler(sigchld_handler),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        sigaction(Signal::SIGCHLD, &reap).map_err(|errno| ShellError::Io {
            ctx: "sigaction",
            errno,
        })?;
    }
    Ok(())
}

/// Restore default signal dispositions. Called in children about to
/// exec; errors are irrelevant there.
pub fn restore_default() {
    unsafe {
        for sig in IGNORED {
            let _ = signal(sig, SigHandler::SigDfl);
        }
        let _ = signal(Signal::SIGCHLD, SigHandler::SigDfl);
    }
}

fn chld_set() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGCHLD);
    set
}

/// Drop the SIGCHLD block inherited across fork. The signal mask
/// survives exec, so a child must do this before replacing itself.
pub fn unblock_sigchld() {
    let _ = sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&chld_set()), None);
}

/// Blocks SIGCHLD for its lifetime.
///
/// Every main-line read or write of the job table happens under one of
/// these, so the reaper can never observe (or mutate) the table
/// mid-update. The shell blocks SIGCHLD nowhere else, which makes the
/// plain unblock on drop correct.
pub struct ChldGuard(());

impl ChldGuard {
    pub fn block() -> Self {
        let _ = sigprocmask(SigmaskHow::SIG_BLOCK, Some(&chld_set()), None);
        ChldGuard(())
    }

    /// Suspend until a child-status signal arrives. Everything except
    /// SIGCHLD stays masked while sleeping; the block this guard holds
    /// is atomically re-established before returning.
    pub fn wait_for_child(&self) {
        let mut mask = SigSet::all();
        mask.remove(Signal::SIGCHLD);
        // sigsuspend always "fails" with EINTR once a signal is taken.
        let _ = mask.suspend();
    }
}

impl Drop for ChldGuard {
    fn drop(&mut self) {
        let _ = sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&chld_set()), None);
    }
}
