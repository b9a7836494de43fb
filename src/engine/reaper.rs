//! Child-status collection, driven by the SIGCHLD handler.
//!
//! Everything here runs in signal context: no allocation, no stdout
//! I/O, no logging. The handler writes only into fields that already
//! exist on the job records; user-visible reporting happens later on
//! the main line.

use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

use super::jobs::{self, JobState, JobTable};

/// Drain every pending child-status change without blocking.
///
/// Called from the SIGCHLD handler (where the signal is masked by the
/// kernel) and nowhere else.
pub(crate) fn reap_pending() {
    // SAFETY: SIGCHLD is masked for the duration of its own handler,
    // and any interrupted main-line code was outside the table's
    // guarded sections, so no other reference to the table exists.
    let table = unsafe { jobs::table_raw() };
    let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
    loop {
        match waitpid(Pid::from_raw(-1), Some(flags)) {
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            Ok(status) => apply(table, status),
        }
    }
}

/// Fold one wait status into the owning job, if any.
pub(crate) fn apply(table: &mut JobTable, status: WaitStatus) {
    let Some(pid) = status.pid() else {
        return;
    };
    let Some(job) = table.by_pid_mut(pid) else {
        // Not ours (already unregistered, or reaped inline elsewhere).
        return;
    };
    match status {
        WaitStatus::Stopped(..) => {
            job.state = JobState::Stopped;
            job.notified = false;
        }
        WaitStatus::Continued(..) => {
            job.state = JobState::Running;
            job.notified = false;
        }
        WaitStatus::Exited(..) | WaitStatus::Signaled(..) => {
            if pid == job.last_pid {
                job.last_status = Some(status);
            }
            job.alive = job.alive.saturating_sub(1);
            if job.alive == 0 {
                job.state = JobState::Done;
                job.notified = false;
            }
        }
        _ => {}
    }
}
