use nix::sys::signal::{Signal, killpg};

use crate::engine::jobs::{self, JobSpec, JobState};
use crate::engine::{self, ShellState};
use crate::error::{self, ShellError};
use crate::signals::ChldGuard;

/// Resume a job in the foreground and wait for it.
pub fn run(args: &[String], state: &mut ShellState) -> i32 {
    if args.len() > 1 {
        error::report(&ShellError::Usage {
            builtin: "fg",
            msg: "too many arguments".into(),
        });
        return 1;
    }

    let spec = match JobSpec::parse(args.first().map(String::as_str)) {
        Ok(spec) => spec,
        Err(what) => {
            error::report(&ShellError::JobRef { builtin: "fg", what });
            return 1;
        }
    };

    let guard = ChldGuard::block();
    let resolved = jobs::with_table(&guard, |t| {
        let jid = t.resolve(&spec)?;
        t.make_current(jid);
        // The job may already be running; a redundant SIGCONT is
        // harmless either way. A job with nothing left alive stays
        // Done and the wait below finalizes it immediately.
        let job = t.get_mut(jid).ok_or_else(|| jid.to_string())?;
        if job.alive > 0 {
            job.state = JobState::Running;
        }
        job.notified = false;
        Ok::<_, String>((jid, job.pgid))
    });
    let (jid, pgid) = match resolved {
        Ok(found) => found,
        Err(what) => {
            drop(guard);
            error::report(&ShellError::JobRef { builtin: "fg", what });
            return 1;
        }
    };

    let _ = killpg(pgid, Signal::SIGCONT);
    engine::give_terminal(state, pgid);

    let code = engine::finish_foreground(jid, state, guard);
    jobs::report_changes();
    code
}
