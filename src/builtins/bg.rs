use nix::sys::signal::{Signal, killpg};

use crate::engine::jobs::{self, JobSpec, JobState};
use crate::error::{self, ShellError};
use crate::signals::ChldGuard;

/// Resume a stopped job in the background.
pub fn run(args: &[String]) -> i32 {
    if args.len() > 1 {
        error::report(&ShellError::Usage {
            builtin: "bg",
            msg: "too many arguments".into(),
        });
        return 1;
    }

    let spec = match JobSpec::parse(args.first().map(String::as_str)) {
        Ok(spec) => spec,
        Err(what) => {
            error::report(&ShellError::JobRef { builtin: "bg", what });
            return 1;
        }
    };

    let guard = ChldGuard::block();
    let resolved = jobs::with_table(&guard, |t| {
        let jid = t.resolve(&spec)?;
        t.make_current(jid);
        let job = t.get_mut(jid).ok_or_else(|| jid.to_string())?;
        if job.alive > 0 {
            job.state = JobState::Running;
        }
        job.notified = false;
        let pgid = job.pgid;
        let line = match t.get(jid) {
            Some(job) => t.render(job),
            None => String::new(),
        };
        Ok::<_, String>((pgid, line))
    });
    let (pgid, line) = match resolved {
        Ok(found) => found,
        Err(what) => {
            drop(guard);
            error::report(&ShellError::JobRef { builtin: "bg", what });
            return 1;
        }
    };
    let _ = killpg(pgid, Signal::SIGCONT);
    drop(guard);

    println!("{} &", line);
    0
}
