use std::ffi::CString;
use std::os::fd::{BorrowedFd, IntoRawFd, RawFd};
use std::os::unix::ffi::OsStringExt;
use std::process;

use nix::sys::signal::{Signal, killpg};
use nix::sys::wait::waitpid;
use nix::unistd::{ForkResult, Pid, close, dup2, execv, fork, getpid, pipe, setpgid, tcsetpgrp};

use crate::builtins;
use crate::error::{self, ShellError};
use crate::parser::{Command, Pipeline};
use crate::signals::{self, ChldGuard};

use super::jobs::{self, JobState, MAX_PROCS};
use super::path;
use super::redirect;
use super::state::{ExecutionResult, ShellState};

/// Run one parsed pipeline to completion (or into the background).
pub fn execute(pipeline: &Pipeline, state: &mut ShellState) -> ExecutionResult {
    // Anything that finished while we were at the prompt gets reported
    // before new output can interleave with it.
    jobs::report_changes();

    if let Some(result) = builtins::try_parent(pipeline, state) {
        return result;
    }

    if pipeline.commands.len() > MAX_PROCS {
        error::report(&ShellError::TableFull("pipeline too long"));
        state.last_exit_code = 1;
        return ExecutionResult::KeepRunning;
    }

    log::debug!("launching: {}", pipeline.printable());

    // No child may be reaped before its job record exists, so SIGCHLD
    // stays blocked from the first fork until registration.
    let guard = ChldGuard::block();
    let pids = match spawn_stages(pipeline, state) {
        Ok(pids) => pids,
        Err(err) => {
            drop(guard);
            error::report(&err);
            state.last_exit_code = 1;
            return ExecutionResult::KeepRunning;
        }
    };
    let pgid = pids[0];
    let last_pid = pids[pids.len() - 1];

    let added = jobs::with_table(&guard, |t| {
        t.add(pgid, pids.clone(), last_pid, pipeline.printable())
    });
    let jid = match added {
        Ok(jid) => jid,
        Err(msg) => {
            // The children are already running with no record to track
            // them; take them down and reap them inline.
            let _ = killpg(pgid, Signal::SIGKILL);
            for &pid in &pids {
                let _ = waitpid(pid, None);
            }
            if !pipeline.background {
                restore_terminal(state);
            }
            drop(guard);
            error::report(&ShellError::TableFull(msg));
            state.last_exit_code = 1;
            return ExecutionResult::KeepRunning;
        }
    };
    log::debug!("job [{}] pgid {} ({} stage(s))", jid, pgid, pids.len());

    if pipeline.background {
        drop(guard);
        println!("[{}] {}", jid, pgid);
        state.last_exit_code = 0;
    } else {
        state.last_exit_code = finish_foreground(jid, state, guard);
        jobs::report_changes();
    }
    ExecutionResult::KeepRunning
}

/// Fork every stage, wiring adjacent stages together with pipes.
/// On failure the already-forked part of the pipeline is killed,
/// reaped, and unwound before returning.
fn spawn_stages(pipeline: &Pipeline, state: &ShellState) -> Result<Vec<Pid>, ShellError> {
    let stages = &pipeline.commands;
    let mut pids: Vec<Pid> = Vec::with_capacity(stages.len());
    let mut pgid: Option<Pid> = None;
    let mut prev_rd: Option<RawFd> = None;

    for (i, stage) in stages.iter().enumerate() {
        let pipe_pair = if i + 1 < stages.len() {
            match pipe() {
                Ok((rd, wr)) => Some((rd.into_raw_fd(), wr.into_raw_fd())),
                Err(errno) => {
                    abort_spawn(state, &pids, prev_rd, None, !pipeline.background);
                    return Err(ShellError::Io { ctx: "pipe", errno });
                }
            }
        } else {
            None
        };

        match unsafe { fork() } {
            Ok(ForkResult::Child) => child_exec(stage, pgid, prev_rd, pipe_pair),
            Ok(ForkResult::Parent { child }) => {
                let group = *pgid.get_or_insert(child);
                // Redundant with the child's own setpgid; whichever
                // side loses the race fails harmlessly.
                let _ = setpgid(child, group);
                if pids.is_empty() && !pipeline.background && state.interactive {
                    // Hand the terminal over before the job can need it.
                    give_terminal(state, group);
                }
                pids.push(child);

                if let Some(fd) = prev_rd.take() {
                    let _ = close(fd);
                }
                if let Some((rd, wr)) = pipe_pair {
                    let _ = close(wr);
                    prev_rd = Some(rd);
                }
            }
            Err(errno) => {
                abort_spawn(state, &pids, prev_rd, pipe_pair, !pipeline.background);
                return Err(ShellError::Io { ctx: "fork", errno });
            }
        }
    }
    Ok(pids)
}

/// Unwind a partially launched pipeline: close leftover pipe ends,
/// kill and reap what was already forked, give the terminal back.
fn abort_spawn(
    state: &ShellState,
    pids: &[Pid],
    prev_rd: Option<RawFd>,
    pipe_pair: Option<(RawFd, RawFd)>,
    foreground: bool,
) {
    if let Some((rd, wr)) = pipe_pair {
        let _ = close(rd);
        let _ = close(wr);
    }
    if let Some(fd) = prev_rd {
        let _ = close(fd);
    }
    if let Some(&pgid) = pids.first() {
        let _ = killpg(pgid, Signal::SIGKILL);
        for &pid in pids {
            let _ = waitpid(pid, None);
        }
        if foreground {
            restore_terminal(state);
        }
    }
}

/// The forked half of one pipeline stage. Either replaces the process
/// image or exits with a conventional code; never returns.
fn child_exec(
    stage: &Command,
    pgid: Option<Pid>,
    prev_rd: Option<RawFd>,
    pipe_pair: Option<(RawFd, RawFd)>,
) -> ! {
    signals::restore_default();
    signals::unblock_sigchld();

    // Join the pipeline's group before touching the pipe fds, mirroring
    // the parent's setpgid on the other side of the race.
    let group = pgid.unwrap_or_else(getpid);
    let _ = setpgid(Pid::from_raw(0), group);

    if let Some(fd) = prev_rd {
        if let Err(errno) = dup2(fd, nix::libc::STDIN_FILENO) {
            error::report(&ShellError::Io { ctx: "dup2", errno });
            process::exit(1);
        }
        let _ = close(fd);
    }
    if let Some((rd, wr)) = pipe_pair {
        let _ = close(rd);
        if let Err(errno) = dup2(wr, nix::libc::STDOUT_FILENO) {
            error::report(&ShellError::Io { ctx: "dup2", errno });
            process::exit(1);
        }
        let _ = close(wr);
    }

    if let Err(err) = redirect::apply(&stage.redirs) {
        error::report(&err);
        process::exit(1);
    }

    if let Some(code) = builtins::run_in_child(&stage.argv) {
        process::exit(code);
    }

    let resolved = match path::find_executable(&stage.argv[0]) {
        Ok(path) => path,
        Err(err) => {
            error::report(&err);
            process::exit(127);
        }
    };

    let prog = CString::new(resolved.into_os_string().into_vec());
    let argv: Result<Vec<CString>, _> = stage
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect();
    let (Ok(prog), Ok(argv)) = (prog, argv) else {
        error::report(&ShellError::Sys {
            ctx: "execv",
            msg: "argument contains NUL".into(),
        });
        process::exit(1);
    };

    match execv(&prog, &argv) {
        Ok(never) => match never {},
        Err(errno) => {
            error::report(&ShellError::Io { ctx: "execv", errno });
            process::exit(126);
        }
    }
}

/// Shared tail of every foreground wait (`execute` and the `fg`
/// builtin): sleep until the job leaves Running, take the terminal
/// back, and fold the outcome into an exit code. Consumes the SIGCHLD
/// guard held since before the job existed.
pub fn finish_foreground(jid: usize, state: &ShellState, guard: ChldGuard) -> i32 {
    loop {
        let job_state = jobs::with_table(&guard, |t| t.get(jid).map(|j| j.state));
        match job_state {
            Some(JobState::Running) => guard.wait_for_child(),
            _ => break,
        }
    }

    restore_terminal(state);

    let code = jobs::with_table(&guard, |t| {
        let (job_state, last_status) = match t.get(jid) {
            Some(job) => (job.state, job.last_status),
            None => return 0,
        };
        match job_state {
            JobState::Done => {
                t.remove(jid);
                jobs::exit_code(last_status)
            }
            JobState::Stopped => {
                // Report the stop on the next notification pass.
                if let Some(job) = t.get_mut(jid) {
                    job.notified = false;
                }
                0
            }
            JobState::Running => 0,
        }
    });
    drop(guard);
    code
}

/// Put the shell's own group back in the terminal foreground.
pub fn restore_terminal(state: &ShellState) {
    if state.interactive {
        let term = unsafe { BorrowedFd::borrow_raw(state.terminal) };
        let _ = tcsetpgrp(term, state.shell_pgid);
    }
}

/// Hand the terminal foreground to a job's process group.
pub fn give_terminal(state: &ShellState, pgid: Pid) {
    if state.interactive {
        let term = unsafe { BorrowedFd::borrow_raw(state.terminal) };
        let _ = tcsetpgrp(term, pgid);
    }
}
