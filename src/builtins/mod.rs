pub mod bg;
pub mod cd;
pub mod exit;
pub mod fg;
pub mod jobs;

use crate::engine::{ExecutionResult, ShellState};
use crate::error::{self, ShellError};
use crate::parser::Pipeline;

/// Run a builtin in the shell process itself, when the pipeline shape
/// allows it: exactly one stage, no redirections, foreground.
///
/// Returns `None` when the pipeline is not such a builtin and must be
/// forked instead.
pub fn try_parent(pipeline: &Pipeline, state: &mut ShellState) -> Option<ExecutionResult> {
    if pipeline.commands.len() != 1 || pipeline.background {
        return None;
    }
    let cmd = &pipeline.commands[0];
    if !cmd.redirs.is_empty() {
        return None;
    }

    let args = &cmd.argv[1..];
    match cmd.argv[0].as_str() {
        "jobs" => state.last_exit_code = jobs::run(args),
        "fg" => state.last_exit_code = fg::run(args, state),
        "bg" => state.last_exit_code = bg::run(args),
        "cd" => state.last_exit_code = cd::run(args),
        "exit" => return Some(exit::run(args, state)),
        _ => return None,
    }
    Some(ExecutionResult::KeepRunning)
}

/// Builtin fallback inside a forked pipeline stage. Returns the exit
/// status the child should terminate with, or `None` for external
/// commands.
///
/// `cd` and `jobs` act on the child's copy of shell state; `exit`
/// takes the stage down with the code it would have set. `fg`/`bg`
/// cannot run without the terminal.
pub fn run_in_child(argv: &[String]) -> Option<i32> {
    let args = &argv[1..];
    match argv[0].as_str() {
        "cd" => Some(cd::run(args)),
        "jobs" => Some(jobs::run(args)),
        "exit" => Some(exit_status_in_child(args)),
        "fg" => {
            error::report(&ShellError::Usage {
                builtin: "fg",
                msg: "no job control".into(),
            });
            Some(1)
        }
        "bg" => {
            error::report(&ShellError::Usage {
                builtin: "bg",
                msg: "no job control".into(),
            });
            Some(1)
        }
        _ => None,
    }
}

fn exit_status_in_child(args: &[String]) -> i32 {
    match args {
        [] => 0,
        [arg] => match exit::parse_exit_code(arg) {
            Some(code) => code,
            None => {
                error::report(&ShellError::Usage {
                    builtin: "exit",
                    msg: format!("{}: numeric argument required", arg),
                });
                2
            }
        },
        _ => {
            error::report(&ShellError::Usage {
                builtin: "exit",
                msg: "too many arguments".into(),
            });
            1
        }
    }
}
