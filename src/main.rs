mod builtins;
mod engine;
mod error;
mod parser;
mod signals;

use std::env;

use nix::unistd::gethostname;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use engine::{ExecutionResult, ShellState};
use error::ShellError;

/// Exit status for failures of the shell itself, as opposed to the
/// commands it runs.
const EXIT_INTERNAL_ERROR: i32 = 255;

/// Build the two-line prompt:
///
/// ```text
/// <user>@<host>: <cwd>
/// [<last exit code>]->
/// ```
///
/// with a `HOME` prefix of the cwd shortened to `~`.
fn prompt(state: &ShellState) -> Result<String, ShellError> {
    let home = env::var("HOME").map_err(|_| ShellError::Sys {
        ctx: "prompt",
        msg: "getenv \"HOME\" failed".into(),
    })?;
    let user = env::var("USER").map_err(|_| ShellError::Sys {
        ctx: "prompt",
        msg: "getenv \"USER\" failed".into(),
    })?;
    let host = gethostname().map_err(|errno| ShellError::Io {
        ctx: "gethostname",
        errno,
    })?;
    let cwd = env::current_dir().map_err(|err| ShellError::Sys {
        ctx: "getcwd",
        msg: err.to_string(),
    })?;

    let cwd = cwd.to_string_lossy().into_owned();
    let display = shorten_home(&cwd, &home);
    Ok(format!(
        "\n{}@{}: {}\n[{}]-> ",
        user,
        host.to_string_lossy(),
        display,
        state.last_exit_code
    ))
}

/// Replace a leading `home` prefix with `~`, but only at a path
/// component boundary.
fn shorten_home(cwd: &str, home: &str) -> String {
    if let Some(rest) = cwd.strip_prefix(home) {
        if rest.is_empty() || rest.starts_with('/') {
            return format!("~{}", rest);
        }
    }
    cwd.to_string()
}

fn repl(state: &mut ShellState) -> Result<i32, ShellError> {
    let mut rl = DefaultEditor::new().map_err(|err| ShellError::Sys {
        ctx: "readline",
        msg: err.to_string(),
    })?;

    loop {
        let prompt = prompt(state)?;
        match rl.readline(&prompt) {
            Ok(line) => match parser::parse_line(&line) {
                Ok(Some(pipeline)) => {
                    if let ExecutionResult::Exit = engine::execute(&pipeline, state) {
                        return Ok(state.last_exit_code);
                    }
                }
                Ok(None) => continue,
                Err(err) => error::report(&err),
            },
            // Ctrl-C abandons the line; the prompt comes back.
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                println!();
                return Ok(state.last_exit_code);
            }
            Err(err) => {
                return Err(ShellError::Sys {
                    ctx: "readline",
                    msg: err.to_string(),
                });
            }
        }
    }
}

fn main() {
    env_logger::init();
    if let Some(argv0) = env::args().next() {
        error::set_program_name(&argv0);
    }

    let mut state = ShellState::new();
    if let Err(err) = signals::init(state.interactive) {
        error::report(&err);
        std::process::exit(EXIT_INTERNAL_ERROR);
    }
    // setpgid above may have moved us into our own group.
    state.shell_pgid = nix::unistd::getpgrp();

    let code = match repl(&mut state) {
        Ok(code) => code.clamp(0, 255),
        Err(err) => {
            error::report(&err);
            EXIT_INTERNAL_ERROR
        }
    };
    std::process::exit(code);
}
