use crate::engine::{ExecutionResult, ShellState};
use crate::error::{self, ShellError};

/// Leave the shell. `exit` exits with 0, `exit <n>` with `n` masked to
/// 8 bits. Bad arguments keep the shell running.
pub fn run(args: &[String], state: &mut ShellState) -> ExecutionResult {
    match args {
        [] => {
            state.last_exit_code = 0;
            ExecutionResult::Exit
        }
        [arg] => match parse_exit_code(arg) {
            Some(code) => {
                state.last_exit_code = code;
                ExecutionResult::Exit
            }
            None => {
                error::report(&ShellError::Usage {
                    builtin: "exit",
                    msg: format!("{}: numeric argument required", arg),
                });
                state.last_exit_code = 2;
                ExecutionResult::KeepRunning
            }
        },
        _ => {
            error::report(&ShellError::Usage {
                builtin: "exit",
                msg: "too many arguments".into(),
            });
            state.last_exit_code = 1;
            ExecutionResult::KeepRunning
        }
    }
}

/// Full-string decimal parse, masked to the 8 bits a wait status can
/// carry. Overflow and trailing garbage count as non-numeric.
pub fn parse_exit_code(arg: &str) -> Option<i32> {
    arg.parse::<i64>().ok().map(|v| (v & 0xff) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_to_eight_bits() {
        assert_eq!(parse_exit_code("0"), Some(0));
        assert_eq!(parse_exit_code("42"), Some(42));
        assert_eq!(parse_exit_code("255"), Some(255));
        assert_eq!(parse_exit_code("256"), Some(0));
        assert_eq!(parse_exit_code("257"), Some(1));
    }

    #[test]
    fn negative_values_wrap() {
        assert_eq!(parse_exit_code("-1"), Some(255));
    }

    #[test]
    fn rejects_non_numeric() {
        assert_eq!(parse_exit_code("abc"), None);
        assert_eq!(parse_exit_code(""), None);
        assert_eq!(parse_exit_code("12x"), None);
        assert_eq!(parse_exit_code("1 2"), None);
        assert_eq!(parse_exit_code("99999999999999999999999"), None);
    }
}
