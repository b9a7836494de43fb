mod ast;
mod token;

pub use ast::{Command, MAX_PRINTABLE, Pipeline, Redirect, Redirections};
pub use token::MAX_WORD;

use token::{Lexer, Token};

use crate::error::ShellError;

// ── Public API ────────────────────────────────────────────────────────────

/// Parse one input line into a [`Pipeline`].
///
/// Returns `Ok(None)` for a whitespace-only line (nothing to run) and
/// `Err` for any syntax error.
pub fn parse_line(input: &str) -> Result<Option<Pipeline>, ShellError> {
    let mut lexer = Lexer::new(input);
    let mut commands = vec![Command::default()];
    let mut background = false;
    let mut saw_token = false;

    while let Some(tok) = lexer.next_token()? {
        // `&` is only valid as the last token of the line.
        if background {
            return Err(parse_error("&"));
        }
        saw_token = true;

        let cur = commands
            .last_mut()
            .expect("pipeline always has a current command");
        match tok {
            Token::Word(w) => cur.argv.push(w),
            Token::Pipe => {
                if cur.argv.is_empty() {
                    return Err(parse_error("|"));
                }
                commands.push(Command::default());
            }
            Token::RedirIn => {
                if cur.redirs.stdin.is_some() {
                    return Err(parse_error("<"));
                }
                cur.redirs.stdin = Some(redirect_target(&mut lexer, "<")?);
            }
            Token::RedirOut => set_output(&mut lexer, &mut cur.redirs.stdout, ">", false)?,
            Token::RedirOutAppend => set_output(&mut lexer, &mut cur.redirs.stdout, ">>", true)?,
            Token::RedirErr => set_output(&mut lexer, &mut cur.redirs.stderr, "2>", false)?,
            Token::RedirErrAppend => set_output(&mut lexer, &mut cur.redirs.stderr, "2>>", true)?,
            Token::Amp => background = true,
        }
    }

    if !saw_token {
        return Ok(None);
    }
    if commands
        .last()
        .is_none_or(|cmd| cmd.argv.is_empty())
    {
        return Err(ShellError::Parse("empty command".into()));
    }

    Ok(Some(Pipeline {
        commands,
        background,
    }))
}

fn parse_error(near: &str) -> ShellError {
    ShellError::Parse(format!("parse error near '{}'", near))
}

/// The token after a redirection operator must be a word.
fn redirect_target(lexer: &mut Lexer, op: &str) -> Result<String, ShellError> {
    match lexer.next_token()? {
        Some(Token::Word(w)) => Ok(w),
        _ => Err(parse_error(op)),
    }
}

fn set_output(
    lexer: &mut Lexer,
    slot: &mut Option<Redirect>,
    op: &str,
    append: bool,
) -> Result<(), ShellError> {
    if slot.is_some() {
        return Err(parse_error(op));
    }
    let path = redirect_target(lexer, op)?;
    *slot = Some(Redirect { path, append });
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────
