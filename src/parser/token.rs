use nom::{IResult, Parser, branch::alt, bytes::complete::tag, combinator::value};

use crate::error::ShellError;

/// Maximum length of a single word, in bytes.
pub const MAX_WORD: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Pipe,
    RedirIn,
    RedirOut,
    RedirOutAppend,
    RedirErr,
    RedirErrAppend,
    Amp,
}

// ── Operator recognition ───────────────────────────────────────────────────

/// Match one redirection/pipe/background operator at the start of the
/// input. `2` only participates when directly followed by `>`;
/// otherwise it is an ordinary word character and this parser fails.
fn operator(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::RedirErrAppend, tag("2>>")),
        value(Token::RedirErr, tag("2>")),
        value(Token::RedirOutAppend, tag(">>")),
        value(Token::RedirOut, tag(">")),
        value(Token::RedirIn, tag("<")),
        value(Token::Pipe, tag("|")),
        value(Token::Amp, tag("&")),
    ))
    .parse(input)
}

// ── Lexer ──────────────────────────────────────────────────────────────────

/// Cursor over one input line, yielding one token at a time.
pub struct Lexer<'a> {
    rest: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(line: &'a str) -> Self {
        Lexer { rest: line }
    }

    /// Produce the next token, or `None` at end of line.
    pub fn next_token(&mut self) -> Result<Option<Token>, ShellError> {
        self.rest = self.rest.trim_start_matches([' ', '\t', '\r', '\n']);

        if self.rest.is_empty() {
            return Ok(None);
        }

        if let Ok((rest, tok)) = operator(self.rest) {
            self.rest = rest;
            return Ok(Some(tok));
        }

        let word = self.scan_word()?;
        Ok(Some(Token::Word(expand_tilde(word)?)))
    }

    /// Assemble one word, honoring quotes. An unquoted word ends at
    /// whitespace or the start of any operator; quoting state does not
    /// persist across tokens.
    fn scan_word(&mut self) -> Result<String, ShellError> {
        const TERMINATORS: &str = " \t\r\n|<>&";

        let mut out = String::new();
        let (mut sq, mut dq) = (false, false);
        let mut chars = self.rest.char_indices().peekable();
        let end;

        loop {
            let Some((i, c)) = chars.next() else {
                end = self.rest.len();
                break;
            };
            if c == '\'' && !dq {
                sq = !sq;
                continue;
            }
            if c == '"' && !sq {
                dq = !dq;
                continue;
            }
            if c == '\\' && dq {
                // Inside double quotes, only \" and \\ are escapes.
                if let Some(&(_, next)) = chars.peek() {
                    if next == '"' || next == '\\' {
                        chars.next();
                        out.push(next);
                        continue;
                    }
                }
            }
            if !sq && !dq && TERMINATORS.contains(c) {
                end = i;
                break;
            }
            out.push(c);
            if out.len() >= MAX_WORD {
                return Err(ShellError::Parse("parse error: word too long".into()));
            }
        }

        if sq || dq {
            return Err(ShellError::Parse("parse error: unclosed quote".into()));
        }

        self.rest = &self.rest[end..];
        Ok(out)
    }
}

/// Expand a leading `~` or `~/…` from the `HOME` environment entry.
/// `~user` is not implemented and passes through verbatim.
fn expand_tilde(word: String) -> Result<String, ShellError> {
    if !word.starts_with('~') {
        return Ok(word);
    }
    let rest = &word[1..];
    if !(rest.is_empty() || rest.starts_with('/')) {
        return Ok(word);
    }
    match std::env::var("HOME") {
        Ok(home) => Ok(format!("{}{}", home, rest)),
        Err(_) => Err(ShellError::Sys {
            ctx: "expand_tilde",
            msg: "HOME not set".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tokens(line: &str) -> Vec<Token> {
        let mut lx = Lexer::new(line);
        let mut out = Vec::new();
        while let Some(tok) = lx.next_token().unwrap() {
            out.push(tok);
        }
        out
    }

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn lexes_words_and_operators() {
        assert_eq!(
            all_tokens("ls -la | wc -l"),
            vec![word("ls"), word("-la"), Token::Pipe, word("wc"), word("-l")]
        );
    }

    #[test]
    fn lexes_all_redirections() {
        assert_eq!(
            all_tokens("< a > b >> c 2> d 2>> e"),
            vec![
                Token::RedirIn,
                word("a"),
                Token::RedirOut,
                word("b"),
                Token::RedirOutAppend,
                word("c"),
                Token::RedirErr,
                word("d"),
                Token::RedirErrAppend,
                word("e"),
            ]
        );
    }

    #[test]
    fn two_is_a_word_char_unless_followed_by_gt() {
        assert_eq!(all_tokens("echo 2"), vec![word("echo"), word("2")]);
        assert_eq!(all_tokens("2x"), vec![word("2x")]);
        assert_eq!(
            all_tokens("2>err"),
            vec![Token::RedirErr, word("err")]
        );
    }

    #[test]
    fn word_ends_at_operator_without_spaces() {
        assert_eq!(
            all_tokens("cat<in>out"),
            vec![
                word("cat"),
                Token::RedirIn,
                word("in"),
                Token::RedirOut,
                word("out"),
            ]
        );
        // "2>" only forms an operator at token start.
        assert_eq!(
            all_tokens("file2>out"),
            vec![word("file2"), Token::RedirOut, word("out")]
        );
    }

    #[test]
    fn single_quotes_take_everything() {
        assert_eq!(all_tokens("'a | b'"), vec![word("a | b")]);
        assert_eq!(all_tokens("'x'"), vec![word("x")]);
        assert_eq!(all_tokens("''"), vec![word("")]);
    }

    #[test]
    fn double_quote_escapes() {
        assert_eq!(all_tokens(r#""\\""#), vec![word("\\")]);
        assert_eq!(all_tokens(r#""\"""#), vec![word("\"")]);
        // Other backslashes are literal.
        assert_eq!(all_tokens(r#""a\b""#), vec![word("a\\b")]);
    }

    #[test]
    fn quotes_join_into_one_word() {
        assert_eq!(all_tokens("a'b'\"c\""), vec![word("abc")]);
    }

    #[test]
    fn unclosed_quote_is_an_error() {
        let mut lx = Lexer::new("echo 'oops");
        assert_eq!(lx.next_token().unwrap(), Some(word("echo")));
        assert!(lx.next_token().is_err());
        assert!(Lexer::new("\"half").next_token().is_err());
    }

    #[test]
    fn word_length_boundary() {
        let ok = "w".repeat(MAX_WORD - 1);
        assert_eq!(all_tokens(&ok), vec![word(&ok)]);

        let too_long = "w".repeat(MAX_WORD);
        assert!(Lexer::new(&too_long).next_token().is_err());
    }

    #[test]
    fn tilde_expansion() {
        unsafe { std::env::set_var("HOME", "/home/tester") };
        assert_eq!(all_tokens("~"), vec![word("/home/tester")]);
        assert_eq!(all_tokens("~/src"), vec![word("/home/tester/src")]);
        // ~user is passed through unchanged.
        assert_eq!(all_tokens("~root"), vec![word("~root")]);
        // A tilde elsewhere in the word is literal.
        assert_eq!(all_tokens("a~b"), vec![word("a~b")]);
    }

    #[test]
    fn ampersand_token() {
        assert_eq!(
            all_tokens("sleep 5 &"),
            vec![word("sleep"), word("5"), Token::Amp]
        );
    }
}
