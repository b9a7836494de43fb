// ── AST types ──────────────────────────────────────────────────────────────

/// Longest printable command line kept on a job record.
pub const MAX_PRINTABLE: usize = 1024;

/// An output redirection target. `append` selects `>>`/`2>>` over
/// `>`/`2>`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Redirect {
    pub path: String,
    pub append: bool,
}

/// The three redirection slots of one pipeline stage. Each slot is set
/// at most once; the parser rejects duplicates.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Redirections {
    pub stdin: Option<String>,
    pub stdout: Option<Redirect>,
    pub stderr: Option<Redirect>,
}

impl Redirections {
    pub fn is_empty(&self) -> bool {
        self.stdin.is_none() && self.stdout.is_none() && self.stderr.is_none()
    }
}

/// One stage of a pipeline: an argument vector plus redirections.
/// A valid stage has a non-empty argv.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Command {
    pub argv: Vec<String>,
    pub redirs: Redirections,
}

/// One or more commands connected by `|`, possibly backgrounded.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Pipeline {
    pub commands: Vec<Command>, // length ≥ 1
    pub background: bool,
}

impl Pipeline {
    /// Reconstruct a printable command line for job listings, bounded
    /// at [`MAX_PRINTABLE`] characters.
    pub fn printable(&self) -> String {
        let mut out = String::new();
        for (i, cmd) in self.commands.iter().enumerate() {
            if i > 0 {
                out.push_str(" | ");
            }
            for (j, word) in cmd.argv.iter().enumerate() {
                if j > 0 {
                    out.push(' ');
                }
                push_word(&mut out, word);
            }
            if let Some(path) = &cmd.redirs.stdin {
                out.push_str(" < ");
                push_word(&mut out, path);
            }
            if let Some(r) = &cmd.redirs.stdout {
                out.push_str(if r.append { " >> " } else { " > " });
                push_word(&mut out, &r.path);
            }
            if let Some(r) = &cmd.redirs.stderr {
                out.push_str(if r.append { " 2>> " } else { " 2> " });
                push_word(&mut out, &r.path);
            }
        }
        if self.background {
            out.push_str(" &");
        }
        truncate_chars(&mut out, MAX_PRINTABLE);
        out
    }
}

/// Append `word`, re-quoting it when it would not survive a reparse
/// as a single token.
fn push_word(out: &mut String, word: &str) {
    let needs_quotes = word.is_empty() || word.chars().any(|c| " \t\r\n|<>&'\"".contains(c));
    if needs_quotes {
        out.push('\'');
        out.push_str(word);
        out.push('\'');
    } else {
        out.push_str(word);
    }
}

fn truncate_chars(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}
