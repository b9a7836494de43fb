mod exec;
pub mod jobs;
pub mod path;
pub mod reaper;
mod redirect;
mod state;

// Re-export the public surface so callers (`main.rs`, `builtins/`)
// use `engine::execute`, `engine::ShellState`, etc.
pub use exec::{execute, finish_foreground, give_terminal};
pub use state::{ExecutionResult, ShellState};
