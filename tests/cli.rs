//! End-to-end scenarios: feed the shell a script on stdin and inspect
//! its output, exit status, and filesystem effects.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tysh-test-{}-{}", std::process::id(), name));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

fn shell() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tysh"))
}

fn run_in(dir: &Path, input: &str) -> Output {
    let mut child = shell()
        .current_dir(dir)
        .env("HOME", dir)
        .env("USER", "tester")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn tysh");
    child
        .stdin
        .as_mut()
        .expect("piped stdin")
        .write_all(input.as_bytes())
        .expect("write script");
    child.wait_with_output().expect("wait for tysh")
}

fn run(name: &str, input: &str) -> Output {
    run_in(&scratch_dir(name), input)
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn echo_runs_and_exits_zero() {
    let out = run("echo", "echo hello\n");
    assert!(stdout(&out).contains("hello\n"));
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn quoted_arguments_stay_single_words() {
    let out = run("quotes", "echo 'a b'\n");
    assert!(stdout(&out).contains("a b\n"));
}

#[test]
fn pipeline_connects_stages() {
    let out = run("pipeline", "echo one two three | wc -w\n");
    assert!(stdout(&out).contains('3'));
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn redirections_round_trip_a_file() {
    let dir = scratch_dir("redir");
    fs::write(dir.join("in.txt"), "ABC").unwrap();

    let out = run_in(&dir, "cat < in.txt > out.txt\n");
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(fs::read_to_string(dir.join("out.txt")).unwrap(), "ABC");
}

#[test]
fn append_redirection_keeps_existing_content() {
    let dir = scratch_dir("append");
    let out = run_in(&dir, "echo one > f.txt\necho two >> f.txt\n");
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(fs::read_to_string(dir.join("f.txt")).unwrap(), "one\ntwo\n");
}

#[test]
fn stderr_redirection_captures_diagnostics() {
    let dir = scratch_dir("stderr");
    let out = run_in(&dir, "ls definitely-missing 2> err.txt\n");
    assert!(!fs::read_to_string(dir.join("err.txt")).unwrap().is_empty());
    assert_ne!(out.status.code(), Some(0));
}

#[test]
fn pipeline_counts_matching_files() {
    let dir = scratch_dir("grepcount");
    for name in ["a.c", "b.c", "c.c", "d.c", "e.c", "f.c"] {
        fs::write(dir.join(name), "").unwrap();
    }
    let out = run_in(&dir, "ls | grep \".c\" | wc -l\n");
    assert!(stdout(&out).contains('6'), "got: {}", stdout(&out));
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn signal_deaths_report_128_plus_signo() {
    // The child kills itself with SIGKILL (9).
    let out = run("sigdeath", "sh -c 'kill -9 $$'\n");
    assert_eq!(out.status.code(), Some(137));
}

#[test]
fn cd_exports_pwd_to_children() {
    let dir = scratch_dir("pwdenv");
    fs::create_dir_all(dir.join("sub")).unwrap();
    let out = run_in(&dir, "cd sub\nsh -c 'echo $PWD'\n");
    assert!(stdout(&out).contains("/sub"), "got: {}", stdout(&out));
}

#[test]
fn cd_dash_returns_and_exports_oldpwd() {
    let dir = scratch_dir("oldpwd");
    fs::create_dir_all(dir.join("sub")).unwrap();
    let out = run_in(&dir, "cd sub\ncd -\nsh -c 'echo $OLDPWD'\n");
    assert!(stdout(&out).contains("/sub"), "got: {}", stdout(&out));
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn two_background_jobs_get_distinct_ids_and_marks() {
    let out = run("marks", "sleep 5 &\nsleep 6 &\njobs\n");
    let text = stdout(&out);
    assert!(text.contains("[1]-  Running\tsleep 5 &"), "got: {text}");
    assert!(text.contains("[2]+  Running\tsleep 6 &"), "got: {text}");
}

#[test]
fn finished_background_jobs_are_reported_once() {
    let out = run("donejob", "sleep 0.2 &\nsleep 0.5\njobs\n");
    let text = stdout(&out);
    assert!(text.contains("Done"), "got: {text}");
    assert!(text.contains("sleep 0.2 &"), "got: {text}");
    // Reported Done jobs leave the table, so `jobs` has nothing left.
    assert!(!text.contains("Running"), "got: {text}");
}

#[test]
fn unset_path_fails_resolution() {
    let dir = scratch_dir("nopath");
    let mut child = shell()
        .current_dir(&dir)
        .env("HOME", &dir)
        .env("USER", "tester")
        .env_remove("PATH")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn tysh");
    child
        .stdin
        .as_mut()
        .expect("piped stdin")
        .write_all(b"anything\n")
        .expect("write script");
    let out = child.wait_with_output().expect("wait for tysh");
    assert!(stderr(&out).contains("PATH not set"), "got: {}", stderr(&out));
    assert_eq!(out.status.code(), Some(127));
}

#[test]
fn literal_paths_run_without_a_search() {
    let out = run("literal", "/bin/echo direct\n");
    assert!(stdout(&out).contains("direct\n"));
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn unknown_commands_report_127() {
    let out = run("notfound", "no-such-command-xyzzy\n");
    assert!(stderr(&out).contains(": command not found"));
    assert_eq!(out.status.code(), Some(127));
}

#[test]
fn failing_command_sets_the_exit_code() {
    let out = run("false", "false\n");
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn exit_code_is_masked_to_eight_bits() {
    let out = run("exit257", "exit 257\n");
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn exit_rejects_non_numeric_arguments() {
    let out = run("exitabc", "exit abc\n");
    assert!(stderr(&out).contains("numeric argument required"));
    // The shell keeps running and reports 2 once stdin ends.
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn exit_with_too_many_arguments_keeps_the_shell_alive() {
    let out = run("exitmany", "exit 1 2\necho alive\n");
    assert!(stderr(&out).contains("too many arguments"));
    assert!(stdout(&out).contains("alive\n"));
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn parse_errors_abort_only_the_line() {
    let out = run("parse", "ls | | wc\necho still-here\n");
    assert!(stderr(&out).contains("parse error near '|'"));
    assert!(stdout(&out).contains("still-here\n"));
}

#[test]
fn background_jobs_show_up_in_jobs() {
    let out = run("jobs", "sleep 5 &\njobs\n");
    let text = stdout(&out);
    assert!(text.contains("[1]"), "missing job id in: {text}");
    assert!(text.contains("Running"), "missing state in: {text}");
    assert!(text.contains("sleep 5 &"), "missing command in: {text}");
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn cd_updates_pwd_and_oldpwd() {
    let dir = scratch_dir("cd");
    fs::create_dir_all(dir.join("sub")).unwrap();
    // `cd -` returns to the starting directory and prints it.
    let out = run_in(&dir, "cd sub\npwd\ncd -\n");
    let text = stdout(&out);
    assert!(text.contains("sub"), "pwd after cd in: {text}");
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn cd_to_a_file_fails() {
    let dir = scratch_dir("cdfile");
    fs::write(dir.join("plain"), "x").unwrap();
    let out = run_in(&dir, "cd plain\n");
    assert!(!stderr(&out).is_empty());
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn pipelines_are_capped_at_sixty_four_stages() {
    let ok = format!("echo hi{}\n", " | cat".repeat(63));
    let out = run("procs-ok", &ok);
    assert!(stdout(&out).contains("hi"));
    assert_eq!(out.status.code(), Some(0));

    let over = format!("echo hi{}\n", " | cat".repeat(64));
    let out = run("procs-over", &over);
    assert!(stderr(&out).contains("pipeline too long"));
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn fg_without_jobs_is_an_error() {
    let out = run("fg", "fg\n");
    assert!(stderr(&out).contains("no such job"));
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn missing_home_is_fatal_at_startup() {
    let mut child = shell()
        .env_remove("HOME")
        .env("USER", "tester")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn tysh");
    drop(child.stdin.take());
    let out = child.wait_with_output().expect("wait for tysh");
    assert_eq!(out.status.code(), Some(255));
    assert!(!stderr(&out).is_empty());
}
