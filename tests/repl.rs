use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

// Keeps a developer's own screwtape.toml out of the picture.
fn missing_config() -> PathBuf {
    Path::new(env!("CARGO_TARGET_TMPDIR")).join("screwtape-tests-no-config.toml")
}

fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("screwtape").unwrap();
    cmd.timeout(Duration::from_secs(5))
        .env("SCREWTAPE_CONFIG", missing_config())
        .env_remove("SCREWTAPE_REPL_MODE")
        .env_remove("SCREWTAPE_TIMEOUT_MS")
        .env_remove("SCREWTAPE_MAX_STEPS")
        .env_remove("SCREWTAPE_LOG");
    cmd
}

#[test]
fn piped_stdin_runs_once_in_bare_mode() {
    cargo_bin()
        .write_stdin("+++.")
        .assert()
        .success()
        .stdout("\u{3}\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn repl_subcommand_reads_multiline_program() {
    cargo_bin()
        .arg("repl")
        .write_stdin("++++++++[<+++++++++>-]<.\n>>++++++++[<+++++++++>-]<+.\n")
        .assert()
        .success()
        .stdout("HI\n");
}

#[test]
fn empty_submission_prints_nothing() {
    cargo_bin()
        .arg("repl")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());
}

#[test]
fn meta_exit_ignores_the_rest_of_the_input() {
    cargo_bin()
        .write_stdin(":exit\n+++.\n")
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty());
}

#[test]
fn meta_help_prints_to_stderr_not_stdout() {
    cargo_bin()
        .write_stdin(":help\n:exit\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(":reset").and(predicate::str::contains(":tape")));
}

#[test]
fn meta_reset_discards_the_pending_buffer() {
    let program = format!("+++\n:reset\n{}.\n", "+".repeat(72));
    cargo_bin()
        .write_stdin(program)
        .assert()
        .success()
        .stdout("H\n");
}

#[test]
fn meta_tape_reports_tape_after_running() {
    cargo_bin()
        .write_stdin(":tape\n+++>+\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("tape: [3, 1] (cursor at 1, value 1)"));
}

#[test]
fn colon_lines_that_are_not_meta_commands_run_as_code() {
    cargo_bin()
        .env("SCREWTAPE_REPL_MODE", "bare")
        .arg("repl")
        .write_stdin(":+++ add three\n.\n")
        .assert()
        .success()
        .stdout("\u{3}\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn bracket_errors_do_not_change_the_exit_code() {
    cargo_bin()
        .arg("repl")
        .write_stdin("+]")
        .assert()
        .success()
        .stdout("\n")
        .stderr(predicate::str::contains("Parse error: unmatched bracket ']' at instruction 1"));
}

#[test]
fn editor_on_non_tty_is_error_exit_1() {
    cargo_bin()
        .args(["repl", "--editor"])
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("stdin is not a TTY"));
}

#[test]
fn env_editor_mode_on_non_tty_is_error_exit_1() {
    cargo_bin()
        .env("SCREWTAPE_REPL_MODE", "editor")
        .arg("repl")
        .write_stdin("+++.")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("TTY"));
}

#[test]
fn bare_flag_overrides_env_mode() {
    cargo_bin()
        .env("SCREWTAPE_REPL_MODE", "editor")
        .args(["repl", "--bare"])
        .write_stdin("+++.")
        .assert()
        .success()
        .stdout("\u{3}\n");
}

#[test]
fn bare_and_editor_flags_conflict() {
    cargo_bin()
        .args(["repl", "--bare", "--editor"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
