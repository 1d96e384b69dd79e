use std::io::{self, Write};

use crate::runner::RunError;
use crate::{Interpreter, ScrewtapeError};

/// Pretty-print a ScrewtapeError, with caret positioning where it has a location.
/// If `program` is `Some("screwtape")`, prefix messages with "screwtape: ..." for CLI run mode
pub fn print_screwtape_error(program: Option<&str>, code: &str, err: &ScrewtapeError) {
    let prefix_program = |msg: &str| {
        if let Some(p) = program {
            format!("{p}: {msg}")
        } else {
            msg.to_string()
        }
    };

    match err {
        ScrewtapeError::UnmatchedBrackets { ip, kind } => {
            let msg = prefix_program(&format!("Parse error: unmatched bracket {kind}"));
            print_error_with_context(&msg, code, *ip);
        }
        ScrewtapeError::Io { ip, source } => {
            let msg = prefix_program(&format!("I/O error: {source}"));
            print_error_with_context(&msg, code, *ip);
        }
        ScrewtapeError::StepLimitExceeded { .. } | ScrewtapeError::Canceled => {
            // Abort messages are the same everywhere: a single unprefixed line.
            eprintln!("{err}");
            let _ = io::stderr().flush();
        }
        ScrewtapeError::EmptyTape => {
            eprintln!("{}", prefix_program(&err.to_string()));
            let _ = io::stderr().flush();
        }
    }
}

pub fn print_run_error(err: &RunError) {
    eprintln!("{err}");
    let _ = io::stderr().flush();
}

/// Print the tape, cursor position and cursor value to stderr.
pub fn print_tape_summary(interpreter: &Interpreter) {
    let tape = interpreter.tape();
    eprintln!(
        "tape: {tape} (cursor at {}, value {})",
        tape.cursor_offset(),
        tape.get()
    );
    let _ = io::stderr().flush();
}

/// Print a concise error with instruction index and a caret context window,
/// working with UTF-8 by slicing using char indices.
pub fn print_error_with_context(prefix: &str, code: &str, pos: usize) {
    eprintln!("{prefix} at instruction {pos}");
    for line in context_lines(code, pos) {
        eprintln!("  {line}");
    }
    let _ = io::stderr().flush();
}

/// The source window around `pos` and a caret line pointing at it.
fn context_lines(code: &str, pos: usize) -> [String; 2] {
    // Show a short window around the position for context
    const WINDOW_CHARS: usize = 32;

    let total_chars = code.chars().count();
    let start_char = pos.saturating_sub(WINDOW_CHARS);
    let end_char = (pos + WINDOW_CHARS + 1).min(total_chars);

    // Newlines and tabs would break caret alignment
    let slice: String = code
        .chars()
        .skip(start_char)
        .take(end_char - start_char)
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();

    let caret_offset_chars = pos.saturating_sub(start_char);
    let underline = format!("{}^", " ".repeat(caret_offset_chars));

    [slice, underline]
}
