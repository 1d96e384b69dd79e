//! A Screwtape interpreter library.
//!
//! Screwtape is a tiny tape language with seven commands working on an
//! unbounded tape of signed integer cells:
//!
//! - `>` / `<`: move the cursor right / left, growing the tape on demand.
//! - `+` / `-`: increment / decrement the current cell (wrapping `i32`).
//! - `.`: output the character whose code point is the current cell value.
//! - `[`: do nothing; it only marks where a loop starts.
//! - `]`: if the current cell is not 0, jump back to just after the matching `[`.
//!
//! Every other character is ignored, so programs may carry comments. Because
//! `]` tests after the body, a loop body always runs at least once.
//!
//! Features and behaviors:
//! - The tape starts as a single zero cell and can be seeded with any values.
//! - Moving left of the first cell prepends a new cell; the tape never shrinks.
//! - Unbalanced brackets are rejected before the program touches the tape.
//! - Output is collected into a `String` and returned when the program ends.
//!
//! Quick start:
//!
//! ```
//! use screwtape::Interpreter;
//!
//! let mut interpreter = Interpreter::new();
//! let output = interpreter
//!     .execute("++++++++[<+++++++++>-]<.>>++++++++[<+++++++++>-]<+.")
//!     .expect("program should run");
//! assert_eq!(output, "HI");
//! assert_eq!(interpreter.tape_data(), vec![72, 73, 0]);
//! ```

pub mod cli_util;
pub mod commands;
pub mod config;
mod error;
mod interpreter;
pub mod repl;
pub mod runner;
mod tape;
mod writer;

pub use error::{ErrorKind, ScrewtapeError, UnmatchedBracketKind};
pub use interpreter::{cell_char, Interpreter, JumpTable, StepControl};
pub use tape::Tape;
pub use writer::{ScrewtapeWriter, WriterOptions};
