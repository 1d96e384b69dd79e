use clap::Args;
use std::fs;
use std::io::{self, Write};

use crate::cli_util::{print_run_error, print_screwtape_error, print_tape_summary};
use crate::config::config;
use crate::runner::{run_bounded, Limits};
use crate::Interpreter;

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Print a step-by-step table of operations while executing
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Read Screwtape code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Concatenated Screwtape code parts
    #[arg(value_name = "code", trailing_var_arg = true, allow_hyphen_values = true)]
    pub code: Vec<String>,

    /// Seed the tape with comma-separated values; the cursor starts on the first
    #[arg(short = 't', long = "tape", value_name = "N,N,...", value_delimiter = ',', allow_hyphen_values = true)]
    pub tape: Option<Vec<i32>>,

    /// Print the final tape, cursor position and cursor value to stderr
    #[arg(long = "show-tape")]
    pub show_tape: bool,

    /// Wall-clock timeout in milliseconds (fallback SCREWTAPE_TIMEOUT_MS, config; default 2_000)
    #[arg(long = "timeout", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Maximum interpreter steps before abort (fallback SCREWTAPE_MAX_STEPS, config; default unlimited)
    #[arg(long = "max-steps", value_name = "N")]
    pub max_steps: Option<u64>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: RunArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let RunArgs {
        debug,
        file,
        code,
        tape,
        show_tape,
        timeout_ms,
        max_steps,
        ..
    } = args;

    if file.is_none() && code.is_empty() {
        usage_and_exit(program, 2);
    }

    if file.is_some() && !code.is_empty() {
        eprintln!("{program}: cannot use positional code together with --file");
        usage_and_exit(program, 2);
    }

    let code_str = if let Some(path) = file {
        match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{program}: failed to read code file as UTF-8: {e}");
                let _ = io::stderr().flush();
                return 1;
            }
        }
    } else {
        code.join("")
    };

    let mut interpreter = Interpreter::new();
    if let Some(values) = tape {
        if let Err(err) = interpreter.set_tape(&values) {
            print_screwtape_error(Some(program), &code_str, &err);
            return 2;
        }
    }

    let limits = Limits::resolve(timeout_ms, max_steps, config());

    let exit_code = match run_bounded(interpreter, code_str.clone(), limits, debug) {
        Ok(outcome) => {
            let code = match outcome.result {
                Ok(output) => {
                    print!("{output}");
                    0
                }
                Err(err) => {
                    print_screwtape_error(Some(program), &code_str, &err);
                    1
                }
            };
            if show_tape {
                print_tape_summary(&outcome.interpreter);
            }
            code
        }
        Err(err) => {
            print_run_error(&err);
            1
        }
    };

    // For readability, ensure output ends with a newline
    println!();
    let _ = io::stdout().flush();
    exit_code
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run [--debug|-d] [--tape N,N,...] [--show-tape] "<code>"
  {0} run [--debug|-d] [--tape N,N,...] [--show-tape] --file <PATH>

Options:
  --file,  -f <PATH>      Read Screwtape code from PATH instead of positional "<code>"
  --debug, -d             Print a step-by-step table of operations while executing
  --tape,  -t <N,N,...>   Seed the tape with these values (cursor on the first)
  --show-tape             Print the final tape and cursor to stderr
  --timeout <MS>          Wall-clock timeout (SCREWTAPE_TIMEOUT_MS; default 2000)
  --max-steps <N>         Abort after N instructions (SCREWTAPE_MAX_STEPS)
  --help,  -h             Show this help

Notes:
- Commands are > < + - . [ ]; every other character is ignored, so comments are free.
- `[` does nothing; `]` jumps back to its `[` while the current cell is non-zero.
- `.` prints the character whose code point is the current cell value.

Examples:
- Load Screwtape code from a file:
    {0} run --file ./program.st
- Multiply 3 by 2 and inspect the tape:
    {0} run --show-tape "+++[>++<-]>"
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
