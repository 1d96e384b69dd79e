use clap::Args;
use std::fs;
use std::io::{self, Read, Write};

use crate::ScrewtapeWriter;

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct WriteArgs {
    /// Read input from file at PATH (otherwise reads from TEXT or STDIN)
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Positional text (UTF-8). If omitted, reads from STDIN.
    #[arg(value_name = "TEXT", trailing_var_arg = true)]
    pub text: Vec<String>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: WriteArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let WriteArgs { file, text, .. } = args;

    if file.is_some() && !text.is_empty() {
        eprintln!("{program}: cannot use positional TEXT together with --file");
        usage_and_exit(program, 2);
    }

    let input = match file {
        Some(path) => match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{program}: failed to read file as UTF-8: {e}");
                let _ = io::stderr().flush();
                return 1;
            }
        },
        None if !text.is_empty() => text.join(" "),
        None => {
            let mut s = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut s) {
                eprintln!("{program}: failed reading UTF-8 from stdin: {e}");
                let _ = io::stderr().flush();
                return 1;
            }
            s
        }
    };

    println!("{}", ScrewtapeWriter::new(&input).generate());
    let _ = io::stdout().flush();
    0
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} write [TEXT...]           # Read UTF-8 TEXT args (preferred) or from STDIN if no TEXT is given
  {0} write --file <PATH>       # Read from file instead of STDIN

Options:
  --file,  -f <PATH>  Read input from file at PATH (otherwise reads from TEXT or STDIN)
  --help,   -h        Show this help

Description:
  Generates Screwtape code that, when executed, will output the provided text.

Notes:
  - Output is Screwtape code printed to stdout followed by a newline.
  - The generated program uses the cell left of the start as a loop counter.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
