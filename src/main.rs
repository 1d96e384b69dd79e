use clap::{Parser, Subcommand};
use screwtape::commands::repl::ReplArgs;
use screwtape::commands::run::RunArgs;
use screwtape::commands::write::WriteArgs;
use screwtape::commands::{repl, run, write};
use std::env;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SCREWTAPE_LOG";

fn print_top_usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run   [--debug|-d] "<code>"         # Run Screwtape code (args are concatenated)
  {0} run   [--debug|-d] --file <PATH>    # Run Screwtape code loaded from file
  {0} write [TEXT...]                     # Generate Screwtape to print TEXT/STDIN/file
  {0} write --file <PATH>                 # Generate Screwtape to print file contents
  {0} repl                                # Start a Screwtape REPL (read-eval-print loop)

With no subcommand, starts the REPL.
Set SCREWTAPE_LOG (e.g. SCREWTAPE_LOG=debug) to enable diagnostic logging on stderr.

Run "{0} <subcommand> --help" for more info.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

#[derive(Parser, Debug)]
#[command(name = "screwtape", disable_help_flag = true, disable_help_subcommand = true)]
struct Cli {
    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    help: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Run(RunArgs),
    Write(WriteArgs),
    Repl(ReplArgs),
}

fn init_logging() {
    // Diagnostics go to stderr so stdout carries only program output.
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();

    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("screwtape"));

    let cli = Cli::parse();

    if cli.help {
        print_top_usage_and_exit(&program, 0);
    }

    let code = match cli.command {
        Some(Command::Run(args)) => run::run(&program, args),
        Some(Command::Write(args)) => write::run(&program, args),
        Some(Command::Repl(args)) => repl::run(&program, args),
        None => repl::run(&program, ReplArgs::default()),
    };

    std::process::exit(code);
}
