use std::env;
use std::io::{self, IsTerminal, Write};

use nu_ansi_term::Style;
use reedline::{DefaultPrompt, DefaultPromptSegment, Highlighter, HistoryItem, Signal, StyledText};
use tracing::debug;

use crate::cli_util::{print_run_error, print_screwtape_error, print_tape_summary};
use crate::config::Palette;
use crate::runner::{run_bounded, Limits};
use crate::Interpreter;

pub const REPL_ONCE_ENV: &str = "SCREWTAPE_REPL_ONCE";
pub const REPL_MODE_ENV: &str = "SCREWTAPE_REPL_MODE";

pub const META_HELP: &str = r#"Meta commands (line starts with ":")
  :exit            Exit immediately (code 0)
  :help            Show this help
  :reset           Discard the pending buffer and start over with a fresh tape
  :tape            Print the tape, cursor position and cursor value"#;

/// Editor-mode session state. The tape carries over between submissions.
pub struct Session {
    interpreter: Interpreter,
    limits: Limits,
}

impl Session {
    pub fn new(limits: Limits) -> Self {
        Self { interpreter: Interpreter::new(), limits }
    }

    /// Executes a single Screwtape program contained in `buffer`.
    /// - Program output goes to stdout.
    /// - Errors are printed concisely to stderr.
    /// - A newline is always written to stdout after execution (success or error)
    ///   so that the prompt begins at column 0 on the next iteration.
    pub fn execute(&mut self, buffer: String) {
        let interpreter = std::mem::take(&mut self.interpreter);
        match run_bounded(interpreter, buffer.clone(), self.limits, false) {
            Ok(outcome) => {
                self.interpreter = outcome.interpreter;
                match outcome.result {
                    Ok(output) => print!("{output}"),
                    Err(err) => print_screwtape_error(None, &buffer, &err),
                }
            }
            Err(err) => {
                // The worker still owns the old tape; continue on a fresh one.
                print_run_error(&err);
                eprintln!("tape was reset");
                let _ = io::stderr().flush();
            }
        }
        println!();
        let _ = io::stdout().flush();
    }

    pub fn reset(&mut self) {
        self.interpreter = Interpreter::new();
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    Help,
    Reset,
    Tape,
}

impl MetaCommand {
    /// Recognize a submission whose trimmed text is exactly a meta command.
    /// Anything else, including other lines starting with ':', is program text.
    pub fn parse(submission: &str) -> Option<Self> {
        match submission.trim() {
            ":exit" | ":quit" => Some(MetaCommand::Exit),
            ":help" => Some(MetaCommand::Help),
            ":reset" => Some(MetaCommand::Reset),
            ":tape" => Some(MetaCommand::Tape),
            _ => None,
        }
    }
}

pub fn repl_loop(limits: Limits, palette: &Palette, history_size: usize) -> io::Result<()> {
    // Initialize interactive line editor
    let mut editor = init_line_editor(palette, history_size)?;
    let mut session = Session::new(limits);

    loop {
        // Prompt and read a multi-line submission via editor
        let Some(submission) = read_submission_interactive(&mut editor)? else {
            // EOF or editor closed. End the session cleanly to avoid hanging when stdin is closed
            println!();
            io::stdout().flush()?;
            return Ok(());
        };

        let trimmed = submission.trim();
        if trimmed.is_empty() {
            continue; // Ignore empty submissions
        }

        match MetaCommand::parse(trimmed) {
            Some(MetaCommand::Exit) => return Ok(()),
            Some(MetaCommand::Help) => {
                eprintln!("{META_HELP}");
                io::stderr().flush()?;
                continue;
            }
            Some(MetaCommand::Reset) => {
                session.reset();
                eprintln!("tape reset");
                io::stderr().flush()?;
                continue;
            }
            Some(MetaCommand::Tape) => {
                print_tape_summary(session.interpreter());
                continue;
            }
            None => {}
        }

        session.execute(submission);

        // Test hook: if SCREWTAPE_REPL_ONCE=1, exit after one execution
        if env::var(REPL_ONCE_ENV).ok().as_deref() == Some("1") {
            return Ok(());
        }
    }
}

fn init_line_editor(palette: &Palette, history_size: usize) -> io::Result<reedline::Reedline> {
    use reedline::{
        default_emacs_keybindings, EditCommand, Emacs, KeyCode, KeyModifiers, Reedline, ReedlineEvent,
    };

    // Start from default emacs-like bindings and adjust:
    // - Enter -> InsertNewLine (do not submit)
    // - Ctrl+D -> AcceptLine (submit)
    // - Ctrl+Z -> AcceptLine (submit, for Windows)
    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Edit(vec![EditCommand::InsertNewline]));
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('z'), ReedlineEvent::Submit);

    // Up/down move within the current multiline buffer, not history.
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);

    // Alt+Up/Alt+Down or Ctrl+Up/Ctrl+Down to navigate history items.
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Down, ReedlineEvent::NextHistory);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Down, ReedlineEvent::NextHistory);

    let history = reedline::FileBackedHistory::new(history_size)
        .map_err(|e| io::Error::other(e.to_string()))?;

    let editor = Reedline::create()
        .with_highlighter(Box::new(ScrewtapeHighlighter::from_palette(palette)))
        .with_history(Box::new(history))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    Ok(editor)
}

pub fn read_submission<R: io::BufRead>(stdin: &mut R) -> Option<String> {
    let mut buffer = String::new();
    if stdin.read_to_string(&mut buffer).is_err() {
        return None;
    }

    if buffer.is_empty() {
        None
    } else {
        Some(buffer)
    }
}

fn read_submission_interactive(editor: &mut reedline::Reedline) -> io::Result<Option<String>> {
    let prompt = DefaultPrompt::new(DefaultPromptSegment::Basic("st".to_string()), DefaultPromptSegment::Empty);

    // Render prompt and read until user submits with Ctrl+D or Ctrl+Z
    match editor.read_line(&prompt) {
        Ok(Signal::Success(buffer)) => {
            // Add one history item per submitted buffer (program-level)
            if !buffer.trim().is_empty() {
                let _ = editor.history_mut().save(HistoryItem::from_command_line(buffer.clone()));
            }
            Ok(Some(buffer))
        }
        Ok(Signal::CtrlC) => Ok(None),
        Ok(Signal::CtrlD) => Ok(None),
        Err(e) => {
            eprintln!("repl: editor error: {e}");
            let _ = io::stderr().flush();
            Ok(None)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplMode {
    Bare,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFlagOverride {
    None,
    Bare,
    Editor,
}

pub fn select_mode(flag: ModeFlagOverride) -> Result<ReplMode, String> {
    let stdin_is_tty = io::stdin().is_terminal();
    select_mode_with(flag, env::var(REPL_MODE_ENV).ok().as_deref(), stdin_is_tty)
}

/// Mode selection: flag -> environment -> TTY auto-detection.
fn select_mode_with(flag: ModeFlagOverride, env_mode: Option<&str>, stdin_is_tty: bool) -> Result<ReplMode, String> {
    match flag {
        ModeFlagOverride::Bare => return Ok(ReplMode::Bare),
        ModeFlagOverride::Editor => {
            if !stdin_is_tty {
                return Err(format!("cannot start editor: stdin is not a TTY (use --bare or {REPL_MODE_ENV}=bare)"));
            }
            return Ok(ReplMode::Editor);
        }
        ModeFlagOverride::None => {}
    }

    if let Some(val) = env_mode {
        return match val.trim().to_ascii_lowercase().as_str() {
            "bare" => Ok(ReplMode::Bare),
            "editor" => {
                if !stdin_is_tty {
                    return Err(format!("cannot start editor: stdin is not a TTY (use {REPL_MODE_ENV}=bare)"));
                }
                Ok(ReplMode::Editor)
            }
            _ => Err(format!("invalid {REPL_MODE_ENV} value: {val}, must be 'bare' or 'editor'")),
        };
    }

    if stdin_is_tty {
        Ok(ReplMode::Editor)
    } else {
        Ok(ReplMode::Bare)
    }
}

/// A piped submission split into program text and meta commands.
#[derive(Debug, Default, PartialEq)]
struct BareScript {
    program: String,
    show_help: bool,
    show_tape: bool,
}

/// Lines that are exactly a meta command are consumed; every other line is program text.
/// `:exit` ignores the rest of the input and `:reset` discards the text so far.
fn parse_bare_script(submission: &str) -> BareScript {
    let mut script = BareScript::default();
    for line in submission.lines() {
        match MetaCommand::parse(line) {
            None => {
                script.program.push_str(line);
                script.program.push('\n');
            }
            Some(MetaCommand::Exit) => break,
            Some(MetaCommand::Help) => script.show_help = true,
            Some(MetaCommand::Reset) => script.program.clear(),
            Some(MetaCommand::Tape) => script.show_tape = true,
        }
    }
    script
}

/// Bare mode: read stdin until EOF and run it once on a fresh tape.
pub fn execute_bare_once(limits: Limits) -> io::Result<()> {
    let mut locked = io::BufReader::new(io::stdin().lock());
    let Some(submission) = read_submission(&mut locked) else {
        return Ok(());
    };

    let script = parse_bare_script(&submission);
    if script.show_help {
        eprintln!("{META_HELP}");
        io::stderr().flush()?;
    }

    let mut session = Session::new(limits);
    if !script.program.trim().is_empty() {
        debug!(chars = script.program.chars().count(), "running bare submission");
        session.execute(script.program);
    }
    if script.show_tape {
        print_tape_summary(session.interpreter());
    }
    Ok(())
}

struct ScrewtapeHighlighter {
    map_gt: Style,
    map_lt: Style,
    map_plus: Style,
    map_minus: Style,
    map_dot: Style,
    map_bracket: Style,
    map_other: Style,
}

impl ScrewtapeHighlighter {
    fn from_palette(palette: &Palette) -> Self {
        // > <   => movement
        // + -   => data modification
        // .     => output
        // [ ]   => flow control
        Self {
            map_gt: Style::new().fg(palette.move_right).bold(),
            map_lt: Style::new().fg(palette.move_left).bold(),
            map_plus: Style::new().fg(palette.increment).bold(),
            map_minus: Style::new().fg(palette.decrement).bold(),
            map_dot: Style::new().fg(palette.output).bold(),
            map_bracket: Style::new().fg(palette.loop_bracket).bold(),
            map_other: Style::new().fg(palette.comment),
        }
    }

    #[inline]
    fn style_for(&self, ch: char) -> Style {
        match ch {
            '>' => self.map_gt,
            '<' => self.map_lt,
            '+' => self.map_plus,
            '-' => self.map_minus,
            '.' => self.map_dot,
            '[' | ']' => self.map_bracket,
            _ => self.map_other,
        }
    }
}

impl Highlighter for ScrewtapeHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut out = StyledText::new();
        let mut current_style: Option<Style> = None;
        let mut buffer = String::new();

        for ch in line.chars() {
            let style = self.style_for(ch);

            match current_style {
                Some(s) if s == style => buffer.push(ch),
                Some(s) => {
                    out.push((s, std::mem::take(&mut buffer)));
                    current_style = Some(style);
                    buffer.push(ch);
                }
                None => {
                    current_style = Some(style);
                    buffer.push(ch);
                }
            }
        }

        if let Some(s) = current_style {
            if !buffer.is_empty() {
                out.push((s, buffer));
            }
        }
        out
    }
}
