use std::collections::HashMap;
use std::io::Write;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{debug, trace};

use crate::{ScrewtapeError, Tape, UnmatchedBracketKind};

/// Maps the position of every `]` to the position of its matching `[`.
///
/// Positions are character indices into the program text.
pub type JumpTable = HashMap<usize, usize>;

/// Controls for cooperative cancellation and step limiting.
#[derive(Clone, Debug)]
pub struct StepControl {
    pub max_steps: Option<usize>,
    pub cancel_flag: Arc<AtomicBool>,
}

impl StepControl {
    pub fn new(max_steps: Option<usize>, cancel_flag: Arc<AtomicBool>) -> Self {
        Self { max_steps, cancel_flag }
    }

    /// Limit the number of steps without any external cancellation.
    pub fn with_max_steps(max_steps: usize) -> Self {
        Self::new(Some(max_steps), Arc::new(AtomicBool::new(false)))
    }
}

/// A Screwtape interpreter.
///
/// The interpreter owns a single [`Tape`]. The tape survives between calls to
/// [`Interpreter::execute`], so a program can continue where the previous one
/// left off; use [`Interpreter::set_tape`] to start from a known state.
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    tape: Tape,
}

impl Interpreter {
    /// Create an interpreter whose tape is a single zero cell.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    /// Tape values from the leftmost cell to the rightmost one.
    pub fn tape_data(&self) -> Vec<i32> {
        self.tape.to_vec()
    }

    /// Replace the tape with `data`, cursor on the first cell.
    ///
    /// On error the current tape is left untouched.
    pub fn set_tape(&mut self, data: &[i32]) -> Result<(), ScrewtapeError> {
        self.tape = Tape::from_values(data)?;
        debug!(cells = data.len(), "tape replaced");
        Ok(())
    }

    /// Value of the cell under the cursor.
    pub fn tape_pointer_value(&self) -> i32 {
        self.tape.get()
    }

    pub fn move_tape_pointer_to_head(&mut self) {
        self.tape.move_to_head();
    }

    pub fn move_tape_pointer_to_tail(&mut self) {
        self.tape.move_to_tail();
    }

    /// Match every `]` in `program` with the nearest unmatched `[` before it.
    ///
    /// For `>[+>[+-]<]` the result is `{9: 1, 7: 4}`. A stray `]` or a `[`
    /// left open at the end is reported as
    /// [`ScrewtapeError::UnmatchedBrackets`].
    pub fn bracket_map(program: &str) -> Result<JumpTable, ScrewtapeError> {
        let mut jump_table = JumpTable::new();
        let mut stack: Vec<usize> = Vec::new();

        for (i, c) in program.chars().enumerate() {
            if c == '[' {
                stack.push(i);
            } else if c == ']' {
                let Some(open_index) = stack.pop() else {
                    return Err(ScrewtapeError::UnmatchedBrackets {
                        ip: i,
                        kind: UnmatchedBracketKind::Close,
                    });
                };
                jump_table.insert(i, open_index);
            }
        }

        if let Some(unmatched_open) = stack.last().copied() {
            return Err(ScrewtapeError::UnmatchedBrackets {
                ip: unmatched_open,
                kind: UnmatchedBracketKind::Open,
            });
        }

        debug!(loops = jump_table.len(), "jump table built");
        Ok(jump_table)
    }

    /// Run `program` to completion and return everything it printed.
    ///
    /// Brackets are validated before the first instruction runs, so a
    /// malformed program leaves the tape untouched. A program whose loop
    /// never reaches zero never returns; see [`Interpreter::execute_with_control`].
    pub fn execute(&mut self, program: &str) -> Result<String, ScrewtapeError> {
        self.run(program, None, None)
    }

    /// Execute with cooperative cancellation and optional step limit.
    ///
    /// An aborted run keeps the tape changes made by the steps already taken.
    pub fn execute_with_control(
        &mut self,
        program: &str,
        step_control: &StepControl,
    ) -> Result<String, ScrewtapeError> {
        self.run(program, None, Some(step_control))
    }

    /// Execute while writing a step-by-step table of operations to `trace`.
    pub fn execute_debug<W: Write>(&mut self, program: &str, trace: &mut W) -> Result<String, ScrewtapeError> {
        self.run(program, Some(trace), None)
    }

    /// Debug-run with cooperative cancellation and optional step limit.
    pub fn execute_debug_with_control<W: Write>(
        &mut self,
        program: &str,
        trace: &mut W,
        step_control: &StepControl,
    ) -> Result<String, ScrewtapeError> {
        self.run(program, Some(trace), Some(step_control))
    }

    /// Internal executor shared by every public entry point.
    fn run(
        &mut self,
        program: &str,
        mut trace: Option<&mut dyn Write>,
        step_control: Option<&StepControl>,
    ) -> Result<String, ScrewtapeError> {
        let jump_table = Self::bracket_map(program)?;
        let chars: Vec<char> = program.chars().collect();
        let code_len = chars.len();

        let mut output = String::new();
        let mut code_ptr = 0;
        let mut step: usize = 0;

        if let Some(w) = trace.as_mut() {
            write_trace_header(w).map_err(|source| ScrewtapeError::Io { ip: 0, source })?;
        }

        while code_ptr < code_len {
            if let Some(ctrl) = step_control {
                if ctrl.cancel_flag.load(Ordering::Relaxed) {
                    debug!(step, ip = code_ptr, "execution cancelled");
                    return Err(ScrewtapeError::Canceled);
                }
                if let Some(max) = ctrl.max_steps {
                    if step >= max {
                        debug!(limit = max, ip = code_ptr, "step limit reached");
                        return Err(ScrewtapeError::StepLimitExceeded { limit: max });
                    }
                }
            }

            let instr = chars[code_ptr];
            let ip = code_ptr;
            let (ptr_before, cell_before) = (self.tape.cursor_offset(), self.tape.get());
            let mut action: Option<String> = trace.as_ref().map(|_| String::new());

            match instr {
                '>' => {
                    let grew = self.tape.move_right();
                    if let Some(a) = action.as_mut() {
                        *a = format!("Moved cursor to cell {}{}", self.tape.cursor_offset(), if grew { " (new cell)" } else { "" });
                    }
                }
                '<' => {
                    let grew = self.tape.move_left();
                    if let Some(a) = action.as_mut() {
                        *a = if grew {
                            "Extended tape left; cursor on new head".to_string()
                        } else {
                            format!("Moved cursor to cell {}", self.tape.cursor_offset())
                        };
                    }
                }
                '+' => {
                    self.tape.increment();
                    if let Some(a) = action.as_mut() { *a = format!("Increment cell[{}] from {} to {}", ptr_before, cell_before, self.tape.get()); }
                }
                '-' => {
                    self.tape.decrement();
                    if let Some(a) = action.as_mut() { *a = format!("Decrement cell[{}] from {} to {}", ptr_before, cell_before, self.tape.get()); }
                }
                '.' => {
                    let ch = cell_char(cell_before);
                    output.push(ch);
                    if let Some(a) = action.as_mut() { *a = format!("Output {:?}", ch); }
                }
                '[' => {
                    if let Some(a) = action.as_mut() { *a = "Loop start (no-op)".to_string(); }
                }
                ']' => {
                    if cell_before != 0 {
                        let j = jump_table[&code_ptr];
                        trace!(from = code_ptr, to = j, "jump back");
                        if let Some(a) = action.as_mut() { *a = format!("Cell != 0; jump back to matching '[' at IP {}", j); }
                        code_ptr = j;
                    } else if let Some(a) = action.as_mut() {
                        *a = "Exit loop (cell is 0)".to_string();
                    }
                }
                _ => {
                    if let Some(a) = action.as_mut() { *a = "Ignored".to_string(); }
                }
            }

            if let (Some(w), Some(a)) = (trace.as_mut(), action) {
                writeln!(
                    w,
                    "{:<4} | {:<3} | {:<3} | {:<4} |  {}    | {}",
                    step, ip, ptr_before, cell_before, instr, a
                )
                .map_err(|source| ScrewtapeError::Io { ip, source })?;
            }

            step += 1;
            code_ptr += 1;
        }

        Ok(output)
    }
}

fn write_trace_header(w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "STEP | IP  | PTR | CELL | INSTR | ACTION")?;
    writeln!(w, "-----+-----+-----+------+-------+------------------------------------------------")
}

/// The character printed by `.` for a cell value.
///
/// Values that are not Unicode scalar values print as U+FFFD.
pub fn cell_char(value: i32) -> char {
    u32::try_from(value)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn table(pairs: &[(usize, usize)]) -> JumpTable {
        pairs.iter().copied().collect()
    }

    #[test]
    fn bracket_map_single_pair() {
        assert_eq!(Interpreter::bracket_map("[]").unwrap(), table(&[(1, 0)]));
    }

    #[test]
    fn bracket_map_sequential_loops() {
        let map = Interpreter::bracket_map("[+++][---]<<[+]").unwrap();
        assert_eq!(map, table(&[(4, 0), (9, 5), (14, 12)]));
    }

    #[test]
    fn bracket_map_nested_loops() {
        let map = Interpreter::bracket_map(">[+>[+-]<]").unwrap();
        assert_eq!(map, table(&[(9, 1), (7, 4)]));
    }

    #[test]
    fn bracket_map_ignores_other_characters() {
        let map = Interpreter::bracket_map("loop: [ add + ] done").unwrap();
        assert_eq!(map, table(&[(14, 6)]));
        assert!(Interpreter::bracket_map("no loops here").unwrap().is_empty());
    }

    #[test]
    fn bracket_map_counts_characters_not_bytes() {
        let map = Interpreter::bracket_map("é[]").unwrap();
        assert_eq!(map, table(&[(2, 1)]));
    }

    #[test]
    fn stray_close_bracket_is_rejected() {
        let result = Interpreter::bracket_map("(])");
        assert!(matches!(
            result,
            Err(ScrewtapeError::UnmatchedBrackets { ip: 1, kind: UnmatchedBracketKind::Close })
        ));
    }

    #[test]
    fn unclosed_open_bracket_is_rejected() {
        let result = Interpreter::bracket_map("[");
        assert!(matches!(
            result,
            Err(ScrewtapeError::UnmatchedBrackets { ip: 0, kind: UnmatchedBracketKind::Open })
        ));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn add() {
        let mut interpreter = Interpreter::new();
        let output = interpreter.execute("+++").unwrap();
        assert_eq!(output, "");
        assert_eq!(interpreter.tape_data(), vec![3]);
        assert_eq!(interpreter.tape_pointer_value(), 3);
    }

    #[test]
    fn subtract() {
        let mut interpreter = Interpreter::new();
        interpreter.execute("---").unwrap();
        assert_eq!(interpreter.tape_data(), vec![-3]);
        assert_eq!(interpreter.tape_pointer_value(), -3);
    }

    #[test]
    fn right_and_add() {
        let mut interpreter = Interpreter::new();
        interpreter.execute(">>+").unwrap();
        assert_eq!(interpreter.tape_data(), vec![0, 0, 1]);
        assert_eq!(interpreter.tape_pointer_value(), 1);
    }

    #[test]
    fn left_and_add() {
        let mut interpreter = Interpreter::new();
        interpreter.execute("<<++").unwrap();
        assert_eq!(interpreter.tape_data(), vec![2, 0, 0]);
        assert_eq!(interpreter.tape_pointer_value(), 2);
    }

    #[test]
    fn output_characters() {
        let mut interpreter = Interpreter::new();
        let program = format!("{}.+.+.", "+".repeat(88));
        let output = interpreter.execute(&program).unwrap();
        assert_eq!(output, "XYZ");
        assert_eq!(interpreter.tape_data(), vec![90]);
        assert_eq!(interpreter.tape_pointer_value(), 90);
    }

    #[test]
    fn loop_multiplies() {
        let mut interpreter = Interpreter::new();
        interpreter.execute("+++[>++<-]>").unwrap();
        assert_eq!(interpreter.tape_data(), vec![0, 6]);
        assert_eq!(interpreter.tape_pointer_value(), 6);
    }

    #[test]
    fn nested_loops() {
        let mut interpreter = Interpreter::new();
        let output = interpreter.execute("+++++++[>+++[>+++++<-]<-]>>.").unwrap();
        assert_eq!(interpreter.tape_data(), vec![0, 0, 105]);
        assert_eq!(interpreter.tape_pointer_value(), 105);
        assert_eq!(output, "i");
    }

    #[test]
    fn hi_extends_left_of_the_head() {
        let mut interpreter = Interpreter::new();
        let output = interpreter
            .execute("++++++++[<+++++++++>-]<.>>++++++++[<+++++++++>-]<+.")
            .unwrap();
        assert_eq!(output, "HI");
        assert_eq!(interpreter.tape_data(), vec![72, 73, 0]);
    }

    #[test]
    fn open_bracket_is_a_no_op() {
        // The body runs once even though the cell is zero on entry.
        let mut interpreter = Interpreter::new();
        interpreter.execute("[>+<]>").unwrap();
        assert_eq!(interpreter.tape_data(), vec![0, 1]);
    }

    #[test]
    fn comments_are_ignored() {
        let mut interpreter = Interpreter::new();
        let output = interpreter.execute("add three: +++ \n then print? no").unwrap();
        assert_eq!(output, "");
        assert_eq!(interpreter.tape_data(), vec![3]);
    }

    #[test]
    fn malformed_program_has_no_side_effects() {
        let mut interpreter = Interpreter::new();
        interpreter.set_tape(&[4, 5]).unwrap();
        interpreter.execute(">").unwrap();

        for program in ["+++.]", "[>+.", "]["] {
            let result = interpreter.execute(program);
            assert!(result.unwrap_err().is_invalid_argument());
            assert_eq!(interpreter.tape_data(), vec![4, 5]);
            assert_eq!(interpreter.tape_pointer_value(), 5);
        }
    }

    #[test]
    fn set_tape_replaces_and_resets_cursor() {
        let mut interpreter = Interpreter::new();
        interpreter.execute(">>+++").unwrap();
        interpreter.set_tape(&[10, 20, 30]).unwrap();
        assert_eq!(interpreter.tape_data(), vec![10, 20, 30]);
        assert_eq!(interpreter.tape_pointer_value(), 10);

        interpreter.execute(">+").unwrap();
        assert_eq!(interpreter.tape_data(), vec![10, 21, 30]);
    }

    #[test]
    fn set_tape_rejects_empty_and_keeps_old_tape() {
        let mut interpreter = Interpreter::new();
        interpreter.execute("++").unwrap();
        let result = interpreter.set_tape(&[]);
        assert!(matches!(result, Err(ScrewtapeError::EmptyTape)));
        assert_eq!(interpreter.tape_data(), vec![2]);
    }

    #[test]
    fn tape_persists_between_executions() {
        let mut interpreter = Interpreter::new();
        interpreter.execute("++>").unwrap();
        interpreter.execute("+++").unwrap();
        assert_eq!(interpreter.tape_data(), vec![2, 3]);
    }

    #[test]
    fn pointer_jumps_to_head_and_tail() {
        let mut interpreter = Interpreter::new();
        interpreter.set_tape(&[1, 2, 3]).unwrap();
        interpreter.move_tape_pointer_to_tail();
        assert_eq!(interpreter.tape_pointer_value(), 3);
        interpreter.execute("<<<+").unwrap();
        interpreter.move_tape_pointer_to_tail();
        interpreter.move_tape_pointer_to_head();
        assert_eq!(interpreter.tape_pointer_value(), 1);
        assert_eq!(interpreter.tape_data(), vec![1, 1, 2, 3]);
    }

    #[test]
    fn invalid_code_points_print_replacement_character() {
        let mut interpreter = Interpreter::new();
        assert_eq!(interpreter.execute("-.").unwrap(), "\u{FFFD}");

        interpreter.set_tape(&[0xD800, 0x110000, 0x10FFFF]).unwrap();
        assert_eq!(interpreter.execute(".>.>.").unwrap(), "\u{FFFD}\u{FFFD}\u{10FFFF}");
    }

    #[test]
    fn step_limit_aborts_infinite_loop() {
        let mut interpreter = Interpreter::new();
        let result = interpreter.execute_with_control("+[]", &StepControl::with_max_steps(50));
        assert!(matches!(result, Err(ScrewtapeError::StepLimitExceeded { limit: 50 })));
        assert_eq!(interpreter.tape_data(), vec![1]);
    }

    #[test]
    fn step_limit_large_enough_completes() {
        let mut interpreter = Interpreter::new();
        let output = interpreter
            .execute_with_control("+++[>++<-]>.", &StepControl::with_max_steps(1_000))
            .unwrap();
        assert_eq!(output, "\u{6}");
    }

    #[test]
    fn cancel_flag_stops_before_first_step() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut interpreter = Interpreter::new();
        let result = interpreter.execute_with_control("+++", &StepControl::new(None, flag));
        assert!(matches!(result, Err(ScrewtapeError::Canceled)));
        assert_eq!(interpreter.tape_data(), vec![0]);
    }

    #[test]
    fn debug_trace_prints_table_and_keeps_semantics() {
        let mut interpreter = Interpreter::new();
        let mut trace = Vec::new();
        let output = interpreter.execute_debug("<+.", &mut trace).unwrap();
        let trace = String::from_utf8(trace).unwrap();

        assert_eq!(output, "\u{1}");
        assert_eq!(interpreter.tape_data(), vec![1, 0]);
        assert!(trace.starts_with("STEP | IP"));
        assert!(trace.contains("Extended tape left; cursor on new head"));
        assert!(trace.contains("Increment cell[0] from 0 to 1"));
        assert_eq!(trace.lines().count(), 5);
    }

    #[test]
    fn cell_char_maps_code_points() {
        assert_eq!(cell_char(72), 'H');
        assert_eq!(cell_char(-1), char::REPLACEMENT_CHARACTER);
        assert_eq!(cell_char(1_114_111), '\u{10FFFF}');
        assert_eq!(cell_char(1_114_112), char::REPLACEMENT_CHARACTER);
    }
}
