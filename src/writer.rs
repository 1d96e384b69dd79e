//! Screwtape program generator.
//!
//! Given some text, produces a Screwtape program that prints it. The output
//! cell keeps the code point of the last printed character, so each character
//! is encoded as a delta from the previous one. Large deltas use a counter
//! cell left of the output cell:
//!
//! ```text
//! < +++ [ > +++++++ < - ] > ++ .
//! ```
//!
//! `[` is a no-op and `]` tests after the body, so the counter must start at
//! one or more; it always ends at zero, which keeps the counter cell reusable.

#[derive(Debug, Clone, Copy)]
pub struct WriterOptions {
    pub use_loops: bool,     // Use loop-based multiplication for large deltas
    pub max_loop_factor: u32, // Largest counter value to consider
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            use_loops: true,
            max_loop_factor: 32,
        }
    }
}

pub struct ScrewtapeWriter<'writer> {
    input: &'writer str,
    options: WriterOptions,
}

impl<'writer> ScrewtapeWriter<'writer> {
    pub fn new(input: &'writer str) -> Self {
        Self { input, options: WriterOptions::default() }
    }

    pub fn with_options(input: &'writer str, options: WriterOptions) -> Self {
        Self { input, options }
    }

    pub fn generate(&self) -> String {
        let mut output = String::new();
        let mut cursor: i64 = 0;

        for ch in self.input.chars() {
            let target = i64::from(u32::from(ch));
            let delta = target - cursor;

            let plain = encode_plain(delta);
            let best = match self.encode_loop(delta) {
                Some(looped) if looped.len() < plain.len() => looped,
                _ => plain,
            };

            output.push_str(&best);
            output.push('.');
            cursor = target;
        }

        output
    }

    /// Search `counter * step + remainder == delta` for the shortest loop encoding.
    fn encode_loop(&self, delta: i64) -> Option<String> {
        if !self.options.use_loops || delta == 0 {
            return None;
        }

        let op = if delta > 0 { '+' } else { '-' };
        let magnitude = delta.abs();
        let mut best: Option<String> = None;

        for counter in 2..=i64::from(self.options.max_loop_factor) {
            let step = (magnitude as f64 / counter as f64).round() as i64;
            if step < 1 {
                break;
            }
            let remainder = delta - delta.signum() * counter * step;

            let mut seq = String::new();
            seq.push('<');
            seq.push_str(&"+".repeat(counter as usize));
            seq.push_str("[>");
            seq.extend(std::iter::repeat_n(op, step as usize));
            seq.push_str("<-]>");
            seq.push_str(&encode_plain(remainder));

            if best.as_ref().is_none_or(|b| seq.len() < b.len()) {
                best = Some(seq);
            }
        }

        best
    }
}

fn encode_plain(delta: i64) -> String {
    let op = if delta >= 0 { '+' } else { '-' };
    std::iter::repeat_n(op, delta.unsigned_abs() as usize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interpreter;

    fn run(program: &str) -> String {
        Interpreter::new().execute(program).unwrap()
    }

    #[test]
    fn simple_hello() {
        let output = ScrewtapeWriter::new("Hello World!").generate();
        assert_eq!(output.matches('.').count(), 12);
        assert_eq!(run(&output), "Hello World!");
    }

    #[test]
    fn zero_and_repeat() {
        let output = ScrewtapeWriter::new("\0\0\0").generate();
        assert_eq!(output, "...");
    }

    #[test]
    fn repeated_characters_cost_one_dot() {
        let output = ScrewtapeWriter::new("aaa").generate();
        assert!(output.ends_with("..."));
    }

    #[test]
    fn loops_shorten_large_deltas() {
        let looped = ScrewtapeWriter::new("z").generate();
        let plain = ScrewtapeWriter::with_options("z", WriterOptions { use_loops: false, max_loop_factor: 0 }).generate();
        assert_eq!(plain, format!("{}.", "+".repeat(122)));
        assert!(looped.len() < plain.len());
        assert_eq!(run(&looped), "z");
    }

    #[test]
    fn descending_and_non_ascii_text() {
        let text = "zA\u{e9}\u{1F600}a ";
        assert_eq!(run(&ScrewtapeWriter::new(text).generate()), text);
    }

    #[test]
    fn empty_input_generates_empty_program() {
        assert_eq!(ScrewtapeWriter::new("").generate(), "");
    }
}
