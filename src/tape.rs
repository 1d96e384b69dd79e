//! The unbounded memory tape.
//!
//! Cells live in an arena and link to their neighbours by index, so the tape
//! is a doubly-linked chain without any shared ownership. The chain only ever
//! grows: moving the cursor past either end allocates a fresh zero cell.
//!
//! Cell values are `i32`. `+` and `-` use two's-complement wraparound, so
//! incrementing `i32::MAX` yields `i32::MIN` and vice versa.

use std::fmt;

use crate::ScrewtapeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    value: i32,
    prev: Option<usize>,
    next: Option<usize>,
}

impl Cell {
    fn new(value: i32) -> Self {
        Self { value, prev: None, next: None }
    }
}

/// A doubly-linked sequence of integer cells with a movable cursor.
#[derive(Debug, Clone)]
pub struct Tape {
    cells: Vec<Cell>,
    // Index of the cell with no predecessor.
    head: usize,
    // Index of the active cell.
    cursor: usize,
    // Distance of the cursor from the head.
    offset: usize,
}

impl Default for Tape {
    fn default() -> Self {
        Self {
            cells: vec![Cell::new(0)],
            head: 0,
            cursor: 0,
            offset: 0,
        }
    }
}

impl Tape {
    /// A tape holding a single zero cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tape holding `values` in order, with the cursor on the first one.
    ///
    /// Returns [`ScrewtapeError::EmptyTape`] when `values` is empty.
    pub fn from_values(values: &[i32]) -> Result<Self, ScrewtapeError> {
        if values.is_empty() {
            return Err(ScrewtapeError::EmptyTape);
        }

        let last = values.len() - 1;
        let cells = values
            .iter()
            .enumerate()
            .map(|(i, &value)| Cell {
                value,
                prev: i.checked_sub(1),
                next: (i < last).then_some(i + 1),
            })
            .collect();

        Ok(Self {
            cells,
            head: 0,
            cursor: 0,
            offset: 0,
        })
    }

    /// Value of the cell under the cursor.
    pub fn get(&self) -> i32 {
        self.cells[self.cursor].value
    }

    /// Overwrite the cell under the cursor.
    pub fn set(&mut self, value: i32) {
        self.cells[self.cursor].value = value;
    }

    pub fn increment(&mut self) {
        let cell = &mut self.cells[self.cursor];
        cell.value = cell.value.wrapping_add(1);
    }

    pub fn decrement(&mut self) {
        let cell = &mut self.cells[self.cursor];
        cell.value = cell.value.wrapping_sub(1);
    }

    /// Move one cell right, allocating a zero cell if the cursor is at the right end.
    ///
    /// Returns `true` when a cell was allocated.
    pub fn move_right(&mut self) -> bool {
        let (next, grew) = match self.cells[self.cursor].next {
            Some(next) => (next, false),
            None => {
                let next = self.cells.len();
                self.cells.push(Cell {
                    value: 0,
                    prev: Some(self.cursor),
                    next: None,
                });
                self.cells[self.cursor].next = Some(next);
                (next, true)
            }
        };
        self.cursor = next;
        self.offset += 1;
        grew
    }

    /// Move one cell left, allocating a zero cell if the cursor is at the left end.
    /// A cell allocated left of the head becomes the new head.
    ///
    /// Returns `true` when a cell was allocated.
    pub fn move_left(&mut self) -> bool {
        match self.cells[self.cursor].prev {
            Some(prev) => {
                self.cursor = prev;
                self.offset -= 1;
                false
            }
            None => {
                let prev = self.cells.len();
                self.cells.push(Cell {
                    value: 0,
                    prev: None,
                    next: Some(self.cursor),
                });
                self.cells[self.cursor].prev = Some(prev);
                self.head = prev;
                self.cursor = prev;
                true
            }
        }
    }

    pub fn move_to_head(&mut self) {
        self.cursor = self.head;
        self.offset = 0;
    }

    pub fn move_to_tail(&mut self) {
        while let Some(next) = self.cells[self.cursor].next {
            self.cursor = next;
            self.offset += 1;
        }
    }

    /// Position of the cursor counted from the leftmost cell.
    pub fn cursor_offset(&self) -> usize {
        self.offset
    }

    /// Values from the leftmost cell to the rightmost one.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        Iter {
            cells: &self.cells,
            next: Some(self.head),
        }
    }

    pub fn to_vec(&self) -> Vec<i32> {
        self.iter().collect()
    }
}

/// Walks successor links from the head.
struct Iter<'tape> {
    cells: &'tape [Cell],
    next: Option<usize>,
}

impl Iterator for Iter<'_> {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        let cell = self.cells[self.next?];
        self.next = cell.next;
        Some(cell.value)
    }
}

impl fmt::Display for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, "]")
    }
}
