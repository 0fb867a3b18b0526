//! Character cursor over match input.

use crate::location::Location;

/// A character cursor with bookmark support.
///
/// Input is decoded up front so every position is a character index and
/// rewinding is O(1) regardless of encoding. Two rewind styles exist:
/// the `save`/`load_save` stack for strictly nested backtracking, and
/// [`Scanner::rewind`] to jump to any previously observed [`Location`].
#[derive(Debug, Clone)]
pub struct Scanner {
    chars: Vec<char>,
    cursor: Location,
    saves: Vec<Location>,
}

impl Scanner {
    pub fn new(input: &str) -> Self {
        Scanner {
            chars: input.chars().collect(),
            cursor: Location::START,
            saves: Vec::new(),
        }
    }

    /// Current position.
    #[inline]
    pub fn location(&self) -> Location {
        self.cursor
    }

    /// Character offset from the start of input.
    #[inline]
    pub fn offset(&self) -> usize {
        self.cursor.offset
    }

    /// Total input length in characters.
    #[inline]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.cursor.offset >= self.chars.len()
    }

    /// Characters left before the end of input.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.chars.len() - self.cursor.offset.min(self.chars.len())
    }

    /// Character `lookahead` positions past the cursor, without consuming.
    #[inline]
    pub fn peek(&self, lookahead: usize) -> Option<char> {
        self.chars.get(self.cursor.offset + lookahead).copied()
    }

    /// Whether the upcoming input starts with `text`.
    pub fn is_next(&self, text: &str) -> bool {
        let mut probe = self.cursor.offset;
        for expected in text.chars() {
            match self.chars.get(probe) {
                Some(&actual) if actual == expected => probe += 1,
                _ => return false,
            }
        }
        true
    }

    /// Consume up to `count` characters, stopping at the end of input.
    pub fn advance(&mut self, count: usize) {
        for _ in 0..count {
            if self.at_end() {
                break;
            }
            self.step();
        }
    }

    /// Consume exactly `count` characters and return them, or `None`
    /// without consuming anything if fewer remain.
    pub fn read_string(&mut self, count: usize) -> Option<String> {
        if self.remaining() < count {
            return None;
        }
        let start = self.cursor.offset;
        let text: String = self.chars[start..start + count].iter().collect();
        for _ in 0..count {
            self.step();
        }
        Some(text)
    }

    /// Push the current position onto the save stack.
    pub fn save(&mut self) {
        self.saves.push(self.cursor);
    }

    /// Drop the most recent save, keeping the cursor where it is.
    pub fn discard_save(&mut self) {
        self.saves.pop().expect("unbalanced scanner save stack");
    }

    /// Pop the most recent save and rewind to it.
    pub fn load_save(&mut self) -> Location {
        let saved = self.saves.pop().expect("unbalanced scanner save stack");
        self.cursor = saved;
        saved
    }

    /// Jump to a position previously returned by [`Scanner::location`].
    pub fn rewind(&mut self, to: Location) {
        debug_assert!(to.offset <= self.chars.len());
        self.cursor = to;
    }

    /// Short description of the upcoming character for error messages.
    pub fn describe_next(&self) -> String {
        match self.peek(0) {
            Some(c) => format!("'{}'", c.escape_debug()),
            None => "end of input".to_string(),
        }
    }

    fn step(&mut self) {
        let c = self.chars[self.cursor.offset];
        self.cursor.offset += 1;
        if c == '\n' {
            self.cursor.line += 1;
            self.cursor.column = 1;
        } else {
            self.cursor.column += 1;
        }
    }
}
