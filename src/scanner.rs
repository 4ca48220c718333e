//! The scanner: cursor, line/column tracking, and the backtracking context
//! frame stack.

use crate::{
    config::ParserOptions,
    terminator::{self, Terminator},
};
use std::sync::Arc;

/// A saved parsing context.
///
/// A frame is pushed when a grammar alternative begins, and is either
/// accepted (the cursor stays where the alternative left it) or fallen back
/// (the cursor and line/column state are restored from the snapshot).
#[derive(Debug)]
struct Frame {
    /// The saved cursor position.
    position: usize,
    /// The saved line number.
    line: usize,
    /// The saved column.
    column: usize,
    /// The terminator for content produced under this frame, if any.
    terminator: Option<Arc<Terminator>>,
    /// Whether terminators of enclosing frames remain in effect.
    inherit: bool,
}

/// Scanner state for a single parse operation.
pub(crate) struct ParseState<'a> {
    /// The parser options.
    pub options: &'a ParserOptions,
    /// The full input.
    pub source: &'a str,
    /// The cursor, as a byte index into `source`.
    pub position: usize,
    /// The current line number, zero-based.
    pub line: usize,
    /// The current column, as a byte offset from the start of the line.
    pub column: usize,
    /// The context frame stack.
    stack: Vec<Frame>,
}

impl<'a> ParseState<'a> {
    /// Creates a scanner over `source`.
    pub fn new(options: &'a ParserOptions, source: &'a str) -> Self {
        Self {
            options,
            source,
            position: 0,
            line: 0,
            column: 0,
            stack: Vec::new(),
        }
    }

    /// The not-yet-consumed tail of the input.
    fn tail(&self) -> &'a str {
        &self.source[self.position..]
    }

    /// Advances the cursor to `new`, counting line breaks on the way.
    /// The cursor only ever moves forward; regression happens through
    /// [`fallback`](Self::fallback) alone.
    fn move_position_to(&mut self, new: usize) {
        debug_assert!(new >= self.position && new <= self.source.len());
        let passed = &self.source.as_bytes()[self.position..new];
        if let Some(last) = memchr::memrchr(b'\n', passed) {
            self.line += memchr::memchr_iter(b'\n', passed).count();
            self.column = passed.len() - last - 1;
        } else {
            self.column += passed.len();
        }
        self.position = new;
    }

    /// Pushes a context frame. `pattern`, if given, becomes the terminator
    /// for content produced under the frame; `inherit` controls whether the
    /// terminators of enclosing frames also remain in effect.
    pub fn push(&mut self, pattern: Option<&str>, inherit: bool) {
        self.stack.push(Frame {
            position: self.position,
            line: self.line,
            column: self.column,
            terminator: pattern.map(terminator::get),
            inherit,
        });
    }

    /// Pops the current frame, committing the cursor state.
    pub fn accept(&mut self) {
        let frame = self.stack.pop();
        debug_assert!(frame.is_some(), "unbalanced accept");
    }

    /// Pops the current frame and restores its snapshot.
    pub fn fallback(&mut self) {
        let frame = self.stack.pop().expect("unbalanced fallback");
        self.position = frame.position;
        self.line = frame.line;
        self.column = frame.column;
    }

    /// Matches `pattern` exactly at the cursor; on success, consumes the
    /// matched text and returns it.
    pub fn consume(&mut self, pattern: &str) -> Option<&'a str> {
        let matched = terminator::get(pattern).match_at_start(self.tail())?;
        let text = &self.source[self.position..self.position + matched.len()];
        self.move_position_to(self.position + matched.len());
        Some(text)
    }

    /// Matches `pattern` exactly at the cursor without consuming anything.
    pub fn look_ahead(&self, pattern: &str) -> Option<&'a str> {
        let matched = terminator::get(pattern).match_at_start(self.tail())?;
        Some(&self.source[self.position..self.position + matched.len()])
    }

    /// Consumes everything up to the byte position `end`, returning it.
    pub fn consume_until(&mut self, end: usize) -> &'a str {
        let text = &self.source[self.position..end];
        self.move_position_to(end);
        text
    }

    /// Rounds `pos` up to the next character boundary.
    pub fn char_boundary_from(&self, pos: usize) -> usize {
        let mut pos = pos.min(self.source.len());
        while !self.source.is_char_boundary(pos) {
            pos += 1;
        }
        pos
    }

    /// The terminators currently in effect, innermost first.
    fn active_terminators(&self) -> impl Iterator<Item = &Arc<Terminator>> {
        let mut done = false;
        self.stack
            .iter()
            .rev()
            .take_while(move |frame| {
                let take = !done;
                done |= !frame.inherit;
                take
            })
            .filter_map(|frame| frame.terminator.as_ref())
    }

    /// Returns true if the cursor is at end-of-input or any active terminator
    /// matches at the cursor. `ignore`, if given, names one terminator
    /// instance that is not considered.
    pub fn needs_terminate(&self, ignore: Option<&Arc<Terminator>>) -> bool {
        if self.position >= self.source.len() {
            return true;
        }
        let tail = self.tail();
        self.active_terminators().any(|t| {
            ignore.is_none_or(|ignored| !Arc::ptr_eq(ignored, t)) && t.is_match_at_start(tail)
        })
    }

    /// Returns the earliest position at or after `position + min_offset` at
    /// which any active terminator matches, or end-of-input.
    pub fn find_terminator(&self, min_offset: usize) -> usize {
        let start = self.char_boundary_from(self.position + min_offset);
        self.active_terminators()
            .filter_map(|t| t.find_from(self.source, start))
            .min()
            .unwrap_or(self.source.len())
    }
}
