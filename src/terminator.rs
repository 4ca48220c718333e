//! The memoized registry of compiled terminator patterns.

use fancy_regex::Regex;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};

/// A compiled terminator pattern.
///
/// Each pattern is compiled twice: once anchored at the cursor, for deciding
/// whether a construct must stop producing content right here, and once
/// unanchored, for finding the earliest position at which it would stop.
#[derive(Debug)]
pub(crate) struct Terminator {
    /// The source pattern, as given to [`get`].
    pub pattern: String,
    /// The pattern compiled to match only at the start of the remaining text.
    anchored: Regex,
    /// The pattern compiled for forward searching over the full source.
    search: Regex,
}

impl Terminator {
    /// Returns true if the pattern matches at the start of `tail`.
    pub fn is_match_at_start(&self, tail: &str) -> bool {
        self.anchored.is_match(tail).unwrap_or(false)
    }

    /// Matches the pattern at the start of `tail`, returning the matched text.
    pub fn match_at_start<'t>(&self, tail: &'t str) -> Option<&'t str> {
        self.anchored
            .find(tail)
            .ok()
            .flatten()
            .map(|m| m.as_str())
    }

    /// Finds the earliest match at or after `start` in `source`, returning its
    /// start position.
    pub fn find_from(&self, source: &str, start: usize) -> Option<usize> {
        if start > source.len() {
            return None;
        }
        self.search
            .find_from_pos(source, start)
            .ok()
            .flatten()
            .map(|m| m.start())
    }
}

/// The process-wide pattern registry. Append-only; entries are memoized so
/// that the same pattern string always yields the same [`Arc`], which lets
/// callers compare terminators by identity.
static REGISTRY: LazyLock<Mutex<HashMap<String, Arc<Terminator>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Returns the memoized compiled form of `pattern`.
///
/// # Panics
///
/// * If `pattern` is not a valid regular expression. All patterns in this
///   crate are fixed strings validated by the test suite.
pub(crate) fn get(pattern: &str) -> Arc<Terminator> {
    let mut registry = REGISTRY.lock();
    if let Some(terminator) = registry.get(pattern) {
        return Arc::clone(terminator);
    }
    let compiled = Arc::new(Terminator {
        pattern: pattern.to_string(),
        anchored: Regex::new(&format!(r"\A(?:{pattern})")).unwrap(),
        search: Regex::new(pattern).unwrap(),
    });
    registry.insert(pattern.to_string(), Arc::clone(&compiled));
    compiled
}
