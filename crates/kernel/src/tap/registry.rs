//! Tap registry - keeps a hook's taps in invocation order.
//!
//! Order is decided greedily at insertion time: each new tap is placed
//! against the sequence as it stands, honouring its own `before` set and
//! stage. There is no global constraint solve, so the final order can depend
//! on registration order.

use std::collections::BTreeSet;

use super::record::Tap;

/// Ordered sequence of taps for one hook.
#[derive(Debug)]
pub struct TapRegistry<A, R> {
    taps: Vec<Tap<A, R>>,
}

impl<A, R> Default for TapRegistry<A, R> {
    fn default() -> Self {
        Self { taps: Vec::new() }
    }
}

impl<A, R> TapRegistry<A, R> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tap and return the index it landed at.
    ///
    /// Walks backward from the end. While any of the new tap's `before` names
    /// are unresolved, every existing tap is walked past (crossing a named
    /// tap resolves it). After that, taps with a strictly greater stage are
    /// walked past and the walk stops at the first tap with an equal or lower
    /// stage; the new tap goes right after it. Unknown `before` names never
    /// resolve, which sends the tap to the front.
    pub fn insert(&mut self, tap: Tap<A, R>) -> usize {
        let mut unresolved: BTreeSet<String> = tap.before.clone().unwrap_or_default();
        let mut index = self.taps.len();

        while index > 0 {
            let existing = &self.taps[index - 1];

            if !unresolved.is_empty() {
                unresolved.remove(&existing.name);
                index -= 1;
                continue;
            }

            if existing.stage > tap.stage {
                index -= 1;
                continue;
            }

            break;
        }

        self.taps.insert(index, tap);
        index
    }

    /// Rewrite taps in place, keeping their positions.
    ///
    /// `rewrite` returns a replacement or `None` to leave a tap unchanged.
    /// A replacement with an empty name is discarded. Returns the number of
    /// taps replaced.
    pub fn rewrite<F>(&mut self, rewrite: F) -> usize
    where
        F: Fn(&Tap<A, R>) -> Option<Tap<A, R>>,
    {
        let mut replaced = 0;
        for slot in &mut self.taps {
            if let Some(tap) = rewrite(slot).filter(|t| !t.name.is_empty()) {
                *slot = tap;
                replaced += 1;
            }
        }
        replaced
    }

    /// Taps in invocation order.
    pub fn as_slice(&self) -> &[Tap<A, R>] {
        &self.taps
    }

    /// Iterate taps in invocation order.
    pub fn iter(&self) -> impl Iterator<Item = &Tap<A, R>> {
        self.taps.iter()
    }

    /// Tap names in invocation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.taps.iter().map(|t| t.name.as_str())
    }

    /// Position of the first tap with the given name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.taps.iter().position(|t| t.name == name)
    }

    /// First tap with the given name.
    pub fn get(&self, name: &str) -> Option<&Tap<A, R>> {
        self.taps.iter().find(|t| t.name == name)
    }

    /// Number of registered taps.
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// Whether no taps are registered.
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}
