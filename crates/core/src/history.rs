//! Linear undo/redo history of value snapshots.
//!
//! Entry 0 is the value the history was created with and is never evicted.
//! Pushing after an undo discards the redo branch.

/// Smallest accepted capacity: the root plus one edit.
pub const MIN_HISTORY_CAPACITY: usize = 2;

/// Ordered snapshots plus a cursor pointing at the current one.
///
/// Invariant: `cursor < entries.len()`, and `entries` is never empty.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: Vec<T>,
    cursor: usize,
    capacity: Option<usize>,
}

impl<T: Clone + PartialEq> History<T> {
    /// Unbounded history seeded with `root`.
    pub fn new(root: T) -> Self {
        Self {
            entries: vec![root],
            cursor: 0,
            capacity: None,
        }
    }

    /// History keeping at most `capacity` snapshots (clamped to
    /// [`MIN_HISTORY_CAPACITY`]).
    pub fn with_capacity(root: T, capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(MIN_HISTORY_CAPACITY)),
            ..Self::new(root)
        }
    }

    pub fn current(&self) -> &T {
        &self.entries[self.cursor]
    }

    /// The value the history was created with.
    pub fn root(&self) -> &T {
        &self.entries[0]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Push `value` as the new current snapshot.
    ///
    /// Returns `false` without touching the history when `value` equals the
    /// current snapshot. Otherwise drops everything after the cursor, appends,
    /// and evicts the oldest non-root snapshot if over capacity.
    pub fn push(&mut self, value: T) -> bool {
        if *self.current() == value {
            return false;
        }

        self.entries.truncate(self.cursor + 1);
        self.entries.push(value);

        if let Some(capacity) = self.capacity {
            while self.entries.len() > capacity {
                self.entries.remove(1);
            }
        }

        self.cursor = self.entries.len() - 1;
        true
    }

    /// Step back one snapshot. Returns `false` at the root.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Step forward one snapshot. Returns `false` at the newest snapshot.
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor += 1;
        true
    }
}
