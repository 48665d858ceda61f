//! The jump table: the ordered record of visited navigation positions.
//!
//! Positions are contiguous starting at 0 and the last entry is always
//! the current position. The table only grows at the end, shrinks through
//! `jump_to` truncation or a `pop`, and is owned by exactly one delivery
//! session.

use serde::{Deserialize, Serialize};

/// One visited position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jump {
    /// The identifier of the item.
    pub item: String,
    /// The identifier of the section.
    pub section: String,
    /// The identifier of the part.
    pub part: String,
    /// The position of the jump entry, starting from 0.
    pub position: i64,
}

/// Append/truncate sequence of [`Jump`]s.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct JumpTable {
    entries: Vec<Jump>,
}

impl JumpTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a jump at `last position + 1`, or 0 when the table is empty.
    pub fn add_jump(&mut self, part: &str, section: &str, item: &str) -> &Jump {
        let position = self.entries.last().map(|j| j.position + 1).unwrap_or(0);
        self.entries.push(Jump {
            item: item.to_string(),
            section: section.to_string(),
            part: part.to_string(),
            position,
        });
        self.entries.last().expect("entry was just pushed")
    }

    /// Truncate the table so the entry at `position` becomes the last one.
    /// A negative position empties the table.
    pub fn jump_to(&mut self, position: i64) {
        self.entries.retain(|jump| jump.position <= position);
    }

    /// Remove and return the last jump.
    pub fn pop(&mut self) -> Option<Jump> {
        self.entries.pop()
    }

    /// The current position, `None` when the table is empty.
    pub fn last(&self) -> Option<&Jump> {
        self.entries.last()
    }

    /// All visited positions in order.
    pub fn entries(&self) -> &[Jump] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
