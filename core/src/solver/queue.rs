use alloc::collections::BTreeSet;
use serde::{Deserialize, Serialize};

use crate::Coord2;

/// What to do with a cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Verb {
    Probe,
    Flag,
}

/// A move proven safe by one of the rules.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Action {
    pub coords: Coord2,
    pub verb: Verb,
}

impl Action {
    pub const fn probe(coords: Coord2) -> Self {
        Self {
            coords,
            verb: Verb::Probe,
        }
    }

    pub const fn flag(coords: Coord2) -> Self {
        Self {
            coords,
            verb: Verb::Flag,
        }
    }
}

/// Probed cells whose neighborhood may still yield a deduction.
///
/// Popped in coordinate order so a given position always plays out the same way.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frontier {
    cells: BTreeSet<Coord2>,
}

impl Frontier {
    pub fn insert(&mut self, coords: Coord2) -> bool {
        self.cells.insert(coords)
    }

    pub fn pop(&mut self) -> Option<Coord2> {
        self.cells.pop_first()
    }

    pub fn contains(&self, coords: Coord2) -> bool {
        self.cells.contains(&coords)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = Coord2> + '_ {
        self.cells.iter().copied()
    }
}

/// Pending actions, keyed by the whole `(coords, verb)` pair.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionQueue {
    actions: BTreeSet<Action>,
}

impl ActionQueue {
    /// Returns `false` when the same action was already pending.
    pub fn push(&mut self, action: Action) -> bool {
        self.actions.insert(action)
    }

    pub fn pop(&mut self) -> Option<Action> {
        self.actions.pop_first()
    }

    pub fn contains(&self, action: &Action) -> bool {
        self.actions.contains(action)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }
}
