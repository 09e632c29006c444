use serde::{Deserialize, Serialize};

use super::{Action, ActionQueue, Verb};
use crate::*;

/// Deduction rules, each applied to one probed cell `A`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rule {
    /// Every mine around `A` is flagged, the rest of its hidden neighbors are safe.
    AllMinesFlagged,
    /// `A` needs every hidden neighbor to be a mine.
    AllUnprobedMines,
    /// A nearby probed `B` already accounts for all of `A`'s mines, so `A`'s cells outside `B` are safe.
    SubsetSafe,
    /// `B` can hold so few of `A`'s mines that `A`'s cells outside `B` must all be mines.
    SubsetMines,
}

impl Rule {
    pub const ALL: [Rule; 4] = [
        Rule::AllMinesFlagged,
        Rule::AllUnprobedMines,
        Rule::SubsetSafe,
        Rule::SubsetMines,
    ];

    pub const fn verb(self) -> Verb {
        match self {
            Self::AllMinesFlagged | Self::SubsetSafe => Verb::Probe,
            Self::AllUnprobedMines | Self::SubsetMines => Verb::Flag,
        }
    }

    /// Queues what this rule proves around `coords`, returns whether a new action was queued.
    ///
    /// Never touches the board, a cell that is not probed yields nothing.
    pub fn apply<B: Board + ?Sized>(self, board: &B, coords: Coord2, queue: &mut ActionQueue) -> bool {
        let changed = match self {
            Self::AllMinesFlagged | Self::AllUnprobedMines => {
                single_cell(board, coords, self.verb(), queue)
            }
            Self::SubsetSafe | Self::SubsetMines => paired_cells(board, coords, self.verb(), queue),
        };
        if changed {
            log::trace!("{self:?} fired at {coords:?}");
        }
        changed
    }
}

/// Rules 1 and 2: compare `A`'s count with its own flagged and hidden neighbors.
fn single_cell<B: Board + ?Sized>(
    board: &B,
    coords: Coord2,
    verb: Verb,
    queue: &mut ActionQueue,
) -> bool {
    let Some(mines) = board.adjacent_mine_count(coords) else {
        return false;
    };
    let flagged = board.adjacent_flagged_count(coords);

    let proven = match verb {
        Verb::Probe => mines == flagged,
        Verb::Flag => {
            let unprobed = board.adjacent_unprobed_count(coords);
            u16::from(mines) == u16::from(unprobed) + u16::from(flagged)
        }
    };

    proven && enqueue_unprobed(board, board.neighbors(coords, 1), verb, queue)
}

/// Rules 3 and 4: compare `A` with every probed `B` sharing part of its neighborhood.
///
/// For `Probe`, the cells only `B` sees are assumed to hold as many mines as they can; if `B` still
/// needs `m(A)` mines in the overlap, `A` has none outside it. For `Flag`, the same bound is taken
/// from `A`'s side: if the overlap can hold at most `m(B)` mines and `A`'s own cells must make up the
/// difference, every one of them is a mine.
fn paired_cells<B: Board + ?Sized>(
    board: &B,
    a: Coord2,
    verb: Verb,
    queue: &mut ActionQueue,
) -> bool {
    let Some(mines_a) = board.adjacent_mine_count(a) else {
        return false;
    };
    let mines_a = i16::from(mines_a);

    let mut changed = false;
    for b in board.neighbors(a, 2) {
        let Some(mines_b) = board.adjacent_mine_count(b) else {
            continue;
        };
        let mines_b = i16::from(mines_b);
        let only_a = board.unshared_neighbors(a, b);

        let proven = match verb {
            Verb::Probe => {
                let only_b = board.unshared_neighbors(b, a);
                mines_a == mines_b - unresolved_count(board, &only_b)
            }
            Verb::Flag => mines_b == mines_a - unresolved_count(board, &only_a),
        };

        if proven {
            changed |= enqueue_unprobed(board, only_a, verb, queue);
        }
    }
    changed
}

/// Hidden plus flagged cells among `cells`, the most mines they can hold.
fn unresolved_count<B: Board + ?Sized>(board: &B, cells: &[Coord2]) -> i16 {
    let count = cells
        .iter()
        .filter(|&&pos| board.state(pos) != CellState::Probed)
        .count();
    i16::try_from(count).unwrap_or(i16::MAX)
}

fn enqueue_unprobed<B: Board + ?Sized>(
    board: &B,
    cells: impl IntoIterator<Item = Coord2>,
    verb: Verb,
    queue: &mut ActionQueue,
) -> bool {
    let mut changed = false;
    for pos in cells {
        if board.state(pos) == CellState::Unprobed {
            changed |= queue.push(Action { coords: pos, verb });
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn queued(queue: &ActionQueue) -> Vec<Action> {
        queue.iter().copied().collect()
    }

    #[test]
    fn all_mines_flagged_probes_exactly_the_hidden_neighbors() {
        let engine: PlayEngine = "F..\no..\n...".parse().unwrap();
        let mut queue = ActionQueue::default();

        assert!(Rule::AllMinesFlagged.apply(&engine, (0, 1), &mut queue));
        assert!(!Rule::AllUnprobedMines.apply(&engine, (0, 1), &mut queue));

        assert_eq!(
            queued(&queue),
            [
                Action::probe((0, 2)),
                Action::probe((1, 0)),
                Action::probe((1, 1)),
                Action::probe((1, 2)),
            ]
        );
    }

    #[test]
    fn all_unprobed_mines_flags_exactly_the_hidden_neighbors() {
        let engine: PlayEngine = "*o.\noo.".parse().unwrap();
        let mut queue = ActionQueue::default();

        assert!(Rule::AllUnprobedMines.apply(&engine, (0, 1), &mut queue));
        assert!(!Rule::AllMinesFlagged.apply(&engine, (0, 1), &mut queue));

        assert_eq!(queued(&queue), [Action::flag((0, 0))]);
    }

    #[test]
    fn subset_safe_clears_cells_outside_the_overlap() {
        // the mine next to (0, 1) is also the only one next to (1, 1)
        let engine: PlayEngine = "*..\noo.".parse().unwrap();
        let mut queue = ActionQueue::default();

        assert!(Rule::SubsetSafe.apply(&engine, (1, 1), &mut queue));

        assert_eq!(
            queued(&queue),
            [Action::probe((2, 0)), Action::probe((2, 1))]
        );
    }

    #[test]
    fn subset_mines_flags_the_one_two_one_pattern() {
        let mut engine: PlayEngine = "..*..\n.....\n..*..".parse().unwrap();
        engine.reveal((0, 0)).unwrap();
        let mut queue = ActionQueue::default();

        assert!(Rule::SubsetMines.apply(&engine, (1, 1), &mut queue));
        assert!(!Rule::AllMinesFlagged.apply(&engine, (1, 1), &mut queue));
        assert!(!Rule::AllUnprobedMines.apply(&engine, (1, 1), &mut queue));

        assert_eq!(queued(&queue), [Action::flag((2, 0)), Action::flag((2, 2))]);
    }

    #[test]
    fn rules_ignore_cells_that_are_not_probed() {
        let engine: PlayEngine = "*..\noo.".parse().unwrap();
        let mut queue = ActionQueue::default();

        for rule in Rule::ALL {
            assert!(!rule.apply(&engine, (2, 0), &mut queue));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn reapplying_on_an_unchanged_board_adds_nothing() {
        let engine: PlayEngine = "*..\noo.".parse().unwrap();
        let mut queue = ActionQueue::default();

        let first = Rule::ALL.map(|rule| rule.apply(&engine, (1, 1), &mut queue));
        let len = queue.len();
        let second = Rule::ALL.map(|rule| rule.apply(&engine, (1, 1), &mut queue));

        assert!(first.contains(&true));
        assert_eq!(second, [false; 4]);
        assert_eq!(queue.len(), len);
    }
}
