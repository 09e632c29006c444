use alloc::vec::Vec;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::Frontier;
use crate::*;

/// Marks the end of the traversal chain.
const NIL: usize = usize::MAX;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverStats {
    pub passes: u32,
    /// Cells visited by the latest pass.
    pub visited: usize,
    /// Cells found changed by the latest pass.
    pub changed: usize,
    /// Cells still threaded on the chain.
    pub chain_len: usize,
}

/// Incremental change detection over a board.
///
/// Unsettled cells are threaded on a row-major chain of `next` indices. A pass walks the chain,
/// compares each cell against the snapshot, and splices out every cell that has left `Unprobed`, so
/// later passes only pay for cells that can still change.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeObserver {
    size: Coord2,
    snapshot: Array2<CellState>,
    next: Vec<usize>,
    head: usize,
    visits: Array2<u32>,
    stats: ObserverStats,
}

impl ChangeObserver {
    /// Observer primed with the board's current states.
    pub fn new<B: Board + ?Sized>(board: &B) -> Self {
        let size = board.size();
        let snapshot = Array2::from_shape_fn(size.to_nd_index(), |(x, y)| {
            board.state((x as Coord, y as Coord))
        });
        Self::with_snapshot(size, snapshot)
    }

    /// Observer that assumes nothing was resolved yet, the first pass reports every resolved cell.
    pub fn blank(size: Coord2) -> Self {
        Self::with_snapshot(size, Array2::default(size.to_nd_index()))
    }

    fn with_snapshot(size: Coord2, snapshot: Array2<CellState>) -> Self {
        let total = usize::from(size.0) * usize::from(size.1);
        let next = (1..=total)
            .map(|index| if index < total { index } else { NIL })
            .collect();
        Self {
            size,
            snapshot,
            next,
            head: if total == 0 { NIL } else { 0 },
            visits: Array2::zeros(size.to_nd_index()),
            stats: ObserverStats {
                chain_len: total,
                ..Default::default()
            },
        }
    }

    pub fn size(&self) -> Coord2 {
        self.size
    }

    pub fn stats(&self) -> ObserverStats {
        self.stats
    }

    pub fn snapshot(&self, coords: Coord2) -> CellState {
        self.snapshot[coords.to_nd_index()]
    }

    /// How many passes have looked at `coords`.
    pub fn visit_count(&self, coords: Coord2) -> u32 {
        self.visits[coords.to_nd_index()]
    }

    /// Walks the chain once, feeding the frontier around every changed cell.
    ///
    /// Returns whether any cell changed since the previous pass.
    pub fn observe<B: Board + ?Sized>(&mut self, board: &B, frontier: &mut Frontier) -> bool {
        let mut visited = 0;
        let mut changed = 0;
        let mut prev = NIL;
        let mut cursor = self.head;

        while cursor != NIL {
            let coords = self.coords_of(cursor);
            let successor = self.next[cursor];
            let state = board.state(coords);
            visited += 1;
            self.visits[coords.to_nd_index()] += 1;

            if state != self.snapshot[coords.to_nd_index()] {
                self.snapshot[coords.to_nd_index()] = state;
                changed += 1;

                if board.is_open_probed(coords) {
                    frontier.insert(coords);
                }
                for pos in board.neighbors(coords, 1) {
                    if board.is_open_probed(pos) {
                        frontier.insert(pos);
                    }
                }
            }

            if state.is_settled() {
                if prev == NIL {
                    self.head = successor;
                } else {
                    self.next[prev] = successor;
                }
                self.stats.chain_len -= 1;
            } else {
                prev = cursor;
            }
            cursor = successor;
        }

        self.stats.passes += 1;
        self.stats.visited = visited;
        self.stats.changed = changed;
        log::trace!(
            "observer pass {}: visited {visited} cells, {changed} changed, {} left on chain",
            self.stats.passes,
            self.stats.chain_len
        );

        changed > 0
    }

    fn coords_of(&self, index: usize) -> Coord2 {
        let width = usize::from(self.size.0);
        ((index % width) as Coord, (index / width) as Coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeSet;

    fn expected_frontier(engine: &PlayEngine, moved: Coord2) -> BTreeSet<Coord2> {
        core::iter::once(moved)
            .chain(engine.neighbors(moved, 1))
            .filter(|&pos| engine.is_open_probed(pos))
            .collect()
    }

    #[test]
    fn first_pass_over_a_primed_board_sees_nothing() {
        let engine: PlayEngine = "*..\noo.".parse().unwrap();
        let mut observer = ChangeObserver::new(&engine);
        let mut frontier = Frontier::default();

        assert!(!observer.observe(&engine, &mut frontier));
        assert!(frontier.is_empty());
        // the two probed cells are spliced out
        assert_eq!(observer.stats().visited, 6);
        assert_eq!(observer.stats().chain_len, 4);
    }

    #[test]
    fn blank_observer_reports_every_resolved_cell() {
        let engine: PlayEngine = "*..\noo.".parse().unwrap();
        let mut observer = ChangeObserver::blank(engine.size());
        let mut frontier = Frontier::default();

        assert!(observer.observe(&engine, &mut frontier));
        assert_eq!(observer.stats().changed, 2);
        assert_eq!(frontier.iter().collect::<Vec<_>>(), [(0, 1), (1, 1)]);
        assert_eq!(observer.snapshot((1, 1)), CellState::Probed);
    }

    #[test]
    fn reveal_seeds_its_cell_and_its_probed_neighbors() {
        let mut engine: PlayEngine = "..*..\n.....\n..*..".parse().unwrap();
        engine.reveal((0, 0)).unwrap();
        let mut observer = ChangeObserver::new(&engine);
        let mut frontier = Frontier::default();
        observer.observe(&engine, &mut frontier);

        engine.reveal((3, 1)).unwrap();

        assert!(observer.observe(&engine, &mut frontier));
        assert_eq!(observer.stats().changed, 1);
        assert_eq!(
            frontier.iter().collect::<BTreeSet<_>>(),
            expected_frontier(&engine, (3, 1))
        );
    }

    #[test]
    fn flag_seeds_only_its_probed_neighbors() {
        let mut engine: PlayEngine = "..*..\n.....\n..*..".parse().unwrap();
        engine.reveal((0, 0)).unwrap();
        let mut observer = ChangeObserver::new(&engine);
        let mut frontier = Frontier::default();
        observer.observe(&engine, &mut frontier);

        engine.flag((2, 0)).unwrap();

        assert!(observer.observe(&engine, &mut frontier));
        let seeded = frontier.iter().collect::<BTreeSet<_>>();
        assert_eq!(seeded, expected_frontier(&engine, (2, 0)));
        assert_eq!(seeded, BTreeSet::from([(1, 0), (1, 1)]));
    }

    #[test]
    fn settled_cells_are_never_visited_again() {
        let mut engine: PlayEngine = "..*..\n.....\n..*..".parse().unwrap();
        let mut observer = ChangeObserver::new(&engine);
        let mut frontier = Frontier::default();
        observer.observe(&engine, &mut frontier);

        engine.reveal((0, 0)).unwrap();
        observer.observe(&engine, &mut frontier);
        let settled: Vec<_> = (0..5u8)
            .flat_map(|x| (0..3u8).map(move |y| (x, y)))
            .filter(|&pos| engine.state(pos).is_settled())
            .map(|pos| (pos, observer.visit_count(pos)))
            .collect();
        assert_eq!(settled.len(), 6);

        engine.flag((2, 0)).unwrap();
        engine.reveal((2, 1)).unwrap();
        observer.observe(&engine, &mut frontier);
        observer.observe(&engine, &mut frontier);

        for (pos, visits) in settled {
            assert_eq!(observer.visit_count(pos), visits, "{pos:?} was visited again");
        }
        assert_eq!(observer.visit_count((2, 0)), 3);
        assert_eq!(observer.visit_count((4, 2)), 4);
        assert_eq!(observer.stats().chain_len, 7);
    }

    #[test]
    fn head_moves_past_a_settled_first_cell() {
        let mut engine: PlayEngine = "..\n.*".parse().unwrap();
        let mut observer = ChangeObserver::new(&engine);
        let mut frontier = Frontier::default();

        engine.reveal((0, 0)).unwrap();
        assert!(observer.observe(&engine, &mut frontier));
        assert!(!observer.observe(&engine, &mut frontier));

        assert_eq!(observer.visit_count((0, 0)), 1);
        assert_eq!(observer.visit_count((1, 0)), 2);
        assert_eq!(observer.stats().visited, 3);
    }
}
