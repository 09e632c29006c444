use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

/// Lifecycle of a game as reported by the board.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// No cell has been revealed yet
    #[default]
    Initialized,
    Playing,
    Won,
    Lost,
}

impl GamePhase {
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Neighbor list of a single cell, never more than eight entries.
pub type Neighbors = SmallVec<[Coord2; 8]>;

/// Everything the solver needs from a game board.
///
/// Implementors provide the cell states, the revealed counts and the two mutating moves; neighborhood
/// queries and derived counts have default implementations over the 8-neighborhood. Coordinates handed
/// to the board by the solver are always in bounds, as they are derived from [`Board::size`] and
/// [`Board::neighbors`].
pub trait Board {
    /// Width and height of the board.
    fn size(&self) -> Coord2;

    fn phase(&self) -> GamePhase;

    fn state(&self, coords: Coord2) -> CellState;

    /// Number of mines around a probed cell, `None` when the cell is not probed.
    fn adjacent_mine_count(&self, coords: Coord2) -> Option<u8>;

    fn reveal(&mut self, coords: Coord2) -> Result<RevealOutcome>;

    fn flag(&mut self, coords: Coord2) -> Result<MarkOutcome>;

    /// Cells within Chebyshev distance `radius`, center excluded, clipped to the board.
    fn neighbors(&self, coords: Coord2, radius: u8) -> NeighborIter {
        NeighborIter::with_radius(coords, self.size(), radius)
    }

    /// Neighbors of `a` that are not also neighbors of `b`.
    fn unshared_neighbors(&self, a: Coord2, b: Coord2) -> Neighbors {
        self.neighbors(a, 1)
            .filter(|&pos| !is_adjacent(pos, b))
            .collect()
    }

    fn adjacent_flagged_count(&self, coords: Coord2) -> u8 {
        self.count_adjacent(coords, CellState::Flagged)
    }

    fn adjacent_unprobed_count(&self, coords: Coord2) -> u8 {
        self.count_adjacent(coords, CellState::Unprobed)
    }

    fn count_adjacent(&self, coords: Coord2, state: CellState) -> u8 {
        self.neighbors(coords, 1)
            .filter(|&pos| self.state(pos) == state)
            .count()
            .try_into()
            .unwrap_or(u8::MAX)
    }

    /// A probed cell that still touches an unprobed one, the only kind worth inspecting.
    fn is_open_probed(&self, coords: Coord2) -> bool {
        self.state(coords) == CellState::Probed && self.adjacent_unprobed_count(coords) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn unshared_neighbors_drop_the_overlap() {
        let engine = PlayEngine::new(MineLayout::from_mine_coords((4, 3), &[]).unwrap());

        let unshared: Vec<_> = engine.unshared_neighbors((1, 1), (2, 1)).into_iter().collect();

        // (2, 1) is a neighbor of (1, 1) but not of itself
        assert_eq!(unshared, [(0, 0), (0, 1), (2, 1), (0, 2)]);
    }

    #[test]
    fn unshared_neighbors_of_distant_cells_are_all_neighbors() {
        let engine = PlayEngine::new(MineLayout::from_mine_coords((5, 5), &[]).unwrap());

        assert_eq!(engine.unshared_neighbors((0, 0), (4, 4)).len(), 3);
    }

    #[test]
    fn counts_follow_cell_states() {
        let layout = MineLayout::from_mine_coords((3, 1), &[(0, 0)]).unwrap();
        let mut engine = PlayEngine::new(layout);

        engine.reveal((1, 0)).unwrap();
        assert_eq!(engine.adjacent_unprobed_count((1, 0)), 2);
        assert!(engine.is_open_probed((1, 0)));

        engine.flag((0, 0)).unwrap();
        assert_eq!(engine.adjacent_flagged_count((1, 0)), 1);
        assert_eq!(engine.adjacent_unprobed_count((1, 0)), 1);
        assert_eq!(engine.adjacent_mine_count((1, 0)), Some(1));
        assert_eq!(engine.adjacent_mine_count((2, 0)), None);
    }
}
