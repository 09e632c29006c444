use alloc::collections::{BTreeSet, VecDeque};
use core::num::Saturating;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Reference board: a mine layout plus the player-visible grid, playable through [`Board`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayEngine {
    mine_layout: MineLayout,
    board: Array2<EngineCell>,
    revealed_count: Saturating<CellCount>,
    flagged_count: Saturating<CellCount>,
    phase: GamePhase,
    triggered_mine: Option<Coord2>,
}

impl PlayEngine {
    pub fn new(mine_layout: MineLayout) -> Self {
        let size = mine_layout.size();
        Self {
            mine_layout,
            board: Array2::default(size.to_nd_index()),
            revealed_count: Saturating(0),
            flagged_count: Saturating(0),
            phase: Default::default(),
            triggered_mine: None,
        }
    }

    /// Builds a game already in progress.
    ///
    /// Revealed cells get their counts from the layout, a cell marked both revealed and flagged counts as
    /// revealed. Fails when a mask does not match the layout or a revealed cell holds a mine.
    pub fn from_position(
        mine_layout: MineLayout,
        revealed: &Array2<bool>,
        flagged: &Array2<bool>,
    ) -> Result<Self> {
        let (size_x, size_y) = mine_layout.size();
        let expected = (usize::from(size_x), usize::from(size_y));
        if revealed.dim() != expected || flagged.dim() != expected {
            return Err(GameError::InvalidBoardShape);
        }

        let mut engine = Self::new(mine_layout);
        let (x_end, y_end) = engine.size();
        for x in 0..x_end {
            for y in 0..y_end {
                let coords = (x, y);
                if revealed[coords.to_nd_index()] {
                    if engine.mine_layout.contains_mine(coords) {
                        return Err(GameError::RevealedMine(coords));
                    }
                    let count = engine.mine_layout.adjacent_mine_count(coords);
                    engine.board[coords.to_nd_index()] = EngineCell::Revealed(count);
                    engine.revealed_count += 1;
                } else if flagged[coords.to_nd_index()] {
                    engine.board[coords.to_nd_index()] = EngineCell::Flagged;
                    engine.flagged_count += 1;
                }
            }
        }

        if engine.revealed_count == Saturating(engine.mine_layout.safe_cell_count()) {
            engine.end_game(true);
        } else if engine.revealed_count.0 > 0 {
            engine.mark_started();
        }

        Ok(engine)
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn size(&self) -> Coord2 {
        self.mine_layout.size()
    }

    pub fn total_mines(&self) -> CellCount {
        self.mine_layout.mine_count()
    }

    pub fn revealed_count(&self) -> CellCount {
        self.revealed_count.0
    }

    pub fn flagged_count(&self) -> CellCount {
        self.flagged_count.0
    }

    pub fn mines_left(&self) -> isize {
        (self.mine_layout.mine_count() as isize) - (self.flagged_count.0 as isize)
    }

    pub fn cell_at(&self, coords: Coord2) -> EngineCell {
        self.board[coords.to_nd_index()]
    }

    pub fn triggered_mine(&self) -> Option<Coord2> {
        self.triggered_mine
    }

    pub fn has_mine_at(&self, coords: Coord2) -> bool {
        self.mine_layout.contains_mine(coords)
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        use EngineCell::*;
        use MarkOutcome::*;

        let coords = self.mine_layout.validate_coords(coords)?;
        self.check_not_finished()?;

        Ok(match self.board[coords.to_nd_index()] {
            Hidden => {
                self.board[coords.to_nd_index()] = Flagged;
                self.flagged_count += 1;
                Changed
            }
            Flagged => {
                self.board[coords.to_nd_index()] = Hidden;
                self.flagged_count -= 1;
                Changed
            }
            Revealed(_) => NoChange,
        })
    }

    pub fn reveal(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        let coords = self.mine_layout.validate_coords(coords)?;

        if matches!(self.board[coords.to_nd_index()], EngineCell::Hidden) {
            self.check_not_finished()?;
            Ok(self.reveal_single_cell(coords))
        } else {
            Ok(RevealOutcome::NoChange)
        }
    }

    fn reveal_single_cell(&mut self, coords: Coord2) -> RevealOutcome {
        let cell_state = self.board[coords.to_nd_index()];
        let has_mine = self.mine_layout[coords];

        match (cell_state, has_mine) {
            (EngineCell::Hidden, true) => {
                self.triggered_mine = Some(coords);
                self.end_game(false);
                RevealOutcome::HitMine
            }
            (EngineCell::Hidden, false) => {
                let adjacent_mines = self.mine_layout.adjacent_mine_count(coords);
                self.board[coords.to_nd_index()] = EngineCell::Revealed(adjacent_mines);
                self.revealed_count += 1;

                if adjacent_mines == 0 {
                    self.flood_reveal(coords);
                }

                if self.revealed_count == Saturating(self.mine_layout.safe_cell_count()) {
                    self.end_game(true);
                    RevealOutcome::Won
                } else {
                    self.mark_started();
                    RevealOutcome::Revealed
                }
            }
            _ => RevealOutcome::NoChange,
        }
    }

    /// Opens the whole zero region around `origin`, flags are left alone.
    fn flood_reveal(&mut self, origin: Coord2) {
        let mut visited = BTreeSet::from([origin]);
        let mut to_visit: VecDeque<_> = self.hidden_neighbors(origin).collect();

        while let Some(visit_coords) = to_visit.pop_front() {
            if !visited.insert(visit_coords) {
                continue;
            }

            if !matches!(self.board[visit_coords.to_nd_index()], EngineCell::Hidden) {
                continue;
            }

            let visit_adjacent_mines = self.mine_layout.adjacent_mine_count(visit_coords);
            self.board[visit_coords.to_nd_index()] = EngineCell::Revealed(visit_adjacent_mines);
            self.revealed_count += 1;

            if visit_adjacent_mines == 0 {
                let next: alloc::vec::Vec<_> = self
                    .hidden_neighbors(visit_coords)
                    .filter(|pos| !visited.contains(pos))
                    .collect();
                to_visit.extend(next);
            }
        }
    }

    fn hidden_neighbors(&self, coords: Coord2) -> impl Iterator<Item = Coord2> + '_ {
        self.mine_layout
            .iter_neighbors(coords)
            .filter(|&pos| matches!(self.board[pos.to_nd_index()], EngineCell::Hidden))
    }

    fn mark_started(&mut self) {
        if matches!(self.phase, GamePhase::Initialized) {
            self.phase = GamePhase::Playing;
        }
    }

    fn end_game(&mut self, won: bool) {
        if self.phase.is_finished() {
            return;
        }

        self.phase = if won { GamePhase::Won } else { GamePhase::Lost };
        if won {
            self.triggered_mine = None;
        }
    }

    fn check_not_finished(&self) -> Result<()> {
        if self.phase.is_finished() {
            Err(GameError::AlreadyEnded)
        } else {
            Ok(())
        }
    }
}

impl Board for PlayEngine {
    fn size(&self) -> Coord2 {
        self.mine_layout.size()
    }

    fn phase(&self) -> GamePhase {
        self.phase
    }

    fn state(&self, coords: Coord2) -> CellState {
        self.cell_at(coords).state()
    }

    fn adjacent_mine_count(&self, coords: Coord2) -> Option<u8> {
        match self.cell_at(coords) {
            EngineCell::Revealed(count) => Some(count),
            EngineCell::Hidden | EngineCell::Flagged => None,
        }
    }

    fn reveal(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        PlayEngine::reveal(self, coords)
    }

    fn flag(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        match self.mine_layout.validate_coords(coords).map(|coords| self.cell_at(coords))? {
            EngineCell::Hidden => self.toggle_flag(coords),
            EngineCell::Revealed(_) | EngineCell::Flagged => Ok(MarkOutcome::NoChange),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(size: Coord2, mines: &[Coord2]) -> MineLayout {
        MineLayout::from_mine_coords(size, mines).unwrap()
    }

    #[test]
    fn reveal_hits_mine_and_sets_triggered_cell() {
        let mut engine = PlayEngine::new(layout((2, 2), &[(0, 0)]));

        let outcome = engine.reveal((0, 0)).unwrap();

        assert_eq!(outcome, RevealOutcome::HitMine);
        assert_eq!(engine.phase(), GamePhase::Lost);
        assert_eq!(engine.triggered_mine(), Some((0, 0)));
    }

    #[test]
    fn reveal_flood_fill_opens_zero_region() {
        let mut engine = PlayEngine::new(layout((3, 3), &[(2, 2)]));

        let outcome = engine.reveal((0, 0)).unwrap();

        assert_eq!(outcome, RevealOutcome::Won);
        assert_eq!(engine.cell_at((0, 0)), EngineCell::Revealed(0));
        assert_eq!(engine.cell_at((1, 1)), EngineCell::Revealed(1));
        assert_eq!(engine.cell_at((2, 2)), EngineCell::Hidden);
    }

    #[test]
    fn first_reveal_starts_the_game() {
        let mut engine = PlayEngine::new(layout((3, 1), &[(2, 0)]));
        assert_eq!(engine.phase(), GamePhase::Initialized);

        assert_eq!(engine.reveal((1, 0)).unwrap(), RevealOutcome::Revealed);
        assert_eq!(engine.phase(), GamePhase::Playing);
    }

    #[test]
    fn flag_through_board_never_unflags() {
        let mut engine = PlayEngine::new(layout((2, 1), &[(0, 0)]));

        assert_eq!(Board::flag(&mut engine, (0, 0)).unwrap(), MarkOutcome::Changed);
        assert_eq!(Board::flag(&mut engine, (0, 0)).unwrap(), MarkOutcome::NoChange);
        assert_eq!(engine.state((0, 0)), CellState::Flagged);
        assert_eq!(engine.mines_left(), 0);
    }

    #[test]
    fn moves_after_the_end_are_rejected() {
        let mut engine = PlayEngine::new(layout((2, 1), &[(0, 0)]));

        assert_eq!(engine.reveal((1, 0)).unwrap(), RevealOutcome::Won);
        assert_eq!(engine.reveal((0, 0)), Err(GameError::AlreadyEnded));
        assert_eq!(engine.toggle_flag((0, 0)), Err(GameError::AlreadyEnded));
    }

    #[test]
    fn out_of_bounds_moves_are_rejected() {
        let mut engine = PlayEngine::new(layout((2, 2), &[(0, 0)]));

        assert_eq!(engine.reveal((2, 0)), Err(GameError::InvalidCoords));
        assert_eq!(Board::flag(&mut engine, (0, 5)), Err(GameError::InvalidCoords));
    }

    #[test]
    fn from_position_computes_counts_and_phase() {
        let mines = layout((3, 3), &[(2, 2)]);
        let revealed = Array2::from_shape_fn([3, 3], |(x, y)| (x, y) != (2, 2) && (x, y) != (1, 0));
        let flagged = Array2::from_shape_fn([3, 3], |(x, y)| (x, y) == (2, 2));

        let engine = PlayEngine::from_position(mines, &revealed, &flagged).unwrap();

        assert_eq!(engine.phase(), GamePhase::Playing);
        assert_eq!(engine.cell_at((1, 1)), EngineCell::Revealed(1));
        assert_eq!(engine.cell_at((1, 0)), EngineCell::Hidden);
        assert_eq!(engine.cell_at((2, 2)), EngineCell::Flagged);
        assert_eq!(engine.revealed_count(), 7);
        assert_eq!(engine.flagged_count(), 1);
    }

    #[test]
    fn from_position_rejects_revealed_mine_and_bad_shape() {
        let revealed = Array2::from_elem([2, 1], true);
        let flagged = Array2::from_elem([2, 1], false);

        assert_eq!(
            PlayEngine::from_position(layout((2, 1), &[(1, 0)]), &revealed, &flagged),
            Err(GameError::RevealedMine((1, 0)))
        );

        let narrow = Array2::from_elem([1, 1], false);
        assert_eq!(
            PlayEngine::from_position(layout((2, 1), &[(1, 0)]), &narrow, &flagged),
            Err(GameError::InvalidBoardShape)
        );
    }
}
