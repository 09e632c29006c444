use serde::{Deserialize, Serialize};

/// Canonical player-visible state stored by the gameplay engine.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EngineCell {
    Hidden,
    Revealed(u8),
    Flagged,
}

impl EngineCell {
    pub const fn state(self) -> CellState {
        match self {
            Self::Hidden => CellState::Unprobed,
            Self::Revealed(_) => CellState::Probed,
            Self::Flagged => CellState::Flagged,
        }
    }
}

impl Default for EngineCell {
    fn default() -> Self {
        Self::Hidden
    }
}

/// What the solver can see of a cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    #[default]
    Unprobed,
    Probed,
    Flagged,
}

impl CellState {
    /// Probed and flagged cells never change again within a game.
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Unprobed)
    }
}
