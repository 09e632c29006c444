use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

pub use observer::*;
pub use queue::*;
pub use rules::*;

use crate::*;

mod observer;
mod queue;
mod rules;

/// Which rules the solver runs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleSet {
    /// Only rules looking at a single cell
    Basic,
    /// Single-cell rules plus subset deduction between overlapping cells
    #[default]
    Full,
}

impl RuleSet {
    pub fn rules(self) -> &'static [Rule] {
        match self {
            Self::Basic => &[Rule::AllMinesFlagged, Rule::AllUnprobedMines],
            Self::Full => &Rule::ALL,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    pub rules: RuleSet,
}

/// Where the solver is in the game's lifecycle.
///
/// Valid transitions, driven by [`GamePhase`]:
/// - Initialized -> Playing
/// - Playing -> Terminal
/// - any -> Initialized, when the board starts a new game
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    #[default]
    Initialized,
    Playing,
    Terminal,
}

/// Result of a single [`Solver::step`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Turn {
    /// The board has not started, internal state was rebuilt
    Reset,
    /// No certain move is known
    Idle,
    Probed {
        coords: Coord2,
        outcome: RevealOutcome,
    },
    Flagged {
        coords: Coord2,
        outcome: MarkOutcome,
    },
    /// The queued action no longer applied, the board was left alone
    Discarded(Action),
    /// The game is over
    Finished(GamePhase),
}

impl Turn {
    /// The action sent to the board this turn, if any.
    pub const fn action(self) -> Option<Action> {
        match self {
            Self::Probed { coords, .. } => Some(Action::probe(coords)),
            Self::Flagged { coords, .. } => Some(Action::flag(coords)),
            _ => None,
        }
    }

    /// Whether another turn can still make progress without outside help.
    pub const fn can_continue(self) -> bool {
        matches!(
            self,
            Self::Probed { .. } | Self::Flagged { .. } | Self::Discarded(_)
        )
    }
}

/// Deduction-only player, one instance per game.
///
/// Call [`Solver::step`] once per tick; each call makes at most one move on the board.
#[derive(Clone, Debug, Default)]
pub struct Solver {
    config: SolverConfig,
    state: ControllerState,
    observer: Option<ChangeObserver>,
    frontier: Frontier,
    actions: ActionQueue,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> SolverConfig {
        self.config
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn pending(&self) -> &ActionQueue {
        &self.actions
    }

    pub fn observer(&self) -> Option<&ChangeObserver> {
        self.observer.as_ref()
    }

    /// Plays one turn: follow the board's phase, look for new deductions when nothing is queued, then
    /// carry out at most one queued action.
    pub fn step<B: Board + ?Sized>(&mut self, board: &mut B) -> Result<Turn> {
        if let Some(turn) = self.transition(board) {
            return Ok(turn);
        }

        if self.actions.is_empty() && self.observe(board) {
            self.infer(board);
        }

        match self.actions.pop() {
            Some(action) => self.execute(board, action),
            None => Ok(Turn::Idle),
        }
    }

    /// Steps until the solver runs out of certain moves, the game ends, or `max_turns` is reached.
    ///
    /// Returns every turn taken, the last one tells why it stopped.
    pub fn run<B: Board + ?Sized>(&mut self, board: &mut B, max_turns: usize) -> Result<Vec<Turn>> {
        let mut turns = Vec::new();
        while turns.len() < max_turns {
            let turn = self.step(board)?;
            turns.push(turn);
            if !turn.can_continue() {
                break;
            }
        }
        Ok(turns)
    }

    /// Drains the frontier through every enabled rule.
    ///
    /// Returns whether any rule queued a new action.
    pub fn infer<B: Board + ?Sized>(&mut self, board: &B) -> bool {
        let rules = self.config.rules.rules();
        let mut changed = false;

        while let Some(coords) = self.frontier.pop() {
            if board.state(coords) != CellState::Probed {
                continue;
            }
            for rule in rules {
                changed |= rule.apply(board, coords, &mut self.actions);
            }
        }

        changed
    }

    fn transition<B: Board + ?Sized>(&mut self, board: &B) -> Option<Turn> {
        match board.phase() {
            GamePhase::Initialized => {
                self.reset(ChangeObserver::new(board));
                self.state = ControllerState::Initialized;
                Some(Turn::Reset)
            }
            phase @ (GamePhase::Won | GamePhase::Lost) => {
                if self.state != ControllerState::Terminal {
                    log::debug!("game finished: {phase:?}");
                    self.observer = None;
                    self.frontier.clear();
                    self.actions.clear();
                }
                self.state = ControllerState::Terminal;
                Some(Turn::Finished(phase))
            }
            GamePhase::Playing => {
                if self.observer.is_none() {
                    log::debug!("attaching to a game in progress");
                    self.reset(ChangeObserver::blank(board.size()));
                }
                self.state = ControllerState::Playing;
                None
            }
        }
    }

    fn reset(&mut self, observer: ChangeObserver) {
        log::debug!("solver reset for a {:?} board", observer.size());
        self.observer = Some(observer);
        self.frontier.clear();
        self.actions.clear();
    }

    fn observe<B: Board + ?Sized>(&mut self, board: &B) -> bool {
        match self.observer.as_mut() {
            Some(observer) => observer.observe(board, &mut self.frontier),
            None => false,
        }
    }

    fn execute<B: Board + ?Sized>(&mut self, board: &mut B, action: Action) -> Result<Turn> {
        let Action { coords, verb } = action;

        if board.state(coords) != CellState::Unprobed {
            log::trace!("dropping stale {action:?}");
            return Ok(Turn::Discarded(action));
        }

        log::debug!("{verb:?} {coords:?}");
        Ok(match verb {
            Verb::Probe => Turn::Probed {
                coords,
                outcome: board.reveal(coords)?,
            },
            Verb::Flag => Turn::Flagged {
                coords,
                outcome: board.flag(coords)?,
            },
        })
    }
}
