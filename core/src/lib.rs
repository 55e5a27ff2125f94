#![no_std]

extern crate alloc;

use alloc::collections::BTreeSet;
use core::ops::Index;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub use engine::*;
pub use error::*;
pub use parse::*;
pub use tile::*;
pub use types::*;

mod engine;
mod error;
mod parse;
mod tile;
mod types;

/// Number of times sealed turns may be taken back over one session.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UndoQuota {
    Unlimited,
    Limited(CellCount),
}

impl UndoQuota {
    pub const fn is_available(self) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Limited(left) => left > 0,
        }
    }

    /// Remaining budget, `None` meaning unlimited.
    pub const fn remaining(self) -> Option<CellCount> {
        match self {
            Self::Unlimited => None,
            Self::Limited(left) => Some(left),
        }
    }

    pub(crate) fn spend(&mut self) {
        if let Self::Limited(left) = self {
            *left = left.saturating_sub(1);
        }
    }
}

/// Immutable, validated starting layout of one puzzle: initial tile
/// placement, goal cells, and the undo budget.
///
/// A layout never changes once built; engines copy what they mutate, so
/// one layout can seed any number of sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardLayout {
    tiles: Array2<Tile>,
    goals: BTreeSet<Coord2>,
    players: BTreeSet<PlayerId>,
    quota: UndoQuota,
}

impl BoardLayout {
    /// Builds a layout after checking every structural invariant: nonzero
    /// dimensions, goals in bounds, at least one player, no duplicate
    /// player ids, every box owned by a present player, every player
    /// owning at least one box, and exactly one box per goal.
    ///
    /// Everything downstream relies on these facts and never re-checks
    /// them.
    pub fn new(tiles: Array2<Tile>, goals: BTreeSet<Coord2>, quota: UndoQuota) -> Result<Self> {
        let dim = tiles.dim();
        if dim.0 == 0 || dim.1 == 0 {
            return Err(FormatError::EmptyBoard);
        }
        let width: Coord = dim.0.try_into().map_err(|_| FormatError::BoardTooLarge)?;
        let height: Coord = dim.1.try_into().map_err(|_| FormatError::BoardTooLarge)?;

        for &(x, y) in &goals {
            if x >= width || y >= height {
                return Err(FormatError::GoalOutOfBounds);
            }
        }

        let mut players = BTreeSet::new();
        let mut owners = BTreeSet::new();
        let mut boxes: CellCount = 0;
        for &tile in tiles.iter() {
            match tile {
                Tile::Player(id) => {
                    if !players.insert(id) {
                        return Err(FormatError::DuplicatePlayer(id));
                    }
                }
                Tile::Box(owner) => {
                    owners.insert(owner);
                    boxes += 1;
                }
                Tile::Empty | Tile::Wall => {}
            }
        }

        if players.is_empty() {
            return Err(FormatError::NoPlayers);
        }
        if let Some(&orphan) = owners.difference(&players).next() {
            return Err(FormatError::OrphanedBox(orphan));
        }
        if let Some(&idle) = players.difference(&owners).next() {
            return Err(FormatError::PlayerWithoutBox(idle));
        }
        let goal_count = goals.len() as CellCount;
        if boxes != goal_count {
            return Err(FormatError::GoalMismatch {
                boxes,
                goals: goal_count,
            });
        }

        Ok(Self {
            tiles,
            goals,
            players,
            quota,
        })
    }

    pub fn size(&self) -> Coord2 {
        let dim = self.tiles.dim();
        (dim.0.try_into().unwrap(), dim.1.try_into().unwrap())
    }

    pub fn total_cells(&self) -> CellCount {
        let (width, height) = self.size();
        mult(width, height)
    }

    /// Tile initially occupying `coords`; cells the text left blank are
    /// `Empty`.
    pub fn tile_at(&self, coords: Coord2) -> Tile {
        self.tiles[coords.to_nd_index()]
    }

    pub fn is_goal(&self, coords: Coord2) -> bool {
        self.goals.contains(&coords)
    }

    pub fn goals(&self) -> &BTreeSet<Coord2> {
        &self.goals
    }

    pub fn player_ids(&self) -> &BTreeSet<PlayerId> {
        &self.players
    }

    pub fn undo_quota(&self) -> UndoQuota {
        self.quota
    }

    pub(crate) fn tiles(&self) -> &Array2<Tile> {
        &self.tiles
    }
}

impl Index<Coord2> for BoardLayout {
    type Output = Tile;

    fn index(&self, (x, y): Coord2) -> &Self::Output {
        &self.tiles[(x as usize, y as usize)]
    }
}

/// Result of sealing the in-progress turn into the undo history.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CommitOutcome {
    NoChange,
    Committed,
}

impl CommitOutcome {
    pub const fn has_update(self) -> bool {
        match self {
            Self::NoChange => false,
            Self::Committed => true,
        }
    }
}

/// Result of asking for the most recent turn to be taken back.
///
/// `NoHistory` and `QuotaExhausted` are expected game events, not
/// failures; callers probe for them to grey out an undo control.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum UndoOutcome {
    Undone,
    NoHistory,
    QuotaExhausted,
}

impl UndoOutcome {
    pub const fn was_undone(self) -> bool {
        matches!(self, Self::Undone)
    }
}
