use thiserror::Error;

use crate::{CellCount, PlayerId};

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Missing undo quota line")]
    MissingQuota,
    #[error("Undo quota must be an integer no smaller than -1")]
    MalformedQuota,
    #[error("Board has no cells")]
    EmptyBoard,
    #[error("Board exceeds the supported coordinate range")]
    BoardTooLarge,
    #[error("Invalid board character {0:?}")]
    InvalidTile(char),
    #[error("Goal outside the board bounds")]
    GoalOutOfBounds,
    #[error("Board has no players")]
    NoPlayers,
    #[error("Duplicate player {0:?}")]
    DuplicatePlayer(PlayerId),
    #[error("Box owner {0:?} has no matching player")]
    OrphanedBox(PlayerId),
    #[error("Player {0:?} has no box to push")]
    PlayerWithoutBox(PlayerId),
    #[error("{boxes} box(es) cannot fill {goals} goal(s)")]
    GoalMismatch { boxes: CellCount, goals: CellCount },
}

pub type Result<T> = core::result::Result<T, FormatError>;
