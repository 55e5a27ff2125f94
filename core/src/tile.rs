use serde::{Deserialize, Serialize};

/// Identifier of a player: the uppercase letter it carries on the board.
/// Boxes store the id of the player they belong to.
pub type PlayerId = char;

/// Canonical cell content tracked by the push engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    Empty,
    Wall,
    Box(PlayerId),
    Player(PlayerId),
}

impl Tile {
    /// Walls never relocate and empty cells hold nothing to relocate.
    pub const fn is_movable(self) -> bool {
        matches!(self, Self::Box(_) | Self::Player(_))
    }

    pub const fn is_box(self) -> bool {
        matches!(self, Self::Box(_))
    }

    /// Owning player of a box, or the id a player tile carries itself.
    pub const fn owner(self) -> Option<PlayerId> {
        match self {
            Self::Box(id) | Self::Player(id) => Some(id),
            Self::Empty | Self::Wall => None,
        }
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::Empty
    }
}
