use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use ndarray::Array2;

use crate::*;

/// Parses the text form of a puzzle: an undo quota line followed by the
/// grid rows.
///
/// The quota is a decimal integer, `-1` meaning unlimited. In the grid,
/// `#` is a wall, `@` a goal, `.` or space floor, an uppercase letter a
/// player, and a lowercase letter a box owned by the matching player.
/// Rows may be ragged; missing trailing cells are floor.
pub fn parse(text: &str) -> Result<BoardLayout> {
    let mut lines = text.lines();
    let quota_line = lines.next().ok_or(FormatError::MissingQuota)?.trim();
    let quota = if quota_line == "-1" {
        UndoQuota::Unlimited
    } else {
        match quota_line.parse::<CellCount>() {
            Ok(limit) => UndoQuota::Limited(limit),
            Err(_) => return Err(FormatError::MalformedQuota),
        }
    };

    let rows: Vec<&str> = lines.collect();
    let height = rows.len();
    let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(FormatError::EmptyBoard);
    }
    let width: Coord = width.try_into().map_err(|_| FormatError::BoardTooLarge)?;
    let height: Coord = height.try_into().map_err(|_| FormatError::BoardTooLarge)?;

    let mut tiles: Array2<Tile> = Array2::default((width, height).to_nd_index());
    let mut goals = BTreeSet::new();
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let coords = (x as Coord, y as Coord);
            match ch {
                '#' => tiles[coords.to_nd_index()] = Tile::Wall,
                '@' => {
                    goals.insert(coords);
                }
                '.' | ' ' => {}
                'A'..='Z' => tiles[coords.to_nd_index()] = Tile::Player(ch),
                'a'..='z' => tiles[coords.to_nd_index()] = Tile::Box(ch.to_ascii_uppercase()),
                other => return Err(FormatError::InvalidTile(other)),
            }
        }
    }

    BoardLayout::new(tiles, goals, quota)
}

impl core::str::FromStr for BoardLayout {
    type Err = FormatError;

    fn from_str(text: &str) -> Result<Self> {
        parse(text)
    }
}
