use alloc::vec::Vec;
use core::mem;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

/// Governs when the undo budget is spent.
///
/// Rule sets for this family of puzzles disagree here, so the engine
/// keeps it a policy choice instead of a law: charge each successful
/// revert, or charge each sealed turn and let reverts ride on whatever
/// budget remains.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotaSpend {
    PerUndo,
    PerCheckpoint,
}

impl Default for QuotaSpend {
    fn default() -> Self {
        Self::PerUndo
    }
}

/// One tracked relocation: the cell a tile occupied when the current
/// turn opened, that tile itself, and the cell it sits in now.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Displacement {
    origin: Coord2,
    tile: Tile,
    at: Coord2,
}

/// Every relocation of one turn, keyed by origin. Within a batch all
/// origins are distinct and all current cells are distinct.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Batch {
    steps: SmallVec<[Displacement; 4]>,
}

impl Batch {
    fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn len(&self) -> usize {
        self.steps.len()
    }

    /// Folds an elementary move into the batch. A tile this batch has
    /// already relocated keeps its original origin and only updates
    /// where it sits, so `A -> B` followed by `B -> C` collapses to the
    /// single pair `A -> C`.
    fn record(&mut self, from: Coord2, tile: Tile, to: Coord2) {
        match self.steps.iter_mut().find(|step| step.at == from) {
            Some(step) => step.at = to,
            None => self.steps.push(Displacement {
                origin: from,
                tile,
                at: to,
            }),
        }
    }

    /// Writes the batch onto `tiles` in two phases: every origin cell is
    /// cleared before any destination is written. One relocation's
    /// target may be another's origin, so single-step writes would lose
    /// tiles.
    fn apply_to(&self, tiles: &mut Array2<Tile>) {
        for step in &self.steps {
            tiles[step.origin.to_nd_index()] = Tile::Empty;
        }
        for step in &self.steps {
            tiles[step.at.to_nd_index()] = step.tile;
        }
    }

    /// Inverse of [`Batch::apply_to`], with the same two-phase
    /// discipline: restores every tracked tile to its origin.
    fn revert_on(&self, tiles: &mut Array2<Tile>) {
        for step in &self.steps {
            tiles[step.at.to_nd_index()] = Tile::Empty;
        }
        for step in &self.steps {
            tiles[step.origin.to_nd_index()] = step.tile;
        }
    }
}

/// Mutable per-session state of one puzzle: the live tile map, the
/// in-progress turn, the history of sealed turns, and the remaining
/// undo budget.
///
/// The engine owns its tile map exclusively; collaborators see it only
/// through queries and the mutation entry points below.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PushEngine {
    layout: BoardLayout,
    tiles: Array2<Tile>,
    pending: Batch,
    history: Vec<Batch>,
    undos_left: UndoQuota,
    quota_spend: QuotaSpend,
}

impl PushEngine {
    pub fn new(layout: BoardLayout) -> Self {
        Self::with_quota_spend(layout, QuotaSpend::default())
    }

    pub fn with_quota_spend(layout: BoardLayout, quota_spend: QuotaSpend) -> Self {
        let tiles = layout.tiles().clone();
        let undos_left = layout.undo_quota();
        Self {
            layout,
            tiles,
            pending: Batch::default(),
            history: Vec::new(),
            undos_left,
            quota_spend,
        }
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn size(&self) -> Coord2 {
        self.layout.size()
    }

    pub fn tile_at(&self, coords: Coord2) -> Tile {
        self.tiles[coords.to_nd_index()]
    }

    pub fn undos_left(&self) -> UndoQuota {
        self.undos_left
    }

    /// Number of sealed turns currently available to take back.
    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    /// Number of tiles the in-progress turn has relocated so far.
    pub fn pending_steps(&self) -> usize {
        self.pending.len()
    }

    /// Relocates the tile at `from` to `to` as one elementary move of
    /// the in-progress turn. Step legality (adjacency, pushability,
    /// collision) must already be settled by the caller.
    ///
    /// Panics when `from` or `to` lies outside the board or `from`
    /// holds nothing movable; such a call is a bug in the caller, not a
    /// game event.
    pub fn move_tile(&mut self, from: Coord2, to: Coord2) {
        let (width, height) = self.size();
        assert!(
            from.0 < width && from.1 < height,
            "move source {from:?} is outside the {width}x{height} board",
        );
        assert!(
            to.0 < width && to.1 < height,
            "move target {to:?} is outside the {width}x{height} board",
        );
        let moved = self.tile_at(from);
        assert!(
            moved.is_movable(),
            "move source {from:?} holds {moved:?}, which cannot relocate",
        );

        // live map == turn-open map with the whole batch applied, for
        // any order the caller issues overlapping moves in
        self.pending.revert_on(&mut self.tiles);
        self.pending.record(from, moved, to);
        self.pending.apply_to(&mut self.tiles);
    }

    /// Seals the in-progress turn into the undo history. Sealing an
    /// empty turn is a no-op that never grows the history.
    pub fn checkpoint(&mut self) -> CommitOutcome {
        if self.pending.is_empty() {
            return CommitOutcome::NoChange;
        }

        if matches!(self.quota_spend, QuotaSpend::PerCheckpoint) {
            self.undos_left.spend();
        }
        log::debug!(
            "sealed turn of {} displacement(s), history depth now {}",
            self.pending.len(),
            self.history.len() + 1
        );
        self.history.push(mem::take(&mut self.pending));
        CommitOutcome::Committed
    }

    /// Takes back the most recent turn. An in-progress turn is sealed
    /// first, so a mid-turn undo reverts exactly the moves made since
    /// the last checkpoint. Refusals leave the engine untouched and are
    /// reported through the outcome, never by failing.
    pub fn undo(&mut self) -> UndoOutcome {
        let _ = self.checkpoint();

        if !self.undos_left.is_available() {
            log::debug!("undo refused, quota exhausted");
            return UndoOutcome::QuotaExhausted;
        }
        let Some(batch) = self.history.pop() else {
            return UndoOutcome::NoHistory;
        };

        batch.revert_on(&mut self.tiles);
        if matches!(self.quota_spend, QuotaSpend::PerUndo) {
            self.undos_left.spend();
        }
        log::debug!(
            "reverted turn of {} displacement(s), history depth now {}",
            batch.len(),
            self.history.len()
        );
        UndoOutcome::Undone
    }

    /// True while every goal cell holds a box, whoever owns it. Pure
    /// query over the live map, valid mid-turn.
    pub fn is_solved(&self) -> bool {
        self.layout
            .goals()
            .iter()
            .all(|&coords| self.tile_at(coords).is_box())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn engine(text: &str) -> PushEngine {
        PushEngine::new(text.parse().unwrap())
    }

    fn snapshot(engine: &PushEngine) -> Vec<Tile> {
        let (width, height) = engine.size();
        let mut cells = Vec::new();
        for y in 0..height {
            for x in 0..width {
                cells.push(engine.tile_at((x, y)));
            }
        }
        cells
    }

    const CORRIDOR: &str = "2\n#####\n#Aa@#\n#####";
    const LONG_CORRIDOR: &str = "1\n######\n#Aa.@#\n######";
    const TWO_PLAYERS: &str = "-1\n#######\n#A.a@.#\n#.b@B.#\n#######";

    #[test]
    fn push_into_vacated_cell_loses_nothing() {
        let mut engine = engine(CORRIDOR);

        // One push: the box advances and the player takes the cell the
        // box just left, all within one turn.
        engine.move_tile((2, 1), (3, 1));
        engine.move_tile((1, 1), (2, 1));

        assert_eq!(engine.tile_at((1, 1)), Tile::Empty);
        assert_eq!(engine.tile_at((2, 1)), Tile::Player('A'));
        assert_eq!(engine.tile_at((3, 1)), Tile::Box('A'));

        let tiles = snapshot(&engine);
        assert_eq!(tiles.iter().filter(|tile| tile.is_box()).count(), 1);
        assert_eq!(
            tiles
                .iter()
                .filter(|tile| matches!(tile, Tile::Player(_)))
                .count(),
            1
        );
    }

    #[test]
    fn undo_restores_overlapping_relocations() {
        let mut engine = engine(CORRIDOR);

        engine.move_tile((2, 1), (3, 1));
        engine.move_tile((1, 1), (2, 1));
        assert!(engine.checkpoint().has_update());

        assert!(engine.undo().was_undone());
        assert_eq!(engine.tile_at((1, 1)), Tile::Player('A'));
        assert_eq!(engine.tile_at((2, 1)), Tile::Box('A'));
        assert_eq!(engine.tile_at((3, 1)), Tile::Empty);
    }

    #[test]
    fn double_push_collapses_to_one_displacement() {
        let mut engine = engine(LONG_CORRIDOR);

        // The same box moves twice within one turn.
        engine.move_tile((2, 1), (3, 1));
        engine.move_tile((3, 1), (4, 1));

        assert_eq!(engine.pending_steps(), 1);
        assert_eq!(engine.tile_at((2, 1)), Tile::Empty);
        assert_eq!(engine.tile_at((3, 1)), Tile::Empty);
        assert_eq!(engine.tile_at((4, 1)), Tile::Box('A'));

        engine.checkpoint();
        engine.undo();

        // Back to the start of the turn, not the midpoint.
        assert_eq!(engine.tile_at((2, 1)), Tile::Box('A'));
        assert_eq!(engine.tile_at((3, 1)), Tile::Empty);
        assert_eq!(engine.tile_at((4, 1)), Tile::Empty);
    }

    #[test]
    fn undo_restores_every_cell_of_the_turn() {
        let mut engine = engine(TWO_PLAYERS);
        let before = snapshot(&engine);

        // A full turn: player A steps right, pushes its box onto the
        // goal, and follows into the vacated cell.
        engine.move_tile((1, 1), (2, 1));
        engine.move_tile((3, 1), (4, 1));
        engine.move_tile((2, 1), (3, 1));
        engine.checkpoint();

        assert_ne!(snapshot(&engine), before);
        assert!(engine.undo().was_undone());
        assert_eq!(snapshot(&engine), before);
    }

    #[test]
    fn empty_checkpoint_never_grows_history() {
        let mut engine = engine(CORRIDOR);

        assert_eq!(engine.checkpoint(), CommitOutcome::NoChange);
        assert_eq!(engine.history_depth(), 0);

        engine.move_tile((2, 1), (3, 1));
        engine.checkpoint();
        assert_eq!(engine.history_depth(), 1);

        assert_eq!(engine.checkpoint(), CommitOutcome::NoChange);
        assert_eq!(engine.history_depth(), 1);
        assert_eq!(engine.undos_left(), UndoQuota::Limited(2));
    }

    #[test]
    fn exhausted_quota_refuses_and_changes_nothing() {
        let mut engine = engine("0\n#####\n#Aa@#\n#####");

        engine.move_tile((2, 1), (3, 1));
        engine.checkpoint();
        let before = snapshot(&engine);

        assert_eq!(engine.undo(), UndoOutcome::QuotaExhausted);
        assert_eq!(engine.history_depth(), 1);
        assert_eq!(snapshot(&engine), before);
        assert_eq!(engine.undos_left().remaining(), Some(0));
    }

    #[test]
    fn undo_without_history_reports_no_history() {
        let mut engine = engine(TWO_PLAYERS);

        assert_eq!(engine.undo(), UndoOutcome::NoHistory);
    }

    #[test]
    fn mid_turn_undo_seals_and_reverts_the_partial_turn() {
        let mut engine = engine(TWO_PLAYERS);
        let before = snapshot(&engine);

        engine.move_tile((1, 1), (2, 1));
        engine.move_tile((3, 1), (4, 1));

        assert!(engine.undo().was_undone());
        assert_eq!(snapshot(&engine), before);
        assert_eq!(engine.history_depth(), 0);
        assert_eq!(engine.pending_steps(), 0);
    }

    #[test]
    fn quota_counts_down_per_undo() {
        let mut engine = engine(CORRIDOR);

        engine.move_tile((2, 1), (3, 1));
        engine.checkpoint();
        engine.undo();

        assert_eq!(engine.undos_left(), UndoQuota::Limited(1));
    }

    #[test]
    fn per_checkpoint_policy_spends_on_seal() {
        let layout: BoardLayout = CORRIDOR.parse().unwrap();
        let mut engine = PushEngine::with_quota_spend(layout, QuotaSpend::PerCheckpoint);

        engine.move_tile((2, 1), (3, 1));
        engine.checkpoint();
        assert_eq!(engine.undos_left(), UndoQuota::Limited(1));

        // Reverting rides on the remaining budget without spending it.
        assert!(engine.undo().was_undone());
        assert_eq!(engine.undos_left(), UndoQuota::Limited(1));

        engine.move_tile((2, 1), (3, 1));
        engine.checkpoint();
        engine.move_tile((1, 1), (2, 1));
        engine.checkpoint();
        assert_eq!(engine.undos_left(), UndoQuota::Limited(0));
        assert_eq!(engine.undo(), UndoOutcome::QuotaExhausted);
    }

    #[test]
    fn solved_tracks_goals_in_any_order_and_unsolves() {
        let mut engine = engine(TWO_PLAYERS);
        assert!(!engine.is_solved());
        assert!(engine.layout().is_goal((4, 1)));

        engine.move_tile((2, 2), (3, 2));
        assert!(!engine.is_solved());

        engine.move_tile((3, 1), (4, 1));
        assert!(engine.is_solved());

        engine.move_tile((4, 1), (5, 1));
        assert!(!engine.is_solved());
    }

    #[test]
    fn snapshot_round_trip_resumes_play() {
        let mut engine = engine(TWO_PLAYERS);
        engine.move_tile((3, 1), (4, 1));
        engine.checkpoint();

        let json = serde_json::to_string(&engine).unwrap();
        let mut fork: PushEngine = serde_json::from_str(&json).unwrap();
        assert_eq!(fork, engine);

        // The fork explores its own line without touching the original.
        assert!(fork.undo().was_undone());
        assert_eq!(fork.tile_at((3, 1)), Tile::Box('A'));
        assert_eq!(engine.tile_at((4, 1)), Tile::Box('A'));
    }

    #[test]
    #[should_panic(expected = "outside the")]
    fn moving_out_of_bounds_panics() {
        let mut engine = engine(CORRIDOR);
        engine.move_tile((2, 1), (200, 1));
    }

    #[test]
    #[should_panic(expected = "cannot relocate")]
    fn moving_a_wall_panics() {
        let mut engine = engine(CORRIDOR);
        engine.move_tile((0, 0), (1, 1));
    }
}
