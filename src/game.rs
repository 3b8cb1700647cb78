use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reference board dimensions
pub const DEFAULT_ROWS: usize = 4;
pub const DEFAULT_COLUMNS: usize = 4;

/// Largest board a config may ask for
pub const MAX_CELLS: usize = 4096;

/// Index into the configured player list
pub type PlayerId = usize;

/// A grid coordinate. Cells never own anything; they only address the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Cell { row, col }
    }

    /// Four-neighbour adjacency: exactly one coordinate differs, and by exactly one.
    pub fn is_adjacent(&self, other: Cell) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }

    /// Orthogonal neighbours in the order below, above, right, left.
    /// Cells past the far edges are not filtered here; the board rejects them.
    pub fn neighbors(self) -> impl Iterator<Item = Cell> {
        let Cell { row, col } = self;
        [
            row.checked_add(1).map(|r| Cell::new(r, col)),
            row.checked_sub(1).map(|r| Cell::new(r, col)),
            col.checked_add(1).map(|c| Cell::new(row, c)),
            col.checked_sub(1).map(|c| Cell::new(row, c)),
        ]
        .into_iter()
        .flatten()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The occupant of a cell. Pieces never move; only their owner changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub cell: Cell,
    pub owner: PlayerId,
}

impl Piece {
    pub fn new(cell: Cell, owner: PlayerId) -> Self {
        Piece { cell, owner }
    }

    /// Whether the active player may pick this piece as an attacker
    pub fn is_attacker(&self, current_player: PlayerId) -> bool {
        self.owner == current_player
    }

    /// Whether the active player may target this piece
    pub fn is_defender(&self, current_player: PlayerId) -> bool {
        !self.is_attacker(current_player)
    }

    pub fn is_adjacent(&self, cell: Cell) -> bool {
        self.cell.is_adjacent(cell)
    }
}

/// An attacker/defender pair chosen for combat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    pub attacker: Cell,
    pub defender: Cell,
}

impl Attack {
    pub fn new(attacker: Cell, defender: Cell) -> Self {
        Attack { attacker, defender }
    }
}

impl fmt::Display for Attack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.attacker, self.defender)
    }
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid board: {0}")]
    InvalidBoard(String),
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// The grid and its pieces, stored row-major so a cell maps to one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    rows: usize,
    columns: usize,
    pieces: Vec<Piece>,
}

impl Board {
    /// Deal a freshly shuffled board for `player_count` players
    pub fn deal<R: Rng + ?Sized>(
        rows: usize,
        columns: usize,
        player_count: usize,
        rng: &mut R,
    ) -> Self {
        let mut owners = ownership_sequence(rows * columns, player_count);
        owners.shuffle(rng);
        Self::place(rows, columns, owners)
    }

    /// Build a board from a row-major list of owners
    pub fn from_owners(
        rows: usize,
        columns: usize,
        owners: Vec<PlayerId>,
    ) -> Result<Self, GameError> {
        if rows == 0 || columns == 0 {
            return Err(GameError::InvalidBoard(format!(
                "{}x{} board has no cells",
                rows, columns
            )));
        }
        if rows.checked_mul(columns) != Some(owners.len()) {
            return Err(GameError::InvalidBoard(format!(
                "expected one owner per cell of a {}x{} board, got {}",
                rows,
                columns,
                owners.len()
            )));
        }
        Ok(Self::place(rows, columns, owners))
    }

    fn place(rows: usize, columns: usize, owners: Vec<PlayerId>) -> Self {
        let pieces = owners
            .into_iter()
            .enumerate()
            .map(|(i, owner)| Piece::new(Cell::new(i / columns, i % columns), owner))
            .collect();

        Board {
            rows,
            columns,
            pieces,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn total_pieces(&self) -> usize {
        self.pieces.len()
    }

    /// All pieces in row-major order
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.columns
    }

    fn index_of(&self, cell: Cell) -> Option<usize> {
        self.contains(cell)
            .then(|| cell.row * self.columns + cell.col)
    }

    /// The piece occupying `cell`, or `None` for off-board coordinates
    pub fn piece_at(&self, cell: Cell) -> Option<&Piece> {
        self.index_of(cell).and_then(|i| self.pieces.get(i))
    }

    pub fn owner_at(&self, cell: Cell) -> Option<PlayerId> {
        self.piece_at(cell).map(|p| p.owner)
    }

    pub(crate) fn set_owner(&mut self, cell: Cell, owner: PlayerId) {
        if let Some(i) = self.index_of(cell) {
            self.pieces[i].owner = owner;
        }
    }

    /// Both cells hold pieces and they share an owner
    pub fn is_ally(&self, of: Cell, other: Cell) -> bool {
        match (self.piece_at(of), self.piece_at(other)) {
            (Some(a), Some(b)) => a.owner == b.owner,
            _ => false,
        }
    }

    /// Both cells hold pieces and their owners differ
    pub fn is_enemy(&self, of: Cell, other: Cell) -> bool {
        match (self.piece_at(of), self.piece_at(other)) {
            (Some(a), Some(b)) => a.owner != b.owner,
            _ => false,
        }
    }

    /// Neighbouring cells owned by the same player as `cell`
    pub fn adjacent_allies(&self, cell: Cell) -> Vec<Cell> {
        cell.neighbors()
            .filter(|&n| self.is_ally(cell, n))
            .collect()
    }

    /// Ally bonus used in combat. Recomputed from scratch on every call.
    pub fn count_adjacent_allies(&self, cell: Cell) -> usize {
        cell.neighbors().filter(|&n| self.is_ally(cell, n)).count()
    }

    /// Neighbouring cells owned by someone else. Only used for highlighting.
    pub fn adjacent_enemies(&self, cell: Cell) -> Vec<Cell> {
        cell.neighbors()
            .filter(|&n| self.is_enemy(cell, n))
            .collect()
    }

    pub fn count_adjacent_enemies(&self, cell: Cell) -> usize {
        cell.neighbors().filter(|&n| self.is_enemy(cell, n)).count()
    }

    pub fn pieces_owned_by(&self, player: PlayerId) -> usize {
        self.pieces.iter().filter(|p| p.owner == player).count()
    }

    /// True iff every piece belongs to `player`.
    /// Checked after a capture, where only the attacker can have just won.
    pub fn is_won_by(&self, player: PlayerId) -> bool {
        self.pieces.iter().all(|p| p.owner == player)
    }

    /// The player owning every piece, if there is one.
    /// Checked at turn start, where no attack nominates a candidate.
    pub fn winner(&self) -> Option<PlayerId> {
        let first = self.pieces.first()?.owner;
        self.is_won_by(first).then_some(first)
    }

    pub fn is_game_over(&self) -> bool {
        self.winner().is_some()
    }

    /// Every (own piece, adjacent enemy piece) pair available to `player`
    pub fn legal_attacks(&self, player: PlayerId) -> Vec<Attack> {
        self.pieces
            .iter()
            .filter(|p| p.is_attacker(player))
            .flat_map(|p| {
                p.cell
                    .neighbors()
                    .filter_map(|n| self.piece_at(n))
                    .filter(|d| d.is_defender(player))
                    .map(|d| Attack::new(p.cell, d.cell))
            })
            .collect()
    }

    /// Get a string representation of the board
    pub fn display_board(&self) -> String {
        let mut result = String::new();
        result.push_str("   ");
        for col in 0..self.columns {
            result.push_str(&format!("{:2} ", col));
        }
        result.push('\n');

        for row in 0..self.rows {
            result.push_str(&format!("{:2} ", row));
            for col in 0..self.columns {
                match self.owner_at(Cell::new(row, col)) {
                    Some(owner) => result.push_str(&format!("{:2} ", owner)),
                    None => result.push_str(" . "),
                }
            }
            result.push('\n');
        }

        result
    }
}

/// Owners before shuffling. Ownership cycles from the last player down to the
/// first, so later players pick up the leftovers when the split is uneven.
/// With two players the second player owns every even index.
pub fn ownership_sequence(total_pieces: usize, player_count: usize) -> Vec<PlayerId> {
    if player_count == 0 {
        return Vec::new();
    }
    (0..total_pieces)
        .map(|i| player_count - 1 - i % player_count)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Helper to build a board from a compact row-major owner list
    fn board(rows: usize, columns: usize, owners: &[PlayerId]) -> Board {
        Board::from_owners(rows, columns, owners.to_vec()).unwrap()
    }

    #[test]
    fn test_adjacency_is_orthogonal_only() {
        let c = Cell::new(1, 1);
        assert!(c.is_adjacent(Cell::new(0, 1)));
        assert!(c.is_adjacent(Cell::new(2, 1)));
        assert!(c.is_adjacent(Cell::new(1, 0)));
        assert!(c.is_adjacent(Cell::new(1, 2)));

        assert!(!c.is_adjacent(c));
        assert!(!c.is_adjacent(Cell::new(0, 0)));
        assert!(!c.is_adjacent(Cell::new(2, 2)));
        assert!(!c.is_adjacent(Cell::new(1, 3)));
    }

    proptest! {
        #[test]
        fn prop_adjacent_iff_manhattan_distance_one(
            r1 in 0usize..8, c1 in 0usize..8, r2 in 0usize..8, c2 in 0usize..8
        ) {
            let a = Cell::new(r1, c1);
            let b = Cell::new(r2, c2);
            let manhattan = r1.abs_diff(r2) + c1.abs_diff(c2);
            prop_assert_eq!(a.is_adjacent(b), manhattan == 1);
            prop_assert_eq!(a.is_adjacent(b), b.is_adjacent(a));
        }
    }

    #[test]
    fn test_neighbors_do_not_wrap() {
        let corner: Vec<Cell> = Cell::new(0, 0).neighbors().collect();
        assert_eq!(corner, vec![Cell::new(1, 0), Cell::new(0, 1)]);

        let middle: Vec<Cell> = Cell::new(2, 2).neighbors().collect();
        assert_eq!(middle.len(), 4);
        assert!(middle.iter().all(|n| n.is_adjacent(Cell::new(2, 2))));
    }

    #[test]
    fn test_piece_at_rejects_off_board() {
        let b = board(2, 2, &[0, 1, 1, 0]);
        assert_eq!(b.piece_at(Cell::new(1, 0)).map(|p| p.owner), Some(1));
        assert!(b.piece_at(Cell::new(2, 0)).is_none());
        assert!(b.piece_at(Cell::new(0, 2)).is_none());
    }

    #[test]
    fn test_row_major_layout_on_rectangular_board() {
        let b = board(2, 3, &[0, 0, 0, 1, 1, 1]);
        for piece in b.pieces() {
            let expected = if piece.cell.row == 0 { 0 } else { 1 };
            assert_eq!(piece.owner, expected, "wrong owner at {}", piece.cell);
        }
        assert_eq!(b.pieces()[4].cell, Cell::new(1, 1));
    }

    #[test]
    fn test_from_owners_validates_length() {
        assert!(Board::from_owners(2, 2, vec![0, 1, 0]).is_err());
        assert!(Board::from_owners(0, 3, Vec::new()).is_err());
    }

    #[test]
    fn test_attacker_and_defender_classification() {
        let p = Piece::new(Cell::new(0, 0), 1);
        assert!(p.is_attacker(1));
        assert!(!p.is_defender(1));
        assert!(p.is_defender(0));
        assert!(!p.is_attacker(0));
    }

    #[test]
    fn test_ally_and_enemy_counts() {
        // 0 0 1
        // 0 1 1
        // 1 0 0
        let b = board(3, 3, &[0, 0, 1, 0, 1, 1, 1, 0, 0]);

        assert_eq!(b.count_adjacent_allies(Cell::new(0, 0)), 2);
        assert_eq!(b.count_adjacent_enemies(Cell::new(0, 0)), 0);

        assert_eq!(b.count_adjacent_allies(Cell::new(1, 1)), 1);
        assert_eq!(b.count_adjacent_enemies(Cell::new(1, 1)), 3);

        let mut allies = b.adjacent_allies(Cell::new(1, 2));
        allies.sort_by_key(|c| (c.row, c.col));
        assert_eq!(allies, vec![Cell::new(0, 2), Cell::new(1, 1)]);
        assert_eq!(b.adjacent_enemies(Cell::new(1, 2)), vec![Cell::new(2, 2)]);
    }

    #[test]
    fn test_ally_requires_pieces_on_both_cells() {
        let b = board(1, 2, &[0, 0]);
        assert!(b.is_ally(Cell::new(0, 0), Cell::new(0, 1)));
        assert!(!b.is_ally(Cell::new(0, 0), Cell::new(1, 0)));
        assert!(!b.is_enemy(Cell::new(0, 0), Cell::new(1, 0)));
    }

    #[test]
    fn test_game_over_checks() {
        let won = board(2, 2, &[1, 1, 1, 1]);
        assert!(won.is_won_by(1));
        assert!(!won.is_won_by(0));
        assert_eq!(won.winner(), Some(1));
        assert!(won.is_game_over());

        let open = board(2, 2, &[1, 1, 1, 0]);
        assert!(!open.is_won_by(1));
        assert!(!open.is_won_by(0));
        assert_eq!(open.winner(), None);
        assert!(!open.is_game_over());
    }

    #[test]
    fn test_capture_can_end_the_game() {
        let mut b = board(1, 2, &[0, 1]);
        assert!(!b.is_won_by(0));
        b.set_owner(Cell::new(0, 1), 0);
        assert!(b.is_won_by(0));
    }

    #[test]
    fn test_legal_attacks_are_adjacent_enemy_pairs() {
        // 0 1
        // 0 0
        let b = board(2, 2, &[0, 1, 0, 0]);
        let mut attacks = b.legal_attacks(0);
        attacks.sort_by_key(|a| (a.attacker.row, a.attacker.col));
        assert_eq!(
            attacks,
            vec![
                Attack::new(Cell::new(0, 0), Cell::new(0, 1)),
                Attack::new(Cell::new(1, 1), Cell::new(0, 1)),
            ]
        );
        assert_eq!(b.legal_attacks(1).len(), 2);
    }

    #[test]
    fn test_ownership_sequence_two_players() {
        assert_eq!(ownership_sequence(4, 2), vec![1, 0, 1, 0]);
        // Odd board: the second player gets the extra piece
        let odd = ownership_sequence(9, 2);
        assert_eq!(odd.iter().filter(|&&o| o == 1).count(), 5);
        assert_eq!(odd.iter().filter(|&&o| o == 0).count(), 4);
    }

    #[test]
    fn test_ownership_sequence_three_players() {
        let seq = ownership_sequence(10, 3);
        assert_eq!(seq.iter().filter(|&&o| o == 0).count(), 3);
        assert_eq!(seq.iter().filter(|&&o| o == 1).count(), 3);
        assert_eq!(seq.iter().filter(|&&o| o == 2).count(), 4);
    }

    #[test]
    fn test_deal_fills_every_cell_once() {
        let mut rng = StdRng::seed_from_u64(7);
        let b = Board::deal(DEFAULT_ROWS, DEFAULT_COLUMNS, 2, &mut rng);

        assert_eq!(b.total_pieces(), 16);
        for row in 0..DEFAULT_ROWS {
            for col in 0..DEFAULT_COLUMNS {
                let cell = Cell::new(row, col);
                let occupants = b.pieces().iter().filter(|p| p.cell == cell).count();
                assert_eq!(occupants, 1, "cell {} occupied {} times", cell, occupants);
            }
        }
        assert_eq!(b.pieces_owned_by(0), 8);
        assert_eq!(b.pieces_owned_by(1), 8);
    }

    #[test]
    fn test_deal_shuffles_ownership() {
        let mut rng = StdRng::seed_from_u64(42);
        let deals: Vec<Board> = (0..200)
            .map(|_| Board::deal(DEFAULT_ROWS, DEFAULT_COLUMNS, 2, &mut rng))
            .collect();

        for i in 0..16 {
            let owned_by_zero = deals.iter().filter(|b| b.pieces()[i].owner == 0).count();
            // Each cell should land with both players a fair share of the time
            assert!(
                (50..=150).contains(&owned_by_zero),
                "cell {} owned by player 0 in {} of 200 deals",
                i,
                owned_by_zero
            );
        }
    }

    #[test]
    fn test_display_board() {
        let b = board(2, 2, &[0, 1, 1, 0]);
        let text = b.display_board();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().nth(1).unwrap().contains(" 0  1"));
    }
}
