use crate::game::{Attack, Board, Piece, PlayerId};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Trait that all computer players must implement
pub trait Bot: Send {
    /// Get the name of the bot
    fn name(&self) -> &str;

    /// Pick an attack for `player` on the current board.
    /// Returns `None` only when the player has no legal attack at all.
    fn select_attack(
        &mut self,
        board: &Board,
        player: PlayerId,
        rng: &mut dyn RngCore,
    ) -> Option<Attack>;
}

/// Which move-selection strategy computer players use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotKind {
    /// Rejection sampling over random piece draws
    #[default]
    Random,
    /// Uniform choice over an enumerated list of legal attacks
    Enumerating,
}

pub fn create_bot(kind: BotKind) -> Box<dyn Bot> {
    match kind {
        BotKind::Random => Box::new(RandomBot::new("Random Bot".to_string())),
        BotKind::Enumerating => Box::new(EnumeratingBot::new("Enumerating Bot".to_string())),
    }
}

/// Draws random pieces until it holds an own piece next to an enemy piece.
///
/// Each round draws an attacker among the player's pieces and a defender
/// among everyone else's, then throws both away unless they touch. This
/// terminates with probability 1 on a connected, fully populated board but
/// has no bounded worst case, which is acceptable for small boards.
pub struct RandomBot {
    name: String,
}

impl RandomBot {
    pub fn new(name: String) -> Self {
        RandomBot { name }
    }
}

impl Bot for RandomBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn select_attack(
        &mut self,
        board: &Board,
        player: PlayerId,
        rng: &mut dyn RngCore,
    ) -> Option<Attack> {
        // Without pieces on both sides the draws below would never finish
        let owned = board.pieces_owned_by(player);
        if owned == 0 || owned == board.total_pieces() {
            return None;
        }

        let mut rounds = 0usize;
        loop {
            rounds += 1;
            let attacker = draw_piece(board, rng, |p| p.is_attacker(player));
            let defender = draw_piece(board, rng, |p| p.is_defender(player));
            if attacker.is_adjacent(defender.cell) {
                trace!(player, rounds, "random bot found an adjacent pair");
                return Some(Attack::new(attacker.cell, defender.cell));
            }
        }
    }
}

/// Uniformly draw piece indices until one passes `accept`
fn draw_piece<'a>(
    board: &'a Board,
    rng: &mut dyn RngCore,
    accept: impl Fn(&Piece) -> bool,
) -> &'a Piece {
    let pieces = board.pieces();
    loop {
        let piece = &pieces[rng.gen_range(0..pieces.len())];
        if accept(piece) {
            return piece;
        }
    }
}

/// Lists every legal attack and picks one uniformly.
/// Always terminates, even on sparse or degenerate boards.
pub struct EnumeratingBot {
    name: String,
}

impl EnumeratingBot {
    pub fn new(name: String) -> Self {
        EnumeratingBot { name }
    }
}

impl Bot for EnumeratingBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn select_attack(
        &mut self,
        board: &Board,
        player: PlayerId,
        rng: &mut dyn RngCore,
    ) -> Option<Attack> {
        board.legal_attacks(player).choose(rng).copied()
    }
}
