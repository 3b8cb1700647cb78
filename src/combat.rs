//! Dice combat between two adjacent pieces.
//!
//! Each side rolls one die and adds one point per adjacent ally. The attacker
//! needs a strictly higher total; ties go to the defender.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::{Attack, Board, PlayerId};

/// Faces on a combat die
pub const DIE_FACES: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRolls {
    pub attack: u8,
    pub defense: u8,
}

impl AttackRolls {
    pub fn new(attack: u8, defense: u8) -> Self {
        AttackRolls { attack, defense }
    }

    /// Two independent uniform rolls in `1..=6`
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        AttackRolls {
            attack: rng.gen_range(1..=DIE_FACES),
            defense: rng.gen_range(1..=DIE_FACES),
        }
    }
}

/// Outcome of one resolved attack, with everything the UI needs to show the dice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackReport {
    pub attack: Attack,
    pub attacker_owner: PlayerId,
    pub defender_owner: PlayerId,
    pub rolls: AttackRolls,
    pub attacker_allies: usize,
    pub defender_allies: usize,
    pub captured: bool,
}

impl AttackReport {
    pub fn attack_total(&self) -> usize {
        usize::from(self.rolls.attack) + self.attacker_allies
    }

    pub fn defense_total(&self) -> usize {
        usize::from(self.rolls.defense) + self.defender_allies
    }
}

pub fn attack_succeeds(rolls: AttackRolls, attacker_allies: usize, defender_allies: usize) -> bool {
    usize::from(rolls.attack) + attacker_allies > usize::from(rolls.defense) + defender_allies
}

/// Resolve `attack` for `current_player` with the given rolls, capturing the
/// defending cell on success.
///
/// The caller guarantees the attacker belongs to `current_player`, the
/// defender does not, and the two cells are adjacent. Breaking any of these
/// is a bug in the caller and panics.
pub fn resolve_attack(
    board: &mut Board,
    attack: Attack,
    current_player: PlayerId,
    rolls: AttackRolls,
) -> AttackReport {
    let Some(attacker_owner) = board.owner_at(attack.attacker) else {
        panic!("attacker {} is off the board", attack.attacker);
    };
    let Some(defender_owner) = board.owner_at(attack.defender) else {
        panic!("defender {} is off the board", attack.defender);
    };
    assert_eq!(
        attacker_owner, current_player,
        "attacker {} does not belong to player {}",
        attack.attacker, current_player
    );
    assert_ne!(
        defender_owner, current_player,
        "defender {} already belongs to player {}",
        attack.defender, current_player
    );
    assert!(
        attack.attacker.is_adjacent(attack.defender),
        "attack {} is not between adjacent cells",
        attack
    );

    // Ally bonuses are taken from the board as it stands before the capture
    let attacker_allies = board.count_adjacent_allies(attack.attacker);
    let defender_allies = board.count_adjacent_allies(attack.defender);
    let captured = attack_succeeds(rolls, attacker_allies, defender_allies);

    if captured {
        board.set_owner(attack.defender, current_player);
    }

    AttackReport {
        attack,
        attacker_owner,
        defender_owner,
        rolls,
        attacker_allies,
        defender_allies,
        captured,
    }
}
