//! Turn sequencing, selection handling and pending actions for one game.
//!
//! All state transitions are synchronous. Delays between turns are modelled as
//! a single [`Pending`] action that the front-end fires once its timer runs
//! out; a reset invalidates whatever was pending for the previous game.

use crate::bot::{Bot, create_bot};
use crate::combat::{self, AttackReport, AttackRolls};
use crate::config::{GameConfig, PlayerConfig};
use crate::game::{Attack, Board, Cell, GameError, Piece, PlayerId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TurnState {
    AwaitingHumanInput,
    ComputerThinking,
    GameOver,
}

/// The pieces picked for the next attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Selection {
    pub attacker: Option<Cell>,
    pub defender: Option<Cell>,
}

impl Selection {
    pub fn clear(&mut self) {
        *self = Selection::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PendingAction {
    /// Start accepting clicks from the human player
    EnableInput,
    /// Let the computer player make its attack
    ComputerMove,
}

/// Identifies one scheduled action of one game instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingToken {
    generation: u64,
    sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub token: PendingToken,
    pub action: PendingAction,
    pub delay: Duration,
}

/// Outcome notifications for the status line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameEvent {
    GameStarted {
        player_name: String,
    },
    AttackSucceeded {
        winner_name: String,
        loser_name: String,
        report: AttackReport,
    },
    AttackFailed {
        winner_name: String,
        loser_name: String,
        report: AttackReport,
    },
    GameOver {
        winner_name: String,
    },
}

impl GameEvent {
    pub fn message(&self) -> String {
        match self {
            GameEvent::GameStarted { player_name } => {
                format!("You're {}. Click a square to begin.", player_name)
            }
            GameEvent::AttackSucceeded { winner_name, .. } => {
                format!("Success! {} gets the square.", winner_name)
            }
            GameEvent::AttackFailed { winner_name, .. } => {
                format!("Attack failed. {} keeps the square.", winner_name)
            }
            GameEvent::GameOver { winner_name } => {
                format!("Game over, man. Game over! {} owns the board.", winner_name)
            }
        }
    }
}

/// Cells the renderer should emphasise
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub attacker: Option<Cell>,
    pub attacker_allies: Vec<Cell>,
    pub attacker_enemies: Vec<Cell>,
    /// Piece under the cursor that a click would select
    pub candidate: Option<Cell>,
    pub candidate_allies: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ClickOutcome {
    /// Input is disabled or the click changed nothing
    Ignored,
    Deselected,
    AttackerSelected { highlight: Highlight },
    Attacked { report: AttackReport },
}

pub struct Game {
    config: GameConfig,
    board: Board,
    current_player: PlayerId,
    selection: Selection,
    state: TurnState,
    input_enabled: bool,
    pending: Option<Pending>,
    generation: u64,
    sequence: u64,
    events: Vec<GameEvent>,
    attacks: usize,
    bot: Box<dyn Bot>,
    rng: StdRng,
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("board", &self.board)
            .field("current_player", &self.current_player)
            .field("selection", &self.selection)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("bot", &self.bot.name())
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Start a new game seeded from the OS
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Start a reproducible game
    pub fn with_seed(config: GameConfig, seed: u64) -> Result<Self, GameError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: GameConfig, mut rng: StdRng) -> Result<Self, GameError> {
        config.validate()?;
        let board = Board::deal(config.rows, config.columns, config.players.len(), &mut rng);
        Ok(Self::start(config, board, rng))
    }

    /// Start from a prepared board instead of a random deal
    pub fn with_board(config: GameConfig, board: Board, seed: u64) -> Result<Self, GameError> {
        config.validate()?;
        if board.rows() != config.rows || board.columns() != config.columns {
            return Err(GameError::InvalidBoard(format!(
                "board is {}x{} but the config asks for {}x{}",
                board.rows(),
                board.columns(),
                config.rows,
                config.columns
            )));
        }
        if let Some(piece) = board.pieces().iter().find(|p| p.owner >= config.players.len()) {
            return Err(GameError::InvalidBoard(format!(
                "piece at {} belongs to unknown player {}",
                piece.cell, piece.owner
            )));
        }
        Ok(Self::start(config, board, StdRng::seed_from_u64(seed)))
    }

    fn start(config: GameConfig, board: Board, rng: StdRng) -> Self {
        let bot = create_bot(config.bot);
        let mut game = Game {
            config,
            board,
            current_player: 0,
            selection: Selection::default(),
            state: TurnState::AwaitingHumanInput,
            input_enabled: false,
            pending: None,
            generation: 0,
            sequence: 0,
            events: Vec::new(),
            attacks: 0,
            bot,
            rng,
        };
        game.begin();
        game
    }

    fn begin(&mut self) {
        self.events.push(GameEvent::GameStarted {
            player_name: self.player_name(0),
        });
        self.start_turn(Some(0));
    }

    /// Throw away the current game and deal a new one
    pub fn reset_game(&mut self) {
        let board = Board::deal(
            self.config.rows,
            self.config.columns,
            self.config.players.len(),
            &mut self.rng,
        );
        self.restart(board);
    }

    fn restart(&mut self, board: Board) {
        info!(generation = self.generation + 1, "resetting game");

        // Anything scheduled for the old game must never fire
        self.generation += 1;
        self.sequence = 0;
        self.pending = None;

        self.selection.clear();
        self.input_enabled = false;
        self.events.clear();
        self.attacks = 0;
        self.current_player = 0;
        self.board = board;
        self.begin();
    }

    /// Swap in a new configuration and start over
    pub fn reconfigure(&mut self, config: GameConfig) -> Result<(), GameError> {
        config.validate()?;
        let board = Board::deal(config.rows, config.columns, config.players.len(), &mut self.rng);
        self.bot = create_bot(config.bot);
        self.config = config;
        self.restart(board);
        Ok(())
    }

    fn start_turn(&mut self, explicit: Option<PlayerId>) {
        if let Some(winner) = self.board.winner() {
            self.finish(winner);
            return;
        }

        self.current_player = match explicit {
            Some(id) => self.first_with_pieces(id),
            None => self.first_with_pieces(self.current_player + 1),
        };
        self.input_enabled = false;

        if self.config.players[self.current_player].human {
            self.state = TurnState::AwaitingHumanInput;
            let delay = self.config.pacing.human_input_delay();
            self.schedule(PendingAction::EnableInput, delay);
        } else {
            self.state = TurnState::ComputerThinking;
            let delay = self.config.pacing.computer_move_delay();
            self.schedule(PendingAction::ComputerMove, delay);
        }
        debug!(player = self.current_player, state = ?self.state, "turn started");
    }

    /// `from` or the first player after it in turn order who still owns a piece
    fn first_with_pieces(&self, from: PlayerId) -> PlayerId {
        let count = self.config.players.len();
        (0..count)
            .map(|step| (from + step) % count)
            .find(|&id| self.board.pieces_owned_by(id) > 0)
            .unwrap_or(from % count)
    }

    fn finish(&mut self, winner: PlayerId) {
        self.state = TurnState::GameOver;
        self.pending = None;
        self.input_enabled = false;
        self.selection.clear();
        let winner_name = self.player_name(winner);
        info!(winner = %winner_name, attacks = self.attacks, "game over");
        self.events.push(GameEvent::GameOver { winner_name });
    }

    fn schedule(&mut self, action: PendingAction, delay: Duration) {
        self.sequence += 1;
        self.pending = Some(Pending {
            token: PendingToken {
                generation: self.generation,
                sequence: self.sequence,
            },
            action,
            delay,
        });
    }

    /// Fire the pending action if `token` still refers to it.
    /// Returns false for stale tokens, which leave the game untouched.
    pub fn fire_pending(&mut self, token: PendingToken) -> bool {
        let Some(pending) = self.pending.filter(|p| p.token == token) else {
            debug!(?token, "ignoring stale pending action");
            return false;
        };
        self.pending = None;

        match pending.action {
            PendingAction::EnableInput => self.input_enabled = true,
            PendingAction::ComputerMove => self.play_computer_turn(),
        }
        true
    }

    /// Fire whatever is pending right away, ignoring its delay
    pub fn fire_next(&mut self) -> Option<PendingAction> {
        let pending = self.pending?;
        self.fire_pending(pending.token);
        Some(pending.action)
    }

    /// Fire pending actions back to back until the game waits on a human
    /// click or ends. Returns how many actions fired.
    pub fn settle(&mut self) -> usize {
        let mut fired = 0;
        while self.fire_next().is_some() {
            fired += 1;
        }
        fired
    }

    fn play_computer_turn(&mut self) {
        let player = self.current_player;
        match self.bot.select_attack(&self.board, player, &mut self.rng) {
            Some(attack) => {
                debug!(player, %attack, bot = self.bot.name(), "computer attacks");
                self.selection = Selection {
                    attacker: Some(attack.attacker),
                    defender: Some(attack.defender),
                };
                self.execute_attack(attack);
            }
            None => {
                warn!(player, "computer player has no legal attack, passing");
                self.start_turn(None);
            }
        }
    }

    fn execute_attack(&mut self, attack: Attack) -> AttackReport {
        let rolls = AttackRolls::roll(&mut self.rng);
        let report = combat::resolve_attack(&mut self.board, attack, self.current_player, rolls);
        self.attacks += 1;

        let attacker_name = self.player_name(report.attacker_owner);
        let defender_name = self.player_name(report.defender_owner);
        debug!(
            %attack,
            attack_total = report.attack_total(),
            defense_total = report.defense_total(),
            captured = report.captured,
            "attack resolved"
        );
        self.events.push(if report.captured {
            GameEvent::AttackSucceeded {
                winner_name: attacker_name,
                loser_name: defender_name,
                report,
            }
        } else {
            GameEvent::AttackFailed {
                winner_name: defender_name,
                loser_name: attacker_name,
                report,
            }
        });

        self.selection.clear();
        // Only a capture can end the game, and only in the attacker's favour
        if report.captured && self.board.is_won_by(self.current_player) {
            self.finish(self.current_player);
        } else {
            self.start_turn(None);
        }
        report
    }

    /// Handle a click on `cell`; `None` means the click landed off the board
    pub fn handle_cell_clicked(&mut self, cell: Option<Cell>) -> ClickOutcome {
        if !self.accepts_input() {
            return ClickOutcome::Ignored;
        }

        let Some(piece) = cell.and_then(|c| self.board.piece_at(c)).copied() else {
            self.selection.clear();
            return ClickOutcome::Deselected;
        };
        let current = self.current_player;
        let selected = self.selection.attacker;

        match selected {
            Some(attacker) if attacker == piece.cell => {
                self.selection.clear();
                ClickOutcome::Deselected
            }
            Some(attacker) if piece.is_defender(current) && attacker.is_adjacent(piece.cell) => {
                self.selection.defender = Some(piece.cell);
                let report = self.execute_attack(Attack::new(attacker, piece.cell));
                ClickOutcome::Attacked { report }
            }
            _ if piece.is_attacker(current) => {
                self.selection = Selection {
                    attacker: Some(piece.cell),
                    defender: None,
                };
                ClickOutcome::AttackerSelected {
                    highlight: self.selection_highlight(),
                }
            }
            previous => {
                self.selection.clear();
                if previous.is_some() {
                    ClickOutcome::Deselected
                } else {
                    ClickOutcome::Ignored
                }
            }
        }
    }

    /// Highlighting for the cursor resting on `cell`
    pub fn handle_cell_hovered(&self, cell: Option<Cell>) -> Highlight {
        if !self.accepts_input() {
            return Highlight::default();
        }

        let hovered: Option<&Piece> = cell.and_then(|c| self.board.piece_at(c));
        let current = self.current_player;

        match self.selection.attacker {
            None => match hovered {
                Some(piece) if piece.is_attacker(current) => Highlight {
                    candidate: Some(piece.cell),
                    candidate_allies: self.board.adjacent_allies(piece.cell),
                    ..Highlight::default()
                },
                _ => Highlight::default(),
            },
            Some(attacker) => {
                let mut highlight = self.selection_highlight();
                if let Some(piece) =
                    hovered.filter(|p| p.is_defender(current) && attacker.is_adjacent(p.cell))
                {
                    highlight.candidate = Some(piece.cell);
                    highlight.candidate_allies = self.board.adjacent_allies(piece.cell);
                }
                highlight
            }
        }
    }

    fn selection_highlight(&self) -> Highlight {
        match self.selection.attacker {
            Some(attacker) => Highlight {
                attacker: Some(attacker),
                attacker_allies: self.board.adjacent_allies(attacker),
                attacker_enemies: self.board.adjacent_enemies(attacker),
                ..Highlight::default()
            },
            None => Highlight::default(),
        }
    }

    /// Whether a click would currently be acted on
    pub fn accepts_input(&self) -> bool {
        self.state == TurnState::AwaitingHumanInput && self.input_enabled
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Every cell with its owner, row-major, for a full redraw
    pub fn board_snapshot(&self) -> Vec<Piece> {
        self.board.pieces().to_vec()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn players(&self) -> &[PlayerConfig] {
        &self.config.players
    }

    pub fn player_name(&self, id: PlayerId) -> String {
        self.config
            .players
            .get(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("Player {}", id))
    }

    pub fn current_player(&self) -> PlayerId {
        self.current_player
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_game_over(&self) -> bool {
        self.state == TurnState::GameOver
    }

    pub fn winner(&self) -> Option<PlayerId> {
        if self.is_game_over() {
            self.board.winner()
        } else {
            None
        }
    }

    pub fn pending(&self) -> Option<Pending> {
        self.pending
    }

    /// Attacks resolved since the last reset
    pub fn attacks(&self) -> usize {
        self.attacks
    }

    /// Take the notifications produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
