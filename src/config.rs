use crate::bot::BotKind;
use crate::game::{DEFAULT_COLUMNS, DEFAULT_ROWS, GameError, MAX_CELLS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Colours the renderer paints a player's pieces with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerColors {
    pub fill: String,
    pub selected: String,
    pub ally: String,
}

impl PlayerColors {
    pub fn new(fill: &str, selected: &str, ally: &str) -> Self {
        PlayerColors {
            fill: fill.to_string(),
            selected: selected.to_string(),
            ally: ally.to_string(),
        }
    }
}

impl Default for PlayerColors {
    fn default() -> Self {
        PlayerColors::new("#333333", "#555555", "#444444")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub name: String,
    pub human: bool,
    pub colors: PlayerColors,
}

impl PlayerConfig {
    pub fn human(name: &str, colors: PlayerColors) -> Self {
        PlayerConfig {
            name: name.to_string(),
            human: true,
            colors,
        }
    }

    pub fn computer(name: &str, colors: PlayerColors) -> Self {
        PlayerConfig {
            name: name.to_string(),
            human: false,
            colors,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig::computer("Player", PlayerColors::default())
    }
}

/// Pauses before a human may click and before the computer moves.
/// These only pace the game for a viewer; zero delays play identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    pub human_input_delay_ms: u64,
    pub computer_move_delay_ms: u64,
    /// Divides both delays
    pub game_speed: u32,
}

impl Pacing {
    /// No pauses at all
    pub fn instant() -> Self {
        Pacing {
            human_input_delay_ms: 0,
            computer_move_delay_ms: 0,
            game_speed: 1,
        }
    }

    pub fn human_input_delay(&self) -> Duration {
        self.scaled(self.human_input_delay_ms)
    }

    pub fn computer_move_delay(&self) -> Duration {
        self.scaled(self.computer_move_delay_ms)
    }

    fn scaled(&self, millis: u64) -> Duration {
        Duration::from_millis(millis / u64::from(self.game_speed.max(1)))
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing {
            human_input_delay_ms: 750,
            computer_move_delay_ms: 1500,
            game_speed: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub rows: usize,
    pub columns: usize,
    /// Turn order; the first player moves first
    pub players: Vec<PlayerConfig>,
    pub pacing: Pacing,
    pub bot: BotKind,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            players: vec![
                PlayerConfig::human("Blue", PlayerColors::new("#002FA7", "#8098D4", "#4063BD")),
                PlayerConfig::computer(
                    "Orange",
                    PlayerColors::new("#CC6600", "#E6B380", "#D98D40"),
                ),
            ],
            pacing: Pacing::default(),
            bot: BotKind::default(),
        }
    }
}

impl GameConfig {
    /// Load and validate a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GameError> {
        let text = fs::read_to_string(path)?;
        let config: GameConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.rows == 0 || self.columns == 0 {
            return Err(GameError::InvalidConfig(format!(
                "board must have at least one cell, got {}x{}",
                self.rows, self.columns
            )));
        }
        match self.rows.checked_mul(self.columns) {
            Some(cells) if cells <= MAX_CELLS => {}
            _ => {
                return Err(GameError::InvalidConfig(format!(
                    "board is limited to {} cells, got {}x{}",
                    MAX_CELLS, self.rows, self.columns
                )));
            }
        }
        if self.players.len() < 2 {
            return Err(GameError::InvalidConfig(format!(
                "at least two players are required, got {}",
                self.players.len()
            )));
        }
        if self.pacing.game_speed == 0 {
            return Err(GameError::InvalidConfig(
                "game speed must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn total_pieces(&self) -> usize {
        self.rows * self.columns
    }

    /// Same game with every seat taken by the computer
    pub fn with_computer_players(mut self) -> Self {
        for player in &mut self.players {
            player.human = false;
        }
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_the_reference_game() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.total_pieces(), 16);
        assert_eq!(config.players.len(), 2);
        assert!(config.players[0].human);
        assert!(!config.players[1].human);
        assert_eq!(config.players[0].name, "Blue");
        assert_eq!(config.players[1].colors.fill, "#CC6600");
    }

    #[test]
    fn test_validation_rejects_bad_configs() {
        let mut config = GameConfig::default();
        config.rows = 0;
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));

        let mut config = GameConfig::default();
        config.players.truncate(1);
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.pacing.game_speed = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_caps_board_size() {
        let mut config = GameConfig::default();
        config.rows = usize::MAX;
        config.columns = 2;
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));

        config.rows = MAX_CELLS;
        config.columns = 2;
        assert!(config.validate().is_err());

        config.rows = 1;
        config.columns = MAX_CELLS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{ "rows": 3, "bot": "enumerating" }"#).unwrap();
        assert_eq!(config.rows, 3);
        assert_eq!(config.columns, DEFAULT_COLUMNS);
        assert_eq!(config.bot, BotKind::Enumerating);
        assert_eq!(config.players, GameConfig::default().players);
    }

    #[test]
    fn test_game_speed_shortens_delays() {
        let pacing = Pacing {
            game_speed: 3,
            ..Pacing::default()
        };
        assert_eq!(pacing.human_input_delay(), Duration::from_millis(250));
        assert_eq!(pacing.computer_move_delay(), Duration::from_millis(500));
        assert_eq!(Pacing::instant().computer_move_delay(), Duration::ZERO);
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = GameConfig::load("/nonexistent/diceland.json").unwrap_err();
        assert!(matches!(err, GameError::Io(_)));
    }

    #[test]
    fn test_with_computer_players() {
        let config = GameConfig::default().with_computer_players();
        assert!(config.players.iter().all(|p| !p.human));
    }
}
