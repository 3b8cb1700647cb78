use crate::config::GameConfig;
use crate::controller::{Game, GameEvent};
use crate::game::{GameError, PlayerId};
use serde::Serialize;
use tracing::info;

pub struct MatchConfig {
    /// Give up after this many resolved attacks
    pub max_attacks: usize,
    pub verbose: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            max_attacks: 10_000,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MatchResult {
    Won {
        winner: PlayerId,
        winner_name: String,
        attacks: usize,
    },
    Unfinished {
        attacks: usize,
    },
}

impl MatchResult {
    pub fn winner(&self) -> Option<&str> {
        match self {
            MatchResult::Won { winner_name, .. } => Some(winner_name),
            MatchResult::Unfinished { .. } => None,
        }
    }

    pub fn attacks(&self) -> usize {
        match self {
            MatchResult::Won { attacks, .. } | MatchResult::Unfinished { attacks } => *attacks,
        }
    }
}

/// A game played out by computer players only, with no pauses
pub struct Match {
    config: MatchConfig,
    game: Game,
}

impl Match {
    pub fn new(game_config: GameConfig, config: MatchConfig, seed: u64) -> Result<Self, GameError> {
        let game = Game::with_seed(game_config.with_computer_players(), seed)?;
        Ok(Match { config, game })
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn play(&mut self) -> MatchResult {
        if self.config.verbose {
            info!("Initial board:\n{}", self.game.board().display_board());
        }

        while !self.game.is_game_over() && self.game.attacks() < self.config.max_attacks {
            if self.game.fire_next().is_none() {
                break;
            }
            if self.config.verbose {
                self.report_events();
            } else {
                self.game.drain_events();
            }
        }

        let attacks = self.game.attacks();
        match self.game.winner() {
            Some(winner) => MatchResult::Won {
                winner,
                winner_name: self.game.player_name(winner),
                attacks,
            },
            None => {
                if self.config.verbose {
                    info!(max_attacks = self.config.max_attacks, "attack limit reached");
                }
                MatchResult::Unfinished { attacks }
            }
        }
    }

    fn report_events(&mut self) {
        for event in self.game.drain_events() {
            match &event {
                GameEvent::AttackSucceeded { report, .. } | GameEvent::AttackFailed { report, .. } => {
                    info!(
                        "{} ({} + {} vs {} + {}) {}",
                        report.attack,
                        report.rolls.attack,
                        report.attacker_allies,
                        report.rolls.defense,
                        report.defender_allies,
                        event.message()
                    );
                }
                _ => info!("{}", event.message()),
            }
        }
    }
}

/// Win tallies over a batch of seeded matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    /// Wins per player, in turn order
    pub wins: Vec<(String, usize)>,
    pub unfinished: usize,
    pub total_attacks: usize,
}

impl SimulationSummary {
    pub fn games(&self) -> usize {
        self.wins.iter().map(|(_, w)| w).sum::<usize>() + self.unfinished
    }

    pub fn display(&self) {
        println!("\nSimulation Results:");
        println!("===================");
        let games = self.games().max(1);
        for (name, wins) in &self.wins {
            println!(
                "{:<12} {:>6} wins ({:.1}%)",
                name,
                wins,
                *wins as f64 * 100.0 / games as f64
            );
        }
        println!("{:<12} {:>6}", "Unfinished", self.unfinished);
        println!(
            "Average attacks per game: {:.1}",
            self.total_attacks as f64 / games as f64
        );
    }
}

/// Play `games` matches with seeds `seed`, `seed + 1`, ...
pub fn simulate(
    game_config: &GameConfig,
    games: usize,
    seed: u64,
    max_attacks: usize,
) -> Result<SimulationSummary, GameError> {
    game_config.validate()?;
    let mut summary = SimulationSummary {
        wins: game_config
            .players
            .iter()
            .map(|p| (p.name.clone(), 0))
            .collect(),
        unfinished: 0,
        total_attacks: 0,
    };

    for i in 0..games {
        let config = MatchConfig {
            max_attacks,
            verbose: false,
        };
        let mut game = Match::new(game_config.clone(), config, seed.wrapping_add(i as u64))?;
        let result = game.play();
        summary.total_attacks += result.attacks();
        match result {
            MatchResult::Won { winner, .. } => summary.wins[winner].1 += 1,
            MatchResult::Unfinished { .. } => summary.unfinished += 1,
        }
    }

    info!(games, unfinished = summary.unfinished, "simulation finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Pacing;

    #[test]
    fn test_match_finishes_with_a_winner() {
        let mut game = Match::new(GameConfig::default(), MatchConfig::default(), 21).unwrap();
        let result = game.play();

        let MatchResult::Won { winner, attacks, .. } = &result else {
            panic!("match did not finish: {:?}", result);
        };
        assert!(game.game().board().is_won_by(*winner));
        assert_eq!(*attacks, game.game().attacks());
        assert!(result.winner().is_some());
    }

    #[test]
    fn test_match_ignores_configured_delays() {
        // Default pacing would sleep for seconds in a real front-end
        let config = GameConfig::default().with_pacing(Pacing::default());
        let mut game = Match::new(config, MatchConfig::default(), 22).unwrap();
        assert!(matches!(game.play(), MatchResult::Won { .. }));
    }

    #[test]
    fn test_attack_limit_stops_the_match() {
        let config = MatchConfig {
            max_attacks: 1,
            verbose: true,
        };
        let mut game = Match::new(GameConfig::default(), config, 23).unwrap();
        let result = game.play();
        assert_eq!(result, MatchResult::Unfinished { attacks: 1 });
        assert_eq!(result.winner(), None);
    }

    #[test]
    fn test_quiet_match_keeps_no_events() {
        let mut game = Match::new(GameConfig::default(), MatchConfig::default(), 24).unwrap();
        game.play();
        assert!(game.game.drain_events().is_empty());
    }

    #[test]
    fn test_simulation_counts_every_game() {
        let summary = simulate(&GameConfig::default(), 20, 100, 10_000).unwrap();
        assert_eq!(summary.games(), 20);
        assert_eq!(summary.wins.len(), 2);
        assert_eq!(summary.wins[0].0, "Blue");
        assert!(summary.total_attacks >= 20);
    }

    #[test]
    fn test_simulation_rejects_invalid_config() {
        let mut config = GameConfig::default();
        config.columns = 0;
        assert!(simulate(&config, 1, 0, 10).is_err());
    }
}
