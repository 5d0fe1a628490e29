use tracing::debug;

use crate::aggregate::{aggregate, SeriesPrediction};
use crate::config::SimulationConfig;
use crate::error::{Result, SimError};
use crate::rng::RandomSource;
use crate::series::{simulate_series, SeriesLength};
use crate::splits::{SplitStore, Venue};
use crate::weights::WeightTable;
use crate::win_prob::simulate_game_win_prob;

/// A simulated matchup with the per-venue game probabilities behind it.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesOutcome {
    pub year: i32,
    pub team1: String,
    pub team2: String,
    pub games: u8,
    pub team1_home_win_prob: f64,
    pub team1_away_win_prob: f64,
    pub prediction: SeriesPrediction,
}

impl SeriesOutcome {
    pub fn winner(&self) -> &str {
        &self.prediction.winner
    }
}

/// Predicts single series from season splits and regression weights.
#[derive(Clone, Copy, Debug)]
pub struct SeriesModel<'a> {
    splits: &'a SplitStore,
    weights: &'a WeightTable,
    config: &'a SimulationConfig,
}

impl<'a> SeriesModel<'a> {
    pub fn new(splits: &'a SplitStore, weights: &'a WeightTable, config: &'a SimulationConfig) -> Self {
        SeriesModel {
            splits,
            weights,
            config,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        self.config
    }

    /// Team 1's single-game win probability at home and on the road.
    pub fn venue_win_probs(&self, team1: &str, team2: &str, year: i32, source: &RandomSource) -> Result<(f64, f64)> {
        let weights = self.weights.get(year)?;
        let team1_home = self.splits.get(team1, year, Venue::Home)?;
        let team1_visitor = self.splits.get(team1, year, Venue::Visitor)?;
        let team2_home = self.splits.get(team2, year, Venue::Home)?;
        let team2_visitor = self.splits.get(team2, year, Venue::Visitor)?;

        let trials = self.config.game_trials;
        let home = simulate_game_win_prob(team1_home, team2_visitor, &weights, trials, &source.derive(0))?;
        let away = 1.0 - simulate_game_win_prob(team2_home, team1_visitor, &weights, trials, &source.derive(1))?;

        debug!(team1, team2, year, home, away, "venue win probabilities");
        Ok((home, away))
    }

    /// Simulate `team1` (home court) against `team2` and summarize the result.
    pub fn predict(
        &self,
        team1: &str,
        team2: &str,
        year: i32,
        length: SeriesLength,
        source: &RandomSource,
    ) -> Result<SeriesOutcome> {
        self.config.validate()?;
        if team1 == team2 {
            return Err(SimError::config(format!("{} cannot play itself in {}", team1, year)));
        }

        let (home, away) = self.venue_win_probs(team1, team2, year, source)?;
        let distribution = simulate_series(home, away, length, self.config.series_trials, &source.derive(2))?;
        let prediction = aggregate(&distribution, team1, team2, self.config.tie_break)?;

        debug!(
            team1,
            team2,
            year,
            winner = %prediction.winner,
            probability = prediction.winner_probability,
            games = prediction.predicted_games,
            "series predicted"
        );

        Ok(SeriesOutcome {
            year,
            team1: team1.to_string(),
            team2: team2.to_string(),
            games: length.max_games(),
            team1_home_win_prob: home,
            team1_away_win_prob: away,
            prediction,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::aggregate::TieBreak;
    use crate::error::DataError;
    use crate::splits::TeamSplitRecord;
    use crate::weights::SeasonWeights;

    /// Splits for `teams`, strongest first, all in `year`.
    pub(crate) fn ladder_splits(year: i32, teams: &[&str]) -> SplitStore {
        let mut records = Vec::new();
        for (i, team) in teams.iter().enumerate() {
            let edge = (teams.len() - i) as f64;
            let made = [6.0 + 0.2 * edge, 28.0 + 0.5 * edge, 16.0 + 0.3 * edge];
            let allowed = [8.0 - 0.2 * edge, 32.0 - 0.5 * edge, 20.0 - 0.3 * edge];
            // Slightly better at home
            let home_made = [made[0] + 0.2, made[1] + 0.4, made[2] + 0.4];
            records.push(TeamSplitRecord::new(team, year, Venue::Home, home_made, allowed));
            records.push(TeamSplitRecord::new(team, year, Venue::Visitor, made, allowed));
        }
        SplitStore::from_records(records).unwrap()
    }

    pub(crate) fn fixed_weights(year: i32) -> WeightTable {
        let mut table = WeightTable::new();
        table.insert(SeasonWeights::new(year, 0.6, 0.4));
        table
    }

    pub(crate) fn fast_config() -> SimulationConfig {
        SimulationConfig {
            game_trials: 3000,
            series_trials: 3001,
            seed: Some(7),
            tie_break: TieBreak::HomeCourt,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_stronger_team_predicted() {
        let splits = ladder_splits(2010, &["Spurs", "Kings"]);
        let weights = fixed_weights(2010);
        let config = fast_config();
        let model = SeriesModel::new(&splits, &weights, &config);

        let outcome = model
            .predict("Spurs", "Kings", 2010, SeriesLength::BestOf7, &RandomSource::new(1))
            .unwrap();
        assert_eq!(outcome.winner(), "Spurs");
        assert!(outcome.team1_home_win_prob > outcome.team1_away_win_prob);
        assert!(outcome.prediction.winner_probability > 0.5);
        assert!((4..=7).contains(&outcome.prediction.predicted_games));
        assert_eq!(outcome.games, 7);
    }

    #[test]
    fn test_missing_split_reports_team() {
        let splits = ladder_splits(2010, &["Spurs"]);
        let weights = fixed_weights(2010);
        let config = fast_config();
        let model = SeriesModel::new(&splits, &weights, &config);

        let err = model
            .predict("Spurs", "Kings", 2010, SeriesLength::BestOf7, &RandomSource::new(1))
            .unwrap_err();
        match err {
            SimError::Data(DataError::MissingSplit { team, year, .. }) => {
                assert_eq!(team, "Kings");
                assert_eq!(year, 2010);
            }
            other => panic!("expected missing split, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_weights_is_data_error() {
        let splits = ladder_splits(2011, &["Spurs", "Kings"]);
        let weights = fixed_weights(2010);
        let config = fast_config();
        let model = SeriesModel::new(&splits, &weights, &config);

        let err = model
            .predict("Spurs", "Kings", 2011, SeriesLength::BestOf7, &RandomSource::new(1))
            .unwrap_err();
        assert!(matches!(err, SimError::Data(DataError::MissingWeights { year: 2011 })));
    }

    #[test]
    fn test_self_matchup_rejected() {
        let splits = ladder_splits(2010, &["Spurs"]);
        let weights = fixed_weights(2010);
        let config = fast_config();
        let model = SeriesModel::new(&splits, &weights, &config);

        let err = model
            .predict("Spurs", "Spurs", 2010, SeriesLength::BestOf5, &RandomSource::new(1))
            .unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));
    }

    #[test]
    fn test_reproducible_with_same_source() {
        let splits = ladder_splits(2010, &["Spurs", "Kings"]);
        let weights = fixed_weights(2010);
        let config = fast_config();
        let model = SeriesModel::new(&splits, &weights, &config);
        let source = RandomSource::new(99);

        let a = model.predict("Spurs", "Kings", 2010, SeriesLength::BestOf5, &source).unwrap();
        let b = model.predict("Spurs", "Kings", 2010, SeriesLength::BestOf5, &source).unwrap();
        assert_eq!(a, b);
    }
}
