use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::error::{DataError, Result};
use crate::matchup::{SeriesModel, SeriesOutcome};
use crate::overrides::{HomeCourtOverrides, Team1Side};
use crate::rng::RandomSource;
use crate::series::SeriesLength;
use crate::splits::SplitStore;
use crate::weights::{GameRecord, WeightTable};

const FINALS_ROUND: &str = "Finals";
const FIRST_ROUND_MARKER: &str = "First Round";

/// A completed playoff series joined with both teams' regular-season records.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct HistoricalSeriesRecord {
    #[serde(rename = "Round")]
    pub round: String,

    #[serde(rename = "Winner")]
    pub winner: String,

    #[serde(rename = "Loser")]
    pub loser: String,

    #[serde(rename = "seed_winner", deserialize_with = "seed_from_number")]
    pub winner_seed: u32,

    #[serde(rename = "seed_loser", deserialize_with = "seed_from_number")]
    pub loser_seed: u32,

    #[serde(rename = "Pct_winner")]
    pub winner_win_pct: f64,

    #[serde(rename = "Pct_loser")]
    pub loser_win_pct: f64,

    #[serde(rename = "Games")]
    pub games_played: u8,

    #[serde(rename = "YR")]
    pub year: i32,
}

/// Seeds may arrive as floats (`1.0`) from joined tables.
fn seed_from_number<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.fract() != 0.0 || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(serde::de::Error::custom(format!("invalid seed {}", value)));
    }
    Ok(value as u32)
}

impl HistoricalSeriesRecord {
    pub fn is_finals(&self) -> bool {
        self.round == FINALS_ROUND
    }

    pub fn is_first_round(&self) -> bool {
        self.round.contains(FIRST_ROUND_MARKER)
    }

    fn unresolved(&self, reason: &str) -> DataError {
        DataError::UnresolvedTeam1 {
            round: self.round.clone(),
            year: self.year,
            winner: self.winner.clone(),
            loser: self.loser.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Pick the side that had home court, returned as `(team1, team2)`.
///
/// Conference rounds go by seed. The Finals go by regular-season record,
/// with identical records settled by `overrides`.
pub fn assign_team1(record: &HistoricalSeriesRecord, overrides: &HomeCourtOverrides) -> Result<(String, String)> {
    let side = if !record.is_finals() {
        if record.winner_seed < record.loser_seed {
            Team1Side::Winner
        } else if record.loser_seed < record.winner_seed {
            Team1Side::Loser
        } else {
            return Err(record.unresolved("both sides hold the same seed").into());
        }
    } else if record.winner_win_pct > record.loser_win_pct {
        Team1Side::Winner
    } else if record.loser_win_pct > record.winner_win_pct {
        Team1Side::Loser
    } else {
        match overrides.get(record.year) {
            Some(side) => side,
            None => return Err(record.unresolved("equal records and no home-court override").into()),
        }
    };

    Ok(match side {
        Team1Side::Winner => (record.winner.clone(), record.loser.clone()),
        Team1Side::Loser => (record.loser.clone(), record.winner.clone()),
    })
}

/// Keep records whose round name contains `filter`. `None` or `"all"`
/// keeps everything.
pub fn select_round<'r>(records: &'r [HistoricalSeriesRecord], filter: Option<&str>) -> Vec<&'r HistoricalSeriesRecord> {
    match filter {
        None | Some("all") => records.iter().collect(),
        Some(f) => records.iter().filter(|r| r.round.contains(f)).collect(),
    }
}

/// One historical series with the model's prediction alongside it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BacktestRow {
    #[serde(rename = "Round")]
    pub round: String,
    #[serde(rename = "Winner")]
    pub winner: String,
    #[serde(rename = "Loser")]
    pub loser: String,
    #[serde(rename = "seed_winner")]
    pub winner_seed: u32,
    #[serde(rename = "seed_loser")]
    pub loser_seed: u32,
    #[serde(rename = "Pct_winner")]
    pub winner_win_pct: f64,
    #[serde(rename = "Pct_loser")]
    pub loser_win_pct: f64,
    #[serde(rename = "Games")]
    pub games_played: u8,
    #[serde(rename = "YR")]
    pub year: i32,
    #[serde(rename = "Predicted_Winner")]
    pub predicted_winner: Option<String>,
    #[serde(rename = "Predicted_Winner_Pct")]
    pub predicted_winner_pct: Option<f64>,
    #[serde(rename = "Predicted_Games")]
    pub predicted_games: Option<u8>,
    #[serde(rename = "Correct_Winner")]
    pub correct_winner: bool,
    #[serde(rename = "Correct_Games")]
    pub correct_games: bool,
    #[serde(rename = "Error")]
    pub error: Option<String>,
}

impl BacktestRow {
    fn new(record: &HistoricalSeriesRecord, result: std::result::Result<&SeriesOutcome, String>) -> Self {
        let (predicted_winner, predicted_winner_pct, predicted_games, error) = match result {
            Ok(outcome) => (
                Some(outcome.prediction.winner.clone()),
                Some(outcome.prediction.winner_probability),
                Some(outcome.prediction.predicted_games),
                None,
            ),
            Err(e) => (None, None, None, Some(e)),
        };
        BacktestRow {
            correct_winner: predicted_winner.as_deref() == Some(record.winner.as_str()),
            correct_games: predicted_games == Some(record.games_played),
            round: record.round.clone(),
            winner: record.winner.clone(),
            loser: record.loser.clone(),
            winner_seed: record.winner_seed,
            loser_seed: record.loser_seed,
            winner_win_pct: record.winner_win_pct,
            loser_win_pct: record.loser_win_pct,
            games_played: record.games_played,
            year: record.year,
            predicted_winner,
            predicted_winner_pct,
            predicted_games,
            error,
        }
    }

    pub fn simulated(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BacktestReport {
    pub rows: Vec<BacktestRow>,
    /// Share of simulated series whose winner was called correctly
    pub winner_accuracy: f64,
    /// Share of simulated series whose length was called correctly
    pub games_accuracy: f64,
    pub simulated: usize,
    pub failed: usize,
}

impl BacktestReport {
    fn from_rows(rows: Vec<BacktestRow>) -> Self {
        let simulated = rows.iter().filter(|r| r.simulated()).count();
        let failed = rows.len() - simulated;
        let rate = |hits: usize| if simulated == 0 { 0.0 } else { hits as f64 / simulated as f64 };
        let winner_accuracy = rate(rows.iter().filter(|r| r.correct_winner).count());
        let games_accuracy = rate(rows.iter().filter(|r| r.correct_games).count());
        BacktestReport {
            rows,
            winner_accuracy,
            games_accuracy,
            simulated,
            failed,
        }
    }
}

/// Replays recorded series through the model and scores the predictions.
pub struct BacktestHarness<'a> {
    splits: &'a SplitStore,
    games: &'a [GameRecord],
    config: &'a SimulationConfig,
    overrides: HomeCourtOverrides,
}

impl<'a> BacktestHarness<'a> {
    pub fn new(splits: &'a SplitStore, games: &'a [GameRecord], config: &'a SimulationConfig) -> Self {
        BacktestHarness {
            splits,
            games,
            config,
            overrides: HomeCourtOverrides::historical(),
        }
    }

    pub fn with_overrides(mut self, overrides: HomeCourtOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn series_length(&self, record: &HistoricalSeriesRecord) -> SeriesLength {
        self.config.series_length_for(record.is_first_round(), record.year)
    }

    fn simulate(&self, model: &SeriesModel<'_>, record: &HistoricalSeriesRecord, source: &RandomSource) -> Result<SeriesOutcome> {
        let (team1, team2) = assign_team1(record, &self.overrides)?;
        model.predict(&team1, &team2, record.year, self.series_length(record), source)
    }

    /// Simulate every record that passes `round_filter`. A record that fails
    /// is logged and kept in the report with its error.
    pub fn run(
        &self,
        records: &[HistoricalSeriesRecord],
        round_filter: Option<&str>,
        source: &RandomSource,
    ) -> Result<BacktestReport> {
        self.config.validate()?;
        let selected = select_round(records, round_filter);

        let years: Vec<i32> = selected.iter().map(|r| r.year).collect();
        let weights = WeightTable::estimate_years(self.games, &years);
        let model = SeriesModel::new(self.splits, &weights, self.config);

        info!(records = selected.len(), seasons = weights.len(), "starting backtest");
        let done = AtomicUsize::new(0);

        let rows: Vec<BacktestRow> = selected
            .par_iter()
            .enumerate()
            .map(|(i, record)| {
                let result = self.simulate(&model, record, &source.derive(i as u64));
                let row = match &result {
                    Ok(outcome) => BacktestRow::new(record, Ok(outcome)),
                    Err(e) => {
                        warn!(
                            round = %record.round,
                            year = record.year,
                            winner = %record.winner,
                            loser = %record.loser,
                            error = %e,
                            "series skipped"
                        );
                        BacktestRow::new(record, Err(e.to_string()))
                    }
                };

                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                if finished % 10 == 0 {
                    info!(finished, total = selected.len(), "backtest progress");
                }
                row
            })
            .collect();

        let report = BacktestReport::from_rows(rows);
        info!(
            simulated = report.simulated,
            failed = report.failed,
            winner_accuracy = report.winner_accuracy,
            games_accuracy = report.games_accuracy,
            "backtest complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::matchup::tests::{fast_config, ladder_splits};

    fn record(round: &str, winner: (&str, u32, f64), loser: (&str, u32, f64), games: u8, year: i32) -> HistoricalSeriesRecord {
        HistoricalSeriesRecord {
            round: round.to_string(),
            winner: winner.0.to_string(),
            loser: loser.0.to_string(),
            winner_seed: winner.1,
            loser_seed: loser.1,
            winner_win_pct: winner.2,
            loser_win_pct: loser.2,
            games_played: games,
            year,
        }
    }

    #[test]
    fn test_better_seed_is_team1_when_it_won() {
        let r = record("Western Conf First Round", ("Jazz", 1, 0.75), ("Rockets", 8, 0.5), 4, 1997);
        let (team1, team2) = assign_team1(&r, &HomeCourtOverrides::historical()).unwrap();
        assert_eq!(team1, "Jazz");
        assert_eq!(team2, "Rockets");
    }

    #[test]
    fn test_better_seed_is_team1_when_it_lost() {
        // Seed decides home court outside the Finals, whatever the records say
        let r = record("Eastern Conf Semifinals", ("Knicks", 5, 0.7), ("Heat", 1, 0.6), 7, 1997);
        let (team1, _) = assign_team1(&r, &HomeCourtOverrides::historical()).unwrap();
        assert_eq!(team1, "Heat");
    }

    #[test]
    fn test_equal_seeds_outside_finals_unresolved() {
        let r = record("Eastern Conf Finals", ("Bulls", 1, 0.8), ("Magic", 1, 0.7), 4, 1996);
        let err = assign_team1(&r, &HomeCourtOverrides::historical()).unwrap_err();
        assert!(matches!(err, SimError::Data(DataError::UnresolvedTeam1 { .. })));
    }

    #[test]
    fn test_finals_use_win_pct() {
        let r = record("Finals", ("Bulls", 1, 0.878), ("Jazz", 1, 0.780), 6, 1997);
        assert_eq!(assign_team1(&r, &HomeCourtOverrides::historical()).unwrap().0, "Bulls");

        let r = record("Finals", ("Pistons", 1, 0.707), ("Lakers", 1, 0.756), 4, 1989);
        assert_eq!(assign_team1(&r, &HomeCourtOverrides::historical()).unwrap().0, "Lakers");
    }

    #[test]
    fn test_finals_ties_use_year_table() {
        let overrides = HomeCourtOverrides::historical();

        let r = record("Finals", ("Pistons", 1, 0.720), ("Trail Blazers", 1, 0.720), 5, 1990);
        assert_eq!(assign_team1(&r, &overrides).unwrap().0, "Pistons");

        let r = record("Finals", ("Bulls", 1, 0.756), ("Jazz", 1, 0.756), 6, 1998);
        assert_eq!(assign_team1(&r, &overrides).unwrap().0, "Jazz");

        let r = record("Finals", ("Lakers", 1, 0.683), ("76ers", 1, 0.683), 5, 2001);
        assert_eq!(assign_team1(&r, &overrides).unwrap().0, "Lakers");

        let r = record("Finals", ("A", 1, 0.6), ("B", 1, 0.6), 5, 2015);
        assert!(assign_team1(&r, &overrides).is_err());
    }

    #[test]
    fn test_round_filter() {
        let records = vec![
            record("Western Conf First Round", ("A", 1, 0.7), ("B", 8, 0.5), 4, 2010),
            record("Eastern Conf First Round", ("C", 2, 0.6), ("D", 7, 0.5), 5, 2010),
            record("Finals", ("A", 1, 0.7), ("C", 2, 0.6), 6, 2010),
        ];
        assert_eq!(select_round(&records, None).len(), 3);
        assert_eq!(select_round(&records, Some("all")).len(), 3);
        assert_eq!(select_round(&records, Some("First Round")).len(), 2);
        assert_eq!(select_round(&records, Some("Finals")).len(), 1);
    }

    /// Games that make `0.6 * ppg + 0.4 * opp_allowed` fit exactly.
    fn season_games(year: i32) -> Vec<GameRecord> {
        let sides = [(100.0, 98.0), (105.0, 101.0), (96.0, 104.0), (110.0, 95.0)];
        let mut games = Vec::new();
        for (i, &(h_ppg, h_opp)) in sides.iter().enumerate() {
            let (v_ppg, v_opp) = sides[(i + 1) % sides.len()];
            games.push(GameRecord {
                year,
                playoffs: false,
                home: format!("H{}", i),
                visitor: format!("V{}", i),
                home_pts: 0.6 * h_ppg + 0.4 * v_opp,
                visitor_pts: 0.6 * v_ppg + 0.4 * h_opp,
                home_ppg: h_ppg,
                home_opp_ppg: h_opp,
                visitor_ppg: v_ppg,
                visitor_opp_ppg: v_opp,
            });
        }
        games
    }

    #[test]
    fn test_run_scores_predictions_and_keeps_failures() {
        let splits = ladder_splits(2010, &["Lakers", "Celtics", "Suns", "Jazz"]);
        let games = season_games(2010);
        let config = fast_config();
        let harness = BacktestHarness::new(&splits, &games, &config);

        let records = vec![
            record("Western Conf First Round", ("Lakers", 1, 0.7), ("Jazz", 8, 0.5), 5, 2010),
            record("Eastern Conf First Round", ("Celtics", 2, 0.6), ("Suns", 7, 0.5), 6, 2010),
            // No splits for this team, no weights for this year
            record("Western Conf First Round", ("Nobody", 1, 0.6), ("Suns", 8, 0.5), 4, 1985),
        ];

        let report = harness.run(&records, None, &RandomSource::new(12)).unwrap();
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.simulated, 2);
        assert_eq!(report.failed, 1);
        assert!(report.rows[2].error.is_some());
        assert!(!report.rows[2].correct_winner);

        // The clearly stronger team wins its series
        assert_eq!(report.rows[0].predicted_winner.as_deref(), Some("Lakers"));
        assert!(report.rows[0].correct_winner);
        assert!((0.0..=1.0).contains(&report.winner_accuracy));
        assert!((0.0..=1.0).contains(&report.games_accuracy));
        assert!(report.winner_accuracy >= 0.5);
    }

    #[test]
    fn test_run_is_reproducible() {
        let splits = ladder_splits(2010, &["Lakers", "Celtics", "Suns", "Jazz"]);
        let games = season_games(2010);
        let config = fast_config();
        let harness = BacktestHarness::new(&splits, &games, &config);
        let records = vec![
            record("Western Conf Semifinals", ("Suns", 3, 0.6), ("Celtics", 2, 0.62), 7, 2010),
            record("Finals", ("Lakers", 1, 0.7), ("Jazz", 1, 0.6), 6, 2010),
        ];

        let a = harness.run(&records, Some("all"), &RandomSource::new(3)).unwrap();
        let b = harness.run(&records, Some("all"), &RandomSource::new(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pre_cutoff_first_round_is_best_of_five() {
        let splits = SplitStore::new();
        let config = SimulationConfig::default();
        let harness = BacktestHarness::new(&splits, &[], &config);

        let early = record("Eastern Conf First Round", ("A", 1, 0.7), ("B", 8, 0.5), 3, 1999);
        let late = record("Eastern Conf First Round", ("A", 1, 0.7), ("B", 8, 0.5), 4, 2003);
        let semis = record("Eastern Conf Semifinals", ("A", 1, 0.7), ("B", 4, 0.5), 5, 1999);
        assert_eq!(harness.series_length(&early), SeriesLength::BestOf5);
        assert_eq!(harness.series_length(&late), SeriesLength::BestOf7);
        assert_eq!(harness.series_length(&semis), SeriesLength::BestOf7);
    }
}
