//! Series Core - Monte Carlo simulation of NBA playoff series.
//!
//! Games are scored as Poisson counts of made baskets built from each
//! team's home/road splits, blended with per-season regression weights.
//! Series, full brackets and historical backtests are layered on top.

pub mod aggregate;
pub mod backtest;
pub mod bracket;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod matchup;
pub mod overrides;
pub mod rng;
pub mod series;
pub mod splits;
pub mod weights;
pub mod win_prob;

pub use aggregate::{aggregate, aggregate_tally, SeriesPrediction, SeriesTally, TieBreak};
pub use backtest::{assign_team1, BacktestHarness, BacktestReport, BacktestRow, HistoricalSeriesRecord};
pub use bracket::{BracketResult, BracketRunner, Conference, ConferenceSeeds, PlayoffRound, RoundResult};
pub use config::SimulationConfig;
pub use error::{DataError, Result, SimError};
pub use matchup::{SeriesModel, SeriesOutcome};
pub use overrides::{HomeCourtOverrides, Team1Side};
pub use rng::RandomSource;
pub use series::{play_series, simulate_series, SeriesDistribution, SeriesLength, SeriesSide, SeriesTrialResult};
pub use splits::{SplitStore, TeamSplitRecord, Venue};
pub use weights::{estimate_weights, GameRecord, SeasonWeights, WeightTable};
pub use win_prob::{approximate_win_prob, calculate_expected_scores, simulate_game_win_prob, GameModel};
