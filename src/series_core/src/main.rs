use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use series_core::bracket::BracketRunner;
use series_core::constants::{BEST_OF_FIVE_CUTOFF_YEAR, DEFAULT_GAME_TRIALS, DEFAULT_SERIES_TRIALS};
use series_core::data;
use series_core::{
    estimate_weights, BacktestHarness, RandomSource, SeriesLength, SeriesModel, SimulationConfig, TieBreak,
    WeightTable,
};

/// Monte Carlo NBA playoff series simulator
#[derive(Parser, Debug, Clone)]
#[command(name = "series-sim", version, about)]
struct Cli {
    #[command(flatten)]
    sim: SimArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct SimArgs {
    /// Games simulated per venue pairing
    #[arg(long, global = true, env = "SERIES_SIM_GAME_TRIALS", default_value_t = DEFAULT_GAME_TRIALS)]
    game_trials: usize,

    /// Series simulated per matchup
    #[arg(long, global = true, env = "SERIES_SIM_SERIES_TRIALS", default_value_t = DEFAULT_SERIES_TRIALS)]
    series_trials: usize,

    /// Run seed (random when omitted)
    #[arg(long, global = true, env = "SERIES_SIM_SEED")]
    seed: Option<u64>,

    /// First-round series before this year are best-of-5
    #[arg(long, global = true, env = "SERIES_SIM_CUTOFF", default_value_t = BEST_OF_FIVE_CUTOFF_YEAR)]
    cutoff: i32,

    /// Policy for exactly tied series wins: reject, home-court or lexicographic
    #[arg(long, global = true, env = "SERIES_SIM_TIE_BREAK", default_value = "reject")]
    tie_break: TieBreak,

    /// Force every series to 5 or 7 games
    #[arg(long, global = true, env = "SERIES_SIM_BEST_OF")]
    best_of: Option<u8>,
}

impl SimArgs {
    fn to_config(&self) -> Result<SimulationConfig> {
        let series_length = self
            .best_of
            .map(SeriesLength::from_games)
            .transpose()
            .context("invalid --best-of")?;
        let config = SimulationConfig {
            game_trials: self.game_trials,
            series_trials: self.series_trials,
            seed: self.seed,
            best_of_five_cutoff: self.cutoff,
            tie_break: self.tie_break,
            series_length,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Print the regression weights of one season
    Weights {
        #[arg(long, env = "SERIES_SIM_GAMES")]
        games: PathBuf,
        #[arg(long)]
        year: i32,
    },

    /// Predict a single series; team1 has home court
    Series {
        #[arg(long, env = "SERIES_SIM_SPLITS")]
        splits: PathBuf,
        #[arg(long, env = "SERIES_SIM_GAMES")]
        games: PathBuf,
        #[arg(long)]
        team1: String,
        #[arg(long)]
        team2: String,
        #[arg(long)]
        year: i32,
    },

    /// Simulate a full 16-team bracket
    Bracket {
        #[arg(long, env = "SERIES_SIM_SPLITS")]
        splits: PathBuf,
        #[arg(long, env = "SERIES_SIM_GAMES")]
        games: PathBuf,
        #[arg(long)]
        seeds: PathBuf,
        #[arg(long)]
        year: i32,
    },

    /// Replay recorded series and score the predictions
    Backtest {
        #[arg(long, env = "SERIES_SIM_SPLITS")]
        splits: PathBuf,
        #[arg(long, env = "SERIES_SIM_GAMES")]
        games: PathBuf,
        #[arg(long)]
        history: PathBuf,
        /// Only replay rounds whose name contains this text
        #[arg(long)]
        round: Option<String>,
        /// Write the augmented table here
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.sim.to_config()?;
    let source = RandomSource::from_seed(config.seed);
    info!(seed = source.seed(), game_trials = config.game_trials, series_trials = config.series_trials, "simulation settings");

    match cli.command {
        Command::Weights { games, year } => {
            let games = data::load_games(&games).with_context(|| format!("loading {}", games.display()))?;
            let weights = estimate_weights(year, &games)?;
            println!(
                "{}: offense weight {:.4}, defense weight {:.4}",
                weights.year, weights.offense_weight, weights.defense_weight
            );
        }

        Command::Series {
            splits,
            games,
            team1,
            team2,
            year,
        } => {
            let splits = data::load_splits(&splits).with_context(|| format!("loading {}", splits.display()))?;
            let games = data::load_games(&games).with_context(|| format!("loading {}", games.display()))?;
            let weights = WeightTable::estimate_years(&games, &[year]);
            let model = SeriesModel::new(&splits, &weights, &config);

            let length = config.series_length.unwrap_or(SeriesLength::BestOf7);
            let outcome = model.predict(&team1, &team2, year, length, &source)?;
            println!(
                "{} {} vs {} ({}): home {:.3}, away {:.3}",
                year, outcome.team1, outcome.team2, length, outcome.team1_home_win_prob, outcome.team1_away_win_prob
            );
            println!(
                "{} wins {:.1}% of series, most often in {}",
                outcome.winner(),
                outcome.prediction.winner_probability * 100.0,
                outcome.prediction.predicted_games
            );
        }

        Command::Bracket {
            splits,
            games,
            seeds,
            year,
        } => {
            let splits = data::load_splits(&splits).with_context(|| format!("loading {}", splits.display()))?;
            let games = data::load_games(&games).with_context(|| format!("loading {}", games.display()))?;
            let (east, west) =
                data::load_seeds(&seeds, year).with_context(|| format!("loading {}", seeds.display()))?;
            let weights = WeightTable::estimate_years(&games, &[year]);
            let model = SeriesModel::new(&splits, &weights, &config);

            let result = BracketRunner::new(model).run(&east, &west, &source)?;
            for round in &result.rounds {
                println!("{}", round.round);
                for series in &round.series {
                    println!(
                        "  {} vs {}: {} in {} ({:.1}%)",
                        series.team1,
                        series.team2,
                        series.winner(),
                        series.prediction.predicted_games,
                        series.prediction.winner_probability * 100.0
                    );
                }
            }
            println!("Champion: {}", result.champion);
        }

        Command::Backtest {
            splits,
            games,
            history,
            round,
            output,
        } => {
            let splits = data::load_splits(&splits).with_context(|| format!("loading {}", splits.display()))?;
            let games = data::load_games(&games).with_context(|| format!("loading {}", games.display()))?;
            let records =
                data::load_history(&history).with_context(|| format!("loading {}", history.display()))?;

            let harness = BacktestHarness::new(&splits, &games, &config);
            let report = harness.run(&records, round.as_deref(), &source)?;

            println!(
                "Simulated {} series ({} failed): winner accuracy {:.3}, games accuracy {:.3}",
                report.simulated, report.failed, report.winner_accuracy, report.games_accuracy
            );
            if let Some(path) = output {
                data::save_backtest(&path, &report.rows).with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), rows = report.rows.len(), "backtest table written");
            }
        }
    }

    Ok(())
}
