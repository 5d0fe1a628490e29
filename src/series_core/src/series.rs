use rand::Rng;
use rayon::prelude::*;
use std::fmt;

use crate::aggregate::SeriesTally;
use crate::error::{Result, SimError};
use crate::rng::{trial_chunks, RandomSource};

/// Maximum length of an elimination series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeriesLength {
    BestOf5,
    BestOf7,
}

impl SeriesLength {
    pub fn from_games(games: u8) -> Result<Self> {
        match games {
            5 => Ok(SeriesLength::BestOf5),
            7 => Ok(SeriesLength::BestOf7),
            other => Err(SimError::config(format!(
                "series length must be 5 or 7, got {}",
                other
            ))),
        }
    }

    pub fn max_games(self) -> u8 {
        match self {
            SeriesLength::BestOf5 => 5,
            SeriesLength::BestOf7 => 7,
        }
    }

    /// Wins that clinch the series.
    pub fn wins_needed(self) -> u8 {
        self.max_games() / 2 + 1
    }

    pub fn min_games(self) -> u8 {
        self.wins_needed()
    }

    /// Team 1 hosts games 1, 2, 5 and 7; team 2 hosts 3, 4 and 6.
    pub fn team1_hosts(self, game: u8) -> bool {
        matches!(game, 1 | 2 | 5 | 7)
    }
}

impl fmt::Display for SeriesLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "best-of-{}", self.max_games())
    }
}

/// The two sides of a series. Team 1 is the side with home court.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeriesSide {
    Team1,
    Team2,
}

/// Outcome of one simulated series.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeriesTrialResult {
    pub winner: SeriesSide,
    pub games_played: u8,
}

/// Play a single series. `team1_win_prob(game)` gives team 1's chance in
/// the given game number, starting at 1.
pub fn play_series<R, F>(rng: &mut R, length: SeriesLength, mut team1_win_prob: F) -> SeriesTrialResult
where
    R: Rng,
    F: FnMut(u8) -> f64,
{
    let needed = length.wins_needed();
    let mut team1_wins = 0u8;
    let mut team2_wins = 0u8;
    let mut game = 0u8;

    while team1_wins < needed && team2_wins < needed {
        game += 1;
        if rng.gen_bool(team1_win_prob(game)) {
            team1_wins += 1;
        } else {
            team2_wins += 1;
        }
    }

    let winner = if team1_wins == needed {
        SeriesSide::Team1
    } else {
        SeriesSide::Team2
    };
    SeriesTrialResult {
        winner,
        games_played: game,
    }
}

/// Every trial of one series simulation, in trial order.
#[derive(Clone, Debug)]
pub struct SeriesDistribution {
    pub length: SeriesLength,
    pub trials: Vec<SeriesTrialResult>,
}

impl SeriesDistribution {
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Count outcomes, folding per worker and merging the partial tallies.
    pub fn tally(&self) -> SeriesTally {
        self.trials
            .par_iter()
            .fold(SeriesTally::new, |mut tally, trial| {
                tally.record(*trial);
                tally
            })
            .reduce(SeriesTally::new, SeriesTally::merge)
    }
}

fn check_probability(name: &str, p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(SimError::config(format!("{} must be in [0, 1], got {}", name, p)));
    }
    Ok(())
}

/// Simulate `trials` series between team 1 and team 2.
///
/// `team1_home_win_prob` is team 1's chance in the games it hosts and
/// `team1_away_win_prob` its chance in the games team 2 hosts.
pub fn simulate_series(
    team1_home_win_prob: f64,
    team1_away_win_prob: f64,
    length: SeriesLength,
    trials: usize,
    source: &RandomSource,
) -> Result<SeriesDistribution> {
    if trials == 0 {
        return Err(SimError::config("series trials must be positive"));
    }
    check_probability("team 1 home win probability", team1_home_win_prob)?;
    check_probability("team 1 away win probability", team1_away_win_prob)?;

    let per_game = |game: u8| {
        if length.team1_hosts(game) {
            team1_home_win_prob
        } else {
            team1_away_win_prob
        }
    };

    let chunks: Vec<Vec<SeriesTrialResult>> = trial_chunks(trials)
        .into_par_iter()
        .map(|(stream, len)| {
            let mut rng = source.stream(stream);
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(play_series(&mut rng, length, per_game));
            }
            out
        })
        .collect();

    let mut results = Vec::with_capacity(trials);
    for chunk in chunks {
        results.extend(chunk);
    }

    Ok(SeriesDistribution {
        length,
        trials: results,
    })
}
