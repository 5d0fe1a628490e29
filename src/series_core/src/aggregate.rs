use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SimError};
use crate::series::{SeriesDistribution, SeriesSide, SeriesTrialResult};

/// How to pick a winner when both sides won the same number of series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// Refuse to pick and report an ambiguous tie.
    #[default]
    Reject,
    /// Award the tie to team 1, the side with home court.
    HomeCourt,
    /// Award the tie to the team whose name sorts first.
    Lexicographic,
}

impl FromStr for TieBreak {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(TieBreak::Reject),
            "home-court" | "home_court" => Ok(TieBreak::HomeCourt),
            "lexicographic" => Ok(TieBreak::Lexicographic),
            other => Err(SimError::config(format!("unknown tie-break policy {:?}", other))),
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TieBreak::Reject => write!(f, "reject"),
            TieBreak::HomeCourt => write!(f, "home-court"),
            TieBreak::Lexicographic => write!(f, "lexicographic"),
        }
    }
}

/// Counts of `(winner, games played)` outcomes.
///
/// Merging is associative and commutative, so tallies built from any
/// partition of the trials combine to the same totals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeriesTally {
    counts: BTreeMap<(SeriesSide, u8), u64>,
    total: u64,
}

impl SeriesTally {
    pub fn new() -> Self {
        SeriesTally {
            counts: BTreeMap::new(),
            total: 0,
        }
    }

    pub fn record(&mut self, trial: SeriesTrialResult) {
        *self.counts.entry((trial.winner, trial.games_played)).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn merge(mut self, other: SeriesTally) -> SeriesTally {
        for (key, count) in other.counts {
            *self.counts.entry(key).or_insert(0) += count;
        }
        self.total += other.total;
        self
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self, winner: SeriesSide, games: u8) -> u64 {
        self.counts.get(&(winner, games)).copied().unwrap_or(0)
    }

    /// Series won by `side`, over every length.
    pub fn wins(&self, side: SeriesSide) -> u64 {
        self.counts
            .iter()
            .filter(|((winner, _), _)| *winner == side)
            .map(|(_, count)| count)
            .sum()
    }

    /// Most frequent `(winner, games)` pair. Equal counts go to the shorter
    /// series, then to team 1.
    pub fn modal_outcome(&self) -> Option<(SeriesSide, u8)> {
        self.counts
            .iter()
            .max_by_key(|((side, games), count)| (**count, Reverse(*games), Reverse(*side)))
            .map(|(key, _)| *key)
    }
}

impl FromIterator<SeriesTrialResult> for SeriesTally {
    fn from_iter<I: IntoIterator<Item = SeriesTrialResult>>(iter: I) -> Self {
        let mut tally = SeriesTally::new();
        for trial in iter {
            tally.record(trial);
        }
        tally
    }
}

/// Summary of a simulated series.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesPrediction {
    pub winner: String,
    pub winner_probability: f64,
    pub predicted_games: u8,
}

/// Reduce a tally to the modal winner, its share of trials and the modal
/// series length.
pub fn aggregate_tally(tally: &SeriesTally, team1: &str, team2: &str, tie_break: TieBreak) -> Result<SeriesPrediction> {
    let total = tally.total();
    if total == 0 {
        return Err(SimError::config(format!(
            "no series trials to aggregate for {} vs {}",
            team1, team2
        )));
    }

    let team1_wins = tally.wins(SeriesSide::Team1);
    let team2_wins = tally.wins(SeriesSide::Team2);

    let (winner, wins) = if team1_wins > team2_wins {
        (team1, team1_wins)
    } else if team2_wins > team1_wins {
        (team2, team2_wins)
    } else {
        match tie_break {
            TieBreak::Reject => {
                return Err(SimError::AmbiguousTie {
                    teams: vec![team1.to_string(), team2.to_string()],
                    count: team1_wins,
                    total,
                })
            }
            TieBreak::HomeCourt => (team1, team1_wins),
            TieBreak::Lexicographic => (team1.min(team2), team1_wins),
        }
    };

    let predicted_games = tally.modal_outcome().map(|(_, games)| games).unwrap_or_default();

    Ok(SeriesPrediction {
        winner: winner.to_string(),
        winner_probability: wins as f64 / total as f64,
        predicted_games,
    })
}

pub fn aggregate(
    distribution: &SeriesDistribution,
    team1: &str,
    team2: &str,
    tie_break: TieBreak,
) -> Result<SeriesPrediction> {
    aggregate_tally(&distribution.tally(), team1, team2, tie_break)
}
