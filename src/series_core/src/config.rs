use crate::aggregate::TieBreak;
use crate::constants::{BEST_OF_FIVE_CUTOFF_YEAR, DEFAULT_GAME_TRIALS, DEFAULT_SERIES_TRIALS};
use crate::error::{Result, SimError};
use crate::series::SeriesLength;

/// Knobs shared by every simulation in a run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Games simulated per venue pairing
    pub game_trials: usize,

    /// Series simulated per matchup
    pub series_trials: usize,

    /// Run seed; `None` draws one from OS entropy
    pub seed: Option<u64>,

    /// First-round series before this year are best-of-5
    pub best_of_five_cutoff: i32,

    pub tie_break: TieBreak,

    /// Force every series to this length
    pub series_length: Option<SeriesLength>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            game_trials: DEFAULT_GAME_TRIALS,
            series_trials: DEFAULT_SERIES_TRIALS,
            seed: None,
            best_of_five_cutoff: BEST_OF_FIVE_CUTOFF_YEAR,
            tie_break: TieBreak::default(),
            series_length: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.game_trials == 0 {
            return Err(SimError::config("game trials must be positive"));
        }
        if self.series_trials == 0 {
            return Err(SimError::config("series trials must be positive"));
        }
        Ok(())
    }

    /// Length of a series in `year`, honoring the override if set.
    pub fn series_length_for(&self, first_round: bool, year: i32) -> SeriesLength {
        match self.series_length {
            Some(length) => length,
            None if first_round && year < self.best_of_five_cutoff => SeriesLength::BestOf5,
            None => SeriesLength::BestOf7,
        }
    }
}
