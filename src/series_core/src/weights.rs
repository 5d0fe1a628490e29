use rayon::prelude::*;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::constants::SINGULARITY_TOLERANCE;
use crate::error::{DataError, Result};

/// One game from the season log, joined with both teams' season averages.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GameRecord {
    #[serde(rename = "YR")]
    pub year: i32,

    #[serde(rename = "Playoffs", deserialize_with = "flag_from_number")]
    pub playoffs: bool,

    #[serde(rename = "Home")]
    pub home: String,

    #[serde(rename = "Visitor")]
    pub visitor: String,

    #[serde(rename = "Home_Pts")]
    pub home_pts: f64,

    #[serde(rename = "Visitor_Pts")]
    pub visitor_pts: f64,

    /// Home team's season points per game
    #[serde(rename = "pts_home")]
    pub home_ppg: f64,

    /// Home team's season points allowed per game
    #[serde(rename = "opp_pts_home")]
    pub home_opp_ppg: f64,

    #[serde(rename = "pts_visitor")]
    pub visitor_ppg: f64,

    #[serde(rename = "opp_pts_visitor")]
    pub visitor_opp_ppg: f64,
}

fn flag_from_number<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(value != 0.0)
}

/// Regression coefficients turning sampled scoring into a weighted score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeasonWeights {
    pub year: i32,
    pub offense_weight: f64,
    pub defense_weight: f64,
}

impl SeasonWeights {
    pub fn new(year: i32, offense_weight: f64, defense_weight: f64) -> Self {
        SeasonWeights {
            year,
            offense_weight,
            defense_weight,
        }
    }
}

/// Fit `score = offense_weight * ppg + defense_weight * opp_allowed_ppg`
/// by least squares with no intercept.
///
/// Every regular-season game of `year` in `games` contributes two
/// observations, one per side. Playoff games and other seasons are skipped.
pub fn estimate_weights(year: i32, games: &[GameRecord]) -> Result<SeasonWeights> {
    // Normal equations of the two-column design matrix
    let mut s11 = 0.0;
    let mut s12 = 0.0;
    let mut s22 = 0.0;
    let mut sy1 = 0.0;
    let mut sy2 = 0.0;
    let mut observations = 0usize;

    for game in games.iter().filter(|g| g.year == year && !g.playoffs) {
        let sides = [
            (game.home_pts, game.home_ppg, game.visitor_opp_ppg),
            (game.visitor_pts, game.visitor_ppg, game.home_opp_ppg),
        ];
        for (score, ppg, opp_allowed) in sides {
            if !(score.is_finite() && ppg.is_finite() && opp_allowed.is_finite()) {
                return Err(DataError::DegenerateRegression {
                    year,
                    reason: format!("non-finite value in {} vs {}", game.home, game.visitor),
                }
                .into());
            }
            s11 += ppg * ppg;
            s12 += ppg * opp_allowed;
            s22 += opp_allowed * opp_allowed;
            sy1 += ppg * score;
            sy2 += opp_allowed * score;
            observations += 1;
        }
    }

    if observations == 0 {
        return Err(DataError::DegenerateRegression {
            year,
            reason: "no regular-season games".to_string(),
        }
        .into());
    }

    let det = s11 * s22 - s12 * s12;
    if s11 <= 0.0 || s22 <= 0.0 || det <= SINGULARITY_TOLERANCE * s11 * s22 {
        return Err(DataError::DegenerateRegression {
            year,
            reason: format!("rank-deficient design matrix over {} observations", observations),
        }
        .into());
    }

    let offense_weight = (s22 * sy1 - s12 * sy2) / det;
    let defense_weight = (s11 * sy2 - s12 * sy1) / det;

    debug!(year, observations, offense_weight, defense_weight, "estimated season weights");

    Ok(SeasonWeights::new(year, offense_weight, defense_weight))
}

/// Season weights for every year a run needs, estimated once up front.
///
/// Years whose estimation failed keep their error so every lookup reports
/// the original cause.
#[derive(Clone, Debug, Default)]
pub struct WeightTable {
    weights: HashMap<i32, std::result::Result<SeasonWeights, DataError>>,
}

impl WeightTable {
    pub fn new() -> Self {
        WeightTable {
            weights: HashMap::new(),
        }
    }

    /// Estimate the weights of each year in `years` in parallel.
    pub fn estimate_years(games: &[GameRecord], years: &[i32]) -> Self {
        let mut unique: Vec<i32> = years.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let weights = unique
            .par_iter()
            .map(|&year| {
                let fitted = estimate_weights(year, games).map_err(|e| match e {
                    crate::error::SimError::Data(data) => data,
                    other => DataError::DegenerateRegression {
                        year,
                        reason: other.to_string(),
                    },
                });
                if let Err(e) = &fitted {
                    warn!(year, error = %e, "season weights unavailable");
                }
                (year, fitted)
            })
            .collect();

        WeightTable { weights }
    }

    pub fn insert(&mut self, weights: SeasonWeights) {
        self.weights.insert(weights.year, Ok(weights));
    }

    pub fn get(&self, year: i32) -> Result<SeasonWeights> {
        match self.weights.get(&year) {
            Some(Ok(w)) => Ok(*w),
            Some(Err(e)) => Err(e.clone().into()),
            None => Err(DataError::MissingWeights { year }.into()),
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
