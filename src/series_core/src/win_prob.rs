use rand::distributions::Distribution;
use rand::Rng;
use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, Normal, Poisson};

use crate::constants::{POINTS_PER_MADE_2, POINTS_PER_MADE_3, POINTS_PER_MADE_FT};
use crate::error::{Result, SimError};
use crate::rng::{trial_chunks, RandomSource};
use crate::splits::TeamSplitRecord;
use crate::weights::SeasonWeights;

const BASKET_POINTS: [f64; 3] = [POINTS_PER_MADE_3, POINTS_PER_MADE_2, POINTS_PER_MADE_FT];

/// Scores of one sampled game.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GameTrialResult {
    pub home_score: f64,
    pub visitor_score: f64,
}

/// Poisson samplers for `[threes, twos, free throws]`. A zero rate always
/// samples zero.
#[derive(Clone, Debug)]
struct BasketSampler {
    dists: [Option<Poisson>; 3],
}

impl BasketSampler {
    fn new(rates: [f64; 3]) -> Result<Self> {
        let mut dists = [None, None, None];
        for (slot, rate) in dists.iter_mut().zip(rates) {
            if rate > 0.0 {
                let dist = Poisson::new(rate)
                    .map_err(|e| SimError::config(format!("poisson rate {}: {}", rate, e)))?;
                *slot = Some(dist);
            }
        }
        Ok(BasketSampler { dists })
    }

    fn sample_points<R: Rng>(&self, rng: &mut R) -> f64 {
        let mut points = 0.0;
        for (value, dist) in BASKET_POINTS.iter().zip(&self.dists) {
            if let Some(dist) = dist {
                let made: f64 = dist.sample(rng);
                points += value * made;
            }
        }
        points
    }
}

/// A single home/visitor pairing ready to be sampled.
///
/// Each side's weighted score mixes its own sampled offense with the
/// sampled allowance of the opponent's defense.
#[derive(Clone, Debug)]
pub struct GameModel {
    home_offense: BasketSampler,
    home_vs_defense: BasketSampler,
    visitor_offense: BasketSampler,
    visitor_vs_defense: BasketSampler,
    weights: SeasonWeights,
}

impl GameModel {
    pub fn new(home: &TeamSplitRecord, visitor: &TeamSplitRecord, weights: &SeasonWeights) -> Result<Self> {
        home.validate()?;
        visitor.validate()?;
        Ok(GameModel {
            home_offense: BasketSampler::new(home.offense())?,
            home_vs_defense: BasketSampler::new(visitor.allowed())?,
            visitor_offense: BasketSampler::new(visitor.offense())?,
            visitor_vs_defense: BasketSampler::new(home.allowed())?,
            weights: *weights,
        })
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> GameTrialResult {
        let w = &self.weights;
        let home_score = w.offense_weight * self.home_offense.sample_points(rng)
            + w.defense_weight * self.home_vs_defense.sample_points(rng);
        let visitor_score = w.offense_weight * self.visitor_offense.sample_points(rng)
            + w.defense_weight * self.visitor_vs_defense.sample_points(rng);
        GameTrialResult {
            home_score,
            visitor_score,
        }
    }

    /// Play one game. Exact ties go to a fair coin flip.
    pub fn home_wins<R: Rng>(&self, rng: &mut R) -> bool {
        let trial = self.sample(rng);
        if trial.home_score > trial.visitor_score {
            true
        } else if trial.visitor_score > trial.home_score {
            false
        } else {
            rng.gen_bool(0.5)
        }
    }
}

/// Empirical probability that the home side wins, over `trials` games.
///
/// Trials are spread across the rayon pool in fixed-size chunks, each drawing
/// from its own stream of `source`, so the result depends only on the seed.
pub fn simulate_game_win_prob(
    home: &TeamSplitRecord,
    visitor: &TeamSplitRecord,
    weights: &SeasonWeights,
    trials: usize,
    source: &RandomSource,
) -> Result<f64> {
    if trials == 0 {
        return Err(SimError::config("game trials must be positive"));
    }
    let model = GameModel::new(home, visitor, weights)?;

    let home_wins: u64 = trial_chunks(trials)
        .into_par_iter()
        .map(|(stream, len)| {
            let mut rng = source.stream(stream);
            (0..len).filter(|_| model.home_wins(&mut rng)).count() as u64
        })
        .sum();

    Ok(home_wins as f64 / trials as f64)
}

/// Expected weighted scores for a pairing. Returns (home, visitor).
pub fn calculate_expected_scores(
    home: &TeamSplitRecord,
    visitor: &TeamSplitRecord,
    weights: &SeasonWeights,
) -> (f64, f64) {
    let raw = |rates: [f64; 3]| -> f64 { BASKET_POINTS.iter().zip(rates).map(|(p, r)| p * r).sum() };
    let home_score = weights.offense_weight * raw(home.offense()) + weights.defense_weight * raw(visitor.allowed());
    let visitor_score = weights.offense_weight * raw(visitor.offense()) + weights.defense_weight * raw(home.allowed());
    (home_score, visitor_score)
}

/// Normal approximation of the home win probability implied by the
/// Poisson scoring model.
pub fn approximate_win_prob(home: &TeamSplitRecord, visitor: &TeamSplitRecord, weights: &SeasonWeights) -> f64 {
    // Var(k * Poisson(l)) = k^2 * l
    let var = |rates: [f64; 3]| -> f64 { BASKET_POINTS.iter().zip(rates).map(|(p, r)| p * p * r).sum() };
    let wo2 = weights.offense_weight * weights.offense_weight;
    let wd2 = weights.defense_weight * weights.defense_weight;

    let (home_score, visitor_score) = calculate_expected_scores(home, visitor, weights);
    let variance = wo2 * (var(home.offense()) + var(visitor.offense()))
        + wd2 * (var(visitor.allowed()) + var(home.allowed()));

    if variance <= 0.0 {
        return match home_score.partial_cmp(&visitor_score) {
            Some(std::cmp::Ordering::Greater) => 1.0,
            Some(std::cmp::Ordering::Less) => 0.0,
            _ => 0.5,
        };
    }

    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.cdf((home_score - visitor_score) / variance.sqrt()),
        Err(_) => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splits::Venue;

    fn weights() -> SeasonWeights {
        SeasonWeights::new(2010, 0.55, 0.45)
    }

    fn strong() -> TeamSplitRecord {
        TeamSplitRecord::new("Strong", 2010, Venue::Home, [8.0, 30.0, 18.0], [7.0, 29.0, 17.0])
    }

    fn weak() -> TeamSplitRecord {
        TeamSplitRecord::new("Weak", 2010, Venue::Visitor, [7.0, 29.0, 17.0], [8.0, 31.0, 19.0])
    }

    #[test]
    fn test_probability_bounds() {
        let source = RandomSource::new(1);
        let p = simulate_game_win_prob(&strong(), &weak(), &weights(), 2000, &source).unwrap();
        assert!((0.0..=1.0).contains(&p), "Probability must be in [0, 1]");
    }

    #[test]
    fn test_better_team_favored() {
        let source = RandomSource::new(2);
        let p = simulate_game_win_prob(&strong(), &weak(), &weights(), 10_000, &source).unwrap();
        assert!(p > 0.6, "Strong home team should be favored, got {}", p);
    }

    #[test]
    fn test_converges_to_normal_approximation() {
        let source = RandomSource::new(3);
        let simulated = simulate_game_win_prob(&strong(), &weak(), &weights(), 40_000, &source).unwrap();
        let approx = approximate_win_prob(&strong(), &weak(), &weights());
        assert!(
            (simulated - approx).abs() < 0.02,
            "simulated {} vs approximate {}",
            simulated,
            approx
        );
    }

    #[test]
    fn test_same_probability_on_any_thread_count() {
        let source = RandomSource::new(12);
        let run = |threads: usize| {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
            pool.install(|| simulate_game_win_prob(&strong(), &weak(), &weights(), 9000, &source).unwrap())
        };
        assert_eq!(run(1), run(8));
    }

    #[test]
    fn test_symmetric() {
        let a = simulate_game_win_prob(&strong(), &weak(), &weights(), 30_000, &RandomSource::new(4)).unwrap();
        let b = simulate_game_win_prob(&weak(), &strong(), &weights(), 30_000, &RandomSource::new(5)).unwrap();
        assert!((a + b - 1.0).abs() < 0.02, "P(A home) + P(B home) = {}", a + b);
    }

    #[test]
    fn test_ties_split_evenly() {
        // Zero rates score nothing, so every game is a tie decided by the coin
        let idle = TeamSplitRecord::new("Idle", 2010, Venue::Home, [0.0; 3], [0.0; 3]);
        let p = simulate_game_win_prob(&idle, &idle, &weights(), 20_000, &RandomSource::new(6)).unwrap();
        assert!((p - 0.5).abs() < 0.02, "coin flips should split ties, got {}", p);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let source = RandomSource::new(42);
        let a = simulate_game_win_prob(&strong(), &weak(), &weights(), 5000, &source).unwrap();
        let b = simulate_game_win_prob(&strong(), &weak(), &weights(), 5000, &source).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_trials_rejected() {
        let err = simulate_game_win_prob(&strong(), &weak(), &weights(), 0, &RandomSource::new(1)).unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));
    }

    #[test]
    fn test_expected_scores() {
        let (home, visitor) = calculate_expected_scores(&strong(), &weak(), &weights());
        // home: 0.55 * (24 + 60 + 18) + 0.45 * (24 + 62 + 19)
        assert!((home - 103.35).abs() < 1e-9);
        // visitor: 0.55 * 96 + 0.45 * 96
        assert!((visitor - 96.0).abs() < 1e-9);
    }
}
