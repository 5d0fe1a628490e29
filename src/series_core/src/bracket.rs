use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::constants::{FIRST_ROUND_PAIRS, SEEDS_PER_CONFERENCE};
use crate::error::{DataError, Result, SimError};
use crate::matchup::{SeriesModel, SeriesOutcome};
use crate::rng::RandomSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Conference {
    East,
    West,
}

impl fmt::Display for Conference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conference::East => write!(f, "East"),
            Conference::West => write!(f, "West"),
        }
    }
}

impl FromStr for Conference {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "east" | "eastern" => Ok(Conference::East),
            "west" | "western" => Ok(Conference::West),
            other => Err(SimError::config(format!("unknown conference {:?}", other))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayoffRound {
    FirstRound,
    Semifinals,
    ConferenceFinals,
    Finals,
}

impl PlayoffRound {
    const ORDER: [PlayoffRound; 4] = [
        PlayoffRound::FirstRound,
        PlayoffRound::Semifinals,
        PlayoffRound::ConferenceFinals,
        PlayoffRound::Finals,
    ];
}

impl fmt::Display for PlayoffRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayoffRound::FirstRound => write!(f, "First Round"),
            PlayoffRound::Semifinals => write!(f, "Conference Semifinals"),
            PlayoffRound::ConferenceFinals => write!(f, "Conference Finals"),
            PlayoffRound::Finals => write!(f, "Finals"),
        }
    }
}

/// Seed 1 through 8 of one conference in one season.
#[derive(Clone, Debug, PartialEq)]
pub struct ConferenceSeeds {
    pub conference: Conference,
    pub year: i32,
    teams: Vec<String>,
}

impl ConferenceSeeds {
    /// `teams[0]` is the 1 seed.
    pub fn new(conference: Conference, year: i32, teams: Vec<String>) -> Result<Self> {
        let invalid = |reason: String| -> SimError {
            DataError::InvalidSeeding {
                conference: conference.to_string(),
                year,
                reason,
            }
            .into()
        };

        if teams.len() != SEEDS_PER_CONFERENCE {
            return Err(invalid(format!(
                "expected {} seeds, got {}",
                SEEDS_PER_CONFERENCE,
                teams.len()
            )));
        }
        for (i, team) in teams.iter().enumerate() {
            if teams[..i].contains(team) {
                return Err(invalid(format!("{} is seeded twice", team)));
            }
        }

        Ok(ConferenceSeeds {
            conference,
            year,
            teams,
        })
    }

    /// Build from a `seed -> team` mapping that must cover seeds 1 through 8.
    pub fn from_map(conference: Conference, year: i32, seeds: &HashMap<u8, String>) -> Result<Self> {
        let mut teams = Vec::with_capacity(SEEDS_PER_CONFERENCE);
        for seed in 1..=SEEDS_PER_CONFERENCE as u8 {
            match seeds.get(&seed) {
                Some(team) => teams.push(team.clone()),
                None => {
                    return Err(DataError::InvalidSeeding {
                        conference: conference.to_string(),
                        year,
                        reason: format!("no team for seed {}", seed),
                    }
                    .into())
                }
            }
        }
        if seeds.len() != SEEDS_PER_CONFERENCE {
            return Err(DataError::InvalidSeeding {
                conference: conference.to_string(),
                year,
                reason: format!("unexpected seeds beyond {}", SEEDS_PER_CONFERENCE),
            }
            .into());
        }
        ConferenceSeeds::new(conference, year, teams)
    }

    pub fn team(&self, seed: u8) -> Option<&str> {
        let idx = usize::from(seed).checked_sub(1)?;
        self.teams.get(idx).map(String::as_str)
    }
}

/// A team still alive in the bracket.
#[derive(Clone, Debug, PartialEq)]
struct Entrant {
    team: String,
    seed: u8,
    conference: Conference,
}

impl Entrant {
    /// Order a pairing so the better seed has home court. Equal seeds only
    /// meet in the Finals, where the East champion keeps it.
    fn home_court<'e>(a: &'e Entrant, b: &'e Entrant) -> (&'e Entrant, &'e Entrant) {
        let b_first = b.seed < a.seed
            || (b.seed == a.seed && b.conference == Conference::East && a.conference != Conference::East);
        if b_first {
            (b, a)
        } else {
            (a, b)
        }
    }
}

/// Entrants of one conference in bracket order: 1, 8, 4, 5, 2, 7, 3, 6.
fn bracket_order(seeds: &ConferenceSeeds) -> Result<Vec<Entrant>> {
    let mut entrants = Vec::with_capacity(SEEDS_PER_CONFERENCE);
    for (high, low) in FIRST_ROUND_PAIRS {
        for seed in [high, low] {
            let team = seeds.team(seed).ok_or_else(|| DataError::InvalidSeeding {
                conference: seeds.conference.to_string(),
                year: seeds.year,
                reason: format!("no team for seed {}", seed),
            })?;
            entrants.push(Entrant {
                team: team.to_string(),
                seed,
                conference: seeds.conference,
            });
        }
    }
    Ok(entrants)
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoundResult {
    pub round: PlayoffRound,
    pub series: Vec<SeriesOutcome>,
}

impl RoundResult {
    pub fn winners(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.winner()).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BracketResult {
    pub year: i32,
    pub rounds: Vec<RoundResult>,
    pub champion: String,
}

/// Plays a two-conference, four-round bracket one round at a time.
pub struct BracketRunner<'a> {
    model: SeriesModel<'a>,
}

impl<'a> BracketRunner<'a> {
    pub fn new(model: SeriesModel<'a>) -> Self {
        BracketRunner { model }
    }

    /// Run the whole bracket. Matchups within a round are simulated in
    /// parallel; any failing matchup aborts the run.
    pub fn run(&self, east: &ConferenceSeeds, west: &ConferenceSeeds, source: &RandomSource) -> Result<BracketResult> {
        self.model.config().validate()?;
        if east.year != west.year {
            return Err(SimError::config(format!(
                "conference seeds are from different years: {} and {}",
                east.year, west.year
            )));
        }
        if east.conference == west.conference {
            return Err(SimError::config(format!(
                "both seedings belong to the {} conference",
                east.conference
            )));
        }
        let year = east.year;

        let mut alive = bracket_order(east)?;
        alive.extend(bracket_order(west)?);

        let mut rounds = Vec::with_capacity(PlayoffRound::ORDER.len());
        for (idx, round) in PlayoffRound::ORDER.into_iter().enumerate() {
            let length = self
                .model
                .config()
                .series_length_for(round == PlayoffRound::FirstRound, year);
            let round_source = source.derive(idx as u64);

            let pairs: Vec<(&Entrant, &Entrant)> = alive
                .chunks(2)
                .map(|pair| Entrant::home_court(&pair[0], &pair[1]))
                .collect();

            let series = pairs
                .par_iter()
                .enumerate()
                .map(|(i, (team1, team2))| {
                    self.model
                        .predict(&team1.team, &team2.team, year, length, &round_source.derive(i as u64))
                })
                .collect::<Result<Vec<SeriesOutcome>>>()?;

            let mut next = Vec::with_capacity(pairs.len());
            for ((team1, team2), outcome) in pairs.iter().zip(&series) {
                let winner = if outcome.winner() == team1.team { team1 } else { team2 };
                next.push((*winner).clone());
            }

            let result = RoundResult { round, series };
            info!(year, round = %round, winners = ?result.winners(), "round complete");
            rounds.push(result);
            alive = next;
        }

        let champion = match alive.as_slice() {
            [champion] => champion.team.clone(),
            _ => {
                return Err(SimError::config(format!(
                    "bracket for {} ended with {} teams",
                    year,
                    alive.len()
                )))
            }
        };
        info!(year, champion = %champion, "bracket complete");

        Ok(BracketResult {
            year,
            rounds,
            champion,
        })
    }
}
