use thiserror::Error;

use crate::splits::Venue;

pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised while preparing or running a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("ambiguous winner: {teams:?} each won {count} of {total} series")]
    AmbiguousTie {
        teams: Vec<String>,
        count: u64,
        total: u64,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Missing or unusable input data. Never transient, never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("no {venue} split for {team} in {year}")]
    MissingSplit { team: String, year: i32, venue: Venue },

    #[error("conflicting {venue} splits for {team} in {year}")]
    ConflictingSplit { team: String, year: i32, venue: Venue },

    #[error("invalid {field} rate {value} for {team} in {year}")]
    InvalidRate {
        team: String,
        year: i32,
        field: &'static str,
        value: f64,
    },

    #[error("no season weights for {year}")]
    MissingWeights { year: i32 },

    #[error("cannot estimate weights for {year}: {reason}")]
    DegenerateRegression { year: i32, reason: String },

    #[error("cannot pick team 1 for {round} {year} ({winner} vs {loser}): {reason}")]
    UnresolvedTeam1 {
        round: String,
        year: i32,
        winner: String,
        loser: String,
        reason: String,
    },

    #[error("invalid seeding for {conference} {year}: {reason}")]
    InvalidSeeding {
        conference: String,
        year: i32,
        reason: String,
    },
}

impl SimError {
    pub fn config(msg: impl Into<String>) -> Self {
        SimError::Configuration(msg.into())
    }
}
