//! Flat CSV tables produced by the scraping and joining jobs.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use crate::backtest::{BacktestRow, HistoricalSeriesRecord};
use crate::bracket::{Conference, ConferenceSeeds};
use crate::error::{DataError, Result};
use crate::splits::{SplitStore, TeamSplitRecord};
use crate::weights::GameRecord;

fn read_rows<T, R>(reader: R) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for row in csv_reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn read_path<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = std::fs::File::open(path)?;
    read_rows(file)
}

/// Columns: `team,yr,split_value,fg3,fg2,ft,opp_fg3,opp_fg2,opp_ft`
pub fn read_splits<R: Read>(reader: R) -> Result<SplitStore> {
    let records: Vec<TeamSplitRecord> = read_rows(reader)?;
    SplitStore::from_records(records)
}

pub fn load_splits(path: &Path) -> Result<SplitStore> {
    let records: Vec<TeamSplitRecord> = read_path(path)?;
    SplitStore::from_records(records)
}

/// Columns: `YR,Playoffs,Home,Visitor,Home_Pts,Visitor_Pts,pts_home,opp_pts_home,pts_visitor,opp_pts_visitor`
pub fn read_games<R: Read>(reader: R) -> Result<Vec<GameRecord>> {
    read_rows(reader)
}

pub fn load_games(path: &Path) -> Result<Vec<GameRecord>> {
    read_path(path)
}

/// Columns: `Round,Winner,Loser,seed_winner,seed_loser,Pct_winner,Pct_loser,Games,YR`
pub fn read_history<R: Read>(reader: R) -> Result<Vec<HistoricalSeriesRecord>> {
    read_rows(reader)
}

pub fn load_history(path: &Path) -> Result<Vec<HistoricalSeriesRecord>> {
    read_path(path)
}

#[derive(Debug, Deserialize)]
struct SeedRow {
    #[serde(rename = "YR")]
    year: i32,
    #[serde(rename = "Conference")]
    conference: String,
    seed: u8,
    #[serde(rename = "Team")]
    team: String,
}

/// Columns: `YR,Conference,seed,Team`. Returns `(east, west)` for `year`.
pub fn read_seeds<R: Read>(reader: R, year: i32) -> Result<(ConferenceSeeds, ConferenceSeeds)> {
    let rows: Vec<SeedRow> = read_rows(reader)?;

    let mut by_conference: HashMap<Conference, HashMap<u8, String>> = HashMap::new();
    for row in rows.into_iter().filter(|r| r.year == year) {
        let conference = row.conference.parse::<Conference>().map_err(|_| DataError::InvalidSeeding {
            conference: row.conference.clone(),
            year,
            reason: format!("unknown conference {:?}", row.conference),
        })?;
        let seeds = by_conference.entry(conference).or_default();
        if seeds.insert(row.seed, row.team).is_some() {
            return Err(DataError::InvalidSeeding {
                conference: conference.to_string(),
                year,
                reason: format!("seed {} listed twice", row.seed),
            }
            .into());
        }
    }

    let mut conference_seeds = |conference: Conference| -> Result<ConferenceSeeds> {
        let seeds = by_conference.remove(&conference).unwrap_or_default();
        ConferenceSeeds::from_map(conference, year, &seeds)
    };
    let east = conference_seeds(Conference::East)?;
    let west = conference_seeds(Conference::West)?;
    Ok((east, west))
}

pub fn load_seeds(path: &Path, year: i32) -> Result<(ConferenceSeeds, ConferenceSeeds)> {
    let file = std::fs::File::open(path)?;
    read_seeds(file, year)
}

/// Write the augmented backtest table with a header row.
pub fn write_backtest<W: Write>(writer: W, rows: &[BacktestRow]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn save_backtest(path: &Path, rows: &[BacktestRow]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_backtest(file, rows)
}
