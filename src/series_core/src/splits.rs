use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{DataError, Result};

/// Which side of the floor a split was recorded on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Visitor,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Home => write!(f, "Home"),
            Venue::Visitor => write!(f, "Visitor"),
        }
    }
}

/// Season per-game scoring averages for one team at one venue.
///
/// The `made_*` fields are what the team scores, the `opp_made_*` fields are
/// what it allows. All six are non-negative per-game rates.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TeamSplitRecord {
    pub team: String,

    #[serde(rename = "yr")]
    pub year: i32,

    #[serde(rename = "split_value")]
    pub venue: Venue,

    #[serde(rename = "fg3")]
    pub made_3: f64,

    #[serde(rename = "fg2")]
    pub made_2: f64,

    #[serde(rename = "ft")]
    pub made_ft: f64,

    #[serde(rename = "opp_fg3")]
    pub opp_made_3: f64,

    #[serde(rename = "opp_fg2")]
    pub opp_made_2: f64,

    #[serde(rename = "opp_ft")]
    pub opp_made_ft: f64,
}

impl TeamSplitRecord {
    /// Build a split from made-basket rates ordered `[threes, twos, free throws]`.
    pub fn new(team: &str, year: i32, venue: Venue, made: [f64; 3], allowed: [f64; 3]) -> Self {
        TeamSplitRecord {
            team: team.to_string(),
            year,
            venue,
            made_3: made[0],
            made_2: made[1],
            made_ft: made[2],
            opp_made_3: allowed[0],
            opp_made_2: allowed[1],
            opp_made_ft: allowed[2],
        }
    }

    /// Rates the team scores, `[threes, twos, free throws]`.
    pub fn offense(&self) -> [f64; 3] {
        [self.made_3, self.made_2, self.made_ft]
    }

    /// Rates the team allows, `[threes, twos, free throws]`.
    pub fn allowed(&self) -> [f64; 3] {
        [self.opp_made_3, self.opp_made_2, self.opp_made_ft]
    }

    pub fn validate(&self) -> std::result::Result<(), DataError> {
        let fields = [
            ("made_3", self.made_3),
            ("made_2", self.made_2),
            ("made_ft", self.made_ft),
            ("opp_made_3", self.opp_made_3),
            ("opp_made_2", self.opp_made_2),
            ("opp_made_ft", self.opp_made_ft),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(DataError::InvalidRate {
                    team: self.team.clone(),
                    year: self.year,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Typed lookup of splits keyed by `(team, year, venue)`.
#[derive(Clone, Debug, Default)]
pub struct SplitStore {
    splits: HashMap<(String, i32, Venue), TeamSplitRecord>,
}

impl SplitStore {
    pub fn new() -> Self {
        SplitStore {
            splits: HashMap::new(),
        }
    }

    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = TeamSplitRecord>,
    {
        let mut store = SplitStore::new();
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    /// Add a split. Exact duplicates are ignored, conflicting ones rejected.
    pub fn insert(&mut self, record: TeamSplitRecord) -> Result<()> {
        record.validate()?;
        let key = (record.team.clone(), record.year, record.venue);
        if let Some(existing) = self.splits.get(&key) {
            if *existing == record {
                return Ok(());
            }
            return Err(DataError::ConflictingSplit {
                team: record.team,
                year: record.year,
                venue: record.venue,
            }
            .into());
        }
        self.splits.insert(key, record);
        Ok(())
    }

    pub fn get(&self, team: &str, year: i32, venue: Venue) -> Result<&TeamSplitRecord> {
        self.splits
            .get(&(team.to_string(), year, venue))
            .ok_or_else(|| {
                DataError::MissingSplit {
                    team: team.to_string(),
                    year,
                    venue,
                }
                .into()
            })
    }

    pub fn contains(&self, team: &str, year: i32, venue: Venue) -> bool {
        self.splits.contains_key(&(team.to_string(), year, venue))
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    fn split(team: &str, venue: Venue) -> TeamSplitRecord {
        TeamSplitRecord::new(team, 1998, venue, [5.0, 30.0, 18.0], [4.5, 29.0, 17.5])
    }

    #[test]
    fn test_lookup_by_team_year_venue() {
        let store = SplitStore::from_records(vec![
            split("Utah Jazz", Venue::Home),
            split("Utah Jazz", Venue::Visitor),
        ])
        .unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.contains("Utah Jazz", 1998, Venue::Visitor));
        assert!(!store.contains("Utah Jazz", 1997, Venue::Visitor));
        let home = store.get("Utah Jazz", 1998, Venue::Home).unwrap();
        assert_eq!(home.venue, Venue::Home);
        assert_eq!(home.offense(), [5.0, 30.0, 18.0]);
        assert_eq!(home.allowed(), [4.5, 29.0, 17.5]);
    }

    #[test]
    fn test_missing_split_is_data_error() {
        let store = SplitStore::from_records(vec![split("Utah Jazz", Venue::Home)]).unwrap();

        let err = store.get("Utah Jazz", 1998, Venue::Visitor).unwrap_err();
        assert!(matches!(
            err,
            SimError::Data(DataError::MissingSplit { venue: Venue::Visitor, year: 1998, .. })
        ));
        assert!(store.get("Chicago Bulls", 1998, Venue::Home).is_err());
    }

    #[test]
    fn test_exact_duplicates_collapse() {
        let store = SplitStore::from_records(vec![
            split("Utah Jazz", Venue::Home),
            split("Utah Jazz", Venue::Home),
        ])
        .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_conflicting_duplicates_rejected() {
        let mut other = split("Utah Jazz", Venue::Home);
        other.made_3 = 6.0;

        let result = SplitStore::from_records(vec![split("Utah Jazz", Venue::Home), other]);
        assert!(matches!(
            result,
            Err(SimError::Data(DataError::ConflictingSplit { .. }))
        ));
    }

    #[test]
    fn test_negative_rate_rejected() {
        let mut bad = split("Utah Jazz", Venue::Home);
        bad.opp_made_ft = -1.0;

        let mut store = SplitStore::new();
        let err = store.insert(bad).unwrap_err();
        assert!(matches!(
            err,
            SimError::Data(DataError::InvalidRate { field: "opp_made_ft", .. })
        ));
        assert!(store.is_empty());
    }
}
