//! Season and week newtypes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An NFL season identified by its starting year (e.g. 2024).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Season(u16);

impl Season {
    pub fn new(year: u16) -> Self {
        Season(year)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// The season before this one.
    pub fn prev(&self) -> Season {
        Season(self.0.saturating_sub(1))
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Season {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u16>().map(Season)
    }
}

/// A week within a season, 1-based. Regular seasons run through week 18.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Week(u16);

impl Week {
    pub const MAX: u16 = 18;

    pub fn new(week: u16) -> Self {
        Week(week)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Week {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Week {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u16>().map(Week)
    }
}

/// Lexicographic (season, week) ordering used for temporal cutoffs.
pub fn before(lhs: (Season, Week), rhs: (Season, Week)) -> bool {
    lhs < rhs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_week_ordering_is_lexicographic() {
        let early = (Season::new(2023), Week::new(18));
        let late = (Season::new(2024), Week::new(1));
        assert!(before(early, late));
        assert!(!before(late, early));

        let same_season = (Season::new(2024), Week::new(4));
        assert!(before(same_season, (Season::new(2024), Week::new(5))));
        assert!(!before(same_season, same_season));
    }

    #[test]
    fn test_parse_round_trip() {
        let season: Season = "2024".parse().unwrap();
        assert_eq!(season.as_u16(), 2024);
        assert_eq!(season.to_string(), "2024");

        let week: Week = "10".parse().unwrap();
        assert_eq!(week.as_u16(), 10);
        assert!("abc".parse::<Week>().is_err());
    }
}
