//! Player position types and utilities.

use crate::error::GamedayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// NFL player positions as stored in the `players` table.
///
/// Skill positions (QB/RB/WR/TE) are the ones the projection models cover;
/// `Dst` is a whole team defense and has its own model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    K,
    Dst,
    Other,
}

/// Positions covered by the per-player projection models.
pub const SKILL_POSITIONS: [Position; 4] =
    [Position::QB, Position::RB, Position::WR, Position::TE];

impl Position {
    /// Numeric encoding used in feature vectors: QB=0, RB=1, WR=2, TE=3,
    /// everything else 4.
    pub fn code(&self) -> f64 {
        match self {
            Position::QB => 0.0,
            Position::RB => 1.0,
            Position::WR => 2.0,
            Position::TE => 3.0,
            _ => 4.0,
        }
    }

    pub fn is_skill(&self) -> bool {
        matches!(
            self,
            Position::QB | Position::RB | Position::WR | Position::TE
        )
    }

    /// FLEX lineup slots draw from RB/WR/TE only.
    pub fn is_flex_eligible(&self) -> bool {
        matches!(self, Position::RB | Position::WR | Position::TE)
    }

    /// Offensive line positions whose absences boost opposing defenses.
    pub fn parse_is_offensive_line(raw: &str) -> bool {
        matches!(raw.to_uppercase().as_str(), "C" | "G" | "T" | "OL" | "OT" | "OG")
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::K => "K",
            Position::Dst => "DST",
            Position::Other => "OTHER",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Position {
    type Err = GamedayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "QB" => Ok(Position::QB),
            "RB" | "FB" | "HB" => Ok(Position::RB),
            "WR" => Ok(Position::WR),
            "TE" => Ok(Position::TE),
            "K" | "PK" => Ok(Position::K),
            "DST" | "D/ST" | "DEF" => Ok(Position::Dst),
            "" => Err(GamedayError::Internal {
                message: "empty position string".to_string(),
            }),
            _ => Ok(Position::Other),
        }
    }
}

/// Lenient parse used when reading storage rows: anything unknown maps to
/// `Other` instead of failing the row.
pub fn parse_lenient(raw: &str) -> Position {
    raw.parse().unwrap_or(Position::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_codes() {
        assert_eq!(Position::QB.code(), 0.0);
        assert_eq!(Position::RB.code(), 1.0);
        assert_eq!(Position::WR.code(), 2.0);
        assert_eq!(Position::TE.code(), 3.0);
        assert_eq!(Position::K.code(), 4.0);
        assert_eq!(Position::Dst.code(), 4.0);
    }

    #[test]
    fn test_skill_and_flex_eligibility() {
        for pos in SKILL_POSITIONS {
            assert!(pos.is_skill());
        }
        assert!(!Position::K.is_skill());
        assert!(!Position::Dst.is_skill());

        assert!(Position::RB.is_flex_eligible());
        assert!(Position::WR.is_flex_eligible());
        assert!(Position::TE.is_flex_eligible());
        assert!(!Position::QB.is_flex_eligible());
        assert!(!Position::Dst.is_flex_eligible());
    }

    #[test]
    fn test_string_round_trip() {
        assert_eq!("qb".parse::<Position>().unwrap(), Position::QB);
        assert_eq!("D/ST".parse::<Position>().unwrap(), Position::Dst);
        assert_eq!("DEF".parse::<Position>().unwrap(), Position::Dst);
        assert_eq!(parse_lenient("LS"), Position::Other);
        assert_eq!(Position::Dst.to_string(), "DST");
    }

    #[test]
    fn test_offensive_line_detection() {
        assert!(Position::parse_is_offensive_line("C"));
        assert!(Position::parse_is_offensive_line("g"));
        assert!(Position::parse_is_offensive_line("T"));
        assert!(!Position::parse_is_offensive_line("QB"));
    }
}
