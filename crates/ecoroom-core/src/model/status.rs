use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::Error;

/// Per-day cleaning status of a stay.
///
/// The persisted and published form of each variant is the short code used
/// on the printed sheets (`C/I`, `C/O`, `〇`, `エコドア`, `×`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CleaningStatus {
    #[serde(rename = "C/I")]
    CheckIn,
    #[serde(rename = "C/O")]
    CheckOut,
    /// Full-service clean, every third interior day.
    #[serde(rename = "〇")]
    CleanFull,
    /// Reduced service for door-eco guests.
    #[serde(rename = "エコドア")]
    EcoDoor,
    #[serde(rename = "×")]
    Skip,
}

impl CleaningStatus {
    pub const ALL: [Self; 5] = [
        Self::CheckIn,
        Self::CheckOut,
        Self::CleanFull,
        Self::EcoDoor,
        Self::Skip,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CheckIn => "C/I",
            Self::CheckOut => "C/O",
            Self::CleanFull => "〇",
            Self::EcoDoor => "エコドア",
            Self::Skip => "×",
        }
    }

    /// Check-in and check-out days are fixed by the stay dates.
    #[must_use]
    pub const fn is_boundary(self) -> bool {
        matches!(self, Self::CheckIn | Self::CheckOut)
    }

    /// Parse the exact published code. Returns `None` for anything else,
    /// including aliases accepted by [`FromStr`].
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == code.trim())
    }
}

impl fmt::Display for CleaningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CleaningStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(status) = Self::from_code(s) {
            return Ok(status);
        }
        match s.trim().to_ascii_lowercase().as_str() {
            "check-in" | "checkin" | "ci" => Ok(Self::CheckIn),
            "check-out" | "checkout" | "co" => Ok(Self::CheckOut),
            "clean" | "full" | "o" => Ok(Self::CleanFull),
            "eco-door" | "ecodoor" | "eco" => Ok(Self::EcoDoor),
            "skip" | "x" => Ok(Self::Skip),
            other => Err(Error::invalid(format!(
                "unknown cleaning status '{other}': expected one of C/I, C/O, 〇 (clean), エコドア (eco-door), × (skip)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CleaningStatus;

    #[test]
    fn codes_round_trip_through_from_code() {
        for status in CleaningStatus::ALL {
            assert_eq!(CleaningStatus::from_code(status.as_str()), Some(status));
        }
    }

    #[test]
    fn ascii_aliases_parse() {
        assert_eq!("skip".parse::<CleaningStatus>().ok(), Some(CleaningStatus::Skip));
        assert_eq!("Eco-Door".parse::<CleaningStatus>().ok(), Some(CleaningStatus::EcoDoor));
        assert_eq!("clean".parse::<CleaningStatus>().ok(), Some(CleaningStatus::CleanFull));
        assert!("vacuum".parse::<CleaningStatus>().is_err());
    }

    #[test]
    fn serde_uses_published_codes() {
        let json = serde_json::to_string(&CleaningStatus::CleanFull).expect("serialize");
        assert_eq!(json, "\"〇\"");
        let back: CleaningStatus = serde_json::from_str("\"C/O\"").expect("deserialize");
        assert_eq!(back, CleaningStatus::CheckOut);
    }

    #[test]
    fn only_check_in_and_out_are_boundaries() {
        let boundaries: Vec<_> = CleaningStatus::ALL
            .into_iter()
            .filter(|s| s.is_boundary())
            .collect();
        assert_eq!(
            boundaries,
            vec![CleaningStatus::CheckIn, CleaningStatus::CheckOut]
        );
    }
}
