//! Core types used throughout sbdsim.

use std::fmt;
use std::str::FromStr;

/// Configured signal-quality profile of the simulated radio link.
///
/// The profile bounds the signal bar value (0..=5) the emulator samples on
/// each ticker pass, and doubles as the numeric answer to `AT+CSQ` /
/// `AT+CSQF` (the wire value is the variant's position, `None` = 0 through
/// `Random` = 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignalRating {
    /// No link at all; the session always fails.
    None,
    /// 0..=2 bars; sessions mostly fail.
    Poor,
    /// 1..=2 bars; sessions usually succeed.
    Ok,
    /// 3..=4 bars; sessions always succeed.
    Good,
    /// Pinned at 5 bars.
    Excellent,
    /// Anything from 0 to 5 bars, tick to tick.
    #[default]
    Random,
}

impl SignalRating {
    /// Inclusive `(min, max)` range of signal bars this rating can produce.
    pub fn bar_range(&self) -> (u8, u8) {
        match self {
            SignalRating::None => (0, 0),
            SignalRating::Poor => (0, 2),
            SignalRating::Ok => (1, 2),
            SignalRating::Good => (3, 4),
            SignalRating::Excellent => (5, 5),
            SignalRating::Random => (0, 5),
        }
    }

    /// Numeric wire value reported by `AT+CSQ` and `AT+CSQF`.
    pub fn wire_value(&self) -> u8 {
        match self {
            SignalRating::None => 0,
            SignalRating::Poor => 1,
            SignalRating::Ok => 2,
            SignalRating::Good => 3,
            SignalRating::Excellent => 4,
            SignalRating::Random => 5,
        }
    }
}

impl fmt::Display for SignalRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalRating::None => "NONE",
            SignalRating::Poor => "POOR",
            SignalRating::Ok => "OK",
            SignalRating::Good => "GOOD",
            SignalRating::Excellent => "EXCELLENT",
            SignalRating::Random => "RANDOM",
        };
        write!(f, "{s}")
    }
}

/// Error returned when a string cannot be parsed into a [`SignalRating`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRatingError(String);

impl fmt::Display for ParseRatingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown signal rating: {}", self.0)
    }
}

impl std::error::Error for ParseRatingError {}

impl FromStr for SignalRating {
    type Err = ParseRatingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NONE" => Ok(SignalRating::None),
            "POOR" => Ok(SignalRating::Poor),
            "OK" => Ok(SignalRating::Ok),
            "GOOD" => Ok(SignalRating::Good),
            "EXCELLENT" => Ok(SignalRating::Excellent),
            "RANDOM" => Ok(SignalRating::Random),
            other => Err(ParseRatingError(other.to_string())),
        }
    }
}
