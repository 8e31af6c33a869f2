//! Severity levels for the gate.
//!
//! A `SeverityLevel` is nothing more than a numeric rank. Higher ranks are
//! more important. Two ranks are reserved:
//!
//! | Rank | Name | Meaning as a threshold | Meaning as a message severity |
//! |------|------|------------------------|-------------------------------|
//! | `i32::MAX` | `OFF` | logging disabled for the subtree | never emitted |
//! | `i32::MIN` | `ALL` | everything passes | only passes an `ALL` threshold |
//!
//! The named ranks cover both the `java.util.logging` vocabulary
//! (SEVERE, WARNING, CONFIG, FINE, FINER, FINEST) and the shorter
//! FATAL/ERROR/WARN/INFO/DEBUG/TRACE names. Aliases share a rank, so
//! `WARNING == WARN`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a level name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelParseError {
    /// Input was empty or whitespace.
    #[error("empty level name")]
    Empty,
    /// Input was neither a known name nor an integer rank.
    #[error("unknown level: {0}")]
    Unknown(String),
}

/// Number of named ranks, sentinels included.
pub const NAMED_LEVEL_COUNT: usize = 10;

/// A totally ordered log severity rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeverityLevel(i32);

impl SeverityLevel {
    /// Threshold sentinel: nothing is enabled.
    pub const OFF: Self = Self(i32::MAX);
    /// Unrecoverable failure.
    pub const FATAL: Self = Self(1100);
    /// Error condition.
    pub const ERROR: Self = Self(1000);
    /// Alias of [`SeverityLevel::ERROR`].
    pub const SEVERE: Self = Self::ERROR;
    /// Suspicious condition.
    pub const WARN: Self = Self(900);
    /// Alias of [`SeverityLevel::WARN`].
    pub const WARNING: Self = Self::WARN;
    /// Informational message.
    pub const INFO: Self = Self(800);
    /// Configuration message.
    pub const CONFIG: Self = Self(700);
    /// Debugging message.
    pub const DEBUG: Self = Self(500);
    /// Alias of [`SeverityLevel::DEBUG`].
    pub const FINE: Self = Self::DEBUG;
    /// Detailed tracing message.
    pub const TRACE: Self = Self(400);
    /// Alias of [`SeverityLevel::TRACE`].
    pub const FINER: Self = Self::TRACE;
    /// Most detailed tracing message.
    pub const FINEST: Self = Self(300);
    /// Threshold sentinel: everything is enabled.
    pub const ALL: Self = Self(i32::MIN);

    /// Every named rank, lowest first. Index positions are stable and back the
    /// fixed cache slots in [`crate::gate::GateCache`].
    pub const NAMED: [Self; NAMED_LEVEL_COUNT] = [
        Self::ALL,
        Self::FINEST,
        Self::TRACE,
        Self::DEBUG,
        Self::CONFIG,
        Self::INFO,
        Self::WARN,
        Self::ERROR,
        Self::FATAL,
        Self::OFF,
    ];

    /// Create a level from a raw rank.
    pub const fn from_rank(rank: i32) -> Self {
        Self(rank)
    }

    /// Get the raw rank.
    pub const fn rank(self) -> i32 {
        self.0
    }

    /// Whether this is the `OFF` sentinel.
    pub const fn is_off(self) -> bool {
        self.0 == i32::MAX
    }

    /// Decide whether a message at `severity` passes this level used as a threshold.
    ///
    /// `OFF` as a threshold rejects everything. Otherwise the message passes when
    /// its rank is at least the threshold's.
    #[inline]
    pub fn permits(self, severity: SeverityLevel) -> bool {
        !self.is_off() && severity.0 >= self.0
    }

    /// Position in [`SeverityLevel::NAMED`], if this is a named rank.
    #[inline]
    pub fn named_slot(self) -> Option<usize> {
        match self.0 {
            i32::MIN => Some(0),
            300 => Some(1),
            400 => Some(2),
            500 => Some(3),
            700 => Some(4),
            800 => Some(5),
            900 => Some(6),
            1000 => Some(7),
            1100 => Some(8),
            i32::MAX => Some(9),
            _ => None,
        }
    }

    /// Canonical name of a named rank.
    pub fn name(self) -> Option<&'static str> {
        match self.0 {
            i32::MIN => Some("ALL"),
            300 => Some("FINEST"),
            400 => Some("TRACE"),
            500 => Some("DEBUG"),
            700 => Some("CONFIG"),
            800 => Some("INFO"),
            900 => Some("WARN"),
            1000 => Some("ERROR"),
            1100 => Some("FATAL"),
            i32::MAX => Some("OFF"),
            _ => None,
        }
    }
}

impl Default for SeverityLevel {
    fn default() -> Self {
        Self::INFO
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl FromStr for SeverityLevel {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LevelParseError::Empty);
        }
        let level = match s.to_ascii_uppercase().as_str() {
            "OFF" => Self::OFF,
            "FATAL" => Self::FATAL,
            "ERROR" | "SEVERE" => Self::ERROR,
            "WARN" | "WARNING" => Self::WARN,
            "INFO" => Self::INFO,
            "CONFIG" => Self::CONFIG,
            "DEBUG" | "FINE" => Self::DEBUG,
            "TRACE" | "FINER" => Self::TRACE,
            "FINEST" => Self::FINEST,
            "ALL" => Self::ALL,
            _ => {
                return s
                    .parse::<i32>()
                    .map(Self)
                    .map_err(|_| LevelParseError::Unknown(s.to_string()))
            }
        };
        Ok(level)
    }
}

impl TryFrom<String> for SeverityLevel {
    type Error = LevelParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeverityLevel> for String {
    fn from(level: SeverityLevel) -> Self {
        level.to_string()
    }
}
