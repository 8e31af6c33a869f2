//! Core value types for the gate.

pub mod level;
pub mod category;

pub use level::{SeverityLevel, LevelParseError};
pub use category::{CategoryName, CategoryError};
