//! Effective-severity providers.
//!
//! The gate never resolves inheritance itself. On a cache miss it asks an
//! [`EffectiveSeverityProvider`] for the category's effective threshold.

pub mod tree;

use crate::types::{CategoryName, SeverityLevel};

/// Error type for threshold resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The provider has no configuration for this category.
    #[error("unknown category: {0}")]
    UnknownCategory(CategoryName),
    /// The provider could not be consulted.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Source of effective severity thresholds.
///
/// Implementations must be cheap enough to call on every cache miss and must
/// reflect a threshold change before the matching
/// [`crate::GateRegistry::notify_threshold_changed`] call is made.
pub trait EffectiveSeverityProvider: Send + Sync {
    /// Resolve the effective threshold for `category`.
    ///
    /// May return [`SeverityLevel::OFF`]. Errors are treated as `OFF` by the gate.
    fn effective_severity(&self, category: &CategoryName) -> Result<SeverityLevel, ResolveError>;
}

impl<F> EffectiveSeverityProvider for F
where
    F: Fn(&CategoryName) -> Result<SeverityLevel, ResolveError> + Send + Sync,
{
    fn effective_severity(&self, category: &CategoryName) -> Result<SeverityLevel, ResolveError> {
        self(category)
    }
}

pub use tree::LevelTree;
