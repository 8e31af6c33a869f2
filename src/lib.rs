//! # level-gate
//!
//! Epoch-stamped enablement cache for hierarchical log categories.
//!
//! The gate answers one question on every logging call:
//!
//! > Is a message at this severity enabled for this category?
//!
//! ## Core Contract
//!
//! 1. The answer for a `(category, severity)` pair is computed once from the
//!    category's effective threshold and cached
//! 2. Repeated calls pay one atomic load and one epoch check
//! 3. A threshold change retires the epochs of the changed category and its
//!    descendants; stale answers are recomputed lazily on next use
//!
//! ## Architecture
//!
//! ```text
//! CallSiteBinding ──→ CategoryGate ──→ GateCache[severity]
//!                          │                 │ stale or empty
//!                          │                 ↓
//!                          │       EffectiveSeverityProvider
//!                          ↓
//!                     Invalidator (current Epoch)
//!                          ↑
//!              GateRegistry::notify_threshold_changed
//! ```
//!
//! ## Failure Policy
//!
//! Deciding never fails. Provider errors and the `OFF` sentinel both yield
//! "disabled".

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod epoch;
pub mod provider;
pub mod gate;
pub mod binding;
pub mod registry;
pub mod context;
pub mod config;

// Re-exports
pub use types::{SeverityLevel, LevelParseError, CategoryName, CategoryError};
pub use epoch::{Epoch, EpochLedger, Invalidator};
pub use provider::{EffectiveSeverityProvider, ResolveError, LevelTree};
pub use gate::{CategoryGate, GateCache, GateDecision, GateResult, GateStats};
pub use binding::{CallSiteBinding, LazyCallSite};
pub use registry::GateRegistry;
pub use context::LogContext;
pub use config::{GateConfig, ConfigError};
