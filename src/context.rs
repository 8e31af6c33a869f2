//! Threshold configuration and gating in one place.
//!
//! [`LogContext`] pairs a [`LevelTree`] with a [`GateRegistry`] and keeps
//! them consistent: every threshold mutation goes through
//! [`LogContext::set_level`] or [`LogContext::clear_level`], which update the
//! tree first and then notify the registry.

use std::sync::Arc;

use crate::binding::CallSiteBinding;
use crate::config::{ConfigError, GateConfig};
use crate::gate::CategoryGate;
use crate::provider::LevelTree;
use crate::registry::GateRegistry;
use crate::types::{CategoryName, SeverityLevel};

/// Owns thresholds and the gates that cache decisions about them.
#[derive(Debug)]
pub struct LogContext {
    tree: Arc<LevelTree>,
    gates: GateRegistry,
}

impl LogContext {
    /// Create a context from a validated configuration.
    pub fn new(config: GateConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let tree = Arc::new(LevelTree::new(config.root_level));
        let gates = GateRegistry::with_config(tree.clone(), config);
        Ok(Self { tree, gates })
    }

    /// Create a context configured from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(GateConfig::from_env()?)
    }

    /// Set an explicit threshold and invalidate affected decisions.
    pub fn set_level(&self, category: &CategoryName, level: SeverityLevel) -> Option<SeverityLevel> {
        let previous = self.tree.set_level(category, level);
        self.gates.notify_threshold_changed(category);
        tracing::debug!(category = %category, level = %level, "threshold set");
        previous
    }

    /// Remove an explicit threshold and invalidate affected decisions.
    pub fn clear_level(&self, category: &CategoryName) -> Option<SeverityLevel> {
        let previous = self.tree.clear_level(category);
        if previous.is_some() {
            self.gates.notify_threshold_changed(category);
            tracing::debug!(category = %category, "threshold cleared");
        }
        previous
    }

    /// Explicit threshold of `category`, if any.
    pub fn level(&self, category: &CategoryName) -> Option<SeverityLevel> {
        self.tree.level(category)
    }

    /// Threshold in force for `category`.
    pub fn effective_level(&self, category: &CategoryName) -> SeverityLevel {
        self.tree.effective_level(category)
    }

    /// Gate handle for `category`.
    pub fn category(&self, category: &CategoryName) -> Arc<CategoryGate> {
        self.gates.category(category)
    }

    /// Whether a message at `severity` in `category` should proceed.
    pub fn decide(&self, category: &CategoryName, severity: SeverityLevel) -> bool {
        self.gates.decide(category, severity)
    }

    /// Like [`LogContext::decide`] for an unvalidated name.
    ///
    /// A malformed name is never enabled.
    pub fn is_enabled(&self, category: &str, severity: SeverityLevel) -> bool {
        match CategoryName::new(category) {
            Ok(name) => self.decide(&name, severity),
            Err(_) => false,
        }
    }

    /// Call-site binding for `(category, severity)`.
    pub fn binding(&self, category: &CategoryName, severity: SeverityLevel) -> CallSiteBinding {
        self.gates.binding(category, severity)
    }

    /// The underlying registry.
    pub fn registry(&self) -> &GateRegistry {
        &self.gates
    }

    /// The underlying threshold tree.
    pub fn tree(&self) -> &Arc<LevelTree> {
        &self.tree
    }
}

impl Default for LogContext {
    fn default() -> Self {
        let config = GateConfig::default();
        let tree = Arc::new(LevelTree::new(config.root_level));
        let gates = GateRegistry::with_config(tree.clone(), config);
        Self { tree, gates }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> CategoryName {
        CategoryName::new(s).unwrap()
    }

    #[test]
    fn test_set_level_invalidates() {
        let ctx = LogContext::default();
        let net = name("svc.net");

        assert!(!ctx.decide(&net, SeverityLevel::DEBUG));
        assert_eq!(ctx.set_level(&net, SeverityLevel::DEBUG), None);
        assert!(ctx.decide(&net, SeverityLevel::DEBUG));
        assert_eq!(ctx.level(&net), Some(SeverityLevel::DEBUG));
    }

    #[test]
    fn test_clear_level_restores_inherited() {
        let ctx = LogContext::default();
        let net = name("svc.net");
        ctx.set_level(&net, SeverityLevel::OFF);
        assert!(!ctx.decide(&net, SeverityLevel::FATAL));

        assert_eq!(ctx.clear_level(&net), Some(SeverityLevel::OFF));
        assert!(ctx.decide(&net, SeverityLevel::FATAL));
        assert_eq!(ctx.effective_level(&net), SeverityLevel::INFO);

        // Clearing again changes nothing and does not invalidate.
        let before = ctx.category(&net).stats().invalidations;
        assert_eq!(ctx.clear_level(&net), None);
        assert_eq!(ctx.category(&net).stats().invalidations, before);
    }

    #[test]
    fn test_is_enabled_rejects_bad_names() {
        let ctx = LogContext::default();
        assert!(ctx.is_enabled("svc", SeverityLevel::ERROR));
        assert!(!ctx.is_enabled("svc..bad", SeverityLevel::ERROR));
    }

    #[test]
    fn test_new_validates_config() {
        let config = GateConfig {
            custom_level_capacity: 0,
            ..GateConfig::default()
        };
        assert!(LogContext::new(config).is_err());

        let config = GateConfig {
            root_level: SeverityLevel::WARN,
            ..GateConfig::default()
        };
        let ctx = LogContext::new(config).unwrap();
        assert!(!ctx.is_enabled("svc", SeverityLevel::INFO));
    }
}
