//! Category gate registry.
//!
//! Maps category names to their [`CategoryGate`] nodes, creating nodes (and
//! any missing ancestors) on first use. Nodes are never removed.
//!
//! The name lookup takes a read lock; callers on hot paths should hold on to
//! the returned `Arc<CategoryGate>` or a [`CallSiteBinding`], both of which
//! decide without locking.
//!
//! ## Threshold Changes
//!
//! ```text
//! set threshold on P  →  notify_threshold_changed(P)
//!                           rotate P
//!                           rotate every descendant of P
//! ```
//!
//! Descendants are rotated because their cached decisions are stamped with
//! their own epochs, even when they inherit P's threshold.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::binding::CallSiteBinding;
use crate::config::GateConfig;
use crate::gate::CategoryGate;
use crate::provider::EffectiveSeverityProvider;
use crate::types::{CategoryName, SeverityLevel};

/// Registry of category gates sharing one provider.
pub struct GateRegistry {
    provider: Arc<dyn EffectiveSeverityProvider>,
    config: GateConfig,
    root: Arc<CategoryGate>,
    nodes: RwLock<HashMap<CategoryName, Arc<CategoryGate>>>,
}

impl GateRegistry {
    /// Create a registry with the default configuration.
    pub fn new(provider: Arc<dyn EffectiveSeverityProvider>) -> Self {
        Self::with_config(provider, GateConfig::default())
    }

    /// Create a registry with a custom configuration.
    pub fn with_config(provider: Arc<dyn EffectiveSeverityProvider>, config: GateConfig) -> Self {
        let root = Arc::new(CategoryGate::new(
            CategoryName::root(),
            Arc::clone(&provider),
            config.custom_level_capacity,
        ));
        let mut nodes = HashMap::new();
        nodes.insert(CategoryName::root(), Arc::clone(&root));

        Self {
            provider,
            config,
            root,
            nodes: RwLock::new(nodes),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The root gate.
    pub fn root(&self) -> Arc<CategoryGate> {
        Arc::clone(&self.root)
    }

    /// Get the gate for `name`, creating it and its ancestors if needed.
    pub fn category(&self, name: &CategoryName) -> Arc<CategoryGate> {
        if let Some(gate) = self.nodes.read().get(name) {
            return Arc::clone(gate);
        }

        let mut nodes = self.nodes.write();
        // Another thread may have created it between the locks.
        if let Some(gate) = nodes.get(name) {
            return Arc::clone(gate);
        }

        // Walk down from the nearest existing ancestor.
        let mut missing = vec![name.clone()];
        let mut parent = Arc::clone(&self.root);
        for ancestor in name.ancestors() {
            match nodes.get(&ancestor) {
                Some(gate) => {
                    parent = Arc::clone(gate);
                    break;
                }
                None => missing.push(ancestor),
            }
        }

        for category in missing.into_iter().rev() {
            let gate = Arc::new(CategoryGate::new(
                category.clone(),
                Arc::clone(&self.provider),
                self.config.custom_level_capacity,
            ));
            parent.adopt(Arc::clone(&gate));
            nodes.insert(category, Arc::clone(&gate));
            parent = gate;
        }

        tracing::trace!(category = %name, nodes = nodes.len(), "category gate created");
        parent
    }

    /// Get the gate for `name` without creating it.
    pub fn get(&self, name: &CategoryName) -> Option<Arc<CategoryGate>> {
        self.nodes.read().get(name).cloned()
    }

    /// Whether a message at `severity` in `category` should proceed.
    pub fn decide(&self, category: &CategoryName, severity: SeverityLevel) -> bool {
        self.category(category).decide(severity)
    }

    /// Create a call-site binding for `(category, severity)`.
    ///
    /// When call-site bindings are disabled in the configuration the binding
    /// forwards every check to the gate cache.
    pub fn binding(&self, category: &CategoryName, severity: SeverityLevel) -> CallSiteBinding {
        CallSiteBinding::with_mode(
            self.category(category),
            severity,
            self.config.call_site_bindings,
        )
    }

    /// Invalidate cached decisions after a threshold change on `category`.
    ///
    /// Rotates the epoch of `category` and of every descendant. Returns the
    /// number of nodes rotated; zero when the category has never been used,
    /// since nothing can be cached below it.
    pub fn notify_threshold_changed(&self, category: &CategoryName) -> usize {
        let Some(gate) = self.get(category) else {
            tracing::debug!(category = %category, "threshold changed on unused category");
            return 0;
        };
        let rotated = gate.invalidate_subtree();
        tracing::debug!(category = %category, rotated, "threshold changed, gates invalidated");
        rotated
    }

    /// Number of category nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// Whether only the root exists.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl std::fmt::Debug for GateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateRegistry")
            .field("config", &self.config)
            .field("nodes", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LevelTree;

    fn name(s: &str) -> CategoryName {
        CategoryName::new(s).unwrap()
    }

    #[test]
    fn test_category_creates_ancestors() {
        let registry = GateRegistry::new(Arc::new(LevelTree::default()));
        assert!(registry.is_empty());

        let gate = registry.category(&name("a.b.c"));
        assert_eq!(gate.name(), &name("a.b.c"));
        assert_eq!(registry.len(), 4);

        let a = registry.get(&name("a")).unwrap();
        assert_eq!(a.children().len(), 1);
        assert_eq!(registry.root().children().len(), 1);

        // Same handle on repeated lookup.
        assert!(Arc::ptr_eq(&gate, &registry.category(&name("a.b.c"))));
    }

    #[test]
    fn test_sibling_attaches_to_existing_parent() {
        let registry = GateRegistry::new(Arc::new(LevelTree::default()));
        registry.category(&name("svc.net"));
        registry.category(&name("svc.db"));

        let svc = registry.get(&name("svc")).unwrap();
        assert_eq!(svc.children().len(), 2);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_notify_rotates_subtree_only() {
        let registry = GateRegistry::new(Arc::new(LevelTree::default()));
        let net = registry.category(&name("svc.net"));
        let db = registry.category(&name("svc.db"));
        let other = registry.category(&name("other"));

        let net_epoch = net.current_epoch();
        let other_epoch = other.current_epoch();

        assert_eq!(registry.notify_threshold_changed(&name("svc")), 3);
        assert!(!net_epoch.is_valid());
        assert!(other_epoch.is_valid());
        assert_eq!(db.stats().invalidations, 1);
    }

    #[test]
    fn test_notify_unused_category_is_noop() {
        let registry = GateRegistry::new(Arc::new(LevelTree::default()));
        assert_eq!(registry.notify_threshold_changed(&name("never.used")), 0);
        assert!(registry.get(&name("never.used")).is_none());
    }

    #[test]
    fn test_disabled_bindings_config() {
        let config = GateConfig {
            call_site_bindings: false,
            ..GateConfig::default()
        };
        let registry = GateRegistry::with_config(Arc::new(LevelTree::default()), config);
        let binding = registry.binding(&name("svc"), SeverityLevel::INFO);
        assert!(!binding.is_specialized());
        assert!(binding.check_enabled());
    }
}
