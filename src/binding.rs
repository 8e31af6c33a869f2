//! Call-site bindings.
//!
//! A [`CallSiteBinding`] pins one `(category, severity)` pair and remembers
//! the last decision it observed. While that decision's epoch is valid the
//! binding answers from its own slot without touching the category cache;
//! once the epoch is retired it resolves through the gate again and rebinds.
//!
//! Observable behavior is identical to calling [`CategoryGate::decide`]
//! directly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::gate::{is_enabled, CategoryGate};
use crate::registry::GateRegistry;
use crate::types::{CategoryName, SeverityLevel};

/// Reusable gate handle for one logging call site.
#[derive(Debug)]
pub struct CallSiteBinding {
    gate: Arc<CategoryGate>,
    severity: SeverityLevel,
    observed: AtomicU64,
    specialized: bool,
}

impl CallSiteBinding {
    /// Bind `severity` on `gate`, caching decisions at the call site.
    pub fn new(gate: Arc<CategoryGate>, severity: SeverityLevel) -> Self {
        Self::with_mode(gate, severity, true)
    }

    /// Bind without a call-site slot; every check goes through the gate cache.
    pub fn unspecialized(gate: Arc<CategoryGate>, severity: SeverityLevel) -> Self {
        Self::with_mode(gate, severity, false)
    }

    pub(crate) fn with_mode(gate: Arc<CategoryGate>, severity: SeverityLevel, specialized: bool) -> Self {
        Self {
            gate,
            severity,
            observed: AtomicU64::new(0),
            specialized,
        }
    }

    /// Whether the bound severity is enabled for the bound category.
    #[inline]
    pub fn check_enabled(&self) -> bool {
        if self.specialized {
            let observed = self.observed.load(Ordering::Acquire);
            if self.gate.is_trusted(observed) {
                return is_enabled(observed);
            }
        }
        self.rebind()
    }

    #[cold]
    fn rebind(&self) -> bool {
        let packed = self.gate.resolve(self.severity);
        if self.specialized {
            self.observed.fetch_max(packed, Ordering::AcqRel);
        }
        is_enabled(packed)
    }

    /// Whether the call site currently holds a trusted decision.
    pub fn is_bound(&self) -> bool {
        self.specialized && self.gate.is_trusted(self.observed.load(Ordering::Acquire))
    }

    /// Whether this binding keeps its own decision slot.
    pub fn is_specialized(&self) -> bool {
        self.specialized
    }

    /// Bound category.
    pub fn category(&self) -> &CategoryName {
        self.gate.name()
    }

    /// Bound severity.
    pub fn severity(&self) -> SeverityLevel {
        self.severity
    }

    /// Gate this binding resolves through.
    pub fn gate(&self) -> &Arc<CategoryGate> {
        &self.gate
    }
}

/// A call site that creates its binding on first use.
///
/// Meant for `static` items next to a logging statement:
///
/// ```rust,ignore
/// static NET_DEBUG: LazyCallSite = LazyCallSite::new("svc.net", SeverityLevel::DEBUG);
///
/// if NET_DEBUG.check_enabled(&registry) {
///     // build and emit the record
/// }
/// ```
///
/// The binding is created against the first registry passed in and kept for
/// the life of the call site. A malformed category name is never enabled.
#[derive(Debug)]
pub struct LazyCallSite {
    category: &'static str,
    severity: SeverityLevel,
    binding: OnceLock<Option<CallSiteBinding>>,
}

impl LazyCallSite {
    /// Declare a call site.
    pub const fn new(category: &'static str, severity: SeverityLevel) -> Self {
        Self {
            category,
            severity,
            binding: OnceLock::new(),
        }
    }

    /// Whether the call site is enabled, binding it on first use.
    #[inline]
    pub fn check_enabled(&self, registry: &GateRegistry) -> bool {
        self.binding
            .get_or_init(|| match CategoryName::new(self.category) {
                Ok(name) => Some(registry.binding(&name, self.severity)),
                Err(err) => {
                    tracing::warn!(category = self.category, error = %err, "call site disabled");
                    None
                }
            })
            .as_ref()
            .map_or(false, CallSiteBinding::check_enabled)
    }

    /// The binding, if the call site has been used.
    pub fn binding(&self) -> Option<&CallSiteBinding> {
        self.binding.get().and_then(Option::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LevelTree;

    fn setup(root: SeverityLevel) -> (Arc<LevelTree>, GateRegistry) {
        let tree = Arc::new(LevelTree::new(root));
        let registry = GateRegistry::new(tree.clone());
        (tree, registry)
    }

    #[test]
    fn test_binding_reuses_observed_decision() {
        let (_tree, registry) = setup(SeverityLevel::INFO);
        let name = CategoryName::new("svc.net").unwrap();
        let binding = registry.binding(&name, SeverityLevel::WARN);

        assert!(!binding.is_bound());
        assert!(binding.check_enabled());
        assert!(binding.is_bound());
        assert!(binding.check_enabled());

        assert_eq!(binding.gate().stats().recomputations, 1);
    }

    #[test]
    fn test_binding_rebinds_after_invalidation() {
        let (tree, registry) = setup(SeverityLevel::INFO);
        let name = CategoryName::new("svc.net").unwrap();
        let binding = registry.binding(&name, SeverityLevel::WARN);
        assert!(binding.check_enabled());

        tree.set_level(&name, SeverityLevel::OFF);
        registry.notify_threshold_changed(&name);
        assert!(!binding.is_bound());
        assert!(!binding.check_enabled());
        assert!(binding.is_bound());

        // Rebound decision is served without consulting the provider.
        let before = binding.gate().stats().recomputations;
        assert!(!binding.check_enabled());
        assert_eq!(binding.gate().stats().recomputations, before);
    }

    #[test]
    fn test_bindings_share_gate_cache() {
        let (_tree, registry) = setup(SeverityLevel::INFO);
        let name = CategoryName::new("svc").unwrap();
        let a = registry.binding(&name, SeverityLevel::ERROR);
        let b = registry.binding(&name, SeverityLevel::ERROR);

        assert!(a.check_enabled());
        assert!(b.check_enabled());
        // Second binding found the gate cache already populated.
        assert_eq!(a.gate().stats().recomputations, 1);
    }

    #[test]
    fn test_unspecialized_binding_matches() {
        let (tree, registry) = setup(SeverityLevel::INFO);
        let name = CategoryName::new("svc").unwrap();
        let plain = CallSiteBinding::unspecialized(registry.category(&name), SeverityLevel::DEBUG);

        assert!(!plain.check_enabled());
        assert!(!plain.is_bound());

        tree.set_level(&name, SeverityLevel::DEBUG);
        registry.notify_threshold_changed(&name);
        assert!(plain.check_enabled());
    }

    #[test]
    fn test_lazy_call_site() {
        static SITE: LazyCallSite = LazyCallSite::new("lazy.site", SeverityLevel::WARN);
        static BAD_SITE: LazyCallSite = LazyCallSite::new("lazy..site", SeverityLevel::FATAL);

        let (_tree, registry) = setup(SeverityLevel::INFO);
        assert!(SITE.binding().is_none());
        assert!(SITE.check_enabled(&registry));
        assert_eq!(SITE.binding().map(|b| b.category().as_str()), Some("lazy.site"));

        assert!(!BAD_SITE.check_enabled(&registry));
        assert!(BAD_SITE.binding().is_none());
    }
}
