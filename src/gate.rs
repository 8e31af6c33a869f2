//! Per-category gate decisions.
//!
//! ## Purpose
//!
//! A [`CategoryGate`] answers "is `severity` enabled for this category?" on
//! every logging call. The answer is computed once per epoch and cached in a
//! [`GateCache`]; later calls only check that the epoch the answer was
//! computed under is still valid.
//!
//! ## Hot Path
//!
//! ```text
//! decide(severity)
//!   slot = cache[severity]                  one atomic load
//!   if slot.populated && ledger.valid(slot.epoch)
//!       return slot.enabled                 no locks, no allocation
//!   recompute(severity)                     cold
//! ```
//!
//! ## Slot Encoding
//!
//! A decision is packed into one `u64`:
//!
//! | Bits | Field |
//! |------|-------|
//! | 0 | disabled flag |
//! | 1 | populated flag |
//! | 2..64 | epoch id |
//!
//! Stores use `fetch_max`, so a slower racer can never replace a decision
//! bound to a newer epoch. Within one epoch a disabled answer outranks an
//! enabled one.
//!
//! ## Miss Path Ordering
//!
//! The current epoch is read *before* the provider is consulted. If a
//! threshold change lands while the provider runs, the captured epoch is
//! retired by the matching notification and the stored decision is
//! recomputed on its next read.

use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::epoch::{Epoch, Invalidator, MAX_EPOCH_ID};
use crate::provider::EffectiveSeverityProvider;
use crate::types::{CategoryName, SeverityLevel};
use crate::types::level::NAMED_LEVEL_COUNT;

const DISABLED: u64 = 0b01;
const POPULATED: u64 = 0b10;
const EPOCH_SHIFT: u32 = 2;

#[inline]
pub(crate) fn pack(enabled: bool, epoch_id: u64) -> u64 {
    let flags = if enabled { POPULATED } else { POPULATED | DISABLED };
    (epoch_id.min(MAX_EPOCH_ID) << EPOCH_SHIFT) | flags
}

#[inline]
pub(crate) fn is_populated(packed: u64) -> bool {
    packed & POPULATED != 0
}

#[inline]
pub(crate) fn is_enabled(packed: u64) -> bool {
    is_populated(packed) && packed & DISABLED == 0
}

#[inline]
pub(crate) fn epoch_of(packed: u64) -> u64 {
    packed >> EPOCH_SHIFT
}

/// Cached decisions for one category, one entry per severity.
///
/// Named severities get fixed lock-free slots. Any other rank is kept in a
/// bounded LRU behind a read-mostly lock.
#[derive(Debug)]
pub struct GateCache {
    named: [AtomicU64; NAMED_LEVEL_COUNT],
    custom: RwLock<LruCache<i32, u64>>,
}

impl GateCache {
    /// Create an empty cache holding up to `custom_capacity` non-named ranks.
    pub fn new(custom_capacity: usize) -> Self {
        let cap = NonZeroUsize::new(custom_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            named: std::array::from_fn(|_| AtomicU64::new(0)),
            custom: RwLock::new(LruCache::new(cap)),
        }
    }

    #[inline]
    pub(crate) fn load(&self, severity: SeverityLevel) -> u64 {
        match severity.named_slot() {
            Some(i) => self.named[i].load(Ordering::Acquire),
            None => self.load_custom(severity),
        }
    }

    #[cold]
    fn load_custom(&self, severity: SeverityLevel) -> u64 {
        // peek keeps the read lock sufficient; recency is refreshed on store.
        self.custom
            .read()
            .peek(&severity.rank())
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn store(&self, severity: SeverityLevel, packed: u64) {
        match severity.named_slot() {
            Some(i) => {
                self.named[i].fetch_max(packed, Ordering::AcqRel);
            }
            None => {
                let mut custom = self.custom.write();
                let merged = custom
                    .peek(&severity.rank())
                    .map_or(packed, |existing| (*existing).max(packed));
                custom.put(severity.rank(), merged);
            }
        }
    }

    /// Number of non-named ranks currently cached.
    pub fn custom_len(&self) -> usize {
        self.custom.read().len()
    }

    /// Capacity for non-named ranks.
    pub fn custom_cap(&self) -> usize {
        self.custom.read().cap().get()
    }
}

/// A cached decision and the epoch it is bound to.
///
/// Trustworthy only while [`GateDecision::is_current`] holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    /// Whether the severity was enabled.
    pub enabled: bool,
    /// Epoch the decision was computed under.
    pub epoch: Epoch,
}

impl GateDecision {
    /// Whether the bound epoch is still valid.
    pub fn is_current(&self) -> bool {
        self.epoch.is_valid()
    }
}

/// Result of [`CategoryGate::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateResult {
    /// Whether the severity is enabled.
    pub enabled: bool,
    /// Whether this result came from cache.
    pub cache_hit: bool,
}

/// Counters kept by every category gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    /// Provider consultations (cache misses and stale reads).
    pub recomputations: u64,
    /// Epoch rotations on this node.
    pub invalidations: u64,
    /// Provider errors folded to `OFF`.
    pub provider_failures: u64,
}

#[derive(Debug, Default)]
struct GateCounters {
    recomputations: AtomicU64,
    invalidations: AtomicU64,
    provider_failures: AtomicU64,
}

/// Gate state for one category node.
///
/// Owns the node's current epoch and its decision cache. Nodes are created
/// by [`crate::GateRegistry`] and live for the registry's lifetime.
pub struct CategoryGate {
    name: CategoryName,
    invalidator: Invalidator,
    cache: GateCache,
    provider: Arc<dyn EffectiveSeverityProvider>,
    children: RwLock<Vec<Arc<CategoryGate>>>,
    counters: GateCounters,
}

impl CategoryGate {
    pub(crate) fn new(
        name: CategoryName,
        provider: Arc<dyn EffectiveSeverityProvider>,
        custom_capacity: usize,
    ) -> Self {
        Self {
            name,
            invalidator: Invalidator::new(),
            cache: GateCache::new(custom_capacity),
            provider,
            children: RwLock::new(Vec::new()),
            counters: GateCounters::default(),
        }
    }

    /// Category this gate belongs to.
    pub fn name(&self) -> &CategoryName {
        &self.name
    }

    /// Whether a message at `severity` should proceed.
    #[inline]
    pub fn decide(&self, severity: SeverityLevel) -> bool {
        is_enabled(self.resolve(severity))
    }

    /// Like [`CategoryGate::decide`], also reporting whether the cache answered.
    pub fn evaluate(&self, severity: SeverityLevel) -> GateResult {
        let cached = self.cache.load(severity);
        if self.is_trusted(cached) {
            return GateResult {
                enabled: is_enabled(cached),
                cache_hit: true,
            };
        }
        GateResult {
            enabled: is_enabled(self.recompute(severity)),
            cache_hit: false,
        }
    }

    /// The decision for `severity` together with its epoch.
    pub fn decision(&self, severity: SeverityLevel) -> GateDecision {
        let packed = self.resolve(severity);
        GateDecision {
            enabled: is_enabled(packed),
            epoch: Epoch::from_parts(Arc::clone(self.invalidator.ledger()), epoch_of(packed)),
        }
    }

    /// The node's current epoch.
    pub fn current_epoch(&self) -> Epoch {
        self.invalidator.current()
    }

    /// Rotate this node's epoch only, leaving descendants untouched.
    ///
    /// Use [`crate::GateRegistry::notify_threshold_changed`] for threshold
    /// changes; it also rotates every descendant.
    pub fn invalidate(&self) -> Epoch {
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        self.invalidator.rotate()
    }

    /// Rotate this node and every descendant. Returns the number of nodes rotated.
    pub(crate) fn invalidate_subtree(&self) -> usize {
        self.invalidate();
        let mut rotated = 1;
        let mut pending = self.children();
        while let Some(node) = pending.pop() {
            node.invalidate();
            rotated += 1;
            pending.extend(node.children());
        }
        rotated
    }

    /// Direct children created so far.
    pub fn children(&self) -> Vec<Arc<CategoryGate>> {
        self.children.read().clone()
    }

    pub(crate) fn adopt(&self, child: Arc<CategoryGate>) {
        self.children.write().push(child);
    }

    /// Snapshot of this node's counters.
    pub fn stats(&self) -> GateStats {
        GateStats {
            recomputations: self.counters.recomputations.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
            provider_failures: self.counters.provider_failures.load(Ordering::Relaxed),
        }
    }

    /// Access to the decision cache.
    pub fn cache(&self) -> &GateCache {
        &self.cache
    }

    #[inline]
    pub(crate) fn is_trusted(&self, packed: u64) -> bool {
        is_populated(packed) && self.invalidator.ledger().is_valid_id(epoch_of(packed))
    }

    /// Cached packed decision if still trusted, otherwise a fresh one.
    #[inline]
    pub(crate) fn resolve(&self, severity: SeverityLevel) -> u64 {
        let cached = self.cache.load(severity);
        if self.is_trusted(cached) {
            return cached;
        }
        self.recompute(severity)
    }

    #[cold]
    #[inline(never)]
    pub(crate) fn recompute(&self, severity: SeverityLevel) -> u64 {
        // Capture the epoch first; see "Miss Path Ordering".
        let epoch_id = self.invalidator.current_id();

        let threshold = match self.provider.effective_severity(&self.name) {
            Ok(level) => level,
            Err(err) => {
                self.counters.provider_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    category = %self.name,
                    error = %err,
                    "threshold resolution failed, suppressing"
                );
                SeverityLevel::OFF
            }
        };

        let enabled = threshold.permits(severity);
        let packed = pack(enabled, epoch_id);
        self.cache.store(severity, packed);
        self.counters.recomputations.fetch_add(1, Ordering::Relaxed);

        tracing::trace!(
            category = %self.name,
            level = %severity,
            threshold = %threshold,
            enabled,
            epoch = epoch_id,
            "gate recomputed"
        );
        packed
    }
}

impl std::fmt::Debug for CategoryGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryGate")
            .field("name", &self.name)
            .field("epoch", &self.invalidator.current_id())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
