//! Invalidation epochs.
//!
//! ## Purpose
//!
//! An [`Epoch`] is a token meaning "the threshold configuration of this
//! category has not changed since the token was minted". Cached gate
//! decisions carry the id of the epoch they were computed under, and a
//! decision is trusted only while that epoch is valid.
//!
//! Invalidation never has to know which decisions exist: retiring an epoch
//! makes every decision stamped with it stale at once, and readers notice on
//! their next access.
//!
//! ## Representation
//!
//! ```text
//! EpochLedger { next: AtomicU64, retired: AtomicU64 }
//!
//!   mint()        id = next.fetch_add(1)        (no other effect)
//!   invalidate()  retired.fetch_max(id)         (idempotent)
//!   is_valid()    id > retired.load()           (one atomic load)
//! ```
//!
//! `retired` only grows, so an invalidated epoch can never be observed as
//! valid again.
//!
//! A watermark retires every older id along with the one named, so minting
//! and invalidating stay inside the crate. The only public way to retire an
//! epoch is [`Invalidator::rotate`], which always retires the id just below
//! the one it minted. Every older id is already retired by then, so the
//! watermark retires exactly one token and the node is never left without
//! a live epoch.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Largest epoch id that still fits in a packed gate slot.
pub(crate) const MAX_EPOCH_ID: u64 = u64::MAX >> 2;

/// Per-node source of epoch tokens.
#[derive(Debug)]
pub struct EpochLedger {
    /// Next id to hand out. Id 0 is never minted.
    next: AtomicU64,
    /// Highest retired id.
    retired: AtomicU64,
}

impl EpochLedger {
    /// Create an empty ledger.
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            next: AtomicU64::new(1),
            retired: AtomicU64::new(0),
        })
    }

    /// Mint a fresh, valid epoch.
    pub(crate) fn mint(self: &Arc<Self>) -> Epoch {
        // Saturate rather than wrap: a wrapped id would resurrect retired epochs.
        let id = self
            .next
            .fetch_add(1, Ordering::Relaxed)
            .min(MAX_EPOCH_ID);
        Epoch {
            ledger: Arc::clone(self),
            id,
        }
    }

    /// Retire `id`. Invalidating twice is a no-op.
    ///
    /// Callers must only pass the newest id below the live one.
    #[inline]
    pub(crate) fn invalidate_id(&self, id: u64) {
        debug_assert!(
            id < self.next.load(Ordering::Relaxed).saturating_sub(1),
            "the newest epoch must stay live"
        );
        self.retired.fetch_max(id, Ordering::SeqCst);
    }

    /// Whether `epoch` is still valid.
    #[inline]
    pub fn is_valid(&self, epoch: &Epoch) -> bool {
        self.is_valid_id(epoch.id)
    }

    #[inline]
    pub(crate) fn is_valid_id(&self, id: u64) -> bool {
        id > self.retired.load(Ordering::Acquire)
    }
}

/// An invalidation token.
///
/// States: `valid --rotate()--> invalidated`. The transition is terminal and
/// only the owning [`Invalidator`] performs it.
#[derive(Clone)]
pub struct Epoch {
    ledger: Arc<EpochLedger>,
    id: u64,
}

impl Epoch {
    pub(crate) fn from_parts(ledger: Arc<EpochLedger>, id: u64) -> Self {
        Self { ledger, id }
    }

    /// Ledger-local id. Later epochs have larger ids.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this epoch is still valid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.ledger.is_valid_id(self.id)
    }
}

impl fmt::Debug for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Epoch")
            .field("id", &self.id)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl PartialEq for Epoch {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.ledger, &other.ledger) && self.id == other.id
    }
}

impl Eq for Epoch {}

/// Owner of a category node's current epoch.
///
/// Readers load the current id without locking. Rotation takes a per-node
/// mutex, publishes the new epoch, and only then retires the old one, so a
/// reader never observes "no current epoch".
#[derive(Debug)]
pub struct Invalidator {
    ledger: Arc<EpochLedger>,
    current: AtomicU64,
    rotate_lock: Mutex<()>,
}

impl Invalidator {
    /// Create an invalidator holding a freshly minted epoch.
    pub fn new() -> Self {
        let ledger = EpochLedger::new();
        let first = ledger.mint();
        Self {
            current: AtomicU64::new(first.id),
            ledger,
            rotate_lock: Mutex::new(()),
        }
    }

    /// The ledger backing this node's epochs.
    pub fn ledger(&self) -> &Arc<EpochLedger> {
        &self.ledger
    }

    /// The current epoch.
    pub fn current(&self) -> Epoch {
        Epoch::from_parts(Arc::clone(&self.ledger), self.current_id())
    }

    /// Id of the current epoch.
    ///
    /// Acquire pairs with the release in [`Invalidator::rotate`]: a reader that
    /// sees the new id also sees any threshold written before the rotation.
    #[inline]
    pub(crate) fn current_id(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Mint a new epoch, publish it, then retire the previous one.
    ///
    /// Returns the epoch that is now current.
    pub fn rotate(&self) -> Epoch {
        let _guard = self.rotate_lock.lock();
        let previous = self.current.load(Ordering::Acquire);
        let fresh = self.ledger.mint();
        self.current.store(fresh.id, Ordering::SeqCst);
        self.ledger.invalidate_id(previous);
        fresh
    }
}

impl Default for Invalidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_mint_is_valid_and_increasing() {
        let ledger = EpochLedger::new();
        let a = ledger.mint();
        let b = ledger.mint();
        assert!(a.is_valid());
        assert!(b.is_valid());
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let ledger = EpochLedger::new();
        let epoch = ledger.mint();
        let live = ledger.mint();

        ledger.invalidate_id(epoch.id());
        assert!(!epoch.is_valid());

        ledger.invalidate_id(epoch.id());
        assert!(!ledger.is_valid(&epoch));
        assert!(live.is_valid());
    }

    #[test]
    fn test_invalidate_leaves_newer_epochs_alone() {
        let ledger = EpochLedger::new();
        let old = ledger.mint();
        let new = ledger.mint();

        ledger.invalidate_id(old.id());
        assert!(!old.is_valid());
        assert!(new.is_valid());
    }

    #[test]
    #[should_panic(expected = "the newest epoch must stay live")]
    #[cfg(debug_assertions)]
    fn test_newest_epoch_cannot_be_retired() {
        let ledger = EpochLedger::new();
        let _older = ledger.mint();
        let newest = ledger.mint();
        ledger.invalidate_id(newest.id());
    }

    #[test]
    fn test_rotate_publishes_then_retires() {
        let invalidator = Invalidator::new();
        let before = invalidator.current();
        assert!(before.is_valid());

        let after = invalidator.rotate();
        assert!(!before.is_valid());
        assert!(after.is_valid());
        assert_eq!(invalidator.current(), after);
        assert_ne!(before, after);
    }

    #[test]
    fn test_rotate_retires_exactly_the_replaced_epoch() {
        let invalidator = Invalidator::new();
        let mut history = vec![invalidator.current()];

        for _ in 0..5 {
            let current = invalidator.rotate();
            history.push(current.clone());

            let (live, retired) = history.split_last().unwrap();
            assert!(live.is_valid());
            assert!(retired.iter().all(|e| !e.is_valid()));
        }
    }

    #[test]
    fn test_epoch_equality_is_per_ledger() {
        let a = Invalidator::new();
        let b = Invalidator::new();
        // Both start at id 1 but belong to different nodes.
        assert_eq!(a.current().id(), b.current().id());
        assert_ne!(a.current(), b.current());
    }

    #[test]
    fn test_retired_epoch_never_revives_under_concurrent_rotation() {
        let invalidator = Arc::new(Invalidator::new());
        let watched = invalidator.current();

        let writer = {
            let inv = Arc::clone(&invalidator);
            thread::spawn(move || {
                for _ in 0..1_000 {
                    inv.rotate();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let epoch = watched.clone();
                thread::spawn(move || {
                    let mut seen_invalid = false;
                    for _ in 0..10_000 {
                        let valid = epoch.is_valid();
                        assert!(!(seen_invalid && valid), "epoch revived");
                        seen_invalid |= !valid;
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert!(!watched.is_valid());
        assert!(invalidator.current().is_valid());
    }
}
