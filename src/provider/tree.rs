//! In-memory threshold tree with inheritance.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::types::{CategoryName, SeverityLevel};
use super::{EffectiveSeverityProvider, ResolveError};

/// Explicit per-category thresholds, inherited down the dotted hierarchy.
///
/// The root always has a threshold. Any other category either has an
/// explicit threshold or inherits the one of its nearest configured ancestor.
#[derive(Debug)]
pub struct LevelTree {
    root: RwLock<SeverityLevel>,
    explicit: RwLock<HashMap<CategoryName, SeverityLevel>>,
}

impl LevelTree {
    /// Create a tree whose root threshold is `root_level`.
    pub fn new(root_level: SeverityLevel) -> Self {
        Self {
            root: RwLock::new(root_level),
            explicit: RwLock::new(HashMap::new()),
        }
    }

    /// Set an explicit threshold. Returns the previous explicit threshold.
    ///
    /// Setting the root replaces the root threshold.
    pub fn set_level(&self, category: &CategoryName, level: SeverityLevel) -> Option<SeverityLevel> {
        if category.is_root() {
            let mut root = self.root.write();
            let previous = *root;
            *root = level;
            return Some(previous);
        }
        self.explicit.write().insert(category.clone(), level)
    }

    /// Remove an explicit threshold so the category inherits again.
    ///
    /// The root cannot be cleared; clearing it is a no-op returning `None`.
    pub fn clear_level(&self, category: &CategoryName) -> Option<SeverityLevel> {
        if category.is_root() {
            return None;
        }
        self.explicit.write().remove(category)
    }

    /// Explicit threshold of `category`, if any.
    pub fn level(&self, category: &CategoryName) -> Option<SeverityLevel> {
        if category.is_root() {
            return Some(*self.root.read());
        }
        self.explicit.read().get(category).copied()
    }

    /// Threshold in force for `category` after inheritance.
    pub fn effective_level(&self, category: &CategoryName) -> SeverityLevel {
        {
            let explicit = self.explicit.read();
            if let Some(level) = explicit.get(category) {
                return *level;
            }
            for ancestor in category.ancestors() {
                if let Some(level) = explicit.get(&ancestor) {
                    return *level;
                }
            }
        }
        *self.root.read()
    }
}

impl Default for LevelTree {
    fn default() -> Self {
        Self::new(SeverityLevel::INFO)
    }
}

impl EffectiveSeverityProvider for LevelTree {
    fn effective_severity(&self, category: &CategoryName) -> Result<SeverityLevel, ResolveError> {
        Ok(self.effective_level(category))
    }
}
