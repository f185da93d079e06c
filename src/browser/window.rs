//! Top-level browser windows.
//!
//! A [`Browser`] is a cheap handle: clones share one tab strip. Tabs
//! themselves are owned by the [`BrowserContext`](crate::BrowserContext); the
//! strip only records their order and which one is active.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::identifiers::{BrowserId, ProfileId, TabId};

// ============================================================================
// BrowserType
// ============================================================================

/// Kind of top-level window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BrowserType {
    /// Regular tabbed window.
    #[default]
    Normal,
    /// Popup without a tab strip.
    Popup,
    /// Application window.
    App,
    /// Developer tools window.
    DevTools,
}

// ============================================================================
// Types
// ============================================================================

#[derive(Default)]
struct TabStrip {
    tabs: Vec<TabId>,
    active: Option<usize>,
}

struct BrowserInner {
    id: BrowserId,
    uuid: Uuid,
    profile: ProfileId,
    browser_type: BrowserType,
    strip: Mutex<TabStrip>,
}

// ============================================================================
// Browser
// ============================================================================

/// A top-level window and its tab strip.
#[derive(Clone)]
pub struct Browser {
    inner: Arc<BrowserInner>,
}

// ============================================================================
// Browser - Display
// ============================================================================

impl fmt::Debug for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Browser")
            .field("id", &self.inner.id)
            .field("profile", &self.inner.profile)
            .field("browser_type", &self.inner.browser_type)
            .field("tab_count", &self.tab_count())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Browser {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Browser {}

// ============================================================================
// Browser - Constructor
// ============================================================================

impl Browser {
    /// Creates a window for `profile`.
    #[must_use]
    pub fn new(profile: ProfileId, browser_type: BrowserType) -> Self {
        let id = BrowserId::next();
        let uuid = Uuid::new_v4();
        debug!(browser_id = %id, uuid = %uuid, profile = %profile, ?browser_type, "Browser created");

        Self {
            inner: Arc::new(BrowserInner {
                id,
                uuid,
                profile,
                browser_type,
                strip: Mutex::new(TabStrip::default()),
            }),
        }
    }
}

// ============================================================================
// Browser - Accessors
// ============================================================================

impl Browser {
    /// Returns the browser ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> BrowserId {
        self.inner.id
    }

    /// Returns the window UUID.
    #[inline]
    #[must_use]
    pub fn uuid(&self) -> &Uuid {
        &self.inner.uuid
    }

    /// Returns the owning profile.
    #[inline]
    #[must_use]
    pub fn profile(&self) -> ProfileId {
        self.inner.profile
    }

    /// Returns the window kind.
    #[inline]
    #[must_use]
    pub fn browser_type(&self) -> BrowserType {
        self.inner.browser_type
    }
}

// ============================================================================
// Browser - Tab Strip
// ============================================================================

impl Browser {
    /// Appends a tab. The first tab becomes active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] if the tab is already in the strip.
    pub fn add_tab(&self, tab_id: TabId) -> Result<()> {
        let mut strip = self.inner.strip.lock();
        if strip.tabs.contains(&tab_id) {
            return Err(Error::contract(format!(
                "{tab_id} is already in {}",
                self.inner.id
            )));
        }
        strip.tabs.push(tab_id);
        if strip.active.is_none() {
            strip.active = Some(strip.tabs.len() - 1);
        }
        Ok(())
    }

    /// Removes a tab, returning `false` if it was not in the strip.
    ///
    /// Removing the active tab activates its right neighbour, or the left
    /// one if it was last.
    pub fn remove_tab(&self, tab_id: TabId) -> bool {
        let mut strip = self.inner.strip.lock();
        let Some(index) = strip.tabs.iter().position(|t| *t == tab_id) else {
            return false;
        };
        strip.tabs.remove(index);

        strip.active = match strip.active {
            _ if strip.tabs.is_empty() => None,
            Some(active) if active > index => Some(active - 1),
            Some(active) if active == index => Some(index.min(strip.tabs.len() - 1)),
            other => other,
        };
        true
    }

    /// Activates a tab.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TabNotFound`] if the tab is not in the strip.
    pub fn set_active_tab(&self, tab_id: TabId) -> Result<()> {
        let mut strip = self.inner.strip.lock();
        let index = strip
            .tabs
            .iter()
            .position(|t| *t == tab_id)
            .ok_or_else(|| Error::tab_not_found(tab_id))?;
        strip.active = Some(index);
        Ok(())
    }

    /// Returns the active tab.
    #[must_use]
    pub fn active_tab(&self) -> Option<TabId> {
        let strip = self.inner.strip.lock();
        strip.active.and_then(|i| strip.tabs.get(i).copied())
    }

    /// Returns the tabs in strip order.
    #[must_use]
    pub fn tabs(&self) -> Vec<TabId> {
        self.inner.strip.lock().tabs.clone()
    }

    /// Returns `true` if the tab is in the strip.
    #[must_use]
    pub fn contains_tab(&self, tab_id: TabId) -> bool {
        self.inner.strip.lock().tabs.contains(&tab_id)
    }

    /// Returns the number of tabs.
    #[inline]
    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.inner.strip.lock().tabs.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn browser() -> Browser {
        Browser::new(ProfileId::generate(), BrowserType::Normal)
    }

    #[test]
    fn test_first_tab_becomes_active() {
        let b = browser();
        let (t1, t2) = (TabId::next(), TabId::next());
        b.add_tab(t1).expect("t1");
        b.add_tab(t2).expect("t2");

        assert_eq!(b.active_tab(), Some(t1));
        assert_eq!(b.tabs(), vec![t1, t2]);
        assert!(b.add_tab(t1).is_err());
    }

    #[test]
    fn test_removing_active_tab_moves_selection() {
        let b = browser();
        let tabs: Vec<_> = (0..3).map(|_| TabId::next()).collect();
        for t in &tabs {
            b.add_tab(*t).expect("add");
        }
        b.set_active_tab(tabs[2]).expect("activate");

        assert!(b.remove_tab(tabs[2]));
        assert_eq!(b.active_tab(), Some(tabs[1]));

        assert!(b.remove_tab(tabs[0]));
        assert_eq!(b.active_tab(), Some(tabs[1]));

        assert!(b.remove_tab(tabs[1]));
        assert_eq!(b.active_tab(), None);
        assert!(!b.remove_tab(tabs[1]));
    }

    #[test]
    fn test_set_active_unknown_tab() {
        let b = browser();
        let err = b.set_active_tab(TabId::next()).unwrap_err();
        assert!(matches!(err, Error::TabNotFound { .. }));
    }

    #[test]
    fn test_clones_share_strip() {
        let b = browser();
        let c = b.clone();
        b.add_tab(TabId::next()).expect("add");

        assert_eq!(c.tab_count(), 1);
        assert_eq!(b, c);
    }
}
