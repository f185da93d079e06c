//! Registry of top-level windows.
//!
//! [`BrowserList`] keeps windows in registration order plus a separate
//! last-active sequence, most recently activated last. Lookups that only need
//! "a window for this profile" consult the last-active sequence first.
//!
//! | Query | Order |
//! |-------|-------|
//! | [`find_browser_with_profile`](BrowserList::find_browser_with_profile) | last-active, then registration |
//! | [`find_browser_with_type`](BrowserList::find_browser_with_type) | last-active, then registration |
//! | [`find_browser_with_id`](BrowserList::find_browser_with_id) | any |
//! | [`last_active`](BrowserList::last_active) | last-active only |
//!
//! Observers run after the mutation is visible to queries and with no lock
//! held, so they may query the list. They must not add or remove observers.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::identifiers::{BrowserId, ObserverId, ProfileId, TabId};

use super::window::{Browser, BrowserType};

// ============================================================================
// BrowserListObserver
// ============================================================================

/// Receives registry changes.
pub trait BrowserListObserver: Send + Sync {
    /// A window was registered.
    fn on_browser_added(&self, _browser: &Browser) {}

    /// A window was unregistered.
    fn on_browser_removed(&self, _browser: &Browser) {}

    /// A window became the most recently active one.
    fn on_browser_set_last_active(&self, _browser: &Browser) {}

    /// The last window was unregistered.
    fn on_all_browsers_closed(&self) {}
}

// ============================================================================
// Types
// ============================================================================

#[derive(Default)]
struct ListState {
    browsers: Vec<Browser>,
    /// Most recently activated last.
    last_active: Vec<BrowserId>,
}

type ObserverEntry = (ObserverId, Arc<dyn BrowserListObserver>);

// ============================================================================
// BrowserList
// ============================================================================

/// Shared registry of top-level windows.
///
/// Clones are handles to the same registry.
#[derive(Clone, Default)]
pub struct BrowserList {
    state: Arc<RwLock<ListState>>,
    observers: Arc<Mutex<Vec<ObserverEntry>>>,
}

impl fmt::Debug for BrowserList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("BrowserList")
            .field("browsers", &state.browsers.len())
            .field("last_active", &state.last_active)
            .field("observers", &self.observers.lock().len())
            .finish()
    }
}

// ============================================================================
// BrowserList - Registration
// ============================================================================

impl BrowserList {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] if the window is already
    /// registered.
    pub fn add_browser(&self, browser: Browser) -> Result<()> {
        {
            let mut state = self.state.write();
            if state.browsers.iter().any(|b| b.id() == browser.id()) {
                error!(browser_id = %browser.id(), "Browser registered twice");
                return Err(Error::contract(format!("{} is already registered", browser.id())));
            }
            state.browsers.push(browser.clone());
        }

        info!(browser_id = %browser.id(), profile = %browser.profile(), "Browser added");
        self.notify(|o| o.on_browser_added(&browser));
        Ok(())
    }

    /// Unregisters a window and returns it.
    ///
    /// Emptying the registry signals
    /// [`on_all_browsers_closed`](BrowserListObserver::on_all_browsers_closed).
    ///
    /// # Errors
    ///
    /// Returns [`Error::BrowserNotFound`] if the window is not registered.
    pub fn remove_browser(&self, browser_id: BrowserId) -> Result<Browser> {
        let (browser, now_empty) = {
            let mut state = self.state.write();
            let index = state
                .browsers
                .iter()
                .position(|b| b.id() == browser_id)
                .ok_or_else(|| Error::browser_not_found(browser_id))?;
            let browser = state.browsers.remove(index);
            state.last_active.retain(|id| *id != browser_id);
            (browser, state.browsers.is_empty())
        };

        info!(browser_id = %browser_id, "Browser removed");
        self.notify(|o| o.on_browser_removed(&browser));
        if now_empty {
            debug!("All browsers closed");
            self.notify(|o| o.on_all_browsers_closed());
        }
        Ok(browser)
    }

    /// Marks a window as the most recently active one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BrowserNotFound`] if the window is not registered.
    pub fn set_last_active(&self, browser_id: BrowserId) -> Result<()> {
        let browser = {
            let mut state = self.state.write();
            let browser = state
                .browsers
                .iter()
                .find(|b| b.id() == browser_id)
                .cloned()
                .ok_or_else(|| Error::browser_not_found(browser_id))?;
            state.last_active.retain(|id| *id != browser_id);
            state.last_active.push(browser_id);
            browser
        };

        self.notify(|o| o.on_browser_set_last_active(&browser));
        Ok(())
    }
}

// ============================================================================
// BrowserList - Queries
// ============================================================================

impl BrowserList {
    /// Returns the number of registered windows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().browsers.len()
    }

    /// Returns `true` if no window is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().browsers.is_empty()
    }

    /// Returns the windows in registration order.
    #[must_use]
    pub fn browsers(&self) -> Vec<Browser> {
        self.state.read().browsers.clone()
    }

    /// Returns the last-active sequence, most recent last.
    #[must_use]
    pub fn last_active_order(&self) -> Vec<BrowserId> {
        self.state.read().last_active.clone()
    }

    /// Returns the most recently activated window.
    #[must_use]
    pub fn last_active(&self) -> Option<Browser> {
        let state = self.state.read();
        let id = state.last_active.last()?;
        state.browsers.iter().find(|b| b.id() == *id).cloned()
    }

    /// Looks a window up by ID.
    #[must_use]
    pub fn find_browser_with_id(&self, browser_id: BrowserId) -> Option<Browser> {
        self.state
            .read()
            .browsers
            .iter()
            .find(|b| b.id() == browser_id)
            .cloned()
    }

    /// Finds a window for `profile`.
    ///
    /// Prefers the most recently activated match and falls back to the
    /// first registered one, so windows that were never activated are still
    /// found.
    #[must_use]
    pub fn find_browser_with_profile(&self, profile: ProfileId) -> Option<Browser> {
        self.find_preferring_last_active(|b| b.profile() == profile)
    }

    /// Finds a window of `browser_type` for `profile`.
    ///
    /// Same ordering as [`find_browser_with_profile`](Self::find_browser_with_profile).
    #[must_use]
    pub fn find_browser_with_type(
        &self,
        profile: ProfileId,
        browser_type: BrowserType,
    ) -> Option<Browser> {
        self.find_preferring_last_active(|b| {
            b.profile() == profile && b.browser_type() == browser_type
        })
    }

    /// Counts the windows of `profile`.
    #[must_use]
    pub fn browser_count_with_profile(&self, profile: ProfileId) -> usize {
        self.state
            .read()
            .browsers
            .iter()
            .filter(|b| b.profile() == profile)
            .count()
    }

    /// Returns every tab of every window, in registration then strip order.
    #[must_use]
    pub fn all_tabs(&self) -> Vec<(BrowserId, TabId)> {
        self.state
            .read()
            .browsers
            .iter()
            .flat_map(|b| {
                let id = b.id();
                b.tabs().into_iter().map(move |tab| (id, tab))
            })
            .collect()
    }

    /// Returns the window whose strip holds `tab_id`.
    #[must_use]
    pub fn browser_for_tab(&self, tab_id: TabId) -> Option<Browser> {
        self.state
            .read()
            .browsers
            .iter()
            .find(|b| b.contains_tab(tab_id))
            .cloned()
    }

    fn find_preferring_last_active(&self, predicate: impl Fn(&Browser) -> bool) -> Option<Browser> {
        let state = self.state.read();
        let by_id = |id: &BrowserId| state.browsers.iter().find(|b| b.id() == *id);

        state
            .last_active
            .iter()
            .rev()
            .filter_map(by_id)
            .find(|b| predicate(b))
            .or_else(|| state.browsers.iter().find(|b| predicate(b)))
            .cloned()
    }
}

// ============================================================================
// BrowserList - Observers
// ============================================================================

impl BrowserList {
    /// Registers an observer.
    pub fn add_observer(&self, observer: Arc<dyn BrowserListObserver>) -> ObserverId {
        let id = ObserverId::next();
        self.observers.lock().push((id, observer));
        debug!(observer_id = %id, "Observer added");
        id
    }

    /// Unregisters an observer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] if the observer was never added
    /// or was already removed.
    pub fn remove_observer(&self, observer_id: ObserverId) -> Result<()> {
        let mut observers = self.observers.lock();
        let Some(index) = observers.iter().position(|(id, _)| *id == observer_id) else {
            error!(observer_id = %observer_id, "Removing an unknown observer");
            return Err(Error::contract(format!("{observer_id} is not registered")));
        };
        observers.remove(index);
        Ok(())
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    fn notify(&self, dispatch: impl Fn(&dyn BrowserListObserver)) {
        let snapshot: Vec<_> = self
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        let before = snapshot.len();

        for observer in &snapshot {
            dispatch(observer.as_ref());
        }

        let after = self.observers.lock().len();
        if after != before {
            error!(before, after, "Observer list changed during dispatch");
            debug_assert_eq!(before, after, "observer list changed during dispatch");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
