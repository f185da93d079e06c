//! Per-tab navigation history.
//!
//! The controller keeps three kinds of entries:
//!
//! | Kind | Count | Lifetime |
//! |------|-------|----------|
//! | committed | up to `max_entries` | until pruned or truncated |
//! | pending | 0..1 | until committed or discarded |
//! | transient | 0..1 | while an interstitial shows |
//!
//! The active entry is the transient one if present, then the pending one,
//! then the last committed one.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use tracing::{debug, trace};
use url::Url;

use crate::identifiers::{PageId, SiteInstanceId};
use crate::protocol::PageTransition;

use super::site_instance::SiteInstance;

// ============================================================================
// NavigationEntry
// ============================================================================

/// One page in a tab's history.
#[derive(Debug, Clone)]
pub struct NavigationEntry {
    /// Renderer-assigned page ID, set on commit.
    pub page_id: Option<PageId>,
    /// Page URL.
    pub url: Url,
    /// Referring page.
    pub referrer: Option<Url>,
    /// Page title.
    pub title: String,
    /// How the entry was reached.
    pub transition: PageTransition,
    /// Site instance that committed (or must commit) the entry.
    pub site_instance: Option<SiteInstance>,
    /// HTTP status of the committed response.
    pub http_status: u16,
    /// Entry stands in for an interstitial page.
    pub is_transient: bool,
}

impl NavigationEntry {
    /// Creates an uncommitted entry.
    #[must_use]
    pub fn new(url: Url, transition: PageTransition) -> Self {
        Self {
            page_id: None,
            url,
            referrer: None,
            title: String::new(),
            transition,
            site_instance: None,
            http_status: 0,
            is_transient: false,
        }
    }

    /// Creates a transient entry for an interstitial.
    #[must_use]
    pub fn transient(url: Url) -> Self {
        Self {
            is_transient: true,
            ..Self::new(url, PageTransition::Link)
        }
    }

    /// Sets the referrer.
    #[inline]
    #[must_use]
    pub fn with_referrer(mut self, referrer: Option<Url>) -> Self {
        self.referrer = referrer;
        self
    }

    /// Returns the title, or the URL if untitled.
    #[must_use]
    pub fn title_for_display(&self) -> &str {
        if self.title.is_empty() {
            self.url.as_str()
        } else {
            &self.title
        }
    }

    fn matches(&self, page_id: PageId, site_instance_id: SiteInstanceId) -> bool {
        self.page_id == Some(page_id)
            && self
                .site_instance
                .as_ref()
                .is_some_and(|si| si.id() == site_instance_id)
    }
}

// ============================================================================
// Commit Types
// ============================================================================

/// What the renderer committed, after URL validation.
#[derive(Debug, Clone)]
pub struct CommitParams {
    /// Renderer-assigned page ID.
    pub page_id: PageId,
    /// Validated URL.
    pub url: Url,
    /// Validated referrer.
    pub referrer: Option<Url>,
    /// How the navigation was initiated.
    pub transition: PageTransition,
    /// Committing site instance.
    pub site_instance: SiteInstance,
    /// HTTP status.
    pub http_status: u16,
}

/// Result of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDetails {
    /// A new history entry was created.
    pub is_new_entry: bool,
    /// URL of the previously committed entry.
    pub previous_url: Option<Url>,
    /// Index of the committed entry.
    pub index: usize,
}

// ============================================================================
// NavigationController
// ============================================================================

#[derive(Debug)]
struct PendingEntry {
    entry: NavigationEntry,
    /// Index of the existing entry being revisited.
    index: Option<usize>,
}

/// History of one tab.
#[derive(Debug)]
pub struct NavigationController {
    entries: VecDeque<NavigationEntry>,
    last_committed: Option<usize>,
    pending: Option<PendingEntry>,
    transient: Option<NavigationEntry>,
    max_entries: usize,
    max_title_chars: usize,
}

// ============================================================================
// NavigationController - Constructor
// ============================================================================

impl NavigationController {
    /// Creates an empty history.
    #[must_use]
    pub fn new(max_entries: usize, max_title_chars: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            last_committed: None,
            pending: None,
            transient: None,
            max_entries: max_entries.max(1),
            max_title_chars,
        }
    }
}

// ============================================================================
// NavigationController - Accessors
// ============================================================================

impl NavigationController {
    /// Returns the number of committed entries.
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns a committed entry.
    #[inline]
    #[must_use]
    pub fn entry_at(&self, index: usize) -> Option<&NavigationEntry> {
        self.entries.get(index)
    }

    /// Returns the index of the last committed entry.
    #[inline]
    #[must_use]
    pub fn last_committed_index(&self) -> Option<usize> {
        self.last_committed
    }

    /// Returns the last committed entry.
    #[must_use]
    pub fn last_committed_entry(&self) -> Option<&NavigationEntry> {
        self.last_committed.and_then(|i| self.entries.get(i))
    }

    /// Returns the pending entry.
    #[inline]
    #[must_use]
    pub fn pending_entry(&self) -> Option<&NavigationEntry> {
        self.pending.as_ref().map(|p| &p.entry)
    }

    /// Returns the transient entry.
    #[inline]
    #[must_use]
    pub fn transient_entry(&self) -> Option<&NavigationEntry> {
        self.transient.as_ref()
    }

    /// Returns the entry the tab currently shows.
    #[must_use]
    pub fn active_entry(&self) -> Option<&NavigationEntry> {
        self.transient
            .as_ref()
            .or_else(|| self.pending_entry())
            .or_else(|| self.last_committed_entry())
    }

    /// Returns `true` if there is an entry before the current one.
    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.last_committed.is_some_and(|i| i > 0)
    }

    /// Returns `true` if there is an entry after the current one.
    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        self.last_committed
            .is_some_and(|i| i + 1 < self.entries.len())
    }
}

// ============================================================================
// NavigationController - Starting Navigations
// ============================================================================

impl NavigationController {
    /// Starts a navigation to a new entry.
    pub fn load_url(
        &mut self,
        url: Url,
        referrer: Option<Url>,
        transition: PageTransition,
    ) -> &NavigationEntry {
        self.discard_non_committed();
        debug!(url = %url, ?transition, "Pending navigation");
        let entry = NavigationEntry::new(url, transition).with_referrer(referrer);
        &self.pending.insert(PendingEntry { entry, index: None }).entry
    }

    /// Starts reloading the current entry.
    ///
    /// Returns `None` if nothing is committed.
    pub fn reload(&mut self) -> Option<&NavigationEntry> {
        let index = self.last_committed?;
        self.go_to_index_with(index, PageTransition::Reload)
    }

    /// Starts navigating back one entry.
    pub fn go_back(&mut self) -> Option<&NavigationEntry> {
        let index = self.last_committed?.checked_sub(1)?;
        self.go_to_index(index)
    }

    /// Starts navigating forward one entry.
    pub fn go_forward(&mut self) -> Option<&NavigationEntry> {
        let index = self.last_committed? + 1;
        self.go_to_index(index)
    }

    /// Starts navigating to an existing entry.
    pub fn go_to_index(&mut self, index: usize) -> Option<&NavigationEntry> {
        let transition = self.entries.get(index)?.transition;
        self.go_to_index_with(index, transition)
    }

    fn go_to_index_with(
        &mut self,
        index: usize,
        transition: PageTransition,
    ) -> Option<&NavigationEntry> {
        let mut entry = self.entries.get(index)?.clone();
        entry.transition = transition;
        self.discard_non_committed();
        trace!(index, url = %entry.url, "Pending history navigation");
        Some(
            &self
                .pending
                .insert(PendingEntry {
                    entry,
                    index: Some(index),
                })
                .entry,
        )
    }

    /// Shows a transient entry in front of the history.
    pub fn set_transient_entry(&mut self, entry: NavigationEntry) {
        self.transient = Some(NavigationEntry {
            is_transient: true,
            ..entry
        });
    }
}

// ============================================================================
// NavigationController - Commit
// ============================================================================

impl NavigationController {
    /// Records a committed navigation.
    pub fn did_commit(&mut self, params: CommitParams) -> CommitDetails {
        let previous_url = self.last_committed_entry().map(|e| e.url.clone());
        self.transient = None;
        let pending = self.pending.take();

        let existing = self
            .entries
            .iter()
            .position(|e| e.matches(params.page_id, params.site_instance.id()));

        let (index, is_new_entry) = match existing {
            Some(index) => {
                if let Some(entry) = self.entries.get_mut(index) {
                    entry.url = params.url;
                    entry.http_status = params.http_status;
                }
                (index, false)
            }
            None => {
                let title = pending
                    .filter(|p| p.entry.url == params.url)
                    .map(|p| p.entry.title)
                    .unwrap_or_default();
                let entry = NavigationEntry {
                    page_id: Some(params.page_id),
                    url: params.url,
                    referrer: params.referrer,
                    title,
                    transition: params.transition,
                    site_instance: Some(params.site_instance),
                    http_status: params.http_status,
                    is_transient: false,
                };
                (self.push_entry(entry), true)
            }
        };

        self.last_committed = Some(index);
        debug!(index, is_new_entry, count = self.entries.len(), "Navigation committed");

        CommitDetails {
            is_new_entry,
            previous_url,
            index,
        }
    }

    fn push_entry(&mut self, entry: NavigationEntry) -> usize {
        if let Some(last) = self.last_committed {
            self.entries.truncate(last + 1);
        }
        self.entries.push_back(entry);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        self.entries.len() - 1
    }

    /// Updates the title of a committed page.
    ///
    /// Returns `true` if the title changed.
    pub fn set_title(
        &mut self,
        page_id: PageId,
        site_instance_id: SiteInstanceId,
        title: &str,
    ) -> bool {
        let max = self.max_title_chars;
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.matches(page_id, site_instance_id))
        else {
            return false;
        };

        let title: String = title.chars().take(max).collect();
        if entry.title == title {
            return false;
        }
        entry.title = title;
        true
    }
}

// ============================================================================
// NavigationController - Discarding
// ============================================================================

impl NavigationController {
    /// Drops the pending entry.
    pub fn discard_pending(&mut self) {
        self.pending = None;
    }

    /// Drops the transient entry.
    ///
    /// Returns `true` if there was one.
    pub fn discard_transient(&mut self) -> bool {
        self.transient.take().is_some()
    }

    /// Drops the pending and transient entries.
    pub fn discard_non_committed(&mut self) {
        self.pending = None;
        self.transient = None;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::browser::site_instance::BrowsingInstance;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid url")
    }

    fn commit(
        controller: &mut NavigationController,
        site: &SiteInstance,
        page_id: i32,
        u: &str,
    ) -> CommitDetails {
        controller.did_commit(CommitParams {
            page_id: PageId::new(page_id),
            url: url(u),
            referrer: None,
            transition: PageTransition::Link,
            site_instance: site.clone(),
            http_status: 200,
        })
    }

    #[test]
    fn test_load_and_commit() {
        let bi = BrowsingInstance::new();
        let site = bi.site_instance_for_url(&url("https://a.example/"));
        let mut controller = NavigationController::new(50, 4096);

        controller.load_url(url("https://a.example/"), None, PageTransition::Typed);
        assert!(controller.pending_entry().is_some());

        let details = commit(&mut controller, &site, 1, "https://a.example/");
        assert!(details.is_new_entry);
        assert_eq!(details.previous_url, None);
        assert!(controller.pending_entry().is_none());
        assert_eq!(controller.entry_count(), 1);
    }

    #[test]
    fn test_back_and_forward() {
        let bi = BrowsingInstance::new();
        let site = bi.site_instance_for_url(&url("https://a.example/"));
        let mut controller = NavigationController::new(50, 4096);

        commit(&mut controller, &site, 1, "https://a.example/1");
        commit(&mut controller, &site, 2, "https://a.example/2");
        assert!(controller.can_go_back());
        assert!(!controller.can_go_forward());

        let back = controller.go_back().expect("back").clone();
        assert_eq!(back.page_id, Some(PageId::new(1)));

        let details = commit(&mut controller, &site, 1, "https://a.example/1");
        assert!(!details.is_new_entry);
        assert_eq!(details.index, 0);
        assert!(controller.can_go_forward());
    }

    #[test]
    fn test_new_entry_truncates_forward_history() {
        let bi = BrowsingInstance::new();
        let site = bi.site_instance_for_url(&url("https://a.example/"));
        let mut controller = NavigationController::new(50, 4096);

        commit(&mut controller, &site, 1, "https://a.example/1");
        commit(&mut controller, &site, 2, "https://a.example/2");
        controller.go_back();
        commit(&mut controller, &site, 1, "https://a.example/1");
        commit(&mut controller, &site, 3, "https://a.example/3");

        assert_eq!(controller.entry_count(), 2);
        assert!(!controller.can_go_forward());
    }

    #[test]
    fn test_entries_are_bounded() {
        let bi = BrowsingInstance::new();
        let site = bi.site_instance_for_url(&url("https://a.example/"));
        let mut controller = NavigationController::new(3, 4096);

        for i in 1..=5 {
            commit(&mut controller, &site, i, &format!("https://a.example/{i}"));
        }

        assert_eq!(controller.entry_count(), 3);
        assert_eq!(
            controller.entry_at(0).map(|e| e.url.as_str()),
            Some("https://a.example/3")
        );
        assert_eq!(controller.last_committed_index(), Some(2));
    }

    #[test]
    fn test_transient_entry_is_active_until_discarded() {
        let bi = BrowsingInstance::new();
        let site = bi.site_instance_for_url(&url("https://a.example/"));
        let mut controller = NavigationController::new(50, 4096);
        commit(&mut controller, &site, 1, "https://a.example/");

        controller.set_transient_entry(NavigationEntry::new(
            url("data:text/html,warning"),
            PageTransition::Link,
        ));
        assert!(controller.active_entry().is_some_and(|e| e.is_transient));

        assert!(controller.discard_transient());
        assert_eq!(
            controller.active_entry().map(|e| e.url.as_str()),
            Some("https://a.example/")
        );
    }

    #[test]
    fn test_title_truncated() {
        let bi = BrowsingInstance::new();
        let site = bi.site_instance_for_url(&url("https://a.example/"));
        let mut controller = NavigationController::new(50, 4);
        commit(&mut controller, &site, 1, "https://a.example/");

        assert!(controller.set_title(PageId::new(1), site.id(), "abcdefgh"));
        assert_eq!(controller.last_committed_entry().map(|e| e.title.as_str()), Some("abcd"));
        assert!(!controller.set_title(PageId::new(1), site.id(), "abcd"));
        assert!(!controller.set_title(PageId::new(9), site.id(), "x"));
    }

    #[test]
    fn test_reload_requires_commit() {
        let mut controller = NavigationController::new(50, 4096);
        assert!(controller.reload().is_none());
    }
}
