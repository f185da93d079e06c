//! Navigation and commit handling.

use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::GlobalRoutingId;
use crate::protocol::PageTransition;

use crate::browser::delegate::FrameCommit;
use crate::browser::manager::CommitOutcome;
use crate::browser::navigation::{CommitParams, NavigationEntry};

use super::{CloseState, TabEvent, WebContents};

// ============================================================================
// WebContents - Navigation
// ============================================================================

impl WebContents {
    /// Navigates to `url` as if typed.
    ///
    /// Returns the route of the host carrying the navigation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] for an unparseable URL,
    /// [`Error::ContractViolation`] once the tab is closing, or the error of
    /// starting the renderer.
    pub fn load_url(&mut self, url: &str) -> Result<GlobalRoutingId> {
        let url = Url::parse(url)?;
        self.load_url_with(url, None, PageTransition::Typed)
    }

    /// Navigates to `url` with an explicit referrer and transition.
    ///
    /// # Errors
    ///
    /// See [`load_url`](Self::load_url).
    pub fn load_url_with(
        &mut self,
        url: Url,
        referrer: Option<Url>,
        transition: PageTransition,
    ) -> Result<GlobalRoutingId> {
        self.ensure_open()?;

        if let Some(page) = self.interstitial.as_mut() {
            page.on_navigation_started();
        }

        debug!(tab_id = %self.tab_id, url = %url, ?transition, "Loading URL");
        let entry = self.controller.load_url(url, referrer, transition).clone();
        self.navigate_to_pending(&entry, false)
    }

    /// Navigates back one entry.
    ///
    /// Returns `None` if there is nothing to go back to.
    ///
    /// # Errors
    ///
    /// See [`load_url`](Self::load_url).
    pub fn go_back(&mut self) -> Result<Option<GlobalRoutingId>> {
        self.ensure_open()?;
        let Some(entry) = self.controller.go_back().cloned() else {
            return Ok(None);
        };
        self.navigate_to_pending(&entry, false).map(Some)
    }

    /// Navigates forward one entry.
    ///
    /// # Errors
    ///
    /// See [`load_url`](Self::load_url).
    pub fn go_forward(&mut self) -> Result<Option<GlobalRoutingId>> {
        self.ensure_open()?;
        let Some(entry) = self.controller.go_forward().cloned() else {
            return Ok(None);
        };
        self.navigate_to_pending(&entry, false).map(Some)
    }

    /// Navigates to an existing entry.
    ///
    /// # Errors
    ///
    /// See [`load_url`](Self::load_url).
    pub fn go_to_index(&mut self, index: usize) -> Result<Option<GlobalRoutingId>> {
        self.ensure_open()?;
        let Some(entry) = self.controller.go_to_index(index).cloned() else {
            return Ok(None);
        };
        self.navigate_to_pending(&entry, false).map(Some)
    }

    /// Reloads the current entry.
    ///
    /// # Errors
    ///
    /// See [`load_url`](Self::load_url).
    pub fn reload(&mut self) -> Result<Option<GlobalRoutingId>> {
        self.ensure_open()?;
        let Some(entry) = self.controller.reload().cloned() else {
            return Ok(None);
        };
        self.navigate_to_pending(&entry, true).map(Some)
    }

    /// Stops loading and abandons any pending navigation.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the visible renderer is unreachable.
    pub fn stop(&mut self) -> Result<()> {
        self.manager.cancel_pending();
        self.controller.discard_pending();
        if self.manager.current_host().is_live() {
            self.manager.current_host().stop()?;
        }
        Ok(())
    }

    fn navigate_to_pending(&mut self, entry: &NavigationEntry, is_reload: bool) -> Result<GlobalRoutingId> {
        let result = self.manager.navigate(entry, is_reload, &mut self.host_events);
        if result.is_err() {
            self.controller.discard_pending();
        }
        self.process_host_events();
        result
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.destroyed || self.close_state != CloseState::Open {
            return Err(Error::contract(format!(
                "{} is closing and cannot navigate",
                self.tab_id
            )));
        }
        Ok(())
    }
}

// ============================================================================
// WebContents - Commit
// ============================================================================

impl WebContents {
    /// Records a commit reported by one of this tab's hosts.
    pub(crate) fn did_navigate(&mut self, route: GlobalRoutingId, commit: FrameCommit) {
        if !commit.is_main_frame {
            trace!(tab_id = %self.tab_id, route = %route, url = %commit.url, "Subframe committed");
            return;
        }

        match self.manager.did_navigate(route) {
            CommitOutcome::Stale => {
                warn!(tab_id = %self.tab_id, route = %route, "Commit from a stale host dropped");
                return;
            }
            CommitOutcome::Current => {}
            CommitOutcome::Swapped { old_route } => {
                debug!(tab_id = %self.tab_id, old = %old_route, new = %route, "Tab switched renderer");
            }
        }

        let site_instance = self.manager.current_host().site_instance().clone();
        site_instance.set_site(&commit.url);

        let url = commit.url.clone();
        let details = self.controller.did_commit(CommitParams {
            page_id: commit.page_id,
            url: commit.url,
            referrer: commit.referrer,
            transition: commit.transition,
            site_instance,
            http_status: commit.http_status,
        });

        if let Some(page) = self.interstitial.as_mut() {
            page.on_tab_navigation_committed(&mut self.manager, &mut self.controller);
        }
        self.release_hidden_interstitial();

        self.emit(TabEvent::NavigationCommitted { url, details });
    }
}

// ============================================================================
// Tests
// ============================================================================
