//! Interstitial control.

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

use crate::browser::interstitial::{InterstitialPage, InterstitialPageDelegate};

use super::{TabEvent, WebContents};

// ============================================================================
// WebContents - Interstitial
// ============================================================================

impl WebContents {
    /// Covers the tab with an interstitial for `url`.
    ///
    /// An interstitial already showing is dismissed first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] once the tab is closing, or the
    /// error of starting the interstitial's renderer.
    pub fn show_interstitial(
        &mut self,
        url: Url,
        new_navigation: bool,
        delegate: Box<dyn InterstitialPageDelegate>,
    ) -> Result<()> {
        self.ensure_open()?;

        if let Some(previous) = self.interstitial.as_mut() {
            debug!(tab_id = %self.tab_id, "Replacing the shown interstitial");
            previous.dismiss(&mut self.manager, &mut self.controller);
        }
        self.release_hidden_interstitial();

        let mut page = InterstitialPage::new(
            self.tab_id,
            url.clone(),
            new_navigation,
            delegate,
            self.services.clone(),
            self.registry.clone(),
        );
        let result = page.show(&mut self.manager, &mut self.controller, &mut self.host_events);
        if result.is_ok() {
            self.interstitial = Some(page);
            self.emit(TabEvent::InterstitialShown { url });
        }
        self.process_host_events();
        result
    }

    /// Proceeds through the shown interstitial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoInterstitial`] if none is shown, or
    /// [`Error::ContractViolation`] if it was already decided.
    pub fn proceed_interstitial(&mut self) -> Result<()> {
        let page = self
            .interstitial
            .as_mut()
            .ok_or_else(|| Error::no_interstitial(self.tab_id))?;
        let result = page.proceed(&mut self.manager, &mut self.controller);
        self.release_hidden_interstitial();
        result
    }

    /// Dismisses the shown interstitial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoInterstitial`] if none is shown, or
    /// [`Error::ContractViolation`] if it was already decided.
    pub fn dont_proceed_interstitial(&mut self) -> Result<()> {
        let page = self
            .interstitial
            .as_mut()
            .ok_or_else(|| Error::no_interstitial(self.tab_id))?;
        let result = page.dont_proceed(&mut self.manager, &mut self.controller);
        self.release_hidden_interstitial();
        result
    }
}

// ============================================================================
// Tests
// ============================================================================
