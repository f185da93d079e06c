//! Find, script execution, dialogs and visibility.

use std::path::PathBuf;

use tracing::debug;

use crate::error::Result;

use crate::browser::render_view_host::FindOptions;

use super::WebContents;

// ============================================================================
// WebContents - Find
// ============================================================================

impl WebContents {
    /// Searches the page for `text`.
    ///
    /// Returns the request ID carried by the resulting
    /// [`TabEvent::FindReply`](super::TabEvent::FindReply) events.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the visible renderer is unreachable.
    pub fn find(&mut self, text: &str, options: FindOptions) -> Result<u32> {
        self.manager.current_host_mut().start_finding(text, options)
    }

    /// Ends the find session.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the visible renderer is unreachable.
    pub fn stop_finding(&self, clear_selection: bool) -> Result<()> {
        self.manager.current_host().stop_finding(clear_selection)
    }
}

// ============================================================================
// WebContents - Script
// ============================================================================

impl WebContents {
    /// Runs script in a frame of the visible page.
    ///
    /// Answers arrive as
    /// [`TabEvent::DomOperationResponse`](super::TabEvent::DomOperationResponse).
    ///
    /// # Errors
    ///
    /// Returns a channel error if the visible renderer is unreachable.
    pub fn execute_javascript_in_frame(&self, frame_xpath: &str, script: &str) -> Result<()> {
        debug!(tab_id = %self.tab_id, script_len = script.len(), "Executing script");
        self.manager
            .current_host()
            .execute_javascript_in_frame(frame_xpath, script)
    }

    /// Attaches or detaches the debugger.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the visible renderer is unreachable.
    pub fn set_debugger_attached(&mut self, attached: bool) -> Result<()> {
        self.manager.current_host_mut().set_debugger_attached(attached)
    }
}

// ============================================================================
// WebContents - Dialogs
// ============================================================================

impl WebContents {
    /// Answers a JavaScript or before-unload dialog.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`](crate::Error::ContractViolation)
    /// if no dialog is open.
    pub fn javascript_dialog_closed(&mut self, success: bool, prompt: &str) -> Result<()> {
        self.manager
            .current_host_mut()
            .javascript_dialog_closed(success, prompt)
    }

    /// Answers a modal window.
    ///
    /// # Errors
    ///
    /// See [`javascript_dialog_closed`](Self::javascript_dialog_closed).
    pub fn modal_closed(&mut self) -> Result<()> {
        self.manager.current_host_mut().modal_closed()
    }

    /// Answers a file chooser with the selected paths.
    ///
    /// # Errors
    ///
    /// See [`javascript_dialog_closed`](Self::javascript_dialog_closed).
    pub fn file_chooser_closed(&mut self, paths: Vec<PathBuf>) -> Result<()> {
        self.manager.current_host_mut().file_chooser_closed(paths)
    }
}

// ============================================================================
// WebContents - Visibility
// ============================================================================

impl WebContents {
    /// Hides the tab.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the visible renderer is unreachable.
    pub fn was_hidden(&mut self) -> Result<()> {
        if self.is_hidden {
            return Ok(());
        }
        self.is_hidden = true;
        if self.manager.current_host().is_live() {
            self.manager.current_host().was_hidden()?;
        }
        Ok(())
    }

    /// Shows the tab again.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the visible renderer is unreachable.
    pub fn was_restored(&mut self) -> Result<()> {
        if !self.is_hidden {
            return Ok(());
        }
        self.is_hidden = false;
        if self.manager.current_host().is_live() {
            self.manager.current_host().was_restored()?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::browser::render_view_host::FindOptions;
    use crate::browser::tab::TabEvent;
    use crate::protocol::ViewMsg;
    use crate::testing::TabHarness;

    #[test]
    fn test_find_round_trip() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        let _ = t.sent(a);

        let id = t.tab.find("needle", FindOptions::default()).expect("find");
        t.renderer_says(
            a,
            "find.reply",
            json!({ "requestId": id, "numberOfMatches": 3, "activeMatchOrdinal": 1, "finalUpdate": true }),
        );

        assert!(matches!(
            t.tab.drain_events().last(),
            Some(TabEvent::FindReply(r)) if r.request_id == id && r.number_of_matches == 3
        ));
        assert!(matches!(&t.sent(a)[..], [ViewMsg::Find { text, .. }] if text == "needle"));
    }

    #[test]
    fn test_dialog_reply_goes_to_current() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.renderer_says(a, "dialog.runJavaScript", json!({ "kind": "prompt", "message": "name?" }));
        let _ = t.sent(a);

        t.tab.javascript_dialog_closed(true, "bob").expect("reply");

        assert_eq!(
            t.sent(a),
            vec![ViewMsg::JavaScriptDialogClosed {
                success: true,
                prompt: "bob".to_string()
            }]
        );
        assert!(t.tab.javascript_dialog_closed(true, "").is_err());
    }

    #[test]
    fn test_hidden_restored_sent_once() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        let _ = t.sent(a);

        t.tab.was_hidden().expect("hide");
        t.tab.was_hidden().expect("hide again");
        t.tab.was_restored().expect("restore");

        assert_eq!(t.sent(a), vec![ViewMsg::WasHidden, ViewMsg::WasRestored]);
        assert!(!t.tab.is_hidden());
    }

    #[test]
    fn test_script_and_debugger() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        let _ = t.sent(a);

        t.tab.execute_javascript_in_frame("", "1 + 1").expect("script");
        t.tab.set_debugger_attached(true).expect("attach");

        assert_eq!(
            t.sent(a),
            vec![
                ViewMsg::ExecuteScript {
                    frame_xpath: String::new(),
                    script: "1 + 1".to_string()
                },
                ViewMsg::DebugAttach
            ]
        );
    }
}
