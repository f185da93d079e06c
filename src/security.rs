//! Per-process security policy table.
//!
//! The browser grants each renderer process the right to request specific
//! URLs before it sends that process a navigation, and re-checks every URL a
//! renderer reports back. A URL a process was never granted is treated as
//! untrusted.
//!
//! # Rules
//!
//! | URL | Requestable when |
//! |-----|------------------|
//! | `about:blank` | always |
//! | other `about:` / `javascript:` | never |
//! | `view-source:<inner>` | `<inner>` is requestable |
//! | web-safe scheme (configured) | always |
//! | tuple origin (`https://host:port`) | origin or scheme granted to the process |
//! | opaque origin (`data:`, `file:` ...) | scheme granted to the process |
//!
//! Grants are append-only for the lifetime of a process entry and are keyed
//! by [`ProcessId`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::{Origin, Url};

use crate::identifiers::ProcessId;

// ============================================================================
// Constants
// ============================================================================

/// The one pseudo URL every renderer may request.
pub const ABOUT_BLANK: &str = "about:blank";

/// Schemes that never name a network resource.
const PSEUDO_SCHEMES: &[&str] = &["about", "javascript", "view-source"];

/// Returns the neutral URL used in place of untrusted values.
#[must_use]
pub fn blank_url() -> Url {
    Url::parse(ABOUT_BLANK).unwrap_or_else(|_| unreachable!("about:blank always parses"))
}

// ============================================================================
// BindingsPolicy
// ============================================================================

/// Set of privileged script bindings a renderer may expose to its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingsPolicy(u8);

impl BindingsPolicy {
    /// No bindings.
    pub const NONE: Self = Self(0);
    /// Browser-UI page bindings.
    pub const DOM_UI: Self = Self(1 << 0);
    /// Bindings to an external automation host.
    pub const EXTERNAL_HOST: Self = Self(1 << 1);

    /// Returns `true` if every binding in `other` is enabled.
    #[inline]
    #[must_use]
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no binding is enabled.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw bit set.
    #[inline]
    #[must_use]
    pub const fn bits(&self) -> u8 {
        self.0
    }
}

impl BitOr for BindingsPolicy {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ============================================================================
// Types
// ============================================================================

/// Everything one renderer process has been granted.
#[derive(Debug, Default)]
struct ProcessGrants {
    /// Whole schemes the process may request.
    schemes: FxHashSet<String>,
    /// Serialized tuple origins the process may request.
    origins: FxHashSet<String>,
    /// Privileged bindings.
    bindings: BindingsPolicy,
}

/// Shared state behind the policy handle.
#[derive(Debug, Default)]
struct PolicyState {
    /// Schemes every process may request.
    web_safe_schemes: FxHashSet<String>,
    /// Grants per registered process.
    processes: FxHashMap<ProcessId, ProcessGrants>,
}

// ============================================================================
// SecurityPolicy
// ============================================================================

/// Process-wide table of what each renderer process may request.
///
/// Cheap to clone; all clones share the same table.
#[derive(Clone, Default)]
pub struct SecurityPolicy {
    inner: Arc<RwLock<PolicyState>>,
}

impl fmt::Debug for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.read();
        f.debug_struct("SecurityPolicy")
            .field("web_safe_schemes", &state.web_safe_schemes)
            .field("process_count", &state.processes.len())
            .finish()
    }
}

// ============================================================================
// SecurityPolicy - Constructor
// ============================================================================

impl SecurityPolicy {
    /// Creates a policy table with the given web-safe schemes.
    #[must_use]
    pub fn new<I, S>(web_safe_schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = PolicyState {
            web_safe_schemes: web_safe_schemes
                .into_iter()
                .map(|s| s.into().to_ascii_lowercase())
                .collect(),
            processes: FxHashMap::default(),
        };
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }
}

// ============================================================================
// SecurityPolicy - Process Registration
// ============================================================================

impl SecurityPolicy {
    /// Registers a process with an empty grant set.
    ///
    /// Registering twice keeps the existing grants.
    pub fn add_process(&self, process_id: ProcessId) {
        self.inner.write().processes.entry(process_id).or_default();
        debug!(process_id = %process_id, "Process registered with security policy");
    }

    /// Forgets a process and all its grants.
    pub fn remove_process(&self, process_id: ProcessId) {
        if self.inner.write().processes.remove(&process_id).is_some() {
            debug!(process_id = %process_id, "Process removed from security policy");
        }
    }

    /// Returns `true` if the process is registered.
    #[inline]
    #[must_use]
    pub fn is_registered(&self, process_id: ProcessId) -> bool {
        self.inner.read().processes.contains_key(&process_id)
    }
}

// ============================================================================
// SecurityPolicy - Grants
// ============================================================================

impl SecurityPolicy {
    /// Grants a process the right to request `url`.
    ///
    /// Web-safe and pseudo URLs need no grant; `view-source:` grants its
    /// embedded URL. Unregistered processes are ignored.
    pub fn grant_request_url(&self, process_id: ProcessId, url: &Url) {
        let scheme = url.scheme();

        if self.is_web_safe_scheme(scheme) {
            return;
        }

        if PSEUDO_SCHEMES.contains(&scheme) {
            if scheme == "view-source"
                && let Ok(inner) = Url::parse(url.path())
            {
                self.grant_request_url(process_id, &inner);
            }
            return;
        }

        let mut state = self.inner.write();
        let Some(grants) = state.processes.get_mut(&process_id) else {
            trace!(process_id = %process_id, url = %url, "Grant for unregistered process ignored");
            return;
        };

        match url.origin() {
            origin @ Origin::Tuple(..) => {
                grants.origins.insert(origin.ascii_serialization());
            }
            Origin::Opaque(_) => {
                grants.schemes.insert(scheme.to_string());
            }
        }
        trace!(process_id = %process_id, url = %url, "Granted request URL");
    }

    /// Grants a process every URL of `scheme`.
    pub fn grant_scheme(&self, process_id: ProcessId, scheme: &str) {
        if let Some(grants) = self.inner.write().processes.get_mut(&process_id) {
            grants.schemes.insert(scheme.to_ascii_lowercase());
        }
    }

    /// Grants privileged bindings to a process.
    pub fn grant_bindings(&self, process_id: ProcessId, bindings: BindingsPolicy) {
        if let Some(grants) = self.inner.write().processes.get_mut(&process_id) {
            grants.bindings = grants.bindings | bindings;
            debug!(process_id = %process_id, bits = bindings.bits(), "Granted bindings");
        }
    }
}

// ============================================================================
// SecurityPolicy - Checks
// ============================================================================

impl SecurityPolicy {
    /// Returns `true` if the process may request `url`.
    #[must_use]
    pub fn can_request_url(&self, process_id: ProcessId, url: &Url) -> bool {
        let scheme = url.scheme();

        if self.is_web_safe_scheme(scheme) {
            return true;
        }

        if PSEUDO_SCHEMES.contains(&scheme) {
            return match scheme {
                "about" => url.as_str().eq_ignore_ascii_case(ABOUT_BLANK),
                "view-source" => Url::parse(url.path())
                    .map(|inner| {
                        inner.scheme() != "view-source" && self.can_request_url(process_id, &inner)
                    })
                    .unwrap_or(false),
                _ => false,
            };
        }

        let state = self.inner.read();
        let Some(grants) = state.processes.get(&process_id) else {
            return false;
        };

        if grants.schemes.contains(scheme) {
            return true;
        }

        match url.origin() {
            origin @ Origin::Tuple(..) => grants.origins.contains(&origin.ascii_serialization()),
            Origin::Opaque(_) => false,
        }
    }

    /// Returns the bindings granted to a process.
    #[must_use]
    pub fn has_bindings(&self, process_id: ProcessId) -> BindingsPolicy {
        self.inner
            .read()
            .processes
            .get(&process_id)
            .map(|grants| grants.bindings)
            .unwrap_or_default()
    }

    /// Returns `true` if every process may request `scheme`.
    #[inline]
    #[must_use]
    pub fn is_web_safe_scheme(&self, scheme: &str) -> bool {
        self.inner.read().web_safe_schemes.contains(scheme)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid url")
    }

    #[test]
    fn test_ungranted_origin_is_rejected() {
        let policy = SecurityPolicy::default();
        let pid = ProcessId::next();
        policy.add_process(pid);

        assert!(!policy.can_request_url(pid, &url("http://evil.example/")));
    }

    #[test]
    fn test_granted_origin_is_accepted_for_any_path() {
        let policy = SecurityPolicy::default();
        let pid = ProcessId::next();
        policy.add_process(pid);
        policy.grant_request_url(pid, &url("https://a.example/start"));

        assert!(policy.can_request_url(pid, &url("https://a.example/other?q=1")));
        assert!(!policy.can_request_url(pid, &url("https://b.example/")));
        assert!(!policy.can_request_url(pid, &url("http://a.example/")));
    }

    #[test]
    fn test_grants_are_per_process() {
        let policy = SecurityPolicy::default();
        let granted = ProcessId::next();
        let other = ProcessId::next();
        policy.add_process(granted);
        policy.add_process(other);
        policy.grant_request_url(granted, &url("https://a.example/"));

        assert!(!policy.can_request_url(other, &url("https://a.example/")));
    }

    #[test]
    fn test_about_blank_always_allowed() {
        let policy = SecurityPolicy::default();
        let pid = ProcessId::next();
        assert!(policy.can_request_url(pid, &blank_url()));
        assert!(!policy.can_request_url(pid, &url("about:config")));
        assert!(!policy.can_request_url(pid, &url("javascript:alert(1)")));
    }

    #[test]
    fn test_view_source_follows_inner_url() {
        let policy = SecurityPolicy::default();
        let pid = ProcessId::next();
        policy.add_process(pid);
        policy.grant_request_url(pid, &url("view-source:https://a.example/"));

        assert!(policy.can_request_url(pid, &url("https://a.example/")));
        assert!(policy.can_request_url(pid, &url("view-source:https://a.example/x")));
    }

    #[test]
    fn test_opaque_origin_grants_scheme() {
        let policy = SecurityPolicy::default();
        let pid = ProcessId::next();
        policy.add_process(pid);
        policy.grant_request_url(pid, &url("data:text/html,hello"));

        assert!(policy.can_request_url(pid, &url("data:text/plain,other")));
    }

    #[test]
    fn test_web_safe_scheme_needs_no_grant() {
        let policy = SecurityPolicy::new(["https"]);
        let pid = ProcessId::next();
        assert!(policy.can_request_url(pid, &url("https://anything.example/")));
        assert!(!policy.can_request_url(pid, &url("http://anything.example/")));
    }

    #[test]
    fn test_removed_process_loses_grants() {
        let policy = SecurityPolicy::default();
        let pid = ProcessId::next();
        policy.add_process(pid);
        policy.grant_request_url(pid, &url("https://a.example/"));
        policy.remove_process(pid);

        assert!(!policy.is_registered(pid));
        assert!(!policy.can_request_url(pid, &url("https://a.example/")));
    }

    #[test]
    fn test_bindings_accumulate() {
        let policy = SecurityPolicy::default();
        let pid = ProcessId::next();
        policy.add_process(pid);
        policy.grant_bindings(pid, BindingsPolicy::DOM_UI);
        policy.grant_bindings(pid, BindingsPolicy::EXTERNAL_HOST);

        let bindings = policy.has_bindings(pid);
        assert!(bindings.contains(BindingsPolicy::DOM_UI));
        assert!(bindings.contains(BindingsPolicy::EXTERNAL_HOST));
        assert!(policy.has_bindings(ProcessId::next()).is_empty());
    }
}
