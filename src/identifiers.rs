//! Type-safe identifiers for browser-process entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time: a
//! routing ID is only meaningful together with the process that allocated
//! it, so the pair is carried around as a [`GlobalRoutingId`].
//!
//! # Allocation
//!
//! | Type | Source |
//! |------|--------|
//! | [`ProcessId`] | process-wide counter, one per renderer process |
//! | [`RoutingId`] | process-wide counter, one per view |
//! | [`CrossSiteRequestId`] | network side, one per in-flight request |
//! | [`SiteInstanceId`] | process-wide counter |
//! | [`TabId`] / [`BrowserId`] | process-wide counters, never zero |
//! | [`PageId`] | assigned by the renderer on commit |
//! | [`ProfileId`] | random UUID |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Counter-backed IDs
// ============================================================================

macro_rules! counter_id {
    ($(#[$meta:meta])* $name:ident, $counter:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        static $counter: AtomicU32 = AtomicU32::new(1);

        impl $name {
            /// Allocates the next identifier.
            #[inline]
            #[must_use]
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            /// Wraps a raw value.
            #[inline]
            #[must_use]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Returns the raw value.
            #[inline]
            #[must_use]
            pub const fn as_u32(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

counter_id!(
    /// Identifies one renderer process.
    ProcessId,
    NEXT_PROCESS_ID,
    "process-"
);

counter_id!(
    /// Identifies one view inside a renderer process.
    RoutingId,
    NEXT_ROUTING_ID,
    "route-"
);

counter_id!(
    /// Identifies a [`SiteInstance`](crate::browser::SiteInstance).
    SiteInstanceId,
    NEXT_SITE_INSTANCE_ID,
    "site-"
);

counter_id!(
    /// Identifies a registered BrowserList observer.
    ObserverId,
    NEXT_OBSERVER_ID,
    "observer-"
);

// ============================================================================
// GlobalRoutingId
// ============================================================================

/// A view's address: the process that hosts it plus its routing ID.
///
/// This is the key used for process-table lookup and for every resource
/// gateway action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalRoutingId {
    /// Hosting renderer process.
    #[serde(rename = "processId")]
    pub process_id: ProcessId,
    /// View within that process.
    #[serde(rename = "routingId")]
    pub routing_id: RoutingId,
}

impl GlobalRoutingId {
    /// Creates a new global routing ID.
    #[inline]
    #[must_use]
    pub const fn new(process_id: ProcessId, routing_id: RoutingId) -> Self {
        Self {
            process_id,
            routing_id,
        }
    }
}

impl fmt::Display for GlobalRoutingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.process_id.0, self.routing_id.0)
    }
}

// ============================================================================
// CrossSiteRequestId
// ============================================================================

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one in-flight network request on the dispatch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrossSiteRequestId(u64);

impl CrossSiteRequestId {
    /// Allocates the next request ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CrossSiteRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request-{}", self.0)
    }
}

// ============================================================================
// TabId / BrowserId
// ============================================================================

macro_rules! nonzero_id {
    ($(#[$meta:meta])* $name:ident, $counter:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(NonZeroU32);

        static $counter: AtomicU32 = AtomicU32::new(1);

        impl $name {
            /// Creates an ID from a raw value.
            ///
            /// Returns `None` if `id` is 0.
            #[inline]
            #[must_use]
            pub fn new(id: u32) -> Option<Self> {
                NonZeroU32::new(id).map(Self)
            }

            /// Allocates the next identifier.
            #[inline]
            #[must_use]
            pub fn next() -> Self {
                let raw = $counter.fetch_add(1, Ordering::Relaxed);
                Self(NonZeroU32::new(raw).unwrap_or(NonZeroU32::MIN))
            }

            /// Returns the raw value.
            #[inline]
            #[must_use]
            pub const fn as_u32(&self) -> u32 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

nonzero_id!(
    /// Identifies a tab ([`WebContents`](crate::browser::WebContents)).
    TabId,
    NEXT_TAB_ID,
    "tab-"
);

nonzero_id!(
    /// Identifies a top-level browser window.
    BrowserId,
    NEXT_BROWSER_ID,
    "browser-"
);

// ============================================================================
// PageId
// ============================================================================

/// Renderer-assigned page identifier for a committed navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(i32);

impl PageId {
    /// Wraps a raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page-{}", self.0)
    }
}

// ============================================================================
// ProfileId
// ============================================================================

/// Identifies a browsing profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(Uuid);

impl ProfileId {
    /// Generates a fresh random profile ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_ids_are_unique() {
        let a = ProcessId::next();
        let b = ProcessId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_tab_id_rejects_zero() {
        assert!(TabId::new(0).is_none());
        assert_eq!(TabId::new(7).map(|id| id.as_u32()), Some(7));
    }

    #[test]
    fn test_global_routing_id_display() {
        let id = GlobalRoutingId::new(ProcessId::from_raw(3), RoutingId::from_raw(9));
        assert_eq!(id.to_string(), "3:9");
    }

    #[test]
    fn test_global_routing_id_serializes_camel_case() {
        let id = GlobalRoutingId::new(ProcessId::from_raw(1), RoutingId::from_raw(2));
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, r#"{"processId":1,"routingId":2}"#);
    }

    #[test]
    fn test_profile_ids_differ() {
        assert_ne!(ProfileId::generate(), ProfileId::generate());
    }
}
