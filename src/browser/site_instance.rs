//! Site grouping.
//!
//! A [`SiteInstance`] tags content that may share one renderer process. All
//! site instances handed out by one [`BrowsingInstance`] for the same site
//! are the same object, so pages of one site in related tabs end up in the
//! same process.
//!
//! # Site key
//!
//! | URL | Site |
//! |-----|------|
//! | `https://a.b.example.com/x` | `https://example.com` |
//! | `http://127.0.0.1:8080/` | `http://127.0.0.1` |
//! | `http://localhost/` | `http://localhost` |
//! | `data:text/html,...` | `data:` |
//! | `about:blank` | none (fits any site) |
//!
//! A new tab's site instance starts unbound and is bound, once, by its
//! first real navigation.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{trace, warn};
use url::{Host, Url};

use crate::identifiers::SiteInstanceId;

// ============================================================================
// Site Key
// ============================================================================

/// Returns the site key of `url`, or `None` for URLs that fit any site.
#[must_use]
pub fn site_for_url(url: &Url) -> Option<String> {
    let scheme = url.scheme();

    if matches!(scheme, "about" | "javascript") {
        return None;
    }

    let Some(host) = url.host() else {
        return Some(format!("{scheme}:"));
    };

    let host = match host {
        Host::Domain(domain) => registrable_part(domain).to_ascii_lowercase(),
        Host::Ipv4(addr) => addr.to_string(),
        Host::Ipv6(addr) => format!("[{addr}]"),
    };

    Some(format!("{scheme}://{host}"))
}

/// Keeps the last two labels of a domain.
fn registrable_part(domain: &str) -> &str {
    let trimmed = domain.trim_end_matches('.');
    let mut dots = trimmed.rmatch_indices('.');
    let _last = dots.next();
    match dots.next() {
        Some((index, _)) => &trimmed[index + 1..],
        None => trimmed,
    }
}

/// Returns `true` if both URLs belong to the same site.
#[must_use]
pub fn is_same_site(a: &Url, b: &Url) -> bool {
    match (site_for_url(a), site_for_url(b)) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

// ============================================================================
// BrowsingInstance
// ============================================================================

/// A set of related tabs that share one site instance per site.
///
/// Cheap to clone; all clones share the same map.
#[derive(Clone, Default)]
pub struct BrowsingInstance {
    sites: Arc<Mutex<FxHashMap<String, Weak<SiteInner>>>>,
}

impl fmt::Debug for BrowsingInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowsingInstance")
            .field("site_count", &self.sites.lock().len())
            .finish()
    }
}

impl BrowsingInstance {
    /// Creates an empty browsing instance.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a site instance not yet bound to a site.
    #[must_use]
    pub fn create_site_instance(&self) -> SiteInstance {
        SiteInstance::new(self.clone(), None)
    }

    /// Returns the site instance for `url`, reusing a live one for the
    /// same site.
    #[must_use]
    pub fn site_instance_for_url(&self, url: &Url) -> SiteInstance {
        let Some(site) = site_for_url(url) else {
            return self.create_site_instance();
        };

        if let Some(existing) = self.lookup(&site) {
            return existing;
        }

        let instance = SiteInstance::new(self.clone(), Some(site.clone()));
        self.register(site, &instance);
        instance
    }

    /// Returns `true` if a live site instance exists for `url`'s site.
    #[must_use]
    pub fn has_site_instance(&self, url: &Url) -> bool {
        site_for_url(url).is_some_and(|site| self.lookup(&site).is_some())
    }

    fn lookup(&self, site: &str) -> Option<SiteInstance> {
        self.sites
            .lock()
            .get(site)
            .and_then(Weak::upgrade)
            .map(|inner| SiteInstance { inner })
    }

    fn register(&self, site: String, instance: &SiteInstance) {
        let mut sites = self.sites.lock();
        sites.retain(|_, weak| weak.strong_count() > 0);
        sites
            .entry(site)
            .and_modify(|weak| {
                if weak.strong_count() == 0 {
                    *weak = Arc::downgrade(&instance.inner);
                }
            })
            .or_insert_with(|| Arc::downgrade(&instance.inner));
    }
}

// ============================================================================
// SiteInstance
// ============================================================================

struct SiteInner {
    id: SiteInstanceId,
    browsing_instance: BrowsingInstance,
    site: OnceLock<String>,
}

/// Opaque "these pages may share a renderer process" tag.
///
/// Cheap to clone; clones are the same instance. Once bound, the site never
/// changes.
#[derive(Clone)]
pub struct SiteInstance {
    inner: Arc<SiteInner>,
}

impl fmt::Debug for SiteInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteInstance")
            .field("id", &self.inner.id)
            .field("site", &self.inner.site.get())
            .finish()
    }
}

impl PartialEq for SiteInstance {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for SiteInstance {}

impl SiteInstance {
    fn new(browsing_instance: BrowsingInstance, site: Option<String>) -> Self {
        let cell = OnceLock::new();
        if let Some(site) = site {
            let _ = cell.set(site);
        }
        let instance = Self {
            inner: Arc::new(SiteInner {
                id: SiteInstanceId::next(),
                browsing_instance,
                site: cell,
            }),
        };
        trace!(site_instance = %instance.id(), site = ?instance.site(), "Site instance created");
        instance
    }

    /// Returns the instance ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SiteInstanceId {
        self.inner.id
    }

    /// Returns the bound site key.
    #[inline]
    #[must_use]
    pub fn site(&self) -> Option<&str> {
        self.inner.site.get().map(String::as_str)
    }

    /// Returns `true` once bound to a site.
    #[inline]
    #[must_use]
    pub fn has_site(&self) -> bool {
        self.inner.site.get().is_some()
    }

    /// Returns the browsing instance this belongs to.
    #[inline]
    #[must_use]
    pub fn browsing_instance(&self) -> &BrowsingInstance {
        &self.inner.browsing_instance
    }

    /// Binds an unbound instance to `url`'s site.
    ///
    /// URLs without a site and already bound instances are left alone.
    pub fn set_site(&self, url: &Url) {
        let Some(site) = site_for_url(url) else {
            return;
        };

        if let Some(existing) = self.inner.site.get() {
            if *existing != site {
                warn!(site_instance = %self.inner.id, existing = %existing, requested = %site, "Site instance already bound");
            }
            return;
        }

        if self.inner.site.set(site.clone()).is_ok() {
            self.inner.browsing_instance.register(site, self);
        }
    }

    /// Returns `true` if navigating to `url` needs a different instance.
    ///
    /// Unbound instances and site-less URLs never need one.
    #[must_use]
    pub fn requires_swap_for(&self, url: &Url) -> bool {
        match (self.site(), site_for_url(url)) {
            (Some(current), Some(target)) => current != target,
            _ => false,
        }
    }

    /// Returns the instance in the same browsing instance for `url`.
    #[must_use]
    pub fn related_site_instance(&self, url: &Url) -> SiteInstance {
        if !self.requires_swap_for(url) && self.has_site() {
            return self.clone();
        }
        self.inner.browsing_instance.site_instance_for_url(url)
    }
}

// ============================================================================
// Tests
// ============================================================================
