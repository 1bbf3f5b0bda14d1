//! Read-only asset stores.
//!
//! All lookup data — the GFW blocklist, the GeoIP country database, the
//! hot-website list and the CDN keyword tables — is loaded once at startup
//! and shared read-only for the lifetime of the process, so concurrent
//! pipelines can query it without locks.

mod cdn_keywords;
mod geoip;
mod gfw;
mod hot_websites;

pub use cdn_keywords::{CdnKeywords, CdnMatch};
pub use geoip::GeoIpDb;
pub use gfw::GfwList;
pub use hot_websites::HotWebsites;

use std::path::Path;

use log::warn;

use crate::config::{CDN_KEYWORDS_FILE, GEOIP_FILE, GFW_LIST_FILE, HOT_WEBSITES_FILE};

/// All lookup stores, loaded once.
pub struct AssetStore {
    /// GFW blocklist.
    pub gfw: GfwList,
    /// GeoIP country database; `None` when the mmdb file is unavailable.
    pub geoip: Option<GeoIpDb>,
    /// Hot-website patterns.
    pub hot_websites: HotWebsites,
    /// CDN keyword sections.
    pub cdn_keywords: CdnKeywords,
}

impl AssetStore {
    /// Loads every store from `data_dir`.
    ///
    /// Missing or malformed files degrade to empty stores with a warning:
    /// the probe still runs, it just loses the corresponding signal.
    pub fn load(data_dir: &Path) -> Self {
        let gfw = GfwList::load(&data_dir.join(GFW_LIST_FILE));
        let geoip = match GeoIpDb::open(&data_dir.join(GEOIP_FILE)) {
            Ok(db) => Some(db),
            Err(e) => {
                warn!("GeoIP database unavailable, location checks degraded: {e}");
                None
            }
        };
        let hot_websites = HotWebsites::load(&data_dir.join(HOT_WEBSITES_FILE));
        let cdn_keywords = CdnKeywords::load(&data_dir.join(CDN_KEYWORDS_FILE));
        Self {
            gfw,
            geoip,
            hot_websites,
            cdn_keywords,
        }
    }

    /// An empty store, for tests and degraded startup.
    pub fn empty() -> Self {
        Self {
            gfw: GfwList::default(),
            geoip: None,
            hot_websites: HotWebsites::default(),
            cdn_keywords: CdnKeywords::default(),
        }
    }
}
