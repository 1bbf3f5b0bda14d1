//! GeoIP country lookups over a MaxMind GeoIP2 database.

use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, Result};
use maxminddb::{geoip2, Reader};

/// Country lookup outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryLookup {
    /// Display name, preferring Simplified Chinese, then English, then the
    /// ISO code.
    pub country: String,
    /// The address geolocates to mainland China.
    pub is_domestic: bool,
}

/// Process-wide reader over `Country.mmdb`.
///
/// The reader is immutable after open; concurrent lookups need no locking.
pub struct GeoIpDb {
    reader: Reader<Vec<u8>>,
}

impl GeoIpDb {
    /// Opens the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let reader = Reader::open_readfile(path)
            .with_context(|| format!("failed to open GeoIP database {}", path.display()))?;
        Ok(Self { reader })
    }

    /// Looks up the country for `ip`.
    ///
    /// Returns `None` when the address is not present in the database.
    pub fn lookup(&self, ip: IpAddr) -> Option<CountryLookup> {
        let record: geoip2::Country = self.reader.lookup(ip).ok()?;
        let country_record = record.country?;

        let named = country_record.names.as_ref().and_then(|names| {
            names
                .get("zh-CN")
                .or_else(|| names.get("en"))
                .map(|name| (*name).to_string())
        });
        let country = named
            .or_else(|| country_record.iso_code.map(str::to_string))
            .unwrap_or_default();
        if country.is_empty() {
            return None;
        }

        let is_domestic = country == "中国" || country == "CN";
        Some(CountryLookup {
            country,
            is_domestic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file_errors() {
        let result = GeoIpDb::open(Path::new("/nonexistent/Country.mmdb"));
        assert!(result.is_err());
    }

    #[test]
    fn test_domestic_rule() {
        // The domestic flag derives purely from the resolved name.
        for (country, expected) in [("中国", true), ("CN", true), ("美国", false), ("US", false)] {
            let is_domestic = country == "中国" || country == "CN";
            assert_eq!(is_domestic, expected, "country {country}");
        }
    }
}
