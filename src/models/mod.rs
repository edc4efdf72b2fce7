//! Domain types shared by the cache, the collaborators and the web layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// AI-derived palette. Open schema: hex colors plus whatever scalars the
/// model returns (e.g. `gradient_angle`).
pub type Palette = serde_json::Map<String, serde_json::Value>;

/// Size label -> image URL
pub type ImageLocations = BTreeMap<String, String>;

/// SHA-256 of raw image bytes rendered as 64 lowercase hex characters.
///
/// Deserializing goes through [`ContentFingerprint::parse`], so a record
/// carrying anything else is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accept a previously rendered fingerprint, e.g. a record file stem.
    pub fn parse(value: &str) -> Option<Self> {
        let valid = value.len() == 64
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(value.to_string()))
    }

    pub(crate) fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    /// First `n` characters, for log lines and file names
    pub fn short(&self, n: usize) -> &str {
        self.0.get(..n).unwrap_or(&self.0)
    }
}

impl TryFrom<String> for ContentFingerprint {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid content fingerprint: {value:?}"))
    }
}

impl From<ContentFingerprint> for String {
    fn from(fingerprint: ContentFingerprint) -> Self {
        fingerprint.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a client asked for: a market locale and how many days back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicalKey {
    pub locale: String,
    pub days_ago: u32,
}

impl LogicalKey {
    pub fn new<S: Into<String>>(locale: S, days_ago: u32) -> Self {
        Self {
            locale: locale.into(),
            days_ago,
        }
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.locale, self.days_ago)
    }
}

/// Descriptive fields passed through from the feed untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallpaperMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub copyright: String,
    #[serde(default)]
    pub copyright_link: String,
    /// YYYYMMDD
    #[serde(default, rename = "startdate")]
    pub start_date: String,
    /// YYYYMMDDHHMM
    #[serde(default, rename = "fullstartdate")]
    pub full_start_date: String,
    /// YYYYMMDD
    #[serde(default, rename = "enddate")]
    pub end_date: String,
}

/// Request cache record, one per logical key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEntry {
    pub locale: String,
    pub days_ago: u32,
    #[serde(rename = "image_hash")]
    pub fingerprint: ContentFingerprint,
    pub image_urls: ImageLocations,
    #[serde(flatten)]
    pub metadata: WallpaperMetadata,
    pub expires_at: DateTime<Utc>,
}

impl RequestEntry {
    pub fn key(&self) -> LogicalKey {
        LogicalKey::new(self.locale.clone(), self.days_ago)
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Analysis cache record, one per unique image content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisEntry {
    #[serde(rename = "image_hash")]
    pub fingerprint: ContentFingerprint,
    #[serde(rename = "colors")]
    pub palette: Palette,
}

/// Everything the feed hands back for one logical key
#[derive(Debug, Clone)]
pub struct FetchedWallpaper {
    pub bytes: Vec<u8>,
    pub image_urls: ImageLocations,
    pub metadata: WallpaperMetadata,
}

/// Context forwarded to the AI collaborator alongside the image
#[derive(Debug, Clone)]
pub struct AnalysisHints {
    pub fingerprint: ContentFingerprint,
    pub title: String,
    pub copyright: String,
}

/// Answer produced by the lookup orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub palette: Palette,
    pub image_urls: ImageLocations,
    pub metadata: WallpaperMetadata,
    /// True when no AI call was made for this resolution
    pub from_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_logical_key_display_matches_record_stem() {
        assert_eq!(LogicalKey::new("en-US", 3).to_string(), "en-US_3");
    }

    #[test]
    fn test_fingerprint_parse_rejects_non_hex() {
        let good = "a".repeat(64);
        assert!(ContentFingerprint::parse(&good).is_some());
        assert!(ContentFingerprint::parse(&"A".repeat(64)).is_none());
        assert!(ContentFingerprint::parse("abc").is_none());
        assert!(ContentFingerprint::parse(&"g".repeat(64)).is_none());
    }

    #[test]
    fn test_fingerprint_deserialize_validates() {
        let good = "0".repeat(64);
        let fp: ContentFingerprint = serde_json::from_value(serde_json::json!(good)).unwrap();
        assert_eq!(fp.as_str(), good);
        assert_eq!(serde_json::to_value(&fp).unwrap(), serde_json::json!(good));

        for bad in ["a\u{e9}\u{e9}\u{e9}", "ABC", ""] {
            assert!(serde_json::from_value::<ContentFingerprint>(serde_json::json!(bad)).is_err());
        }
    }

    #[test]
    fn test_request_entry_reads_legacy_record() {
        let json = r#"{
            "locale": "en-US",
            "days_ago": 0,
            "image_hash": "0000000000000000000000000000000000000000000000000000000000000000",
            "image_urls": {"UHD": "https://example.com/a_UHD.jpg"},
            "title": "Sunrise",
            "copyright": "Someone",
            "copyright_link": "https://example.com",
            "startdate": "20251019",
            "fullstartdate": "202510190700",
            "enddate": "20251020",
            "expires_at": "2025-10-19T08:00:00Z"
        }"#;

        let entry: RequestEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.key(), LogicalKey::new("en-US", 0));
        assert_eq!(entry.metadata.full_start_date, "202510190700");
        assert_eq!(entry.image_urls.len(), 1);

        let before = Utc.with_ymd_and_hms(2025, 10, 19, 7, 59, 59).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 10, 19, 8, 0, 0).unwrap();
        assert!(entry.is_fresh(before));
        assert!(!entry.is_fresh(at));
    }
}
