//! Common types shared across all models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Audio bitrate to request from the media CDN.
///
/// Decoded locators point at the 96 kbps rendition; the bitrate tag in the
/// URL is swapped for the one selected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Quality {
    /// AAC 96 kbps (the rendition the locator points at).
    #[serde(rename = "96")]
    Kbps96,
    /// AAC 160 kbps.
    #[serde(rename = "160")]
    Kbps160,
    /// AAC 320 kbps.
    #[default]
    #[serde(rename = "320")]
    Kbps320,
}

impl Quality {
    /// Tag embedded in CDN file names, e.g. `_320` in `abc_320.mp4`.
    pub fn tag(&self) -> &'static str {
        match self {
            Quality::Kbps96 => "_96",
            Quality::Kbps160 => "_160",
            Quality::Kbps320 => "_320",
        }
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Quality::Kbps96 => "96",
            Quality::Kbps160 => "160",
            Quality::Kbps320 => "320",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kbps", self.label())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_end_matches("kbps").trim() {
            "96" => Ok(Quality::Kbps96),
            "160" => Ok(Quality::Kbps160),
            "320" => Ok(Quality::Kbps320),
            other => Err(format!("unsupported bitrate: {}", other)),
        }
    }
}

/// Parse a provider year string ("2019", "" or junk).
pub fn parse_year(year: &str) -> Option<i32> {
    year.trim().get(..4).and_then(|y| y.parse().ok()).filter(|y| *y > 0)
}
