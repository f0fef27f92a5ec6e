//! Shared data model: persisted entities (§3) and transient records that
//! flow between the adapter, pipeline, and repository layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Socrata (and, prospectively, CKAN/ArcGIS) hosting region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Us,
    Eu,
}

impl Region {
    /// The other region, for failover purposes.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Us => Self::Eu,
            Self::Eu => Self::Us,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Us => "US",
            Self::Eu => "EU",
        }
    }

    /// Parse from a configured string; unknown values yield `None` and are
    /// silently ignored by the caller (§4.A).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "US" => Some(Self::Us),
            "EU" => Some(Self::Eu),
            _ => None,
        }
    }
}

/// A portal API endpoint (§3 Host).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub host: String,
    pub region: Region,
    pub last_seen: DateTime<Utc>,
}

/// An organizational domain associated with a portal (§3 Domain).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub domain: String,
    pub country: Option<String>,
    pub region: Region,
    pub last_seen: DateTime<Utc>,
}

/// A named publisher within a host (§3 Agency).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    pub host: String,
    pub name: String,
    pub agency_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A discovered dataset within a host (§3 Dataset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub host: String,
    pub dataset_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Insertion order is significant and must be preserved.
    pub tags: Vec<String>,
    pub publisher: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub row_count: Option<i64>,
    pub view_count: Option<i64>,
    pub link: Option<String>,
    pub active: bool,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Durable pipeline checkpoint (§3 ResumeState).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    pub pipeline: String,
    pub resume_token: String,
    pub last_processed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The decoded shape of a resume token, JSON-encoded by convention (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeToken {
    pub region: Region,
    pub cursor: String,
    pub processed: u64,
}

/// An in-flight discovery record produced by a driver and consumed by the
/// pipeline (§3 CatalogItem, transient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub region: Region,
    pub host: String,
    pub domain: String,
    pub agency: Option<String>,
}

impl CatalogItem {
    /// Composite dedup key used by the pipeline (§4.F step 3):
    /// `"<region>:<host>:<domain>:<agency|null>"`.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.region.as_str(),
            self.host,
            self.domain,
            self.agency.as_deref().unwrap_or("null")
        )
    }
}

/// Which adapter backend produced a `PortalCatalogEntry` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortalSource {
    Socrata,
    Ckan,
    Arcgis,
}

/// A transient, adapter-contract-level catalog entry (§3
/// PortalCatalogEntry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalCatalogEntry {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub domain: String,
    pub permalink: Option<String>,
    pub resource_url: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub source: PortalSource,
    pub layer: Option<String>,
}

/// Canonical runtime type a portal column normalizes to (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    Text,
    Number,
    Checkbox,
    Date,
    Datetime,
    Money,
    Percent,
    Url,
    Email,
    Phone,
    Location,
    Point,
    Polygon,
    Json,
    Unknown,
}

/// A normalized column description (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedColumn {
    pub id: String,
    pub name: String,
    pub field_name: String,
    pub api_type: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
    pub hidden: bool,
    pub description: Option<String>,
}

/// Fully normalized dataset metadata returned by `fetchMetadata` (§4.B).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDatasetMetadata {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub columns: Vec<NormalizedColumn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_parse_is_case_insensitive_and_rejects_unknown() {
        assert_eq!(Region::parse("us"), Some(Region::Us));
        assert_eq!(Region::parse("EU"), Some(Region::Eu));
        assert_eq!(Region::parse("apac"), None);
    }

    #[test]
    fn region_other_is_an_involution() {
        assert_eq!(Region::Us.other(), Region::Eu);
        assert_eq!(Region::Eu.other(), Region::Us);
    }

    #[test]
    fn dedup_key_distinguishes_null_agency() {
        let item = CatalogItem {
            region: Region::Us,
            host: "data.city1.gov".into(),
            domain: "city1.gov".into(),
            agency: None,
        };
        assert_eq!(item.dedup_key(), "US:data.city1.gov:city1.gov:null");
    }
}
