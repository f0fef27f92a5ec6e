//! Input/output shapes for the prune/scoring engine (§4.G). Plain data —
//! no database or HTTP dependency, per the teacher's "no infra in domain"
//! convention enforced elsewhere by `dylint_lints/de03_domain_layer`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A keyword-matching relevance category (§4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Governance,
    Housing,
    Safety,
    Infrastructure,
    Finance,
    Transit,
    Boundaries,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Governance,
        Category::Housing,
        Category::Safety,
        Category::Infrastructure,
        Category::Finance,
        Category::Transit,
        Category::Boundaries,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Governance => "governance",
            Self::Housing => "housing",
            Self::Safety => "safety",
            Self::Infrastructure => "infrastructure",
            Self::Finance => "finance",
            Self::Transit => "transit",
            Self::Boundaries => "boundaries",
        }
    }
}

/// One candidate catalog entry the engine evaluates (§4.G "normalized
/// catalog payload"). Distinct from `catalog_core::PortalCatalogEntry`: it
/// carries the extra fields (`owner`, `boundary_key`) the prune rules need
/// and that the adapter contract itself has no use for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Socrata's `resource.type`; `"href"` marks an external link rather
    /// than a queryable dataset.
    pub resource_type: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub permalink: Option<String>,
    /// Publishing organization, used for the owner-trust score component
    /// and the ArcGIS-connector-duplicate rule.
    pub owner: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Grouping key for the boundary keep-two-most-recent policy; `None`
    /// for non-boundary records (the field is unused for them).
    pub boundary_key: Option<String>,
}

impl DatasetRecord {
    /// All free text the keyword rules search across: name, category, tags,
    /// description — concatenated and searched case-insensitively.
    pub(crate) fn searchable_text(&self) -> String {
        let mut parts = vec![self.name.clone()];
        if let Some(category) = &self.category {
            parts.push(category.clone());
        }
        parts.extend(self.tags.iter().cloned());
        if let Some(description) = &self.description {
            parts.push(description.clone());
        }
        parts.join(" ")
    }
}

/// Per-component scores that summed (weighted) to `priority_score` (§4.G).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub relevance: f64,
    pub freshness: f64,
    pub owner_trust: f64,
    pub joinability: f64,
    pub cadence: f64,
    pub size_sanity: f64,
}

/// Annotations attached to a surviving record (§4.G `_prune`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruneAnnotation {
    pub reasons_kept: Vec<String>,
    pub priority_score: f64,
    pub components: ScoreComponents,
    pub categories: Vec<String>,
    pub retention_months: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeptRecord {
    pub record: DatasetRecord,
    pub prune: PruneAnnotation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedRecord {
    pub id: String,
    pub name: String,
    /// Pipe-separated when multiple reasons apply (§4.G). In practice this
    /// engine stops at the first matching drop rule, so this is almost
    /// always a single reason; the type stays `String` to match the
    /// documented wire shape.
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PruneOutput {
    pub kept: Vec<KeptRecord>,
    pub dropped: Vec<DroppedRecord>,
}

/// Default retention thresholds in months, keyed by category (§4.G).
/// `Boundaries` is absent — it uses the keep-two-most-recent policy
/// instead of an age cutoff.
#[must_use]
pub fn default_retention_months() -> HashMap<Category, u32> {
    HashMap::from([
        (Category::Safety, 36),
        (Category::Infrastructure, 60),
        (Category::Transit, 120),
        (Category::Housing, 120),
        (Category::Finance, 144),
        (Category::Governance, 144),
    ])
}
