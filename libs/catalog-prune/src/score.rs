//! Score component computation and the weighted priority score (§4.G).

use crate::config::PruneConfig;
use crate::types::{DatasetRecord, ScoreComponents};
use chrono::{DateTime, Utc};

fn freshness_score(record: &DatasetRecord, now: DateTime<Utc>) -> f64 {
    let Some(updated_at) = record.updated_at else {
        return 30.0;
    };
    let months = (now - updated_at).num_days() as f64 / 30.0;
    if months <= 6.0 {
        100.0
    } else if months <= 12.0 {
        85.0
    } else if months <= 36.0 {
        70.0
    } else if months <= 60.0 {
        55.0
    } else if months <= 120.0 {
        40.0
    } else {
        20.0
    }
}

fn owner_trust_score(config: &PruneConfig, record: &DatasetRecord) -> f64 {
    match &record.owner {
        Some(owner) if config.trusted_owners.contains(owner) => 100.0,
        Some(_) => 70.0,
        None => 20.0,
    }
}

fn joinability_score(config: &PruneConfig, text: &str) -> f64 {
    if config.has_join_key(text) {
        100.0
    } else {
        60.0
    }
}

/// Computes every component of §4.G's weighted score for one record.
/// `relevance` comes from [`crate::classify::classify`] — the sole place
/// that derives it from matched categories — so it is taken as an input
/// here rather than re-derived.
#[must_use]
pub fn score_components(
    config: &PruneConfig,
    record: &DatasetRecord,
    relevance: f64,
    now: DateTime<Utc>,
) -> ScoreComponents {
    let text = record.searchable_text();
    ScoreComponents {
        relevance,
        freshness: freshness_score(record, now),
        owner_trust: owner_trust_score(config, record),
        joinability: joinability_score(config, &text),
        cadence: config.cadence_score(&text),
        size_sanity: config.size_sanity_score(&text),
    }
}

/// Weighted average of §4.G's score components; weights sum to 10.
#[must_use]
pub fn priority_score(components: &ScoreComponents) -> f64 {
    (3.0 * components.relevance
        + 2.0 * components.freshness
        + 1.5 * components.owner_trust
        + 1.5 * components.joinability
        + 1.0 * components.cadence
        + 1.0 * components.size_sanity)
        / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DatasetRecord;
    use chrono::TimeZone;

    fn record() -> DatasetRecord {
        DatasetRecord {
            id: "abcd-1234".to_string(),
            name: "Police Incident Reports".to_string(),
            description: None,
            resource_type: None,
            category: None,
            tags: vec!["crime".to_string(), "911".to_string()],
            permalink: None,
            owner: Some("SF Police Department".to_string()),
            updated_at: Some(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()),
            boundary_key: None,
        }
    }

    #[test]
    fn components_and_priority_score_match_the_documented_weights() {
        let config = PruneConfig::default();
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let rec = record();
        let (_, relevance) = crate::classify::classify(&config, &rec);
        let components = score_components(&config, &rec, relevance, now);

        assert_eq!(components.relevance, 60.0);
        assert_eq!(components.freshness, 100.0);
        assert_eq!(components.owner_trust, 70.0);
        assert_eq!(components.joinability, 100.0);
        assert_eq!(components.cadence, 100.0);
        assert_eq!(components.size_sanity, 70.0);

        let expected = (3.0 * 60.0 + 2.0 * 100.0 + 1.5 * 70.0 + 1.5 * 100.0 + 100.0 + 70.0) / 10.0;
        assert_eq!(priority_score(&components), expected);
    }

    #[test]
    fn missing_updated_at_yields_unknown_freshness() {
        let mut rec = record();
        rec.updated_at = None;
        assert_eq!(freshness_score(&rec, Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap()), 30.0);
    }

    #[test]
    fn unnamed_owner_yields_minimum_trust() {
        let config = PruneConfig::default();
        let mut rec = record();
        rec.owner = None;
        assert_eq!(owner_trust_score(&config, &rec), 20.0);
    }
}
