//! Ordered dropping-rules pipeline and the boundary keep-two-most-recent
//! post-pass (§4.G). Pure function: `&[DatasetRecord]` in, `PruneOutput` out.

use crate::classify::classify;
use crate::config::PruneConfig;
use crate::score::{priority_score, score_components};
use crate::types::{Category, DroppedRecord, KeptRecord, PruneAnnotation, PruneOutput};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

fn normalize_name(name: &str) -> String {
    name.chars().filter(|c| !c.is_ascii_punctuation()).collect::<String>().to_lowercase().trim().to_string()
}

fn is_arcgis_permalink(permalink: &str) -> bool {
    permalink.to_lowercase().contains("arcgis")
}

/// Evaluates the ordered dropping rules, the priority-score threshold, and
/// the boundary retention policy over a full batch of candidate records.
#[must_use]
pub fn prune(config: &PruneConfig, records: &[crate::types::DatasetRecord], now: DateTime<Utc>) -> PruneOutput {
    let trusted_names: HashSet<String> = records
        .iter()
        .filter(|r| r.owner.as_deref().is_some_and(|o| config.trusted_owners.contains(o)))
        .map(|r| normalize_name(&r.name))
        .collect();

    let mut kept = Vec::new();
    let mut dropped = Vec::new();

    for record in records {
        let text = record.searchable_text();

        if record.resource_type.as_deref() == Some("href") {
            dropped.push(DroppedRecord { id: record.id.clone(), name: record.name.clone(), reason: "type:href".to_string() });
            continue;
        }
        if config.is_archived(&text) {
            dropped.push(DroppedRecord {
                id: record.id.clone(),
                name: record.name.clone(),
                reason: "archived/deprecated".to_string(),
            });
            continue;
        }
        if config.is_global_without_sf_hint(&text) {
            dropped.push(DroppedRecord { id: record.id.clone(), name: record.name.clone(), reason: "global/irrelevant".to_string() });
            continue;
        }

        let (matched, relevance) = classify(config, record);
        let allowed: Vec<Category> = matched.into_iter().filter(|c| config.target_categories.contains(c)).collect();
        if allowed.is_empty() {
            dropped.push(DroppedRecord {
                id: record.id.clone(),
                name: record.name.clone(),
                reason: "not-in-target-categories".to_string(),
            });
            continue;
        }

        let is_boundary = allowed.contains(&Category::Boundaries);
        if !is_boundary {
            if let Some(months_limit) =
                allowed.iter().filter_map(|c| config.retention_months.get(c)).min().copied()
            {
                if let Some(updated_at) = record.updated_at {
                    let months_since = (now - updated_at).num_days() as f64 / 30.0;
                    if months_since > f64::from(months_limit) {
                        dropped.push(DroppedRecord {
                            id: record.id.clone(),
                            name: record.name.clone(),
                            reason: format!("stale>{months_limit}m"),
                        });
                        continue;
                    }
                }
            }
        }

        let is_duplicate = record.permalink.as_deref().is_some_and(is_arcgis_permalink)
            && trusted_names.contains(&normalize_name(&record.name));
        if is_duplicate {
            dropped.push(DroppedRecord {
                id: record.id.clone(),
                name: record.name.clone(),
                reason: "arcgis-connector-duplicate".to_string(),
            });
            continue;
        }

        let components = score_components(config, record, relevance, now);
        let score = priority_score(&components);
        if score < config.min_score {
            dropped.push(DroppedRecord {
                id: record.id.clone(),
                name: record.name.clone(),
                reason: format!("score<{:.0}({score:.1})", config.min_score),
            });
            continue;
        }

        let mut reasons_kept: Vec<String> = allowed.iter().map(|c| c.as_str().to_string()).collect();
        if components.owner_trust >= 100.0 {
            reasons_kept.push("trusted-owner".to_string());
        }

        let retention_months = if is_boundary {
            None
        } else {
            allowed.iter().filter_map(|c| config.retention_months.get(c)).min().copied()
        };

        kept.push(KeptRecord {
            record: record.clone(),
            prune: PruneAnnotation {
                reasons_kept,
                priority_score: score,
                components,
                categories: allowed.iter().map(|c| c.as_str().to_string()).collect(),
                retention_months,
            },
        });
    }

    apply_boundary_retention(&mut kept, &mut dropped);
    PruneOutput { kept, dropped }
}

/// Keeps only the two most-recently-updated survivors per boundary key;
/// drops the rest with `boundaries:exceeds-current+previous`.
fn apply_boundary_retention(kept: &mut Vec<KeptRecord>, dropped: &mut Vec<DroppedRecord>) {
    use std::collections::HashMap;

    let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, item) in kept.iter().enumerate() {
        if item.prune.categories.iter().any(|c| c == Category::Boundaries.as_str()) {
            if let Some(key) = &item.record.boundary_key {
                by_key.entry(key.clone()).or_default().push(idx);
            }
        }
    }

    let mut drop_indices: HashSet<usize> = HashSet::new();
    for indices in by_key.values() {
        if indices.len() <= 2 {
            continue;
        }
        let mut sorted = indices.clone();
        sorted.sort_by_key(|&idx| std::cmp::Reverse(kept[idx].record.updated_at));
        for &idx in &sorted[2..] {
            drop_indices.insert(idx);
        }
    }

    if drop_indices.is_empty() {
        return;
    }

    let mut retained = Vec::with_capacity(kept.len());
    for (idx, item) in std::mem::take(kept).into_iter().enumerate() {
        if drop_indices.contains(&idx) {
            dropped.push(DroppedRecord {
                id: item.record.id.clone(),
                name: item.record.name.clone(),
                reason: "boundaries:exceeds-current+previous".to_string(),
            });
        } else {
            retained.push(item);
        }
    }
    *kept = retained;
}
