//! Relevance classification (§4.G): keyword-regex category matching over a
//! record's free text, and the relevance score derived from the match
//! count.

use crate::config::PruneConfig;
use crate::types::{Category, DatasetRecord};

/// Categories a record's free text matched (name/category/tags/description),
/// and the derived relevance score: `min(100, 40 + 20 * matched.len())`.
#[must_use]
pub fn classify(config: &PruneConfig, record: &DatasetRecord) -> (Vec<Category>, f64) {
    let text = record.searchable_text();
    let matched = config.matched_categories(&text);
    let relevance = (40.0 + 20.0 * matched.len() as f64).min(100.0);
    (matched, relevance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DatasetRecord;

    fn record(name: &str, tags: Vec<&str>) -> DatasetRecord {
        DatasetRecord {
            id: "abcd-1234".to_string(),
            name: name.to_string(),
            description: None,
            resource_type: None,
            category: None,
            tags: tags.into_iter().map(str::to_string).collect(),
            permalink: None,
            owner: None,
            updated_at: None,
            boundary_key: None,
        }
    }

    #[test]
    fn relevance_grows_with_matched_category_count() {
        let config = PruneConfig::default();
        let (matched, relevance) = classify(&config, &record("Police Incident Reports", vec!["crime", "911"]));
        assert!(matched.contains(&Category::Safety));
        assert_eq!(relevance, 60.0);
    }

    #[test]
    fn no_keyword_match_yields_empty_categories_and_base_relevance() {
        let config = PruneConfig::default();
        let (matched, relevance) = classify(&config, &record("Widget Inventory Spreadsheet", vec![]));
        assert!(matched.is_empty());
        assert_eq!(relevance, 40.0);
    }
}
