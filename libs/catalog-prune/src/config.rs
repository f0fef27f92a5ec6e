//! Engine configuration: keyword lists and thresholds, all overridable —
//! the spec names the defaults below as canonical, not fixed.

use crate::types::{default_retention_months, Category};
use regex::{escape, Regex};
use std::collections::{HashMap, HashSet};

fn alternation(words: &[&str]) -> String {
    words.iter().map(|w| escape(w)).collect::<Vec<_>>().join("|")
}

fn category_keywords(category: Category) -> &'static [&'static str] {
    match category {
        Category::Governance => &[
            "city council",
            "ordinance",
            "resolution",
            "budget",
            "election",
            "board of supervisors",
            "meeting minutes",
            "legislation",
        ],
        Category::Housing => &["housing", "rent", "eviction", "affordable housing", "tenant"],
        Category::Safety => &["police", "crime", "fire department", "911", "incident", "arrest"],
        Category::Infrastructure => &["street", "road", "utility", "water main", "sewer", "infrastructure"],
        Category::Finance => &["expenditure", "revenue", "tax", "finance", "contract", "vendor payment"],
        Category::Transit => &["transit", "bus", "muni", "bart", "parking", "traffic", "transportation"],
        Category::Boundaries => &[
            "zoning",
            "district",
            "tract",
            "neighborhood",
            "supervisor district",
            "boundary",
            "boundaries",
        ],
    }
}

/// Tunable thresholds and keyword lists for the prune/scoring engine
/// (§4.G). Construct via `PruneConfig::default()` and override fields
/// through the builder methods as needed.
pub struct PruneConfig {
    pub min_score: f64,
    pub retention_months: HashMap<Category, u32>,
    pub target_categories: HashSet<Category>,
    pub trusted_owners: HashSet<String>,
    archived_re: Regex,
    global_token_re: Regex,
    sf_hint_re: Regex,
    join_key_re: Regex,
    cadence_high_re: Regex,
    cadence_mid_re: Regex,
    cadence_low_re: Regex,
    size_summary_re: Regex,
    size_all_time_re: Regex,
    category_res: HashMap<Category, Regex>,
}

impl PruneConfig {
    #[must_use]
    pub fn new(
        global_tokens: &[&str],
        sf_hints: &[&str],
        trusted_owners: impl IntoIterator<Item = String>,
    ) -> Self {
        let category_res = Category::ALL
            .into_iter()
            .map(|c| {
                let pattern = alternation(category_keywords(c));
                (c, Regex::new(&format!("(?i){pattern}")).expect("valid category regex"))
            })
            .collect();

        Self {
            min_score: 60.0,
            retention_months: default_retention_months(),
            target_categories: Category::ALL.into_iter().collect(),
            trusted_owners: trusted_owners.into_iter().collect(),
            archived_re: Regex::new("(?i)archive|deprecated|retired|superseded").expect("valid regex"),
            global_token_re: Regex::new(&format!("(?i){}", alternation(global_tokens))).expect("valid regex"),
            sf_hint_re: Regex::new(&format!("(?i){}", alternation(sf_hints))).expect("valid regex"),
            join_key_re: Regex::new(
                "(?i)apn|parcel|block|lot|case|permit|incident|tract|district",
            )
            .expect("valid regex"),
            cadence_high_re: Regex::new("(?i)311|crime|calls").expect("valid regex"),
            cadence_mid_re: Regex::new("(?i)permit|transit").expect("valid regex"),
            cadence_low_re: Regex::new("(?i)finance|ethics").expect("valid regex"),
            size_summary_re: Regex::new("(?i)summary|aggregate").expect("valid regex"),
            size_all_time_re: Regex::new("(?i)all time").expect("valid regex"),
            category_res,
        }
    }

    pub(crate) fn is_archived(&self, text: &str) -> bool {
        self.archived_re.is_match(text)
    }

    pub(crate) fn is_global_without_sf_hint(&self, text: &str) -> bool {
        self.global_token_re.is_match(text) && !self.sf_hint_re.is_match(text)
    }

    pub(crate) fn matched_categories(&self, text: &str) -> Vec<Category> {
        Category::ALL.into_iter().filter(|c| self.category_res[c].is_match(text)).collect()
    }

    pub(crate) fn has_join_key(&self, text: &str) -> bool {
        self.join_key_re.is_match(text)
    }

    pub(crate) fn cadence_score(&self, text: &str) -> f64 {
        if self.cadence_high_re.is_match(text) {
            100.0
        } else if self.cadence_mid_re.is_match(text) {
            85.0
        } else if self.cadence_low_re.is_match(text) {
            70.0
        } else {
            50.0
        }
    }

    pub(crate) fn size_sanity_score(&self, text: &str) -> f64 {
        if self.size_summary_re.is_match(text) {
            100.0
        } else if self.size_all_time_re.is_match(text) {
            40.0
        } else {
            70.0
        }
    }
}

impl Default for PruneConfig {
    /// Canonical defaults named by §4.G: global tokens `{USA, United
    /// States, Global, World, California}`, SF hints `{San Francisco, SF,
    /// sfgov, city and county}`, no pre-seeded trusted owners (callers
    /// populate from their own publisher allow-list).
    fn default() -> Self {
        Self::new(
            &["USA", "United States", "Global", "World", "California"],
            &["San Francisco", "SF", "sfgov", "city and county"],
            std::iter::empty(),
        )
    }
}
