//! Conversions between `sea-orm` models and the shared `catalog-core`
//! domain types, grounded on
//! `modules/oagw/oagw-gw/src/infra/storage/mapper.rs`'s `From`-impl style.

use crate::entities::{agency, dataset, domain, host, resume_state};
use catalog_core::{Agency, CoreError, Dataset, Domain, Host, Region, ResumeState};

pub(crate) fn region_to_str(region: Region) -> String {
    region.as_str().to_string()
}

pub(crate) fn region_from_str(raw: &str) -> Result<Region, CoreError> {
    Region::parse(raw).ok_or_else(|| CoreError::Config(format!("unknown region column value: {raw}")))
}

impl TryFrom<host::Model> for Host {
    type Error = CoreError;

    fn try_from(model: host::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            host: model.host,
            region: region_from_str(&model.region)?,
            last_seen: model.last_seen,
        })
    }
}

impl TryFrom<domain::Model> for Domain {
    type Error = CoreError;

    fn try_from(model: domain::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            domain: model.domain,
            country: model.country,
            region: region_from_str(&model.region)?,
            last_seen: model.last_seen,
        })
    }
}

impl From<agency::Model> for Agency {
    fn from(model: agency::Model) -> Self {
        Self {
            host: model.host,
            name: model.name,
            agency_type: model.agency_type,
            created_at: model.created_at,
        }
    }
}

impl From<dataset::Model> for Dataset {
    fn from(model: dataset::Model) -> Self {
        let tags = match model.tags {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        Self {
            host: model.host,
            dataset_id: model.dataset_id,
            title: model.title,
            description: model.description,
            category: model.category,
            tags,
            publisher: model.publisher,
            updated_at: model.updated_at,
            row_count: model.row_count,
            view_count: model.view_count,
            link: model.link,
            active: model.active,
            first_seen: model.first_seen,
            last_seen: model.last_seen,
        }
    }
}

impl From<resume_state::Model> for ResumeState {
    fn from(model: resume_state::Model) -> Self {
        Self {
            pipeline: model.pipeline,
            resume_token: model.resume_token,
            last_processed_at: model.last_processed_at,
            updated_at: model.updated_at,
        }
    }
}
