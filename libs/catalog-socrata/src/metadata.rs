//! Metadata normalization (§4.C.5): `GET /api/views/{id}.json` mapped into
//! the canonical `NormalizedDatasetMetadata` shape.

use crate::transport::SocrataTransport;
use catalog_adapter::MetadataFetcher;
use catalog_core::{CoreError, LogicalType, NormalizedColumn, NormalizedDatasetMetadata};
use catalog_http::Fetch;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ViewResponse {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    columns: Vec<ViewColumn>,
}

#[derive(Debug, Deserialize)]
struct ViewColumn {
    id: Value,
    name: String,
    #[serde(rename = "fieldName", default)]
    field_name: String,
    #[serde(rename = "dataTypeName", default)]
    data_type_name: String,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(rename = "subColumnTypes", default)]
    sub_column_types: Vec<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Maps a Socrata `dataTypeName` (and, for `location`, a sub-column hint)
/// into the canonical logical type set (§3, §4.C.5). Undocumented values
/// collapse to `Unknown`.
#[must_use]
pub fn map_logical_type(data_type_name: &str, sub_column_types: &[String]) -> LogicalType {
    match data_type_name {
        "text" | "html" => LogicalType::Text,
        "number" => LogicalType::Number,
        "money" => LogicalType::Money,
        "percent" => LogicalType::Percent,
        "checkbox" => LogicalType::Checkbox,
        "calendar_date" | "date" => LogicalType::Date,
        "floating_timestamp" | "fixed_timestamp" | "datetime" => LogicalType::Datetime,
        "url" => LogicalType::Url,
        "email" => LogicalType::Email,
        "phone" => LogicalType::Phone,
        "location" => {
            if sub_column_types.iter().any(|t| t.eq_ignore_ascii_case("polygon")) {
                LogicalType::Polygon
            } else if sub_column_types.iter().any(|t| t.eq_ignore_ascii_case("point")) {
                LogicalType::Point
            } else {
                LogicalType::Location
            }
        }
        "point" => LogicalType::Point,
        "polygon" | "multipolygon" => LogicalType::Polygon,
        "json" | "object" | "array" => LogicalType::Json,
        _ => LogicalType::Unknown,
    }
}

fn column_from(raw: ViewColumn) -> NormalizedColumn {
    let logical_type = map_logical_type(&raw.data_type_name, &raw.sub_column_types);
    let required = raw.flags.iter().any(|f| f == "required");
    let hidden = raw.flags.iter().any(|f| f == "hidden");
    NormalizedColumn {
        id: raw.id.to_string(),
        name: raw.name,
        field_name: raw.field_name,
        api_type: raw.data_type_name,
        logical_type,
        nullable: !required,
        hidden,
        description: raw.description,
    }
}

pub struct SocrataMetadataFetcher<F: Fetch> {
    host: String,
    transport: SocrataTransport<F>,
}

impl<F: Fetch> SocrataMetadataFetcher<F> {
    #[must_use]
    pub fn new(host: impl Into<String>, transport: SocrataTransport<F>) -> Self {
        Self { host: host.into(), transport }
    }
}

#[async_trait::async_trait]
impl<F: Fetch> MetadataFetcher for SocrataMetadataFetcher<F> {
    async fn fetch_metadata(&self, id: &str) -> Result<NormalizedDatasetMetadata, CoreError> {
        let url = format!("https://{}/api/views/{}.json", self.host, id);
        let body = self.transport.get_json(&url).await?;
        let parsed: ViewResponse = serde_json::from_value(body)
            .map_err(|e| CoreError::Schema(format!("malformed view response: {e}")))?;

        Ok(NormalizedDatasetMetadata {
            id: parsed.id,
            name: parsed.name,
            description: parsed.description,
            columns: parsed.columns.into_iter().map(column_from).collect(),
        })
    }
}
