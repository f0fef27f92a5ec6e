//! Resume token encoding (§3 "the decoded shape of a resume token"):
//! `{region, cursor, processed}`, JSON-encoded. Parsed by hand rather than
//! via `catalog_core::ResumeToken`'s derived `Deserialize`, since that
//! derive renders `Region` as `"Us"`/`"Eu"` while the wire format (and
//! §8 S2) expects the uppercase `Region::as_str()` form.

use catalog_core::{CoreError, Region};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedToken {
    pub region: Region,
    pub cursor: String,
    pub processed: u64,
}

pub fn encode(region: Region, processed: u64) -> String {
    json!({
        "region": region.as_str(),
        "cursor": format!("processed:{processed}"),
        "processed": processed,
    })
    .to_string()
}

/// §4.F step 2: malformed tokens throw `RUNTIME` with `Invalid resumeFrom
/// format`.
pub fn parse(raw: &str) -> Result<ParsedToken, CoreError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|_| CoreError::Schema("Invalid resumeFrom format".to_string()).as_pipeline_runtime())?;

    let region = value
        .get("region")
        .and_then(|v| v.as_str())
        .and_then(Region::parse)
        .ok_or_else(|| CoreError::Schema("Invalid resumeFrom format".to_string()).as_pipeline_runtime())?;
    let cursor = value
        .get("cursor")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CoreError::Schema("Invalid resumeFrom format".to_string()).as_pipeline_runtime())?
        .to_string();
    let processed = value
        .get("processed")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| CoreError::Schema("Invalid resumeFrom format".to_string()).as_pipeline_runtime())?;

    Ok(ParsedToken { region, cursor, processed })
}
