//! SoQL query builder (§4.C.2).
//!
//! Grounded on `libs/modkit-odata/src/builder.rs`'s typed, allow-listed
//! `QueryBuilder`: every identifier is checked against an `AllowedFields` set
//! before serialization. Unlike `FieldRef`, which gates fields at compile
//! time against a fixed schema enum, Socrata fields are caller-supplied
//! strings with no fixed schema, so the allow-list is checked at runtime.
//! Value-rendering rules mirror `modkit-odata/src/filter.rs`'s `Expr`
//! rendering (quoting, escaping, list serialization).

use catalog_core::CoreError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Comparison/membership operators supported in a `where` predicate (§4.C.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoqlOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
    Like,
    Ilike,
    IsNull,
    IsNotNull,
    Between,
}

impl SoqlOperator {
    fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Like => "LIKE",
            Self::Ilike => "ILIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::Between => "BETWEEN",
        }
    }
}

/// One predicate in a `where` clause (§4.C.2). `value` is absent for the
/// null-checking operators.
#[derive(Debug, Clone)]
pub struct SoqlPredicate {
    pub field: String,
    pub operator: SoqlOperator,
    pub value: Option<Value>,
}

/// Typed input to the SoQL builder. `extra` keys are copied through only
/// when prefixed with `$` (§4.C.2).
#[derive(Debug, Clone, Default)]
pub struct SoqlInput {
    pub select: Option<Vec<String>>,
    pub where_predicates: Vec<SoqlPredicate>,
    pub order: Option<Vec<String>>,
    pub group: Option<Vec<String>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub extra: BTreeMap<String, String>,
}

/// Caller-supplied set of identifiers allowed to appear in `select`,
/// `where`, `order`, or `group` (§4.C.2 constraint). Any other identifier
/// fails with a `ConfigError`.
#[derive(Debug, Clone, Default)]
pub struct AllowedFields {
    fields: std::collections::HashSet<String>,
}

impl AllowedFields {
    #[must_use]
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }
}

/// The rendered SoQL query parameters, ready to serialize into a query
/// string (§4.C.2).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoqlParams {
    pub params: Vec<(String, String)>,
}

impl SoqlParams {
    #[must_use]
    pub fn to_query_string(&self) -> String {
        serde_urlencoded::to_string(&self.params).unwrap_or_default()
    }
}

/// Build `$select`, `$where`, `$order`, `$group`, `$limit`, `$offset` from
/// `input`, checking every identifier against `allowed` (§4.C.2).
///
/// # Errors
/// Returns `CoreError::Config` for an out-of-allow-list identifier, a
/// non-finite number, an operator/value arity mismatch, or an invalid
/// `limit`/`offset`.
pub fn build_soql(input: &SoqlInput, allowed: &AllowedFields) -> Result<SoqlParams, CoreError> {
    let mut params = Vec::new();

    if let Some(select) = &input.select {
        for field in select {
            check_identifier(field, allowed)?;
        }
        params.push(("$select".to_string(), select.join(",")));
    }

    if !input.where_predicates.is_empty() {
        let mut clauses = Vec::with_capacity(input.where_predicates.len());
        for predicate in &input.where_predicates {
            clauses.push(render_predicate(predicate, allowed)?);
        }
        params.push(("$where".to_string(), clauses.join(" AND ")));
    }

    if let Some(order) = &input.order {
        for field in order {
            let bare = field.split_whitespace().next().unwrap_or(field);
            check_identifier(bare, allowed)?;
        }
        params.push(("$order".to_string(), order.join(",")));
    }

    if let Some(group) = &input.group {
        for field in group {
            check_identifier(field, allowed)?;
        }
        params.push(("$group".to_string(), group.join(",")));
    }

    if let Some(limit) = input.limit {
        if limit <= 0 {
            return Err(CoreError::config(format!(
                "SoQL limit must be a positive integer, got {limit}"
            )));
        }
        params.push(("$limit".to_string(), limit.to_string()));
    }

    if let Some(offset) = input.offset {
        if offset < 0 {
            return Err(CoreError::config(format!(
                "SoQL offset must be non-negative, got {offset}"
            )));
        }
        params.push(("$offset".to_string(), offset.to_string()));
    }

    for (key, value) in &input.extra {
        if !key.starts_with('$') {
            return Err(CoreError::config(format!(
                "SoQL extra key '{key}' must be prefixed with '$'"
            )));
        }
        params.push((key.clone(), value.clone()));
    }

    Ok(SoqlParams { params })
}

fn check_identifier(field: &str, allowed: &AllowedFields) -> Result<(), CoreError> {
    if allowed.contains(field) {
        Ok(())
    } else {
        Err(CoreError::config(format!(
            "identifier '{field}' is not in the allow-list"
        )))
    }
}

fn render_predicate(predicate: &SoqlPredicate, allowed: &AllowedFields) -> Result<String, CoreError> {
    check_identifier(&predicate.field, allowed)?;

    match predicate.operator {
        SoqlOperator::IsNull | SoqlOperator::IsNotNull => {
            Ok(format!("{} {}", predicate.field, predicate.operator.as_str()))
        }
        SoqlOperator::Between => {
            let array = expect_array(predicate, 2)?;
            let lo = render_value(&array[0])?;
            let hi = render_value(&array[1])?;
            Ok(format!("{} BETWEEN {lo} AND {hi}", predicate.field))
        }
        SoqlOperator::In | SoqlOperator::NotIn => {
            let array = predicate
                .value
                .as_ref()
                .and_then(Value::as_array)
                .filter(|a| !a.is_empty())
                .ok_or_else(|| {
                    CoreError::config(format!(
                        "operator {} on '{}' requires a non-empty list",
                        predicate.operator.as_str(),
                        predicate.field
                    ))
                })?;
            let mut rendered = Vec::with_capacity(array.len());
            for v in array {
                rendered.push(render_value(v)?);
            }
            Ok(format!(
                "{} {} ({})",
                predicate.field,
                predicate.operator.as_str(),
                rendered.join(", ")
            ))
        }
        SoqlOperator::Like | SoqlOperator::Ilike => {
            let value = predicate.value.as_ref().ok_or_else(|| {
                CoreError::config(format!("operator requires a value for '{}'", predicate.field))
            })?;
            if !value.is_string() {
                return Err(CoreError::config(format!(
                    "operator {} on '{}' requires a string value",
                    predicate.operator.as_str(),
                    predicate.field
                )));
            }
            Ok(format!(
                "{} {} {}",
                predicate.field,
                predicate.operator.as_str(),
                render_value(value)?
            ))
        }
        _ => {
            let value = predicate.value.as_ref().ok_or_else(|| {
                CoreError::config(format!("operator requires a value for '{}'", predicate.field))
            })?;
            Ok(format!(
                "{} {} {}",
                predicate.field,
                predicate.operator.as_str(),
                render_value(value)?
            ))
        }
    }
}

fn expect_array<'a>(predicate: &'a SoqlPredicate, len: usize) -> Result<&'a Vec<Value>, CoreError> {
    predicate
        .value
        .as_ref()
        .and_then(Value::as_array)
        .filter(|a| a.len() == len)
        .ok_or_else(|| {
            CoreError::config(format!(
                "BETWEEN on '{}' requires a {len}-element value",
                predicate.field
            ))
        })
}

/// Render a single value per §4.C.2's serialization rules: strings as
/// single-quoted literals with `'` doubled, finite numbers verbatim,
/// booleans as `true`/`false`, and objects rejected outright.
fn render_value(value: &Value) -> Result<String, CoreError> {
    match value {
        Value::String(s) => Ok(quote_literal(s)),
        Value::Number(n) => {
            let as_f64 = n.as_f64().ok_or_else(|| {
                CoreError::config("SoQL numeric value is not representable as f64".to_string())
            })?;
            if !as_f64.is_finite() {
                return Err(CoreError::config(
                    "SoQL numeric value must be finite".to_string(),
                ));
            }
            Ok(n.to_string())
        }
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Object(_) => Err(CoreError::config(
            "SoQL values cannot be objects".to_string(),
        )),
        Value::Array(_) => Err(CoreError::config(
            "SoQL scalar value cannot be an array; use IN/NOT IN/BETWEEN".to_string(),
        )),
    }
}

fn quote_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('\'');
    for ch in raw.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

/// Convenience for rendering an ISO-8601 timestamp as a single-quoted SoQL
/// literal (§4.C.2 "timestamps as ISO-8601 single-quoted").
#[must_use]
pub fn render_timestamp(dt: chrono::DateTime<chrono::Utc>) -> Value {
    Value::String(dt.to_rfc3339())
}

#[must_use]
pub fn append_query_string(base: &str, params: &SoqlParams) -> String {
    if params.params.is_empty() {
        return base.to_string();
    }
    let mut out = String::with_capacity(base.len() + 32);
    let _ = write!(out, "{base}?{}", params.to_query_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn allow(fields: &[&str]) -> AllowedFields {
        AllowedFields::new(fields.iter().map(|s| (*s).to_string()))
    }

    #[test]
    fn rejects_identifier_outside_allow_list() {
        let input = SoqlInput {
            select: Some(vec!["secret_column".to_string()]),
            ..Default::default()
        };
        let err = build_soql(&input, &allow(&["name"])).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn string_literal_doubles_embedded_quotes() {
        let input = SoqlInput {
            where_predicates: vec![SoqlPredicate {
                field: "name".to_string(),
                operator: SoqlOperator::Eq,
                value: Some(json!("O'Brien")),
            }],
            ..Default::default()
        };
        let params = build_soql(&input, &allow(&["name"])).unwrap();
        let (_, clause) = &params.params[0];
        assert_eq!(clause, "name = 'O''Brien'");
    }

    #[test]
    fn rejects_object_values() {
        let input = SoqlInput {
            where_predicates: vec![SoqlPredicate {
                field: "score".to_string(),
                operator: SoqlOperator::Eq,
                value: Some(json!({"nested": true})),
            }],
            ..Default::default()
        };
        let err = build_soql(&input, &allow(&["score"])).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn between_requires_two_element_array() {
        let input = SoqlInput {
            where_predicates: vec![SoqlPredicate {
                field: "created_at".to_string(),
                operator: SoqlOperator::Between,
                value: Some(json!([1, 2, 3])),
            }],
            ..Default::default()
        };
        let err = build_soql(&input, &allow(&["created_at"])).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn in_requires_non_empty_list() {
        let input = SoqlInput {
            where_predicates: vec![SoqlPredicate {
                field: "category".to_string(),
                operator: SoqlOperator::In,
                value: Some(json!([])),
            }],
            ..Default::default()
        };
        let err = build_soql(&input, &allow(&["category"])).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn null_predicates_take_no_value() {
        let input = SoqlInput {
            where_predicates: vec![SoqlPredicate {
                field: "archived_at".to_string(),
                operator: SoqlOperator::IsNull,
                value: None,
            }],
            ..Default::default()
        };
        let params = build_soql(&input, &allow(&["archived_at"])).unwrap();
        assert_eq!(params.params[0].1, "archived_at IS NULL");
    }

    #[test]
    fn extra_keys_must_be_dollar_prefixed() {
        let mut input = SoqlInput::default();
        input.extra.insert("unsafe".to_string(), "1".to_string());
        let err = build_soql(&input, &allow(&[])).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));

        let mut input = SoqlInput::default();
        input.extra.insert("$$app_token".to_string(), "abc".to_string());
        let params = build_soql(&input, &allow(&[])).unwrap();
        assert_eq!(params.params[0], ("$$app_token".to_string(), "abc".to_string()));
    }

    #[test]
    fn limit_must_be_positive_offset_non_negative() {
        let input = SoqlInput {
            limit: Some(0),
            ..Default::default()
        };
        assert!(build_soql(&input, &allow(&[])).is_err());

        let input = SoqlInput {
            offset: Some(-1),
            ..Default::default()
        };
        assert!(build_soql(&input, &allow(&[])).is_err());
    }
}
