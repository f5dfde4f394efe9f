//! Analytics transport.
//!
//! All upstream access goes through the [`AnalyticsTransport`] trait so the
//! aggregator can be exercised against an in-memory fake.  The HTTP
//! implementation configures its bearer credential once at construction and
//! derives the tenant-scope header per request from the effective
//! [`DataScope`]; nothing in this crate intercepts or monkey-patches a global
//! client.
//!
//! Upstream endpoints are documented to return `{ "success": bool, "data":
//! {...} }` but several of them ship the payload bare, and one generation of
//! the API double-wrapped it.  [`unwrap_envelope`] maps every known shape into
//! one internal payload at this boundary.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use crate::error::ReportError;
use crate::member::Member;
use crate::scope::DataScope;

/// Header carrying the effective tenant scope on every analytics request.
pub const SCOPE_HEADER: &str = "X-Member-Scope";

/// The independently-versioned analytics read endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum SourceKind {
    /// Cached summary counts (weight, items, stores).
    Summary,
    /// Store and kiosk interaction statistics.
    StoreActivity,
    /// Monthly or yearly collected-weight series.
    Trend,
    /// Warehouse processing sessions with per-channel weights.  This is the
    /// period-specific raw source and takes precedence when merging.
    ProgramSessions,
    /// Contamination-by-material statistics.
    MaterialContamination,
}

impl SourceKind {
    /// Every source the aggregator queries, in merge order.
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Summary,
        SourceKind::StoreActivity,
        SourceKind::Trend,
        SourceKind::ProgramSessions,
        SourceKind::MaterialContamination,
    ];

    /// Endpoint path relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            SourceKind::Summary => "analytics/summary",
            SourceKind::StoreActivity => "analytics/stores/activity",
            SourceKind::Trend => "analytics/trends",
            SourceKind::ProgramSessions => "analytics/warehouse/sessions",
            SourceKind::MaterialContamination => "analytics/contamination/materials",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Summary => "summary",
            SourceKind::StoreActivity => "store-activity",
            SourceKind::Trend => "trend",
            SourceKind::ProgramSessions => "program-sessions",
            SourceKind::MaterialContamination => "material-contamination",
        };
        f.write_str(name)
    }
}

/// Date-range query attached to every analytics request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SourceQuery {
    /// Inclusive range start.
    pub start: NaiveDate,
    /// Inclusive range end.
    pub end: NaiveDate,
}

/// Read access to the analytics endpoints and the member directory.
///
/// Every analytics request carries the tenant-scope header derived from the
/// effective [`DataScope`], so batch runs can scope each member's requests
/// individually over one shared client.
#[async_trait]
pub trait AnalyticsTransport: Send + Sync {
    /// Fetches one source's raw payload with the envelope already unwrapped.
    async fn fetch(
        &self,
        scope: &DataScope,
        source: SourceKind,
        query: &SourceQuery,
    ) -> Result<Value, ReportError>;

    /// Fetches the member directory.
    async fn members(&self) -> Result<Vec<Member>, ReportError>;
}

/// Peels the documented response envelope off a payload.
///
/// Accepts `{ "success": true, "data": {...} }`, a bare payload, and the
/// historical double wrap `{ "data": { "data": {...} } }`.  A body carrying
/// `"success": false` is rejected as unavailable.
pub fn unwrap_envelope(source: SourceKind, mut value: Value) -> Result<Value, ReportError> {
    // Two layers is the deepest wrap ever observed upstream.
    for _ in 0..2 {
        let is_wrapper = value
            .as_object()
            .is_some_and(|map| map.contains_key("data") || map.contains_key("success"));
        if !is_wrapper {
            break;
        }

        let map = match value {
            Value::Object(ref mut map) => map,
            _ => break,
        };
        if let Some(success) = map.get("success").and_then(Value::as_bool) {
            if !success {
                return Err(ReportError::SourceUnavailable {
                    source_kind: source,
                    reason: "upstream reported success=false".to_owned(),
                });
            }
        }
        match map.remove("data") {
            Some(inner) => value = inner,
            None => break,
        }
    }
    Ok(value)
}

/// HTTP transport over the consortium analytics API.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Builds a transport with the bearer credential installed as a default
    /// header, configured once at startup.
    ///
    /// Timeout behavior is whatever `reqwest` applies; the aggregator never
    /// layers its own deadline on top.
    pub fn new(base_url: impl Into<String>, bearer_token: &str) -> Result<Self, ReportError> {
        let mut headers = HeaderMap::new();
        let credential = format!("Bearer {}", bearer_token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&credential).map_err(|err| {
                ReportError::TransportConfig(format!("invalid bearer credential: {}", err))
            })?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| {
                ReportError::TransportConfig(format!("failed to build HTTP client: {}", err))
            })?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json(
        &self,
        source: SourceKind,
        path: &str,
        scope_header: Option<&str>,
        query: &HashMap<&str, String>,
    ) -> Result<Value, ReportError> {
        let mut request = self.client.get(self.url(path)).query(query);
        if let Some(scope) = scope_header {
            request = request.header(SCOPE_HEADER, scope);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ReportError::SourceUnavailable {
                source_kind: source,
                reason: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::SourceUnavailable {
                source_kind: source,
                reason: format!("HTTP status {}", status),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| ReportError::MalformedResponse {
                source_kind: source,
                reason: format!("body is not JSON: {}", err),
            })
    }
}

#[async_trait]
impl AnalyticsTransport for HttpTransport {
    async fn fetch(
        &self,
        scope: &DataScope,
        source: SourceKind,
        query: &SourceQuery,
    ) -> Result<Value, ReportError> {
        let mut params = HashMap::new();
        params.insert("startDate", query.start.to_string());
        params.insert("endDate", query.end.to_string());
        let scope_header = scope.scope_header();
        let raw = self
            .get_json(source, source.path(), scope_header.as_deref(), &params)
            .await?;
        unwrap_envelope(source, raw)
    }

    async fn members(&self) -> Result<Vec<Member>, ReportError> {
        let raw = self
            .get_json(SourceKind::Summary, "members", None, &HashMap::new())
            .await?;
        let unwrapped = unwrap_envelope(SourceKind::Summary, raw)?;
        serde_json::from_value(unwrapped).map_err(|err| ReportError::MalformedResponse {
            source_kind: SourceKind::Summary,
            reason: format!("member directory: {}", err),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_documented_envelope() {
        let raw = json!({ "success": true, "data": { "totalWeight": 12.0 } });
        let value = unwrap_envelope(SourceKind::Summary, raw).unwrap();
        assert_eq!(value, json!({ "totalWeight": 12.0 }));
    }

    #[test]
    fn accepts_bare_payload() {
        let raw = json!({ "totalWeight": 12.0 });
        let value = unwrap_envelope(SourceKind::Summary, raw.clone()).unwrap();
        assert_eq!(value, raw);
    }

    #[test]
    fn peels_double_wrap() {
        let raw = json!({ "data": { "data": { "points": [] } } });
        let value = unwrap_envelope(SourceKind::Trend, raw).unwrap();
        assert_eq!(value, json!({ "points": [] }));
    }

    #[test]
    fn rejects_success_false() {
        let raw = json!({ "success": false, "data": {} });
        let err = unwrap_envelope(SourceKind::Summary, raw).unwrap_err();
        assert!(matches!(err, ReportError::SourceUnavailable { .. }));
    }
}
