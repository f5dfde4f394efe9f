//! Shared fixtures for the integration tests: an in-memory transport and
//! sample domain data.  Nothing here touches the network.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

use takeback_reports::error::ReportError;
use takeback_reports::member::Member;
use takeback_reports::period::ReportPeriod;
use takeback_reports::scope::DataScope;
use takeback_reports::transport::{AnalyticsTransport, SourceKind, SourceQuery};

/// In-memory stand-in for the analytics API.
///
/// Sources answer with canned payloads (already envelope-free, as the real
/// transport unwraps at its own boundary) and can be marked as failing.
/// Every fetch records the tenant-scope header it would have carried.
#[derive(Debug, Default)]
pub struct FakeTransport {
    responses: HashMap<SourceKind, Value>,
    failing: Vec<SourceKind>,
    members: Vec<Member>,
    pub seen_scope_headers: Mutex<Vec<Option<String>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `source` with the given payload.
    pub fn with_response(mut self, source: SourceKind, payload: Value) -> Self {
        self.responses.insert(source, payload);
        self
    }

    /// Marks `source` as unavailable.
    pub fn with_failure(mut self, source: SourceKind) -> Self {
        self.failing.push(source);
        self
    }

    /// Sets the member directory payload.
    pub fn with_members(mut self, members: Vec<Member>) -> Self {
        self.members = members;
        self
    }

    /// Fully healthy transport with a consistent set of canned analytics.
    pub fn healthy() -> Self {
        Self::new()
            .with_response(
                SourceKind::Summary,
                json!({ "totalWeight": 140.0, "totalItems": 320, "activeStores": 12 }),
            )
            .with_response(
                SourceKind::StoreActivity,
                json!({ "activeStores": 14, "kioskInteractions": 87 }),
            )
            .with_response(
                SourceKind::Trend,
                json!({ "points": [
                    { "period": "2026-01", "weight": 40.0 },
                    { "period": "2026-02", "weight": 60.0 },
                    { "period": "2026-03", "weight": 50.25 },
                ] }),
            )
            .with_response(
                SourceKind::ProgramSessions,
                json!({ "totalWeight": 150.25, "sessions": 41, "breakdown": [
                    { "code": "DROPOFF", "weight": 100.0 },
                    { "code": "MAIL", "weight": 50.25 },
                ] }),
            )
            .with_response(
                SourceKind::MaterialContamination,
                json!({ "rows": [
                    { "code": "PET", "weight": 100.0 },
                    { "code": "GLASS", "weight": 50.0 },
                ] }),
            )
    }
}

#[async_trait]
impl AnalyticsTransport for FakeTransport {
    async fn fetch(
        &self,
        scope: &DataScope,
        source: SourceKind,
        _query: &SourceQuery,
    ) -> Result<Value, ReportError> {
        self.seen_scope_headers
            .lock()
            .unwrap()
            .push(scope.scope_header());

        if self.failing.contains(&source) {
            return Err(ReportError::SourceUnavailable {
                source_kind: source,
                reason: "simulated outage".to_owned(),
            });
        }
        Ok(self.responses.get(&source).cloned().unwrap_or(json!({})))
    }

    async fn members(&self) -> Result<Vec<Member>, ReportError> {
        Ok(self.members.clone())
    }
}

pub fn member(id: i64, name: &str, code: &str) -> Member {
    Member {
        id,
        name: name.to_owned(),
        code: code.to_owned(),
    }
}

pub fn sample_member() -> Member {
    member(7, "Evergreen Outfitters", "EVG")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A third-quarter rolling period, so filenames derive `Q3`.
pub fn sample_period() -> ReportPeriod {
    ReportPeriod::rolling_days(date(2026, 8, 7), 30)
}
