//! Multi-source analytics aggregation.
//!
//! Five independently-versioned read endpoints feed the dashboard and the
//! report generator.  Each request is attempted exactly once; a failed or
//! malformed response degrades that source's contribution to an empty default
//! and is recorded on the snapshot so callers can surface a partial-data
//! notice.  The aggregator never fabricates values for a degraded source and
//! never aborts the merge because one source misbehaved.

use async_trait::async_trait;
use futures::join;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::period::ReportPeriod;
use crate::scope::DataScope;
use crate::taxonomy::{self, CategoryWeight, RawCategoryRow};
use crate::transport::{AnalyticsTransport, SourceKind, SourceQuery};

/// Tolerance for the program-weight consistency check, in weight units.
///
/// Upstream never documented an authoritative tolerance; 0.5 units absorbs
/// the rounding differences observed between the session feed and the cached
/// summary.
pub const WEIGHT_EPSILON: f64 = 0.5;

/// Cached summary counts.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_weight: f64,
    pub total_items: u64,
    pub active_stores: u32,
}

/// Store and kiosk interaction statistics.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreActivityStats {
    pub active_stores: Option<u32>,
    pub kiosk_interactions: u64,
}

/// One point of the collected-weight series.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrendPoint {
    /// Period key, e.g. `2026-03` or `2025`.
    pub period: String,
    pub weight: f64,
}

/// Monthly or yearly collected-weight series.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrendStats {
    pub points: Vec<TrendPoint>,
}

/// Warehouse processing-session statistics; the period-specific raw source.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgramSessionStats {
    pub total_weight: Option<f64>,
    pub sessions: u64,
    pub breakdown: Vec<RawCategoryRow>,
}

/// Contamination-by-material statistics.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaterialStats {
    pub rows: Vec<RawCategoryRow>,
}

/// The unified result of one aggregation pass.
///
/// Immutable once produced.  `degraded_sources` lists every source that fell
/// back to its empty default during the merge.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub total_weight: f64,
    pub total_items: u64,
    pub active_stores: u32,
    pub kiosk_interactions: u64,
    pub program_breakdown: Vec<CategoryWeight>,
    pub material_breakdown: Vec<CategoryWeight>,
    pub series: Vec<TrendPoint>,
    pub degraded_sources: Vec<SourceKind>,
}

impl MetricSnapshot {
    /// The empty snapshot: canonical zero rows, no series, nothing degraded.
    ///
    /// This is also what a denied scope aggregates to, so downstream rendering
    /// always has a complete category set to draw.
    pub fn empty() -> Self {
        Self {
            total_weight: 0.0,
            total_items: 0,
            active_stores: 0,
            kiosk_interactions: 0,
            program_breakdown: taxonomy::normalize_programs(&[]),
            material_breakdown: taxonomy::normalize_materials(&[]),
            series: Vec::new(),
            degraded_sources: Vec::new(),
        }
    }

    /// Whether every source contributed real data.
    pub fn is_complete(&self) -> bool {
        self.degraded_sources.is_empty()
    }

    /// Absolute difference between the program-breakdown sum and the total.
    pub fn weight_discrepancy(&self) -> f64 {
        (taxonomy::total_weight(&self.program_breakdown) - self.total_weight).abs()
    }
}

/// Anything that can produce a member-scoped [`MetricSnapshot`].
///
/// The HTTP aggregator degrades per source and therefore always succeeds;
/// the seam exists so the batch orchestrator can isolate providers that do
/// fail wholesale.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Produces the snapshot for one scope and period.
    async fn snapshot(
        &self,
        scope: &DataScope,
        period: &ReportPeriod,
    ) -> Result<MetricSnapshot, ReportError>;
}

/// Aggregates the five analytics sources into one [`MetricSnapshot`].
pub struct SourceAggregator<T> {
    transport: T,
}

impl<T: AnalyticsTransport> SourceAggregator<T> {
    /// Creates an aggregator over the given transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Borrows the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn source<P>(
        &self,
        scope: &DataScope,
        source: SourceKind,
        query: &SourceQuery,
    ) -> Result<P, ReportError>
    where
        P: DeserializeOwned,
    {
        let value = self.transport.fetch(scope, source, query).await?;
        serde_json::from_value(value).map_err(|err| ReportError::MalformedResponse {
            source_kind: source,
            reason: err.to_string(),
        })
    }

    /// Runs one aggregation pass.
    ///
    /// All five requests are issued concurrently and the merge waits until
    /// every attempt has settled.  A denied scope short-circuits to the empty
    /// snapshot without touching the network.
    pub async fn aggregate(&self, scope: &DataScope, period: &ReportPeriod) -> MetricSnapshot {
        if matches!(scope, DataScope::Denied) {
            debug!("aggregation skipped for denied scope");
            return MetricSnapshot::empty();
        }

        let query = SourceQuery {
            start: period.start(),
            end: period.end(),
        };

        let (summary, activity, trend, sessions, materials) = join!(
            self.source::<SummaryStats>(scope, SourceKind::Summary, &query),
            self.source::<StoreActivityStats>(scope, SourceKind::StoreActivity, &query),
            self.source::<TrendStats>(scope, SourceKind::Trend, &query),
            self.source::<ProgramSessionStats>(scope, SourceKind::ProgramSessions, &query),
            self.source::<MaterialStats>(scope, SourceKind::MaterialContamination, &query),
        );

        let mut degraded = Vec::new();
        let summary = settle(SourceKind::Summary, summary, &mut degraded);
        let activity = settle(SourceKind::StoreActivity, activity, &mut degraded);
        let trend = settle(SourceKind::Trend, trend, &mut degraded);
        let sessions = settle(SourceKind::ProgramSessions, sessions, &mut degraded);
        let materials = settle(SourceKind::MaterialContamination, materials, &mut degraded);

        merge(summary, activity, trend, sessions, materials, degraded)
    }
}

#[async_trait]
impl<T: AnalyticsTransport> SnapshotProvider for SourceAggregator<T> {
    async fn snapshot(
        &self,
        scope: &DataScope,
        period: &ReportPeriod,
    ) -> Result<MetricSnapshot, ReportError> {
        Ok(self.aggregate(scope, period).await)
    }
}

fn settle<P: Default>(
    source: SourceKind,
    outcome: Result<P, ReportError>,
    degraded: &mut Vec<SourceKind>,
) -> P {
    match outcome {
        Ok(payload) => payload,
        Err(err) => {
            warn!("degrading {} source to defaults: {}", source, err);
            degraded.push(source);
            P::default()
        }
    }
}

fn merge(
    summary: SummaryStats,
    activity: StoreActivityStats,
    trend: TrendStats,
    sessions: ProgramSessionStats,
    materials: MaterialStats,
    degraded: Vec<SourceKind>,
) -> MetricSnapshot {
    let program_breakdown = taxonomy::normalize_programs(&sessions.breakdown);

    // The period-specific session feed wins over the cached summary whenever
    // it produced a value.
    let total_weight = sessions
        .total_weight
        .or_else(|| {
            if degraded.contains(&SourceKind::ProgramSessions) {
                None
            } else {
                Some(taxonomy::total_weight(&program_breakdown))
            }
        })
        .unwrap_or(summary.total_weight);

    let snapshot = MetricSnapshot {
        total_weight,
        total_items: summary.total_items,
        active_stores: activity.active_stores.unwrap_or(summary.active_stores),
        kiosk_interactions: activity.kiosk_interactions,
        program_breakdown,
        material_breakdown: taxonomy::normalize_materials(&materials.rows),
        series: trend.points,
        degraded_sources: degraded,
    };

    if snapshot.is_complete() && snapshot.weight_discrepancy() > WEIGHT_EPSILON {
        warn!(
            "program breakdown disagrees with total weight by {:.2} units",
            snapshot.weight_discrepancy()
        );
    }

    snapshot
}
