//! Multi-source aggregation: degrade-and-continue, merge precedence, and
//! scope handling over an in-memory transport.

mod common;

use takeback_reports::aggregate::{MetricSnapshot, SourceAggregator, WEIGHT_EPSILON};
use takeback_reports::scope::DataScope;
use takeback_reports::taxonomy::{total_weight, MATERIALS, PROGRAM_CHANNELS};
use takeback_reports::transport::SourceKind;

use common::{sample_period, FakeTransport};

#[tokio::test]
async fn healthy_sources_merge_into_a_complete_snapshot() {
    let aggregator = SourceAggregator::new(FakeTransport::healthy());
    let snapshot = aggregator
        .aggregate(&DataScope::Member(7), &sample_period())
        .await;

    assert!(snapshot.is_complete());
    assert_eq!(snapshot.total_weight, 150.25);
    assert_eq!(snapshot.total_items, 320);
    assert_eq!(snapshot.kiosk_interactions, 87);
    assert_eq!(snapshot.series.len(), 3);
    // Program weights reconcile with the total within the tolerance.
    assert!(snapshot.weight_discrepancy() <= WEIGHT_EPSILON);
}

#[tokio::test]
async fn period_specific_source_outranks_cached_summary() {
    let snapshot = SourceAggregator::new(FakeTransport::healthy())
        .aggregate(&DataScope::Member(7), &sample_period())
        .await;
    // Summary said 140.0; the warehouse session feed said 150.25 and wins.
    assert_eq!(snapshot.total_weight, 150.25);
    // Store activity outranks the summary's cached store count.
    assert_eq!(snapshot.active_stores, 14);
}

#[tokio::test]
async fn failed_source_degrades_without_aborting() {
    let transport = FakeTransport::healthy().with_failure(SourceKind::Summary);
    let snapshot = SourceAggregator::new(transport)
        .aggregate(&DataScope::Member(7), &sample_period())
        .await;

    assert_eq!(snapshot.degraded_sources, vec![SourceKind::Summary]);
    // Summary contributions fall to defaults...
    assert_eq!(snapshot.total_items, 0);
    // ...while the period-specific sources still merge normally.
    assert_eq!(snapshot.total_weight, 150.25);
    assert_eq!(snapshot.series.len(), 3);
}

#[tokio::test]
async fn session_outage_falls_back_to_cached_total() {
    let transport = FakeTransport::healthy().with_failure(SourceKind::ProgramSessions);
    let snapshot = SourceAggregator::new(transport)
        .aggregate(&DataScope::Member(7), &sample_period())
        .await;

    assert_eq!(snapshot.degraded_sources, vec![SourceKind::ProgramSessions]);
    assert_eq!(snapshot.total_weight, 140.0);
    // The canonical program rows are still present, just zero-valued; the
    // discrepancy against the cached total is tolerated, not fabricated away.
    assert_eq!(snapshot.program_breakdown.len(), PROGRAM_CHANNELS.len());
    assert_eq!(total_weight(&snapshot.program_breakdown), 0.0);
}

#[tokio::test]
async fn every_source_down_still_produces_a_snapshot() {
    let mut transport = FakeTransport::new();
    for source in SourceKind::ALL {
        transport = transport.with_failure(source);
    }
    let snapshot = SourceAggregator::new(transport)
        .aggregate(&DataScope::Member(7), &sample_period())
        .await;

    assert_eq!(snapshot.degraded_sources.len(), SourceKind::ALL.len());
    assert_eq!(snapshot.total_weight, 0.0);
    assert_eq!(snapshot.program_breakdown.len(), PROGRAM_CHANNELS.len());
    assert_eq!(snapshot.material_breakdown.len(), MATERIALS.len());
}

#[tokio::test]
async fn denied_scope_short_circuits_to_the_empty_snapshot() {
    let transport = FakeTransport::healthy();
    let aggregator = SourceAggregator::new(transport);
    let snapshot = aggregator
        .aggregate(&DataScope::Denied, &sample_period())
        .await;

    assert_eq!(snapshot, MetricSnapshot::empty());
    assert!(aggregator
        .transport()
        .seen_scope_headers
        .lock()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn member_scope_reaches_the_transport_as_a_header() {
    let aggregator = SourceAggregator::new(FakeTransport::healthy());
    aggregator
        .aggregate(&DataScope::Member(42), &sample_period())
        .await;

    let headers = aggregator.transport().seen_scope_headers.lock().unwrap();
    assert_eq!(headers.len(), SourceKind::ALL.len());
    assert!(headers.iter().all(|h| h.as_deref() == Some("42")));
}

#[tokio::test]
async fn malformed_payload_degrades_that_source_only() {
    let transport = FakeTransport::healthy().with_response(
        SourceKind::Trend,
        serde_json::json!({ "points": "not-an-array" }),
    );
    let snapshot = SourceAggregator::new(transport)
        .aggregate(&DataScope::Member(7), &sample_period())
        .await;

    assert_eq!(snapshot.degraded_sources, vec![SourceKind::Trend]);
    assert!(snapshot.series.is_empty());
    assert_eq!(snapshot.total_weight, 150.25);
}
