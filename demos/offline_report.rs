//! Renders a sample branded report from canned analytics data, without
//! touching the network.
//!
//! Fonts must be installed under `assets/fonts` or pointed to via
//! `TAKEBACK_FONTS_DIR` before running:
//!
//! ```text
//! cargo run --example offline_report
//! ```

use std::error::Error;
use std::fs;

use chrono::NaiveDate;

use takeback_reports::aggregate::{MetricSnapshot, TrendPoint};
use takeback_reports::member::Member;
use takeback_reports::period::ReportPeriod;
use takeback_reports::render::{RendererConfig, ReportJob, SequentialDocumentRenderer};
use takeback_reports::taxonomy::{normalize_materials, normalize_programs, RawCategoryRow};

fn row(code: &str, weight: f64) -> RawCategoryRow {
    RawCategoryRow {
        code: code.to_owned(),
        weight,
    }
}

fn sample_snapshot() -> MetricSnapshot {
    MetricSnapshot {
        total_weight: 1843.75,
        total_items: 5210,
        active_stores: 37,
        kiosk_interactions: 1204,
        program_breakdown: normalize_programs(&[
            row("DROPOFF", 1301.5),
            row("MAIL", 488.25),
            row("OBSOLETE", 54.0),
        ]),
        material_breakdown: normalize_materials(&[
            row("PET", 712.0),
            row("HDPE", 401.5),
            row("GLASS", 360.0),
            row("METAL", 218.25),
            row("TEXTILE", 152.0),
        ]),
        series: vec![
            TrendPoint {
                period: "2026-05".to_owned(),
                weight: 540.0,
            },
            TrendPoint {
                period: "2026-06".to_owned(),
                weight: 622.5,
            },
            TrendPoint {
                period: "2026-07".to_owned(),
                weight: 681.25,
            },
        ],
        degraded_sources: Vec::new(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let member = Member {
        id: 7,
        name: "Evergreen Outfitters".to_owned(),
        code: "EVG".to_owned(),
    };
    let end = NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date");
    let period = ReportPeriod::rolling_days(end, 30);

    let snapshot = sample_snapshot();
    let ytd = sample_snapshot();
    let mut renderer = SequentialDocumentRenderer::new(RendererConfig::without_delay());

    let job = ReportJob {
        member: &member,
        period: &period,
        current: &snapshot,
        year_to_date: Some(&ytd),
    };
    let report = renderer.run(&job).await?;

    fs::write(&report.filename, &report.bytes)?;
    println!(
        "Generated {} ({} pages, {} bytes)",
        report.filename,
        report.page_count,
        report.bytes.len()
    );
    Ok(())
}
