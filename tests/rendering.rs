//! Sequential renderer behavior: strict page order, page plans, filenames,
//! and (when the bundled fonts are installed) deterministic PDF output.

mod common;

use sha2::{Digest, Sha256};

use takeback_reports::aggregate::MetricSnapshot;
use takeback_reports::document::PageBlock;
use takeback_reports::fonts;
use takeback_reports::render::{RendererConfig, ReportJob, SequentialDocumentRenderer};
use takeback_reports::taxonomy::RawCategoryRow;
use takeback_reports::transport::SourceKind;

use common::{sample_member, sample_period};

fn populated_snapshot() -> MetricSnapshot {
    let rows = [
        RawCategoryRow {
            code: "DROPOFF".to_owned(),
            weight: 100.0,
        },
        RawCategoryRow {
            code: "MAIL".to_owned(),
            weight: 50.0,
        },
    ];
    MetricSnapshot {
        total_weight: 150.0,
        total_items: 320,
        active_stores: 14,
        kiosk_interactions: 87,
        program_breakdown: takeback_reports::taxonomy::normalize_programs(&rows),
        material_breakdown: takeback_reports::taxonomy::normalize_materials(&[
            RawCategoryRow {
                code: "PET".to_owned(),
                weight: 100.0,
            },
            RawCategoryRow {
                code: "GLASS".to_owned(),
                weight: 50.0,
            },
        ]),
        series: vec![
            takeback_reports::aggregate::TrendPoint {
                period: "2026-06".to_owned(),
                weight: 70.0,
            },
            takeback_reports::aggregate::TrendPoint {
                period: "2026-07".to_owned(),
                weight: 80.0,
            },
        ],
        degraded_sources: Vec::new(),
    }
}

#[tokio::test]
async fn three_page_run_appends_pages_in_invocation_order() {
    let member = sample_member();
    let period = sample_period();
    let snapshot = populated_snapshot();
    let mut renderer = SequentialDocumentRenderer::new(RendererConfig::without_delay());

    let job = ReportJob {
        member: &member,
        period: &period,
        current: &snapshot,
        year_to_date: None,
    };
    let document = renderer.render_document(&job).await.unwrap();

    // Page order is a function of invocation order alone; content readiness
    // never reorders the machine because it is strictly sequential.
    let indices: Vec<_> = document.pages().iter().map(|page| page.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(document.pages()[0].title, "Evergreen Outfitters");
    assert!(document.pages()[1].title.starts_with("Collection Overview"));
    assert!(document.pages()[2].title.starts_with("Material Breakdown"));
}

#[tokio::test]
async fn year_to_date_doubles_the_period_pages() {
    let member = sample_member();
    let period = sample_period();
    let current = populated_snapshot();
    let ytd = populated_snapshot();
    let mut renderer = SequentialDocumentRenderer::new(RendererConfig::without_delay());

    let job = ReportJob {
        member: &member,
        period: &period,
        current: &current,
        year_to_date: Some(&ytd),
    };
    let document = renderer.render_document(&job).await.unwrap();

    assert_eq!(document.page_count(), 5);
    let indices: Vec<_> = document.pages().iter().map(|page| page.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    assert!(document.pages()[3].title.ends_with("Year to Date"));
    assert!(document.pages()[4].title.ends_with("Year to Date"));
}

#[tokio::test]
async fn filename_derives_member_and_quarter() {
    let member = sample_member();
    let period = sample_period();
    let snapshot = populated_snapshot();
    let mut renderer = SequentialDocumentRenderer::new(RendererConfig::without_delay());

    let job = ReportJob {
        member: &member,
        period: &period,
        current: &snapshot,
        year_to_date: None,
    };
    let document = renderer.render_document(&job).await.unwrap();
    assert_eq!(document.filename(), "Evergreen Outfitters_Q3 Report.pdf");
}

#[tokio::test]
async fn degraded_snapshot_renders_zero_valued_pages() {
    let member = sample_member();
    let period = sample_period();
    let mut snapshot = MetricSnapshot::empty();
    snapshot.degraded_sources = vec![SourceKind::Summary, SourceKind::Trend];
    let mut renderer = SequentialDocumentRenderer::new(RendererConfig::without_delay());

    let job = ReportJob {
        member: &member,
        period: &period,
        current: &snapshot,
        year_to_date: None,
    };
    let document = renderer.render_document(&job).await.unwrap();

    assert_eq!(document.page_count(), 3);
    let metrics_page = &document.pages()[1];
    assert!(metrics_page.blocks.iter().any(|block| matches!(
        block,
        PageBlock::Subheading(text) if text.starts_with("Partial data")
    )));
    assert!(metrics_page.blocks.iter().any(|block| matches!(
        block,
        PageBlock::StatRow { value, .. } if value == "0.00 lbs"
    )));
}

#[tokio::test]
async fn renderer_is_reusable_across_runs() {
    let member = sample_member();
    let period = sample_period();
    let snapshot = populated_snapshot();
    let mut renderer = SequentialDocumentRenderer::new(RendererConfig::without_delay());

    let job = ReportJob {
        member: &member,
        period: &period,
        current: &snapshot,
        year_to_date: None,
    };
    let first = renderer.render_document(&job).await.unwrap();
    let second = renderer.render_document(&job).await.unwrap();

    // The shared surface is fully reset between runs, so nothing leaks from
    // one document into the next.
    assert_eq!(first.page_count(), second.page_count());
    assert_eq!(first.pages()[1].blocks.len(), second.pages()[1].blocks.len());
}

fn scrub_volatile_metadata(bytes: &[u8]) -> Vec<u8> {
    fn scrub_segment(data: &mut [u8], tag: &[u8], terminator: u8) {
        let mut index = 0;
        while index + tag.len() < data.len() {
            if data[index..].starts_with(tag) {
                let mut cursor = index + tag.len();
                while cursor < data.len() && data[cursor] != terminator {
                    if !matches!(data[cursor], b'<' | b'>' | b' ' | b'\n' | b'\r' | b'\t') {
                        data[cursor] = b'0';
                    }
                    cursor += 1;
                }
                index = cursor;
            } else {
                index += 1;
            }
        }
    }

    fn scrub_xml(data: &mut [u8], start: &[u8], end: &[u8]) {
        let mut offset = 0;
        while offset + start.len() < data.len() {
            let Some(start_pos) = data[offset..]
                .windows(start.len())
                .position(|window| window == start)
            else {
                break;
            };
            let content_start = offset + start_pos + start.len();
            let Some(end_pos) = data[content_start..]
                .windows(end.len())
                .position(|window| window == end)
            else {
                break;
            };
            for byte in &mut data[content_start..content_start + end_pos] {
                if !matches!(*byte, b'<' | b'>' | b'/' | b' ' | b'\n' | b'\r' | b'\t') {
                    *byte = b'0';
                }
            }
            offset = content_start + end_pos + end.len();
        }
    }

    let mut normalized = bytes.to_vec();
    scrub_segment(&mut normalized, b"/CreationDate(", b')');
    scrub_segment(&mut normalized, b"/ModDate(", b')');
    scrub_segment(&mut normalized, b"/ID[", b']');
    scrub_segment(&mut normalized, b"/Producer(", b')');
    scrub_xml(&mut normalized, b"<xmp:CreateDate>", b"</xmp:CreateDate>");
    scrub_xml(&mut normalized, b"<xmp:ModifyDate>", b"</xmp:ModifyDate>");
    scrub_xml(&mut normalized, b"<xmp:MetadataDate>", b"</xmp:MetadataDate>");
    scrub_xml(&mut normalized, b"<xmpMM:DocumentID>", b"</xmpMM:DocumentID>");
    scrub_xml(&mut normalized, b"<xmpMM:InstanceID>", b"</xmpMM:InstanceID>");
    scrub_xml(&mut normalized, b"<xmpMM:VersionID>", b"</xmpMM:VersionID>");
    normalized
}

#[tokio::test]
async fn finalized_pdf_is_deterministic() {
    if !fonts::default_fonts_available() {
        eprintln!(
            "Skipping finalized_pdf_is_deterministic: report fonts missing. \
             Set TAKEBACK_FONTS_DIR or install assets/fonts."
        );
        return;
    }

    let member = sample_member();
    let period = sample_period();
    let snapshot = populated_snapshot();
    let mut renderer = SequentialDocumentRenderer::new(RendererConfig::without_delay());

    let job = ReportJob {
        member: &member,
        period: &period,
        current: &snapshot,
        year_to_date: None,
    };
    let first = renderer.run(&job).await.unwrap();
    let second = renderer.run(&job).await.unwrap();

    assert_eq!(first.filename, "Evergreen Outfitters_Q3 Report.pdf");
    assert_eq!(first.page_count, 3);
    assert!(!first.bytes.is_empty());

    let hash_a = Sha256::digest(scrub_volatile_metadata(&first.bytes));
    let hash_b = Sha256::digest(scrub_volatile_metadata(&second.bytes));
    assert_eq!(hash_a, hash_b, "PDF output must be deterministic");
}
