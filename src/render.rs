//! Sequential document rendering.
//!
//! Report generation is a strict state machine, not an event-driven loop: the
//! renderer mounts one page onto the shared surface, waits out the fixed
//! stabilization delay, captures, appends, and only then moves to the next
//! page.  Page order is therefore a function of invocation order alone.  The
//! machine runs at most one document at a time; a second request while a run
//! is in flight is rejected outright.

use std::time::Duration;

use log::{debug, error};
use tokio::time::sleep;

use crate::aggregate::MetricSnapshot;
use crate::charts::{color_for, BarChartSpec, PieChartSpec};
use crate::document::{FinalizedReport, GeneratedDocument, PageSurface, SurfaceBlock};
use crate::error::ReportError;
use crate::member::Member;
use crate::period::ReportPeriod;
use crate::taxonomy::{percentage, percentage_precise, round2, total_weight};

/// Phases of one generation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderPhase {
    /// No run in flight.
    Idle,
    /// Mounting page content onto the surface.
    Rendering(usize),
    /// Waiting out the fixed settle interval before capture.
    AwaitingStabilization(usize),
    /// Capturing the surface into a page.
    Capturing(usize),
    /// Page appended to the document.
    Appended(usize),
    /// Rendering the paginated PDF and computing the filename.
    Finalizing,
    /// Run completed.
    Done,
    /// Run aborted; no partial document was emitted.
    Failed,
}

/// Renderer tuning knobs.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Fixed settle interval before each capture.  Charts animate on mount;
    /// capturing early produces an incomplete raster.  This is a fixed wait,
    /// not a poll, and dominates total generation latency.
    pub stabilization_delay: Duration,
    /// Raster density multiplier applied at capture time for print quality.
    pub capture_scale: f64,
    /// Display diameter of breakdown pie charts, in pixels.
    pub pie_diameter_px: u32,
    /// Display size of the trend bar chart, in pixels.
    pub bar_size_px: (u32, u32),
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            stabilization_delay: Duration::from_millis(1200),
            capture_scale: 2.0,
            pie_diameter_px: 260,
            bar_size_px: (520, 200),
        }
    }
}

impl RendererConfig {
    /// Configuration with no settle delay, for tests and offline rendering.
    pub fn without_delay() -> Self {
        Self {
            stabilization_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Everything one generation run needs.
#[derive(Clone, Copy, Debug)]
pub struct ReportJob<'a> {
    /// Member the report is branded for.
    pub member: &'a Member,
    /// Selected report period.
    pub period: &'a ReportPeriod,
    /// Snapshot for the selected period.  A degraded snapshot renders
    /// zero-valued pages; it never aborts the run.
    pub current: &'a MetricSnapshot,
    /// Year-to-date snapshot; when present the page set is doubled.
    pub year_to_date: Option<&'a MetricSnapshot>,
}

#[derive(Clone, Copy, Debug)]
enum PeriodSlot {
    Current,
    YearToDate,
}

#[derive(Clone, Copy, Debug)]
enum PageKind {
    Cover,
    Metrics(PeriodSlot),
    Materials(PeriodSlot),
}

/// The sequential report renderer.
///
/// Owns the single reusable [`PageSurface`]; the surface is fully reset
/// before each page and is never shared between overlapping runs because the
/// machine refuses to start while another run is in flight.
#[derive(Debug)]
pub struct SequentialDocumentRenderer {
    config: RendererConfig,
    surface: PageSurface,
    phase: RenderPhase,
}

impl SequentialDocumentRenderer {
    /// Creates a renderer with the given configuration.
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            surface: PageSurface::new(),
            phase: RenderPhase::Idle,
        }
    }

    /// Current phase, for observability.
    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    /// Runs one generation end to end.
    ///
    /// Returns the finalized report, or the first rendering-layer fault.  The
    /// phase returns to [`RenderPhase::Idle`] on both outcomes so the
    /// renderer can be reused; a run that is still in flight rejects new
    /// requests with [`ReportError::GenerationInFlight`].
    pub async fn run(&mut self, job: &ReportJob<'_>) -> Result<FinalizedReport, ReportError> {
        if self.phase != RenderPhase::Idle {
            return Err(ReportError::GenerationInFlight);
        }

        let outcome = self.execute(job).await;
        match &outcome {
            Ok(report) => {
                self.transition(RenderPhase::Done);
                debug!(
                    "finalized {} ({} pages, {} bytes)",
                    report.filename,
                    report.page_count,
                    report.bytes.len()
                );
            }
            Err(err) => {
                self.transition(RenderPhase::Failed);
                error!("report generation aborted: {}", err);
            }
        }
        self.phase = RenderPhase::Idle;
        outcome
    }

    /// Runs the machine through the append phase and returns the paginated
    /// document without rendering it to PDF bytes.
    ///
    /// Useful for headless inspection of page order and content; callers
    /// wanting the downloadable artifact use [`Self::run`], which also
    /// finalizes.
    pub async fn render_document(
        &mut self,
        job: &ReportJob<'_>,
    ) -> Result<GeneratedDocument, ReportError> {
        if self.phase != RenderPhase::Idle {
            return Err(ReportError::GenerationInFlight);
        }

        let outcome = self.paginate(job).await;
        match &outcome {
            Ok(_) => self.transition(RenderPhase::Done),
            Err(err) => {
                self.transition(RenderPhase::Failed);
                error!("report pagination aborted: {}", err);
            }
        }
        self.phase = RenderPhase::Idle;
        outcome
    }

    fn transition(&mut self, next: RenderPhase) {
        debug!("render phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    async fn execute(&mut self, job: &ReportJob<'_>) -> Result<FinalizedReport, ReportError> {
        let document = self.paginate(job).await?;
        self.transition(RenderPhase::Finalizing);
        self.surface.reset();
        document.finalize()
    }

    async fn paginate(&mut self, job: &ReportJob<'_>) -> Result<GeneratedDocument, ReportError> {
        let mut plan = vec![
            PageKind::Cover,
            PageKind::Metrics(PeriodSlot::Current),
            PageKind::Materials(PeriodSlot::Current),
        ];
        if job.year_to_date.is_some() {
            plan.push(PageKind::Metrics(PeriodSlot::YearToDate));
            plan.push(PageKind::Materials(PeriodSlot::YearToDate));
        }

        let mut document =
            GeneratedDocument::new(job.member.name.clone(), job.period.file_label());

        for (index, kind) in plan.iter().enumerate() {
            self.transition(RenderPhase::Rendering(index));
            self.surface.reset();
            self.mount_page(*kind, job);

            self.transition(RenderPhase::AwaitingStabilization(index));
            sleep(self.config.stabilization_delay).await;

            self.transition(RenderPhase::Capturing(index));
            let page = self.surface.capture(index, self.config.capture_scale)?;

            document.append_page(page)?;
            self.transition(RenderPhase::Appended(index));
        }

        Ok(document)
    }

    fn mount_page(&mut self, kind: PageKind, job: &ReportJob<'_>) {
        match kind {
            PageKind::Cover => self.mount_cover(job),
            PageKind::Metrics(slot) => self.mount_metrics(slot, job),
            PageKind::Materials(slot) => self.mount_materials(slot, job),
        }
    }

    fn snapshot_for<'a>(&self, slot: PeriodSlot, job: &ReportJob<'a>) -> &'a MetricSnapshot {
        match slot {
            PeriodSlot::Current => job.current,
            PeriodSlot::YearToDate => job.year_to_date.unwrap_or(job.current),
        }
    }

    fn slot_label(&self, slot: PeriodSlot, job: &ReportJob<'_>) -> String {
        match slot {
            PeriodSlot::Current => job.period.label().to_owned(),
            PeriodSlot::YearToDate => "Year to Date".to_owned(),
        }
    }

    fn mount_cover(&mut self, job: &ReportJob<'_>) {
        self.surface.set_title(job.member.name.clone());
        self.surface.mount(SurfaceBlock::Subheading(format!(
            "{} Performance Report",
            job.period.label()
        )));
        self.surface.mount(SurfaceBlock::Spacer(2.0));
        self.surface.mount(SurfaceBlock::StatRow {
            label: "Member Code".to_owned(),
            value: job.member.code.clone(),
        });
        self.surface.mount(SurfaceBlock::StatRow {
            label: "Reporting Period".to_owned(),
            value: format!("{} \u{2013} {}", job.period.start(), job.period.end()),
        });
        self.surface.mount(SurfaceBlock::Spacer(6.0));
        self.surface.mount(SurfaceBlock::Subheading(
            "Take-Back Program Consortium".to_owned(),
        ));
    }

    fn mount_metrics(&mut self, slot: PeriodSlot, job: &ReportJob<'_>) {
        let snapshot = self.snapshot_for(slot, job);
        let label = self.slot_label(slot, job);

        self.surface
            .set_title(format!("Collection Overview \u{2014} {}", label));
        self.mount_partial_data_notice(snapshot);

        self.surface.mount(SurfaceBlock::StatRow {
            label: "Total Weight Collected".to_owned(),
            value: format!("{:.2} lbs", round2(snapshot.total_weight)),
        });
        self.surface.mount(SurfaceBlock::StatRow {
            label: "Items Returned".to_owned(),
            value: snapshot.total_items.to_string(),
        });
        self.surface.mount(SurfaceBlock::StatRow {
            label: "Active Stores".to_owned(),
            value: snapshot.active_stores.to_string(),
        });
        self.surface.mount(SurfaceBlock::StatRow {
            label: "Kiosk Interactions".to_owned(),
            value: snapshot.kiosk_interactions.to_string(),
        });
        self.surface.mount(SurfaceBlock::Spacer(1.0));

        self.surface.mount(SurfaceBlock::PieChart(
            PieChartSpec::from_breakdown(
                &snapshot.program_breakdown,
                self.config.pie_diameter_px,
            ),
        ));
        let breakdown_total = total_weight(&snapshot.program_breakdown);
        for (index, row) in snapshot.program_breakdown.iter().enumerate() {
            self.surface.mount(SurfaceBlock::LegendRow {
                swatch: color_for(index),
                label: row.category.clone(),
                detail: format!(
                    "{:.2} lbs ({}%)",
                    round2(row.weight),
                    percentage(row.weight, breakdown_total)
                ),
            });
        }

        if !snapshot.series.is_empty() {
            self.surface.mount(SurfaceBlock::Spacer(1.0));
            self.surface.mount(SurfaceBlock::Subheading(
                "Collected Weight by Period".to_owned(),
            ));
            let bars = snapshot
                .series
                .iter()
                .map(|point| (point.period.clone(), point.weight))
                .collect();
            let (width, height) = self.config.bar_size_px;
            self.surface.mount(SurfaceBlock::BarChart(
                BarChartSpec::from_series(bars, width, height),
            ));
        }
    }

    fn mount_materials(&mut self, slot: PeriodSlot, job: &ReportJob<'_>) {
        let snapshot = self.snapshot_for(slot, job);
        let label = self.slot_label(slot, job);

        self.surface
            .set_title(format!("Material Breakdown \u{2014} {}", label));
        self.mount_partial_data_notice(snapshot);

        self.surface.mount(SurfaceBlock::PieChart(
            PieChartSpec::from_breakdown(
                &snapshot.material_breakdown,
                self.config.pie_diameter_px,
            ),
        ));

        let breakdown_total = total_weight(&snapshot.material_breakdown);
        for (index, row) in snapshot.material_breakdown.iter().enumerate() {
            self.surface.mount(SurfaceBlock::LegendRow {
                swatch: color_for(index),
                label: row.category.clone(),
                detail: format!(
                    "{:.2} lbs ({:.1}%)",
                    round2(row.weight),
                    percentage_precise(row.weight, breakdown_total)
                ),
            });
        }
    }

    fn mount_partial_data_notice(&mut self, snapshot: &MetricSnapshot) {
        if !snapshot.degraded_sources.is_empty() {
            self.surface.mount(SurfaceBlock::Subheading(format!(
                "Partial data: {} source(s) were unavailable for this period.",
                snapshot.degraded_sources.len()
            )));
        }
    }
}
