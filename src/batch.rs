//! Batch report generation across members.
//!
//! The orchestrator walks the member list in order, generating one document
//! per member through the shared renderer.  Failures are isolated per member:
//! the failing iteration is logged and recorded, and the loop always moves on
//! to the next member.  A fixed cooldown separates iterations so consecutive
//! runs do not contend for the shared page surface resources.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use log::{error, info};
use tokio::time::sleep;

use crate::aggregate::SnapshotProvider;
use crate::document::FinalizedReport;
use crate::error::ReportError;
use crate::member::{Member, MemberId};
use crate::period::ReportPeriod;
use crate::render::{ReportJob, SequentialDocumentRenderer};
use crate::scope::DataScope;

/// Destination for finalized report documents.
pub trait DocumentSink {
    /// Persists or hands off one finalized report.
    fn emit(&mut self, report: &FinalizedReport) -> io::Result<()>;
}

/// Sink that writes each document into a directory under its own filename.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    directory: PathBuf,
}

impl DirectorySink {
    /// Creates a sink rooted at `directory`, creating it if needed.
    pub fn new(directory: impl Into<PathBuf>) -> io::Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }
}

impl DocumentSink for DirectorySink {
    fn emit(&mut self, report: &FinalizedReport) -> io::Result<()> {
        let path = self.directory.join(&report.filename);
        fs::write(&path, &report.bytes)?;
        info!(
            "wrote {} ({} pages, {} bytes)",
            path.display(),
            report.page_count,
            report.bytes.len()
        );
        Ok(())
    }
}

/// Sink that keeps every emitted report in memory, for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Reports in emission order.
    pub reports: Vec<FinalizedReport>,
}

impl DocumentSink for MemorySink {
    fn emit(&mut self, report: &FinalizedReport) -> io::Result<()> {
        self.reports.push(report.clone());
        Ok(())
    }
}

/// Batch tuning knobs.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Fixed cooldown between member iterations.
    pub cooldown: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(500),
        }
    }
}

impl BatchConfig {
    /// Configuration with no cooldown, for tests.
    pub fn without_cooldown() -> Self {
        Self {
            cooldown: Duration::ZERO,
        }
    }
}

/// One member's recorded failure.
#[derive(Clone, Debug)]
pub struct BatchFailure {
    /// Member whose iteration failed.
    pub member_id: MemberId,
    /// Member display name, for operator-facing summaries.
    pub member_name: String,
    /// Description of what failed.
    pub reason: String,
}

/// Result summary of one batch run.
///
/// Success and failure are tracked per member; the batch itself has no single
/// pass/fail verdict.  `attempted` always equals the member count because
/// every member is tried regardless of earlier failures.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Number of members attempted.
    pub attempted: usize,
    /// Filenames of successfully emitted documents, in member order.
    pub completed: Vec<String>,
    /// Recorded per-member failures.
    pub failures: Vec<BatchFailure>,
}

/// Generates one member's report: both period snapshots, a full renderer run,
/// and emission through the sink.
pub async fn generate_member_report<P>(
    provider: &P,
    renderer: &mut SequentialDocumentRenderer,
    member: &Member,
    period: &ReportPeriod,
    sink: &mut dyn DocumentSink,
) -> Result<FinalizedReport, ReportError>
where
    P: SnapshotProvider + ?Sized,
{
    let scope = DataScope::Member(member.id);
    let current = provider.snapshot(&scope, period).await?;
    let ytd_period = ReportPeriod::year_to_date(period.end());
    let year_to_date = provider.snapshot(&scope, &ytd_period).await?;

    let job = ReportJob {
        member,
        period,
        current: &current,
        year_to_date: Some(&year_to_date),
    };
    let report = renderer.run(&job).await?;
    sink.emit(&report)?;
    Ok(report)
}

/// Drives the renderer once per member with failure isolation and throttling.
pub struct BatchReportOrchestrator<'a, P: ?Sized> {
    provider: &'a P,
    renderer: &'a mut SequentialDocumentRenderer,
    config: BatchConfig,
}

impl<'a, P: SnapshotProvider + ?Sized> BatchReportOrchestrator<'a, P> {
    /// Creates an orchestrator over a snapshot provider and the shared
    /// renderer.
    pub fn new(
        provider: &'a P,
        renderer: &'a mut SequentialDocumentRenderer,
        config: BatchConfig,
    ) -> Self {
        Self {
            provider,
            renderer,
            config,
        }
    }

    /// Runs the batch over every member, in list order.
    ///
    /// The batch is complete only after every member has been attempted; a
    /// failed iteration is recorded and the loop continues.
    pub async fn run(
        &mut self,
        members: &[Member],
        period: &ReportPeriod,
        sink: &mut dyn DocumentSink,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for (position, member) in members.iter().enumerate() {
            outcome.attempted += 1;

            match generate_member_report(self.provider, self.renderer, member, period, sink).await
            {
                Ok(report) => {
                    info!("generated {} for {}", report.filename, member.name);
                    outcome.completed.push(report.filename);
                }
                Err(err) => {
                    error!("report for {} failed: {}", member.name, err);
                    outcome.failures.push(BatchFailure {
                        member_id: member.id,
                        member_name: member.name.clone(),
                        reason: err.to_string(),
                    });
                }
            }

            if position + 1 < members.len() {
                sleep(self.config.cooldown).await;
            }
        }

        outcome
    }
}
