use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, Subcommand};
use log::info;

use takeback_reports::batch::{
    generate_member_report, BatchConfig, BatchReportOrchestrator, DirectorySink,
};
use takeback_reports::{
    resolve_scope, HttpTransport, MemberDirectory, MemberId, RendererConfig, ReportPeriod, Role,
    SequentialDocumentRenderer, SessionContext, SourceAggregator,
};

/// Report generation actions for the take-back consortium dashboard.
///
/// Analytics access requires `TAKEBACK_API_URL` and `TAKEBACK_API_TOKEN` in
/// the environment.  Generated documents embed the bundled report fonts; see
/// `assets/fonts/README.md` or set `TAKEBACK_FONTS_DIR`.
#[derive(Parser)]
#[command(author, version, about = "Branded report generation for consortium members")]
struct Cli {
    /// Directory that receives the generated documents.
    #[arg(long, default_value = "reports")]
    out: PathBuf,

    /// Rolling window length for the selected period, in days.
    #[arg(long, default_value_t = 30)]
    days: i64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the branded report for a single member.
    Export {
        /// Member id to export.
        #[arg(long)]
        member: MemberId,
    },

    /// Generate reports for every member in the directory.
    #[command(name = "export-all")]
    ExportAll,
}

fn transport_from_env() -> anyhow::Result<HttpTransport> {
    let base_url =
        std::env::var("TAKEBACK_API_URL").context("TAKEBACK_API_URL must be set")?;
    let token =
        std::env::var("TAKEBACK_API_TOKEN").context("TAKEBACK_API_TOKEN must be set")?;
    HttpTransport::new(base_url, &token).context("failed to build analytics transport")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let period = ReportPeriod::rolling_days(Local::now().date_naive(), cli.days);
    let mut sink = DirectorySink::new(&cli.out)
        .with_context(|| format!("failed to prepare output directory {}", cli.out.display()))?;
    let mut renderer = SequentialDocumentRenderer::new(RendererConfig::default());

    match cli.command {
        Commands::Export { member } => {
            // The CLI acts as an admin-tier session with an explicit member
            // selection; the resolver decides what that session may see.
            let session = SessionContext {
                role: Role::SuperAdmin,
                selected_member_id: Some(member),
                ..SessionContext::default()
            };
            let Some(member_id) = resolve_scope(&session).member_id() else {
                bail!("session does not resolve to a single member");
            };

            let transport = transport_from_env()?;
            let directory = MemberDirectory::fetch(&transport).await?;
            let Some(member) = directory.get(member_id) else {
                bail!("member {} is not in the directory", member_id);
            };

            let aggregator = SourceAggregator::new(transport.clone());
            let report = generate_member_report(
                &aggregator,
                &mut renderer,
                member,
                &period,
                &mut sink,
            )
            .await?;
            info!("exported {}", report.filename);
        }

        Commands::ExportAll => {
            let transport = transport_from_env()?;
            let directory = MemberDirectory::fetch(&transport).await?;
            if directory.is_empty() {
                bail!("member directory is empty");
            }

            let aggregator = SourceAggregator::new(transport);
            let mut orchestrator =
                BatchReportOrchestrator::new(&aggregator, &mut renderer, BatchConfig::default());
            let outcome = orchestrator
                .run(directory.all(), &period, &mut sink)
                .await;

            println!(
                "Batch finished: {} attempted, {} generated, {} failed.",
                outcome.attempted,
                outcome.completed.len(),
                outcome.failures.len()
            );
            for failure in &outcome.failures {
                println!("  {} ({}): {}", failure.member_name, failure.member_id, failure.reason);
            }
        }
    }

    Ok(())
}
