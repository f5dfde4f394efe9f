//! Reporting core for the take-back consortium dashboard.
//!
//! The crate covers the pipeline behind the dashboard's merged analytics view
//! and the "generate branded report" action: scope resolution, multi-source
//! aggregation, canonical taxonomy normalization, sequential PDF rendering,
//! and batch generation across every member brand.

pub mod aggregate;
pub mod batch;
pub mod charts;
pub mod document;
pub mod error;
pub mod fonts;
pub mod member;
pub mod period;
pub mod render;
pub mod scope;
pub mod taxonomy;
pub mod transport;

pub use aggregate::{MetricSnapshot, SnapshotProvider, SourceAggregator};
pub use batch::{BatchConfig, BatchOutcome, BatchReportOrchestrator, DirectorySink, DocumentSink};
pub use document::{FinalizedReport, GeneratedDocument, RenderedPage};
pub use error::ReportError;
pub use member::{Member, MemberDirectory, MemberId};
pub use period::ReportPeriod;
pub use render::{RenderPhase, RendererConfig, ReportJob, SequentialDocumentRenderer};
pub use scope::{resolve_scope, DataScope, Role, SessionContext};
pub use transport::{AnalyticsTransport, HttpTransport, SourceKind, SourceQuery};
