//! Error taxonomy for the reporting core.
//!
//! Data-layer failures (`SourceUnavailable`, `MalformedResponse`) are normally
//! absorbed by the aggregator, which degrades the affected source to its empty
//! default instead of propagating.  Rendering-layer failures abort the current
//! generation run only; the batch orchestrator additionally isolates them per
//! member.

use thiserror::Error;

use crate::transport::SourceKind;

/// Errors raised by the reporting pipeline.
#[derive(Debug, Error)]
pub enum ReportError {
    /// An upstream analytics call failed or returned a non-success status.
    #[error("analytics source {source_kind} unavailable: {reason}")]
    SourceUnavailable {
        /// The source whose request failed.
        source_kind: SourceKind,
        /// Transport-level description of the failure.
        reason: String,
    },

    /// An upstream payload did not match the expected shape.
    #[error("malformed {source_kind} response: {reason}")]
    MalformedResponse {
        /// The source that produced the payload.
        source_kind: SourceKind,
        /// What the normalization boundary rejected.
        reason: String,
    },

    /// The off-screen capture step failed for one page.
    #[error("render fault while capturing page {page}: {reason}")]
    RenderFault {
        /// Zero-based index of the page being captured.
        page: usize,
        /// Description of the capture failure.
        reason: String,
    },

    /// A page was appended outside the strict invocation order.
    #[error("page {got} appended out of order (expected {expected})")]
    PageOutOfOrder {
        /// Index the caller tried to append.
        got: usize,
        /// Index the document expected next.
        expected: usize,
    },

    /// A second generation run was requested while one is in flight.
    #[error("a report generation run is already in flight")]
    GenerationInFlight,

    /// The HTTP transport could not be configured.
    #[error("transport configuration: {0}")]
    TransportConfig(String),

    /// PDF assembly failed.
    #[error(transparent)]
    Pdf(#[from] genpdf::error::Error),

    /// Filesystem interaction failed while emitting a document.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Whether the error belongs to the data layer and should degrade rather
    /// than abort.
    pub fn is_data_layer(&self) -> bool {
        matches!(
            self,
            ReportError::SourceUnavailable { .. } | ReportError::MalformedResponse { .. }
        )
    }
}
