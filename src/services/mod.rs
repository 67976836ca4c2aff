//! Pipeline stages and the ledger client they share.

pub mod aggregation;
pub mod collector;
pub mod diagnostics;
pub mod ledger;
pub mod pipeline;
pub mod reporter;
pub mod uploader;
pub mod workspace;

pub use aggregation::LogAggregator;
pub use collector::{ArtifactCollector, SpecNameMatcher, SuiteMatcher};
pub use diagnostics::{Diagnostic, Diagnostics, Stage};
pub use ledger::LedgerClient;
pub use pipeline::{PipelineOutcome, complete_run, run_pipeline};
pub use reporter::RunReporter;
pub use uploader::ArtifactUploader;
