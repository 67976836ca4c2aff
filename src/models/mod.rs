//! Domain models for the Test Ledger reporter.

pub mod artifact;
pub mod composite_key;
pub mod ledger_id;
pub mod log_record;
pub mod run_report;
pub mod run_result;

// Re-export commonly used types
pub use artifact::{
    Artifact, ArtifactType, Association, UploadResult, UploadSummary, UploadTarget,
};
pub use composite_key::CompositeKey;
pub use ledger_id::LedgerId;
pub use log_record::{LogRecord, OccurrenceKind, TestOccurrence};
pub use run_report::{RunMetadata, RunReport, SuiteRecord, TestRecord};
pub use run_result::{LedgerSuite, LedgerTest, RunResult};
