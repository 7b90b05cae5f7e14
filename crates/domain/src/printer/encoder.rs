use super::dialect::Dialect;
use super::job::PrintJob;
use crate::error::{DomainError, Result};

/// Renders print job descriptors into one printer dialect.
///
/// Implementations are pure: identical input yields identical bytes.
pub trait CommandEncoder: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Render a receipt (flowing, top to bottom)
    fn encode_receipt(&self, job: &PrintJob) -> Result<Vec<u8>>;

    /// Render a label with absolute placement. Only label dialects support it.
    fn encode_label(&self, _job: &PrintJob) -> Result<Vec<u8>> {
        Err(DomainError::ContentError(format!(
            "{} dialect does not support label mode",
            self.dialect()
        )))
    }

    /// Printer self-test command
    fn encode_self_test(&self) -> Vec<u8>;

    /// Render in the dialect's natural mode
    fn encode_job(&self, job: &PrintJob) -> Result<Vec<u8>> {
        self.encode_receipt(job)
    }
}
