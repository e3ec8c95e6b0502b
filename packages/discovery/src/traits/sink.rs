//! Reporting collaborator seam.
//!
//! Rendering and notification live outside this crate; a sink receives the
//! finished report and does whatever the application needs with it.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::report::DiscoveryReport;

#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, report: &DiscoveryReport) -> Result<()>;
}
