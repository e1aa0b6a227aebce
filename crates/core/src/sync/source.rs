//! Remote record source contract.

use async_trait::async_trait;

use crate::errors::Result;
use crate::ledger::LedgerEntry;
use crate::sync::window::DateWindow;

/// The remote, query-based connector the engine pulls rows through.
///
/// One call per window, scoped by company id only: the source cannot filter
/// by revision id server-side, so the returned rows may belong to several
/// revisions sharing that company id and give no ordering guarantee. The
/// revision filter runs downstream of every implementation.
#[async_trait]
pub trait RemoteRecordSource: Send + Sync {
    /// Cheap reachability/configuration probe run before any window query.
    /// A failure here is terminal for the sync attempt.
    async fn check_connection(&self, connector_ref: &str) -> Result<()>;

    /// Fetch all rows for `company_id` within `window` (both ends
    /// inclusive). Network-bound; large windows can take minutes.
    async fn fetch_window(
        &self,
        connector_ref: &str,
        company_id: &str,
        window: &DateWindow,
    ) -> Result<Vec<LedgerEntry>>;
}
