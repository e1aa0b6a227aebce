//! Revision exclusivity filter.
//!
//! The remote source scopes queries by company id only; it has no way to
//! filter by revision id server-side, so a window may silently contain rows
//! for several revisions of the same company. Every row passes through this
//! filter before persistence.

use crate::ledger::{normalize_revision_id, LedgerEntry};

/// Keep/drop decisions for one window, with drop counting instead of
/// per-row logging.
#[derive(Debug)]
pub struct RevisionFilter {
    target: String,
    kept: u64,
    dropped: u64,
}

/// Window-level summary emitted after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSummary {
    pub kept: u64,
    pub dropped: u64,
}

impl RevisionFilter {
    pub fn new(target_revision_id: &str) -> Self {
        Self {
            target: normalize_revision_id(target_revision_id),
            kept: 0,
            dropped: 0,
        }
    }

    /// Decide whether `entry` belongs to the target revision. Dropping is
    /// silent; only the counters move.
    pub fn accept(&mut self, entry: &LedgerEntry) -> bool {
        if normalize_revision_id(&entry.revision_id) == self.target {
            self.kept += 1;
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    pub fn summary(&self) -> FilterSummary {
        FilterSummary {
            kept: self.kept,
            dropped: self.dropped,
        }
    }

    /// Reset counters between windows while keeping the target.
    pub fn reset(&mut self) {
        self.kept = 0;
        self.dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn entry(revision_id: &str) -> LedgerEntry {
        LedgerEntry {
            company_id: "c1".into(),
            revision_id: revision_id.into(),
            txn_id: "TXN-1".into(),
            line_name: "Line".into(),
            txn_date: "2024-04-01".into(),
            txn_type: "Invoice".into(),
            debit: Decimal::ZERO,
            credit: Decimal::ZERO,
            account_name: "Sales".into(),
            memo: None,
        }
    }

    #[test]
    fn drops_foreign_revisions_and_counts() {
        let mut filter = RevisionFilter::new("95278");
        assert!(filter.accept(&entry("95278")));
        assert!(!filter.accept(&entry("102209")));
        assert!(filter.accept(&entry("95278")));
        assert_eq!(filter.summary(), FilterSummary { kept: 2, dropped: 1 });
    }

    #[test]
    fn numeric_rendering_variants_still_match() {
        let mut filter = RevisionFilter::new("95278");
        assert!(filter.accept(&entry("95278.0")));

        let mut filter = RevisionFilter::new("95278.0");
        assert!(filter.accept(&entry("95278")));
        assert_eq!(filter.summary().dropped, 0);
    }

    #[test]
    fn reset_clears_counters() {
        let mut filter = RevisionFilter::new("95278");
        filter.accept(&entry("102209"));
        filter.reset();
        assert_eq!(filter.summary(), FilterSummary { kept: 0, dropped: 0 });
    }
}
