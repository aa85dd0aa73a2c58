//! Scan counters and the cross-check between them.
//!
//! `ScanStats` is a plain value owned by one scan: the engine mutates it while
//! reading and hands it back when the scan ends.
use crate::classify::Classification;
use crate::store::InsertOutcome;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub lines_processed: u64,
    pub ips_found: u64,
    pub within_file_duplicates: u64,
    pub new_public_stored: u64,
    pub new_private_stored: u64,
    pub store_duplicates_skipped: u64,
    pub store_errors: u64,
}

/// Both sides of the cross-check, as reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossCheck {
    /// new public + new private + store duplicates
    pub resolved: u64,
    /// ips found - within-file duplicates
    pub expected: u64,
    pub store_errors: u64,
}

impl CrossCheck {
    /// Holds when every first occurrence landed in one of the three outcome
    /// buckets. Any store error breaks it.
    pub fn holds(&self) -> bool {
        self.resolved == self.expected
    }

    /// Holds once store errors are counted as a fourth bucket.
    pub fn holds_with_errors(&self) -> bool {
        self.resolved + self.store_errors == self.expected
    }
}

impl ScanStats {
    pub fn record_outcome(&mut self, classification: Classification, outcome: InsertOutcome) {
        match (outcome, classification) {
            (InsertOutcome::Inserted, Classification::Public) => self.new_public_stored += 1,
            (InsertOutcome::Inserted, Classification::Private) => self.new_private_stored += 1,
            (InsertOutcome::AlreadyExists, _) => self.store_duplicates_skipped += 1,
        }
    }

    /// Distinct addresses the scan saw (first occurrences).
    pub fn unique_ips(&self) -> u64 {
        self.ips_found.saturating_sub(self.within_file_duplicates)
    }

    pub fn cross_check(&self) -> CrossCheck {
        CrossCheck {
            resolved: self.new_public_stored
                + self.new_private_stored
                + self.store_duplicates_skipped,
            expected: self.unique_ips(),
            store_errors: self.store_errors,
        }
    }
}

pub fn pct(n: u64, d: u64) -> String {
    if d == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", (n as f64) / (d as f64) * 100.0)
}
