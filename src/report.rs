//! Human-readable end-of-scan summary.
//!
//! The summary is written to the log stream line by line; it is meant for
//! people, not for parsing.
use log::{error, info, warn};

use crate::{
    classify::Classification,
    stats::{CrossCheck, ScanStats, pct},
    store::StoreGateway,
};

/// Collection totals at report time. `None` when the count query failed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    pub public: Option<u64>,
    pub private: Option<u64>,
}

/// Query both collection counts, logging (not propagating) failures.
pub fn collect_counts<S: StoreGateway + ?Sized>(store: &S) -> StoreCounts {
    let query = |class: Classification| match store.count(class) {
        Ok(n) => Some(n),
        Err(e) => {
            error!("error getting {} collection count: {}", class, e);
            None
        }
    };
    StoreCounts {
        public: query(Classification::Public),
        private: query(Classification::Private),
    }
}

fn section_header(title: &str) -> String {
    let mut s = String::new();
    s.push_str(title);
    s.push('\n');
    s.push_str(&"=".repeat(title.chars().count()));
    s.push('\n');
    s
}

fn count_or_unavailable(n: Option<u64>) -> String {
    n.map_or_else(|| "(unavailable)".to_string(), |n| n.to_string())
}

pub fn render_summary(stats: &ScanStats, counts: &StoreCounts) -> String {
    let check = stats.cross_check();
    let mut out = section_header("Processing Statistics");
    let lines = [
        format!("Total lines processed: {}", stats.lines_processed),
        format!("Total IPs found: {}", stats.ips_found),
        format!(
            "Within-file duplicates: {} ({})",
            stats.within_file_duplicates,
            pct(stats.within_file_duplicates, stats.ips_found)
        ),
        format!("Unique IPs from file: {}", stats.unique_ips()),
        format!("New public IPs stored: {}", stats.new_public_stored),
        format!("New private IPs stored: {}", stats.new_private_stored),
        format!(
            "Database duplicates skipped: {}",
            stats.store_duplicates_skipped
        ),
        format!("Store errors: {}", stats.store_errors),
        format!(
            "Total public IPs in database: {}",
            count_or_unavailable(counts.public)
        ),
        format!(
            "Total private IPs in database: {}",
            count_or_unavailable(counts.private)
        ),
        format!("Cross-check - unique IPs resolved: {}", check.resolved),
        format!("Cross-check - should equal: {}", check.expected),
    ];
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Emit the summary and the cross-check verdict. A mismatch is a warning only.
pub fn report(stats: &ScanStats, counts: &StoreCounts) -> CrossCheck {
    for line in render_summary(stats, counts).lines() {
        info!("{}", line);
    }
    let check = stats.cross_check();
    if check.holds() {
        info!("Cross-check passed");
    } else if check.holds_with_errors() {
        warn!(
            "Cross-check mismatch: {} resolved vs {} expected, explained by {} store error(s)",
            check.resolved, check.expected, check.store_errors
        );
    } else {
        warn!(
            "Cross-check mismatch: {} resolved + {} store errors vs {} expected",
            check.resolved, check.store_errors, check.expected
        );
    }
    check
}
