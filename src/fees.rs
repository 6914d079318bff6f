//! Fee calculator. Pure integer math; whole dollars only.

use std::collections::BTreeMap;

use crate::models::visit::VisitRecord;

/// Flat fee per visit, in whole dollars.
pub const VISIT_FEE: i64 = 45;

/// Gas reimbursement per distinct facility-day, in whole dollars.
pub const DAILY_GAS: i64 = 20;

/// Payable total for `visit_count` visits on a single facility-day.
pub fn day_amount(visit_count: i64) -> i64 {
    if visit_count <= 0 {
        return 0;
    }
    visit_count * VISIT_FEE + DAILY_GAS
}

/// Per-day aggregation for export: day key -> (visit count, amount).
///
/// Every day with at least one visit earns exactly one gas
/// reimbursement regardless of how many claims cover it.
pub fn day_totals(visits: &[VisitRecord]) -> BTreeMap<String, (i64, i64)> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for visit in visits {
        *counts.entry(visit.day_key()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(day, count)| (day, (count, day_amount(count))))
        .collect()
}
