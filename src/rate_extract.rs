// 💲 Rate Extract Filter & Step-1 Aggregator
// Two paths over the same extract: the monthly filter that feeds the Step-1
// per-merchant aggregate, and the standalone output with its reinstatement
// rule for suspicious closed merchants.

use crate::clean::{normalize_id, parse_number};
use crate::config::RateRules;
use crate::error::PipelineResult;
use crate::period::{parse_date, ReportingPeriod};
use crate::table::Table;
use log::debug;
use std::collections::HashMap;

/// Canonical column names of the rate/cost extract.
mod col {
    pub const MERCHANT_ID: &str = "merchant_id";
    pub const STATUS: &str = "merchant_status";
    pub const SALES_REP: &str = "sales_rep_number";
    pub const LAST_DEPOSIT: &str = "last_deposit_date";
}

/// Results of the rate-extract stage.
#[derive(Debug, Clone)]
pub struct RateExtract {
    /// Monthly filter result; becomes the rate sheet of the fee bundle.
    pub monthly: Table,

    /// Standalone output table (with the reinstatement rule applied).
    pub output: Table,

    /// Per-merchant Step-1 value: the four rate-discount components summed
    /// row-wise, then accumulated per normalized merchant identifier.
    pub step1: HashMap<String, f64>,
}

pub fn process_rate_extract(
    raw: &Table,
    period: &ReportingPeriod,
    rules: &RateRules,
) -> PipelineResult<RateExtract> {
    let c_id = raw.column(col::MERCHANT_ID)?;
    let c_status = raw.column(col::STATUS)?;
    let c_rep = raw.column(col::SALES_REP)?;
    let c_deposit = raw.column(col::LAST_DEPOSIT)?;

    let discount_cols: Vec<usize> = rules
        .discount_columns
        .iter()
        .map(|name| raw.column(name))
        .collect::<PipelineResult<_>>()?;
    let activity_cols: Vec<usize> = rules
        .activity_columns
        .iter()
        .map(|name| raw.column(name))
        .collect::<PipelineResult<_>>()?;

    let is_closed = |row: &[String]| row[c_status].trim().to_lowercase() == rules.closed_code;

    // ------------------------------------------------------------------
    // Monthly path: drop closed merchants and blacklisted reps outright.
    // ------------------------------------------------------------------
    let mut monthly = raw.clone();
    monthly.retain(|row| !is_closed(row));
    monthly.retain(|row| !rules.rep_blacklist.contains(row[c_rep].trim()));

    // Step-1 aggregate over the monthly survivors. Duplicate extract rows
    // for a merchant accumulate.
    let mut step1: HashMap<String, f64> = HashMap::new();
    for row in monthly.rows() {
        let Some(id) = normalize_id(&row[c_id]) else {
            continue;
        };
        let row_value: f64 = discount_cols.iter().map(|&c| parse_number(&row[c])).sum();
        *step1.entry(id).or_insert(0.0) += row_value;
    }

    // ------------------------------------------------------------------
    // Output path: closed rows may be reinstated for review when the
    // deposit date looks dormant but the financial activity columns are
    // not all zero. That combination is suspicious, so the row is kept
    // rather than silently dropped. Reinstated rows append after the
    // originally-kept ones; downstream consumers diff the sheet in that
    // order.
    // ------------------------------------------------------------------
    let dormancy = period.dormancy_floor;
    let mut kept = raw.clone();
    kept.retain(|row| !is_closed(row));

    let mut reinstated = raw.clone();
    reinstated.retain(|row| {
        if !is_closed(row) {
            return false;
        }
        let stale_deposit = match parse_date(&row[c_deposit]) {
            Some(deposit) => deposit < dormancy,
            None => false,
        };
        let has_activity = activity_cols.iter().any(|&c| parse_number(&row[c]) != 0.0);
        stale_deposit && has_activity
    });

    let mut output = kept.concat(&reinstated);

    // Second, smaller rep blacklist over the reinstated set.
    output.retain(|row| !rules.reinstated_rep_blacklist.contains(row[c_rep].trim()));

    debug!(
        "Rate extract: monthly {} rows, output {} rows, {} merchants with Step-1",
        monthly.len(),
        output.len(),
        step1.len()
    );

    Ok(RateExtract {
        monthly,
        output,
        step1,
    })
}
