// 🧾 TSYS Roster Filter
// Retention/status rules for the TSYS merchant synoptic. Output defines half
// of the "in scope this period" merchant set.

use crate::clean::normalize_id;
use crate::config::TsysRules;
use crate::error::PipelineResult;
use crate::period::{parse_date, ReportingPeriod};
use crate::table::Table;
use log::debug;
use std::collections::HashSet;

/// Canonical column names of the TSYS synoptic.
mod col {
    pub const MERCHANT_ID: &str = "Merchant ID";
    pub const DATE_OPENED: &str = "Date Opened";
    pub const DATE_CLOSED: &str = "Date Closed";
    pub const LAST_DEPOSIT: &str = "Last Deposit Date";
    pub const STATUS: &str = "Status";
    pub const REP_NAME: &str = "Rep Name";
}

/// The retained TSYS roster plus its normalized identifier set.
#[derive(Debug, Clone)]
pub struct TsysRoster {
    pub kept: Table,
    pub merchant_ids: HashSet<String>,
}

fn status_lower(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Apply the TSYS retention rules in order:
/// 1. remove merchants opened after the cutoff;
/// 2. un-close merchants whose close date lands after the cutoff;
/// 3. remove closed merchants with no deposit inside the dormancy window;
/// 4. remove terminal statuses (closed/declined/cancelled);
/// 5. remove blacklisted reps;
/// 6. deduplicate by normalized merchant identifier, first occurrence wins.
pub fn filter_tsys(
    roster: &Table,
    period: &ReportingPeriod,
    rules: &TsysRules,
) -> PipelineResult<TsysRoster> {
    let mut table = roster.clone();

    let c_id = table.column(col::MERCHANT_ID)?;
    let c_opened = table.column(col::DATE_OPENED)?;
    let c_closed = table.column(col::DATE_CLOSED)?;
    let c_deposit = table.column(col::LAST_DEPOSIT)?;
    let c_status = table.column(col::STATUS)?;
    let c_rep = table.column(col::REP_NAME)?;

    let before = table.len();

    // Opened after the reporting period: not yet in scope.
    table.retain(|row| match parse_date(&row[c_opened]) {
        Some(opened) => opened <= period.cutoff,
        None => true,
    });

    // Closure recorded after the cutoff was premature relative to this
    // report; the merchant is still active for the period.
    for row in table.rows_mut() {
        if status_lower(&row[c_status]) == "closed" {
            if let Some(closed) = parse_date(&row[c_closed]) {
                if closed > period.cutoff {
                    row[c_status] = "Open".to_string();
                }
            }
        }
    }

    // A closed merchant with no deposit activity in the dormancy window is
    // fully dormant.
    let dormancy = period.dormancy_floor;
    table.retain(|row| {
        if status_lower(&row[c_status]) != "closed" {
            return true;
        }
        match parse_date(&row[c_deposit]) {
            Some(deposit) => deposit > dormancy,
            None => false,
        }
    });

    // Terminal statuses: anything still closed after the correction above,
    // plus declined/cancelled.
    table.retain(|row| !rules.statuses_to_remove.contains(&status_lower(&row[c_status])));

    // Operationally blacklisted reps.
    table.retain(|row| !rules.rep_hard_remove.contains(&row[c_rep].trim().to_lowercase()));

    table.dedup_by_key(|row| normalize_id(&row[c_id]));

    let merchant_ids: HashSet<String> = table
        .rows()
        .iter()
        .filter_map(|row| normalize_id(&row[c_id]))
        .collect();

    debug!(
        "TSYS roster: kept {} of {} rows ({} unique merchants)",
        table.len(),
        before,
        merchant_ids.len()
    );

    Ok(TsysRoster {
        kept: table,
        merchant_ids,
    })
}
