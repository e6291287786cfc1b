// 🧾 Fiserv Roster Filter
// Retention/status rules for the Fiserv merchant synoptic, including the
// partner-roster exception for closed merchants.

use crate::clean::{has_alpha, is_numeric_code, normalize_id, sanitize_table};
use crate::config::FiservRules;
use crate::error::PipelineResult;
use crate::period::{parse_date, ReportingPeriod};
use crate::table::Table;
use log::debug;
use std::collections::HashSet;

/// Canonical column names of the Fiserv synoptic.
mod col {
    pub const MERCHANT: &str = "Merchant #";
    pub const OPEN_DATE: &str = "Open Date";
    pub const CLOSE_DATE: &str = "Close Date";
    pub const LAST_BATCH: &str = "Last Batch Activity";
    pub const STATUS: &str = "Merchant Status";
    pub const SALES_AGENT: &str = "Sales Agent";
}

/// The retained Fiserv roster plus its normalized identifier set.
/// After filtering, the `Merchant #` column holds digits-only identifiers.
#[derive(Debug, Clone)]
pub struct FiservRoster {
    pub kept: Table,
    pub merchant_ids: HashSet<String>,
}

/// Closed-status test. The extracts disagree on the exact wording
/// ("close", "closed", trailing punctuation), so prefix match is the
/// default; exact match is available for the stricter rule variant.
fn is_closed(status: &str, rules: &FiservRules) -> bool {
    let s = status.trim().to_lowercase();
    if rules.closed_exact_match {
        s == "close"
    } else {
        s.starts_with("close")
    }
}

/// Apply the Fiserv retention rules:
/// open-date and premature-closure handling as in the TSYS filter, the
/// sales-agent scope rule (alphabetic codes always in scope, numeric codes
/// only on the allow-list), identifier reduction to digits, and the
/// partner-roster exception that keeps a closed merchant the partner still
/// lists as active. With `strict_dormancy` on, closed merchants with stale
/// batch activity are dropped before the exception can rescue them.
pub fn filter_fiserv(
    roster: &Table,
    period: &ReportingPeriod,
    rules: &FiservRules,
    partner_ids: &HashSet<String>,
) -> PipelineResult<FiservRoster> {
    let mut table = roster.clone();
    sanitize_table(&mut table);

    let c_id = table.column(col::MERCHANT)?;
    let c_open = table.column(col::OPEN_DATE)?;
    let c_close = table.column(col::CLOSE_DATE)?;
    let c_batch = table.column(col::LAST_BATCH)?;
    let c_status = table.column(col::STATUS)?;
    let c_agent = table.column(col::SALES_AGENT)?;

    let before = table.len();

    // The raw extract repeats merchants; collapse before any rule runs.
    table.dedup_by_key(|row| {
        let id = row[c_id].trim();
        if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        }
    });

    // Opened after the reporting period: not yet in scope.
    table.retain(|row| match parse_date(&row[c_open]) {
        Some(opened) => opened <= period.cutoff,
        None => true,
    });

    // Premature closure relative to this report: still active.
    for row in table.rows_mut() {
        if is_closed(&row[c_status], rules) {
            if let Some(closed) = parse_date(&row[c_close]) {
                if closed > period.cutoff {
                    row[c_status] = "Open".to_string();
                }
            }
        }
    }

    // Stricter variant: a closed merchant with no batch activity inside the
    // dormancy window is dropped here, out of reach of the partner
    // exception below.
    if rules.strict_dormancy {
        let dormancy = period.dormancy_floor;
        table.retain(|row| {
            if !is_closed(&row[c_status], rules) {
                return true;
            }
            match parse_date(&row[c_batch]) {
                Some(batch) => batch > dormancy,
                None => false,
            }
        });
    }

    // Sales-agent scope: external agents (any letter in the code) are always
    // in scope; internal numeric codes only when allow-listed.
    table.retain(|row| {
        let agent = row[c_agent].trim();
        has_alpha(agent) || (is_numeric_code(agent) && rules.numeric_agents_to_keep.contains(agent))
    });

    table.retain(|row| !rules.agent_hard_remove.contains(row[c_agent].trim()));

    // Reduce the identifier column to its digits-only form; every
    // cross-source comparison from here on uses this value.
    table.map_column(c_id, |id| normalize_id(id).unwrap_or_default());

    // Closed-merchant exception: the partner roster is authoritative for
    // merchants it still lists, even when Fiserv shows them closed.
    table.retain(|row| !is_closed(&row[c_status], rules) || partner_ids.contains(&row[c_id]));

    table.dedup_by_key(|row| {
        if row[c_id].is_empty() {
            None
        } else {
            Some(row[c_id].clone())
        }
    });

    let merchant_ids: HashSet<String> = table
        .rows()
        .iter()
        .filter(|row| !row[c_id].is_empty())
        .map(|row| row[c_id].clone())
        .collect();

    debug!(
        "Fiserv roster: kept {} of {} rows ({} unique merchants)",
        table.len(),
        before,
        merchant_ids.len()
    );

    Ok(FiservRoster {
        kept: table,
        merchant_ids,
    })
}
