// 💳 Fee Ledger Filter & Formatter
// Filters the merchant-fee ledger, reconciles it against the union of
// retained roster merchants, reshapes into the canonical output schema, and
// splits by processor.

use crate::clean::{has_alpha, normalize_id, parse_number};
use crate::config::FeeLedgerRules;
use crate::error::PipelineResult;
use crate::period::{format_mdy, parse_date, ReportingPeriod};
use crate::table::Table;
use log::debug;
use std::collections::{HashMap, HashSet};

/// Canonical column names of the fee ledger extract.
mod col {
    pub const PROCESSOR: &str = "Processor";
    pub const OUTSIDE_AGENTS: &str = "Outside Agents";
    pub const SALES_ID: &str = "Sales Id";
    pub const MERCHANT_NUMBER: &str = "Merchant Number";
    pub const ACCOUNT_NAME: &str = "Account Name";
    pub const ACCOUNT_STATUS: &str = "Account Status";
    pub const DATE_APPROVED: &str = "Date Approved";
    pub const DATE_CLOSED: &str = "Date Closed";
    pub const PCI_AMOUNT: &str = "PCI Amnt";
    // Two columns arrive under an older name and are renamed on output.
    pub const RECURRING_FEE_MONTH: &str = "Annual PCI Fee Month to Charge";
    pub const RECURRING_FEE_MONTH_ALT: &str = "Recurring Fee Month";
    pub const MONTHLY_MINIMUM: &str = "Monthly Minimum MPA";
    pub const MONTHLY_MINIMUM_ALT: &str = "Monthly Minimum";
}

/// Fixed output column set of the formatted ledger.
pub const OUTPUT_COLUMNS: [&str; 14] = [
    "Processor",
    "Outside Agents",
    "Sales Id",
    "Merchant Number",
    "Account Name",
    "Account Status",
    "Date Approved",
    "Date Closed",
    "Recurring Fee Code",
    "Recurring Fee Month",
    "PCI Count",
    "PCI Amnt",
    "Monthly Minimum",
    "Step 1",
];

/// The formatted ledger, split by processor tag. Rows carrying any other
/// processor value belong to neither split.
#[derive(Debug, Clone)]
pub struct FeeLedgerSplit {
    pub fiserv: Table,
    pub tsys: Table,
}

/// Render a Step-1 amount the way the output sheet carries it: integral
/// values without a decimal point.
fn format_amount(value: f64) -> String {
    format!("{}", value)
}

/// Run the full fee-ledger stage: filter, reconcile against the roster
/// union, project into `OUTPUT_COLUMNS`, join Step-1 values, and split by
/// processor.
pub fn process_fee_ledger(
    ledger: &Table,
    period: &ReportingPeriod,
    rules: &FeeLedgerRules,
    roster_ids: &HashSet<String>,
    step1: &HashMap<String, f64>,
) -> PipelineResult<FeeLedgerSplit> {
    let mut table = ledger.clone();

    let c_processor = table.column(col::PROCESSOR)?;
    let c_outside = table.column(col::OUTSIDE_AGENTS)?;
    let c_sales = table.column(col::SALES_ID)?;
    let c_merchant = table.column(col::MERCHANT_NUMBER)?;
    let c_name = table.column(col::ACCOUNT_NAME)?;
    let c_status = table.column(col::ACCOUNT_STATUS)?;
    let c_approved = table.column(col::DATE_APPROVED)?;
    let c_closed = table.column(col::DATE_CLOSED)?;
    let c_pci_amount = table.column(col::PCI_AMOUNT)?;
    let c_fee_month =
        table.column_any(&[col::RECURRING_FEE_MONTH, col::RECURRING_FEE_MONTH_ALT])?;
    let c_minimum = table.column_any(&[col::MONTHLY_MINIMUM, col::MONTHLY_MINIMUM_ALT])?;

    let before = table.len();

    // Sales-channel scope: only codes containing a letter are in scope,
    // unless explicitly allow-listed (the internal list is canonically
    // empty, so numeric codes are never retained by default).
    table.retain(|row| {
        let sales_id = row[c_sales].trim();
        has_alpha(sales_id) || rules.internal_agents.contains(sales_id)
    });

    // Approved after the reporting period: not yet in scope.
    table.retain(|row| match parse_date(&row[c_approved]) {
        Some(approved) => approved <= period.cutoff,
        None => true,
    });

    // Premature closure relative to this report: still approved.
    for row in table.rows_mut() {
        if row[c_status].trim().to_lowercase() == "closed" {
            if let Some(closed) = parse_date(&row[c_closed]) {
                if closed > period.cutoff {
                    row[c_status] = "Approved".to_string();
                }
            }
        }
    }

    table.retain(|row| {
        !rules
            .statuses_to_remove
            .contains(&row[c_status].trim().to_lowercase())
    });

    table.retain(|row| {
        !rules
            .sales_id_hard_remove
            .contains(&row[c_sales].trim().to_lowercase())
    });

    // Cross-source reconciliation: the roster filters are the authority on
    // which merchants are in scope this period.
    table.retain(|row| match normalize_id(&row[c_merchant]) {
        Some(id) => roster_ids.contains(&id),
        None => false,
    });

    table.retain(|row| !rules.sales_id_second_pass.contains(row[c_sales].trim()));

    debug!("Fee ledger: kept {} of {} rows", table.len(), before);

    // Project into the canonical output schema, attaching the derived
    // columns as we go.
    let month_number = period.month_number() as i64;
    let headers: Vec<String> = OUTPUT_COLUMNS.iter().map(|s| s.to_string()).collect();
    let mut fiserv = Table::new("Fee ledger (Fiserv)", headers.clone());
    let mut tsys = Table::new("Fee ledger (TSYS)", headers);

    for row in table.rows() {
        let recurring_month = parse_number(&row[c_fee_month]) as i64;
        let pci_count = if recurring_month == month_number { 1 } else { 0 };

        let step1_value = normalize_id(&row[c_merchant])
            .and_then(|id| step1.get(&id).copied())
            .unwrap_or(0.0);

        let out_row = vec![
            row[c_processor].trim().to_string(),
            row[c_outside].clone(),
            row[c_sales].trim().to_string(),
            row[c_merchant].trim().to_string(),
            row[c_name].clone(),
            row[c_status].trim().to_string(),
            format_mdy(parse_date(&row[c_approved])),
            format_mdy(parse_date(&row[c_closed])),
            rules.recurring_fee_code.to_string(),
            recurring_month.to_string(),
            pci_count.to_string(),
            row[c_pci_amount].clone(),
            row[c_minimum].clone(),
            format_amount(step1_value),
        ];

        match out_row[0].to_lowercase().as_str() {
            "fiserv" => fiserv.push_row(out_row),
            "tsys" => tsys.push_row(out_row),
            // Rows with any other processor tag are dropped from both splits
            _ => {}
        }
    }

    debug!(
        "Fee ledger split: {} Fiserv rows, {} TSYS rows",
        fiserv.len(),
        tsys.len()
    );

    Ok(FeeLedgerSplit { fiserv, tsys })
}
