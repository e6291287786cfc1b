// 🔁 Pipeline Orchestrator
// Pure composition: (eight input tables, reporting period, rules) -> four
// output tables. No I/O happens here; reading inputs and writing outputs is
// the caller's job, so either all outputs are produced or none are.

use crate::config::RuleSet;
use crate::error::PipelineResult;
use crate::fee_ledger::{process_fee_ledger, FeeLedgerSplit};
use crate::fiserv::filter_fiserv;
use crate::iso_report::process_iso;
use crate::partner::merge_partner;
use crate::period::ReportingPeriod;
use crate::rate_extract::process_rate_extract;
use crate::table::Table;
use crate::tsys::filter_tsys;
use crate::wireless::extract_wireless;
use log::info;
use std::collections::HashSet;

/// The eight raw extracts of one reporting month.
#[derive(Debug, Clone)]
pub struct RawInputs {
    pub tsys_roster: Table,
    pub fiserv_roster: Table,
    pub partner_s1: Table,
    pub partner_s2: Table,
    pub fee_ledger: Table,
    pub rate_extract: Table,
    pub wireless_report: Table,
    pub iso_report: Table,
}

/// The workbook-shaped bundle: fee ledger split by processor, an
/// always-empty Step-1 placeholder sheet, and the monthly rate sheet.
#[derive(Debug, Clone)]
pub struct FeeBundle {
    pub fiserv: Table,
    pub step1_placeholder: Table,
    pub tsys: Table,
    pub rate: Table,
}

/// The four logical outputs of a run.
#[derive(Debug, Clone)]
pub struct Outputs {
    /// Partner roster restricted to Fiserv-retained merchants.
    pub partner: Table,

    /// Rate extract with the reinstatement rule applied.
    pub rate: Table,

    /// Fee-ledger workbook bundle.
    pub fee_bundle: FeeBundle,

    /// ISO report, filtered and wireless-enriched.
    pub iso: Table,

    /// Wireless usage side table.
    pub wireless: Table,
}

/// Run the full cleaning pipeline in dependency order.
///
/// Partner merge runs first so the Fiserv filter can apply its
/// closed-merchant exception; the partner output is then restricted by the
/// Fiserv result. Both rosters must exist before the fee ledger and the ISO
/// report reconcile against their union.
pub fn run(inputs: &RawInputs, period: &ReportingPeriod, rules: &RuleSet) -> PipelineResult<Outputs> {
    info!(
        "Running residuals pipeline: cutoff {}, dormancy floor {}",
        period.cutoff, period.dormancy_floor
    );

    let partner = merge_partner(&inputs.partner_s1, &inputs.partner_s2)?;

    let tsys = filter_tsys(&inputs.tsys_roster, period, &rules.tsys)?;
    info!("TSYS roster: {} merchants in scope", tsys.merchant_ids.len());

    let fiserv = filter_fiserv(
        &inputs.fiserv_roster,
        period,
        &rules.fiserv,
        &partner.merchant_ids,
    )?;
    info!(
        "Fiserv roster: {} merchants in scope",
        fiserv.merchant_ids.len()
    );

    let partner_output = partner.filtered_by(&fiserv.merchant_ids)?;

    let rate = process_rate_extract(&inputs.rate_extract, period, &rules.rate)?;

    let roster_ids: HashSet<String> = tsys
        .merchant_ids
        .union(&fiserv.merchant_ids)
        .cloned()
        .collect();

    let ledger = process_fee_ledger(
        &inputs.fee_ledger,
        period,
        &rules.fee_ledger,
        &roster_ids,
        &rate.step1,
    )?;

    let wireless = extract_wireless(&inputs.wireless_report, &rules.wireless)?;

    let iso = process_iso(
        &inputs.iso_report,
        &wireless,
        &tsys.merchant_ids,
        &fiserv.merchant_ids,
        &rules.iso,
    )?;

    let FeeLedgerSplit {
        fiserv: ledger_fiserv,
        tsys: ledger_tsys,
    } = ledger;

    Ok(Outputs {
        partner: partner_output,
        rate: rate.output,
        fee_bundle: FeeBundle {
            fiserv: ledger_fiserv,
            step1_placeholder: Table::new("Step1", Vec::new()),
            tsys: ledger_tsys,
            rate: rate.monthly,
        },
        iso,
        wireless: wireless.table,
    })
}
