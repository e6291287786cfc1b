// 🗂️ ISO Report Filter & Enricher
// Filters the ISO extract by merchant-name exclusions and cross-source
// membership, applies the processor-specific ID prefix, and enriches rows
// with the wireless-count lookup.

use crate::clean::{digit_run, normalize_id, sanitize_cell, strip_float_artifact};
use crate::config::IsoRules;
use crate::error::PipelineResult;
use crate::table::Table;
use crate::wireless::WirelessUsage;
use log::debug;
use std::collections::HashSet;

/// Canonical column names of the ISO report.
mod col {
    pub const MID1: &str = "MID1";
    pub const MID2: &str = "MID2";
    pub const PROCESSOR: &str = "PROCESSOR";
    pub const DBA_NAME: &str = "DBA NAME";
}

const WIRELESS_COUNT: &str = "Wireless count";

/// Membership set for the retention check: normalized roster identifiers
/// plus the prefix-expanded TSYS variants, since the ISO report carries the
/// processor prefix the TSYS roster's raw identifiers lack.
fn allowed_ids(
    tsys_ids: &HashSet<String>,
    fiserv_ids: &HashSet<String>,
    prefix: &str,
) -> HashSet<String> {
    let mut allowed: HashSet<String> = fiserv_ids.union(tsys_ids).cloned().collect();
    for id in tsys_ids {
        allowed.insert(format!("{}{}", prefix, id));
    }
    allowed
}

/// Run the ISO report stage.
///
/// MID1/MID2 keep their cleaned text form in the output (trailing ".0"
/// artifacts stripped but non-digit content retained); only the membership
/// test reduces them to digits.
pub fn process_iso(
    raw: &Table,
    wireless: &WirelessUsage,
    tsys_ids: &HashSet<String>,
    fiserv_ids: &HashSet<String>,
    rules: &IsoRules,
) -> PipelineResult<Table> {
    let mut table = raw.clone();

    let c_mid1 = table.column(col::MID1)?;
    let c_mid2 = table.column(col::MID2)?;
    let c_processor = table.column(col::PROCESSOR)?;
    let c_dba = table.column(col::DBA_NAME)?;
    let c_lookup = table.position(rules.lookup_column)?;

    let before = table.len();

    for c in [c_mid1, c_mid2, c_processor, c_dba] {
        table.map_column(c, |v| sanitize_cell(v));
    }
    for c in [c_mid1, c_mid2] {
        table.map_column(c, |v| strip_float_artifact(v));
    }

    // Processor-specific ID transform: prefix MID1 when present, else MID2.
    // The already-prefixed guard keeps the transform safe to re-run on data
    // that has been through it before.
    let prefix = rules.id_prefix.as_str();
    for row in table.rows_mut() {
        if !row[c_processor]
            .to_lowercase()
            .starts_with(&rules.processor_tag)
        {
            continue;
        }
        if !row[c_mid1].is_empty() {
            if !row[c_mid1].starts_with(prefix) {
                row[c_mid1] = format!("{}{}", prefix, row[c_mid1]);
            }
        } else if !row[c_mid2].is_empty() && !row[c_mid2].starts_with(prefix) {
            row[c_mid2] = format!("{}{}", prefix, row[c_mid2]);
        }
    }

    // Merchant-name exclusions.
    table.retain(|row| {
        let dba = row[c_dba].to_lowercase();
        let excluded = rules
            .name_prefix_exclusions
            .iter()
            .any(|p| dba.starts_with(p.as_str()))
            || rules.name_exact_exclusions.iter().any(|n| dba == *n);
        !excluded
    });

    // Cross-source membership: at least one candidate identifier must match
    // a retained roster merchant.
    let allowed = allowed_ids(tsys_ids, fiserv_ids, prefix);
    table.retain(|row| {
        let mid1 = normalize_id(&row[c_mid1]);
        let mid2 = normalize_id(&row[c_mid2]);
        mid1.map_or(false, |id| allowed.contains(&id))
            || mid2.map_or(false, |id| allowed.contains(&id))
    });

    // Enrichment: the digit run of the positional lookup column keys into
    // the wireless counts; the new column lands at a fixed position rather
    // than at the end.
    let values: Vec<String> = table
        .rows()
        .iter()
        .map(|row| {
            digit_run(&row[c_lookup])
                .and_then(|key| wireless.counts.get(&key).cloned())
                .unwrap_or_default()
        })
        .collect();
    table.insert_column(rules.insert_position, WIRELESS_COUNT, values);

    // Trailing blank-titled column, kept for spreadsheet compatibility.
    table.push_blank_column("");

    debug!("ISO report: kept {} of {} rows", table.len(), before);

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WirelessRules;
    use crate::wireless::extract_wireless;

    fn report(rows: Vec<Vec<&str>>) -> Table {
        let headers = vec!["MID1", "MID2", "PROCESSOR", "DBA NAME", "Serial"];
        let mut t = Table::new(
            "ISO report",
            headers.into_iter().map(String::from).collect(),
        );
        for row in rows {
            t.push_row(row.into_iter().map(String::from).collect());
        }
        t
    }

    fn narrow_rules() -> IsoRules {
        // The fixture table is narrow; point the positional lookup at the
        // Serial column and insert at the end.
        IsoRules {
            lookup_column: 4,
            insert_position: 99,
            ..IsoRules::default()
        }
    }

    fn ids(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn no_wireless() -> WirelessUsage {
        let empty = Table::new(
            "Wireless report",
            vec!["a", "b", "c", "d", "e", "f"].into_iter().map(String::from).collect(),
        );
        extract_wireless(&empty, &WirelessRules::default()).unwrap()
    }

    #[test]
    fn test_prefix_applied_to_mid1_for_tagged_processor() {
        let t = report(vec![vec!["1234", "", "TSYS East", "Store", ""]]);
        let out = process_iso(&t, &no_wireless(), &ids(&["1234"]), &ids(&[]), &narrow_rules())
            .unwrap();
        assert_eq!(out.cell(0, 0), "391234");
    }

    #[test]
    fn test_prefix_falls_back_to_mid2_when_mid1_empty() {
        let t = report(vec![vec!["", "5678", "tsys", "Store", ""]]);
        let out = process_iso(&t, &no_wireless(), &ids(&["5678"]), &ids(&[]), &narrow_rules())
            .unwrap();
        assert_eq!(out.cell(0, 1), "395678");
    }

    #[test]
    fn test_no_double_prefix_on_rerun() {
        let t = report(vec![vec!["391234", "", "TSYS", "Store", ""]]);
        let out = process_iso(&t, &no_wireless(), &ids(&["1234"]), &ids(&[]), &narrow_rules())
            .unwrap();
        assert_eq!(out.cell(0, 0), "391234");
    }

    #[test]
    fn test_float_artifact_stripped_without_digit_reduction() {
        let t = report(vec![vec!["AB-77.0", "", "Fiserv", "Store", ""]]);
        let out = process_iso(&t, &no_wireless(), &ids(&[]), &ids(&["77"]), &narrow_rules())
            .unwrap();
        // cell keeps its non-digit content; only the membership test used
        // the digits-only form
        assert_eq!(out.cell(0, 0), "AB-77");
    }

    #[test]
    fn test_name_exclusions() {
        let t = report(vec![
            vec!["100", "", "Fiserv", "Webb Supplies", ""],
            vec!["200", "", "Fiserv", "MAILBOX PLUS", ""],
            vec!["300", "", "Fiserv", "Ordinary Shop", ""],
        ]);
        let out = process_iso(
            &t,
            &no_wireless(),
            &ids(&[]),
            &ids(&["100", "200", "300"]),
            &narrow_rules(),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.cell(0, 0), "300");
    }

    #[test]
    fn test_membership_uses_prefix_expanded_tsys_ids() {
        // The roster's raw identifier lacks the processor prefix the ISO
        // report carries; the expansion still matches it.
        let t = report(vec![vec!["398888", "", "Other", "Store", ""]]);
        let out = process_iso(&t, &no_wireless(), &ids(&["8888"]), &ids(&[]), &narrow_rules())
            .unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_unmatched_rows_removed() {
        let t = report(vec![vec!["111", "222", "Fiserv", "Store", ""]]);
        let out = process_iso(&t, &no_wireless(), &ids(&["999"]), &ids(&[]), &narrow_rules())
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_wireless_enrichment_and_blank_trailing_column() {
        let mut wireless_src = Table::new(
            "Wireless report",
            vec!["Mer + wir", "Account Name", "c", "d", "e", "Merchant Number"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        wireless_src.push_row(
            vec!["4242 Store (2 devices)", "Store", "", "", "", "4242"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        let wireless = extract_wireless(&wireless_src, &WirelessRules::default()).unwrap();

        let t = report(vec![vec!["100", "", "Fiserv", "Store", "unit 4242"]]);
        let out = process_iso(&t, &wireless, &ids(&[]), &ids(&["100"]), &narrow_rules()).unwrap();

        // wireless count column inserted (clamped to end), then the blank
        // spreadsheet-compatibility column
        let headers = out.headers();
        assert_eq!(headers[headers.len() - 2], "Wireless count");
        assert_eq!(headers[headers.len() - 1], "");
        assert_eq!(out.cell(0, headers.len() - 2), "2 devices");
        assert_eq!(out.cell(0, headers.len() - 1), "");
    }
}
