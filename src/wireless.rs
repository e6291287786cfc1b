// 📶 Wireless-Usage Extractor
// The wireless report embeds the merchant key and device count inside a
// composite text column ("556677 Store (3 devices)"). This stage pulls both
// out and builds the merchant -> count lookup used by the ISO enricher.

use crate::clean::digit_run;
use crate::config::WirelessRules;
use crate::error::PipelineResult;
use crate::table::Table;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static PAREN_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s*([^)]*[^)\s])\s*\)").unwrap());

const ACCOUNT_NAME: &str = "Account Name";

/// The three-column wireless output plus the count lookup keyed by
/// merchant number.
#[derive(Debug, Clone)]
pub struct WirelessUsage {
    pub table: Table,
    pub counts: HashMap<String, String>,
}

/// Token inside the first parenthesized group, trimmed.
fn count_token(text: &str) -> Option<String> {
    PAREN_TOKEN
        .captures(text)
        .map(|c| c[1].trim().to_string())
}

/// Build the wireless usage table. Column access is positional: the source
/// is a spreadsheet export whose headers drift month to month, so only the
/// column positions in `rules` are trusted.
pub fn extract_wireless(raw: &Table, rules: &WirelessRules) -> PipelineResult<WirelessUsage> {
    let c_composite = raw.position(rules.composite_column)?;
    let c_merchant = raw.position(rules.merchant_column)?;

    // Display name comes from the named column when present, else the
    // column next to the composite one.
    let c_name = raw
        .column(ACCOUNT_NAME)
        .or_else(|_| raw.position(rules.composite_column + 1))?;

    // Merchant-key -> count lookup from the composite column, first
    // occurrence wins.
    let mut lookup: HashMap<String, String> = HashMap::new();
    for row in raw.rows() {
        let composite = &row[c_composite];
        if let (Some(key), Some(count)) = (digit_run(composite), count_token(composite)) {
            lookup.entry(key).or_insert(count);
        }
    }

    let mut table = Table::new(
        "Wireless usage",
        vec![
            "Merchant Number".to_string(),
            ACCOUNT_NAME.to_string(),
            "Wireless Count".to_string(),
        ],
    );
    let mut counts: HashMap<String, String> = HashMap::new();

    for row in raw.rows() {
        // Rows without a merchant-number digit run are dropped.
        let Some(merchant) = digit_run(&row[c_merchant]) else {
            continue;
        };
        if counts.contains_key(&merchant) {
            continue; // first occurrence wins
        }

        let count = lookup.get(&merchant).cloned().unwrap_or_default();
        counts.insert(merchant.clone(), count.clone());
        table.push_row(vec![merchant, row[c_name].clone(), count]);
    }

    debug!(
        "Wireless usage: {} merchants ({} with counts)",
        table.len(),
        counts.values().filter(|c| !c.is_empty()).count()
    );

    Ok(WirelessUsage { table, counts })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(rows: Vec<Vec<&str>>) -> Table {
        let headers = vec!["Mer + wir", "Account Name", "c", "d", "e", "Merchant Number"];
        let mut t = Table::new(
            "Wireless report",
            headers.into_iter().map(String::from).collect(),
        );
        for row in rows {
            t.push_row(row.into_iter().map(String::from).collect());
        }
        t
    }

    #[test]
    fn test_composite_extraction() {
        assert_eq!(
            count_token("556677 Store (3 devices)"),
            Some("3 devices".to_string())
        );
        assert_eq!(digit_run("556677 Store (3 devices)"), Some("556677".to_string()));
        assert_eq!(count_token("no parens"), None);
    }

    #[test]
    fn test_lookup_maps_counts_onto_merchant_numbers() {
        let t = report(vec![
            vec!["556677 Store (3 devices)", "Store", "", "", "", "MN 556677"],
            vec!["889900 Shop (1)", "Shop", "", "", "", "889900"],
        ]);
        let out = extract_wireless(&t, &WirelessRules::default()).unwrap();
        assert_eq!(out.table.len(), 2);
        assert_eq!(out.counts.get("556677"), Some(&"3 devices".to_string()));
        assert_eq!(out.counts.get("889900"), Some(&"1".to_string()));
    }

    #[test]
    fn test_rows_without_merchant_number_dropped() {
        let t = report(vec![
            vec!["111 A (2)", "A", "", "", "", ""],
            vec!["222 B (4)", "B", "", "", "", "222"],
        ]);
        let out = extract_wireless(&t, &WirelessRules::default()).unwrap();
        assert_eq!(out.table.len(), 1);
        assert_eq!(out.table.cell(0, 0), "222");
    }

    #[test]
    fn test_duplicate_merchant_number_first_occurrence_wins() {
        let t = report(vec![
            vec!["333 C (5)", "C first", "", "", "", "333"],
            vec!["333 C (9)", "C second", "", "", "", "333"],
        ]);
        let out = extract_wireless(&t, &WirelessRules::default()).unwrap();
        assert_eq!(out.table.len(), 1);
        assert_eq!(out.table.cell(0, 1), "C first");
        assert_eq!(out.counts.get("333"), Some(&"5".to_string()));
    }

    #[test]
    fn test_merchant_without_composite_entry_gets_empty_count() {
        let t = report(vec![vec!["no digits here", "D", "", "", "", "444"]]);
        let out = extract_wireless(&t, &WirelessRules::default()).unwrap();
        assert_eq!(out.table.len(), 1);
        assert_eq!(out.table.cell(0, 2), "");
    }

    #[test]
    fn test_too_narrow_source_is_fatal() {
        let t = Table::new("Wireless report", vec!["only".to_string()]);
        let err = extract_wireless(&t, &WirelessRules::default()).unwrap_err();
        assert!(err.to_string().contains("position 5"));
    }
}
