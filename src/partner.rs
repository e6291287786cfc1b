// 🤝 Partner Roster Merger
// The two partner extracts merge into one membership list. The merge feeds
// the Fiserv filter's closed-merchant exception, and the merged table
// (restricted to Fiserv-retained merchants) is itself an output.

use crate::clean::{normalize_id, sanitize_table};
use crate::error::PipelineResult;
use crate::table::Table;
use log::debug;
use std::collections::HashSet;

const MERCHANT_NUMBER: &str = "MerchantNumber";

/// The merged partner extracts plus their normalized identifier set.
/// No deduplication is applied to the rows; all of them participate in the
/// membership check and in the filtered output.
#[derive(Debug, Clone)]
pub struct PartnerRoster {
    pub merged: Table,
    pub merchant_ids: HashSet<String>,
}

/// Concatenate the two partner extracts and sanitize/normalize the merchant
/// identifier column. Extract order only decides row order, never content.
pub fn merge_partner(s1: &Table, s2: &Table) -> PipelineResult<PartnerRoster> {
    // Both extracts must carry the identifier column.
    s1.column(MERCHANT_NUMBER)?;
    s2.column(MERCHANT_NUMBER)?;

    let mut merged = s1.concat(s2);
    sanitize_table(&mut merged);

    let c_id = merged.column(MERCHANT_NUMBER)?;
    let merchant_ids: HashSet<String> = merged
        .rows()
        .iter()
        .filter_map(|row| normalize_id(&row[c_id]))
        .collect();

    debug!(
        "Partner roster: merged {} rows, {} unique merchants",
        merged.len(),
        merchant_ids.len()
    );

    Ok(PartnerRoster {
        merged,
        merchant_ids,
    })
}

impl PartnerRoster {
    /// Restrict the merged roster to merchants the Fiserv filter retained.
    /// This is the standalone partner output table.
    pub fn filtered_by(&self, fiserv_ids: &HashSet<String>) -> PipelineResult<Table> {
        let mut out = self.merged.clone();
        let c_id = out.column(MERCHANT_NUMBER)?;

        out.retain(|row| match normalize_id(&row[c_id]) {
            Some(id) => fiserv_ids.contains(&id),
            None => false,
        });

        debug!(
            "Partner output: {} of {} rows match the Fiserv roster",
            out.len(),
            self.merged.len()
        );

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(name: &str, ids: Vec<&str>) -> Table {
        let mut t = Table::new(
            name,
            vec!["MerchantNumber".to_string(), "Partner".to_string()],
        );
        for id in ids {
            t.push_row(vec![id.to_string(), name.to_string()]);
        }
        t
    }

    #[test]
    fn test_merge_concatenates_without_dedup() {
        let s1 = extract("Partner S1", vec!["100", "200"]);
        let s2 = extract("Partner S2", vec!["200", "300"]);
        let merged = merge_partner(&s1, &s2).unwrap();

        assert_eq!(merged.merged.len(), 4);
        assert_eq!(merged.merchant_ids.len(), 3);
    }

    #[test]
    fn test_identifiers_are_normalized_for_membership() {
        let s1 = extract("Partner S1", vec!["100.0", "\u{a0}2-0-0\u{a0}"]);
        let s2 = extract("Partner S2", vec![]);
        let merged = merge_partner(&s1, &s2).unwrap();

        assert!(merged.merchant_ids.contains("100"));
        assert!(merged.merchant_ids.contains("200"));
    }

    #[test]
    fn test_filtered_by_fiserv_roster() {
        let s1 = extract("Partner S1", vec!["100", "200"]);
        let s2 = extract("Partner S2", vec!["300"]);
        let merged = merge_partner(&s1, &s2).unwrap();

        let fiserv: HashSet<String> = ["100", "300"].iter().map(|s| s.to_string()).collect();
        let out = merged.filtered_by(&fiserv).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out.cell(0, 0), "100");
        assert_eq!(out.cell(1, 0), "300");
    }

    #[test]
    fn test_missing_identifier_column_is_fatal() {
        let s1 = extract("Partner S1", vec!["100"]);
        let broken = Table::new("Partner S2", vec!["Other".to_string()]);
        let err = merge_partner(&s1, &broken).unwrap_err();
        assert!(err.to_string().contains("MerchantNumber"));
        assert!(err.to_string().contains("Partner S2"));
    }
}
