// ⚙️ Rule Set - Rules as Data
// Every blacklist, allow-list, and magic constant of the cleaning rules lives
// here, with the canonical values as defaults and JSON override support.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

fn lower_set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

fn string_set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// PER-SOURCE RULES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TsysRules {
    /// Lifecycle statuses that remove a merchant outright (lowercase).
    pub statuses_to_remove: HashSet<String>,

    /// Operationally blacklisted reps (lowercase).
    pub rep_hard_remove: HashSet<String>,
}

impl Default for TsysRules {
    fn default() -> Self {
        TsysRules {
            statuses_to_remove: lower_set(&["closed", "declined", "cancelled"]),
            rep_hard_remove: lower_set(&[
                "hubwallet",
                "stephany perez",
                "nigel westbury",
                "brandon casillas",
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FiservRules {
    /// Internal numeric agent codes that stay in scope. External agents
    /// (codes containing a letter) are always in scope.
    pub numeric_agents_to_keep: HashSet<String>,

    /// Agent codes removed unconditionally.
    pub agent_hard_remove: HashSet<String>,

    /// Match closed status exactly ("close") instead of by prefix
    /// ("close", "closed", "closed."). Prefix match is the default; the
    /// source extracts are inconsistent about trailing characters.
    pub closed_exact_match: bool,

    /// Also remove closed merchants whose last batch activity is stale,
    /// even when the partner roster still lists them. Off by default.
    pub strict_dormancy: bool,
}

impl Default for FiservRules {
    fn default() -> Self {
        FiservRules {
            numeric_agents_to_keep: string_set(&["2030", "3030", "4030", "5030"]),
            agent_hard_remove: string_set(&["IS02"]),
            closed_exact_match: false,
            strict_dormancy: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeLedgerRules {
    /// Internal numeric sales ids that stay in scope. Canonically empty:
    /// numeric-only sales channels are never retained.
    pub internal_agents: HashSet<String>,

    /// Account statuses that remove a row (lowercase; "" catches blanks).
    pub statuses_to_remove: HashSet<String>,

    /// Sales ids removed unconditionally (lowercase match).
    pub sales_id_hard_remove: HashSet<String>,

    /// Second, larger sales-channel blacklist applied after the roster
    /// reconciliation (exact match).
    pub sales_id_second_pass: HashSet<String>,

    /// Constant recurring-fee code attached to every output row.
    pub recurring_fee_code: i64,
}

impl Default for FeeLedgerRules {
    fn default() -> Self {
        FeeLedgerRules {
            internal_agents: HashSet::new(),
            statuses_to_remove: lower_set(&["closed", "declined", "n/a", ""]),
            sales_id_hard_remove: lower_set(&["is20"]),
            sales_id_second_pass: string_set(&["IS20", "IS21", "IS22", "IS23", "IS24"]),
            recurring_fee_code: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateRules {
    /// Single-letter status marking a closed merchant (lowercase).
    pub closed_code: String,

    /// Sales reps removed from the monthly (Step-1) path.
    pub rep_blacklist: HashSet<String>,

    /// Smaller rep blacklist applied after the reinstatement pass.
    pub reinstated_rep_blacklist: HashSet<String>,

    /// The four rate-discount components summed into the Step-1 value.
    pub discount_columns: Vec<String>,

    /// Revenue/volume metrics consulted by the reinstatement rule.
    pub activity_columns: Vec<String>,
}

impl Default for RateRules {
    fn default() -> Self {
        RateRules {
            closed_code: "c".to_string(),
            rep_blacklist: string_set(&[
                "HUBW-0000000006",
                "HUBW-0000000124",
                "HUBW-0000000024",
            ]),
            reinstated_rep_blacklist: string_set(&["HUBW-0000000006", "HUBW-0000000124"]),
            discount_columns: vec![
                "visa_base_rate_discount_rev".to_string(),
                "mc_base_rate_discount_rev".to_string(),
                "disc_base_rate_discount_rev".to_string(),
                "amex_base_rate_discount_rev".to_string(),
            ],
            activity_columns: vec![
                "total_settle_tickets".to_string(),
                "net_settle_volume".to_string(),
                "merchant_total_revenue".to_string(),
                "STW_total_residual".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WirelessRules {
    /// Position of the composite "<id> ... (<count>)" column.
    pub composite_column: usize,

    /// Position of the merchant-number reference column.
    pub merchant_column: usize,
}

impl Default for WirelessRules {
    fn default() -> Self {
        WirelessRules {
            composite_column: 0,
            merchant_column: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IsoRules {
    /// Processor tag (lowercase prefix match) that triggers the ID prefix.
    pub processor_tag: String,

    /// Two-digit code prefixed onto MID1/MID2 for the tagged processor.
    pub id_prefix: String,

    /// Display-name prefixes that exclude a row (lowercase).
    pub name_prefix_exclusions: Vec<String>,

    /// Full display names that exclude a row (lowercase).
    pub name_exact_exclusions: Vec<String>,

    /// Position of the column whose digit run keys the wireless lookup.
    /// This source's column naming is unstable, so access is positional.
    pub lookup_column: usize,

    /// Target position of the inserted "Wireless count" column.
    pub insert_position: usize,
}

impl Default for IsoRules {
    fn default() -> Self {
        IsoRules {
            processor_tag: "tsys".to_string(),
            id_prefix: "39".to_string(),
            name_prefix_exclusions: vec!["webb".to_string()],
            name_exact_exclusions: vec!["mailbox plus".to_string()],
            lookup_column: 11,
            insert_position: 35,
        }
    }
}

// ============================================================================
// RULE SET
// ============================================================================

/// The full rule configuration for one pipeline run.
///
/// Defaults encode the canonical monthly behavior; a JSON file can override
/// any subset of fields for the rule-tweak variants that show up month to
/// month.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub tsys: TsysRules,
    pub fiserv: FiservRules,
    pub fee_ledger: FeeLedgerRules,
    pub rate: RateRules,
    pub wireless: WirelessRules,
    pub iso: IsoRules,
}

impl RuleSet {
    /// Load rule overrides from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let rules: RuleSet =
            serde_json::from_str(&content).context("Failed to parse rules JSON")?;

        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_canonical_constants() {
        let rules = RuleSet::default();
        assert!(rules.tsys.rep_hard_remove.contains("hubwallet"));
        assert!(rules.fiserv.numeric_agents_to_keep.contains("2030"));
        assert!(rules.fee_ledger.internal_agents.is_empty());
        assert_eq!(rules.fee_ledger.recurring_fee_code, 2);
        assert_eq!(rules.rate.discount_columns.len(), 4);
        assert_eq!(rules.iso.id_prefix, "39");
        assert_eq!(rules.iso.insert_position, 35);
        assert!(!rules.fiserv.strict_dormancy);
    }

    #[test]
    fn test_partial_json_override_keeps_other_defaults() {
        let json = r#"{ "fiserv": { "strict_dormancy": true } }"#;
        let rules: RuleSet = serde_json::from_str(json).unwrap();
        assert!(rules.fiserv.strict_dormancy);
        // untouched sections keep canonical defaults
        assert!(rules.fiserv.numeric_agents_to_keep.contains("4030"));
        assert_eq!(rules.iso.lookup_column, 11);
    }
}
