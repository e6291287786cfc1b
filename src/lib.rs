// Residuals Reconciliation Pipeline - Core Library
// Monthly cleaning of the eight residuals extracts into the four
// reconciliation outputs. Pure transform: tables in, tables out.

pub mod clean;
pub mod config;
pub mod error;
pub mod fee_ledger;
pub mod fiserv;
pub mod iso_report;
pub mod partner;
pub mod period;
pub mod pipeline;
pub mod rate_extract;
pub mod table;
pub mod tsys;
pub mod wireless;

// Re-export commonly used types
pub use clean::{normalize_id, sanitize_cell, sanitize_table};
pub use config::RuleSet;
pub use error::{PipelineError, PipelineResult};
pub use fee_ledger::{process_fee_ledger, FeeLedgerSplit, OUTPUT_COLUMNS};
pub use fiserv::{filter_fiserv, FiservRoster};
pub use iso_report::process_iso;
pub use partner::{merge_partner, PartnerRoster};
pub use period::{parse_date, ReportingPeriod};
pub use pipeline::{run, FeeBundle, Outputs, RawInputs};
pub use rate_extract::{process_rate_extract, RateExtract};
pub use table::Table;
pub use tsys::{filter_tsys, TsysRoster};
pub use wireless::{extract_wireless, WirelessUsage};
