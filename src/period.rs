// 📅 Reporting Period - cutoff and dormancy window
// One month-end timestamp drives every date-relative rule in the pipeline.

use chrono::{Datelike, Months, NaiveDate};

/// The reporting cutoff plus its derived dormancy floor.
///
/// `cutoff` is the month-end date of the reporting period. `dormancy_floor`
/// is cutoff minus six months, re-aligned to month end; a closed merchant
/// whose last activity is on or before this floor counts as fully dormant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingPeriod {
    pub cutoff: NaiveDate,
    pub dormancy_floor: NaiveDate,
}

impl ReportingPeriod {
    /// Build the period for a given month. The cutoff is always the last
    /// day of that month regardless of the day the caller had in mind.
    pub fn for_month(year: i32, month: u32) -> Option<Self> {
        let cutoff = month_end(year, month)?;
        let back = cutoff.checked_sub_months(Months::new(6))?;
        let dormancy_floor = month_end(back.year(), back.month())?;
        Some(ReportingPeriod {
            cutoff,
            dormancy_floor,
        })
    }

    /// Month number of the cutoff (1-12); the recurring-fee-month rules
    /// compare against this.
    pub fn month_number(&self) -> u32 {
        self.cutoff.month()
    }
}

/// Last day of the given month.
pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    next.pred_opt()
}

/// Date formats seen across the extracts, in the order they are tried.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%m/%d/%y",
    "%Y-%m-%d",
    "%m-%d-%Y",
    "%d-%b-%Y",
];

/// Lenient date parsing: any malformed value is `None`, never an error.
/// Datetime cells ("2024-09-01 00:00:00") parse through their date prefix.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Drop a trailing time component if present
    let date_part = trimmed.split_whitespace().next().unwrap_or(trimmed);

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            // chrono's %Y happily accepts a two-digit year, which would
            // shadow the %y formats below ("9/1/24" is 2024, not year 24).
            if date.year() < 1000 {
                continue;
            }
            return Some(date);
        }
    }
    None
}

/// Render a date as MM/DD/YYYY text; unparsed dates render empty, matching
/// the coercion policy (a failed parse is a blank cell, not an abort).
pub fn format_mdy(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%m/%d/%Y").to_string(),
        None => String::new(),
    }
}
