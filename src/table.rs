// 📊 Table - In-memory tabular carrier
// Every source extract and every output is one of these. All cells are text;
// numeric and date interpretation happens at the stage that needs it.

use crate::error::{PipelineError, PipelineResult};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// A column-addressed table of string cells.
///
/// `input` carries the human-readable name of the source extract ("TSYS
/// roster", "Fee ledger", ...) so that schema errors can say exactly which
/// file is missing which column.
#[derive(Debug, Clone)]
pub struct Table {
    input: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(input: impl Into<String>, headers: Vec<String>) -> Self {
        Table {
            input: input.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Read a CSV stream. Headers are taken from the first record and
    /// trimmed; short rows are padded so every row matches the header width.
    pub fn from_csv_reader<R: Read>(input: &str, reader: R) -> PipelineResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut headers: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<String>> = Vec::new();

        for (i, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| PipelineError::Csv {
                input: input.to_string(),
                message: e.to_string(),
            })?;

            if i == 0 {
                headers = record.iter().map(|h| h.trim().to_string()).collect();
                continue;
            }

            let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Table {
            input: input.to_string(),
            headers,
            rows,
        })
    }

    pub fn from_csv_path(input: &str, path: &Path) -> PipelineResult<Self> {
        let file = File::open(path)?;
        Table::from_csv_reader(input, file)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> PipelineResult<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers).map_err(|e| PipelineError::Csv {
            input: self.input.clone(),
            message: e.to_string(),
        })?;
        for row in &self.rows {
            wtr.write_record(row).map_err(|e| PipelineError::Csv {
                input: self.input.clone(),
                message: e.to_string(),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: &Path) -> PipelineResult<()> {
        let file = File::create(path)?;
        self.write_csv(file)
    }

    // ========================================================================
    // SCHEMA ACCESS
    // ========================================================================

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Resolve a column by exact (trimmed) name. Missing column = fatal.
    pub fn column(&self, name: &str) -> PipelineResult<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| PipelineError::missing_column(name, &self.input))
    }

    /// Resolve a column under any of several historical names.
    /// The error names the first (canonical) candidate.
    pub fn column_any(&self, names: &[&str]) -> PipelineResult<usize> {
        for name in names {
            if let Some(idx) = self.headers.iter().position(|h| h == name) {
                return Ok(idx);
            }
        }
        Err(PipelineError::missing_column(names[0], &self.input))
    }

    /// Positional column access, for spreadsheet-origin sources whose column
    /// naming is unstable. The one place index-based access is validated.
    pub fn position(&self, index: usize) -> PipelineResult<usize> {
        if index < self.headers.len() {
            Ok(index)
        } else {
            Err(PipelineError::ColumnOutOfRange {
                index,
                input: self.input.clone(),
            })
        }
    }

    // ========================================================================
    // ROW ACCESS
    // ========================================================================

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Vec<String>> {
        &mut self.rows
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows[row].get(col).map(|s| s.as_str()).unwrap_or("")
    }

    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Keep only rows matching the predicate.
    pub fn retain<F: FnMut(&[String]) -> bool>(&mut self, mut keep: F) {
        self.rows.retain(|row| keep(row));
    }

    /// Drop rows whose key repeats, keeping the first occurrence.
    /// Rows with no key (`None`) are always kept.
    pub fn dedup_by_key<F: FnMut(&[String]) -> Option<String>>(&mut self, mut key: F) {
        let mut seen = std::collections::HashSet::new();
        self.rows.retain(|row| match key(row) {
            Some(k) => seen.insert(k),
            None => true,
        });
    }

    // ========================================================================
    // COLUMN TRANSFORMS
    // ========================================================================

    /// Rewrite one column in place.
    pub fn map_column<F: FnMut(&str) -> String>(&mut self, col: usize, mut f: F) {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(col) {
                *cell = f(cell);
            }
        }
    }

    /// Insert a new column at `index` (clamped to the current width).
    pub fn insert_column(&mut self, index: usize, header: &str, values: Vec<String>) {
        let at = index.min(self.headers.len());
        self.headers.insert(at, header.to_string());
        for (i, row) in self.rows.iter_mut().enumerate() {
            let value = values.get(i).cloned().unwrap_or_default();
            row.insert(at, value);
        }
    }

    /// Append a column of empty cells (used for the trailing blank-titled
    /// column the ISO output carries for spreadsheet compatibility).
    pub fn push_blank_column(&mut self, header: &str) {
        let n = self.headers.len();
        self.insert_column(n, header, vec![String::new(); self.rows.len()]);
    }

    /// Concatenate another table underneath this one, matching columns by
    /// name. Columns only present in `other` are appended and backfilled
    /// with empty cells; row order is preserved (self first).
    pub fn concat(&self, other: &Table) -> Table {
        let mut merged = self.clone();

        let mapping: Vec<usize> = other
            .headers
            .iter()
            .map(|h| match merged.headers.iter().position(|m| m == h) {
                Some(idx) => idx,
                None => {
                    merged.headers.push(h.clone());
                    for row in &mut merged.rows {
                        row.push(String::new());
                    }
                    merged.headers.len() - 1
                }
            })
            .collect();

        for row in &other.rows {
            let mut new_row = vec![String::new(); merged.headers.len()];
            for (src, &dst) in mapping.iter().enumerate() {
                if let Some(cell) = row.get(src) {
                    new_row[dst] = cell.clone();
                }
            }
            merged.rows.push(new_row);
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new(
            "sample",
            vec!["Merchant ID".to_string(), "Status".to_string()],
        );
        t.push_row(vec!["100".to_string(), "Open".to_string()]);
        t.push_row(vec!["200".to_string(), "Closed".to_string()]);
        t
    }

    #[test]
    fn test_from_csv_reader_pads_short_rows() {
        let data = "a,b,c\n1,2\n4,5,6\n";
        let t = Table::from_csv_reader("test", data.as_bytes()).unwrap();
        assert_eq!(t.headers(), &["a", "b", "c"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.cell(0, 2), "");
        assert_eq!(t.cell(1, 2), "6");
    }

    #[test]
    fn test_column_lookup_missing_is_fatal() {
        let t = sample();
        assert_eq!(t.column("Status").unwrap(), 1);
        let err = t.column("Rep Name").unwrap_err();
        assert!(err.to_string().contains("Rep Name"));
        assert!(err.to_string().contains("sample"));
    }

    #[test]
    fn test_column_any_falls_back_to_alternate_name() {
        let t = sample();
        assert_eq!(t.column_any(&["Merchant #", "Merchant ID"]).unwrap(), 0);
        assert!(t.column_any(&["Merchant #", "MID"]).is_err());
    }

    #[test]
    fn test_position_out_of_range() {
        let t = sample();
        assert!(t.position(1).is_ok());
        assert!(t.position(5).is_err());
    }

    #[test]
    fn test_dedup_by_key_keeps_first_occurrence() {
        let mut t = sample();
        t.push_row(vec!["100".to_string(), "Declined".to_string()]);
        t.dedup_by_key(|row| Some(row[0].clone()));
        assert_eq!(t.len(), 2);
        assert_eq!(t.cell(0, 1), "Open");
    }

    #[test]
    fn test_dedup_keeps_rows_without_key() {
        let mut t = sample();
        t.push_row(vec!["".to_string(), "x".to_string()]);
        t.push_row(vec!["".to_string(), "y".to_string()]);
        t.dedup_by_key(|row| {
            if row[0].is_empty() {
                None
            } else {
                Some(row[0].clone())
            }
        });
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn test_insert_column_clamps_position() {
        let mut t = sample();
        t.insert_column(99, "Wireless count", vec!["1".to_string(), "2".to_string()]);
        assert_eq!(t.headers().last().unwrap(), "Wireless count");
        assert_eq!(t.cell(1, 2), "2");
    }

    #[test]
    fn test_concat_unions_columns_by_name() {
        let a = sample();
        let mut b = Table::new(
            "other",
            vec!["Status".to_string(), "Extra".to_string()],
        );
        b.push_row(vec!["Open".to_string(), "z".to_string()]);

        let merged = a.concat(&b);
        assert_eq!(merged.headers(), &["Merchant ID", "Status", "Extra"]);
        assert_eq!(merged.len(), 3);
        // b's row: no Merchant ID, Status mapped, Extra appended
        assert_eq!(merged.cell(2, 0), "");
        assert_eq!(merged.cell(2, 1), "Open");
        assert_eq!(merged.cell(2, 2), "z");
        // a's rows backfilled with empty Extra
        assert_eq!(merged.cell(0, 2), "");
    }

    #[test]
    fn test_csv_round_trip() {
        let t = sample();
        let mut buf = Vec::new();
        t.write_csv(&mut buf).unwrap();
        let back = Table::from_csv_reader("sample", buf.as_slice()).unwrap();
        assert_eq!(back.headers(), t.headers());
        assert_eq!(back.rows(), t.rows());
    }
}
