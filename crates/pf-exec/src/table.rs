//! Whitespace-delimited float tables, the common output format of every
//! external program in an experiment.

use pf_types::{ExecError, PfResult, Table};

/// Parse a raw output stream into rows of floats.
///
/// Non-blank lines split on whitespace and every field must parse as a
/// float. `source` names the producing executable in parse errors.
pub fn parse_table(text: &str, source: &str) -> PfResult<Table> {
    let mut rows = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut row = Vec::new();
        for field in line.split_whitespace() {
            let value: f64 = field.parse().map_err(|_| ExecError::Parse {
                executable: source.to_string(),
                line: line.to_string(),
            })?;
            row.push(value);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Extract one column, rows too short to reach it contributing nothing.
pub fn column(table: &Table, index: usize) -> Vec<f64> {
    table
        .iter()
        .filter_map(|row| row.get(index).copied())
        .collect()
}
