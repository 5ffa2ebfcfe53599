// src/sheets.rs
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::Timelike;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Read one worksheet into a plain string matrix (header row included).
///
/// `sheet` selects a worksheet by name; `None` takes the first one.
pub fn read_sheet_values(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))?;

    let names = workbook.sheet_names();
    let index = match sheet {
        Some(name) => names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| anyhow!("worksheet '{name}' not found in {}", path.display()))?,
        None => 0,
    };

    let range = workbook
        .worksheet_range_at(index)
        .ok_or_else(|| anyhow!("no worksheet found in {}", path.display()))?
        .with_context(|| format!("failed to read worksheet of {}", path.display()))?;

    let values: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(clean_cell).collect())
        .collect();

    info!(
        file = %path.display(),
        sheet = names.get(index).map(String::as_str).unwrap_or("?"),
        rows = values.len(),
        "loaded worksheet"
    );
    Ok(values)
}

/// Render a cell the way the sheet author sees it.
pub fn clean_cell(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => clean_value(s),
        Data::Int(i) => i.to_string(),
        // f64's Display already drops a trailing ".0"
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => (if *b { "True" } else { "False" }).to_string(),
        other => match other.as_datetime() {
            Some(dt) if dt.time().num_seconds_from_midnight() == 0 => {
                dt.format("%Y-%m-%d").to_string()
            }
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => other.to_string().trim().to_string(),
        },
    }
}

/// Trim and turn `123.0` style text into `123`.
pub fn clean_value(raw: &str) -> String {
    let v = raw.trim();
    if let Some(int_part) = v.strip_suffix(".0") {
        let digits = int_part.strip_prefix('-').unwrap_or(int_part);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return int_part.to_string();
        }
    }
    v.to_string()
}

/// Make repeated header titles unique: `等待`, `等待.1`, `等待.2`.
pub fn dedupe_headers(headers: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(headers.len());

    for h in headers {
        let title = h.trim().to_string();
        let count = seen.entry(title.clone()).or_insert(0);
        if *count == 0 {
            out.push(title);
        } else {
            let renamed = format!("{title}.{count}");
            debug!(original = %title, renamed = %renamed, "duplicate header renamed");
            out.push(renamed);
        }
        *count += 1;
    }
    out
}

/// 1-based column index to spreadsheet letters (1 -> A, 27 -> AA).
pub fn column_index_to_letter(mut col: usize) -> String {
    let mut result = String::new();
    while col > 0 {
        col -= 1;
        result.insert(0, ((col % 26) as u8 + b'A') as char);
        col /= 26;
    }
    result
}

/// `D7`-style reference for a 0-based column and a 1-based sheet row, used in logs.
pub fn cell_ref(col: usize, sheet_row: usize) -> String {
    format!("{}{}", column_index_to_letter(col + 1), sheet_row)
}
