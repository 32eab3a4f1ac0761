//! Row normalizer
//!
//! Makes sheet rows JSON-stable: floats become their canonical text, null-like
//! values become an explicit empty marker, and rows with no content at all
//! are dropped. Row order is preserved.

use crate::workbook::{CellValue, Row};

/// Text values read as missing data.
pub const NULL_LIKE: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Normalize a single cell.
pub fn normalize_value(value: CellValue) -> CellValue {
    match value {
        CellValue::Float(f) if f.is_nan() => CellValue::Empty,
        CellValue::Float(f) => CellValue::Text(canonical_float(f)),
        CellValue::Text(s) if NULL_LIKE.contains(&s.as_str()) => CellValue::Empty,
        other => other,
    }
}

/// Normalize every cell of a row; `None` when nothing is left in it.
pub fn normalize_row(row: Row) -> Option<Row> {
    let row = row.map_values(normalize_value);
    if row.is_blank() {
        None
    } else {
        Some(row)
    }
}

/// Normalize rows in order, dropping the blank ones.
pub fn normalize_rows(rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter().filter_map(normalize_row).collect()
}

/// Shortest round-trip text of a float, always with a fractional part for
/// whole numbers (`3.0`) and a signed two-digit exponent outside
/// `[1e-4, 1e16)` (`1e+16`, `2.5e-05`).
pub fn canonical_float(f: f64) -> String {
    if f.is_infinite() {
        return if f > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }

    let repr = format!("{:?}", f);
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}
