//! Flat export of job results
//!
//! Nested results are flattened into one row per keyword: each primary
//! keyword followed by its related terms, tagged with the primary keyword
//! they came from.

use serde::Serialize;
use std::fmt;

use crate::models::KeywordVolume;

/// CSV header, in column order
pub const CSV_HEADER: &str = "kind,parent,keyword,pc,mobile,total";

/// Whether a row is a submitted keyword or one of its related terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Primary,
    Related,
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Related => write!(f, "related"),
        }
    }
}

/// One exported line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub kind: RowKind,
    /// Primary keyword a related row belongs to; empty for primary rows
    pub parent: String,
    pub keyword: String,
    pub pc: u64,
    pub mobile: u64,
    pub total: u64,
}

impl ExportRow {
    fn new(kind: RowKind, parent: &str, volume: &KeywordVolume) -> Self {
        Self {
            kind,
            parent: parent.to_string(),
            keyword: volume.keyword().to_string(),
            pc: volume.pc(),
            mobile: volume.mobile(),
            total: volume.total(),
        }
    }
}

/// Flatten results, keeping submission order
pub fn flatten(results: &[KeywordVolume]) -> Vec<ExportRow> {
    let mut rows = Vec::with_capacity(results.len());
    for primary in results {
        rows.push(ExportRow::new(RowKind::Primary, "", primary));
        rows.extend(
            primary
                .related()
                .iter()
                .map(|related| ExportRow::new(RowKind::Related, primary.keyword(), related)),
        );
    }
    rows
}

/// Render rows as CSV with a header line
pub fn to_csv(rows: &[ExportRow]) -> Vec<u8> {
    let mut out = String::with_capacity(CSV_HEADER.len() + rows.len() * 32);
    out.push_str(CSV_HEADER);
    out.push_str("\r\n");

    for row in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{}\r\n",
            row.kind,
            csv_field(&row.parent),
            csv_field(&row.keyword),
            row.pc,
            row.mobile,
            row.total
        ));
    }

    out.into_bytes()
}

/// Render rows as a pretty-printed JSON array
pub fn to_json(rows: &[ExportRow]) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec_pretty(rows)
}

/// Quote a field when it contains a delimiter, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
