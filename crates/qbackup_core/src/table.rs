//! Aligned tab-separated table output for record listings.
//!
//! Columns are padded to their widest cell and separated by a tab, which
//! keeps the output friendly to `cut` and `awk`.

use crate::model::record::{FieldValue, Record, RecordError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};

pub type TableResult<T> = Result<T, TableError>;

#[derive(Debug)]
pub enum TableError {
    /// A row has a different number of cells than the header.
    RowLength { expected: usize, found: usize },
    Record(RecordError),
    Io(io::Error),
}

impl Display for TableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RowLength { expected, found } => write!(
                f,
                "row length {found} does not match header length {expected}"
            ),
            Self::Record(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TableError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::RowLength { .. } => None,
            Self::Record(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for TableError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<RecordError> for TableError {
    fn from(value: RecordError) -> Self {
        Self::Record(value)
    }
}

/// Writes `rows` under `headers`, one newline-terminated line per row.
///
/// Column widths come from the cells only; a longer header overflows its
/// column instead of widening it.
pub fn dump_as_table<W: Write>(
    out: &mut W,
    headers: &[&str],
    rows: &[Vec<String>],
    with_headers: bool,
) -> TableResult<()> {
    let mut widths = vec![0usize; headers.len()];
    for row in rows {
        if row.len() != headers.len() {
            return Err(TableError::RowLength {
                expected: headers.len(),
                found: row.len(),
            });
        }
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    if with_headers {
        write_line(out, &widths, headers.iter().copied())?;
    }
    for row in rows {
        write_line(out, &widths, row.iter().map(String::as_str))?;
    }
    Ok(())
}

/// Writes `records` as a table whose headers are `R::FIELDS`.
pub fn dump_records<W: Write, R: Record>(out: &mut W, records: &[R]) -> TableResult<()> {
    let rows = records
        .iter()
        .map(|record| {
            Ok(record
                .to_fields()?
                .values()
                .map(cell_text)
                .collect::<Vec<_>>())
        })
        .collect::<TableResult<Vec<_>>>()?;
    dump_as_table(out, R::FIELDS, &rows, true)
}

fn write_line<'a, W: Write>(
    out: &mut W,
    widths: &[usize],
    cells: impl Iterator<Item = &'a str>,
) -> io::Result<()> {
    let line = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("\t");
    writeln!(out, "{line}")
}

fn cell_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => String::new(),
        FieldValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}
