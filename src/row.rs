//! Row Codec
//!
//! The single serialization boundary for the on-disk record format.
//! Nothing outside this module touches the byte layout.
//!
//! ## Record Format
//! ```text
//! ┌────────┬───────────┬───┬───────────┬───┬─────┬───────────┬────┐
//! │ Marker │  value 1  │ | │  value 2  │ | │ ... │  value n  │ \n │
//! └────────┴───────────┴───┴───────────┴───┴─────┴───────────┴────┘
//! ```
//! - Marker is one byte: `' '` for a live row, `'#'` for a soft-deleted row.
//! - Values are separated by `'|'` and the record ends with `'\n'`.
//! - Any `'|'`, `'\n'`, or `'#'` inside a value is replaced with `'_'` at
//!   encode time. The replacement is lossy and stable under repetition; it
//!   is kept for compatibility with the existing file format.

use std::borrow::Cow;

use crate::error::{Result, TabulaError};

/// Marker byte for a live record
pub const LIVE_MARKER: u8 = b' ';

/// Marker byte for a soft-deleted record
pub const DELETED_MARKER: u8 = b'#';

/// Separator byte between values
pub const FIELD_SEPARATOR: u8 = b'|';

/// A record decoded from one line of a table file
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedRow {
    /// A live row with one value per column
    Live(Vec<String>),

    /// A soft-deleted row (contents are dead space until compaction)
    Deleted,
}

/// Replace every `'|'`, `'\n'`, and `'#'` in a value with `'_'`.
///
/// Borrows when the value is already clean, which is the common case.
pub fn sanitize(value: &str) -> Cow<'_, str> {
    if value
        .bytes()
        .any(|b| b == FIELD_SEPARATOR || b == b'\n' || b == DELETED_MARKER)
    {
        Cow::Owned(
            value
                .chars()
                .map(|c| match c {
                    '|' | '\n' | '#' => '_',
                    other => other,
                })
                .collect(),
        )
    } else {
        Cow::Borrowed(value)
    }
}

/// Encode one live record: marker, sanitized values, separators, newline.
pub fn encode<S: AsRef<str>>(values: &[S]) -> Vec<u8> {
    let mut record = Vec::with_capacity(
        2 + values.len() + values.iter().map(|v| v.as_ref().len()).sum::<usize>(),
    );
    record.push(LIVE_MARKER);
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            record.push(FIELD_SEPARATOR);
        }
        record.extend_from_slice(sanitize(value.as_ref()).as_bytes());
    }
    record.push(b'\n');
    record
}

/// Decode one line read back from a table file.
///
/// A `'#'` marker decodes to [`DecodedRow::Deleted`] without looking at the
/// payload. Any other unexpected marker, a field count different from
/// `expected_columns`, or non-UTF-8 content is corruption, never partial data.
pub fn decode(line: &[u8], expected_columns: usize) -> Result<DecodedRow> {
    let (&marker, body) = line
        .split_first()
        .ok_or_else(|| TabulaError::Corruption("empty record".to_string()))?;

    match marker {
        DELETED_MARKER => return Ok(DecodedRow::Deleted),
        LIVE_MARKER => {}
        other => {
            return Err(TabulaError::Corruption(format!(
                "unexpected marker byte 0x{:02x}",
                other
            )));
        }
    }

    let body = body.strip_suffix(b"\n").unwrap_or(body);

    let mut values = Vec::with_capacity(expected_columns);
    for field in body.split(|&b| b == FIELD_SEPARATOR) {
        let value = std::str::from_utf8(field)
            .map_err(|e| TabulaError::Corruption(format!("non-UTF-8 value: {}", e)))?;
        values.push(value.to_string());
    }

    if values.len() != expected_columns {
        return Err(TabulaError::Corruption(format!(
            "expected {} columns, found {}",
            expected_columns,
            values.len()
        )));
    }

    Ok(DecodedRow::Live(values))
}

/// Parse the primary key from a live record's first field.
///
/// Used when rebuilding an index from an existing file (compaction, reopen).
/// Returns `None` when the first field is not a well-formed integer.
pub fn primary_key(line: &[u8]) -> Option<i64> {
    let body = line.get(1..)?;
    let end = body
        .iter()
        .position(|&b| b == FIELD_SEPARATOR || b == b'\n')
        .unwrap_or(body.len());
    std::str::from_utf8(&body[..end]).ok()?.trim().parse().ok()
}
