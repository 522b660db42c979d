//! The eleven lookup tables.
//!
//! Each module follows the same pattern: an immutable table type (one
//! published version) plus a builder that assembles a draft from rows or
//! CSV, finalizes it, and commits it to a registry slot. US/CA LRN share
//! [`lrn::LrnTable`], DNC/Toll-free share [`membership::MembershipTable`],
//! and the two call-failure feeds share [`failure::FailureTable`]; the
//! registry keeps one slot per logical table.

pub mod dno;
pub mod failure;
pub mod ftc;
pub mod geo;
pub mod lerg;
pub mod lrn;
pub mod membership;
pub mod youmail;

use std::io::BufRead;

use crate::error::BuildError;

/// Parse a numeric CSV field, reporting the line on failure.
pub(crate) fn parse_u64(field: &str, line: u64) -> Result<u64, BuildError> {
    let trimmed = field.trim();
    trimmed.parse().map_err(|_| BuildError::BadField {
        line,
        value: trimmed.to_string(),
    })
}

pub(crate) fn strip_hyphens(s: &str) -> String {
    s.chars().filter(|&c| c != '-').collect()
}

/// Drive one chunk of a CSV ingest loop.
///
/// Reads up to `limit` lines from `input`, advancing `line` by the number
/// consumed, and hands each line (trailing newline removed) to `row_fn`.
/// Leading-character skip rules are the row function's business; they vary
/// per feed.
pub(crate) fn for_each_line<R, F>(
    input: &mut R,
    line: &mut u64,
    limit: u64,
    mut row_fn: F,
) -> Result<(), BuildError>
where
    R: BufRead,
    F: FnMut(u64, &str) -> Result<(), BuildError>,
{
    let mut buf = String::new();
    let mut remaining = limit;
    while remaining > 0 {
        buf.clear();
        if input.read_line(&mut buf)? == 0 {
            break;
        }
        *line += 1;
        remaining -= 1;
        row_fn(*line, buf.trim_end_matches(['\r', '\n']))?;
    }
    Ok(())
}

pub(crate) fn starts_with_digit(row: &str) -> bool {
    row.as_bytes().first().is_some_and(|b| b.is_ascii_digit())
}
