//! Call-failure history tables, keyed by phone.
//!
//! Two feeds share this shape: HTTP-404-style lookup failures and
//! 6xx-style signaling failures. Each row records when a number was first
//! and last seen failing. The feeds are identical in format (11-digit
//! `1`-prefixed phone, then two timestamps), so one table type backs both
//! registry slots.

use std::io::BufRead;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::error::{BuildError, Result};
use crate::map::{DEFAULT_PREFETCH_WIDTH, U64Map, probe_batch};
use crate::registry::Slot;
use crate::reverse::MAX_ROWS;

use super::{for_each_line, parse_u64};

/// Failure history for one phone. `pn == 0` marks "no record".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureRecord {
    pub pn: u64,
    pub first_seen: String,
    pub last_seen: String,
}

impl FailureRecord {
    pub fn is_absent(&self) -> bool {
        self.pn == 0
    }
}

/// One immutable published version of a failure table.
#[derive(Debug)]
pub struct FailureTable {
    meta: Value,
    prefetch: usize,
    dict: U64Map<FailureRecord>,
}

impl FailureTable {
    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    pub fn metadata(&self) -> &Value {
        &self.meta
    }

    pub fn get_record(&self, pn: u64) -> FailureRecord {
        let mut out = [FailureRecord::default()];
        self.get_records(&[pn], &mut out);
        out[0].clone()
    }

    pub fn get_records(&self, pns: &[u64], out: &mut [FailureRecord]) {
        debug_assert_eq!(pns.len(), out.len());
        probe_batch(&self.dict, pns, self.prefetch, |pn| pn, |i, hit| {
            out[i] = hit.cloned().unwrap_or_default();
        });
    }
}

/// Assembles a draft failure-table version.
#[derive(Debug)]
pub struct FailureBuilder {
    meta: Value,
    prefetch: usize,
    dict: U64Map<FailureRecord>,
}

impl Default for FailureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureBuilder {
    pub fn new() -> Self {
        Self {
            meta: Value::Null,
            prefetch: DEFAULT_PREFETCH_WIDTH,
            dict: U64Map::default(),
        }
    }

    pub fn size_hint(&mut self, n: usize) {
        self.dict.reserve(n);
    }

    pub fn set_metadata(&mut self, meta: Value) {
        self.meta = meta;
    }

    pub fn prefetch_width(&mut self, width: usize) {
        self.prefetch = width.max(1);
    }

    pub fn add_row(&mut self, mut record: FailureRecord, pn: u64) -> Result<&mut Self> {
        if self.dict.len() >= MAX_ROWS {
            return Err(BuildError::Overflow);
        }
        record.pn = pn;
        self.dict.insert(pn, record)?;
        Ok(self)
    }

    /// Consume up to `limit` CSV lines (`1pn,first,last,…`).
    ///
    /// The feed writes 11-digit numbers with the leading country `1`;
    /// lines starting with anything else are skipped.
    pub fn from_csv<R: BufRead>(&mut self, input: &mut R, line: &mut u64, limit: u64) -> Result<()> {
        for_each_line(input, line, limit, |line, row| {
            if !row.starts_with('1') {
                return Ok(());
            }
            let fields: Vec<&str> = row.split(',').collect();
            if fields.len() < 3 {
                return Err(BuildError::BadColumns {
                    line,
                    got: fields.len(),
                });
            }
            let digits = &fields[0][1..];
            let digits = digits.get(..10).unwrap_or(digits);
            let pn = parse_u64(digits, line)?;
            let record = FailureRecord {
                pn: 0,
                first_seen: fields[1].to_string(),
                last_seen: fields[2].to_string(),
            };
            self.add_row(record, pn)?;
            Ok(())
        })
    }

    pub fn build(&mut self) -> FailureTable {
        let drained = std::mem::take(self);
        FailureTable {
            meta: drained.meta,
            prefetch: drained.prefetch,
            dict: drained.dict,
        }
    }

    /// Finalize and publish; returns the published row count.
    pub fn commit(&mut self, slot: &Slot<FailureTable>) -> usize {
        let table = self.build();
        let rows = table.len();
        slot.publish(Arc::new(table));
        info!(rows, "failure table updated");
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_leading_one_stripped() {
        let csv = "19169954938,2021-02-09 04:11:39,2021-07-03 14:53:37,\\N\n";
        let mut input = Cursor::new(csv);
        let mut builder = FailureBuilder::new();
        let mut line = 0;
        builder.from_csv(&mut input, &mut line, 100).unwrap();
        let table = builder.build();

        let record = table.get_record(9169954938);
        assert_eq!(record.pn, 9169954938);
        assert_eq!(record.first_seen, "2021-02-09 04:11:39");
        assert_eq!(record.last_seen, "2021-07-03 14:53:37");
    }

    #[test]
    fn test_non_one_lines_skipped() {
        let csv = "phone,first,last\n29169954938,2021-01-01,2021-01-02\n19169954938,2021-01-01,2021-01-02\n";
        let mut input = Cursor::new(csv);
        let mut builder = FailureBuilder::new();
        let mut line = 0;
        builder.from_csv(&mut input, &mut line, 100).unwrap();
        assert_eq!(builder.build().len(), 1);
    }

    #[test]
    fn test_short_row_rejected() {
        let mut input = Cursor::new("19169954938,2021-01-01\n");
        let mut builder = FailureBuilder::new();
        let mut line = 0;
        assert!(matches!(
            builder.from_csv(&mut input, &mut line, 100).unwrap_err(),
            BuildError::BadColumns { line: 1, got: 2 }
        ));
    }
}
