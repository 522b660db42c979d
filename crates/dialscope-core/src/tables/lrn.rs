//! Portability (LRN) table: phone number → routing number.
//!
//! The core table of the service. Besides the forward dictionary it
//! carries the packed reverse index, so a routing-number interval can be
//! scanned back to the phones currently routed through it.

use std::io::BufRead;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::error::{BuildError, Result};
use crate::map::{DEFAULT_PREFETCH_WIDTH, U64Map, probe_batch};
use crate::phone::NONE;
use crate::registry::Slot;
use crate::reverse::{InverseScan, MAX_ROWS, ReverseIndex};

use super::{for_each_line, parse_u64, starts_with_digit};

/// One immutable published version of an LRN table.
#[derive(Debug)]
pub struct LrnTable {
    meta: Value,
    prefetch: usize,
    dict: U64Map<u64>,
    reverse: ReverseIndex,
}

impl LrnTable {
    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metadata(&self) -> &Value {
        &self.meta
    }

    /// Routing number for one phone; [`NONE`] when not ported.
    pub fn get_rn(&self, pn: u64) -> u64 {
        let mut out = [NONE];
        self.get_rns(&[pn], &mut out);
        out[0]
    }

    /// Batched forward lookup. `out[i]` receives the routing number for
    /// `pns[i]`, or [`NONE`].
    pub fn get_rns(&self, pns: &[u64], out: &mut [u64]) {
        debug_assert_eq!(pns.len(), out.len());
        probe_batch(&self.dict, pns, self.prefetch, |pn| pn, |i, hit| {
            out[i] = hit.copied().unwrap_or(NONE);
        });
    }

    /// Scan all `(pn, rn)` pairs with `rn` in `[rn_lo, rn_hi)`.
    ///
    /// Pairs come out in ascending routing-number order; within one
    /// routing number, in original insertion order.
    pub fn inverse_rns(&self, rn_lo: u64, rn_hi: u64) -> InverseScan<'_> {
        self.reverse.scan(rn_lo, rn_hi)
    }
}

/// Assembles a draft LRN version.
#[derive(Debug)]
pub struct LrnBuilder {
    meta: Value,
    prefetch: usize,
    dict: U64Map<u64>,
    reverse: ReverseIndex,
}

impl Default for LrnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LrnBuilder {
    pub fn new() -> Self {
        Self {
            meta: Value::Null,
            prefetch: DEFAULT_PREFETCH_WIDTH,
            dict: U64Map::default(),
            reverse: ReverseIndex::new(),
        }
    }

    /// Preallocate for an expected number of records.
    pub fn size_hint(&mut self, n: usize) {
        self.dict.reserve(n);
        self.reverse.reserve(n);
    }

    /// Attach arbitrary metadata to the draft.
    pub fn set_metadata(&mut self, meta: Value) {
        self.meta = meta;
    }

    /// Override the prehash/prefetch window width.
    pub fn prefetch_width(&mut self, width: usize) {
        self.prefetch = width.max(1);
    }

    /// Insert one `(pn, rn)` row.
    pub fn add_row(&mut self, pn: u64, rn: u64) -> Result<&mut Self> {
        if self.reverse.len() >= MAX_ROWS {
            return Err(BuildError::Overflow);
        }
        self.dict.insert(pn, rn)?;
        self.reverse.push(pn, rn);
        Ok(self)
    }

    /// Consume up to `limit` CSV lines (`pn,rn`), advancing `line`.
    ///
    /// Blank lines and lines that do not start with a digit are skipped.
    pub fn from_csv<R: BufRead>(&mut self, input: &mut R, line: &mut u64, limit: u64) -> Result<()> {
        for_each_line(input, line, limit, |line, row| {
            if !starts_with_digit(row) {
                return Ok(());
            }
            let fields: Vec<&str> = row.split(',').collect();
            if fields.len() != 2 {
                return Err(BuildError::BadColumns {
                    line,
                    got: fields.len(),
                });
            }
            let pn = parse_u64(fields[0], line)?;
            let rn = parse_u64(fields[1], line)?;
            self.add_row(pn, rn)?;
            Ok(())
        })
    }

    /// Finalize the reverse index and return the immutable version,
    /// leaving this builder empty.
    pub fn build(&mut self) -> LrnTable {
        let drained = std::mem::take(self);
        let LrnBuilder {
            meta,
            prefetch,
            dict,
            mut reverse,
        } = drained;
        reverse.finalize();
        LrnTable {
            meta,
            prefetch,
            dict,
            reverse,
        }
    }

    /// Finalize and atomically publish, retiring the previous version.
    /// Returns the published row count.
    pub fn commit(&mut self, slot: &Slot<LrnTable>) -> usize {
        let table = self.build();
        let rows = table.len();
        slot.publish(Arc::new(table));
        info!(rows, "lrn table updated");
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_forward_lookup() {
        let mut builder = LrnBuilder::new();
        builder.add_row(2025551212, 2025559999).unwrap();
        builder.add_row(4155550001, 4155550001).unwrap();
        let table = builder.build();

        let mut rns = [0u64; 3];
        table.get_rns(&[2025551212, 4155550001, 3105550000], &mut rns);
        assert_eq!(rns, [2025559999, 4155550001, NONE]);
    }

    #[test]
    fn test_builder_empty_after_build() {
        let mut builder = LrnBuilder::new();
        builder.add_row(2025551212, 2025559999).unwrap();
        let table = builder.build();
        assert_eq!(table.len(), 1);
        assert_eq!(builder.build().len(), 0);
    }

    #[test]
    fn test_duplicate_pn_fails() {
        let mut builder = LrnBuilder::new();
        builder.add_row(2025551212, 1111111111).unwrap();
        let err = builder.add_row(2025551212, 2222222222).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateKey(_)));
    }

    #[test]
    fn test_inverse_scan_orders_pairs() {
        let mut builder = LrnBuilder::new();
        builder.add_row(1234567890, 5550001).unwrap();
        builder.add_row(2345678901, 5550001).unwrap();
        builder.add_row(3456789012, 5550002).unwrap();
        let table = builder.build();

        let pairs: Vec<(u64, u64)> = table.inverse_rns(5550000, 5550003).collect();
        assert_eq!(
            pairs,
            vec![
                (1234567890, 5550001),
                (2345678901, 5550001),
                (3456789012, 5550002),
            ]
        );
    }

    #[test]
    fn test_from_csv() {
        let mut input = Cursor::new("# header\npn,rn\n2025551212,2025559999\n\n4155550001,4155550001\n");
        let mut builder = LrnBuilder::new();
        let mut line = 0;
        builder.from_csv(&mut input, &mut line, 1000).unwrap();
        assert_eq!(line, 5);

        let table = builder.build();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get_rn(2025551212), 2025559999);
    }

    #[test]
    fn test_from_csv_line_limit() {
        let mut input = Cursor::new("2025551212,1111111111\n2025551213,2222222222\n");
        let mut builder = LrnBuilder::new();
        let mut line = 0;
        builder.from_csv(&mut input, &mut line, 1).unwrap();
        assert_eq!(line, 1);
        builder.from_csv(&mut input, &mut line, 10).unwrap();
        assert_eq!(line, 2);
        assert_eq!(builder.build().len(), 2);
    }

    #[test]
    fn test_from_csv_bad_columns() {
        let mut input = Cursor::new("2025551212,2025559999,extra\n");
        let mut builder = LrnBuilder::new();
        let mut line = 0;
        let err = builder.from_csv(&mut input, &mut line, 10).unwrap_err();
        assert!(matches!(err, BuildError::BadColumns { line: 1, got: 3 }));
    }
}
