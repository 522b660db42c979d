//! Membership tables: DNC (do-not-call) and toll-free.
//!
//! A membership table answers "is this phone on the list" with 0/1. The
//! two feeds differ only in CSV shape — the DNC dump is a single phone
//! column, the toll-free dump is three columns with a hyphenated phone
//! first — so one table type serves both registry slots. Like the LRN
//! table, a membership table keeps the packed reverse index so member
//! phones can be enumerated by prefix interval.

use std::io::BufRead;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::error::{BuildError, Result};
use crate::map::{DEFAULT_PREFETCH_WIDTH, U64Map, probe_batch};
use crate::registry::Slot;
use crate::reverse::{InverseScan, MAX_ROWS, ReverseIndex};

use super::{for_each_line, parse_u64, starts_with_digit, strip_hyphens};

/// One immutable published version of a membership table.
#[derive(Debug)]
pub struct MembershipTable {
    meta: Value,
    prefetch: usize,
    dict: U64Map<u64>,
    reverse: ReverseIndex,
}

impl MembershipTable {
    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metadata(&self) -> &Value {
        &self.meta
    }

    pub fn contains(&self, pn: u64) -> bool {
        let mut out = [0u64];
        self.get_flags(&[pn], &mut out);
        out[0] != 0
    }

    /// Batched membership check: `out[i]` is 1 when `pns[i]` is listed.
    pub fn get_flags(&self, pns: &[u64], out: &mut [u64]) {
        debug_assert_eq!(pns.len(), out.len());
        probe_batch(&self.dict, pns, self.prefetch, |pn| pn, |i, hit| {
            out[i] = hit.is_some() as u64;
        });
    }

    /// Enumerate member phones within `[pn_lo, pn_hi)`.
    pub fn scan(&self, pn_lo: u64, pn_hi: u64) -> InverseScan<'_> {
        self.reverse.scan(pn_lo, pn_hi)
    }
}

/// Assembles a draft membership version.
#[derive(Debug)]
pub struct MembershipBuilder {
    meta: Value,
    prefetch: usize,
    dict: U64Map<u64>,
    reverse: ReverseIndex,
}

impl Default for MembershipBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MembershipBuilder {
    pub fn new() -> Self {
        Self {
            meta: Value::Null,
            prefetch: DEFAULT_PREFETCH_WIDTH,
            dict: U64Map::default(),
            reverse: ReverseIndex::new(),
        }
    }

    pub fn size_hint(&mut self, n: usize) {
        self.dict.reserve(n);
        self.reverse.reserve(n);
    }

    pub fn set_metadata(&mut self, meta: Value) {
        self.meta = meta;
    }

    pub fn prefetch_width(&mut self, width: usize) {
        self.prefetch = width.max(1);
    }

    pub fn add_row(&mut self, pn: u64) -> Result<&mut Self> {
        if self.reverse.len() >= MAX_ROWS {
            return Err(BuildError::Overflow);
        }
        self.dict.insert(pn, 1)?;
        // The secondary column is the phone itself, so the reverse scan
        // enumerates members by number interval.
        self.reverse.push(pn, pn);
        Ok(self)
    }

    /// Consume the single-column DNC dump (`pn` per line).
    pub fn from_dnc_csv<R: BufRead>(
        &mut self,
        input: &mut R,
        line: &mut u64,
        limit: u64,
    ) -> Result<()> {
        for_each_line(input, line, limit, |line, row| {
            if !starts_with_digit(row) {
                return Ok(());
            }
            let fields: Vec<&str> = row.split(',').collect();
            if fields.len() != 1 {
                return Err(BuildError::BadColumns {
                    line,
                    got: fields.len(),
                });
            }
            self.add_row(parse_u64(fields[0], line)?)?;
            Ok(())
        })
    }

    /// Consume the three-column toll-free dump; only the first column
    /// (a possibly hyphenated phone) is used.
    pub fn from_tollfree_csv<R: BufRead>(
        &mut self,
        input: &mut R,
        line: &mut u64,
        limit: u64,
    ) -> Result<()> {
        for_each_line(input, line, limit, |line, row| {
            if !starts_with_digit(row) {
                return Ok(());
            }
            let fields: Vec<&str> = row.split(',').collect();
            if fields.len() != 3 {
                return Err(BuildError::BadColumns {
                    line,
                    got: fields.len(),
                });
            }
            self.add_row(parse_u64(&strip_hyphens(fields[0]), line)?)?;
            Ok(())
        })
    }

    pub fn build(&mut self) -> MembershipTable {
        let drained = std::mem::take(self);
        let MembershipBuilder {
            meta,
            prefetch,
            dict,
            mut reverse,
        } = drained;
        reverse.finalize();
        MembershipTable {
            meta,
            prefetch,
            dict,
            reverse,
        }
    }

    /// Finalize and publish; returns the published row count.
    pub fn commit(&mut self, slot: &Slot<MembershipTable>) -> usize {
        let table = self.build();
        let rows = table.len();
        slot.publish(Arc::new(table));
        info!(rows, "membership table updated");
        rows
    }
}
