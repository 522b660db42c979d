//! LERG carrier / rate-center directory.
//!
//! Records are keyed by thousands-block (NPA-NXX-X) or exchange (NPA-NXX)
//! prefix; the finer granularity wins at query time. Ingest routes a row
//! on its "last digit" column: empty means the record covers the whole
//! exchange.

use std::io::BufRead;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::error::{BuildError, Result};
use crate::map::{DEFAULT_PREFETCH_WIDTH, HashToken, U64Map};
use crate::registry::Slot;
use crate::reverse::MAX_ROWS;

use super::{for_each_line, parse_u64, starts_with_digit};

/// Carrier information for one prefix. `key == 0` marks "no record".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LergRecord {
    /// NPA-NXX-X (7 digits) or NPA-NXX (6 digits) the record covers.
    pub key: u64,
    pub company: String,
    pub ocn: String,
    pub rate_center: String,
    pub ocn_type: String,
    pub lata: String,
    pub country: String,
}

impl LergRecord {
    pub fn is_absent(&self) -> bool {
        self.key == 0
    }
}

/// One immutable published version of the LERG table.
#[derive(Debug)]
pub struct LergTable {
    meta: Value,
    prefetch: usize,
    by_npa_nxx_x: U64Map<LergRecord>,
    by_npa_nxx: U64Map<LergRecord>,
}

impl LergTable {
    pub fn len(&self) -> usize {
        self.by_npa_nxx_x.len() + self.by_npa_nxx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metadata(&self) -> &Value {
        &self.meta
    }

    pub fn get_record(&self, key: u64) -> LergRecord {
        let mut out = [LergRecord::default()];
        self.get_records(&[key], &mut out);
        out[0].clone()
    }

    /// Batched lookup. `keys[i]` is a phone or routing number; the
    /// thousands-block dictionary is probed first, then the exchange
    /// dictionary. Two prehash streams per window.
    pub fn get_records(&self, keys: &[u64], out: &mut [LergRecord]) {
        debug_assert_eq!(keys.len(), out.len());
        let width = self.prefetch.max(1);
        let n = width.min(keys.len().max(1));
        let mut t_fine = vec![HashToken::default(); n];
        let mut t_coarse = vec![HashToken::default(); n];

        let mut base = 0;
        while base < keys.len() {
            let m = width.min(keys.len() - base);

            for j in 0..m {
                let block = keys[base + j] / 1_000;
                t_fine[j] = self.by_npa_nxx_x.prehash(block);
                self.by_npa_nxx_x.prefetch(t_fine[j]);
                t_coarse[j] = self.by_npa_nxx.prehash(block / 10);
                self.by_npa_nxx.prefetch(t_coarse[j]);
            }

            for j in 0..m {
                let block = keys[base + j] / 1_000;
                let slot = &mut out[base + j];
                if let Some(record) = self.by_npa_nxx_x.find(t_fine[j], block) {
                    *slot = record.clone();
                } else if let Some(record) = self.by_npa_nxx.find(t_coarse[j], block / 10) {
                    *slot = record.clone();
                } else {
                    *slot = LergRecord::default();
                }
            }

            base += m;
        }
    }
}

/// Assembles a draft LERG version.
#[derive(Debug)]
pub struct LergBuilder {
    meta: Value,
    prefetch: usize,
    rows: usize,
    by_npa_nxx_x: U64Map<LergRecord>,
    by_npa_nxx: U64Map<LergRecord>,
}

impl Default for LergBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LergBuilder {
    pub fn new() -> Self {
        Self {
            meta: Value::Null,
            prefetch: DEFAULT_PREFETCH_WIDTH,
            rows: 0,
            by_npa_nxx_x: U64Map::default(),
            by_npa_nxx: U64Map::default(),
        }
    }

    pub fn size_hint(&mut self, n: usize) {
        self.by_npa_nxx_x.reserve(n);
    }

    pub fn set_metadata(&mut self, meta: Value) {
        self.meta = meta;
    }

    pub fn prefetch_width(&mut self, width: usize) {
        self.prefetch = width.max(1);
    }

    /// Insert one record. `x` of `None` routes to the exchange (NPA-NXX)
    /// dictionary; `Some(digit)` to the thousands-block dictionary. The
    /// record's `key` field is computed here.
    pub fn add_row(
        &mut self,
        npa: u64,
        nxx: u64,
        x: Option<u64>,
        mut record: LergRecord,
    ) -> Result<&mut Self> {
        if self.rows >= MAX_ROWS {
            return Err(BuildError::Overflow);
        }
        match x {
            Some(digit) => {
                record.key = npa * 10_000 + nxx * 10 + digit;
                self.by_npa_nxx_x.insert(record.key, record)?;
            }
            None => {
                record.key = npa * 1_000 + nxx;
                self.by_npa_nxx.insert(record.key, record)?;
            }
        }
        self.rows += 1;
        Ok(self)
    }

    /// Consume up to `limit` 10-column CSV lines
    /// (`npa,nxx,x,_,company,ocn,rate_center,ocn_type,lata,country`).
    pub fn from_csv<R: BufRead>(&mut self, input: &mut R, line: &mut u64, limit: u64) -> Result<()> {
        for_each_line(input, line, limit, |line, row| {
            if !starts_with_digit(row) {
                return Ok(());
            }
            let fields: Vec<&str> = row.split(',').collect();
            if fields.len() != 10 {
                return Err(BuildError::BadColumns {
                    line,
                    got: fields.len(),
                });
            }
            let npa = parse_u64(fields[0], line)?;
            let nxx = parse_u64(fields[1], line)?;
            let x = if fields[2].is_empty() {
                None
            } else {
                Some(parse_u64(fields[2], line)?)
            };
            let record = LergRecord {
                key: 0,
                company: fields[4].to_string(),
                ocn: fields[5].to_string(),
                rate_center: fields[6].to_string(),
                ocn_type: fields[7].to_string(),
                lata: fields[8].to_string(),
                country: fields[9].to_string(),
            };
            self.add_row(npa, nxx, x, record)?;
            Ok(())
        })
    }

    pub fn build(&mut self) -> LergTable {
        let drained = std::mem::take(self);
        LergTable {
            meta: drained.meta,
            prefetch: drained.prefetch,
            by_npa_nxx_x: drained.by_npa_nxx_x,
            by_npa_nxx: drained.by_npa_nxx,
        }
    }

    /// Finalize and publish; returns the published row count.
    pub fn commit(&mut self, slot: &Slot<LergTable>) -> usize {
        let table = self.build();
        let rows = table.len();
        slot.publish(Arc::new(table));
        info!(rows, "lerg table updated");
        rows
    }
}
