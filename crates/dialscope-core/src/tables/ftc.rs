//! FTC complaint history table, keyed by phone.

use std::io::BufRead;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::error::{BuildError, Result};
use crate::map::{DEFAULT_PREFETCH_WIDTH, U64Map, probe_batch};
use crate::registry::Slot;
use crate::reverse::MAX_ROWS;

use super::{for_each_line, parse_u64, starts_with_digit};

/// Complaint history for one phone. `pn == 0` marks "no record".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FtcRecord {
    pub pn: u64,
    pub first_complaint: String,
    pub last_complaint: String,
    pub count: String,
}

impl FtcRecord {
    pub fn is_absent(&self) -> bool {
        self.pn == 0
    }
}

/// One immutable published version of the FTC table.
#[derive(Debug)]
pub struct FtcTable {
    meta: Value,
    prefetch: usize,
    dict: U64Map<FtcRecord>,
}

impl FtcTable {
    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    pub fn metadata(&self) -> &Value {
        &self.meta
    }

    pub fn get_record(&self, pn: u64) -> FtcRecord {
        let mut out = [FtcRecord::default()];
        self.get_records(&[pn], &mut out);
        out[0].clone()
    }

    pub fn get_records(&self, pns: &[u64], out: &mut [FtcRecord]) {
        debug_assert_eq!(pns.len(), out.len());
        probe_batch(&self.dict, pns, self.prefetch, |pn| pn, |i, hit| {
            out[i] = hit.cloned().unwrap_or_default();
        });
    }
}

/// Assembles a draft FTC version.
#[derive(Debug)]
pub struct FtcBuilder {
    meta: Value,
    prefetch: usize,
    dict: U64Map<FtcRecord>,
}

impl Default for FtcBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FtcBuilder {
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

    pub fn add_row(&mut self, mut record: FtcRecord, pn: u64) -> Result<&mut Self> {
        if self.dict.len() >= MAX_ROWS {
            return Err(BuildError::Overflow);
        }
        record.pn = pn;
        self.dict.insert(pn, record)?;
        Ok(self)
    }

    /// Consume up to `limit` CSV lines of the complaint dump. Columns
    /// used: 1=pn (pre-cleaned 10 digits), 2=first, 3=last, 5=count; the
    /// count column is empty on short rows.
    pub fn from_csv<R: BufRead>(&mut self, input: &mut R, line: &mut u64, limit: u64) -> Result<()> {
        for_each_line(input, line, limit, |line, row| {
            if !starts_with_digit(row) {
                return Ok(());
            }
            let fields: Vec<&str> = row.split(',').collect();
            if fields.len() < 5 {
                return Err(BuildError::BadColumns {
                    line,
                    got: fields.len(),
                });
            }
            let pn = parse_u64(fields[1], line)?;
            let record = FtcRecord {
                pn: 0,
                first_complaint: fields[2].to_string(),
                last_complaint: fields[3].to_string(),
                count: fields.get(5).copied().unwrap_or_default().to_string(),
            };
            self.add_row(record, pn)?;
            Ok(())
        })
    }

    pub fn build(&mut self) -> FtcTable {
        let drained = std::mem::take(self);
        FtcTable {
            meta: drained.meta,
            prefetch: drained.prefetch,
            dict: drained.dict,
        }
    }

    /// Finalize and publish; returns the published row count.
    pub fn commit(&mut self, slot: &Slot<FtcTable>) -> usize {
        let table = self.build();
        let rows = table.len();
        slot.publish(Arc::new(table));
        info!(rows, "ftc table updated");
        rows
    }
}
