//! Youmail spam/fraud scoring table, keyed by phone.

use std::io::BufRead;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::error::{BuildError, Result};
use crate::map::{DEFAULT_PREFETCH_WIDTH, U64Map, probe_batch};
use crate::registry::Slot;
use crate::reverse::MAX_ROWS;

use super::{for_each_line, parse_u64};

/// Fraud scores for one phone. `pn == 0` marks "no record".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YoumailRecord {
    pub pn: u64,
    pub spam_score: String,
    pub fraud_probability: String,
    pub unlawful: String,
    pub tcpa_fraud: String,
}

impl YoumailRecord {
    pub fn is_absent(&self) -> bool {
        self.pn == 0
    }
}

/// One immutable published version of the Youmail table.
#[derive(Debug)]
pub struct YoumailTable {
    meta: Value,
    prefetch: usize,
    dict: U64Map<YoumailRecord>,
}

impl YoumailTable {
    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    pub fn metadata(&self) -> &Value {
        &self.meta
    }

    pub fn get_record(&self, pn: u64) -> YoumailRecord {
        let mut out = [YoumailRecord::default()];
        self.get_records(&[pn], &mut out);
        out[0].clone()
    }

    pub fn get_records(&self, pns: &[u64], out: &mut [YoumailRecord]) {
        debug_assert_eq!(pns.len(), out.len());
        probe_batch(&self.dict, pns, self.prefetch, |pn| pn, |i, hit| {
            out[i] = hit.cloned().unwrap_or_default();
        });
    }
}

/// Assembles a draft Youmail version.
#[derive(Debug)]
pub struct YoumailBuilder {
    meta: Value,
    prefetch: usize,
    dict: U64Map<YoumailRecord>,
}

impl Default for YoumailBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl YoumailBuilder {
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

    pub fn add_row(&mut self, mut record: YoumailRecord, pn: u64) -> Result<&mut Self> {
        if self.dict.len() >= MAX_ROWS {
            return Err(BuildError::Overflow);
        }
        record.pn = pn;
        self.dict.insert(pn, record)?;
        Ok(self)
    }

    /// Consume up to `limit` CSV lines
    /// (`+1pn,spam_score,fraud_probability,unlawful,tcpa_fraud`).
    ///
    /// Lines not starting with `+` are skipped. The score dump sometimes
    /// truncates the trailing field (`+1…,ALMOST_CERTAINLY,,,`); a row
    /// ending in a comma is accepted with an empty `tcpa_fraud`.
    pub fn from_csv<R: BufRead>(&mut self, input: &mut R, line: &mut u64, limit: u64) -> Result<()> {
        for_each_line(input, line, limit, |line, row| {
            if !row.starts_with('+') {
                return Ok(());
            }
            let fields: Vec<&str> = row.split(',').collect();
            let tcpa_fraud = match fields.len() {
                5 => fields[4],
                6 if fields[5].is_empty() => fields[4],
                got => {
                    return Err(BuildError::BadColumns { line, got });
                }
            };
            let number = fields[0].strip_prefix("+1").unwrap_or(fields[0]);
            let pn = parse_u64(number, line)?;
            let record = YoumailRecord {
                pn: 0,
                spam_score: fields[1].to_string(),
                fraud_probability: fields[2].to_string(),
                unlawful: fields[3].to_string(),
                tcpa_fraud: tcpa_fraud.to_string(),
            };
            self.add_row(record, pn)?;
            Ok(())
        })
    }

    pub fn build(&mut self) -> YoumailTable {
        let drained = std::mem::take(self);
        YoumailTable {
            meta: drained.meta,
            prefetch: drained.prefetch,
            dict: drained.dict,
        }
    }

    /// Finalize and publish; returns the published row count.
    pub fn commit(&mut self, slot: &Slot<YoumailTable>) -> usize {
        let table = self.build();
        let rows = table.len();
        slot.publish(Arc::new(table));
        info!(rows, "youmail table updated");
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_full_row() {
        let mut input =
            Cursor::new("+12025551212,ALMOST_CERTAINLY,0.96,true,0.80\nnot a row\n");
        let mut builder = YoumailBuilder::new();
        let mut line = 0;
        builder.from_csv(&mut input, &mut line, 100).unwrap();
        let table = builder.build();

        let record = table.get_record(2025551212);
        assert_eq!(record.pn, 2025551212);
        assert_eq!(record.spam_score, "ALMOST_CERTAINLY");
        assert_eq!(record.fraud_probability, "0.96");
        assert_eq!(record.unlawful, "true");
        assert_eq!(record.tcpa_fraud, "0.80");
        assert!(table.get_record(3105550000).is_absent());
    }

    #[test]
    fn test_truncated_row_with_trailing_comma() {
        let mut input = Cursor::new("+12025551212,ALMOST_CERTAINLY,,,\n");
        let mut builder = YoumailBuilder::new();
        let mut line = 0;
        builder.from_csv(&mut input, &mut line, 100).unwrap();
        let table = builder.build();

        let record = table.get_record(2025551212);
        assert_eq!(record.spam_score, "ALMOST_CERTAINLY");
        assert_eq!(record.tcpa_fraud, "");
    }

    #[test]
    fn test_bare_four_columns_rejected() {
        let mut input = Cursor::new("+12025551212,ALMOST_CERTAINLY,0.96,true\n");
        let mut builder = YoumailBuilder::new();
        let mut line = 0;
        assert!(matches!(
            builder.from_csv(&mut input, &mut line, 100).unwrap_err(),
            BuildError::BadColumns { line: 1, got: 4 }
        ));
    }
}
