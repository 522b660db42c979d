//! Geographic locale table, keyed by NPA-NXX.

use std::io::BufRead;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::error::{BuildError, Result};
use crate::map::{DEFAULT_PREFETCH_WIDTH, U64Map, probe_batch};
use crate::phone::npa_nxx;
use crate::registry::Slot;
use crate::reverse::MAX_ROWS;

use super::{for_each_line, parse_u64, starts_with_digit};

/// Locale data for one exchange prefix. `npanxx == 0` marks "no record".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoRecord {
    pub npanxx: u64,
    pub zipcode: String,
    pub county: String,
    pub city: String,
    pub latitude: String,
    pub longitude: String,
    pub timezone: String,
}

impl GeoRecord {
    pub fn is_absent(&self) -> bool {
        self.npanxx == 0
    }
}

/// One immutable published version of the geo table.
#[derive(Debug)]
pub struct GeoTable {
    meta: Value,
    prefetch: usize,
    dict: U64Map<GeoRecord>,
}

impl GeoTable {
    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    pub fn metadata(&self) -> &Value {
        &self.meta
    }

    pub fn get_record(&self, pn: u64) -> GeoRecord {
        let mut out = [GeoRecord::default()];
        self.get_records(&[pn], &mut out);
        out[0].clone()
    }

    /// Batched lookup: each phone is truncated to its NPA-NXX.
    pub fn get_records(&self, pns: &[u64], out: &mut [GeoRecord]) {
        debug_assert_eq!(pns.len(), out.len());
        probe_batch(&self.dict, pns, self.prefetch, npa_nxx, |i, hit| {
            out[i] = hit.cloned().unwrap_or_default();
        });
    }
}

/// Assembles a draft geo version.
#[derive(Debug)]
pub struct GeoBuilder {
    meta: Value,
    prefetch: usize,
    dict: U64Map<GeoRecord>,
}

impl Default for GeoBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoBuilder {
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

    pub fn add_row(&mut self, mut record: GeoRecord, npanxx: u64) -> Result<&mut Self> {
        if self.dict.len() >= MAX_ROWS {
            return Err(BuildError::Overflow);
        }
        record.npanxx = npanxx;
        self.dict.insert(npanxx, record)?;
        Ok(self)
    }

    /// Consume up to `limit` CSV lines of the ≥20-column locale dump.
    /// Columns used: 0=npanxx, 1=zipcode, 6=city, 9=latitude, 10=county,
    /// 11=longitude, 19=timezone.
    pub fn from_csv<R: BufRead>(&mut self, input: &mut R, line: &mut u64, limit: u64) -> Result<()> {
        for_each_line(input, line, limit, |line, row| {
            if !starts_with_digit(row) {
                return Ok(());
            }
            let fields: Vec<&str> = row.split(',').collect();
            if fields.len() < 20 {
                return Err(BuildError::BadColumns {
                    line,
                    got: fields.len(),
                });
            }
            let npanxx = parse_u64(fields[0], line)?;
            let record = GeoRecord {
                npanxx: 0,
                zipcode: fields[1].to_string(),
                city: fields[6].to_string(),
                latitude: fields[9].to_string(),
                county: fields[10].to_string(),
                longitude: fields[11].to_string(),
                timezone: fields[19].to_string(),
            };
            self.add_row(record, npanxx)?;
            Ok(())
        })
    }

    pub fn build(&mut self) -> GeoTable {
        let drained = std::mem::take(self);
        GeoTable {
            meta: drained.meta,
            prefetch: drained.prefetch,
            dict: drained.dict,
        }
    }

    /// Finalize and publish; returns the published row count.
    pub fn commit(&mut self, slot: &Slot<GeoTable>) -> usize {
        let table = self.build();
        let rows = table.len();
        slot.publish(Arc::new(table));
        info!(rows, "geo table updated");
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_row(npanxx: &str, zipcode: &str, city: &str, timezone: &str) -> String {
        let mut fields = vec![""; 20];
        fields[0] = npanxx;
        fields[1] = zipcode;
        fields[6] = city;
        fields[9] = "40.7440";
        fields[10] = "Hudson";
        fields[11] = "-74.0324";
        fields[19] = timezone;
        fields.join(",")
    }

    #[test]
    fn test_lookup_by_npanxx() {
        let csv = sample_row("201555", "07030", "Hoboken", "EST") + "\n";
        let mut input = Cursor::new(csv);
        let mut builder = GeoBuilder::new();
        let mut line = 0;
        builder.from_csv(&mut input, &mut line, 100).unwrap();
        let table = builder.build();

        let record = table.get_record(2015551212);
        assert_eq!(record.npanxx, 201555);
        assert_eq!(record.zipcode, "07030");
        assert_eq!(record.city, "Hoboken");
        assert_eq!(record.county, "Hudson");
        assert_eq!(record.timezone, "EST");

        assert!(table.get_record(9995550000).is_absent());
    }

    #[test]
    fn test_short_row_rejected() {
        let mut input = Cursor::new("201555,07030,Hoboken\n");
        let mut builder = GeoBuilder::new();
        let mut line = 0;
        assert!(matches!(
            builder.from_csv(&mut input, &mut line, 100).unwrap_err(),
            BuildError::BadColumns { line: 1, got: 3 }
        ));
    }

    #[test]
    fn test_duplicate_npanxx() {
        let mut builder = GeoBuilder::new();
        builder.add_row(GeoRecord::default(), 201555).unwrap();
        assert!(builder.add_row(GeoRecord::default(), 201555).is_err());
    }
}
