//! Hierarchical do-not-originate table.
//!
//! Four independent dictionaries keyed by the full number and its NPA,
//! NPA-NXX, and NPA-NXX-X truncations. A phone is listed when *any*
//! granularity matches. The batch accessor runs four prehash streams per
//! window so all four probes of a key land in cache together.

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::error::{BuildError, Result};
use crate::map::{DEFAULT_PREFETCH_WIDTH, HashToken, U64Map};
use crate::phone::{npa, npa_nxx, npa_nxx_x};
use crate::registry::Slot;
use crate::reverse::MAX_ROWS;

use super::{for_each_line, parse_u64, starts_with_digit, strip_hyphens};

/// Which dictionary a DNO row populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Full,
    Npa,
    NpaNxx,
    NpaNxxX,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Full => "full",
            Granularity::Npa => "npa",
            Granularity::NpaNxx => "npa_nxx",
            Granularity::NpaNxxX => "npa_nxx_x",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = BadGranularity;

    fn from_str(s: &str) -> std::result::Result<Self, BadGranularity> {
        match s {
            "full" => Ok(Granularity::Full),
            "npa" => Ok(Granularity::Npa),
            "npa_nxx" => Ok(Granularity::NpaNxx),
            "npa_nxx_x" => Ok(Granularity::NpaNxxX),
            other => Err(BadGranularity(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown DNO granularity: {0}")]
pub struct BadGranularity(pub String);

/// Probe order for the hierarchical lookup.
///
/// The most-specific-first order stops at the tightest listing.
/// [`ProbeOrder::CoarseFirst`] checks the NPA dictionary first, which
/// over-matches whenever a coarse prefix is listed; it is kept as a knob
/// for feeds curated under that assumption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProbeOrder {
    #[default]
    MostSpecificFirst,
    CoarseFirst,
}

/// One immutable published version of the DNO table.
#[derive(Debug)]
pub struct DnoTable {
    meta: Value,
    prefetch: usize,
    order: ProbeOrder,
    full: U64Map<u64>,
    by_npa: U64Map<u64>,
    by_npa_nxx: U64Map<u64>,
    by_npa_nxx_x: U64Map<u64>,
}

impl DnoTable {
    pub fn len(&self) -> usize {
        self.full.len() + self.by_npa.len() + self.by_npa_nxx.len() + self.by_npa_nxx_x.len()
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

    /// Batched hierarchical check: `out[i]` is 1 when `pns[i]` matches at
    /// any granularity.
    pub fn get_flags(&self, pns: &[u64], out: &mut [u64]) {
        debug_assert_eq!(pns.len(), out.len());
        let width = self.prefetch.max(1);
        let n = width.min(pns.len().max(1));
        let mut t_full = vec![HashToken::default(); n];
        let mut t_npa = vec![HashToken::default(); n];
        let mut t_npa_nxx = vec![HashToken::default(); n];
        let mut t_npa_nxx_x = vec![HashToken::default(); n];

        let mut base = 0;
        while base < pns.len() {
            let m = width.min(pns.len() - base);

            for j in 0..m {
                let pn = pns[base + j];
                t_full[j] = self.full.prehash(pn);
                self.full.prefetch(t_full[j]);
                t_npa[j] = self.by_npa.prehash(npa(pn));
                self.by_npa.prefetch(t_npa[j]);
                t_npa_nxx[j] = self.by_npa_nxx.prehash(npa_nxx(pn));
                self.by_npa_nxx.prefetch(t_npa_nxx[j]);
                t_npa_nxx_x[j] = self.by_npa_nxx_x.prehash(npa_nxx_x(pn));
                self.by_npa_nxx_x.prefetch(t_npa_nxx_x[j]);
            }

            for j in 0..m {
                let pn = pns[base + j];
                let hit = match self.order {
                    ProbeOrder::MostSpecificFirst => {
                        self.full.find(t_full[j], pn).is_some()
                            || self
                                .by_npa_nxx_x
                                .find(t_npa_nxx_x[j], npa_nxx_x(pn))
                                .is_some()
                            || self.by_npa_nxx.find(t_npa_nxx[j], npa_nxx(pn)).is_some()
                            || self.by_npa.find(t_npa[j], npa(pn)).is_some()
                    }
                    ProbeOrder::CoarseFirst => {
                        self.by_npa.find(t_npa[j], npa(pn)).is_some()
                            || self.by_npa_nxx.find(t_npa_nxx[j], npa_nxx(pn)).is_some()
                            || self
                                .by_npa_nxx_x
                                .find(t_npa_nxx_x[j], npa_nxx_x(pn))
                                .is_some()
                            || self.full.find(t_full[j], pn).is_some()
                    }
                };
                out[base + j] = hit as u64;
            }

            base += m;
        }
    }
}

/// Assembles a draft DNO version.
#[derive(Debug)]
pub struct DnoBuilder {
    meta: Value,
    prefetch: usize,
    order: ProbeOrder,
    full: U64Map<u64>,
    by_npa: U64Map<u64>,
    by_npa_nxx: U64Map<u64>,
    by_npa_nxx_x: U64Map<u64>,
}

impl Default for DnoBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DnoBuilder {
    pub fn new() -> Self {
        Self {
            meta: Value::Null,
            prefetch: DEFAULT_PREFETCH_WIDTH,
            order: ProbeOrder::default(),
            full: U64Map::default(),
            by_npa: U64Map::default(),
            by_npa_nxx: U64Map::default(),
            by_npa_nxx_x: U64Map::default(),
        }
    }

    pub fn size_hint(&mut self, n: usize) {
        self.full.reserve(n);
    }

    pub fn set_metadata(&mut self, meta: Value) {
        self.meta = meta;
    }

    pub fn prefetch_width(&mut self, width: usize) {
        self.prefetch = width.max(1);
    }

    pub fn probe_order(&mut self, order: ProbeOrder) {
        self.order = order;
    }

    /// Insert one key into the dictionary named by `granularity`.
    /// Duplicates within the same dictionary are fatal.
    pub fn add_row(&mut self, key: u64, granularity: Granularity) -> Result<&mut Self> {
        if self.total_rows() >= MAX_ROWS {
            return Err(BuildError::Overflow);
        }
        let dict = match granularity {
            Granularity::Full => &mut self.full,
            Granularity::Npa => &mut self.by_npa,
            Granularity::NpaNxx => &mut self.by_npa_nxx,
            Granularity::NpaNxxX => &mut self.by_npa_nxx_x,
        };
        dict.insert(key, 1)?;
        Ok(self)
    }

    /// Consume up to `limit` CSV lines into the `granularity` dictionary.
    ///
    /// Rows are three columns; only the first (a hyphenated key) is used.
    /// Lines not starting with a digit are skipped.
    pub fn from_csv<R: BufRead>(
        &mut self,
        input: &mut R,
        granularity: Granularity,
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
            let key = parse_u64(&strip_hyphens(fields[0]), line)?;
            self.add_row(key, granularity)?;
            Ok(())
        })
    }

    pub fn build(&mut self) -> DnoTable {
        let drained = std::mem::take(self);
        DnoTable {
            meta: drained.meta,
            prefetch: drained.prefetch,
            order: drained.order,
            full: drained.full,
            by_npa: drained.by_npa,
            by_npa_nxx: drained.by_npa_nxx,
            by_npa_nxx_x: drained.by_npa_nxx_x,
        }
    }

    /// Finalize and publish; returns the published row count.
    pub fn commit(&mut self, slot: &Slot<DnoTable>) -> usize {
        let table = self.build();
        let rows = table.len();
        slot.publish(Arc::new(table));
        info!(rows, "dno table updated");
        rows
    }

    fn total_rows(&self) -> usize {
        self.full.len() + self.by_npa.len() + self.by_npa_nxx.len() + self.by_npa_nxx_x.len()
    }
}
