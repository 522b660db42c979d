//! Version registry: one atomic slot per table.
//!
//! A [`Slot`] holds the current published version of one table. Readers
//! acquire a protected handle (an `Arc`) with acquire ordering; writers
//! publish a replacement with release ordering and receive the retired
//! predecessor back. A retired version is deallocated only once the last
//! outstanding handle drops, which is exactly the grace period the engine
//! requires — readers must simply not hold a handle across an unbounded
//! wait.
//!
//! Slots publish and retire independently; there is no cross-table
//! transactionality. A caller needing a cross-table snapshot acquires all
//! of its handles up front and does not reacquire.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::tables::dno::DnoTable;
use crate::tables::failure::FailureTable;
use crate::tables::ftc::FtcTable;
use crate::tables::geo::GeoTable;
use crate::tables::lerg::LergTable;
use crate::tables::lrn::LrnTable;
use crate::tables::membership::MembershipTable;
use crate::tables::youmail::YoumailTable;

/// An atomic pointer slot holding the current version of one table.
pub struct Slot<T> {
    inner: ArcSwapOption<T>,
}

impl<T> Slot<T> {
    pub const fn empty() -> Self {
        Self {
            inner: ArcSwapOption::const_empty(),
        }
    }

    /// Whether a version is currently published.
    pub fn is_available(&self) -> bool {
        self.inner.load().is_some()
    }

    /// Acquire a protected handle on the current version, if any.
    pub fn acquire(&self) -> Option<Arc<T>> {
        self.inner.load_full()
    }

    /// Publish a new version, returning the retired predecessor.
    ///
    /// The returned `Arc` keeps the old version alive for readers that
    /// acquired it before the swap; once the writer drops it too, the
    /// memory is reclaimed when the last reader handle goes away.
    pub fn publish(&self, version: Arc<T>) -> Option<Arc<T>> {
        let retired = self.inner.swap(Some(version));
        if retired.is_some() {
            debug!("retiring previous table version");
        }
        retired
    }

    /// Unpublish the slot (used by tests and teardown).
    pub fn clear(&self) -> Option<Arc<T>> {
        self.inner.swap(None)
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("available", &self.is_available())
            .finish()
    }
}

/// Identifier of one logical table in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableId {
    UsLrn,
    CaLrn,
    Dnc,
    TollFree,
    Dno,
    Lerg,
    Youmail,
    Geo,
    Ftc,
    F404,
    F606,
}

impl TableId {
    pub const ALL: [TableId; 11] = [
        TableId::UsLrn,
        TableId::CaLrn,
        TableId::Dnc,
        TableId::TollFree,
        TableId::Dno,
        TableId::Lerg,
        TableId::Youmail,
        TableId::Geo,
        TableId::Ftc,
        TableId::F404,
        TableId::F606,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TableId::UsLrn => "us_lrn",
            TableId::CaLrn => "ca_lrn",
            TableId::Dnc => "dnc",
            TableId::TollFree => "tollfree",
            TableId::Dno => "dno",
            TableId::Lerg => "lerg",
            TableId::Youmail => "youmail",
            TableId::Geo => "geo",
            TableId::Ftc => "ftc",
            TableId::F404 => "f404",
            TableId::F606 => "f606",
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized table identifiers.
#[derive(Debug, Error)]
#[error("unknown table id: {0}")]
pub struct UnknownTable(pub String);

impl FromStr for TableId {
    type Err = UnknownTable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownTable(s.to_string()))
    }
}

/// The process-wide set of table slots.
///
/// Production threads one `Registry` value through its request handlers;
/// tests instantiate private ones.
#[derive(Debug, Default)]
pub struct Registry {
    us_lrn: Slot<LrnTable>,
    ca_lrn: Slot<LrnTable>,
    dnc: Slot<MembershipTable>,
    tollfree: Slot<MembershipTable>,
    dno: Slot<DnoTable>,
    lerg: Slot<LergTable>,
    youmail: Slot<YoumailTable>,
    geo: Slot<GeoTable>,
    ftc: Slot<FtcTable>,
    f404: Slot<FailureTable>,
    f606: Slot<FailureTable>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn us_lrn(&self) -> &Slot<LrnTable> {
        &self.us_lrn
    }

    pub fn ca_lrn(&self) -> &Slot<LrnTable> {
        &self.ca_lrn
    }

    pub fn dnc(&self) -> &Slot<MembershipTable> {
        &self.dnc
    }

    pub fn tollfree(&self) -> &Slot<MembershipTable> {
        &self.tollfree
    }

    pub fn dno(&self) -> &Slot<DnoTable> {
        &self.dno
    }

    pub fn lerg(&self) -> &Slot<LergTable> {
        &self.lerg
    }

    pub fn youmail(&self) -> &Slot<YoumailTable> {
        &self.youmail
    }

    pub fn geo(&self) -> &Slot<GeoTable> {
        &self.geo
    }

    pub fn ftc(&self) -> &Slot<FtcTable> {
        &self.ftc
    }

    pub fn f404(&self) -> &Slot<FailureTable> {
        &self.f404
    }

    pub fn f606(&self) -> &Slot<FailureTable> {
        &self.f606
    }

    pub fn is_available(&self, id: TableId) -> bool {
        match id {
            TableId::UsLrn => self.us_lrn.is_available(),
            TableId::CaLrn => self.ca_lrn.is_available(),
            TableId::Dnc => self.dnc.is_available(),
            TableId::TollFree => self.tollfree.is_available(),
            TableId::Dno => self.dno.is_available(),
            TableId::Lerg => self.lerg.is_available(),
            TableId::Youmail => self.youmail.is_available(),
            TableId::Geo => self.geo.is_available(),
            TableId::Ftc => self.ftc.is_available(),
            TableId::F404 => self.f404.is_available(),
            TableId::F606 => self.f606.is_available(),
        }
    }

    /// Row count of the published version, or 0 when unpublished.
    pub fn rows(&self, id: TableId) -> usize {
        match id {
            TableId::UsLrn => self.us_lrn.acquire().map_or(0, |t| t.len()),
            TableId::CaLrn => self.ca_lrn.acquire().map_or(0, |t| t.len()),
            TableId::Dnc => self.dnc.acquire().map_or(0, |t| t.len()),
            TableId::TollFree => self.tollfree.acquire().map_or(0, |t| t.len()),
            TableId::Dno => self.dno.acquire().map_or(0, |t| t.len()),
            TableId::Lerg => self.lerg.acquire().map_or(0, |t| t.len()),
            TableId::Youmail => self.youmail.acquire().map_or(0, |t| t.len()),
            TableId::Geo => self.geo.acquire().map_or(0, |t| t.len()),
            TableId::Ftc => self.ftc.acquire().map_or(0, |t| t.len()),
            TableId::F404 => self.f404.acquire().map_or(0, |t| t.len()),
            TableId::F606 => self.f606.acquire().map_or(0, |t| t.len()),
        }
    }

    /// Builder metadata of the published version, if any.
    pub fn metadata(&self, id: TableId) -> Option<Value> {
        match id {
            TableId::UsLrn => self.us_lrn.acquire().map(|t| t.metadata().clone()),
            TableId::CaLrn => self.ca_lrn.acquire().map(|t| t.metadata().clone()),
            TableId::Dnc => self.dnc.acquire().map(|t| t.metadata().clone()),
            TableId::TollFree => self.tollfree.acquire().map(|t| t.metadata().clone()),
            TableId::Dno => self.dno.acquire().map(|t| t.metadata().clone()),
            TableId::Lerg => self.lerg.acquire().map(|t| t.metadata().clone()),
            TableId::Youmail => self.youmail.acquire().map(|t| t.metadata().clone()),
            TableId::Geo => self.geo.acquire().map(|t| t.metadata().clone()),
            TableId::Ftc => self.ftc.acquire().map(|t| t.metadata().clone()),
            TableId::F404 => self.f404.acquire().map(|t| t.metadata().clone()),
            TableId::F606 => self.f606.acquire().map(|t| t.metadata().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::lrn::LrnBuilder;

    #[test]
    fn test_slot_starts_empty() {
        let slot: Slot<LrnTable> = Slot::empty();
        assert!(!slot.is_available());
        assert!(slot.acquire().is_none());
    }

    #[test]
    fn test_publish_and_acquire() {
        let slot = Slot::empty();
        let mut builder = LrnBuilder::new();
        builder.add_row(2025551212, 2025559999).unwrap();
        slot.publish(Arc::new(builder.build()));

        assert!(slot.is_available());
        let table = slot.acquire().unwrap();
        assert_eq!(table.get_rn(2025551212), 2025559999);
    }

    #[test]
    fn test_retired_version_survives_outstanding_handle() {
        let slot = Slot::empty();

        let mut builder = LrnBuilder::new();
        builder.add_row(2025551212, 1111111111).unwrap();
        slot.publish(Arc::new(builder.build()));

        // Reader A acquires before the writer replaces the version.
        let old = slot.acquire().unwrap();

        let mut builder = LrnBuilder::new();
        builder.add_row(2025551212, 2222222222).unwrap();
        let retired = slot.publish(Arc::new(builder.build())).unwrap();
        drop(retired);

        // Reader B sees the replacement; A still reads its snapshot.
        let new = slot.acquire().unwrap();
        assert_eq!(old.get_rn(2025551212), 1111111111);
        assert_eq!(new.get_rn(2025551212), 2222222222);
    }

    #[test]
    fn test_table_id_round_trip() {
        for id in TableId::ALL {
            assert_eq!(id.as_str().parse::<TableId>().unwrap(), id);
        }
        assert!("bogus".parse::<TableId>().is_err());
    }

    #[test]
    fn test_registry_dispatch() {
        let registry = Registry::new();
        assert!(!registry.is_available(TableId::UsLrn));
        assert_eq!(registry.rows(TableId::UsLrn), 0);

        let mut builder = LrnBuilder::new();
        builder.add_row(2025551212, 2025559999).unwrap();
        builder.commit(registry.us_lrn());

        assert!(registry.is_available(TableId::UsLrn));
        assert_eq!(registry.rows(TableId::UsLrn), 1);
        assert!(registry.metadata(TableId::UsLrn).is_some());
    }
}
