//! # dialscope-core
//!
//! A read-mostly, in-memory enrichment engine for North American telephone
//! numbers. Eleven independent lookup tables (portability/LRN, DNC, DNO,
//! toll-free, LERG, Youmail, Geo, FTC, and two call-failure histories) are
//! built offline from CSV, published atomically behind a version registry,
//! and queried in tight batches with explicit cache prefetch.
//!
//! ## Quick Start
//!
//! ```
//! use dialscope_core::phone::NONE;
//! use dialscope_core::tables::lrn::LrnBuilder;
//!
//! let mut builder = LrnBuilder::new();
//! builder.add_row(2025551212, 2025559999).unwrap();
//! builder.add_row(4155550001, 4155550001).unwrap();
//! let table = builder.build();
//!
//! let mut rns = [0u64; 3];
//! table.get_rns(&[2025551212, 4155550001, 3105550000], &mut rns);
//! assert_eq!(rns, [2025559999, 4155550001, NONE]);
//! ```
//!
//! Published versions are immutable; a reload builds a fresh version and
//! swaps it into the [`registry::Registry`], retiring the predecessor once
//! every outstanding reader handle has dropped.

pub mod error;
pub mod map;
pub mod phone;
pub mod query;
pub mod registry;
pub mod reverse;
pub mod tables;

pub use error::{BuildError, QueryError, Result};
pub use query::{BatchReply, enrich};
pub use registry::{Registry, Slot, TableId};
