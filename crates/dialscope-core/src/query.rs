//! Batch query composition.
//!
//! Fans one batch of phones across every available table and assembles
//! per-row columns. The US and CA LRN lookups always run (degrading to
//! all-[`NONE`] when unpublished); each optional table contributes a
//! column only while its registry slot is populated. Composition never
//! fails — an absent table or row just yields its sentinel.

use crate::phone::NONE;
use crate::registry::Registry;
use crate::tables::failure::FailureRecord;
use crate::tables::ftc::FtcRecord;
use crate::tables::geo::GeoRecord;
use crate::tables::lerg::LergRecord;
use crate::tables::youmail::YoumailRecord;

/// Column-oriented result of one composed batch query.
///
/// `us_rn`/`ca_rn` always have one entry per input phone; every other
/// column is `None` when its table was unavailable at query time.
#[derive(Debug, Default)]
pub struct BatchReply {
    pub pns: Vec<u64>,
    pub us_rn: Vec<u64>,
    pub ca_rn: Vec<u64>,
    pub dnc: Option<Vec<u64>>,
    pub dno: Option<Vec<u64>>,
    pub tollfree: Option<Vec<u64>>,
    pub lerg: Option<Vec<LergRecord>>,
    pub youmail: Option<Vec<YoumailRecord>>,
    pub geo: Option<Vec<GeoRecord>>,
    pub ftc: Option<Vec<FtcRecord>>,
    pub f404: Option<Vec<FailureRecord>>,
    pub f606: Option<Vec<FailureRecord>>,
}

impl BatchReply {
    pub fn len(&self) -> usize {
        self.pns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pns.is_empty()
    }

    /// The routing number used downstream for row `i`: US if ported
    /// there, else CA, else [`NONE`].
    pub fn effective_rn(&self, i: usize) -> u64 {
        if self.us_rn[i] != NONE {
            self.us_rn[i]
        } else {
            self.ca_rn[i]
        }
    }
}

/// Run one composed batch query against every available table.
///
/// All handles are acquired before the first lookup, so the whole batch
/// observes one consistent version per table even while reloads commit
/// concurrently.
pub fn enrich(registry: &Registry, pns: &[u64]) -> BatchReply {
    let n = pns.len();

    let us_lrn = registry.us_lrn().acquire();
    let ca_lrn = registry.ca_lrn().acquire();
    let dnc = registry.dnc().acquire();
    let dno = registry.dno().acquire();
    let tollfree = registry.tollfree().acquire();
    let lerg = registry.lerg().acquire();
    let youmail = registry.youmail().acquire();
    let geo = registry.geo().acquire();
    let ftc = registry.ftc().acquire();
    let f404 = registry.f404().acquire();
    let f606 = registry.f606().acquire();

    let mut us_rn = vec![NONE; n];
    if let Some(table) = &us_lrn {
        table.get_rns(pns, &mut us_rn);
    }
    let mut ca_rn = vec![NONE; n];
    if let Some(table) = &ca_lrn {
        table.get_rns(pns, &mut ca_rn);
    }

    let dnc = dnc.map(|table| {
        let mut out = vec![0u64; n];
        table.get_flags(pns, &mut out);
        out
    });
    let dno = dno.map(|table| {
        let mut out = vec![0u64; n];
        table.get_flags(pns, &mut out);
        out
    });
    let tollfree = tollfree.map(|table| {
        let mut out = vec![0u64; n];
        table.get_flags(pns, &mut out);
        out
    });

    // LERG follows portability: the ported destination's carrier is the
    // interesting one, so the composed key prefers the routing number.
    let lerg = lerg.map(|table| {
        let keys: Vec<u64> = (0..n)
            .map(|i| {
                let mut rn = us_rn[i];
                if rn == NONE {
                    rn = ca_rn[i];
                }
                if rn != NONE { rn } else { pns[i] }
            })
            .collect();
        let mut out = vec![LergRecord::default(); n];
        table.get_records(&keys, &mut out);
        out
    });

    let youmail = youmail.map(|table| {
        let mut out = vec![YoumailRecord::default(); n];
        table.get_records(pns, &mut out);
        out
    });
    let geo = geo.map(|table| {
        let mut out = vec![GeoRecord::default(); n];
        table.get_records(pns, &mut out);
        out
    });
    let ftc = ftc.map(|table| {
        let mut out = vec![FtcRecord::default(); n];
        table.get_records(pns, &mut out);
        out
    });
    let f404 = f404.map(|table| {
        let mut out = vec![FailureRecord::default(); n];
        table.get_records(pns, &mut out);
        out
    });
    let f606 = f606.map(|table| {
        let mut out = vec![FailureRecord::default(); n];
        table.get_records(pns, &mut out);
        out
    });

    BatchReply {
        pns: pns.to_vec(),
        us_rn,
        ca_rn,
        dnc,
        dno,
        tollfree,
        lerg,
        youmail,
        geo,
        ftc,
        f404,
        f606,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::lerg::{LergBuilder, LergRecord};
    use crate::tables::lrn::LrnBuilder;
    use crate::tables::membership::MembershipBuilder;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn lerg_record(company: &str) -> LergRecord {
        LergRecord {
            company: company.to_string(),
            ..LergRecord::default()
        }
    }

    #[test]
    fn test_empty_registry_degrades() {
        let registry = Registry::new();
        let reply = enrich(&registry, &[2025551212]);
        assert_eq!(reply.us_rn, vec![NONE]);
        assert_eq!(reply.ca_rn, vec![NONE]);
        assert!(reply.dnc.is_none());
        assert!(reply.lerg.is_none());
        assert_eq!(reply.effective_rn(0), NONE);
    }

    #[test]
    fn test_lerg_key_prefers_routing_number() {
        let registry = Registry::new();

        // 2025551212 is ported to 3045550000 in the US table.
        let mut lrn = LrnBuilder::new();
        lrn.add_row(2025551212, 3045550000).unwrap();
        lrn.commit(registry.us_lrn());

        // LERG knows the ported destination's block and the original's.
        let mut lerg = LergBuilder::new();
        lerg.add_row(304, 555, Some(0), lerg_record("ported carrier"))
            .unwrap();
        lerg.add_row(202, 555, Some(1), lerg_record("home carrier"))
            .unwrap();
        lerg.commit(registry.lerg());

        let reply = enrich(&registry, &[2025551212, 2025551999]);
        let lerg = reply.lerg.as_ref().unwrap();
        // Ported phone resolves through its RN; unported through itself.
        assert_eq!(lerg[0].company, "ported carrier");
        assert_eq!(lerg[1].company, "home carrier");
    }

    #[test]
    fn test_membership_columns() {
        let registry = Registry::new();
        let mut dnc = MembershipBuilder::new();
        dnc.add_row(2025551212).unwrap();
        dnc.commit(registry.dnc());

        let reply = enrich(&registry, &[2025551212, 3105550000]);
        assert_eq!(reply.dnc, Some(vec![1, 0]));
        assert!(reply.tollfree.is_none());
    }

    #[test]
    fn test_concurrent_commit_is_snapshot_consistent() {
        let registry = Arc::new(Registry::new());

        let mut builder = LrnBuilder::new();
        for i in 0..1_000u64 {
            builder.add_row(2_000_000_000 + i, 1_111_111_111).unwrap();
        }
        builder.commit(registry.us_lrn());

        let stop = Arc::new(AtomicBool::new(false));
        let pns: Vec<u64> = (0..1_000u64).map(|i| 2_000_000_000 + i).collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let stop = Arc::clone(&stop);
                let pns = pns.clone();
                std::thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        let reply = enrich(&registry, &pns);
                        // Every row of one batch must come from a single
                        // version: all 1s or all 2s, never a mix.
                        let first = reply.us_rn[0];
                        assert!(reply.us_rn.iter().all(|&rn| rn == first));
                    }
                })
            })
            .collect();

        for round in 0..20u64 {
            let rn = if round % 2 == 0 { 2_222_222_222 } else { 1_111_111_111 };
            let mut builder = LrnBuilder::new();
            for i in 0..1_000u64 {
                builder.add_row(2_000_000_000 + i, rn).unwrap();
            }
            builder.commit(registry.us_lrn());
        }

        stop.store(true, Ordering::Relaxed);
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
