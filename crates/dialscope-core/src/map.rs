//! Batched hashmap lookup primitive.
//!
//! [`U64Map`] is an open-addressing hash table specialized for the engine's
//! integer keys (phone numbers and their prefix truncations, all ≥ 200).
//! Key slot 0 marks an empty bucket, capacity is a power of two kept at or
//! below 50% load, and probing is linear, so the hot probe loop is
//! branch-light and touches one contiguous array.
//!
//! Tables holding hundreds of millions of keys miss L3 on essentially every
//! random access. The batched accessor [`probe_batch`] therefore splits the
//! key array into windows of `W` keys, computes all hashes of a window and
//! issues a prefetch per bucket first, then probes the same window. The
//! prefetch of key `i+W` overlaps the probe of key `i`, hiding most of the
//! DRAM latency while keeping the code straight-line.

use xxhash_rust::xxh3::xxh3_64;

use crate::error::BuildError;

/// Default prehash/prefetch window width.
pub const DEFAULT_PREFETCH_WIDTH: usize = 16;

const EMPTY_KEY: u64 = 0;
const MIN_CAPACITY: usize = 16;

/// Hint the CPU to pull the cache line holding `addr` toward L1.
#[inline(always)]
pub(crate) fn prefetch_read<T>(addr: *const T) {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        use std::arch::x86_64::{_MM_HINT_T0, _mm_prefetch};
        _mm_prefetch::<_MM_HINT_T0>(addr as *const i8);
    }
    #[cfg(target_arch = "aarch64")]
    unsafe {
        std::arch::asm!(
            "prfm pldl1keep, [{0}]",
            in(reg) addr,
            options(nostack, preserves_flags),
        );
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        let _ = addr;
    }
}

/// A precomputed hash for one key, valid for the map that produced it.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashToken {
    hash: u64,
}

/// Open-addressing `u64 -> V` table with explicit prehash and prefetch.
#[derive(Debug, Clone)]
pub struct U64Map<V> {
    keys: Box<[u64]>,
    vals: Box<[V]>,
    mask: usize,
    len: usize,
}

impl<V: Clone + Default> Default for U64Map<V> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<V: Clone + Default> U64Map<V> {
    /// Create a map sized for `n` entries without further growth.
    pub fn with_capacity(n: usize) -> Self {
        let cap = (n.saturating_mul(2)).next_power_of_two().max(MIN_CAPACITY);
        Self {
            keys: vec![EMPTY_KEY; cap].into_boxed_slice(),
            vals: vec![V::default(); cap].into_boxed_slice(),
            mask: cap - 1,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Grow the backing arrays so that `additional` more entries fit.
    pub fn reserve(&mut self, additional: usize) {
        let want = self.len + additional;
        if want * 2 > self.keys.len() {
            self.rehash(want);
        }
    }

    /// Insert a new key. Fails if the key is already present.
    pub fn insert(&mut self, key: u64, value: V) -> std::result::Result<(), BuildError> {
        debug_assert_ne!(key, EMPTY_KEY, "key 0 is reserved for empty slots");
        if (self.len + 1) * 2 > self.keys.len() {
            self.rehash(self.len + 1);
        }
        let mut i = self.bucket(hash_key(key));
        loop {
            let k = self.keys[i];
            if k == EMPTY_KEY {
                self.keys[i] = key;
                self.vals[i] = value;
                self.len += 1;
                return Ok(());
            }
            if k == key {
                return Err(BuildError::DuplicateKey(key));
            }
            i = (i + 1) & self.mask;
        }
    }

    /// Compute the hash token for a key (the prehash pass).
    #[inline]
    pub fn prehash(&self, key: u64) -> HashToken {
        HashToken {
            hash: hash_key(key),
        }
    }

    /// Prefetch the bucket a token selects (key and value lines).
    #[inline]
    pub fn prefetch(&self, token: HashToken) {
        let i = self.bucket(token.hash);
        unsafe {
            prefetch_read(self.keys.as_ptr().add(i));
            prefetch_read(self.vals.as_ptr().add(i));
        }
    }

    /// Probe for `key` starting at the token's bucket.
    #[inline]
    pub fn find(&self, token: HashToken, key: u64) -> Option<&V> {
        let mut i = self.bucket(token.hash);
        loop {
            let k = self.keys[i];
            if k == key {
                return Some(&self.vals[i]);
            }
            if k == EMPTY_KEY {
                return None;
            }
            i = (i + 1) & self.mask;
        }
    }

    /// Single-key convenience lookup.
    pub fn get(&self, key: u64) -> Option<&V> {
        self.find(self.prehash(key), key)
    }

    #[inline]
    fn bucket(&self, hash: u64) -> usize {
        hash as usize & self.mask
    }

    fn rehash(&mut self, want: usize) {
        let cap = (want.saturating_mul(2)).next_power_of_two().max(MIN_CAPACITY);
        let old_keys = std::mem::replace(&mut self.keys, vec![EMPTY_KEY; cap].into_boxed_slice());
        let old_vals = std::mem::replace(&mut self.vals, vec![V::default(); cap].into_boxed_slice());
        self.mask = cap - 1;
        for (k, v) in old_keys.into_vec().into_iter().zip(old_vals.into_vec()) {
            if k == EMPTY_KEY {
                continue;
            }
            let mut i = self.bucket(hash_key(k));
            while self.keys[i] != EMPTY_KEY {
                i = (i + 1) & self.mask;
            }
            self.keys[i] = k;
            self.vals[i] = v;
        }
    }
}

#[inline]
fn hash_key(key: u64) -> u64 {
    xxh3_64(&key.to_le_bytes())
}

/// Windowed prehash-then-probe over one dictionary.
///
/// For every `keys[i]` the sink receives `(i, find(transform(keys[i])))`.
/// Tables with a single dictionary build their batch accessors on this;
/// the multi-granularity tables (DNO, LERG) run their own windows with
/// one prehash stream per dictionary.
pub fn probe_batch<V, T, S>(map: &U64Map<V>, keys: &[u64], width: usize, transform: T, mut sink: S)
where
    V: Clone + Default,
    T: Fn(u64) -> u64,
    S: FnMut(usize, Option<&V>),
{
    let width = width.max(1);
    let mut tokens = vec![HashToken::default(); width.min(keys.len().max(1))];

    let mut base = 0;
    while base < keys.len() {
        let m = width.min(keys.len() - base);
        for j in 0..m {
            let token = map.prehash(transform(keys[base + j]));
            map.prefetch(token);
            tokens[j] = token;
        }
        for j in 0..m {
            let key = transform(keys[base + j]);
            sink(base + j, map.find(tokens[j], key));
        }
        base += m;
    }
}
