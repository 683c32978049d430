// src/game/search/tt.rs

//! Shared transposition table.
//!
//! Each slot holds two atomics: the packed record and `hash ^ record`. A probe
//! accepts a slot only when xoring both words gives back the probed hash, which
//! checks the full 64-bit key and also rejects records torn by a concurrent
//! writer. No lock is taken; a lost or stale record only costs a re-search.

use super::record::{TtRecord, GENERATION_MASK};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering::Relaxed};
use sysinfo::System;
use tracing::{debug, warn};

/// Consecutive slots examined by every probe and store.
pub const PROBE_WINDOW: usize = 4;

/// Never take more than this fraction of the memory currently available.
const MAX_MEMORY_FRACTION: u64 = 4;

#[derive(Default)]
struct Slot {
    check: AtomicU64,
    data: AtomicU64,
}

impl Slot {
    fn load(&self) -> (u64, TtRecord) {
        let data = self.data.load(Relaxed);
        let check = self.check.load(Relaxed);
        (check ^ data, TtRecord::from_raw(data))
    }

    fn store(&self, hash: u64, record: TtRecord) {
        self.data.store(record.raw(), Relaxed);
        self.check.store(hash ^ record.raw(), Relaxed);
    }

    fn reset(&self) {
        self.data.store(0, Relaxed);
        self.check.store(0, Relaxed);
    }
}

pub struct TranspositionTable {
    slots: Box<[Slot]>,
    generation: AtomicU8,
}

impl TranspositionTable {
    pub fn new(size_mb: usize) -> Self {
        let slot_count = Self::slot_count_for(size_mb, available_memory());
        debug!(size_mb, slot_count, "allocating transposition table");
        let slots = (0..slot_count).map(|_| Slot::default()).collect();
        Self {
            slots,
            generation: AtomicU8::new(0),
        }
    }

    /// Slots for a table of `size_mb`, clamped against `available` bytes
    /// (0 means unknown and disables the clamp).
    fn slot_count_for(size_mb: usize, available: u64) -> usize {
        let mut bytes = (size_mb as u64).saturating_mul(1024 * 1024);
        if available > 0 && bytes > available / MAX_MEMORY_FRACTION {
            warn!(
                requested_mb = size_mb,
                available_mb = available / (1024 * 1024),
                "transposition table clamped to a quarter of available memory"
            );
            bytes = available / MAX_MEMORY_FRACTION;
        }
        let slots = bytes / std::mem::size_of::<Slot>() as u64;
        (slots as usize).max(PROBE_WINDOW)
    }

    /// Reallocates to `size_mb`, dropping every stored record.
    pub fn resize(&mut self, size_mb: usize) {
        *self = Self::new(size_mb);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn size_mb(&self) -> usize {
        self.len() * std::mem::size_of::<Slot>() / (1024 * 1024)
    }

    pub fn generation(&self) -> u8 {
        self.generation.load(Relaxed)
    }

    /// Starts a new search: records written from now on are "current".
    pub fn new_search(&self) {
        let next = self.generation().wrapping_add(1) & GENERATION_MASK;
        self.generation.store(next, Relaxed);
    }

    pub fn clear(&self) {
        self.slots.par_iter().for_each(Slot::reset);
        self.generation.store(0, Relaxed);
    }

    fn index_of(&self, hash: u64) -> usize {
        ((hash as u128 * self.len() as u128) >> 64) as usize
    }

    fn neighborhood(&self, hash: u64) -> impl Iterator<Item = &Slot> {
        let start = self.index_of(hash);
        let len = self.len();
        (0..PROBE_WINDOW).map(move |i| &self.slots[(start + i) % len])
    }

    pub fn get(&self, hash: u64) -> Option<TtRecord> {
        self.neighborhood(hash).find_map(|slot| {
            let (key, record) = slot.load();
            (key == hash && !record.is_empty()).then_some(record)
        })
    }

    /// Stores `record`. Preference: the slot already holding this hash, an
    /// empty slot, a slot from an older search, then the shallowest record.
    pub fn put(&self, hash: u64, record: TtRecord) {
        let generation = self.generation();
        let mut victim: Option<(&Slot, i32)> = None;

        for slot in self.neighborhood(hash) {
            let (key, existing) = slot.load();
            if existing.is_empty() {
                slot.store(hash, record);
                return;
            }
            if key == hash {
                let record = if record.best_move().is_none() {
                    record.with_best_move(existing.best_move())
                } else {
                    record
                };
                slot.store(hash, record);
                return;
            }
            // Lower is a better victim; older searches rank below every current record.
            let mut rank = existing.depth() as i32;
            if existing.generation() != generation {
                rank -= 1 << 10;
            }
            if victim.map_or(true, |(_, best)| rank < best) {
                victim = Some((slot, rank));
            }
        }

        if let Some((slot, _)) = victim {
            slot.store(hash, record);
        }
    }

    /// Permille of the first thousand slots used by the current search.
    pub fn hashfull(&self) -> usize {
        let sample = self.len().min(1000);
        let generation = self.generation();
        let used = self.slots[..sample]
            .iter()
            .filter(|slot| {
                let (_, record) = slot.load();
                !record.is_empty() && record.generation() == generation
            })
            .count();
        used * 1000 / sample
    }
}

fn available_memory() -> u64 {
    let mut system = System::new();
    system.refresh_memory();
    system.available_memory()
}
