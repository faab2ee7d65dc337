//! Packer and walker stages.
//!
//! The walker owns the only non-trivial control flow of the pipeline: one
//! worker per boundary chases `next` until it meets another boundary or the
//! sentinel, stamping `(boundary id, local offset)` into the working buffer.
//!
//! Workers never synchronise. Because `next` + `head` form a single cycle,
//! every element is reached by exactly one worker exactly once, so all writes
//! to the working buffer land on disjoint slots. Slots are `AtomicU64` written
//! with `Relaxed` stores: a plain 8-byte store on every target we care about,
//! and a list that breaks the single-cycle rule yields wrong ranks instead of
//! a data race.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

use rayon::prelude::*;

use crate::boundary::Boundaries;
use crate::list::{Index, NONE, Slot, SublistMeta};

/// Where the walker reads successors from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WalkMode {
    /// Read from the immutable input array, write to the separate buffer.
    /// `next: &[Index]` cannot change while it is borrowed, so the backend
    /// may hoist each load above the previous iteration's store.
    #[default]
    Split,
    /// Read the successor back out of the packed working buffer. Every load
    /// is ordered after the preceding store; kept as a benchmark baseline.
    InPlace,
}

/// Packer: materialise the working buffer, seeding slot `i` with `next[i]`
/// so the buffer alone encodes the list. Writes into `buf`'s reserved
/// capacity; reserve `next.len()` slots up front to avoid reallocating.
pub fn pack(next: &[Index], buf: &mut Vec<AtomicU64>) {
    buf.clear();
    buf.par_extend(
        next.par_iter()
            .with_min_len(1 << 14)
            .map(|&succ| AtomicU64::new(Slot { sublist: succ, offset: 0 }.to_bits())),
    );
}

/// Walker: fills `buf` for every element and `meta[id]` for every boundary.
///
/// `meta.len()` must equal `bounds.len()` and `buf` must already be packed
/// (only `WalkMode::InPlace` reads what the packer wrote).
pub fn walk(
    mode: WalkMode,
    next: &[Index],
    bounds: &Boundaries,
    buf: &[AtomicU64],
    meta: &mut [SublistMeta],
) {
    debug_assert_eq!(next.len(), buf.len());
    debug_assert_eq!(meta.len(), bounds.len());

    let bounds = *bounds;
    match mode {
        WalkMode::Split => meta.par_iter_mut().enumerate().for_each(|(id, m)| {
            *m = walk_split(next, &bounds, buf, id as Index);
        }),
        WalkMode::InPlace => meta.par_iter_mut().enumerate().for_each(|(id, m)| {
            *m = walk_in_place(&bounds, buf, id as Index);
        }),
    }
}

#[inline]
fn walk_split(next: &[Index], bounds: &Boundaries, buf: &[AtomicU64], id: Index) -> SublistMeta {
    let mut cur = bounds.element(id);
    let mut offset: Index = 0;
    loop {
        let succ = next[cur as usize];
        buf[cur as usize].store(Slot { sublist: id, offset }.to_bits(), Relaxed);
        offset += 1;
        let reached = bounds.id_of(succ);
        if succ == NONE || reached != NONE {
            return SublistMeta { size: offset, next: reached };
        }
        cur = succ;
    }
}

#[inline]
fn walk_in_place(bounds: &Boundaries, buf: &[AtomicU64], id: Index) -> SublistMeta {
    let mut cur = bounds.element(id);
    let mut offset: Index = 0;
    loop {
        let slot = &buf[cur as usize];
        let succ = Slot::from_bits(slot.load(Relaxed)).sublist;
        slot.store(Slot { sublist: id, offset }.to_bits(), Relaxed);
        offset += 1;
        let reached = bounds.id_of(succ);
        if succ == NONE || reached != NONE {
            return SublistMeta { size: offset, next: reached };
        }
        cur = succ;
    }
}

/// Snapshot of the working buffer as plain slots.
pub fn slots(buf: &[AtomicU64]) -> Vec<Slot> {
    buf.par_iter().map(|a| Slot::from_bits(a.load(Relaxed))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::LinkedList;

    fn sample() -> LinkedList {
        // 2 -> 0 -> 3 -> 1 -> 4 -> none
        LinkedList::new(vec![3, 4, 0, 1, NONE], 2)
    }

    fn run(mode: WalkMode, list: &LinkedList, k: Index) -> (Vec<Slot>, Vec<SublistMeta>) {
        let bounds = Boundaries::new(list.head, k);
        let mut buf = Vec::with_capacity(list.len());
        let mut meta = vec![SublistMeta::default(); k as usize];
        pack(&list.next, &mut buf);
        walk(mode, &list.next, &bounds, &buf, &mut meta);
        (slots(&buf), meta)
    }

    #[test]
    fn pack_copies_successors() {
        let list = sample();
        let mut buf: Vec<AtomicU64> = (0..2).map(|_| AtomicU64::new(u64::MAX)).collect();
        pack(&list.next, &mut buf);
        assert_eq!(buf.len(), 5);
        let packed = slots(&buf);
        let succ: Vec<Index> = packed.iter().map(|s| s.sublist).collect();
        assert_eq!(succ, list.next);
        assert!(packed.iter().all(|s| s.offset == 0));
    }

    #[test]
    fn two_sublists_split_at_head() {
        // k = 2, head = 2 -> S = {0, 2}; ids: 0 -> element 0, 1 -> element 2
        let (buf, meta) = run(WalkMode::Split, &sample(), 2);
        // id 1 walks 2 and stops before 0
        assert_eq!(meta[1], SublistMeta { size: 1, next: 0 });
        // id 0 walks 0, 3, 1, 4 then hits the sentinel
        assert_eq!(meta[0], SublistMeta { size: 4, next: NONE });
        assert_eq!(buf[2], Slot { sublist: 1, offset: 0 });
        assert_eq!(buf[0], Slot { sublist: 0, offset: 0 });
        assert_eq!(buf[3], Slot { sublist: 0, offset: 1 });
        assert_eq!(buf[1], Slot { sublist: 0, offset: 2 });
        assert_eq!(buf[4], Slot { sublist: 0, offset: 3 });
    }

    #[test]
    fn every_element_a_boundary() {
        let (buf, meta) = run(WalkMode::Split, &sample(), 5);
        assert!(meta.iter().all(|m| m.size == 1));
        assert!(buf.iter().all(|s| s.offset == 0));
        for (i, s) in buf.iter().enumerate() {
            assert_eq!(s.sublist as usize, i);
        }
        assert_eq!(meta[4].next, NONE);
    }

    #[test]
    fn in_place_matches_split() {
        let list = sample();
        for k in 1..=5 {
            assert_eq!(run(WalkMode::Split, &list, k), run(WalkMode::InPlace, &list, k));
        }
    }

    #[test]
    fn converging_walks_share_a_slot_safely() {
        // 0 -> 2 and 1 -> 2: not a single list, both workers store to slot 2
        let list = LinkedList::new(vec![2, 2, NONE], 0);
        for mode in [WalkMode::Split, WalkMode::InPlace] {
            for _ in 0..64 {
                let (buf, meta) = run(mode, &list, 2);
                assert!(meta.iter().all(|m| m.size == 2));
                if mode == WalkMode::Split {
                    assert_eq!(meta, vec![SublistMeta { size: 2, next: NONE }; 2]);
                }
                assert_eq!(buf[2].offset, 1);
                assert!(buf[2].sublist < 2);
            }
        }
    }
}
