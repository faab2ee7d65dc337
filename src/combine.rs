//! Combiner stage: rank[i] = base[sublist of i] + local offset of i.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

use rayon::prelude::*;

use crate::list::{Index, Slot};

pub fn combine(buf: &[AtomicU64], base: &[Index], rank: &mut [Index]) {
    debug_assert_eq!(buf.len(), rank.len());
    rank.par_iter_mut()
        .zip(buf.par_iter())
        .with_min_len(1 << 14)
        .for_each(|(r, bits)| {
            let slot = Slot::from_bits(bits.load(Relaxed));
            *r = base[slot.sublist as usize] + slot.offset;
        });
}
