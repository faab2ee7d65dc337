//! Reducer stage: per-sublist sizes -> per-sublist base offsets.
//!
//! The metadata's `next` links form a k-chain over boundary ids starting at
//! head's boundary. The base offset of a sublist is the exclusive prefix sum
//! of `size` taken in that chain order. k is small next to n, so where this
//! runs is a deployment choice; both strategies live behind [`Reducer`].

use std::str::FromStr;

use anyhow::{Result, bail};
use rayon::prelude::*;

use crate::list::{Index, NONE, SublistMeta};

pub trait Reducer: Send + Sync {
    /// Fill `base[id]` for every boundary id. `base.len() == meta.len()`.
    fn base_offsets(&self, meta: &[SublistMeta], head_id: Index, base: &mut [Index]);

    fn name(&self) -> &'static str;
}

/// One host pass of k steps along the chain.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialReducer;

impl Reducer for SequentialReducer {
    fn base_offsets(&self, meta: &[SublistMeta], head_id: Index, base: &mut [Index]) {
        debug_assert_eq!(meta.len(), base.len());
        let mut cur = head_id;
        let mut acc: Index = 0;
        for _ in 0..meta.len() {
            let m = meta[cur as usize];
            base[cur as usize] = acc;
            acc += m.size;
            // the tail wraps back to head's boundary
            cur = if m.next == NONE { head_id } else { m.next };
        }
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}

/// Wyllie pointer jumping on the rayon pool: ceil(log2 k) rounds, each a
/// data-parallel pass over k entries. Computes suffix sums along the chain
/// and turns them into exclusive prefix sums.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointerJumpReducer;

impl Reducer for PointerJumpReducer {
    fn base_offsets(&self, meta: &[SublistMeta], head_id: Index, base: &mut [Index]) {
        debug_assert_eq!(meta.len(), base.len());
        let k = meta.len();
        let mut sum: Vec<Index> = meta.par_iter().map(|m| m.size).collect();
        let mut succ: Vec<Index> = meta.par_iter().map(|m| m.next).collect();
        let mut sum_nx = vec![0 as Index; k];
        let mut succ_nx = vec![NONE; k];

        let rounds = k.next_power_of_two().trailing_zeros();
        for _ in 0..rounds {
            sum_nx
                .par_iter_mut()
                .zip(succ_nx.par_iter_mut())
                .enumerate()
                .for_each(|(i, (s, nx))| match succ[i] {
                    NONE => {
                        *s = sum[i];
                        *nx = NONE;
                    }
                    j => {
                        *s = sum[i] + sum[j as usize];
                        *nx = succ[j as usize];
                    }
                });
            std::mem::swap(&mut sum, &mut sum_nx);
            std::mem::swap(&mut succ, &mut succ_nx);
        }

        // sum[i] now counts everything from sublist i to the tail
        let total = sum[head_id as usize];
        base.par_iter_mut()
            .zip(sum.par_iter())
            .for_each(|(b, &suffix)| *b = total - suffix);
    }

    fn name(&self) -> &'static str {
        "pointer-jump"
    }
}

/// Runtime choice of reducer strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReducerKind {
    #[default]
    Sequential,
    PointerJump,
}

impl ReducerKind {
    pub fn reducer(self) -> &'static dyn Reducer {
        match self {
            ReducerKind::Sequential => &SequentialReducer,
            ReducerKind::PointerJump => &PointerJumpReducer,
        }
    }
}

impl FromStr for ReducerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sequential" => Ok(ReducerKind::Sequential),
            "pointer-jump" => Ok(ReducerKind::PointerJump),
            other => bail!("unknown reducer '{other}' (expected sequential or pointer-jump)"),
        }
    }
}
