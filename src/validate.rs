//! Opt-in O(n) checks around the ranking routine.
//!
//! `validate_list` verifies the single-cycle precondition the walker relies
//! on; it never runs unless asked for. `check_ranks` verifies an output.

use anyhow::{Result, bail, ensure};
use bitvec::{order::Lsb0, vec::BitVec};
use rayon::prelude::*;

use crate::list::{Index, NONE};

/// Verify that `next` and `head` form one chain covering `0..n` and ending
/// at `NONE`. Reports the first violation found.
pub fn validate_list(next: &[Index], head: Index) -> Result<()> {
    let n = next.len();
    ensure!(n > 0, "empty list");
    ensure!((head as usize) < n, "head {head} out of range (n = {n})");

    let mut has_pred: BitVec<u64, Lsb0> = BitVec::repeat(false, n);
    let mut tail: Option<usize> = None;
    for (i, &s) in next.iter().enumerate() {
        if s == NONE {
            if let Some(t) = tail {
                bail!("elements {t} and {i} both point at the sentinel");
            }
            tail = Some(i);
            continue;
        }
        if s as usize >= n {
            bail!("next[{i}] = {s} out of range (n = {n})");
        }
        if has_pred[s as usize] {
            bail!("element {s} has more than one predecessor (second is {i})");
        }
        has_pred.set(s as usize, true);
    }
    ensure!(tail.is_some(), "no element points at the sentinel");
    ensure!(!has_pred[head as usize], "head {head} has a predecessor");

    // one predecessor each and a headless head: the walk from head is a
    // simple path, anything it misses sits on a separate cycle
    let mut cur = head;
    let mut seen = 0usize;
    while cur != NONE {
        seen += 1;
        cur = next[cur as usize];
    }
    ensure!(seen == n, "only {seen} of {n} elements reachable from head {head}");
    Ok(())
}

/// Verify `rank` is a permutation of `0..n` with `rank[head] == 0` and
/// `rank[next[i]] == rank[i] + 1` along the list.
pub fn check_ranks(next: &[Index], head: Index, rank: &[Index]) -> Result<()> {
    let n = next.len();
    ensure!(rank.len() == n, "rank length {} != list length {n}", rank.len());
    ensure!((head as usize) < n, "head {head} out of range (n = {n})");
    ensure!(rank[head as usize] == 0, "rank[head] = {} (expected 0)", rank[head as usize]);

    let mut seen: BitVec<u64, Lsb0> = BitVec::repeat(false, n);
    for (i, &r) in rank.iter().enumerate() {
        if r as usize >= n {
            bail!("rank[{i}] = {r} out of range (n = {n})");
        }
        if seen[r as usize] {
            bail!("rank {r} assigned twice (again at element {i})");
        }
        seen.set(r as usize, true);
    }

    let last = (n - 1) as Index;
    let bad = (0..n).into_par_iter().find_first(|&i| match next[i] {
        NONE => rank[i] != last,
        s => rank[s as usize] != rank[i] + 1,
    });
    if let Some(i) = bad {
        match next[i] {
            NONE => bail!("tail element {i} has rank {} (expected {last})", rank[i]),
            s => bail!(
                "rank[{s}] = {} but its predecessor {i} has rank {}",
                rank[s as usize],
                rank[i]
            ),
        }
    }
    Ok(())
}
