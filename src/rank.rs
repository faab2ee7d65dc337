//! Pipeline orchestration: pack -> walk -> reduce -> combine.

use std::sync::atomic::AtomicU64;
use std::time::Instant;

use anyhow::{Context, Result, ensure};
use log::{debug, info};

use crate::boundary::Boundaries;
use crate::combine::combine;
use crate::list::{Index, LinkedList, MAX_LEN, SublistMeta};
use crate::reduce::ReducerKind;
use crate::validate::validate_list;
use crate::walk::{WalkMode, pack, walk};

/// Tunables for one ranking call.
#[derive(Clone, Debug, Default)]
pub struct RankOptions {
    /// Number of sublists / walker workers (k). `None` picks
    /// [`suggested_sublists`]. Larger k shortens each walk but lengthens the
    /// reducer's chain; the best value depends on hardware and n.
    pub sublists: Option<usize>,
    pub walk: WalkMode,
    pub reducer: ReducerKind,
    /// Run the O(n) single-cycle check before ranking.
    pub validate: bool,
}

/// Starting point for tuning k: about n/512, but never fewer than 64 walks
/// per rayon thread, clamped to `1..=n`.
pub fn suggested_sublists(n: usize) -> usize {
    let threads = rayon::current_num_threads().max(1);
    (n / 512).max(threads * 64).clamp(1, n.max(1))
}

/// Rank `list`, returning a fresh rank array.
pub fn rank_list(list: &LinkedList, opts: &RankOptions) -> Result<Vec<Index>> {
    let mut rank = try_filled(list.len(), 0 as Index, "rank array")?;
    rank_list_into(&list.next, list.head, &mut rank, opts)?;
    Ok(rank)
}

/// Rank into a caller-owned array. On error `rank` is left untouched.
///
/// `next` and `head` must form one chain over `0..n` ending at `NONE`;
/// this is only checked when `opts.validate` is set. A broken list can make
/// the walk loop forever or produce garbage ranks.
pub fn rank_list_into(
    next: &[Index],
    head: Index,
    rank: &mut [Index],
    opts: &RankOptions,
) -> Result<()> {
    let n = next.len();
    let k = check_args(next, head, rank, opts.sublists)?;
    if opts.validate {
        let t = Instant::now();
        validate_list(next, head).context("input is not a single list")?;
        debug!("validate {:>6} ms", t.elapsed().as_millis());
    }

    // all transient storage up front, so allocation failure leaves `rank` alone
    let mut buf: Vec<AtomicU64> = try_reserved(n, "working buffer")?;
    let mut meta = try_filled(k, SublistMeta::default(), "sublist metadata")?;
    let mut base = try_filled(k, 0 as Index, "base offsets")?;
    let bounds = Boundaries::new(head, k as Index);
    let reducer = opts.reducer.reducer();

    info!(
        "ranking n={} k={} walk={:?} reducer={}",
        n,
        k,
        opts.walk,
        reducer.name()
    );
    let t_all = Instant::now();

    let t = Instant::now();
    pack(next, &mut buf);
    debug!("pack    {:>6} ms", t.elapsed().as_millis());

    let t = Instant::now();
    walk(opts.walk, next, &bounds, &buf, &mut meta);
    info!("walk    {:>6} ms", t.elapsed().as_millis());

    let t = Instant::now();
    reducer.base_offsets(&meta, bounds.head_id(), &mut base);
    debug!("reduce  {:>6} ms", t.elapsed().as_millis());

    let t = Instant::now();
    combine(&buf, &base, rank);
    debug!("combine {:>6} ms", t.elapsed().as_millis());

    info!("ranked in {} ms", t_all.elapsed().as_millis());
    Ok(())
}

/// O(1) argument checks shared by every backend; returns the resolved k.
pub(crate) fn check_args(
    next: &[Index],
    head: Index,
    rank: &[Index],
    sublists: Option<usize>,
) -> Result<usize> {
    let n = next.len();
    ensure!(n > 0, "list is empty");
    ensure!(n <= MAX_LEN, "list length {n} exceeds {MAX_LEN}");
    ensure!(
        rank.len() == n,
        "rank array length {} != list length {n}",
        rank.len()
    );
    ensure!((head as usize) < n, "head {head} out of range (n = {n})");
    let k = sublists.unwrap_or_else(|| suggested_sublists(n));
    ensure!((1..=n).contains(&k), "sublist count {k} outside 1..={n}");
    Ok(k)
}

pub(crate) fn try_reserved<T>(len: usize, what: &str) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(reserve_len(len))
        .with_context(|| format!("allocating {what} ({len} entries)"))?;
    Ok(v)
}

#[cfg(not(test))]
#[inline(always)]
fn reserve_len(len: usize) -> usize {
    len
}

#[cfg(test)]
thread_local! {
    static FAIL_RESERVE: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

// lets tests make every reservation on this thread overflow
#[cfg(test)]
fn reserve_len(len: usize) -> usize {
    if FAIL_RESERVE.with(|f| f.get()) { usize::MAX } else { len }
}

pub(crate) fn try_filled<T: Clone>(len: usize, fill: T, what: &str) -> Result<Vec<T>> {
    let mut v = try_reserved(len, what)?;
    v.resize(len, fill);
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::NONE;

    fn opts(k: usize) -> RankOptions {
        RankOptions { sublists: Some(k), ..Default::default() }
    }

    #[test]
    fn five_element_scenario() {
        let list = LinkedList::new(vec![3, 4, 0, 1, NONE], 2);
        for k in 1..=5 {
            assert_eq!(rank_list(&list, &opts(k)).unwrap(), vec![1, 3, 0, 2, 4], "k={k}");
        }
    }

    #[test]
    fn single_element() {
        let list = LinkedList::new(vec![NONE], 0);
        assert_eq!(rank_list(&list, &opts(1)).unwrap(), vec![0]);
        assert_eq!(rank_list(&list, &RankOptions::default()).unwrap(), vec![0]);
    }

    #[test]
    fn all_modes_agree() {
        let list = LinkedList::new(vec![3, 4, 0, 1, NONE], 2);
        for walk in [WalkMode::Split, WalkMode::InPlace] {
            for reducer in [ReducerKind::Sequential, ReducerKind::PointerJump] {
                let o = RankOptions { sublists: Some(3), walk, reducer, validate: true };
                assert_eq!(rank_list(&list, &o).unwrap(), vec![1, 3, 0, 2, 4]);
            }
        }
    }

    #[test]
    fn bad_arguments_leave_rank_untouched() {
        let next = [3, 4, 0, 1, NONE];
        let mut rank = [7; 5];
        assert!(rank_list_into(&next, 2, &mut rank, &opts(0)).is_err());
        assert!(rank_list_into(&next, 2, &mut rank, &opts(6)).is_err());
        assert!(rank_list_into(&next, 5, &mut rank, &opts(2)).is_err());
        assert!(rank_list_into(&next, 2, &mut rank[..4], &opts(2)).is_err());
        assert!(rank_list_into(&[], 0, &mut [], &opts(1)).is_err());
        assert_eq!(rank, [7; 5]);
    }

    #[test]
    fn oversized_reservation_is_an_error() {
        let err = try_reserved::<u64>(usize::MAX, "working buffer").unwrap_err();
        assert!(err.to_string().contains("allocating working buffer"));
        assert!(try_filled(usize::MAX, 0u32, "base offsets").is_err());
        assert_eq!(try_reserved::<u64>(16, "x").unwrap().capacity(), 16);
    }

    #[test]
    fn allocation_failure_leaves_rank_untouched() {
        let next = [3, 4, 0, 1, NONE];
        let mut rank = [7; 5];
        FAIL_RESERVE.with(|f| f.set(true));
        let res = rank_list_into(&next, 2, &mut rank, &opts(2));
        FAIL_RESERVE.with(|f| f.set(false));
        let err = res.unwrap_err();
        assert!(err.to_string().contains("allocating"), "{err}");
        assert_eq!(rank, [7; 5]);
        rank_list_into(&next, 2, &mut rank, &opts(2)).unwrap();
        assert_eq!(rank, [1, 3, 0, 2, 4]);
    }

    #[test]
    fn broken_list_without_validation_is_safe() {
        // 0 -> 2 <- 1: two walks meet at 2; ranks are wrong but nothing races
        let list = LinkedList::new(vec![2, 2, NONE], 0);
        for walk in [WalkMode::Split, WalkMode::InPlace] {
            let o = RankOptions { sublists: Some(2), walk, ..Default::default() };
            if let Ok(rank) = rank_list(&list, &o) {
                assert!(crate::validate::check_ranks(&list.next, list.head, &rank).is_err());
            }
        }
    }

    #[test]
    fn validation_rejects_two_cycles() {
        // 0 -> 1 -> none, 2 <-> 3
        let list = LinkedList::new(vec![1, NONE, 3, 2], 0);
        let o = RankOptions { sublists: Some(2), validate: true, ..Default::default() };
        assert!(rank_list(&list, &o).is_err());
    }

    #[test]
    fn suggested_k_in_range() {
        assert_eq!(suggested_sublists(1), 1);
        assert_eq!(suggested_sublists(10), 10);
        let k = suggested_sublists(100_000_000);
        assert!(k >= 100_000_000 / 512 && k <= 100_000_000);
    }
}
