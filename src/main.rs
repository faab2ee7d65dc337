//! listrank – rank a linked list in parallel
//!  * -n N      – rank a random N-element list (seeded)
//!  * -i FILE   – rank a list read from a text file
//!  * --check   – verify the result in one extra O(n) pass
use std::time::Instant;
use log::info;
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgGroup, Command};
use env_logger;

use listrank::{
    LinkedList, RankOptions, ReducerKind, WalkMode, check_ranks, io, random_list, rank_list,
    suggested_sublists,
};

fn cli() -> Command {
    Command::new("listrank")
        .about("Parallel list ranking")
        .arg(
            Arg::new("len")
                .short('n')
                .long("len")
                .help("Generate a random list with this many elements")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .help("List file: header `n head`, then n successors (`none` ends the list)"),
        )
        .group(
            ArgGroup::new("list")
                .args(["len", "input"])
                .required(true),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed for the random list")
                .value_parser(clap::value_parser!(u64))
                .default_value("42"),
        )
        .arg(
            Arg::new("sublists")
                .short('k')
                .long("sublists")
                .help("Number of sublists / walker workers (default: about n/512)")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("reducer")
                .long("reducer")
                .help("Sublist prefix-sum strategy")
                .value_parser(["sequential", "pointer-jump"])
                .default_value("sequential"),
        )
        .arg(
            Arg::new("in-place")
                .long("in-place")
                .help("Walk by reading successors back from the working buffer (baseline)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("validate")
                .long("validate")
                .help("Check the input is a single list before ranking")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .help("Verify the computed ranks")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .help("Worker threads (default: all cores)")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Write ranks, one per line"),
        )
        .arg(
            Arg::new("gpu")
                .long("gpu")
                .help("Rank on a CUDA device (needs the `gpu` feature)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("device")
                .long("device")
                .help("CUDA device ordinal")
                .value_parser(clap::value_parser!(usize))
                .requires("gpu")
                .default_value("0"),
        )
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env().init();
    let m = cli().get_matches();

    /* ─────────── Rayon pool ─────────── */
    let threads = m
        .get_one::<usize>("threads")
        .copied()
        .unwrap_or_else(num_cpus::get);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .context("build rayon pool")?;

    /* ─────────── Load or generate list ─────────── */
    let t0 = Instant::now();
    let list: LinkedList = if let Some(path) = m.get_one::<String>("input") {
        io::read_list(path)?
    } else {
        let n = *m.get_one::<usize>("len").context("missing --len")?;
        let seed = *m.get_one::<u64>("seed").context("missing --seed")?;
        random_list(n, seed)?
    };
    info!("list of {} ready in {} ms", list.len(), t0.elapsed().as_millis());

    let reducer: ReducerKind = m
        .get_one::<String>("reducer")
        .map(String::as_str)
        .unwrap_or("sequential")
        .parse()?;
    let opts = RankOptions {
        sublists: Some(
            m.get_one::<usize>("sublists")
                .copied()
                .unwrap_or_else(|| suggested_sublists(list.len())),
        ),
        walk: if m.get_flag("in-place") { WalkMode::InPlace } else { WalkMode::Split },
        reducer,
        validate: m.get_flag("validate"),
    };

    /* ─────────── Rank ─────────── */
    let rank = if m.get_flag("gpu") {
        let device = *m.get_one::<usize>("device").context("missing --device")?;
        rank_gpu(&list, &opts, device)?
    } else {
        rank_list(&list, &opts)?
    };

    if m.get_flag("check") {
        let t = Instant::now();
        check_ranks(&list.next, list.head, &rank).context("rank check failed")?;
        info!("check passed in {} ms", t.elapsed().as_millis());
    }

    /* ─────────── Write output ─────────── */
    if let Some(out) = m.get_one::<String>("output") {
        info!("Start writing output.");
        io::write_ranks(&rank, out)?;
    }
    Ok(())
}

#[cfg(feature = "gpu")]
fn rank_gpu(list: &LinkedList, opts: &RankOptions, device: usize) -> Result<Vec<listrank::Index>> {
    use listrank::rank_cu::{GpuOptions, rank_list_gpu};
    let mut rank = vec![0; list.len()];
    let gpu = GpuOptions { device, ..Default::default() };
    rank_list_gpu(&list.next, list.head, &mut rank, opts, &gpu)?;
    Ok(rank)
}

#[cfg(not(feature = "gpu"))]
fn rank_gpu(_list: &LinkedList, _opts: &RankOptions, _device: usize) -> Result<Vec<listrank::Index>> {
    anyhow::bail!("this build has no GPU support; rebuild with `--features gpu`")
}

#[cfg(test)]
mod tests {
    use super::cli;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn device_needs_gpu() {
        assert!(cli().try_get_matches_from(["listrank", "-n", "10", "--device", "1"]).is_err());
        let m = cli()
            .try_get_matches_from(["listrank", "-n", "10", "--gpu", "--device", "1"])
            .unwrap();
        assert_eq!(m.get_one::<usize>("device"), Some(&1));
        // the default alone does not demand --gpu
        assert!(cli().try_get_matches_from(["listrank", "-n", "10"]).is_ok());
    }

    #[test]
    fn reducer_names() {
        assert!(cli().try_get_matches_from(["listrank", "-n", "5", "--reducer", "host"]).is_err());
        let m = cli()
            .try_get_matches_from(["listrank", "-n", "5", "--reducer", "pointer-jump"])
            .unwrap();
        let r: listrank::ReducerKind = m.get_one::<String>("reducer").unwrap().parse().unwrap();
        assert_eq!(r, listrank::ReducerKind::PointerJump);
    }
}
