//! Seeded random single-cycle lists, for tests, benches and the CLI.

use anyhow::{Result, ensure};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::list::{Index, LinkedList, MAX_LEN, NONE};

/// Uniformly random list over `0..n`: a shuffled visiting order turned into
/// successor links.
pub fn random_list(n: usize, seed: u64) -> Result<LinkedList> {
    ensure!(n > 0, "list length must be positive");
    ensure!(n <= MAX_LEN, "list length {n} exceeds {MAX_LEN}");

    let mut rng = StdRng::seed_from_u64(seed);
    let mut order: Vec<Index> = (0..n as Index).collect();
    order.shuffle(&mut rng);

    let mut next = vec![NONE; n];
    for w in order.windows(2) {
        next[w[0] as usize] = w[1];
    }
    Ok(LinkedList::new(next, order[0]))
}

/// The identity-order list `0 -> 1 -> ... -> n-1`. Walks over it read
/// memory sequentially; handy as a locality best case in benches.
pub fn sequential_list(n: usize) -> Result<LinkedList> {
    ensure!(n > 0, "list length must be positive");
    ensure!(n <= MAX_LEN, "list length {n} exceeds {MAX_LEN}");
    let next = (1..=n as Index)
        .map(|s| if s as usize == n { NONE } else { s })
        .collect();
    Ok(LinkedList::new(next, 0))
}
