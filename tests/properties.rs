use listrank::{RankOptions, ReducerKind, WalkMode, check_ranks, random_list, rank_list};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ranks_match_sequential_walk(
        n in 1usize..2_000,
        k_frac in 0.0f64..=1.0,
        seed in any::<u64>(),
        in_place in any::<bool>(),
        jump in any::<bool>(),
    ) {
        let list = random_list(n, seed).unwrap();
        let k = ((n as f64 * k_frac) as usize).clamp(1, n);
        let opts = RankOptions {
            sublists: Some(k),
            walk: if in_place { WalkMode::InPlace } else { WalkMode::Split },
            reducer: if jump { ReducerKind::PointerJump } else { ReducerKind::Sequential },
            validate: true,
        };
        let rank = rank_list(&list, &opts).unwrap();
        prop_assert!(check_ranks(&list.next, list.head, &rank).is_ok());
        prop_assert_eq!(rank, list.rank_sequential());
    }

    #[test]
    fn any_two_k_agree(n in 2usize..5_000, a in 1usize..5_000, b in 1usize..5_000, seed in any::<u64>()) {
        let list = random_list(n, seed).unwrap();
        let ra = rank_list(&list, &RankOptions { sublists: Some(a.min(n)), ..Default::default() }).unwrap();
        let rb = rank_list(&list, &RankOptions { sublists: Some(b.min(n)), ..Default::default() }).unwrap();
        prop_assert_eq!(ra, rb);
    }
}
