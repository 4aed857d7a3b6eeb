use std::time::Instant;

use crate::stats::JoinStats;
use crate::vecfunc::{JoinValue, VecFunc};

#[derive(Debug, Clone, Copy)]
struct ValPoint<T> {
    v: T,
    p: u32,
}

/// Merge one player's marginal-value list into the running descending
/// merge, truncated to the allocation capacity.
fn merge_bid_points<T: JoinValue>(
    prev: &[ValPoint<T>],
    val: &VecFunc<'_, T, 1>,
    val_player: u32,
    out: &mut Vec<ValPoint<T>>,
    capacity: usize,
) {
    out.clear();
    let val_len = val.size[0] as usize;
    let (mut prev_i, mut val_i) = (0usize, 0usize);

    while out.len() < capacity && prev_i < prev.len() && val_i < val_len {
        if prev[prev_i].v > val.m[val_i] {
            out.push(prev[prev_i]);
            prev_i += 1;
        } else {
            out.push(ValPoint {
                v: val.m[val_i],
                p: val_player,
            });
            val_i += 1;
        }
    }
    while out.len() < capacity && prev_i < prev.len() {
        out.push(prev[prev_i]);
        prev_i += 1;
    }
    while out.len() < capacity && val_i < val_len {
        out.push(ValPoint {
            v: val.m[val_i],
            p: val_player,
        });
        val_i += 1;
    }
}

/// Greedy unit allocation: repeatedly merge the players' descending
/// marginal-value lists, keep the best `total` units, and count how many
/// units each player won. `alloc[p]` receives player `p`'s unit count.
///
/// Defined for one-dimensional bids only; the multidimensional problem is
/// what the join driver is for.
pub fn maille_tuffin<T: JoinValue, const BUILD_TIMING: bool>(
    bids: &[VecFunc<'_, T, 1>],
    total: u32,
    alloc: &mut [u32],
    stats: &mut JoinStats,
) {
    debug_assert!(alloc.len() >= bids.len());
    let start = Instant::now();
    alloc.fill(0);

    let capacity = total as usize;
    let mut merged: Vec<ValPoint<T>> = Vec::with_capacity(capacity);
    let mut scratch: Vec<ValPoint<T>> = Vec::with_capacity(capacity);

    for (player, bid) in bids.iter().enumerate() {
        merge_bid_points(&merged, bid, player as u32, &mut scratch, capacity);
        std::mem::swap(&mut merged, &mut scratch);
    }

    if BUILD_TIMING {
        stats.ds_build_time += start.elapsed();
    }

    for vp in &merged {
        alloc[vp.p as usize] += 1;
    }

    stats.total_runtime += start.elapsed();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vecfunc::OwnedVecFunc;

    fn run(bid_vals: Vec<Vec<i32>>, total: u32) -> Vec<u32> {
        let mut owned: Vec<OwnedVecFunc<i32, 1>> = bid_vals
            .into_iter()
            .map(|v| {
                let n = v.len() as u32;
                OwnedVecFunc::from_values(v, [n]).unwrap()
            })
            .collect();
        let bids: Vec<VecFunc<'_, i32, 1>> = owned.iter_mut().map(|o| o.view_mut()).collect();
        let mut alloc = vec![0u32; bids.len()];
        let mut stats = JoinStats::default();
        maille_tuffin::<i32, true>(&bids, total, &mut alloc, &mut stats);
        alloc
    }

    #[test]
    fn test_greedy_prefers_higher_marginals() {
        // Player 0 offers 9, 7, 1; player 1 offers 8, 2. Four units go to
        // the four highest marginals: 9, 8, 7, 2.
        let alloc = run(vec![vec![9, 7, 1], vec![8, 2]], 4);
        assert_eq!(alloc, vec![2, 2]);
    }

    #[test]
    fn test_truncates_to_total() {
        let alloc = run(vec![vec![5, 5, 5], vec![4, 4, 4]], 2);
        assert_eq!(alloc, vec![2, 0]);
    }

    #[test]
    fn test_ties_prefer_later_player() {
        // Equal marginals take the incoming player's unit first.
        let alloc = run(vec![vec![3], vec![3]], 1);
        assert_eq!(alloc, vec![0, 1]);
    }

    #[test]
    fn test_total_larger_than_supply() {
        let alloc = run(vec![vec![2, 1], vec![3]], 10);
        assert_eq!(alloc, vec![2, 1]);
    }
}
