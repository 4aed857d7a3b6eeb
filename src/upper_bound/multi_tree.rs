use std::cmp::Ordering;
use std::mem;

use crate::vecfunc::JoinValue;

use super::point::{PointSet, PointVec};
use super::ranges::RangeQueue;
use super::{calc_mid, TreeBase, UpperBoundIndex};

/// Per-main-lane binary trees with alternative sub-sortings.
///
/// For every main lane the points are merge-sorted by that lane, and every
/// tree level keeps up to `sd` copies of its node blocks re-sorted by other
/// lanes (chosen by a derangement-style table). A query first runs a
/// multi-axis descent across the main lanes, re-queuing every all-go-right
/// range so its points are still examined later, then narrows each queued
/// range with the same multi-axis search over the winning lane's
/// sub-sortings.
pub struct MultiAxisTree<T, const D: usize> {
    base: TreeBase<T, D>,
    queue: RangeQueue,
    sorted: Vec<T>,
    cmp_dims: Vec<usize>,
    sub_d: Vec<usize>,
    sd: usize,
    sub_dim_count: usize,
    dims_a: Vec<usize>,
    dims_b: Vec<usize>,
}

impl<T: JoinValue, const D: usize> MultiAxisTree<T, D> {
    /// Tree over every lane. `sd` picks the named variant: 1 (single),
    /// 2 (double) or `3*D − 1` (full).
    pub fn new(pts: PointSet<T, D>, chunk_size: u32, sd: usize) -> Self {
        let lanes = PointVec::<T, D>::LANES;
        Self::with_lanes(pts, chunk_size, (0..lanes).collect(), sd)
    }

    /// Tree over a chosen subset of lanes (at least two).
    pub fn with_lanes(
        pts: PointSet<T, D>,
        chunk_size: u32,
        cmp_dims: Vec<usize>,
        sd: usize,
    ) -> Self {
        debug_assert!(sd >= 1, "at least one sub-sorting is required");
        debug_assert!(cmp_dims.len() >= 2, "a single-lane tree has no sub-lane");
        let lanes = PointVec::<T, D>::LANES;
        let base = TreeBase::new(pts, chunk_size);
        let queue = RangeQueue::with_capacity(base.max_depth as usize + 2);
        let sub_dim_count = sd.min(cmp_dims.len() - 1);
        let mut tree = MultiAxisTree {
            base,
            queue,
            sorted: Vec::new(),
            cmp_dims,
            sub_d: vec![0; lanes * sd],
            sd,
            sub_dim_count,
            dims_a: Vec::with_capacity(lanes),
            dims_b: Vec::with_capacity(lanes),
        };
        tree.build();
        tree
    }

    #[inline]
    fn dim_helper(&self, depth: u32, dim: usize, sub: usize) -> u32 {
        let lanes = PointVec::<T, D>::LANES;
        (lanes * self.sd) as u32 * depth + (self.sd * dim + sub) as u32
    }

    #[inline]
    fn sorted_key(&self, dim: usize, i: u32) -> T {
        self.sorted[dim * self.base.size as usize + i as usize]
    }

    /// Sub-lane table: for each main lane, the `sub_dim_count` other lanes
    /// examined at its tree levels, offset by the lane id so neighbouring
    /// mains start their rotation at different positions.
    fn build_sub_d(&mut self) {
        let cmp_count = self.cmp_dims.len();
        for i in 0..cmp_count {
            let d = self.cmp_dims[i];
            let m = (d % (self.sub_dim_count + 1)) as u32;
            let mut j = ((i as u32).wrapping_sub(m) % cmp_count as u32) as usize;
            let mut sub = 0;
            while sub < self.sub_dim_count {
                if j != i {
                    self.sub_d[d * self.sd + sub] = self.cmp_dims[j];
                    sub += 1;
                }
                j = (j + 1) % cmp_count;
            }
        }
    }

    fn build(&mut self) {
        let lanes = PointVec::<T, D>::LANES;
        let levels = self.base.max_depth + 1;
        self.base.alloc_helpers(levels * (lanes * self.sd) as u32);
        self.sorted = vec![T::ZERO; lanes * self.base.size as usize];
        if self.base.size == 0 {
            return;
        }

        self.build_sub_d();
        let splits = self.base.build_splits();
        let mains = self.cmp_dims.clone();
        for &d in &mains {
            self.build_lane_tree(d, &splits);
        }
    }

    fn build_lane_tree(&mut self, main_d: usize, splits: &[u32]) {
        let max_depth = self.base.max_depth;
        let size = self.base.size as usize;

        // Merge-sort the main lane bottom-up across the level slots.
        let h0 = self.dim_helper(0, main_d, 0);
        self.base.fill_helper(h0);
        for w in splits.windows(2) {
            self.base.sort_helper(h0, main_d, w[0], w[1]);
        }
        let mut jump = 1;
        for depth in 0..max_depth {
            let src = self.dim_helper(depth, main_d, 0);
            let dst = self.dim_helper(depth + 1, main_d, 0);
            self.base.merge_pairs(src, dst, splits, jump, main_d);
            jump *= 2;
        }

        // Flat keys for the outer descent.
        let hm = self.dim_helper(max_depth, main_d, 0);
        for i in 0..size {
            let id = self.base.helper(hm)[i];
            self.sorted[main_d * size + i] = self.base.pts.lane(id, main_d);
        }

        // Per-level sub-sortings: start from the full main sort, sort the
        // leaf blocks by the sub lane and merge back toward the root.
        for sub in 1..self.sub_dim_count {
            let dst = self.dim_helper(max_depth, main_d, sub);
            self.base.copy_helper(hm, dst);
        }
        for sub in 0..self.sub_dim_count {
            let sl = self.sub_d[main_d * self.sd + sub];
            let h = self.dim_helper(max_depth, main_d, sub);
            for w in splits.windows(2) {
                self.base.sort_helper(h, sl, w[0], w[1]);
            }
            let mut jump = 1;
            for depth in (1..=max_depth).rev() {
                let src = self.dim_helper(depth, main_d, sub);
                let dst = self.dim_helper(depth - 1, main_d, sub);
                self.base.merge_pairs(src, dst, splits, jump, sl);
                jump *= 2;
            }
        }
    }

    /// Multi-axis descent across the main lanes. All-go-right splits are
    /// queued so the skipped left halves are still sub-narrowed later.
    fn find_left_most(&mut self, upper: &PointVec<T, D>) -> (u32, u32, usize, u32) {
        let first = self.cmp_dims[0];
        for i in 0..self.cmp_dims.len() {
            let d = self.cmp_dims[i];
            if self.sorted_key(d, 0).total_cmp(&upper[d]) != Ordering::Less {
                return (0, 0, first, 0);
            }
        }

        let mut old = mem::take(&mut self.dims_a);
        let mut new = mem::take(&mut self.dims_b);
        old.clear();
        old.extend_from_slice(&self.cmp_dims);

        let mut lo = 0u32;
        let mut hi = self.base.size;
        let mut depth = 0u32;
        while depth < self.base.max_depth && old.len() > 1 && lo != hi {
            let mid = calc_mid(lo, hi);
            new.clear();
            for &d in &old {
                if self.sorted_key(d, mid).total_cmp(&upper[d]) != Ordering::Less {
                    new.push(d);
                }
            }
            if !new.is_empty() {
                mem::swap(&mut old, &mut new);
                hi = mid + 1; // go left
            } else {
                // Every lane goes right: the left half passes all main
                // tests and only needs sub-lane narrowing.
                self.queue.push(lo, mid + 1, depth + 1);
                lo = mid + 1;
            }
            depth += 1;
        }

        let dim = old[0];
        self.dims_a = old;
        self.dims_b = new;
        (lo, hi, dim, depth)
    }

    /// Multi-axis search over the sub-sortings of one queued range; shrinks
    /// `hi` and reports which sub-sorting the surviving prefix refers to.
    fn narrow_by_sub(
        &mut self,
        main_d: usize,
        depth: u32,
        lo: u32,
        hi: &mut u32,
        upper: &PointVec<T, D>,
    ) -> usize {
        if self.sd == 1 || self.sub_dim_count == 1 {
            let sl = self.sub_d[main_d * self.sd];
            let h = self.dim_helper(depth, main_d, 0);
            *hi = self.base.binary_search_upper(h, lo, *hi, upper[sl], sl);
            return 0;
        }

        for sub in 0..self.sub_dim_count {
            let sl = self.sub_d[main_d * self.sd + sub];
            let h = self.dim_helper(depth, main_d, sub);
            let front = self.base.pts.lane(self.base.helper(h)[lo as usize], sl);
            if front.total_cmp(&upper[sl]) != Ordering::Less {
                *hi = lo;
                return sub;
            }
        }

        let mut old = mem::take(&mut self.dims_a);
        let mut new = mem::take(&mut self.dims_b);
        old.clear();
        old.extend(0..self.sub_dim_count);

        let mut l = lo;
        let mut h = *hi;
        while old.len() > 1 && l < h {
            let mid = calc_mid(l, h);
            new.clear();
            for &sub in &old {
                let sl = self.sub_d[main_d * self.sd + sub];
                let hid = self.dim_helper(depth, main_d, sub);
                let key = self.base.pts.lane(self.base.helper(hid)[mid as usize], sl);
                if key.total_cmp(&upper[sl]) != Ordering::Less {
                    new.push(sub);
                }
            }
            if !new.is_empty() {
                mem::swap(&mut old, &mut new);
                h = mid; // go left
            } else {
                l = mid + 1;
            }
        }

        let sub = old[0];
        self.dims_a = old;
        self.dims_b = new;

        *hi = h;
        if l < h {
            let sl = self.sub_d[main_d * self.sd + sub];
            let hid = self.dim_helper(depth, main_d, sub);
            *hi = self.base.binary_search_upper(hid, l, h, upper[sl], sl);
        }
        sub
    }
}

impl<T: JoinValue, const D: usize> UpperBoundIndex<T, D> for MultiAxisTree<T, D> {
    fn query(&mut self, upper: &PointVec<T, D>) -> u32 {
        self.queue.reset();
        if self.base.size == 0 {
            return 0;
        }

        let (mut l, mut h, d, mut depth) = self.find_left_most(upper);
        let pivot = upper[d];

        while depth < self.base.max_depth && l != h {
            if self.sorted_key(d, h - 1).total_cmp(&pivot) == Ordering::Less {
                break;
            }
            if self.sorted_key(d, l).total_cmp(&pivot) != Ordering::Less {
                l = h;
                break;
            }
            let mid = calc_mid(l, h);
            if self.sorted_key(d, mid).total_cmp(&pivot) == Ordering::Less {
                self.queue.push(l, mid + 1, depth + 1);
                l = mid + 1;
            } else {
                h = mid + 1;
            }
            depth += 1;
        }
        if l != h {
            self.queue.push(l, h, depth);
        }

        // Narrow every queued (depth-addressed) range by its sub-lanes and
        // re-queue it addressed by the concrete helper slot.
        let pending = self.queue.range_count();
        for _ in 0..pending {
            let r = self.queue.pop();
            let mut hi = r.hi;
            let sub = self.narrow_by_sub(d, r.depth, r.lo, &mut hi, upper);
            if hi > r.lo {
                let helper_ind = self.dim_helper(r.depth, d, sub);
                let sl = self.sub_d[d * self.sd + sub];
                self.queue.push_sorted(r.lo, hi, helper_ind, sl as u32);
            }
        }

        self.queue.point_count()
    }

    fn fetch_query<const FILTER: bool>(&mut self, upper: &PointVec<T, D>, out: &mut Vec<u32>) {
        while !self.queue.is_empty() {
            let r = self.queue.pop();
            self.base
                .append_range::<FILTER>(r.depth, r.lo, r.hi, upper, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upper_bound::testutil;

    #[test]
    fn test_multi_axis_tree_contract_all_variants() {
        let lanes = PointVec::<i32, 2>::LANES;
        for sd in [1usize, 2, lanes - 1] {
            for chunk in [1, 16, 512] {
                testutil::check_index_contract(
                    |pts, c| MultiAxisTree::new(pts, c, sd),
                    chunk,
                    true,
                );
            }
        }
    }

    #[test]
    fn test_lane_subset_contract() {
        testutil::check_index_contract(
            |pts, c| MultiAxisTree::with_lanes(pts, c, vec![0, 3, 4], 2),
            16,
            true,
        );
    }

    #[test]
    fn test_sub_d_rotation_skips_main_lane() {
        let pts = testutil::random_points::<2>(64, 17);
        let lanes = PointVec::<i32, 2>::LANES;
        let tree = MultiAxisTree::new(pts, 8, 2);
        for d in 0..lanes {
            for sub in 0..tree.sub_dim_count {
                assert_ne!(
                    tree.sub_d[d * tree.sd + sub],
                    d,
                    "a main lane must never be its own sub-lane"
                );
            }
        }
    }

    #[test]
    fn test_empty_set() {
        let pts = testutil::random_points::<2>(0, 0);
        let mut ds = MultiAxisTree::new(pts, 8, 2);
        let upper = testutil::random_upper::<2>(3);
        assert_eq!(ds.query(&upper), 0);
    }
}
