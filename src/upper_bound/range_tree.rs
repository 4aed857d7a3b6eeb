use std::cmp::Ordering;
use std::marker::PhantomData;

use crate::vecfunc::JoinValue;

use super::cascading::CascadeTree2D;
use super::point::{PointSet, PointVec};
use super::ranges::RangeQueue;
use super::{calc_mid, PairableTree, TreeBase, UpperBoundIndex};

/// Balanced binary tree over lane `d1` with, at every level, the same
/// points re-sorted by lane `d2` inside each node block (built bottom-up by
/// pairwise merging). Queries descend by `d1` with flat-key early-outs;
/// every block that fully passes the `d1` test is narrowed by a `d2`
/// binary search in that level's helper.
pub struct RangeTree2D<T, const D: usize> {
    base: TreeBase<T, D>,
    queue: RangeQueue,
    sorted_d1: Vec<T>,
    d1: usize,
    d2: usize,
}

impl<T: JoinValue, const D: usize> RangeTree2D<T, D> {
    pub fn with_lanes(pts: PointSet<T, D>, chunk_size: u32, d1: usize, d2: usize) -> Self {
        let base = TreeBase::new(pts, chunk_size);
        let queue = RangeQueue::with_capacity(base.max_depth as usize + 2);
        let mut tree = RangeTree2D {
            base,
            queue,
            sorted_d1: Vec::new(),
            d1,
            d2,
        };
        tree.build();
        tree
    }

    fn build(&mut self) {
        let max_depth = self.base.max_depth;
        self.base.alloc_helpers(max_depth + 1);
        if self.base.size == 0 {
            return;
        }

        let splits = self.base.build_splits();

        // Top level: full d1 sort; keep the flat keys for pivoting.
        self.base.fill_helper(max_depth);
        self.base.sort_helper(max_depth, self.d1, 0, self.base.size);
        self.sorted_d1 = self
            .base
            .helper(max_depth)
            .iter()
            .map(|&id| self.base.pts.lane(id, self.d1))
            .collect();

        // Leaf blocks by d2, then merge pairs down toward the root level.
        for w in splits.windows(2) {
            self.base.sort_helper(max_depth, self.d2, w[0], w[1]);
        }
        let mut jump = 1;
        for depth in (1..=max_depth).rev() {
            self.base.merge_pairs(depth, depth - 1, &splits, jump, self.d2);
            jump *= 2;
        }
    }

    fn add_result_range(&mut self, upper: &PointVec<T, D>, lo: u32, hi: u32, depth: u32) {
        let hi = self
            .base
            .binary_search_upper(depth, lo, hi, upper[self.d2], self.d2);
        if lo < hi {
            self.queue.push(lo, hi, depth);
        }
    }
}

impl<T: JoinValue, const D: usize> UpperBoundIndex<T, D> for RangeTree2D<T, D> {
    fn query(&mut self, upper: &PointVec<T, D>) -> u32 {
        self.queue.reset();
        if self.base.size == 0 {
            return 0;
        }

        let mut l = 0u32;
        let mut h = self.base.size;
        let mut depth = 0u32;
        let pivot = upper[self.d1];

        while depth < self.base.max_depth {
            if self.sorted_d1[h as usize - 1].total_cmp(&pivot) == Ordering::Less {
                // The rightmost key passes: the whole range passes its d1 test.
                break;
            }
            if self.sorted_d1[l as usize].total_cmp(&pivot) != Ordering::Less {
                // The leftmost key fails: nothing in the range can pass.
                l = h;
                break;
            }

            let mid = calc_mid(l, h);
            if self.sorted_d1[mid as usize].total_cmp(&pivot) == Ordering::Less {
                // The left half passes its d1 test completely; keep it for
                // d2 narrowing and keep descending right.
                self.add_result_range(upper, l, mid + 1, depth + 1);
                l = mid + 1;
            } else {
                h = mid + 1;
            }
            depth += 1;
        }

        if l < h {
            self.add_result_range(upper, l, h, depth);
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

impl<T: JoinValue, const D: usize> PairableTree<T, D> for RangeTree2D<T, D> {
    fn with_lanes(pts: PointSet<T, D>, chunk_size: u32, d1: usize, d2: usize) -> Self {
        RangeTree2D::with_lanes(pts, chunk_size, d1, d2)
    }
}

/// One component tree per strided lane pair; `query` runs them all and
/// remembers the tightest, `fetch_query` delegates to it.
pub struct PairedRangeTrees<T, const D: usize, P, const J: usize> {
    trees: Vec<P>,
    size: u32,
    best: usize,
    _value: PhantomData<T>,
}

impl<T: JoinValue, const D: usize, P: PairableTree<T, D>, const J: usize>
    PairedRangeTrees<T, D, P, J>
{
    pub fn new(pts: PointSet<T, D>, chunk_size: u32) -> Self {
        let lanes = PointVec::<T, D>::LANES;
        let size = pts.len() as u32;
        let mut trees = Vec::new();
        let mut i = 0;
        while i < lanes {
            let m = i % 3;
            let j = if m == 0 { (i + 1) % lanes } else { (i - m) % lanes };
            trees.push(P::with_lanes(pts.clone(), chunk_size, i, j));
            i += J;
        }
        PairedRangeTrees {
            trees,
            size,
            best: 0,
            _value: PhantomData,
        }
    }
}

impl<T: JoinValue, const D: usize, P: PairableTree<T, D>, const J: usize> UpperBoundIndex<T, D>
    for PairedRangeTrees<T, D, P, J>
{
    fn query(&mut self, upper: &PointVec<T, D>) -> u32 {
        let mut count = self.size + 1;
        self.best = 0;
        for (i, tree) in self.trees.iter_mut().enumerate() {
            let c = tree.query(upper);
            if c < count {
                count = c;
                self.best = i;
            }
        }
        count
    }

    fn fetch_query<const FILTER: bool>(&mut self, upper: &PointVec<T, D>, out: &mut Vec<u32>) {
        self.trees[self.best].fetch_query::<FILTER>(upper, out);
    }
}

/// Partial (stride-2) lane pairing over plain 2-D range trees.
pub type RangeTreePartial<T, const D: usize> = PairedRangeTrees<T, D, RangeTree2D<T, D>, 2>;

/// Partial (stride-2) lane pairing over fractional-cascading trees.
pub type CascadePartial<T, const D: usize> = PairedRangeTrees<T, D, CascadeTree2D<T, D>, 2>;
