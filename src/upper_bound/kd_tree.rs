use std::cmp::Ordering;

use crate::vecfunc::JoinValue;

use super::point::{PointSet, PointVec};
use super::ranges::RangeQueue;
use super::{calc_mid, TreeBase, UpperBoundIndex};

/// Median-partitioned tree cycling through every lane by depth
/// (`axis = depth mod 3·D`), with leaf buckets sorted along their axis.
/// Queries run the usual early-termination rule over an explicit range
/// queue instead of recursion: the right child is visited only when the
/// median passes, the left child always.
pub struct KdTree<T, const D: usize> {
    base: TreeBase<T, D>,
    queue: RangeQueue,
    median: Vec<T>,
}

impl<T: JoinValue, const D: usize> KdTree<T, D> {
    pub fn new(pts: PointSet<T, D>, chunk_size: u32) -> Self {
        let base = TreeBase::new(pts, chunk_size);
        let queue = RangeQueue::with_capacity((1usize << base.max_depth) + 2);
        let mut tree = KdTree {
            base,
            queue,
            median: Vec::new(),
        };
        tree.build();
        tree
    }

    #[inline]
    fn axis(depth: u32) -> usize {
        depth as usize % PointVec::<T, D>::LANES
    }

    fn build(&mut self) {
        self.base.alloc_helpers(1);
        self.base.fill_helper(0);
        self.median = vec![T::ZERO; self.base.size as usize];
        if self.base.size > 0 {
            self.build_node(0, self.base.size, 0);
        }
    }

    fn build_node(&mut self, l: u32, h: u32, depth: u32) {
        if h - l <= 1 {
            return;
        }
        let axis = Self::axis(depth);
        if depth == self.base.max_depth {
            self.base.sort_helper(0, axis, l, h);
            return;
        }

        let mid = calc_mid(l, h);
        let mid_id = self.base.partition_helper(0, axis, mid, l, h);
        self.median[mid as usize] = self.base.pts.lane(mid_id, axis);

        // The left subtree includes the median position.
        self.build_node(l, mid + 1, depth + 1);
        self.build_node(mid + 1, h, depth + 1);
    }
}

impl<T: JoinValue, const D: usize> UpperBoundIndex<T, D> for KdTree<T, D> {
    fn query(&mut self, upper: &PointVec<T, D>) -> u32 {
        self.queue.reset();
        self.queue.push(0, self.base.size, 0);

        while !self.queue.is_empty() && self.queue.peek_depth() <= self.base.max_depth {
            let r = self.queue.pop();
            if r.lo >= r.hi {
                continue;
            }
            let axis = Self::axis(r.depth);
            if r.depth == self.base.max_depth {
                let h = self
                    .base
                    .binary_search_upper(0, r.lo, r.hi, upper[axis], axis);
                if h > r.lo {
                    self.queue.push(r.lo, h, r.depth + 1);
                }
            } else {
                let mid = calc_mid(r.lo, r.hi);
                if self.median[mid as usize].total_cmp(&upper[axis]) == Ordering::Less {
                    // Some right-side points may still pass this axis.
                    self.queue.push(mid + 1, r.hi, r.depth + 1);
                }
                // The left side can always hold smaller items.
                self.queue.push(r.lo, mid + 1, r.depth + 1);
            }
        }

        self.queue.point_count()
    }

    fn fetch_query<const FILTER: bool>(&mut self, upper: &PointVec<T, D>, out: &mut Vec<u32>) {
        while !self.queue.is_empty() {
            let r = self.queue.pop();
            self.base
                .append_range::<FILTER>(0, r.lo, r.hi, upper, out);
        }
    }
}
