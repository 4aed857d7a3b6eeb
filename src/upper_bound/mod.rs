//! Upper-bound dominance indexes over 3-lanes-per-axis point sets.
//!
//! Every structure here is built once over a shared point arena, then
//! queried many times with a strictified probe vector. `query` returns an
//! estimate that never undercounts the dominated points; `fetch_query`
//! emits candidate arena ids, exactly filtered when `FILTER` is on.

pub mod binary_search;
pub mod cascading;
pub mod category;
pub mod kd_tree;
pub mod multi_tree;
pub mod point;
pub mod ranges;
pub mod range_tree;
pub mod simple;

pub use binary_search::{MultiAxis1D, SingleAxis};
pub use cascading::CascadeTree2D;
pub use category::CategoryTree;
pub use kd_tree::KdTree;
pub use multi_tree::MultiAxisTree;
pub use point::{Lane, Point, PointSet, PointVec};
pub use range_tree::{CascadePartial, PairedRangeTrees, RangeTree2D, RangeTreePartial};
pub use simple::SimpleStore;

use std::cmp::Ordering;

use crate::vecfunc::JoinValue;

/// Common query contract of the index family.
pub trait UpperBoundIndex<T: JoinValue, const D: usize> {
    /// Estimate of how many stored points dominate `upper`. May overcount,
    /// never undercounts; the caller filters on fetch.
    fn query(&mut self, upper: &PointVec<T, D>) -> u32;

    /// Append candidate arena ids for the ranges selected by the last
    /// `query`. With `FILTER` every emitted point strictly dominates
    /// `upper`; without it the caller re-checks.
    fn fetch_query<const FILTER: bool>(&mut self, upper: &PointVec<T, D>, out: &mut Vec<u32>);
}

/// Component trees that can serve as one lane pair of a paired wrapper.
pub(crate) trait PairableTree<T: JoinValue, const D: usize>: UpperBoundIndex<T, D> {
    fn with_lanes(pts: PointSet<T, D>, chunk_size: u32, d1: usize, d2: usize) -> Self;
}

#[inline]
pub(crate) fn calc_mid(l: u32, h: u32) -> u32 {
    debug_assert!(h > l);
    (h - l - 1) / 2 + l
}

#[inline]
pub(crate) fn append_point<const FILTER: bool, T: JoinValue, const D: usize>(
    pts: &PointSet<T, D>,
    id: u32,
    upper: &PointVec<T, D>,
    out: &mut Vec<u32>,
) {
    if !FILTER || pts.point(id).vector.less(upper) {
        out.push(id);
    }
}

/// Shared state of the permutation-based indexes: the point view, the tree
/// shape, and a flat pool of helper id arrays (one `size`-long permutation
/// per helper slot).
pub(crate) struct TreeBase<T, const D: usize> {
    pub pts: PointSet<T, D>,
    pub size: u32,
    pub chunk_size: u32,
    pub max_depth: u32,
    helpers: Vec<u32>,
}

impl<T: JoinValue, const D: usize> TreeBase<T, D> {
    pub fn new(pts: PointSet<T, D>, chunk_size: u32) -> Self {
        let size = pts.len() as u32;
        let chunk_size = chunk_size.max(1);
        let max_depth = if size == 0 {
            0
        } else {
            let log_n = 31 - size.leading_zeros();
            let log_chunk = 31 - chunk_size.leading_zeros();
            log_n.saturating_sub(log_chunk)
        };
        TreeBase {
            pts,
            size,
            chunk_size,
            max_depth,
            helpers: Vec::new(),
        }
    }

    pub fn alloc_helpers(&mut self, count: u32) {
        self.helpers = vec![0; count as usize * self.size as usize];
    }

    #[inline]
    pub fn helper(&self, h: u32) -> &[u32] {
        let n = self.size as usize;
        let start = h as usize * n;
        &self.helpers[start..start + n]
    }

    #[inline]
    fn helper_mut(&mut self, h: u32) -> &mut [u32] {
        let n = self.size as usize;
        let start = h as usize * n;
        &mut self.helpers[start..start + n]
    }

    /// Disjoint source/destination helper borrows for merge steps.
    fn helper_pair_mut(&mut self, src: u32, dst: u32) -> (&[u32], &mut [u32]) {
        debug_assert_ne!(src, dst);
        let n = self.size as usize;
        let (s, d) = (src as usize * n, dst as usize * n);
        if s < d {
            let (head, tail) = self.helpers.split_at_mut(d);
            (&head[s..s + n], &mut tail[..n])
        } else {
            let (head, tail) = self.helpers.split_at_mut(s);
            (&tail[..n], &mut head[d..d + n])
        }
    }

    pub fn fill_helper(&mut self, h: u32) {
        let pts = self.pts.clone();
        self.helper_mut(h).copy_from_slice(pts.ids());
    }

    pub fn copy_helper(&mut self, src: u32, dst: u32) {
        let (src_arr, dst_arr) = self.helper_pair_mut(src, dst);
        dst_arr.copy_from_slice(src_arr);
    }

    pub fn sort_helper(&mut self, h: u32, lane: usize, lo: u32, hi: u32) {
        let pts = self.pts.clone();
        let arr = self.helper_mut(h);
        arr[lo as usize..hi as usize]
            .sort_unstable_by(|&a, &b| pts.lane(a, lane).total_cmp(&pts.lane(b, lane)));
    }

    /// Partition `[lo, hi)` of a helper so position `k` holds its sorted
    /// element; returns that element's id.
    pub fn partition_helper(&mut self, h: u32, lane: usize, k: u32, lo: u32, hi: u32) -> u32 {
        let pts = self.pts.clone();
        let arr = self.helper_mut(h);
        let slice = &mut arr[lo as usize..hi as usize];
        slice.select_nth_unstable_by((k - lo) as usize, |&a, &b| {
            pts.lane(a, lane).total_cmp(&pts.lane(b, lane))
        });
        arr[k as usize]
    }

    /// One bottom-up merge level: combine adjacent sorted split blocks of
    /// `src` (block width `split_jump` in split units) into `dst`.
    pub fn merge_pairs(&mut self, src: u32, dst: u32, splits: &[u32], split_jump: usize, lane: usize) {
        let pts = self.pts.clone();
        let split_count = splits.len() - 1;
        let (src_arr, dst_arr) = self.helper_pair_mut(src, dst);

        let mut i = 0;
        while i + 2 * split_jump <= split_count {
            let l = splits[i] as usize;
            let m = splits[i + split_jump] as usize;
            let t = splits[i + 2 * split_jump] as usize;
            merge_by_lane(&pts, &src_arr[l..m], &src_arr[m..t], &mut dst_arr[l..t], lane);
            i += 2 * split_jump;
        }
    }

    /// First position in `[lo, hi)` of helper `h` whose lane key is not
    /// below `pivot`.
    pub fn binary_search_upper(&self, h: u32, lo: u32, hi: u32, pivot: T, lane: usize) -> u32 {
        let arr = self.helper(h);
        let off = arr[lo as usize..hi as usize]
            .partition_point(|&id| self.pts.lane(id, lane).total_cmp(&pivot) == Ordering::Less);
        lo + off as u32
    }

    /// Split boundaries of the implicit balanced tree: `2^max_depth`
    /// half-open blocks over `[0, size)` plus a final sentinel.
    pub fn build_splits(&self) -> Vec<u32> {
        let mut splits = vec![0u32, self.size];
        for _ in 0..self.max_depth {
            let mut next = Vec::with_capacity(splits.len() * 2 - 1);
            for w in splits.windows(2) {
                next.push(w[0]);
                next.push(calc_mid(w[0], w[1]) + 1);
            }
            next.push(self.size);
            splits = next;
        }
        splits
    }

    /// Append `[lo, hi)` of helper `h`, filtered when `FILTER` is on.
    pub fn append_range<const FILTER: bool>(
        &self,
        h: u32,
        lo: u32,
        hi: u32,
        upper: &PointVec<T, D>,
        out: &mut Vec<u32>,
    ) {
        let arr = self.helper(h);
        for &id in &arr[lo as usize..hi as usize] {
            append_point::<FILTER, T, D>(&self.pts, id, upper, out);
        }
    }
}

fn merge_by_lane<T: JoinValue, const D: usize>(
    pts: &PointSet<T, D>,
    left: &[u32],
    right: &[u32],
    dst: &mut [u32],
    lane: usize,
) {
    let (mut i, mut j, mut k) = (0, 0, 0);
    while i < left.len() && j < right.len() {
        if pts.lane(left[i], lane).total_cmp(&pts.lane(right[j], lane)) == Ordering::Less {
            dst[k] = left[i];
            i += 1;
        } else {
            dst[k] = right[j];
            j += 1;
        }
        k += 1;
    }
    while i < left.len() {
        dst[k] = left[i];
        i += 1;
        k += 1;
    }
    while j < right.len() {
        dst[k] = right[j];
        j += 1;
        k += 1;
    }
}
