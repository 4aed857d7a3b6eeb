use std::cmp::Ordering;

use crate::vecfunc::JoinValue;

use super::point::{PointSet, PointVec};
use super::{calc_mid, TreeBase, UpperBoundIndex};

/// Prefix search over a single lane: points sorted once by `cmp_lane`,
/// queries binary-search the strict prefix below the probe.
pub struct SingleAxis<T, const D: usize> {
    base: TreeBase<T, D>,
    cmp_lane: usize,
    res_h: u32,
}

impl<T: JoinValue, const D: usize> SingleAxis<T, D> {
    pub fn with_lane(pts: PointSet<T, D>, chunk_size: u32, cmp_lane: usize) -> Self {
        let mut base = TreeBase::new(pts, chunk_size);
        base.alloc_helpers(1);
        base.fill_helper(0);
        base.sort_helper(0, cmp_lane, 0, base.size);
        SingleAxis {
            base,
            cmp_lane,
            res_h: 0,
        }
    }
}

impl<T: JoinValue, const D: usize> UpperBoundIndex<T, D> for SingleAxis<T, D> {
    fn query(&mut self, upper: &PointVec<T, D>) -> u32 {
        let size = self.base.size;
        if size == 0 {
            self.res_h = 0;
            return 0;
        }
        let pivot = upper[self.cmp_lane];
        let arr = self.base.helper(0);
        let first = self.base.pts.lane(arr[0], self.cmp_lane);
        let last = self.base.pts.lane(arr[size as usize - 1], self.cmp_lane);
        self.res_h = if first.total_cmp(&pivot) != Ordering::Less {
            0
        } else if last.total_cmp(&pivot) == Ordering::Less {
            size
        } else {
            self.base
                .binary_search_upper(0, 0, size, pivot, self.cmp_lane)
        };
        self.res_h
    }

    fn fetch_query<const FILTER: bool>(&mut self, upper: &PointVec<T, D>, out: &mut Vec<u32>) {
        self.base.append_range::<FILTER>(0, 0, self.res_h, upper, out);
    }
}

/// One sorted permutation per lane, queried with a multi-axis binary
/// search: at each step only the lanes that would descend left survive;
/// when a single lane remains its prefix is finished with an ordinary
/// upper-bound search. Yields the tightest single-axis prefix in
/// O(log n) probes.
pub struct MultiAxis1D<T, const D: usize> {
    base: TreeBase<T, D>,
    res_h: u32,
    res_lane: usize,
    dims_a: Vec<usize>,
    dims_b: Vec<usize>,
}

impl<T: JoinValue, const D: usize> MultiAxis1D<T, D> {
    pub fn new(pts: PointSet<T, D>, chunk_size: u32) -> Self {
        let lanes = PointVec::<T, D>::LANES;
        let mut base = TreeBase::new(pts, chunk_size);
        base.alloc_helpers(lanes as u32);
        for lane in 0..lanes {
            base.fill_helper(lane as u32);
            base.sort_helper(lane as u32, lane, 0, base.size);
        }
        MultiAxis1D {
            base,
            res_h: 0,
            res_lane: 0,
            dims_a: Vec::with_capacity(lanes),
            dims_b: Vec::with_capacity(lanes),
        }
    }
}

impl<T: JoinValue, const D: usize> UpperBoundIndex<T, D> for MultiAxis1D<T, D> {
    fn query(&mut self, upper: &PointVec<T, D>) -> u32 {
        let lanes = PointVec::<T, D>::LANES;
        let size = self.base.size;
        if size == 0 {
            self.res_h = 0;
            self.res_lane = 0;
            return 0;
        }

        // If any lane's smallest key already fails, nothing can dominate.
        for lane in 0..lanes {
            let front = self.base.pts.lane(self.base.helper(lane as u32)[0], lane);
            if front.total_cmp(&upper[lane]) != Ordering::Less {
                self.res_h = 0;
                self.res_lane = 0;
                return 0;
            }
        }

        let mut participating = std::mem::take(&mut self.dims_a);
        let mut next = std::mem::take(&mut self.dims_b);
        participating.clear();
        participating.extend(0..lanes);

        let mut l = 0u32;
        let mut h = size;
        while participating.len() > 1 && l < h {
            let mid = calc_mid(l, h);
            next.clear();
            for &lane in &participating {
                let key = self
                    .base
                    .pts
                    .lane(self.base.helper(lane as u32)[mid as usize], lane);
                if key.total_cmp(&upper[lane]) != Ordering::Less {
                    next.push(lane);
                }
            }
            if !next.is_empty() {
                std::mem::swap(&mut participating, &mut next);
                h = mid; // go left
            } else {
                l = mid + 1; // every lane goes right
            }
        }

        self.res_lane = participating[0];
        self.res_h = if l < h {
            self.base
                .binary_search_upper(self.res_lane as u32, l, h, upper[self.res_lane], self.res_lane)
        } else {
            h
        };

        self.dims_a = participating;
        self.dims_b = next;
        self.res_h
    }

    fn fetch_query<const FILTER: bool>(&mut self, upper: &PointVec<T, D>, out: &mut Vec<u32>) {
        self.base
            .append_range::<FILTER>(self.res_lane as u32, 0, self.res_h, upper, out);
    }
}
