use std::cmp::Ordering;

use crate::vecfunc::JoinValue;

use super::point::{PointSet, PointVec};
use super::{PairableTree, TreeBase, UpperBoundIndex};

/// Two-lane index with fractional cascading. Points are cut into
/// chunk-sized groups in `d1` order and each group is sorted by `d2`; the
/// cascade table records, for every distinct `d2` level, each group's first
/// position above that level. A query is then two upper-bound searches and
/// one row sum, with no per-group binary search.
pub struct CascadeTree2D<T, const D: usize> {
    base: TreeBase<T, D>,
    groups_size: u32,
    groups_count: u32,
    d1: usize,
    d2: usize,
    sorted_d1: Vec<T>,
    sorted_d2: Vec<T>,
    fractional: Vec<u32>,
    g_ind: Vec<u32>,
    g_end: Vec<u32>,
    res_group: u32,
    res_ind: u32,
}

impl<T: JoinValue, const D: usize> CascadeTree2D<T, D> {
    pub fn with_lanes(pts: PointSet<T, D>, chunk_size: u32, d1: usize, d2: usize) -> Self {
        let base = TreeBase::new(pts, chunk_size);
        let mut tree = CascadeTree2D {
            base,
            groups_size: 0,
            groups_count: 0,
            d1,
            d2,
            sorted_d1: Vec::new(),
            sorted_d2: Vec::new(),
            fractional: Vec::new(),
            g_ind: Vec::new(),
            g_end: Vec::new(),
            res_group: 0,
            res_ind: 0,
        };
        tree.build();
        tree
    }

    fn build(&mut self) {
        self.base.alloc_helpers(1);
        let size = self.base.size;
        if size == 0 {
            return;
        }

        let chunk = self.base.chunk_size;
        self.groups_count = (size + chunk - 1) / chunk;
        self.groups_size = (size + self.groups_count - 1) / self.groups_count;

        for g in 0..self.groups_count {
            self.g_ind.push(g * self.groups_size);
            self.g_end.push(if g + 1 == self.groups_count {
                size
            } else {
                (g + 1) * self.groups_size
            });
        }

        self.base.fill_helper(0);
        self.base.sort_helper(0, self.d1, 0, size);
        for g in 0..self.groups_count as usize {
            let front = self.base.helper(0)[self.g_ind[g] as usize];
            self.sorted_d1.push(self.base.pts.lane(front, self.d1));
            self.base
                .sort_helper(0, self.d2, self.g_ind[g], self.g_end[g]);
        }

        self.cascade();
    }

    /// Dense cascade: one table row per distinct d2 value. `g_ind` walks
    /// each group front past the current level; rows record the fronts
    /// after consumption, and a final sentinel row holds the group ends.
    fn cascade(&mut self) {
        let gc = self.groups_count as usize;
        let key = |tree: &Self, g: usize| -> Option<T> {
            let (i, e) = (tree.g_ind[g], tree.g_end[g]);
            (i < e).then(|| tree.base.pts.lane(tree.base.helper(0)[i as usize], tree.d2))
        };

        let mut min_v: Option<T> = None;
        for g in 0..gc {
            min_v = min_opt(min_v, key(self, g));
        }

        while let Some(level) = min_v {
            self.sorted_d2.push(level);
            let mut new_min: Option<T> = None;
            for g in 0..gc {
                while let Some(front) = key(self, g) {
                    if front.total_cmp(&level) == Ordering::Greater {
                        new_min = min_opt(new_min, Some(front));
                        break;
                    }
                    self.g_ind[g] += 1;
                }
            }
            for g in 0..gc {
                self.fractional.push(self.g_ind[g]);
            }
            min_v = new_min;
        }

        // Sentinel row: everything; then reset the walking fronts.
        for g in 0..gc {
            self.fractional.push(self.g_end[g]);
            self.g_ind[g] = g as u32 * self.groups_size;
        }
    }
}

#[inline]
fn min_opt<T: JoinValue>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(x), Some(y)) => Some(if y.total_cmp(&x) == Ordering::Less { y } else { x }),
        (x, None) => x,
        (None, y) => y,
    }
}

impl<T: JoinValue, const D: usize> UpperBoundIndex<T, D> for CascadeTree2D<T, D> {
    fn query(&mut self, upper: &PointVec<T, D>) -> u32 {
        if self.groups_count == 0 {
            self.res_group = 0;
            self.res_ind = 0;
            return 0;
        }

        let (p1, p2) = (upper[self.d1], upper[self.d2]);
        self.res_group = self
            .sorted_d1
            .partition_point(|v| v.total_cmp(&p1) != Ordering::Greater) as u32;
        self.res_ind = self
            .sorted_d2
            .partition_point(|v| v.total_cmp(&p2) != Ordering::Greater) as u32;

        let gc = self.groups_count as usize;
        let row = &self.fractional[self.res_ind as usize * gc..(self.res_ind as usize + 1) * gc];
        (0..self.res_group as usize)
            .map(|g| row[g] - self.g_ind[g])
            .sum()
    }

    fn fetch_query<const FILTER: bool>(&mut self, upper: &PointVec<T, D>, out: &mut Vec<u32>) {
        let gc = self.groups_count as usize;
        if gc == 0 {
            return;
        }
        let row = &self.fractional[self.res_ind as usize * gc..(self.res_ind as usize + 1) * gc];
        for g in 0..self.res_group as usize {
            self.base
                .append_range::<FILTER>(0, self.g_ind[g], row[g], upper, out);
        }
    }
}

impl<T: JoinValue, const D: usize> PairableTree<T, D> for CascadeTree2D<T, D> {
    fn with_lanes(pts: PointSet<T, D>, chunk_size: u32, d1: usize, d2: usize) -> Self {
        CascadeTree2D::with_lanes(pts, chunk_size, d1, d2)
    }
}
