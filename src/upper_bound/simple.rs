use crate::vecfunc::JoinValue;

use super::point::{PointSet, PointVec};
use super::{append_point, UpperBoundIndex};

/// Baseline store: no pruning at all. `query` reports nothing so the driver
/// always fetches; `fetch_query` walks the whole view. Also used for very
/// small category buckets where a tree would not pay for itself.
pub struct SimpleStore<T, const D: usize> {
    pts: PointSet<T, D>,
}

impl<T: JoinValue, const D: usize> SimpleStore<T, D> {
    pub fn new(pts: PointSet<T, D>, _chunk_size: u32) -> Self {
        SimpleStore { pts }
    }
}

impl<T: JoinValue, const D: usize> UpperBoundIndex<T, D> for SimpleStore<T, D> {
    fn query(&mut self, _upper: &PointVec<T, D>) -> u32 {
        0
    }

    fn fetch_query<const FILTER: bool>(&mut self, upper: &PointVec<T, D>, out: &mut Vec<u32>) {
        for &id in self.pts.ids() {
            append_point::<FILTER, T, D>(&self.pts, id, upper, out);
        }
    }
}
