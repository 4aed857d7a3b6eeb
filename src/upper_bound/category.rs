use std::collections::BTreeMap;

use crate::vecfunc::JoinValue;

use super::binary_search::SingleAxis;
use super::multi_tree::MultiAxisTree;
use super::point::{Lane, PointSet, PointVec};
use super::range_tree::RangeTree2D;
use super::{append_point, UpperBoundIndex};

/// Signature-partitioned index. Every point gets one bit per lane (set when
/// the lane value is above a fixed reference minimum); each non-empty
/// bucket is served by the structure matching its active-lane count:
/// take-all for trivial buckets, a single-lane prefix for one active lane,
/// a 2-D range tree for two, a multi-axis tree otherwise. Probes are
/// forwarded to every bucket and the sub-structures do the culling.
pub struct CategoryTree<T, const D: usize> {
    buckets: BTreeMap<u32, Vec<u32>>,
    take_all: Vec<u32>,
    f1: Vec<SingleAxis<T, D>>,
    f2: Vec<RangeTree2D<T, D>>,
    f_all: Vec<MultiAxisTree<T, D>>,
    pts: PointSet<T, D>,
}

impl<T: JoinValue, const D: usize> CategoryTree<T, D> {
    pub fn new(pts: PointSet<T, D>, chunk_size: u32) -> Self {
        let minimum = Self::reference_minimum();

        let mut buckets: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for &id in pts.ids() {
            buckets
                .entry(Self::signature(&pts.point(id).vector, &minimum))
                .or_default()
                .push(id);
        }

        let mut tree = CategoryTree {
            buckets: BTreeMap::new(),
            take_all: Vec::new(),
            f1: Vec::new(),
            f2: Vec::new(),
            f_all: Vec::new(),
            pts: pts.clone(),
        };

        for (&sig, ids) in &buckets {
            let count = ids.len();
            if count == 0 {
                continue;
            }
            if count <= chunk_size as usize || sig == 0 {
                tree.take_all.push(sig);
                continue;
            }
            let active = active_lanes(sig);
            let sub = pts.subset(ids.clone());
            match active.len() {
                0 => tree.take_all.push(sig),
                1 => tree
                    .f1
                    .push(SingleAxis::with_lane(sub, chunk_size, active[0])),
                2 => tree.f2.push(RangeTree2D::with_lanes(
                    sub,
                    chunk_size,
                    active[0],
                    active[1],
                )),
                _ => tree
                    .f_all
                    .push(MultiAxisTree::with_lanes(sub, chunk_size, active, 2)),
            }
        }

        tree.buckets = buckets;
        tree
    }

    /// Reference vector for the signature bits: zero on UP and IND lanes,
    /// the most negative regular value on DOWN lanes (which carry
    /// normalized gradients), shifted to a strict bound.
    fn reference_minimum() -> PointVec<T, D> {
        let mut minimum = PointVec::<T, D>::zero();
        for d in 0..D {
            minimum.set(d, Lane::Up, T::ZERO);
            minimum.set(d, Lane::Down, T::MIN_VALUE);
            minimum.set(d, Lane::Ind, T::ZERO);
        }
        minimum.nextafter();
        minimum
    }

    fn signature(v: &PointVec<T, D>, minimum: &PointVec<T, D>) -> u32 {
        let mut sig = 0u32;
        for lane in 0..PointVec::<T, D>::LANES {
            if v.lane(lane) > minimum.lane(lane) {
                sig |= 1 << lane;
            }
        }
        sig
    }
}

fn active_lanes(sig: u32) -> Vec<usize> {
    (0..u32::BITS as usize)
        .filter(|&lane| sig & (1 << lane) != 0)
        .collect()
}

impl<T: JoinValue, const D: usize> UpperBoundIndex<T, D> for CategoryTree<T, D> {
    fn query(&mut self, upper: &PointVec<T, D>) -> u32 {
        let mut count = 0u32;
        for sig in &self.take_all {
            count += self.buckets[sig].len() as u32;
        }
        for ds in &mut self.f1 {
            count += ds.query(upper);
        }
        for ds in &mut self.f2 {
            count += ds.query(upper);
        }
        for ds in &mut self.f_all {
            count += ds.query(upper);
        }
        count
    }

    fn fetch_query<const FILTER: bool>(&mut self, upper: &PointVec<T, D>, out: &mut Vec<u32>) {
        for sig in &self.take_all {
            for &id in &self.buckets[sig] {
                append_point::<FILTER, T, D>(&self.pts, id, upper, out);
            }
        }
        for ds in &mut self.f1 {
            ds.fetch_query::<FILTER>(upper, out);
        }
        for ds in &mut self.f2 {
            ds.fetch_query::<FILTER>(upper, out);
        }
        for ds in &mut self.f_all {
            ds.fetch_query::<FILTER>(upper, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upper_bound::testutil;

    #[test]
    fn test_category_contract() {
        // Small chunks force real sub-structures instead of take-all buckets.
        for chunk in [1, 4, 64, 512] {
            testutil::check_index_contract(CategoryTree::new, chunk, true);
        }
    }

    #[test]
    fn test_buckets_partition_the_points() {
        let pts = testutil::random_points::<2>(150, 23);
        let tree = CategoryTree::new(pts, 8);
        let total: usize = tree.buckets.values().map(Vec::len).sum();
        assert_eq!(total, 150, "every point must land in exactly one bucket");
    }

    #[test]
    fn test_active_lanes() {
        assert_eq!(active_lanes(0), Vec::<usize>::new());
        assert_eq!(active_lanes(0b101), vec![0, 2]);
        assert_eq!(active_lanes(0b100110), vec![1, 2, 5]);
    }

    #[test]
    fn test_empty_set() {
        let pts = testutil::random_points::<2>(0, 0);
        let mut ds = CategoryTree::new(pts, 8);
        let upper = testutil::random_upper::<2>(3);
        assert_eq!(ds.query(&upper), 0);
    }
}
