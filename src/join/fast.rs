use std::time::Instant;

use tracing::debug;

use crate::stats::JoinStats;
use crate::upper_bound::{Lane, Point, PointSet, PointVec, UpperBoundIndex};
use crate::vecfunc::{IndexVec, JointVecFunc, JoinValue, VecFunc};

use super::brute::{check_point, join_row};

/// Gradient sampling interval for the dominance lanes.
pub(crate) const GRAD_INTERVAL: u32 = 1;

/// Rows whose admissible `b` block is smaller than this are cheaper to
/// brute-force than to query.
const BRUTE_ROW_THRESHOLD: u64 = 64;

/// Forward and backward gradients of `e` at `i` along axis `d`. The upper
/// edge has no forward step (0); the lower edge has no backward step and
/// reports the sentinel `MAX_VALUE`, which normalizes to the bottom of the
/// DOWN ordering.
#[inline]
pub(crate) fn up_down_val<T: JoinValue, const D: usize>(
    e: &VecFunc<'_, T, D>,
    i: IndexVec<D>,
    d: usize,
    cur_val: T,
) -> (T, T) {
    let mut up_val = T::ZERO;
    let mut down_val = T::MAX_VALUE;

    if i[d] + GRAD_INTERVAL < e.size[d] {
        let mut j = i;
        j[d] += GRAD_INTERVAL;
        up_val = e[j] - cur_val;
    }
    if i[d] >= GRAD_INTERVAL {
        let mut j = i;
        j[d] -= GRAD_INTERVAL;
        down_val = cur_val - e[j];
    }
    (up_val, down_val)
}

/// One dominance point per non-filtered cell of `e`. With `FILTER_GRAD`,
/// negative-valued cells and cells that are flat on some descent axis are
/// dropped: they cannot strictly dominate anything below them.
pub fn create_points<T: JoinValue, const D: usize, const FILTER_GRAD: bool>(
    e: &VecFunc<'_, T, D>,
) -> PointSet<T, D> {
    let mut points = Vec::with_capacity(e.total_size());

    'cells: for i_e in e.size.lex_iter() {
        let e_val = e[i_e];
        if FILTER_GRAD && e_val < T::ZERO {
            continue;
        }

        let mut vector = PointVec::<T, D>::zero();
        for d in 0..D {
            let (up_val, down_val) = up_down_val(e, i_e, d, e_val);
            if FILTER_GRAD && down_val < T::EPS {
                continue 'cells;
            }
            vector.set(d, Lane::Up, up_val);
            vector.set(d, Lane::Down, T::normalize_down(down_val));
            vector.set(d, Lane::Ind, T::from_index(i_e[d]));
        }
        points.push(Point {
            vector,
            ind: i_e,
            val: e_val,
        });
    }

    PointSet::from_points(points)
}

/// Derive the points of `v` and build one index over them, timed when the
/// bundle asks for it.
pub(crate) fn build_index<T, DS, F, const D: usize, const FILTER_GRAD: bool, const BUILD_TIMING: bool>(
    v: &VecFunc<'_, T, D>,
    chunk_size: u32,
    stats: &mut JoinStats,
    build: F,
) -> (PointSet<T, D>, DS)
where
    T: JoinValue,
    DS: UpperBoundIndex<T, D>,
    F: FnOnce(PointSet<T, D>, u32) -> DS,
{
    let total = v.total_size();

    let mut mark = BUILD_TIMING.then(Instant::now);
    let pts = create_points::<T, D, FILTER_GRAD>(v);
    stats.ds_pts += pts.len() as u64;
    stats.total_pts += total as u64;
    if let Some(t) = mark {
        stats.ds_create_points_time += t.elapsed();
        mark = Some(Instant::now());
    }

    let ds = build(pts.clone(), chunk_size);
    if let Some(t) = mark {
        stats.ds_build_time += t.elapsed();
    }
    debug!(points = pts.len(), total, chunk_size, "dominance index built");

    (pts, ds)
}

/// Index-accelerated join.
///
/// A probe is the mirror of the stored lanes: a `b` point can contribute to
/// `res[i_a + i_b]` only when `b.up <= a.down`, `a.up <= b.down` and
/// `b.ind < res.size - i_a` on every axis, which after normalization is
/// exactly strict dominance against the probe.
#[allow(clippy::too_many_arguments)]
pub(crate) fn join_fast<
    T,
    DS,
    F,
    const D: usize,
    const FILTER_GRAD: bool,
    const FILTER: bool,
    const BRUTE_OPT: bool,
    const COUNTERS: bool,
    const BUILD_TIMING: bool,
    const QUERY_TIMING: bool,
>(
    a: &mut VecFunc<'_, T, D>,
    b: &mut VecFunc<'_, T, D>,
    res: &mut JointVecFunc<'_, T, D>,
    chunk_size: u32,
    stats: &mut JoinStats,
    build: F,
) where
    T: JoinValue,
    DS: UpperBoundIndex<T, D>,
    F: FnOnce(PointSet<T, D>, u32) -> DS,
{
    res.reset();
    a.fix_rising();
    b.fix_rising();

    let (pts, mut ds) =
        build_index::<T, DS, F, D, FILTER_GRAD, BUILD_TIMING>(b, chunk_size, stats, build);

    let mut candidates: Vec<u32> = Vec::with_capacity(b.total_size());

    let mut expected = 0u64;
    let mut actual = 0u64;
    let mut actual_in_bound = 0u64;
    let mut actual_edge = 0u64;
    let mut brute_force = 0u64;
    let mut brute_force_count = 0u64;
    let mut total_count = 0u64;

    let a_limit = a.size.min(res.size());
    for i_a in a_limit.lex_iter() {
        let a_val = a[i_a];
        let b_limit = res.size().saturating_sub(i_a).min(b.size);
        let b_points_count = b_limit.size();
        if b_points_count == 0 {
            continue;
        }
        if BRUTE_OPT && b_points_count < BRUTE_ROW_THRESHOLD {
            join_row(i_a, a_val, b, b_limit, res);
            if COUNTERS {
                brute_force += b_points_count;
                brute_force_count += 1;
            }
            continue;
        }

        let mut mark = QUERY_TIMING.then(Instant::now);

        // Mirror probe: stored UP lanes are tested against our descent,
        // stored DOWN lanes against our ascent, stored indices against the
        // remaining room in the result grid.
        let mut upper = PointVec::<T, D>::zero();
        let mut row_valid = true;
        for d in 0..D {
            let (up_val, down_val) = up_down_val(a, i_a, d, a_val);
            if FILTER_GRAD && down_val < T::EPS {
                row_valid = false;
                break;
            }
            upper.set(d, Lane::Up, down_val);
            upper.set(d, Lane::Down, T::normalize_down(up_val));
            upper.set(d, Lane::Ind, T::from_index(b_limit[d] - 1));
        }
        if FILTER_GRAD && !row_valid {
            continue;
        }

        upper.nextafter();
        if COUNTERS {
            total_count += 1;
        }

        let max_pts_count = ds.query(&upper) as u64;
        if let Some(t) = mark {
            stats.ds_query_time += t.elapsed();
        }
        if COUNTERS {
            expected += max_pts_count;
        }

        if BRUTE_OPT && max_pts_count >= b_points_count {
            join_row(i_a, a_val, b, b_limit, res);
            if COUNTERS {
                brute_force += b_points_count;
                brute_force_count += 1;
            }
            continue;
        }

        if QUERY_TIMING {
            mark = Some(Instant::now());
        }
        candidates.clear();
        ds.fetch_query::<FILTER>(&upper, &mut candidates);
        if let Some(t) = mark {
            stats.ds_query_fetch_time += t.elapsed();
        }
        if COUNTERS {
            actual += candidates.len() as u64;
            actual_in_bound += candidates.len() as u64;
        }

        for &id in &candidates {
            let p = pts.point(id);
            if COUNTERS && b.is_edge(&p.ind) {
                actual_edge += 1;
            }
            if !p.ind.less(&b_limit) {
                if COUNTERS {
                    actual_in_bound -= 1;
                }
                continue;
            }
            check_point(i_a, a_val, p.ind, p.val, res);
        }
    }

    if COUNTERS {
        let non_brute = total_count - brute_force_count.min(total_count);
        if total_count > 0 {
            stats.expected_compared_points += expected as f64 / total_count as f64;
        }
        if non_brute > 0 {
            stats.compared_points += actual as f64 / non_brute as f64;
            stats.compared_in_bound_points = actual_in_bound as f64 / non_brute as f64;
            stats.compared_edge_points = actual_edge as f64 / non_brute as f64;
        }
        if brute_force_count > 0 {
            stats.compared_brute_force += brute_force as f64 / brute_force_count as f64;
        }
        stats.brute_force_count += brute_force_count as f64;
        stats.total_queries += total_count;
    }
}
