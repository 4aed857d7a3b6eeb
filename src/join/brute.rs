use crate::stats::JoinStats;
use crate::vecfunc::{IndexVec, JointVecFunc, JoinValue, VecFunc};

/// Relax one candidate pair into the result: strictly greater wins, so an
/// equal value keeps the first (lexicographically earliest) argmax.
#[inline]
pub(crate) fn check_point<T: JoinValue, const D: usize>(
    i_a: IndexVec<D>,
    a_val: T,
    i_b: IndexVec<D>,
    b_val: T,
    res: &mut JointVecFunc<'_, T, D>,
) {
    let i_res = i_a + i_b;
    let flat = i_res.flat(&res.func.size);
    let val = a_val + b_val;
    if res.func.m[flat] < val {
        res.func.m[flat] = val;
        res.arg[flat] = i_a;
    }
}

/// Relax every `i_b` below `b_limit` against one row of `a`.
#[inline]
pub(crate) fn join_row<T: JoinValue, const D: usize>(
    i_a: IndexVec<D>,
    a_val: T,
    b: &VecFunc<'_, T, D>,
    b_limit: IndexVec<D>,
    res: &mut JointVecFunc<'_, T, D>,
) {
    for i_b in b_limit.lex_iter() {
        check_point(i_a, a_val, i_b, b[i_b], res);
    }
}

/// Reference join: every admissible pair, no index.
pub fn join_brute_force<T: JoinValue, const D: usize, const COUNTERS: bool>(
    a: &VecFunc<'_, T, D>,
    b: &VecFunc<'_, T, D>,
    res: &mut JointVecFunc<'_, T, D>,
    stats: &mut JoinStats,
) {
    res.reset();

    let mut combination_count = 0u64;
    let a_limit = a.size.min(res.size());
    for i_a in a_limit.lex_iter() {
        let a_val = a[i_a];
        let b_limit = res.size().saturating_sub(i_a).min(b.size);
        join_row(i_a, a_val, b, b_limit, res);
        if COUNTERS {
            combination_count += b_limit.size();
        }
    }

    if COUNTERS && a.total_size() > 0 {
        stats.compared_brute_force += combination_count as f64 / a.total_size() as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vecfunc::{OwnedJointVecFunc, OwnedVecFunc};

    fn run_brute_1d(a_vals: Vec<i32>, b_vals: Vec<i32>, res_size: u32) -> OwnedJointVecFunc<i32, 1> {
        let a_len = a_vals.len() as u32;
        let b_len = b_vals.len() as u32;
        let mut a = OwnedVecFunc::from_values(a_vals, [a_len]).unwrap();
        let mut b = OwnedVecFunc::from_values(b_vals, [b_len]).unwrap();
        let mut res = OwnedJointVecFunc::zeroed([res_size]).unwrap();
        let mut stats = JoinStats::default();
        join_brute_force::<i32, 1, true>(
            &a.view_mut(),
            &b.view_mut(),
            &mut res.view_mut(),
            &mut stats,
        );
        res
    }

    #[test]
    fn test_ramp_join() {
        let res = run_brute_1d(vec![0, 1, 2], vec![0, 1, 2], 5);
        assert_eq!(res.m, vec![0, 1, 2, 3, 4]);
        for (k, arg) in res.arg.iter().enumerate() {
            let i = arg[0] as usize;
            let j = k - i;
            assert!(j < 3, "arg out of range at {}", k);
            assert_eq!(i as i32 + j as i32, res.m[k]);
        }
    }

    #[test]
    fn test_step_function_prefers_big_jump() {
        let res = run_brute_1d(vec![0, 10], vec![0, 1, 2, 3], 5);
        assert_eq!(res.m, vec![0, 10, 11, 12, 13]);
        assert_eq!(
            res.arg.iter().map(|i| i[0]).collect::<Vec<_>>(),
            vec![0, 1, 1, 1, 1]
        );
    }

    #[test]
    fn test_flat_functions() {
        let res = run_brute_1d(vec![5, 5, 5], vec![0, 0, 0], 3);
        assert_eq!(res.m, vec![5, 5, 5]);
        // Ties keep the earliest argmax.
        assert_eq!(res.arg.iter().map(|i| i[0]).collect::<Vec<_>>(), vec![0, 0, 0]);
    }

    #[test]
    fn test_2d_corners() {
        let mut a = OwnedVecFunc::from_values(vec![0, 1, 1, 2], [2, 2]).unwrap();
        let mut b = OwnedVecFunc::from_values(vec![0, 1, 1, 2], [2, 2]).unwrap();
        let mut res = OwnedJointVecFunc::<i32, 2>::zeroed([3, 3]).unwrap();
        let mut stats = JoinStats::default();
        join_brute_force::<i32, 2, false>(
            &a.view_mut(),
            &b.view_mut(),
            &mut res.view_mut(),
            &mut stats,
        );
        assert_eq!(res.m[IndexVec([0, 0]).flat(&IndexVec(res.size))], 0);
        assert_eq!(res.m[IndexVec([2, 2]).flat(&IndexVec(res.size))], 4);
    }
}
