use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vecfunc_join::{
    join, join_brute_opt, join_count, join_fg_brute_opt, join_fg_filter, join_filter,
    join_nofilter, join_querytime, max_joined_size, IndexVec, JoinError, JoinParams, JoinStats,
    JointVecFunc, Method, OwnedJointVecFunc, OwnedVecFunc, VecFunc,
};

type Entry<const D: usize> = fn(
    &mut VecFunc<'_, i32, D>,
    &mut VecFunc<'_, i32, D>,
    &mut JointVecFunc<'_, i32, D>,
    &JoinParams,
) -> Result<JoinStats, JoinError>;

const ALL_METHODS: [Method; 10] = [
    Method::BruteForce,
    Method::Simple,
    Method::BinarySearch1D,
    Method::RangeTree2D,
    Method::CascadeTree2D,
    Method::CategoryTree,
    Method::KdTree,
    Method::MultiAxisFull,
    Method::MultiAxisSingle,
    Method::MultiAxisDouble,
];

fn run_entry<const D: usize>(
    entry: Entry<D>,
    a: &OwnedVecFunc<i32, D>,
    b: &OwnedVecFunc<i32, D>,
    res_size: [u32; D],
    params: &JoinParams,
) -> OwnedJointVecFunc<i32, D> {
    let mut a = a.clone();
    let mut b = b.clone();
    let mut res = OwnedJointVecFunc::zeroed(res_size).unwrap();
    entry(
        &mut a.view_mut(),
        &mut b.view_mut(),
        &mut res.view_mut(),
        params,
    )
    .unwrap();
    res
}

fn run_method<const D: usize>(
    method: Method,
    chunk_size: u32,
    a: &OwnedVecFunc<i32, D>,
    b: &OwnedVecFunc<i32, D>,
    res_size: [u32; D],
) -> OwnedJointVecFunc<i32, D> {
    run_entry(
        join_filter,
        a,
        b,
        res_size,
        &JoinParams::new(method, chunk_size),
    )
}

fn random_monotone<const D: usize>(size: [u32; D], seed: u64) -> OwnedVecFunc<i32, D> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut f = OwnedVecFunc::zeroed(size).unwrap();
    for v in f.m.iter_mut() {
        *v = rng.gen_range(0..100);
    }
    f.view_mut().fix_rising();
    f
}

/// `arg[k]` must reconstruct the winning pair for every reachable cell.
fn assert_args_valid<const D: usize>(
    a: &OwnedVecFunc<i32, D>,
    b: &OwnedVecFunc<i32, D>,
    res: &OwnedJointVecFunc<i32, D>,
    context: &str,
) {
    let res_size = IndexVec(res.size);
    let a_size = IndexVec(a.size);
    let b_size = IndexVec(b.size);
    for (flat, k) in res_size.lex_iter().enumerate() {
        let i = res.arg[flat];
        let mut j = IndexVec::<D>::zero();
        let mut reachable = true;
        for d in 0..D {
            if i[d] >= a_size[d] || k[d] < i[d] || k[d] - i[d] >= b_size[d] {
                reachable = false;
                break;
            }
            j[d] = k[d] - i[d];
        }
        if !reachable {
            // Cells no admissible pair ever beat keep the zeroed arg.
            assert_eq!(
                res.m[flat], 0,
                "{context}: arg {:?} invalid at non-zero cell {:?}",
                i.0, k.0
            );
            continue;
        }
        let recon = a.m[i.flat(&a_size)] + b.m[j.flat(&b_size)];
        assert_eq!(
            recon, res.m[flat],
            "{context}: arg at {:?} does not reconstruct the value",
            k.0
        );
    }
}

fn assert_same_values<const D: usize>(
    expected: &OwnedJointVecFunc<i32, D>,
    got: &OwnedJointVecFunc<i32, D>,
    context: &str,
) {
    assert_eq!(expected.m, got.m, "{context}: values differ from brute force");
}

#[test]
fn test_scenario_ramp() {
    let a = OwnedVecFunc::from_values(vec![0, 1, 2], [3]).unwrap();
    let b = OwnedVecFunc::from_values(vec![0, 1, 2], [3]).unwrap();
    for method in ALL_METHODS {
        let res = run_method(method, 512, &a, &b, [5]);
        assert_eq!(res.m, vec![0, 1, 2, 3, 4], "{}", method.describe());
        assert_args_valid(&a, &b, &res, method.describe());
    }
}

#[test]
fn test_scenario_step() {
    let a = OwnedVecFunc::from_values(vec![0, 10], [2]).unwrap();
    let b = OwnedVecFunc::from_values(vec![0, 1, 2, 3], [4]).unwrap();
    for method in ALL_METHODS {
        let res = run_method(method, 512, &a, &b, [5]);
        assert_eq!(res.m, vec![0, 10, 11, 12, 13], "{}", method.describe());
        assert_eq!(
            res.arg.iter().map(|i| i[0]).collect::<Vec<_>>(),
            vec![0, 1, 1, 1, 1],
            "{}",
            method.describe()
        );
    }
}

#[test]
fn test_scenario_flat() {
    let a = OwnedVecFunc::from_values(vec![5, 5, 5], [3]).unwrap();
    let b = OwnedVecFunc::from_values(vec![0, 0, 0], [3]).unwrap();
    for method in ALL_METHODS {
        let res = run_method(method, 512, &a, &b, [3]);
        assert_eq!(res.m, vec![5, 5, 5], "{}", method.describe());
    }
}

#[test]
fn test_scenario_2d_corners() {
    let a = OwnedVecFunc::from_values(vec![0, 1, 1, 2], [2, 2]).unwrap();
    let b = OwnedVecFunc::from_values(vec![0, 1, 1, 2], [2, 2]).unwrap();
    for method in ALL_METHODS {
        let res = run_method(method, 512, &a, &b, [3, 3]);
        let size = IndexVec(res.size);
        assert_eq!(res.m[IndexVec([0, 0]).flat(&size)], 0, "{}", method.describe());
        assert_eq!(res.m[IndexVec([2, 2]).flat(&size)], 4, "{}", method.describe());
    }
}

#[test]
fn test_scenario_brute_fallback_rows() {
    // Every row's admissible b block is below the brute threshold, so the
    // optimized bundle must brute-force each row and still match method 0.
    let a = random_monotone([16], 41);
    let b = random_monotone([4], 42);
    let reference = run_entry(join, &a, &b, [20], &JoinParams::default());
    for method in ALL_METHODS {
        let res = run_entry(
            join_brute_opt,
            &a,
            &b,
            [20],
            &JoinParams::new(method, 512),
        );
        assert_same_values(&reference, &res, method.describe());
        assert_args_valid(&a, &b, &res, method.describe());
    }
}

#[test]
fn test_method_matrix_1d() {
    let a = random_monotone([64], 1);
    let b = random_monotone([48], 2);
    let res_size = max_joined_size(a.size, b.size, [90]);
    let reference = run_method(Method::BruteForce, 512, &a, &b, res_size);
    assert_args_valid(&a, &b, &reference, "brute 1d");
    for method in ALL_METHODS {
        for chunk in [32, 256, 1024] {
            let res = run_method(method, chunk, &a, &b, res_size);
            let context = format!("{} chunk={}", method.describe(), chunk);
            assert_same_values(&reference, &res, &context);
            assert_args_valid(&a, &b, &res, &context);
        }
    }
}

#[test]
fn test_method_matrix_2d() {
    let a = random_monotone([10, 6], 3);
    let b = random_monotone([7, 9], 4);
    let res_size = max_joined_size(a.size, b.size, [100, 100]);
    let reference = run_method(Method::BruteForce, 512, &a, &b, res_size);
    for method in ALL_METHODS {
        for chunk in [32, 256, 1024] {
            let res = run_method(method, chunk, &a, &b, res_size);
            let context = format!("{} chunk={}", method.describe(), chunk);
            assert_same_values(&reference, &res, &context);
            assert_args_valid(&a, &b, &res, &context);
        }
    }
}

#[test]
fn test_method_matrix_3d() {
    // Random monotone functions of total size 256 in three dimensions.
    let a = random_monotone([8, 8, 4], 5);
    let b = random_monotone([4, 8, 8], 6);
    let res_size = max_joined_size(a.size, b.size, [100, 100, 100]);
    let reference = run_method(Method::BruteForce, 512, &a, &b, res_size);
    for method in ALL_METHODS {
        for chunk in [32, 256, 1024] {
            let res = run_method(method, chunk, &a, &b, res_size);
            let context = format!("{} chunk={}", method.describe(), chunk);
            assert_same_values(&reference, &res, &context);
            assert_args_valid(&a, &b, &res, &context);
        }
    }
}

#[test]
fn test_monotone_preservation() {
    let a = random_monotone([9, 7], 7);
    let b = random_monotone([6, 8], 8);
    let res_size = max_joined_size(a.size, b.size, [12, 12]);
    for method in [Method::BruteForce, Method::KdTree, Method::CategoryTree] {
        let res = run_method(method, 64, &a, &b, res_size);
        let size = IndexVec(res.size);
        for (flat, k) in size.lex_iter().enumerate() {
            for d in 0..2 {
                if k[d] == 0 {
                    continue;
                }
                let mut prev = k;
                prev[d] -= 1;
                assert!(
                    res.m[prev.flat(&size)] <= res.m[flat],
                    "{}: result not monotone along axis {} at {:?}",
                    method.describe(),
                    d,
                    k.0
                );
            }
        }
    }
}

#[test]
fn test_symmetry_of_values() {
    let a = random_monotone([12], 9);
    let b = random_monotone([9], 10);
    let res_size = max_joined_size(a.size, b.size, [18]);
    for method in [Method::Simple, Method::RangeTree2D, Method::MultiAxisFull] {
        let ab = run_method(method, 64, &a, &b, res_size);
        let ba = run_method(method, 64, &b, &a, res_size);
        assert_eq!(ab.m, ba.m, "{}: join values must be symmetric", method.describe());
    }
}

#[test]
fn test_zero_extension() {
    let a = OwnedVecFunc::from_values(vec![0; 6], [6]).unwrap();
    let b = random_monotone([5], 11);
    for method in ALL_METHODS {
        let res = run_method(method, 512, &a, &b, [8]);
        for k in 0..8usize {
            let expected = b.m[k.min(4)];
            assert_eq!(
                res.m[k],
                expected,
                "{}: zero-extended join must replay b at {}",
                method.describe(),
                k
            );
        }
    }
}

#[test]
fn test_filter_gradient_bundles_match_on_nonnegative_input() {
    // Integer EPS is zero, so on nonnegative monotone integers the
    // filter-gradient bundles must agree with the plain ones exactly.
    let a = random_monotone([8, 6], 12);
    let b = random_monotone([6, 8], 13);
    let res_size = max_joined_size(a.size, b.size, [11, 11]);
    let reference = run_method(Method::BruteForce, 512, &a, &b, res_size);
    for method in [Method::BinarySearch1D, Method::CascadeTree2D, Method::KdTree] {
        for entry in [
            join_fg_filter as Entry<2>,
            join_fg_brute_opt as Entry<2>,
        ] {
            let res = run_entry(entry, &a, &b, res_size, &JoinParams::new(method, 128));
            assert_same_values(&reference, &res, method.describe());
        }
    }
}

#[test]
fn test_unfiltered_bundles_match() {
    let a = random_monotone([20], 14);
    let b = random_monotone([30], 15);
    let res_size = max_joined_size(a.size, b.size, [40]);
    let reference = run_method(Method::BruteForce, 512, &a, &b, res_size);
    for method in ALL_METHODS {
        for entry in [join_nofilter as Entry<1>, join_count as Entry<1>] {
            let res = run_entry(entry, &a, &b, res_size, &JoinParams::new(method, 32));
            assert_same_values(&reference, &res, method.describe());
        }
    }
}

#[test]
fn test_counters_report_queries() {
    let a = random_monotone([32], 16);
    let b = random_monotone([32], 17);
    let mut a_run = a.clone();
    let mut b_run = b.clone();
    let mut res = OwnedJointVecFunc::<i32, 1>::zeroed([48]).unwrap();
    let stats = join_querytime(
        &mut a_run.view_mut(),
        &mut b_run.view_mut(),
        &mut res.view_mut(),
        &JoinParams::new(Method::MultiAxisDouble, 16),
    )
    .unwrap();
    assert_eq!(stats.total_queries, 32);
    assert_eq!(stats.total_pts, 32);
    assert_eq!(stats.ds_pts, 32);
    assert!(stats.expected_compared_points >= 0.0);
    assert_eq!(stats.joined_func_count, 1);
    let report = format!("{stats}");
    assert!(report.contains("Multi 2D Binary Search Tree (Double)"));
}
