//! Max-plus join of discrete, monotone-nondecreasing multidimensional
//! value functions, the core primitive of VCG-style combinatorial
//! allocation:
//!
//! ```text
//! res[k] = max { a[i] + b[j] : i + j = k }      (within the result grid)
//! arg[k] = one argmax i achieving it
//! ```
//!
//! The naive join is O(|a|·|b|). The fast driver exploits monotonicity:
//! each cell of `b` becomes a dominance point carrying its local gradient
//! bounds and index (three lanes per axis), one of several interchangeable
//! upper-bound indexes is built over those points, and each row of `a`
//! probes the index for the candidates that could still win somewhere in
//! the result grid.
//!
//! ```
//! use vecfunc_join::{join_brute_opt, JoinParams, Method, OwnedJointVecFunc, OwnedVecFunc};
//!
//! let mut a = OwnedVecFunc::from_values(vec![0, 10], [2]).unwrap();
//! let mut b = OwnedVecFunc::from_values(vec![0, 1, 2, 3], [4]).unwrap();
//! let mut res = OwnedJointVecFunc::<i32, 1>::zeroed([5]).unwrap();
//!
//! let params = JoinParams::with_method(Method::KdTree);
//! join_brute_opt(&mut a.view_mut(), &mut b.view_mut(), &mut res.view_mut(), &params).unwrap();
//! assert_eq!(res.m, vec![0, 10, 11, 12, 13]);
//! ```

pub mod join;
pub mod stats;
pub mod upper_bound;
pub mod vecfunc;

pub use join::{
    join, join_brute_opt, join_buildtime, join_count, join_fg_brute_opt, join_fg_buildtime,
    join_fg_count, join_fg_filter, join_fg_nofilter, join_fg_querytime, join_filter,
    join_nofilter, join_querytime, maille_tuffin, max_joined_size, measure_index_build, JoinError,
    JoinParams, Method,
};
pub use stats::JoinStats;
pub use vecfunc::{
    IndexVec, JointVecFunc, JoinValue, OwnedJointVecFunc, OwnedVecFunc, ShapeError, VecFunc,
};
