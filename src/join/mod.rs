//! Join entry points: method registry, parameter resolution and the
//! flag-bundle family.

pub mod brute;
pub mod fast;
pub mod maille_tuffin;

pub use brute::join_brute_force;
pub use fast::create_points;
pub use maille_tuffin::maille_tuffin;

use std::time::Instant;

use thiserror::Error;
use tracing::debug;

use crate::stats::JoinStats;
use crate::upper_bound::{
    CascadePartial, CategoryTree, KdTree, MultiAxis1D, MultiAxisTree, PointVec, RangeTreePartial,
    SimpleStore,
};
use crate::vecfunc::{JointVecFunc, JoinValue, ShapeError, VecFunc};

use fast::{build_index, join_fast};

/// Index selector, dispatched once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    BruteForce,
    Simple,
    BinarySearch1D,
    RangeTree2D,
    CascadeTree2D,
    CategoryTree,
    KdTree,
    MultiAxisFull,
    MultiAxisSingle,
    MultiAxisDouble,
}

impl Default for Method {
    fn default() -> Self {
        Method::BruteForce
    }
}

impl Method {
    pub const COUNT: u32 = 10;

    pub fn from_id(id: u32) -> Result<Self, JoinError> {
        Ok(match id {
            0 => Method::BruteForce,
            1 => Method::Simple,
            2 => Method::BinarySearch1D,
            3 => Method::RangeTree2D,
            4 => Method::CascadeTree2D,
            5 => Method::CategoryTree,
            6 => Method::KdTree,
            7 => Method::MultiAxisFull,
            8 => Method::MultiAxisSingle,
            9 => Method::MultiAxisDouble,
            _ => return Err(JoinError::UnknownMethod { id }),
        })
    }

    pub fn id(self) -> u32 {
        match self {
            Method::BruteForce => 0,
            Method::Simple => 1,
            Method::BinarySearch1D => 2,
            Method::RangeTree2D => 3,
            Method::CascadeTree2D => 4,
            Method::CategoryTree => 5,
            Method::KdTree => 6,
            Method::MultiAxisFull => 7,
            Method::MultiAxisSingle => 8,
            Method::MultiAxisDouble => 9,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Method::BruteForce => "Brute Force",
            Method::Simple => "Simple",
            Method::BinarySearch1D => "1D Binary Search",
            Method::RangeTree2D => "2D Binary Search Tree",
            Method::CascadeTree2D => "2D Binary Search Tree (FC)",
            Method::CategoryTree => "Category Tree",
            Method::KdTree => "K-D Tree",
            Method::MultiAxisFull => "Multi 2D Binary Search Tree (Full)",
            Method::MultiAxisSingle => "Multi 2D Binary Search Tree (Single)",
            Method::MultiAxisDouble => "Multi 2D Binary Search Tree (Double)",
        }
    }
}

impl TryFrom<u32> for Method {
    type Error = JoinError;

    fn try_from(id: u32) -> Result<Self, JoinError> {
        Method::from_id(id)
    }
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("join: method id {id} is not in the registry (0..={max})", max = Method::COUNT - 1)]
    UnknownMethod { id: u32 },
    #[error("join: chunk_size must be at least 1")]
    ZeroChunkSize,
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Runtime parameters of a join call.
#[derive(Debug, Clone)]
pub struct JoinParams {
    pub method: Option<Method>,
    pub chunk_size: Option<u32>,
}

impl Default for JoinParams {
    fn default() -> Self {
        JoinParams {
            method: Some(Method::BruteForce),
            chunk_size: Some(512),
        }
    }
}

impl JoinParams {
    pub fn new(method: Method, chunk_size: u32) -> Self {
        JoinParams {
            method: Some(method),
            chunk_size: Some(chunk_size),
        }
    }

    pub fn with_method(method: Method) -> Self {
        JoinParams {
            method: Some(method),
            ..Default::default()
        }
    }

    fn get_method(&self) -> Method {
        self.method.unwrap_or_default()
    }

    fn get_chunk_size(&self) -> Result<u32, JoinError> {
        let chunk = self.chunk_size.unwrap_or(512);
        if chunk == 0 {
            return Err(JoinError::ZeroChunkSize);
        }
        Ok(chunk)
    }
}

/// Maximal shape of the joined function: `a + b − 1` per axis, clamped to
/// the caller's limit and at zero.
pub fn max_joined_size<const D: usize>(
    a_size: [u32; D],
    b_size: [u32; D],
    limit: [u32; D],
) -> [u32; D] {
    let mut out = [0u32; D];
    for d in 0..D {
        out[d] = (a_size[d] + b_size[d]).saturating_sub(1).min(limit[d]);
    }
    out
}

fn dispatch<
    T,
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
    method: Method,
    chunk_size: u32,
    stats: &mut JoinStats,
) where
    T: JoinValue,
{
    macro_rules! fast {
        ($build:expr) => {
            join_fast::<T, _, _, D, FILTER_GRAD, FILTER, BRUTE_OPT, COUNTERS, BUILD_TIMING, QUERY_TIMING>(
                a, b, res, chunk_size, stats, $build,
            )
        };
    }

    match method {
        Method::BruteForce => join_brute_force::<T, D, true>(a, b, res, stats),
        Method::Simple => fast!(SimpleStore::new),
        Method::BinarySearch1D => fast!(MultiAxis1D::new),
        Method::RangeTree2D => fast!(RangeTreePartial::<T, D>::new),
        Method::CascadeTree2D => fast!(CascadePartial::<T, D>::new),
        Method::CategoryTree => fast!(CategoryTree::new),
        Method::KdTree => fast!(KdTree::new),
        Method::MultiAxisFull => {
            fast!(|pts, c| MultiAxisTree::new(pts, c, PointVec::<T, D>::LANES - 1))
        }
        Method::MultiAxisSingle => fast!(|pts, c| MultiAxisTree::new(pts, c, 1)),
        Method::MultiAxisDouble => {
            // The double variant needs a second sub-lane to alternate with.
            if D > 1 {
                fast!(|pts, c| MultiAxisTree::new(pts, c, 2))
            } else {
                fast!(|pts, c| MultiAxisTree::new(pts, c, 1))
            }
        }
    }
}

fn run_join<
    T,
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
    params: &JoinParams,
) -> Result<JoinStats, JoinError>
where
    T: JoinValue,
{
    let method = params.get_method();
    let chunk_size = params.get_chunk_size()?;
    let mut stats = JoinStats::new(method.describe());
    debug!(
        method = method.describe(),
        chunk_size,
        a_size = ?a.size.0,
        b_size = ?b.size.0,
        res_size = ?res.size().0,
        "join dispatch"
    );

    let start = Instant::now();
    dispatch::<T, D, FILTER_GRAD, FILTER, BRUTE_OPT, COUNTERS, BUILD_TIMING, QUERY_TIMING>(
        a, b, res, method, chunk_size, &mut stats,
    );
    stats.total_runtime += start.elapsed();
    stats.joined_func_count += 1;
    Ok(stats)
}

macro_rules! join_entries {
    ($( $name:ident => ($fg:literal, $filter:literal, $brute:literal,
                        $count:literal, $build:literal, $query:literal) ),+ $(,)?) => {
        paste::paste! {$(
            #[doc = concat!(
                "Join with the `", stringify!($name), "` flag bundle ",
                "(FILTER_GRAD=", stringify!($fg), ", FILTER=", stringify!($filter),
                ", BRUTE_OPT=", stringify!($brute), ", COUNTERS=", stringify!($count),
                ", BUILD_TIMING=", stringify!($build), ", QUERY_TIMING=", stringify!($query), ")."
            )]
            pub fn [<join_ $name>]<T: JoinValue, const D: usize>(
                a: &mut VecFunc<'_, T, D>,
                b: &mut VecFunc<'_, T, D>,
                res: &mut JointVecFunc<'_, T, D>,
                params: &JoinParams,
            ) -> Result<JoinStats, JoinError> {
                run_join::<T, D, $fg, $filter, $brute, $count, $build, $query>(a, b, res, params)
            }
        )+}
    };
}

join_entries! {
    nofilter     => (false, false, false, false, false, false),
    filter       => (false, true,  false, false, false, false),
    brute_opt    => (false, true,  true,  false, false, false),
    count        => (false, true,  false, true,  false, false),
    buildtime    => (false, true,  false, true,  true,  false),
    querytime    => (false, true,  false, true,  true,  true),
    fg_nofilter  => (true,  false, false, false, false, false),
    fg_filter    => (true,  true,  false, false, false, false),
    fg_brute_opt => (true,  true,  true,  false, false, false),
    fg_count     => (true,  true,  false, true,  false, false),
    fg_buildtime => (true,  true,  false, true,  true,  false),
    fg_querytime => (true,  true,  false, true,  true,  true),
}

/// Join `a` and `b` into `res` with the default flag bundle (no candidate
/// filtering, no counters, no timing).
pub fn join<T: JoinValue, const D: usize>(
    a: &mut VecFunc<'_, T, D>,
    b: &mut VecFunc<'_, T, D>,
    res: &mut JointVecFunc<'_, T, D>,
    params: &JoinParams,
) -> Result<JoinStats, JoinError> {
    join_nofilter(a, b, res, params)
}

/// Build the chosen index over `v`'s points with build timing, without
/// running a join. Method 0 builds nothing.
pub fn measure_index_build<T: JoinValue, const D: usize>(
    v: &VecFunc<'_, T, D>,
    params: &JoinParams,
) -> Result<JoinStats, JoinError> {
    let method = params.get_method();
    let chunk_size = params.get_chunk_size()?;
    let mut stats = JoinStats::new(method.describe());

    macro_rules! build {
        ($build:expr) => {{
            let _ = build_index::<T, _, _, D, false, true>(v, chunk_size, &mut stats, $build);
        }};
    }

    let start = Instant::now();
    match method {
        Method::BruteForce => {}
        Method::Simple => build!(SimpleStore::new),
        Method::BinarySearch1D => build!(MultiAxis1D::new),
        Method::RangeTree2D => build!(RangeTreePartial::<T, D>::new),
        Method::CascadeTree2D => build!(CascadePartial::<T, D>::new),
        Method::CategoryTree => build!(CategoryTree::new),
        Method::KdTree => build!(KdTree::new),
        Method::MultiAxisFull => {
            build!(|pts, c| MultiAxisTree::new(pts, c, PointVec::<T, D>::LANES - 1))
        }
        Method::MultiAxisSingle => build!(|pts, c| MultiAxisTree::new(pts, c, 1)),
        Method::MultiAxisDouble => {
            if D > 1 {
                build!(|pts, c| MultiAxisTree::new(pts, c, 2))
            } else {
                build!(|pts, c| MultiAxisTree::new(pts, c, 1))
            }
        }
    }
    stats.total_runtime += start.elapsed();
    stats.joined_func_count += 1;
    Ok(stats)
}
