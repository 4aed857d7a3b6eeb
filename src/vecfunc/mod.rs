//! Discrete D-dimensional value functions and their index/scalar model.

pub mod func;
pub mod index;
pub mod value;

pub use func::{JointVecFunc, OwnedJointVecFunc, OwnedVecFunc, ShapeError, VecFunc};
pub use index::IndexVec;
pub use value::JoinValue;
