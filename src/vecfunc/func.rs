use std::ops::{Index, IndexMut};

use thiserror::Error;

use super::index::IndexVec;
use super::value::JoinValue;

#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("vecfunc: buffer of length {len} does not match size {size:?} (expected {expected})")]
    BufferLength {
        len: usize,
        expected: usize,
        size: Vec<u32>,
    },
    #[error("vecfunc: size {size:?} overflows the index type")]
    SizeOverflow { size: Vec<u32> },
}

fn checked_total_size<const D: usize>(size: &IndexVec<D>) -> Result<usize, ShapeError> {
    let total = size.size();
    if total > u32::MAX as u64 {
        return Err(ShapeError::SizeOverflow {
            size: size.0.to_vec(),
        });
    }
    Ok(total as usize)
}

/// Row-major D-dimensional value function over a caller-owned buffer.
///
/// The buffer is borrowed, never freed here. After [`VecFunc::fix_rising`]
/// the function is nondecreasing along every axis.
#[derive(Debug)]
pub struct VecFunc<'a, T, const D: usize> {
    pub m: &'a mut [T],
    pub size: IndexVec<D>,
}

impl<'a, T: JoinValue, const D: usize> VecFunc<'a, T, D> {
    pub fn new(m: &'a mut [T], size: [u32; D]) -> Result<Self, ShapeError> {
        let size = IndexVec(size);
        let expected = checked_total_size(&size)?;
        if m.len() != expected {
            return Err(ShapeError::BufferLength {
                len: m.len(),
                expected,
                size: size.0.to_vec(),
            });
        }
        Ok(VecFunc { m, size })
    }

    #[inline]
    pub fn total_size(&self) -> usize {
        self.m.len()
    }

    /// Any component on the lower or upper boundary of the grid.
    #[inline]
    pub fn is_edge(&self, i: &IndexVec<D>) -> bool {
        (0..D).any(|d| i[d] == 0 || i[d] + 1 == self.size[d])
    }

    /// Make the function nondecreasing along every axis by propagating the
    /// running maximum from each axis predecessor. One row-major pass
    /// suffices: every predecessor precedes its successor in flat order.
    pub fn fix_rising(&mut self) {
        let mut strides = [0usize; D];
        let mut s = 1usize;
        for d in (0..D).rev() {
            strides[d] = s;
            s *= self.size[d] as usize;
        }

        for (flat, i) in self.size.lex_iter().enumerate() {
            for d in 0..D {
                if i[d] == 0 {
                    continue;
                }
                let prev = self.m[flat - strides[d]];
                if self.m[flat] < prev {
                    self.m[flat] = prev;
                }
            }
        }
    }
}

impl<T, const D: usize> Index<IndexVec<D>> for VecFunc<'_, T, D> {
    type Output = T;

    #[inline]
    fn index(&self, i: IndexVec<D>) -> &T {
        &self.m[i.flat(&self.size)]
    }
}

impl<T, const D: usize> IndexMut<IndexVec<D>> for VecFunc<'_, T, D> {
    #[inline]
    fn index_mut(&mut self, i: IndexVec<D>) -> &mut T {
        &mut self.m[i.flat(&self.size)]
    }
}

/// A value function paired with an argmax grid of the same shape. Both
/// buffers are borrowed from the caller; `arg[k]` records the winning left
/// operand index for `value[k]`.
#[derive(Debug)]
pub struct JointVecFunc<'a, T, const D: usize> {
    pub func: VecFunc<'a, T, D>,
    pub arg: &'a mut [IndexVec<D>],
}

impl<'a, T: JoinValue, const D: usize> JointVecFunc<'a, T, D> {
    pub fn new(
        m: &'a mut [T],
        arg: &'a mut [IndexVec<D>],
        size: [u32; D],
    ) -> Result<Self, ShapeError> {
        let func = VecFunc::new(m, size)?;
        if arg.len() != func.total_size() {
            return Err(ShapeError::BufferLength {
                len: arg.len(),
                expected: func.total_size(),
                size: size.to_vec(),
            });
        }
        Ok(JointVecFunc { func, arg })
    }

    #[inline]
    pub fn size(&self) -> IndexVec<D> {
        self.func.size
    }

    /// Zero both grids before a join run.
    pub fn reset(&mut self) {
        self.func.m.fill(T::ZERO);
        self.arg.fill(IndexVec::zero());
    }
}

/// Buffer-owning variant of [`VecFunc`], convenient for tests and drivers.
#[derive(Debug, Clone)]
pub struct OwnedVecFunc<T, const D: usize> {
    pub m: Vec<T>,
    pub size: [u32; D],
}

impl<T: JoinValue, const D: usize> OwnedVecFunc<T, D> {
    pub fn zeroed(size: [u32; D]) -> Result<Self, ShapeError> {
        let total = checked_total_size(&IndexVec(size))?;
        Ok(OwnedVecFunc {
            m: vec![T::ZERO; total],
            size,
        })
    }

    pub fn from_values(m: Vec<T>, size: [u32; D]) -> Result<Self, ShapeError> {
        let expected = checked_total_size(&IndexVec(size))?;
        if m.len() != expected {
            return Err(ShapeError::BufferLength {
                len: m.len(),
                expected,
                size: size.to_vec(),
            });
        }
        Ok(OwnedVecFunc { m, size })
    }

    pub fn view_mut(&mut self) -> VecFunc<'_, T, D> {
        VecFunc {
            m: &mut self.m,
            size: IndexVec(self.size),
        }
    }
}

/// Buffer-owning variant of [`JointVecFunc`].
#[derive(Debug, Clone)]
pub struct OwnedJointVecFunc<T, const D: usize> {
    pub m: Vec<T>,
    pub arg: Vec<IndexVec<D>>,
    pub size: [u32; D],
}

impl<T: JoinValue, const D: usize> OwnedJointVecFunc<T, D> {
    pub fn zeroed(size: [u32; D]) -> Result<Self, ShapeError> {
        let total = checked_total_size(&IndexVec(size))?;
        Ok(OwnedJointVecFunc {
            m: vec![T::ZERO; total],
            arg: vec![IndexVec::zero(); total],
            size,
        })
    }

    pub fn view_mut(&mut self) -> JointVecFunc<'_, T, D> {
        JointVecFunc {
            func: VecFunc {
                m: &mut self.m,
                size: IndexVec(self.size),
            },
            arg: &mut self.arg,
        }
    }
}
