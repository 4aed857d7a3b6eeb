use std::cmp::Ordering;
use std::fmt::Debug;
use std::ops::{Add, Sub};

/// Scalar policy for value functions and dominance lanes.
///
/// `MAX_VALUE` is one step below the type maximum so that a populated lane
/// can always be opened into a strict bound by `next_up`. `normalize_down`
/// maps a backward gradient into the shared lane ordering (smaller means
/// steeper): negation for signed scalars, complement from `MAX_VALUE` for
/// unsigned ones.
pub trait JoinValue:
    Copy + PartialOrd + Debug + Default + Add<Output = Self> + Sub<Output = Self>
{
    const ZERO: Self;
    /// Largest regular lane value.
    const MAX_VALUE: Self;
    /// Most negative regular lane value.
    const MIN_VALUE: Self;
    /// Gradient threshold for the filter-gradient path: machine epsilon for
    /// floats, zero for integers.
    const EPS: Self;

    /// Next representable value toward positive infinity (saturating for
    /// integers).
    fn next_up(self) -> Self;

    /// Normalized backward gradient for the DOWN lane.
    fn normalize_down(down: Self) -> Self;

    /// Lane representation of a raw index component.
    fn from_index(i: u32) -> Self;

    /// Total ordering consistent with `<` on regular values.
    fn total_cmp(&self, other: &Self) -> Ordering;
}

macro_rules! impl_join_value_signed {
    ($($t:ty),*) => {$(
        impl JoinValue for $t {
            const ZERO: Self = 0;
            const MAX_VALUE: Self = <$t>::MAX - 1;
            const MIN_VALUE: Self = -(<$t>::MAX - 1);
            const EPS: Self = 0;

            #[inline]
            fn next_up(self) -> Self {
                self.saturating_add(1)
            }

            #[inline]
            fn normalize_down(down: Self) -> Self {
                -down
            }

            #[inline]
            fn from_index(i: u32) -> Self {
                i as $t
            }

            #[inline]
            fn total_cmp(&self, other: &Self) -> Ordering {
                Ord::cmp(self, other)
            }
        }
    )*};
}

macro_rules! impl_join_value_unsigned {
    ($($t:ty),*) => {$(
        impl JoinValue for $t {
            const ZERO: Self = 0;
            const MAX_VALUE: Self = <$t>::MAX - 1;
            const MIN_VALUE: Self = 0;
            const EPS: Self = 0;

            #[inline]
            fn next_up(self) -> Self {
                self.saturating_add(1)
            }

            #[inline]
            fn normalize_down(down: Self) -> Self {
                Self::MAX_VALUE - down
            }

            #[inline]
            fn from_index(i: u32) -> Self {
                i as $t
            }

            #[inline]
            fn total_cmp(&self, other: &Self) -> Ordering {
                Ord::cmp(self, other)
            }
        }
    )*};
}

macro_rules! impl_join_value_float {
    ($($t:ty),*) => {$(
        impl JoinValue for $t {
            const ZERO: Self = 0.0;
            const MAX_VALUE: Self = <$t>::MAX - 1.0;
            const MIN_VALUE: Self = -(<$t>::MAX - 1.0);
            const EPS: Self = <$t>::EPSILON;

            #[inline]
            fn next_up(self) -> Self {
                <$t>::next_up(self)
            }

            #[inline]
            fn normalize_down(down: Self) -> Self {
                -down
            }

            #[inline]
            fn from_index(i: u32) -> Self {
                i as $t
            }

            #[inline]
            fn total_cmp(&self, other: &Self) -> Ordering {
                <$t>::total_cmp(self, other)
            }
        }
    )*};
}

impl_join_value_signed!(i32, i64);
impl_join_value_unsigned!(u32, u64);
impl_join_value_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_up_integers_saturate() {
        assert_eq!(5i32.next_up(), 6);
        assert_eq!(i32::MAX.next_up(), i32::MAX);
        assert_eq!(u32::MAX.next_up(), u32::MAX);
        assert_eq!(<i32 as JoinValue>::MAX_VALUE.next_up(), i32::MAX);
    }

    #[test]
    fn test_next_up_floats_step_upward() {
        let x = 1.0f64;
        assert!(x.next_up() > x);
        assert_eq!(JoinValue::next_up(f64::MAX), f64::INFINITY);
    }

    #[test]
    fn test_normalize_down_preserves_steepness_order() {
        // A steeper backward gradient must normalize to a smaller lane value.
        assert!(i32::normalize_down(10) < i32::normalize_down(3));
        assert!(u32::normalize_down(10) < u32::normalize_down(3));
        assert!(f64::normalize_down(10.0) < f64::normalize_down(3.0));
    }

    #[test]
    fn test_normalize_down_of_sentinel_is_minimal() {
        // The lower-edge sentinel (MAX_VALUE) must land at the bottom of the
        // lane ordering so edge cells dominate everything on that lane.
        assert_eq!(
            i32::normalize_down(<i32 as JoinValue>::MAX_VALUE),
            <i32 as JoinValue>::MIN_VALUE
        );
        assert_eq!(u32::normalize_down(<u32 as JoinValue>::MAX_VALUE), 0);
    }

    #[test]
    fn test_eps_policy() {
        assert_eq!(<i32 as JoinValue>::EPS, 0);
        assert_eq!(<f64 as JoinValue>::EPS, f64::EPSILON);
    }
}
