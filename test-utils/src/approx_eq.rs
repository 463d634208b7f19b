// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::iter;

use float_cmp::ApproxEq;
use ndarray::{ArrayBase, Data, Dimension, IntoDimension, Ix};

/// Asserts that two floats, or two containers of floats, are approximately equal.
///
/// Containers are compared element by element in logical order, so a `Vec<[f32; 2]>` can be
/// compared with an `Array2<f32>` of the same shape:
///
/// ```
/// use beta_test_utils::assert_approx_eq;
/// assert_approx_eq!(f32, vec![[1., 2.], [3., 4.]], ndarray::arr2(&[[1., 2.], [3., 4.]]));
/// assert_approx_eq!(f32, 0.333_333_3, 1. / 3., ulps = 4);
/// assert_approx_eq!(f32, 0.98, 1., epsilon = 0.05);
/// ```
///
/// The number of `ulps` defaults to `2` and `epsilon` to `0`. Two NaN values are considered equal.
#[macro_export]
macro_rules! assert_approx_eq {
    ($t:ty, $left:expr, $right:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = 0., ulps = 2)
    };
    ($t:ty, $left:expr, $right:expr, ulps = $ulps:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = 0., ulps = $ulps)
    };
    ($t:ty, $left:expr, $right:expr, epsilon = $epsilon:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = $epsilon, ulps = 2)
    };
    ($t:ty, $left:expr, $right:expr, epsilon = $epsilon:expr, ulps = $ulps:expr $(,)?) => {{
        let (epsilon, ulps) = ($epsilon, $ulps);
        let (left, right) = (&$left, &$right);
        let mut left = $crate::ApproxEqIter::<$t>::indexed_leaves(left, Vec::new());
        let mut right = $crate::ApproxEqIter::<$t>::indexed_leaves(right, Vec::new());
        loop {
            match (left.next(), right.next()) {
                (Some((lidx, lv)), Some((ridx, rv))) => {
                    std::assert_eq!(lidx, ridx, "shape mismatch: {:?} != {:?}", lidx, ridx);
                    std::assert!(
                        (lv.is_nan() && rv.is_nan())
                            || $crate::approx_eq!($t, lv, rv, ulps = ulps, epsilon = epsilon),
                        "approximate equality failed (ulps={:?}, epsilon={:?}) at index {:?}: {:?} != {:?}",
                        ulps, epsilon, lidx, lv, rv,
                    );
                }
                (Some((idx, _)), None) => std::panic!("left input is longer from index {:?}", idx),
                (None, Some((idx, _))) => std::panic!("right input is longer from index {:?}", idx),
                (None, None) => break,
            }
        }
    }};
}

/// Flattens a value into its float leaves, each tagged with its logical index.
///
/// Only meant to back [`assert_approx_eq!`].
pub trait ApproxEqIter<'a, Leaf>
where
    Self: 'a,
    Leaf: ApproxEq + Copy,
{
    fn indexed_leaves(&'a self, prefix: Vec<Ix>) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, Leaf)>>;
}

fn nested<'a, T, Leaf>(
    items: impl 'a + Iterator<Item = &'a T>,
    prefix: Vec<Ix>,
) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, Leaf)>>
where
    T: 'a + ApproxEqIter<'a, Leaf> + ?Sized,
    Leaf: ApproxEq + Copy + 'a,
{
    Box::new(items.enumerate().flat_map(move |(idx, item)| {
        let mut prefix = prefix.clone();
        prefix.push(idx);
        item.indexed_leaves(prefix)
    }))
}

macro_rules! impl_approx_eq_iter {
    ($($t:ty),+) => {
        $(
            impl<'a> ApproxEqIter<'a, $t> for $t {
                fn indexed_leaves(
                    &'a self,
                    prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    Box::new(iter::once((prefix, *self)))
                }
            }

            impl<'a, T> ApproxEqIter<'a, $t> for &'a T
            where
                T: 'a + ApproxEqIter<'a, $t> + ?Sized,
            {
                fn indexed_leaves(
                    &'a self,
                    prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    (**self).indexed_leaves(prefix)
                }
            }

            impl<'a, T> ApproxEqIter<'a, $t> for [T]
            where
                T: 'a + ApproxEqIter<'a, $t>,
            {
                fn indexed_leaves(
                    &'a self,
                    prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    nested(self.iter(), prefix)
                }
            }

            impl<'a, T, const N: usize> ApproxEqIter<'a, $t> for [T; N]
            where
                T: 'a + ApproxEqIter<'a, $t>,
            {
                fn indexed_leaves(
                    &'a self,
                    prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    nested(self.iter(), prefix)
                }
            }

            impl<'a, T> ApproxEqIter<'a, $t> for Vec<T>
            where
                T: 'a + ApproxEqIter<'a, $t>,
            {
                fn indexed_leaves(
                    &'a self,
                    prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    nested(self.iter(), prefix)
                }
            }

            impl<'a, S, D> ApproxEqIter<'a, $t> for ArrayBase<S, D>
            where
                S: 'a + Data<Elem = $t>,
                D: 'a + Dimension,
            {
                fn indexed_leaves(
                    &'a self,
                    prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    Box::new(self.indexed_iter().map(move |(idx, value)| {
                        let mut prefix = prefix.clone();
                        prefix.extend(idx.into_dimension().as_array_view().iter());
                        (prefix, *value)
                    }))
                }
            }
        )+
    };
}

impl_approx_eq_iter! { f32, f64 }
