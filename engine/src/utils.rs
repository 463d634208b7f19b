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

use std::cmp::Ordering;

/// Compares scores in descending order, NaN sorts last.
pub(crate) fn nan_safe_f32_cmp_desc(a: &f32, b: &f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => b.total_cmp(a),
        (nan_a, nan_b) => nan_a.cmp(&nan_b),
    }
}

/// Keeps the `k` smallest items with respect to a total order and sorts them.
pub(crate) fn top_k<T>(mut items: Vec<T>, k: usize, cmp: impl Fn(&T, &T) -> Ordering) -> Vec<T> {
    if k == 0 {
        return Vec::new();
    }
    if items.len() > k {
        items.select_nth_unstable_by(k - 1, &cmp);
        items.truncate(k);
    }
    items.sort_unstable_by(cmp);

    items
}

#[cfg(test)]
mod tests {
    use beta_test_utils::assert_approx_eq;

    use super::*;

    #[test]
    fn test_nan_safe_f32_cmp_desc() {
        let mut values = vec![0.5, f32::NAN, 1., -1., 0.5];
        values.sort_by(nan_safe_f32_cmp_desc);
        assert_approx_eq!(f32, values, [1., 0.5, 0.5, -1., f32::NAN]);
    }

    #[test]
    fn test_top_k() {
        let items = vec![(3, 'a'), (1, 'b'), (4, 'c'), (1, 'd'), (5, 'e')];
        let cmp = |a: &(i32, char), b: &(i32, char)| b.0.cmp(&a.0).then(a.1.cmp(&b.1));

        assert_eq!(top_k(items.clone(), 2, cmp), [(5, 'e'), (4, 'c')]);
        assert_eq!(top_k(items.clone(), 10, cmp).len(), 5);
        assert_eq!(top_k(items.clone(), 5, cmp)[3..], [(1, 'b'), (1, 'd')]);
        assert!(top_k(items, 0, cmp).is_empty());
    }
}
