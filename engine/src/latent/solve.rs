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

use ndarray::{Array1, Array2};

/// Pivots below this fraction of their diagonal entry count as zero.
const SINGULAR_PIVOT: f64 = 1e-10;

const MAX_SWEEPS: usize = 50;
const SWEEP_TOLERANCE: f64 = 1e-6;

/// Solves `a x = b` for a symmetric positive definite `a` via its Cholesky decomposition.
///
/// Returns `None` if `a` is singular or not positive definite.
#[allow(clippy::many_single_char_names)]
pub(super) fn cholesky_solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();

    // the lower triangle of `a` is overwritten by the factor `l` of `a = l l^T`
    for j in 0..n {
        let mut pivot = a[[j, j]];
        for k in 0..j {
            pivot -= a[[j, k]] * a[[j, k]];
        }
        if !pivot.is_finite() || pivot <= SINGULAR_PIVOT * a[[j, j]].abs() || pivot <= 0. {
            return None;
        }
        let pivot = pivot.sqrt();
        a[[j, j]] = pivot;
        for i in j + 1..n {
            let mut value = a[[i, j]];
            for k in 0..j {
                value -= a[[i, k]] * a[[j, k]];
            }
            a[[i, j]] = value / pivot;
        }
    }

    // l y = b
    for i in 0..n {
        let mut value = b[i];
        for k in 0..i {
            value -= a[[i, k]] * b[k];
        }
        b[i] = value / a[[i, i]];
    }
    // l^T x = y
    for i in (0..n).rev() {
        let mut value = b[i];
        for k in i + 1..n {
            value -= a[[k, i]] * b[k];
        }
        b[i] = value / a[[i, i]];
    }

    Some(b)
}

/// Minimizes `x^T a x / 2 - b^T x` subject to `x >= 0` by projected coordinate descent.
///
/// The descent starts from the projection of `start`. Returns `None` if `a` has a negative
/// diagonal entry or the solution isn't finite.
pub(super) fn nonnegative_solve(
    a: &Array2<f64>,
    b: &Array1<f64>,
    start: Array1<f64>,
) -> Option<Array1<f64>> {
    let mut x = start.mapv_into(|value| value.max(0.));

    for _ in 0..MAX_SWEEPS {
        let mut max_change = 0_f64;
        for j in 0..x.len() {
            let diagonal = a[[j, j]];
            if diagonal < 0. {
                return None;
            }
            let value = if diagonal > 0. {
                let gradient = a.row(j).dot(&x) - b[j];
                (x[j] - gradient / diagonal).max(0.)
            } else {
                0.
            };
            max_change = max_change.max((value - x[j]).abs());
            x[j] = value;
        }

        let scale = x.iter().fold(1_f64, |scale, value| scale.max(value.abs()));
        if max_change <= SWEEP_TOLERANCE * scale {
            break;
        }
    }

    x.iter().all(|value| value.is_finite()).then_some(x)
}
