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

/// Computes the root mean squared error of `(predicted, actual)` pairs.
///
/// Returns `None` if there are no pairs.
pub fn rmse(pairs: impl IntoIterator<Item = (f32, f32)>) -> Option<f32> {
    let (count, sum) = pairs
        .into_iter()
        .fold((0_usize, 0_f64), |(count, sum), (predicted, actual)| {
            let error = f64::from(predicted - actual);
            (count + 1, sum + error * error)
        });

    (count > 0).then(|| (sum / count as f64).sqrt() as f32)
}

#[cfg(test)]
mod tests {
    use beta_test_utils::assert_approx_eq;

    use super::*;

    #[test]
    fn test_rmse() {
        assert_approx_eq!(f32, rmse([(1., 1.), (2., 2.)]).unwrap(), 0.);
        assert_approx_eq!(f32, rmse([(1., 3.), (2., 2.)]).unwrap(), 2_f32.sqrt());
        assert_approx_eq!(f32, rmse([(4., 1.)]).unwrap(), 3.);
    }

    #[test]
    fn test_rmse_empty() {
        assert!(rmse([]).is_none());
    }
}
