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

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::Error,
    id::{RouteId, UserId},
    rating::Rating,
};

/// A single non-zero entry of a [`RatingMatrix`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Entry {
    pub user: UserId,
    pub route: RouteId,
    pub value: f32,
}

impl From<Rating> for Entry {
    fn from(rating: Rating) -> Self {
        Self {
            user: rating.user,
            route: rating.route,
            value: rating.value.into(),
        }
    }
}

/// Compressed storage of one orientation of the matrix, ie CSR or CSC.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
struct Compressed {
    offsets: Vec<usize>,
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl Compressed {
    /// Compresses `(major, minor, value)` triples sorted by major and then minor index.
    fn from_sorted(majors: usize, triples: impl IntoIterator<Item = (u32, u32, f32)>) -> Self {
        let mut offsets = Vec::with_capacity(majors + 1);
        offsets.push(0);
        let mut indices = Vec::new();
        let mut values = Vec::new();

        for (major, minor, value) in triples {
            while offsets.len() <= major as usize {
                offsets.push(indices.len());
            }
            indices.push(minor);
            values.push(value);
        }
        while offsets.len() <= majors {
            offsets.push(indices.len());
        }

        Self {
            offsets,
            indices,
            values,
        }
    }

    fn lane(&self, major: u32) -> Lane<'_> {
        let range = self.offsets[major as usize]..self.offsets[major as usize + 1];
        Lane {
            indices: &self.indices[range.clone()],
            values: &self.values[range],
        }
    }
}

/// A row or a column of a [`RatingMatrix`].
///
/// The indices are sorted ascendingly.
#[derive(Clone, Copy, Debug)]
pub struct Lane<'a> {
    indices: &'a [u32],
    values: &'a [f32],
}

impl<'a> Lane<'a> {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &'a [u32] {
        self.indices
    }

    pub fn values(&self) -> &'a [f32] {
        self.values
    }

    pub fn iter(&self) -> impl 'a + Clone + Iterator<Item = (u32, f32)> {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn get(&self, index: u32) -> Option<f32> {
        self.indices
            .binary_search(&index)
            .ok()
            .map(|position| self.values[position])
    }

    /// The mean of the values, zero for an empty lane.
    pub fn mean(&self) -> f32 {
        if self.is_empty() {
            0.
        } else {
            self.values.iter().sum::<f32>() / self.len() as f32
        }
    }
}

/// Along which axis a [`Cutoff`] filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CutoffAxis {
    Routes,
    Users,
    Both,
}

/// A minimum number of ratings an entity needs to stay in the matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Cutoff {
    pub axis: CutoffAxis,
    pub min_ratings: usize,
}

impl Cutoff {
    pub const fn routes(min_ratings: usize) -> Self {
        Self {
            axis: CutoffAxis::Routes,
            min_ratings,
        }
    }

    pub const fn users(min_ratings: usize) -> Self {
        Self {
            axis: CutoffAxis::Users,
            min_ratings,
        }
    }

    pub const fn both(min_ratings: usize) -> Self {
        Self {
            axis: CutoffAxis::Both,
            min_ratings,
        }
    }

    pub const fn with_min_ratings(self, min_ratings: usize) -> Self {
        Self {
            axis: self.axis,
            min_ratings,
        }
    }
}

/// A sparse users × routes rating matrix.
///
/// Users and routes are indexed densely in ascending order of their ids. Only users and routes
/// with at least one rating are part of the matrix.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RatingMatrix {
    users: Vec<UserId>,
    routes: Vec<RouteId>,
    user_index: HashMap<UserId, u32>,
    route_index: HashMap<RouteId, u32>,
    rows: Compressed,
    cols: Compressed,
}

impl RatingMatrix {
    /// Creates a matrix from ratings.
    ///
    /// # Errors
    /// Fails if a user rated the same route more than once.
    pub fn from_ratings(ratings: impl IntoIterator<Item = Rating>) -> Result<Self, Error> {
        Self::from_entries(ratings.into_iter().map(Entry::from))
    }

    /// Creates a matrix from entries.
    ///
    /// # Errors
    /// Fails if an entry for the same user and route appears more than once.
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Result<Self, Error> {
        let mut entries = entries.into_iter().collect_vec();
        entries.sort_unstable_by_key(|entry| (entry.user, entry.route));
        if let Some(duplicate) = entries
            .iter()
            .tuple_windows()
            .find(|(a, b)| a.user == b.user && a.route == b.route)
        {
            return Err(Error::DuplicateRating {
                user: duplicate.0.user,
                route: duplicate.0.route,
            });
        }

        Ok(Self::from_sorted_unique(&entries))
    }

    /// Entries must be sorted by user and then route without duplicates.
    fn from_sorted_unique(entries: &[Entry]) -> Self {
        let users = entries.iter().map(|entry| entry.user).dedup().collect_vec();
        let routes = entries
            .iter()
            .map(|entry| entry.route)
            .sorted_unstable()
            .dedup()
            .collect_vec();
        let user_index = index_of(&users);
        let route_index = index_of(&routes);

        let triples = entries
            .iter()
            .map(|entry| {
                (
                    user_index[&entry.user],
                    route_index[&entry.route],
                    entry.value,
                )
            })
            .collect_vec();
        let rows = Compressed::from_sorted(users.len(), triples.iter().copied());
        let cols = Compressed::from_sorted(
            routes.len(),
            triples
                .into_iter()
                .map(|(row, col, value)| (col, row, value))
                .sorted_unstable_by_key(|&(col, row, _)| (col, row)),
        );

        Self {
            users,
            routes,
            user_index,
            route_index,
            rows,
            cols,
        }
    }

    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    pub fn n_routes(&self) -> usize {
        self.routes.len()
    }

    /// The number of ratings.
    pub fn nnz(&self) -> usize {
        self.rows.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nnz() == 0
    }

    /// The fraction of non-zero entries.
    pub fn density(&self) -> f64 {
        let cells = self.n_users() as f64 * self.n_routes() as f64;
        if cells > 0. {
            self.nnz() as f64 / cells
        } else {
            0.
        }
    }

    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    pub fn routes(&self) -> &[RouteId] {
        &self.routes
    }

    pub fn user_id(&self, row: u32) -> UserId {
        self.users[row as usize]
    }

    pub fn route_id(&self, col: u32) -> RouteId {
        self.routes[col as usize]
    }

    /// The row index of a user, if the user rated anything.
    pub fn row_of(&self, user: UserId) -> Option<u32> {
        self.user_index.get(&user).copied()
    }

    /// The column index of a route, if the route was rated at all.
    pub fn col_of(&self, route: RouteId) -> Option<u32> {
        self.route_index.get(&route).copied()
    }

    /// The ratings of a user, indexed by column.
    pub fn row(&self, row: u32) -> Lane<'_> {
        self.rows.lane(row)
    }

    /// The ratings of a route, indexed by row.
    pub fn col(&self, col: u32) -> Lane<'_> {
        self.cols.lane(col)
    }

    pub fn get(&self, row: u32, col: u32) -> Option<f32> {
        self.row(row).get(col)
    }

    /// The mean of all ratings, zero for an empty matrix.
    pub fn mean(&self) -> f32 {
        if self.is_empty() {
            0.
        } else {
            self.rows.values.iter().sum::<f32>() / self.nnz() as f32
        }
    }

    /// Iterates over `(row, col, value)` in row major order.
    pub fn triples(&self) -> impl '_ + Iterator<Item = (u32, u32, f32)> {
        (0..self.n_users() as u32)
            .flat_map(move |row| self.row(row).iter().map(move |(col, value)| (row, col, value)))
    }

    /// Iterates over all entries ordered by user and then route.
    pub fn entries(&self) -> impl '_ + Iterator<Item = Entry> {
        self.triples().map(|(row, col, value)| Entry {
            user: self.user_id(row),
            route: self.route_id(col),
            value,
        })
    }

    /// Creates the sub-matrix of the entries for which `keep` holds.
    pub fn retain(&self, mut keep: impl FnMut(u32, u32, f32) -> bool) -> Self {
        let entries = self
            .triples()
            .filter(|&(row, col, value)| keep(row, col, value))
            .map(|(row, col, value)| Entry {
                user: self.user_id(row),
                route: self.route_id(col),
                value,
            })
            .collect_vec();

        Self::from_sorted_unique(&entries)
    }

    /// Creates the sub-matrix of the users and routes with enough ratings.
    ///
    /// The rating counts are taken from this matrix in a single pass, the filtered matrix is not
    /// filtered again. Hence raising the cutoff never retains more users or routes.
    pub fn filter(&self, cutoff: Cutoff) -> Self {
        let min = cutoff.min_ratings;
        let keep_users = matches!(cutoff.axis, CutoffAxis::Users | CutoffAxis::Both);
        let keep_routes = matches!(cutoff.axis, CutoffAxis::Routes | CutoffAxis::Both);

        let filtered = self.retain(|row, col, _| {
            (!keep_users || self.row(row).len() >= min)
                && (!keep_routes || self.col(col).len() >= min)
        });
        debug!(
            ?cutoff,
            users = filtered.n_users(),
            routes = filtered.n_routes(),
            ratings = filtered.nnz(),
            "filtered rating matrix",
        );

        filtered
    }
}

fn index_of<T>(ids: &[T]) -> HashMap<T, u32>
where
    T: Copy + Eq + std::hash::Hash,
{
    ids.iter()
        .enumerate()
        .map(|(index, &id)| (id, index as u32))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use beta_test_utils::assert_approx_eq;

    use super::*;

    pub(crate) fn matrix(ratings: &[(u64, u64, u8)]) -> RatingMatrix {
        RatingMatrix::from_ratings(
            ratings
                .iter()
                .map(|&(user, route, value)| Rating::new(user, route, value).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_rows_and_cols_agree() {
        let matrix = matrix(&[(3, 20, 4), (1, 10, 2), (1, 30, 1), (3, 10, 0)]);
        assert_eq!(matrix.users(), [UserId::new(1), UserId::new(3)]);
        assert_eq!(
            matrix.routes(),
            [RouteId::new(10), RouteId::new(20), RouteId::new(30)],
        );
        assert_eq!(matrix.nnz(), 4);

        for (row, col, value) in matrix.triples() {
            assert_eq!(matrix.col(col).get(row), Some(value));
        }
        assert_eq!(matrix.row(0).indices(), [0, 2]);
        assert_eq!(matrix.col(0).indices(), [0, 1]);
        assert_eq!(matrix.get(1, 0), Some(0.));
        assert_eq!(matrix.get(1, 2), None);
        assert_approx_eq!(f32, matrix.mean(), 1.75);
        assert_approx_eq!(f64, matrix.density(), 4. / 6.);
    }

    #[test]
    fn test_duplicate_rating() {
        let ratings = [
            Rating::new(1, 2, 3).unwrap(),
            Rating::new(1, 2, 4).unwrap(),
        ];
        assert!(matches!(
            RatingMatrix::from_ratings(ratings),
            Err(Error::DuplicateRating { user, route }) if user == UserId::new(1) && route == RouteId::new(2),
        ));
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = RatingMatrix::from_ratings([]).unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.n_users(), 0);
        assert_approx_eq!(f32, matrix.mean(), 0.);
        assert_approx_eq!(f64, matrix.density(), 0.);
    }

    #[test]
    fn test_filter_routes() {
        // route 10 has 3 ratings, route 20 has 2 and route 30 has 1
        let matrix = matrix(&[
            (1, 10, 4),
            (2, 10, 3),
            (3, 10, 2),
            (1, 20, 1),
            (2, 20, 1),
            (4, 30, 4),
        ]);

        let filtered = matrix.filter(Cutoff::routes(2));
        assert_eq!(filtered.routes(), [RouteId::new(10), RouteId::new(20)]);
        assert_eq!(filtered.n_users(), 3);

        let filtered = matrix.filter(Cutoff::routes(3));
        assert_eq!(filtered.routes(), [RouteId::new(10)]);
        assert_eq!(filtered.nnz(), 3);

        assert!(matrix.filter(Cutoff::routes(4)).is_empty());
    }

    #[test]
    fn test_filter_both_counts_once() {
        let matrix = matrix(&[(1, 10, 4), (1, 20, 4), (2, 10, 3), (3, 20, 1)]);

        // user 1 and both routes have 2 ratings, in the filtered matrix route 20 would only have
        // a single rating left but it isn't filtered again
        let filtered = matrix.filter(Cutoff::both(2));
        assert_eq!(filtered.users(), [UserId::new(1)]);
        assert_eq!(filtered.n_routes(), 2);
    }

    #[test]
    fn test_entries_round_trip() {
        let matrix = matrix(&[(5, 1, 1), (2, 9, 3), (2, 1, 4)]);
        let rebuilt = RatingMatrix::from_entries(matrix.entries()).unwrap();
        assert_eq!(rebuilt.entries().collect_vec(), matrix.entries().collect_vec());
    }
}
