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

use std::path::PathBuf;

use displaydoc::Display;
use thiserror::Error;

use crate::{
    id::{RouteId, UserId},
    rating::InvalidRating,
};

/// Errors of the rating store.
#[derive(Debug, Display, Error)]
pub enum Error {
    /// {0}
    InvalidRating(#[from] InvalidRating),
    /// User {user} rated route {route} more than once
    DuplicateRating { user: UserId, route: RouteId },
    /// Route {0} is listed more than once
    DuplicateRoute(RouteId),
    /// Invalid table delimiter {0:?}, expected an ascii character
    Delimiter(char),
    /// Failed to read the table {path:?}: {source}
    Table { path: PathBuf, source: csv::Error },
    /// Invalid hold-out fraction {0}, expected a value in the open unit interval
    HoldoutFraction(f32),
    /// Invalid number of folds {folds} for {ratings} ratings, expected at least two folds and one rating per fold
    Folds { folds: usize, ratings: usize },
}
