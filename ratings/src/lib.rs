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

//! The rating store: routes, users and their explicit ratings.
//!
//! Ratings are kept in a [`RatingMatrix`], a sparse users × routes matrix stored in compressed
//! row and column form. The matrix is never densified, the corpus this is built for has a density
//! well below `0.02%`.

#![forbid(unsafe_code)]
#![deny(
    clippy::pedantic,
    noop_method_call,
    rust_2018_idioms,
    unused_qualifications
)]
#![warn(unreachable_pub, rustdoc::missing_crate_level_docs)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

mod error;
mod id;
mod matrix;
mod rating;
mod route;
mod split;
mod store;
mod table;

pub use crate::{
    error::Error,
    id::{RouteId, UserId},
    matrix::{Cutoff, CutoffAxis, Entry, Lane, RatingMatrix},
    rating::{InvalidRating, Rating, RatingValue, MAX_RATING},
    route::{RatingStats, Route},
    split::{holdout, k_folds, Split},
    store::{Candidates, RatingStore, RouteFilter},
    table::{read_ratings, read_routes, TableConfig},
};
