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

use beta_ratings::{Candidates, Cutoff, RatingMatrix, RouteId, UserId};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The kind of a [`Query`].
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum QueryKind {
    #[display(fmt = "user")]
    User,
    #[display(fmt = "route")]
    Route,
    #[display(fmt = "text")]
    Text,
}

/// What routes are recommended for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Query<'a> {
    /// Routes a user hasn't rated yet but would like.
    User(UserId),
    /// Routes similar to a route.
    Route(RouteId),
    /// Routes whose description matches a free text.
    Text(&'a str),
}

impl Query<'_> {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::User(_) => QueryKind::User,
            Self::Route(_) => QueryKind::Route,
            Self::Text(_) => QueryKind::Text,
        }
    }
}

/// A recommended route and its engine specific score.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Recommendation {
    pub route: RouteId,
    pub score: f32,
}

/// Ranks routes for a query.
pub trait Recommender {
    /// Recommends at most `k` routes ordered by descending score.
    ///
    /// If `candidates` are given, only those routes are considered. Equal scores are ordered
    /// deterministically.
    fn recommend(
        &self,
        query: &Query<'_>,
        k: usize,
        candidates: Option<&Candidates>,
    ) -> Result<Vec<Recommendation>, Error>;
}

/// Predicts the rating a user would give a route.
pub trait Predictor {
    fn predict(&self, user: UserId, route: RouteId) -> Result<f32, Error>;

    /// Whether the fitting of the model converged within its iteration bounds.
    fn converged(&self) -> bool {
        true
    }
}

/// Fits a model from a rating matrix.
///
/// Implemented by the configurations of the rating based engines.
pub trait Trainer {
    type Model: Predictor + Recommender;

    /// Fits a model on the given matrix as it is.
    fn fit(&self, matrix: &RatingMatrix) -> Result<Self::Model, Error>;

    /// The cutoff the model is supposed to be trained with.
    fn cutoff(&self) -> Cutoff;

    /// Filters the matrix by the configured cutoff and fits a model on it.
    fn train(&self, matrix: &RatingMatrix) -> Result<Self::Model, Error> {
        self.fit(&matrix.filter(self.cutoff()))
    }
}

pub(crate) fn is_candidate(candidates: Option<&Candidates>, route: RouteId) -> bool {
    candidates.map_or(true, |candidates| candidates.contains(&route))
}
