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

use beta_ratings::{RouteId, UserId};
use displaydoc::Display;
use thiserror::Error;

use crate::{config::ConfigError, recommender::QueryKind};

/// An entity which can be missing from a fitted model.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Entity {
    /// user {0}
    User(UserId),
    /// route {0}
    Route(RouteId),
}

/// Errors of the recommendation engines.
#[derive(Debug, Display, Error)]
pub enum Error {
    /// The {0} is unknown to the model or was excluded by the training cutoff
    ColdEntity(Entity),
    /// The query contains no term of the vocabulary
    EmptyQuery,
    /// No model has been fit yet
    NotFit,
    /// Training diverged after {iterations} iterations with a loss of {loss}
    TrainingDivergence { iterations: usize, loss: f32 },
    /// The engine doesn't serve {0} queries
    UnsupportedQuery(QueryKind),
    /// Invalid configuration: {0}
    InvalidConfig(#[from] ConfigError),
    /// The rating matrix to train on is empty
    EmptyMatrix,
    /// Invalid ratings: {0}
    Ratings(#[from] beta_ratings::Error),
    /// Failed to read or write the artifact {path:?}: {source}
    Artifact {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
}

impl Error {
    /// Whether the error is caused by a query the engine can't answer but another engine might.
    pub fn allows_fallback(&self) -> bool {
        matches!(self, Self::ColdEntity(_) | Self::UnsupportedQuery(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::ColdEntity(Entity::User(UserId::new(7))).to_string(),
            "The user 7 is unknown to the model or was excluded by the training cutoff",
        );
        assert_eq!(
            Error::UnsupportedQuery(QueryKind::Text).to_string(),
            "The engine doesn't serve text queries",
        );
    }

    #[test]
    fn test_allows_fallback() {
        assert!(Error::ColdEntity(Entity::Route(RouteId::new(1))).allows_fallback());
        assert!(Error::UnsupportedQuery(QueryKind::User).allows_fallback());
        assert!(!Error::EmptyQuery.allows_fallback());
        assert!(!Error::NotFit.allows_fallback());
    }
}
