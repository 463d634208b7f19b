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

//! Route based recommendations by the similarity of how routes were rated.

mod model;
mod similarity;

use beta_ratings::{Cutoff, RatingMatrix};
use serde::{Deserialize, Serialize};

pub use self::model::{Neighbor, NeighborModel};
use crate::{config::ConfigError, error::Error, recommender::Trainer};

/// How ratings missing from a pair of routes are treated when their similarity is computed.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityPolicy {
    /// Cosine similarity over the users who rated both routes.
    #[default]
    CoRated,
    /// Cosine similarity of the mean centered routes, a missing rating counts as the mean.
    MeanImputed,
}

/// Configurations of the route similarity engine.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
#[must_use]
pub struct NeighborConfig {
    neighbors: usize,
    min_support: usize,
    policy: SimilarityPolicy,
    cutoff: Cutoff,
}

impl Default for NeighborConfig {
    fn default() -> Self {
        Self {
            neighbors: 50,
            min_support: 2,
            policy: SimilarityPolicy::default(),
            cutoff: Cutoff::routes(20),
        }
    }
}

impl NeighborConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.neighbors == 0 {
            return Err(ConfigError::Neighbors);
        }
        if self.min_support == 0 {
            return Err(ConfigError::MinSupport);
        }

        Ok(())
    }

    /// The maximum number of neighbors kept per route.
    pub fn neighbors(&self) -> usize {
        self.neighbors
    }

    /// Sets the maximum number of neighbors.
    ///
    /// # Errors
    /// Fails if the number of neighbors is zero.
    pub fn with_neighbors(mut self, neighbors: usize) -> Result<Self, Error> {
        self.neighbors = neighbors;
        self.validate()?;

        Ok(self)
    }

    /// The minimum number of users who rated both routes of a pair of neighbors.
    pub fn min_support(&self) -> usize {
        self.min_support
    }

    /// Sets the minimum support.
    ///
    /// # Errors
    /// Fails if the minimum support is zero.
    pub fn with_min_support(mut self, min_support: usize) -> Result<Self, Error> {
        self.min_support = min_support;
        self.validate()?;

        Ok(self)
    }

    pub fn policy(&self) -> SimilarityPolicy {
        self.policy
    }

    /// Sets the missing value policy.
    pub fn with_policy(mut self, policy: SimilarityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the cutoff.
    pub fn with_cutoff(mut self, cutoff: Cutoff) -> Self {
        self.cutoff = cutoff;
        self
    }
}

impl Trainer for NeighborConfig {
    type Model = NeighborModel;

    fn fit(&self, matrix: &RatingMatrix) -> Result<Self::Model, Error> {
        self.validate()?;
        NeighborModel::fit(self.clone(), matrix)
    }

    fn cutoff(&self) -> Cutoff {
        self.cutoff
    }
}
