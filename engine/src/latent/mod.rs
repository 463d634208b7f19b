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

//! User based recommendations by latent factors of the rating matrix.

mod model;
mod solve;

use beta_ratings::{Cutoff, RatingMatrix};
use serde::{Deserialize, Serialize};

pub use self::model::{LatentModel, TrainingSummary};
use crate::{config::ConfigError, error::Error, recommender::Trainer};

/// Configurations of the latent factor engine.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
#[must_use]
pub struct LatentConfig {
    rank: usize,
    regularization: f32,
    max_iterations: usize,
    tolerance: f32,
    require_convergence: bool,
    nonnegative: bool,
    seed: u64,
    cutoff: Cutoff,
}

impl Default for LatentConfig {
    fn default() -> Self {
        Self {
            rank: 150,
            regularization: 0.15,
            max_iterations: 10,
            tolerance: 1e-4,
            require_convergence: false,
            nonnegative: true,
            seed: 42,
            cutoff: Cutoff::routes(20),
        }
    }
}

impl LatentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rank == 0 {
            return Err(ConfigError::Rank);
        }
        if !self.regularization.is_finite() || self.regularization < 0. {
            return Err(ConfigError::Regularization);
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::MaxIterations);
        }
        if !self.tolerance.is_finite() || self.tolerance < 0. {
            return Err(ConfigError::Tolerance);
        }

        Ok(())
    }

    /// The dimension of the user and route factors.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Sets the rank.
    ///
    /// # Errors
    /// Fails if the rank is zero.
    pub fn with_rank(mut self, rank: usize) -> Result<Self, Error> {
        self.rank = rank;
        self.validate()?;

        Ok(self)
    }

    /// The regularization weight, it is scaled by the number of ratings of each user and route.
    pub fn regularization(&self) -> f32 {
        self.regularization
    }

    /// Sets the regularization.
    ///
    /// # Errors
    /// Fails if the regularization is negative or not finite.
    pub fn with_regularization(mut self, regularization: f32) -> Result<Self, Error> {
        self.regularization = regularization;
        self.validate()?;

        Ok(self)
    }

    /// The maximum number of alternating iterations.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Sets the maximum number of iterations.
    ///
    /// # Errors
    /// Fails if the maximum number of iterations is zero.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Result<Self, Error> {
        self.max_iterations = max_iterations;
        self.validate()?;

        Ok(self)
    }

    /// The relative loss improvement below which training has converged.
    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Sets the tolerance.
    ///
    /// # Errors
    /// Fails if the tolerance is negative or not finite.
    pub fn with_tolerance(mut self, tolerance: f32) -> Result<Self, Error> {
        self.tolerance = tolerance;
        self.validate()?;

        Ok(self)
    }

    /// Whether training fails if it didn't converge within the maximum number of iterations.
    pub fn require_convergence(&self) -> bool {
        self.require_convergence
    }

    /// Sets the convergence requirement.
    pub fn with_require_convergence(mut self, require_convergence: bool) -> Self {
        self.require_convergence = require_convergence;
        self
    }

    /// Whether the factors are constrained to be non-negative.
    pub fn nonnegative(&self) -> bool {
        self.nonnegative
    }

    /// Sets the non-negativity constraint.
    pub fn with_nonnegative(mut self, nonnegative: bool) -> Self {
        self.nonnegative = nonnegative;
        self
    }

    /// The seed of the factor initialization.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the cutoff.
    pub fn with_cutoff(mut self, cutoff: Cutoff) -> Self {
        self.cutoff = cutoff;
        self
    }
}

impl Trainer for LatentConfig {
    type Model = LatentModel;

    fn fit(&self, matrix: &RatingMatrix) -> Result<Self::Model, Error> {
        self.validate()?;
        LatentModel::fit(self.clone(), matrix)
    }

    fn cutoff(&self) -> Cutoff {
        self.cutoff
    }
}
