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

use beta_ratings::{Candidates, Lane, RatingMatrix, RouteId, UserId};
use itertools::Itertools;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::{distributions::Uniform, rngs::StdRng, Rng, SeedableRng};
#[cfg(feature = "multithreaded")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{
    solve::{cholesky_solve, nonnegative_solve},
    LatentConfig,
};
use crate::{
    error::{Entity, Error},
    recommender::{is_candidate, Predictor, Query, Recommendation, Recommender},
    utils::{nan_safe_f32_cmp_desc, top_k},
};

/// How the training of a [`LatentModel`] went.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct TrainingSummary {
    pub iterations: usize,
    /// The regularized loss after the last iteration.
    pub loss: f32,
    /// The root mean squared error on the training ratings after the last iteration.
    pub rmse: f32,
    pub converged: bool,
}

/// A fitted latent factor engine.
///
/// Users and routes are embedded such that the inner product of a user and a route factor
/// approximates the rating.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LatentModel {
    config: LatentConfig,
    matrix: RatingMatrix,
    user_factors: Array2<f32>,
    route_factors: Array2<f32>,
    summary: TrainingSummary,
}

impl LatentModel {
    #[instrument(skip_all, fields(rank = config.rank(), ratings = matrix.nnz()))]
    pub(super) fn fit(config: LatentConfig, matrix: &RatingMatrix) -> Result<Self, Error> {
        if matrix.is_empty() {
            return Err(Error::EmptyMatrix);
        }

        let rank = config.rank();
        let mut rng = StdRng::seed_from_u64(config.seed());
        let init = Uniform::new(0., 1. / (rank as f32).sqrt());
        let mut user_factors = Array2::from_shape_simple_fn((matrix.n_users(), rank), || {
            rng.sample(init)
        });
        let mut route_factors = Array2::from_shape_simple_fn((matrix.n_routes(), rank), || {
            rng.sample(init)
        });

        let mut previous_loss = f64::INFINITY;
        let mut summary = TrainingSummary {
            iterations: 0,
            loss: f32::NAN,
            rmse: f32::NAN,
            converged: false,
        };
        for iteration in 1..=config.max_iterations() {
            let diverged = || Error::TrainingDivergence {
                iterations: iteration,
                loss: previous_loss as f32,
            };
            user_factors = solve_factors(&config, &user_factors, &route_factors, |row| {
                matrix.row(row)
            })
            .ok_or_else(diverged)?;
            route_factors = solve_factors(&config, &route_factors, &user_factors, |col| {
                matrix.col(col)
            })
            .ok_or_else(diverged)?;

            let (loss, squared_error) = regularized_loss(
                &config,
                matrix,
                user_factors.view(),
                route_factors.view(),
            );
            let rmse = (squared_error / matrix.nnz() as f64).sqrt();
            debug!(iteration, loss, rmse, "latent factor iteration");
            if !loss.is_finite() {
                return Err(Error::TrainingDivergence {
                    iterations: iteration,
                    loss: loss as f32,
                });
            }

            let progress = Progress::of(previous_loss, loss, config.tolerance());
            if progress == Progress::Increased {
                warn!(iteration, previous_loss, loss, "latent factor loss increased");
                if config.require_convergence() {
                    return Err(Error::TrainingDivergence {
                        iterations: iteration,
                        loss: loss as f32,
                    });
                }
            }
            summary = TrainingSummary {
                iterations: iteration,
                loss: loss as f32,
                rmse: rmse as f32,
                converged: progress == Progress::Converged,
            };
            previous_loss = loss;
            if summary.converged {
                break;
            }
        }

        if !summary.converged {
            if config.require_convergence() {
                return Err(Error::TrainingDivergence {
                    iterations: summary.iterations,
                    loss: summary.loss,
                });
            }
            warn!(
                iterations = summary.iterations,
                loss = summary.loss,
                "latent factor model didn't converge",
            );
        }
        info!(
            iterations = summary.iterations,
            loss = summary.loss,
            rmse = summary.rmse,
            converged = summary.converged,
            "fitted latent factor model",
        );

        Ok(Self {
            config,
            matrix: matrix.clone(),
            user_factors,
            route_factors,
            summary,
        })
    }

    pub fn config(&self) -> &LatentConfig {
        &self.config
    }

    pub fn summary(&self) -> &TrainingSummary {
        &self.summary
    }

    /// The factors of the users, one row per user in ascending order of their ids.
    pub fn user_factors(&self) -> &Array2<f32> {
        &self.user_factors
    }

    /// The factors of the routes, one row per route in ascending order of their ids.
    pub fn route_factors(&self) -> &Array2<f32> {
        &self.route_factors
    }

    fn row_of(&self, user: UserId) -> Result<u32, Error> {
        self.matrix
            .row_of(user)
            .ok_or(Error::ColdEntity(Entity::User(user)))
    }

    fn col_of(&self, route: RouteId) -> Result<u32, Error> {
        self.matrix
            .col_of(route)
            .ok_or(Error::ColdEntity(Entity::Route(route)))
    }

    fn recommend_to(
        &self,
        user: UserId,
        k: usize,
        candidates: Option<&Candidates>,
    ) -> Result<Vec<Recommendation>, Error> {
        let row = self.row_of(user)?;
        let rated = self.matrix.row(row);
        let scores = self.route_factors.dot(&self.user_factors.row(row as usize));

        let recommendations = scores
            .iter()
            .enumerate()
            .filter_map(|(col, &score)| {
                let col = col as u32;
                let route = self.matrix.route_id(col);
                (rated.get(col).is_none() && is_candidate(candidates, route)).then(|| {
                    let popularity = self.matrix.col(col).len();
                    (Recommendation { route, score }, popularity)
                })
            })
            .collect_vec();

        Ok(top_k(recommendations, k, |(a, a_popularity), (b, b_popularity)| {
            nan_safe_f32_cmp_desc(&a.score, &b.score)
                .then_with(|| b_popularity.cmp(a_popularity))
                .then_with(|| a.route.cmp(&b.route))
        })
        .into_iter()
        .map(|(recommendation, _)| recommendation)
        .collect())
    }
}

impl Predictor for LatentModel {
    fn predict(&self, user: UserId, route: RouteId) -> Result<f32, Error> {
        let row = self.row_of(user)?;
        let col = self.col_of(route)?;

        Ok(self
            .user_factors
            .row(row as usize)
            .dot(&self.route_factors.row(col as usize)))
    }

    fn converged(&self) -> bool {
        self.summary.converged
    }
}

impl Recommender for LatentModel {
    fn recommend(
        &self,
        query: &Query<'_>,
        k: usize,
        candidates: Option<&Candidates>,
    ) -> Result<Vec<Recommendation>, Error> {
        match *query {
            Query::User(user) => self.recommend_to(user, k, candidates),
            Query::Route(_) | Query::Text(_) => Err(Error::UnsupportedQuery(query.kind())),
        }
    }
}

/// The change of the loss by one alternating iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Progress {
    Improved,
    /// The relative change of the loss is within the tolerance.
    Converged,
    /// The loss grew by more than the tolerance.
    Increased,
}

impl Progress {
    fn of(previous_loss: f64, loss: f64, tolerance: f32) -> Self {
        if !previous_loss.is_finite() {
            return Self::Improved;
        }
        let bound = f64::from(tolerance) * previous_loss;
        let improvement = previous_loss - loss;
        if improvement > bound {
            Self::Improved
        } else if improvement >= -bound {
            Self::Converged
        } else {
            Self::Increased
        }
    }
}

/// Solves the regularized least squares problem of every row of `factors` given the `fixed`
/// factors of the other side.
///
/// Returns `None` if any of the systems is singular.
fn solve_factors<'a>(
    config: &LatentConfig,
    factors: &Array2<f32>,
    fixed: &Array2<f32>,
    lane: impl Fn(u32) -> Lane<'a> + Sync,
) -> Option<Array2<f32>> {
    let rows = 0..factors.nrows() as u32;
    #[cfg(feature = "multithreaded")]
    let rows = rows.into_par_iter();

    let solutions = rows
        .map(|row| solve_row(config, factors.row(row as usize), fixed, lane(row)))
        .collect::<Option<Vec<_>>>()?;

    let mut factors = Array2::zeros(factors.raw_dim());
    for (mut row, solution) in factors.axis_iter_mut(Axis(0)).zip(solutions) {
        row.assign(&solution);
    }

    Some(factors)
}

fn solve_row(
    config: &LatentConfig,
    current: ArrayView1<'_, f32>,
    fixed: &Array2<f32>,
    lane: Lane<'_>,
) -> Option<Array1<f32>> {
    let indices = lane.indices().iter().map(|&index| index as usize).collect_vec();
    let fixed = fixed.select(Axis(0), &indices);
    let ratings = ArrayView1::from(lane.values());

    let mut gram = fixed.t().dot(&fixed).mapv(f64::from);
    let rhs = fixed.t().dot(&ratings).mapv(f64::from);
    let regularization = f64::from(config.regularization()) * lane.len() as f64;
    gram.diag_mut().mapv_inplace(|diagonal| diagonal + regularization);

    let solution = if config.nonnegative() {
        nonnegative_solve(&gram, &rhs, current.mapv(f64::from))
    } else {
        cholesky_solve(gram, rhs)
    };

    solution.map(|solution| solution.mapv(|value| value as f32))
}

/// Computes the regularized loss and the squared error over the observed ratings.
fn regularized_loss(
    config: &LatentConfig,
    matrix: &RatingMatrix,
    user_factors: ArrayView2<'_, f32>,
    route_factors: ArrayView2<'_, f32>,
) -> (f64, f64) {
    let squared_error = matrix
        .triples()
        .map(|(row, col, value)| {
            let prediction = user_factors
                .row(row as usize)
                .dot(&route_factors.row(col as usize));
            let error = value - prediction;
            f64::from(error * error)
        })
        .sum::<f64>();

    let penalty = |factors: ArrayView2<'_, f32>, counts: &dyn Fn(u32) -> usize| {
        factors
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(index, factor)| counts(index as u32) as f64 * f64::from(factor.dot(&factor)))
            .sum::<f64>()
    };
    let penalty = penalty(user_factors, &|row| matrix.row(row).len())
        + penalty(route_factors, &|col| matrix.col(col).len());

    (
        squared_error + f64::from(config.regularization()) * penalty,
        squared_error,
    )
}
