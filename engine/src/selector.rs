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

//! Selection of training cutoffs and hyperparameters by their held-out error.

use beta_ratings::{holdout, k_folds, Cutoff, CutoffAxis, RatingMatrix, Split};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    config::ConfigError,
    error::Error,
    metrics::rmse,
    recommender::{Predictor, Trainer},
};

/// The entities whose retention is reported by a sweep.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Population {
    #[default]
    Users,
    Routes,
}

impl Population {
    fn size(self, matrix: &RatingMatrix) -> usize {
        match self {
            Self::Users => matrix.n_users(),
            Self::Routes => matrix.n_routes(),
        }
    }
}

/// Configurations of the threshold selector.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
#[must_use]
pub struct SelectorConfig {
    cutoffs: Vec<usize>,
    axis: CutoffAxis,
    population: Population,
    holdout: f32,
    folds: usize,
    seed: u64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            cutoffs: vec![1, 2, 5, 10, 20, 50, 100],
            axis: CutoffAxis::Routes,
            population: Population::Users,
            holdout: 0.2,
            folds: 5,
            seed: 42,
        }
    }
}

impl SelectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cutoffs.is_empty() {
            return Err(ConfigError::Cutoffs);
        }
        if !(self.holdout > 0. && self.holdout < 1.) {
            return Err(ConfigError::Holdout);
        }
        if self.folds < 2 {
            return Err(ConfigError::Folds);
        }

        Ok(())
    }

    /// The minimum numbers of ratings which are swept, in ascending order.
    pub fn cutoffs(&self) -> Vec<usize> {
        self.cutoffs.iter().copied().sorted_unstable().dedup().collect()
    }

    /// Sets the cutoffs.
    ///
    /// # Errors
    /// Fails if there are no cutoffs.
    pub fn with_cutoffs(mut self, cutoffs: Vec<usize>) -> Result<Self, Error> {
        self.cutoffs = cutoffs;
        self.validate()?;

        Ok(self)
    }

    /// The axis along which the cutoffs filter.
    pub fn axis(&self) -> CutoffAxis {
        self.axis
    }

    /// Sets the axis.
    pub fn with_axis(mut self, axis: CutoffAxis) -> Self {
        self.axis = axis;
        self
    }

    /// The entities whose retained fraction is reported.
    pub fn population(&self) -> Population {
        self.population
    }

    /// Sets the population.
    pub fn with_population(mut self, population: Population) -> Self {
        self.population = population;
        self
    }

    /// The fraction of ratings held out for evaluation.
    pub fn holdout(&self) -> f32 {
        self.holdout
    }

    /// Sets the hold-out fraction.
    ///
    /// # Errors
    /// Fails if the fraction is not within the open unit interval.
    pub fn with_holdout(mut self, holdout: f32) -> Result<Self, Error> {
        self.holdout = holdout;
        self.validate()?;

        Ok(self)
    }

    /// The number of cross-validation folds of a grid search.
    pub fn folds(&self) -> usize {
        self.folds
    }

    /// Sets the number of folds.
    ///
    /// # Errors
    /// Fails if there are less than two folds.
    pub fn with_folds(mut self, folds: usize) -> Result<Self, Error> {
        self.folds = folds;
        self.validate()?;

        Ok(self)
    }

    /// The seed of the splits.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Creates a threshold selector.
    pub fn build(self) -> Result<ThresholdSelector, Error> {
        self.validate()?;
        Ok(ThresholdSelector { config: self })
    }
}

/// The held-out error of a model.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Evaluation {
    /// The root mean squared error, absent if no held-out rating could be predicted.
    pub rmse: Option<f32>,
    /// The number of held-out ratings which were predicted.
    pub evaluated: usize,
    /// The number of held-out ratings of users or routes unknown to the model.
    pub dropped: usize,
    /// Whether the training converged, false if no model could be fitted.
    pub converged: bool,
}

/// The outcome of one cutoff of a sweep.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct SweepPoint {
    pub cutoff: usize,
    /// The fraction of the population which is retained by the cutoff.
    pub retained_fraction: f32,
    pub rmse: Option<f32>,
    pub evaluated: usize,
    pub dropped: usize,
    pub converged: bool,
}

/// Trades the coverage of a model against its accuracy by sweeping a training cutoff.
#[derive(Clone, Debug)]
pub struct ThresholdSelector {
    config: SelectorConfig,
}

impl ThresholdSelector {
    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Evaluates the trainer on the matrix filtered by each cutoff.
    ///
    /// The cutoff of the trainer itself is ignored. A cutoff which leaves too few ratings or whose
    /// training diverges is reported without an error.
    #[instrument(skip_all, fields(cutoffs = ?self.config.cutoffs))]
    pub fn sweep<T>(&self, matrix: &RatingMatrix, trainer: &T) -> Result<Vec<SweepPoint>, Error>
    where
        T: Trainer,
    {
        let population = self.config.population();
        let total = population.size(matrix);

        self.config
            .cutoffs()
            .into_iter()
            .map(|cutoff| -> Result<SweepPoint, Error> {
                let filtered = matrix.filter(Cutoff {
                    axis: self.config.axis(),
                    min_ratings: cutoff,
                });
                let retained_fraction = if total > 0 {
                    population.size(&filtered) as f32 / total as f32
                } else {
                    0.
                };

                let evaluation = if filtered.nnz() < 2 {
                    Evaluation::default()
                } else {
                    let split = holdout(&filtered, self.config.holdout(), self.config.seed())?;
                    evaluate_or_skip(trainer, &split)?
                };
                info!(
                    cutoff,
                    retained_fraction,
                    rmse = ?evaluation.rmse,
                    evaluated = evaluation.evaluated,
                    dropped = evaluation.dropped,
                    converged = evaluation.converged,
                    "swept cutoff",
                );

                Ok(SweepPoint {
                    cutoff,
                    retained_fraction,
                    rmse: evaluation.rmse,
                    evaluated: evaluation.evaluated,
                    dropped: evaluation.dropped,
                    converged: evaluation.converged,
                })
            })
            .collect()
    }

    /// Runs a [`grid_search`] with the configured folds and seed.
    pub fn grid_search<T>(
        &self,
        matrix: &RatingMatrix,
        candidates: impl IntoIterator<Item = T>,
    ) -> Result<GridSearch<T>, Error>
    where
        T: Trainer,
    {
        grid_search(matrix, candidates, self.config.folds(), self.config.seed())
    }
}

/// Fits a model on the training part of the split and scores it on the held-out part.
///
/// Held-out ratings of users or routes unknown to the model are dropped instead of scored.
pub fn evaluate<T>(trainer: &T, split: &Split) -> Result<Evaluation, Error>
where
    T: Trainer,
{
    let model = match trainer.fit(&split.train) {
        Ok(model) => model,
        Err(Error::EmptyMatrix) => {
            return Ok(Evaluation {
                rmse: None,
                evaluated: 0,
                dropped: split.test.len(),
                converged: false,
            })
        }
        Err(error) => return Err(error),
    };

    let mut pairs = Vec::with_capacity(split.test.len());
    let mut dropped = 0;
    for entry in &split.test {
        match model.predict(entry.user, entry.route) {
            Ok(prediction) => pairs.push((prediction, entry.value)),
            Err(Error::ColdEntity(_)) => dropped += 1,
            Err(error) => return Err(error),
        }
    }

    Ok(Evaluation {
        rmse: rmse(pairs.iter().copied()),
        evaluated: pairs.len(),
        dropped,
        converged: model.converged(),
    })
}

fn evaluate_or_skip<T>(trainer: &T, split: &Split) -> Result<Evaluation, Error>
where
    T: Trainer,
{
    match evaluate(trainer, split) {
        Err(error @ Error::TrainingDivergence { .. }) => {
            warn!(%error, "skipped evaluation");
            Ok(Evaluation {
                rmse: None,
                evaluated: 0,
                dropped: split.test.len(),
                converged: false,
            })
        }
        result => result,
    }
}

/// The cross-validated error of one candidate of a grid search.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GridPoint<T> {
    pub candidate: T,
    /// The mean root mean squared error over the evaluated folds.
    pub rmse: Option<f32>,
    /// The number of folds which could be evaluated.
    pub folds: usize,
    /// Whether the training converged on every fold.
    pub converged: bool,
}

/// The outcome of a grid search.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GridSearch<T> {
    pub points: Vec<GridPoint<T>>,
}

impl<T> GridSearch<T> {
    /// The candidate with the lowest error, the first one on ties.
    pub fn best(&self) -> Option<&GridPoint<T>> {
        self.points
            .iter()
            .filter_map(|point| point.rmse.map(|rmse| (rmse, point)))
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, point)| point)
    }
}

/// Cross-validates each candidate on the same `folds` folds of the matrix.
#[instrument(skip(matrix, candidates))]
pub fn grid_search<T>(
    matrix: &RatingMatrix,
    candidates: impl IntoIterator<Item = T>,
    folds: usize,
    seed: u64,
) -> Result<GridSearch<T>, Error>
where
    T: Trainer,
{
    if folds < 2 {
        return Err(ConfigError::Folds.into());
    }
    let splits = k_folds(matrix, folds, seed)?;

    let points = candidates
        .into_iter()
        .map(|candidate| -> Result<GridPoint<T>, Error> {
            let evaluations = splits
                .iter()
                .map(|split| evaluate_or_skip(&candidate, split))
                .collect::<Result<Vec<_>, _>>()?;
            let errors = evaluations
                .iter()
                .filter_map(|evaluation| evaluation.rmse)
                .collect_vec();
            let rmse = (!errors.is_empty())
                .then(|| errors.iter().sum::<f32>() / errors.len() as f32);
            let converged = evaluations.iter().all(|evaluation| evaluation.converged);
            info!(rmse = ?rmse, folds = errors.len(), converged, "cross-validated candidate");

            Ok(GridPoint {
                candidate,
                rmse,
                folds: errors.len(),
                converged,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(GridSearch { points })
}

#[cfg(test)]
mod tests {
    use beta_ratings::{Entry, Rating, RouteId, UserId};
    use beta_test_utils::synthetic::{rank_two_ratings, skewed_ratings};

    use super::*;
    use crate::{LatentConfig, NeighborConfig};

    fn matrix(ratings: &[(u64, u64, u8)]) -> RatingMatrix {
        RatingMatrix::from_ratings(
            ratings
                .iter()
                .map(|&(user, route, value)| Rating::new(user, route, value).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_validate_default_config() {
        SelectorConfig::default().validate().unwrap();
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            SelectorConfig::default().with_cutoffs(Vec::new()),
            Err(Error::InvalidConfig(ConfigError::Cutoffs)),
        ));
        assert!(matches!(
            SelectorConfig::default().with_holdout(1.),
            Err(Error::InvalidConfig(ConfigError::Holdout)),
        ));
        assert!(matches!(
            SelectorConfig::default().with_folds(1),
            Err(Error::InvalidConfig(ConfigError::Folds)),
        ));
    }

    #[test]
    fn test_cutoffs_are_sorted() {
        let config = SelectorConfig::default()
            .with_cutoffs(vec![10, 1, 5, 1])
            .unwrap();
        assert_eq!(config.cutoffs(), [1, 5, 10]);
    }

    #[test]
    fn test_sweep() {
        let matrix = matrix(&skewed_ratings(150, 80, 10, 4));
        let selector = SelectorConfig::default()
            .with_cutoffs(vec![1, 3, 10, 30, 100_000])
            .unwrap()
            .build()
            .unwrap();
        let points = selector.sweep(&matrix, &NeighborConfig::default()).unwrap();

        assert_eq!(
            points.iter().map(|point| point.cutoff).collect_vec(),
            [1, 3, 10, 30, 100_000],
        );
        assert!((points[0].retained_fraction - 1.).abs() < f32::EPSILON);
        assert!(points
            .windows(2)
            .all(|pair| pair[0].retained_fraction >= pair[1].retained_fraction));
        assert!(points[0].rmse.is_some());
        assert!(points[0].evaluated > 0);

        let last = points.last().unwrap();
        assert!(last.retained_fraction.abs() < f32::EPSILON);
        assert!(last.rmse.is_none());
        assert_eq!(last.evaluated, 0);
    }

    #[test]
    fn test_sweep_is_deterministic() {
        let matrix = matrix(&skewed_ratings(60, 30, 8, 2));
        let selector = SelectorConfig::default().build().unwrap();
        let trainer = LatentConfig::default().with_rank(3).unwrap();
        assert_eq!(
            selector.sweep(&matrix, &trainer).unwrap(),
            selector.sweep(&matrix, &trainer).unwrap(),
        );
    }

    #[test]
    fn test_sweep_reports_convergence() {
        let matrix = matrix(&rank_two_ratings(20, 15, 7));
        let selector = SelectorConfig::default()
            .with_cutoffs(vec![1])
            .unwrap()
            .build()
            .unwrap();
        let stopped_early = LatentConfig::default()
            .with_rank(2)
            .unwrap()
            .with_max_iterations(1)
            .unwrap();

        let points = selector.sweep(&matrix, &stopped_early).unwrap();
        assert!(points[0].rmse.is_some());
        assert!(!points[0].converged);

        let points = selector.sweep(&matrix, &NeighborConfig::default()).unwrap();
        assert!(points[0].converged);

        let search = grid_search(&matrix, [stopped_early], 3, 1).unwrap();
        assert_eq!(search.points[0].folds, 3);
        assert!(!search.points[0].converged);
    }

    #[test]
    fn test_evaluate_drops_cold_entities() {
        let train = matrix(&[(1, 1, 4), (1, 2, 3), (2, 1, 3), (2, 2, 2)]);
        let test = vec![
            Entry {
                user: UserId::new(1),
                route: RouteId::new(2),
                value: 4.,
            },
            Entry {
                user: UserId::new(3),
                route: RouteId::new(1),
                value: 1.,
            },
            Entry {
                user: UserId::new(2),
                route: RouteId::new(3),
                value: 1.,
            },
        ];
        let evaluation = evaluate(&NeighborConfig::default(), &Split { train, test }).unwrap();

        assert_eq!(evaluation.evaluated, 1);
        assert_eq!(evaluation.dropped, 2);
        assert!(evaluation.rmse.is_some());
        assert!(evaluation.converged);
    }

    #[test]
    fn test_evaluate_empty_training() {
        let test = vec![Entry {
            user: UserId::new(1),
            route: RouteId::new(1),
            value: 4.,
        }];
        let split = Split {
            train: RatingMatrix::default(),
            test,
        };
        let evaluation = evaluate(&NeighborConfig::default(), &split).unwrap();
        assert_eq!(
            evaluation,
            Evaluation {
                rmse: None,
                evaluated: 0,
                dropped: 1,
                converged: false,
            },
        );
    }

    #[test]
    fn test_grid_search_prefers_true_rank() {
        let matrix = matrix(&rank_two_ratings(30, 20, 11));
        let base = LatentConfig::default()
            .with_regularization(1e-3)
            .unwrap()
            .with_max_iterations(50)
            .unwrap()
            .with_nonnegative(false);
        let candidates = [1, 2].map(|rank| base.clone().with_rank(rank).unwrap());
        let search = grid_search(&matrix, candidates, 3, 5).unwrap();

        assert_eq!(search.points.len(), 2);
        assert!(search.points.iter().all(|point| point.folds == 3));
        assert_eq!(search.best().unwrap().candidate.rank(), 2);
    }

    #[test]
    fn test_grid_search_invalid_folds() {
        let matrix = matrix(&[(1, 1, 4), (1, 2, 3)]);
        assert!(matches!(
            grid_search(&matrix, [NeighborConfig::default()], 1, 0),
            Err(Error::InvalidConfig(ConfigError::Folds)),
        ));
        assert!(matches!(
            grid_search(&matrix, [NeighborConfig::default()], 3, 0),
            Err(Error::Ratings(_)),
        ));
    }

    #[test]
    fn test_best() {
        let search = GridSearch {
            points: vec![
                GridPoint {
                    candidate: 'a',
                    rmse: None,
                    folds: 0,
                    converged: false,
                },
                GridPoint {
                    candidate: 'b',
                    rmse: Some(0.8),
                    folds: 3,
                    converged: true,
                },
                GridPoint {
                    candidate: 'c',
                    rmse: Some(0.7),
                    folds: 3,
                    converged: true,
                },
                GridPoint {
                    candidate: 'd',
                    rmse: Some(0.7),
                    folds: 3,
                    converged: true,
                },
            ],
        };
        assert_eq!(search.best().unwrap().candidate, 'c');
        assert!(GridSearch::<char> { points: Vec::new() }.best().is_none());
    }
}
