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

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use beta_ratings::{Candidates, RatingMatrix, RouteId, UserId};
use derive_more::From;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::Error,
    latent::LatentModel,
    neighbors::NeighborModel,
    recommender::{Predictor, Query, Recommendation, Recommender, Trainer},
    text::TextModel,
};

/// Any fitted engine.
#[derive(Clone, Debug, Deserialize, From, Serialize)]
pub enum Engine {
    Text(TextModel),
    Latent(LatentModel),
    Neighbors(NeighborModel),
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Latent(_) => "latent",
            Self::Neighbors(_) => "neighbors",
        }
    }
}

impl Recommender for Engine {
    fn recommend(
        &self,
        query: &Query<'_>,
        k: usize,
        candidates: Option<&Candidates>,
    ) -> Result<Vec<Recommendation>, Error> {
        match self {
            Self::Text(model) => model.recommend(query, k, candidates),
            Self::Latent(model) => model.recommend(query, k, candidates),
            Self::Neighbors(model) => model.recommend(query, k, candidates),
        }
    }
}

impl<T> Recommender for Arc<T>
where
    T: Recommender + ?Sized,
{
    fn recommend(
        &self,
        query: &Query<'_>,
        k: usize,
        candidates: Option<&Candidates>,
    ) -> Result<Vec<Recommendation>, Error> {
        (**self).recommend(query, k, candidates)
    }
}

/// Holds the current version of a model.
///
/// A new version replaces the current one in a single atomic swap. Readers keep using the version
/// they loaded until they load again.
#[derive(Debug)]
pub struct ModelSlot<M> {
    current: ArcSwapOption<M>,
}

impl<M> Default for ModelSlot<M> {
    fn default() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }
}

impl<M> ModelSlot<M> {
    pub fn new(model: M) -> Self {
        Self {
            current: ArcSwapOption::from_pointee(model),
        }
    }

    pub fn is_fit(&self) -> bool {
        self.current.load().is_some()
    }

    /// Loads the current version.
    pub fn load(&self) -> Result<Arc<M>, Error> {
        self.current.load_full().ok_or(Error::NotFit)
    }

    /// Replaces the current version and returns the previous one.
    pub fn store(&self, model: M) -> Option<Arc<M>> {
        self.current.swap(Some(Arc::new(model)))
    }

    /// Trains a new version and replaces the current one with it.
    ///
    /// The current version stays in place if training fails.
    pub fn retrain<T>(&self, trainer: &T, matrix: &RatingMatrix) -> Result<Option<Arc<M>>, Error>
    where
        T: Trainer<Model = M>,
    {
        let model = trainer.train(matrix)?;
        Ok(self.store(model))
    }
}

impl<M> Recommender for ModelSlot<M>
where
    M: Recommender,
{
    fn recommend(
        &self,
        query: &Query<'_>,
        k: usize,
        candidates: Option<&Candidates>,
    ) -> Result<Vec<Recommendation>, Error> {
        self.load()?.recommend(query, k, candidates)
    }
}

impl<M> Predictor for ModelSlot<M>
where
    M: Predictor,
{
    fn predict(&self, user: UserId, route: RouteId) -> Result<f32, Error> {
        self.load()?.predict(user, route)
    }

    fn converged(&self) -> bool {
        self.load().is_ok_and(|model| model.converged())
    }
}

/// Asks engines in order until one of them can answer a query.
///
/// An engine is skipped if it doesn't know the queried user or route or doesn't serve the kind
/// of query. Any other error is returned as is.
#[derive(Default)]
pub struct FallbackChain {
    engines: Vec<Box<dyn Recommender + Send + Sync>>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an engine to the chain.
    #[must_use]
    pub fn with(mut self, engine: impl Recommender + Send + Sync + 'static) -> Self {
        self.engines.push(Box::new(engine));
        self
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl Recommender for FallbackChain {
    fn recommend(
        &self,
        query: &Query<'_>,
        k: usize,
        candidates: Option<&Candidates>,
    ) -> Result<Vec<Recommendation>, Error> {
        let mut last_error = Error::NotFit;
        for (position, engine) in self.engines.iter().enumerate() {
            match engine.recommend(query, k, candidates) {
                Err(error) if error.allows_fallback() => {
                    debug!(position, %error, "falling back to the next engine");
                    last_error = error;
                }
                result => return result,
            }
        }

        Err(last_error)
    }
}
