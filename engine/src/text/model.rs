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

use std::{cmp::Ordering, collections::HashMap};

use beta_ratings::{Candidates, Route, RouteId};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{
    tokenize::{ngrams, tokenize},
    TextConfig,
};
use crate::{
    error::{Entity, Error},
    recommender::{is_candidate, Query, Recommendation, Recommender},
    utils::{nan_safe_f32_cmp_desc, top_k},
};

/// A sparse L2-normalized TF-IDF vector, sorted by term.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
struct TermVector {
    terms: Vec<u32>,
    weights: Vec<f32>,
}

impl TermVector {
    fn new(counts: HashMap<u32, u32>, idf: &[f32]) -> Self {
        let (terms, mut weights): (Vec<_>, Vec<_>) = counts
            .into_iter()
            .sorted_unstable_by_key(|&(term, _)| term)
            .map(|(term, count)| (term, count as f32 * idf[term as usize]))
            .unzip();
        let norm = weights.iter().map(|weight| weight * weight).sum::<f32>().sqrt();
        if norm > 0. {
            for weight in &mut weights {
                *weight /= norm;
            }
        }

        Self { terms, weights }
    }

    fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn iter(&self) -> impl '_ + Iterator<Item = (u32, f32)> {
        self.terms.iter().copied().zip(self.weights.iter().copied())
    }

    fn dot(&self, other: &Self) -> f32 {
        let (mut i, mut j, mut dot) = (0, 0, 0.);
        while i < self.terms.len() && j < other.terms.len() {
            match self.terms[i].cmp(&other.terms[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    dot += self.weights[i] * other.weights[j];
                    i += 1;
                    j += 1;
                }
            }
        }

        dot
    }
}

/// A fitted text engine.
///
/// Every route is represented by the TF-IDF vector of its description, protection and comments
/// restricted to the vocabulary. Routes are similar if their vectors have a high cosine
/// similarity.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TextModel {
    config: TextConfig,
    idf: Vec<f32>,
    routes: Vec<RouteId>,
    route_index: HashMap<RouteId, u32>,
    vectors: Vec<TermVector>,
    /// The routes containing a term together with their weights, per term.
    postings: Vec<Vec<(u32, f32)>>,
}

impl TextModel {
    #[instrument(skip_all)]
    pub(super) fn fit<'a>(config: TextConfig, routes: impl IntoIterator<Item = &'a Route>) -> Self {
        let max_order = config.vocabulary().max_order();
        if max_order > *config.ngram_range().end() {
            warn!(
                max_order,
                "the vocabulary contains terms longer than the largest n-gram",
            );
        }

        let routes = routes
            .into_iter()
            .sorted_by_key(|route| route.id)
            .dedup_by(|a, b| a.id == b.id)
            .collect_vec();
        let counts = routes
            .iter()
            .map(|route| term_counts(&config, &route.text()))
            .collect_vec();

        let mut document_frequencies = vec![0_u32; config.vocabulary().len()];
        for &term in counts.iter().flat_map(HashMap::keys) {
            document_frequencies[term as usize] += 1;
        }
        let documents = routes.len() as f32;
        let idf = document_frequencies
            .into_iter()
            .map(|df| ((1. + documents) / (1. + df as f32)).ln() + 1.)
            .collect_vec();

        let vectors = counts
            .into_iter()
            .map(|counts| TermVector::new(counts, &idf))
            .collect_vec();
        let mut postings = vec![Vec::new(); idf.len()];
        for (route, vector) in vectors.iter().enumerate() {
            for (term, weight) in vector.iter() {
                postings[term as usize].push((route as u32, weight));
            }
        }

        let routes = routes.into_iter().map(|route| route.id).collect_vec();
        let route_index = routes
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index as u32))
            .collect();
        info!(
            routes = routes.len(),
            empty = vectors.iter().filter(|vector| vector.is_empty()).count(),
            terms = idf.len(),
            "fitted text model",
        );

        Self {
            config,
            idf,
            routes,
            route_index,
            vectors,
            postings,
        }
    }

    pub fn config(&self) -> &TextConfig {
        &self.config
    }

    /// The number of routes the model was fit on.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Whether the text of the route contains at least one vocabulary term.
    pub fn has_terms(&self, route: RouteId) -> Result<bool, Error> {
        Ok(!self.vector_of(route)?.is_empty())
    }

    /// The cosine similarity between the texts of two routes.
    pub fn similarity(&self, a: RouteId, b: RouteId) -> Result<f32, Error> {
        Ok(self.vector_of(a)?.dot(self.vector_of(b)?))
    }

    fn vector_of(&self, route: RouteId) -> Result<&TermVector, Error> {
        self.route_index
            .get(&route)
            .map(|&index| &self.vectors[index as usize])
            .ok_or(Error::ColdEntity(Entity::Route(route)))
    }

    fn vectorize(&self, text: &str) -> TermVector {
        TermVector::new(term_counts(&self.config, text), &self.idf)
    }

    fn rank(
        &self,
        query: &TermVector,
        exclude: Option<u32>,
        k: usize,
        candidates: Option<&Candidates>,
    ) -> Result<Vec<Recommendation>, Error> {
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }

        let mut scores = HashMap::<u32, f32>::new();
        for (term, weight) in query.iter() {
            for &(route, route_weight) in &self.postings[term as usize] {
                *scores.entry(route).or_default() += weight * route_weight;
            }
        }
        let recommendations = scores
            .into_iter()
            .filter(|&(route, score)| {
                Some(route) != exclude
                    && score > 0.
                    && is_candidate(candidates, self.routes[route as usize])
            })
            .map(|(route, score)| Recommendation {
                route: self.routes[route as usize],
                score: score.min(1.),
            })
            .collect_vec();

        Ok(top_k(recommendations, k, |a, b| {
            nan_safe_f32_cmp_desc(&a.score, &b.score).then_with(|| a.route.cmp(&b.route))
        }))
    }
}

impl Recommender for TextModel {
    fn recommend(
        &self,
        query: &Query<'_>,
        k: usize,
        candidates: Option<&Candidates>,
    ) -> Result<Vec<Recommendation>, Error> {
        match *query {
            Query::Route(route) => {
                let index = self
                    .route_index
                    .get(&route)
                    .copied()
                    .ok_or(Error::ColdEntity(Entity::Route(route)))?;
                self.rank(&self.vectors[index as usize], Some(index), k, candidates)
            }
            Query::Text(text) => self.rank(&self.vectorize(text), None, k, candidates),
            Query::User(_) => Err(Error::UnsupportedQuery(query.kind())),
        }
    }
}

/// Counts the vocabulary terms of a text.
fn term_counts(config: &TextConfig, text: &str) -> HashMap<u32, u32> {
    let tokens = tokenize(text, config.remove_stop_words());
    let mut counts = HashMap::new();
    for term in ngrams(&tokens, config.ngram_range()) {
        if let Some(term) = config.vocabulary().get(&term) {
            *counts.entry(term).or_default() += 1;
        }
    }

    counts
}
