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

use beta_ratings::{Candidates, RatingMatrix, RouteId, UserId};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{
    similarity::{nearest_neighbors, Moments, Similar},
    NeighborConfig,
};
use crate::{
    error::{Entity, Error},
    recommender::{is_candidate, Predictor, Query, Recommendation, Recommender},
};

/// A route similar to another route.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Neighbor {
    pub route: RouteId,
    pub similarity: f32,
    /// The number of users who rated both routes.
    pub support: u32,
}

/// A fitted route similarity engine.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NeighborModel {
    config: NeighborConfig,
    matrix: RatingMatrix,
    moments: Vec<Moments>,
    neighbors: Vec<Vec<Similar>>,
}

impl NeighborModel {
    #[instrument(skip_all, fields(routes = matrix.n_routes(), ratings = matrix.nnz()))]
    pub(super) fn fit(config: NeighborConfig, matrix: &RatingMatrix) -> Result<Self, Error> {
        if matrix.is_empty() {
            return Err(Error::EmptyMatrix);
        }

        let moments = (0..matrix.n_routes() as u32)
            .map(|col| Moments::of(matrix.col(col).values()))
            .collect_vec();
        let neighbors = nearest_neighbors(&config, matrix, &moments);
        info!(
            pairs = neighbors.iter().map(Vec::len).sum::<usize>(),
            isolated = neighbors.iter().filter(|similar| similar.is_empty()).count(),
            "fitted route similarity model",
        );

        Ok(Self {
            config,
            matrix: matrix.clone(),
            moments,
            neighbors,
        })
    }

    pub fn config(&self) -> &NeighborConfig {
        &self.config
    }

    /// The nearest neighbors of a route, ordered by descending similarity.
    pub fn neighbors(&self, route: RouteId) -> Result<Vec<Neighbor>, Error> {
        let col = self.col_of(route)?;
        Ok(self.neighbors[col as usize]
            .iter()
            .map(|similar| Neighbor {
                route: self.matrix.route_id(similar.col),
                similarity: similar.similarity,
                support: similar.support,
            })
            .collect())
    }

    fn col_of(&self, route: RouteId) -> Result<u32, Error> {
        self.matrix
            .col_of(route)
            .ok_or(Error::ColdEntity(Entity::Route(route)))
    }
}

impl Predictor for NeighborModel {
    /// Predicts a rating by the z-scores of the user's ratings of the route's neighbors.
    fn predict(&self, user: UserId, route: RouteId) -> Result<f32, Error> {
        let row = self
            .matrix
            .row_of(user)
            .ok_or(Error::ColdEntity(Entity::User(user)))?;
        let col = self.col_of(route)?;
        let deviation = |moments: &Moments| {
            if moments.deviation > 0. {
                moments.deviation
            } else {
                1.
            }
        };

        let ratings = self.matrix.row(row);
        let (weighted, weights) = self.neighbors[col as usize]
            .iter()
            .filter_map(|similar| {
                ratings.get(similar.col).map(|rating| {
                    let moments = &self.moments[similar.col as usize];
                    let z_score = (rating - moments.mean) / deviation(moments);
                    (similar.similarity * z_score, similar.similarity)
                })
            })
            .fold((0., 0.), |(weighted, weights), (z_score, weight)| {
                (weighted + z_score, weights + weight)
            });

        let moments = &self.moments[col as usize];
        Ok(if weights > 0. {
            moments.mean + deviation(moments) * weighted / weights
        } else {
            moments.mean
        })
    }
}

impl Recommender for NeighborModel {
    fn recommend(
        &self,
        query: &Query<'_>,
        k: usize,
        candidates: Option<&Candidates>,
    ) -> Result<Vec<Recommendation>, Error> {
        let Query::Route(route) = *query else {
            return Err(Error::UnsupportedQuery(query.kind()));
        };
        let col = self.col_of(route)?;

        Ok(self.neighbors[col as usize]
            .iter()
            .map(|similar| Recommendation {
                route: self.matrix.route_id(similar.col),
                score: similar.similarity,
            })
            .filter(|recommendation| is_candidate(candidates, recommendation.route))
            .take(k)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use beta_ratings::{Cutoff, Rating};
    use beta_test_utils::{assert_approx_eq, synthetic::skewed_ratings};

    use super::*;
    use crate::recommender::{QueryKind, Trainer};

    fn matrix(ratings: &[(u64, u64, u8)]) -> RatingMatrix {
        RatingMatrix::from_ratings(
            ratings
                .iter()
                .map(|&(user, route, value)| Rating::new(user, route, value).unwrap()),
        )
        .unwrap()
    }

    fn routes(recommendations: &[Recommendation]) -> Vec<u64> {
        recommendations
            .iter()
            .map(|recommendation| recommendation.route.get())
            .collect()
    }

    #[test]
    fn test_recommend_similar_routes() {
        let matrix = matrix(&[(1, 1, 4), (2, 1, 4), (1, 2, 4), (2, 2, 3), (3, 3, 1)]);
        let model = NeighborConfig::default()
            .with_cutoff(Cutoff::routes(1))
            .train(&matrix)
            .unwrap();

        let recommendations = model.recommend(&Query::Route(RouteId::new(1)), 5, None).unwrap();
        assert_eq!(routes(&recommendations), [2]);
        assert_approx_eq!(f32, recommendations[0].score, 28. / 800_f32.sqrt());

        // route 3 exists but has no neighbors
        assert!(model
            .recommend(&Query::Route(RouteId::new(3)), 5, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_recommend_properties() {
        let matrix = matrix(&skewed_ratings(200, 60, 12, 9));
        let model = NeighborConfig::default()
            .with_neighbors(10)
            .unwrap()
            .fit(&matrix)
            .unwrap();

        for &route in matrix.routes() {
            let query = Query::Route(route);
            let recommendations = model.recommend(&query, 5, None).unwrap();
            assert!(recommendations.len() <= 5);
            assert!(!recommendations
                .iter()
                .any(|recommendation| recommendation.route == route));
            assert!(recommendations
                .windows(2)
                .all(|pair| pair[0].score >= pair[1].score));
            assert_eq!(model.recommend(&query, 5, None).unwrap(), recommendations);
        }
    }

    #[test]
    fn test_candidates() {
        let matrix = matrix(&[
            (1, 1, 4),
            (1, 2, 4),
            (1, 3, 3),
            (2, 1, 3),
            (2, 2, 4),
            (2, 3, 2),
        ]);
        let model = NeighborConfig::default().fit(&matrix).unwrap();
        let all = model.recommend(&Query::Route(RouteId::new(1)), 5, None).unwrap();
        assert_eq!(all.len(), 2);

        let candidates = [RouteId::new(3)].into_iter().collect::<Candidates>();
        let recommendations = model
            .recommend(&Query::Route(RouteId::new(1)), 5, Some(&candidates))
            .unwrap();
        assert_eq!(routes(&recommendations), [3]);
    }

    #[test]
    fn test_cold_entities() {
        let matrix = matrix(&[(1, 1, 4), (2, 1, 4), (1, 2, 4), (2, 2, 3), (3, 3, 1)]);
        let model = NeighborConfig::default()
            .with_cutoff(Cutoff::routes(2))
            .train(&matrix)
            .unwrap();

        assert!(matches!(
            model.recommend(&Query::Route(RouteId::new(3)), 5, None),
            Err(Error::ColdEntity(Entity::Route(route))) if route == RouteId::new(3),
        ));
        assert!(matches!(
            model.predict(UserId::new(3), RouteId::new(1)),
            Err(Error::ColdEntity(Entity::User(user))) if user == UserId::new(3),
        ));
        assert!(matches!(
            model.predict(UserId::new(1), RouteId::new(3)),
            Err(Error::ColdEntity(Entity::Route(_))),
        ));
        assert!(matches!(
            model.recommend(&Query::User(UserId::new(1)), 5, None),
            Err(Error::UnsupportedQuery(QueryKind::User)),
        ));
    }

    #[test]
    fn test_empty_matrix() {
        assert!(matches!(
            NeighborConfig::default().fit(&RatingMatrix::default()),
            Err(Error::EmptyMatrix),
        ));
    }

    /// A model with hand made statistics, route 1 has the neighbors 2 and 3.
    fn handmade_model() -> NeighborModel {
        let matrix = matrix(&[(1, 2, 4), (1, 3, 1), (2, 1, 2), (2, 4, 0)]);
        NeighborModel {
            config: NeighborConfig::default(),
            matrix,
            moments: vec![
                Moments {
                    mean: 3.,
                    deviation: 1.,
                },
                Moments {
                    mean: 2.,
                    deviation: 2.,
                },
                Moments {
                    mean: 2.,
                    deviation: 0.,
                },
                Moments {
                    mean: 0.,
                    deviation: 0.,
                },
            ],
            neighbors: vec![
                vec![
                    Similar {
                        col: 1,
                        similarity: 0.5,
                        support: 2,
                    },
                    Similar {
                        col: 2,
                        similarity: 0.25,
                        support: 2,
                    },
                ],
                Vec::new(),
                Vec::new(),
                Vec::new(),
            ],
        }
    }

    #[test]
    fn test_predict_z_score() {
        let model = handmade_model();
        // 3 + 1 * (0.5 * (4 - 2) / 2 + 0.25 * (1 - 2) / 1) / 0.75
        assert_approx_eq!(
            f32,
            model.predict(UserId::new(1), RouteId::new(1)).unwrap(),
            3. + 1. / 3.,
        );
    }

    #[test]
    fn test_predict_without_rated_neighbors() {
        let model = handmade_model();
        assert_approx_eq!(
            f32,
            model.predict(UserId::new(2), RouteId::new(1)).unwrap(),
            3.,
        );
        assert_approx_eq!(
            f32,
            model.predict(UserId::new(1), RouteId::new(4)).unwrap(),
            0.,
        );
    }

    #[test]
    fn test_neighbors() {
        let model = handmade_model();
        let neighbors = model.neighbors(RouteId::new(1)).unwrap();
        assert_eq!(
            neighbors
                .iter()
                .map(|neighbor| neighbor.route.get())
                .collect_vec(),
            [2, 3],
        );
        assert!(model.neighbors(RouteId::new(4)).unwrap().is_empty());
        assert!(model.neighbors(RouteId::new(5)).is_err());
    }
}
