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

use std::{
    collections::{btree_map::Entry as MapEntry, BTreeMap, HashSet},
    sync::Arc,
};

use derive_more::{Deref, From};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::Error,
    id::RouteId,
    matrix::RatingMatrix,
    rating::Rating,
    route::{RatingStats, Route},
    table::{read_ratings, read_routes, TableConfig},
};

/// Restricts the routes a recommendation may contain.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouteFilter {
    /// Only routes within the area of this name.
    pub area: Option<String>,
    /// Only routes among these.
    pub routes: Option<HashSet<RouteId>>,
}

impl RouteFilter {
    pub fn area(area: impl Into<String>) -> Self {
        Self {
            area: Some(area.into()),
            routes: None,
        }
    }

    fn matches(&self, route: &Route) -> bool {
        self.area.as_ref().map_or(true, |area| route.is_within(area))
            && self
                .routes
                .as_ref()
                .map_or(true, |routes| routes.contains(&route.id))
    }
}

/// The routes which may be recommended.
#[derive(Clone, Debug, Default, Deref, From, PartialEq, Eq)]
pub struct Candidates(HashSet<RouteId>);

impl FromIterator<RouteId> for Candidates {
    fn from_iter<I: IntoIterator<Item = RouteId>>(routes: I) -> Self {
        Self(routes.into_iter().collect())
    }
}

/// The read-only input of all engines: routes with their metadata and the rating matrix.
#[derive(Clone, Debug)]
pub struct RatingStore {
    routes: BTreeMap<RouteId, Route>,
    matrix: Arc<RatingMatrix>,
}

impl RatingStore {
    /// Creates a store and computes the rating statistics of the routes.
    ///
    /// Ratings of routes without metadata are kept, they still carry information for the rating
    /// based engines.
    pub fn new(
        routes: impl IntoIterator<Item = Route>,
        ratings: impl IntoIterator<Item = Rating>,
    ) -> Result<Self, Error> {
        let mut by_id = BTreeMap::new();
        for route in routes {
            match by_id.entry(route.id) {
                MapEntry::Vacant(entry) => {
                    entry.insert(route);
                }
                MapEntry::Occupied(entry) => return Err(Error::DuplicateRoute(*entry.key())),
            }
        }

        let matrix = RatingMatrix::from_ratings(ratings)?;
        let mut unknown = 0;
        for col in 0..matrix.n_routes() as u32 {
            let ratings = matrix.col(col);
            if let Some(route) = by_id.get_mut(&matrix.route_id(col)) {
                route.stats = RatingStats {
                    count: ratings.len(),
                    mean: ratings.mean(),
                };
            } else {
                unknown += 1;
            }
        }
        if unknown > 0 {
            warn!(routes = unknown, "ratings of routes without metadata");
        }
        info!(
            routes = by_id.len(),
            users = matrix.n_users(),
            ratings = matrix.nnz(),
            density = matrix.density(),
            "created rating store",
        );

        Ok(Self {
            routes: by_id,
            matrix: Arc::new(matrix),
        })
    }

    /// Reads the tables and creates a store.
    pub fn load(config: &TableConfig) -> Result<Self, Error> {
        let routes = read_routes(&config.routes, config.delimiter)?;
        let ratings = read_ratings(&config.ratings, config.delimiter)?;
        Self::new(routes, ratings)
    }

    pub fn matrix(&self) -> &Arc<RatingMatrix> {
        &self.matrix
    }

    pub fn route(&self, id: RouteId) -> Option<&Route> {
        self.routes.get(&id)
    }

    /// Iterates over the routes ordered by id.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    /// The routes matching the filter.
    pub fn candidates(&self, filter: &RouteFilter) -> Candidates {
        self.routes()
            .filter(|route| filter.matches(route))
            .map(|route| route.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use beta_test_utils::assert_approx_eq;

    use super::*;

    fn store() -> RatingStore {
        let routes = [
            Route {
                area: vec!["Colorado".into(), "Boulder".into()],
                ..Route::new(1)
            },
            Route {
                area: vec!["Colorado".into(), "Eldorado Canyon".into()],
                ..Route::new(2)
            },
            Route::new(3),
        ];
        let ratings = [(10, 1, 4), (11, 1, 3), (10, 2, 1), (12, 9, 2)]
            .map(|(user, route, value)| Rating::new(user, route, value).unwrap());
        RatingStore::new(routes, ratings).unwrap()
    }

    #[test]
    fn test_route_stats() {
        let store = store();
        let stats = store.route(RouteId::new(1)).unwrap().stats;
        assert_eq!(stats.count, 2);
        assert_approx_eq!(f32, stats.mean, 3.5);
        assert_eq!(store.route(RouteId::new(3)).unwrap().stats.count, 0);
        // route 9 has ratings but no metadata
        assert!(store.route(RouteId::new(9)).is_none());
        assert_eq!(store.matrix().n_routes(), 3);
    }

    #[test]
    fn test_duplicate_route() {
        assert!(matches!(
            RatingStore::new([Route::new(1), Route::new(1)], []),
            Err(Error::DuplicateRoute(id)) if id == RouteId::new(1),
        ));
    }

    #[test]
    fn test_candidates() {
        let store = store();
        let all = store.candidates(&RouteFilter::default());
        assert_eq!(all.len(), 3);

        let boulder = store.candidates(&RouteFilter::area("boulder"));
        assert_eq!(boulder, [RouteId::new(1)].into_iter().collect());

        let colorado = store.candidates(&RouteFilter {
            area: Some("Colorado".into()),
            routes: Some([RouteId::new(2), RouteId::new(3)].into()),
        });
        assert_eq!(colorado, [RouteId::new(2)].into_iter().collect());
    }
}
