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

use beta_engine::{
    Error,
    FallbackChain,
    LatentConfig,
    LatentModel,
    ModelSlot,
    NeighborConfig,
    Predictor,
    Query,
    Recommender,
    SelectorConfig,
    Trainer,
};
use beta_ratings::{Cutoff, Rating, RatingMatrix, RatingStore, Route, RouteFilter, RouteId, UserId};
use beta_test_utils::{error::Panic, synthetic::skewed_ratings};

fn matrix(ratings: &[(u64, u64, u8)]) -> RatingMatrix {
    RatingMatrix::from_ratings(
        ratings
            .iter()
            .map(|&(user, route, value)| Rating::new(user, route, value).unwrap()),
    )
    .unwrap()
}

#[test]
fn test_similar_routes_end_to_end() {
    let matrix = matrix(&[(1, 1, 4), (2, 1, 4), (1, 2, 4), (2, 2, 3), (3, 3, 1)]);

    let model = NeighborConfig::default()
        .with_cutoff(Cutoff::routes(1))
        .train(&matrix)
        .unwrap();
    let recommendations = model
        .recommend(&Query::Route(RouteId::new(1)), 10, None)
        .unwrap();

    let position = |route| {
        recommendations
            .iter()
            .position(|recommendation| recommendation.route == RouteId::new(route))
    };
    let r2 = position(2).unwrap();
    assert!(position(3).map_or(true, |r3| r2 < r3));
    assert!(position(1).is_none());
}

#[test]
fn test_serving_lifecycle() -> Result<(), Panic> {
    let matrix = matrix(&skewed_ratings(300, 100, 15, 17));
    let config = LatentConfig::default()
        .with_rank(8)?
        .with_cutoff(Cutoff::routes(5));

    let slot = ModelSlot::<LatentModel>::default();
    assert!(matches!(
        slot.recommend(&Query::User(UserId::new(1_000)), 5, None),
        Err(Error::NotFit),
    ));

    assert!(slot.retrain(&config, &matrix)?.is_none());
    let recommendations = slot.recommend(&Query::User(UserId::new(1_000)), 5, None)?;
    assert_eq!(recommendations.len(), 5);
    for recommendation in &recommendations {
        let prediction = slot.predict(UserId::new(1_000), recommendation.route)?;
        assert!((prediction - recommendation.score).abs() < 1e-5);
    }

    assert!(slot.retrain(&config, &matrix)?.is_some());
    Ok(())
}

#[test]
fn test_candidates_from_store() -> Result<(), Panic> {
    let mut boulder = Route::new(1);
    boulder.area = vec!["Colorado".into(), "Boulder".into()];
    boulder.description = "hand crack".into();
    let mut eldo = Route::new(2);
    eldo.area = vec!["Colorado".into(), "Eldorado Canyon".into()];
    let mut other = Route::new(3);
    other.area = vec!["Colorado".into(), "Boulder".into(), "Flatirons".into()];

    let ratings = [(1, 1, 4), (1, 2, 4), (1, 3, 4), (2, 1, 3), (2, 2, 3), (2, 3, 3)]
        .into_iter()
        .map(|(user, route, value)| Rating::new(user, route, value).unwrap());
    let store = RatingStore::new([boulder, eldo, other], ratings)?;
    let candidates = store.candidates(&RouteFilter::area("boulder"));

    let model = NeighborConfig::default()
        .with_cutoff(Cutoff::routes(1))
        .train(store.matrix())?;
    let recommendations =
        model.recommend(&Query::Route(RouteId::new(2)), 10, Some(&candidates))?;
    let routes = recommendations
        .iter()
        .map(|recommendation| recommendation.route)
        .collect::<Vec<_>>();
    assert_eq!(routes, [RouteId::new(1), RouteId::new(3)]);
    Ok(())
}

#[test]
fn test_sweep_trades_coverage_for_accuracy() {
    let matrix = matrix(&skewed_ratings(400, 150, 12, 23));
    let selector = SelectorConfig::default()
        .with_cutoffs(vec![1, 5, 20, 80])
        .unwrap()
        .build()
        .unwrap();
    let points = selector
        .sweep(&matrix, &NeighborConfig::default())
        .unwrap();

    assert_eq!(points.len(), 4);
    assert!(points
        .windows(2)
        .all(|pair| pair[0].retained_fraction >= pair[1].retained_fraction));
}

#[test]
fn test_fallback_from_cold_route() -> Result<(), Panic> {
    let ratings = [(1, 1, 4), (1, 2, 4), (2, 1, 3), (2, 2, 3), (3, 3, 2)];
    let neighbors = NeighborConfig::default()
        .with_cutoff(Cutoff::routes(2))
        .train(&matrix(&ratings))?;
    let fallback = NeighborConfig::default()
        .with_min_support(1)?
        .with_cutoff(Cutoff::routes(1))
        .train(&matrix(&[(3, 3, 2), (3, 1, 4)]))?;

    let chain = FallbackChain::new().with(neighbors).with(fallback);
    let recommendations = chain.recommend(&Query::Route(RouteId::new(3)), 5, None)?;
    assert_eq!(recommendations[0].route, RouteId::new(1));
    Ok(())
}
