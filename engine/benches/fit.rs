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

use std::hint::black_box;

use beta_engine::{LatentConfig, NeighborConfig, Query, Recommender, TextConfig, Trainer};
use beta_ratings::{Rating, RatingMatrix, Route, RouteId, UserId};
use beta_test_utils::synthetic::skewed_ratings;
use criterion::{criterion_group, Criterion};

fn create_matrix(users: usize, routes: usize, per_user: usize) -> RatingMatrix {
    RatingMatrix::from_ratings(
        skewed_ratings(users, routes, per_user, 42)
            .into_iter()
            .map(|(user, route, value)| Rating::new(user, route, value).unwrap()),
    )
    .unwrap()
}

fn bench_fit_latent(c: &mut Criterion) {
    let matrix = create_matrix(2_000, 500, 20);

    for rank in [10, 50] {
        let config = LatentConfig::default()
            .with_rank(rank)
            .unwrap()
            .with_max_iterations(3)
            .unwrap();
        c.bench_function(&format!("fit_latent_r{rank}"), |b| {
            b.iter(|| black_box(config.fit(black_box(&matrix)).unwrap()))
        });
    }
}

fn bench_fit_neighbors(c: &mut Criterion) {
    let matrix = create_matrix(2_000, 500, 20);
    let config = NeighborConfig::default();

    c.bench_function("fit_neighbors", |b| {
        b.iter(|| black_box(config.fit(black_box(&matrix)).unwrap()))
    });
}

fn bench_recommend(c: &mut Criterion) {
    let matrix = create_matrix(2_000, 500, 20);
    let latent = LatentConfig::default()
        .with_rank(50)
        .unwrap()
        .with_max_iterations(3)
        .unwrap()
        .fit(&matrix)
        .unwrap();
    let user = Query::User(UserId::new(1_000));

    c.bench_function("recommend_latent", |b| {
        b.iter(|| black_box(latent.recommend(black_box(&user), 10, None).unwrap()))
    });

    let routes = (1..=500_u64)
        .map(|id| Route {
            description: ["thin hand crack", "steep slab", "roof with a fist jam"][id as usize % 3]
                .into(),
            ..Route::new(id)
        })
        .collect::<Vec<_>>();
    let text = TextConfig::default().fit(&routes).unwrap();
    let route = Query::Route(RouteId::new(1));

    c.bench_function("recommend_text", |b| {
        b.iter(|| black_box(text.recommend(black_box(&route), 10, None).unwrap()))
    });
}

criterion_group!(b_fit_latent, bench_fit_latent);
criterion_group!(b_fit_neighbors, bench_fit_neighbors);
criterion_group!(b_recommend, bench_recommend);

fn main() {
    criterion::Criterion::default()
        .configure_from_args()
        .final_summary();

    b_fit_latent();
    b_fit_neighbors();
    b_recommend();
}
