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

//! Seeded synthetic rating tables.
//!
//! Ratings are plain `(user, route, value)` triples so that the helpers don't depend on the
//! types of the crates they are used to test.

use std::collections::HashSet;

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Zipf};

/// A raw `(user, route, value)` rating.
pub type Triple = (u64, u64, u8);

/// Creates the complete rating table of a noise free rank 2 matrix.
///
/// User factors are drawn from `{0, 1, 2}^2` and route factors from `{0, 1}^2`, hence every
/// inner product is a valid rating in `0..=4`. User ids start at `1_000` and route ids at `1`.
pub fn rank_two_ratings(users: usize, routes: usize, seed: u64) -> Vec<Triple> {
    let mut rng = StdRng::seed_from_u64(seed);
    let user_factors = (0..users)
        .map(|_| [rng.gen_range(0..=2_u8), rng.gen_range(0..=2_u8)])
        .collect::<Vec<_>>();
    let route_factors = (0..routes)
        .map(|_| [rng.gen_range(0..=1_u8), rng.gen_range(0..=1_u8)])
        .collect::<Vec<_>>();

    user_factors
        .iter()
        .enumerate()
        .flat_map(|(user, x)| {
            route_factors.iter().enumerate().map(move |(route, y)| {
                (
                    1_000 + user as u64,
                    1 + route as u64,
                    x[0] * y[0] + x[1] * y[1],
                )
            })
        })
        .collect()
}

/// Creates a sparse rating table with a long tailed route popularity.
///
/// Each user rates `per_user` distinct routes, drawn from a Zipf distribution over the routes so
/// that few routes collect most of the ratings, like on a real climbing platform.
pub fn skewed_ratings(users: usize, routes: usize, per_user: usize, seed: u64) -> Vec<Triple> {
    assert!(per_user <= routes, "a user can't rate more routes than exist");
    let mut rng = StdRng::seed_from_u64(seed);
    let popularity = Zipf::new(routes as u64, 1.1).expect("valid zipf parameters");

    let mut ratings = Vec::with_capacity(users * per_user);
    for user in 0..users as u64 {
        let mut rated = HashSet::with_capacity(per_user);
        while rated.len() < per_user {
            // zipf samples are floats in `1..=routes`
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let route = popularity.sample(&mut rng) as u64;
            if rated.insert(route) {
                ratings.push((1_000 + user, route, rng.gen_range(0..=4)));
            }
        }
    }
    ratings
}
