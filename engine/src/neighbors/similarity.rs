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

use beta_ratings::RatingMatrix;
#[cfg(feature = "multithreaded")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use super::{NeighborConfig, SimilarityPolicy};
use crate::utils::{nan_safe_f32_cmp_desc, top_k};

/// A similar route, by column index of the training matrix.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub(super) struct Similar {
    pub(super) col: u32,
    pub(super) similarity: f32,
    pub(super) support: u32,
}

/// The mean and standard deviation of the ratings of a route.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub(super) struct Moments {
    pub(super) mean: f32,
    pub(super) deviation: f32,
}

impl Moments {
    pub(super) fn of(values: &[f32]) -> Self {
        let count = values.len().max(1) as f32;
        let mean = values.iter().sum::<f32>() / count;
        let variance = values
            .iter()
            .map(|value| (value - mean) * (value - mean))
            .sum::<f32>()
            / count;

        Self {
            mean,
            deviation: variance.sqrt(),
        }
    }
}

/// Co-rating statistics of one route against all others, reset after each route.
struct Scratch {
    touched: Vec<u32>,
    support: Vec<u32>,
    dot: Vec<f64>,
    squares: Vec<f64>,
    other_squares: Vec<f64>,
}

impl Scratch {
    fn new(routes: usize) -> Self {
        Self {
            touched: Vec::new(),
            support: vec![0; routes],
            dot: vec![0.; routes],
            squares: vec![0.; routes],
            other_squares: vec![0.; routes],
        }
    }
}

/// Computes the nearest neighbors of every route.
pub(super) fn nearest_neighbors(
    config: &NeighborConfig,
    matrix: &RatingMatrix,
    moments: &[Moments],
) -> Vec<Vec<Similar>> {
    // the norms of the mean centered routes over all of their ratings
    let norms = (0..matrix.n_routes() as u32)
        .map(|col| {
            let mean = f64::from(moments[col as usize].mean);
            matrix
                .col(col)
                .values()
                .iter()
                .map(|&value| (f64::from(value) - mean).powi(2))
                .sum::<f64>()
                .sqrt()
        })
        .collect::<Vec<_>>();
    let find =
        |scratch: &mut Scratch, col| neighbors_of(config, matrix, moments, &norms, scratch, col);

    let cols = 0..matrix.n_routes() as u32;
    #[cfg(not(feature = "multithreaded"))]
    let neighbors = {
        let mut scratch = Scratch::new(matrix.n_routes());
        cols.map(|col| find(&mut scratch, col)).collect()
    };
    #[cfg(feature = "multithreaded")]
    let neighbors = cols
        .into_par_iter()
        .map_init(|| Scratch::new(matrix.n_routes()), find)
        .collect();

    neighbors
}

fn neighbors_of(
    config: &NeighborConfig,
    matrix: &RatingMatrix,
    moments: &[Moments],
    norms: &[f64],
    scratch: &mut Scratch,
    col: u32,
) -> Vec<Similar> {
    let centered = config.policy() == SimilarityPolicy::MeanImputed;
    let value = |col: u32, value: f32| {
        if centered {
            f64::from(value - moments[col as usize].mean)
        } else {
            f64::from(value)
        }
    };

    for (row, rating) in matrix.col(col).iter() {
        let x = value(col, rating);
        for (other, other_rating) in matrix.row(row).iter() {
            if other == col {
                continue;
            }
            let other = other as usize;
            if scratch.support[other] == 0 {
                scratch.touched.push(other as u32);
            }
            let y = value(other as u32, other_rating);
            scratch.support[other] += 1;
            scratch.dot[other] += x * y;
            scratch.squares[other] += x * x;
            scratch.other_squares[other] += y * y;
        }
    }

    let mut similar = Vec::with_capacity(scratch.touched.len());
    for other in scratch.touched.drain(..) {
        let index = other as usize;
        let denominator = match config.policy() {
            SimilarityPolicy::CoRated => {
                (scratch.squares[index] * scratch.other_squares[index]).sqrt()
            }
            SimilarityPolicy::MeanImputed => norms[col as usize] * norms[index],
        };
        let similarity = if denominator > 0. {
            (scratch.dot[index] / denominator).clamp(-1., 1.) as f32
        } else {
            0.
        };
        let support = scratch.support[index];

        if support as usize >= config.min_support() && similarity > 0. {
            similar.push(Similar {
                col: other,
                similarity,
                support,
            });
        }

        scratch.support[index] = 0;
        scratch.dot[index] = 0.;
        scratch.squares[index] = 0.;
        scratch.other_squares[index] = 0.;
    }

    top_k(similar, config.neighbors(), |a, b| {
        nan_safe_f32_cmp_desc(&a.similarity, &b.similarity).then_with(|| a.col.cmp(&b.col))
    })
}
