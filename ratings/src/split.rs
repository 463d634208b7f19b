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

//! Seeded splits of a rating matrix into training and held-out ratings.

use itertools::Itertools;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::{
    error::Error,
    matrix::{Entry, RatingMatrix},
};

/// A training matrix and the ratings held out of it.
#[derive(Clone, Debug)]
pub struct Split {
    pub train: RatingMatrix,
    pub test: Vec<Entry>,
}

/// Shuffles the positions of all ratings in a reproducible way.
fn shuffled_positions(matrix: &RatingMatrix, seed: u64) -> Vec<usize> {
    let mut positions = (0..matrix.nnz()).collect_vec();
    positions.shuffle(&mut StdRng::seed_from_u64(seed));
    positions
}

/// Splits the matrix on the given positions into a held-out and a training part.
fn split_at(matrix: &RatingMatrix, held_out: &[bool]) -> Split {
    let mut position = 0;
    let mut test = Vec::new();
    let train = matrix.retain(|row, col, value| {
        let keep = !held_out[position];
        if !keep {
            test.push(Entry {
                user: matrix.user_id(row),
                route: matrix.route_id(col),
                value,
            });
        }
        position += 1;
        keep
    });

    Split { train, test }
}

/// Holds out a random `fraction` of the ratings.
///
/// The split only depends on the matrix and the seed. Users or routes whose ratings are all held
/// out are absent from the training matrix.
pub fn holdout(matrix: &RatingMatrix, fraction: f32, seed: u64) -> Result<Split, Error> {
    if !(fraction > 0. && fraction < 1.) {
        return Err(Error::HoldoutFraction(fraction));
    }

    #[allow(clippy::cast_sign_loss)]
    let n_test = (fraction * matrix.nnz() as f32).round() as usize;
    let mut held_out = vec![false; matrix.nnz()];
    for position in shuffled_positions(matrix, seed).into_iter().take(n_test) {
        held_out[position] = true;
    }

    Ok(split_at(matrix, &held_out))
}

/// Partitions the ratings randomly into `folds` folds and holds out each fold once.
pub fn k_folds(matrix: &RatingMatrix, folds: usize, seed: u64) -> Result<Vec<Split>, Error> {
    if folds < 2 || folds > matrix.nnz() {
        return Err(Error::Folds {
            folds,
            ratings: matrix.nnz(),
        });
    }

    let mut fold_of = vec![0; matrix.nnz()];
    for (rank, position) in shuffled_positions(matrix, seed).into_iter().enumerate() {
        fold_of[position] = rank % folds;
    }

    Ok((0..folds)
        .map(|fold| {
            let held_out = fold_of.iter().map(|&f| f == fold).collect_vec();
            split_at(matrix, &held_out)
        })
        .collect())
}
