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

use displaydoc::Display;
use thiserror::Error;

/// Errors of the engine configurations.
#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid rank, expected positive value
    Rank,
    /// Invalid regularization, expected finite non-negative value
    Regularization,
    /// Invalid maximum number of iterations, expected positive value
    MaxIterations,
    /// Invalid tolerance, expected finite non-negative value
    Tolerance,
    /// Invalid number of neighbors, expected positive value
    Neighbors,
    /// Invalid minimum support, expected positive value
    MinSupport,
    /// Invalid n-gram range, expected `1 <= min <= max`
    NgramRange,
    /// Invalid vocabulary, expected at least one term
    Vocabulary,
    /// Invalid hold-out fraction, expected value from the open unit interval
    Holdout,
    /// Invalid number of folds, expected at least two
    Folds,
    /// Invalid cutoffs, expected at least one cutoff
    Cutoffs,
}
