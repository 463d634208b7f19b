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

//! Recommendation engines for climbing routes.
//!
//! Three independent engines rank routes:
//!
//! - [`TextModel`] compares the free text of routes over a closed climbing vocabulary.
//! - [`LatentModel`] factorizes the user × route rating matrix by alternating least squares
//!   and recommends unseen routes to a user.
//! - [`NeighborModel`] recommends the routes most similar to a route with respect to how the
//!   same users rated them.
//!
//! All of them implement [`Recommender`], the rating based ones also implement [`Predictor`]
//! and can be tuned with the [`ThresholdSelector`] and [`grid_search`].

#![forbid(unsafe_code)]
#![deny(
    clippy::pedantic,
    noop_method_call,
    rust_2018_idioms,
    unused_qualifications
)]
#![warn(unreachable_pub, rustdoc::missing_crate_level_docs)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::items_after_statements,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

mod artifact;
mod config;
mod error;
mod latent;
mod metrics;
mod neighbors;
mod recommender;
mod selector;
mod serving;
mod text;
mod utils;

pub use crate::{
    artifact::{load_artifact, save_artifact},
    config::ConfigError,
    error::{Entity, Error},
    latent::{LatentConfig, LatentModel, TrainingSummary},
    metrics::rmse,
    neighbors::{Neighbor, NeighborConfig, NeighborModel, SimilarityPolicy},
    recommender::{Predictor, Query, QueryKind, Recommendation, Recommender, Trainer},
    selector::{
        evaluate,
        grid_search,
        Evaluation,
        GridPoint,
        GridSearch,
        Population,
        SelectorConfig,
        SweepPoint,
        ThresholdSelector,
    },
    serving::{Engine, FallbackChain, ModelSlot},
    text::{TextConfig, TextModel, Vocabulary, DEFAULT_VOCABULARY},
};
