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

use std::path::PathBuf;

use beta_engine::Query;
use beta_ratings::{RouteId, UserId};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Evaluates, trains and queries the climbing route recommender.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub(crate) struct Args {
    /// File to log to additionally to logging to stderr.
    #[arg(short, long)]
    pub(crate) log_file: Option<PathBuf>,

    /// Use given configuration file.
    ///
    /// Instead of a path "inline" toml configuration file can also be
    /// passed in by prefixing it with `inline:`.
    #[arg(short, long)]
    pub(crate) config: Option<String>,

    /// Artifact to save a trained model to or to load it from.
    ///
    /// This setting is prioritized over settings through
    /// the config and environment.
    #[arg(short, long)]
    pub(crate) artifact: Option<PathBuf>,

    /// Print the config and exit instead of running a command.
    #[arg(long)]
    pub(crate) print_config: bool,

    #[command(subcommand)]
    pub(crate) command: Option<Command>,
}

impl Args {
    pub(crate) fn to_config_overrides(&self) -> impl Serialize {
        let mut map = Map::new();
        if let Some(log_file) = &self.log_file {
            map.insert(String::from("logging"), json!({ "file": log_file }));
        }
        if let Some(artifact) = &self.artifact {
            map.insert(String::from("artifact"), json!(artifact));
        }

        Value::Object(map)
    }
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Trades coverage against accuracy by sweeping the training cutoff of an engine.
    Sweep {
        #[arg(short, long, value_enum, default_value_t = EngineKind::Latent)]
        engine: EngineKind,
    },
    /// Cross-validates the hyperparameter grid of an engine.
    GridSearch {
        #[arg(short, long, value_enum, default_value_t = EngineKind::Latent)]
        engine: EngineKind,
    },
    /// Trains an engine on the configured tables and saves it as artifact.
    Train {
        #[arg(short, long, value_enum)]
        engine: EngineKind,
    },
    /// Recommends routes with the saved artifact.
    Recommend {
        #[command(flatten)]
        query: QueryArgs,

        /// Number of routes to recommend.
        #[arg(short, default_value_t = 10)]
        k: usize,

        /// Only recommend routes within this area.
        #[arg(long)]
        area: Option<String>,

        /// Artifacts to ask in order if the previous ones can't serve the query.
        #[arg(long)]
        fallback: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum EngineKind {
    Text,
    Latent,
    Neighbors,
}

#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
pub(crate) struct QueryArgs {
    /// Recommend routes the user has not rated yet.
    #[arg(long)]
    pub(crate) user: Option<u64>,

    /// Recommend routes similar to this route.
    #[arg(long)]
    pub(crate) route: Option<u64>,

    /// Recommend routes whose description matches this text.
    #[arg(long)]
    pub(crate) text: Option<String>,
}

impl QueryArgs {
    pub(crate) fn query(&self) -> Query<'_> {
        match (self.user, self.route, &self.text) {
            (Some(user), _, _) => Query::User(UserId::new(user)),
            (_, Some(route), _) => Query::Route(RouteId::new(route)),
            (_, _, text) => Query::Text(text.as_deref().unwrap_or_default()),
        }
    }
}
