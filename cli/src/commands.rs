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

use anyhow::bail;
use beta_engine::{
    load_artifact,
    save_artifact,
    Engine,
    FallbackChain,
    GridSearch,
    Recommender,
    Trainer,
};
use beta_ratings::{RatingStore, RouteFilter};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::{
    cli::{Command, EngineKind, QueryArgs},
    config::Config,
};

/// Runs the command and returns its output.
pub(crate) fn execute(command: &Command, config: &Config) -> Result<Value, anyhow::Error> {
    match command {
        Command::Sweep { engine } => sweep(*engine, config),
        Command::GridSearch { engine } => grid_search(*engine, config),
        Command::Train { engine } => train(*engine, config),
        Command::Recommend {
            query,
            k,
            area,
            fallback,
        } => recommend(query, *k, area.as_deref(), fallback, config),
    }
}

#[instrument(skip(config))]
fn sweep(engine: EngineKind, config: &Config) -> Result<Value, anyhow::Error> {
    let store = RatingStore::load(&config.data)?;
    let selector = config.selector.clone().build()?;
    let points = match engine {
        EngineKind::Latent => selector.sweep(store.matrix(), &config.latent)?,
        EngineKind::Neighbors => selector.sweep(store.matrix(), &config.neighbors)?,
        EngineKind::Text => bail!("the text engine doesn't predict ratings and can't be swept"),
    };

    Ok(json!({ "engine": engine_name(engine), "points": points }))
}

#[instrument(skip(config))]
fn grid_search(engine: EngineKind, config: &Config) -> Result<Value, anyhow::Error> {
    let store = RatingStore::load(&config.data)?;
    let selector = config.selector.clone().build()?;
    match engine {
        EngineKind::Latent => {
            let candidates = config.grid.latent_candidates(&config.latent)?;
            let matrix = store.matrix().filter(config.latent.cutoff());
            report(engine, &selector.grid_search(&matrix, candidates)?)
        }
        EngineKind::Neighbors => {
            let candidates = config.grid.neighbor_candidates(&config.neighbors)?;
            let matrix = store.matrix().filter(config.neighbors.cutoff());
            report(engine, &selector.grid_search(&matrix, candidates)?)
        }
        EngineKind::Text => {
            bail!("the text engine doesn't predict ratings and can't be cross-validated")
        }
    }
}

fn report<T>(engine: EngineKind, search: &GridSearch<T>) -> Result<Value, anyhow::Error>
where
    T: Serialize,
{
    let best = search.best();
    if let Some(best) = best {
        info!(rmse = ?best.rmse, "found best candidate");
    }

    Ok(json!({
        "engine": engine_name(engine),
        "best": serde_json::to_value(best)?,
        "points": serde_json::to_value(&search.points)?,
    }))
}

#[instrument(skip(config))]
fn train(engine: EngineKind, config: &Config) -> Result<Value, anyhow::Error> {
    let store = RatingStore::load(&config.data)?;
    let model = match engine {
        EngineKind::Text => Engine::from(config.text.fit(store.routes())?),
        EngineKind::Latent => Engine::from(config.latent.train(store.matrix())?),
        EngineKind::Neighbors => Engine::from(config.neighbors.train(store.matrix())?),
    };
    let summary = match &model {
        Engine::Latent(model) => Some(*model.summary()),
        Engine::Text(_) | Engine::Neighbors(_) => None,
    };
    save_artifact(&model, &config.artifact)?;
    info!(engine = model.name(), artifact = %config.artifact.display(), "saved artifact");

    Ok(json!({
        "engine": model.name(),
        "artifact": config.artifact,
        "summary": summary,
    }))
}

#[instrument(skip(query, config))]
fn recommend(
    query: &QueryArgs,
    k: usize,
    area: Option<&str>,
    fallback: &[PathBuf],
    config: &Config,
) -> Result<Value, anyhow::Error> {
    let mut chain = FallbackChain::new().with(load_artifact(&config.artifact)?);
    for artifact in fallback {
        chain = chain.with(load_artifact(artifact)?);
    }

    let candidates = area
        .map(|area| -> Result<_, anyhow::Error> {
            let store = RatingStore::load(&config.data)?;
            Ok(store.candidates(&RouteFilter::area(area)))
        })
        .transpose()?;
    let recommendations = chain.recommend(&query.query(), k, candidates.as_ref())?;

    Ok(serde_json::to_value(recommendations)?)
}

fn engine_name(engine: EngineKind) -> &'static str {
    match engine {
        EngineKind::Text => "text",
        EngineKind::Latent => "latent",
        EngineKind::Neighbors => "neighbors",
    }
}
