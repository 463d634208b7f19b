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
    path::{Path, PathBuf},
    process::exit,
};

use beta_engine::{ConfigError, Error, LatentConfig, NeighborConfig, SelectorConfig, TextConfig};
use beta_ratings::TableConfig;
use clap::CommandFactory;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{cli::Args, logging};

/// The prefix of the environment variables which are part of the config.
const ENV_PREFIX: &str = "BETA__";

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
#[cfg_attr(test, serde(deny_unknown_fields))]
pub(crate) struct Config {
    pub(crate) logging: logging::Config,
    pub(crate) data: TableConfig,
    pub(crate) text: TextConfig,
    pub(crate) latent: LatentConfig,
    pub(crate) neighbors: NeighborConfig,
    pub(crate) selector: SelectorConfig,
    pub(crate) grid: GridConfig,
    pub(crate) artifact: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: logging::Config::default(),
            data: TableConfig::default(),
            text: TextConfig::default(),
            latent: LatentConfig::default(),
            neighbors: NeighborConfig::default(),
            selector: SelectorConfig::default(),
            grid: GridConfig::default(),
            artifact: "model.bin".into(),
        }
    }
}

impl Config {
    pub(crate) fn validate(&self) -> Result<(), anyhow::Error> {
        self.data.validate()?;
        self.text.validate()?;
        self.latent.validate()?;
        self.neighbors.validate()?;
        self.selector.validate()?;

        Ok(())
    }
}

/// The hyperparameters to cross-validate.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GridConfig {
    pub(crate) ranks: Vec<usize>,
    pub(crate) regularizations: Vec<f32>,
    pub(crate) neighbors: Vec<usize>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            ranks: vec![10, 50, 100, 150],
            regularizations: vec![0.15, 0.1, 0.05, 0.01],
            neighbors: vec![10, 20, 50, 100],
        }
    }
}

impl GridConfig {
    /// Combines each rank with each regularization on top of the base config.
    pub(crate) fn latent_candidates(
        &self,
        base: &LatentConfig,
    ) -> Result<Vec<LatentConfig>, Error> {
        let mut candidates = Vec::with_capacity(self.ranks.len() * self.regularizations.len());
        for &rank in &self.ranks {
            for &regularization in &self.regularizations {
                candidates.push(
                    base.clone()
                        .with_rank(rank)?
                        .with_regularization(regularization)?,
                );
            }
        }

        Ok(candidates)
    }

    pub(crate) fn neighbor_candidates(
        &self,
        base: &NeighborConfig,
    ) -> Result<Vec<NeighborConfig>, Error> {
        self.neighbors
            .iter()
            .map(|&neighbors| base.clone().with_neighbors(neighbors))
            .collect()
    }
}

/// Loads the config for the parsed cli arguments.
///
/// # Panic/Program Exit
///
/// In case of `--print-config` and failure this functions will not return
/// normally but terminate the program instead.
pub(crate) fn load(cli_args: &mut Args) -> Config {
    let config = cli_args.config.take();
    let config: Config = match load_config(config.as_deref(), cli_args.to_config_overrides()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            Args::command().print_help().ok();
            exit(1);
        }
    };

    if cli_args.print_config {
        match serde_json::to_string_pretty(&config) {
            Ok(config) => println!("{config}"),
            Err(err) => {
                eprintln!("Error: {err}");
                exit(1);
            }
        }
        exit(0);
    }

    config
}

/// Load the configuration into given type.
///
/// # Load order/priority
///
/// This will by ascending priority load:
///
/// 1. `./config.toml` or specified toml config file
/// 2. `./.env`
/// 3. `./.env.local`
/// 4. process environment
/// 5. options passed through `update_with`
///
/// Config values loaded from higher priority sources override such from lower
/// priority sources. E.g. values defined in `update_with` override values
/// from any other source.
///
/// `.env.local` is a semi-standard way to add temporary local overrides that you
/// don't want to commit.
///
/// # Env and .env
///
/// Environment variables from `.env` and `.env.local` will be loaded into the process
/// environment if they don't already exist there (keeping priority as described above).
///
/// Only environment variables with the `BETA__` prefix are considered and the prefix is
/// stripped. Env variables are split at `__`. I.e. `BETA__LATENT__RANK=50` will be treated
/// like the json `{ "latent": { "rank": 50 } }` wrt. deserializing the config.
fn load_config<C, U>(config: Option<&str>, update_with: U) -> Result<C, figment::Error>
where
    C: DeserializeOwned,
    U: Serialize,
{
    // the order must be from highest to lowest priority
    // or else it won't work correctly
    load_dotenv(".env.local")?;
    load_dotenv(".env")?;

    let figment = Figment::new()
        .join(Serialized::defaults(update_with))
        .join(Env::prefixed(ENV_PREFIX).split("__"));

    let provider = if let Some(content_or_path) = config {
        if let Some(content) = content_or_path.strip_prefix("inline:") {
            Toml::string(content)
        } else {
            let path = Path::new(content_or_path);
            if path.is_file() {
                Toml::file(path)
            } else {
                return Err(figment::Error::from(format!(
                    "Config file missing or not a file: {}",
                    path.display()
                )));
            }
        }
    } else {
        // doesn't fail if there is no config file in the current or any parent directory
        Toml::file("config.toml")
    };

    figment.join(provider).extract()
}

fn load_dotenv(file_name: &str) -> Result<(), figment::Error> {
    match dotenvy::from_filename(file_name) {
        Err(error) if !error.not_found() => {
            Err(figment::Error::from(error.to_string()).with_path(file_name))
        }
        _ => Ok(()),
    }
}
