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

//! Command line tool to evaluate, train and query the climbing route recommender.
//!
//! The configuration is loaded from `config.toml`, `BETA__` prefixed environment variables and
//! the command line, see `beta --print-config` for the effective configuration. The output of
//! every command is written to stdout as json, logs go to stderr.

#![forbid(unsafe_code)]
#![deny(
    clippy::pedantic,
    noop_method_call,
    rust_2018_idioms,
    unused_qualifications
)]
#![warn(unreachable_pub)]
#![allow(clippy::module_name_repetitions)]

mod cli;
mod commands;
mod config;
mod logging;

use anyhow::bail;
use clap::Parser;
use tracing::instrument;

use crate::cli::Args;

#[instrument(err)]
fn main() -> Result<(), anyhow::Error> {
    let mut args = Args::parse();
    let config = config::load(&mut args);
    logging::initialize_global(&config.logging)?;
    config.validate()?;

    let Some(command) = &args.command else {
        bail!("no command given, see `beta --help`");
    };
    let output = commands::execute(command, &config)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
