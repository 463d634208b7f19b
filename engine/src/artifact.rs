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
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use tempfile::NamedTempFile;
use tracing::info;

use crate::{error::Error, serving::Engine};

/// Saves a fitted engine to the path.
///
/// The artifact is written to a temporary file next to the path first and then renamed, so that
/// readers either see the previous or the new artifact as a whole.
pub fn save_artifact(engine: &Engine, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    let artifact_error = |source: bincode::Error| Error::Artifact {
        path: path.into(),
        source,
    };

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file =
        NamedTempFile::new_in(directory).map_err(|error| artifact_error(error.into()))?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        bincode::serialize_into(&mut writer, engine).map_err(artifact_error)?;
        writer
            .flush()
            .map_err(|error| artifact_error(error.into()))?;
    }
    file.as_file()
        .sync_all()
        .map_err(|error| artifact_error(error.into()))?;
    file.persist(path)
        .map_err(|error| artifact_error(error.error.into()))?;
    info!(path = %path.display(), engine = engine.name(), "saved artifact");

    Ok(())
}

/// Loads a fitted engine from the path.
pub fn load_artifact(path: impl AsRef<Path>) -> Result<Engine, Error> {
    let path = path.as_ref();
    let artifact_error = |source: bincode::Error| Error::Artifact {
        path: path.into(),
        source,
    };

    let file = File::open(path).map_err(|error| artifact_error(error.into()))?;
    let engine: Engine =
        bincode::deserialize_from(BufReader::new(file)).map_err(artifact_error)?;
    info!(path = %path.display(), engine = engine.name(), "loaded artifact");

    Ok(engine)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use beta_ratings::{Cutoff, Rating, RatingMatrix, Route, RouteId, UserId};
    use tempfile::tempdir;

    use super::*;
    use crate::{
        recommender::{Query, Recommender, Trainer},
        LatentConfig,
        NeighborConfig,
        TextConfig,
    };

    fn matrix() -> RatingMatrix {
        RatingMatrix::from_ratings(
            [(1, 1, 4), (1, 2, 3), (2, 1, 4), (2, 2, 2), (2, 3, 1), (3, 3, 4)]
                .into_iter()
                .map(|(user, route, value)| Rating::new(user, route, value).unwrap()),
        )
        .unwrap()
    }

    fn assert_same_recommendations(engine: &Engine, query: &Query<'_>) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.bin");
        save_artifact(engine, &path).unwrap();
        let loaded = load_artifact(&path).unwrap();

        assert_eq!(loaded.name(), engine.name());
        assert_eq!(
            loaded.recommend(query, 10, None).unwrap(),
            engine.recommend(query, 10, None).unwrap(),
        );
    }

    #[test]
    fn test_neighbor_artifact() {
        let model = NeighborConfig::default()
            .with_min_support(1)
            .unwrap()
            .with_cutoff(Cutoff::routes(1))
            .train(&matrix())
            .unwrap();
        assert_same_recommendations(&model.into(), &Query::Route(RouteId::new(1)));
    }

    #[test]
    fn test_latent_artifact() {
        let model = LatentConfig::default()
            .with_rank(2)
            .unwrap()
            .with_cutoff(Cutoff::routes(1))
            .train(&matrix())
            .unwrap();
        assert_same_recommendations(&model.into(), &Query::User(UserId::new(1)));
    }

    #[test]
    fn test_text_artifact() {
        let routes = [
            Route {
                description: "Steep hand crack".into(),
                ..Route::new(1)
            },
            Route {
                comments: "a hand jam crack".into(),
                ..Route::new(2)
            },
        ];
        let model = TextConfig::default().fit(&routes).unwrap();
        assert_same_recommendations(&model.into(), &Query::Text("crack"));
    }

    #[test]
    fn test_overwrite_artifact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let neighbors = NeighborConfig::default()
            .with_cutoff(Cutoff::routes(1))
            .train(&matrix())
            .unwrap();
        save_artifact(&neighbors.into(), &path).unwrap();
        let latent = LatentConfig::default()
            .with_rank(2)
            .unwrap()
            .with_cutoff(Cutoff::routes(1))
            .train(&matrix())
            .unwrap();
        save_artifact(&latent.into(), &path).unwrap();

        assert_eq!(load_artifact(&path).unwrap().name(), "latent");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_artifact(dir.path().join("missing.bin")),
            Err(Error::Artifact { .. }),
        ));
    }

    #[test]
    fn test_corrupt_artifact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.bin");
        fs::write(&path, [0xff; 3]).unwrap();
        assert!(matches!(load_artifact(&path), Err(Error::Artifact { .. })));
    }
}
