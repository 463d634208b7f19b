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

//! Reading the rating and route tables handed over by the scraper.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use csv::{Reader, ReaderBuilder};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::Error,
    id::RouteId,
    rating::Rating,
    route::{RatingStats, Route},
};

/// Locations and format of the input tables.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    /// Table with the columns `user_id`, `route_id` and `rating`.
    pub ratings: PathBuf,
    /// Table with the columns `id`, `name`, `description`, `protection`, `comments`, `grade`,
    /// `type`, `pitches` and `area`.
    pub routes: PathBuf,
    pub delimiter: char,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            ratings: "ratings.csv".into(),
            routes: "routes.csv".into(),
            delimiter: ',',
        }
    }
}

impl TableConfig {
    /// Checks that the delimiter is a single byte in the tables.
    pub fn validate(&self) -> Result<(), Error> {
        delimiter_byte(self.delimiter)?;
        Ok(())
    }
}

/// The separator of the area path in the routes table.
const AREA_SEPARATOR: char = '>';

#[derive(Debug, Deserialize)]
struct RouteRecord {
    id: RouteId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    protection: String,
    #[serde(default)]
    comments: String,
    grade: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    pitches: Option<u32>,
    #[serde(default)]
    area: String,
}

impl From<RouteRecord> for Route {
    fn from(record: RouteRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            protection: record.protection,
            comments: record.comments,
            grade: record.grade,
            kind: record.kind,
            pitches: record.pitches,
            area: record
                .area
                .split(AREA_SEPARATOR)
                .map(str::trim)
                .filter(|area| !area.is_empty())
                .map(Into::into)
                .collect(),
            stats: RatingStats::default(),
        }
    }
}

fn delimiter_byte(delimiter: char) -> Result<u8, Error> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(Error::Delimiter(delimiter))
}

fn reader(path: &Path, delimiter: char) -> Result<Reader<File>, Error> {
    ReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| Error::Table {
            path: path.into(),
            source,
        })
}

/// Reads the ratings table.
///
/// # Errors
/// Fails if the table can't be read or contains a rating outside of `0..=4`.
pub fn read_ratings(path: impl AsRef<Path>, delimiter: char) -> Result<Vec<Rating>, Error> {
    let path = path.as_ref();
    let ratings: Vec<Rating> = reader(path, delimiter)?
        .into_deserialize::<Rating>()
        .try_collect()
        .map_err(|source| Error::Table {
            path: path.into(),
            source,
        })?;
    info!(path = %path.display(), "read ratings table");

    Ok(ratings)
}

/// Reads the routes table.
pub fn read_routes(path: impl AsRef<Path>, delimiter: char) -> Result<Vec<Route>, Error> {
    let path = path.as_ref();
    let routes: Vec<Route> = reader(path, delimiter)?
        .into_deserialize::<RouteRecord>()
        .map_ok(Route::from)
        .try_collect()
        .map_err(|source| Error::Table {
            path: path.into(),
            source,
        })?;
    info!(path = %path.display(), "read routes table");

    Ok(routes)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn table(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_ratings() {
        let file = table("user_id,route_id,rating\n1,10,4\n2, 10, 0\n");
        let ratings = read_ratings(file.path(), ',').unwrap();
        assert_eq!(
            ratings,
            [Rating::new(1, 10, 4).unwrap(), Rating::new(2, 10, 0).unwrap()],
        );
    }

    #[test]
    fn test_read_ratings_rejects_invalid_values() {
        let file = table("user_id,route_id,rating\n1,10,5\n");
        assert!(matches!(
            read_ratings(file.path(), ','),
            Err(Error::Table { .. }),
        ));
    }

    #[test]
    fn test_read_routes() {
        let file = table(
            "id\tname\tdescription\tprotection\tcomments\tgrade\ttype\tpitches\tarea\n\
             7\tSerenity Crack\tThin hands\tCams\t\t5.10d\tTrad\t3\tCalifornia > Yosemite Valley\n\
             8\tSlab\t\t\t\t\t\t\t\n",
        );
        let routes = read_routes(file.path(), '\t').unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].name, "Serenity Crack");
        assert_eq!(routes[0].pitches, Some(3));
        assert_eq!(routes[0].area, ["California", "Yosemite Valley"]);
        assert_eq!(routes[0].text(), "Thin hands Cams");
        assert_eq!(routes[1].grade, None);
        assert!(routes[1].area.is_empty());
    }

    #[test]
    fn test_non_ascii_delimiter() {
        let file = table("user_id§route_id§rating\n1§10§4\n");
        assert!(matches!(
            read_ratings(file.path(), '§'),
            Err(Error::Delimiter('§')),
        ));

        let config = TableConfig {
            delimiter: '→',
            ..TableConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Delimiter('→'))));
        TableConfig::default().validate().unwrap();
    }

    #[test]
    fn test_missing_table() {
        assert!(read_routes("does/not/exist.csv", ',').is_err());
    }
}
