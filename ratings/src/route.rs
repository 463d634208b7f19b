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

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::id::RouteId;

/// Aggregated rating statistics of a route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RatingStats {
    pub count: usize,
    pub mean: f32,
}

/// A climbing route and its metadata.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub description: String,
    pub protection: String,
    pub comments: String,
    pub grade: Option<String>,
    pub kind: Option<String>,
    pub pitches: Option<u32>,
    /// The area path from the outermost area inwards, eg `["Colorado", "Boulder"]`.
    pub area: Vec<String>,
    pub stats: RatingStats,
}

impl Route {
    pub fn new(id: impl Into<RouteId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// The free text of the route, ie its description, protection notes and comments.
    pub fn text(&self) -> String {
        [&self.description, &self.protection, &self.comments]
            .into_iter()
            .map(|field| field.trim())
            .filter(|field| !field.is_empty())
            .join(" ")
    }

    /// Checks if the route lies within the area of the given name, case insensitively.
    pub fn is_within(&self, area: &str) -> bool {
        let area = area.trim();
        self.area
            .iter()
            .any(|parent| parent.trim().eq_ignore_ascii_case(area))
    }
}
