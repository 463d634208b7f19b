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
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{RouteId, UserId};

/// The highest possible rating, ratings are stars in `0..=MAX_RATING`.
pub const MAX_RATING: u8 = 4;

/// Invalid rating value {value}, expected an integer in `0..=4`.
#[derive(Clone, Copy, Debug, Display, Error, PartialEq)]
pub struct InvalidRating {
    pub value: f64,
}

/// An ordinal star rating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f32")]
pub struct RatingValue(u8);

impl RatingValue {
    pub fn new(value: u8) -> Result<Self, InvalidRating> {
        if value <= MAX_RATING {
            Ok(Self(value))
        } else {
            Err(InvalidRating {
                value: value.into(),
            })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<f64> for RatingValue {
    type Error = InvalidRating;

    /// Accepts integral values only, the scraped tables store them as floats.
    #[allow(clippy::cast_sign_loss, clippy::float_cmp)]
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.fract() == 0. && (0. ..=f64::from(MAX_RATING)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(InvalidRating { value })
        }
    }
}

impl From<RatingValue> for f32 {
    fn from(value: RatingValue) -> Self {
        value.0.into()
    }
}

/// An explicit rating of a route by a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Rating {
    #[serde(rename = "user_id")]
    pub user: UserId,
    #[serde(rename = "route_id")]
    pub route: RouteId,
    #[serde(rename = "rating")]
    pub value: RatingValue,
}

impl Rating {
    pub fn new(
        user: impl Into<UserId>,
        route: impl Into<RouteId>,
        value: u8,
    ) -> Result<Self, InvalidRating> {
        Ok(Self {
            user: user.into(),
            route: route.into(),
            value: RatingValue::new(value)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_range() {
        assert!(RatingValue::new(0).is_ok());
        assert!(RatingValue::new(4).is_ok());
        assert_eq!(RatingValue::new(5), Err(InvalidRating { value: 5. }));
    }

    #[test]
    fn test_rating_from_float() {
        assert_eq!(RatingValue::try_from(3.).unwrap().get(), 3);
        assert!(RatingValue::try_from(2.5).is_err());
        assert!(RatingValue::try_from(-1.).is_err());
        assert!(RatingValue::try_from(f64::NAN).is_err());
    }

    #[test]
    fn test_deserialize_rating() {
        let rating = serde_json::from_str::<Rating>(r#"{"user_id":1,"route_id":2,"rating":4.0}"#)
            .unwrap();
        assert_eq!(rating, Rating::new(1, 2, 4).unwrap());
        assert!(
            serde_json::from_str::<Rating>(r#"{"user_id":1,"route_id":2,"rating":7}"#).is_err()
        );
    }
}
