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

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

macro_rules! id_wrapper {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone,
            Copy,
            Debug,
            Default,
            Display,
            From,
            Into,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }
    };
}

id_wrapper! {
    /// A unique identifier of a climber.
    UserId
}

id_wrapper! {
    /// A unique identifier of a route.
    RouteId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_is_transparent() {
        let id = RouteId::new(105_862_912);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "105862912");
        assert_eq!(serde_json::from_str::<RouteId>(&json).unwrap(), id);
    }

    #[test]
    fn test_ids_order_numerically() {
        assert!(UserId::new(2) < UserId::new(10));
        assert_eq!(UserId::from(7).to_string(), "7");
    }
}
