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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::tokenize::tokenize;
use crate::config::ConfigError;

/// The curated climbing vocabulary of route styles, features and techniques.
pub const DEFAULT_VOCABULARY: &[&str] = &[
    "crack", "splitter", "tips", "finger", "fingers", "fingerlock", "ringlocks", "thin", "hand",
    "hands", "jam", "jams", "jugs", "handjam", "handjams", "wide", "fist", "fists", "fistjam",
    "fistjams", "butterflies", "stack", "stacks", "chicken", "wing", "arm", "bar", "arm-bar",
    "squeeze", "chimney", "ow", "offwidth", "off-width", "pocket", "face", "vertical", "overhang",
    "steep", "traverse", "slab", "friction", "crimp", "dihedral", "arete", "roof", "lieback",
    "layback", "lay-back", "mantel", "mantle", "sloper", "dyno", "stem", "corner", "pumpy",
    "finger jam", "finger lock", "ring lock", "hand jam", "fist jam", "squeeze chimney",
    "arm bar", "toe hook", "heel hook", "over roof", "through roof", "pull roof", "thin crack",
    "hand crack", "fist crack", "wide crack", "offwidth crack", "off-width crack",
];

/// A closed set of terms, each an n-gram of word tokens.
///
/// Terms are normalized the same way as route texts, eg. `Arm-Bar` becomes the bigram `arm bar`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, u32>,
}

impl Vocabulary {
    /// Creates a vocabulary, duplicate terms after normalization are kept once.
    ///
    /// # Errors
    /// Fails if no term contains a word.
    pub fn new(terms: impl IntoIterator<Item = impl AsRef<str>>) -> Result<Self, ConfigError> {
        let mut vocabulary = Self {
            terms: Vec::new(),
            index: HashMap::new(),
        };
        for term in terms {
            let term = tokenize(term.as_ref(), false).join(" ");
            if !term.is_empty() && !vocabulary.index.contains_key(&term) {
                vocabulary
                    .index
                    .insert(term.clone(), vocabulary.terms.len() as u32);
                vocabulary.terms.push(term);
            }
        }

        if vocabulary.terms.is_empty() {
            Err(ConfigError::Vocabulary)
        } else {
            Ok(vocabulary)
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Gets the index of a normalized term.
    pub fn get(&self, term: &str) -> Option<u32> {
        self.index.get(term).copied()
    }

    /// The number of tokens of the longest term.
    pub fn max_order(&self) -> usize {
        self.terms
            .iter()
            .map(|term| term.split(' ').count())
            .max()
            .unwrap_or_default()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_VOCABULARY).unwrap(/* the default vocabulary is not empty */)
    }
}

impl TryFrom<Vec<String>> for Vocabulary {
    type Error = ConfigError;

    fn try_from(terms: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(terms)
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let vocabulary =
            Vocabulary::new(["Crack", "arm-bar", "arm bar", "crack", " ", "Heel  Hook"]).unwrap();
        assert_eq!(vocabulary.terms(), ["crack", "arm bar", "heel hook"]);
        assert_eq!(vocabulary.get("arm bar"), Some(1));
        assert_eq!(vocabulary.get("arm-bar"), None);
        assert_eq!(vocabulary.max_order(), 2);
    }

    #[test]
    fn test_empty_vocabulary() {
        assert_eq!(
            Vocabulary::new(["", "--"]).unwrap_err(),
            ConfigError::Vocabulary,
        );
    }

    #[test]
    fn test_default_vocabulary() {
        let vocabulary = Vocabulary::default();
        assert!(vocabulary.get("hand crack").is_some());
        assert!(vocabulary.get("off width crack").is_some());
        assert!(vocabulary.len() < DEFAULT_VOCABULARY.len());
    }

    #[test]
    fn test_deserialize() {
        let vocabulary = serde_json::from_str::<Vocabulary>(r#"["slab", "Slab", "roof"]"#).unwrap();
        assert_eq!(vocabulary.terms(), ["slab", "roof"]);
        assert!(serde_json::from_str::<Vocabulary>("[]").is_err());
    }
}
