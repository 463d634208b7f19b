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

//! Route similarity by the TF-IDF vectors of their descriptions.

mod model;
mod tokenize;
mod vocabulary;

use std::ops::RangeInclusive;

use beta_ratings::Route;
use serde::{Deserialize, Serialize};

pub use self::{
    model::TextModel,
    vocabulary::{Vocabulary, DEFAULT_VOCABULARY},
};
use crate::{config::ConfigError, error::Error};

/// Configurations of the text engine.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
#[must_use]
pub struct TextConfig {
    vocabulary: Vocabulary,
    ngram_range: (usize, usize),
    remove_stop_words: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            vocabulary: Vocabulary::default(),
            ngram_range: (1, 2),
            remove_stop_words: true,
        }
    }
}

impl TextConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = self.ngram_range;
        if min == 0 || min > max {
            return Err(ConfigError::NgramRange);
        }
        if self.vocabulary.is_empty() {
            return Err(ConfigError::Vocabulary);
        }

        Ok(())
    }

    /// The terms which are counted, all other words are ignored.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Sets the vocabulary.
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// The lengths of the n-grams which are built from the route texts.
    pub fn ngram_range(&self) -> RangeInclusive<usize> {
        self.ngram_range.0..=self.ngram_range.1
    }

    /// Sets the n-gram range.
    ///
    /// # Errors
    /// Fails if the range is empty or contains zero.
    pub fn with_ngram_range(mut self, ngram_range: RangeInclusive<usize>) -> Result<Self, Error> {
        self.ngram_range = ngram_range.into_inner();
        self.validate()?;

        Ok(self)
    }

    /// Whether english stop words are removed before n-grams are built.
    pub fn remove_stop_words(&self) -> bool {
        self.remove_stop_words
    }

    /// Sets the stop words removal.
    pub fn with_remove_stop_words(mut self, remove_stop_words: bool) -> Self {
        self.remove_stop_words = remove_stop_words;
        self
    }

    /// Fits a text model on the routes.
    pub fn fit<'a>(&self, routes: impl IntoIterator<Item = &'a Route>) -> Result<TextModel, Error> {
        self.validate()?;
        Ok(TextModel::fit(self.clone(), routes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        TextConfig::default().validate().unwrap();
    }

    #[test]
    fn test_invalid_ngram_range() {
        assert!(matches!(
            TextConfig::default().with_ngram_range(0..=2),
            Err(Error::InvalidConfig(ConfigError::NgramRange)),
        ));
        assert!(matches!(
            TextConfig::default().with_ngram_range(RangeInclusive::new(2, 1)),
            Err(Error::InvalidConfig(ConfigError::NgramRange)),
        ));
        assert_eq!(
            TextConfig::default()
                .with_ngram_range(1..=3)
                .unwrap()
                .ngram_range(),
            1..=3,
        );
    }

    #[test]
    fn test_deserialize() {
        let config = serde_json::from_str::<TextConfig>(
            r#"{ "vocabulary": ["slab", "roof"], "remove_stop_words": false }"#,
        )
        .unwrap();
        assert_eq!(config.vocabulary().terms(), ["slab", "roof"]);
        assert_eq!(config.ngram_range(), 1..=2);
        assert!(!config.remove_stop_words());
    }
}
