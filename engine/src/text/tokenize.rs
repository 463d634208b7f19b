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

use std::{collections::HashSet, ops::RangeInclusive};

use once_cell::sync::Lazy;
use regex::Regex;

/// English stop words.
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

fn is_stop_word(token: &str) -> bool {
    static STOP_WORDS_SET: Lazy<HashSet<&str>> =
        Lazy::new(|| STOP_WORDS.iter().copied().collect());
    STOP_WORDS_SET.contains(token)
}

/// Splits a text into lowercased word tokens, apostrophes stay part of a word.
pub(crate) fn tokenize(text: &str, remove_stop_words: bool) -> Vec<String> {
    static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w']+").unwrap());

    let text = text.to_lowercase();
    TOKEN
        .find_iter(&text)
        .map(|token| token.as_str())
        .filter(|token| !(remove_stop_words && is_stop_word(token)))
        .map(ToOwned::to_owned)
        .collect()
}

/// Joins the tokens into space separated n-grams for every `n` within the range.
pub(crate) fn ngrams<'a>(
    tokens: &'a [String],
    range: RangeInclusive<usize>,
) -> impl 'a + Iterator<Item = String> {
    range
        .filter(|&n| n > 0)
        .flat_map(move |n| tokens.windows(n).map(|window| window.join(" ")))
}
