//! Dictionary oracle: which answers count, and which prompts to hand out.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;

use rand::Rng;
use rand::seq::IndexedRandom;

/// Decides whether a word exists in a named dictionary.
pub trait WordOracle: Send + Sync + 'static {
    /// Case-insensitive membership check. Unknown dictionaries contain
    /// no words.
    fn is_word(&self, dictionary: &str, word: &str) -> bool;

    /// A 2–3 letter fragment taken from a random word of the dictionary,
    /// or `None` if the dictionary has no word long enough.
    fn random_prompt(&self, dictionary: &str) -> Option<String>;
}

/// Shortest word a prompt is cut from.
const MIN_SOURCE_LEN: usize = 3;

#[derive(Debug, Default)]
struct Dictionary {
    words: HashSet<String>,
    /// Words long enough to cut a prompt from, for uniform random picks.
    sources: Vec<String>,
}

impl Dictionary {
    fn extend(&mut self, text: &str) {
        for line in text.lines() {
            let word = line.trim().to_lowercase();
            if word.is_empty() || word.starts_with('#') {
                continue;
            }
            if self.words.insert(word.clone()) && word.chars().count() >= MIN_SOURCE_LEN {
                self.sources.push(word);
            }
        }
    }
}

/// An in-memory [`WordOracle`] built from newline-separated word lists,
/// one per dictionary name.
#[derive(Debug, Default)]
pub struct WordList {
    dictionaries: HashMap<String, Dictionary>,
}

impl WordList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the words in `text` (one per line) to dictionary `name`.
    pub fn with_dictionary(mut self, name: &str, text: &str) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&mut self, name: &str, text: &str) {
        self.dictionaries
            .entry(name.to_lowercase())
            .or_default()
            .extend(text);
    }

    /// Loads every `<name>.txt` file in `dir` as dictionary `<name>`.
    ///
    /// Returns the number of files loaded.
    pub fn load_dir(&mut self, dir: &Path) -> io::Result<usize> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = std::fs::read_to_string(&path)?;
            self.insert(name, &text);
            tracing::info!(dictionary = %name, words = self.word_count(name), "dictionary loaded");
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn word_count(&self, dictionary: &str) -> usize {
        self.dictionary(dictionary).map_or(0, |d| d.words.len())
    }

    /// Names of all loaded dictionaries, sorted.
    pub fn dictionaries(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dictionaries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn dictionary(&self, name: &str) -> Option<&Dictionary> {
        self.dictionaries.get(&name.to_lowercase())
    }
}

impl WordOracle for WordList {
    fn is_word(&self, dictionary: &str, word: &str) -> bool {
        self.dictionary(dictionary)
            .is_some_and(|d| d.words.contains(&word.trim().to_lowercase()))
    }

    fn random_prompt(&self, dictionary: &str) -> Option<String> {
        let mut rng = rand::rng();
        let word = self.dictionary(dictionary)?.sources.choose(&mut rng)?;
        let chars: Vec<char> = word.chars().collect();
        let len = rng.random_range(2..=3).min(chars.len());
        let start = rng.random_range(0..=chars.len() - len);
        Some(chars[start..start + len].iter().collect())
    }
}
