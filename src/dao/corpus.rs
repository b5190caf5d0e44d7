//! Read-only clue corpus, partitioned by category and point value.
//!
//! The on-disk format is a JSON object keyed by category name. Every regular
//! category maps point values (as string keys) to candidate clues; the reserved
//! `final` key holds a flat list of final-round clues.

use std::{collections::BTreeMap, fs, path::Path};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

/// Key reserved for final-round clues.
pub const FINAL_CATEGORY: &str = "final";

/// Errors raised while loading the corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// The corpus file could not be read.
    #[error("failed to read corpus `{path}`")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The corpus is not valid JSON of the expected shape.
    #[error("failed to parse corpus")]
    Parse(#[from] serde_json::Error),
    /// A value bucket key is not an integer.
    #[error("category `{category}` has a non-numeric value bucket `{key}`")]
    InvalidValue {
        /// Category holding the bucket.
        category: String,
        /// Offending key.
        key: String,
    },
}

/// A single question/answer pair as stored in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CorpusClue {
    /// Stable identifier, unique across the corpus.
    pub id: String,
    /// Category the clue belongs to.
    pub category: String,
    /// Clue text shown to players.
    pub question: String,
    /// Expected response.
    pub answer: String,
    /// Face value; absent for final-round clues.
    #[serde(default)]
    pub value: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Final(Vec<CorpusClue>),
    Category(BTreeMap<String, Vec<CorpusClue>>),
}

/// Immutable clue corpus shared by every session.
#[derive(Debug, Clone, Default)]
pub struct ClueCorpus {
    categories: IndexMap<String, BTreeMap<u32, Vec<CorpusClue>>>,
    finals: Vec<CorpusClue>,
}

impl ClueCorpus {
    /// Build a corpus from already partitioned data.
    pub fn new(
        categories: IndexMap<String, BTreeMap<u32, Vec<CorpusClue>>>,
        finals: Vec<CorpusClue>,
    ) -> Self {
        Self { categories, finals }
    }

    /// Read and parse the corpus file at `path`.
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let contents = fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Parse the corpus from its JSON representation.
    pub fn from_json_str(contents: &str) -> Result<Self, CorpusError> {
        let raw: IndexMap<String, RawEntry> = serde_json::from_str(contents)?;
        let mut categories = IndexMap::new();
        let mut finals = Vec::new();

        for (name, entry) in raw {
            match entry {
                RawEntry::Final(clues) if name == FINAL_CATEGORY => finals = clues,
                RawEntry::Final(clues) if clues.is_empty() => {}
                RawEntry::Final(_) => {
                    return Err(CorpusError::InvalidValue {
                        category: name,
                        key: "<list>".into(),
                    });
                }
                RawEntry::Category(buckets) => {
                    let mut by_value = BTreeMap::new();
                    for (key, clues) in buckets {
                        let value = key.trim().parse::<u32>().map_err(|_| {
                            CorpusError::InvalidValue {
                                category: name.clone(),
                                key: key.clone(),
                            }
                        })?;
                        if !clues.is_empty() {
                            by_value.insert(value, clues);
                        }
                    }
                    if !by_value.is_empty() {
                        categories.insert(name, by_value);
                    }
                }
            }
        }

        Ok(Self { categories, finals })
    }

    /// Regular (non-final) categories with their value buckets, in file order.
    pub fn categories(&self) -> &IndexMap<String, BTreeMap<u32, Vec<CorpusClue>>> {
        &self.categories
    }

    /// Candidate clues for the final round.
    pub fn finals(&self) -> &[CorpusClue] {
        &self.finals
    }
}
