//! Corpus model: ordered chapters of ordered verses
//!
//! The corpus is static for the lifetime of the player; the engine never
//! mutates it. Chapters are ordered and non-empty, so the whole corpus forms
//! one strictly ordered finite sequence of verses with no gaps. Verse ids
//! are opaque strings, unique across the corpus and stable across sessions
//! (they are the clip cache key).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Smallest orderable text unit; the unit of synthesis and caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verse {
    pub id: String,
    pub ordinal: u32,
    pub text: String,
}

/// Ordered container of verses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub verses: Vec<Verse>,
}

/// The full reading corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    pub chapters: Vec<Chapter>,
}

impl Corpus {
    /// Load and validate a corpus from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let corpus: Corpus = serde_json::from_str(&raw)?;
        corpus.validate()?;
        Ok(corpus)
    }

    /// Validate ordering constraints: at least one chapter, no empty
    /// chapters, verse ids unique across the whole corpus.
    pub fn validate(&self) -> Result<()> {
        if self.chapters.is_empty() {
            return Err(Error::Corpus("corpus has no chapters".to_string()));
        }
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for chapter in &self.chapters {
            if chapter.verses.is_empty() {
                return Err(Error::Corpus(format!(
                    "chapter {} has no verses",
                    chapter.id
                )));
            }
            for verse in &chapter.verses {
                if let Some(other) = seen.insert(&verse.id, &chapter.id) {
                    return Err(Error::Corpus(format!(
                        "verse id {} appears in both chapter {} and chapter {}",
                        verse.id, other, chapter.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Look up a chapter by id.
    pub fn chapter(&self, chapter_id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == chapter_id)
    }

    /// Look up a verse by id anywhere in the corpus.
    pub fn verse(&self, verse_id: &str) -> Option<&Verse> {
        self.chapters
            .iter()
            .flat_map(|c| c.verses.iter())
            .find(|v| v.id == verse_id)
    }

    /// Total verse count across all chapters.
    pub fn verse_count(&self) -> usize {
        self.chapters.iter().map(|c| c.verses.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn verse(id: &str, ordinal: u32) -> Verse {
        Verse {
            id: id.to_string(),
            ordinal,
            text: format!("text of {}", id),
        }
    }

    fn valid_corpus() -> Corpus {
        Corpus {
            chapters: vec![
                Chapter {
                    id: "ch1".to_string(),
                    title: "First".to_string(),
                    verses: vec![verse("v1", 1), verse("v2", 2)],
                },
                Chapter {
                    id: "ch2".to_string(),
                    title: "Second".to_string(),
                    verses: vec![verse("v3", 1)],
                },
            ],
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_corpus() {
        assert!(valid_corpus().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_corpus() {
        let corpus = Corpus { chapters: vec![] };
        assert!(corpus.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_chapter() {
        let mut corpus = valid_corpus();
        corpus.chapters[1].verses.clear();
        assert!(corpus.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_verse_ids() {
        let mut corpus = valid_corpus();
        corpus.chapters[1].verses.push(verse("v1", 2));
        let err = corpus.validate().unwrap_err();
        assert!(err.to_string().contains("v1"));
    }

    #[test]
    fn test_lookups() {
        let corpus = valid_corpus();
        assert_eq!(corpus.chapter("ch2").unwrap().verses.len(), 1);
        assert!(corpus.chapter("ch9").is_none());
        assert_eq!(corpus.verse("v3").unwrap().ordinal, 1);
        assert!(corpus.verse("v9").is_none());
        assert_eq!(corpus.verse_count(), 3);
    }

    #[test]
    fn test_load_from_json_file() {
        let corpus = valid_corpus();
        let json = serde_json::to_string(&corpus).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = Corpus::load(file.path()).unwrap();
        assert_eq!(loaded, corpus);
    }

    #[test]
    fn test_load_rejects_invalid_corpus_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"chapters": []}"#).unwrap();
        assert!(Corpus::load(file.path()).is_err());
    }
}
