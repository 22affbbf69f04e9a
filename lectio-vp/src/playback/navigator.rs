//! Sequence navigation across the flattened corpus
//!
//! The corpus order is flattened across chapter boundaries once at
//! construction, so "next" and "previous" are constant-time index
//! arithmetic, including steps into an adjacent chapter. Past either end of
//! the corpus the navigator returns `None`; the engine turns that into a
//! clean stop.

use lectio_common::{Corpus, Verse};
use std::collections::HashMap;
use std::sync::Arc;

/// Resolved position in the corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct VersePosition {
    pub chapter_id: String,
    pub verse: Verse,
}

pub struct Navigator {
    corpus: Arc<Corpus>,
    /// Corpus order flattened across chapter boundaries
    order: Vec<(usize, usize)>,
    /// verse id -> index into `order`
    index: HashMap<String, usize>,
}

impl Navigator {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        let mut order = Vec::with_capacity(corpus.verse_count());
        let mut index = HashMap::with_capacity(corpus.verse_count());
        for (chapter_idx, chapter) in corpus.chapters.iter().enumerate() {
            for (verse_idx, verse) in chapter.verses.iter().enumerate() {
                index.insert(verse.id.clone(), order.len());
                order.push((chapter_idx, verse_idx));
            }
        }
        Self {
            corpus,
            order,
            index,
        }
    }

    fn at(&self, flat: usize) -> Option<VersePosition> {
        let (chapter_idx, verse_idx) = *self.order.get(flat)?;
        let chapter = &self.corpus.chapters[chapter_idx];
        Some(VersePosition {
            chapter_id: chapter.id.clone(),
            verse: chapter.verses[verse_idx].clone(),
        })
    }

    /// Position `offset` verses away from (`chapter_id`, `verse_id`) in
    /// corpus order, crossing chapter boundaries in either direction.
    /// `None` when the start is unknown, the chapter does not match the
    /// verse, or the target falls outside the corpus.
    pub fn relative(&self, chapter_id: &str, verse_id: &str, offset: i64) -> Option<VersePosition> {
        let flat = *self.index.get(verse_id)?;
        let (chapter_idx, _) = self.order[flat];
        if self.corpus.chapters[chapter_idx].id != chapter_id {
            return None;
        }
        let target = flat.checked_add_signed(offset as isize)?;
        self.at(target)
    }

    /// Validated lookup of (`chapter_id`, `verse_id`).
    pub fn position(&self, chapter_id: &str, verse_id: &str) -> Option<VersePosition> {
        self.relative(chapter_id, verse_id, 0)
    }

    /// First verse of the corpus.
    pub fn first_verse(&self) -> Option<VersePosition> {
        self.at(0)
    }

    /// First verse of the given chapter.
    pub fn first_of_chapter(&self, chapter_id: &str) -> Option<VersePosition> {
        let chapter = self.corpus.chapter(chapter_id)?;
        Some(VersePosition {
            chapter_id: chapter.id.clone(),
            verse: chapter.verses.first()?.clone(),
        })
    }

    /// First verse of the chapter after `chapter_id`.
    pub fn first_of_next_chapter(&self, chapter_id: &str) -> Option<VersePosition> {
        let chapter_idx = self
            .corpus
            .chapters
            .iter()
            .position(|c| c.id == chapter_id)?;
        let chapter = self.corpus.chapters.get(chapter_idx + 1)?;
        Some(VersePosition {
            chapter_id: chapter.id.clone(),
            verse: chapter.verses.first()?.clone(),
        })
    }

    /// First verse of the chapter before `chapter_id`.
    pub fn first_of_prev_chapter(&self, chapter_id: &str) -> Option<VersePosition> {
        let chapter_idx = self
            .corpus
            .chapters
            .iter()
            .position(|c| c.id == chapter_id)?;
        let chapter = self.corpus.chapters.get(chapter_idx.checked_sub(1)?)?;
        Some(VersePosition {
            chapter_id: chapter.id.clone(),
            verse: chapter.verses.first()?.clone(),
        })
    }

    /// Total verse count in corpus order.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
