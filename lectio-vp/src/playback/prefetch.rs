//! Speculative lookahead fetches
//!
//! Warms the clip cache for the verses just past the playhead so gapless
//! chaining usually finds the next clip already decoded. Strictly
//! best-effort: tasks are detached, failures are observed only for logging,
//! and the playback path never joins them.

use crate::playback::fetch::FetchCoordinator;
use crate::playback::navigator::Navigator;
use std::sync::Arc;
use tracing::debug;

pub struct Prefetcher {
    fetcher: Arc<FetchCoordinator>,
    navigator: Arc<Navigator>,
    lookahead: usize,
}

impl Prefetcher {
    pub fn new(fetcher: Arc<FetchCoordinator>, navigator: Arc<Navigator>, lookahead: usize) -> Self {
        Self {
            fetcher,
            navigator,
            lookahead,
        }
    }

    /// Fire-and-forget warm fetches for the next `lookahead` verses after
    /// (`chapter_id`, `verse_id`). Called on every play, not only on
    /// transitions, so repeated plays of one verse keep the lookahead warm.
    pub fn warm(&self, chapter_id: &str, verse_id: &str) {
        for offset in 1..=self.lookahead as i64 {
            let position = match self.navigator.relative(chapter_id, verse_id, offset) {
                Some(position) => position,
                None => break, // end of corpus
            };
            let fetcher = Arc::clone(&self.fetcher);
            tokio::spawn(async move {
                let verse_id = position.verse.id.clone();
                match fetcher.fetch_or_join(&position.verse).await {
                    Some(_) => debug!(verse_id = %verse_id, "Prefetch warmed"),
                    None => debug!(verse_id = %verse_id, "Prefetch failed, playback unaffected"),
                }
            });
        }
    }
}
