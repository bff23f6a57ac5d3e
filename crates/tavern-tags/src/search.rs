//! Tag search with bounded fuzzy retries.
//!
//! A query that finds nothing is retried with each term replaced by its
//! closest known tag. Tags seen on returned posts feed the index, so later
//! misspellings have something to resolve to.
//!
//! ```text
//! fetch(terms) -- posts --> record tags, Found
//!      |
//!    empty --> resolve terms -- none --> NotFound
//!                  |
//!            depth > 2 ------------> NotFound
//!                  |
//!                fetch(resolved) ...
//! ```

use serde::{Deserialize, Serialize};
use tavern_db::DbError;

use crate::index::TagIndex;

/// Retries after the first fetch. A search makes at most this many plus one fetches.
pub const MAX_RETRY_DEPTH: u32 = 2;

/// One result returned by a content source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Link to the post.
    pub url: String,
    /// Tags the site attaches to the post.
    pub tags: Vec<String>,
}

/// Failure reported by a content source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The site could not be reached.
    #[error("content source request failed: {0}")]
    Request(String),

    /// The site answered with something that is not a post list.
    #[error("content source returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// A remote site that can be searched by tags.
pub trait ContentSource {
    /// Posts on `site` carrying every tag in `terms`. Empty when nothing matches.
    fn fetch(
        &self,
        site: &str,
        terms: &[String],
    ) -> impl Future<Output = Result<Vec<Post>, SourceError>> + Send;
}

/// How a search ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A fetch returned posts.
    Found {
        /// The terms of the successful fetch.
        terms: Vec<String>,
        /// The posts it returned.
        posts: Vec<Post>,
        /// Fetches made, including the successful one.
        attempts: u32,
    },
    /// Every attempt came back empty or no term could be resolved.
    NotFound {
        /// Fetches made.
        attempts: u32,
    },
}

/// Errors that end a search early.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The content source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Tags from the results could not be recorded.
    #[error("failed to record result tags: {0}")]
    Index(#[from] DbError),
}

/// One search over a [`ContentSource`], resolving misses through a [`TagIndex`].
pub struct BoundedTagSearch<'a, S> {
    index: &'a TagIndex,
    source: &'a S,
}

impl<'a, S: ContentSource + Sync> BoundedTagSearch<'a, S> {
    /// Search `source`, using `index` to correct and record tags.
    pub const fn new(index: &'a TagIndex, source: &'a S) -> Self {
        Self { index, source }
    }

    /// Find posts on `site` for `terms`.
    ///
    /// Makes at most `MAX_RETRY_DEPTH + 1` fetches. On success every tag of
    /// every returned post is recorded in the index.
    ///
    /// # Errors
    ///
    /// - [`SearchError::Source`] if a fetch fails.
    /// - [`SearchError::Index`] if the result tags cannot be persisted.
    pub async fn search(&self, site: &str, terms: &[String]) -> Result<SearchOutcome, SearchError> {
        let mut terms = terms.to_vec();
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            let posts = self.source.fetch(site, &terms).await?;

            if !posts.is_empty() {
                let added = self
                    .index
                    .add_tags(site, posts.iter().flat_map(|post| post.tags.iter().cloned()))
                    .await?;
                tracing::debug!(
                    site,
                    attempts,
                    posts = posts.len(),
                    new_tags = added.len(),
                    "Search found posts"
                );
                return Ok(SearchOutcome::Found {
                    terms,
                    posts,
                    attempts,
                });
            }

            if attempts > MAX_RETRY_DEPTH {
                tracing::debug!(site, attempts, "Search gave up after retries");
                return Ok(SearchOutcome::NotFound { attempts });
            }

            let mut resolved = Vec::with_capacity(terms.len());
            for term in &terms {
                if let Some(tag) = self.index.fuzzy_match(site, term).await {
                    resolved.push(tag);
                }
            }
            if resolved.is_empty() {
                tracing::debug!(site, attempts, "No search term resolved to a known tag");
                return Ok(SearchOutcome::NotFound { attempts });
            }
            tracing::debug!(site, from = ?terms, to = ?resolved, "Retrying with resolved tags");
            terms = resolved;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use tavern_db::MemoryBackend;

    use super::*;

    /// Answers from a fixed table and remembers every query.
    #[derive(Default)]
    struct ScriptedSource {
        answers: HashMap<Vec<String>, Vec<Post>>,
        calls: Mutex<Vec<Vec<String>>>,
        failing: bool,
    }

    impl ScriptedSource {
        fn answer(mut self, terms: &[&str], posts: Vec<Post>) -> Self {
            self.answers.insert(owned(terms), posts);
            self
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ContentSource for ScriptedSource {
        fn fetch(
            &self,
            _site: &str,
            terms: &[String],
        ) -> impl Future<Output = Result<Vec<Post>, SourceError>> + Send {
            self.calls.lock().unwrap().push(terms.to_vec());
            let result = if self.failing {
                Err(SourceError::Request("connection refused".to_owned()))
            } else {
                Ok(self.answers.get(terms).cloned().unwrap_or_default())
            };
            std::future::ready(result)
        }
    }

    fn owned(terms: &[&str]) -> Vec<String> {
        terms.iter().map(|t| (*t).to_owned()).collect()
    }

    fn post(url: &str, tags: &[&str]) -> Post {
        Post {
            url: url.to_owned(),
            tags: owned(tags),
        }
    }

    async fn index_with(memory: &MemoryBackend, site: &str, tags: &[&str]) -> TagIndex {
        let index = TagIndex::empty(memory.clone().into());
        index.add_tags(site, tags.iter().copied()).await.unwrap();
        index
    }

    #[tokio::test]
    async fn misspelled_term_is_corrected_and_not_reinserted() {
        let memory = MemoryBackend::new();
        let index = index_with(&memory, "danbooru", &["catgirl"]).await;
        let appended = memory.stats().tags_appended();
        let source =
            ScriptedSource::default().answer(&["catgirl"], vec![post("https://a/1", &["catgirl"])]);

        let outcome = BoundedTagSearch::new(&index, &source)
            .search("danbooru", &owned(&["catgril"]))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SearchOutcome::Found {
                terms: owned(&["catgirl"]),
                posts: vec![post("https://a/1", &["catgirl"])],
                attempts: 2,
            }
        );
        assert_eq!(source.calls(), vec![owned(&["catgril"]), owned(&["catgirl"])]);
        assert_eq!(memory.stats().tags_appended(), appended);
        assert_eq!(index.tag_count("danbooru").await, 1);
    }

    #[tokio::test]
    async fn result_tags_are_recorded() {
        let memory = MemoryBackend::new();
        let index = TagIndex::empty(memory.clone().into());
        let source = ScriptedSource::default().answer(
            &["fox"],
            vec![post("https://a/1", &["fox", "snow"]), post("https://a/2", &["fox", "forest"])],
        );

        let outcome = BoundedTagSearch::new(&index, &source)
            .search("e621", &owned(&["fox"]))
            .await
            .unwrap();

        assert!(matches!(outcome, SearchOutcome::Found { attempts: 1, .. }));
        assert_eq!(index.tag_count("e621").await, 3);
        assert!(index.tag_exists("e621", "forest").await);
        assert_eq!(memory.stats().tags_appended(), 3);
    }

    #[tokio::test]
    async fn unresolvable_terms_stop_after_one_fetch() {
        let memory = MemoryBackend::new();
        let index = index_with(&memory, "danbooru", &["catgirl"]).await;
        let source = ScriptedSource::default();

        let outcome = BoundedTagSearch::new(&index, &source)
            .search("danbooru", &owned(&["zzz"]))
            .await
            .unwrap();

        assert_eq!(outcome, SearchOutcome::NotFound { attempts: 1 });
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn unresolved_terms_are_dropped_in_order() {
        let memory = MemoryBackend::new();
        let index = index_with(&memory, "danbooru", &["catgirl", "maid"]).await;
        let source = ScriptedSource::default().answer(
            &["maid", "catgirl"],
            vec![post("https://a/9", &["maid", "catgirl"])],
        );

        let outcome = BoundedTagSearch::new(&index, &source)
            .search("danbooru", &owned(&["maidd", "qqqq", "catgril"]))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            SearchOutcome::Found { ref terms, attempts: 2, .. } if *terms == owned(&["maid", "catgirl"])
        ));
    }

    #[tokio::test]
    async fn search_makes_at_most_three_fetches() {
        let memory = MemoryBackend::new();
        let index = index_with(&memory, "danbooru", &["catgirl"]).await;
        let source = ScriptedSource::default();

        let outcome = BoundedTagSearch::new(&index, &source)
            .search("danbooru", &owned(&["catgril"]))
            .await
            .unwrap();

        assert_eq!(outcome, SearchOutcome::NotFound { attempts: 3 });
        assert_eq!(
            source.calls(),
            vec![owned(&["catgril"]), owned(&["catgirl"]), owned(&["catgirl"])]
        );
    }

    #[tokio::test]
    async fn unknown_site_is_not_found() {
        let memory = MemoryBackend::new();
        let index = index_with(&memory, "danbooru", &["catgirl"]).await;
        let source = ScriptedSource::default();

        let outcome = BoundedTagSearch::new(&index, &source)
            .search("gelbooru", &owned(&["catgirl"]))
            .await
            .unwrap();
        assert_eq!(outcome, SearchOutcome::NotFound { attempts: 1 });
    }

    #[tokio::test]
    async fn source_failure_is_reported() {
        let memory = MemoryBackend::new();
        let index = TagIndex::empty(memory.into());
        let source = ScriptedSource {
            failing: true,
            ..ScriptedSource::default()
        };

        let result = BoundedTagSearch::new(&index, &source)
            .search("danbooru", &owned(&["fox"]))
            .await;
        assert!(matches!(result, Err(SearchError::Source(SourceError::Request(_)))));
    }

    #[tokio::test]
    async fn failed_tag_recording_is_reported() {
        let memory = MemoryBackend::new();
        let index = TagIndex::empty(memory.clone().into());
        let source = ScriptedSource::default().answer(&["fox"], vec![post("https://a/1", &["fox"])]);

        memory.set_unavailable(true);
        let result = BoundedTagSearch::new(&index, &source)
            .search("danbooru", &owned(&["fox"]))
            .await;
        assert!(matches!(result, Err(SearchError::Index(_))));
    }
}
