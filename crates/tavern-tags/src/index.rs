//! Per-site tag vocabulary with fuzzy lookup.
//!
//! The index mirrors the `nsfw_tags` table: every tag known for a site is
//! held in memory and appended to storage the first time it is seen. Each
//! site has its own `RwLock`, so lookups on one site never wait for a
//! write on another.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use tavern_db::{Backend, DbError};
use tokio::sync::RwLock;

use crate::similarity::Similarity;

type SiteTags = Arc<RwLock<BTreeSet<String>>>;

/// Known tags per content site, warmed from storage.
pub struct TagIndex {
    backend: Backend,
    sites: DashMap<String, SiteTags>,
}

impl TagIndex {
    /// Build an index holding every tag already stored in `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored tags cannot be read.
    pub async fn load(backend: Backend) -> Result<Self, DbError> {
        let stored = backend.get_all_tags().await?;
        let index = Self::empty(backend);
        let mut total = 0_usize;
        for (site, tags) in stored {
            total = total.saturating_add(tags.len());
            let set: BTreeSet<String> = tags.into_iter().collect();
            index.sites.insert(site, Arc::new(RwLock::new(set)));
        }
        tracing::info!(
            sites = index.sites.len(),
            tags = total,
            backend = index.backend.name(),
            "Tag index warmed"
        );
        Ok(index)
    }

    /// An index with no known tags. New tags are still persisted to `backend`.
    pub fn empty(backend: Backend) -> Self {
        Self {
            backend,
            sites: DashMap::new(),
        }
    }

    fn site(&self, site: &str) -> Option<SiteTags> {
        self.sites.get(site).map(|entry| Arc::clone(entry.value()))
    }

    fn site_or_create(&self, site: &str) -> SiteTags {
        if let Some(tags) = self.site(site) {
            return tags;
        }
        Arc::clone(self.sites.entry(site.to_owned()).or_default().value())
    }

    /// Record `tags` for `site`, returning the ones that were not known yet.
    ///
    /// Blank tags and tags repeated in the input are skipped. Nothing is
    /// written when every tag is already known. Storage is written before
    /// the in-memory set, so a failed write leaves the index unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the new tags cannot be persisted.
    pub async fn add_tags<I>(&self, site: &str, tags: I) -> Result<Vec<String>, DbError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let site_tags = self.site_or_create(site);
        let result = Self::record(&self.backend, site, &site_tags, tags).await;
        self.discard_if_empty(site, &site_tags);
        result
    }

    async fn record<I>(
        backend: &Backend,
        site: &str,
        site_tags: &SiteTags,
        tags: I,
    ) -> Result<Vec<String>, DbError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut known = site_tags.write().await;

        let mut fresh: Vec<String> = Vec::new();
        for tag in tags {
            let tag: String = tag.into();
            if tag.trim().is_empty() || known.contains(&tag) || fresh.contains(&tag) {
                continue;
            }
            fresh.push(tag);
        }
        if fresh.is_empty() {
            return Ok(fresh);
        }

        backend.append_tags(site, &fresh).await?;
        known.extend(fresh.iter().cloned());
        tracing::debug!(site, added = fresh.len(), total = known.len(), "Tags recorded");
        Ok(fresh)
    }

    /// Drop the entry for `site` if it holds no tags and nobody else has it.
    ///
    /// `held` is the caller's own handle; together with the map's copy that
    /// makes two references when the entry is otherwise unused.
    fn discard_if_empty(&self, site: &str, held: &SiteTags) {
        self.sites.remove_if(site, |_, tags| {
            Arc::ptr_eq(tags, held)
                && Arc::strong_count(tags) == 2
                && tags.try_read().is_ok_and(|set| set.is_empty())
        });
    }

    /// Whether `tag` is known for `site`.
    pub async fn tag_exists(&self, site: &str, tag: &str) -> bool {
        match self.site(site) {
            Some(tags) => tags.read().await.contains(tag),
            None => false,
        }
    }

    /// The known tag of `site` closest to `tag`.
    ///
    /// A known tag is returned unchanged. Otherwise the highest scoring tag
    /// with a similarity of at least 0.5 wins, ties going to the tag that
    /// sorts first. `None` for an unknown site or when nothing is close.
    pub async fn fuzzy_match(&self, site: &str, tag: &str) -> Option<String> {
        let tags = self.site(site)?;
        let tags = tags.read().await;
        if tags.contains(tag) {
            return Some(tag.to_owned());
        }

        let mut best: Option<(Similarity, &String)> = None;
        // BTreeSet iterates in order, so only a strictly better score replaces.
        for candidate in tags.iter() {
            let score = Similarity::between(tag, candidate);
            if best.is_none_or(|(top, _)| score.beats(top)) {
                best = Some((score, candidate));
            }
        }
        best.filter(|(score, _)| score.is_close())
            .map(|(_, candidate)| candidate.clone())
    }

    /// Sites the index holds tags for, sorted.
    pub fn sites(&self) -> Vec<String> {
        let mut sites: Vec<String> = self.sites.iter().map(|entry| entry.key().clone()).collect();
        sites.sort();
        sites
    }

    /// Number of tags known for `site`.
    pub async fn tag_count(&self, site: &str) -> usize {
        match self.site(site) {
            Some(tags) => tags.read().await.len(),
            None => 0,
        }
    }
}
