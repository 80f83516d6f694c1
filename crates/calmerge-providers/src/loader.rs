//! Feed loading: fetch every configured source and decode its events.

use futures_util::{StreamExt, TryStreamExt, stream};
use tracing::{debug, info};

use calmerge_core::{DecodedFeed, SourceDescriptor};

use crate::error::ProviderResult;
use crate::fetcher::{FeedTransport, RateLimitedFetcher};
use crate::ics::decode_events;

/// Settings for [`FeedLoader`].
#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    /// How many hosts are fetched concurrently. `1` fetches every source in
    /// configuration order, one after the other.
    pub max_parallel_hosts: usize,
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_parallel_hosts(mut self, max_parallel_hosts: usize) -> Self {
        self.max_parallel_hosts = max_parallel_hosts.max(1);
        self
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_parallel_hosts: 1,
        }
    }
}

/// Fetches and decodes configured feeds.
pub struct FeedLoader<T> {
    fetcher: RateLimitedFetcher<T>,
    config: LoaderConfig,
}

impl<T: FeedTransport> FeedLoader<T> {
    pub fn new(fetcher: RateLimitedFetcher<T>, config: LoaderConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn fetcher(&self) -> &RateLimitedFetcher<T> {
        &self.fetcher
    }

    /// Loads every source. The result is in configuration order whatever
    /// order the fetches complete in.
    ///
    /// # Errors
    ///
    /// The first fetch or decode failure aborts the load.
    pub async fn load(&self, sources: &[SourceDescriptor]) -> ProviderResult<Vec<DecodedFeed>> {
        if self.config.max_parallel_hosts <= 1 {
            let mut feeds = Vec::with_capacity(sources.len());
            for source in sources {
                feeds.push(self.load_one(source).await?);
            }
            return Ok(feeds);
        }

        let groups = group_by_location(sources);
        debug!(
            hosts = groups.len(),
            jobs = self.config.max_parallel_hosts,
            "Loading feeds in parallel"
        );

        let loaded: Vec<Vec<(usize, DecodedFeed)>> = stream::iter(groups)
            .map(|group| self.load_group(sources, group))
            .buffer_unordered(self.config.max_parallel_hosts)
            .try_collect()
            .await?;

        let mut feeds: Vec<_> = loaded.into_iter().flatten().collect();
        feeds.sort_by_key(|(index, _)| *index);
        Ok(feeds.into_iter().map(|(_, feed)| feed).collect())
    }

    async fn load_group(
        &self,
        sources: &[SourceDescriptor],
        group: Vec<usize>,
    ) -> ProviderResult<Vec<(usize, DecodedFeed)>> {
        let mut feeds = Vec::with_capacity(group.len());
        for index in group {
            feeds.push((index, self.load_one(&sources[index]).await?));
        }
        Ok(feeds)
    }

    async fn load_one(&self, source: &SourceDescriptor) -> ProviderResult<DecodedFeed> {
        let body = self.fetcher.fetch(source.url()).await?;
        let events = decode_events(&body).map_err(|e| e.with_url(source.url()))?;

        info!(
            row = source.row(),
            url = %source.url(),
            events = events.len(),
            "Loaded feed"
        );
        Ok(DecodedFeed::new(source.clone(), events))
    }
}

/// Groups source indices by location, in order of first appearance.
fn group_by_location(sources: &[SourceDescriptor]) -> Vec<Vec<usize>> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();

    for (index, source) in sources.iter().enumerate() {
        let location = source.location();
        match groups.iter_mut().find(|(key, _)| *key == location) {
            Some((_, indices)) => indices.push(index),
            None => groups.push((location, vec![index])),
        }
    }

    groups.into_iter().map(|(_, indices)| indices).collect()
}
