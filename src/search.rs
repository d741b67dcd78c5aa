use std::time::Duration;

use moka::sync::Cache;
use tracing::{debug, info};

use crate::{
    outside::MediaBackend,
    result::{Error, Result},
    types::SearchResult,
};

/// Largest number of results a single search may ask for
pub const MAX_RESULTS: usize = 10;

/// Number of memoized searches kept around
const CACHE_CAPACITY: u64 = 256;

type SearchKey = (String, usize, usize);

/// Search front-end memoizing recent searches for a while, so that asking
/// the same page twice in a row does not run the downloader again.
pub struct Searcher<B> {
    backend: B,
    cache: Cache<SearchKey, Vec<SearchResult>>,
}

impl<B: MediaBackend> Searcher<B> {
    pub fn new(backend: B, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();

        Self { backend, cache }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get `count` results of the query, skipping the `offset` best ranked ones.
    ///
    /// The downloader is asked for the `offset + count` best results and only
    /// the ones after `offset` are returned, so the returned list is empty
    /// when there are no more results.
    pub fn search(&self, query: &str, count: usize, offset: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("Please enter a search query".to_owned()));
        }
        if !(1..=MAX_RESULTS).contains(&count) {
            return Err(Error::InvalidInput(format!(
                "The number of results must be between 1 and {MAX_RESULTS}"
            )));
        }

        let total = offset.checked_add(count).ok_or_else(|| {
            Error::InvalidInput(format!("The offset {offset} is too large"))
        })?;

        let key = (query.to_owned(), count, offset);
        if let Some(results) = self.cache.get(&key) {
            debug!("Search {key:?} served from cache");
            return Ok(results);
        }

        info!("Searching {count} results for {query:?} after the first {offset}");
        let results: Vec<SearchResult> = self
            .backend
            .search(query, total)?
            .into_iter()
            .skip(offset)
            .collect();
        debug!("{} new results", results.len());

        self.cache.insert(key, results.clone());
        Ok(results)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        cell::{Cell, RefCell},
        path::PathBuf,
    };

    use super::*;
    use crate::outside::DownloadJob;

    pub fn result(id: &str) -> SearchResult {
        SearchResult {
            title: format!("Title {id}"),
            thumbnail_url: format!("https://i.ytimg.com/vi/{id}/hq.jpg"),
            duration_seconds: Some(180),
            external_id: id.to_owned(),
        }
    }

    /// Backend pretending every query has 5 results
    #[derive(Default)]
    pub struct CountingBackend {
        pub calls: Cell<usize>,
        pub queries: RefCell<Vec<(String, usize)>>,
    }

    impl MediaBackend for CountingBackend {
        fn search(&self, query: &str, total: usize) -> Result<Vec<SearchResult>> {
            self.calls.set(self.calls.get() + 1);
            self.queries.borrow_mut().push((query.to_owned(), total));
            if query == "broken" {
                return Err(Error::MalformedOutput("not json".to_owned()));
            }
            Ok((0..total.min(5)).map(|i| result(&format!("id{i}"))).collect())
        }

        fn resolve(&self, video_id: &str) -> Result<SearchResult> {
            Ok(result(video_id))
        }

        fn download(
            &self,
            _job: &DownloadJob<'_>,
            _on_line: &mut dyn FnMut(&str),
        ) -> Result<Option<PathBuf>> {
            Ok(None)
        }
    }

    fn searcher() -> Searcher<CountingBackend> {
        Searcher::new(CountingBackend::default(), Duration::from_secs(300))
    }

    #[test]
    fn returns_the_requested_slice() {
        let searcher = searcher();

        let results = searcher.search("song", 2, 3).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.external_id.as_str()).collect();

        assert_eq!(ids, ["id3", "id4"]);
        assert_eq!(
            searcher.backend().queries.borrow().as_slice(),
            [("song".to_owned(), 5)]
        );
    }

    #[test]
    fn past_the_end_is_empty_not_an_error() {
        let searcher = searcher();
        assert_eq!(searcher.search("song", 2, 5).unwrap(), vec![]);
    }

    #[test]
    fn repeated_search_runs_the_backend_once() {
        let searcher = searcher();

        let first = searcher.search("song", 3, 0).unwrap();
        let second = searcher.search("song", 3, 0).unwrap();

        assert_eq!(first, second);
        assert_eq!(searcher.backend().calls.get(), 1);

        searcher.search("song", 2, 3).unwrap();
        assert_eq!(searcher.backend().calls.get(), 2);
    }

    #[test]
    fn memoized_searches_expire() {
        let searcher = Searcher::new(CountingBackend::default(), Duration::from_millis(50));

        searcher.search("song", 3, 0).unwrap();
        searcher.search("song", 3, 0).unwrap();
        assert_eq!(searcher.backend().calls.get(), 1);

        std::thread::sleep(Duration::from_millis(200));
        searcher.search("song", 3, 0).unwrap();
        assert_eq!(searcher.backend().calls.get(), 2);
    }

    #[test]
    fn failures_are_not_memoized() {
        let searcher = searcher();

        assert!(searcher.search("broken", 1, 0).is_err());
        assert!(searcher.search("broken", 1, 0).is_err());
        assert_eq!(searcher.backend().calls.get(), 2);
    }

    #[test]
    fn rejects_invalid_input() {
        let searcher = searcher();

        assert!(matches!(
            searcher.search("  ", 3, 0),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            searcher.search("song", 0, 0),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            searcher.search("song", 11, 0),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            searcher.search("song", 3, usize::MAX),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(searcher.backend().calls.get(), 0);
    }
}
