use tracing::debug;

use crate::api::SearchSource;
use crate::error::{FetchError, ValidationError};
use crate::models::SearchHit;

pub const RESULTS_PER_PAGE: usize = 10;

/// A query together with the results last fetched for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Search {
    query: String,
    results: Vec<SearchHit>,
}

/// One page of search results. Pages are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page<'a> {
    pub items: &'a [SearchHit],
    pub page: usize,
    pub total_pages: usize,
}

impl Search {
    pub fn new(query: &str) -> Result<Self, ValidationError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError("search query must not be empty".to_string()));
        }

        Ok(Self {
            query: query.to_string(),
            results: Vec::new(),
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchHit] {
        &self.results
    }

    /// Replace the results with a fresh fetch. Prior results survive a failure.
    pub async fn fetch_results<S>(&mut self, source: &S) -> Result<(), FetchError>
    where
        S: SearchSource + ?Sized,
    {
        let results = source.search_recipes(&self.query).await?;
        debug!(query = %self.query, hits = results.len(), "search results fetched");
        self.results = results;
        Ok(())
    }

    pub fn page(&self, page: usize, per_page: usize) -> Page<'_> {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let total_pages = self.results.len().div_ceil(per_page);

        let start = (page - 1).saturating_mul(per_page).min(self.results.len());
        let end = start.saturating_add(per_page).min(self.results.len());

        Page {
            items: &self.results[start..end],
            page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct StubSearch {
        fail: AtomicBool,
        hits: usize,
    }

    #[async_trait]
    impl SearchSource for StubSearch {
        async fn search_recipes(&self, query: &str) -> Result<Vec<SearchHit>, FetchError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(FetchError::Status(500));
            }
            Ok((0..self.hits)
                .map(|i| SearchHit {
                    id: format!("{query}-{i}"),
                    title: format!("{query} {i}"),
                    author: "Kitchen".to_string(),
                    image_url: String::new(),
                })
                .collect())
        }
    }

    #[test]
    fn empty_query_is_rejected() {
        assert!(Search::new("   ").is_err());
        assert_eq!(Search::new("  pizza ").unwrap().query(), "pizza");
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_results() {
        let source = StubSearch {
            fail: AtomicBool::new(false),
            hits: 3,
        };
        let mut search = Search::new("pizza").unwrap();
        search.fetch_results(&source).await.unwrap();
        assert_eq!(search.results().len(), 3);

        source.fail.store(true, Ordering::SeqCst);
        assert!(search.fetch_results(&source).await.is_err());
        assert_eq!(search.results().len(), 3);
        assert_eq!(search.results()[0].id, "pizza-0");
    }

    #[tokio::test]
    async fn pagination() {
        let source = StubSearch {
            fail: AtomicBool::new(false),
            hits: 23,
        };
        let mut search = Search::new("soup").unwrap();
        search.fetch_results(&source).await.unwrap();

        let first = search.page(1, RESULTS_PER_PAGE);
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total_pages, 3);

        let last = search.page(3, RESULTS_PER_PAGE);
        assert_eq!(last.items.len(), 3);
        assert_eq!(last.items[0].id, "soup-20");

        assert!(search.page(4, RESULTS_PER_PAGE).items.is_empty());
        assert_eq!(search.page(0, RESULTS_PER_PAGE).page, 1);
    }
}
