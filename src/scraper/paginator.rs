use crate::domain::{Record, Snapshot};
use crate::scraper::ScraperError;

/// One page of search results per call. Page indices start at 1.
pub trait PageFetcher {
    fn fetch_page(&self, query: &str, page: usize) -> Result<Vec<Record>, ScraperError>;
}

#[derive(Debug)]
pub struct CrawlResult {
    pub snapshot: Snapshot,
    pub pages_fetched: usize,
}

/// Walks pages 1..=`max_pages` in order, merging offers into one snapshot.
///
/// The site has no "last page" marker; once the results run out it keeps
/// serving the same cards. The crawl therefore stops after the first page that
/// adds no unseen offer id. Any page error aborts the whole crawl, so a partial
/// snapshot never reaches the diff.
pub fn crawl<F>(fetcher: &F, query: &str, max_pages: usize) -> Result<CrawlResult, ScraperError>
where
    F: PageFetcher + ?Sized,
{
    let mut snapshot = Snapshot::new();
    let mut pages_fetched = 0;

    for page in 1..=max_pages {
        log::info!("📄 Scraping page {page}/{max_pages}");

        let records = fetcher.fetch_page(query, page).map_err(|e| {
            log::error!("❌ Page {page} failed, aborting crawl: {e}");
            ScraperError::PageFailed {
                page,
                source: Box::new(e),
            }
        })?;
        pages_fetched += 1;

        let mut added = 0;
        for record in records {
            if snapshot.insert(record) {
                added += 1;
            }
        }

        log::info!("Page {page}: {added} unique offers");

        if added == 0 {
            log::info!("🏁 No new offers on page {page}, stopping");
            break;
        }
    }

    log::info!(
        "🎯 Total unique offers: {} over {pages_fetched} page(s)",
        snapshot.len()
    );

    Ok(CrawlResult {
        snapshot,
        pages_fetched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Serves canned pages; pages past the end repeat the last one.
    struct ScriptedFetcher {
        pages: Vec<Vec<&'static str>>,
        fail_on: Option<usize>,
        calls: RefCell<Vec<usize>>,
    }

    impl ScriptedFetcher {
        fn new(pages: Vec<Vec<&'static str>>) -> Self {
            Self {
                pages,
                fail_on: None,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl PageFetcher for ScriptedFetcher {
        fn fetch_page(&self, _query: &str, page: usize) -> Result<Vec<Record>, ScraperError> {
            self.calls.borrow_mut().push(page);
            if self.fail_on == Some(page) {
                return Err(ScraperError::Network("connection reset".into()));
            }
            let idx = (page - 1).min(self.pages.len() - 1);
            Ok(self.pages[idx]
                .iter()
                .map(|id| Record::new(*id, Some(100)))
                .collect())
        }
    }

    /// Every page brings one fresh id.
    struct EndlessFetcher {
        calls: RefCell<usize>,
    }

    impl PageFetcher for EndlessFetcher {
        fn fetch_page(&self, _query: &str, page: usize) -> Result<Vec<Record>, ScraperError> {
            *self.calls.borrow_mut() += 1;
            Ok(vec![Record::new(format!("offer-{page}"), None)])
        }
    }

    fn ids(result: &CrawlResult) -> Vec<&str> {
        result.snapshot.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn stops_when_a_page_repeats_everything() {
        let fetcher = ScriptedFetcher::new(vec![vec!["A", "B"], vec!["A", "B"]]);
        let result = crawl(&fetcher, "q", 20).unwrap();

        assert_eq!(result.pages_fetched, 2);
        assert_eq!(ids(&result), vec!["A", "B"]);
        assert_eq!(*fetcher.calls.borrow(), vec![1, 2]);
    }

    #[test]
    fn max_pages_bounds_an_endless_source() {
        let fetcher = EndlessFetcher {
            calls: RefCell::new(0),
        };
        let result = crawl(&fetcher, "q", 7).unwrap();

        assert_eq!(result.pages_fetched, 7);
        assert_eq!(result.snapshot.len(), 7);
        assert_eq!(*fetcher.calls.borrow(), 7);
    }

    #[test]
    fn partial_overlap_keeps_going_and_first_occurrence_wins() {
        let fetcher = ScriptedFetcher::new(vec![
            vec!["A", "B"],
            vec!["B", "C"],
            vec!["C", "A"],
        ]);
        let result = crawl(&fetcher, "q", 20).unwrap();

        assert_eq!(result.pages_fetched, 3);
        assert_eq!(ids(&result), vec!["A", "B", "C"]);
    }

    #[test]
    fn empty_first_page_stops_immediately() {
        let fetcher = ScriptedFetcher::new(vec![vec![]]);
        let result = crawl(&fetcher, "q", 20).unwrap();

        assert_eq!(result.pages_fetched, 1);
        assert!(result.snapshot.is_empty());
    }

    #[test]
    fn page_failure_aborts_with_page_number() {
        let mut fetcher = ScriptedFetcher::new(vec![vec!["A"], vec!["B"], vec!["C"], vec!["D"]]);
        fetcher.fail_on = Some(3);

        match crawl(&fetcher, "q", 20) {
            Err(ScraperError::PageFailed { page, .. }) => assert_eq!(page, 3),
            other => panic!("expected PageFailed, got: {:?}", other),
        }
        assert_eq!(*fetcher.calls.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn snapshot_ids_are_unique() {
        let fetcher = ScriptedFetcher::new(vec![
            vec!["A", "A", "B"],
            vec!["B", "C", "C"],
            vec!["D"],
            vec!["D"],
        ]);
        let result = crawl(&fetcher, "q", 20).unwrap();

        let mut seen = std::collections::HashSet::new();
        assert!(result.snapshot.iter().all(|r| seen.insert(r.id.clone())));
        assert_eq!(ids(&result), vec!["A", "B", "C", "D"]);
    }
}
