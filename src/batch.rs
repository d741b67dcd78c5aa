use std::fmt::Display;

use tracing::{info, warn};

use crate::{
    fetch::{DownloadRequest, FetchedFile, Fetcher},
    outside::MediaBackend,
    result::Error,
    search::Searcher,
    types::Quality,
};

#[derive(Debug)]
pub enum BatchStatus {
    Saved(FetchedFile),
    NoResult,
    Failed(Error),
}

/// What happened to one line of a batch
#[derive(Debug)]
pub struct BatchOutcome {
    pub query: String,
    pub status: BatchStatus,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, BatchStatus::Saved(_))
    }
}

impl Display for BatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.status {
            BatchStatus::Saved(file) => {
                write!(f, "{}: saved to {}", self.query, file.path.display())
            }
            BatchStatus::NoResult => write!(f, "{}: no result found", self.query),
            BatchStatus::Failed(err) => write!(f, "{}: failed: {err}", self.query),
        }
    }
}

/// Download the best match of every query, one after the other.
///
/// Blank queries are skipped. A failing query never stops the following ones:
/// there is exactly one outcome per non-blank query, in input order.
pub fn batch_fetch<B, S>(
    searcher: &Searcher<B>,
    fetcher: &Fetcher,
    queries: &[S],
    quality: Quality,
) -> Vec<BatchOutcome>
where
    B: MediaBackend,
    S: AsRef<str>,
{
    let queries: Vec<&str> = queries
        .iter()
        .map(|q| q.as_ref().trim())
        .filter(|q| !q.is_empty())
        .collect();
    let total = queries.len();

    queries
        .into_iter()
        .enumerate()
        .map(|(idx, query)| {
            info!("[{}/{total}] Processing {query:?}", idx + 1);

            let status = match fetch_best_match(searcher, fetcher, query, quality) {
                Ok(Some(file)) => BatchStatus::Saved(file),
                Ok(None) => BatchStatus::NoResult,
                Err(err) => {
                    warn!("[{}/{total}] {query:?} failed: {err}", idx + 1);
                    BatchStatus::Failed(err)
                }
            };

            BatchOutcome {
                query: query.to_owned(),
                status,
            }
        })
        .collect()
}

fn fetch_best_match<B: MediaBackend>(
    searcher: &Searcher<B>,
    fetcher: &Fetcher,
    query: &str,
    quality: Quality,
) -> crate::result::Result<Option<FetchedFile>> {
    let Some(best) = searcher.search(query, 1, 0)?.into_iter().next() else {
        return Ok(None);
    };

    let request = DownloadRequest::new(best.external_id, quality);
    fetcher.fetch(searcher.backend(), &request).map(Some)
}

/// Render the outcomes as a numbered report, one line per query
pub fn render_report(outcomes: &[BatchOutcome]) -> String {
    let total = outcomes.len();
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();

    let mut report: String = outcomes
        .iter()
        .enumerate()
        .map(|(idx, outcome)| format!("[{}/{total}] {outcome}\n", idx + 1))
        .collect();
    report.push_str(&format!("{succeeded} of {total} downloads succeeded\n"));
    report
}
