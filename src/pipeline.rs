use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::db::Store;
use crate::dedup::DedupPolicy;
use crate::error::ScrapeError;
use crate::fetch::Fetcher;
use crate::parser::{self, CardSelectors};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Fetching,
    Extracting,
    Persisting,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Fetching => "fetching",
            Stage::Extracting => "extracting",
            Stage::Persisting => "persisting",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful scrape run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrapeReport {
    pub found: usize,
    pub persisted: usize,
}

/// Fetch → extract → persist for one page.
pub struct Pipeline {
    fetcher: Fetcher,
    url: String,
    selectors: CardSelectors,
    policy: DedupPolicy,
}

impl Pipeline {
    pub fn new(fetcher: Fetcher, url: String, selectors: CardSelectors, policy: DedupPolicy) -> Self {
        Self {
            fetcher,
            url,
            selectors,
            policy,
        }
    }

    /// Run one scrape against `store`. Any failure leaves the store untouched.
    pub async fn run(&self, store: &Store) -> Result<ScrapeReport, ScrapeError> {
        let mut stage = Stage::Idle;
        let result = self.run_stages(store, &mut stage).await;
        match &result {
            Ok(report) => {
                transition(&mut stage, Stage::Idle);
                info!(
                    "Scrape complete: {} found, {} persisted",
                    report.found, report.persisted
                );
            }
            Err(e) => {
                let failed_in = stage;
                transition(&mut stage, Stage::Failed);
                warn!("Scrape failed while {}: {}", failed_in, e);
            }
        }
        result
    }

    async fn run_stages(
        &self,
        store: &Store,
        stage: &mut Stage,
    ) -> Result<ScrapeReport, ScrapeError> {
        transition(stage, Stage::Fetching);
        let markup = self.fetcher.fetch(&self.url).await?;

        transition(stage, Stage::Extracting);
        let candidates = parser::extract(&markup, &self.selectors)?;
        info!("Extracted {} candidates", candidates.len());

        transition(stage, Stage::Persisting);
        let base = Url::parse(&self.url).ok();
        let persisted = store.upsert_all(&candidates, base.as_ref(), self.policy)?;

        Ok(ScrapeReport {
            found: candidates.len(),
            persisted,
        })
    }
}

fn transition(stage: &mut Stage, next: Stage) {
    debug!("Pipeline {} -> {}", stage, next);
    *stage = next;
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::{ExtractError, FetchError};
    use crate::fetch::tests::serve;

    const FIXTURE: &str = include_str!("../tests/fixtures/wsl_home.html");

    fn pipeline(url: String, policy: DedupPolicy) -> Pipeline {
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
        Pipeline::new(fetcher, url, CardSelectors::default(), policy)
    }

    #[tokio::test]
    async fn scrape_persists_every_card() {
        let url = serve("200 OK", FIXTURE).await;
        let store = Store::open_in_memory().unwrap();
        let report = pipeline(url, DedupPolicy::Append).run(&store).await.unwrap();
        assert_eq!(report, ScrapeReport { found: 5, persisted: 5 });
        assert_eq!(store.count_articles().unwrap(), 5);
        assert!(store.list_all().unwrap().iter().all(|a| !a.saved));
    }

    #[tokio::test]
    async fn repeated_scrape_appends_duplicates() {
        let url = serve("200 OK", FIXTURE).await;
        let store = Store::open_in_memory().unwrap();
        let p = pipeline(url, DedupPolicy::Append);
        p.run(&store).await.unwrap();
        p.run(&store).await.unwrap();
        assert_eq!(store.count_articles().unwrap(), 10);
    }

    #[tokio::test]
    async fn repeated_scrape_with_fingerprints_is_idempotent() {
        let url = serve("200 OK", FIXTURE).await;
        let store = Store::open_in_memory().unwrap();
        let p = pipeline(url, DedupPolicy::Fingerprint);
        let first = p.run(&store).await.unwrap();
        let second = p.run(&store).await.unwrap();
        assert_eq!(first.persisted, 5);
        assert_eq!(second, ScrapeReport { found: 5, persisted: 0 });
        assert_eq!(store.count_articles().unwrap(), 5);
    }

    #[tokio::test]
    async fn page_without_cards_persists_nothing() {
        let url = serve("200 OK", "<html><body><h1>Flat</h1></body></html>").await;
        let store = Store::open_in_memory().unwrap();
        let report = pipeline(url, DedupPolicy::Append).run(&store).await.unwrap();
        assert_eq!(report, ScrapeReport { found: 0, persisted: 0 });
    }

    #[tokio::test]
    async fn unreachable_host_leaves_store_unchanged() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_all(
                &[parser::Candidate {
                    title: "existing".to_string(),
                    link: None,
                }],
                None,
                DedupPolicy::Append,
            )
            .unwrap();
        let before = store.count_articles().unwrap();

        let err = pipeline("http://127.0.0.1:1/".to_string(), DedupPolicy::Append)
            .run(&store)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Fetch(FetchError::Transport { .. })));
        assert_eq!(store.count_articles().unwrap(), before);
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let url = serve("500 Internal Server Error", "oops").await;
        let store = Store::open_in_memory().unwrap();
        let err = pipeline(url, DedupPolicy::Append)
            .run(&store)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Fetch(FetchError::Status { .. })));
        assert_eq!(store.count_articles().unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_body_fails_extraction() {
        let url = serve("200 OK", "").await;
        let store = Store::open_in_memory().unwrap();
        let err = pipeline(url, DedupPolicy::Append)
            .run(&store)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Extract(ExtractError::EmptyDocument)));
    }
}
