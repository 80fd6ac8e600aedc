//! 🚰 The Retrying Fetcher: every ticketing request goes through here, exactly once per TTL.
//!
//! 🧠 Knowledge graph:
//! - Wraps a [`TicketingBackend`] with a [`RetryPolicy`] and two [`TtlCache`]s:
//!   searches (300s by default) and single-issue lookups (60s by default).
//! - Ticket ids are validated *before* any request leaves the building.
//! - Remembers the instant of the last search that actually went upstream and came back,
//!   for the report footer. Cache hits and single-ticket lookups leave it alone.
//! - Expired entries are swept out before every insert, so a long-lived process looking up
//!   a thousand different tickets does not keep a thousand stale answers around.
//! - Only successes are cached. A failure is retried next time somebody asks.
//! - Owned by the dashboard, borrowed mutably per cycle. No locks, no sharing, no drama. 🦆

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::app_config::FetchConfig;
use crate::backends::{RetryPolicy, SearchRequest, TicketingBackend, TicketingSource};
use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::error::FetchResult;
use crate::ticket_key::TicketKey;

/// 🚰 Cached, retried access to one ticketing backend.
#[derive(Debug)]
pub struct TicketFetcher {
    backend: TicketingBackend,
    retry: RetryPolicy,
    project_prefix: String,
    searches: TtlCache<SearchRequest, Value>,
    lookups: TtlCache<(TicketKey, String), Value>,
    clock: Arc<dyn Clock>,
    last_success: Option<DateTime<Utc>>,
}

impl TicketFetcher {
    pub fn new(
        backend: TicketingBackend,
        fetch: &FetchConfig,
        project_prefix: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            backend,
            retry: RetryPolicy::new(fetch.retry_attempts, Duration::from_secs(fetch.retry_delay_secs)),
            project_prefix: project_prefix.into(),
            searches: TtlCache::new(fetch.search_ttl()?),
            lookups: TtlCache::new(fetch.lookup_ttl()?),
            clock,
            last_success: None,
        })
    }

    pub fn backend(&self) -> &TicketingBackend {
        &self.backend
    }

    pub fn project_prefix(&self) -> &str {
        &self.project_prefix
    }

    /// ⏱️ When a search last came back from upstream. `None` until the first one does.
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }

    /// 🔎 One search page, from cache when fresh, from upstream (with retries) otherwise.
    pub async fn search(&mut self, request: &SearchRequest) -> FetchResult<Value> {
        if let Some(page) = self.searches.get(request, self.clock.now()) {
            debug!("🧊 search cache hit: {:?}", request.jql);
            return Ok(page.clone());
        }
        debug!("📡 search cache miss: {:?}", request.jql);

        let backend = &self.backend;
        let page = self.retry.run("ticket search", || backend.search(request)).await?;

        let now = self.clock.now();
        self.last_success = Some(now);
        self.searches.purge_expired(now);
        Ok(self.searches.insert(request.clone(), page, now).clone())
    }

    /// 🎟️ One issue by user-supplied id (`TKTS-1234`, `tkts-1234`, `1234`).
    ///
    /// Fails with `InvalidTicketKey` without touching the network when the id is nonsense.
    pub async fn get_one(&mut self, input: &str, fields: &[&str]) -> FetchResult<Value> {
        let key = TicketKey::parse(input, &self.project_prefix)?;
        let cache_key = (key, fields.join(","));

        if let Some(issue) = self.lookups.get(&cache_key, self.clock.now()) {
            debug!("🧊 lookup cache hit: {}", cache_key.0);
            return Ok(issue.clone());
        }

        let backend = &self.backend;
        let key = &cache_key.0;
        let issue = self
            .retry
            .run("ticket lookup", || backend.get_one(key, fields))
            .await?;

        let now = self.clock.now();
        self.lookups.purge_expired(now);
        Ok(self.lookups.insert(cache_key, issue, now).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::{FieldIds, QueryConfig, TicketingConfig};
    use crate::backends::{InMemoryTicketing, JiraClient};
    use crate::clock::ManualClock;
    use crate::error::FetchError;
    use chrono::{TimeDelta, TimeZone};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_fetch_config() -> FetchConfig {
        FetchConfig {
            retry_delay_secs: 0,
            ..FetchConfig::default()
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn jira_fetcher(server: &MockServer, clock: Arc<dyn Clock>) -> TicketFetcher {
        let jira = JiraClient::new(&TicketingConfig {
            base_url: server.uri(),
            user_email: None,
            api_token: None,
            project_prefix: "TKTS".to_string(),
            timeout_secs: 5,
            max_results: 1000,
            fields: FieldIds::default(),
            queries: QueryConfig::default(),
        })
        .unwrap();
        TicketFetcher::new(TicketingBackend::Jira(jira), &fast_fetch_config(), "TKTS", clock).unwrap()
    }

    fn search_count(fetcher: &TicketFetcher) -> usize {
        match fetcher.backend() {
            TicketingBackend::InMemory(mem) => mem.search_count(),
            TicketingBackend::Jira(_) => unreachable!("in-memory only"),
        }
    }

    #[tokio::test]
    async fn the_one_where_two_503s_are_forgiven_on_the_third_try() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/api/3/search/jql"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/api/3/search/jql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"issues": []})))
            .expect(1)
            .mount(&server)
            .await;

        let clock = Arc::new(ManualClock::new(noon()));
        let mut fetcher = jira_fetcher(&server, clock);
        assert!(fetcher.last_success().is_none());

        let page = fetcher
            .search(&SearchRequest::new("project = TKTS", &["status"], 1000))
            .await
            .unwrap();
        assert_eq!(page, json!({"issues": []}));
        assert_eq!(fetcher.last_success(), Some(noon()));
    }

    #[tokio::test]
    async fn the_one_where_three_503s_exhaust_our_patience() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let mut fetcher = jira_fetcher(&server, Arc::new(ManualClock::new(noon())));
        let err = fetcher
            .search(&SearchRequest::new("project = TKTS", &[], 1000))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::RetriesExhausted { attempts: 3, .. }), "{err:?}");
        assert!(fetcher.last_success().is_none(), "failures are not successes");
    }

    #[tokio::test]
    async fn the_one_where_a_404_lookup_is_asked_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/issue/TKTS-1234"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let mut fetcher = jira_fetcher(&server, Arc::new(ManualClock::new(noon())));
        let err = fetcher.get_one("1234", &["status"]).await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(ref key) if key == "TKTS-1234"));
    }

    #[tokio::test]
    async fn the_one_where_nonsense_never_reaches_the_wire() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let mut fetcher = jira_fetcher(&server, Arc::new(ManualClock::new(noon())));
        let err = fetcher.get_one("abc", &["status"]).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidTicketKey { .. }));
    }

    #[tokio::test]
    async fn the_one_where_the_cache_spares_upstream_until_the_milk_goes_off() {
        let clock = Arc::new(ManualClock::new(noon()));
        let backend = TicketingBackend::InMemory(InMemoryTicketing::new(vec![json!({"key": "TKTS-1"})]));
        let mut fetcher = TicketFetcher::new(backend, &fast_fetch_config(), "TKTS", clock.clone()).unwrap();
        let request = SearchRequest::new("project = TKTS", &["status"], 1000);

        let first = fetcher.search(&request).await.unwrap();
        clock.advance(TimeDelta::seconds(299));
        let second = fetcher.search(&request).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(search_count(&fetcher), 1, "inside the TTL: one upstream call");

        clock.advance(TimeDelta::seconds(2));
        fetcher.search(&request).await.unwrap();
        assert_eq!(search_count(&fetcher), 2, "after the TTL: a fresh call");
    }

    #[tokio::test]
    async fn the_one_where_different_searches_do_not_share_a_shelf() {
        let clock = Arc::new(ManualClock::new(noon()));
        let backend = TicketingBackend::InMemory(InMemoryTicketing::new(vec![]));
        let mut fetcher = TicketFetcher::new(backend, &fast_fetch_config(), "TKTS", clock).unwrap();

        fetcher
            .search(&SearchRequest::new("project = TKTS", &["status"], 1000))
            .await
            .unwrap();
        fetcher
            .search(&SearchRequest::new("project = TKTS", &["assignee"], 1000))
            .await
            .unwrap();
        assert_eq!(search_count(&fetcher), 2);
    }

    #[tokio::test]
    async fn the_one_where_lookups_are_cached_for_a_minute() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/issue/TKTS-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "TKTS-7", "fields": {}})))
            .expect(2)
            .mount(&server)
            .await;

        let clock = Arc::new(ManualClock::new(noon()));
        let mut fetcher = jira_fetcher(&server, clock.clone());
        fetcher.get_one("TKTS-7", &["status"]).await.unwrap();
        fetcher.get_one("tkts-7", &["status"]).await.unwrap();
        fetcher.get_one("7", &["status"]).await.unwrap();
        clock.advance(TimeDelta::seconds(61));
        fetcher.get_one("7", &["status"]).await.unwrap();
    }

    #[tokio::test]
    async fn the_one_where_old_lookups_are_swept_out_and_do_not_touch_the_footer() {
        let clock = Arc::new(ManualClock::new(noon()));
        let issues = (1..=3).map(|n| json!({"key": format!("TKTS-{n}")})).collect();
        let backend = TicketingBackend::InMemory(InMemoryTicketing::new(issues));
        let mut fetcher = TicketFetcher::new(backend, &fast_fetch_config(), "TKTS", clock.clone()).unwrap();

        fetcher.get_one("1", &["status"]).await.unwrap();
        fetcher.get_one("2", &["status"]).await.unwrap();
        assert_eq!(fetcher.lookups.len(), 2);
        assert!(fetcher.last_success().is_none(), "lookups are not report refreshes");

        clock.advance(TimeDelta::seconds(61));
        fetcher.get_one("3", &["status"]).await.unwrap();
        assert_eq!(fetcher.lookups.len(), 1, "the two stale answers were swept on insert");
    }

    #[test]
    fn the_one_where_a_ttl_past_the_end_of_time_is_refused() {
        let config = FetchConfig {
            search_ttl_secs: i64::MAX,
            ..FetchConfig::default()
        };
        let backend = TicketingBackend::InMemory(InMemoryTicketing::new(vec![]));
        let err = TicketFetcher::new(backend, &config, "TKTS", Arc::new(ManualClock::new(noon()))).unwrap_err();
        assert!(err.to_string().contains("search_ttl_secs"), "{err}");
    }
}
