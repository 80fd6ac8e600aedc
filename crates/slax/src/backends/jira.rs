//! # 📡 THE JIRA BACKEND
//!
//! 🎬 COLD OPEN: INT. STANDUP MEETING. 9:01 AM.
//!
//! "How many tickets breached overnight?" asks the manager. Nobody knows. Somebody opens
//! Jira. The spinner spins. The filter loads. The filter is wrong. The filter is fixed.
//! It is now 9:14 AM and standup was supposed to take ten minutes.
//!
//! 🚀 This module asks Jira the question so nobody has to click through it again:
//! - `POST /rest/api/3/search/jql` with `{"jql", "fields", "maxResults"}` for searches
//! - `GET /rest/api/3/issue/{KEY}?fields=...` for single lookups
//!
//! 🔒 Basic auth: user email + API token. No OAuth dance, no token refresh. Bring your own.
//!
//! 🔄 This module does not retry. Retries are the fetcher's problem. Good luck, fetcher.
//! 🦆

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};

use crate::app_config::TicketingConfig;
use crate::backends::{SearchRequest, TicketingSource, join_url, send_for_json};
use crate::error::{FetchError, FetchResult};
use crate::ticket_key::TicketKey;

const SEARCH_PATH: &str = "rest/api/3/search/jql";
const ISSUE_PATH: &str = "rest/api/3/issue";

/// 🎟️ A thin, honest HTTP client for one Jira instance.
#[derive(Debug, Clone)]
pub struct JiraClient {
    // 📡 reused across requests, because a new client per request is buying a new car per grocery run
    client: reqwest::Client,
    base_url: String,
    user_email: Option<String>,
    api_token: Option<String>,
}

impl JiraClient {
    /// 🚀 Build the client. 10s to connect, `timeout_secs` for the whole exchange.
    ///
    /// No connectivity ping here: the first search finds out soon enough, and a dead Jira
    /// should degrade the report, not prevent the process from starting.
    pub fn new(config: &TicketingConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("💀 The HTTP client refused to be born. Probably a missing TLS cert or a cursed system OpenSSL. Either way: no Jira today.")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            user_email: config.user_email.clone(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // 🔒 basic auth only when a user is configured. Anonymous Jira exists. Somewhere. Allegedly.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.user_email {
            Some(ref user) => request.basic_auth(user, self.api_token.as_ref()),
            None => request,
        }
    }
}

#[async_trait]
impl TicketingSource for JiraClient {
    async fn search(&self, request: &SearchRequest) -> FetchResult<Value> {
        let url = join_url(&self.base_url, SEARCH_PATH)?;
        let body = serde_json::to_string(request).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })?;
        trace!("📡 POST {} jql={:?}", url, request.jql);

        let http = self
            .client
            .post(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        let page = send_for_json(self.authorize(http), url.as_str()).await?;

        let count = page.get("issues").and_then(Value::as_array).map_or(0, Vec::len);
        debug!("✅ Jira search returned {} issue(s)", count);
        Ok(page)
    }

    async fn get_one(&self, key: &TicketKey, fields: &[&str]) -> FetchResult<Value> {
        let mut url = join_url(&self.base_url, &format!("{ISSUE_PATH}/{key}"))?;
        if !fields.is_empty() {
            url.query_pairs_mut().append_pair("fields", &fields.join(","));
        }
        trace!("📡 GET {}", url);

        let http = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        send_for_json(self.authorize(http), url.as_str())
            .await
            .map_err(|err| match err {
                // 🚫 a 404 on a single issue has exactly one meaning
                FetchError::Http { status: 404, .. } => FetchError::NotFound(key.to_string()),
                other => other,
            })
    }
}
