//! 📨 The Gmail backend: two GET requests and a bearer token.
//!
//! - `GET {base}/messages?q=...&maxResults=...` gives ids (first page only, `nextPageToken` ignored)
//! - `GET {base}/messages/{id}?format=full` gives headers, snippet and the MIME tree
//!
//! 🔒 The token is handed to us. Where it came from (consent screens, refresh flows, a
//! sticky note) is outside this module's pay grade.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};

use crate::app_config::MailboxConfig;
use crate::backends::{MailboxSource, join_url, send_for_json};
use crate::error::FetchResult;

#[derive(Debug, Clone)]
pub struct GmailClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GmailClient {
    pub fn new(config: &MailboxConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("💀 Could not build the mailbox HTTP client. The inbox will remain a mystery.")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            access_token: config.access_token.clone(),
        })
    }

    async fn get_json(&self, url: reqwest::Url) -> FetchResult<Value> {
        trace!("📡 GET {}", url);
        let request = self
            .client
            .get(url.clone())
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json");
        send_for_json(request, url.as_str()).await
    }
}

#[async_trait]
impl MailboxSource for GmailClient {
    async fn search_messages(&self, query: &str, max_results: usize) -> FetchResult<Vec<String>> {
        let mut url = join_url(&self.base_url, "messages")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("maxResults", &max_results.to_string());

        let listing = self.get_json(url).await?;
        // 📭 no "messages" key is Gmail's way of saying "zero results"
        let ids: Vec<String> = listing
            .get("messages")
            .and_then(Value::as_array)
            .map(|messages| {
                messages
                    .iter()
                    .filter_map(|message| message.get("id").and_then(Value::as_str))
                    .map(str::to_string)
                    .take(max_results)
                    .collect()
            })
            .unwrap_or_default();

        debug!("📨 mailbox search matched {} message(s)", ids.len());
        Ok(ids)
    }

    async fn get_message(&self, id: &str) -> FetchResult<Value> {
        let mut url = join_url(&self.base_url, &format!("messages/{id}"))?;
        url.query_pairs_mut().append_pair("format", "full");
        self.get_json(url).await
    }
}
