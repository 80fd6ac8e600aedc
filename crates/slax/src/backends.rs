//! 🔌 Backends: where the real I/O happens.
//!
//! 🎟️ Ticketing backends answer JQL searches and single-issue lookups. 📨 Mailbox backends
//! answer "which messages match this query" and "show me that one message".
//! Everything that reaches them arrives already validated; everything that leaves them is
//! raw JSON, because interpreting it is the normalizer's job, not ours.
//!
//! 🎭 Each side has a trait and an enum. The enum is the casting agency: Jira or RAM,
//! Gmail or RAM. Callers hold the enum and never learn which actor showed up.
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{FetchError, FetchResult};
use crate::ticket_key::TicketKey;

pub mod gmail;
pub mod in_mem;
pub mod jira;
pub mod retry;

pub use gmail::GmailClient;
pub use in_mem::{InMemoryMailbox, InMemoryTicketing};
pub use jira::JiraClient;
pub use retry::RetryPolicy;

/// 📏 Upstream's hard ceiling for one search page. Anything past it is dropped on the floor.
pub const MAX_RESULTS_CAP: u32 = 1000;

/// 🔎 One search, fully described. Hashable so the fetcher can memoise on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SearchRequest {
    pub jql: String,
    pub fields: Vec<String>,
    #[serde(rename = "maxResults")]
    pub max_results: u32,
}

impl SearchRequest {
    /// 🏗️ Build a request. `max_results` above the cap is quietly clamped.
    pub fn new(jql: impl Into<String>, fields: &[&str], max_results: u32) -> Self {
        Self {
            jql: jql.into(),
            fields: fields.iter().map(|field| field.to_string()).collect(),
            max_results: max_results.min(MAX_RESULTS_CAP),
        }
    }
}

// ===== Ticketing Trait and Backend Enum =====

/// 🎟️ Something that knows about tickets.
///
/// # Contract
/// - `search` returns one raw search page (`{"issues": [...]}`), never more.
/// - `get_one` returns one raw issue, or [`FetchError::NotFound`] if there is no such ticket.
/// - No retries in here. Retrying is the fetcher's problem.
#[async_trait]
pub trait TicketingSource: std::fmt::Debug + Send + Sync {
    async fn search(&self, request: &SearchRequest) -> FetchResult<Value>;
    async fn get_one(&self, key: &TicketKey, fields: &[&str]) -> FetchResult<Value>;
}

/// 🎭 The many faces of a ticketing system.
#[derive(Debug)]
pub enum TicketingBackend {
    Jira(JiraClient),
    InMemory(InMemoryTicketing),
}

#[async_trait]
impl TicketingSource for TicketingBackend {
    async fn search(&self, request: &SearchRequest) -> FetchResult<Value> {
        match self {
            TicketingBackend::Jira(jira) => jira.search(request).await,
            TicketingBackend::InMemory(mem) => mem.search(request).await,
        }
    }

    async fn get_one(&self, key: &TicketKey, fields: &[&str]) -> FetchResult<Value> {
        match self {
            TicketingBackend::Jira(jira) => jira.get_one(key, fields).await,
            TicketingBackend::InMemory(mem) => mem.get_one(key, fields).await,
        }
    }
}

// ===== Mailbox Trait and Backend Enum =====

/// 📨 Something that knows about mail.
///
/// # Contract
/// - `search_messages` returns message ids from the first result page only, at most `max_results`.
/// - `get_message` returns the full raw message (headers, MIME parts, snippet).
#[async_trait]
pub trait MailboxSource: std::fmt::Debug + Send + Sync {
    async fn search_messages(&self, query: &str, max_results: usize) -> FetchResult<Vec<String>>;
    async fn get_message(&self, id: &str) -> FetchResult<Value>;
}

/// 🎭 The many faces of an inbox.
#[derive(Debug)]
pub enum MailboxBackend {
    Gmail(GmailClient),
    InMemory(InMemoryMailbox),
}

#[async_trait]
impl MailboxSource for MailboxBackend {
    async fn search_messages(&self, query: &str, max_results: usize) -> FetchResult<Vec<String>> {
        match self {
            MailboxBackend::Gmail(gmail) => gmail.search_messages(query, max_results).await,
            MailboxBackend::InMemory(mem) => mem.search_messages(query, max_results).await,
        }
    }

    async fn get_message(&self, id: &str) -> FetchResult<Value> {
        match self {
            MailboxBackend::Gmail(gmail) => gmail.get_message(id).await,
            MailboxBackend::InMemory(mem) => mem.get_message(id).await,
        }
    }
}

// ===== Shared HTTP plumbing =====

/// 🔧 Join a base URL and a path without growing `//` in between.
pub(crate) fn join_url(base: &str, path: &str) -> FetchResult<reqwest::Url> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    reqwest::Url::parse(&raw).map_err(|err| FetchError::InvalidUrl {
        reason: err.to_string(),
        url: raw,
    })
}

/// 📡 Send, then read the body as JSON, mapping every failure mode onto a [`FetchError`].
///
/// 401/403 become `Unauthorized`, other non-2xx become `Http` with the body attached.
/// 404 handling is left to callers that know what was not found.
pub(crate) async fn send_for_json(request: reqwest::RequestBuilder, url: &str) -> FetchResult<Value> {
    let response = request.send().await.map_err(|source| FetchError::Transport {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|source| FetchError::Transport {
        url: url.to_string(),
        source,
    })?;

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(FetchError::Unauthorized {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    if !status.is_success() {
        return Err(FetchError::Http {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}
