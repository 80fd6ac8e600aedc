//! # Previously, on Slax...
//!
//! 🎬 The tests needed a Jira. Jira needed a VPN, a token, and a good mood. The tests had
//! none of those. So someone wrote a Jira that lives entirely in RAM, answers instantly,
//! and can be told to fail on cue like a stunt double.
//!
//! That someone was this module.
//!
//! - [`InMemoryTicketing`] serves canned issues, optionally routed by a JQL fragment, and
//!   can be scripted to return an HTTP status for one route. It counts searches so cache
//!   tests can prove nobody called twice.
//! - [`InMemoryMailbox`] serves canned messages, and ids that are listed but never
//!   fetchable, for the "one message went missing" story.
//!
//! ⚠️ This is NOT for production. This is for tests and demos. 🦆

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::backends::{MailboxSource, SearchRequest, TicketingSource};
use crate::error::{FetchError, FetchResult};
use crate::ticket_key::TicketKey;

/// 🎬 What a route does when its JQL fragment shows up.
#[derive(Debug, Clone)]
enum Scripted {
    Issues(Vec<Value>),
    Status(u16),
}

/// 🎟️ A ticketing system with perfect uptime, unless told otherwise.
#[derive(Debug, Default)]
pub struct InMemoryTicketing {
    // 📦 every issue we know about; the answer to any search no route claims
    issues: Vec<Value>,
    routes: Vec<(String, Scripted)>,
    searches: Mutex<Vec<String>>,
}

impl InMemoryTicketing {
    pub fn new(issues: Vec<Value>) -> Self {
        Self {
            issues,
            ..Self::default()
        }
    }

    /// 🧭 Searches whose JQL contains `fragment` get exactly these issues.
    pub fn with_search(mut self, fragment: impl Into<String>, issues: Vec<Value>) -> Self {
        self.routes.push((fragment.into(), Scripted::Issues(issues)));
        self
    }

    /// 💥 Searches whose JQL contains `fragment` fail with this HTTP status.
    pub fn failing_search(mut self, fragment: impl Into<String>, status: u16) -> Self {
        self.routes.push((fragment.into(), Scripted::Status(status)));
        self
    }

    /// 📊 How many searches have arrived so far.
    pub fn search_count(&self) -> usize {
        self.searches.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

#[async_trait]
impl TicketingSource for InMemoryTicketing {
    async fn search(&self, request: &SearchRequest) -> FetchResult<Value> {
        self.searches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.jql.clone());

        let scripted = self
            .routes
            .iter()
            .find(|(fragment, _)| request.jql.contains(fragment.as_str()))
            .map(|(_, scripted)| scripted);

        let issues = match scripted {
            Some(Scripted::Status(status)) => {
                return Err(FetchError::Http {
                    status: *status,
                    url: "mem://search".to_string(),
                    body: format!("scripted failure for {:?}", request.jql),
                });
            }
            Some(Scripted::Issues(issues)) => issues,
            None => &self.issues,
        };

        let capped: Vec<Value> = issues
            .iter()
            .take(request.max_results as usize)
            .cloned()
            .collect();
        Ok(json!({ "issues": capped }))
    }

    async fn get_one(&self, key: &TicketKey, _fields: &[&str]) -> FetchResult<Value> {
        self.issues
            .iter()
            .find(|issue| issue.get("key").and_then(Value::as_str) == Some(key.as_str()))
            .cloned()
            .ok_or_else(|| FetchError::NotFound(key.to_string()))
    }
}

/// 📨 An inbox that never needs a token.
#[derive(Debug, Default)]
pub struct InMemoryMailbox {
    // 📋 ids in listing order; some may have no body below, on purpose
    listed: Vec<String>,
    messages: Vec<(String, Value)>,
    search_fails: bool,
}

impl InMemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, id: impl Into<String>, message: Value) -> Self {
        let id = id.into();
        self.listed.push(id.clone());
        self.messages.push((id, message));
        self
    }

    /// 👻 Listed by the search, gone by the time anyone fetches it.
    pub fn with_dangling_id(mut self, id: impl Into<String>) -> Self {
        self.listed.push(id.into());
        self
    }

    /// 💥 Every search fails with a 500.
    pub fn failing() -> Self {
        Self {
            search_fails: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl MailboxSource for InMemoryMailbox {
    async fn search_messages(&self, _query: &str, max_results: usize) -> FetchResult<Vec<String>> {
        if self.search_fails {
            return Err(FetchError::Http {
                status: 500,
                url: "mem://messages".to_string(),
                body: "scripted failure".to_string(),
            });
        }
        Ok(self.listed.iter().take(max_results).cloned().collect())
    }

    async fn get_message(&self, id: &str) -> FetchResult<Value> {
        self.messages
            .iter()
            .find(|(known, _)| known == id)
            .map(|(_, message)| message.clone())
            .ok_or_else(|| FetchError::Http {
                status: 404,
                url: format!("mem://messages/{id}"),
                body: String::new(),
            })
    }
}
