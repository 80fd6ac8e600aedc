//! 🏷️ Fetch errors: the taxonomy of everything that can go sideways between us and an API.
//!
//! 🧠 Knowledge graph:
//! - Produced by: `backends::jira`, `backends::gmail`, `ticket_key`, `backends::retry`
//! - Consumed by: `fetcher` (decides what to retry), `dashboard` (turns failures into warnings,
//!   or into a [`CycleError`] when nothing is left), `slax-cli` (turns failures into human sentences)
//! - Everything above this layer speaks `anyhow`. This layer speaks in variants, because
//!   "not found" and "try again in two seconds" deserve different reactions. 🦆

use thiserror::Error;

/// 💀 One failed conversation with an upstream API.
#[derive(Debug, Error)]
pub enum FetchError {
    /// ⚠️ The user typed something that is not a ticket key. No request was made.
    #[error("invalid ticket format '{input}': use '{prefix}-1234' or just '1234'")]
    InvalidTicketKey { input: String, prefix: String },

    /// 🚫 The ticket does not exist (or we are not allowed to know it exists).
    #[error("ticket '{0}' not found")]
    NotFound(String),

    /// 🔒 401/403. Retrying will not grow us new credentials.
    #[error("authentication rejected by {url} (HTTP {status}), check credentials")]
    Unauthorized { status: u16, url: String },

    /// 📡 Upstream answered, but not with good news.
    #[error("HTTP {status} from {url}: {body}")]
    Http { status: u16, url: String, body: String },

    /// 🧭 The configured base URL cannot be turned into a request URL. No request was made.
    #[error("malformed URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// 🔌 Upstream did not answer at all: DNS, connect, timeout, reset.
    #[error("transport error talking to {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// 🧩 Upstream answered with something that is not the JSON we were promised.
    #[error("could not decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// 🔄 We asked nicely, several times. The last answer is attached.
    #[error("gave up after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// 🔄 Is this worth another try? Network hiccups, 5xx and 429 are. Everything else is final.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// 🔍 Peel off `RetriesExhausted` to get at the failure that actually happened.
    pub fn root(&self) -> &FetchError {
        match self {
            FetchError::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), FetchError::NotFound(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.root(), FetchError::Unauthorized { .. })
    }
}

/// 🧾 Shorthand used by every backend.
pub type FetchResult<T> = Result<T, FetchError>;

/// 🚨 A refresh cycle that produced nothing worth showing.
#[derive(Debug, Error)]
pub enum CycleError {
    /// 💀 Both ticketing searches failed. One failing is a warning; both is an outage.
    #[error("all ticketing sources failed (active tickets: {active}; 30-day window: {window})")]
    AllSourcesFailed { active: FetchError, window: FetchError },
}
