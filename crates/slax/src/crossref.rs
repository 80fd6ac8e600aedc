//! 📨 The Mailbox Cross-Referencer: how many distinct tickets did people shout about today?
//!
//! 🎬 Somewhere, an account manager types "URGENT!!! please prioritise TKTS-4411" and hits
//! send. Then sends it again, to a different list. Then replies-all with "any update?".
//! That is one priority ticket, not three. This module counts it once.
//!
//! 🧠 Knowledge graph:
//! - Query: `(sender OR sender) ("kw" OR "kw") after:YYYY/MM/DD`, first page, at most 50 ids.
//! - Text per message: subject header + every decoded `text/plain` part (base64url, any padding),
//!   or the snippet when no body decodes.
//! - Every `PREFIX-<digits>` match, upper-cased, goes into a set. The answer is the set's size.
//! - Failures degrade: a failed search means zero, a failed message means one less message.
//!   Nothing in here can take the report down. Everything in here gets logged.
//! - The count is never checked against the ticketing system. A mention is a mention. 🦆

use std::collections::HashSet;

use anyhow::Context;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::NaiveDate;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::app_config::MailboxConfig;
use crate::backends::{MailboxBackend, MailboxSource};
use crate::ticket_key::TicketKeyScanner;

/// 📏 Never open more than this many messages per cycle, whatever the config says.
pub const MESSAGE_CAP: usize = 50;

// 🔓 Gmail hands out base64url, and is relaxed about padding. So are we.
const MAIL_BODY: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// 🔎 Build the mailbox search for one UTC day.
pub fn priority_query(senders: &[String], keywords: &[String], day: NaiveDate) -> String {
    let mut clauses = Vec::with_capacity(3);
    if !senders.is_empty() {
        clauses.push(format!("({})", senders.join(" OR ")));
    }
    if !keywords.is_empty() {
        let quoted: Vec<String> = keywords.iter().map(|keyword| format!("\"{keyword}\"")).collect();
        clauses.push(format!("({})", quoted.join(" OR ")));
    }
    clauses.push(format!("after:{}", day.format("%Y/%m/%d")));
    clauses.join(" ")
}

/// ✉️ The `Subject` header, matched case-insensitively.
pub fn subject_of(message: &Value) -> Option<&str> {
    message
        .get("payload")?
        .get("headers")?
        .as_array()?
        .iter()
        .find(|header| {
            header
                .get("name")
                .and_then(Value::as_str)
                .is_some_and(|name| name.eq_ignore_ascii_case("subject"))
        })?
        .get("value")?
        .as_str()
}

fn collect_plain_parts(part: &Value, found: &mut Vec<String>) {
    let is_plain = part
        .get("mimeType")
        .and_then(Value::as_str)
        .is_some_and(|mime| mime.eq_ignore_ascii_case("text/plain"));

    if is_plain {
        let decoded = part
            .get("body")
            .and_then(|body| body.get("data"))
            .and_then(Value::as_str)
            .and_then(|data| MAIL_BODY.decode(data.trim()).ok());
        if let Some(bytes) = decoded {
            found.push(String::from_utf8_lossy(&bytes).into_owned());
        }
    }

    if let Some(children) = part.get("parts").and_then(Value::as_array) {
        for child in children {
            collect_plain_parts(child, found);
        }
    }
}

/// 📄 Every decodable `text/plain` part, depth-first, joined by newlines. `None` if there are none.
pub fn plain_text_body(message: &Value) -> Option<String> {
    let mut found = Vec::new();
    if let Some(payload) = message.get("payload") {
        collect_plain_parts(payload, &mut found);
    }
    (!found.is_empty()).then(|| found.join("\n"))
}

/// 🧵 What gets scanned for ticket mentions: subject, then body (or snippet if there is no body).
pub fn searchable_text(message: &Value) -> String {
    let subject = subject_of(message).unwrap_or_default();
    let body = plain_text_body(message).unwrap_or_else(|| {
        message
            .get("snippet")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    });
    format!("{subject} {body}")
}

/// 🧾 The full story of one scan, for whoever wants more than a number.
#[derive(Debug, Default, Clone)]
pub struct MailScan {
    pub tickets: HashSet<String>,
    /// Messages opened and scanned.
    pub inspected: usize,
    /// Messages listed but not retrievable.
    pub skipped: usize,
    /// Set when the search itself failed (and the count is therefore zero).
    pub search_error: Option<String>,
}

impl MailScan {
    pub fn count(&self) -> usize {
        self.tickets.len()
    }
}

/// 📨 Counts distinct ticket mentions in today's priority mail.
#[derive(Debug)]
pub struct PriorityMailCounter {
    mailbox: MailboxBackend,
    scanner: TicketKeyScanner,
    senders: Vec<String>,
    keywords: Vec<String>,
    max_messages: usize,
}

impl PriorityMailCounter {
    pub fn new(
        mailbox: MailboxBackend,
        scanner: TicketKeyScanner,
        senders: Vec<String>,
        keywords: Vec<String>,
        max_messages: usize,
    ) -> Self {
        Self {
            mailbox,
            scanner,
            senders,
            keywords,
            max_messages: max_messages.min(MESSAGE_CAP),
        }
    }

    pub fn from_config(mailbox: MailboxBackend, config: &MailboxConfig, project_prefix: &str) -> anyhow::Result<Self> {
        let scanner = TicketKeyScanner::new(project_prefix)
            .with_context(|| format!("💀 Could not build a ticket pattern from prefix '{project_prefix}'"))?;
        Ok(Self::new(
            mailbox,
            scanner,
            config.senders.clone(),
            config.keywords.clone(),
            config.max_messages,
        ))
    }

    /// 🔍 Search, fetch every listed message concurrently, scan, dedup.
    pub async fn scan(&self, day: NaiveDate) -> MailScan {
        let query = priority_query(&self.senders, &self.keywords, day);
        debug!("📨 priority mail query: {}", query);

        let ids = match self.mailbox.search_messages(&query, self.max_messages).await {
            Ok(ids) => ids,
            Err(err) => {
                warn!("📭 priority mail search failed, counting zero: {}", err);
                return MailScan {
                    search_error: Some(err.to_string()),
                    ..MailScan::default()
                };
            }
        };

        let ids: Vec<&String> = ids.iter().take(self.max_messages).collect();
        let fetched = join_all(ids.iter().map(|id| self.mailbox.get_message(id))).await;

        let mut scan = MailScan::default();
        for (id, outcome) in ids.iter().zip(fetched) {
            match outcome {
                Ok(message) => {
                    scan.inspected += 1;
                    scan.tickets.extend(self.scanner.scan(&searchable_text(&message)));
                }
                Err(err) => {
                    scan.skipped += 1;
                    warn!("📭 skipping message {}: {}", id, err);
                }
            }
        }

        info!(
            "📨 {} distinct ticket(s) across {} priority message(s), {} skipped",
            scan.count(),
            scan.inspected,
            scan.skipped
        );
        scan
    }

    /// 🔢 Just the number. Zero when the mailbox is unreachable.
    pub async fn count_priority_mentions(&self, day: NaiveDate) -> usize {
        self.scan(day).await.count()
    }
}
