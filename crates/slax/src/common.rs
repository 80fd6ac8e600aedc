//! 📦 Common data structures: the rows and tallies everything else passes around.
//!
//! 🎬 An issue arrives from the ticketing API as nested JSON with opinions. The normalizer
//! flattens it into an [`IssueRecord`]. The SLA deriver reads its breach instant, the daily
//! aggregator counts its labels, and at the end of the cycle the whole batch is thrown away
//! and rebuilt from scratch. Nothing here is persisted. Nothing here is mutated in place.
//! They are the postal workers of this codebase. Please tip your postal workers. 🦆

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// 👤 Sentinel for "nobody owns this one".
pub const UNASSIGNED: &str = "Unassigned";

/// 🤷 Sentinel for "the field wasn't there".
pub const NOT_AVAILABLE: &str = "N/A";

/// 🧩 Sentinel for "the issue type was there, but had no usable name".
pub const OTHER_REQUEST_TYPE: &str = "Other (See Jira)";

/// 🎯 One ticketing-system issue, flattened.
///
/// Every field has a value or a documented default. Optional instants stay `Option`
/// because "no SLA configured" and "not resolved yet" are real answers, not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueRecord {
    /// 🎟️ `TKTS-1234`. Unique. Never changes.
    pub key: String,
    /// 📋 Workflow status name, `N/A` if the API forgot to tell us.
    pub status: String,
    /// 👤 Display name of the assignee, or `Unassigned`.
    pub assignee: String,
    /// 🐣 Creation instant in UTC. The Unix epoch stands in when upstream sends garbage.
    pub created: DateTime<Utc>,
    /// ✅ Resolution instant, if the ticket has been put to rest.
    pub resolved: Option<DateTime<Utc>>,
    /// 🏷️ Issue type name, `N/A` when absent.
    pub request_type: String,
    /// ⏰ When the SLA clock runs out. `None` means no SLA is configured.
    pub sla_breach: Option<DateTime<Utc>>,
    /// 📅 Campaign start: region-specific field if set, else the default field.
    pub campaign_start: Option<DateTime<Utc>>,
}

impl IssueRecord {
    pub fn created_on(&self) -> NaiveDate {
        self.created.date_naive()
    }

    pub fn resolved_on(&self) -> Option<NaiveDate> {
        self.resolved.map(|resolved| resolved.date_naive())
    }
}

/// 🥇 One row of a ranked top-N list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

impl LabelCount {
    pub fn new(label: impl Into<String>, count: usize) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// 🗓️ How many records share a (date, label) pair for one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub label: String,
    pub count: usize,
}
