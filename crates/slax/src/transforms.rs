//! 🔄 Transforms: nested Jira JSON in, flat [`IssueRecord`] out. 🎭
//!
//! 🎬 COLD OPEN: INT. UNITED NATIONS. SIMULTANEOUS TRANSLATION BOOTH. 2:47 AM.
//!
//! The translator had been awake for nineteen hours. Jira JSON on the left screen, four
//! levels deep, half of it `null`. A flat table on the right. In between: this module.
//! "It's just reading a few fields," they'd said. (Narrator: the fields had opinions.)
//!
//! ## Architecture 📐
//!
//! ```text
//!   raw issue (serde_json::Value)
//!        │
//!        ├── extract::*      one ordered-fallback function per nested path, each -> Option
//!        ├── timestamps::*   RFC 3339 | Jira +0000 | bare date | epochMillis -> UTC
//!        │
//!        ▼
//!   normalize()  applies the defaults in one visible place
//!        │
//!        ▼
//!   IssueRecord  (every field has a value or a documented default)
//! ```
//!
//! ## Knowledge Graph 🧠
//! - Depends on: `common::IssueRecord`, `app_config::FieldIds` (opaque custom field ids)
//! - Used by: `dashboard` (active tickets, 30-day window, newly assigned, lookup)
//! - Totality: [`normalize`] never fails. The worst input still yields a record full of
//!   sentinels and an epoch `created`. A report with one odd row beats no report. 🦆

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::app_config::FieldIds;
use crate::common::{IssueRecord, NOT_AVAILABLE, OTHER_REQUEST_TYPE, UNASSIGNED};

pub mod extract;
pub mod timestamps;

use extract::IssueTypeName;
use timestamps::instant_from_value;

/// 🔄 Flatten one raw issue. Total: never fails, never panics.
pub fn normalize(raw: &Value, field_ids: &FieldIds) -> IssueRecord {
    // -- 📋 a missing "fields" object is treated like an empty one; every lookup then defaults
    let fields = raw.get("fields").unwrap_or(&Value::Null);

    let request_type = match extract::issue_type_name(fields) {
        IssueTypeName::Absent => NOT_AVAILABLE.to_string(),
        IssueTypeName::Unnamed => OTHER_REQUEST_TYPE.to_string(),
        IssueTypeName::Named(name) => name.to_string(),
    };

    IssueRecord {
        key: raw
            .get("key")
            .and_then(Value::as_str)
            .unwrap_or(NOT_AVAILABLE)
            .to_string(),
        status: extract::status_name(fields).unwrap_or(NOT_AVAILABLE).to_string(),
        assignee: extract::assignee_name(fields).unwrap_or(UNASSIGNED).to_string(),
        created: instant_from_value(fields.get("created")).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        resolved: instant_from_value(fields.get("resolutiondate")),
        request_type,
        sla_breach: extract::sla_breach(fields.get(&field_ids.sla)),
        campaign_start: extract::campaign_start(
            fields,
            &field_ids.campaign_start_region,
            &field_ids.campaign_start_default,
        ),
    }
}

/// 📦 Flatten every issue of a search page. No `issues` array means no records.
pub fn normalize_page(page: &Value, field_ids: &FieldIds) -> Vec<IssueRecord> {
    page.get("issues")
        .and_then(Value::as_array)
        .map(|issues| issues.iter().map(|issue| normalize(issue, field_ids)).collect())
        .unwrap_or_default()
}
