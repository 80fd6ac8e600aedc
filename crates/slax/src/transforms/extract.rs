//! 🔦 Field extraction: one small function per nested lookup, each returning `Option`.
//!
//! Jira nests everything. `fields.assignee.displayName`. `fields.customfield_10704.ongoingCycle
//! .breachTime.iso8601`. Any level can be missing, `null`, or a surprise type. Every function
//! here walks one such path and gives back `None` the moment the path stops making sense.
//! Defaults are applied one level up, in the normalizer, where they are visible.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::timestamps::{instant_from_epoch_millis, instant_from_value};

/// 🔍 `fields[name][inner]` as a non-empty string.
fn nested_str<'a>(fields: &'a Value, name: &str, inner: &str) -> Option<&'a str> {
    fields
        .get(name)?
        .get(inner)?
        .as_str()
        .filter(|text| !text.trim().is_empty())
}

/// 👤 `fields.assignee.displayName`
pub fn assignee_name(fields: &Value) -> Option<&str> {
    nested_str(fields, "assignee", "displayName")
}

/// 📋 `fields.status.name`
pub fn status_name(fields: &Value) -> Option<&str> {
    nested_str(fields, "status", "name")
}

/// 🏷️ What we know about the issue type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueTypeName<'a> {
    /// Nothing there at all (missing, `null`, or an empty object).
    Absent,
    /// Something there, but no usable `name` inside it.
    Unnamed,
    Named(&'a str),
}

/// 🏷️ `fields.issuetype.name`, distinguishing "no issue type" from "an issue type with no name".
pub fn issue_type_name(fields: &Value) -> IssueTypeName<'_> {
    match fields.get("issuetype") {
        None | Some(Value::Null) => IssueTypeName::Absent,
        Some(Value::Object(map)) if map.is_empty() => IssueTypeName::Absent,
        Some(_) => match nested_str(fields, "issuetype", "name") {
            Some(name) => IssueTypeName::Named(name),
            None => IssueTypeName::Unnamed,
        },
    }
}

/// ⏰ The breach instant of one SLA cycle's `breachTime`, if it carries one.
///
/// `iso8601` is preferred; `epochMillis` stands in when the string is missing.
fn cycle_breach(breach_time: &Value) -> Option<DateTime<Utc>> {
    match breach_time.get("iso8601") {
        Some(iso) => instant_from_value(Some(iso)),
        None => instant_from_epoch_millis(breach_time.get("epochMillis")),
    }
}

/// 🧭 Does this cycle *have* a breach time, parseable or not?
fn breach_time_of(cycle: Option<&Value>) -> Option<&Value> {
    cycle?
        .get("breachTime")
        .filter(|breach_time| breach_time.get("iso8601").is_some() || breach_time.get("epochMillis").is_some())
}

/// ⏰ SLA breach instant with ordered fallback on presence:
/// the ongoing cycle if it has a breach time, else the last completed cycle, else nothing.
///
/// An ongoing cycle whose breach time is present but garbled does not fall through; it is
/// the answer, and the answer is "no usable SLA".
pub fn sla_breach(sla_field: Option<&Value>) -> Option<DateTime<Utc>> {
    let sla = sla_field.filter(|value| !value.is_null())?;

    if let Some(ongoing) = breach_time_of(sla.get("ongoingCycle")) {
        return cycle_breach(ongoing);
    }

    let last_completed = sla
        .get("completedCycles")
        .and_then(Value::as_array)
        .and_then(|cycles| cycles.last());
    breach_time_of(last_completed).and_then(cycle_breach)
}

/// 📅 Campaign start with ordered fallback on *parsed value*:
/// the region field if it holds a real date, else the default field, else nothing.
pub fn campaign_start(fields: &Value, region_field: &str, default_field: &str) -> Option<DateTime<Utc>> {
    instant_from_value(fields.get(region_field)).or_else(|| instant_from_value(fields.get(default_field)))
}
