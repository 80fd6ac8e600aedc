//! 🔎 JQL builders for the three searches a refresh cycle runs, plus the field lists they ask for.
//!
//! The JQL is assembled from configuration rather than pasted in as one heroic string literal,
//! so changing which statuses count as "active" is a TOML edit, not a release.

use crate::app_config::{FieldIds, QueryConfig};

/// 🗓️ Fields the 30-day window needs.
pub const WINDOW_FIELDS: &[&str] = &["status", "created", "resolutiondate", "assignee", "issuetype"];

/// 👤 Fields the newly-assigned search needs. Just the one.
pub const ASSIGNED_FIELDS: &[&str] = &["assignee"];

/// 🎟️ Fields a single-ticket lookup needs.
pub const LOOKUP_FIELDS: &[&str] = &["status", "assignee", "created", "resolutiondate", "issuetype"];

/// 🎟️ Fields the active-ticket search needs: the basics plus the three custom fields.
pub fn active_fields(ids: &FieldIds) -> Vec<&str> {
    vec![
        "status",
        "assignee",
        "created",
        "project",
        "issuetype",
        ids.sla.as_str(),
        ids.campaign_start_default.as_str(),
        ids.campaign_start_region.as_str(),
    ]
}

// 🔒 JQL string literal: double quotes, with embedded quotes and backslashes escaped
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn quoted_list(values: &[String]) -> String {
    values.iter().map(|value| quote(value)).collect::<Vec<_>>().join(", ")
}

/// 🟢 Open work: project, optional issue-type allow-list, active statuses.
pub fn active_jql(project: &str, queries: &QueryConfig) -> String {
    let mut clauses = vec![format!("project = {project}")];
    if !queries.active_request_types.is_empty() {
        clauses.push(format!("issuetype in ({})", quoted_list(&queries.active_request_types)));
    }
    if !queries.active_statuses.is_empty() {
        clauses.push(format!("status in ({})", quoted_list(&queries.active_statuses)));
    }
    clauses.join(" AND ")
}

/// 🗓️ Everything created in the last `window_days` days, in any of the window statuses.
pub fn window_jql(project: &str, queries: &QueryConfig) -> String {
    let mut clauses = vec![
        format!("project = {project}"),
        format!("created >= -{}d", queries.window_days),
    ];
    if !queries.window_statuses.is_empty() {
        clauses.push(format!("status in ({})", quoted_list(&queries.window_statuses)));
    }
    clauses.join(" AND ")
}

/// 👤 Tickets whose assignee changed since midnight (server time, as Jira sees it).
pub fn newly_assigned_jql(project: &str) -> String {
    format!("project = {project} AND assignee CHANGED during (startOfDay(), now())")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_the_active_query_is_assembled_from_parts() {
        let queries = QueryConfig {
            active_statuses: vec!["In Progress".into(), "Open".into()],
            active_request_types: vec!["UK - Display Creatives".into(), "IN - Video Creatives".into()],
            ..QueryConfig::default()
        };
        assert_eq!(
            active_jql("TKTS", &queries),
            "project = TKTS AND issuetype in (\"UK - Display Creatives\", \"IN - Video Creatives\") \
             AND status in (\"In Progress\", \"Open\")"
        );
    }

    #[test]
    fn the_one_where_no_request_types_means_no_issuetype_clause() {
        let jql = active_jql("TKTS", &QueryConfig::default());
        assert!(!jql.contains("issuetype"));
        assert!(jql.starts_with("project = TKTS AND status in (\"In Progress\""));
    }

    #[test]
    fn the_one_where_the_window_reaches_back_thirty_days() {
        let jql = window_jql("TKTS", &QueryConfig::default());
        assert!(jql.starts_with("project = TKTS AND created >= -30d AND status in ("));
        assert!(jql.contains("\"Campaign/request closed\""));
    }

    #[test]
    fn the_one_where_quotes_inside_values_do_not_break_out() {
        assert_eq!(quote(r#"Say "hi""#), r#""Say \"hi\"""#);
    }

    #[test]
    fn the_one_where_active_fields_carry_the_custom_ids() {
        let ids = FieldIds::default();
        let fields = active_fields(&ids);
        assert!(fields.contains(&"customfield_10704"));
        assert!(fields.contains(&"customfield_16020"));
        assert!(fields.contains(&"customfield_10522"));
        assert_eq!(newly_assigned_jql("OPS"), "project = OPS AND assignee CHANGED during (startOfDay(), now())");
    }
}
