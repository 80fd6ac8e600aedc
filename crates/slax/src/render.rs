//! 🎨 The Renderer: a [`DashboardReport`] in, plain-text tables out.
//!
//! Tables so comfy they have lumbar support. Every function here is pure and returns a
//! `String`; printing it is the caller's business. 🍽️

use std::collections::BTreeMap;

use chrono::NaiveDate;
use comfy_table::presets::{NOTHING, UTF8_FULL_CONDENSED};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::common::{IssueRecord, LabelCount, NOT_AVAILABLE};
use crate::dashboard::{ActiveTicket, DashboardReport, TicketDetails};
use crate::sla::SlaFilter;

const CREATED_FORMAT: &str = "%d%b%Y %H:%M";
const START_FORMAT: &str = "%d%b%Y";
const REFRESHED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Disabled);
    table
}

fn right(value: impl ToString) -> Cell {
    Cell::new(value).set_alignment(CellAlignment::Right)
}

fn tiles(report: &DashboardReport) -> Table {
    // -- NOTHING preset: tiles are a row of big numbers, not a spreadsheet
    let mut tiles = Table::new();
    tiles.load_preset(NOTHING);
    tiles.set_header(vec![
        "🎟️ Total Active",
        "✅ Within SLA",
        "⚠️ Nearing Breach",
        "🚨 Breached",
        "⚪ No SLA",
        "🔥 Priority Tickets Today",
    ]);
    tiles.add_row(vec![
        right(report.sla.total),
        right(report.sla.within_sla),
        right(report.sla.warning),
        right(report.sla.breached),
        right(report.sla.no_sla),
        right(report.priority_mail_count),
    ]);
    tiles
}

fn ticket_table<'a>(tickets: impl IntoIterator<Item = &'a ActiveTicket>) -> Table {
    let mut table = table();
    table.set_header(vec![
        "Ticket",
        "Link",
        "SLA Status",
        "SLA",
        "Status",
        "Assignee",
        "Request Type",
        "Created",
        "Start Date",
    ]);
    for ticket in tickets {
        let record = &ticket.record;
        table.add_row(vec![
            Cell::new(&record.key),
            Cell::new(&ticket.link),
            Cell::new(ticket.verdict.state.label()),
            Cell::new(&ticket.verdict.display),
            Cell::new(&record.status),
            Cell::new(&record.assignee),
            Cell::new(&record.request_type),
            Cell::new(record.created.format(CREATED_FORMAT)),
            Cell::new(
                record
                    .campaign_start
                    .map(|start| start.format(START_FORMAT).to_string())
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            ),
        ]);
    }
    table
}

fn counts_table(header: &str, counts: &[LabelCount]) -> Table {
    let mut table = table();
    table.set_header(vec![Cell::new(header), right("Count")]);
    for entry in counts {
        table.add_row(vec![Cell::new(&entry.label), right(entry.count)]);
    }
    table
}

fn records_table<'a>(records: impl IntoIterator<Item = &'a IssueRecord>) -> Table {
    let mut table = table();
    table.set_header(vec!["Ticket", "Status", "Request Type", "Created", "Resolved"]);
    for record in records {
        table.add_row(vec![
            Cell::new(&record.key),
            Cell::new(&record.status),
            Cell::new(&record.request_type),
            Cell::new(record.created.format(CREATED_FORMAT)),
            Cell::new(
                record
                    .resolved
                    .map(|at| at.format(CREATED_FORMAT).to_string())
                    .unwrap_or_default(),
            ),
        ]);
    }
    table
}

fn trend_table(report: &DashboardReport) -> Table {
    let per_day = report
        .daily
        .created_per_day
        .iter()
        .fold(BTreeMap::<NaiveDate, usize>::new(), |mut days, bucket| {
            *days.entry(bucket.date).or_insert(0) += bucket.count;
            days
        });
    let mut table = table();
    table.set_header(vec![Cell::new("Day"), right("Created")]);
    for (day, count) in per_day {
        table.add_row(vec![Cell::new(day), right(count)]);
    }
    table
}

/// 📋 The whole report, with the ticket table seen through `filter`.
///
/// The footer shows when the data last came back from upstream, not when this report was
/// assembled: a cycle served from cache is only as fresh as the fetch that filled it.
pub fn render_report(report: &DashboardReport, filter: SlaFilter) -> String {
    let mut lines: Vec<String> = vec![format!("{}\n", tiles(report))];

    let shown = report.tickets(filter);
    lines.push(format!("🎫 Tickets ({filter}): {} shown", shown.len()));
    if shown.is_empty() {
        lines.push("No tickets found.\n".to_string());
    } else {
        lines.push(format!("{}\n", ticket_table(shown)));
    }

    let daily = &report.daily;
    lines.push(format!("📅 Today's Highlights ({})", daily.day.format("%Y-%m-%d")));
    lines.push(format!("🆕 Tickets Created Today: {}", daily.created_today));
    lines.push(format!("🏁 Tickets Closed Today: {}\n", daily.closed_today));
    lines.push(format!(
        "{}\n",
        counts_table("🏆 Top Request Types Today", &daily.top_request_types)
    ));
    if daily.top_assignees.is_empty() {
        lines.push("👥 No tickets assigned today.\n".to_string());
    } else {
        lines.push(format!("{}\n", counts_table("👥 Top Assignees Today", &daily.top_assignees)));
    }
    if !daily.closed_by_assignee.is_empty() {
        lines.push(format!("{}\n", counts_table("🏁 Closed Today By", &daily.closed_by_assignee)));
    }

    lines.push("📊 Active Ticket Overview".to_string());
    lines.push(counts_table("Status", &report.overview.by_status).to_string());
    lines.push(counts_table("Assignee", &report.overview.by_assignee).to_string());
    lines.push(format!("{}\n", counts_table("Request Type", &report.overview.by_request_type)));

    if !daily.created_per_day.is_empty() {
        lines.push(format!("📈 Created Per Day (last 30 days)\n{}\n", trend_table(report)));
    }

    for warning in &report.warnings {
        lines.push(format!("⚠️ {}: {}", warning.source, warning.message));
    }

    let refreshed = report
        .last_fetch
        .map(|at| at.format(REFRESHED_FORMAT).to_string())
        .unwrap_or_else(|| "never".to_string());
    lines.push(format!("Data last refreshed: {refreshed}"));
    lines.join("\n")
}

/// 👤 One assignee's active tickets, oldest first.
pub fn render_assignee(report: &DashboardReport, assignee: &str) -> String {
    let tickets = report.tickets_for_assignee(assignee);
    if tickets.is_empty() {
        return format!("No active tickets for {assignee}.");
    }
    format!("🎫 Tickets for {assignee}: {}\n{}", tickets.len(), ticket_table(tickets))
}

/// 🏁 What one assignee closed today.
pub fn render_closed_by(report: &DashboardReport, assignee: &str) -> String {
    let closed = report.closed_today_for(assignee);
    if closed.is_empty() {
        return format!("{assignee} has not closed anything today.");
    }
    format!("🏁 Closed today by {assignee}: {}\n{}", closed.len(), records_table(closed))
}

/// 🔍 A single ticket, two columns, no surprises.
pub fn render_ticket(details: &TicketDetails) -> String {
    let mut table = table();
    table.set_header(vec!["Field", "Value"]);
    for (field, value) in [
        ("Ticket", &details.key),
        ("Link", &details.link),
        ("Status", &details.status),
        ("Assignee", &details.assignee),
        ("Request Type", &details.request_type),
        ("Created", &details.created),
        ("Resolved", &details.resolved),
    ] {
        table.add_row(vec![field, value.as_str()]);
    }
    table.to_string()
}
