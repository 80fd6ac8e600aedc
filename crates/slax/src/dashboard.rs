//! 🎛️ The Dashboard: one refresh cycle, every component, one report.
//!
//! 🎬 COLD OPEN: INT. OPS FLOOR. 8:59 AM.
//!
//! Three searches, one inbox, and a clock. The active tickets tell us who is about to breach.
//! The 30-day window tells us what happened today. The assignee-change search tells us who
//! picked up work. The inbox tells us how many tickets somebody called "urgent" in writing.
//! Any one of them can be down. The report still goes out.
//!
//! ## Knowledge Graph 🧠
//! - Owns: a [`TicketFetcher`] (retries + caches), an optional [`PriorityMailCounter`], a [`Clock`].
//! - Produces: [`DashboardReport`], immutable, with views for the table filters.
//! - Failure policy, per source:
//!   - active tickets or 30-day window fails: [`SourceWarning`], carry on
//!   - both fail: [`CycleError::AllSourcesFailed`], nothing to show
//!   - newly-assigned fails: empty top assignees + warning
//!   - mailbox fails or is not configured: count 0 + warning
//! - `&mut self` all the way down: the caches are the only state crossing cycles and
//!   the dashboard is their only owner. No locks were harmed in the making of this module. 🦆

use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Days, NaiveDate, TimeDelta, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{self, Dimension, WindowField};
use crate::app_config::{AppConfig, ReportConfig, TicketingConfig};
use crate::backends::{GmailClient, JiraClient, MailboxBackend, SearchRequest, TicketingBackend};
use crate::clock::{Clock, SystemClock};
use crate::common::{DailyBucket, IssueRecord, LabelCount};
use crate::crossref::PriorityMailCounter;
use crate::error::{CycleError, FetchError, FetchResult};
use crate::fetcher::TicketFetcher;
use crate::queries;
use crate::sla::{self, SlaFilter, SlaSummary, SlaVerdict};
use crate::transforms::{normalize, normalize_page};

const LOOKUP_DATE_FORMAT: &str = "%d-%b-%Y %H:%M";
const NOT_YET_RESOLVED: &str = "Not yet resolved";

/// 📡 Which feed a warning is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataSource {
    ActiveTickets,
    Window,
    NewlyAssigned,
    Mailbox,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataSource::ActiveTickets => "active tickets",
            DataSource::Window => "30-day window",
            DataSource::NewlyAssigned => "newly assigned",
            DataSource::Mailbox => "priority mail",
        })
    }
}

/// ⚠️ One degraded feed, and what went wrong with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceWarning {
    pub source: DataSource,
    pub message: String,
}

/// 🎟️ An active ticket, with its SLA verdict and a link a human can click.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveTicket {
    pub record: IssueRecord,
    pub verdict: SlaVerdict,
    pub link: String,
}

/// 🗓️ Today's numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyMetrics {
    pub day: NaiveDate,
    pub created_today: usize,
    pub closed_today: usize,
    pub top_request_types: Vec<LabelCount>,
    pub top_assignees: Vec<LabelCount>,
    /// 🏁 Who closed how many today, excluded assignees removed.
    pub closed_by_assignee: Vec<LabelCount>,
    /// 📈 Created tickets per (day, request type) across the whole window.
    pub created_per_day: Vec<DailyBucket>,
}

/// 📈 How the active tickets split up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub by_status: Vec<LabelCount>,
    pub by_assignee: Vec<LabelCount>,
    pub by_request_type: Vec<LabelCount>,
}

/// 📋 Everything one refresh cycle learned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub generated_at: DateTime<Utc>,
    pub last_fetch: Option<DateTime<Utc>>,
    pub active: Vec<ActiveTicket>,
    pub sla: SlaSummary,
    pub daily: DailyMetrics,
    pub overview: Overview,
    /// 🗓️ The normalized 30-day window, kept for the closed-today drill-down.
    pub window: Vec<IssueRecord>,
    pub priority_mail_count: usize,
    pub warnings: Vec<SourceWarning>,
    browse_base: String,
}

impl DashboardReport {
    /// 🔘 The ticket table, as seen through one filter button.
    pub fn tickets(&self, filter: SlaFilter) -> Vec<&ActiveTicket> {
        self.active
            .iter()
            .filter(|ticket| filter.matches(ticket.verdict.state))
            .collect()
    }

    /// 👤 One assignee's active tickets, oldest first.
    pub fn tickets_for_assignee(&self, assignee: &str) -> Vec<&ActiveTicket> {
        let mut mine: Vec<&ActiveTicket> = self
            .active
            .iter()
            .filter(|ticket| ticket.record.assignee == assignee)
            .collect();
        mine.sort_by_key(|ticket| ticket.record.created);
        mine
    }

    /// 🏁 What `assignee` closed today, from the 30-day window.
    pub fn closed_today_for(&self, assignee: &str) -> Vec<&IssueRecord> {
        aggregate::on_day(&self.window, WindowField::Resolved, self.daily.day)
            .filter(|record| record.assignee == assignee)
            .collect()
    }

    /// 🔗 `{base}/browse/{KEY}`
    pub fn link_for(&self, key: &str) -> String {
        browse_link(&self.browse_base, key)
    }
}

/// 🔍 A single ticket, dressed for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketDetails {
    pub key: String,
    pub link: String,
    pub status: String,
    pub assignee: String,
    pub request_type: String,
    pub created: String,
    pub resolved: String,
}

fn browse_link(base: &str, key: &str) -> String {
    format!("{}/browse/{}", base.trim_end_matches('/'), key)
}

/// 🎛️ The pipeline. Build once, refresh as often as you like; the caches decide what is fresh.
#[derive(Debug)]
pub struct Dashboard {
    fetcher: TicketFetcher,
    mail: Option<PriorityMailCounter>,
    ticketing: TicketingConfig,
    report: ReportConfig,
    warning_threshold: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl Dashboard {
    /// 🔧 Wire everything up from configuration: Jira, Gmail (if configured), the wall clock.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let jira = JiraClient::new(&config.ticketing).context("💀 Could not set up the ticketing client")?;
        let mailbox = match config.mailbox {
            Some(ref mailbox) => Some(MailboxBackend::Gmail(
                GmailClient::new(mailbox).context("💀 Could not set up the mailbox client")?,
            )),
            None => None,
        };
        Self::new(config, TicketingBackend::Jira(jira), mailbox, Arc::new(SystemClock))
    }

    /// 🧪 Wire everything up from parts. Tests pass in-memory backends and a manual clock.
    pub fn new(
        config: &AppConfig,
        ticketing: TicketingBackend,
        mailbox: Option<MailboxBackend>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let prefix = config.ticketing.project_prefix.clone();
        let mail = match (mailbox, config.mailbox.as_ref()) {
            (Some(mailbox), Some(mail_config)) => Some(PriorityMailCounter::from_config(mailbox, mail_config, &prefix)?),
            (Some(_), None) => anyhow::bail!("💀 A mailbox backend was supplied without a [mailbox] section to go with it"),
            (None, _) => None,
        };

        Ok(Self {
            fetcher: TicketFetcher::new(ticketing, &config.fetch, prefix, clock.clone())?,
            mail,
            ticketing: config.ticketing.clone(),
            report: config.report.clone(),
            warning_threshold: config.report.warning_threshold()?,
            clock,
        })
    }

    pub fn fetcher(&self) -> &TicketFetcher {
        &self.fetcher
    }

    async fn fetch_records(&mut self, jql: String, fields: &[&str]) -> FetchResult<Vec<IssueRecord>> {
        let request = SearchRequest::new(jql, fields, self.ticketing.max_results);
        let page = self.fetcher.search(&request).await?;
        Ok(normalize_page(&page, &self.ticketing.fields))
    }

    /// 🔄 Run one cycle: three searches, one inbox, one report.
    pub async fn refresh(&mut self) -> anyhow::Result<DashboardReport> {
        let now = self.clock.now();
        let today = now.date_naive();
        let project = self.ticketing.project_prefix.clone();
        let mut warnings = Vec::new();

        let active_jql = queries::active_jql(&project, &self.ticketing.queries);
        let active_fields: Vec<String> = queries::active_fields(&self.ticketing.fields)
            .into_iter()
            .map(str::to_string)
            .collect();
        let active_fields: Vec<&str> = active_fields.iter().map(String::as_str).collect();
        let active = self.fetch_records(active_jql, &active_fields).await;

        let window_jql = queries::window_jql(&project, &self.ticketing.queries);
        let window = self.fetch_records(window_jql, queries::WINDOW_FIELDS).await;

        let (active, window) = match (active, window) {
            (Err(active), Err(window)) => {
                return Err(CycleError::AllSourcesFailed { active, window }.into());
            }
            (active, window) => (
                degrade(active, DataSource::ActiveTickets, &mut warnings),
                degrade(window, DataSource::Window, &mut warnings),
            ),
        };

        let assigned = self
            .fetch_records(queries::newly_assigned_jql(&project), queries::ASSIGNED_FIELDS)
            .await;
        let assigned = degrade(assigned, DataSource::NewlyAssigned, &mut warnings);

        let priority_mail_count = match self.mail {
            Some(ref counter) => {
                let scan = counter.scan(today).await;
                if let Some(ref error) = scan.search_error {
                    warnings.push(SourceWarning {
                        source: DataSource::Mailbox,
                        message: format!("could not fetch priority ticket count: {error}"),
                    });
                } else if scan.skipped > 0 {
                    warnings.push(SourceWarning {
                        source: DataSource::Mailbox,
                        message: format!("{} message(s) could not be read; the count may be low", scan.skipped),
                    });
                }
                scan.count()
            }
            None => {
                warnings.push(SourceWarning {
                    source: DataSource::Mailbox,
                    message: "mailbox not configured; priority count is 0".to_string(),
                });
                0
            }
        };

        let report = self.assemble(now, active, window, assigned, priority_mail_count, warnings);
        info!(
            "📋 refresh complete: {} active ({} breached), {} created / {} closed today, {} priority, {} warning(s)",
            report.sla.total,
            report.sla.breached,
            report.daily.created_today,
            report.daily.closed_today,
            report.priority_mail_count,
            report.warnings.len()
        );
        Ok(report)
    }

    fn assemble(
        &self,
        now: DateTime<Utc>,
        active: Vec<IssueRecord>,
        window: Vec<IssueRecord>,
        assigned: Vec<IssueRecord>,
        priority_mail_count: usize,
        warnings: Vec<SourceWarning>,
    ) -> DashboardReport {
        let today = now.date_naive();
        let threshold = self.warning_threshold;
        // 🗓️ records with no usable `created` sit at the epoch; keep them out of the trend
        let window_start = today
            .checked_sub_days(Days::new(u64::from(self.ticketing.queries.window_days)))
            .unwrap_or(NaiveDate::MIN);
        let base = &self.ticketing.base_url;

        let active: Vec<ActiveTicket> = active
            .into_iter()
            .map(|record| ActiveTicket {
                verdict: sla::classify(record.sla_breach, now, threshold),
                link: browse_link(base, &record.key),
                record,
            })
            .collect();

        let created_today: Vec<&IssueRecord> = aggregate::on_day(&window, WindowField::Created, today).collect();
        let closed_today: Vec<&IssueRecord> = aggregate::on_day(&window, WindowField::Resolved, today).collect();

        let daily = DailyMetrics {
            day: today,
            created_today: created_today.len(),
            closed_today: closed_today.len(),
            top_request_types: aggregate::top_n(
                created_today.iter().copied(),
                Dimension::RequestType,
                self.report.top_request_types,
                &self.report.excluded_request_types,
            ),
            top_assignees: aggregate::top_n(
                &assigned,
                Dimension::Assignee,
                self.report.top_assignees,
                &self.report.excluded_assignees,
            ),
            closed_by_assignee: aggregate::top_n(
                closed_today.iter().copied(),
                Dimension::Assignee,
                usize::MAX,
                &self.report.excluded_assignees,
            ),
            created_per_day: aggregate::daily_buckets(&window, WindowField::Created, Dimension::RequestType)
                .into_iter()
                .filter(|bucket| bucket.date >= window_start)
                .collect(),
        };

        let records = || active.iter().map(|ticket| &ticket.record);
        let overview = Overview {
            by_status: aggregate::breakdown(records(), Dimension::Status),
            by_assignee: aggregate::breakdown(records(), Dimension::Assignee),
            by_request_type: aggregate::breakdown(records(), Dimension::RequestType),
        };

        DashboardReport {
            generated_at: now,
            last_fetch: self.fetcher.last_success(),
            sla: sla::summarize(active.iter().map(|ticket| &ticket.verdict)),
            active,
            daily,
            overview,
            window,
            priority_mail_count,
            warnings,
            browse_base: base.clone(),
        }
    }

    /// 🔍 Look up one ticket by id (`TKTS-1234`, `tkts-1234` or `1234`).
    pub async fn lookup(&mut self, input: &str) -> Result<TicketDetails, FetchError> {
        let raw = self.fetcher.get_one(input, queries::LOOKUP_FIELDS).await?;
        let record = normalize(&raw, &self.ticketing.fields);

        Ok(TicketDetails {
            link: browse_link(&self.ticketing.base_url, &record.key),
            created: record.created.format(LOOKUP_DATE_FORMAT).to_string(),
            resolved: record
                .resolved
                .map(|resolved| resolved.format(LOOKUP_DATE_FORMAT).to_string())
                .unwrap_or_else(|| NOT_YET_RESOLVED.to_string()),
            key: record.key,
            status: record.status,
            assignee: record.assignee,
            request_type: record.request_type,
        })
    }
}

/// ⚠️ A failed feed becomes an empty list and a warning. The cycle goes on.
fn degrade(result: FetchResult<Vec<IssueRecord>>, source: DataSource, warnings: &mut Vec<SourceWarning>) -> Vec<IssueRecord> {
    match result {
        Ok(records) => records,
        Err(err) => {
            warn!("⚠️ {} unavailable this cycle: {}", source, err);
            warnings.push(SourceWarning {
                source,
                message: error_chain(&err),
            });
            Vec::new()
        }
    }
}

// 🔗 "gave up after 3 attempts: HTTP 503 from ..." reads better than the outer message alone
fn error_chain(err: &FetchError) -> String {
    let mut message = err.to_string();
    let mut cause = std::error::Error::source(err);
    while let Some(inner) = cause {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        cause = inner.source();
    }
    message
}
