//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." -- every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! 🧠 Knowledge graph:
//! - `ticketing`: where Jira lives, who we are, which custom fields mean what, which JQL to run
//! - `mailbox`: optional. No mailbox, no priority count, no crash. Just a zero and a warning.
//! - `fetch`: retry and cache knobs (3 attempts, 2s apart, 300s/60s TTLs)
//! - `report`: top-N sizes, exclusion lists, SLA warning band

use std::path::Path;

use anyhow::Context;
use chrono::TimeDelta;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 🎟️ The ticketing API. Mandatory, unlike my gym membership.
    pub ticketing: TicketingConfig,
    /// 📨 The mailbox API. Optional. The report survives without it.
    #[serde(default)]
    pub mailbox: Option<MailboxConfig>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// 🎟️ Everything we need to talk to the ticketing REST API.
#[derive(Debug, Deserialize, Clone)]
pub struct TicketingConfig {
    /// 📡 `https://yourcompany.atlassian.net`. Scheme included. Trailing slash optional.
    pub base_url: String,
    /// 🔒 Basic auth user. Optional, like flossing. You know you should have one.
    #[serde(default)]
    pub user_email: Option<String>,
    /// 🔒 API token. If this is in plaintext in a committed file, we need to talk.
    #[serde(default)]
    pub api_token: Option<String>,
    /// 🏷️ The `TKTS` in `TKTS-1234`.
    #[serde(default = "default_project_prefix")]
    pub project_prefix: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 📏 One page, capped. If upstream has more, the extras quietly miss the party.
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub fields: FieldIds,
    #[serde(default)]
    pub queries: QueryConfig,
}

/// 🧩 Custom field ids. Opaque strings, chosen by whoever set up the Jira instance in 2017.
#[derive(Debug, Deserialize, Clone)]
pub struct FieldIds {
    #[serde(default = "default_sla_field")]
    pub sla: String,
    #[serde(default = "default_campaign_start_default_field")]
    pub campaign_start_default: String,
    #[serde(default = "default_campaign_start_region_field")]
    pub campaign_start_region: String,
}

impl Default for FieldIds {
    fn default() -> Self {
        Self {
            sla: default_sla_field(),
            campaign_start_default: default_campaign_start_default_field(),
            campaign_start_region: default_campaign_start_region_field(),
        }
    }
}

/// 🔎 The ingredients of the three searches each cycle runs.
#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    /// 🟢 Statuses that count as "active".
    #[serde(default = "default_active_statuses")]
    pub active_statuses: Vec<String>,
    /// 🏷️ Restrict active tickets to these issue types. Empty = all of them.
    #[serde(default)]
    pub active_request_types: Vec<String>,
    /// 🗓️ How far back the daily-metrics window reaches.
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_window_statuses")]
    pub window_statuses: Vec<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            active_statuses: default_active_statuses(),
            active_request_types: Vec::new(),
            window_days: default_window_days(),
            window_statuses: default_window_statuses(),
        }
    }
}

/// 📨 Gmail-flavoured mailbox API settings.
#[derive(Debug, Deserialize, Clone)]
pub struct MailboxConfig {
    #[serde(default = "default_mailbox_base_url")]
    pub base_url: String,
    /// 🔒 OAuth bearer token. Getting one is somebody else's adventure.
    pub access_token: String,
    /// ✉️ From-addresses worth listening to. OR'd together.
    #[serde(default)]
    pub senders: Vec<String>,
    /// 🚨 Words that make a mail "priority". OR'd together.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// 📏 How many matched messages we bother opening per cycle.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// 🔄 Retry + cache knobs.
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_search_ttl_secs")]
    pub search_ttl_secs: i64,
    #[serde(default = "default_lookup_ttl_secs")]
    pub lookup_ttl_secs: i64,
}

impl FetchConfig {
    /// 🧊 How long a search page stays fresh. Zero disables the search cache.
    pub fn search_ttl(&self) -> anyhow::Result<TimeDelta> {
        bounded_delta("fetch.search_ttl_secs", self.search_ttl_secs, MAX_TTL_SECS, TimeDelta::try_seconds)
    }

    /// 🧊 How long a single-ticket lookup stays fresh. Zero disables the lookup cache.
    pub fn lookup_ttl(&self) -> anyhow::Result<TimeDelta> {
        bounded_delta("fetch.lookup_ttl_secs", self.lookup_ttl_secs, MAX_TTL_SECS, TimeDelta::try_seconds)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            search_ttl_secs: default_search_ttl_secs(),
            lookup_ttl_secs: default_lookup_ttl_secs(),
        }
    }
}

/// 📊 What the report ranks, what it ignores, and when it starts sweating.
#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_top_request_types")]
    pub top_request_types: usize,
    #[serde(default = "default_top_assignees")]
    pub top_assignees: usize,
    #[serde(default = "default_excluded_request_types")]
    pub excluded_request_types: Vec<String>,
    #[serde(default = "default_excluded_assignees")]
    pub excluded_assignees: Vec<String>,
    /// ⚠️ Remaining time below this many hours gets the warning treatment.
    #[serde(default = "default_sla_warning_hours")]
    pub sla_warning_hours: i64,
}

impl ReportConfig {
    /// ⚠️ Remaining time below this gets the warning treatment.
    pub fn warning_threshold(&self) -> anyhow::Result<TimeDelta> {
        bounded_delta(
            "report.sla_warning_hours",
            self.sla_warning_hours,
            MAX_WARNING_HOURS,
            TimeDelta::try_hours,
        )
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_request_types: default_top_request_types(),
            top_assignees: default_top_assignees(),
            excluded_request_types: default_excluded_request_types(),
            excluded_assignees: default_excluded_assignees(),
            sla_warning_hours: default_sla_warning_hours(),
        }
    }
}

// 🧊 a day. Anything cached longer than that is not a cache, it's an archive.
const MAX_TTL_SECS: i64 = 86_400;

// ⚠️ a year of warning is already more sweating than anyone needs
const MAX_WARNING_HOURS: i64 = 24 * 365;

/// 📏 A config integer turned into a [`TimeDelta`], or an error naming the knob.
fn bounded_delta(
    knob: &str,
    value: i64,
    max: i64,
    to_delta: fn(i64) -> Option<TimeDelta>,
) -> anyhow::Result<TimeDelta> {
    if !(0..=max).contains(&value) {
        anyhow::bail!("💀 {knob} = {value} is out of range. Pick something between 0 and {max}.");
    }
    to_delta(value).with_context(|| format!("💀 {knob} = {value} does not fit in a duration"))
}

impl AppConfig {
    /// 🔍 Reject values that parse fine but would make no sense at runtime.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.fetch.search_ttl()?;
        self.fetch.lookup_ttl()?;
        self.report.warning_threshold()?;
        Ok(())
    }
}

fn default_project_prefix() -> String {
    "TKTS".to_string()
}

// ⏱️ 15 seconds. If Jira can't answer a search in 15 seconds, it's having a day.
fn default_timeout_secs() -> u64 {
    15
}

fn default_max_results() -> u32 {
    1000
}

fn default_sla_field() -> String {
    "customfield_10704".to_string()
}

fn default_campaign_start_default_field() -> String {
    "customfield_10522".to_string()
}

fn default_campaign_start_region_field() -> String {
    "customfield_16020".to_string()
}

fn default_active_statuses() -> Vec<String> {
    [
        "In Progress",
        "Open",
        "Reopened",
        "Waiting for customer",
        "Waiting for support",
    ]
    .map(String::from)
    .to_vec()
}

fn default_window_days() -> u32 {
    30
}

fn default_window_statuses() -> Vec<String> {
    [
        "Open",
        "In Progress",
        "Reopened",
        "Waiting for support",
        "Waiting for customer",
        "Campaign/request closed",
        "Resolved",
        "Closed",
    ]
    .map(String::from)
    .to_vec()
}

fn default_mailbox_base_url() -> String {
    "https://gmail.googleapis.com/gmail/v1/users/me".to_string()
}

fn default_keywords() -> Vec<String> {
    ["priority", "prioritise", "Urgent"].map(String::from).to_vec()
}

fn default_max_messages() -> usize {
    50
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

// 🧊 five minutes: long enough to spare Jira, short enough that nobody notices
fn default_search_ttl_secs() -> i64 {
    300
}

fn default_lookup_ttl_secs() -> i64 {
    60
}

fn default_top_request_types() -> usize {
    5
}

fn default_top_assignees() -> usize {
    3
}

fn default_excluded_request_types() -> Vec<String> {
    vec!["China - Outbound".to_string()]
}

fn default_excluded_assignees() -> Vec<String> {
    vec!["Adops-EA Group".to_string()]
}

fn default_sla_warning_hours() -> i64 {
    8
}

/// 🚀 Load the config: from a file, from env vars, or from the sheer power of hoping.
///
/// 🔧 Environment variables prefixed `SLAX_` form the base layer; nested keys use `__`
/// (`SLAX_TICKETING__API_TOKEN`). A TOML file, when given, is merged on top and wins.
///
/// 💀 Returns an error if config is unparseable. Which it will be. Check the error message though.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("SLAX_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (SLAX_*). \
             Check the [ticketing] section first, it's the one that's mandatory.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (SLAX_*). \
                 No file was provided, so SLAX_TICKETING__BASE_URL at the very least has to exist."
            .to_string(),
    };

    let app_config: AppConfig = config.extract().context(context_msg)?;
    app_config.validate()?;
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::io::Write;

    // -- every test that goes through load_config runs inside a Jail, so SLAX_* variables
    // -- set by one test never leak into another
    fn write_test_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("💀 Failed to create a temp config. The filesystem said 'new phone who dis'.");
        file.write_all(contents.as_bytes())
            .expect("💀 Failed to write test config.");
        file
    }

    #[test]
    fn the_one_where_a_minimal_file_gets_all_the_sensible_defaults() {
        Jail::expect_with(|_jail| {
            let file = write_test_config(
                r#"
                [ticketing]
                base_url = "https://jira.example"
                "#,
            );

            let app_config = load_config(Some(file.path()))
                .expect("💀 A base_url-only config should parse. Defaults exist for a reason.");

            assert_eq!(app_config.ticketing.project_prefix, "TKTS");
            assert_eq!(app_config.ticketing.max_results, 1000);
            assert_eq!(app_config.ticketing.fields.sla, "customfield_10704");
            assert_eq!(app_config.ticketing.queries.window_days, 30);
            assert!(app_config.mailbox.is_none());
            assert_eq!(app_config.fetch.retry_attempts, 3);
            assert_eq!(app_config.fetch.retry_delay_secs, 2);
            assert_eq!(app_config.fetch.search_ttl_secs, 300);
            assert_eq!(app_config.fetch.lookup_ttl_secs, 60);
            assert_eq!(app_config.report.top_request_types, 5);
            assert_eq!(app_config.report.top_assignees, 3);
            assert_eq!(app_config.report.sla_warning_hours, 8);
            assert_eq!(app_config.report.excluded_request_types, vec!["China - Outbound"]);
            Ok(())
        });
    }

    #[test]
    fn the_one_where_every_knob_gets_turned() {
        Jail::expect_with(|_jail| {
            let file = write_test_config(
                r#"
                [ticketing]
                base_url = "https://jira.example"
                user_email = "bot@example.com"
                api_token = "hunter2"
                project_prefix = "OPS"

                [ticketing.fields]
                sla = "customfield_1"

                [ticketing.queries]
                active_request_types = ["UK - Display Creatives"]

                [mailbox]
                access_token = "ya29.token"
                senders = ["ops@example.com"]

                [fetch]
                retry_delay_secs = 0

                [report]
                excluded_assignees = ["Robot", "Group Inbox"]
                "#,
            );

            let app_config = load_config(Some(file.path())).expect("💀 Full config should parse.");

            assert_eq!(app_config.ticketing.project_prefix, "OPS");
            assert_eq!(app_config.ticketing.api_token.as_deref(), Some("hunter2"));
            assert_eq!(app_config.ticketing.fields.sla, "customfield_1");
            assert_eq!(
                app_config.ticketing.fields.campaign_start_region,
                "customfield_16020",
                "unset siblings keep their defaults"
            );
            assert_eq!(app_config.ticketing.queries.active_request_types.len(), 1);
            let mailbox = app_config.mailbox.expect("mailbox section was given");
            assert_eq!(mailbox.max_messages, 50);
            assert_eq!(mailbox.keywords, vec!["priority", "prioritise", "Urgent"]);
            assert_eq!(app_config.fetch.retry_delay_secs, 0);
            assert_eq!(app_config.report.excluded_assignees, vec!["Robot", "Group Inbox"]);
            Ok(())
        });
    }

    #[test]
    fn the_one_where_the_environment_is_enough_on_its_own() {
        Jail::expect_with(|jail| {
            jail.set_env("SLAX_TICKETING__BASE_URL", "https://env.example");
            jail.set_env("SLAX_TICKETING__PROJECT_PREFIX", "OPS");
            jail.set_env("SLAX_FETCH__RETRY_ATTEMPTS", 5);

            let app_config = load_config(None).expect("💀 SLAX_* variables alone should be a valid config.");

            assert_eq!(app_config.ticketing.base_url, "https://env.example");
            assert_eq!(app_config.ticketing.project_prefix, "OPS");
            assert_eq!(app_config.fetch.retry_attempts, 5);
            assert_eq!(app_config.fetch.search_ttl_secs, 300, "untouched knobs keep their defaults");
            Ok(())
        });
    }

    #[test]
    fn the_one_where_the_file_outranks_the_environment() {
        Jail::expect_with(|jail| {
            jail.set_env("SLAX_TICKETING__BASE_URL", "https://env.example");
            jail.set_env("SLAX_TICKETING__PROJECT_PREFIX", "OPS");
            let file = write_test_config(
                r#"
                [ticketing]
                base_url = "https://file.example"
                "#,
            );

            let app_config = load_config(Some(file.path())).expect("💀 File plus env should merge.");

            assert_eq!(app_config.ticketing.base_url, "https://file.example", "the file wins a tie");
            assert_eq!(app_config.ticketing.project_prefix, "OPS", "the environment fills the gaps");
            Ok(())
        });
    }

    #[test]
    fn the_one_where_toml_alone_is_enough_without_figment() {
        let app_config: AppConfig = toml::from_str(
            r#"
            [ticketing]
            base_url = "https://jira.example"
            [mailbox]
            access_token = "t"
            keywords = ["urgent"]
            "#,
        )
        .expect("💀 Plain toml parsing should agree with figment.");
        assert_eq!(
            app_config.mailbox.map(|m| m.base_url),
            Some("https://gmail.googleapis.com/gmail/v1/users/me".to_string())
        );
    }

    #[test]
    fn the_one_where_ticketing_is_missing_and_we_say_so() {
        Jail::expect_with(|_jail| {
            let file = write_test_config(
                r#"
                [report]
                top_assignees = 10
                "#,
            );
            let result = load_config(Some(file.path()));
            assert!(result.is_err(), "no [ticketing] section means no report");
            Ok(())
        });
    }

    #[test]
    fn the_one_where_absurd_durations_are_refused_instead_of_panicking() {
        Jail::expect_with(|_jail| {
            for (section, knob) in [
                ("[fetch]", "search_ttl_secs = 9223372036854775807"),
                ("[fetch]", "lookup_ttl_secs = -1"),
                ("[report]", "sla_warning_hours = 9223372036854775"),
            ] {
                let file = write_test_config(&format!(
                    "[ticketing]\nbase_url = \"https://jira.example\"\n{section}\n{knob}\n"
                ));
                let err = load_config(Some(file.path())).expect_err(knob);
                let name = knob.split(' ').next().unwrap_or_default();
                assert!(format!("{err:#}").contains(name), "{err:#}");
            }
            Ok(())
        });
    }

    #[test]
    fn the_one_where_zero_means_no_caching_and_that_is_fine() {
        let fetch = FetchConfig {
            search_ttl_secs: 0,
            ..FetchConfig::default()
        };
        assert_eq!(fetch.search_ttl().unwrap(), TimeDelta::zero());
        assert_eq!(fetch.lookup_ttl().unwrap(), TimeDelta::seconds(60));
        assert_eq!(ReportConfig::default().warning_threshold().unwrap(), TimeDelta::hours(8));
    }
}
