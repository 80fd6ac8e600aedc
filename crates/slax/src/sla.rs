//! ⏰ The SLA Deriver: how long until it's on fire, or how long it has been on fire.
//!
//! 🧠 Knowledge graph:
//! - Input: a breach instant (or `None`), a reference "now", a warning threshold.
//! - Output: [`SlaVerdict`] = state + the string a human reads + whether to sweat.
//! - Pure. No clock in here. The caller decides what "now" is, which is how the tests
//!   get to stand one second either side of a deadline without a time machine.
//! - The warning band is a costume `WithinSla` wears, not a fourth state. 🦆

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3600;
const SECS_PER_DAY: i64 = 86_400;

/// 🚦 Where a ticket stands against its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SlaState {
    NoSla,
    WithinSla,
    Breached,
}

impl SlaState {
    pub fn label(self) -> &'static str {
        match self {
            SlaState::NoSla => "⚪ N/A",
            SlaState::WithinSla => "✅ Within SLA",
            SlaState::Breached => "🚨 Breached",
        }
    }
}

/// 🧾 One ticket's SLA, ready to print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlaVerdict {
    pub state: SlaState,
    pub display: String,
    /// ⚠️ Within SLA, but less than the warning threshold to go.
    pub warning: bool,
}

/// ⏰ Classify a breach instant against `now`.
///
/// - no breach instant: `NoSla`, `"N/A (No SLA)"`
/// - breach strictly before now: `Breached`, elapsed time in the largest sensible units
/// - less than `warning_threshold` left: `WithinSla` with a warning
/// - otherwise: `WithinSla`, days and hours left
pub fn classify(breach: Option<DateTime<Utc>>, now: DateTime<Utc>, warning_threshold: TimeDelta) -> SlaVerdict {
    let Some(breach) = breach else {
        return SlaVerdict {
            state: SlaState::NoSla,
            display: "N/A (No SLA)".to_string(),
            warning: false,
        };
    };

    let remaining = breach - now;
    if remaining < TimeDelta::zero() {
        let ago = (-remaining).num_seconds();
        let (days, hours, minutes) = (
            ago / SECS_PER_DAY,
            (ago % SECS_PER_DAY) / SECS_PER_HOUR,
            (ago % SECS_PER_HOUR) / SECS_PER_MINUTE,
        );
        let display = if days > 0 {
            format!("🚨 Breached {days}d {hours}h ago")
        } else if hours > 0 {
            format!("🚨 Breached {hours}h {minutes}m ago")
        } else {
            format!("🚨 Breached {minutes}m ago")
        };
        return SlaVerdict {
            state: SlaState::Breached,
            display,
            warning: false,
        };
    }

    let left = remaining.num_seconds();
    if remaining < warning_threshold {
        SlaVerdict {
            state: SlaState::WithinSla,
            display: format!(
                "⚠️ {}h {}m remaining",
                left / SECS_PER_HOUR,
                (left % SECS_PER_HOUR) / SECS_PER_MINUTE
            ),
            warning: true,
        }
    } else {
        SlaVerdict {
            state: SlaState::WithinSla,
            display: format!(
                "✅ {}d {}h remaining",
                left / SECS_PER_DAY,
                (left % SECS_PER_DAY) / SECS_PER_HOUR
            ),
            warning: false,
        }
    }
}

/// 📊 The metric tiles: how many of each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SlaSummary {
    pub total: usize,
    pub within_sla: usize,
    pub breached: usize,
    pub no_sla: usize,
    /// Subset of `within_sla`.
    pub warning: usize,
}

pub fn summarize<'a>(verdicts: impl IntoIterator<Item = &'a SlaVerdict>) -> SlaSummary {
    verdicts
        .into_iter()
        .fold(SlaSummary::default(), |mut summary, verdict| {
            summary.total += 1;
            match verdict.state {
                SlaState::NoSla => summary.no_sla += 1,
                SlaState::WithinSla => summary.within_sla += 1,
                SlaState::Breached => summary.breached += 1,
            }
            if verdict.warning {
                summary.warning += 1;
            }
            summary
        })
}

/// 🔘 Which tickets the report table shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SlaFilter {
    #[default]
    All,
    WithinSla,
    Breached,
}

impl SlaFilter {
    pub fn matches(self, state: SlaState) -> bool {
        match self {
            SlaFilter::All => true,
            SlaFilter::WithinSla => state == SlaState::WithinSla,
            SlaFilter::Breached => state == SlaState::Breached,
        }
    }
}

impl fmt::Display for SlaFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlaFilter::All => "All",
            SlaFilter::WithinSla => "✅ Within SLA",
            SlaFilter::Breached => "🚨 Breached",
        })
    }
}

impl FromStr for SlaFilter {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(SlaFilter::All),
            "within" | "within-sla" | "within_sla" => Ok(SlaFilter::WithinSla),
            "breached" => Ok(SlaFilter::Breached),
            other => Err(format!("unknown filter '{other}': expected all, within or breached")),
        }
    }
}
