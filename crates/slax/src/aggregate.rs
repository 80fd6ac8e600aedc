//! 📊 The Daily Aggregator: group, count, exclude, rank, truncate.
//!
//! 🧠 Knowledge graph:
//! - "Today" is UTC calendar-date equality, nothing fancier. A ticket created at 23:59 UTC
//!   belongs to that date and no other, whatever the wall clock in Bengaluru says.
//! - Exclusion happens *before* ranking, so an excluded heavyweight never pushes a
//!   legitimate label off the end of a top-N list.
//! - Ties are broken by label, alphabetically, so the same input always prints the same list.
//! - Counting goes through a `BTreeMap`, which keeps iteration order stable for free. 🦆

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::common::{DailyBucket, IssueRecord, LabelCount};

/// 🧭 Which label of a record we group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dimension {
    RequestType,
    Assignee,
    Status,
}

impl Dimension {
    pub fn of(self, record: &IssueRecord) -> &str {
        match self {
            Dimension::RequestType => &record.request_type,
            Dimension::Assignee => &record.assignee,
            Dimension::Status => &record.status,
        }
    }
}

/// 🗓️ Which instant of a record decides its day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WindowField {
    Created,
    Resolved,
}

impl WindowField {
    pub fn date_of(self, record: &IssueRecord) -> Option<NaiveDate> {
        match self {
            WindowField::Created => Some(record.created_on()),
            WindowField::Resolved => record.resolved_on(),
        }
    }
}

/// 📅 Records whose `field` falls on `day` (UTC).
pub fn on_day<'a>(
    records: impl IntoIterator<Item = &'a IssueRecord>,
    field: WindowField,
    day: NaiveDate,
) -> impl Iterator<Item = &'a IssueRecord> {
    records
        .into_iter()
        .filter(move |record| field.date_of(record) == Some(day))
}

/// 🧮 Count labels. Output is keyed and ordered by label.
fn count<'a>(labels: impl IntoIterator<Item = &'a str>) -> BTreeMap<&'a str, usize> {
    labels.into_iter().fold(BTreeMap::new(), |mut counts, label| {
        *counts.entry(label).or_insert(0) += 1;
        counts
    })
}

/// 🥇 Drop the excluded, sort by count (descending) then label, keep at most `n`.
fn rank(counts: BTreeMap<&str, usize>, n: usize, excluded: &[String]) -> Vec<LabelCount> {
    let mut ranked: Vec<LabelCount> = counts
        .into_iter()
        .filter(|(label, _)| !excluded.iter().any(|skip| skip == label))
        .map(|(label, count)| LabelCount::new(label, count))
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    ranked.truncate(n);
    ranked
}

/// 🏆 The top `n` values of `dimension`, excluded values removed before ranking.
///
/// Fewer than `n` distinct labels yields a shorter list, not padding.
pub fn top_n<'a>(
    records: impl IntoIterator<Item = &'a IssueRecord>,
    dimension: Dimension,
    n: usize,
    excluded: &[String],
) -> Vec<LabelCount> {
    rank(
        count(records.into_iter().map(|record| dimension.of(record))),
        n,
        excluded,
    )
}

/// 📈 Every value of `dimension`, ranked. The overview charts, minus the charts.
pub fn breakdown<'a>(records: impl IntoIterator<Item = &'a IssueRecord>, dimension: Dimension) -> Vec<LabelCount> {
    top_n(records, dimension, usize::MAX, &[])
}

/// 🗓️ One bucket per (day, label) pair, ordered by day then label.
///
/// Records without a date for `field` (unresolved tickets, when bucketing by resolution)
/// are left out.
pub fn daily_buckets<'a>(
    records: impl IntoIterator<Item = &'a IssueRecord>,
    field: WindowField,
    dimension: Dimension,
) -> Vec<DailyBucket> {
    let mut buckets: BTreeMap<(NaiveDate, &'a str), usize> = BTreeMap::new();
    for record in records {
        if let Some(date) = field.date_of(record) {
            *buckets.entry((date, dimension.of(record))).or_insert(0) += 1;
        }
    }
    buckets
        .into_iter()
        .map(|((date, label), count)| DailyBucket {
            date,
            label: label.to_string(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn record(key: &str, request_type: &str, assignee: &str, created: DateTime<Utc>) -> IssueRecord {
        IssueRecord {
            key: key.to_string(),
            status: "Open".to_string(),
            assignee: assignee.to_string(),
            created,
            resolved: None,
            request_type: request_type.to_string(),
            sla_breach: None,
            campaign_start: None,
        }
    }

    fn march_first(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, minute, 0).unwrap()
    }

    fn of_types(counts: &[(&str, usize)]) -> Vec<IssueRecord> {
        counts
            .iter()
            .flat_map(|(label, n)| (0..*n).map(move |i| record(&format!("{label}-{i}"), label, "Ada", march_first(9, 0))))
            .collect()
    }

    #[test]
    fn the_one_where_exclusion_happens_before_the_podium_is_set() {
        let records = of_types(&[("A", 10), ("B", 8), ("C", 6), ("D", 4), ("E", 2)]);
        let top = top_n(&records, Dimension::RequestType, 3, &["B".to_string()]);
        assert_eq!(
            top,
            vec![LabelCount::new("A", 10), LabelCount::new("C", 6), LabelCount::new("D", 4)]
        );
    }

    #[test]
    fn the_one_where_ties_are_settled_alphabetically() {
        let records = of_types(&[("Zeta", 2), ("Alpha", 2), ("Mu", 3)]);
        let top = top_n(&records, Dimension::RequestType, 5, &[]);
        assert_eq!(
            top,
            vec![LabelCount::new("Mu", 3), LabelCount::new("Alpha", 2), LabelCount::new("Zeta", 2)]
        );
    }

    #[test]
    fn the_one_where_a_short_list_is_not_padded() {
        let records = of_types(&[("Only", 1)]);
        assert_eq!(top_n(&records, Dimension::RequestType, 5, &[]).len(), 1);
        assert!(top_n(&Vec::<IssueRecord>::new(), Dimension::Assignee, 3, &[]).is_empty());
    }

    #[test]
    fn the_one_where_one_minute_to_midnight_is_still_today() {
        let late = record("TKTS-1", "X", "Ada", march_first(23, 59));
        let records = [late];
        let march_1 = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let march_2 = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        assert_eq!(on_day(&records, WindowField::Created, march_1).count(), 1);
        assert_eq!(on_day(&records, WindowField::Created, march_2).count(), 0);
    }

    #[test]
    fn the_one_where_unresolved_tickets_never_close_today() {
        let mut closed = record("TKTS-1", "X", "Ada", march_first(8, 0));
        closed.resolved = Some(march_first(17, 0));
        let open = record("TKTS-2", "X", "Ada", march_first(8, 0));
        let records = [closed, open];
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let keys: Vec<&str> = on_day(&records, WindowField::Resolved, today)
            .map(|r| r.key.as_str())
            .collect();
        assert_eq!(keys, vec!["TKTS-1"]);
    }

    #[test]
    fn the_one_where_buckets_line_up_by_day_then_label() {
        let day_two = Utc.with_ymd_and_hms(2025, 3, 2, 10, 0, 0).unwrap();
        let records = [
            record("1", "Video", "Ada", day_two),
            record("2", "Display", "Ada", march_first(9, 0)),
            record("3", "Video", "Bob", march_first(10, 0)),
            record("4", "Display", "Cy", march_first(11, 0)),
        ];
        let buckets = daily_buckets(&records, WindowField::Created, Dimension::RequestType);
        let flat: Vec<(String, &str, usize)> = buckets
            .iter()
            .map(|b| (b.date.to_string(), b.label.as_str(), b.count))
            .collect();
        assert_eq!(
            flat,
            vec![
                ("2025-03-01".to_string(), "Display", 2),
                ("2025-03-01".to_string(), "Video", 1),
                ("2025-03-02".to_string(), "Video", 1),
            ]
        );
    }

    #[test]
    fn the_one_where_the_overview_keeps_everyone() {
        let records = [
            record("1", "X", "Ada", march_first(9, 0)),
            record("2", "X", "Bob", march_first(9, 0)),
            record("3", "X", "Bob", march_first(9, 0)),
        ];
        assert_eq!(
            breakdown(&records, Dimension::Assignee),
            vec![LabelCount::new("Bob", 2), LabelCount::new("Ada", 1)]
        );
        assert_eq!(breakdown(&records, Dimension::Status), vec![LabelCount::new("Open", 3)]);
    }
}
