//! Grouping (§4.7): recognized dimensions `provider`, `type`, `region`,
//! `adapter`, `tag:<k>` group by a `Row` field; `daily`/`monthly` group the
//! actual-cost sample series instead, bucketing by UTC calendar day or
//! first-of-month. Cost totals are summed per group in a single currency;
//! a group mixing currencies is surfaced with its total suppressed and a
//! warning, never silently summed across currencies.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use finfocus_core::MetricKind;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use crate::normalize::{format_base, normalize_to_base};
use crate::row::Row;

#[derive(Debug, Error, PartialEq)]
pub enum GroupError {
    #[error("unrecognized group-by dimension {0:?}")]
    UnknownDimension(String),
}

/// The label identifying one group: a field value (`"aws"`, `"us-east-1"`)
/// or a bucket key (`"2025-01-01"`, `"2025-01-01"` truncated to month start).
pub type GroupKey = String;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupSummary {
    pub currency: Option<String>,
    pub total: Option<Decimal>,
    pub warning: Option<String>,
    pub impact_totals: Vec<(MetricKind, Decimal, &'static str)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupResult {
    pub key: GroupKey,
    pub row_count: usize,
    pub summary: GroupSummary,
}

struct Accumulator {
    row_count: usize,
    currencies: BTreeMap<String, Decimal>,
    impact_base: BTreeMap<MetricKind, Decimal>,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            row_count: 0,
            currencies: BTreeMap::new(),
            impact_base: BTreeMap::new(),
        }
    }

    fn add_cost(&mut self, currency: &str, amount: Decimal) {
        *self.currencies.entry(currency.to_string()).or_insert(Decimal::ZERO) += amount;
    }

    fn add_impact(&mut self, kind: MetricKind, base_value: Decimal) {
        *self.impact_base.entry(kind).or_insert(Decimal::ZERO) += base_value;
    }

    fn finish(self) -> GroupSummary {
        let warning = if self.currencies.len() > 1 {
            Some(format!(
                "mixed currencies in group ({}); total suppressed",
                self.currencies.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        } else {
            None
        };
        let (currency, total) = if self.currencies.len() == 1 {
            let (c, t) = self.currencies.into_iter().next().expect("len checked above");
            (Some(c), Some(t))
        } else {
            (None, None)
        };
        let impact_totals = self
            .impact_base
            .into_iter()
            .map(|(kind, base)| {
                let (value, unit) = format_base(kind, base);
                (kind, value, unit)
            })
            .collect();
        GroupSummary {
            currency,
            total,
            warning,
            impact_totals,
        }
    }
}

fn day_bucket(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.date_naive().format("%Y-%m-%d").to_string()
}

fn month_bucket(ts: chrono::DateTime<chrono::Utc>) -> String {
    NaiveDate::from_ymd_opt(ts.year(), ts.month(), 1)
        .expect("valid year/month yields a valid first-of-month date")
        .format("%Y-%m-01")
        .to_string()
}

/// Group `rows` by `dimension` and sum cost (and impact-metric) fields per
/// group. Dimensions `daily`/`monthly` consume each row's actual-cost
/// samples instead of its aggregate monthly figure. Group iteration order
/// is alphabetical by key (§5 "stable... alphabetical by group key").
pub fn aggregate(rows: &[Row], dimension: &str) -> Result<Vec<GroupResult>, GroupError> {
    if dimension == "daily" || dimension == "monthly" {
        return Ok(aggregate_samples(rows, dimension, dimension == "daily"));
    }

    let field_key = match dimension {
        "provider" | "type" | "region" | "adapter" => dimension.to_string(),
        other if other.starts_with("tag:") => other.to_string(),
        other => return Err(GroupError::UnknownDimension(other.to_string())),
    };

    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();
    for row in rows {
        let key = row.field(&field_key).unwrap_or_default();
        let acc = groups.entry(key).or_insert_with(Accumulator::new);
        acc.row_count += 1;
        if let Some(amount) = row.result.monthly {
            if !row.result.currency.is_empty() {
                acc.add_cost(&row.result.currency, amount);
            }
        }
        for metric in row.result.impact_metrics.values() {
            if let Ok(base) = normalize_to_base(metric) {
                acc.add_impact(metric.kind, base);
            }
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, acc)| {
            let row_count = acc.row_count;
            let summary = acc.finish();
            warn_on_mixed_currency(dimension, &key, &summary);
            GroupResult {
                key,
                row_count,
                summary,
            }
        })
        .collect())
}

/// §4.7: mixing currencies within a group suppresses its total; log it once
/// per group at WARN so the condition is visible without inspecting output.
fn warn_on_mixed_currency(dimension: &str, key: &str, summary: &GroupSummary) {
    if let Some(reason) = &summary.warning {
        warn!(dimension = %dimension, group = %key, reason = %reason, "group total suppressed");
    }
}

fn aggregate_samples(rows: &[Row], dimension: &str, daily: bool) -> Vec<GroupResult> {
    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();
    for row in rows {
        let Some(samples) = row.result.samples.as_ref() else {
            continue;
        };
        for sample in samples {
            let key = if daily {
                day_bucket(sample.timestamp)
            } else {
                month_bucket(sample.timestamp)
            };
            let acc = groups.entry(key).or_insert_with(Accumulator::new);
            acc.row_count += 1;
            acc.add_cost(&sample.currency, sample.amount);
        }
    }
    groups
        .into_iter()
        .map(|(key, acc)| {
            let row_count = acc.row_count;
            let summary = acc.finish();
            warn_on_mixed_currency(dimension, &key, &summary);
            GroupResult {
                key,
                row_count,
                summary,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use finfocus_core::{CostResult, CostSample, ResourceDescriptor};

    fn row_with_monthly(provider: &str, currency: &str, monthly: i64) -> Row {
        let descriptor = ResourceDescriptor {
            provider: provider.to_string(),
            resource_type: "aws:ec2:Instance".to_string(),
            region: "us-east-1".to_string(),
            id: "r".to_string(),
            ..Default::default()
        };
        let mut result = CostResult::none("r");
        result.adapter = "spec".to_string();
        result.currency = currency.to_string();
        result.monthly = Some(Decimal::from(monthly));
        Row::new(&descriptor, result)
    }

    #[test]
    fn groups_by_provider_and_sums_monthly() {
        let rows = vec![
            row_with_monthly("aws", "USD", 10),
            row_with_monthly("aws", "USD", 20),
            row_with_monthly("gcp", "USD", 5),
        ];
        let groups = aggregate(&rows, "provider").unwrap();
        let aws = groups.iter().find(|g| g.key == "aws").unwrap();
        assert_eq!(aws.row_count, 2);
        assert_eq!(aws.summary.total, Some(Decimal::from(30)));
        let gcp = groups.iter().find(|g| g.key == "gcp").unwrap();
        assert_eq!(gcp.summary.total, Some(Decimal::from(5)));
    }

    #[test]
    fn mixed_currency_suppresses_total() {
        let rows = vec![row_with_monthly("aws", "USD", 10), row_with_monthly("aws", "EUR", 8)];
        let groups = aggregate(&rows, "provider").unwrap();
        let aws = &groups[0];
        assert_eq!(aws.row_count, 2);
        assert!(aws.summary.total.is_none());
        assert!(aws.summary.warning.is_some());
    }

    #[test]
    fn unknown_dimension_errors() {
        assert_eq!(
            aggregate(&[], "bogus"),
            Err(GroupError::UnknownDimension("bogus".to_string()))
        );
    }

    #[test]
    fn daily_buckets_actual_cost_samples() {
        let descriptor = ResourceDescriptor {
            provider: "aws".to_string(),
            id: "r".to_string(),
            ..Default::default()
        };
        let mut result = CostResult::none("r");
        result.adapter = "aws-plugin".to_string();
        result.samples = Some(vec![
            CostSample {
                timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 4, 0, 0).unwrap(),
                amount: Decimal::from(1),
                currency: "USD".to_string(),
                bucket: None,
            },
            CostSample {
                timestamp: Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap(),
                amount: Decimal::from(2),
                currency: "USD".to_string(),
                bucket: None,
            },
            CostSample {
                timestamp: Utc.with_ymd_and_hms(2025, 1, 3, 23, 0, 0).unwrap(),
                amount: Decimal::from(3),
                currency: "USD".to_string(),
                bucket: None,
            },
        ]);
        let row = Row::new(&descriptor, result);
        let groups = aggregate(&[row], "daily").unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].key, "2025-01-01");
        assert_eq!(groups[0].summary.total, Some(Decimal::from(1)));
        assert_eq!(groups[2].key, "2025-01-03");
        assert_eq!(groups[2].summary.total, Some(Decimal::from(3)));
    }

    #[test]
    fn monthly_bucket_truncates_to_first_of_month() {
        let descriptor = ResourceDescriptor {
            id: "r".to_string(),
            ..Default::default()
        };
        let mut result = CostResult::none("r");
        result.samples = Some(vec![
            CostSample {
                timestamp: Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap(),
                amount: Decimal::from(10),
                currency: "USD".to_string(),
                bucket: None,
            },
            CostSample {
                timestamp: Utc.with_ymd_and_hms(2025, 1, 28, 0, 0, 0).unwrap(),
                amount: Decimal::from(5),
                currency: "USD".to_string(),
                bucket: None,
            },
        ]);
        let row = Row::new(&descriptor, result);
        let groups = aggregate(&[row], "monthly").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "2025-01-01");
        assert_eq!(groups[0].summary.total, Some(Decimal::from(15)));
    }
}
