use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Input to the core. Immutable within a run.
///
/// Invariant: `provider`, `resource_type` and `id` must be non-empty for the
/// descriptor to be costed; missing fields are allowed and surfaced as
/// validation errors rather than rejected up front.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceDescriptor {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub properties: HashMap<String, JsonValue>,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub urn: String,
}

/// Ordered candidate the router yields for a descriptor, in preference
/// order: plugins first, then the local spec, then `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceCandidate {
    Plugin {
        name: String,
        version: String,
        spec_version: Option<String>,
    },
    LocalSpec {
        path: String,
    },
    None,
}

impl SourceCandidate {
    pub fn adapter_tag(&self) -> String {
        match self {
            SourceCandidate::Plugin { name, .. } => name.clone(),
            SourceCandidate::LocalSpec { .. } => "spec".to_string(),
            SourceCandidate::None => "none".to_string(),
        }
    }
}

/// What kind of cost query this is: a forward-looking estimate, or a
/// lookback over an actual billing window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum QueryKind {
    Projected,
    Actual {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// A single outbound cost query, carrying the trace id that must propagate
/// to every log entry and gRPC call this query triggers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostQuery {
    pub descriptor: ResourceDescriptor,
    pub kind: QueryKind,
    /// Hint the plugin may apply; range `[0, 1]`.
    pub utilization: Option<f64>,
    pub trace_id: String,
}

impl CostQuery {
    pub fn new_projected(descriptor: ResourceDescriptor, trace_id: impl Into<String>) -> Self {
        Self {
            descriptor,
            kind: QueryKind::Projected,
            utilization: None,
            trace_id: trace_id.into(),
        }
    }

    pub fn new_actual(
        descriptor: ResourceDescriptor,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            descriptor,
            kind: QueryKind::Actual { start, end },
            utilization: None,
            trace_id: trace_id.into(),
        }
    }

    pub fn with_utilization(mut self, utilization: Option<f64>) -> Self {
        self.utilization = utilization;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    Carbon,
    Energy,
    Water,
}

/// A single impact metric, still in whatever unit the adapter reported it
/// in. Normalization to base units happens in the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpactMetric {
    pub kind: MetricKind,
    pub value: Decimal,
    pub unit: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SampleBucket {
    Daily,
    Monthly,
}

/// One point of an actual-cost time series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostSample {
    pub timestamp: DateTime<Utc>,
    pub amount: Decimal,
    pub currency: String,
    pub bucket: Option<SampleBucket>,
}

/// Outcome of costing a single resource descriptor against one candidate.
///
/// Invariant: `monthly ≈ hourly × 730` when both are present; `currency` is
/// required whenever any cost field is set; `adapter` is `"none"` only when
/// no cost field is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostResult {
    pub resource_id: String,
    pub adapter: String,
    pub currency: String,
    pub hourly: Option<Decimal>,
    pub monthly: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub billing_detail: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub impact_metrics: HashMap<MetricKind, ImpactMetric>,
    pub samples: Option<Vec<CostSample>>,
}

impl CostResult {
    /// The `adapter="none"` row with all cost fields unset, yielded when the
    /// candidate chain is exhausted without a priced result.
    pub fn none(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            adapter: "none".to_string(),
            currency: String::new(),
            hourly: None,
            monthly: None,
            unit_price: None,
            billing_detail: String::new(),
            notes: String::new(),
            impact_metrics: HashMap::new(),
            samples: None,
        }
    }

    /// A `VALIDATION:`-prefixed placeholder, per §4.2: no candidate was
    /// tried because the request was malformed.
    pub fn validation_failure(resource_id: impl Into<String>, reason: &str) -> Self {
        let mut r = Self::none(resource_id);
        r.notes = format!("VALIDATION: {reason}");
        r
    }

    /// `true` if this row carries no priced fields (either a genuine `none`
    /// fallback or a validation placeholder).
    pub fn is_unpriced(&self) -> bool {
        self.hourly.is_none() && self.monthly.is_none() && self.unit_price.is_none()
    }
}

/// Engine output for a full run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bundle {
    pub results: Vec<CostResult>,
    pub errors: Vec<crate::error::ErrorDetail>,
    pub trace_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl Bundle {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// `true` iff at least one result fell back to `none` or an error was
    /// recorded — the "partial success" condition for exit code 1.
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty() || self.results.iter().any(|r| r.adapter == "none")
    }
}
