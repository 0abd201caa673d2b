//! Domain <-> wire conversions between `finfocus-core` types and the
//! generated `finfocus-proto` messages. Kept separate from `client.rs` so
//! the wire shape can change without touching call sites.

use chrono::{DateTime, Utc};
use finfocus_core::{CostSample, ImpactMetric, MetricKind, ResourceDescriptor, SampleBucket};
use rust_decimal::Decimal;

pub fn descriptor_to_wire(d: &ResourceDescriptor) -> finfocus_proto::ResourceDescriptor {
    finfocus_proto::ResourceDescriptor {
        provider: d.provider.clone(),
        resource_type: d.resource_type.clone(),
        sku: d.sku.clone(),
        region: d.region.clone(),
        tags: d.tags.clone(),
        id: d.id.clone(),
        urn: d.urn.clone(),
        properties_json: serde_json::to_string(&d.properties).unwrap_or_default(),
    }
}

pub fn timestamp_to_chrono(ts: &prost_types::Timestamp) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(ts.seconds, ts.nanos.max(0) as u32).unwrap_or_default()
}

pub fn chrono_to_timestamp(ts: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: ts.timestamp(),
        nanos: ts.timestamp_subsec_nanos() as i32,
    }
}

pub fn decimal_from_f64(v: f64) -> Option<Decimal> {
    Decimal::from_f64_retain(v).map(|d| d.round_dp(6).normalize())
}

pub fn wire_impact_metric(m: &finfocus_proto::ImpactMetric) -> Option<ImpactMetric> {
    let kind = match m.kind.to_ascii_lowercase().as_str() {
        "carbon" => MetricKind::Carbon,
        "energy" => MetricKind::Energy,
        "water" => MetricKind::Water,
        _ => return None,
    };
    Some(ImpactMetric {
        kind,
        value: decimal_from_f64(m.value)?,
        unit: m.unit.clone(),
    })
}

pub fn wire_sample_to_domain(s: &finfocus_proto::ActualCostSample) -> Option<CostSample> {
    Some(CostSample {
        timestamp: s.timestamp.as_ref().map(timestamp_to_chrono)?,
        amount: decimal_from_f64(s.cost)?,
        currency: s.currency.clone(),
        bucket: None::<SampleBucket>,
    })
}
