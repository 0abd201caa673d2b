//! Impact-metric unit normalization (§4.7): every `ImpactMetric` is
//! converted to its base unit before summation — Carbon to grams CO2e,
//! Energy to Wh, Water to mL — then formatted back using the largest unit
//! that yields a value >= 1.

use finfocus_core::{ImpactMetric, MetricKind};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("unrecognized unit {unit:?} for {kind:?}")]
pub struct UnknownUnit {
    pub kind: MetricKind,
    pub unit: String,
}

fn multiplier(kind: MetricKind, unit: &str) -> Option<Decimal> {
    let value: i64 = match (kind, unit) {
        (MetricKind::Carbon, "t") => 1_000_000,
        (MetricKind::Carbon, "kg") => 1_000,
        (MetricKind::Carbon, "g") => 1,
        (MetricKind::Energy, "kWh") => 1_000,
        (MetricKind::Energy, "Wh") => 1,
        (MetricKind::Water, "L") => 1_000,
        (MetricKind::Water, "mL") => 1,
        _ => return None,
    };
    Some(Decimal::from(value))
}

/// Convert `metric` to its base unit, returning the magnitude alone.
pub fn normalize_to_base(metric: &ImpactMetric) -> Result<Decimal, UnknownUnit> {
    multiplier(metric.kind, &metric.unit)
        .map(|m| metric.value * m)
        .ok_or_else(|| UnknownUnit {
            kind: metric.kind,
            unit: metric.unit.clone(),
        })
}

fn ladder(kind: MetricKind) -> &'static [(i64, &'static str)] {
    match kind {
        MetricKind::Carbon => &[(1_000_000, "t"), (1_000, "kg"), (1, "g")],
        MetricKind::Energy => &[(1_000, "kWh"), (1, "Wh")],
        MetricKind::Water => &[(1_000, "L"), (1, "mL")],
    }
}

/// Format a base-unit value using the largest unit that yields a magnitude
/// >= 1, falling back to the smallest unit for sub-1 values.
pub fn format_base(kind: MetricKind, base_value: Decimal) -> (Decimal, &'static str) {
    for (threshold, unit) in ladder(kind) {
        let threshold = Decimal::from(*threshold);
        if base_value.abs() >= threshold {
            return (base_value / threshold, unit);
        }
    }
    let (threshold, unit) = ladder(kind).last().expect("ladder is non-empty");
    (base_value / Decimal::from(*threshold), unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(kind: MetricKind, value: i64, unit: &str) -> ImpactMetric {
        ImpactMetric {
            kind,
            value: Decimal::from(value),
            unit: unit.to_string(),
        }
    }

    #[test]
    fn carbon_tonnes_to_grams() {
        let m = metric(MetricKind::Carbon, 2, "t");
        assert_eq!(normalize_to_base(&m).unwrap(), Decimal::from(2_000_000));
    }

    #[test]
    fn format_picks_largest_unit_over_one() {
        let (value, unit) = format_base(MetricKind::Carbon, Decimal::from(2_500_000));
        assert_eq!(unit, "t");
        assert_eq!(value, Decimal::new(25, 1));
    }

    #[test]
    fn format_falls_back_to_smallest_unit_below_one() {
        let (value, unit) = format_base(MetricKind::Water, Decimal::new(5, 1));
        assert_eq!(unit, "mL");
        assert_eq!(value, Decimal::new(5, 1));
    }

    #[test]
    fn unknown_unit_errors() {
        let m = metric(MetricKind::Energy, 1, "BTU");
        assert!(normalize_to_base(&m).is_err());
    }
}
