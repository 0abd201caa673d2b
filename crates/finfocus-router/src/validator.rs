//! Request Validator (C2): deterministic pre-flight check run immediately
//! before any outbound call, in-process (§4.2).

use finfocus_core::{CostQuery, QueryKind};

/// Enumerated reasons so the `"VALIDATION: "`-prefixed note is deterministic
/// and testable per-reason (SPEC_FULL §4.2 "Supplement") rather than a
/// free-form string assembled ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    MissingProvider,
    MissingSku,
    MissingRegion,
    MissingResourceId,
    InvalidTimeRange,
}

impl ValidationFailure {
    pub fn reason(self) -> &'static str {
        match self {
            ValidationFailure::MissingProvider => "missing provider",
            ValidationFailure::MissingSku => "missing sku",
            ValidationFailure::MissingRegion => "missing region",
            ValidationFailure::MissingResourceId => "missing resource_id",
            ValidationFailure::InvalidTimeRange => "end must be after start",
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Validate a query before it reaches any candidate. Projected queries
/// require `provider`, `sku`, `region`; actual queries additionally require
/// `resource_id` and `end > start`.
pub fn validate(query: &CostQuery) -> Result<(), ValidationFailure> {
    let d = &query.descriptor;
    if d.provider.is_empty() {
        return Err(ValidationFailure::MissingProvider);
    }
    if d.sku.is_empty() {
        return Err(ValidationFailure::MissingSku);
    }
    if d.region.is_empty() {
        return Err(ValidationFailure::MissingRegion);
    }
    if let QueryKind::Actual { start, end } = query.kind {
        if d.id.is_empty() {
            return Err(ValidationFailure::MissingResourceId);
        }
        if end <= start {
            return Err(ValidationFailure::InvalidTimeRange);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use finfocus_core::ResourceDescriptor;

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor {
            provider: "aws".to_string(),
            resource_type: "aws:ec2:Instance".to_string(),
            sku: "t3.micro".to_string(),
            region: "us-east-1".to_string(),
            id: "r1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_projected_query_passes() {
        let q = CostQuery::new_projected(descriptor(), "trace-1");
        assert!(validate(&q).is_ok());
    }

    #[test]
    fn empty_sku_fails_projected() {
        let mut d = descriptor();
        d.sku = String::new();
        let q = CostQuery::new_projected(d, "trace-1");
        assert_eq!(validate(&q), Err(ValidationFailure::MissingSku));
    }

    #[test]
    fn actual_query_requires_resource_id_and_valid_range() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let mut d = descriptor();
        d.id = String::new();
        let q = CostQuery::new_actual(d.clone(), start, end, "trace-1");
        assert_eq!(validate(&q), Err(ValidationFailure::MissingResourceId));

        d.id = "r1".to_string();
        let q = CostQuery::new_actual(d, end, start, "trace-1");
        assert_eq!(validate(&q), Err(ValidationFailure::InvalidTimeRange));
    }
}
