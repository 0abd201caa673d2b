use finfocus_aggregator::GroupResult;
use finfocus_core::Bundle;
use serde_json::{json, Value};

/// Render the engine's `Bundle`, plus any requested aggregator groupings, as
/// a single JSON document to stdout. `groups` pairs each `--group-by`
/// dimension with its grouped rows, in the order the dimensions were
/// requested.
pub fn render(bundle: &Bundle, groups: &[(String, Vec<GroupResult>)]) -> Result<(), anyhow::Error> {
    let doc = build_document(bundle, groups);
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn build_document(bundle: &Bundle, groups: &[(String, Vec<GroupResult>)]) -> Value {
    let group_doc: Value = groups
        .iter()
        .map(|(dimension, results)| {
            let rows: Vec<Value> = results
                .iter()
                .map(|g| {
                    json!({
                        "key": g.key,
                        "row_count": g.row_count,
                        "currency": g.summary.currency,
                        "total": g.summary.total.map(|d| d.to_string()),
                        "warning": g.summary.warning,
                        "impact_totals": g.summary.impact_totals.iter().map(|(kind, value, unit)| {
                            json!({"kind": format!("{kind:?}"), "value": value.to_string(), "unit": unit})
                        }).collect::<Vec<_>>(),
                    })
                })
                .collect();
            (dimension.clone(), Value::Array(rows))
        })
        .collect::<serde_json::Map<_, _>>()
        .into();

    json!({
        "bundle": bundle,
        "groups": group_doc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use finfocus_core::CostResult;

    #[test]
    fn renders_bundle_without_groups() {
        let bundle = Bundle {
            results: vec![CostResult::none("r1")],
            errors: vec![],
            trace_id: "t1".to_string(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
        };
        let doc = build_document(&bundle, &[]);
        assert_eq!(doc["bundle"]["trace_id"], "t1");
        assert!(doc["groups"].as_object().unwrap().is_empty());
    }
}
