//! A flattened view joining a `ResourceDescriptor` with its `CostResult`,
//! the unit the filter/group stages operate on. `Bundle.results` alone
//! carries no provider/region/tag information (§3 `CostResult`), so the
//! aggregator takes the original descriptor list alongside the bundle and
//! joins on `resource_id`.

use std::collections::HashMap;

use finfocus_core::{CostResult, ResourceDescriptor};

#[derive(Debug, Clone)]
pub struct Row {
    fields: HashMap<String, String>,
    pub result: CostResult,
}

impl Row {
    pub fn new(descriptor: &ResourceDescriptor, result: CostResult) -> Self {
        let mut fields = HashMap::new();
        fields.insert("type".to_string(), descriptor.resource_type.clone());
        fields.insert("provider".to_string(), descriptor.provider.clone());
        fields.insert("region".to_string(), descriptor.region.clone());
        fields.insert("adapter".to_string(), result.adapter.clone());
        fields.insert("currency".to_string(), result.currency.clone());
        for (k, v) in &descriptor.tags {
            fields.insert(format!("tag:{k}"), v.clone());
        }
        Self { fields, result }
    }

    pub fn field(&self, key: &str) -> Option<String> {
        self.fields.get(key).cloned()
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self {
            fields: pairs.into_iter().collect(),
            result: CostResult::none("test"),
        }
    }
}
