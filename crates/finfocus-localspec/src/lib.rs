//! Local pricing-spec loader (§6 "Local pricing spec layout"): the last
//! fallback the router tries before the `none` candidate. Out-of-scope per
//! §1 as an *external* collaborator, but the router needs a concrete,
//! narrow implementation of its interface to be exercisable end to end, so a
//! minimal, faithful one lives here.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use finfocus_core::{CostQuery, CostResult, CostSample, CoreError, CostSource, ResourceDescriptor};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Region key a spec entry can use to match any region not explicitly
/// listed — most services are regional, but some (global CDN edge, DNS)
/// price the same everywhere.
const GLOBAL_REGION: &str = "global";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SpecEntry {
    pub monthly: f64,
    pub currency: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct SpecFile {
    #[serde(default)]
    resources: HashMap<String, HashMap<String, HashMap<String, SpecEntry>>>,
}

/// `<provider>:<service>:<type>` -> region (or `"global"`) -> sku -> price.
type PriceTable = HashMap<String, HashMap<String, HashMap<String, SpecEntry>>>;

/// Loaded local pricing tables, merged across every `*.yaml` file under the
/// specs directory. The adapter tag this source stamps is always `"spec"`.
#[derive(Debug, Clone, Default)]
pub struct LocalSpecSource {
    table: PriceTable,
    source_path: String,
}

impl LocalSpecSource {
    /// Load every `*.yaml` file under `dir` (or the default
    /// `~/.finfocus/specs`), merging their `resources` maps. Later files
    /// overwrite earlier ones on key collision; a malformed file is skipped
    /// with a warning rather than aborting the load.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let dir = match dir.map(Path::to_path_buf).or_else(default_specs_dir) {
            Some(d) => d,
            None => return Ok(Self::default()),
        };
        if !dir.exists() {
            return Ok(Self {
                table: HashMap::new(),
                source_path: dir.display().to_string(),
            });
        }

        let mut table: PriceTable = HashMap::new();
        let mut entries: Vec<PathBuf> = fs::read_dir(&dir)
            .with_context(|| format!("reading specs directory: {}", dir.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "yaml" || e == "yml").unwrap_or(false))
            .collect();
        entries.sort();

        for path in entries {
            match fs::read_to_string(&path) {
                Ok(data) => match serde_yaml::from_str::<SpecFile>(&data) {
                    Ok(file) => {
                        debug!(path = %path.display(), resources = file.resources.len(), "loaded local spec file");
                        for (resource_type, regions) in file.resources {
                            table.entry(resource_type).or_default().extend(regions);
                        }
                    }
                    Err(err) => warn!(path = %path.display(), error = %err, "skipping malformed spec file"),
                },
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable spec file"),
            }
        }

        Ok(Self {
            table,
            source_path: dir.display().to_string(),
        })
    }

    fn lookup(&self, descriptor: &ResourceDescriptor) -> Option<&SpecEntry> {
        let provider_prefix = descriptor.resource_type.split(':').next()?;
        if provider_prefix != descriptor.provider {
            return None;
        }
        let regions = self.table.get(&descriptor.resource_type)?;
        regions
            .get(&descriptor.region)
            .or_else(|| regions.get(GLOBAL_REGION))?
            .get(&descriptor.sku)
    }

    pub fn path(&self) -> &str {
        &self.source_path
    }
}

fn default_specs_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .map(PathBuf::from)
        .ok()
        .map(|home| home.join(".finfocus").join("specs"))
}

#[async_trait]
impl CostSource for LocalSpecSource {
    fn name(&self) -> &str {
        "spec"
    }

    fn matches(&self, descriptor: &ResourceDescriptor) -> bool {
        self.lookup(descriptor).is_some()
    }

    async fn projected_cost(
        &self,
        query: &CostQuery,
        _cancel: &CancellationToken,
    ) -> Result<CostResult, CoreError> {
        let entry = self
            .lookup(&query.descriptor)
            .ok_or_else(|| CoreError::NoData(format!("no local spec entry for {}", query.descriptor.resource_type)))?;
        let monthly = Decimal::from_f64_retain(entry.monthly)
            .ok_or_else(|| CoreError::Internal("non-finite monthly price in local spec".to_string()))?;
        // Full precision, not rounded: rounding to 6dp here would push
        // |monthly - hourly*730| past the 1e-6 relative-error invariant
        // (§3, §8) for some monthly values.
        let hourly = monthly / Decimal::from(730);
        Ok(CostResult {
            resource_id: query.descriptor.id.clone(),
            adapter: self.name().to_string(),
            currency: entry.currency.clone(),
            hourly: Some(hourly),
            monthly: Some(monthly),
            unit_price: None,
            billing_detail: self.source_path.clone(),
            notes: entry.notes.clone(),
            impact_metrics: HashMap::new(),
            samples: None,
        })
    }

    async fn actual_cost(
        &self,
        _query: &CostQuery,
        _cancel: &CancellationToken,
    ) -> Result<Vec<CostSample>, CoreError> {
        // The local spec only knows static monthly rates; it has no actual
        // billing history to report.
        Err(CoreError::NotSupported(
            "local spec does not provide actual-cost time series".to_string(),
        ))
    }
}
