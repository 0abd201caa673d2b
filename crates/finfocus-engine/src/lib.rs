//! Cost Engine (C6): drives the Source Router per resource, collects
//! `CostResult`s, and tracks partial errors (SPEC_FULL §4.6).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use finfocus_core::{
    Bundle, CostQuery, CostResult, CostSource, ErrorDetail, QueryKind, ResourceDescriptor,
};
use finfocus_localspec::LocalSpecSource;
use finfocus_router::{candidates_for, validate, Candidate};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Everything the engine needs to run a batch: the plugin candidates
/// (already filtered to `Ready`/`Legacy` and ordered by the host), the
/// local spec fallback, and the trace id every query and log line carries.
pub struct CostEngine {
    plugins: Vec<Arc<dyn CostSource>>,
    local_spec: Option<LocalSpecSource>,
}

impl CostEngine {
    pub fn new(plugins: Vec<Arc<dyn CostSource>>, local_spec: Option<LocalSpecSource>) -> Self {
        Self {
            plugins,
            local_spec,
        }
    }

    /// `NumCPU`-bounded worker pool sizing, matching the teacher's
    /// `available_parallelism()` convention used elsewhere in the stack.
    fn worker_count() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub async fn run_projected(
        &self,
        descriptors: Vec<ResourceDescriptor>,
        trace_id: &str,
        cancel: &CancellationToken,
    ) -> Bundle {
        self.run(descriptors, trace_id, cancel, |descriptor, trace_id| {
            CostQuery::new_projected(descriptor, trace_id)
        })
        .await
    }

    pub async fn run_actual(
        &self,
        descriptors: Vec<ResourceDescriptor>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        trace_id: &str,
        cancel: &CancellationToken,
    ) -> Bundle {
        self.run(descriptors, trace_id, cancel, move |descriptor, trace_id| {
            CostQuery::new_actual(descriptor, start, end, trace_id)
        })
        .await
    }

    async fn run(
        &self,
        descriptors: Vec<ResourceDescriptor>,
        trace_id: &str,
        cancel: &CancellationToken,
        build_query: impl Fn(ResourceDescriptor, &str) -> CostQuery + Send + Sync + 'static,
    ) -> Bundle {
        let started_at = Utc::now();
        let total = descriptors.len();
        let semaphore = Arc::new(Semaphore::new(Self::worker_count()));
        let errors = Arc::new(Mutex::new(Vec::<ErrorDetail>::new()));
        let build_query = Arc::new(build_query);

        let mut tasks = Vec::with_capacity(total);
        for (index, descriptor) in descriptors.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let errors = errors.clone();
            let cancel = cancel.clone();
            let plugins = self.plugins.clone();
            let local_spec = self.local_spec.clone();
            let trace_id = trace_id.to_string();
            let build_query = build_query.clone();

            tasks.push(tokio::spawn(async move {
                if cancel.is_cancelled() {
                    return (index, None);
                }
                let _permit = match semaphore.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return (index, None),
                };
                let resource_id = descriptor.id.clone();
                let query = build_query(descriptor, &trace_id);
                let result = run_one(&query, &plugins, local_spec.as_ref(), &cancel, &errors).await;
                (index, Some(result.unwrap_or_else(|| CostResult::none(resource_id))))
            }));
        }

        let mut results: Vec<Option<CostResult>> = (0..total).map(|_| None).collect();
        for task in tasks {
            if let Ok((index, result)) = task.await {
                results[index] = result;
            }
        }

        let completed_at = Utc::now();
        Bundle {
            results: results.into_iter().flatten().collect(),
            errors: Arc::try_unwrap(errors)
                .map(|m| m.into_inner())
                .unwrap_or_default(),
            trace_id: trace_id.to_string(),
            started_at,
            completed_at,
        }
    }
}

/// Per-resource algorithm (§4.6): validate once, then walk the candidate
/// chain until one succeeds or the chain exhausts.
async fn run_one(
    query: &CostQuery,
    plugins: &[Arc<dyn CostSource>],
    local_spec: Option<&LocalSpecSource>,
    cancel: &CancellationToken,
    errors: &Mutex<Vec<ErrorDetail>>,
) -> Option<CostResult> {
    if let Err(failure) = validate(query) {
        warn!(
            resource_type = %query.descriptor.resource_type,
            resource_id = %query.descriptor.id,
            trace_id = %query.trace_id,
            reason = %failure,
            "validation failed; no candidate tried"
        );
        return Some(CostResult::validation_failure(
            query.descriptor.id.clone(),
            failure.reason(),
        ));
    }

    for candidate in candidates_for(&query.descriptor, plugins, local_spec) {
        let source = match candidate {
            Candidate::Source(source) => source,
            Candidate::None => return None,
        };

        let outcome = match query.kind {
            QueryKind::Projected => source.projected_cost(query, cancel).await,
            QueryKind::Actual { .. } => source
                .actual_cost(query, cancel)
                .await
                .map(|samples| CostResult {
                    resource_id: query.descriptor.id.clone(),
                    adapter: source.name().to_string(),
                    currency: samples
                        .first()
                        .map(|s| s.currency.clone())
                        .unwrap_or_default(),
                    hourly: None,
                    monthly: None,
                    unit_price: None,
                    billing_detail: String::new(),
                    notes: String::new(),
                    impact_metrics: Default::default(),
                    samples: Some(samples),
                }),
        };

        match outcome {
            Ok(result) => return Some(result),
            Err(err) => {
                let kind = err.kind();
                warn!(
                    resource_id = %query.descriptor.id,
                    trace_id = %query.trace_id,
                    source = %source.name(),
                    error = %err,
                    "candidate failed; falling back"
                );
                if !matches!(
                    kind,
                    finfocus_core::ErrorKind::NotSupported
                        | finfocus_core::ErrorKind::NoData
                        | finfocus_core::ErrorKind::Unimplemented
                ) {
                    errors
                        .lock()
                        .await
                        .push(err.into_detail(query.descriptor.id.clone(), source.name().to_string()));
                }
            }
        }
    }

    // `candidates_for` always terminates with `Candidate::None`, which
    // returns above; this is unreachable in practice but keeps the function
    // total.
    None
}
