//! Plugin Client (C3): one live gRPC session to a plugin subprocess.

use std::time::Duration;

use async_trait::async_trait;
use finfocus_core::error::CoreError;
use finfocus_core::source::CostSource;
use finfocus_core::{CostQuery, CostResult, CostSample, QueryKind, ResourceDescriptor, ResourceMatcher};
use finfocus_proto::cost_source_client::CostSourceClient;
use finfocus_proto::{
    GetActualCostRequest, GetPluginInfoRequest, GetProjectedCostRequest,
    GetRecommendationsRequest, NameRequest,
};
use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Status};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::convert;
use crate::retry::retry_with_backoff;

/// Per-call default timeout (§4.3).
pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);
/// Handshake-specific timeout for the first `GetPluginInfo` call (§4.4).
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Metadata returned by a successful `GetPluginInfo` handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub spec_version: Option<String>,
    pub capabilities: Vec<String>,
    pub supported_providers: Vec<String>,
}

/// One live connection to a plugin subprocess. Cheap to clone the
/// underlying channel per call, so concurrent in-flight requests multiplex
/// over the same TCP connection rather than serializing on a lock.
pub struct PluginClient {
    name: String,
    version: String,
    spec_version: Option<String>,
    capabilities: Vec<String>,
    supported_providers: Vec<String>,
    channel: Channel,
    matcher: ResourceMatcher,
}

impl PluginClient {
    /// Dial the plugin at `127.0.0.1:<port>` and perform the
    /// `GetPluginInfo` handshake (§4.4). Returns `Ok` in all three handshake
    /// outcomes the spec distinguishes (`Ready`, `Legacy`, `Failed`) except
    /// the last, which is surfaced as `Err` for the caller (the host) to
    /// record.
    pub async fn dial(plugin_name: &str, port: u16) -> Result<(Self, bool), CoreError> {
        let endpoint = Endpoint::from_shared(format!("http://127.0.0.1:{port}"))
            .map_err(|err| CoreError::Configuration(format!("invalid plugin endpoint: {err}")))?
            .timeout(CALL_TIMEOUT);
        let channel = tokio::time::timeout(HANDSHAKE_TIMEOUT, endpoint.connect())
            .await
            .map_err(|_| CoreError::Timeout(format!("plugin {plugin_name} dial timed out")))?
            .map_err(|err| CoreError::Transport(format!("plugin {plugin_name} dial failed: {err}")))?;

        let mut client = CostSourceClient::new(channel.clone());
        let handshake = tokio::time::timeout(
            HANDSHAKE_TIMEOUT,
            client.get_plugin_info(Request::new(GetPluginInfoRequest {})),
        )
        .await
        .map_err(|_| CoreError::Timeout(format!("plugin {plugin_name} handshake timed out")))?;

        match handshake {
            Ok(resp) => {
                let info = resp.into_inner();
                let matcher = ResourceMatcher::new(
                    info.supported_providers.clone(),
                    info.capabilities.clone(),
                );
                let plugin = Self {
                    name: plugin_name.to_string(),
                    version: info.version,
                    spec_version: Some(info.spec_version).filter(|s| !s.is_empty()),
                    capabilities: info.capabilities,
                    supported_providers: info.supported_providers,
                    channel,
                    matcher,
                };
                Ok((plugin, false))
            }
            Err(status) if status.code() == Code::Unimplemented => {
                // Legacy plugin: GetPluginInfo absent. Matcher falls back to
                // an always-accept-provider posture resolved by the host
                // from the install manifest instead.
                let plugin = Self {
                    name: plugin_name.to_string(),
                    version: String::new(),
                    spec_version: None,
                    capabilities: Vec::new(),
                    supported_providers: Vec::new(),
                    channel,
                    matcher: ResourceMatcher::default(),
                };
                Ok((plugin, true))
            }
            Err(status) => Err(status_to_error(status)),
        }
    }

    /// Used by the host to install the manifest-declared matcher for a
    /// legacy plugin, whose capabilities are not available post-handshake.
    pub fn with_matcher(mut self, matcher: ResourceMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn spec_version(&self) -> Option<&str> {
        self.spec_version.as_deref()
    }

    /// Snapshot of the handshake-time metadata, for `plugin list`-style
    /// surfaces.
    pub fn info(&self) -> PluginInfo {
        PluginInfo {
            name: self.name.clone(),
            version: self.version.clone(),
            spec_version: self.spec_version.clone(),
            capabilities: self.capabilities.clone(),
            supported_providers: self.supported_providers.clone(),
        }
    }

    fn stub(&self) -> CostSourceClient<Channel> {
        CostSourceClient::new(self.channel.clone())
    }

    /// `Name()` (§6), primarily used as a lightweight liveness probe.
    pub async fn name_rpc(&self) -> Result<String, CoreError> {
        let mut stub = self.stub();
        let resp = stub
            .name(Request::new(NameRequest {}))
            .await
            .map_err(status_to_error)?;
        Ok(resp.into_inner().name)
    }

    /// Optional advisory recommendations; legacy plugins may not implement
    /// this and return `Unimplemented`.
    pub async fn get_recommendations(
        &self,
        descriptor: &ResourceDescriptor,
        trace_id: &str,
    ) -> Result<Vec<String>, CoreError> {
        let mut stub = self.stub();
        let req = GetRecommendationsRequest {
            descriptor: Some(convert::descriptor_to_wire(descriptor)),
        };
        let req = inject_trace(Request::new(req), trace_id);
        let resp = tokio::time::timeout(CALL_TIMEOUT, stub.get_recommendations(req))
            .await
            .map_err(|_| CoreError::Timeout(format!("{}: get_recommendations timed out", self.name)))?
            .map_err(status_to_error)?;
        Ok(resp.into_inner().items)
    }
}

fn inject_trace<T>(mut req: Request<T>, trace_id: &str) -> Request<T> {
    if let Ok(value) = MetadataValue::try_from(trace_id) {
        req.metadata_mut()
            .insert(finfocus_proto::TRACE_METADATA_KEY, value);
    }
    req
}

/// Map a gRPC [`Status`] to the core error taxonomy. Convention (documented
/// in DESIGN.md, since the proto itself carries no typed error field):
/// `Unimplemented` -> `Unimplemented`, `NotFound` -> `NoData`,
/// `FailedPrecondition` -> `NotSupported`, `DeadlineExceeded` -> `Timeout`,
/// `Unavailable` -> `Unavailable`, everything else -> `Protocol`.
fn status_to_error(status: Status) -> CoreError {
    match status.code() {
        Code::Unimplemented => CoreError::Unimplemented(status.message().to_string()),
        Code::NotFound => CoreError::NoData(status.message().to_string()),
        Code::FailedPrecondition => CoreError::NotSupported(status.message().to_string()),
        Code::DeadlineExceeded => CoreError::Timeout(status.message().to_string()),
        Code::Unavailable => CoreError::Unavailable(status.message().to_string()),
        other => CoreError::Protocol(format!("{other:?}: {}", status.message())),
    }
}

#[async_trait]
impl CostSource for PluginClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, descriptor: &ResourceDescriptor) -> bool {
        self.matcher.supports(descriptor)
    }

    async fn projected_cost(
        &self,
        query: &CostQuery,
        cancel: &CancellationToken,
    ) -> Result<CostResult, CoreError> {
        let call = || async {
            let mut stub = self.stub();
            let req = GetProjectedCostRequest {
                descriptor: Some(convert::descriptor_to_wire(&query.descriptor)),
                utilization: query.utilization,
            };
            let req = inject_trace(Request::new(req), &query.trace_id);
            let resp = tokio::time::timeout(CALL_TIMEOUT, stub.get_projected_cost(req))
                .await
                .map_err(|_| CoreError::Timeout(format!("{}: get_projected_cost timed out", self.name)))?
                .map_err(status_to_error)?;
            Ok(resp.into_inner())
        };
        let resp = retry_with_backoff(cancel, call).await?;

        if resp.currency.is_empty() && resp.unit_price.is_none() && resp.cost_per_month.is_none() {
            return Err(CoreError::NoData(format!("{}: empty projected cost response", self.name)));
        }

        // The wire response's `unit_price` is the hourly rate (scenario 1,
        // SPEC_FULL §8): `{unit_price:0.0104, cost_per_month:7.592}` maps to
        // `CostResult{hourly:0.0104, monthly:7.592}`.
        let hourly = resp.unit_price.and_then(convert::decimal_from_f64);
        let monthly = resp.cost_per_month.and_then(convert::decimal_from_f64);
        let mut impact_metrics = std::collections::HashMap::new();
        for m in &resp.impact_metrics {
            if let Some(metric) = convert::wire_impact_metric(m) {
                impact_metrics.insert(metric.kind, metric);
            }
        }

        Ok(CostResult {
            resource_id: query.descriptor.id.clone(),
            adapter: self.name.clone(),
            currency: resp.currency,
            hourly,
            monthly,
            unit_price: None,
            billing_detail: resp.billing_detail,
            notes: String::new(),
            impact_metrics,
            samples: None,
        })
    }

    async fn actual_cost(
        &self,
        query: &CostQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<CostSample>, CoreError> {
        let (start, end) = match query.kind {
            QueryKind::Actual { start, end } => (start, end),
            QueryKind::Projected => {
                return Err(CoreError::Internal(
                    "actual_cost called with a projected query".to_string(),
                ))
            }
        };
        let call = || async {
            let mut stub = self.stub();
            let req = GetActualCostRequest {
                resource_id: query.descriptor.id.clone(),
                tags: query.descriptor.tags.clone(),
                start: Some(convert::chrono_to_timestamp(start)),
                end: Some(convert::chrono_to_timestamp(end)),
            };
            let req = inject_trace(Request::new(req), &query.trace_id);
            let resp = tokio::time::timeout(CALL_TIMEOUT, stub.get_actual_cost(req))
                .await
                .map_err(|_| CoreError::Timeout(format!("{}: get_actual_cost timed out", self.name)))?
                .map_err(status_to_error)?;
            Ok(resp.into_inner())
        };
        let resp = retry_with_backoff(cancel, call).await?;

        if resp.results.is_empty() {
            return Err(CoreError::NoData(format!("{}: no actual-cost samples", self.name)));
        }

        let samples: Vec<CostSample> = resp
            .results
            .iter()
            .filter_map(convert::wire_sample_to_domain)
            .collect();
        if samples.is_empty() {
            warn!(plugin = %self.name, "dropped malformed actual-cost samples");
            return Err(CoreError::Protocol(format!("{}: malformed actual-cost samples", self.name)));
        }
        Ok(samples)
    }
}
