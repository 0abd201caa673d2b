//! Source Router (C5): given a descriptor, yields the ordered candidate
//! chain plugins -> local spec -> none (§4.5).

use std::sync::Arc;

use finfocus_core::{CostSource, ResourceDescriptor};
use finfocus_localspec::LocalSpecSource;

/// A candidate the engine may try, in preference order. Plugins precede the
/// local spec, which precedes the terminal `None` candidate (which carries
/// no [`CostSource`] — the engine emits the `adapter="none"` row directly
/// when the sequence exhausts).
pub enum Candidate {
    Source(Arc<dyn CostSource>),
    None,
}

/// Builds the candidate sequence for one descriptor. `plugins` must already
/// be ordered stably by name (the host's `ready_clients()` guarantees this);
/// the router itself performs no further reordering (§4.5 "ordered by
/// configuration, stable by plugin name as secondary key").
pub fn candidates_for<'a>(
    descriptor: &'a ResourceDescriptor,
    plugins: &'a [Arc<dyn CostSource>],
    local_spec: Option<&'a LocalSpecSource>,
) -> impl Iterator<Item = Candidate> + 'a {
    let matching_plugins = plugins
        .iter()
        .filter(move |p| p.matches(descriptor))
        .cloned()
        .map(Candidate::Source);

    let spec_candidate = local_spec
        .filter(|spec| spec.matches(descriptor))
        .map(|spec| Candidate::Source(Arc::new(spec.clone()) as Arc<dyn CostSource>))
        .into_iter();

    matching_plugins
        .chain(spec_candidate)
        .chain(std::iter::once(Candidate::None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use finfocus_core::{CostQuery, CostResult, CostSample};
    use tokio_util::sync::CancellationToken;

    struct StubSource {
        name: String,
        provider: String,
    }

    #[async_trait::async_trait]
    impl CostSource for StubSource {
        fn name(&self) -> &str {
            &self.name
        }
        fn matches(&self, d: &ResourceDescriptor) -> bool {
            d.provider == self.provider
        }
        async fn projected_cost(
            &self,
            query: &CostQuery,
            _cancel: &CancellationToken,
        ) -> Result<CostResult, finfocus_core::CoreError> {
            Ok(CostResult::none(&query.descriptor.id))
        }
        async fn actual_cost(
            &self,
            _query: &CostQuery,
            _cancel: &CancellationToken,
        ) -> Result<Vec<CostSample>, finfocus_core::CoreError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn non_matching_plugins_are_skipped_and_none_always_terminates() {
        let descriptor = ResourceDescriptor {
            provider: "aws".to_string(),
            resource_type: "aws:ec2:Instance".to_string(),
            sku: "t3.micro".to_string(),
            region: "us-east-1".to_string(),
            id: "r1".to_string(),
            ..Default::default()
        };
        let plugins: Vec<Arc<dyn CostSource>> = vec![
            Arc::new(StubSource {
                name: "aws-plugin".to_string(),
                provider: "aws".to_string(),
            }),
            Arc::new(StubSource {
                name: "gcp-plugin".to_string(),
                provider: "gcp".to_string(),
            }),
        ];
        let tags: Vec<String> = candidates_for(&descriptor, &plugins, None)
            .map(|c| match c {
                Candidate::Source(s) => s.name().to_string(),
                Candidate::None => "none".to_string(),
            })
            .collect();
        assert_eq!(tags, vec!["aws-plugin".to_string(), "none".to_string()]);
    }
}
