//! Resource Matcher (C1): decides whether a plugin claims a descriptor.
//! Pure, side-effect-free; shared by the plugin client (matching against its
//! post-handshake capability set) and the router's own unit tests.

use std::collections::HashSet;

use crate::descriptor::ResourceDescriptor;

/// The set of providers and resource-type patterns one source claims.
/// `resource_type` entries ending in `*` match by prefix; everything else is
/// an exact match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceMatcher {
    supported_providers: HashSet<String>,
    supported_resource_types: Vec<String>,
}

impl ResourceMatcher {
    pub fn new(
        supported_providers: impl IntoIterator<Item = String>,
        supported_resource_types: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            supported_providers: supported_providers.into_iter().collect(),
            supported_resource_types: supported_resource_types.into_iter().collect(),
        }
    }

    /// `true` iff both the descriptor's provider and its resource type are
    /// present in the corresponding set (§4.1). A trailing `*` in a
    /// registered resource-type pattern matches by prefix.
    pub fn supports(&self, descriptor: &ResourceDescriptor) -> bool {
        if !self.supported_providers.contains(&descriptor.provider) {
            return false;
        }
        self.supported_resource_types
            .iter()
            .any(|pattern| matches_resource_type(pattern, &descriptor.resource_type))
    }
}

fn matches_resource_type(pattern: &str, resource_type: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => resource_type.starts_with(prefix),
        None => pattern == resource_type,
    }
}
