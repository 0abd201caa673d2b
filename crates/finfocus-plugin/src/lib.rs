//! Plugin Client (C3) and Plugin Host (C4): subprocess lifecycle and gRPC
//! dialogue with cost-source plugins (SPEC_FULL §4.3, §4.4).

pub mod client;
pub mod convert;
pub mod discovery;
pub mod host;
pub mod manifest;
pub mod process;
pub mod retry;
pub mod state;

pub use client::{PluginClient, PluginInfo};
pub use discovery::{discover_plugins, DiscoveredPlugin};
pub use host::{CompatibilityMode, PluginHost, HOST_SPEC_VERSION};
pub use manifest::PluginManifest;
pub use state::PluginState;
