//! Plugin Host (C4): discovers, spawns, handshakes with and tears down
//! plugin subprocesses, and owns the exclusive handle to every
//! [`PluginClient`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use finfocus_core::ResourceMatcher;
use tokio::process::Child;
use tokio::sync::{RwLock, Semaphore};
use tracing::{info, warn};

use crate::client::PluginClient;
use crate::discovery::{discover_plugins, DiscoveredPlugin};
use crate::process::{spawn_and_handshake, terminate};
use crate::state::PluginState;

const TEARDOWN_GRACE: Duration = Duration::from_secs(5);

/// Whether a spec-version mismatch between host and plugin is a warning
/// (permissive, the default) or moves the plugin to `Failed` (strict).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompatibilityMode {
    #[default]
    Permissive,
    Strict,
}

/// The host's supported protocol version, compared against each plugin's
/// declared `spec_version` at handshake time.
pub const HOST_SPEC_VERSION: &str = "1.0";

struct Entry {
    state: PluginState,
    client: Option<Arc<PluginClient>>,
    child: Option<Child>,
}

/// Owns every plugin subprocess spawned for a run. The client map is the
/// only mutable shared structure (§5); reads dominate, so it is guarded by
/// an `RwLock`.
pub struct PluginHost {
    entries: RwLock<HashMap<String, Entry>>,
    fanout_limit: Arc<Semaphore>,
    compatibility: CompatibilityMode,
}

impl PluginHost {
    pub fn new(compatibility: CompatibilityMode) -> Self {
        let concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            entries: RwLock::new(HashMap::new()),
            fanout_limit: Arc::new(Semaphore::new(concurrency)),
            compatibility,
        }
    }

    /// Discover plugins under `root` (or the default install directory),
    /// spawn and handshake with each one, and record its resulting state.
    /// A single plugin's discovery/handshake failure never aborts the
    /// others (§4.4, §8 "Plugin crash mid-run").
    pub async fn discover_and_spawn(&self, root: Option<&std::path::Path>) -> anyhow::Result<()> {
        let discovered = discover_plugins(root)?;
        {
            let mut entries = self.entries.write().await;
            for plugin in &discovered {
                entries.insert(
                    plugin.manifest.name.clone(),
                    Entry {
                        state: PluginState::Discovered,
                        client: None,
                        child: None,
                    },
                );
            }
        }

        for plugin in &discovered {
            self.spawn_one(plugin).await;
        }
        Ok(())
    }

    async fn set_state(&self, name: &str, state: PluginState) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(name) {
            debug_assert!(
                entry.state.can_transition_to(state),
                "illegal plugin state transition {:?} -> {:?}",
                entry.state,
                state
            );
            entry.state = state;
        }
    }

    async fn spawn_one(&self, plugin: &DiscoveredPlugin) {
        let name = plugin.manifest.name.clone();
        self.set_state(&name, PluginState::Spawning).await;

        let binary = plugin.manifest.binary_path(&plugin.dir);
        let mut spawned = match spawn_and_handshake(&binary, &plugin.dir, &name).await {
            Ok(s) => s,
            Err(err) => {
                warn!(plugin = %name, error = %err, "plugin spawn/handshake failed");
                self.set_state(&name, PluginState::Failed).await;
                return;
            }
        };

        self.set_state(&name, PluginState::Handshaking).await;
        match PluginClient::dial(&name, spawned.port).await {
            Ok((mut client, legacy)) => {
                if legacy {
                    client = client.with_matcher(ResourceMatcher::new(
                        plugin.manifest.supported_providers.clone(),
                        vec!["*".to_string()],
                    ));
                } else if !self.is_compatible(client.spec_version()) && self.compatibility == CompatibilityMode::Strict {
                    warn!(
                        plugin = %name,
                        spec_version = ?client.spec_version(),
                        host_spec_version = HOST_SPEC_VERSION,
                        "plugin spec-version mismatch; failing in strict mode"
                    );
                    self.set_state(&name, PluginState::Failed).await;
                    self.kill_orphan(&name, &mut spawned.child).await;
                    return;
                } else if !self.is_compatible(client.spec_version()) {
                    warn!(
                        plugin = %name,
                        spec_version = ?client.spec_version(),
                        host_spec_version = HOST_SPEC_VERSION,
                        "plugin spec-version mismatch"
                    );
                }

                let final_state = if legacy {
                    PluginState::Legacy
                } else {
                    PluginState::Ready
                };
                let mut entries = self.entries.write().await;
                if let Some(entry) = entries.get_mut(&name) {
                    entry.state = final_state;
                    entry.client = Some(Arc::new(client));
                    entry.child = Some(spawned.child);
                }
                info!(plugin = %name, state = ?final_state, "plugin ready");
            }
            Err(err) => {
                warn!(plugin = %name, error = %err, "plugin handshake call failed");
                self.set_state(&name, PluginState::Failed).await;
                self.kill_orphan(&name, &mut spawned.child).await;
            }
        }
    }

    /// A plugin that fails after its process is already spawned (handshake
    /// error, strict-mode incompatibility) must still be torn down — the
    /// `Failed` state never stores a `child`, so `shutdown()` alone would
    /// never reap it.
    async fn kill_orphan(&self, name: &str, child: &mut Child) {
        if let Err(err) = terminate(child, TEARDOWN_GRACE).await {
            warn!(plugin = %name, error = %err, "error terminating plugin process after handshake failure");
        }
    }

    fn is_compatible(&self, spec_version: Option<&str>) -> bool {
        match spec_version {
            Some(v) => v == HOST_SPEC_VERSION,
            // Spec version unknown but handshake succeeded (non-legacy,
            // empty `spec_version` field) — treat as a mismatch so it is at
            // least logged once, per the permissive-by-default policy.
            None => false,
        }
    }

    /// Every plugin currently in a usable (`Ready`/`Legacy`) state, in the
    /// order the router should try them: stable by plugin name (§4.5).
    pub async fn ready_clients(&self) -> Vec<Arc<PluginClient>> {
        let entries = self.entries.read().await;
        let mut names: Vec<&String> = entries
            .iter()
            .filter(|(_, e)| e.state.is_usable())
            .map(|(name, _)| name)
            .collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|name| entries.get(name).and_then(|e| e.client.clone()))
            .collect()
    }

    /// Bulk fan-out over every discovered plugin's metadata, bounded to
    /// `NumCPU` concurrent tasks (§4.4). Results are sorted by plugin name;
    /// a single plugin's failure never aborts the listing.
    pub async fn list_plugin_info(&self) -> Vec<(String, PluginState, Option<String>)> {
        let entries = self.entries.read().await;
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        let snapshot: Vec<(String, PluginState, Option<Arc<PluginClient>>)> = names
            .into_iter()
            .filter_map(|name| {
                entries
                    .get(&name)
                    .map(|e| (name, e.state, e.client.clone()))
            })
            .collect();
        drop(entries);

        let mut tasks = Vec::with_capacity(snapshot.len());
        for (name, state, client) in snapshot {
            let permit = self.fanout_limit.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = permit.acquire_owned().await;
                let version = match &client {
                    Some(_) if state == PluginState::Legacy => Some("Legacy".to_string()),
                    Some(c) => Some(c.version().to_string()),
                    None => None,
                };
                (name, state, version)
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            if let Ok(item) = task.await {
                results.push(item);
            }
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }

    /// Close every non-terminal client and terminate its subprocess
    /// (SIGTERM, escalating to SIGKILL after the grace period). Guaranteed
    /// to run on every exit path including signal delivery (§4.4) — callers
    /// invoke this from both normal completion and a SIGINT/SIGTERM
    /// handler.
    pub async fn shutdown(&self) {
        let mut entries = self.entries.write().await;
        for (name, entry) in entries.iter_mut() {
            if entry.state.is_terminal() {
                continue;
            }
            entry.state = PluginState::Closing;
            entry.client = None;
            if let Some(mut child) = entry.child.take() {
                if let Err(err) = terminate(&mut child, TEARDOWN_GRACE).await {
                    warn!(plugin = %name, error = %err, "error terminating plugin process");
                }
            }
            entry.state = PluginState::Closed;
        }
    }
}
