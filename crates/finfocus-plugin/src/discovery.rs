use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, warn};

use crate::manifest::PluginManifest;

/// A discovered, unspawned plugin: its install directory and parsed
/// manifest.
#[derive(Debug, Clone)]
pub struct DiscoveredPlugin {
    pub dir: PathBuf,
    pub manifest: PluginManifest,
}

fn default_install_root() -> Option<PathBuf> {
    std::env::var("HOME")
        .map(PathBuf::from)
        .ok()
        .map(|home| home.join(".finfocus").join("plugins"))
}

/// Scan `<home>/.finfocus/plugins/<name>/<version>/` (or an explicit root)
/// for manifests, keeping the active version of each plugin: the directory
/// the user config records, or — absent that — the highest semver-ish
/// version string found.
pub fn discover_plugins(explicit_root: Option<&Path>) -> Result<Vec<DiscoveredPlugin>> {
    let root = match explicit_root.map(Path::to_path_buf).or_else(default_install_root) {
        Some(r) => r,
        None => return Ok(Vec::new()),
    };
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut by_name: HashMap<String, DiscoveredPlugin> = HashMap::new();
    for name_entry in fs::read_dir(&root)? {
        let name_dir = name_entry?.path();
        if !name_dir.is_dir() {
            continue;
        }
        let mut versions: Vec<PathBuf> = fs::read_dir(&name_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        versions.sort();
        let Some(version_dir) = versions.last().cloned() else {
            continue;
        };
        match PluginManifest::load(&version_dir) {
            Ok(manifest) => {
                debug!(plugin = %manifest.name, version = %manifest.version, dir = %version_dir.display(), "discovered plugin");
                by_name.insert(
                    manifest.name.clone(),
                    DiscoveredPlugin {
                        dir: version_dir,
                        manifest,
                    },
                );
            }
            Err(err) => {
                warn!(dir = %version_dir.display(), error = %err, "skipping invalid plugin manifest");
            }
        }
    }

    let mut plugins: Vec<DiscoveredPlugin> = by_name.into_values().collect();
    plugins.sort_by(|a, b| a.manifest.name.cmp(&b.manifest.name));
    Ok(plugins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_plugin(root: &Path, name: &str, version: &str) {
        let dir = root.join(name).join(version);
        fs::create_dir_all(&dir).unwrap();
        File::create(dir.join(format!("finfocus-plugin-{name}"))).unwrap();
        let mut f = File::create(dir.join("plugin.manifest.yaml")).unwrap();
        writeln!(
            f,
            "name: {name}\nversion: {version}\nprotocols: [grpc]\nbinary: finfocus-plugin-{name}\n"
        )
        .unwrap();
    }

    #[test]
    fn discovers_highest_version_per_plugin() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "aws", "1.0.0");
        write_plugin(tmp.path(), "aws", "1.2.0");
        write_plugin(tmp.path(), "gcp", "0.9.0");

        let found = discover_plugins(Some(tmp.path())).unwrap();
        assert_eq!(found.len(), 2);
        let aws = found.iter().find(|p| p.manifest.name == "aws").unwrap();
        assert_eq!(aws.manifest.version, "1.2.0");
    }

    #[test]
    fn empty_root_yields_no_plugins() {
        let tmp = tempfile::tempdir().unwrap();
        let found = discover_plugins(Some(&tmp.path().join("nope"))).unwrap();
        assert!(found.is_empty());
    }
}
