use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*[a-z0-9]$").expect("name pattern is valid"));

/// Per-installed-version plugin manifest (§6 "Plugin manifest").
#[derive(Debug, Clone, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub supported_providers: Vec<String>,
    #[serde(default)]
    pub protocols: Vec<String>,
    pub binary: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PluginManifest {
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join("plugin.manifest.yaml");
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        let manifest: PluginManifest = serde_yaml::from_str(&data)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))?;
        manifest.validate(dir)?;
        Ok(manifest)
    }

    fn validate(&self, dir: &Path) -> Result<()> {
        if !NAME_PATTERN.is_match(&self.name) {
            bail!("invalid plugin name {:?}: must match {}", self.name, NAME_PATTERN.as_str());
        }
        if self.version.trim().is_empty() {
            bail!("plugin {} missing version", self.name);
        }
        if self.protocols.is_empty() || self.protocols.iter().any(|p| p != "grpc") {
            bail!("plugin {} declares unsupported protocols {:?}", self.name, self.protocols);
        }
        if self.binary.trim().is_empty() {
            bail!("plugin {} missing binary path", self.name);
        }
        if !dir.join(&self.binary).exists() {
            bail!(
                "plugin {} binary not found: {}",
                self.name,
                dir.join(&self.binary).display()
            );
        }
        Ok(())
    }

    pub fn binary_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_manifest(dir: &Path, yaml: &str) {
        let mut f = File::create(dir.join("plugin.manifest.yaml")).unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
    }

    #[test]
    fn loads_valid_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        File::create(tmp.path().join("finfocus-plugin-aws")).unwrap();
        write_manifest(
            tmp.path(),
            "name: aws\nversion: 1.0.0\nsupported_providers: [aws]\nprotocols: [grpc]\nbinary: finfocus-plugin-aws\n",
        );
        let m = PluginManifest::load(tmp.path()).unwrap();
        assert_eq!(m.name, "aws");
        assert_eq!(m.protocols, vec!["grpc".to_string()]);
    }

    #[test]
    fn rejects_invalid_name() {
        let tmp = tempfile::tempdir().unwrap();
        File::create(tmp.path().join("bin")).unwrap();
        write_manifest(
            tmp.path(),
            "name: AWS_Bad\nversion: 1.0.0\nprotocols: [grpc]\nbinary: bin\n",
        );
        assert!(PluginManifest::load(tmp.path()).is_err());
    }

    #[test]
    fn rejects_non_grpc_protocol() {
        let tmp = tempfile::tempdir().unwrap();
        File::create(tmp.path().join("bin")).unwrap();
        write_manifest(
            tmp.path(),
            "name: aws\nversion: 1.0.0\nprotocols: [http]\nbinary: bin\n",
        );
        assert!(PluginManifest::load(tmp.path()).is_err());
    }

    #[test]
    fn rejects_missing_binary() {
        let tmp = tempfile::tempdir().unwrap();
        write_manifest(
            tmp.path(),
            "name: aws\nversion: 1.0.0\nprotocols: [grpc]\nbinary: missing\n",
        );
        assert!(PluginManifest::load(tmp.path()).is_err());
    }
}
