use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server configuration, loadable from TOML.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnoteConfig {
    pub bind_addr: SocketAddr,
    /// Root of the disk store: notes at `<root>/<id>.json`, blobs under
    /// `<root>/blobs/`.
    pub storage_root: PathBuf,
    pub max_upload_bytes: u64,
    pub render: RenderConfig,
    pub gc: GcConfig,
}

impl Default for SnoteConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8081)),
            storage_root: PathBuf::from("/tmp/snotestorage"),
            max_upload_bytes: 2 * 1024 * 1024 * 1024,
            render: RenderConfig::default(),
            gc: GcConfig::default(),
        }
    }
}

impl SnoteConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Upload limit as a body size, saturating on narrow platforms.
    pub fn upload_limit(&self) -> usize {
        usize::try_from(self.max_upload_bytes).unwrap_or(usize::MAX)
    }
}

/// Render cache settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60 * 60,
            sweep_interval_secs: 60,
        }
    }
}

impl RenderConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Garbage collection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60 * 60,
        }
    }
}

impl GcConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = SnoteConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8081".parse::<SocketAddr>().unwrap());
        assert_eq!(c.storage_root, PathBuf::from("/tmp/snotestorage"));
        assert_eq!(c.max_upload_bytes, 2 << 30);
        assert_eq!(c.render.ttl(), Duration::from_secs(3600));
        assert_eq!(c.render.sweep_interval(), Duration::from_secs(60));
        assert!(c.gc.enabled);
        assert_eq!(c.gc.interval(), Duration::from_secs(3600));
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(SnoteConfig::from_toml_str("").unwrap(), SnoteConfig::default());
    }

    #[test]
    fn partial_toml_overrides() {
        let c = SnoteConfig::from_toml_str(
            r#"
            storage_root = "/srv/notes"

            [gc]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(c.storage_root, PathBuf::from("/srv/notes"));
        assert!(!c.gc.enabled);
        assert_eq!(c.gc.interval_secs, 3600);
        assert_eq!(c.render, RenderConfig::default());
    }

    #[test]
    fn toml_roundtrip() {
        let mut c = SnoteConfig::default();
        c.render.ttl_secs = 5;
        let text = c.to_toml_string().unwrap();
        assert_eq!(SnoteConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = SnoteConfig::from_toml_str("bind_addr = 12").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snote.toml");
        std::fs::write(&path, "max_upload_bytes = 1024\n").unwrap();
        assert_eq!(SnoteConfig::load(&path).unwrap().upload_limit(), 1024);
        assert!(SnoteConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
