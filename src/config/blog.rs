//! Blog configuration (blog.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main blog configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogConfig {
    /// Folder holding the markdown pages
    pub source_dir: PathBuf,
    /// Folder holding the HTML templates
    pub template_dir: PathBuf,
    /// Folder served under /files/
    pub files_dir: PathBuf,
    /// Folder holding one JSON comment file per page
    pub comments_dir: PathBuf,
    /// Listen address, e.g. ":8001", "8001" or "127.0.0.1:8001"
    pub port: String,
    /// Seconds between index snapshot refreshes
    pub refresh_interval: u64,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("./pages/"),
            template_dir: PathBuf::from("./templates/"),
            files_dir: PathBuf::from("./files/"),
            comments_dir: PathBuf::from("comments"),
            port: ":8001".to_string(),
            refresh_interval: 30,
        }
    }
}

impl BlogConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Cannot read config {:?}", path))?;
        let config: BlogConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config {:?}", path))?;
        Ok(config)
    }

    /// Resolve the listen address.
    ///
    /// A bare port or one with a leading `:` binds every interface.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let port = self.port.trim();
        let candidate = if let Some(rest) = port.strip_prefix(':') {
            format!("0.0.0.0:{}", rest)
        } else if port.parse::<u16>().is_ok() {
            format!("0.0.0.0:{}", port)
        } else {
            port.replacen("localhost", "127.0.0.1", 1)
        };

        candidate
            .to_socket_addrs()
            .with_context(|| format!("Invalid listen address {:?}", self.port))?
            .next()
            .with_context(|| format!("No address for {:?}", self.port))
    }

    /// Interval between index refreshes, never shorter than one second
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BlogConfig::default();
        assert_eq!(config.source_dir, PathBuf::from("./pages/"));
        assert_eq!(config.template_dir, PathBuf::from("./templates/"));
        assert_eq!(config.files_dir, PathBuf::from("./files/"));
        assert_eq!(config.port, ":8001");
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
source_dir: posts
port: "127.0.0.1:9000"
refresh_interval: 5
"#;
        let config: BlogConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.source_dir, PathBuf::from("posts"));
        assert_eq!(config.port, "127.0.0.1:9000");
        assert_eq!(config.refresh_interval, 5);
        assert_eq!(config.template_dir, PathBuf::from("./templates/"));
    }

    #[test]
    fn test_listen_addr_forms() {
        let mut config = BlogConfig::default();
        assert_eq!(
            config.listen_addr().unwrap(),
            "0.0.0.0:8001".parse::<SocketAddr>().unwrap()
        );

        config.port = "9000".to_string();
        assert_eq!(config.listen_addr().unwrap().port(), 9000);

        config.port = "127.0.0.1:9001".to_string();
        assert_eq!(
            config.listen_addr().unwrap(),
            "127.0.0.1:9001".parse::<SocketAddr>().unwrap()
        );

        config.port = "not a port".to_string();
        assert!(config.listen_addr().is_err());
    }

    #[test]
    fn test_zero_refresh_interval_is_clamped() {
        let config = BlogConfig {
            refresh_interval: 0,
            ..BlogConfig::default()
        };
        assert_eq!(config.refresh_interval(), Duration::from_secs(1));
    }
}
