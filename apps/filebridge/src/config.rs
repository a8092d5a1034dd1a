//! Application configuration.
//!
//! Read from `$XDG_CONFIG_HOME/filebridge/config.toml` unless `--config`
//! points elsewhere.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use filebridge_sftp::SftpSettings;
use filebridge_transfer::{DigestAlgorithm, TransferConfig};
use serde::Deserialize;

/// Environment variable that overrides `sftp.password`.
pub const PASSWORD_ENV: &str = "FILEBRIDGE_SFTP_PASSWORD";

const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Deserialize)]
struct ConfigFile {
    sftp: SftpSection,
    #[serde(default)]
    server: ServerSection,
}

#[derive(Debug, Deserialize)]
struct SftpSection {
    #[serde(flatten)]
    connection: SftpSettings,
    local_base_path: PathBuf,
    remote_base_path: String,
    #[serde(default = "default_integrity_check")]
    integrity_check: String,
    #[serde(default)]
    delete_source: String,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    bind: Option<String>,
}

fn default_integrity_check() -> String {
    DigestAlgorithm::default().name().to_string()
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sftp: SftpSettings,
    pub transfer: TransferConfig,
    pub bind: SocketAddr,
}

impl AppConfig {
    /// Loads from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::parse(&content, std::env::var(PASSWORD_ENV).ok())
            .with_context(|| format!("invalid config {}", path.display()))?;

        tracing::debug!(
            path = %path.display(),
            host = %config.sftp.host,
            remote_base = %config.transfer.remote_base_path,
            local_base = %config.transfer.local_base_path.display(),
            algorithm = %config.transfer.algorithm,
            delete_source = config.transfer.delete_source,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parses TOML text. `password_override` replaces the file's password.
    pub fn parse(content: &str, password_override: Option<String>) -> anyhow::Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        let SftpSection {
            connection: mut sftp,
            local_base_path,
            remote_base_path,
            integrity_check,
            delete_source,
        } = file.sftp;

        if let Some(password) = password_override {
            sftp.password = password;
        }
        if sftp.host.is_empty() {
            bail!("sftp.host must not be empty");
        }

        let algorithm: DigestAlgorithm = integrity_check.parse()?;
        let bind = file
            .server
            .bind
            .as_deref()
            .unwrap_or(DEFAULT_BIND)
            .parse()
            .context("server.bind is not a socket address")?;

        Ok(Self {
            sftp,
            transfer: TransferConfig {
                remote_base_path,
                local_base_path,
                algorithm,
                delete_source: is_truthy(&delete_source),
            },
            bind,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "on" | "1"
    )
}

/// `$XDG_CONFIG_HOME/filebridge/config.toml`, falling back to `~/.config`.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => {
            let home = std::env::var_os("HOME").context("HOME is not set")?;
            PathBuf::from(home).join(".config")
        }
    };
    Ok(base.join("filebridge").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [sftp]
        host = "files.example.com"
        username = "bridge"
        password = "secret"
        known_hosts = "/home/bridge/.ssh/known_hosts"
        local_base_path = "/srv/outbox"
        remote_base_path = "/upload"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = AppConfig::parse(MINIMAL, None).unwrap();
        assert_eq!(config.sftp.port, 22);
        assert_eq!(config.sftp.session_timeout, 10_000);
        assert_eq!(config.sftp.channel_timeout, 5_000);
        assert_eq!(config.transfer.algorithm, DigestAlgorithm::Sha256);
        assert!(!config.transfer.delete_source);
        assert_eq!(config.bind, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.transfer.remote_base_path, "/upload");
        assert_eq!(config.transfer.local_base_path, PathBuf::from("/srv/outbox"));
    }

    #[test]
    fn full_config() {
        let content = r#"
            [sftp]
            host = "10.0.0.5"
            port = 2222
            username = "bridge"
            known_hosts = "/k"
            session_timeout = 3000
            channel_timeout = 1000
            local_base_path = "/data"
            remote_base_path = "/"
            integrity_check = "md5"
            delete_source = "YES"

            [server]
            bind = "0.0.0.0:9000"
        "#;
        let config = AppConfig::parse(content, None).unwrap();
        assert_eq!(config.sftp.port, 2222);
        assert_eq!(config.sftp.session_timeout, 3_000);
        assert_eq!(config.transfer.algorithm, DigestAlgorithm::Md5);
        assert!(config.transfer.delete_source);
        assert_eq!(config.bind.port(), 9000);
    }

    #[test]
    fn password_override_wins() {
        let config = AppConfig::parse(MINIMAL, Some("from-env".into())).unwrap();
        assert_eq!(config.sftp.password, "from-env");
    }

    #[test]
    fn unknown_algorithm_rejected() {
        let content = MINIMAL.replace(
            "remote_base_path = \"/upload\"",
            "remote_base_path = \"/upload\"\nintegrity_check = \"CRC32\"",
        );
        let err = AppConfig::parse(&content, None).unwrap_err();
        assert!(err.to_string().contains("CRC32"), "{err}");
    }

    #[test]
    fn missing_section_rejected() {
        assert!(AppConfig::parse("[server]\nbind = \"127.0.0.1:1\"\n", None).is_err());
    }

    #[test]
    fn truthy_values() {
        for yes in ["yes", "Yes", "TRUE", "on", "1", " yes "] {
            assert!(is_truthy(yes), "{yes}");
        }
        for no in ["", "no", "false", "off", "0", "y"] {
            assert!(!is_truthy(no), "{no}");
        }
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.sftp.host, "files.example.com");
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("absent.toml"), "{err}");
    }
}
