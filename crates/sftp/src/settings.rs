use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Connection settings for one SFTP endpoint.
#[derive(Clone, Deserialize)]
pub struct SftpSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// OpenSSH `known_hosts` file the server key must appear in.
    pub known_hosts: PathBuf,
    /// Connect and handshake timeout, in milliseconds.
    #[serde(default = "default_session_timeout")]
    pub session_timeout: u32,
    /// Timeout for SFTP channel operations, in milliseconds.
    #[serde(default = "default_channel_timeout")]
    pub channel_timeout: u32,
}

fn default_port() -> u16 {
    crate::DEFAULT_PORT
}

fn default_session_timeout() -> u32 {
    10_000
}

fn default_channel_timeout() -> u32 {
    5_000
}

impl SftpSettings {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.session_timeout))
    }

    pub fn channel_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.channel_timeout))
    }
}

impl fmt::Debug for SftpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SftpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("known_hosts", &self.known_hosts)
            .field("session_timeout", &self.session_timeout)
            .field("channel_timeout", &self.channel_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let settings: SftpSettings = toml::from_str(
            r#"
            host = "files.example.com"
            username = "bridge"
            known_hosts = "/home/bridge/.ssh/known_hosts"
            "#,
        )
        .unwrap();
        assert_eq!(settings.port, 22);
        assert_eq!(settings.session_timeout(), Duration::from_secs(10));
        assert_eq!(settings.channel_timeout(), Duration::from_secs(5));
        assert!(settings.password.is_empty());
    }

    #[test]
    fn debug_hides_password() {
        let settings: SftpSettings = toml::from_str(
            r#"
            host = "h"
            username = "u"
            password = "hunter2"
            known_hosts = "/k"
            "#,
        )
        .unwrap();
        let printed = format!("{settings:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }
}
