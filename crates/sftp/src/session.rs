//! ssh2-backed session and connector.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;

use filebridge_transfer::{
    Connector, DirectoryEntry, RemoteError, RemoteFs, RemoteSession, TransferError,
};
use ssh2::{CheckResult, ErrorCode, KnownHostFileKind, Session, Sftp};
use tracing::{debug, error, info};

use crate::error::SftpError;
use crate::settings::SftpSettings;

// SFTP v3 status codes (draft-ietf-secsh-filexfer-02).
const FX_NO_SUCH_FILE: i32 = 2;
const FX_PERMISSION_DENIED: i32 = 3;
const FX_FAILURE: i32 = 4;
const FX_NO_SUCH_PATH: i32 = 10;
const FX_FILE_ALREADY_EXISTS: i32 = 11;

const DIR_MODE: i32 = 0o755;

/// Maps an ssh2 error for `path` onto the remote error taxonomy.
pub(crate) fn remote_error(e: ssh2::Error, path: &str) -> RemoteError {
    match e.code() {
        ErrorCode::SFTP(FX_NO_SUCH_FILE) | ErrorCode::SFTP(FX_NO_SUCH_PATH) => {
            RemoteError::NotFound(path.to_string())
        }
        ErrorCode::SFTP(FX_PERMISSION_DENIED) => RemoteError::PermissionDenied(path.to_string()),
        ErrorCode::SFTP(FX_FILE_ALREADY_EXISTS) => RemoteError::AlreadyExists(path.to_string()),
        _ => RemoteError::Protocol(format!("{path}: {e}")),
    }
}

/// SFTP v3 servers answer a mkdir on an existing path with a generic
/// failure, so that status counts as "already exists" here.
pub(crate) fn mkdir_error(e: ssh2::Error, path: &str) -> RemoteError {
    match e.code() {
        ErrorCode::SFTP(FX_FAILURE) => RemoteError::AlreadyExists(path.to_string()),
        _ => remote_error(e, path),
    }
}

/// An authenticated SSH session with an open SFTP channel.
pub struct SftpSession {
    session: Session,
    sftp: Option<Sftp>,
    peer: String,
}

impl SftpSession {
    /// Connects, verifies the host key, authenticates and opens the SFTP channel.
    pub fn open(settings: &SftpSettings) -> Result<Self, SftpError> {
        let peer = format!("{}:{}", settings.host, settings.port);
        let tcp = connect_tcp(settings)?;

        let mut session = Session::new()?;
        session.set_timeout(settings.session_timeout);
        session.set_tcp_stream(tcp);
        session.handshake()?;

        verify_host_key(&session, settings)?;

        session.userauth_password(&settings.username, &settings.password)?;
        if !session.authenticated() {
            return Err(SftpError::Auth(settings.username.clone()));
        }

        session.set_timeout(settings.channel_timeout);
        let sftp = session.sftp()?;
        debug!(peer = %peer, "SFTP channel open");

        Ok(Self {
            session,
            sftp: Some(sftp),
            peer,
        })
    }

    fn sftp(&self) -> Result<&Sftp, RemoteError> {
        self.sftp
            .as_ref()
            .ok_or_else(|| RemoteError::Protocol("session closed".into()))
    }
}

fn connect_tcp(settings: &SftpSettings) -> Result<TcpStream, SftpError> {
    let addrs: Vec<SocketAddr> = (settings.host.as_str(), settings.port)
        .to_socket_addrs()?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, settings.session_timeout()) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(%addr, error = %e, "TCP connect attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err
        .unwrap_or_else(|| std::io::Error::other(format!("no address for {}", settings.host)))
        .into())
}

/// Strict host key checking: the key must already be in `known_hosts`.
fn verify_host_key(session: &Session, settings: &SftpSettings) -> Result<(), SftpError> {
    let (key, _) = session
        .host_key()
        .ok_or_else(|| SftpError::HostKey("server presented no host key".into()))?;

    let mut known = session.known_hosts()?;
    known
        .read_file(&settings.known_hosts, KnownHostFileKind::OpenSSH)
        .map_err(|e| {
            SftpError::HostKey(format!(
                "cannot read {}: {e}",
                settings.known_hosts.display()
            ))
        })?;

    match known.check_port(&settings.host, settings.port, key) {
        CheckResult::Match => Ok(()),
        CheckResult::NotFound => Err(SftpError::HostKey(format!(
            "{} is not in {}",
            settings.host,
            settings.known_hosts.display()
        ))),
        CheckResult::Mismatch => Err(SftpError::HostKey(format!(
            "key for {} does not match known_hosts",
            settings.host
        ))),
        CheckResult::Failure => Err(SftpError::HostKey("known_hosts check failed".into())),
    }
}

impl RemoteFs for SftpSession {
    fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>, RemoteError> {
        let entries = self
            .sftp()?
            .readdir(Path::new(path))
            .map_err(|e| remote_error(e, path))?;

        Ok(entries
            .into_iter()
            .filter_map(|(entry_path, stat)| {
                let name = entry_path.file_name()?.to_string_lossy().into_owned();
                Some(DirectoryEntry {
                    name,
                    is_dir: stat.is_dir(),
                })
            })
            .collect())
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + '_>, RemoteError> {
        let file = self
            .sftp()?
            .open(Path::new(path))
            .map_err(|e| remote_error(e, path))?;
        Ok(Box::new(file))
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write + '_>, RemoteError> {
        let file = self
            .sftp()?
            .create(Path::new(path))
            .map_err(|e| remote_error(e, path))?;
        Ok(Box::new(file))
    }

    fn mkdir(&self, path: &str) -> Result<(), RemoteError> {
        self.sftp()?
            .mkdir(Path::new(path), DIR_MODE)
            .map_err(|e| mkdir_error(e, path))
    }

    fn remove(&self, path: &str) -> Result<(), RemoteError> {
        self.sftp()?
            .unlink(Path::new(path))
            .map_err(|e| remote_error(e, path))
    }

    fn rmdir(&self, path: &str) -> Result<(), RemoteError> {
        self.sftp()?
            .rmdir(Path::new(path))
            .map_err(|e| remote_error(e, path))
    }
}

impl RemoteSession for SftpSession {
    fn close(&mut self) -> Result<(), RemoteError> {
        // Release the channel before tearing down the transport.
        drop(self.sftp.take());
        self.session
            .disconnect(None, "filebridge transfer finished", None)
            .map_err(|e| RemoteError::Protocol(format!("disconnect from {}: {e}", self.peer)))?;
        info!(peer = %self.peer, "SFTP session closed");
        Ok(())
    }
}

/// Opens a fresh [`SftpSession`] per transfer.
#[derive(Debug, Clone)]
pub struct SftpConnector {
    settings: SftpSettings,
}

impl SftpConnector {
    pub fn new(settings: SftpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SftpSettings {
        &self.settings
    }
}

impl Connector for SftpConnector {
    type Session = SftpSession;

    fn connect(&self) -> Result<SftpSession, TransferError> {
        match SftpSession::open(&self.settings) {
            Ok(session) => {
                info!(
                    host = %self.settings.host,
                    port = self.settings.port,
                    user = %self.settings.username,
                    "SFTP session established"
                );
                Ok(session)
            }
            Err(e) => {
                error!(
                    host = %self.settings.host,
                    port = self.settings.port,
                    error = %e,
                    "SFTP connection failed"
                );
                Err(e.into())
            }
        }
    }
}
