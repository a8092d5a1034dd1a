//! Error types for the SFTP transport.

/// Errors produced while opening an SFTP session.
#[derive(Debug, thiserror::Error)]
pub enum SftpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("host key rejected: {0}")]
    HostKey(String),

    #[error("authentication failed for {0}")]
    Auth(String),
}

impl From<SftpError> for filebridge_transfer::TransferError {
    fn from(e: SftpError) -> Self {
        filebridge_transfer::TransferError::Connection(e.to_string())
    }
}
