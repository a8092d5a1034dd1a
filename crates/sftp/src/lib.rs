//! SFTP transport for `filebridge-transfer`.
//!
//! Opens an SSH session with password authentication and strict
//! known-hosts checking, starts the SFTP subsystem and exposes it through
//! [`RemoteFs`](filebridge_transfer::RemoteFs).

mod error;
mod session;
mod settings;

pub use error::SftpError;
pub use session::{SftpConnector, SftpSession};
pub use settings::SftpSettings;

/// Standard SSH port.
pub const DEFAULT_PORT: u16 = 22;
