//! Top-level entry point: one session, one tree, one verdict.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{error, info, warn};

use crate::cleanup::delete_source;
use crate::engine::TransferEngine;
use crate::error::TransferError;
use crate::path::{join_local, join_remote};
use crate::remote::{Connector, SessionGuard};
use crate::types::{CleanupStatus, TransferConfig, TransferDirection, TransferOutcome};
use crate::validation::validate_relative_path;

/// Runs tree transfers against sessions opened by a [`Connector`].
///
/// Each call opens its own session and closes it before returning, so one
/// orchestrator can serve sequential or concurrent callers without sharing
/// a session between transfers.
pub struct TransferOrchestrator<C> {
    connector: C,
    config: TransferConfig,
    chunk_size: usize,
}

impl<C: Connector> TransferOrchestrator<C> {
    pub fn new(connector: C, config: TransferConfig) -> Self {
        Self {
            connector,
            config,
            chunk_size: 0,
        }
    }

    /// Sets the copy buffer size used for every file.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Mirrors the remote tree `relative_path` into the local base path.
    pub fn download(&self, relative_path: &str) -> bool {
        self.run_transfer(TransferDirection::Download, relative_path)
    }

    /// Mirrors the local tree `relative_path` into the remote base path.
    pub fn upload(&self, relative_path: &str) -> bool {
        self.run_transfer(TransferDirection::Upload, relative_path)
    }

    /// Runs a transfer and reduces the outcome to a single success flag.
    ///
    /// Every error is logged here and never reaches the caller. A panic in
    /// the transport or the walk is caught and counts as a failure.
    pub fn run_transfer(&self, direction: TransferDirection, relative_path: &str) -> bool {
        let result = match catch_unwind(AssertUnwindSafe(|| self.run(direction, relative_path))) {
            Ok(result) => result,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                error!(%direction, path = %relative_path, %reason, "transfer panicked");
                return false;
            }
        };

        match result {
            Ok(outcome) if outcome.is_success() => true,
            Ok(outcome) => {
                error!(
                    %direction,
                    source = %outcome.source,
                    failed = outcome.report.failures.len(),
                    verified = outcome.report.verified.len(),
                    "transfer incomplete"
                );
                false
            }
            Err(e) => {
                error!(%direction, path = %relative_path, error = %e, "transfer failed");
                false
            }
        }
    }

    /// Runs a transfer and returns the full outcome.
    ///
    /// Only an invalid identifier or a failure to open the session is an
    /// `Err`; everything below that is recorded in the report.
    pub fn run(
        &self,
        direction: TransferDirection,
        relative_path: &str,
    ) -> Result<TransferOutcome, TransferError> {
        let relative = validate_relative_path(relative_path)?;
        let remote_path = join_remote(&self.config.remote_base_path, relative);
        let local_path = join_local(&self.config.local_base_path, relative);

        let session = SessionGuard::new(self.connector.connect()?);
        info!(
            %direction,
            remote = %remote_path,
            local = %local_path.display(),
            algorithm = %self.config.algorithm,
            "starting transfer"
        );

        let engine =
            TransferEngine::new(&*session, self.config.algorithm).with_chunk_size(self.chunk_size);
        let report = engine.transfer_directory(direction, &remote_path, &local_path);

        let cleanup = if report.is_success() && self.config.delete_source {
            match delete_source(direction, &*session, &remote_path, &local_path) {
                Ok(()) => CleanupStatus::Deleted,
                Err(e) => {
                    warn!(%direction, error = %e, "source cleanup failed");
                    CleanupStatus::Failed(e.to_string())
                }
            }
        } else {
            CleanupStatus::Skipped
        };

        let (source, destination) = match direction {
            TransferDirection::Download => (remote_path, local_path.display().to_string()),
            TransferDirection::Upload => (local_path.display().to_string(), remote_path),
        };
        info!(
            %direction,
            %source,
            %destination,
            verified = report.verified.len(),
            failed = report.failures.len(),
            bytes = report.bytes,
            "transfer finished"
        );

        Ok(TransferOutcome {
            direction,
            source,
            destination,
            report,
            cleanup,
        })
    }
}
