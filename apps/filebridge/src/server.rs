//! HTTP trigger surface.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use filebridge_transfer::{Connector, TransferDirection, TransferOrchestrator};
use serde::Deserialize;
use tracing::{error, info};

type Reply = (StatusCode, &'static str);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQuery {
    pub file_identifier: String,
}

/// Builds the router. Every request opens its own session.
pub fn router<C>(orchestrator: Arc<TransferOrchestrator<C>>) -> Router
where
    C: Connector + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/sftp/copy", get(copy::<C>))
        .route("/sftp/upload", get(upload::<C>))
        .with_state(orchestrator)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve<C>(
    orchestrator: Arc<TransferOrchestrator<C>>,
    addr: SocketAddr,
) -> anyhow::Result<()>
where
    C: Connector + Send + Sync + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");
    axum::serve(listener, router(orchestrator)).await?;
    Ok(())
}

/// `GET /sftp/copy?fileIdentifier=ID`: download `/ID`.
pub async fn copy<C>(
    State(orchestrator): State<Arc<TransferOrchestrator<C>>>,
    Query(query): Query<FileQuery>,
) -> Reply
where
    C: Connector + Send + Sync + 'static,
{
    let identifier = format!("/{}", query.file_identifier);
    run(orchestrator, TransferDirection::Download, identifier).await
}

/// `GET /sftp/upload?fileIdentifier=ID`: upload `ID`.
pub async fn upload<C>(
    State(orchestrator): State<Arc<TransferOrchestrator<C>>>,
    Query(query): Query<FileQuery>,
) -> Reply
where
    C: Connector + Send + Sync + 'static,
{
    run(orchestrator, TransferDirection::Upload, query.file_identifier).await
}

async fn run<C>(
    orchestrator: Arc<TransferOrchestrator<C>>,
    direction: TransferDirection,
    identifier: String,
) -> Reply
where
    C: Connector + Send + Sync + 'static,
{
    let task =
        tokio::task::spawn_blocking(move || orchestrator.run_transfer(direction, &identifier));
    match task.await {
        Ok(true) => (StatusCode::OK, "success"),
        Ok(false) => (StatusCode::INTERNAL_SERVER_ERROR, "failure"),
        Err(e) => {
            error!(%direction, error = %e, "transfer task did not complete");
            (StatusCode::INTERNAL_SERVER_ERROR, "failure")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filebridge_transfer::{DigestAlgorithm, MemoryConnector, MemoryFs, TransferConfig};
    use tempfile::TempDir;

    fn orchestrator(
        connector: MemoryConnector,
        local: &std::path::Path,
    ) -> Arc<TransferOrchestrator<MemoryConnector>> {
        Arc::new(TransferOrchestrator::new(
            connector,
            TransferConfig {
                remote_base_path: "/".into(),
                local_base_path: local.to_path_buf(),
                algorithm: DigestAlgorithm::Sha256,
                delete_source: false,
            },
        ))
    }

    fn query(id: &str) -> Query<FileQuery> {
        Query(FileQuery {
            file_identifier: id.into(),
        })
    }

    #[tokio::test]
    async fn copy_downloads_tree() {
        let dir = TempDir::new().unwrap();
        let fs = MemoryFs::new();
        fs.put_file("/batch/a.txt", b"hello");
        let orch = orchestrator(MemoryConnector::new(fs.clone()), dir.path());

        let reply = copy(State(orch), query("batch")).await;

        assert_eq!(reply, (StatusCode::OK, "success"));
        assert_eq!(
            std::fs::read(dir.path().join("batch").join("a.txt")).unwrap(),
            b"hello"
        );
        assert_eq!(fs.close_count(), 1);
    }

    #[tokio::test]
    async fn upload_mirrors_local_tree() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("out").join("sub")).unwrap();
        std::fs::write(dir.path().join("out").join("sub").join("b.txt"), b"world").unwrap();
        let fs = MemoryFs::new();
        let orch = orchestrator(MemoryConnector::new(fs.clone()), dir.path());

        let reply = upload(State(orch), query("out")).await;

        assert_eq!(reply, (StatusCode::OK, "success"));
        assert_eq!(fs.read_file("/out/sub/b.txt").unwrap(), b"world");
    }

    #[tokio::test]
    async fn refused_connection_is_failure() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(MemoryConnector::refusing(MemoryFs::new()), dir.path());

        let reply = copy(State(orch), query("batch")).await;

        assert_eq!(reply, (StatusCode::INTERNAL_SERVER_ERROR, "failure"));
    }

    #[tokio::test]
    async fn traversal_identifier_is_failure() {
        let dir = TempDir::new().unwrap();
        let fs = MemoryFs::new();
        let orch = orchestrator(MemoryConnector::new(fs.clone()), dir.path());

        let reply = upload(State(orch), query("../etc")).await;

        assert_eq!(reply, (StatusCode::INTERNAL_SERVER_ERROR, "failure"));
        assert_eq!(fs.close_count(), 0);
    }

    #[tokio::test]
    async fn serves_health_over_tcp() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(MemoryConnector::new(MemoryFs::new()), dir.path());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(orch)).await.unwrap();
        });

        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.ends_with("OK"), "{response}");
    }
}
