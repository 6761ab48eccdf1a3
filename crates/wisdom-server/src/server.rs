//! Server implementation

use crate::config::ServerConfig;
use crate::http_server::{self, AppState};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use wisdom_core::{Error, Result};
use wisdom_search::CancellationToken;
use wisdom_storage::{DataLoader, DataSet};

/// Wisdom search server
pub struct Server {
    /// Server configuration
    config: ServerConfig,

    /// Shared handler state
    state: AppState,

    /// Running state
    running: AtomicBool,

    /// Signals the HTTP task to drain and exit
    shutdown: CancellationToken,

    /// HTTP server handle and bound address
    http: Mutex<Option<(JoinHandle<()>, SocketAddr)>>,
}

impl Server {
    /// Create a server over already loaded data
    pub fn new(config: ServerConfig, data: DataSet) -> Self {
        let state = AppState::new(config.clone(), data);
        Self {
            config,
            state,
            running: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            http: Mutex::new(None),
        }
    }

    /// Load the configured data directory and create a server over it
    pub async fn load(config: ServerConfig) -> Result<Self> {
        info!("Loading data from {:?}", config.data_dir);
        let data = DataLoader::new(&config.data_dir).load().await?;
        Ok(Self::new(config, data))
    }

    /// Get the configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the handler state
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Check if server is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Address the HTTP listener is bound to, once started
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.http.lock().await.as_ref().map(|(_, addr)| *addr)
    }

    /// Start the server
    pub async fn start(&self) -> Result<()> {
        if self.is_running() {
            return Err(Error::Configuration("Server already running".to_string()));
        }

        info!("Starting Wisdom server...");

        let router = http_server::create_router(self.state.clone());
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;

        info!("HTTP server listening on {}", addr);

        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(e) = serve.await {
                warn!("HTTP server error: {}", e);
            }
        });

        *self.http.lock().await = Some((handle, addr));
        self.running.store(true, Ordering::SeqCst);

        info!("Wisdom server started successfully");
        Ok(())
    }

    /// Stop the server, waiting for in-flight requests to finish
    pub async fn stop(&self) -> Result<()> {
        if !self.is_running() {
            return Err(Error::Configuration("Server not running".to_string()));
        }

        info!("Stopping Wisdom server...");

        self.shutdown.cancel();
        if let Some((handle, _)) = self.http.lock().await.take() {
            handle
                .await
                .map_err(|e| Error::Internal(format!("HTTP task failed: {}", e)))?;
        }

        self.running.store(false, Ordering::SeqCst);

        info!("Wisdom server stopped");
        Ok(())
    }

    /// Get server version
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use wisdom_storage::loader::{METADATA_FILE, RECORDS_DIR};

    fn write_data_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(METADATA_FILE),
            r#"{
                "metadata": {"t1": {"name": "Banks", "columns": [{"name": "bank"}]}},
                "databaseAssignments": {"db": ["t1"]}
            }"#,
        )
        .unwrap();
        fs::create_dir(dir.path().join(RECORDS_DIR)).unwrap();
        fs::write(
            dir.path().join(RECORDS_DIR).join("db.json"),
            r#"{"records": [{"tableKey": "t1", "bank": "Apex"}]}"#,
        )
        .unwrap();
        dir
    }

    async fn create_test_server() -> (Server, TempDir) {
        let dir = write_data_dir();
        let config = ServerConfig::for_development(dir.path()).port(0);
        let server = Server::load(config).await.unwrap();
        (server, dir)
    }

    #[tokio::test]
    async fn test_server_creation() {
        let (server, _dir) = create_test_server().await;
        assert!(!server.is_running());
        assert!(server.local_addr().await.is_none());
        assert_eq!(server.state().coordinator.metadata().len(), 1);
    }

    #[tokio::test]
    async fn test_server_load_missing_dir() {
        let dir = TempDir::new().unwrap();
        let result = Server::load(ServerConfig::for_development(dir.path())).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_server_start_stop() {
        let (server, _dir) = create_test_server().await;

        server.start().await.unwrap();
        assert!(server.is_running());
        assert!(server.start().await.is_err());

        let addr = server.local_addr().await.unwrap();
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /api/version HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(r#"{"version":"v1"}"#));

        server.stop().await.unwrap();
        assert!(!server.is_running());
        assert!(server.stop().await.is_err());
    }
}
