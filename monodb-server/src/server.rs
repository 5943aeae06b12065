//! The TCP server loop: accept connections, read lines, hand them to the
//! [`LineHandler`], write back replies.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use crate::error::ServerError;
use crate::handler::LineHandler;
use crate::session::Session;

/// Server configuration: just the bind address and a connection cap,
/// scoped to what this thin front-end needs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub max_connections: usize,
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        ServerConfig {
            bind_addr,
            max_connections: 1000,
        }
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }
}

/// Running totals, exposed for operational visibility the way the teacher's
/// `ServerStats` does, minus everything that depended on auth/TLS/metrics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
}

/// The stream-oriented query server.
pub struct Server {
    config: ServerConfig,
    handler: Arc<LineHandler>,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Server {
            config,
            handler: Arc::new(LineHandler::new()),
            stats: Arc::new(ServerStats::default()),
            shutdown,
        }
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Initiates shutdown; `run` returns once the accept loop notices.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Runs the accept loop until `shutdown` is called. Each connection is
    /// handled on its own task; connections never see each other, and none
    /// of them touch the WAL — that wiring is left to a future integration.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "server listening");

        let mut shutdown_rx = self.shutdown.subscribe();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            tracing::error!(error = %e, "accept failed");
                            continue;
                        }
                    };

                    if self.stats.connections_active.load(Ordering::Relaxed)
                        >= self.config.max_connections as u64
                    {
                        tracing::warn!(%addr, "connection limit reached, rejecting");
                        continue;
                    }

                    self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
                    self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                    let handler = self.handler.clone();
                    let stats = self.stats.clone();
                    let mut conn_shutdown = self.shutdown.subscribe();
                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_connection(stream, addr, handler) => {
                                if let Err(e) = result {
                                    tracing::debug!(%addr, error = %e, "connection ended with an error");
                                }
                            }
                            _ = conn_shutdown.recv() => {
                                tracing::debug!(%addr, "dropping connection for shutdown");
                            }
                        }
                        stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("server shutting down");
                    return Ok(());
                }
            }
        }
    }

    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        handler: Arc<LineHandler>,
    ) -> Result<(), ServerError> {
        tracing::info!(%addr, "client connected");
        let mut session = Session::new(addr);
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        while let Some(line) = lines.next_line().await? {
            session.record_request();
            let reply = handler.handle_line(&line);
            write_half.write_all(reply.as_bytes()).await?;
            write_half.write_all(b"\n").await?;
        }

        tracing::info!(%addr, requests = session.requests_handled(), connected_for = ?session.connected_for(), "client disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader as TokioBufReader};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn server_echoes_a_parsed_statement() {
        let bind_probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = bind_probe.local_addr().unwrap();
        drop(bind_probe);

        let server = Arc::new(Server::new(ServerConfig::new(addr)));
        let run_server = server.clone();
        let join = tokio::spawn(async move { run_server.run().await });

        // give the listener a moment to bind
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        write_half
            .write_all(b"TELL users TO ADD RECORD WITH id = 1\n")
            .await
            .unwrap();

        let mut reader = TokioBufReader::new(read_half);
        let mut reply = String::new();
        reader.read_line(&mut reply).await.unwrap();
        assert!(reply.contains("AddRecord"));

        server.shutdown();
        let _ = join.await;
    }
}
