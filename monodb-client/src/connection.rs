//! Connection management: a single TCP stream split into a line reader and
//! a writer half.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::ClientError;

/// Connection-level settings.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub addr: SocketAddr,
    pub connect_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        ConnectionConfig {
            addr,
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// A single open connection to a `monodb-server` instance.
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, ClientError> {
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(config.addr))
            .await
            .map_err(|_| ClientError::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out")))??;
        let (read_half, write_half) = stream.into_split();
        Ok(Connection {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Sends one statement line (a trailing newline is added) and waits for
    /// the single reply line the server writes back.
    pub async fn send_line(&mut self, line: &str) -> Result<String, ClientError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        let mut reply = String::new();
        let bytes_read = self.reader.read_line(&mut reply).await?;
        if bytes_read == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(reply.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn send_line_round_trips_a_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            let reply = format!("echo: {}", line.trim_end());
            write_half.write_all(reply.as_bytes()).await.unwrap();
            write_half.write_all(b"\n").await.unwrap();
        });

        let mut conn = Connection::connect(&ConnectionConfig::new(addr)).await.unwrap();
        let reply = conn.send_line("hello").await.unwrap();
        assert_eq!(reply, "echo: hello");
        server.await.unwrap();
    }
}
