//! High-level client API: connect once, send statements, get replies.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;

/// A thin client for `monodb-server`'s line protocol.
pub struct Client {
    conn: Option<Connection>,
    config: ConnectionConfig,
}

impl Client {
    pub fn new(config: ConnectionConfig) -> Self {
        Client { conn: None, config }
    }

    pub async fn connect(&mut self) -> Result<(), ClientError> {
        self.conn = Some(Connection::connect(&self.config).await?);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Sends one statement line and returns the server's reply line.
    /// Reconnects lazily if the client hasn't connected yet.
    pub async fn query(&mut self, statement: &str) -> Result<String, ClientError> {
        if self.conn.is_none() {
            self.connect().await?;
        }
        let conn = self.conn.as_mut().ok_or(ClientError::NotConnected)?;
        match conn.send_line(statement).await {
            Ok(reply) => Ok(reply),
            Err(err) => {
                self.conn = None;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn query_connects_lazily_and_returns_the_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            write_half.write_all(b"ok\n").await.unwrap();
        });

        let mut client = Client::new(ConnectionConfig::new(addr));
        assert!(!client.is_connected());
        let reply = client.query("TELL users TO ADD RECORD WITH id = 1").await.unwrap();
        assert_eq!(reply, "ok");
        assert!(client.is_connected());
    }
}
