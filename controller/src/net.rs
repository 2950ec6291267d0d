//! Wire protocol client.
//!
//! The vendor protocol is single-frame request/response over TCP: one
//! short-lived connection per command, the first inbound chunk is the
//! whole reply. There is no shared state between calls; every call owns
//! its connection and its deadline.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use projector_common::{Error, Result};

/// Replies are one short frame; anything longer is not this protocol.
const MAX_RESPONSE_BYTES: usize = 512;

/// Sends one frame over a dedicated connection and returns the first reply
/// chunk. The deadline covers connect, write, and read; the connection is
/// dropped on every exit path, including timeout.
pub async fn send_command(
    host: &str,
    port: u16,
    frame: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>> {
    let exchange = async {
        let mut stream = TcpStream::connect((host, port))
            .await
            .map_err(|err| Error::Connection(err.to_string()))?;

        stream
            .write_all(frame)
            .await
            .map_err(|err| Error::Connection(err.to_string()))?;

        let mut buffer = vec![0u8; MAX_RESPONSE_BYTES];
        let read = stream
            .read(&mut buffer)
            .await
            .map_err(|err| Error::Connection(err.to_string()))?;
        if read == 0 {
            return Err(Error::Connection(
                "connection closed before any data".to_string(),
            ));
        }

        buffer.truncate(read);
        Ok(buffer)
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout),
    }
}

/// Transport seam for everything that talks to a projector.
#[async_trait]
pub trait CommandSender: Send + Sync {
    async fn send(&self, host: &str, port: u16, frame: &[u8]) -> Result<Vec<u8>>;
}

/// Production transport: one short-lived TCP connection per command.
pub struct TcpCommandSender {
    timeout: Duration,
}

impl TcpCommandSender {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandSender for TcpCommandSender {
    async fn send(&self, host: &str, port: u16, frame: &[u8]) -> Result<Vec<u8>> {
        send_command(host, port, frame, self.timeout).await
    }
}
