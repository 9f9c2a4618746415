use super::codec::{encode_response, handle_line};
use crate::application::signal_service::SignalService;
use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Longest request line accepted, excluding the newline.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Newline-delimited JSON over TCP: one response line per request line.
pub struct RpcServer {
    listener: TcpListener,
    service: Arc<SignalService>,
}

impl RpcServer {
    pub async fn bind(addr: SocketAddr, service: Arc<SignalService>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind RPC listener on {}", addr))?;
        Ok(Self { listener, service })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("RPC listener has no local address")
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        info!("RpcServer: listening on {}", self.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("RpcServer: shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("RpcServer: connection from {}", peer);
                            let service = self.service.clone();
                            tokio::spawn(async move {
                                if let Err(e) = serve_connection(stream, service).await {
                                    warn!("RpcServer: connection {} ended: {:#}", peer, e);
                                }
                            });
                        }
                        Err(e) => warn!("RpcServer: accept failed: {}", e),
                    }
                }
            }
        }
    }
}

async fn serve_connection(stream: TcpStream, service: Arc<SignalService>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = (&mut reader)
            .take(MAX_LINE_BYTES as u64 + 1)
            .read_until(b'\n', &mut line)
            .await
            .context("Failed to read request")?;
        if read == 0 {
            return Ok(());
        }

        let mut response = if line.len() > MAX_LINE_BYTES && line.last() != Some(&b'\n') {
            discard_line(&mut reader)
                .await
                .context("Failed to read request")?;
            encode_response(&service.reject(&format!(
                "request line exceeds {} bytes",
                MAX_LINE_BYTES
            )))
        } else {
            let request = String::from_utf8_lossy(&line).trim().to_string();
            if request.is_empty() {
                continue;
            }
            // Feature derivation is CPU-bound
            let service = service.clone();
            tokio::task::spawn_blocking(move || handle_line(&service, &request))
                .await
                .context("Request handler failed")?
        };

        response.push('\n');
        writer
            .write_all(response.as_bytes())
            .await
            .context("Failed to write response")?;
    }
}

/// Skip the remainder of an oversized line without buffering it.
async fn discard_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let (consumed, found) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|b| *b == b'\n') {
                Some(end) => (end + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(consumed);
        if found {
            return Ok(());
        }
    }
}
