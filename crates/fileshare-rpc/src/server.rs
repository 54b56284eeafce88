//! TCP server side of the file service.

use crate::error::Result;
use crate::protocol::{read_frame, write_frame, Request, Response, WireMetaData};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Implemented by the seeder side of a node; the transport dispatches each
/// incoming [`Request`] to one of these methods and frames the result back.
#[async_trait]
pub trait RpcHandler: Send + Sync + 'static {
    /// Handle [`Request::List`].
    async fn remote_list(&self) -> Vec<WireMetaData>;

    /// Handle [`Request::FragmentsAvailable`].
    async fn remote_fragments_available(&self, fingerprint: &str) -> Vec<i32>;

    /// Handle [`Request::Download`]. Errors are reported back to the caller
    /// as [`Response::Error`] rather than closing the connection abruptly.
    async fn remote_download(
        &self,
        fingerprint: &str,
        fragment_id: u32,
    ) -> std::result::Result<Vec<u8>, String>;
}

/// Accepts connections and dispatches each to `handler` until `cancel` fires.
pub async fn serve(
    addr: SocketAddr,
    handler: Arc<dyn RpcHandler>,
    cancel: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "rpc server listening");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("rpc server cancelled");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, handler).await {
                        warn!(%peer, error = %e, "rpc connection ended with error");
                    }
                });
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, handler: Arc<dyn RpcHandler>) -> Result<()> {
    let request: Request = read_frame(&mut stream).await?;
    let response = match request {
        Request::List => Response::List(handler.remote_list().await),
        Request::FragmentsAvailable { fingerprint } => Response::FragmentsAvailable(
            handler.remote_fragments_available(&fingerprint).await,
        ),
        Request::Download {
            fingerprint,
            fragment_id,
        } => match handler.remote_download(&fingerprint, fragment_id).await {
            Ok(data) => Response::Download { fragment_id, data },
            Err(e) => {
                error!(fingerprint, fragment_id, error = %e, "remote_download failed");
                Response::Error(e)
            }
        },
    };
    write_frame(&mut stream, &response).await
}
