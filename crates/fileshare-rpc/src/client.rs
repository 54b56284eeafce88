//! TCP client side of the file service.
//!
//! Each call dials a fresh connection, sends one request frame, reads one
//! response frame, and drops the connection. Calls are independent and
//! short-lived, so there is no connection pool to manage.

use crate::error::{RpcError, Result};
use crate::protocol::{read_frame, write_frame, Request, Response, WireMetaData};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// How long a single call may take before it's treated as a connection
/// failure, including the dial.
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// A thin RPC client bound to one peer's address.
#[derive(Debug, Clone)]
pub struct RpcClient {
    addr: SocketAddr,
}

impl RpcClient {
    /// Create a client for the peer reachable at `addr`.
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Address this client dials.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn call(&self, request: Request) -> Result<Response> {
        timeout(CALL_TIMEOUT, self.call_inner(request))
            .await
            .map_err(|_| RpcError::Connection(std::io::Error::from(std::io::ErrorKind::TimedOut)))?
    }

    async fn call_inner(&self, request: Request) -> Result<Response> {
        let mut stream = TcpStream::connect(self.addr)
            .await
            .map_err(RpcError::Connection)?;
        write_frame(&mut stream, &request).await?;
        read_frame(&mut stream).await
    }

    /// `remote_list`.
    pub async fn list(&self) -> Result<Vec<WireMetaData>> {
        match self.call(Request::List).await? {
            Response::List(files) => Ok(files),
            Response::Error(e) => Err(RpcError::NotAvailable(e)),
            _ => Err(RpcError::UnexpectedEof),
        }
    }

    /// `remote_fragments_available`.
    pub async fn fragments_available(&self, fingerprint: &str) -> Result<Vec<i32>> {
        match self
            .call(Request::FragmentsAvailable {
                fingerprint: fingerprint.to_string(),
            })
            .await?
        {
            Response::FragmentsAvailable(ids) => Ok(ids),
            Response::Error(e) => Err(RpcError::NotAvailable(e)),
            _ => Err(RpcError::UnexpectedEof),
        }
    }

    /// `remote_download`.
    pub async fn download(&self, fingerprint: &str, fragment_id: u32) -> Result<Vec<u8>> {
        match self
            .call(Request::Download {
                fingerprint: fingerprint.to_string(),
                fragment_id,
            })
            .await?
        {
            Response::Download { data, .. } => Ok(data),
            Response::Error(e) => Err(RpcError::NotAvailable(e)),
            _ => Err(RpcError::UnexpectedEof),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{serve, RpcHandler};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    struct EchoHandler;

    #[async_trait]
    impl RpcHandler for EchoHandler {
        async fn remote_list(&self) -> Vec<WireMetaData> {
            vec![]
        }

        async fn remote_fragments_available(&self, _fingerprint: &str) -> Vec<i32> {
            vec![0, 1, 2]
        }

        async fn remote_download(
            &self,
            _fingerprint: &str,
            fragment_id: u32,
        ) -> std::result::Result<Vec<u8>, String> {
            if fragment_id == 99 {
                Err("out of range".to_string())
            } else {
                Ok(vec![fragment_id as u8; 4])
            }
        }
    }

    async fn spawn_test_server() -> (SocketAddr, CancellationToken) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let cancel = CancellationToken::new();
        let server_cancel = cancel.clone();
        tokio::spawn(async move {
            serve(addr, Arc::new(EchoHandler), server_cancel).await.ok();
        });
        // give the listener a moment to bind
        tokio::time::sleep(Duration::from_millis(50)).await;
        (addr, cancel)
    }

    #[tokio::test]
    async fn fragments_available_roundtrips() {
        let (addr, cancel) = spawn_test_server().await;
        let client = RpcClient::new(addr);

        let ids = client.fragments_available("anything").await.unwrap();
        assert_eq!(ids, vec![0, 1, 2]);
        cancel.cancel();
    }

    #[tokio::test]
    async fn download_returns_fragment_bytes() {
        let (addr, cancel) = spawn_test_server().await;
        let client = RpcClient::new(addr);

        let bytes = client.download("fp", 5).await.unwrap();
        assert_eq!(bytes, vec![5u8; 4]);
        cancel.cancel();
    }

    #[tokio::test]
    async fn download_error_is_surfaced_not_a_crash() {
        let (addr, cancel) = spawn_test_server().await;
        let client = RpcClient::new(addr);

        let result = client.download("fp", 99).await;
        assert!(result.is_err());
        cancel.cancel();
    }
}
