use thiserror::Error;

pub mod client;
pub mod server;
pub mod transport;

pub mod proto {
    tonic::include_proto!("raft");
}

pub use client::RaftClient;
pub use server::RaftServer;
pub use transport::{GrpcTransport, RaftTransport};

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("RPC error: {0}")]
    RpcError(#[from] tonic::Status),

    #[error("Transport error: {0}")]
    TransportError(#[from] tonic::transport::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Status;

    #[test]
    fn display_includes_error_kind() {
        let conn = NetworkError::ConnectionError("boom".to_string());
        assert!(format!("{conn}").contains("Connection error"));
    }

    #[test]
    fn from_tonic_status_maps_to_rpc_error() {
        let status = Status::unavailable("peer down");
        let err: NetworkError = status.into();
        match err {
            NetworkError::RpcError(status) => {
                assert!(status.to_string().contains("peer down"));
            }
            other => panic!("expected RpcError, got {other:?}"),
        }
    }
}
