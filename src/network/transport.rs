use async_trait::async_trait;

use super::client::RaftClient;
use super::NetworkError;
use crate::raft::{AppendEntriesArgs, AppendEntriesReply, RequestVoteArgs, RequestVoteReply};

/// Point-to-point RPC surface between consensus nodes.
///
/// Implementations must bound every call: a dial error, call error, or
/// timeout surfaces as `Err`, which the coordinators treat as "peer
/// unreachable this round." Consensus logic never distinguishes the failure
/// modes.
#[async_trait]
pub trait RaftTransport: Send + Sync {
    async fn request_vote(
        &self,
        address: &str,
        args: RequestVoteArgs,
    ) -> Result<RequestVoteReply, NetworkError>;

    async fn append_entries(
        &self,
        address: &str,
        args: AppendEntriesArgs,
    ) -> Result<AppendEntriesReply, NetworkError>;
}

/// gRPC transport: one lazily connected client per call.
pub struct GrpcTransport;

#[async_trait]
impl RaftTransport for GrpcTransport {
    async fn request_vote(
        &self,
        address: &str,
        args: RequestVoteArgs,
    ) -> Result<RequestVoteReply, NetworkError> {
        let mut client = RaftClient::new(address);
        client.request_vote(args).await
    }

    async fn append_entries(
        &self,
        address: &str,
        args: AppendEntriesArgs,
    ) -> Result<AppendEntriesReply, NetworkError> {
        let mut client = RaftClient::new(address);
        client.append_entries(args).await
    }
}
